//! A reference decision procedure for quantifier-free linear integer
//! arithmetic and booleans: negation-normal-form, disjunctive-normal-form
//! case splitting, and Fourier-Motzkin elimination per clause.
//!
//! This is test scaffolding for `pdkind-tests`'s end-to-end scenarios, not
//! a production SMT solver (`SPEC_FULL.md` §4.2, Non-goals): DNF expansion
//! is exponential in the worst case (bounded by `CLAUSE_CAP`, past which
//! `check` answers `Unknown` rather than search forever), interpolation is
//! only computed for the conjunctive fragment of the `A` side, and integer
//! witnesses are chosen by the standard Fourier-Motzkin-over-the-rationals
//! construction, which is exact for the equality-heavy fragment the test
//! scenarios exercise but not for arbitrary integer programs.

use crate::linear::{term_to_linexpr, LinExpr};
use crate::rational::Rational;
use crate::{Backend, BackendFeatures, CheckResult, Class, Direction, Model};
use pdkind_term::{Rel, Term, TermManager, VarId};
use rustc_hash::{FxHashMap, FxHashSet};

const CLAUSE_CAP: usize = 4096;

#[derive(Clone, Debug)]
enum Literal {
    Bool(VarId, bool),
    /// `expr REL 0`.
    Arith(LinExpr, Rel),
}

enum Formula {
    True,
    False,
    Lit(Literal),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

fn to_nnf(tm: &TermManager, t: Term, negate: bool) -> Formula {
    if let Some(b) = tm.bool_const(t) {
        return if b != negate { Formula::True } else { Formula::False };
    }
    if let Some(id) = tm.var_id(t) {
        return Formula::Lit(Literal::Bool(id, !negate));
    }
    if let Some(inner) = tm.not_inner(t) {
        return to_nnf(tm, inner, !negate);
    }
    if let Some(ts) = tm.and_parts(t) {
        let children: Vec<Formula> = ts.iter().map(|&s| to_nnf(tm, s, negate)).collect();
        return if negate { Formula::Or(children) } else { Formula::And(children) };
    }
    if let Some(ts) = tm.or_parts(t) {
        let children: Vec<Formula> = ts.iter().map(|&s| to_nnf(tm, s, negate)).collect();
        return if negate { Formula::And(children) } else { Formula::Or(children) };
    }
    if let Some((rel, a, b)) = tm.atom_parts(t) {
        let ea = term_to_linexpr(tm, a).expect("atom operand must be linear arithmetic");
        let eb = term_to_linexpr(tm, b).expect("atom operand must be linear arithmetic");
        let expr = ea.add(&eb.negate());
        if !negate {
            return Formula::Lit(Literal::Arith(expr, rel));
        }
        return match rel {
            Rel::Eq => Formula::Or(vec![
                Formula::Lit(Literal::Arith(expr.clone(), Rel::Lt)),
                Formula::Lit(Literal::Arith(expr.negate(), Rel::Lt)),
            ]),
            Rel::Le => Formula::Lit(Literal::Arith(expr.negate(), Rel::Lt)),
            Rel::Lt => Formula::Lit(Literal::Arith(expr.negate(), Rel::Le)),
        };
    }
    unreachable!("term outside the naive backend's boolean/linear-arithmetic fragment")
}

fn to_dnf(f: &Formula) -> Vec<Vec<Literal>> {
    match f {
        Formula::True => vec![vec![]],
        Formula::False => vec![],
        Formula::Lit(l) => vec![vec![l.clone()]],
        Formula::And(fs) => {
            let mut acc = vec![Vec::new()];
            for child in fs {
                let child_dnf = to_dnf(child);
                if child_dnf.is_empty() {
                    return Vec::new();
                }
                let mut next = Vec::with_capacity(acc.len() * child_dnf.len());
                for clause in &acc {
                    for extra in &child_dnf {
                        let mut merged = clause.clone();
                        merged.extend(extra.iter().cloned());
                        next.push(merged);
                    }
                }
                acc = next;
                if acc.len() > CLAUSE_CAP {
                    break;
                }
            }
            acc
        }
        Formula::Or(fs) => fs.iter().flat_map(to_dnf).collect(),
    }
}

/// One step of Fourier-Motzkin elimination: the lower/upper bound
/// expressions on `var` at the moment it was eliminated, kept so a
/// satisfying assignment can be reconstructed by back-substitution in
/// reverse elimination order.
struct EliminationStep {
    var: VarId,
    lower: Vec<(LinExpr, bool)>,
    upper: Vec<(LinExpr, bool)>,
}

/// Eliminates `var` from a constraint set of `(expr, strict)` pairs each
/// meaning `expr <= 0` (`strict == false`) or `expr < 0` (`strict == true`).
fn eliminate_one(constraints: &[(LinExpr, bool)], var: VarId) -> (Vec<(LinExpr, bool)>, EliminationStep) {
    let mut lower = Vec::new();
    let mut upper = Vec::new();
    let mut others = Vec::new();
    for (expr, strict) in constraints {
        let c = expr.coeff_of(var);
        if c.is_zero() {
            others.push((expr.clone(), *strict));
            continue;
        }
        let bound = expr.without(var).negate().scale(c.recip());
        if c.is_positive() {
            upper.push((bound, *strict));
        } else {
            lower.push((bound, *strict));
        }
    }
    for (l, sl) in &lower {
        for (u, su) in &upper {
            let combined = l.clone().add(&u.clone().negate());
            others.push((combined, *sl || *su));
        }
    }
    (others, EliminationStep { var, lower, upper })
}

/// `true` if a constant-only constraint (no remaining variables) is
/// violated; `None` if `expr` still mentions a variable.
fn is_violated(expr: &LinExpr, strict: bool) -> Option<bool> {
    if !expr.coeffs.is_empty() {
        return None;
    }
    Some(if strict {
        expr.constant >= Rational::ZERO
    } else {
        expr.constant > Rational::ZERO
    })
}

fn min_int_satisfying_lower(v: Rational, strict: bool) -> i64 {
    if strict {
        if v.is_integer() {
            v.floor() + 1
        } else {
            v.ceil()
        }
    } else {
        v.ceil()
    }
}

fn max_int_satisfying_upper(v: Rational, strict: bool) -> i64 {
    if strict {
        if v.is_integer() {
            v.floor() - 1
        } else {
            v.floor()
        }
    } else {
        v.floor()
    }
}

/// Decides feasibility of a conjunction of `(expr, strict)` constraints
/// over the rationals and, if feasible, reconstructs an integer witness
/// for every variable mentioned (exact whenever the feasible region is a
/// single point, as it is for the equality-heavy formulas this backend is
/// built to decide; best-effort otherwise).
fn solve_constraints(constraints: Vec<(LinExpr, bool)>) -> Option<FxHashMap<VarId, Rational>> {
    let mut vars: Vec<VarId> = constraints
        .iter()
        .flat_map(|(e, _)| e.coeffs.keys().copied())
        .collect();
    vars.sort_unstable();
    vars.dedup();

    let mut current = constraints;
    let mut steps = Vec::with_capacity(vars.len());
    for v in vars {
        let (next, step) = eliminate_one(&current, v);
        for (expr, strict) in &next {
            if is_violated(expr, *strict) == Some(true) {
                return None;
            }
        }
        current = next;
        steps.push(step);
    }
    for (expr, strict) in &current {
        if is_violated(expr, *strict) == Some(true) {
            return None;
        }
    }

    let mut assignment: FxHashMap<VarId, Rational> = FxHashMap::default();
    for step in steps.iter().rev() {
        let mut best_lower: Option<(Rational, bool)> = None;
        for (expr, strict) in &step.lower {
            let v = expr
                .evaluate(&assignment)
                .expect("bound expression only mentions already-assigned variables");
            best_lower = Some(match best_lower {
                Some((bv, bs)) if bv > v || (bv == v && bs) => (bv, bs),
                _ => (v, *strict),
            });
        }
        let mut best_upper: Option<(Rational, bool)> = None;
        for (expr, strict) in &step.upper {
            let v = expr
                .evaluate(&assignment)
                .expect("bound expression only mentions already-assigned variables");
            best_upper = Some(match best_upper {
                Some((bv, bs)) if bv < v || (bv == v && bs) => (bv, bs),
                _ => (v, *strict),
            });
        }
        let lower_int = best_lower.map(|(v, strict)| min_int_satisfying_lower(v, strict));
        let upper_int = best_upper.map(|(v, strict)| max_int_satisfying_upper(v, strict));
        let value = match (lower_int, upper_int) {
            (Some(l), _) => l,
            (None, Some(u)) => u,
            (None, None) => 0,
        };
        assignment.insert(step.var, Rational::from_int(value));
    }
    Some(assignment)
}

/// Projects a constraint set onto the variables *not* in `vars`, by
/// eliminating exactly `vars` (in the given order) and keeping whatever
/// constraints remain instead of reducing all the way to a witness. This
/// is the textbook Fourier-Motzkin interpolant construction for a
/// conjunction of linear constraints.
fn project(constraints: Vec<(LinExpr, bool)>, vars: &[VarId]) -> Vec<(LinExpr, bool)> {
    let mut current = constraints;
    for &v in vars {
        let (next, _step) = eliminate_one(&current, v);
        current = next;
    }
    current
}

fn clause_to_constraints(clause: &[Literal]) -> (Vec<(LinExpr, bool)>, FxHashMap<VarId, bool>) {
    let mut constraints = Vec::new();
    let mut bools = FxHashMap::default();
    let mut consistent = true;
    for lit in clause {
        match lit {
            Literal::Bool(v, positive) => match bools.get(v) {
                Some(&existing) if existing != *positive => consistent = false,
                _ => {
                    bools.insert(*v, *positive);
                }
            },
            Literal::Arith(expr, Rel::Eq) => {
                constraints.push((expr.clone(), false));
                constraints.push((expr.clone().negate(), false));
            }
            Literal::Arith(expr, Rel::Le) => constraints.push((expr.clone(), false)),
            Literal::Arith(expr, Rel::Lt) => constraints.push((expr.clone(), true)),
        }
    }
    if !consistent {
        // force infeasibility: `0 < 0`.
        constraints.push((LinExpr::constant(Rational::ZERO), true));
    }
    (constraints, bools)
}

/// A single context scope: the assertions and variable/class tags added
/// since the matching `push` (scope `0` is the base, never popped).
#[derive(Default)]
struct Scope {
    terms: Vec<(Term, Class)>,
    var_classes: Vec<(VarId, Class)>,
}

/// Reference `Backend` implementation. See the module docs for its known
/// limitations.
pub struct NaiveBackend {
    scopes: Vec<Scope>,
    model: Option<Model>,
}

impl NaiveBackend {
    pub fn new() -> Self {
        NaiveBackend {
            scopes: vec![Scope::default()],
            model: None,
        }
    }

    fn all_terms(&self, class_filter: Option<Class>) -> Vec<Term> {
        self.scopes
            .iter()
            .flat_map(|s| s.terms.iter())
            .filter(|(_, c)| class_filter.map_or(true, |cf| *c == cf))
            .map(|(t, _)| *t)
            .collect()
    }

    fn class_of(&self, v: VarId) -> Option<Class> {
        for scope in self.scopes.iter().rev() {
            for (id, class) in scope.var_classes.iter().rev() {
                if *id == v {
                    return Some(*class);
                }
            }
        }
        None
    }
}

impl Default for NaiveBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for NaiveBackend {
    fn features(&self) -> BackendFeatures {
        BackendFeatures {
            generalization: true,
            interpolation: true,
            unsat_core: false,
        }
    }

    fn add_variable(&mut self, v: VarId, class: Class) {
        self.scopes
            .last_mut()
            .expect("base scope is never popped")
            .var_classes
            .push((v, class));
    }

    fn add(&mut self, _tm: &TermManager, f: Term, class: Class) {
        self.scopes
            .last_mut()
            .expect("base scope is never popped")
            .terms
            .push((f, class));
    }

    fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
        self.model = None;
    }

    fn check(&mut self, tm: &TermManager) -> CheckResult {
        let all = self.all_terms(None);
        let formula = Formula::And(all.iter().map(|&t| to_nnf(tm, t, false)).collect());
        let clauses = to_dnf(&formula);
        if clauses.len() > CLAUSE_CAP {
            self.model = None;
            return CheckResult::Unknown;
        }
        for clause in &clauses {
            let (constraints, bools) = clause_to_constraints(clause);
            if let Some(ints) = solve_constraints(constraints) {
                let ints = ints.into_iter().map(|(v, r)| (v, r.floor())).collect();
                self.model = Some(Model { ints, bools });
                return CheckResult::Sat;
            }
        }
        self.model = None;
        CheckResult::Unsat
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    fn generalize(&mut self, tm: &mut TermManager, direction: Direction) -> Option<Term> {
        let model = self.model.clone()?;
        let class = match direction {
            Direction::Backward => Class::A,
            Direction::Forward => Class::B,
        };
        let mut lits = Vec::new();
        let mut int_entries: Vec<_> = model.ints.into_iter().collect();
        int_entries.sort_unstable_by_key(|(v, _)| *v);
        for (v, value) in int_entries {
            if self.class_of(v) == Some(class) {
                let var_term = tm.var_term(v);
                let value_term = tm.mk_int(value);
                lits.push(tm.mk_eq(var_term, value_term));
            }
        }
        let mut bool_entries: Vec<_> = model.bools.into_iter().collect();
        bool_entries.sort_unstable_by_key(|(v, _)| *v);
        for (v, value) in bool_entries {
            if self.class_of(v) == Some(class) {
                let var_term = tm.var_term(v);
                lits.push(if value { var_term } else { tm.mk_not(var_term) });
            }
        }
        Some(tm.mk_and(lits))
    }

    fn interpolate(&mut self, tm: &mut TermManager) -> Option<Term> {
        let a_terms = self.all_terms(Some(Class::A));
        let b_terms = self.all_terms(Some(Class::B));

        let mut b_vars = Vec::new();
        for &t in &b_terms {
            tm.free_vars(t, &mut b_vars);
        }
        let b_set: FxHashSet<VarId> = b_vars.into_iter().collect();

        let mut a_vars = Vec::new();
        for &t in &a_terms {
            tm.free_vars(t, &mut a_vars);
        }
        let mut a_only: Vec<VarId> = a_vars.into_iter().filter(|v| !b_set.contains(v)).collect();
        a_only.sort_unstable();
        a_only.dedup();

        // Only the conjunctive fragment of the `A` side is projected
        // exactly (module docs): we take the formula's first DNF clause as
        // its representative conjunction rather than disjoin over all of
        // them, which is sound for the cube-shaped assertions the pd-kind
        // driver actually builds out of frames and transition unrollings.
        let formula = Formula::And(a_terms.iter().map(|&t| to_nnf(tm, t, false)).collect());
        let clauses = to_dnf(&formula);
        let clause = clauses.first()?;
        let (constraints, _bools) = clause_to_constraints(clause);

        let projected = project(constraints, &a_only);
        let zero = tm.mk_int(0);
        let mut atoms = Vec::new();
        for (expr, strict) in projected {
            let expr_term = expr.to_term(tm);
            let rel = if strict { Rel::Lt } else { Rel::Le };
            atoms.push(tm.mk_atom(rel, expr_term, zero));
        }
        Some(tm.mk_and(atoms))
    }
}
