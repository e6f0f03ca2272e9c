use crate::gc::RelocationMap;
use crate::{Rel, Sort, Substitution, Term, TermData, VarId, VarInfo};
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

/// Owns the arena of interned terms and the table of declared variables.
///
/// Hash-conses every constructed node, so structurally equal terms always
/// get the same [`Term`] handle — this is what lets provenance edges and
/// frame membership tests (spec.md §4.5: "idempotent; if `L` ∈ `F_level`
/// nothing happens") use plain equality on `Term`.
pub struct TermManager {
    arena: Vec<TermData>,
    dedup: FxHashMap<TermData, Term>,
    vars: Vec<VarInfo>,
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TermManager {
    pub fn new() -> Self {
        TermManager {
            arena: Vec::new(),
            dedup: FxHashMap::default(),
            vars: Vec::new(),
        }
    }

    fn intern(&mut self, data: TermData) -> Term {
        if let Some(&t) = self.dedup.get(&data) {
            return t;
        }
        let t = Term::from_index(self.arena.len());
        self.arena.push(data.clone());
        self.dedup.insert(data, t);
        t
    }

    pub(crate) fn data(&self, t: Term) -> &TermData {
        &self.arena[t.index()]
    }

    // ---- variable declaration -------------------------------------------------

    pub fn fresh_var(&mut self, name: impl Into<String>, sort: Sort) -> Term {
        let id = VarId::from_index(self.vars.len());
        self.vars.push(VarInfo {
            name: name.into(),
            sort,
        });
        self.intern(TermData::Var(id))
    }

    pub fn var_id(&self, t: Term) -> Option<VarId> {
        match self.data(t) {
            TermData::Var(id) => Some(*id),
            _ => None,
        }
    }

    pub fn var_name(&self, id: VarId) -> &str {
        &self.vars[id.index()].name
    }

    pub fn var_sort(&self, id: VarId) -> Sort {
        self.vars[id.index()].sort
    }

    // ---- constructors (spec.md §4.1: ∧, ∨, ¬, =, standard normalization) -----

    pub fn mk_bool(&mut self, b: bool) -> Term {
        self.intern(TermData::BoolConst(b))
    }

    pub fn mk_int(&mut self, v: i64) -> Term {
        self.intern(TermData::IntConst(v))
    }

    pub fn mk_not(&mut self, t: Term) -> Term {
        match self.data(t).clone() {
            TermData::BoolConst(b) => self.mk_bool(!b),
            TermData::Not(inner) => inner,
            _ => self.intern(TermData::Not(t)),
        }
    }

    /// Builds `∧` of `terms`, flattening nested conjunctions, dropping
    /// `true`, short-circuiting on `false`, deduplicating, and sorting by
    /// term id for a canonical representation (spec.md §4.1: "standard
    /// algebraic normalization").
    pub fn mk_and(&mut self, terms: impl IntoIterator<Item = Term>) -> Term {
        let mut flat = Vec::new();
        for t in terms {
            self.flatten_and(t, &mut flat);
        }
        flat.sort_unstable();
        flat.dedup();
        if flat.iter().any(|&t| matches!(self.data(t), TermData::BoolConst(false))) {
            return self.mk_bool(false);
        }
        flat.retain(|&t| !matches!(self.data(t), TermData::BoolConst(true)));
        match flat.len() {
            0 => self.mk_bool(true),
            1 => flat[0],
            _ => self.intern(TermData::And(flat)),
        }
    }

    fn flatten_and(&self, t: Term, out: &mut Vec<Term>) {
        match self.data(t) {
            TermData::And(ts) => {
                let ts = ts.clone();
                for sub in ts {
                    self.flatten_and(sub, out);
                }
            }
            _ => out.push(t),
        }
    }

    pub fn mk_or(&mut self, terms: impl IntoIterator<Item = Term>) -> Term {
        let mut flat = Vec::new();
        for t in terms {
            self.flatten_or(t, &mut flat);
        }
        flat.sort_unstable();
        flat.dedup();
        if flat.iter().any(|&t| matches!(self.data(t), TermData::BoolConst(true))) {
            return self.mk_bool(true);
        }
        flat.retain(|&t| !matches!(self.data(t), TermData::BoolConst(false)));
        match flat.len() {
            0 => self.mk_bool(false),
            1 => flat[0],
            _ => self.intern(TermData::Or(flat)),
        }
    }

    fn flatten_or(&self, t: Term, out: &mut Vec<Term>) {
        match self.data(t) {
            TermData::Or(ts) => {
                let ts = ts.clone();
                for sub in ts {
                    self.flatten_or(sub, out);
                }
            }
            _ => out.push(t),
        }
    }

    pub fn mk_implies(&mut self, a: Term, b: Term) -> Term {
        let not_a = self.mk_not(a);
        self.mk_or([not_a, b])
    }

    /// Builds `lhs rel rhs`, canonicalizing `Eq` by ordering its operands
    /// (equality is commutative, so `a = b` and `b = a` must intern to the
    /// same term).
    pub fn mk_atom(&mut self, rel: Rel, lhs: Term, rhs: Term) -> Term {
        if let (TermData::IntConst(a), TermData::IntConst(b)) =
            (self.data(lhs).clone(), self.data(rhs).clone())
        {
            let holds = match rel {
                Rel::Eq => a == b,
                Rel::Le => a <= b,
                Rel::Lt => a < b,
            };
            return self.mk_bool(holds);
        }
        let (lhs, rhs) = match rel {
            Rel::Eq if lhs > rhs => (rhs, lhs),
            _ => (lhs, rhs),
        };
        if rel == Rel::Eq && lhs == rhs {
            return self.mk_bool(true);
        }
        self.intern(TermData::Atom(rel, lhs, rhs))
    }

    pub fn mk_eq(&mut self, lhs: Term, rhs: Term) -> Term {
        self.mk_atom(Rel::Eq, lhs, rhs)
    }

    pub fn mk_add(&mut self, terms: impl IntoIterator<Item = Term>) -> Term {
        let mut flat = Vec::new();
        let mut constant = 0i64;
        for t in terms {
            self.flatten_add(t, &mut flat, &mut constant);
        }
        flat.sort_unstable();
        if constant != 0 {
            flat.push(self.mk_int(constant));
            flat.sort_unstable();
        }
        match flat.len() {
            0 => self.mk_int(0),
            1 => flat[0],
            _ => self.intern(TermData::Add(flat)),
        }
    }

    fn flatten_add(&self, t: Term, out: &mut Vec<Term>, constant: &mut i64) {
        match self.data(t).clone() {
            TermData::Add(ts) => {
                for sub in ts {
                    self.flatten_add(sub, out, constant);
                }
            }
            TermData::IntConst(v) => *constant += v,
            _ => out.push(t),
        }
    }

    pub fn mk_mul(&mut self, coeff: i64, t: Term) -> Term {
        if coeff == 0 {
            return self.mk_int(0);
        }
        if coeff == 1 {
            return t;
        }
        match self.data(t).clone() {
            TermData::IntConst(v) => self.mk_int(coeff * v),
            TermData::Mul(c, inner) => self.intern(TermData::Mul(coeff * c, inner)),
            _ => self.intern(TermData::Mul(coeff, t)),
        }
    }

    /// The existing term for an already-declared variable (as opposed to
    /// [`TermManager::fresh_var`], which declares a new one). Used to
    /// rebuild a `Term` from a bare `VarId`, e.g. when a backend reports a
    /// model or a generalized cube back in terms of variable identities.
    pub fn var_term(&mut self, id: VarId) -> Term {
        self.intern(TermData::Var(id))
    }

    // ---- structural inspectors (spec.md §4.2: backends walk terms built by
    // this crate without depending on its internal representation) ---------

    pub fn int_const(&self, t: Term) -> Option<i64> {
        match self.data(t) {
            TermData::IntConst(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bool_const(&self, t: Term) -> Option<bool> {
        match self.data(t) {
            TermData::BoolConst(b) => Some(*b),
            _ => None,
        }
    }

    pub fn not_inner(&self, t: Term) -> Option<Term> {
        match self.data(t) {
            TermData::Not(inner) => Some(*inner),
            _ => None,
        }
    }

    pub fn and_parts(&self, t: Term) -> Option<&[Term]> {
        match self.data(t) {
            TermData::And(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn or_parts(&self, t: Term) -> Option<&[Term]> {
        match self.data(t) {
            TermData::Or(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn atom_parts(&self, t: Term) -> Option<(Rel, Term, Term)> {
        match self.data(t) {
            TermData::Atom(rel, a, b) => Some((*rel, *a, *b)),
            _ => None,
        }
    }

    pub fn add_summands(&self, t: Term) -> Option<Vec<Term>> {
        match self.data(t) {
            TermData::Add(ts) => Some(ts.clone()),
            _ => None,
        }
    }

    pub fn mul_factor(&self, t: Term) -> Option<(i64, Term)> {
        match self.data(t) {
            TermData::Mul(c, inner) => Some((*c, *inner)),
            _ => None,
        }
    }

    // ---- contract operations (spec.md §4.1) -----------------------------------

    /// `conjuncts(F) -> [T]`
    pub fn conjuncts(&self, t: Term) -> Vec<Term> {
        let mut out = Vec::new();
        self.flatten_and(t, &mut out);
        out
    }

    /// `disjuncts(F) -> [T]`
    pub fn disjuncts(&self, t: Term) -> Vec<Term> {
        let mut out = Vec::new();
        self.flatten_or(t, &mut out);
        out
    }

    /// `substitute(F, σ)`: rewrites every free variable occurrence through
    /// `subst`, leaving variables it does not mention untouched.
    pub fn substitute(&mut self, t: Term, subst: &Substitution) -> Term {
        let mut cache = FxHashMap::default();
        self.substitute_rec(t, subst, &mut cache)
    }

    fn substitute_rec(
        &mut self,
        t: Term,
        subst: &Substitution,
        cache: &mut FxHashMap<Term, Term>,
    ) -> Term {
        if let Some(&cached) = cache.get(&t) {
            return cached;
        }
        let result = match self.data(t).clone() {
            TermData::Var(id) => subst.get(&id).copied().unwrap_or(t),
            TermData::BoolConst(_) | TermData::IntConst(_) => t,
            TermData::Not(inner) => {
                let inner = self.substitute_rec(inner, subst, cache);
                self.mk_not(inner)
            }
            TermData::And(ts) => {
                let ts: Vec<_> = ts
                    .into_iter()
                    .map(|x| self.substitute_rec(x, subst, cache))
                    .collect();
                self.mk_and(ts)
            }
            TermData::Or(ts) => {
                let ts: Vec<_> = ts
                    .into_iter()
                    .map(|x| self.substitute_rec(x, subst, cache))
                    .collect();
                self.mk_or(ts)
            }
            TermData::Atom(rel, a, b) => {
                let a = self.substitute_rec(a, subst, cache);
                let b = self.substitute_rec(b, subst, cache);
                self.mk_atom(rel, a, b)
            }
            TermData::Add(ts) => {
                let ts: Vec<_> = ts
                    .into_iter()
                    .map(|x| self.substitute_rec(x, subst, cache))
                    .collect();
                self.mk_add(ts)
            }
            TermData::Mul(c, inner) => {
                let inner = self.substitute_rec(inner, subst, cache);
                self.mk_mul(c, inner)
            }
        };
        cache.insert(t, result);
        result
    }

    /// Every free [`VarId`] mentioned in `t`.
    pub fn free_vars(&self, t: Term, out: &mut Vec<VarId>) {
        match self.data(t) {
            TermData::Var(id) => out.push(*id),
            TermData::BoolConst(_) | TermData::IntConst(_) => {}
            TermData::Not(inner) => self.free_vars(*inner, out),
            TermData::And(ts) | TermData::Or(ts) | TermData::Add(ts) => {
                for t in ts {
                    self.free_vars(*t, out);
                }
            }
            TermData::Atom(_, a, b) => {
                self.free_vars(*a, out);
                self.free_vars(*b, out);
            }
            TermData::Mul(_, inner) => self.free_vars(*inner, out),
        }
    }

    /// Renders `t` as an s-expression-ish string, for `term_to_string` in
    /// the embedding API (spec.md §6.1) and for test assertions.
    pub fn to_string(&self, t: Term) -> String {
        let mut out = String::new();
        self.write_term(t, &mut out);
        out
    }

    fn write_term(&self, t: Term, out: &mut String) {
        match self.data(t) {
            TermData::Var(id) => {
                let _ = write!(out, "{}", self.var_name(*id));
            }
            TermData::BoolConst(b) => {
                let _ = write!(out, "{b}");
            }
            TermData::IntConst(v) => {
                let _ = write!(out, "{v}");
            }
            TermData::Not(inner) => {
                out.push_str("(not ");
                self.write_term(*inner, out);
                out.push(')');
            }
            TermData::And(ts) => self.write_nary("and", ts, out),
            TermData::Or(ts) => self.write_nary("or", ts, out),
            TermData::Add(ts) => self.write_nary("+", ts, out),
            TermData::Atom(rel, a, b) => {
                let _ = write!(out, "({rel} ");
                self.write_term(*a, out);
                out.push(' ');
                self.write_term(*b, out);
                out.push(')');
            }
            TermData::Mul(c, inner) => {
                let _ = write!(out, "(* {c} ");
                self.write_term(*inner, out);
                out.push(')');
            }
        }
    }

    fn write_nary(&self, op: &str, ts: &[Term], out: &mut String) {
        let _ = write!(out, "({op}");
        for t in ts {
            out.push(' ');
            self.write_term(*t, out);
        }
        out.push(')');
    }

    // ---- garbage collection (spec.md §4.1, §5) --------------------------------

    /// Mark-and-sweep collection rooted at `roots`: compacts the arena to
    /// only the terms reachable from `roots` and returns the map callers
    /// must use to relocate every stored [`Term`] they own (frames,
    /// obligations, provenance, cex nodes — spec.md §9 "GC integration").
    pub fn gc(&mut self, roots: &[Term]) -> RelocationMap {
        let mut reachable = vec![false; self.arena.len()];
        let mut stack: Vec<Term> = roots.to_vec();
        while let Some(t) = stack.pop() {
            if reachable[t.index()] {
                continue;
            }
            reachable[t.index()] = true;
            match self.data(t).clone() {
                TermData::Var(_) | TermData::BoolConst(_) | TermData::IntConst(_) => {}
                TermData::Not(inner) | TermData::Mul(_, inner) => stack.push(inner),
                TermData::And(ts) | TermData::Or(ts) | TermData::Add(ts) => stack.extend(ts),
                TermData::Atom(_, a, b) => {
                    stack.push(a);
                    stack.push(b);
                }
            }
        }

        let mut new_arena = Vec::new();
        let mut old_to_new = vec![None; self.arena.len()];
        // Relocate in original order so dependency terms (which always have
        // a smaller index than their parents, by construction) are placed
        // before their users.
        for (old_index, keep) in reachable.iter().enumerate() {
            if *keep {
                let new_term = Term::from_index(new_arena.len());
                old_to_new[old_index] = Some(new_term);
                new_arena.push(self.arena[old_index].clone());
            }
        }
        for data in &mut new_arena {
            relocate_data(data, &old_to_new);
        }

        self.dedup.clear();
        for (index, data) in new_arena.iter().enumerate() {
            self.dedup.insert(data.clone(), Term::from_index(index));
        }
        self.arena = new_arena;

        RelocationMap::new(old_to_new)
    }
}

fn relocate_data(data: &mut TermData, old_to_new: &[Option<Term>]) {
    let fix = |t: &mut Term| *t = old_to_new[t.index()].expect("relocated term must be reachable");
    match data {
        TermData::Var(_) | TermData::BoolConst(_) | TermData::IntConst(_) => {}
        TermData::Not(inner) | TermData::Mul(_, inner) => fix(inner),
        TermData::And(ts) | TermData::Or(ts) | TermData::Add(ts) => ts.iter_mut().for_each(fix),
        TermData::Atom(_, a, b) => {
            fix(a);
            fix(b);
        }
    }
}
