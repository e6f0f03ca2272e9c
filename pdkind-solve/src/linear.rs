//! Linear arithmetic term <-> coefficient-map conversion for the naive
//! backend (`backend::naive`). Restricted to the fragment `pdkind-term`
//! actually constructs for arithmetic: `Var`, `IntConst`, `Add`, `Mul`.

use crate::rational::Rational;
use pdkind_term::{Term, TermManager, VarId};
use rustc_hash::FxHashMap;

/// `sum(coeffs[v] * v) + constant`, normalized (zero coefficients dropped).
#[derive(Clone, Debug)]
pub struct LinExpr {
    pub coeffs: FxHashMap<VarId, Rational>,
    pub constant: Rational,
}

impl LinExpr {
    pub fn constant(value: Rational) -> Self {
        LinExpr {
            coeffs: FxHashMap::default(),
            constant: value,
        }
    }

    pub fn var(id: VarId) -> Self {
        let mut coeffs = FxHashMap::default();
        coeffs.insert(id, Rational::from_int(1));
        LinExpr {
            coeffs,
            constant: Rational::ZERO,
        }
    }

    pub fn add(mut self, other: &LinExpr) -> Self {
        for (&v, &c) in &other.coeffs {
            let entry = self.coeffs.entry(v).or_insert(Rational::ZERO);
            *entry = *entry + c;
        }
        self.constant = self.constant + other.constant;
        self.normalize()
    }

    pub fn scale(mut self, k: Rational) -> Self {
        for c in self.coeffs.values_mut() {
            *c = *c * k;
        }
        self.constant = self.constant * k;
        self.normalize()
    }

    pub fn negate(self) -> Self {
        self.scale(Rational::from_int(-1))
    }

    fn normalize(mut self) -> Self {
        self.coeffs.retain(|_, c| !c.is_zero());
        self
    }

    pub fn coeff_of(&self, v: VarId) -> Rational {
        self.coeffs.get(&v).copied().unwrap_or(Rational::ZERO)
    }

    /// `self` with `v`'s term dropped, i.e. the part of the expression not
    /// involving `v`.
    pub fn without(&self, v: VarId) -> LinExpr {
        let mut coeffs = self.coeffs.clone();
        coeffs.remove(&v);
        LinExpr {
            coeffs,
            constant: self.constant,
        }
    }

    pub fn evaluate(&self, assignment: &FxHashMap<VarId, Rational>) -> Option<Rational> {
        let mut total = self.constant;
        for (&v, &c) in &self.coeffs {
            let value = *assignment.get(&v)?;
            total = total + c * value;
        }
        Some(total)
    }

    /// Renders `self` as an arena term, after scaling every coefficient by
    /// the least common multiple of its denominators so every `Mul` built
    /// carries an integer coefficient (`pdkind_term::TermManager::mk_mul`
    /// only accepts `i64`).
    pub fn to_term(&self, tm: &mut TermManager) -> Term {
        let dens: Vec<i64> = self
            .coeffs
            .values()
            .chain(std::iter::once(&self.constant))
            .map(|r| r.denominator())
            .collect();
        let scale = dens.into_iter().fold(1i64, lcm);
        let scaled = self.clone().scale(Rational::from_int(scale));
        let mut terms = Vec::new();
        let mut entries: Vec<_> = scaled.coeffs.into_iter().collect();
        entries.sort_by_key(|(v, _)| *v);
        for (v, c) in entries {
            debug_assert!(c.is_integer());
            let var_term = tm.var_term(v);
            terms.push(tm.mk_mul(c.floor(), var_term));
        }
        if !scaled.constant.is_zero() || terms.is_empty() {
            debug_assert!(scaled.constant.is_integer());
            terms.push(tm.mk_int(scaled.constant.floor()));
        }
        tm.mk_add(terms)
    }
}

fn lcm(a: i64, b: i64) -> i64 {
    fn gcd(a: i64, b: i64) -> i64 {
        if b == 0 {
            a
        } else {
            gcd(b, a % b)
        }
    }
    a / gcd(a, b) * b
}

/// Walks an arithmetic term built from `Var`/`IntConst`/`Add`/`Mul` into a
/// coefficient map. `None` if `t` is not in that fragment (e.g. a boolean
/// subterm reached by mistake).
pub fn term_to_linexpr(tm: &TermManager, t: Term) -> Option<LinExpr> {
    use pdkind_term::Sort;
    if let Some(id) = tm.var_id(t) {
        return match tm.var_sort(id) {
            Sort::Int => Some(LinExpr::var(id)),
            Sort::Bool => None,
        };
    }
    if let Some(v) = tm.int_const(t) {
        return Some(LinExpr::constant(Rational::from_int(v)));
    }
    if let Some(summands) = tm.add_summands(t) {
        let mut acc = LinExpr::constant(Rational::ZERO);
        for s in summands {
            acc = acc.add(&term_to_linexpr(tm, s)?);
        }
        return Some(acc);
    }
    if let Some((coeff, inner)) = tm.mul_factor(t) {
        let inner = term_to_linexpr(tm, inner)?;
        return Some(inner.scale(Rational::from_int(coeff)));
    }
    None
}
