//! Lowers a [`Sexpr`] into a `pdkind_term::Term` against a fixed variable
//! environment. Shared by the `mcmt` and `chc` surface dialects (spec.md
//! §6.2; `SPEC_FULL.md` §1) — both eventually need "parse an arithmetic
//! and boolean formula", they differ only in where the environment comes
//! from and what the surrounding forms look like.
//!
//! Restricted to the fragment `pdkind-solve`'s reference backend actually
//! decides: booleans and linear integer arithmetic (`pdkind_term::Sort`).

use super::sexpr::Sexpr;
use pdkind_ir::Error;
use pdkind_term::{Rel, Term, TermManager};
use rustc_hash::FxHashMap;

pub type Env = FxHashMap<String, Term>;

pub fn term_from_sexpr(tm: &mut TermManager, env: &Env, sx: &Sexpr) -> Result<Term, Error> {
    match sx {
        Sexpr::Atom(s) => atom_term(tm, env, s),
        Sexpr::List(items) => list_term(tm, env, items),
    }
}

fn atom_term(tm: &mut TermManager, env: &Env, s: &str) -> Result<Term, Error> {
    match s {
        "true" => Ok(tm.mk_bool(true)),
        "false" => Ok(tm.mk_bool(false)),
        _ => {
            if let Ok(v) = s.parse::<i64>() {
                return Ok(tm.mk_int(v));
            }
            env.get(s)
                .copied()
                .ok_or_else(|| Error::Parse(format!("unbound identifier '{s}'")))
        }
    }
}

fn list_term(tm: &mut TermManager, env: &Env, items: &[Sexpr]) -> Result<Term, Error> {
    let (head, args) = items
        .split_first()
        .ok_or_else(|| Error::Parse("empty application".into()))?;
    let op = head
        .atom()
        .ok_or_else(|| Error::Parse("expected an operator symbol".into()))?;

    let mut lowered = Vec::with_capacity(args.len());
    for a in args {
        lowered.push(term_from_sexpr(tm, env, a)?);
    }

    match (op, lowered.len()) {
        ("not", 1) => Ok(tm.mk_not(lowered[0])),
        ("and", _) => Ok(tm.mk_and(lowered)),
        ("or", _) => Ok(tm.mk_or(lowered)),
        ("=>", 2) => Ok(tm.mk_implies(lowered[0], lowered[1])),
        ("=", 2) => Ok(tm.mk_eq(lowered[0], lowered[1])),
        ("<=", 2) => Ok(tm.mk_atom(Rel::Le, lowered[0], lowered[1])),
        ("<", 2) => Ok(tm.mk_atom(Rel::Lt, lowered[0], lowered[1])),
        (">=", 2) => Ok(tm.mk_atom(Rel::Le, lowered[1], lowered[0])),
        (">", 2) => Ok(tm.mk_atom(Rel::Lt, lowered[1], lowered[0])),
        ("+", _) => Ok(tm.mk_add(lowered)),
        ("-", 1) => Ok(tm.mk_mul(-1, lowered[0])),
        ("-", 2) => {
            let negated = tm.mk_mul(-1, lowered[1]);
            Ok(tm.mk_add([lowered[0], negated]))
        }
        ("*", 2) => mk_linear_mul(tm, &items[1], &items[2], lowered[0], lowered[1]),
        (op, n) => Err(Error::Parse(format!(
            "unsupported operator '{op}' with {n} argument(s)"
        ))),
    }
}

/// `(* <int-literal> <term>)` or `(* <term> <int-literal>)`: the only
/// multiplication the reference decision procedure understands is by a
/// constant coefficient (spec.md §4.2's fragment is linear arithmetic).
fn mk_linear_mul(
    tm: &mut TermManager,
    lhs_sx: &Sexpr,
    rhs_sx: &Sexpr,
    lhs: Term,
    rhs: Term,
) -> Result<Term, Error> {
    if let Some(coeff) = int_literal(lhs_sx) {
        return Ok(tm.mk_mul(coeff, rhs));
    }
    if let Some(coeff) = int_literal(rhs_sx) {
        return Ok(tm.mk_mul(coeff, lhs));
    }
    let _ = (lhs, rhs);
    Err(Error::Parse(
        "'*' requires one integer-literal operand (only linear terms are supported)".into(),
    ))
}

fn int_literal(sx: &Sexpr) -> Option<i64> {
    sx.atom().and_then(|s| s.parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::sexpr::parse_all;
    use pdkind_term::Sort;

    #[test]
    fn lowers_linear_arithmetic_and_booleans() {
        let mut tm = TermManager::new();
        let x = tm.fresh_var("x", Sort::Int);
        let mut env = Env::default();
        env.insert("x".to_string(), x);

        let forms = parse_all("(and (<= 0 x) (not (= x 1)))").unwrap();
        let t = term_from_sexpr(&mut tm, &env, &forms[0]).unwrap();

        let zero = tm.mk_int(0);
        let one = tm.mk_int(1);
        let expected = tm.mk_and([tm.mk_atom(Rel::Le, zero, x), {
            let eq = tm.mk_eq(x, one);
            tm.mk_not(eq)
        }]);
        assert_eq!(t, expected);
    }

    #[test]
    fn rejects_unbound_identifier() {
        let mut tm = TermManager::new();
        let env = Env::default();
        let forms = parse_all("y").unwrap();
        assert!(term_from_sexpr(&mut tm, &env, &forms[0]).is_err());
    }

    #[test]
    fn multiplication_requires_a_constant_operand() {
        let mut tm = TermManager::new();
        let x = tm.fresh_var("x", Sort::Int);
        let y = tm.fresh_var("y", Sort::Int);
        let mut env = Env::default();
        env.insert("x".to_string(), x);
        env.insert("y".to_string(), y);
        let forms = parse_all("(* x y)").unwrap();
        assert!(term_from_sexpr(&mut tm, &env, &forms[0]).is_err());
    }
}
