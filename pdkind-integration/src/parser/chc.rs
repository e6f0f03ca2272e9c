//! Constrained Horn clauses, lowered to a `pdkind_ir::TransitionSystem`
//! (spec.md §8 scenario S5). Grounded on
//! `original_source/src/parser/chc/chc_system.cpp`'s `to_transition_system`,
//! but deliberately narrower: that lowering supports arbitrarily many
//! rules, existential ("additional") variables not among a predicate's
//! arguments, and multiple candidate predicates. Here exactly one
//! uninterpreted predicate is supported, with exactly two defining rules
//! (init and transition) and one query rule — the shape spec.md's S5
//! scenario needs. Anything wider is rejected with a parse error rather
//! than half-handled; CHC parsing sits outside the core's scope (spec.md
//! §1 Non-goals), so this bound is a frontend choice, not a core one.
//!
//! Surface syntax:
//!
//! ```text
//! (rule (<pred> <var> ...) <body>)   ; a defining rule for <pred>
//! (rule false <body>)                ; the query: <body> => false
//! ```
//!
//! A defining rule is the *init* rule if `<body>` contains no application
//! of `<pred>`; otherwise it is the *transition* rule, and `<body>` must
//! contain exactly one application of `<pred>` (the predecessor state).
//! All predicate arguments must be bare variable names (no nested terms),
//! matching the common Horn encoding of a transition relation.

use super::sexpr::Sexpr;
use super::term::{term_from_sexpr, Env};
use pdkind_ir::{Error, StateType, TransitionSystem, VarDecl};
use pdkind_term::{Sort, TermManager};

pub fn parse(tm: &mut TermManager, text: &str) -> Result<TransitionSystem, Error> {
    let forms = super::sexpr::parse_all(text)?;
    let rules = forms
        .iter()
        .map(parse_rule)
        .collect::<Result<Vec<_>, _>>()?;

    let pred_name = single_predicate_name(&rules)?;

    let defining: Vec<&Rule> = rules
        .iter()
        .filter(|r| matches!(&r.head, Head::Predicate(name, _) if *name == pred_name))
        .collect();
    let queries: Vec<&Rule> = rules.iter().filter(|r| r.head == Head::Query).collect();

    if defining.len() != 2 {
        return Err(Error::Parse(format!(
            "expected exactly 2 defining rules for '{pred_name}', found {}",
            defining.len()
        )));
    }
    if queries.len() != 1 {
        return Err(Error::Parse(format!(
            "expected exactly 1 query rule, found {}",
            queries.len()
        )));
    }

    let conjuncts = |sx: &Sexpr| -> Vec<Sexpr> { split_conjuncts(sx) };

    // Split the two defining rules into init (no recursive call) and
    // transition (exactly one recursive call) by inspecting their bodies.
    let mut init_rule = None;
    let mut trans_rule = None;
    for rule in &defining {
        let head_args = match &rule.head {
            Head::Predicate(_, args) => args,
            Head::Query => unreachable!(),
        };
        let parts = conjuncts(&rule.body);
        let call = find_predicate_call(&parts, &pred_name);
        match call {
            None => {
                if init_rule.is_some() {
                    return Err(Error::Parse("two non-recursive defining rules".into()));
                }
                init_rule = Some((head_args.clone(), parts));
            }
            Some(_) => {
                if trans_rule.is_some() {
                    return Err(Error::Parse("two recursive defining rules".into()));
                }
                trans_rule = Some((head_args.clone(), parts));
            }
        }
    }
    let (init_head_args, init_parts) =
        init_rule.ok_or_else(|| Error::Parse("no non-recursive (init) defining rule".into()))?;
    let (trans_head_args, trans_parts) =
        trans_rule.ok_or_else(|| Error::Parse("no recursive (transition) defining rule".into()))?;

    let arity = init_head_args.len();
    if trans_head_args.len() != arity {
        return Err(Error::Parse(
            "defining rules disagree on predicate arity".into(),
        ));
    }

    // The predicate's argument names, in the order the init rule's head
    // declares them, become the state variables.
    let decls: Vec<VarDecl> = init_head_args
        .iter()
        .map(|name| VarDecl::new(name.clone(), Sort::Int))
        .collect();
    let state_type = StateType::new(tm, &decls);
    let current_env: Env = state_type
        .names()
        .iter()
        .cloned()
        .zip(state_type.variables(pdkind_ir::Namespace::Current).iter().copied())
        .collect();

    // Init: rename the init rule's head arg names onto the current
    // namespace and lower every conjunct except the (absent) recursive
    // call.
    let init_env: Env = init_head_args
        .iter()
        .cloned()
        .zip(state_type.variables(pdkind_ir::Namespace::Current).iter().copied())
        .collect();
    let init_terms = init_parts
        .iter()
        .map(|p| term_from_sexpr(tm, &init_env, p))
        .collect::<Result<Vec<_>, _>>()?;
    let init = tm.mk_and(init_terms);

    // Transition: the recursive call's argument names denote the
    // predecessor (current) state, the transition rule's own head args
    // denote the successor (next) state.
    let (call_index, call_args) = find_predicate_call(&trans_parts, &pred_name)
        .expect("trans_rule was selected because it has exactly one recursive call");
    if call_args.len() != arity {
        return Err(Error::Parse(
            "recursive call arity does not match predicate arity".into(),
        ));
    }
    let mut trans_env: Env = call_args
        .iter()
        .cloned()
        .zip(state_type.variables(pdkind_ir::Namespace::Current).iter().copied())
        .collect();
    for (name, &term) in trans_head_args.iter().zip(state_type.variables(pdkind_ir::Namespace::Next)) {
        trans_env.insert(format!("{name}'"), term);
    }
    let trans_terms = trans_parts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != call_index)
        .map(|(_, p)| term_from_sexpr(tm, &trans_env, p))
        .collect::<Result<Vec<_>, _>>()?;
    let trans = tm.mk_and(trans_terms);

    // Query: `p(x) ∧ bad(x) => false`, i.e. the safety property is
    // `p(x) => ¬bad(x)`. The property itself is not part of a
    // `TransitionSystem` (spec.md §3 keeps `Init`/`Trans` as the only
    // system-level data); callers recover it via [`query_property`].
    let _ = &queries;
    Ok(TransitionSystem::new(state_type, init, trans))
}

/// The safety property implied by the query rule, over the *current*
/// namespace of the state type `parse` just built — kept separate from
/// [`parse`]'s return value because `TransitionSystem` has no field for
/// it (spec.md §3).
pub fn query_property(tm: &mut TermManager, state_type: &StateType, text: &str) -> Result<pdkind_term::Term, Error> {
    let forms = super::sexpr::parse_all(text)?;
    let rules = forms
        .iter()
        .map(parse_rule)
        .collect::<Result<Vec<_>, _>>()?;
    let pred_name = single_predicate_name(&rules)?;
    let query = rules
        .iter()
        .find(|r| r.head == Head::Query)
        .ok_or_else(|| Error::Parse("no query rule found".into()))?;

    let parts = split_conjuncts(&query.body);
    let (call_index, call_args) = find_predicate_call(&parts, &pred_name)
        .ok_or_else(|| Error::Parse("query rule body has no predicate application".into()))?;
    let env: Env = call_args
        .iter()
        .cloned()
        .zip(state_type.variables(pdkind_ir::Namespace::Current).iter().copied())
        .collect();
    let bad_terms = parts
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != call_index)
        .map(|(_, p)| term_from_sexpr(tm, &env, p))
        .collect::<Result<Vec<_>, _>>()?;
    let bad = tm.mk_and(bad_terms);
    Ok(tm.mk_not(bad))
}

#[derive(PartialEq, Eq, Debug)]
enum Head {
    Query,
    Predicate(String, Vec<String>),
}

struct Rule {
    head: Head,
    body: Sexpr,
}

/// The name of the one uninterpreted predicate every defining rule's head
/// must share — a parse error if the rules name more than one (this
/// frontend's deliberate narrowing to a single-predicate program, see the
/// module doc comment).
fn single_predicate_name(rules: &[Rule]) -> Result<String, Error> {
    let mut name = None;
    for rule in rules {
        if let Head::Predicate(n, _) = &rule.head {
            match &name {
                None => name = Some(n.clone()),
                Some(existing) if existing != n => {
                    return Err(Error::Parse(format!(
                        "expected a single predicate, found '{existing}' and '{n}'"
                    )))
                }
                Some(_) => {}
            }
        }
    }
    name.ok_or_else(|| Error::Parse("no predicate-defining rule found".into()))
}

fn parse_rule(form: &Sexpr) -> Result<Rule, Error> {
    let items = form
        .list()
        .ok_or_else(|| Error::Parse("expected a (rule ...) form".into()))?;
    match items {
        [kw, head, body] if kw.atom() == Some("rule") => {
            let head = parse_head(head)?;
            Ok(Rule {
                head,
                body: body.clone(),
            })
        }
        _ => Err(Error::Parse("expected (rule <head> <body>)".into())),
    }
}

fn parse_head(sx: &Sexpr) -> Result<Head, Error> {
    if sx.atom() == Some("false") {
        return Ok(Head::Query);
    }
    let items = sx
        .list()
        .ok_or_else(|| Error::Parse("expected a predicate application or 'false'".into()))?;
    let (name, args) = items
        .split_first()
        .ok_or_else(|| Error::Parse("empty rule head".into()))?;
    let name = name
        .atom()
        .ok_or_else(|| Error::Parse("predicate name must be a symbol".into()))?
        .to_string();
    let args = args
        .iter()
        .map(|a| {
            a.atom()
                .map(str::to_string)
                .ok_or_else(|| Error::Parse("predicate arguments must be bare variables".into()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Head::Predicate(name, args))
}

/// Splits a rule body into top-level conjuncts, flattening nested `and`.
fn split_conjuncts(sx: &Sexpr) -> Vec<Sexpr> {
    match sx.list() {
        Some([kw, rest @ ..]) if kw.atom() == Some("and") => {
            rest.iter().flat_map(split_conjuncts).collect()
        }
        _ => vec![sx.clone()],
    }
}

/// Finds the single conjunct that applies `pred_name`, returning its
/// index into `parts` and its (bare-variable) arguments.
fn find_predicate_call(parts: &[Sexpr], pred_name: &str) -> Option<(usize, Vec<String>)> {
    parts.iter().enumerate().find_map(|(i, p)| {
        let items = p.list()?;
        let (name, args) = items.split_first()?;
        if name.atom()? != pred_name {
            return None;
        }
        let args = args
            .iter()
            .map(|a| a.atom().map(str::to_string))
            .collect::<Option<Vec<_>>>()?;
        Some((i, args))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER_CHC: &str = "
        (rule (p x) (= x 0))
        (rule (p xn) (and (p x) (= xn (+ x 1))))
        (rule false (and (p x) (< x 0)))
    ";

    #[test]
    fn lowers_a_single_predicate_system() {
        let mut tm = TermManager::new();
        let system = parse(&mut tm, COUNTER_CHC).unwrap();
        assert_eq!(system.state_type.names(), ["x".to_string()]);
    }

    #[test]
    fn recovers_the_query_property() {
        let mut tm = TermManager::new();
        let system = parse(&mut tm, COUNTER_CHC).unwrap();
        let property = query_property(&mut tm, &system.state_type, COUNTER_CHC).unwrap();
        let x = system.state_type.variables(pdkind_ir::Namespace::Current)[0];
        let zero = tm.mk_int(0);
        let bad = tm.mk_atom(pdkind_term::Rel::Lt, x, zero);
        let expected = tm.mk_not(bad);
        assert_eq!(property, expected);
    }

    #[test]
    fn rejects_more_than_one_predicate() {
        let mut tm = TermManager::new();
        let src = "
            (rule (p x) (= x 0))
            (rule (p xn) (and (p x) (= xn (+ x 1))))
            (rule (q y) (= y 0))
            (rule false (and (p x) (< x 0)))
        ";
        assert!(parse(&mut tm, src).is_err());
    }
}
