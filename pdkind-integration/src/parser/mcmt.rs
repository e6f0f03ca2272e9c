//! The native command language of spec.md §6.2:
//!
//! ```text
//! (define-state-type <id> ((<name> <sort>) ...))
//! (define-transition-system <system-id> <state-type-id>
//!   :init <term> :trans <term>)
//! (lemma <system-id> <level> <term>)
//! (ilemma <system-id> <level> <term> <cex> <cex-depth>)
//! (query <system-id> <term>)
//! ```
//!
//! `define-state-type` and `define-transition-system` are this dialect's
//! own forms — the core (`pdkind-ir::Command`) has no notion of either,
//! it only ever receives a fully built `TransitionSystem` plus a stream
//! of `Command`s. This module is where the two are bridged.

use super::sexpr::Sexpr;
use super::term::{term_from_sexpr, Env};
use pdkind_ir::{Command, Error, StateType, TransitionSystem, VarDecl};
use pdkind_term::{Sort, TermManager};
use rustc_hash::FxHashMap;

/// One parsed `define-transition-system` form, named and ready to be
/// registered with a [`crate::context::Context`].
pub struct SystemDef {
    pub id: String,
    pub system: TransitionSystem,
}

/// Everything a `(mcmt)` source unit contributes: zero or more system
/// definitions, plus the commands run against them, in source order
/// (later commands may reference earlier-defined systems only).
#[derive(Default)]
pub struct Program {
    pub systems: Vec<SystemDef>,
    pub commands: Vec<Command>,
}

/// Parses `text` as a sequence of top-level mcmt forms.
pub fn parse(tm: &mut TermManager, text: &str) -> Result<Program, Error> {
    let forms = super::sexpr::parse_all(text)?;
    let mut program = Program::default();
    let mut state_types: FxHashMap<String, StateType> = FxHashMap::default();
    let mut system_state_types: FxHashMap<String, String> = FxHashMap::default();

    for form in &forms {
        let items = form
            .list()
            .ok_or_else(|| Error::Parse("expected a top-level form".into()))?;
        let (head, rest) = items
            .split_first()
            .ok_or_else(|| Error::Parse("empty top-level form".into()))?;
        let keyword = head
            .atom()
            .ok_or_else(|| Error::Parse("expected a form keyword".into()))?;

        match keyword {
            "define-state-type" => {
                let (id, decls) = parse_state_type(rest)?;
                let st = StateType::new(tm, &decls);
                state_types.insert(id, st);
            }
            "define-transition-system" => {
                let def = parse_transition_system(tm, rest, &state_types, &mut system_state_types)?;
                program.systems.push(def);
            }
            "lemma" | "ilemma" | "query" => {
                let env = command_env(rest, &state_types, &system_state_types)?;
                let cmd = parse_command(tm, keyword, rest, &env)?;
                program.commands.push(cmd);
            }
            other => return Err(Error::Parse(format!("unknown top-level form '{other}'"))),
        }
    }

    Ok(program)
}

fn parse_state_type(rest: &[Sexpr]) -> Result<(String, Vec<VarDecl>), Error> {
    let (id_sx, tail) = rest
        .split_first()
        .ok_or_else(|| Error::Parse("define-state-type needs an id".into()))?;
    let id = id_sx
        .atom()
        .ok_or_else(|| Error::Parse("state type id must be a symbol".into()))?
        .to_string();
    let bindings = tail
        .first()
        .and_then(Sexpr::list)
        .ok_or_else(|| Error::Parse("define-state-type needs a variable list".into()))?;

    let mut decls = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let pair = binding
            .list()
            .ok_or_else(|| Error::Parse("expected a (name sort) binding".into()))?;
        let (name, sort) = match pair {
            [name, sort] => (name, sort),
            _ => return Err(Error::Parse("expected a (name sort) binding".into())),
        };
        let name = name
            .atom()
            .ok_or_else(|| Error::Parse("variable name must be a symbol".into()))?;
        let sort = match sort.atom() {
            Some("Int") => Sort::Int,
            Some("Bool") => Sort::Bool,
            _ => return Err(Error::Parse(format!("unknown sort in binding for '{name}'"))),
        };
        decls.push(VarDecl::new(name, sort));
    }
    Ok((id, decls))
}

fn parse_transition_system(
    tm: &mut TermManager,
    rest: &[Sexpr],
    state_types: &FxHashMap<String, StateType>,
    system_state_types: &mut FxHashMap<String, String>,
) -> Result<SystemDef, Error> {
    let id = rest
        .first()
        .and_then(Sexpr::atom)
        .ok_or_else(|| Error::Parse("define-transition-system needs an id".into()))?
        .to_string();
    let state_type_id = rest
        .get(1)
        .and_then(Sexpr::atom)
        .ok_or_else(|| Error::Parse("define-transition-system needs a state-type id".into()))?
        .to_string();
    let state_type = state_types
        .get(&state_type_id)
        .cloned()
        .ok_or_else(|| Error::Parse(format!("undefined state type '{state_type_id}'")))?;

    let mut init = None;
    let mut trans = None;
    let mut keyword_args = rest[2..].iter();
    while let Some(kw_sx) = keyword_args.next() {
        let kw = kw_sx
            .atom()
            .ok_or_else(|| Error::Parse("expected a :init/:trans keyword".into()))?;
        let value = keyword_args
            .next()
            .ok_or_else(|| Error::Parse(format!("'{kw}' needs a value")))?;
        match kw {
            ":init" => init = Some(value),
            ":trans" => trans = Some(value),
            other => return Err(Error::Parse(format!("unknown keyword '{other}'"))),
        }
    }
    let init_sx = init.ok_or_else(|| Error::Parse("missing ':init'".into()))?;
    let trans_sx = trans.ok_or_else(|| Error::Parse("missing ':trans'".into()))?;

    let current_env = namespace_env(tm, &state_type, pdkind_ir::Namespace::Current);
    let init_term = term_from_sexpr(tm, &current_env, init_sx)?;

    let mut trans_env = current_env;
    extend_env(&mut trans_env, &state_type, pdkind_ir::Namespace::Next);
    let trans_term = term_from_sexpr(tm, &trans_env, trans_sx)?;

    system_state_types.insert(id.clone(), state_type_id);
    Ok(SystemDef {
        id,
        system: TransitionSystem::new(state_type, init_term, trans_term),
    })
}

fn namespace_env(_tm: &TermManager, st: &StateType, ns: pdkind_ir::Namespace) -> Env {
    st.names()
        .iter()
        .cloned()
        .zip(st.variables(ns).iter().copied())
        .collect()
}

fn extend_env(env: &mut Env, st: &StateType, ns: pdkind_ir::Namespace) {
    for (name, &term) in st.names().iter().zip(st.variables(ns)) {
        let primed = match ns {
            pdkind_ir::Namespace::Next => format!("{name}'"),
            pdkind_ir::Namespace::Input => format!("{name}!"),
            pdkind_ir::Namespace::Current => name.clone(),
        };
        env.insert(primed, term);
    }
}

fn command_env(
    rest: &[Sexpr],
    state_types: &FxHashMap<String, StateType>,
    system_state_types: &FxHashMap<String, String>,
) -> Result<Env, Error> {
    let system_id = rest
        .first()
        .and_then(Sexpr::atom)
        .ok_or_else(|| Error::Parse("command needs a system id".into()))?;
    let state_type_id = system_state_types
        .get(system_id)
        .ok_or_else(|| Error::Parse(format!("undefined system '{system_id}'")))?;
    let st = state_types
        .get(state_type_id)
        .ok_or_else(|| Error::Parse(format!("undefined state type '{state_type_id}'")))?;
    Ok(st
        .names()
        .iter()
        .cloned()
        .zip(st.variables(pdkind_ir::Namespace::Current).iter().copied())
        .collect())
}

fn parse_command(
    tm: &mut TermManager,
    keyword: &str,
    rest: &[Sexpr],
    env: &Env,
) -> Result<Command, Error> {
    let system_id = rest[0]
        .atom()
        .ok_or_else(|| Error::Parse("system id must be a symbol".into()))?
        .to_string();

    match keyword {
        "query" => {
            let term = term_from_sexpr(tm, env, &rest[1])?;
            Ok(Command::Query { system_id, term })
        }
        "lemma" => {
            let level = parse_usize(&rest[1])?;
            let term = term_from_sexpr(tm, env, &rest[2])?;
            Ok(Command::Lemma {
                system_id,
                level,
                term,
            })
        }
        "ilemma" => {
            let level = parse_usize(&rest[1])?;
            let term = term_from_sexpr(tm, env, &rest[2])?;
            let cex = term_from_sexpr(tm, env, &rest[3])?;
            let cex_depth = parse_usize(&rest[4])?;
            Ok(Command::InductionLemma {
                system_id,
                level,
                term,
                cex,
                cex_depth,
            })
        }
        other => Err(Error::Parse(format!("unknown command '{other}'"))),
    }
}

/// Parses a single already-complete `(lemma ...)` / `(ilemma ...)` form
/// against a system's state type, with no surrounding
/// `define-state-type`/`define-transition-system` context — spec.md
/// §6.1's `add_lemma`, which replays one command string produced earlier
/// by `reachability_lemma_to_command`/`induction_lemma_to_command` (both
/// of which already embed the system id, so the grammar here is
/// identical to the top-level one).
pub fn parse_standalone_command(
    tm: &mut TermManager,
    text: &str,
    state_type: &pdkind_ir::StateType,
) -> Result<Command, Error> {
    let forms = super::sexpr::parse_all(text)?;
    let form = match forms.as_slice() {
        [one] => one,
        _ => return Err(Error::Parse("expected exactly one command form".into())),
    };
    let items = form
        .list()
        .ok_or_else(|| Error::Parse("expected a command form".into()))?;
    let (head, rest) = items
        .split_first()
        .ok_or_else(|| Error::Parse("empty command form".into()))?;
    let keyword = head
        .atom()
        .ok_or_else(|| Error::Parse("expected a command keyword".into()))?;
    if !matches!(keyword, "lemma" | "ilemma") {
        return Err(Error::Parse(format!(
            "expected 'lemma' or 'ilemma', found '{keyword}'"
        )));
    }
    let env: Env = state_type
        .names()
        .iter()
        .cloned()
        .zip(state_type.variables(pdkind_ir::Namespace::Current).iter().copied())
        .collect();
    parse_command(tm, keyword, rest, &env)
}

fn parse_usize(sx: &Sexpr) -> Result<usize, Error> {
    sx.atom()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| Error::Parse("expected a non-negative integer".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_counter_system_and_a_query() {
        let mut tm = TermManager::new();
        let src = "
            (define-state-type ST ((x Int)))
            (define-transition-system counter ST
              :init (= x 0)
              :trans (= x' (+ x 1)))
            (query counter (>= x 0))
        ";
        let program = parse(&mut tm, src).unwrap();
        assert_eq!(program.systems.len(), 1);
        assert_eq!(program.systems[0].id, "counter");
        assert_eq!(program.commands.len(), 1);
        assert!(matches!(
            &program.commands[0],
            Command::Query { system_id, .. } if system_id == "counter"
        ));
    }

    #[test]
    fn rejects_command_against_undefined_system() {
        let mut tm = TermManager::new();
        let err = parse(&mut tm, "(query nosys true)");
        assert!(err.is_err());
    }
}
