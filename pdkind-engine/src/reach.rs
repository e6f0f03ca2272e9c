//! The one-step reachability subengine of spec.md §4.4: a work-stack walk
//! backward through the frames, learning an interpolant-based blocking
//! lemma whenever a step turns out unsatisfiable.
//!
//! Grounded on `original_source/src/engine/ic3/ic3_engine.cpp`'s
//! `check_one_step_reachable` / `check_reachable` pair: the former answers
//! a single predecessor query, the latter repeats it while walking
//! backward from a target cube toward `Init`.

use crate::CexManager;
use pdkind_ir::{CexNodeId, Namespace, StateAssignment, TransitionSystem};
use pdkind_solve::{Backend, CheckResult, Class, Facade, Model, SolverResult};
use pdkind_term::{Term, TermManager};

/// The verdict of one [`ReachabilityEngine::check_one_step_reachable`]
/// query.
pub enum OneStepOutcome {
    Reachable { witness: StateAssignment },
    Blocked { lemma: Term },
    Unknown,
}

/// The verdict of walking the whole work-stack back from a target cube.
pub enum ReachOutcome {
    /// `target_cube` is reachable from `Init`; `trace` is the full
    /// predecessor chain, root (an initial state) first.
    Reachable { trace: Vec<CexNodeId> },
    /// The walk could not continue past `frame`; `lemma` is a
    /// quickxplain-minimized formula safe to install at `frame - 1` to
    /// rule out the predecessor (or, when `frame == 0`, safe to install
    /// at frame 0 to rule out `target_cube` itself never intersecting
    /// `Init`).
    Blocked { frame: usize, lemma: Term },
    /// The backend could not decide a step; the caller (the driver,
    /// spec.md §7) converts this into a query verdict of `unknown`, never
    /// silently into `Reachable` or `Blocked`.
    Unknown,
}

#[derive(Default)]
pub struct ReachabilityEngine;

impl ReachabilityEngine {
    pub fn new() -> Self {
        ReachabilityEngine
    }

    /// Is `target_next` (a next-namespace formula) reachable in one
    /// `Trans` step from some state satisfying `frame_formula`
    /// (current-namespace)? On `Unsat`, learns a lemma via Craig
    /// interpolation between `frame_formula` (class `A`) and `Trans ∧
    /// target_next` (class `B`), quickxplain-shrunk by
    /// [`Facade::interpolate`].
    pub fn check_one_step_reachable<B: Backend>(
        &self,
        facade: &mut Facade<B>,
        tm: &mut TermManager,
        system: &TransitionSystem,
        frame_formula: Term,
        target_next: Term,
    ) -> SolverResult<OneStepOutcome> {
        facade.push();
        facade.add(tm, frame_formula, Class::A);
        facade.add(tm, system.trans, Class::T);
        facade.add(tm, target_next, Class::B);
        let result = facade.check(tm);
        let outcome = match result {
            CheckResult::Sat => {
                let model = facade.model()?.clone();
                let witness = extract_assignment(tm, system, &model, Namespace::Current);
                OneStepOutcome::Reachable { witness }
            }
            CheckResult::Unsat => {
                let lemma = facade.interpolate(tm)?;
                OneStepOutcome::Blocked { lemma }
            }
            CheckResult::Unknown => OneStepOutcome::Unknown,
        };
        facade.pop()?;
        Ok(outcome)
    }

    /// Is `cube` (current-namespace) satisfied by some state of `Init`?
    fn check_initial<B: Backend>(
        &self,
        facade: &mut Facade<B>,
        tm: &mut TermManager,
        system: &TransitionSystem,
        cube: Term,
    ) -> SolverResult<CheckResult> {
        facade.push();
        facade.add(tm, system.init, Class::A);
        facade.add(tm, cube, Class::B);
        let result = facade.check(tm);
        facade.pop()?;
        Ok(result)
    }

    /// Walks backward from `(target_frame, target_cube)`, growing `cex`
    /// with every discovered predecessor, until it either reaches `Init`
    /// (a genuine counterexample) or a step cannot be resolved any
    /// further (blocked). Deduplicates against `cex` so re-exploring a
    /// previously-seen `(cube, frame)` pair reuses the existing node.
    pub fn check_reachable<B: Backend>(
        &self,
        facade: &mut Facade<B>,
        tm: &mut TermManager,
        system: &TransitionSystem,
        cex: &mut CexManager,
        frames: &[Term],
        target_frame: usize,
        target_cube: Term,
    ) -> SolverResult<ReachOutcome> {
        let root = cex.add(target_cube, target_frame, None, 0);
        let mut top = root;
        loop {
            let node = cex.get(top);
            let (frame, cube, depth) = (node.frame, node.cube, node.depth);

            if frame == 0 {
                return match self.check_initial(facade, tm, system, cube)? {
                    CheckResult::Sat => Ok(ReachOutcome::Reachable {
                        trace: cex.trace_to(top),
                    }),
                    CheckResult::Unsat => {
                        cex.mark_unreachable(top);
                        let lemma = tm.mk_not(cube);
                        Ok(ReachOutcome::Blocked { frame: 0, lemma })
                    }
                    CheckResult::Unknown => Ok(ReachOutcome::Unknown),
                };
            }

            let target_next = system
                .state_type
                .rename(tm, cube, Namespace::Current, Namespace::Next);
            match self.check_one_step_reachable(facade, tm, system, frames[frame - 1], target_next)? {
                OneStepOutcome::Reachable { witness } => {
                    let pred_cube = assignment_to_cube(tm, &witness);
                    top = cex.add(pred_cube, frame - 1, Some(top), depth + 1);
                }
                OneStepOutcome::Blocked { lemma } => {
                    cex.mark_unreachable(top);
                    return Ok(ReachOutcome::Blocked { frame, lemma });
                }
                OneStepOutcome::Unknown => return Ok(ReachOutcome::Unknown),
            }
        }
    }
}

/// Reads off every state-type variable's value from `model` in the given
/// namespace, as a [`StateAssignment`].
fn extract_assignment(
    tm: &TermManager,
    system: &TransitionSystem,
    model: &Model,
    ns: Namespace,
) -> StateAssignment {
    let mut assignment = StateAssignment::default();
    for id in system.state_type.var_ids(tm, ns) {
        if let Some(&v) = model.ints.get(&id) {
            assignment.bindings.push((id, v));
        }
        if let Some(&b) = model.bools.get(&id) {
            assignment.bool_bindings.push((id, b));
        }
    }
    assignment
}

/// Builds a cube (conjunction of equalities) from a [`StateAssignment`]
/// read back over current-namespace variables.
fn assignment_to_cube(tm: &mut TermManager, assignment: &StateAssignment) -> Term {
    let mut literals = Vec::new();
    for &(id, value) in &assignment.bindings {
        let var_term = tm.var_term(id);
        let value_term = tm.mk_int(value);
        literals.push(tm.mk_eq(var_term, value_term));
    }
    for &(id, value) in &assignment.bool_bindings {
        let var_term = tm.var_term(id);
        literals.push(if value { var_term } else { tm.mk_not(var_term) });
    }
    tm.mk_and(literals)
}
