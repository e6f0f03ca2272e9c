use crate::backend::Backend;
use crate::quickxplain::quickxplain;
use crate::{BackendFeatures, CheckResult, Class, Direction, Model, SolverError, SolverResult};
use pdkind_term::{Term, TermManager, VarId};
use std::io::Write;

/// Tracks the façade's protocol state so `model`/`generalize`/`interpolate`
/// can be rejected outside the scope spec.md §4.2 allows them
/// ("`model()`: defined only in state sat", "`interpolate()`: in state
/// unsat").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// No `check` since the last assertion/push/pop.
    Fresh,
    Sat,
    Unsat,
    Unknown,
}

/// The solver façade of spec.md §4.2, generic over a concrete [`Backend`].
/// Owns push/pop depth bookkeeping (LIFO, mismatched pops raise
/// [`SolverError::Protocol`]) and the quickxplain shrinking step that
/// `generalize`/`interpolate` apply to whatever raw result the backend
/// returns (`SPEC_FULL.md` §4.5 **[SUPPLEMENT]**).
pub struct Facade<B> {
    backend: B,
    depth: usize,
    state: State,
}

impl<B: Backend> Facade<B> {
    pub fn new(backend: B) -> Self {
        Facade {
            backend,
            depth: 0,
            state: State::Fresh,
        }
    }

    pub fn features(&self) -> BackendFeatures {
        self.backend.features()
    }

    pub fn add_variable(&mut self, v: VarId, class: Class) {
        self.backend.add_variable(v, class);
        self.state = State::Fresh;
    }

    pub fn add(&mut self, tm: &TermManager, f: Term, class: Class) {
        self.backend.add(tm, f, class);
        self.state = State::Fresh;
    }

    /// Opens a new scoped context. Always succeeds.
    pub fn push(&mut self) {
        self.backend.push();
        self.depth += 1;
        self.state = State::Fresh;
    }

    /// Closes the innermost scope. `SolverError::Protocol` if there is no
    /// matching `push` (spec.md §4.2: "mismatched pops fail with
    /// `ProtocolError`").
    pub fn pop(&mut self) -> SolverResult<()> {
        if self.depth == 0 {
            return Err(SolverError::Protocol(
                "pop() called with no matching push()".into(),
            ));
        }
        self.backend.pop();
        self.depth -= 1;
        self.state = State::Fresh;
        Ok(())
    }

    /// The current push/pop nesting depth, for test harnesses asserting
    /// LIFO balance (spec.md §8, "Push-pop balance").
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn check(&mut self, tm: &TermManager) -> CheckResult {
        let result = self.backend.check(tm);
        self.state = match result {
            CheckResult::Sat => State::Sat,
            CheckResult::Unsat => State::Unsat,
            CheckResult::Unknown => State::Unknown,
        };
        result
    }

    pub fn model(&self) -> SolverResult<&Model> {
        if self.state != State::Sat {
            return Err(SolverError::Protocol(
                "model() called outside a sat check result".into(),
            ));
        }
        self.backend.model().ok_or_else(|| {
            SolverError::Internal("check() reported sat but the backend kept no model".into())
        })
    }

    /// Builds a cube from the backend's raw generalization and shrinks it
    /// by quickxplain, re-checking at each candidate that the assertions
    /// still imply it (`SPEC_FULL.md` §4.5).
    pub fn generalize(&mut self, tm: &mut TermManager, direction: Direction) -> SolverResult<Term> {
        if self.state != State::Sat {
            return Err(SolverError::Protocol(
                "generalize() called outside a sat check result".into(),
            ));
        }
        let raw = self.backend.generalize(tm, direction).ok_or_else(|| {
            SolverError::Internal(
                "backend reports generalization support but returned none".into(),
            )
        })?;
        let conjuncts = tm.conjuncts(raw);
        let minimized = {
            let backend = &mut self.backend;
            quickxplain(&conjuncts, &mut |xs: &[Term]| {
                still_implied(&mut *backend, &mut *tm, xs)
            })
        };
        // The scratch push/pop pairs above leave the backend's own cached
        // model cleared; re-establish it so `self.model()` keeps working.
        self.backend.check(tm);
        Ok(tm.mk_and(minimized))
    }

    /// Builds a Craig interpolant from the backend's raw interpolation and
    /// shrinks it by quickxplain, re-checking at each candidate that it is
    /// still both implied by `A` and inconsistent with `B`.
    pub fn interpolate(&mut self, tm: &mut TermManager) -> SolverResult<Term> {
        if self.state != State::Unsat {
            return Err(SolverError::Protocol(
                "interpolate() called outside an unsat check result".into(),
            ));
        }
        let raw = self.backend.interpolate(tm).ok_or_else(|| {
            SolverError::Internal("backend reports interpolation support but returned none".into())
        })?;
        let conjuncts = tm.conjuncts(raw);
        let minimized = {
            let backend = &mut self.backend;
            quickxplain(&conjuncts, &mut |xs: &[Term]| {
                still_implied(&mut *backend, &mut *tm, xs)
            })
        };
        self.backend.check(tm);
        Ok(tm.mk_and(minimized))
    }

    /// Rewrites every positive equality atom `a = b` in `g` into `a <= b
    /// ∧ b <= a` (`solvers.h:eq_to_ineq`): some backends generalize more
    /// precisely over plain inequalities. An optional, non-load-bearing
    /// transform (`SPEC_FULL.md` §4.6) — omitting it never changes a query
    /// outcome, only how finely a cube is later shrunk.
    pub fn eq_to_ineq(&self, tm: &mut TermManager, g: Term) -> Term {
        eq_to_ineq_rec(tm, g)
    }

    /// Dumps `f` and `g` as an exists-forall SMT problem for external
    /// debugging (`solvers.h:output_efsmt`); never consulted by the search
    /// itself.
    pub fn dump_efsmt(&self, tm: &TermManager, f: Term, g: Term, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "; efsmt dump")?;
        writeln!(out, "(assert (exists (f) {}))", tm.to_string(f))?;
        writeln!(out, "(assert (forall (g) {}))", tm.to_string(g))
    }
}

fn still_implied<B: Backend>(backend: &mut B, tm: &mut TermManager, xs: &[Term]) -> bool {
    let cube = tm.mk_and(xs.iter().copied());
    let negated = tm.mk_not(cube);
    backend.push();
    backend.add(tm, negated, Class::T);
    let result = backend.check(tm);
    backend.pop();
    result == CheckResult::Unsat
}

fn eq_to_ineq_rec(tm: &mut TermManager, t: Term) -> Term {
    use pdkind_term::Rel;
    if let Some((Rel::Eq, a, b)) = tm.atom_parts(t) {
        let le1 = tm.mk_atom(Rel::Le, a, b);
        let le2 = tm.mk_atom(Rel::Le, b, a);
        return tm.mk_and([le1, le2]);
    }
    if let Some(ts) = tm.and_parts(t).map(<[Term]>::to_vec) {
        let rewritten: Vec<_> = ts.into_iter().map(|x| eq_to_ineq_rec(tm, x)).collect();
        return tm.mk_and(rewritten);
    }
    if let Some(ts) = tm.or_parts(t).map(<[Term]>::to_vec) {
        let rewritten: Vec<_> = ts.into_iter().map(|x| eq_to_ineq_rec(tm, x)).collect();
        return tm.mk_or(rewritten);
    }
    if let Some(inner) = tm.not_inner(t) {
        let rewritten = eq_to_ineq_rec(tm, inner);
        return tm.mk_not(rewritten);
    }
    t
}
