//! The optional incremental/delayed solver wrappers of spec.md §4.2:
//! "The façade additionally provides optional incremental and delayed
//! wrappers ... Wrappers preserve the contract above." Both compose over
//! any [`Backend`] and are themselves [`Backend`]s, so `Facade` never has
//! to distinguish a wrapped backend from a bare one (spec.md §9 design
//! notes).
//!
//! Grounded on `original_source/src/smt/o2o2/o2o2.cpp` (a thin
//! non-interpolating wrapper kept around a full backend) and
//! `.../opensmt2_nonitp.{h,cpp}` (a solver variant that defers/avoids the
//! interpolating machinery until it is actually asked for one) —
//! `Delayed` generalizes that shape behind the same [`Backend`] trait
//! rather than a second concrete solver type.

use crate::{Backend, BackendFeatures, CheckResult, Class, Direction, Model};
use pdkind_term::{Term, TermManager, VarId};

/// One operation recorded against a backend while a wrapper is buffering,
/// replayed in order once the wrapper decides it can no longer avoid
/// talking to the real backend.
enum Op {
    AddVariable(VarId, Class),
    Add(Term, Class),
    Push,
    Pop,
}

fn replay<B: Backend>(backend: &mut B, tm: &TermManager, log: Vec<Op>) {
    for op in log {
        match op {
            Op::AddVariable(v, class) => backend.add_variable(v, class),
            Op::Add(f, class) => backend.add(tm, f, class),
            Op::Push => backend.push(),
            Op::Pop => backend.pop(),
        }
    }
}

/// Accumulates assertions and scope operations without forwarding them to
/// `inner` one at a time, flushing the whole backlog immediately before
/// any operation that actually needs an answer from the backend (`check`,
/// `generalize`, `interpolate`) or that changes scoping (`push`, `pop`) —
/// "assertions accumulate across checks without repeated reinitialization"
/// (spec.md §4.2).
pub struct Incremental<B> {
    inner: B,
    log: Vec<Op>,
}

impl<B: Backend> Incremental<B> {
    pub fn new(inner: B) -> Self {
        Incremental {
            inner,
            log: Vec::new(),
        }
    }

    fn flush(&mut self, tm: &TermManager) {
        if !self.log.is_empty() {
            replay(&mut self.inner, tm, std::mem::take(&mut self.log));
        }
    }
}

impl<B: Backend> Backend for Incremental<B> {
    fn features(&self) -> BackendFeatures {
        self.inner.features()
    }

    fn add_variable(&mut self, v: VarId, class: Class) {
        self.log.push(Op::AddVariable(v, class));
    }

    fn add(&mut self, _tm: &TermManager, f: Term, class: Class) {
        self.log.push(Op::Add(f, class));
    }

    fn push(&mut self) {
        self.log.push(Op::Push);
    }

    fn pop(&mut self) {
        self.log.push(Op::Pop);
    }

    fn check(&mut self, tm: &TermManager) -> CheckResult {
        self.flush(tm);
        self.inner.check(tm)
    }

    fn model(&self) -> Option<&Model> {
        self.inner.model()
    }

    fn generalize(&mut self, tm: &mut TermManager, direction: Direction) -> Option<Term> {
        self.flush(tm);
        self.inner.generalize(tm, direction)
    }

    fn interpolate(&mut self, tm: &mut TermManager) -> Option<Term> {
        self.flush(tm);
        self.inner.interpolate(tm)
    }
}

/// Buffers every operation until the *first* `check` or `interpolate`
/// call, then flushes once and behaves as a transparent pass-through for
/// the remainder of the query — "collects assertions until the first
/// `check` or `interpolate`, allowing a non-interpolating fast path to be
/// used until interpolation is actually needed" (spec.md §4.2). Unlike
/// [`Incremental`], which re-buffers after every flush, `Delayed` commits
/// to talking to the real backend exactly once.
pub struct Delayed<B> {
    inner: B,
    log: Option<Vec<Op>>,
}

impl<B: Backend> Delayed<B> {
    pub fn new(inner: B) -> Self {
        Delayed {
            inner,
            log: Some(Vec::new()),
        }
    }

    fn record_or_forward(&mut self, tm: &TermManager, op: Op) {
        match &mut self.log {
            Some(log) => log.push(op),
            None => replay(&mut self.inner, tm, vec![op]),
        }
    }

    fn flush_once(&mut self, tm: &TermManager) {
        if let Some(log) = self.log.take() {
            replay(&mut self.inner, tm, log);
        }
    }
}

impl<B: Backend> Backend for Delayed<B> {
    fn features(&self) -> BackendFeatures {
        self.inner.features()
    }

    fn add_variable(&mut self, v: VarId, class: Class) {
        // Variable/class declarations carry no `TermManager` reference,
        // so a `None` dummy manager is never needed to record them.
        match &mut self.log {
            Some(log) => log.push(Op::AddVariable(v, class)),
            None => self.inner.add_variable(v, class),
        }
    }

    fn add(&mut self, tm: &TermManager, f: Term, class: Class) {
        self.record_or_forward(tm, Op::Add(f, class));
    }

    fn push(&mut self) {
        match &mut self.log {
            Some(log) => log.push(Op::Push),
            None => self.inner.push(),
        }
    }

    fn pop(&mut self) {
        match &mut self.log {
            Some(log) => log.push(Op::Pop),
            None => self.inner.pop(),
        }
    }

    fn check(&mut self, tm: &TermManager) -> CheckResult {
        self.flush_once(tm);
        self.inner.check(tm)
    }

    fn model(&self) -> Option<&Model> {
        self.inner.model()
    }

    fn generalize(&mut self, tm: &mut TermManager, direction: Direction) -> Option<Term> {
        self.flush_once(tm);
        self.inner.generalize(tm, direction)
    }

    fn interpolate(&mut self, tm: &mut TermManager) -> Option<Term> {
        self.flush_once(tm);
        self.inner.interpolate(tm)
    }
}

#[cfg(test)]
mod tests {
    use super::{Delayed, Incremental};
    use crate::{Backend, CheckResult, Class, NaiveBackend};
    use pdkind_term::{Sort, TermManager};

    #[test]
    fn incremental_flushes_before_check() {
        let mut tm = TermManager::new();
        let x = tm.fresh_var("x", Sort::Bool);
        let mut backend = Incremental::new(NaiveBackend::new());
        backend.add_variable(tm.var_id(x).unwrap(), Class::T);
        backend.add(&tm, x, Class::T);
        assert_eq!(backend.check(&tm), CheckResult::Sat);
    }

    #[test]
    fn delayed_buffers_until_first_check_then_passes_through() {
        let mut tm = TermManager::new();
        let x = tm.fresh_var("x", Sort::Bool);
        let not_x = tm.mk_not(x);
        let mut backend = Delayed::new(NaiveBackend::new());
        backend.add_variable(tm.var_id(x).unwrap(), Class::T);
        backend.add(&tm, x, Class::T);
        assert_eq!(backend.check(&tm), CheckResult::Sat);
        // Assertions added after the first flush are forwarded directly.
        backend.add(&tm, not_x, Class::T);
        assert_eq!(backend.check(&tm), CheckResult::Unsat);
    }
}
