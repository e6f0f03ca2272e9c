//! The cross-crate testable properties of spec.md §8 that don't belong to
//! any single crate's own `#[cfg(test)]` module: push/pop balance, lemma
//! installation idempotence as observed through the driver, determinism
//! of repeated queries, and GC relocation round-tripping. Soundness
//! properties 1 and 2 are exercised per-scenario in `test::scenarios`
//! via `assert_invariant_sound` / `assert_trace_sound`.

use crate::test_util::*;
use pdkind_core::{Driver, Limits, NullObserver, Verdict};
use pdkind_ir::Namespace;
use pdkind_solve::{Facade, NaiveBackend};
use pdkind_term::TermManager;

/// Property 5 — push/pop balance: every `push` must be matched by exactly
/// one `pop`, and a `pop` with nothing open is a protocol error rather
/// than a panic or a silently-ignored no-op.
#[test]
fn push_pop_balance_is_lifo() {
    let mut facade = Facade::new(NaiveBackend::new());
    assert_eq!(facade.depth(), 0);
    facade.push();
    facade.push();
    facade.push();
    assert_eq!(facade.depth(), 3);
    facade.pop().unwrap();
    assert_eq!(facade.depth(), 2);
    facade.pop().unwrap();
    facade.pop().unwrap();
    assert_eq!(facade.depth(), 0);
    assert!(facade.pop().is_err(), "popping past depth 0 must be a protocol error");
}

/// Property 4 — idempotence of lemma installation: installing the same
/// reachability lemma at the same level twice only has an effect once,
/// observed through the driver's own public API rather than reaching
/// into `FrameStore` directly (`pdkind-core::frame`'s own unit tests
/// cover the store in isolation; this checks the driver exposes the same
/// guarantee at its boundary).
#[test]
fn lemma_installation_through_driver_is_idempotent() {
    let mut tm = TermManager::new();
    let system = counter_system(&mut tm);
    let mut driver = fresh_driver(&tm, &system, Limits::default());

    let x = system.state_type.variables(Namespace::Current)[0];
    let zero = tm.mk_int(0);
    let lemma = rel_ge(&mut tm, x, zero);

    assert!(driver.add_reachability_lemma(0, lemma), "first install must report new");
    assert!(!driver.add_reachability_lemma(0, lemma), "second install of the same lemma must report no-op");
}

/// Property 7 — determinism: two fresh drivers given the same system and
/// property reach the same verdict shape. The naive backend's search has
/// no randomness (its only "choice points" — case-split order in
/// `backend::naive` — are driven by a fixed term ordering), so repeated
/// runs must agree exactly on which of valid/invalid/unknown holds.
#[test]
fn repeated_queries_are_deterministic() {
    let mut tm = TermManager::new();
    let system = counter_system(&mut tm);
    let x = system.state_type.variables(Namespace::Current)[0];
    let zero = tm.mk_int(0);
    let property = rel_ge(&mut tm, x, zero);

    let first = run_query(&mut tm, &system, property, Limits::default());
    let second = run_query(&mut tm, &system, property, Limits::default());
    match (first, second) {
        (Verdict::Valid { invariant: a }, Verdict::Valid { invariant: b }) => {
            assert_eq!(a, b, "two runs of the same query produced different invariants");
        }
        (a, b) => panic!("expected both runs to agree on Valid, got {a:?} / {b:?}"),
    }
}

/// Property 6 — GC relocation round-trip: garbage-collecting mid-lifetime
/// (after a query has populated frames and left lemmas live) must preserve
/// the *content* of every rooted term exactly, and the driver's own
/// internal bookkeeping (frames, in this case) must have walked itself
/// through the same relocation map rather than being left pointing at
/// stale, now-meaningless indices.
///
/// A [`pdkind_ir::TransitionSystem`] has no public relocation hook of its
/// own (only the driver's internal stores do, via `FrameStore::relocate` /
/// `CexManager::relocate`), so this deliberately never reuses `system`'s
/// terms after `gc` — only the invariant's, which the test itself roots
/// and relocates explicitly.
#[test]
fn gc_relocation_preserves_lemma_content() {
    let mut tm = TermManager::new();
    let system = counter_system(&mut tm);
    let x = system.state_type.variables(Namespace::Current)[0];
    let zero = tm.mk_int(0);
    let property = rel_ge(&mut tm, x, zero);

    let mut driver = Driver::new(NaiveBackend::new(), Limits::default());
    driver.declare_system(&tm, &system);
    let mut obs = NullObserver;
    let verdict = driver.query(&mut tm, &system, property, &mut obs, None).unwrap();
    let invariant = match verdict {
        Verdict::Valid { invariant } => invariant,
        other => panic!("expected Valid before GC, got {other:?}"),
    };
    let before: Vec<String> = invariant.iter().map(|&t| tm.to_string(t)).collect();

    let mut roots = vec![property];
    roots.extend(invariant.iter().copied());
    let map = driver.gc(&mut tm, &roots);

    let relocated: Vec<_> = invariant.iter().map(|&t| map.get(t)).collect();
    let after: Vec<String> = relocated.iter().map(|&t| tm.to_string(t)).collect();
    assert_eq!(before, after, "GC must preserve term content, only renumber handles");

    // The driver's own frame store must have relocated itself too: the
    // invariant (== frame 0, for this trivially-convergent property) is
    // still there under its *new* handle, and re-installing it reports
    // correctly as already present rather than as a fresh lemma.
    for &lemma in &relocated {
        assert!(
            !driver.add_reachability_lemma(0, lemma),
            "relocated lemma should already be present in frame 0 post-GC"
        );
    }
}
