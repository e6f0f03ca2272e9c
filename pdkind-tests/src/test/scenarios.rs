//! The six end-to-end scenarios of spec.md §8, each a literal input
//! produces-expected-output case.

use crate::test_util::*;
use pdkind_core::{Limits, UnknownCause, Verdict};
use pdkind_ir::{Dialect, Namespace};
use pdkind_integration::{Context, Options};
use pdkind_term::TermManager;
use std::collections::HashMap;

fn options(pairs: &[(&str, &str)]) -> Options {
    Options::new(pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>())
}

/// S1 — trivially valid: `x = 0`, `x' = x + 1`, property `x >= 0`.
#[test]
fn s1_trivially_valid() {
    let mut tm = TermManager::new();
    let system = counter_system(&mut tm);
    let x = system.state_type.variables(Namespace::Current)[0];
    let zero = tm.mk_int(0);
    let property = rel_ge(&mut tm, x, zero);

    let verdict = run_query(&mut tm, &system, property, Limits::default());
    match verdict {
        Verdict::Valid { invariant } => assert_invariant_sound(&mut tm, &system, property, &invariant),
        other => panic!("expected Valid, got {other:?}"),
    }
}

/// S2 — trivially invalid: same system, property `x <= 5`. The violating
/// state is `x = 6`, six transitions after `x = 0`.
#[test]
fn s2_trivially_invalid() {
    let mut tm = TermManager::new();
    let system = counter_system(&mut tm);
    let x = system.state_type.variables(Namespace::Current)[0];
    let five = tm.mk_int(5);
    let property = rel_le(&mut tm, x, five);

    let verdict = run_query(&mut tm, &system, property, Limits::default());
    match verdict {
        Verdict::Invalid { trace } => {
            assert_eq!(trace.len(), 7, "expected x = 0..=6 inclusive of the violating state");
            assert_trace_sound(&mut tm, &system, property, &trace);
            let last = trace.last().unwrap();
            assert_eq!(last.bindings, vec![(system.state_type.var_ids(&tm, Namespace::Current)[0], 6)]);
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

/// S3 — requires induction depth 2: `flag` toggles every step while `x`
/// walks `0 ↦ -1 ↦ 0 ↦ ...` in lockstep, so the full state has period 2.
/// The property `x = 0 ∨ x = -1` has a genuine 1-induction counterexample
/// (`flag = false, x = 0` steps to `x' = 1`), so the first push attempt
/// must fail and retry at depth 2, where `x`'s two-step identity closes
/// the proof.
#[test]
fn s3_requires_induction_depth_two() {
    let mut tm = TermManager::new();
    let system = toggle_system(&mut tm);
    let x = system.state_type.variables(Namespace::Current)[1];
    let zero = tm.mk_int(0);
    let neg_one = tm.mk_int(-1);
    let is_zero = tm.mk_eq(x, zero);
    let is_neg_one = tm.mk_eq(x, neg_one);
    let property = tm.mk_or([is_zero, is_neg_one]);

    let verdict = run_query(&mut tm, &system, property, Limits::default());
    match verdict {
        Verdict::Valid { invariant } => assert_invariant_sound_at_depth(&mut tm, &system, property, &invariant),
        other => panic!("expected Valid, got {other:?}"),
    }
}

/// S4 — predecessor chain blocked by lemma: `a ∧ c = 0` initially,
/// `a' = a`, property `a`. The induction check on `a` alone fails at
/// frame 0 (nothing yet constrains `c`'s predecessor), forcing a
/// reachability-engine detour that must learn a blocking lemma rather
/// than wander the unbounded `c` chain forever.
#[test]
fn s4_predecessor_chain_blocked_by_lemma() {
    let mut tm = TermManager::new();
    let system = bool_counter_system(&mut tm);
    let a = system.state_type.variables(Namespace::Current)[0];

    let verdict = run_query(&mut tm, &system, a, Limits::default());
    match verdict {
        Verdict::Valid { invariant } => {
            assert_invariant_sound(&mut tm, &system, a, &invariant);
            assert!(invariant.contains(&a), "invariant should retain `a` itself");
        }
        other => panic!("expected Valid, got {other:?}"),
    }
}

/// S5 — CHC input shape: a two-rule Horn program encoding the same
/// counter as S1, lowered by the frontend to a transition system. Must
/// return *valid* with an invariant over the same fragment (up to the
/// frontend's own variable naming) as S1's.
#[test]
fn s5_chc_input_shape() {
    const COUNTER_CHC: &str = "
        (rule (p x) (= x 0))
        (rule (p xn) (and (p x) (= xn (+ x 1))))
        (rule false (and (p x) (< x 0)))
    ";
    let mut ctx = Context::create(options(&[("engine", "pd-kind"), ("solver", "naive")])).unwrap();
    let verdicts = ctx.run_on_source(COUNTER_CHC, Dialect::Chc).unwrap();
    assert_eq!(verdicts.len(), 1);
    assert!(matches!(verdicts[0], Verdict::Valid { .. }), "expected Valid, got {:?}", verdicts[0]);
}

/// S6 — resource exhausted: a property that is actually true of every
/// reachable state (`x` only ever takes the values `0, 1, 2, ...`, so it
/// is never `-1`) but whose only candidate 1-induction lemma is the
/// property itself — each push attempt rediscovers the exact same
/// counterexample (`x = -2`) and the reachability engine's blocking
/// lemma collapses right back onto the already-installed property, so no
/// new fact is ever learned. Bounding both the attempt count and the
/// frame budget must surface this as `Unknown`/`ResourceExhausted` rather
/// than loop, and — critically — never as a claimed (and false) *invalid*
/// or an unverifiable *valid*.
#[test]
fn s6_resource_exhausted() {
    let mut tm = TermManager::new();
    let system = counter_system(&mut tm);
    let x = system.state_type.variables(Namespace::Current)[0];
    let neg_one = tm.mk_int(-1);
    let is_neg_one = tm.mk_eq(x, neg_one);
    let property = tm.mk_not(is_neg_one);

    let limits = Limits {
        max_frames: 2,
        max_attempts: 2,
        ..Limits::default()
    };
    let verdict = run_query(&mut tm, &system, property, limits);
    match verdict {
        Verdict::Unknown { cause } => assert_eq!(cause, UnknownCause::ResourceExhausted),
        other => panic!("expected Unknown(ResourceExhausted), got {other:?}"),
    }
}
