//! The three synchronous observer hooks of spec.md §5 / §6.1. Invoked on
//! the search thread between solver calls; must not re-enter the driver
//! (spec.md §5: "must not re-enter the core").

use pdkind_ir::CexNodeId;
use pdkind_term::Term;

/// Mirrors the three embedding-visible event-hook registration points of
/// spec.md §6.1 (`set_new_reachability_lemma_eh`, `set_obligation_pushed_eh`,
/// `add_next_frame_eh`) as a single trait so `Driver` can be generic over
/// whichever host installs it, rather than three independent callback
/// slots — `pdkind-integration` adapts this trait to the three C-shaped
/// `(user, ...)` callbacks the embedding API exposes.
#[allow(unused_variables)]
pub trait Observer {
    /// Fired whenever the reachability engine learns a blocking lemma
    /// (`(user, level, T)` at the embedding boundary).
    fn reachability_lemma(&mut self, level: usize, lemma: Term) {}

    /// Fired after every `push_obligation` attempt, successful or not
    /// (`(user, level, F, cex, depth)` at the embedding boundary).
    fn obligation_pushed(&mut self, level: usize, formula: Term, cex: Option<CexNodeId>, depth: usize) {}

    /// Fired when the outer loop advances a frame.
    fn next_frame(&mut self, level: usize) {}
}

/// The default observer: every hook is a no-op, for queries run without a
/// host installing callbacks.
#[derive(Default)]
pub struct NullObserver;

impl Observer for NullObserver {}
