//! The frame & obligation store (spec.md §4.5) and the pd-kind driver
//! outer loop (spec.md §4.6): the component that actually decides
//! *valid* / *invalid* / *unknown* by alternating k-induction pushes with
//! reachability-engine refutation.
//!
//! Split into an indexed search-state table (`frame`) and the solve loop
//! that drives it (`driver`), so the store can be unit-tested in
//! isolation from the search strategy built on top of it.

mod cube;
mod driver;
mod frame;
mod observer;
mod queue;
mod unroll;

pub use driver::{Driver, Limits, Stats, UnknownCause, Verdict};
pub use observer::{NullObserver, Observer};

/// `pdkind_core`'s name for the shared error taxonomy of spec.md §7
/// (`pdkind_ir::Error`).
pub use pdkind_ir::Error as QueryError;
pub use pdkind_ir::Result as QueryResult;
