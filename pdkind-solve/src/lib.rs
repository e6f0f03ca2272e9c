//! The solver façade of spec.md §4.2: assertion partitioning into classes
//! `A`/`B`/`T`, incremental push/pop scoping, model/generalization queries,
//! and Craig interpolation, all expressed against an opaque [`Backend`]
//! trait. The core crates (`pdkind-engine`, `pdkind-core`) only ever see
//! [`Facade`] — never a concrete backend — preserving the "SMT decision
//! procedure is an external collaborator" boundary of spec.md §1.
//!
//! [`backend::naive`] is the one concrete `Backend` this crate ships: a
//! small decision procedure for quantifier-free linear integer arithmetic
//! and booleans, built so `pdkind-tests`'s end-to-end scenarios have a real
//! decision procedure to run against (spec.md §4.2 **[SUPPLEMENT]**,
//! `SPEC_FULL.md` §4.2). It is reference/test scaffolding, not a
//! production SMT solver — see the Non-goals in `SPEC_FULL.md`.

mod backend;
mod facade;
mod linear;
mod quickxplain;
mod rational;
mod wrappers;

pub use backend::naive::NaiveBackend;
pub use backend::{Backend, BackendFeatures};
pub use facade::Facade;
pub use quickxplain::quickxplain;
pub use wrappers::{Delayed, Incremental};

use pdkind_term::VarId;
use rustc_hash::FxHashMap;

/// `spec.md` §4.2: the three assertion classes a solver façade partitions
/// its context into. `A` and `B` are the two sides of an interpolation
/// query; `T` ("transition"/plain) assertions belong to neither side and
/// are never handed to `interpolate`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Class {
    A,
    B,
    T,
}

/// Which side of a model a `generalize` call should be projected onto.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

/// The three-valued verdict of a `check` call. `Unknown` is always a
/// legitimate answer (spec.md §4.2, §7) and must never be silently
/// coerced into `Sat` or `Unsat` by anything above the façade.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CheckResult {
    Sat,
    Unsat,
    Unknown,
}

/// Which of the façade's optional operations a backend actually supports
/// (spec.md §4.2: "the core picks its search strategy accordingly").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct BackendFeatures {
    pub generalization: bool,
    pub interpolation: bool,
    pub unsat_core: bool,
}

/// A satisfying assignment returned by `check` when the verdict is `Sat`.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub ints: FxHashMap<VarId, i64>,
    pub bools: FxHashMap<VarId, bool>,
}

/// `pdkind_solve`'s name for the shared error taxonomy of spec.md §7
/// (`pdkind_ir::Error`) — kept as one type across the workspace (see that
/// crate's `error` module) rather than duplicated per boundary, but
/// re-exported under the name each crate's own documentation uses.
pub use pdkind_ir::Error as SolverError;
pub use pdkind_ir::Result as SolverResult;
