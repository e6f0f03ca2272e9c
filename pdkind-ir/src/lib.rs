//! State types, transition systems, and the shared data model of spec.md §3:
//! frames, provenance, induction obligations, and counterexample nodes as
//! plain data. The *operations* over this data (the frame/obligation store,
//! the driver, the reachability engine) live in `pdkind-core` and
//! `pdkind-engine`; this crate only fixes the vocabulary they share so
//! neither has to depend on the other for type definitions.

mod command;
mod error;
mod state;
mod system;

pub use command::{Command, Dialect};
pub use error::{Error, Result};
pub use state::{Namespace, StateType, VarDecl};
pub use system::TransitionSystem;

use pdkind_term::{Term, VarId};

/// `spec.md` §3: `{parent: T|⊥, refutes: T|⊥, depth: ℕ}`.
#[derive(Clone, Debug, Default)]
pub struct Provenance {
    /// The lemma whose induction this formula helps.
    pub parent: Option<Term>,
    /// The counterexample generalization this formula blocks.
    pub refutes: Option<Term>,
    /// The k-induction depth used at introduction.
    pub depth: usize,
}

impl Provenance {
    pub fn root() -> Self {
        Provenance::default()
    }

    pub fn new(parent: Option<Term>, refutes: Option<Term>, depth: usize) -> Self {
        Provenance {
            parent,
            refutes,
            depth,
        }
    }
}

/// `spec.md` §3: `(F, d, score)`, plus an attempt counter used to bound
/// retries (§4.6: "re-enqueue O with incremented attempt counter
/// (bounded)").
#[derive(Clone, Debug)]
pub struct Obligation {
    pub formula: Term,
    pub depth: usize,
    pub score: f64,
    pub attempts: usize,
}

impl Obligation {
    pub fn new(formula: Term, depth: usize) -> Self {
        Obligation {
            formula,
            depth,
            score: 0.0,
            attempts: 0,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

/// `spec.md` §3: `(G, k, parent: node|⊥, depth)`.
#[derive(Clone, Debug)]
pub struct CexNode {
    pub cube: Term,
    pub frame: usize,
    pub parent: Option<CexNodeId>,
    pub depth: usize,
}

/// Stable identifier for a [`CexNode`] inside the counterexample DAG
/// (owned by `pdkind-engine::CexManager`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CexNodeId(pub usize);

/// A single state in a reconstructed counterexample trace: the variable
/// bindings a model assigned at one time step, re-expressed over the
/// *current*-namespace variables so every step in a trace uses the same
/// vocabulary (spec.md §8 Soundness-invalid).
#[derive(Clone, Debug, Default)]
pub struct StateAssignment {
    pub bindings: Vec<(VarId, i64)>,
    pub bool_bindings: Vec<(VarId, bool)>,
}
