//! The `Backend` trait: the narrow seam between [`crate::Facade`] and a
//! concrete decision procedure (spec.md §4.2). Everything above this trait
//! — push/pop bookkeeping, protocol-error guarding, quickxplain shrinking —
//! lives in `facade.rs` and is backend-agnostic.

pub mod naive;

use crate::{CheckResult, Class, Direction, Model};
use pdkind_term::{Term, TermManager, VarId};

pub use crate::BackendFeatures;

/// A quantifier-free decision procedure over the assertions handed to it,
/// scoped by `push`/`pop` and partitioned by [`Class`].
///
/// Implementors own their own notion of "the current context"; `Facade`
/// only ever calls these methods in a disciplined order (`check` before
/// `model`/`generalize`, `check` returning `Unsat` before `interpolate`).
pub trait Backend {
    fn features(&self) -> BackendFeatures;

    /// Declares `v` as belonging to `class` for the purposes of a later
    /// `generalize`/`interpolate` call that restricts its result to one
    /// class's variables (spec.md §4.2: "mentioning only variables of the
    /// chosen class"/"shared variables").
    fn add_variable(&mut self, v: VarId, class: Class);

    /// Asserts `f`, tagged with the class it belongs to.
    fn add(&mut self, tm: &TermManager, f: Term, class: Class);

    /// Opens a new scope; a later `pop` removes every assertion and
    /// variable tag added since the matching `push`.
    fn push(&mut self);

    /// Closes the innermost scope. `Facade` never calls this without a
    /// matching `push` (that invariant is enforced at the façade layer).
    fn pop(&mut self);

    fn check(&mut self, tm: &TermManager) -> CheckResult;

    /// The model found by the most recent `check` that returned `Sat`.
    fn model(&self) -> Option<&Model>;

    /// A cube entailed by the current assertions and the most recent
    /// `Sat` model, mentioning only variables of the class implied by
    /// `direction` (`Backward` => `Class::A`, `Forward` => `Class::B`).
    /// Not yet minimized — `Facade::generalize` shrinks the result via
    /// quickxplain.
    fn generalize(&mut self, tm: &mut TermManager, direction: Direction) -> Option<Term>;

    /// A Craig interpolant for the most recent `check` that returned
    /// `Unsat`: `A => I` and `I ∧ B` is unsat, mentioning only variables
    /// shared between `Class::A` and `Class::B`. Not yet minimized.
    fn interpolate(&mut self, tm: &mut TermManager) -> Option<Term>;
}
