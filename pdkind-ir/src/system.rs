use crate::state::StateType;
use pdkind_term::Term;

/// `spec.md` §3: `(ST, Init: state formula, Trans: transition formula)`.
/// Immutable for the duration of a query.
#[derive(Clone, Debug)]
pub struct TransitionSystem {
    pub state_type: StateType,
    pub init: Term,
    pub trans: Term,
}

impl TransitionSystem {
    pub fn new(state_type: StateType, init: Term, trans: Term) -> Self {
        TransitionSystem {
            state_type,
            init,
            trans,
        }
    }
}
