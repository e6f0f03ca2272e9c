use pdkind_term::Term;

/// Input dialect accepted by `run_on_source` (spec.md §6.1, §9 Open
/// Question: both dialects are accepted, there is no one-argument legacy
/// form).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// The native state-machine command language (spec.md §6.2).
    Mcmt,
    /// Constrained Horn clauses, lowered to a transition system by the
    /// frontend before reaching the core (spec.md §8 scenario S5).
    Chc,
}

/// One command from the textual command language (spec.md §6.2), already
/// lowered to core term references by the (external) frontend. The core
/// only ever consumes commands in this shape; parsing text into `Command`
/// values is the frontend's job (`pdkind-integration::parser`).
#[derive(Clone, Debug)]
pub enum Command {
    /// `(lemma <system-id> <level> <term>)`
    Lemma {
        system_id: String,
        level: usize,
        term: Term,
    },
    /// `(ilemma <system-id> <level> <term> <cex> <cex-depth>)`
    InductionLemma {
        system_id: String,
        level: usize,
        term: Term,
        cex: Term,
        cex_depth: usize,
    },
    /// `(query <system-id> <term>)`
    Query { system_id: String, term: Term },
}
