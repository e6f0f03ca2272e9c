use failure::Fail;

/// The error taxonomy of spec.md §7. A single enum shared by every crate
/// in the workspace so propagation between layers is a plain `?` — the
/// driver is the only place that ever inspects a variant to decide
/// whether to convert it into a query verdict (§7: "The driver converts
/// `BackendUnknown` and `ResourceExhausted` into a query verdict of
/// `unknown`... all other errors are surfaced to the embedding caller").
#[derive(Fail, Debug)]
pub enum Error {
    /// Unrecognized option, missing engine/solver.
    #[fail(display = "config error: {}", _0)]
    Config(String),
    /// Malformed input. Raised by the parser frontend; the core only
    /// ever propagates this, never constructs it.
    #[fail(display = "parse error: {}", _0)]
    Parse(String),
    /// Push/pop mismatch, reading a model outside `sat`, interpolating
    /// outside `unsat`.
    #[fail(display = "protocol error: {}", _0)]
    Protocol(String),
    /// The backend returned `unknown` on a query the core cannot
    /// side-step.
    #[fail(display = "backend returned unknown: {}", _0)]
    BackendUnknown(String),
    /// Exceeded a frame/frame-size/attempt limit, or cancellation was
    /// requested.
    #[fail(display = "resource exhausted: {}", _0)]
    ResourceExhausted(String),
    /// An internal invariant was violated (e.g. provenance monotonicity).
    /// Always fatal — never converted into a query verdict.
    #[fail(display = "internal error: {}", _0)]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
