use thiserror::Error;

/// Business and infrastructure outcomes surfaced by the batching controller.
///
/// Malformed orders, unknown entities, and infeasible deadlines are all
/// normal business outcomes and are modeled here alongside the genuinely
/// fatal `BindFailure` rather than as panics.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("malformed order: {0}")]
    MalformedOrder(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("no feasible station before deadline")]
    NoFeasibleStation,

    #[error("authoritative store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("failed to bind socket: {0}")]
    BindFailure(String),
}
