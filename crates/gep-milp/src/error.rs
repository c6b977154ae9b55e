use thiserror::Error;

/// Errors from model construction or the solve layer.
#[derive(Error, Debug)]
pub enum MilpError {
    /// A disjunction was declared with no branches.
    #[error("disjunction {name} has no branches")]
    EmptyDisjunction { name: String },

    /// Big-M derivation needs finite activity bounds on every branch
    /// constraint; an unbounded variable makes the reformulation invalid.
    #[error("cannot derive a finite big-M for {constraint}: unbounded expression")]
    UnboundedBigM { constraint: String },

    /// A branch index outside the disjunction.
    #[error("disjunction {name} has {branches} branches, branch {requested} requested")]
    NoSuchBranch {
        name: String,
        branches: usize,
        requested: usize,
    },

    /// Structural misuse of the model IR.
    #[error("{0}")]
    Construction(String),

    /// The solver reported a status the translation layer cannot map.
    #[error("solver: {0}")]
    Solver(String),
}

pub type MilpResult<T> = Result<T, MilpError>;
