use thiserror::Error;

/// Errors from building or solving a planning model.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Core(#[from] gep_core::CoreError),

    #[error(transparent)]
    Milp(#[from] gep_milp::MilpError),

    /// The design model has no feasible expansion plan. Fatal: there is
    /// nothing to hand to the adequacy stage.
    #[error("design model is infeasible")]
    UpperInfeasible,

    /// The adequacy model rejected the fixed design. Distinct from
    /// [`PlanError::UpperInfeasible`] so callers can tell which stage failed.
    #[error("adequacy model is infeasible under the fixed design")]
    LowerInfeasible,

    /// The solver hit its time limit before finding any feasible point.
    #[error("time limit reached with no incumbent solution")]
    NoIncumbent,

    #[error("model is unbounded; check cost signs and bounds")]
    Unbounded,
}

pub type PlanResult<T> = Result<T, PlanError>;
