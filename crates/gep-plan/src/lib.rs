//! # gep-plan: disjunctive expansion-planning formulations
//!
//! Builds and solves multi-period generation and transmission expansion
//! plans over a [`gep_core::System`]. The reliability criterion is chosen
//! by the system's operating contexts:
//!
//! - deterministic: a single operational replica, no reliability rule;
//! - reserve margin: capacity splits into operating and reserved shares,
//!   the reserve covering a fixed fraction of nodal demand;
//! - contingency: operations replicate over N-k outage scenarios with
//!   capacity survival factors;
//! - probabilistic: operations replicate over failure states, with backup
//!   investment, load-shedding, and LOLE/EENS accounting.
//!
//! Investment decisions are disjunctions (install within a sizing window,
//! or not at all), compiled to big-M or convex-hull form by `gep-milp`.
//!
//! [`plan`] runs one formulation end to end; [`plan_two_level`] designs
//! under one criterion and evaluates the design's adequacy under the
//! probabilistic one.

mod builder;
mod capacity;
mod error;
mod objective;
mod operations;
mod reliability;
mod report;
mod two_level;

pub use builder::{
    CostTerms, PlanModel, PlanVars, BACKUP_DEFAULT_ZERO, INSTALL_TOL, SHED_OFF, SHED_ON,
};
pub use error::{PlanError, PlanResult};
pub use report::{CostBreakdown, GenInstall, LineInstall, Report, ReportStatus};
pub use two_level::{plan_two_level, TwoLevelReport};

use gep_core::System;
use gep_milp::{solve, DisjunctionMode, Sense, SolveOutcome, SolverConfig};
use tracing::info;

/// Options shared by every solve.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub reformulation: DisjunctionMode,
    pub solver: SolverConfig,
    /// Enforce the renewable share targets when the system has renewable
    /// technologies.
    pub renewable_portfolio: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions {
            reformulation: DisjunctionMode::default(),
            solver: SolverConfig::default(),
            renewable_portfolio: true,
        }
    }
}

/// Solve an assembled planning model.
pub fn solve_model(plan: &PlanModel, config: &SolverConfig) -> PlanResult<SolveOutcome> {
    let objective = plan.costs.total();
    Ok(solve(&plan.model, Sense::Minimize, &objective, config)?)
}

/// Build and solve the formulation the system's contexts select.
pub fn plan(sys: &System, opts: &PlanOptions) -> PlanResult<Report> {
    sys.validate()?;
    let model = PlanModel::build(sys, opts.reformulation, opts.renewable_portfolio)?;
    info!(
        contexts = sys.contexts.count(),
        vars = model.model.var_count(),
        "solving planning model"
    );
    let outcome = solve_model(&model, &opts.solver)?;
    if !outcome.status.has_solution() {
        return Err(match outcome.status {
            gep_milp::SolveStatus::Infeasible => PlanError::UpperInfeasible,
            gep_milp::SolveStatus::Unbounded => PlanError::Unbounded,
            _ => PlanError::NoIncumbent,
        });
    }
    Ok(Report::extract(sys, &model, &outcome))
}
