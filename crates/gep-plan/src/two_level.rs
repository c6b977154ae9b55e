//! Two-level planning: design with one criterion, evaluate adequacy with
//! the probabilistic one.
//!
//! The upper stage solves the system as given (deterministic, reserve
//! margin, or contingency). Its investment decisions are then frozen into a
//! fresh probabilistic model: installed capacities are fixed, the install
//! choices are forced to match, and the policy constraints that belong to
//! the design stage (`lole_cap`, `renewable_portfolio`) are switched off so
//! the lower stage purely measures adequacy.
//!
//! A probabilistic upper system already answers both questions, so it
//! collapses to a single solve.

use crate::builder::{PlanModel, BACKUP_DEFAULT_ZERO, INSTALL_TOL};
use crate::error::{PlanError, PlanResult};
use crate::report::Report;
use crate::{solve_model, PlanOptions};
use gep_core::{OperatingContexts, StateSet, System};
use tracing::{debug, info};

/// Design report plus the adequacy evaluation of that design.
#[derive(Debug, Clone)]
pub struct TwoLevelReport {
    pub design: Report,
    pub adequacy: Report,
}

/// Run the two-level procedure.
///
/// `states` describes the failure states for the adequacy stage. Fails with
/// [`PlanError::UpperInfeasible`] when no design exists and
/// [`PlanError::LowerInfeasible`] when the frozen design cannot serve the
/// failure states.
pub fn plan_two_level(
    sys: &System,
    states: StateSet,
    opts: &PlanOptions,
) -> PlanResult<TwoLevelReport> {
    sys.validate()?;

    if sys.contexts.is_probabilistic() {
        info!("upper stage is already probabilistic, running single-level");
        let report = crate::plan(sys, opts)?;
        return Ok(TwoLevelReport {
            design: report.clone(),
            adequacy: report,
        });
    }

    let upper = PlanModel::build(sys, opts.reformulation, opts.renewable_portfolio)?;
    let outcome = solve_model(&upper, &opts.solver)?;
    if !outcome.status.has_solution() {
        return Err(match outcome.status {
            gep_milp::SolveStatus::Infeasible => PlanError::UpperInfeasible,
            gep_milp::SolveStatus::Unbounded => PlanError::Unbounded,
            _ => PlanError::NoIncumbent,
        });
    }
    let design = Report::extract(sys, &upper, &outcome);
    info!(objective = design.objective, "design stage solved");

    let mut lower_sys = sys.clone();
    lower_sys.contexts = OperatingContexts::Probabilistic(states);
    lower_sys.validate()?;

    let mut lower = PlanModel::build(&lower_sys, opts.reformulation, opts.renewable_portfolio)?;

    // freeze generator installs
    for (&(n, k, t), &upper_var) in &upper.vars.cap_ins {
        let mw = outcome.values[upper_var.0];
        let lower_var = lower.vars.cap_ins[&(n, k, t)];
        let d = lower.vars.install[&(n, k, t)].clone();
        let branch = if mw > INSTALL_TOL { 0 } else { 1 };
        lower.model.force_branch(&d, branch)?;
        lower.model.fix(lower_var, if branch == 0 { mw } else { 0.0 });
    }
    // freeze corridor installs
    for (&(l, t), &upper_var) in &upper.vars.line_cap_ins {
        let mw = outcome.values[upper_var.0];
        let lower_var = lower.vars.line_cap_ins[&(l, t)];
        let d = lower.vars.line_install[&(l, t)].clone();
        let branch = if mw > INSTALL_TOL { 0 } else { 1 };
        lower.model.force_branch(&d, branch)?;
        lower.model.fix(lower_var, if branch == 0 { mw } else { 0.0 });
    }
    // the design stage carries no backup subsystem; it defaults to none
    let backup_keys: Vec<_> = lower.vars.backup_cap_ins.keys().copied().collect();
    for key in backup_keys {
        let d = lower.vars.backup_install[&key].clone();
        lower.model.force_branch(&d, 1)?;
        lower
            .model
            .fix(lower.vars.backup_cap_ins[&key], BACKUP_DEFAULT_ZERO);
    }

    // adequacy evaluation only: design-stage policies come off
    let dropped = lower.model.deactivate_group("lole_cap")
        + lower.model.deactivate_group("renewable_portfolio");
    debug!(dropped, "deactivated design-stage policy rows");

    let lower_outcome = solve_model(&lower, &opts.solver)?;
    if !lower_outcome.status.has_solution() {
        return Err(match lower_outcome.status {
            gep_milp::SolveStatus::Infeasible => PlanError::LowerInfeasible,
            gep_milp::SolveStatus::Unbounded => PlanError::Unbounded,
            _ => PlanError::NoIncumbent,
        });
    }
    let adequacy = Report::extract(&lower_sys, &lower, &lower_outcome);
    info!(
        tlole = ?adequacy.tlole,
        teens = ?adequacy.teens,
        "adequacy stage solved"
    );

    Ok(TwoLevelReport { design, adequacy })
}
