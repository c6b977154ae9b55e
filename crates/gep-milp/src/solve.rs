//! Translation to HiGHS and status mapping.

use crate::error::{MilpError, MilpResult};
use crate::expr::LinExpr;
use crate::model::{Cmp, Model, Sense, VarKind};
use highs::{HighsModelStatus, RowProblem};
use std::ops::Bound;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Solver knobs passed through to HiGHS.
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Wall-clock limit in seconds.
    pub time_limit: Option<f64>,
    /// Relative MIP gap at which the search stops.
    pub mip_rel_gap: Option<f64>,
    pub threads: Option<i32>,
    /// Let HiGHS write its own log to stdout.
    pub solver_output: bool,
}

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    /// The time limit was hit; an incumbent may or may not exist.
    TimeLimit { has_incumbent: bool },
    Infeasible,
    Unbounded,
}

impl SolveStatus {
    /// Whether column values are meaningful.
    pub fn has_solution(&self) -> bool {
        matches!(
            self,
            SolveStatus::Optimal | SolveStatus::TimeLimit { has_incumbent: true }
        )
    }
}

/// Result of a solve: status, objective, and column values in [`crate::VarId`]
/// order. `values` is empty when no solution exists.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub values: Vec<f64>,
    /// Relative MIP gap of the returned solution, when known.
    pub gap: Option<f64>,
    pub wall_time: Duration,
}

impl SolveOutcome {
    /// Value of an expression under the returned solution.
    pub fn eval(&self, expr: &LinExpr) -> Option<f64> {
        self.status.has_solution().then(|| expr.eval(&self.values))
    }
}

/// Whether a column vector is a feasible point of the model.
///
/// HiGHS hands back a full-length, zero-filled column vector even when the
/// search produced no incumbent, so vector length says nothing; the only
/// reliable check is against the bounds and active rows themselves.
fn satisfies(model: &Model, values: &[f64]) -> bool {
    if values.len() != model.var_count() {
        return false;
    }
    let tol = 1e-6;
    for (def, &v) in model.vars.iter().zip(values) {
        if v < def.lower - tol || v > def.upper + tol {
            return false;
        }
    }
    for row in &model.rows {
        if !row.active {
            continue;
        }
        let lhs = row.expr.eval(values);
        let slack = tol * (1.0 + row.rhs.abs());
        let ok = match row.cmp {
            Cmp::Le => lhs <= row.rhs + slack,
            Cmp::Ge => lhs >= row.rhs - slack,
            Cmp::Eq => (lhs - row.rhs).abs() <= slack,
        };
        if !ok {
            return false;
        }
    }
    true
}

fn range_of(lo: f64, hi: f64) -> (Bound<f64>, Bound<f64>) {
    let l = if lo.is_finite() {
        Bound::Included(lo)
    } else {
        Bound::Unbounded
    };
    let u = if hi.is_finite() {
        Bound::Included(hi)
    } else {
        Bound::Unbounded
    };
    (l, u)
}

/// Solve `model` with the given objective.
///
/// Deactivated rows are skipped during translation; fixed variables keep
/// their collapsed bounds. The reported objective is evaluated from the
/// expression so constant terms survive the round trip.
pub fn solve(
    model: &Model,
    sense: Sense,
    objective: &LinExpr,
    config: &SolverConfig,
) -> MilpResult<SolveOutcome> {
    let objective = objective.clone().compact();
    for &(v, _) in objective.terms() {
        model.check_var(v)?;
    }

    let mut obj_coefs = vec![0.0; model.var_count()];
    for &(v, c) in objective.terms() {
        obj_coefs[v.0] = c;
    }

    let mut pb = RowProblem::default();
    let cols: Vec<highs::Col> = model
        .vars
        .iter()
        .enumerate()
        .map(|(i, def)| match def.kind {
            VarKind::Continuous => pb.add_column(obj_coefs[i], range_of(def.lower, def.upper)),
            VarKind::Binary => pb.add_integer_column(obj_coefs[i], range_of(def.lower, def.upper)),
        })
        .collect();

    let mut active_rows = 0;
    for row in &model.rows {
        if !row.active {
            continue;
        }
        let rhs = row.rhs - row.expr.constant_part();
        let factors: Vec<(highs::Col, f64)> = row
            .expr
            .terms()
            .iter()
            .map(|&(v, c)| (cols[v.0], c))
            .collect();
        match row.cmp {
            Cmp::Le => pb.add_row(..=rhs, &factors),
            Cmp::Ge => pb.add_row(rhs.., &factors),
            Cmp::Eq => pb.add_row(rhs..=rhs, &factors),
        };
        active_rows += 1;
    }
    debug!(
        columns = model.var_count(),
        rows = active_rows,
        "translated model"
    );

    let highs_sense = match sense {
        Sense::Minimize => highs::Sense::Minimise,
        Sense::Maximize => highs::Sense::Maximise,
    };
    let mut solver = pb.optimise(highs_sense);
    solver.set_option("output_flag", config.solver_output);
    if let Some(limit) = config.time_limit {
        solver.set_option("time_limit", limit);
    }
    if let Some(gap) = config.mip_rel_gap {
        solver.set_option("mip_rel_gap", gap);
    }
    if let Some(threads) = config.threads {
        solver.set_option("threads", threads);
    }

    let started = Instant::now();
    let solved = solver
        .try_solve()
        .map_err(|status| MilpError::Solver(format!("HiGHS returned {status:?}")))?;
    let wall_time = started.elapsed();

    let status = solved.status();
    let outcome = match status {
        HighsModelStatus::Optimal => {
            let values = solved.get_solution().columns().to_vec();
            let objective_value = objective.eval(&values);
            info!(objective = objective_value, "optimal solution");
            SolveOutcome {
                status: SolveStatus::Optimal,
                objective: Some(objective_value),
                values,
                gap: Some(0.0),
                wall_time,
            }
        }
        HighsModelStatus::ReachedTimeLimit => {
            let values = solved.get_solution().columns().to_vec();
            let has_incumbent = satisfies(model, &values);
            if has_incumbent {
                let objective_value = objective.eval(&values);
                warn!(objective = objective_value, "time limit hit, returning incumbent");
                SolveOutcome {
                    status: SolveStatus::TimeLimit { has_incumbent: true },
                    objective: Some(objective_value),
                    values,
                    gap: None,
                    wall_time,
                }
            } else {
                warn!("time limit hit with no incumbent");
                SolveOutcome {
                    status: SolveStatus::TimeLimit { has_incumbent: false },
                    objective: None,
                    values: Vec::new(),
                    gap: None,
                    wall_time,
                }
            }
        }
        HighsModelStatus::Infeasible => SolveOutcome {
            status: SolveStatus::Infeasible,
            objective: None,
            values: Vec::new(),
            gap: None,
            wall_time,
        },
        HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => SolveOutcome {
            status: SolveStatus::Unbounded,
            objective: None,
            values: Vec::new(),
            gap: None,
            wall_time,
        },
        other => {
            return Err(MilpError::Solver(format!(
                "unexpected model status {other:?}"
            )))
        }
    };
    Ok(outcome)
}
