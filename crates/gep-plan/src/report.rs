//! Solution reporting.

use crate::builder::{PlanModel, INSTALL_TOL, SHED_OFF, SHED_ON};
use gep_core::System;
use gep_milp::{SolveOutcome, SolveStatus};
use serde::Serialize;

/// A capacity addition in the plan.
#[derive(Debug, Clone, Serialize)]
pub struct GenInstall {
    pub node: usize,
    pub tech: usize,
    pub tech_name: String,
    pub year: usize,
    pub capacity_mw: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineInstall {
    pub line: usize,
    pub line_name: String,
    pub year: usize,
    pub capacity_mw: f64,
}

/// Objective decomposition, M$.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CostBreakdown {
    pub invest_gen: f64,
    pub invest_line: f64,
    pub invest_backup: f64,
    pub fixed_gen: f64,
    pub fixed_line: f64,
    pub fixed_backup: f64,
    pub var_gen: f64,
    pub var_line: f64,
    pub var_backup: f64,
    pub eens_penalty: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.invest_gen
            + self.invest_line
            + self.invest_backup
            + self.fixed_gen
            + self.fixed_line
            + self.fixed_backup
            + self.var_gen
            + self.var_line
            + self.var_backup
            + self.eens_penalty
    }
}

/// Complete solve report for one planning model.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub status: ReportStatus,
    pub objective: f64,
    pub costs: CostBreakdown,
    pub gen_installs: Vec<GenInstall>,
    pub line_installs: Vec<LineInstall>,
    pub backup_installs: Vec<GenInstall>,
    /// Probability-weighted expected loss-of-load hours per year; empty
    /// outside the probabilistic criterion.
    pub tlole: Vec<f64>,
    /// Probability-weighted expected energy not served per year, MWh.
    pub teens: Vec<f64>,
    pub mip_gap: Option<f64>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportStatus {
    Optimal,
    /// Best solution found before the time limit ran out.
    Incumbent,
}

impl Report {
    /// Extract a report from a solved model. The caller has already
    /// established that `outcome` carries a solution.
    pub(crate) fn extract(sys: &System, plan: &PlanModel, outcome: &SolveOutcome) -> Report {
        let values = &outcome.values;
        let eval = |e: &gep_milp::LinExpr| e.eval(values);

        let costs = CostBreakdown {
            invest_gen: eval(&plan.costs.invest_gen),
            invest_line: eval(&plan.costs.invest_line),
            invest_backup: eval(&plan.costs.invest_backup),
            fixed_gen: eval(&plan.costs.fixed_gen),
            fixed_line: eval(&plan.costs.fixed_line),
            fixed_backup: eval(&plan.costs.fixed_backup),
            var_gen: eval(&plan.costs.var_gen),
            var_line: eval(&plan.costs.var_line),
            var_backup: eval(&plan.costs.var_backup),
            eens_penalty: eval(&plan.costs.eens_penalty),
        };

        let mut gen_installs = Vec::new();
        for (&(n, k, t), &v) in &plan.vars.cap_ins {
            let mw = values[v.0];
            if mw > INSTALL_TOL {
                gen_installs.push(GenInstall {
                    node: n,
                    tech: k,
                    tech_name: sys.techs[k].name.clone(),
                    year: t,
                    capacity_mw: mw,
                });
            }
        }
        let mut line_installs = Vec::new();
        for (&(l, t), &v) in &plan.vars.line_cap_ins {
            let mw = values[v.0];
            if mw > INSTALL_TOL {
                line_installs.push(LineInstall {
                    line: l,
                    line_name: sys.lines[l].name.clone(),
                    year: t,
                    capacity_mw: mw,
                });
            }
        }
        let mut backup_installs = Vec::new();
        for (&(n, k, t), &v) in &plan.vars.backup_cap_ins {
            let mw = values[v.0];
            if mw > INSTALL_TOL {
                backup_installs.push(GenInstall {
                    node: n,
                    tech: k,
                    tech_name: sys.techs[k].name.clone(),
                    year: t,
                    capacity_mw: mw,
                });
            }
        }

        let tlole: Vec<f64> = plan.vars.tlole.iter().map(eval).collect();
        let teens: Vec<f64> = plan.vars.teens.iter().map(eval).collect();

        let mut warnings = Vec::new();
        // shed landing between the regime thresholds means neither branch
        // of the shedding disjunction truly held
        for (&(ctx, n, t, p, b), _) in &plan.vars.shed_regime {
            let shed = values[plan.vars.shed[&(ctx, n, t, p, b)].0];
            if shed > SHED_OFF && shed < SHED_ON {
                tracing::warn!(
                    shed,
                    state = ctx,
                    node = n,
                    year = t,
                    "shed value inside the regime dead zone"
                );
                warnings.push(format!(
                    "shed {shed:.2e} MW at node {n} in state {ctx}, year {t}, period {p}, \
                     sub {b} falls between the event thresholds"
                ));
            }
        }
        if let SolveStatus::TimeLimit { .. } = outcome.status {
            warnings.push("time limit reached; plan is the best incumbent, not proven optimal".into());
        }

        Report {
            status: match outcome.status {
                SolveStatus::Optimal => ReportStatus::Optimal,
                _ => ReportStatus::Incumbent,
            },
            objective: outcome.objective.unwrap_or(f64::NAN),
            costs,
            gen_installs,
            line_installs,
            backup_installs,
            tlole,
            teens,
            mip_gap: outcome.gap,
            warnings,
        }
    }

    pub fn total_gen_added_mw(&self) -> f64 {
        self.gen_installs.iter().map(|g| g.capacity_mw).sum()
    }

    pub fn total_line_added_mw(&self) -> f64 {
        self.line_installs.iter().map(|l| l.capacity_mw).sum()
    }

    /// Format a human-readable summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Expansion Plan Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!(
            "Status: {}\n",
            match self.status {
                ReportStatus::Optimal => "Optimal",
                ReportStatus::Incumbent => "Incumbent (time limit)",
            }
        ));
        s.push_str(&format!("Total Cost: {:.3} M$\n", self.objective));
        s.push_str(&format!(
            "  Investment: {:.3} M$ (gen {:.3}, line {:.3}, backup {:.3})\n",
            self.costs.invest_gen + self.costs.invest_line + self.costs.invest_backup,
            self.costs.invest_gen,
            self.costs.invest_line,
            self.costs.invest_backup,
        ));
        s.push_str(&format!(
            "  Fixed:      {:.3} M$\n",
            self.costs.fixed_gen + self.costs.fixed_line + self.costs.fixed_backup
        ));
        s.push_str(&format!(
            "  Variable:   {:.3} M$\n",
            self.costs.var_gen + self.costs.var_line + self.costs.var_backup
        ));
        if self.costs.eens_penalty != 0.0 {
            s.push_str(&format!("  EENS penalty: {:.3} M$\n", self.costs.eens_penalty));
        }
        s.push_str(&format!(
            "Generation added: {:.1} MW across {} decisions\n",
            self.total_gen_added_mw(),
            self.gen_installs.len()
        ));
        for g in &self.gen_installs {
            s.push_str(&format!(
                "  node {} / {} / year {}: {:.1} MW\n",
                g.node, g.tech_name, g.year, g.capacity_mw
            ));
        }
        s.push_str(&format!(
            "Transmission added: {:.1} MW across {} decisions\n",
            self.total_line_added_mw(),
            self.line_installs.len()
        ));
        for l in &self.line_installs {
            s.push_str(&format!(
                "  {} / year {}: {:.1} MW\n",
                l.line_name, l.year, l.capacity_mw
            ));
        }
        if !self.backup_installs.is_empty() {
            s.push_str("Backup added:\n");
            for g in &self.backup_installs {
                s.push_str(&format!(
                    "  node {} / {} / year {}: {:.1} MW\n",
                    g.node, g.tech_name, g.year, g.capacity_mw
                ));
            }
        }
        for (t, (lole, eens)) in self.tlole.iter().zip(&self.teens).enumerate() {
            s.push_str(&format!(
                "Year {t}: TLOLE {lole:.4} h, TEENS {eens:.4} MWh\n"
            ));
        }
        for w in &self.warnings {
            s.push_str(&format!("warning: {w}\n"));
        }
        s
    }
}
