//! Model assembly.
//!
//! [`PlanBuilder`] walks a validated [`System`] and emits the mixed-integer
//! model for its operating contexts: investment disjunctions, per-context
//! operational constraints, reliability requirements, and the cost
//! objective. Construction is deterministic, so rebuilding the same system
//! yields identical variable numbering; the two-level driver depends on
//! this when it transplants a design into a fresh adequacy model.

use gep_core::{LineBuild, OperatingContexts, System, TechBuild};
use gep_milp::{Disjunction, DisjunctionMode, LinExpr, MilpResult, Model, VarId};
use std::collections::BTreeMap;
use tracing::debug;

/// Installed capacity below this is treated as "not built".
pub const INSTALL_TOL: f64 = 1e-6;
/// Backup capacity handed to the adequacy stage when the design stage
/// carries no backup subsystem.
pub const BACKUP_DEFAULT_ZERO: f64 = 0.0;
/// Load shed at or above this counts as a loss-of-load event, MW.
pub const SHED_ON: f64 = 2e-5;
/// Load shed at or below this counts as no event, MW.
pub const SHED_OFF: f64 = 1e-5;

/// Handles to every decision variable, keyed by dense indices.
///
/// Generator keys are `(node, tech, year)`, operational keys lead with the
/// context index. Maps only hold keys that exist for the formulation: no
/// reserve split outside the reserve-margin criterion, no backup or
/// shedding regime outside the probabilistic one.
#[derive(Debug, Clone, Default)]
pub struct PlanVars {
    pub cap_ins: BTreeMap<(usize, usize, usize), VarId>,
    pub invest_gen: BTreeMap<(usize, usize, usize), VarId>,
    pub install: BTreeMap<(usize, usize, usize), Disjunction>,

    pub line_cap_ins: BTreeMap<(usize, usize), VarId>,
    pub line_invest: BTreeMap<(usize, usize), VarId>,
    pub line_install: BTreeMap<(usize, usize), Disjunction>,

    /// `(ctx, node, tech, year, period, sub)`
    pub dispatch: BTreeMap<(usize, usize, usize, usize, usize, usize), VarId>,
    /// `(ctx, line, year, period, sub)`
    pub flow: BTreeMap<(usize, usize, usize, usize, usize), VarId>,
    pub flow_pos: BTreeMap<(usize, usize, usize, usize, usize), VarId>,
    pub flow_neg: BTreeMap<(usize, usize, usize, usize, usize), VarId>,
    /// `(ctx, node, year, period, sub)`
    pub shed: BTreeMap<(usize, usize, usize, usize, usize), VarId>,
    pub over_gen: BTreeMap<(usize, usize, usize, usize, usize), VarId>,

    /// `(node, tech, year, period, sub)`
    pub cap_opt: BTreeMap<(usize, usize, usize, usize, usize), VarId>,
    pub cap_rev: BTreeMap<(usize, usize, usize, usize, usize), VarId>,

    pub backup_cap_ins: BTreeMap<(usize, usize, usize), VarId>,
    pub backup_invest: BTreeMap<(usize, usize, usize), VarId>,
    pub backup_install: BTreeMap<(usize, usize, usize), Disjunction>,
    /// `(ctx, node, tech, year, period, sub)`
    pub backup_out: BTreeMap<(usize, usize, usize, usize, usize, usize), VarId>,

    /// `(ctx, node, year, period, sub)`
    pub lole: BTreeMap<(usize, usize, usize, usize, usize), VarId>,
    pub eens: BTreeMap<(usize, usize, usize, usize, usize), VarId>,
    pub shed_regime: BTreeMap<(usize, usize, usize, usize, usize), Disjunction>,

    /// Duration-weighted expected loss, one expression per year.
    pub tlole: Vec<LinExpr>,
    pub teens: Vec<LinExpr>,
}

/// Objective sub-terms, kept as expressions so a report can evaluate each
/// one separately against the solved column values. All in M$.
#[derive(Debug, Clone, Default)]
pub struct CostTerms {
    pub invest_gen: LinExpr,
    pub invest_line: LinExpr,
    pub invest_backup: LinExpr,
    pub fixed_gen: LinExpr,
    pub fixed_line: LinExpr,
    pub fixed_backup: LinExpr,
    pub var_gen: LinExpr,
    pub var_line: LinExpr,
    pub var_backup: LinExpr,
    pub eens_penalty: LinExpr,
}

impl CostTerms {
    pub fn total(&self) -> LinExpr {
        LinExpr::sum([
            self.invest_gen.clone(),
            self.invest_line.clone(),
            self.invest_backup.clone(),
            self.fixed_gen.clone(),
            self.fixed_line.clone(),
            self.fixed_backup.clone(),
            self.var_gen.clone(),
            self.var_line.clone(),
            self.var_backup.clone(),
            self.eens_penalty.clone(),
        ])
    }
}

/// The assembled model with its variable handles and cost terms.
#[derive(Debug, Clone)]
pub struct PlanModel {
    pub model: Model,
    pub vars: PlanVars,
    pub costs: CostTerms,
}

impl PlanModel {
    /// Build the model for a validated system. `portfolio` toggles the
    /// renewable share requirement.
    pub fn build(sys: &System, mode: DisjunctionMode, portfolio: bool) -> MilpResult<Self> {
        let mut b = PlanBuilder {
            sys,
            mode,
            portfolio,
            model: Model::new(),
            vars: PlanVars::default(),
            costs: CostTerms::default(),
        };
        b.investment()?;
        b.reserve_split();
        b.backup_investment()?;
        b.operations();
        b.reliability()?;
        b.objective();
        debug!(
            vars = b.model.var_count(),
            constraints = b.model.constraint_count(),
            "assembled planning model"
        );
        Ok(PlanModel {
            model: b.model,
            vars: b.vars,
            costs: b.costs,
        })
    }
}

pub(crate) struct PlanBuilder<'a> {
    pub sys: &'a System,
    pub mode: DisjunctionMode,
    pub portfolio: bool,
    pub model: Model,
    pub vars: PlanVars,
    pub costs: CostTerms,
}

impl PlanBuilder<'_> {
    /// Number of operational contexts the formulation replicates.
    pub fn contexts(&self) -> usize {
        self.sys.contexts.count()
    }

    /// Objective weight of each context.
    pub fn context_weights(&self) -> Vec<f64> {
        match &self.sys.contexts {
            OperatingContexts::Deterministic | OperatingContexts::ReserveMargin => vec![1.0],
            OperatingContexts::Contingency(s) => s.rates.clone(),
            OperatingContexts::Probabilistic(s) => s.probabilities.clone(),
        }
    }

    /// Cumulative available generator capacity as an expression, MW.
    pub fn avail_gen(&self, n: usize, k: usize, t: usize) -> LinExpr {
        match self.sys.techs[k].build {
            TechBuild::Expandable { .. } => {
                let mut e = LinExpr::new();
                for tau in 0..=t {
                    if let Some(&v) = self.vars.cap_ins.get(&(n, k, tau)) {
                        e.add_term(v, 1.0);
                    }
                }
                e
            }
            TechBuild::Existing => LinExpr::constant(self.sys.params.legacy_gen.get([n, k])),
        }
    }

    /// Largest capacity `avail_gen` can reach, for finite variable bounds.
    pub fn max_avail_gen(&self, n: usize, k: usize) -> f64 {
        match self.sys.techs[k].build {
            TechBuild::Expandable { max_install, .. } => {
                if self.sys.is_excluded(gep_core::NodeId(n), gep_core::TechId(k)) {
                    0.0
                } else {
                    max_install * self.sys.time.years as f64
                }
            }
            TechBuild::Existing => self.sys.params.legacy_gen.get([n, k]),
        }
    }

    pub fn avail_line(&self, l: usize, t: usize) -> LinExpr {
        match self.sys.lines[l].build {
            LineBuild::Expandable { .. } => {
                let mut e = LinExpr::new();
                for tau in 0..=t {
                    if let Some(&v) = self.vars.line_cap_ins.get(&(l, tau)) {
                        e.add_term(v, 1.0);
                    }
                }
                e
            }
            LineBuild::Existing { legacy_capacity } => LinExpr::constant(legacy_capacity),
        }
    }

    pub fn max_avail_line(&self, l: usize) -> f64 {
        match self.sys.lines[l].build {
            LineBuild::Expandable { max_install, .. } => {
                max_install * self.sys.time.years as f64
            }
            LineBuild::Existing { legacy_capacity } => legacy_capacity,
        }
    }

    pub fn avail_backup(&self, n: usize, k: usize, t: usize) -> LinExpr {
        let mut e = LinExpr::new();
        for tau in 0..=t {
            if let Some(&v) = self.vars.backup_cap_ins.get(&(n, k, tau)) {
                e.add_term(v, 1.0);
            }
        }
        e
    }

    pub fn max_avail_backup(&self, k: usize) -> f64 {
        self.sys.params.backup_max_install[k] * self.sys.time.years as f64
    }

    /// Capacity survival factor of a generator in a context.
    ///
    /// Under the contingency criterion, units without a per-subperiod outage
    /// trajectory (existing and renewable) see the scenario through its
    /// time-averaged factor instead.
    pub fn gen_factor(&self, ctx: usize, n: usize, k: usize, p: usize, b: usize) -> f64 {
        match &self.sys.contexts {
            OperatingContexts::Deterministic | OperatingContexts::ReserveMargin => 1.0,
            OperatingContexts::Contingency(s) => {
                let tech = &self.sys.techs[k];
                if tech.is_expandable() && tech.is_dispatchable() {
                    s.gen_survival.get([ctx, n, k, p, b])
                } else {
                    s.avg_gen_survival(ctx, n, k)
                }
            }
            OperatingContexts::Probabilistic(s) => s.gen_survival.get([ctx, n, k]),
        }
    }

    pub fn line_factor(&self, ctx: usize, l: usize, p: usize, b: usize) -> f64 {
        match &self.sys.contexts {
            OperatingContexts::Deterministic | OperatingContexts::ReserveMargin => 1.0,
            OperatingContexts::Contingency(s) => s.line_survival.get([ctx, l, p, b]),
            OperatingContexts::Probabilistic(s) => s.line_survival.get([ctx, l]),
        }
    }

    /// Survival factor applied to capacity in fixed-cost accounting:
    /// per-state under the probabilistic criterion, time-averaged under
    /// the contingency one.
    pub fn avg_gen_factor(&self, ctx: usize, n: usize, k: usize) -> f64 {
        match &self.sys.contexts {
            OperatingContexts::Deterministic | OperatingContexts::ReserveMargin => 1.0,
            OperatingContexts::Contingency(s) => s.avg_gen_survival(ctx, n, k),
            OperatingContexts::Probabilistic(s) => s.gen_survival.get([ctx, n, k]),
        }
    }

    pub fn avg_line_factor(&self, ctx: usize, l: usize) -> f64 {
        match &self.sys.contexts {
            OperatingContexts::Deterministic | OperatingContexts::ReserveMargin => 1.0,
            OperatingContexts::Contingency(s) => {
                let periods = self.sys.time.periods();
                let subs = self.sys.time.subperiods();
                let mut sum = 0.0;
                for p in 0..periods {
                    for b in 0..subs {
                        sum += s.line_survival.get([ctx, l, p, b]);
                    }
                }
                sum / (periods * subs) as f64
            }
            OperatingContexts::Probabilistic(s) => s.line_survival.get([ctx, l]),
        }
    }

    /// Backup survival factor in a state. Only the probabilistic criterion
    /// carries a backup subsystem.
    pub fn backup_factor(&self, ctx: usize, n: usize, k: usize) -> f64 {
        match &self.sys.contexts {
            OperatingContexts::Probabilistic(s) => s.backup_survival.get([ctx, n, k]),
            _ => 1.0,
        }
    }

    /// Capacity expression a unit dispatches against. Reserve-margin keeps
    /// the reserved share of each subperiod out of reach.
    pub fn dispatch_cap(&self, n: usize, k: usize, t: usize, p: usize, b: usize) -> LinExpr {
        if let Some(&v) = self.vars.cap_opt.get(&(n, k, t, p, b)) {
            LinExpr::var(v)
        } else {
            self.avail_gen(n, k, t)
        }
    }
}
