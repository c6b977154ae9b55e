//! Reliability layer: reserve requirements, backup investment, the
//! shedding-regime disjunction, and the loss-of-load cap.

use crate::builder::{PlanBuilder, SHED_OFF, SHED_ON};
use gep_core::OperatingContexts;
use gep_milp::{Branch, Cmp, LinExpr, MilpResult};

impl PlanBuilder<'_> {
    /// Backup install-or-skip disjunctions, probabilistic criterion only.
    /// Backup is sized per (node, technology, year) like main capacity, and
    /// can never exceed the main unit's available capacity.
    pub(crate) fn backup_investment(&mut self) -> MilpResult<()> {
        if !self.sys.contexts.is_probabilistic() {
            return Ok(());
        }
        for n in 0..self.sys.nodes {
            for k in self.sys.expandable_dispatchable().collect::<Vec<_>>() {
                let min_ins = self.sys.params.backup_min_install[k.0];
                let max_ins = self.sys.params.backup_max_install[k.0];
                for t in 0..self.sys.time.years {
                    let cap = self.model.add_var(
                        format!("cap_b_ins[n{n},k{},t{t}]", k.0),
                        0.0,
                        max_ins,
                    );
                    let ic_ub = self.sys.backup_invest_cost_ub(k, t);
                    let ic = self
                        .model
                        .add_var(format!("ic_bkp[n{n},k{},t{t}]", k.0), 0.0, ic_ub);
                    let unit_ic = self.sys.params.unit_invest_backup.get([k.0, t]);

                    let build = Branch::new()
                        .when(LinExpr::var(cap), Cmp::Ge, min_ins)
                        .when(LinExpr::var(cap), Cmp::Le, max_ins)
                        .when(
                            LinExpr::var(ic) - LinExpr::term(cap, unit_ic),
                            Cmp::Eq,
                            0.0,
                        );
                    let skip = Branch::new()
                        .when(LinExpr::var(cap), Cmp::Eq, 0.0)
                        .when(LinExpr::var(ic), Cmp::Eq, 0.0);

                    let d = self.model.add_disjunction(
                        &format!("install_bkp[n{n},k{},t{t}]", k.0),
                        vec![build, skip],
                        self.mode,
                    )?;
                    if self.sys.is_excluded(gep_core::NodeId(n), k) {
                        self.model.force_branch(&d, 1)?;
                        self.model.fix(cap, 0.0);
                        self.model.fix(ic, 0.0);
                    }

                    self.vars.backup_cap_ins.insert((n, k.0, t), cap);
                    self.vars.backup_invest.insert((n, k.0, t), ic);
                    self.vars.backup_install.insert((n, k.0, t), d);
                    self.costs.invest_backup.add_term(ic, 1.0);
                }
            }
        }
        // backup rides on the main unit: its cumulative capacity is capped
        // by the main unit's
        for n in 0..self.sys.nodes {
            for k in self.sys.expandable_dispatchable().collect::<Vec<_>>() {
                for t in 0..self.sys.time.years {
                    let row = self.avail_backup(n, k.0, t) - self.avail_gen(n, k.0, t);
                    self.model.add_constraint(row, Cmp::Le, 0.0);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn reliability(&mut self) -> MilpResult<()> {
        self.reserve_requirement();
        self.shedding_regime()?;
        self.renewable_portfolio();
        Ok(())
    }

    /// Reserved capacity must cover the required share of nodal demand in
    /// every operating situation of the year.
    fn reserve_requirement(&mut self) {
        if !matches!(self.sys.contexts, OperatingContexts::ReserveMargin) {
            return;
        }
        let ratio = self.sys.params.reserve_ratio;
        for n in 0..self.sys.nodes {
            for t in 0..self.sys.time.years {
                for p in 0..self.sys.time.periods() {
                    for b in 0..self.sys.time.subperiods() {
                        let mut reserved = LinExpr::new();
                        for k in 0..self.sys.techs.len() {
                            reserved.add_term(self.vars.cap_rev[&(n, k, t, p, b)], 1.0);
                        }
                        let demand = self.sys.params.demand.get([n, t, p, b]);
                        self.model.add_grouped(
                            "reserve",
                            reserved,
                            Cmp::Ge,
                            ratio * demand,
                        );
                    }
                }
            }
        }
    }

    /// Loss-of-load accounting, probabilistic criterion only.
    ///
    /// Shed at each (state, node, year, period, sub) is classified by a
    /// two-branch disjunction: at or above [`SHED_ON`] the node has a
    /// loss-of-load event (LOLE takes the subperiod duration, EENS takes the
    /// shed power); at or below [`SHED_OFF`] both are zero. Every shedding
    /// node counts the duration, so two nodes losing load in the same
    /// subperiod accrue it twice. Shed strictly between the thresholds
    /// satisfies neither branch, so the solver is steered out of the dead
    /// zone; the report still scans for it.
    fn shedding_regime(&mut self) -> MilpResult<()> {
        if !self.sys.contexts.is_probabilistic() {
            return Ok(());
        }
        let contexts = self.contexts();
        let years = self.sys.time.years;
        let periods = self.sys.time.periods();
        let subs = self.sys.time.subperiods();

        for ctx in 0..contexts {
            for n in 0..self.sys.nodes {
                for t in 0..years {
                    for p in 0..periods {
                        for b in 0..subs {
                            let dur = self.sys.time.subperiod_durations[b];
                            let shed_ub = self.sys.params.demand.get([n, t, p, b]);
                            let lole = self.model.add_var(
                                format!("lole[s{ctx},n{n},t{t},p{p},b{b}]"),
                                0.0,
                                dur,
                            );
                            let eens = self.model.add_var(
                                format!("eens[s{ctx},n{n},t{t},p{p},b{b}]"),
                                0.0,
                                shed_ub,
                            );
                            let shed = self.vars.shed[&(ctx, n, t, p, b)];

                            let event = Branch::new()
                                .when(LinExpr::var(shed), Cmp::Ge, SHED_ON)
                                .when(LinExpr::var(lole), Cmp::Eq, dur)
                                .when(
                                    LinExpr::var(eens) - LinExpr::var(shed),
                                    Cmp::Eq,
                                    0.0,
                                );
                            let quiet = Branch::new()
                                .when(LinExpr::var(shed), Cmp::Le, SHED_OFF)
                                .when(LinExpr::var(lole), Cmp::Eq, 0.0)
                                .when(LinExpr::var(eens), Cmp::Eq, 0.0);

                            let d = self.model.add_disjunction(
                                &format!("shed_regime[s{ctx},n{n},t{t},p{p},b{b}]"),
                                vec![event, quiet],
                                self.mode,
                            )?;
                            self.vars.lole.insert((ctx, n, t, p, b), lole);
                            self.vars.eens.insert((ctx, n, t, p, b), eens);
                            self.vars.shed_regime.insert((ctx, n, t, p, b), d);
                        }
                    }
                }
            }
        }

        // probability- and duration-weighted yearly totals, then the cap
        let probs = match &self.sys.contexts {
            OperatingContexts::Probabilistic(s) => s.probabilities.clone(),
            _ => unreachable!(),
        };
        for t in 0..years {
            let mut tlole = LinExpr::new();
            let mut teens = LinExpr::new();
            for ctx in 0..contexts {
                for n in 0..self.sys.nodes {
                    for p in 0..periods {
                        let w = self.sys.time.period_weights[p];
                        for b in 0..subs {
                            let dur = self.sys.time.subperiod_durations[b];
                            tlole.add_term(
                                self.vars.lole[&(ctx, n, t, p, b)],
                                probs[ctx] * w,
                            );
                            teens.add_term(
                                self.vars.eens[&(ctx, n, t, p, b)],
                                probs[ctx] * w * dur,
                            );
                        }
                    }
                }
            }
            self.model.add_grouped(
                "lole_cap",
                tlole.clone(),
                Cmp::Le,
                self.sys.params.lole_cap,
            );
            self.vars.tlole.push(tlole);
            self.vars.teens.push(teens);
        }
        Ok(())
    }

    /// Renewable share of yearly generation, enforced on the base context
    /// when the caller opts in. The share compares plain sums over the
    /// sampled subperiods, spilled surplus does not count.
    fn renewable_portfolio(&mut self) {
        if !self.portfolio {
            return;
        }
        let renewables: Vec<_> = self.sys.renewable().collect();
        if renewables.is_empty() {
            return;
        }
        let periods = self.sys.time.periods();
        let subs = self.sys.time.subperiods();
        for t in 0..self.sys.time.years {
            let target = self.sys.params.res_target[t];
            let mut energy = LinExpr::new();
            let mut total_demand = 0.0;
            for p in 0..periods {
                for b in 0..subs {
                    for n in 0..self.sys.nodes {
                        for &k in &renewables {
                            energy.add_term(self.vars.dispatch[&(0, n, k.0, t, p, b)], 1.0);
                        }
                        energy.add_term(self.vars.over_gen[&(0, n, t, p, b)], -1.0);
                        total_demand += self.sys.params.demand.get([n, t, p, b]);
                    }
                }
            }
            self.model.add_grouped(
                "renewable_portfolio",
                energy,
                Cmp::Ge,
                target * total_demand,
            );
        }
    }
}
