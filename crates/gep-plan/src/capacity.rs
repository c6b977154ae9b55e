//! Investment layer: install-or-skip disjunctions for generators and
//! corridors.
//!
//! Each expandable asset gets one disjunction per (site, year). The build
//! branch forces installed capacity into its sizing window and ties the
//! investment-cost variable to it; the skip branch pins both to zero.
//! Statically excluded sites compile the same disjunction and then force
//! the skip branch, so the variable numbering never depends on the
//! exclusion list.

use crate::builder::PlanBuilder;
use gep_milp::{Branch, Cmp, LinExpr, MilpResult};

impl PlanBuilder<'_> {
    pub(crate) fn investment(&mut self) -> MilpResult<()> {
        let years = self.sys.time.years;

        for n in 0..self.sys.nodes {
            for k in self.sys.expandable().collect::<Vec<_>>() {
                let (min_ins, max_ins) = self.sys.install_bounds(k);
                for t in 0..years {
                    let cap = self.model.add_var(
                        format!("cap_ins[n{n},k{},t{t}]", k.0),
                        0.0,
                        max_ins,
                    );
                    let ic_ub = self.sys.invest_cost_ub(k, t);
                    let ic = self
                        .model
                        .add_var(format!("ic_gen[n{n},k{},t{t}]", k.0), 0.0, ic_ub);
                    let unit_ic = self.sys.params.unit_invest_gen.get([k.0, t]);

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
                        &format!("install[n{n},k{},t{t}]", k.0),
                        vec![build, skip],
                        self.mode,
                    )?;
                    if self.sys.is_excluded(gep_core::NodeId(n), k) {
                        self.model.force_branch(&d, 1)?;
                        self.model.fix(cap, 0.0);
                        self.model.fix(ic, 0.0);
                    }

                    self.vars.cap_ins.insert((n, k.0, t), cap);
                    self.vars.invest_gen.insert((n, k.0, t), ic);
                    self.vars.install.insert((n, k.0, t), d);
                    self.costs.invest_gen.add_term(ic, 1.0);
                }
            }
        }

        for l in self.sys.expandable_lines().collect::<Vec<_>>() {
            let (min_ins, max_ins) = self.sys.line_install_bounds(l);
            for t in 0..years {
                let cap = self
                    .model
                    .add_var(format!("cap_ins_line[l{},t{t}]", l.0), 0.0, max_ins);
                let ic_ub = self.sys.line_invest_cost_ub(l, t);
                let ic = self
                    .model
                    .add_var(format!("ic_line[l{},t{t}]", l.0), 0.0, ic_ub);
                let unit_ic = self.sys.params.unit_invest_line.get([l.0, t]);

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
                    &format!("install_line[l{},t{t}]", l.0),
                    vec![build, skip],
                    self.mode,
                )?;

                self.vars.line_cap_ins.insert((l.0, t), cap);
                self.vars.line_invest.insert((l.0, t), ic);
                self.vars.line_install.insert((l.0, t), d);
                self.costs.invest_line.add_term(ic, 1.0);
            }
        }

        Ok(())
    }

    /// Reserve-margin capacity split: in each subperiod the available
    /// capacity divides into an operating share and a reserved share, so
    /// the partition can follow the load shape through the day.
    pub(crate) fn reserve_split(&mut self) {
        if !matches!(
            self.sys.contexts,
            gep_core::OperatingContexts::ReserveMargin
        ) {
            return;
        }
        let periods = self.sys.time.periods();
        let subs = self.sys.time.subperiods();
        for n in 0..self.sys.nodes {
            for k in 0..self.sys.techs.len() {
                let cap_ub = self.max_avail_gen(n, k);
                for t in 0..self.sys.time.years {
                    let avail = self.avail_gen(n, k, t);
                    for p in 0..periods {
                        for b in 0..subs {
                            let opt = self.model.add_var(
                                format!("cap_opt[n{n},k{k},t{t},p{p},b{b}]"),
                                0.0,
                                cap_ub,
                            );
                            let rev = self.model.add_var(
                                format!("cap_rev[n{n},k{k},t{t},p{p},b{b}]"),
                                0.0,
                                cap_ub,
                            );
                            self.model.add_constraint(
                                LinExpr::var(opt) + LinExpr::var(rev) - avail.clone(),
                                Cmp::Eq,
                                0.0,
                            );
                            self.vars.cap_opt.insert((n, k, t, p, b), opt);
                            self.vars.cap_rev.insert((n, k, t, p, b), rev);
                        }
                    }
                }
            }
        }
    }
}
