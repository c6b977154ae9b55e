//! Operational layer, replicated per context: dispatch, flows, nodal
//! balance, ramping.

use crate::builder::PlanBuilder;
use gep_milp::{Cmp, LinExpr};

impl PlanBuilder<'_> {
    pub(crate) fn operations(&mut self) {
        let contexts = self.contexts();
        let years = self.sys.time.years;
        let periods = self.sys.time.periods();
        let subs = self.sys.time.subperiods();
        let probabilistic = self.sys.contexts.is_probabilistic();

        // dispatch variables and capacity coupling
        for ctx in 0..contexts {
            for n in 0..self.sys.nodes {
                for k in 0..self.sys.techs.len() {
                    let ub = self.max_avail_gen(n, k);
                    for t in 0..years {
                        for p in 0..periods {
                            for b in 0..subs {
                                let v = self.model.add_var(
                                    format!("ppd[s{ctx},n{n},k{k},t{t},p{p},b{b}]"),
                                    0.0,
                                    ub,
                                );
                                self.vars.dispatch.insert((ctx, n, k, t, p, b), v);
                            }
                        }
                    }
                }
            }
        }

        for ctx in 0..contexts {
            for n in 0..self.sys.nodes {
                for k in 0..self.sys.techs.len() {
                    let tech = self.sys.techs[k].clone();
                    for t in 0..years {
                        let avail = self.avail_gen(n, k, t);
                        for p in 0..periods {
                            for b in 0..subs {
                                let ppd = self.vars.dispatch[&(ctx, n, k, t, p, b)];
                                let f = self.gen_factor(ctx, n, k, p, b);
                                let cap = self.dispatch_cap(n, k, t, p, b);
                                if tech.is_dispatchable() {
                                    // depth window against the operable capacity
                                    self.model.add_constraint(
                                        LinExpr::var(ppd)
                                            - cap.clone() * (tech.max_depth * f),
                                        Cmp::Le,
                                        0.0,
                                    );
                                    if tech.min_depth > 0.0 {
                                        self.model.add_constraint(
                                            LinExpr::var(ppd)
                                                - cap * (tech.min_depth * f),
                                            Cmp::Ge,
                                            0.0,
                                        );
                                    }
                                } else {
                                    // renewable output is pinned, surplus goes
                                    // through over_gen in the balance
                                    let cf =
                                        self.sys.params.capacity_factor.get([n, t, p, b]);
                                    self.model.add_constraint(
                                        LinExpr::var(ppd) - avail.clone() * (cf * f),
                                        Cmp::Eq,
                                        0.0,
                                    );
                                }
                            }
                        }
                        // ramping chains consecutive subperiods against the
                        // surviving capacity; the first subperiod ramps from
                        // a cold start
                        if tech.is_dispatchable() {
                            for p in 0..periods {
                                let f0 = self.gen_factor(ctx, n, k, p, 0);
                                let cap0 = self.dispatch_cap(n, k, t, p, 0);
                                let first = self.vars.dispatch[&(ctx, n, k, t, p, 0)];
                                self.model.add_constraint(
                                    LinExpr::var(first) - cap0 * (tech.ramp_up * f0),
                                    Cmp::Le,
                                    0.0,
                                );
                                for b in 1..subs {
                                    let f = self.gen_factor(ctx, n, k, p, b);
                                    let cap = self.dispatch_cap(n, k, t, p, b);
                                    let cur = self.vars.dispatch[&(ctx, n, k, t, p, b)];
                                    let prev = self.vars.dispatch[&(ctx, n, k, t, p, b - 1)];
                                    self.model.add_constraint(
                                        LinExpr::var(cur) - LinExpr::var(prev)
                                            - cap.clone() * (tech.ramp_up * f),
                                        Cmp::Le,
                                        0.0,
                                    );
                                    self.model.add_constraint(
                                        LinExpr::var(prev) - LinExpr::var(cur)
                                            - cap * (tech.ramp_down * f),
                                        Cmp::Le,
                                        0.0,
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }

        // backup output (probabilistic only); backup units inherit the
        // operating window and ramp limits of the technology they shadow
        if probabilistic {
            for ctx in 0..contexts {
                for n in 0..self.sys.nodes {
                    for k in self.sys.expandable_dispatchable().collect::<Vec<_>>() {
                        let ub = self.max_avail_backup(k.0);
                        for t in 0..years {
                            for p in 0..periods {
                                for b in 0..subs {
                                    let v = self.model.add_var(
                                        format!("bkp[s{ctx},n{n},k{},t{t},p{p},b{b}]", k.0),
                                        0.0,
                                        ub,
                                    );
                                    self.vars.backup_out.insert((ctx, n, k.0, t, p, b), v);
                                }
                            }
                        }
                    }
                }
            }
            for ctx in 0..contexts {
                for n in 0..self.sys.nodes {
                    for k in self.sys.expandable_dispatchable().collect::<Vec<_>>() {
                        let tech = self.sys.techs[k.0].clone();
                        let bs = self.backup_factor(ctx, n, k.0);
                        for t in 0..years {
                            let avail_b = self.avail_backup(n, k.0, t);
                            for p in 0..periods {
                                for b in 0..subs {
                                    let bkp = self.vars.backup_out[&(ctx, n, k.0, t, p, b)];
                                    self.model.add_constraint(
                                        LinExpr::var(bkp)
                                            - avail_b.clone() * (tech.max_depth * bs),
                                        Cmp::Le,
                                        0.0,
                                    );
                                    if tech.min_depth > 0.0 {
                                        self.model.add_constraint(
                                            LinExpr::var(bkp)
                                                - avail_b.clone() * (tech.min_depth * bs),
                                            Cmp::Ge,
                                            0.0,
                                        );
                                    }
                                }
                                let first = self.vars.backup_out[&(ctx, n, k.0, t, p, 0)];
                                self.model.add_constraint(
                                    LinExpr::var(first)
                                        - avail_b.clone() * (tech.ramp_up * bs),
                                    Cmp::Le,
                                    0.0,
                                );
                                for b in 1..subs {
                                    let cur = self.vars.backup_out[&(ctx, n, k.0, t, p, b)];
                                    let prev =
                                        self.vars.backup_out[&(ctx, n, k.0, t, p, b - 1)];
                                    self.model.add_constraint(
                                        LinExpr::var(cur) - LinExpr::var(prev)
                                            - avail_b.clone() * (tech.ramp_up * bs),
                                        Cmp::Le,
                                        0.0,
                                    );
                                    self.model.add_constraint(
                                        LinExpr::var(prev) - LinExpr::var(cur)
                                            - avail_b.clone() * (tech.ramp_down * bs),
                                        Cmp::Le,
                                        0.0,
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }

        // flows, signed along the corridor direction, with a positive and a
        // negative part for the variable-cost term
        for ctx in 0..contexts {
            for l in 0..self.sys.lines.len() {
                let cap_ub = self.max_avail_line(l);
                for t in 0..years {
                    let avail = self.avail_line(l, t);
                    for p in 0..periods {
                        for b in 0..subs {
                            let f = self.line_factor(ctx, l, p, b);
                            let flow = self.model.add_var(
                                format!("flow[s{ctx},l{l},t{t},p{p},b{b}]"),
                                -cap_ub,
                                cap_ub,
                            );
                            let pos = self.model.add_var(
                                format!("flow_pos[s{ctx},l{l},t{t},p{p},b{b}]"),
                                0.0,
                                cap_ub,
                            );
                            let neg = self.model.add_var(
                                format!("flow_neg[s{ctx},l{l},t{t},p{p},b{b}]"),
                                -cap_ub,
                                0.0,
                            );
                            self.model.add_constraint(
                                LinExpr::var(flow) - LinExpr::var(pos) - LinExpr::var(neg),
                                Cmp::Eq,
                                0.0,
                            );
                            self.model.add_constraint(
                                LinExpr::var(flow) - avail.clone() * f,
                                Cmp::Le,
                                0.0,
                            );
                            self.model.add_constraint(
                                LinExpr::var(flow) + avail.clone() * f,
                                Cmp::Ge,
                                0.0,
                            );
                            self.vars.flow.insert((ctx, l, t, p, b), flow);
                            self.vars.flow_pos.insert((ctx, l, t, p, b), pos);
                            self.vars.flow_neg.insert((ctx, l, t, p, b), neg);
                        }
                    }
                }
            }
        }

        // slacks and nodal balance
        for ctx in 0..contexts {
            for n in 0..self.sys.nodes {
                for t in 0..years {
                    for p in 0..periods {
                        for b in 0..subs {
                            let demand = self.sys.params.demand.get([n, t, p, b]);
                            // shedding only exists as a decision under the
                            // probabilistic criterion
                            let shed_ub = if probabilistic { demand } else { 0.0 };
                            let shed = self.model.add_var(
                                format!("ls[s{ctx},n{n},t{t},p{p},b{b}]"),
                                0.0,
                                shed_ub,
                            );
                            let over = self.model.add_var(
                                format!("og[s{ctx},n{n},t{t},p{p},b{b}]"),
                                0.0,
                                f64::INFINITY,
                            );
                            self.vars.shed.insert((ctx, n, t, p, b), shed);
                            self.vars.over_gen.insert((ctx, n, t, p, b), over);

                            let mut lhs = LinExpr::new();
                            for k in 0..self.sys.techs.len() {
                                lhs.add_term(self.vars.dispatch[&(ctx, n, k, t, p, b)], 1.0);
                            }
                            for (&(c, nn, _k, tt, pp, bb), &v) in &self.vars.backup_out {
                                if c == ctx && nn == n && tt == t && pp == p && bb == b {
                                    lhs.add_term(v, 1.0);
                                }
                            }
                            for l in self.sys.lines_in(gep_core::NodeId(n)) {
                                lhs.add_term(self.vars.flow[&(ctx, l.0, t, p, b)], 1.0);
                            }
                            for l in self.sys.lines_out(gep_core::NodeId(n)) {
                                lhs.add_term(self.vars.flow[&(ctx, l.0, t, p, b)], -1.0);
                            }
                            lhs.add_term(shed, 1.0);
                            lhs.add_term(over, -1.0);
                            self.model.add_constraint(lhs, Cmp::Eq, demand);
                        }
                    }
                }
            }
        }
    }
}
