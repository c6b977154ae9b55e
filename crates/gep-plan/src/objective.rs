//! Cost assembly. All terms in M$: investment costs already are, fixed
//! costs multiply M$/MW rates by surviving MW, variable costs come in
//! $/MWh and are scaled down by 1e6, the EENS penalty in $/kWh by 1e3.

use crate::builder::PlanBuilder;
use gep_milp::LinExpr;

impl PlanBuilder<'_> {
    pub(crate) fn objective(&mut self) {
        let years = self.sys.time.years;
        let periods = self.sys.time.periods();
        let subs = self.sys.time.subperiods();
        let weights = self.context_weights();

        // fixed costs on the capacity that survives each context, weighted
        // by the context's probability or scenario rate
        let backup_keys: Vec<_> = self.vars.backup_install.keys().copied().collect();
        for (ctx, &cw) in weights.iter().enumerate() {
            for n in 0..self.sys.nodes {
                for k in 0..self.sys.techs.len() {
                    for t in 0..years {
                        let rate = self.sys.params.unit_fixed_gen.get([k, t]);
                        let scaled = cw * rate * self.avg_gen_factor(ctx, n, k);
                        if scaled != 0.0 {
                            let term = self.avail_gen(n, k, t) * scaled;
                            self.costs.fixed_gen += term;
                        }
                    }
                }
            }
            for l in 0..self.sys.lines.len() {
                for t in 0..years {
                    let rate = self.sys.params.unit_fixed_line.get([l, t]);
                    let scaled = cw * rate * self.avg_line_factor(ctx, l);
                    if scaled != 0.0 {
                        let term = self.avail_line(l, t) * scaled;
                        self.costs.fixed_line += term;
                    }
                }
            }
            for &(n, k, t) in &backup_keys {
                let rate = self.sys.params.unit_fixed_backup.get([k, t]);
                let scaled = cw * rate * self.backup_factor(ctx, n, k);
                if scaled != 0.0 {
                    let term = self.avail_backup(n, k, t) * scaled;
                    self.costs.fixed_backup += term;
                }
            }
        }

        // variable costs, context- and duration-weighted, $ -> M$
        let mut var_gen = LinExpr::new();
        let mut var_line = LinExpr::new();
        let mut var_backup = LinExpr::new();
        for (ctx, &cw) in weights.iter().enumerate() {
            for t in 0..years {
                for p in 0..periods {
                    let w = self.sys.time.period_weights[p];
                    for b in 0..subs {
                        let dur = self.sys.time.subperiod_durations[b];
                        let scale = cw * w * dur / 1e6;
                        for n in 0..self.sys.nodes {
                            for k in 0..self.sys.techs.len() {
                                let rate = self.sys.params.unit_var_gen.get([k, t]);
                                if rate != 0.0 {
                                    var_gen.add_term(
                                        self.vars.dispatch[&(ctx, n, k, t, p, b)],
                                        rate * scale,
                                    );
                                }
                            }
                            for k in self.sys.expandable_dispatchable().collect::<Vec<_>>() {
                                if let Some(&v) =
                                    self.vars.backup_out.get(&(ctx, n, k.0, t, p, b))
                                {
                                    let rate = self.sys.params.unit_var_gen.get([k.0, t]);
                                    var_backup.add_term(v, rate * scale);
                                }
                            }
                        }
                        for l in 0..self.sys.lines.len() {
                            let rate = self.sys.params.unit_var_line.get([l, t]);
                            if rate != 0.0 {
                                // |flow| = flow_pos - flow_neg
                                var_line.add_term(
                                    self.vars.flow_pos[&(ctx, l, t, p, b)],
                                    rate * scale,
                                );
                                var_line.add_term(
                                    self.vars.flow_neg[&(ctx, l, t, p, b)],
                                    -(rate * scale),
                                );
                            }
                        }
                    }
                }
            }
        }
        self.costs.var_gen = var_gen;
        self.costs.var_line = var_line;
        self.costs.var_backup = var_backup;

        // expected energy not served, penalized per year
        let penalty = self.sys.params.eens_penalty;
        let mut eens_cost = LinExpr::new();
        for teens in &self.vars.teens {
            eens_cost += teens.clone() * (penalty / 1e3);
        }
        self.costs.eens_penalty = eens_cost;
    }
}
