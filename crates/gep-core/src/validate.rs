//! Instance validation.
//!
//! Runs once, before any model construction. Checks are ordered from
//! structural (shapes, index references) to numeric (ranges, bound order,
//! probability mass) so the first error reported is the most fundamental
//! one.

use crate::context::OperatingContexts;
use crate::error::{CoreError, CoreResult};
use crate::params::DenseTable;
use crate::system::{LineBuild, System, TechBuild};

impl System {
    /// Validate the instance.
    ///
    /// Returns the first violation found. A system that passes is safe to
    /// hand to the model builders: every table access they perform is in
    /// bounds, every bound pair is ordered, every probability mass sums to
    /// one.
    pub fn validate(&self) -> CoreResult<()> {
        self.check_time()?;
        self.check_entities()?;
        self.check_shapes()?;
        self.check_values()?;
        self.check_contexts()
    }

    fn check_time(&self) -> CoreResult<()> {
        if self.time.years == 0 {
            return Err(CoreError::Invalid("time grid has zero years".into()));
        }
        if self.time.period_weights.is_empty() {
            return Err(CoreError::Invalid("time grid has no representative periods".into()));
        }
        if self.time.subperiod_durations.is_empty() {
            return Err(CoreError::Invalid("time grid has no subperiods".into()));
        }
        for (p, &w) in self.time.period_weights.iter().enumerate() {
            if !(w > 0.0) {
                return Err(CoreError::OutOfRange {
                    field: "period_weights",
                    index: p.to_string(),
                    value: w,
                    lo: 0.0,
                    hi: f64::INFINITY,
                });
            }
        }
        for (b, &d) in self.time.subperiod_durations.iter().enumerate() {
            if !(d > 0.0) {
                return Err(CoreError::OutOfRange {
                    field: "subperiod_durations",
                    index: b.to_string(),
                    value: d,
                    lo: 0.0,
                    hi: f64::INFINITY,
                });
            }
        }
        Ok(())
    }

    fn check_entities(&self) -> CoreResult<()> {
        for (k, tech) in self.techs.iter().enumerate() {
            if let TechBuild::Expandable {
                min_install,
                max_install,
            } = tech.build
            {
                if min_install < 0.0 {
                    return Err(CoreError::OutOfRange {
                        field: "min_install",
                        index: k.to_string(),
                        value: min_install,
                        lo: 0.0,
                        hi: f64::INFINITY,
                    });
                }
                if min_install > max_install {
                    return Err(CoreError::BoundOrder {
                        field: "install",
                        index: k.to_string(),
                        min: min_install,
                        max: max_install,
                    });
                }
            }
            if !(0.0..=1.0).contains(&tech.min_depth) || !(0.0..=1.0).contains(&tech.max_depth) {
                return Err(CoreError::OutOfRange {
                    field: "operating_depth",
                    index: k.to_string(),
                    value: tech.min_depth.min(tech.max_depth),
                    lo: 0.0,
                    hi: 1.0,
                });
            }
            if tech.min_depth > tech.max_depth {
                return Err(CoreError::BoundOrder {
                    field: "operating_depth",
                    index: k.to_string(),
                    min: tech.min_depth,
                    max: tech.max_depth,
                });
            }
            for (name, v) in [("ramp_up", tech.ramp_up), ("ramp_down", tech.ramp_down)] {
                if !(0.0..=1.0).contains(&v) {
                    return Err(CoreError::OutOfRange {
                        field: name,
                        index: k.to_string(),
                        value: v,
                        lo: 0.0,
                        hi: 1.0,
                    });
                }
            }
        }
        for (l, line) in self.lines.iter().enumerate() {
            for (name, node) in [("line.from", line.from), ("line.to", line.to)] {
                if node.0 >= self.nodes {
                    return Err(CoreError::UnknownIndex {
                        field: name,
                        index: format!("node {}", node.0),
                        set: "node",
                    });
                }
            }
            match line.build {
                LineBuild::Expandable {
                    min_install,
                    max_install,
                } => {
                    if min_install < 0.0 || min_install > max_install {
                        return Err(CoreError::BoundOrder {
                            field: "line_install",
                            index: l.to_string(),
                            min: min_install,
                            max: max_install,
                        });
                    }
                }
                LineBuild::Existing { legacy_capacity } => {
                    if legacy_capacity < 0.0 {
                        return Err(CoreError::OutOfRange {
                            field: "legacy_capacity",
                            index: l.to_string(),
                            value: legacy_capacity,
                            lo: 0.0,
                            hi: f64::INFINITY,
                        });
                    }
                }
            }
        }
        for &(node, tech) in &self.excluded_sites {
            if node.0 >= self.nodes {
                return Err(CoreError::UnknownIndex {
                    field: "excluded_sites",
                    index: format!("node {}", node.0),
                    set: "node",
                });
            }
            if tech.0 >= self.techs.len() {
                return Err(CoreError::UnknownIndex {
                    field: "excluded_sites",
                    index: format!("technology {}", tech.0),
                    set: "technology",
                });
            }
        }
        Ok(())
    }

    fn check_shapes(&self) -> CoreResult<()> {
        let (n, k, l) = (self.nodes, self.techs.len(), self.lines.len());
        let (t, p, b) = (
            self.time.years,
            self.time.periods(),
            self.time.subperiods(),
        );
        shape4("demand", &self.params.demand, [n, t, p, b])?;
        shape4("capacity_factor", &self.params.capacity_factor, [n, t, p, b])?;
        shape2("unit_invest_gen", &self.params.unit_invest_gen, [k, t])?;
        shape2("unit_fixed_gen", &self.params.unit_fixed_gen, [k, t])?;
        shape2("unit_var_gen", &self.params.unit_var_gen, [k, t])?;
        shape2("unit_invest_line", &self.params.unit_invest_line, [l, t])?;
        shape2("unit_fixed_line", &self.params.unit_fixed_line, [l, t])?;
        shape2("unit_var_line", &self.params.unit_var_line, [l, t])?;
        shape2("legacy_gen", &self.params.legacy_gen, [n, k])?;
        shape2("unit_invest_backup", &self.params.unit_invest_backup, [k, t])?;
        shape2("unit_fixed_backup", &self.params.unit_fixed_backup, [k, t])?;
        if self.params.res_target.len() != t {
            return Err(CoreError::Shape {
                field: "res_target",
                expected: t,
                found: self.params.res_target.len(),
            });
        }
        for (name, v) in [
            ("backup_min_install", &self.params.backup_min_install),
            ("backup_max_install", &self.params.backup_max_install),
        ] {
            if v.len() != k {
                return Err(CoreError::Shape {
                    field: name,
                    expected: k,
                    found: v.len(),
                });
            }
        }
        Ok(())
    }

    fn check_values(&self) -> CoreResult<()> {
        nonneg_table("demand", &self.params.demand)?;
        unit_table("capacity_factor", &self.params.capacity_factor)?;
        nonneg_table("unit_invest_gen", &self.params.unit_invest_gen)?;
        nonneg_table("unit_fixed_gen", &self.params.unit_fixed_gen)?;
        nonneg_table("unit_var_gen", &self.params.unit_var_gen)?;
        nonneg_table("unit_invest_line", &self.params.unit_invest_line)?;
        nonneg_table("unit_fixed_line", &self.params.unit_fixed_line)?;
        nonneg_table("unit_var_line", &self.params.unit_var_line)?;
        nonneg_table("legacy_gen", &self.params.legacy_gen)?;
        nonneg_table("unit_invest_backup", &self.params.unit_invest_backup)?;
        nonneg_table("unit_fixed_backup", &self.params.unit_fixed_backup)?;
        for (t, &v) in self.params.res_target.iter().enumerate() {
            if !(0.0..=1.0).contains(&v) {
                return Err(CoreError::OutOfRange {
                    field: "res_target",
                    index: t.to_string(),
                    value: v,
                    lo: 0.0,
                    hi: 1.0,
                });
            }
        }
        for (name, v) in [
            ("reserve_ratio", self.params.reserve_ratio),
            ("lole_cap", self.params.lole_cap),
            ("eens_penalty", self.params.eens_penalty),
        ] {
            if v < 0.0 {
                return Err(CoreError::OutOfRange {
                    field: name,
                    index: String::new(),
                    value: v,
                    lo: 0.0,
                    hi: f64::INFINITY,
                });
            }
        }
        for k in 0..self.techs.len() {
            let (min, max) = (
                self.params.backup_min_install[k],
                self.params.backup_max_install[k],
            );
            if min < 0.0 || min > max {
                return Err(CoreError::BoundOrder {
                    field: "backup_install",
                    index: k.to_string(),
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    fn check_contexts(&self) -> CoreResult<()> {
        match &self.contexts {
            OperatingContexts::Deterministic | OperatingContexts::ReserveMargin => Ok(()),
            OperatingContexts::Contingency(s) => {
                let scenarios = s.rates.len();
                if scenarios == 0 {
                    return Err(CoreError::Invalid("contingency set has no scenarios".into()));
                }
                for (i, &r) in s.rates.iter().enumerate() {
                    if r < 0.0 {
                        return Err(CoreError::OutOfRange {
                            field: "scenario_rates",
                            index: i.to_string(),
                            value: r,
                            lo: 0.0,
                            hi: f64::INFINITY,
                        });
                    }
                }
                let expected_gen = [
                    scenarios,
                    self.nodes,
                    self.techs.len(),
                    self.time.periods(),
                    self.time.subperiods(),
                ];
                if s.gen_survival.dims() != expected_gen {
                    return Err(CoreError::Shape {
                        field: "scenario gen_survival",
                        expected: expected_gen.iter().product(),
                        found: s.gen_survival.len(),
                    });
                }
                let expected_line = [
                    scenarios,
                    self.lines.len(),
                    self.time.periods(),
                    self.time.subperiods(),
                ];
                if s.line_survival.dims() != expected_line {
                    return Err(CoreError::Shape {
                        field: "scenario line_survival",
                        expected: expected_line.iter().product(),
                        found: s.line_survival.len(),
                    });
                }
                unit_values("scenario gen_survival", s.gen_survival.values())?;
                unit_values("scenario line_survival", s.line_survival.values())?;
                base_intact("scenario", s.gen_survival.values(), s.gen_survival.len() / scenarios)?;
                base_intact("scenario", s.line_survival.values(), s.line_survival.len() / scenarios.max(1))
            }
            OperatingContexts::Probabilistic(s) => {
                let states = s.probabilities.len();
                if states == 0 {
                    return Err(CoreError::Invalid("probabilistic set has no states".into()));
                }
                for (i, &p) in s.probabilities.iter().enumerate() {
                    if !(0.0..=1.0).contains(&p) {
                        return Err(CoreError::OutOfRange {
                            field: "state_probabilities",
                            index: i.to_string(),
                            value: p,
                            lo: 0.0,
                            hi: 1.0,
                        });
                    }
                }
                let sum: f64 = s.probabilities.iter().sum();
                if (sum - 1.0).abs() > 1e-6 {
                    return Err(CoreError::ProbabilitySum { sum });
                }
                let expected_gen = [states, self.nodes, self.techs.len()];
                if s.gen_survival.dims() != expected_gen {
                    return Err(CoreError::Shape {
                        field: "state gen_survival",
                        expected: expected_gen.iter().product(),
                        found: s.gen_survival.len(),
                    });
                }
                if s.backup_survival.dims() != expected_gen {
                    return Err(CoreError::Shape {
                        field: "state backup_survival",
                        expected: expected_gen.iter().product(),
                        found: s.backup_survival.len(),
                    });
                }
                if s.line_survival.dims() != [states, self.lines.len()] {
                    return Err(CoreError::Shape {
                        field: "state line_survival",
                        expected: states * self.lines.len(),
                        found: s.line_survival.len(),
                    });
                }
                unit_values("state gen_survival", s.gen_survival.values())?;
                unit_values("state line_survival", s.line_survival.values())?;
                unit_values("state backup_survival", s.backup_survival.values())?;
                base_intact("state", s.gen_survival.values(), s.gen_survival.len() / states)?;
                base_intact("state", s.backup_survival.values(), s.backup_survival.len() / states)?;
                base_intact("state", s.line_survival.values(), s.line_survival.len() / states)
            }
        }
    }
}

fn shape2(field: &'static str, table: &DenseTable<2>, expected: [usize; 2]) -> CoreResult<()> {
    if table.dims() != expected {
        return Err(CoreError::Shape {
            field,
            expected: expected.iter().product(),
            found: table.len(),
        });
    }
    Ok(())
}

fn shape4(field: &'static str, table: &DenseTable<4>, expected: [usize; 4]) -> CoreResult<()> {
    if table.dims() != expected {
        return Err(CoreError::Shape {
            field,
            expected: expected.iter().product(),
            found: table.len(),
        });
    }
    Ok(())
}

fn nonneg_table<const D: usize>(field: &'static str, table: &DenseTable<D>) -> CoreResult<()> {
    for (i, &v) in table.values().iter().enumerate() {
        if v < 0.0 || !v.is_finite() {
            return Err(CoreError::OutOfRange {
                field,
                index: i.to_string(),
                value: v,
                lo: 0.0,
                hi: f64::INFINITY,
            });
        }
    }
    Ok(())
}

fn unit_table<const D: usize>(field: &'static str, table: &DenseTable<D>) -> CoreResult<()> {
    unit_values(field, table.values())
}

fn unit_values(field: &'static str, values: &[f64]) -> CoreResult<()> {
    for (i, &v) in values.iter().enumerate() {
        if !(0.0..=1.0).contains(&v) {
            return Err(CoreError::OutOfRange {
                field,
                index: i.to_string(),
                value: v,
                lo: 0.0,
                hi: 1.0,
            });
        }
    }
    Ok(())
}

// Context 0 is the intact system; its survival factors must all be one.
fn base_intact(kind: &'static str, values: &[f64], per_context: usize) -> CoreResult<()> {
    for (i, &v) in values.iter().take(per_context).enumerate() {
        if v != 1.0 {
            return Err(CoreError::Invalid(format!(
                "{kind} 0 must be intact, found survival {v} at entry {i}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::context::{OperatingContexts, ScenarioSet, StateSet};
    use crate::params::Params;
    use crate::system::{Line, NodeId, System, TechId, Technology, TimeGrid};
    use crate::CoreError;

    fn base_system() -> System {
        System {
            nodes: 2,
            techs: vec![
                Technology::expandable("ng", 10.0, 500.0),
                Technology::existing("legacy"),
            ],
            lines: vec![Line::expandable("l1", NodeId(0), NodeId(1), 25.0, 400.0)],
            time: TimeGrid::new(2, vec![182.5, 182.5], vec![12.0, 12.0]),
            params: Params::zeros(2, 2, 1, 2, 2, 2),
            contexts: OperatingContexts::Deterministic,
            excluded_sites: vec![],
        }
    }

    #[test]
    fn valid_instance_passes() {
        base_system().validate().unwrap();
    }

    #[test]
    fn inverted_install_bounds_rejected() {
        let mut s = base_system();
        s.techs[0] = Technology::expandable("ng", 600.0, 500.0);
        let err = s.validate().unwrap_err();
        assert!(matches!(err, CoreError::BoundOrder { field: "install", .. }));
    }

    #[test]
    fn negative_demand_rejected() {
        let mut s = base_system();
        s.params.demand.set([0, 0, 0, 0], -10.0);
        let err = s.validate().unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { field: "demand", .. }));
    }

    #[test]
    fn capacity_factor_above_one_rejected() {
        let mut s = base_system();
        s.params.capacity_factor.set([1, 0, 1, 1], 1.2);
        assert!(s.validate().is_err());
    }

    #[test]
    fn dangling_line_endpoint_rejected() {
        let mut s = base_system();
        s.lines[0].to = NodeId(9);
        let err = s.validate().unwrap_err();
        assert!(matches!(err, CoreError::UnknownIndex { set: "node", .. }));
    }

    #[test]
    fn excluded_site_must_reference_declared_tech() {
        let mut s = base_system();
        s.excluded_sites.push((NodeId(0), TechId(7)));
        let err = s.validate().unwrap_err();
        assert!(matches!(err, CoreError::UnknownIndex { set: "technology", .. }));
    }

    #[test]
    fn demand_shape_mismatch_rejected() {
        let mut s = base_system();
        s.params = Params::zeros(3, 2, 1, 2, 2, 2);
        let err = s.validate().unwrap_err();
        assert!(matches!(err, CoreError::Shape { field: "demand", .. }));
    }

    #[test]
    fn probabilities_must_sum_to_one() {
        let mut s = base_system();
        s.contexts = OperatingContexts::Probabilistic(StateSet::intact(vec![0.9, 0.2], 2, 2, 1));
        let err = s.validate().unwrap_err();
        assert!(matches!(err, CoreError::ProbabilitySum { .. }));
    }

    #[test]
    fn base_state_must_be_intact() {
        let mut s = base_system();
        let mut states = StateSet::intact(vec![0.95, 0.05], 2, 2, 1);
        states.gen_survival.set([0, 0, 0], 0.5);
        s.contexts = OperatingContexts::Probabilistic(states);
        assert!(s.validate().is_err());
    }

    #[test]
    fn scenario_survival_shape_checked() {
        let mut s = base_system();
        // wrong period dimension
        s.contexts = OperatingContexts::Contingency(ScenarioSet::intact(3, 2, 2, 1, 1, 2));
        let err = s.validate().unwrap_err();
        assert!(matches!(err, CoreError::Shape { .. }));
    }
}
