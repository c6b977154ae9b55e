//! Planning-instance entities: nodes, generator technologies, transmission
//! corridors, and the time structure.
//!
//! Technologies are partitioned along two independent axes:
//!
//! - **kind**: dispatchable (free output within operating-depth and ramp
//!   limits) vs. renewable (output pinned to `capacity_factor × capacity`);
//! - **build**: expandable (carries an install decision and investment cost)
//!   vs. existing (capacity pinned to a legacy constant, no decision).
//!
//! The accessor methods on [`System`] expose the derived subsets the model
//! builders iterate over, so the partitioning logic lives in exactly one
//! place.

use crate::context::OperatingContexts;
use crate::params::Params;
use serde::{Deserialize, Serialize};

/// Identifier of a planning bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Identifier of a generator technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TechId(pub usize);

/// Identifier of a transmission corridor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId(pub usize);

impl NodeId {
    pub fn value(&self) -> usize {
        self.0
    }
}

impl TechId {
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LineId {
    pub fn value(&self) -> usize {
        self.0
    }
}

/// Dispatch behaviour of a technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechKind {
    /// Output is a free decision within depth and ramp limits.
    Dispatchable,
    /// Output equals capacity factor times available capacity.
    Renewable,
}

/// Whether a technology carries an installation decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TechBuild {
    /// Candidate for investment; installed capacity per year is a decision
    /// in `[0, max_install]`, at least `min_install` when built.
    Expandable { min_install: f64, max_install: f64 },
    /// Pre-installed; capacity comes from `Params::legacy_gen`.
    Existing,
}

/// A generator technology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub kind: TechKind,
    pub build: TechBuild,
    /// Minimum operating depth, fraction of available capacity.
    pub min_depth: f64,
    /// Maximum operating depth, fraction of available capacity.
    pub max_depth: f64,
    /// Ramp-up limit per subperiod, fraction of available capacity.
    pub ramp_up: f64,
    /// Ramp-down limit per subperiod, fraction of available capacity.
    pub ramp_down: f64,
}

impl Technology {
    /// A dispatchable expansion candidate with full-range depth and ramps.
    pub fn expandable(name: impl Into<String>, min_install: f64, max_install: f64) -> Self {
        Self {
            name: name.into(),
            kind: TechKind::Dispatchable,
            build: TechBuild::Expandable {
                min_install,
                max_install,
            },
            min_depth: 0.0,
            max_depth: 1.0,
            ramp_up: 1.0,
            ramp_down: 1.0,
        }
    }

    /// A pre-installed dispatchable unit.
    pub fn existing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TechKind::Dispatchable,
            build: TechBuild::Existing,
            min_depth: 0.0,
            max_depth: 1.0,
            ramp_up: 1.0,
            ramp_down: 1.0,
        }
    }

    /// A renewable expansion candidate (output coupled to capacity factor).
    pub fn renewable(name: impl Into<String>, min_install: f64, max_install: f64) -> Self {
        Self {
            name: name.into(),
            kind: TechKind::Renewable,
            build: TechBuild::Expandable {
                min_install,
                max_install,
            },
            min_depth: 0.0,
            max_depth: 1.0,
            ramp_up: 1.0,
            ramp_down: 1.0,
        }
    }

    /// Set operating-depth fractions.
    pub fn with_depth(mut self, min_depth: f64, max_depth: f64) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// Set ramp-rate fractions.
    pub fn with_ramps(mut self, ramp_up: f64, ramp_down: f64) -> Self {
        self.ramp_up = ramp_up;
        self.ramp_down = ramp_down;
        self
    }

    pub fn is_expandable(&self) -> bool {
        matches!(self.build, TechBuild::Expandable { .. })
    }

    pub fn is_dispatchable(&self) -> bool {
        self.kind == TechKind::Dispatchable
    }
}

/// Whether a corridor carries an installation decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LineBuild {
    Expandable { min_install: f64, max_install: f64 },
    Existing { legacy_capacity: f64 },
}

/// A directed transmission corridor.
///
/// Flow is signed: positive along `from → to`, negative against it. The
/// direction only fixes the sign convention in the nodal balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub name: String,
    pub from: NodeId,
    pub to: NodeId,
    pub build: LineBuild,
}

impl Line {
    pub fn expandable(
        name: impl Into<String>,
        from: NodeId,
        to: NodeId,
        min_install: f64,
        max_install: f64,
    ) -> Self {
        Self {
            name: name.into(),
            from,
            to,
            build: LineBuild::Expandable {
                min_install,
                max_install,
            },
        }
    }

    pub fn existing(name: impl Into<String>, from: NodeId, to: NodeId, legacy_capacity: f64) -> Self {
        Self {
            name: name.into(),
            from,
            to,
            build: LineBuild::Existing { legacy_capacity },
        }
    }

    pub fn is_expandable(&self) -> bool {
        matches!(self.build, LineBuild::Expandable { .. })
    }
}

/// Years, representative periods, and subperiods.
///
/// Years are planning stages with cumulative investment. Each representative
/// period carries a duration weight (how many real periods it stands for);
/// each subperiod carries its duration in hours. Ramp constraints chain
/// consecutive subperiods; the first subperiod of a period ramps against an
/// implicit zero predecessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeGrid {
    pub years: usize,
    pub period_weights: Vec<f64>,
    pub subperiod_durations: Vec<f64>,
}

impl TimeGrid {
    pub fn new(years: usize, period_weights: Vec<f64>, subperiod_durations: Vec<f64>) -> Self {
        Self {
            years,
            period_weights,
            subperiod_durations,
        }
    }

    pub fn periods(&self) -> usize {
        self.period_weights.len()
    }

    pub fn subperiods(&self) -> usize {
        self.subperiod_durations.len()
    }
}

/// A complete planning instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    /// Number of planning buses (ids `0..nodes`).
    pub nodes: usize,
    pub techs: Vec<Technology>,
    pub lines: Vec<Line>,
    pub time: TimeGrid,
    pub params: Params,
    pub contexts: OperatingContexts,
    /// (node, technology) pairs where installation is statically excluded;
    /// the "do not install" branch is forced for these.
    pub excluded_sites: Vec<(NodeId, TechId)>,
}

impl System {
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes).map(NodeId)
    }

    pub fn tech_ids(&self) -> impl Iterator<Item = TechId> + '_ {
        (0..self.techs.len()).map(TechId)
    }

    pub fn line_ids(&self) -> impl Iterator<Item = LineId> + '_ {
        (0..self.lines.len()).map(LineId)
    }

    pub fn tech(&self, k: TechId) -> &Technology {
        &self.techs[k.0]
    }

    pub fn line(&self, l: LineId) -> &Line {
        &self.lines[l.0]
    }

    /// All dispatchable technologies (expandable and existing).
    pub fn dispatchable(&self) -> impl Iterator<Item = TechId> + '_ {
        self.tech_ids().filter(|&k| self.tech(k).is_dispatchable())
    }

    /// All renewable technologies.
    pub fn renewable(&self) -> impl Iterator<Item = TechId> + '_ {
        self.tech_ids().filter(|&k| !self.tech(k).is_dispatchable())
    }

    /// Technologies with an installation decision.
    pub fn expandable(&self) -> impl Iterator<Item = TechId> + '_ {
        self.tech_ids().filter(|&k| self.tech(k).is_expandable())
    }

    /// Expandable and dispatchable (backup candidates, contingency-exposed).
    pub fn expandable_dispatchable(&self) -> impl Iterator<Item = TechId> + '_ {
        self.expandable().filter(|&k| self.tech(k).is_dispatchable())
    }

    /// Expandable renewables.
    pub fn expandable_renewable(&self) -> impl Iterator<Item = TechId> + '_ {
        self.expandable().filter(|&k| !self.tech(k).is_dispatchable())
    }

    /// Pre-installed technologies.
    pub fn existing(&self) -> impl Iterator<Item = TechId> + '_ {
        self.tech_ids().filter(|&k| !self.tech(k).is_expandable())
    }

    pub fn expandable_lines(&self) -> impl Iterator<Item = LineId> + '_ {
        self.line_ids().filter(|&l| self.line(l).is_expandable())
    }

    pub fn existing_lines(&self) -> impl Iterator<Item = LineId> + '_ {
        self.line_ids().filter(|&l| !self.line(l).is_expandable())
    }

    /// Corridors whose positive flow direction ends at `node`.
    pub fn lines_in(&self, node: NodeId) -> impl Iterator<Item = LineId> + '_ {
        self.line_ids().filter(move |&l| self.line(l).to == node)
    }

    /// Corridors whose positive flow direction starts at `node`.
    pub fn lines_out(&self, node: NodeId) -> impl Iterator<Item = LineId> + '_ {
        self.line_ids().filter(move |&l| self.line(l).from == node)
    }

    /// Whether installing `tech` at `node` is statically excluded.
    pub fn is_excluded(&self, node: NodeId, tech: TechId) -> bool {
        self.excluded_sites.contains(&(node, tech))
    }

    /// Upper bound of the generator investment-cost variable, M$.
    pub fn invest_cost_ub(&self, k: TechId, t: usize) -> f64 {
        match self.tech(k).build {
            TechBuild::Expandable { max_install, .. } => {
                max_install * self.params.unit_invest_gen.get([k.0, t])
            }
            TechBuild::Existing => 0.0,
        }
    }

    /// Upper bound of the line investment-cost variable, M$.
    pub fn line_invest_cost_ub(&self, l: LineId, t: usize) -> f64 {
        match self.line(l).build {
            LineBuild::Expandable { max_install, .. } => {
                max_install * self.params.unit_invest_line.get([l.0, t])
            }
            LineBuild::Existing { .. } => 0.0,
        }
    }

    /// Upper bound of the backup investment-cost variable, M$.
    pub fn backup_invest_cost_ub(&self, k: TechId, t: usize) -> f64 {
        self.params.backup_max_install[k.0] * self.params.unit_invest_backup.get([k.0, t])
    }

    /// Installed-capacity bounds of an expandable technology.
    pub fn install_bounds(&self, k: TechId) -> (f64, f64) {
        match self.tech(k).build {
            TechBuild::Expandable {
                min_install,
                max_install,
            } => (min_install, max_install),
            TechBuild::Existing => (0.0, 0.0),
        }
    }

    /// Installed-capacity bounds of an expandable line.
    pub fn line_install_bounds(&self, l: LineId) -> (f64, f64) {
        match self.line(l).build {
            LineBuild::Expandable {
                min_install,
                max_install,
            } => (min_install, max_install),
            LineBuild::Existing { .. } => (0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tech_system() -> System {
        let techs = vec![
            Technology::expandable("ng-p", 10.0, 1500.0).with_depth(0.2, 0.85),
            Technology::renewable("wt-p", 5.0, 800.0),
            Technology::existing("ng1"),
        ];
        let lines = vec![
            Line::expandable("l1", NodeId(0), NodeId(1), 25.0, 1000.0),
            Line::existing("l2", NodeId(1), NodeId(0), 400.0),
        ];
        let params = Params::zeros(2, 3, 2, 1, 1, 1);
        System {
            nodes: 2,
            techs,
            lines,
            time: TimeGrid::new(1, vec![91.25], vec![24.0]),
            params,
            contexts: OperatingContexts::Deterministic,
            excluded_sites: vec![(NodeId(1), TechId(0))],
        }
    }

    #[test]
    fn partitions_are_disjoint_and_cover() {
        let s = two_tech_system();
        let exp: Vec<_> = s.expandable().collect();
        let ex: Vec<_> = s.existing().collect();
        assert_eq!(exp, vec![TechId(0), TechId(1)]);
        assert_eq!(ex, vec![TechId(2)]);
        assert_eq!(s.expandable_dispatchable().collect::<Vec<_>>(), vec![TechId(0)]);
        assert_eq!(s.expandable_renewable().collect::<Vec<_>>(), vec![TechId(1)]);
    }

    #[test]
    fn incidence_follows_direction() {
        let s = two_tech_system();
        assert_eq!(s.lines_in(NodeId(1)).collect::<Vec<_>>(), vec![LineId(0)]);
        assert_eq!(s.lines_out(NodeId(1)).collect::<Vec<_>>(), vec![LineId(1)]);
        assert_eq!(s.lines_in(NodeId(0)).collect::<Vec<_>>(), vec![LineId(1)]);
    }

    #[test]
    fn siting_exclusion_lookup() {
        let s = two_tech_system();
        assert!(s.is_excluded(NodeId(1), TechId(0)));
        assert!(!s.is_excluded(NodeId(0), TechId(0)));
    }

    #[test]
    fn invest_cost_bound_is_max_times_unit_cost() {
        let mut s = two_tech_system();
        s.params.unit_invest_gen.set([0, 0], 0.1);
        assert_eq!(s.invest_cost_ub(TechId(0), 0), 150.0);
        assert_eq!(s.invest_cost_ub(TechId(2), 0), 0.0);
    }
}
