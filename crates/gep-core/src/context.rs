//! Operating contexts: the reliability axis of a planning instance.
//!
//! Every formulation replicates the operational block over a set of
//! contexts. The deterministic and reserve-margin formulations use a single
//! implicit context; the contingency formulation enumerates outage scenarios
//! with survival factors; the probabilistic formulation enumerates failure
//! states with occurrence probabilities.

use crate::params::DenseTable;
use serde::{Deserialize, Serialize};

/// The reliability criterion a formulation enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OperatingContexts {
    /// Single context, no reliability requirement.
    Deterministic,
    /// Single context, capacity split into operating and reserve shares.
    ReserveMargin,
    /// Enumerated N-k outage scenarios. Scenario 0 is the intact system.
    Contingency(ScenarioSet),
    /// Enumerated failure states with probabilities. State 0 is the base
    /// state (no failures).
    Probabilistic(StateSet),
}

impl OperatingContexts {
    /// Number of operational replicas the formulation builds.
    pub fn count(&self) -> usize {
        match self {
            Self::Deterministic | Self::ReserveMargin => 1,
            Self::Contingency(s) => s.rates.len(),
            Self::Probabilistic(s) => s.probabilities.len(),
        }
    }

    pub fn is_probabilistic(&self) -> bool {
        matches!(self, Self::Probabilistic(_))
    }
}

/// Outage scenarios for the N-k contingency formulation.
///
/// Survival factors scale available capacity in each scenario: 1.0 means
/// unaffected, 0.0 means fully out. Scenario 0 must be all-ones (the intact
/// system); its operating cost enters the objective, weighted by `rates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    /// Occurrence weighting per scenario; scenario 0 carries the base weight.
    pub rates: Vec<f64>,
    /// `[scenario, node, tech, period, sub]` generator survival factors.
    pub gen_survival: DenseTable<5>,
    /// `[scenario, line, period, sub]` corridor survival factors.
    pub line_survival: DenseTable<4>,
}

impl ScenarioSet {
    /// All-surviving scenario set (factors 1.0, uniform rates).
    pub fn intact(
        scenarios: usize,
        nodes: usize,
        techs: usize,
        lines: usize,
        periods: usize,
        subs: usize,
    ) -> Self {
        Self {
            rates: vec![1.0 / scenarios.max(1) as f64; scenarios],
            gen_survival: DenseTable::filled([scenarios, nodes, techs, periods, subs], 1.0),
            line_survival: DenseTable::filled([scenarios, lines, periods, subs], 1.0),
        }
    }

    /// Generator survival averaged over periods and subperiods.
    ///
    /// Existing and renewable units see the scenario through this average
    /// rather than the per-subperiod factor.
    pub fn avg_gen_survival(&self, scenario: usize, node: usize, tech: usize) -> f64 {
        let [_, _, _, periods, subs] = self.gen_survival.dims();
        let mut sum = 0.0;
        for p in 0..periods {
            for b in 0..subs {
                sum += self.gen_survival.get([scenario, node, tech, p, b]);
            }
        }
        sum / (periods * subs) as f64
    }
}

/// Failure states for the probabilistic formulation.
///
/// State 0 is the base state: all survival factors 1.0 and the largest
/// probability mass. Probabilities must sum to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSet {
    pub probabilities: Vec<f64>,
    /// `[state, node, tech]` generator survival factors.
    pub gen_survival: DenseTable<3>,
    /// `[state, line]` corridor survival factors.
    pub line_survival: DenseTable<2>,
    /// `[state, node, tech]` backup-unit survival factors.
    pub backup_survival: DenseTable<3>,
}

impl StateSet {
    /// All-surviving state set with the given probabilities.
    pub fn intact(probabilities: Vec<f64>, nodes: usize, techs: usize, lines: usize) -> Self {
        let states = probabilities.len();
        Self {
            probabilities,
            gen_survival: DenseTable::filled([states, nodes, techs], 1.0),
            line_survival: DenseTable::filled([states, lines], 1.0),
            backup_survival: DenseTable::filled([states, nodes, techs], 1.0),
        }
    }

    pub fn count(&self) -> usize {
        self.probabilities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_count_per_variant() {
        assert_eq!(OperatingContexts::Deterministic.count(), 1);
        assert_eq!(OperatingContexts::ReserveMargin.count(), 1);
        let nk = OperatingContexts::Contingency(ScenarioSet::intact(4, 2, 3, 2, 2, 6));
        assert_eq!(nk.count(), 4);
        let pr = OperatingContexts::Probabilistic(StateSet::intact(vec![0.9, 0.05, 0.05], 2, 3, 2));
        assert_eq!(pr.count(), 3);
        assert!(pr.is_probabilistic());
        assert!(!nk.is_probabilistic());
    }

    #[test]
    fn avg_survival_means_over_time() {
        let mut s = ScenarioSet::intact(2, 1, 1, 0, 2, 2);
        s.gen_survival.set([1, 0, 0, 0, 0], 0.0);
        s.gen_survival.set([1, 0, 0, 0, 1], 0.0);
        assert_eq!(s.avg_gen_survival(1, 0, 0), 0.5);
        assert_eq!(s.avg_gen_survival(0, 0, 0), 1.0);
    }
}
