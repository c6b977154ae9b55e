//! Parameter tables for a planning instance.
//!
//! All numeric inputs live here as dense tables so that model construction
//! is a pure, deterministic walk over index ranges. Units follow the source
//! data: investment and fixed costs in M$/MW, variable costs in $/MWh,
//! demand and capacities in MW, durations in hours.

use serde::{Deserialize, Serialize};

/// Dense rectangular table over `D` index dimensions.
///
/// Row-major storage; `get`/`set` panic on out-of-range indices (shape is
/// checked once during [`crate::System::validate`], after which every access
/// pattern in the model builders is within bounds by construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseTable<const D: usize> {
    dims: [usize; D],
    values: Vec<f64>,
}

impl<const D: usize> DenseTable<D> {
    /// Create a table with every entry set to `value`.
    pub fn filled(dims: [usize; D], value: f64) -> Self {
        let len = dims.iter().product();
        Self {
            dims,
            values: vec![value; len],
        }
    }

    /// Create a zero table.
    pub fn zeros(dims: [usize; D]) -> Self {
        Self::filled(dims, 0.0)
    }

    pub fn dims(&self) -> [usize; D] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn offset(&self, idx: [usize; D]) -> usize {
        let mut off = 0;
        for (d, &i) in idx.iter().enumerate() {
            assert!(
                i < self.dims[d],
                "index {} out of range for dimension {} (size {})",
                i,
                d,
                self.dims[d]
            );
            off = off * self.dims[d] + i;
        }
        off
    }

    pub fn get(&self, idx: [usize; D]) -> f64 {
        self.values[self.offset(idx)]
    }

    pub fn set(&mut self, idx: [usize; D], value: f64) {
        let off = self.offset(idx);
        self.values[off] = value;
    }
}

/// All numeric parameters of a planning instance.
///
/// Generator-indexed tables span *all* technologies (existing entries are
/// zero where a parameter does not apply, e.g. investment cost of an
/// existing unit); this keeps every index space rectangular.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Load per (node, year, period, subperiod), MW.
    pub demand: DenseTable<4>,
    /// Renewable capacity factor per (node, year, period, subperiod), in [0, 1].
    pub capacity_factor: DenseTable<4>,

    /// Unit investment cost per (technology, year), M$/MW. Zero for existing units.
    pub unit_invest_gen: DenseTable<2>,
    /// Unit investment cost per (line, year), M$/MW. Zero for existing lines.
    pub unit_invest_line: DenseTable<2>,
    /// Unit fixed operating cost per (technology, year), M$/MW.
    pub unit_fixed_gen: DenseTable<2>,
    /// Unit fixed operating cost per (line, year), M$/MW.
    pub unit_fixed_line: DenseTable<2>,
    /// Unit variable operating cost per (technology, year), $/MWh.
    pub unit_var_gen: DenseTable<2>,
    /// Unit variable transmission cost per (line, year), $/MWh.
    pub unit_var_line: DenseTable<2>,

    /// Pre-installed capacity per (node, existing technology), MW. Zero elsewhere.
    pub legacy_gen: DenseTable<2>,

    /// Renewable-portfolio target fraction per year, in [0, 1].
    pub res_target: Vec<f64>,
    /// Reserve share of demand required as spare capacity per node.
    pub reserve_ratio: f64,
    /// Yearly cap on duration-weighted expected loss of load, hours.
    pub lole_cap: f64,
    /// Penalty on expected energy not served, $/kWh.
    pub eens_penalty: f64,

    /// Minimum installable backup capacity per technology, MW (expandable
    /// dispatchable technologies only; zero elsewhere).
    pub backup_min_install: Vec<f64>,
    /// Maximum installable backup capacity per technology, MW.
    pub backup_max_install: Vec<f64>,
    /// Unit investment cost of backup per (technology, year), M$/MW.
    pub unit_invest_backup: DenseTable<2>,
    /// Unit fixed cost of backup per (technology, year), M$/MW.
    pub unit_fixed_backup: DenseTable<2>,
}

impl Params {
    /// A zeroed parameter set for `nodes × techs × lines` over the given
    /// time grid sizes. Callers fill in what their instance uses.
    pub fn zeros(nodes: usize, techs: usize, lines: usize, years: usize, periods: usize, subs: usize) -> Self {
        Self {
            demand: DenseTable::zeros([nodes, years, periods, subs]),
            capacity_factor: DenseTable::zeros([nodes, years, periods, subs]),
            unit_invest_gen: DenseTable::zeros([techs, years]),
            unit_invest_line: DenseTable::zeros([lines, years]),
            unit_fixed_gen: DenseTable::zeros([techs, years]),
            unit_fixed_line: DenseTable::zeros([lines, years]),
            unit_var_gen: DenseTable::zeros([techs, years]),
            unit_var_line: DenseTable::zeros([lines, years]),
            legacy_gen: DenseTable::zeros([nodes, techs]),
            res_target: vec![0.0; years],
            reserve_ratio: 0.25,
            lole_cap: 2.4,
            eens_penalty: 9.0,
            backup_min_install: vec![0.0; techs],
            backup_max_install: vec![0.0; techs],
            unit_invest_backup: DenseTable::zeros([techs, years]),
            unit_fixed_backup: DenseTable::zeros([techs, years]),
        }
    }
}
