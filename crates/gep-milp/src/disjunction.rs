//! Disjunction compilation.
//!
//! A disjunction is a choice between branches, each a set of linear
//! constraints that must hold when that branch is selected. Exactly one
//! branch is active. Compilation introduces one binary indicator per branch
//! and reformulates the branch constraints so they bind only under their
//! indicator:
//!
//! - **Big-M**: each constraint is relaxed by a slack proportional to
//!   `1 − z`, with the smallest valid M derived from interval bounds of the
//!   constraint expression. Compact, but the linear relaxation is loose.
//! - **Convex hull**: every variable appearing in the disjunction is
//!   disaggregated into per-branch copies whose bounds scale with the
//!   indicator. Tighter relaxation, more columns.
//!
//! Both need finite activity bounds; a free variable inside a disjunction
//! is a construction error, not a silent huge constant.

use crate::error::{MilpError, MilpResult};
use crate::expr::LinExpr;
use crate::model::{Cmp, Model, VarId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisjunctionMode {
    #[default]
    BigM,
    Hull,
}

/// One branch of a disjunction.
#[derive(Debug, Clone, Default)]
pub struct Branch {
    constraints: Vec<(LinExpr, Cmp, f64)>,
}

impl Branch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint that holds when this branch is selected.
    pub fn when(mut self, expr: LinExpr, cmp: Cmp, rhs: f64) -> Self {
        self.constraints.push((expr.compact(), cmp, rhs));
        self
    }
}

/// A compiled disjunction: its name and the branch indicators, in branch
/// order.
#[derive(Debug, Clone)]
pub struct Disjunction {
    name: String,
    indicators: Vec<VarId>,
}

impl Disjunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indicators(&self) -> &[VarId] {
        &self.indicators
    }

    pub fn indicator(&self, branch: usize) -> MilpResult<VarId> {
        self.indicators
            .get(branch)
            .copied()
            .ok_or_else(|| MilpError::NoSuchBranch {
                name: self.name.clone(),
                branches: self.indicators.len(),
                requested: branch,
            })
    }
}

impl Model {
    /// Compile a disjunction into the model. Returns the branch indicators.
    pub fn add_disjunction(
        &mut self,
        name: &str,
        branches: Vec<Branch>,
        mode: DisjunctionMode,
    ) -> MilpResult<Disjunction> {
        if branches.is_empty() {
            return Err(MilpError::EmptyDisjunction { name: name.into() });
        }
        for branch in &branches {
            for (expr, _, _) in &branch.constraints {
                for &(v, _) in expr.terms() {
                    self.check_var(v)?;
                }
            }
        }

        let indicators: Vec<VarId> = (0..branches.len())
            .map(|b| self.add_binary(format!("{name}.z[{b}]")))
            .collect();

        // exactly one branch active
        let mut pick_one = LinExpr::new();
        for &z in &indicators {
            pick_one.add_term(z, 1.0);
        }
        self.add_constraint(pick_one, Cmp::Eq, 1.0);

        match mode {
            DisjunctionMode::BigM => self.compile_big_m(name, &branches, &indicators)?,
            DisjunctionMode::Hull => self.compile_hull(name, &branches, &indicators)?,
        }

        Ok(Disjunction {
            name: name.into(),
            indicators,
        })
    }

    fn compile_big_m(
        &mut self,
        name: &str,
        branches: &[Branch],
        indicators: &[VarId],
    ) -> MilpResult<()> {
        for (b, branch) in branches.iter().enumerate() {
            let z = indicators[b];
            for (c, (expr, cmp, rhs)) in branch.constraints.iter().enumerate() {
                let (lo, hi) = expr.bounds(|v| self.bounds(v));
                let label = || format!("{name}[{b}].{c}");
                match cmp {
                    Cmp::Le => self.big_m_le(expr.clone(), *rhs, z, hi, label)?,
                    Cmp::Ge => self.big_m_ge(expr.clone(), *rhs, z, lo, label)?,
                    Cmp::Eq => {
                        self.big_m_le(expr.clone(), *rhs, z, hi, label)?;
                        self.big_m_ge(expr.clone(), *rhs, z, lo, label)?;
                    }
                }
            }
        }
        Ok(())
    }

    // expr <= rhs + M(1 - z), tightest M = max(0, sup(expr) - rhs)
    fn big_m_le(
        &mut self,
        expr: LinExpr,
        rhs: f64,
        z: VarId,
        sup: f64,
        label: impl Fn() -> String,
    ) -> MilpResult<()> {
        let m = (sup - rhs).max(0.0);
        if !m.is_finite() {
            return Err(MilpError::UnboundedBigM {
                constraint: label(),
            });
        }
        let mut row = expr;
        row.add_term(z, m);
        self.add_constraint(row, Cmp::Le, rhs + m);
        Ok(())
    }

    // expr >= rhs - M(1 - z), tightest M = max(0, rhs - inf(expr))
    fn big_m_ge(
        &mut self,
        expr: LinExpr,
        rhs: f64,
        z: VarId,
        inf: f64,
        label: impl Fn() -> String,
    ) -> MilpResult<()> {
        let m = (rhs - inf).max(0.0);
        if !m.is_finite() {
            return Err(MilpError::UnboundedBigM {
                constraint: label(),
            });
        }
        let mut row = expr;
        row.add_term(z, -m);
        self.add_constraint(row, Cmp::Ge, rhs - m);
        Ok(())
    }

    fn compile_hull(
        &mut self,
        name: &str,
        branches: &[Branch],
        indicators: &[VarId],
    ) -> MilpResult<()> {
        // union of variables across all branches, in id order
        let mut involved: BTreeMap<VarId, (f64, f64)> = BTreeMap::new();
        for branch in branches {
            for (expr, _, _) in &branch.constraints {
                for &(v, _) in expr.terms() {
                    let (lo, hi) = self.bounds(v);
                    if !lo.is_finite() || !hi.is_finite() {
                        return Err(MilpError::Construction(format!(
                            "hull reformulation of {name} needs finite bounds on {}",
                            self.name(v)
                        )));
                    }
                    involved.insert(v, (lo, hi));
                }
            }
        }

        // per-branch disaggregated copies
        let mut copies: Vec<BTreeMap<VarId, VarId>> = Vec::with_capacity(branches.len());
        for (b, &z) in indicators.iter().enumerate() {
            let mut map = BTreeMap::new();
            for (&v, &(lo, hi)) in &involved {
                let copy_name = format!("{name}.{}[{b}]", self.name(v));
                let copy = self.add_var(copy_name, lo.min(0.0), hi.max(0.0));
                // lo·z <= copy <= hi·z
                self.add_constraint(
                    LinExpr::var(copy) - LinExpr::term(z, lo),
                    Cmp::Ge,
                    0.0,
                );
                self.add_constraint(
                    LinExpr::var(copy) - LinExpr::term(z, hi),
                    Cmp::Le,
                    0.0,
                );
                map.insert(v, copy);
            }
            copies.push(map);
        }

        // each original variable is the sum of its copies
        for &v in involved.keys() {
            let mut sum = LinExpr::var(v);
            for map in &copies {
                sum.add_term(map[&v], -1.0);
            }
            self.add_constraint(sum, Cmp::Eq, 0.0);
        }

        // branch constraints over the copies, constants and rhs scaled by z
        for (b, branch) in branches.iter().enumerate() {
            let z = indicators[b];
            for (expr, cmp, rhs) in &branch.constraints {
                let mut row = LinExpr::new();
                for &(v, c) in expr.terms() {
                    row.add_term(copies[b][&v], c);
                }
                row.add_term(z, expr.constant_part() - rhs);
                self.add_constraint(row, *cmp, 0.0);
            }
        }
        Ok(())
    }

    /// Force a disjunction's choice by fixing its indicators.
    pub fn force_branch(&mut self, d: &Disjunction, branch: usize) -> MilpResult<()> {
        let chosen = d.indicator(branch)?;
        for &z in d.indicators() {
            self.fix(z, if z == chosen { 1.0 } else { 0.0 });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VarKind;

    #[test]
    fn big_m_uses_tightest_constant() {
        let mut m = Model::new();
        let x = m.add_var("x", 0.0, 100.0);
        // branch 0: x <= 10; branch 1: x >= 60
        let d = m
            .add_disjunction(
                "split",
                vec![
                    Branch::new().when(LinExpr::var(x), Cmp::Le, 10.0),
                    Branch::new().when(LinExpr::var(x), Cmp::Ge, 60.0),
                ],
                DisjunctionMode::BigM,
            )
            .unwrap();
        assert_eq!(d.indicators().len(), 2);
        // 1 pick-one + 2 reformulated rows
        assert_eq!(m.constraint_count(), 3);
        // Le row: x + 90 z <= 100 (M = 100 - 10)
        let row = &m.rows[1];
        assert_eq!(row.rhs, 100.0);
        assert!(row.expr.terms().contains(&(d.indicators()[0], 90.0)));
        // Ge row: x - 60 z >= 0 (M = 60 - 0)
        let row = &m.rows[2];
        assert_eq!(row.rhs, 0.0);
        assert!(row.expr.terms().contains(&(d.indicators()[1], -60.0)));
    }

    #[test]
    fn eq_splits_into_two_rows() {
        let mut m = Model::new();
        let x = m.add_var("x", 0.0, 50.0);
        m.add_disjunction(
            "pin",
            vec![Branch::new().when(LinExpr::var(x), Cmp::Eq, 20.0)],
            DisjunctionMode::BigM,
        )
        .unwrap();
        // pick-one + Le half + Ge half
        assert_eq!(m.constraint_count(), 3);
    }

    #[test]
    fn unbounded_expression_is_rejected() {
        let mut m = Model::new();
        let x = m.add_var("x", 0.0, f64::INFINITY);
        let err = m
            .add_disjunction(
                "bad",
                vec![Branch::new().when(LinExpr::var(x), Cmp::Le, 5.0)],
                DisjunctionMode::BigM,
            )
            .unwrap_err();
        assert!(matches!(err, MilpError::UnboundedBigM { .. }));
    }

    #[test]
    fn redundant_big_m_row_gets_zero_m() {
        let mut m = Model::new();
        let x = m.add_var("x", 0.0, 10.0);
        // sup(x) = 10 <= rhs, so M = 0 and the row is just x <= 20
        m.add_disjunction(
            "slack",
            vec![Branch::new().when(LinExpr::var(x), Cmp::Le, 20.0)],
            DisjunctionMode::BigM,
        )
        .unwrap();
        let row = &m.rows[1];
        assert_eq!(row.expr.terms(), &[(x, 1.0)]);
        assert_eq!(row.rhs, 20.0);
    }

    #[test]
    fn hull_disaggregates_per_branch() {
        let mut m = Model::new();
        let x = m.add_var("x", 0.0, 100.0);
        let d = m
            .add_disjunction(
                "split",
                vec![
                    Branch::new().when(LinExpr::var(x), Cmp::Le, 10.0),
                    Branch::new().when(LinExpr::var(x), Cmp::Ge, 60.0),
                ],
                DisjunctionMode::Hull,
            )
            .unwrap();
        // x + 2 indicators + 2 copies
        assert_eq!(m.var_count(), 5);
        // pick-one + 2 bound pairs + 1 aggregation + 2 branch rows
        assert_eq!(m.constraint_count(), 8);
        assert_eq!(m.vars[d.indicators()[0].0].kind, VarKind::Binary);
    }

    #[test]
    fn hull_rejects_free_variables() {
        let mut m = Model::new();
        let x = m.add_var("x", f64::NEG_INFINITY, 10.0);
        let err = m
            .add_disjunction(
                "bad",
                vec![Branch::new().when(LinExpr::var(x), Cmp::Le, 5.0)],
                DisjunctionMode::Hull,
            )
            .unwrap_err();
        assert!(matches!(err, MilpError::Construction(_)));
    }

    #[test]
    fn force_branch_fixes_indicators() {
        let mut m = Model::new();
        let x = m.add_var("x", 0.0, 100.0);
        let d = m
            .add_disjunction(
                "split",
                vec![
                    Branch::new().when(LinExpr::var(x), Cmp::Le, 10.0),
                    Branch::new().when(LinExpr::var(x), Cmp::Ge, 60.0),
                ],
                DisjunctionMode::BigM,
            )
            .unwrap();
        m.force_branch(&d, 1).unwrap();
        assert_eq!(m.bounds(d.indicators()[0]), (0.0, 0.0));
        assert_eq!(m.bounds(d.indicators()[1]), (1.0, 1.0));
        assert!(m.force_branch(&d, 2).is_err());
    }

    #[test]
    fn empty_disjunction_is_an_error() {
        let mut m = Model::new();
        let err = m
            .add_disjunction("none", vec![], DisjunctionMode::BigM)
            .unwrap_err();
        assert!(matches!(err, MilpError::EmptyDisjunction { .. }));
    }
}
