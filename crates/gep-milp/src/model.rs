//! The model container: variables, constraints, groups.

use crate::error::{MilpError, MilpResult};
use crate::expr::LinExpr;
use serde::{Deserialize, Serialize};

/// Column index into the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Continuous,
    Binary,
}

/// Comparison direction of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub(crate) struct VarDef {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub kind: VarKind,
}

#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub expr: LinExpr,
    pub cmp: Cmp,
    pub rhs: f64,
    pub group: Option<String>,
    pub active: bool,
}

/// A mixed-integer linear model under construction.
///
/// Construction is deterministic: the same sequence of calls yields the same
/// variable and constraint numbering, which the planning layer relies on
/// when it rebuilds a model and re-applies fixes.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) vars: Vec<VarDef>,
    pub(crate) rows: Vec<Row>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuous variable with the given bounds.
    pub fn add_var(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.push_var(name.into(), lower, upper, VarKind::Continuous)
    }

    /// Add a binary indicator variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(name.into(), 0.0, 1.0, VarKind::Binary)
    }

    fn push_var(&mut self, name: String, lower: f64, upper: f64, kind: VarKind) -> VarId {
        debug_assert!(lower <= upper, "inverted bounds on {name}");
        let id = VarId(self.vars.len());
        self.vars.push(VarDef {
            name,
            lower,
            upper,
            kind,
        });
        id
    }

    /// Add an ungrouped constraint.
    pub fn add_constraint(&mut self, expr: LinExpr, cmp: Cmp, rhs: f64) {
        self.push_row(expr, cmp, rhs, None);
    }

    /// Add a constraint in a named group. Groups exist so a later solve
    /// stage can switch whole families off without renumbering anything.
    pub fn add_grouped(&mut self, group: &str, expr: LinExpr, cmp: Cmp, rhs: f64) {
        self.push_row(expr, cmp, rhs, Some(group.to_string()));
    }

    pub(crate) fn push_row(&mut self, expr: LinExpr, cmp: Cmp, rhs: f64, group: Option<String>) {
        self.rows.push(Row {
            expr: expr.compact(),
            cmp,
            rhs,
            group,
            active: true,
        });
    }

    /// Pin a variable to a value by collapsing its bounds.
    pub fn fix(&mut self, v: VarId, value: f64) {
        let def = &mut self.vars[v.0];
        def.lower = value;
        def.upper = value;
    }

    /// Deactivate every constraint in `group`. Returns how many rows were
    /// switched off.
    pub fn deactivate_group(&mut self, group: &str) -> usize {
        let mut hit = 0;
        for row in &mut self.rows {
            if row.group.as_deref() == Some(group) && row.active {
                row.active = false;
                hit += 1;
            }
        }
        hit
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Number of constraints still active.
    pub fn constraint_count(&self) -> usize {
        self.rows.iter().filter(|r| r.active).count()
    }

    pub fn bounds(&self, v: VarId) -> (f64, f64) {
        let def = &self.vars[v.0];
        (def.lower, def.upper)
    }

    pub fn name(&self, v: VarId) -> &str {
        &self.vars[v.0].name
    }

    pub(crate) fn check_var(&self, v: VarId) -> MilpResult<()> {
        if v.0 >= self.vars.len() {
            return Err(MilpError::Construction(format!(
                "variable {} not in model ({} declared)",
                v.0,
                self.vars.len()
            )));
        }
        Ok(())
    }
}
