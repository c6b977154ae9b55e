//! Linear expressions over model variables.

use crate::model::VarId;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A linear expression `Σ coef · var + constant`.
///
/// Terms are kept in insertion order; [`LinExpr::compact`] merges duplicate
/// variables and drops zero coefficients. Model construction calls it once
/// per constraint so that row translation and big-M interval evaluation see
/// each column at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// A single variable with coefficient one.
    pub fn var(v: VarId) -> Self {
        Self::term(v, 1.0)
    }

    pub fn term(v: VarId, coef: f64) -> Self {
        Self {
            terms: vec![(v, coef)],
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, v: VarId, coef: f64) {
        self.terms.push((v, coef));
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_part(&self) -> f64 {
        self.constant
    }

    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|&(_, c)| c == 0.0)
    }

    /// Merge duplicate variables and drop zero coefficients.
    pub fn compact(mut self) -> Self {
        self.terms.sort_by_key(|&(v, _)| v);
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(self.terms.len());
        for (v, c) in self.terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == v => *acc += c,
                _ => merged.push((v, c)),
            }
        }
        merged.retain(|&(_, c)| c != 0.0);
        self.terms = merged;
        self
    }

    /// Interval evaluation: the tightest `[inf, sup]` of the expression
    /// given per-variable bounds. Infinite variable bounds propagate.
    pub fn bounds(&self, var_bounds: impl Fn(VarId) -> (f64, f64)) -> (f64, f64) {
        let mut lo = self.constant;
        let mut hi = self.constant;
        for &(v, c) in &self.terms {
            let (vlo, vhi) = var_bounds(v);
            if c >= 0.0 {
                lo += c * vlo;
                hi += c * vhi;
            } else {
                lo += c * vhi;
                hi += c * vlo;
            }
        }
        (lo, hi)
    }

    /// Evaluate against a full column-value vector.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|&(v, c)| c * values[v.0])
                .sum::<f64>()
    }

    /// Sum of expressions.
    pub fn sum(exprs: impl IntoIterator<Item = LinExpr>) -> Self {
        let mut acc = LinExpr::new();
        for e in exprs {
            acc += e;
        }
        acc
    }
}

impl From<VarId> for LinExpr {
    fn from(v: VarId) -> Self {
        LinExpr::var(v)
    }
}

impl Add for LinExpr {
    type Output = LinExpr;
    fn add(mut self, rhs: LinExpr) -> LinExpr {
        self += rhs;
        self
    }
}

impl AddAssign for LinExpr {
    fn add_assign(&mut self, rhs: LinExpr) {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl Sub for LinExpr {
    type Output = LinExpr;
    fn sub(mut self, rhs: LinExpr) -> LinExpr {
        self -= rhs;
        self
    }
}

impl SubAssign for LinExpr {
    fn sub_assign(&mut self, rhs: LinExpr) {
        for (v, c) in rhs.terms {
            self.terms.push((v, -c));
        }
        self.constant -= rhs.constant;
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;
    fn mul(mut self, k: f64) -> LinExpr {
        for t in &mut self.terms {
            t.1 *= k;
        }
        self.constant *= k;
        self
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;
    fn neg(self) -> LinExpr {
        self * -1.0
    }
}

impl Add<f64> for LinExpr {
    type Output = LinExpr;
    fn add(mut self, k: f64) -> LinExpr {
        self.constant += k;
        self
    }
}

impl Sub<f64> for LinExpr {
    type Output = LinExpr;
    fn sub(mut self, k: f64) -> LinExpr {
        self.constant -= k;
        self
    }
}
