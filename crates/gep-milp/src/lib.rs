//! # gep-milp: mixed-integer model IR and solve layer
//!
//! A small intermediate representation for mixed-integer linear programs,
//! built for the expansion-planning crates but domain-agnostic: variables
//! with bounds and integrality, linear constraints in named groups, and
//! disjunctions that compile to either a big-M or a convex-hull
//! reformulation.
//!
//! The deliberate split from `gep-plan` keeps reformulation testable on
//! three-variable toy models: everything in this crate can be exercised
//! without constructing a planning instance.
//!
//! Solving goes through [HiGHS](https://highs.dev) via the `highs` crate;
//! [`solve`] translates the IR, maps solver statuses back, and returns the
//! column values alongside the objective.

pub mod disjunction;
pub mod error;
pub mod expr;
pub mod model;
pub mod solve;

pub use disjunction::{Branch, Disjunction, DisjunctionMode};
pub use error::{MilpError, MilpResult};
pub use expr::LinExpr;
pub use model::{Cmp, Model, Sense, VarId, VarKind};
pub use solve::{solve, SolveOutcome, SolveStatus, SolverConfig};
