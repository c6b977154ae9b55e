//! # gep-core: Data model for expansion planning
//!
//! This crate holds the validated, normalized in-memory representation of a
//! planning instance: nodes, transmission corridors, generator technologies,
//! the time structure (years / representative periods / subperiods), cost and
//! demand tables, and the operating-context data (deterministic, contingency
//! scenarios, or probabilistic failure states).
//!
//! Everything here is plain data. Model construction lives in `gep-plan`,
//! the MILP machinery in `gep-milp`. The one piece of behaviour this crate
//! owns is [`System::validate`]: every out-of-range probability, inverted
//! bound pair, or mis-shaped table is rejected *before* any constraint is
//! built, so the solver never sees malformed input.

pub mod context;
pub mod error;
pub mod params;
pub mod system;
mod validate;

pub use context::{OperatingContexts, ScenarioSet, StateSet};
pub use error::{CoreError, CoreResult};
pub use params::{DenseTable, Params};
pub use system::{
    Line, LineBuild, LineId, NodeId, System, TechBuild, TechId, TechKind, Technology, TimeGrid,
};
