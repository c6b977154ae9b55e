//! Error types for the data model.
//!
//! Validation failures are always fatal and always raised before any
//! constraint is built; the messages identify the offending field and index.

use thiserror::Error;

/// Errors raised while validating a planning instance.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A value fell outside its admissible range.
    #[error("{field}[{index}] = {value} is outside [{lo}, {hi}]")]
    OutOfRange {
        field: &'static str,
        index: String,
        value: f64,
        lo: f64,
        hi: f64,
    },

    /// A (min, max) bound pair is inverted.
    #[error("{field}[{index}]: min {min} exceeds max {max}")]
    BoundOrder {
        field: &'static str,
        index: String,
        min: f64,
        max: f64,
    },

    /// Failure-state probabilities must sum to one.
    #[error("failure-state probabilities sum to {sum}, expected 1")]
    ProbabilitySum { sum: f64 },

    /// A table's shape does not match the declared index sets.
    #[error("{field}: expected {expected} entries, found {found}")]
    Shape {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// A reference to an undeclared set member.
    #[error("{field} refers to {index}, which is not a declared {set}")]
    UnknownIndex {
        field: &'static str,
        index: String,
        set: &'static str,
    },

    /// Anything structurally wrong that has no better variant.
    #[error("{0}")]
    Invalid(String),
}

/// Convenience alias for results using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_field_and_index() {
        let err = CoreError::OutOfRange {
            field: "demand",
            index: "(2, 1, 0, 3)".into(),
            value: -5.0,
            lo: 0.0,
            hi: f64::INFINITY,
        };
        let msg = err.to_string();
        assert!(msg.contains("demand"));
        assert!(msg.contains("(2, 1, 0, 3)"));
    }

    #[test]
    fn question_mark_propagation() {
        fn inner() -> CoreResult<()> {
            Err(CoreError::Invalid("broken".into()))
        }
        fn outer() -> CoreResult<()> {
            inner()?;
            Ok(())
        }
        assert!(outer().is_err());
    }
}
