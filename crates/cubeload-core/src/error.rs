//! Error types for core value construction.

use thiserror::Error;

/// Errors from constructing a [`Position`](crate::Position).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PositionError {
    /// A coordinate does not fit in its packed bit field.
    #[error("{axis} coordinate {value} outside packed range [{min}, {max}]")]
    OutOfRange {
        /// The offending axis (`"x"`, `"y"` or `"z"`).
        axis: &'static str,
        /// The rejected value.
        value: i32,
        /// Smallest representable value on this axis.
        min: i32,
        /// Largest representable value on this axis.
        max: i32,
    },
}
