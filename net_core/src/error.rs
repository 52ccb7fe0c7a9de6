use std::fmt;

/// Errors produced while assembling a network from layer records.
#[derive(Debug, Clone, PartialEq)]
pub enum NetError {
    /// A network must contain at least one layer.
    EmptyNetwork,

    /// A shape invariant was violated (e.g. incompatible consecutive layers).
    ShapeMismatch {
        /// Human-readable context for the mismatch (e.g. "bias", "layer 2 input").
        what: String,
        /// Observed dimension.
        got: usize,
        /// Expected dimension.
        expected: usize,
    },
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::EmptyNetwork => write!(f, "network has no layers"),
            NetError::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for NetError {}
