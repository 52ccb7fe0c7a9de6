use crate::backend::BackendError;
use net_core::{DomainError, NetError};
use std::{error::Error, fmt};

/// The encoding module's result type.
pub type Result<T> = std::result::Result<T, EncodeError>;

/// Failures of a single encode call. All are fatal for that call: the
/// solves are deterministic given a fixed model, so there is no retry.
#[derive(Debug)]
pub enum EncodeError {
    /// Feature domain inference failed for the dataset.
    Domain(DomainError),

    /// The network's layer shapes are inconsistent, or the input variables
    /// do not match the network's input dimension.
    Shape(NetError),

    /// A bound-tightening relaxation was infeasible or unbounded.
    BoundTightening {
        layer: usize,
        neuron: usize,
        source: BackendError,
    },

    /// The backend or model rejected a variable or constraint.
    Backend(BackendError),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Domain(e) => write!(f, "domain inference failed: {e}"),
            EncodeError::Shape(e) => write!(f, "network shape error: {e}"),
            EncodeError::BoundTightening { layer, neuron, source } => write!(
                f,
                "bound tightening failed for neuron {neuron} of layer {layer}: {source}"
            ),
            EncodeError::Backend(e) => write!(f, "backend error: {e}"),
        }
    }
}

impl Error for EncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EncodeError::Domain(e) => Some(e),
            EncodeError::Shape(e) => Some(e),
            EncodeError::BoundTightening { source, .. } => Some(source),
            EncodeError::Backend(e) => Some(e),
        }
    }
}

impl From<DomainError> for EncodeError {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}

impl From<NetError> for EncodeError {
    fn from(value: NetError) -> Self {
        Self::Shape(value)
    }
}

impl From<BackendError> for EncodeError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}
