//! Encodes trained feed-forward ReLU networks as mixed-integer linear
//! programs, under an exact indicator formulation or a Big-M formulation
//! with per-neuron LP bound tightening.

mod backend;
mod bounds;
mod encoder;
mod error;
mod model;
mod simplex;

pub use backend::{Backend, BackendError};
pub use bounds::query_bounds;
pub use encoder::{Encoding, EncodingStrategy, NetworkEncoder};
pub use error::{EncodeError, Result};
pub use model::{
    Constraint, ConstraintModel, Indicator, LinearExpr, ObjSense, Objective, Sense, VarId,
    VarKind, VarRole, Variable,
};
pub use simplex::SimplexBackend;
