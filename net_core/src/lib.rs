mod dataset;
mod domain;
mod error;
mod network;

pub use dataset::{Column, TabularDataset};
pub use domain::{infer_domains, DomainError, FeatureDomain};
pub use error::NetError;
pub use network::{Layer, Network};
