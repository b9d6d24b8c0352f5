//! Credential Deployment Engine Core Library
//!
//! Turns an issuer's unsigned credential and a user's recovery phrase into a
//! signed credential-deployment transaction, submits it to a node and waits
//! for finalization.

pub mod audit;
pub mod config;
pub mod credential;
pub mod derivation;
pub mod encoding;
pub mod error;
pub mod intent;
pub mod logging;
pub mod node;
pub mod pipeline;
pub mod submission;
pub mod transaction;

pub use config::{DeployConfig, Endpoint};
pub use error::{DeployError, DeployResult, ErrorKind};
pub use pipeline::{DeploymentReport, Pipeline};

#[cfg(test)]
mod tests;
