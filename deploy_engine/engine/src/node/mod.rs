//! Network node collaborator.
//!
//! The controller only needs "send bytes, get a reference" and "what is the
//! status of this reference". [`grpc`] provides the production client.

use std::fmt;

use crate::config::Endpoint;
use crate::encoding;
use crate::error::DeployError;

pub mod grpc;

pub use grpc::{GrpcConnector, GrpcNodeClient};

/// Reference returned by the node when it accepts a block item.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TransactionHash(Vec<u8>);

impl TransactionHash {
    pub fn new(bytes: Vec<u8>) -> Self {
        TransactionHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        encoding::encode(&self.0)
    }
}

impl fmt::Debug for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionHash({})", self.to_hex())
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// On-chain effect of a finalized transaction. Independent of whether the
/// submission itself was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Reject { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockItemStatus {
    /// In the node's pending pool.
    Received,
    /// In at least one block, not yet final.
    Committed,
    Finalized { block_hash: String, outcome: Outcome },
}

/// One open channel to a node.
#[tonic::async_trait]
pub trait NodeClient: Send {
    /// Submit a serialized envelope. Acceptance into the pending pool, not
    /// finality.
    async fn send_block_item(&mut self, bytes: Vec<u8>) -> Result<TransactionHash, DeployError>;

    async fn block_item_status(
        &mut self,
        hash: &TransactionHash,
    ) -> Result<BlockItemStatus, DeployError>;

    /// Release the channel and any background tasks serving it.
    async fn close(&mut self) -> Result<(), DeployError>;
}

/// Opens channels. Each call yields an independent client.
#[tonic::async_trait]
pub trait NodeConnector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn NodeClient>, DeployError>;
}
