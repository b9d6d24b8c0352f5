//! Shared fixtures: golden vectors, a scripted node and a manual clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::config::Endpoint;
use crate::error::DeployError;
use crate::node::{BlockItemStatus, NodeClient, NodeConnector, Outcome, TransactionHash};
use crate::submission::Clock;

pub const GOLDEN_PAYLOAD: &str = include_str!("fixtures/golden_payload.json");

/// 24-word phrase for all-zero entropy.
pub const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
     abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon \
     abandon abandon abandon abandon art";

pub const SEED_HEX: &str = "408b285c123836004f4b8842c89324c1f01382450c0d439af345ba7fc49acf70\
     5489c6fc77dbd4e3dc1dd8cc6bc9f043db8ada1e243c4a0eafb290d399480840";

/// m/44'/1'/0'/0'/2'/0'
pub const TESTNET_SIGN_KEY: &str =
    "c529a90250c0d0cf6bb0e94a6898a22e7e66f2eec1d64d418d3f40b904b81e36";
pub const TESTNET_VERIFY_KEY: &str =
    "90d3cc683907a608046fdccb2c00f1ebc3e182559b22c51dcc0368e154291450";
/// m/44'/919'/0'/0'/2'/0'
pub const MAINNET_VERIFY_KEY: &str =
    "fab081aac7a5941c6349bd2dd7c4ad8f1d6dd0dd581eba98978b2c3fb5bcd051";
/// m/44'/1'/0'/0'/2'/1'
pub const TESTNET_CRED1_VERIFY_KEY: &str =
    "f6edec8a5258f96af2c51fd55991739b848b4671a881babc730031d5bb3ed07c";

pub const GOLDEN_EXPIRY: u64 = 1_893_456_000;

pub const GOLDEN_SIGNATURE: &str = "5c75742a2343dc1b06cceaa3de239452aa31ad962f6c964bc44d23fa75ae061c\
     94ec70718958886cc03467fbe6351714fc10c7953a63cf28ca36ca01c0caf80a";

pub const GOLDEN_ENVELOPE: &str = "00010000000070dbd88001000040\
     5c75742a2343dc1b06cceaa3de239452aa31ad962f6c964bc44d23fa75ae061c\
     94ec70718958886cc03467fbe6351714fc10c7953a63cf28ca36ca01c0caf80a\
     00030000000100000008aaaaaaaaaaaaaaaa0000000200000008bbbbbbbbbbbbbbbb\
     0000000300000008cccccccccccccccc00000030\
     abababababababababababababababababababababababababababababababab\
     abababababababababababababababab\
     0100000000002090d3cc683907a608046fdccb2c00f1ebc3e182559b22c51dcc0368e154291450\
     01000000000\
     7eb0c07ea0a0000\
     000000040101010100000004020202020000000403030303\
     0003000000010000000404040404000000020000000405050505000000030000000406060606\
     000000040707070700000004080808080000000409090909\
     02";

pub const GOLDEN_TX_HASH: &str =
    "86cb2a78417973d49f12349b5b1f09d8d83c2d842a7b20c8571ed86c4a42b27a";

/// Before `GOLDEN_EXPIRY`.
pub const BEFORE_EXPIRY: i64 = 1_800_000_000;

/// Golden payload as a JSON value, for tests that mutate it.
pub fn golden_value() -> serde_json::Value {
    serde_json::from_str(GOLDEN_PAYLOAD).expect("fixture is valid JSON")
}

/// The `unsignedCdi` object of the golden payload.
pub fn golden_cdi() -> serde_json::Value {
    golden_value()["unsignedCdi"].clone()
}

/// Clock that only moves when slept on.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    slept: Mutex<Duration>,
}

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        ManualClock {
            now: Mutex::new(DateTime::from_timestamp(secs, 0).expect("valid timestamp")),
            slept: Mutex::new(Duration::ZERO),
        }
    }

    pub fn total_slept(&self) -> Duration {
        *self.slept.lock().unwrap()
    }
}

#[tonic::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration).unwrap();
        *self.now.lock().unwrap() += step;
        *self.slept.lock().unwrap() += duration;
    }
}

/// What the mock node should do.
#[derive(Clone, Default)]
pub struct NodeScript {
    pub connect_error: Option<DeployError>,
    pub send_error: Option<DeployError>,
    /// Answers to successive status polls; the last one repeats. Empty means
    /// `Received` forever.
    pub statuses: Vec<Result<BlockItemStatus, DeployError>>,
    /// Status polls never answer.
    pub hang_status: bool,
    pub close_error: Option<DeployError>,
}

impl NodeScript {
    /// Received, then committed, then finalized successfully.
    pub fn finalizing() -> Self {
        NodeScript {
            statuses: vec![
                Ok(BlockItemStatus::Received),
                Ok(BlockItemStatus::Committed),
                Ok(finalized(Outcome::Success)),
            ],
            ..Default::default()
        }
    }

    /// Accepts the send, then leaves every status poll unanswered.
    pub fn hanging() -> Self {
        NodeScript {
            hang_status: true,
            ..Default::default()
        }
    }

    pub fn never_final() -> Self {
        NodeScript {
            statuses: vec![Ok(BlockItemStatus::Committed)],
            ..Default::default()
        }
    }
}

pub fn finalized(outcome: Outcome) -> BlockItemStatus {
    BlockItemStatus::Finalized {
        block_hash: "b1".repeat(32),
        outcome,
    }
}

/// Everything the mock node observed.
#[derive(Debug, Clone, Default)]
pub struct NodeLog {
    pub connects: usize,
    pub sent: Vec<Vec<u8>>,
    pub status_polls: usize,
    pub closed: usize,
}

pub struct MockConnector {
    script: NodeScript,
    log: Arc<Mutex<NodeLog>>,
}

impl MockConnector {
    pub fn new(script: NodeScript) -> Self {
        MockConnector {
            script,
            log: Arc::new(Mutex::new(NodeLog::default())),
        }
    }

    pub fn log(&self) -> NodeLog {
        self.log.lock().unwrap().clone()
    }
}

#[tonic::async_trait]
impl NodeConnector for MockConnector {
    async fn connect(&self, _endpoint: &Endpoint) -> Result<Box<dyn NodeClient>, DeployError> {
        if let Some(e) = &self.script.connect_error {
            return Err(e.clone());
        }
        self.log.lock().unwrap().connects += 1;
        Ok(Box::new(MockClient {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
            cursor: 0,
        }))
    }
}

struct MockClient {
    script: NodeScript,
    log: Arc<Mutex<NodeLog>>,
    cursor: usize,
}

#[tonic::async_trait]
impl NodeClient for MockClient {
    async fn send_block_item(&mut self, bytes: Vec<u8>) -> Result<TransactionHash, DeployError> {
        let hash = Sha256::digest(&bytes).to_vec();
        self.log.lock().unwrap().sent.push(bytes);
        if let Some(e) = &self.script.send_error {
            return Err(e.clone());
        }
        Ok(TransactionHash::new(hash))
    }

    async fn block_item_status(
        &mut self,
        _hash: &TransactionHash,
    ) -> Result<BlockItemStatus, DeployError> {
        self.log.lock().unwrap().status_polls += 1;
        if self.script.hang_status {
            return std::future::pending().await;
        }
        let statuses = &self.script.statuses;
        if statuses.is_empty() {
            return Ok(BlockItemStatus::Received);
        }
        let answer = statuses[self.cursor.min(statuses.len() - 1)].clone();
        self.cursor += 1;
        answer
    }

    async fn close(&mut self) -> Result<(), DeployError> {
        self.log.lock().unwrap().closed += 1;
        match &self.script.close_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
