//! Submission & finalization controller.
//!
//! `Idle -> Connected -> Submitted -> {Finalized | TimedOut | Failed}`.
//! The channel opened in `Connected` is closed on every exit path before the
//! result is returned. A failing close is logged and never replaces the
//! primary result.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Endpoint;
use crate::error::DeployError;
use crate::node::{BlockItemStatus, NodeClient, NodeConnector, Outcome};
use crate::transaction::{SignedTransactionEnvelope, ensure_not_expired};

/// Time source and sleeper. Injected so tests can run the poll loop on
/// virtual time.
#[tonic::async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);

    fn now_secs(&self) -> u64 {
        u64::try_from(self.now().timestamp()).unwrap_or(0)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[tonic::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Connected,
    Submitted,
    Finalized,
    TimedOut,
    Failed,
}

/// Terminal success: the transaction is in a finalized block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalization {
    /// Lower-case hex transaction identifier.
    pub tx_hash: String,
    pub block_hash: String,
    pub outcome: Outcome,
}

/// Drives one envelope through one channel session. Not reusable across
/// envelopes: construct a new controller per submission.
pub struct SubmissionController<'a> {
    connector: &'a dyn NodeConnector,
    clock: &'a dyn Clock,
    endpoint: Endpoint,
    poll_interval: Duration,
    transitions: Vec<SubmissionState>,
    teardown_fault: Option<String>,
}

impl<'a> SubmissionController<'a> {
    pub fn new(
        connector: &'a dyn NodeConnector,
        clock: &'a dyn Clock,
        endpoint: Endpoint,
        poll_interval: Duration,
    ) -> Self {
        SubmissionController {
            connector,
            clock,
            endpoint,
            poll_interval,
            transitions: vec![SubmissionState::Idle],
            teardown_fault: None,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(SubmissionState::Idle)
    }

    /// Every state entered, in order, starting with `Idle`.
    pub fn transitions(&self) -> &[SubmissionState] {
        &self.transitions
    }

    /// Diagnostic from a failed channel close, if any.
    pub fn teardown_fault(&self) -> Option<&str> {
        self.teardown_fault.as_deref()
    }

    /// Submit and wait up to `timeout` for finality.
    ///
    /// An expired envelope is refused before any connection is opened.
    /// `TimedOut` means the outcome is unknown; the transaction may still
    /// finalize later.
    pub async fn submit_and_await(
        &mut self,
        envelope: &SignedTransactionEnvelope,
        timeout: Duration,
    ) -> Result<Finalization, DeployError> {
        if let Err(e) = ensure_not_expired(envelope.expiry(), self.clock.now_secs()) {
            self.enter(SubmissionState::Failed);
            return Err(e);
        }
        let budget = match finality_budget(timeout, self.clock.now()) {
            Ok(budget) => budget,
            Err(e) => {
                self.enter(SubmissionState::Failed);
                return Err(e);
            }
        };

        let mut client = match self.connector.connect(&self.endpoint).await {
            Ok(client) => client,
            Err(e) => {
                self.enter(SubmissionState::Failed);
                return Err(e);
            }
        };
        self.enter(SubmissionState::Connected);

        let result = self.drive(client.as_mut(), envelope, timeout, budget).await;

        // Teardown. If this future is dropped or unwinds before reaching
        // here, dropping `client` still releases the channel.
        if let Err(e) = client.close().await {
            warn!(error = %e, "node channel teardown failed");
            self.teardown_fault = Some(e.to_string());
        }
        drop(client);

        match &result {
            Ok(_) => self.enter(SubmissionState::Finalized),
            Err(DeployError::TimedOut(_)) => self.enter(SubmissionState::TimedOut),
            Err(_) => self.enter(SubmissionState::Failed),
        }
        result
    }

    async fn drive(
        &mut self,
        client: &mut dyn NodeClient,
        envelope: &SignedTransactionEnvelope,
        timeout: Duration,
        budget: chrono::Duration,
    ) -> Result<Finalization, DeployError> {
        let hash = client.send_block_item(envelope.serialize()).await?;
        self.enter(SubmissionState::Submitted);
        info!(tx_hash = %hash, "credential deployment submitted");

        let clock = self.clock;
        let deadline = clock
            .now()
            .checked_add_signed(budget)
            .ok_or_else(|| out_of_range(timeout))?;
        let mut polls = 0u32;
        let mut last_fault: Option<String> = None;

        loop {
            polls += 1;
            // A status call that never answers must not outlive the deadline.
            let remaining = (deadline - clock.now()).to_std().unwrap_or_default();
            let answer = tokio::select! {
                biased;
                answer = client.block_item_status(&hash) => Some(answer),
                () = clock.sleep(remaining) => None,
            };

            match answer {
                Some(Ok(BlockItemStatus::Finalized {
                    block_hash,
                    outcome,
                })) => {
                    info!(tx_hash = %hash, %block_hash, ?outcome, polls, "transaction finalized");
                    return Ok(Finalization {
                        tx_hash: hash.to_hex(),
                        block_hash,
                        outcome,
                    });
                }
                Some(Ok(status)) => debug!(tx_hash = %hash, ?status, polls, "not final yet"),
                // Status lookups after acceptance are retried until the
                // deadline; they say nothing about the transaction itself.
                Some(Err(e)) => {
                    warn!(tx_hash = %hash, error = %e, polls, "status query failed");
                    last_fault = Some(e.to_string());
                }
                None => {
                    warn!(tx_hash = %hash, polls, "status query still pending at deadline");
                    last_fault = Some("status query did not answer before the deadline".into());
                }
            }

            let now = clock.now();
            if now >= deadline {
                let mut message = format!(
                    "transaction {hash} not finalized after {}s ({polls} polls)",
                    timeout.as_secs_f64()
                );
                if let Some(fault) = last_fault {
                    message.push_str(&format!("; last status error: {fault}"));
                }
                return Err(DeployError::TimedOut(message));
            }

            let remaining = (deadline - now).to_std().unwrap_or_default();
            clock.sleep(self.poll_interval.min(remaining)).await;
        }
    }

    fn enter(&mut self, state: SubmissionState) {
        debug!(from = ?self.state(), to = ?state, "submission state change");
        self.transitions.push(state);
    }
}

/// Finality wait as a chrono span. Fails when `from + timeout` is not a
/// representable timestamp.
pub fn finality_budget(timeout: Duration, from: DateTime<Utc>) -> Result<chrono::Duration, DeployError> {
    chrono::Duration::from_std(timeout)
        .ok()
        .filter(|budget| from.checked_add_signed(*budget).is_some())
        .ok_or_else(|| out_of_range(timeout))
}

fn out_of_range(timeout: Duration) -> DeployError {
    DeployError::SchemaViolation(format!(
        "finality timeout of {}s is out of range",
        timeout.as_secs()
    ))
}
