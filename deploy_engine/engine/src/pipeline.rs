//! End-to-end credential deployment: decode -> derive -> sign -> submit.
//!
//! Every invocation owns its seed material, keys, channel and audit trail.
//! Nothing mutable is shared between concurrent invocations.

use std::sync::Arc;

use tracing::{error, info};

use crate::audit::{AuditEventType, AuditTracker};
use crate::config::DeployConfig;
use crate::credential::decode_payload;
use crate::derivation::{SeedDeriver, Slip10Deriver, derive_seed, derive_signing_key};
use crate::error::DeployError;
use crate::node::{GrpcConnector, NodeConnector, Outcome};
use crate::submission::{Clock, Finalization, SubmissionController, SubmissionState, SystemClock};
use crate::transaction::{
    CredentialSigner, Ed25519Signer, SignedTransactionEnvelope, assemble_and_sign_with,
    ensure_not_expired,
};

/// Result of one [`Pipeline::deploy`] call with its trail.
#[derive(Debug)]
pub struct DeploymentReport {
    pub outcome: Result<Finalization, DeployError>,
    /// Controller states entered, starting with `Idle`.
    pub transitions: Vec<SubmissionState>,
    pub audit: AuditTracker,
}

impl DeploymentReport {
    pub fn final_state(&self) -> SubmissionState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(SubmissionState::Idle)
    }
}

pub struct Pipeline {
    config: DeployConfig,
    deriver: Arc<dyn SeedDeriver>,
    signer: Arc<dyn CredentialSigner>,
    connector: Arc<dyn NodeConnector>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Pipeline with the default derivation, signer and system clock.
    pub fn new(config: DeployConfig, connector: Arc<dyn NodeConnector>) -> Result<Self, DeployError> {
        config.validate()?;
        Ok(Pipeline {
            config,
            deriver: Arc::new(Slip10Deriver::new()),
            signer: Arc::new(Ed25519Signer),
            connector,
            clock: Arc::new(SystemClock),
        })
    }

    /// Pipeline talking gRPC to the configured node.
    pub fn grpc(config: DeployConfig) -> Result<Self, DeployError> {
        let connector = Arc::new(
            GrpcConnector::new(config.connect_timeout()).with_request_timeout(config.timeout()),
        );
        Self::new(config, connector)
    }

    pub fn with_deriver(mut self, deriver: Arc<dyn SeedDeriver>) -> Self {
        self.deriver = deriver;
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn CredentialSigner>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Expiry `expiry_secs` from now, for callers that do not want the
    /// issuer-supplied one.
    pub fn fresh_expiry(&self) -> u64 {
        self.clock.now_secs().saturating_add(self.config.expiry_secs)
    }

    /// Decode, derive and sign without touching the network.
    /// `expiry` overrides the payload's expiry when given.
    pub fn prepare(
        &self,
        payload_json: &str,
        phrase: &str,
        expiry: Option<u64>,
        audit: &AuditTracker,
    ) -> Result<SignedTransactionEnvelope, DeployError> {
        let payload = decode_payload(payload_json)?;
        audit.event(
            AuditEventType::Decode,
            None,
            format!(
                "decoded credential from provider {} with {} authority shares",
                payload.credential.ip_identity(),
                payload.credential.ar_data().len()
            ),
        );

        let expiry = expiry.unwrap_or(payload.expiry);
        ensure_not_expired(expiry, self.clock.now_secs())?;

        let keys = {
            let seed = derive_seed(self.deriver.as_ref(), phrase)?;
            derive_signing_key(
                self.deriver.as_ref(),
                &seed,
                self.config.network,
                &self.config.identity,
            )?
        };
        audit.event(
            AuditEventType::Derive,
            None,
            format!("derived signing key {}", keys.verify_key_hex()),
        );

        let envelope = assemble_and_sign_with(self.signer.as_ref(), payload.credential, expiry, &keys)?;
        audit.event(
            AuditEventType::Sign,
            Some(&envelope.transaction_hash()),
            format!("signed envelope expiring at {expiry}"),
        );
        Ok(envelope)
    }

    /// Run the whole pipeline and wait for finality.
    pub async fn deploy(&self, payload_json: &str, phrase: &str, expiry: Option<u64>) -> DeploymentReport {
        let audit = AuditTracker::default();

        let envelope = match self.prepare(payload_json, phrase, expiry, &audit) {
            Ok(envelope) => envelope,
            Err(e) => return finish(audit, Err(e), vec![SubmissionState::Idle]),
        };
        let tx_hash = envelope.transaction_hash();

        let mut controller = SubmissionController::new(
            self.connector.as_ref(),
            self.clock.as_ref(),
            self.config.endpoint.clone(),
            self.config.poll_interval(),
        );
        audit.event(
            AuditEventType::Submit,
            Some(&tx_hash),
            format!(
                "submitting to {}:{}",
                self.config.endpoint.host, self.config.endpoint.port
            ),
        );
        let outcome = controller
            .submit_and_await(&envelope, self.config.timeout())
            .await;

        if controller.transitions().contains(&SubmissionState::Connected) {
            let message = match controller.teardown_fault() {
                Some(fault) => format!("channel close failed (ignored): {fault}"),
                None => "channel closed".to_string(),
            };
            audit.event(AuditEventType::Teardown, Some(&tx_hash), message);
        }

        finish(audit, outcome, controller.transitions().to_vec())
    }

    /// Convenience wrapper returning only the transaction identifier.
    pub async fn deploy_credential(&self, payload_json: &str, phrase: &str) -> Result<String, DeployError> {
        self.deploy(payload_json, phrase, None)
            .await
            .outcome
            .map(|finalization| finalization.tx_hash)
    }
}

fn finish(
    audit: AuditTracker,
    outcome: Result<Finalization, DeployError>,
    transitions: Vec<SubmissionState>,
) -> DeploymentReport {
    match &outcome {
        Ok(finalization) => {
            let effect = match &finalization.outcome {
                Outcome::Success => "succeeded".to_string(),
                Outcome::Reject { reason } => format!("was rejected on chain: {reason}"),
            };
            info!(tx_hash = %finalization.tx_hash, block = %finalization.block_hash, "deployment finalized");
            audit.event(
                AuditEventType::Finalize,
                Some(&finalization.tx_hash),
                format!("finalized in block {}; credential {effect}", finalization.block_hash),
            );
        }
        Err(e) => {
            error!(kind = ?e.kind(), inconclusive = e.is_inconclusive(), "deployment failed: {e}");
            audit.event(AuditEventType::Error, None, e.to_string());
        }
    }

    DeploymentReport {
        outcome,
        transitions,
        audit,
    }
}
