//! Flow intent for a front end driving the pipeline.
//!
//! Which flow to present is decided once, from which handlers the embedding
//! application supplied, instead of branching on optional callbacks at render
//! time.

use crate::error::DeployError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowIntent {
    /// No create/recover handler: only pair with an external wallet.
    QrConnect,
    CreateOnly,
    RecoverOnly,
    CreateAndRecover,
}

/// Whether a session topic must be supplied for account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicPolicy {
    Required,
    /// Use `fallback` when no topic is supplied.
    Optional { fallback: String },
}

/// Presentation step, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    ConnectWallet,
    EnterPhrase,
    CreateIdentity,
    RecoverIdentity,
    DeployCredential,
    Done,
}

/// Selected intent plus the resolved session topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSelection {
    pub intent: FlowIntent,
    pub topic: Option<String>,
}

impl FlowIntent {
    pub fn from_handlers(has_create: bool, has_recover: bool) -> Self {
        match (has_create, has_recover) {
            (false, false) => FlowIntent::QrConnect,
            (true, false) => FlowIntent::CreateOnly,
            (false, true) => FlowIntent::RecoverOnly,
            (true, true) => FlowIntent::CreateAndRecover,
        }
    }

    /// Pick the intent and resolve the session topic under `policy`.
    /// A missing required topic is an error, not a panic.
    pub fn select(
        has_create: bool,
        has_recover: bool,
        topic: Option<&str>,
        policy: &TopicPolicy,
    ) -> Result<FlowSelection, DeployError> {
        let intent = Self::from_handlers(has_create, has_recover);
        let supplied = topic.map(str::trim).filter(|t| !t.is_empty());

        let topic = match (intent.creates_account(), supplied, policy) {
            (_, Some(t), _) => Some(t.to_string()),
            (false, None, _) => None,
            (true, None, TopicPolicy::Required) => {
                return Err(DeployError::SchemaViolation(
                    "a session topic is required for account creation".into(),
                ));
            }
            (true, None, TopicPolicy::Optional { fallback }) => Some(fallback.clone()),
        };

        Ok(FlowSelection { intent, topic })
    }

    pub fn creates_account(self) -> bool {
        matches!(self, FlowIntent::CreateOnly | FlowIntent::CreateAndRecover)
    }

    pub fn steps(self) -> &'static [FlowStep] {
        use FlowStep::*;
        match self {
            FlowIntent::QrConnect => &[ConnectWallet, Done],
            FlowIntent::CreateOnly => &[EnterPhrase, CreateIdentity, DeployCredential, Done],
            FlowIntent::RecoverOnly => &[EnterPhrase, RecoverIdentity, Done],
            FlowIntent::CreateAndRecover => &[
                EnterPhrase,
                CreateIdentity,
                RecoverIdentity,
                DeployCredential,
                Done,
            ],
        }
    }
}
