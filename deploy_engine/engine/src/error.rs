//! Centralized deployment pipeline error types.
//!
//! Every stage (decode, derive, sign, network) reports through [`DeployError`],
//! so a single failure type crosses the pipeline boundary. Each variant keeps
//! the low-level diagnostic text for logging.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// Hex text with odd length or a non-hex digit.
    #[error("Malformed hex: {0}")]
    MalformedHex(String),
    /// Required JSON field missing or of the wrong shape.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),
    /// Authority map key that is not a base-10 unsigned integer.
    #[error("Invalid authority key: {0}")]
    InvalidAuthorityKey(String),
    /// Recovery phrase rejected by word-list or checksum validation.
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    /// The signing collaborator could not sign the credential.
    #[error("Signing failure: {0}")]
    SigningFailure(String),
    /// Expiry is not strictly in the future; nothing was sent.
    #[error("Expired transaction: {0}")]
    ExpiredTransaction(String),
    /// Could not open a channel to the node.
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),
    /// The node refused the submitted bytes.
    #[error("Rejected by node: {0}")]
    RejectedByNode(String),
    /// Finality was not observed within the wait budget. Inconclusive.
    #[error("Timed out: {0}")]
    TimedOut(String),
    /// Collaborator fault not covered by any other variant.
    #[error("Unexpected fault: {0}")]
    UnexpectedFault(String),
}

/// Fieldless mirror of [`DeployError`] for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedHex,
    SchemaViolation,
    InvalidAuthorityKey,
    InvalidMnemonic,
    SigningFailure,
    ExpiredTransaction,
    ConnectionFailure,
    RejectedByNode,
    TimedOut,
    UnexpectedFault,
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::MalformedHex(_) => ErrorKind::MalformedHex,
            DeployError::SchemaViolation(_) => ErrorKind::SchemaViolation,
            DeployError::InvalidAuthorityKey(_) => ErrorKind::InvalidAuthorityKey,
            DeployError::InvalidMnemonic(_) => ErrorKind::InvalidMnemonic,
            DeployError::SigningFailure(_) => ErrorKind::SigningFailure,
            DeployError::ExpiredTransaction(_) => ErrorKind::ExpiredTransaction,
            DeployError::ConnectionFailure(_) => ErrorKind::ConnectionFailure,
            DeployError::RejectedByNode(_) => ErrorKind::RejectedByNode,
            DeployError::TimedOut(_) => ErrorKind::TimedOut,
            DeployError::UnexpectedFault(_) => ErrorKind::UnexpectedFault,
        }
    }

    /// The original diagnostic text, without the classification prefix.
    pub fn diagnostic(&self) -> &str {
        match self {
            DeployError::MalformedHex(m)
            | DeployError::SchemaViolation(m)
            | DeployError::InvalidAuthorityKey(m)
            | DeployError::InvalidMnemonic(m)
            | DeployError::SigningFailure(m)
            | DeployError::ExpiredTransaction(m)
            | DeployError::ConnectionFailure(m)
            | DeployError::RejectedByNode(m)
            | DeployError::TimedOut(m)
            | DeployError::UnexpectedFault(m) => m,
        }
    }

    /// True when the outcome says nothing about whether the transaction
    /// will eventually finalize.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, DeployError::TimedOut(_))
    }
}

impl From<serde_json::Error> for DeployError {
    fn from(e: serde_json::Error) -> Self {
        DeployError::SchemaViolation(format!("Invalid JSON: {e}"))
    }
}

impl From<tonic::transport::Error> for DeployError {
    fn from(e: tonic::transport::Error) -> Self {
        DeployError::ConnectionFailure(format!("{e:?}"))
    }
}

/// `Unavailable` means the transport dropped. A call cut off by the request
/// timeout leaves its effect unknown. Anything else is the node answering no.
impl From<tonic::Status> for DeployError {
    fn from(status: tonic::Status) -> Self {
        let message = format!("{:?}: {}", status.code(), status.message());
        match status.code() {
            tonic::Code::Unavailable => DeployError::ConnectionFailure(message),
            tonic::Code::DeadlineExceeded | tonic::Code::Cancelled => DeployError::TimedOut(message),
            _ => DeployError::RejectedByNode(message),
        }
    }
}

pub type DeployResult<T> = Result<T, DeployError>;
