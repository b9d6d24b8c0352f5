//! Shared credential data types: byte strings, authority shares, proofs, and
//! the unsigned credential aggregate.

use std::collections::BTreeMap;
use std::fmt;

use crate::encoding;

/// Identifier of an anonymity-revocation authority.
pub type ArIdentity = u32;

/// Index of a key within a credential's public-key set.
pub type KeyIndex = u8;

/// Immutable byte sequence decoded from a hex field.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteString(Vec<u8>);

impl ByteString {
    pub fn new(bytes: Vec<u8>) -> Self {
        ByteString(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        encoding::encode(&self.0)
    }
}

impl fmt::Debug for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteString({})", self.to_hex())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        ByteString(bytes)
    }
}

/// Encrypted share of the credential holder's identity for one authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArShare {
    pub enc_id_cred_pub_share: ByteString,
}

/// Authority id -> encrypted share. Ordered so serialization is stable.
pub type AuthorityShareMap = BTreeMap<ArIdentity, ArShare>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeId {
    Ed25519,
}

impl SchemeId {
    pub fn tag(self) -> u8 {
        match self {
            SchemeId::Ed25519 => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyKey {
    pub scheme: SchemeId,
    pub key: ByteString,
}

/// Public keys controlling the new account, plus the signature threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPublicKeys {
    pub keys: BTreeMap<KeyIndex, VerifyKey>,
    pub threshold: u8,
}

/// Calendar month used by the credential policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub valid_to: YearMonth,
    pub created_at: YearMonth,
    pub revealed_attributes: BTreeMap<String, String>,
}

/// Zero-knowledge proofs accompanying the credential. All fields are
/// required; a partially decoded bundle is never produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofBundle {
    pub challenge: ByteString,
    pub commitments: ByteString,
    pub cred_counter_less_than_max_accounts: ByteString,
    /// Per-authority proof shares. May cover a different authority subset
    /// than the credential's share map.
    pub proof_id_cred_pub: BTreeMap<ArIdentity, ByteString>,
    pub proof_ip_sig: ByteString,
    pub proof_reg_id: ByteString,
    pub signature: ByteString,
}

/// Credential as issued by the identity provider, before account signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedCredential {
    ar_data: AuthorityShareMap,
    cred_id: ByteString,
    public_keys: CredentialPublicKeys,
    ip_identity: u32,
    policy: Policy,
    proofs: ProofBundle,
    revocation_threshold: u8,
}

impl UnsignedCredential {
    /// Assemble a credential. Callers are expected to have validated the
    /// revocation threshold against the share map (see the decoder).
    pub(crate) fn from_parts(
        ar_data: AuthorityShareMap,
        cred_id: ByteString,
        public_keys: CredentialPublicKeys,
        ip_identity: u32,
        policy: Policy,
        proofs: ProofBundle,
        revocation_threshold: u8,
    ) -> Self {
        UnsignedCredential {
            ar_data,
            cred_id,
            public_keys,
            ip_identity,
            policy,
            proofs,
            revocation_threshold,
        }
    }

    pub fn ar_data(&self) -> &AuthorityShareMap {
        &self.ar_data
    }

    pub fn cred_id(&self) -> &ByteString {
        &self.cred_id
    }

    pub fn public_keys(&self) -> &CredentialPublicKeys {
        &self.public_keys
    }

    pub fn ip_identity(&self) -> u32 {
        self.ip_identity
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn proofs(&self) -> &ProofBundle {
        &self.proofs
    }

    pub fn revocation_threshold(&self) -> u8 {
        self.revocation_threshold
    }
}

/// Full issuer payload: credential plus the expiry the caller asked for.
#[derive(Debug, Clone)]
pub struct DeploymentPayload {
    /// Seconds since the Unix epoch.
    pub expiry: u64,
    pub credential: UnsignedCredential,
    /// Informational only. Never consumed by signing.
    pub randomness: Option<serde_json::Value>,
}
