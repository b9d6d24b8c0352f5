//! Key derivation adapter.
//!
//! Turns a recovery phrase into seed material and then into network- and
//! index-scoped signing keys. The derivation itself is a pluggable
//! collaborator ([`SeedDeriver`]); this module only marshals parameters and
//! re-exposes keys as hex strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::encoding;
use crate::error::DeployError;

pub mod slip10;

pub use slip10::Slip10Deriver;

/// The two disjoint networks a credential can be deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// BIP-44 coin type used in the derivation path.
    pub fn coin_type(self) -> u32 {
        match self {
            Network::Mainnet => 919,
            Network::Testnet => 1,
        }
    }
}

impl std::str::FromStr for Network {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(DeployError::SchemaViolation(format!("unknown network {other:?}"))),
        }
    }
}

/// Which identity and credential slot a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialPath {
    pub provider: u32,
    pub identity_index: u32,
    pub credential_counter: u32,
}

/// Seed bytes derived from a recovery phrase. Wiped on drop, never printed.
#[derive(Clone)]
pub struct SeedMaterial(Zeroizing<Vec<u8>>);

impl SeedMaterial {
    pub fn new(bytes: Vec<u8>) -> Self {
        SeedMaterial(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(encoding::encode(&self.0))
    }
}

impl fmt::Debug for SeedMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedMaterial(<{} bytes redacted>)", self.0.len())
    }
}

/// Ed25519 key pair in the hex shape downstream consumers expect.
#[derive(Clone)]
pub struct KeyPair {
    sign_key_hex: Zeroizing<String>,
    verify_key_hex: String,
}

impl KeyPair {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let signing = ed25519_dalek::SigningKey::from_bytes(secret);
        KeyPair {
            sign_key_hex: Zeroizing::new(encoding::encode(secret)),
            verify_key_hex: encoding::encode(signing.verifying_key().as_bytes()),
        }
    }

    pub fn sign_key_hex(&self) -> &str {
        &self.sign_key_hex
    }

    pub fn verify_key_hex(&self) -> &str {
        &self.verify_key_hex
    }

    /// Rebuild the dalek signing key from the hex secret.
    pub fn signing_key(&self) -> Result<ed25519_dalek::SigningKey, DeployError> {
        let raw = Zeroizing::new(encoding::decode(&self.sign_key_hex)?);
        let secret: &[u8; 32] = raw.as_slice().try_into().map_err(|_| {
            DeployError::SigningFailure(format!("sign key must be 32 bytes, got {}", raw.len()))
        })?;
        Ok(ed25519_dalek::SigningKey::from_bytes(secret))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("sign_key_hex", &"<redacted>")
            .field("verify_key_hex", &self.verify_key_hex)
            .finish()
    }
}

/// External derivation collaborator. Must be deterministic and do no I/O.
pub trait SeedDeriver: Send + Sync {
    /// Validate the phrase and produce its seed.
    fn seed_from_phrase(&self, phrase: &str) -> Result<SeedMaterial, DeployError>;

    /// Derive the account signing key for one credential slot.
    fn signing_key(
        &self,
        seed: &SeedMaterial,
        network: Network,
        path: &CredentialPath,
    ) -> Result<KeyPair, DeployError>;
}

/// Recovery phrase -> seed. Fails with `InvalidMnemonic`.
pub fn derive_seed(deriver: &dyn SeedDeriver, phrase: &str) -> Result<SeedMaterial, DeployError> {
    let seed = deriver.seed_from_phrase(phrase)?;
    debug!(seed_len = seed.as_bytes().len(), "derived seed from recovery phrase");
    Ok(seed)
}

/// Seed -> signing key pair for the given network and credential slot.
pub fn derive_signing_key(
    deriver: &dyn SeedDeriver,
    seed: &SeedMaterial,
    network: Network,
    path: &CredentialPath,
) -> Result<KeyPair, DeployError> {
    let keys = deriver.signing_key(seed, network, path)?;
    info!(
        ?network,
        provider = path.provider,
        identity = path.identity_index,
        credential = path.credential_counter,
        verify_key = keys.verify_key_hex(),
        "derived credential signing key"
    );
    Ok(keys)
}
