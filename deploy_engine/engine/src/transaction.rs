//! Transaction assembler & signer.
//!
//! Binds a decoded credential, an expiry and derived keys into a signed
//! envelope. The credential bytes are encoded exactly once, at assembly, and
//! the same bytes are both hashed for signing and written by [`serialize`].

use std::collections::BTreeMap;

use ed25519_dalek::Signer as _;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::credential::wire::WireBuffer;
use crate::credential::{ByteString, KeyIndex, UnsignedCredential, encode_credential};
use crate::derivation::KeyPair;
use crate::encoding;
use crate::error::DeployError;

pub const ENVELOPE_VERSION: u8 = 0;
pub const CREDENTIAL_DEPLOYMENT_KIND: u8 = 1;

/// Key index the derived account key signs for.
pub const SIGNING_KEY_INDEX: KeyIndex = 0;

/// Signing collaborator. Implementations must be deterministic for the
/// envelope to be reproducible.
pub trait CredentialSigner: Send + Sync {
    fn sign(&self, keys: &KeyPair, digest: &[u8; 32]) -> Result<Vec<u8>, DeployError>;
}

/// Ed25519 (RFC 8032) signer. Deterministic by construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Signer;

impl CredentialSigner for Ed25519Signer {
    fn sign(&self, keys: &KeyPair, digest: &[u8; 32]) -> Result<Vec<u8>, DeployError> {
        let signing_key = keys.signing_key()?;
        Ok(signing_key.sign(digest).to_bytes().to_vec())
    }
}

/// Signed credential deployment, ready for the wire.
#[derive(Debug, Clone)]
pub struct SignedTransactionEnvelope {
    credential: UnsignedCredential,
    expiry: u64,
    signatures: BTreeMap<KeyIndex, ByteString>,
    credential_bytes: Vec<u8>,
}

impl SignedTransactionEnvelope {
    pub fn credential(&self) -> &UnsignedCredential {
        &self.credential
    }

    /// Seconds since the Unix epoch.
    pub fn expiry(&self) -> u64 {
        self.expiry
    }

    pub fn signatures(&self) -> &BTreeMap<KeyIndex, ByteString> {
        &self.signatures
    }

    /// Exact bytes covered by the signature digest.
    pub fn signed_bytes(&self) -> Vec<u8> {
        signing_preimage(&self.credential_bytes, self.expiry)
    }

    pub fn serialize(&self) -> Vec<u8> {
        serialize(self)
    }

    /// Lower-case hex SHA-256 of the serialized envelope.
    pub fn transaction_hash(&self) -> String {
        encoding::encode(&Sha256::digest(self.serialize()))
    }
}

/// Assemble and sign with the default Ed25519 signer.
pub fn assemble_and_sign(
    credential: UnsignedCredential,
    expiry: u64,
    keys: &KeyPair,
) -> Result<SignedTransactionEnvelope, DeployError> {
    assemble_and_sign_with(&Ed25519Signer, credential, expiry, keys)
}

pub fn assemble_and_sign_with(
    signer: &dyn CredentialSigner,
    credential: UnsignedCredential,
    expiry: u64,
    keys: &KeyPair,
) -> Result<SignedTransactionEnvelope, DeployError> {
    // The node checks the signature against key 0 of the credential itself.
    let expected = credential
        .public_keys()
        .keys
        .get(&SIGNING_KEY_INDEX)
        .ok_or_else(|| {
            DeployError::SigningFailure(format!(
                "credential has no public key at index {SIGNING_KEY_INDEX}"
            ))
        })?;
    if expected.key.to_hex() != keys.verify_key_hex() {
        return Err(DeployError::SigningFailure(format!(
            "derived key {} does not match credential key {}",
            keys.verify_key_hex(),
            expected.key.to_hex()
        )));
    }

    let credential_bytes = encode_credential(&credential)?;
    let digest: [u8; 32] = Sha256::digest(signing_preimage(&credential_bytes, expiry)).into();

    let signature = signer.sign(keys, &digest)?;
    if signature.is_empty() || signature.len() > usize::from(u16::MAX) {
        return Err(DeployError::SigningFailure(format!(
            "signer returned a {}-byte signature",
            signature.len()
        )));
    }
    debug!(digest = %encoding::encode(&digest), "signed credential digest");

    let mut signatures = BTreeMap::new();
    signatures.insert(SIGNING_KEY_INDEX, ByteString::new(signature));

    let envelope = SignedTransactionEnvelope {
        credential,
        expiry,
        signatures,
        credential_bytes,
    };
    info!(
        expiry,
        tx_hash = %envelope.transaction_hash(),
        "assembled credential deployment"
    );
    Ok(envelope)
}

/// Reject an expiry that is not strictly after `now_secs`, before any
/// network round-trip is spent on it.
pub fn ensure_not_expired(expiry: u64, now_secs: u64) -> Result<(), DeployError> {
    if expiry <= now_secs {
        return Err(DeployError::ExpiredTransaction(format!(
            "expiry {expiry} is not after current time {now_secs}"
        )));
    }
    Ok(())
}

/// Envelope wire bytes. Byte-stable: the credential part is the cached
/// encoding that was signed, never re-encoded.
pub fn serialize(envelope: &SignedTransactionEnvelope) -> Vec<u8> {
    let mut buf = WireBuffer::new();
    buf.put_u8(ENVELOPE_VERSION);
    buf.put_u8(CREDENTIAL_DEPLOYMENT_KIND);
    buf.put_u64(envelope.expiry);
    // Counts and lengths were bounds-checked at assembly.
    buf.put_u8(envelope.signatures.len() as u8);
    for (index, sig) in &envelope.signatures {
        buf.put_u8(*index);
        buf.put_u16(sig.len() as u16);
        buf.put_raw(sig.as_bytes());
    }
    buf.put_raw(&envelope.credential_bytes);
    buf.into_bytes()
}

fn signing_preimage(credential_bytes: &[u8], expiry: u64) -> Vec<u8> {
    let mut buf = WireBuffer::new();
    buf.put_raw(credential_bytes);
    buf.put_u64(expiry);
    buf.into_bytes()
}
