//! Binary encoding of an unsigned credential.
//!
//! Big-endian integers, `u32`-length-prefixed byte strings, maps written in
//! ascending key order behind an entry count. The output is a pure function
//! of the credential, so encoding twice yields identical bytes.

use crate::credential::types::{ByteString, UnsignedCredential};
use crate::error::DeployError;

/// Append-only big-endian buffer.
#[derive(Debug, Default)]
pub(crate) struct WireBuffer {
    bytes: Vec<u8>,
}

impl WireBuffer {
    pub(crate) fn new() -> Self {
        WireBuffer { bytes: Vec::new() }
    }

    pub(crate) fn put_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub(crate) fn put_u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_u64(&mut self, v: u64) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }

    pub(crate) fn put_raw(&mut self, raw: &[u8]) {
        self.bytes.extend_from_slice(raw);
    }

    /// `u32` length followed by the bytes.
    pub(crate) fn put_bytes(&mut self, field: &str, bytes: &ByteString) -> Result<(), DeployError> {
        self.put_u32(checked_len(field, bytes.len())?);
        self.put_raw(bytes.as_bytes());
        Ok(())
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn checked_len<T: TryFrom<usize>>(field: &str, len: usize) -> Result<T, DeployError> {
    T::try_from(len)
        .map_err(|_| DeployError::SigningFailure(format!("{field}: length {len} cannot be encoded")))
}

/// Encode the credential into the bytes covered by the account signature.
pub fn encode_credential(cred: &UnsignedCredential) -> Result<Vec<u8>, DeployError> {
    let mut buf = WireBuffer::new();

    buf.put_u16(checked_len("arData", cred.ar_data().len())?);
    for (ar_id, share) in cred.ar_data() {
        buf.put_u32(*ar_id);
        buf.put_bytes("arData.encIdCredPubShare", &share.enc_id_cred_pub_share)?;
    }

    buf.put_bytes("credId", cred.cred_id())?;

    let keys = cred.public_keys();
    buf.put_u8(checked_len("credentialPublicKeys.keys", keys.keys.len())?);
    for (index, key) in &keys.keys {
        buf.put_u8(*index);
        buf.put_u8(key.scheme.tag());
        buf.put_bytes("credentialPublicKeys.verifyKey", &key.key)?;
    }
    buf.put_u8(keys.threshold);

    buf.put_u32(cred.ip_identity());

    let policy = cred.policy();
    buf.put_u16(policy.valid_to.year);
    buf.put_u8(policy.valid_to.month);
    buf.put_u16(policy.created_at.year);
    buf.put_u8(policy.created_at.month);
    buf.put_u16(checked_len("policy.revealedAttributes", policy.revealed_attributes.len())?);
    for (name, value) in &policy.revealed_attributes {
        buf.put_u8(checked_len("policy.revealedAttributes.name", name.len())?);
        buf.put_raw(name.as_bytes());
        buf.put_u16(checked_len("policy.revealedAttributes.value", value.len())?);
        buf.put_raw(value.as_bytes());
    }

    let proofs = cred.proofs();
    buf.put_bytes("proofs.challenge", &proofs.challenge)?;
    buf.put_bytes("proofs.commitments", &proofs.commitments)?;
    buf.put_bytes(
        "proofs.credCounterLessThanMaxAccounts",
        &proofs.cred_counter_less_than_max_accounts,
    )?;
    buf.put_u16(checked_len("proofs.proofIdCredPub", proofs.proof_id_cred_pub.len())?);
    for (ar_id, proof) in &proofs.proof_id_cred_pub {
        buf.put_u32(*ar_id);
        buf.put_bytes("proofs.proofIdCredPub", proof)?;
    }
    buf.put_bytes("proofs.proofIpSig", &proofs.proof_ip_sig)?;
    buf.put_bytes("proofs.proofRegId", &proofs.proof_reg_id)?;
    buf.put_bytes("proofs.signature", &proofs.signature)?;

    buf.put_u8(cred.revocation_threshold());

    Ok(buf.into_bytes())
}
