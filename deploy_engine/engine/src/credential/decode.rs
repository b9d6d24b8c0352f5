//! Wire-format decoder for issuer-supplied credential JSON.
//!
//! Cryptographic fields arrive as hex strings and authority maps are keyed by
//! decimal strings. Everything is decoded eagerly: the first bad field fails
//! the whole credential.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::credential::types::*;
use crate::encoding;
use crate::error::DeployError;

/// Decode a standalone `UnsignedCredential` JSON document.
pub fn decode_credential(json: &str) -> Result<UnsignedCredential, DeployError> {
    let value: Value = serde_json::from_str(json)?;
    decode_credential_value(&value)
}

/// Decode the full issuer payload: `{ expiry, unsignedCdi, randomness? }`.
/// `unsignedCdi` may be an object or a string holding the object.
pub fn decode_payload(json: &str) -> Result<DeploymentPayload, DeployError> {
    let value: Value = serde_json::from_str(json)?;
    let root = Fields::of(&value, "")?;

    let expiry = root.uint::<u64>("expiry")?;

    let cdi = root.require("unsignedCdi")?;
    let credential = match cdi {
        Value::String(inner) => {
            let nested: Value = serde_json::from_str(inner).map_err(|e| {
                DeployError::SchemaViolation(format!("unsignedCdi is not valid JSON: {e}"))
            })?;
            decode_value_at(&nested, "unsignedCdi")?
        }
        other => decode_value_at(other, "unsignedCdi")?,
    };

    Ok(DeploymentPayload {
        expiry,
        credential,
        randomness: root.optional("randomness").cloned(),
    })
}

/// Decode an already-parsed credential object.
pub fn decode_credential_value(value: &Value) -> Result<UnsignedCredential, DeployError> {
    decode_value_at(value, "")
}

fn decode_value_at(value: &Value, path: &str) -> Result<UnsignedCredential, DeployError> {
    let cdi = Fields::of(value, path)?;

    let ar_data = decode_ar_data(&cdi.object("arData")?)?;
    let cred_id = cdi.hex("credId")?;
    let public_keys = decode_public_keys(&cdi.object("credentialPublicKeys")?)?;
    let ip_identity = cdi.uint::<u32>("ipIdentity")?;
    let policy = decode_policy(&cdi.object("policy")?)?;
    let proofs = decode_proofs(&cdi.object("proofs")?)?;
    let revocation_threshold = cdi.uint::<u8>("revocationThreshold")?;

    if revocation_threshold == 0 || usize::from(revocation_threshold) > ar_data.len() {
        return Err(DeployError::SchemaViolation(format!(
            "revocationThreshold {} must be between 1 and the number of authority shares ({})",
            revocation_threshold,
            ar_data.len()
        )));
    }

    debug!(
        shares = ar_data.len(),
        proof_shares = proofs.proof_id_cred_pub.len(),
        keys = public_keys.keys.len(),
        "decoded unsigned credential"
    );

    Ok(UnsignedCredential::from_parts(
        ar_data,
        cred_id,
        public_keys,
        ip_identity,
        policy,
        proofs,
        revocation_threshold,
    ))
}

fn decode_ar_data(fields: &Fields<'_>) -> Result<AuthorityShareMap, DeployError> {
    let mut shares = AuthorityShareMap::new();
    for (key, value) in fields.entries() {
        let id = parse_authority_key(key, &fields.path)?;
        let share = Fields::of(value, &fields.child(key))?;
        let record = ArShare {
            enc_id_cred_pub_share: share.hex("encIdCredPubShare")?,
        };
        if shares.insert(id, record).is_some() {
            return Err(DeployError::InvalidAuthorityKey(format!(
                "{}: duplicate authority id {id}",
                fields.path
            )));
        }
    }
    Ok(shares)
}

fn decode_public_keys(fields: &Fields<'_>) -> Result<CredentialPublicKeys, DeployError> {
    let key_map = fields.object("keys")?;
    let mut keys = BTreeMap::new();
    for (raw_index, value) in key_map.entries() {
        let index = parse_decimal::<KeyIndex>(raw_index).ok_or_else(|| {
            DeployError::SchemaViolation(format!(
                "{}: key index {raw_index:?} is not a number in 0..=255",
                key_map.path
            ))
        })?;
        let entry = Fields::of(value, &key_map.child(raw_index))?;
        let scheme = match entry.string("schemeId")? {
            "Ed25519" => SchemeId::Ed25519,
            other => {
                return Err(DeployError::SchemaViolation(format!(
                    "{}: unsupported scheme {other:?}",
                    entry.child("schemeId")
                )));
            }
        };
        let key = entry.hex("verifyKey")?;
        if keys.insert(index, VerifyKey { scheme, key }).is_some() {
            return Err(DeployError::SchemaViolation(format!(
                "{}: duplicate key index {index}",
                key_map.path
            )));
        }
    }

    let threshold = fields.uint::<u8>("threshold")?;
    if threshold == 0 || usize::from(threshold) > keys.len() {
        return Err(DeployError::SchemaViolation(format!(
            "{}: threshold {} must be between 1 and the number of keys ({})",
            fields.path,
            threshold,
            keys.len()
        )));
    }

    Ok(CredentialPublicKeys { keys, threshold })
}

fn decode_policy(fields: &Fields<'_>) -> Result<Policy, DeployError> {
    let valid_to = parse_year_month(fields.string("validTo")?, &fields.child("validTo"))?;
    let created_at = parse_year_month(fields.string("createdAt")?, &fields.child("createdAt"))?;

    let mut revealed_attributes = BTreeMap::new();
    if let Some(value) = fields.optional("revealedAttributes") {
        let attrs = Fields::of(value, &fields.child("revealedAttributes"))?;
        for (name, value) in attrs.entries() {
            let text = value.as_str().ok_or_else(|| {
                DeployError::SchemaViolation(format!("{} must be a string", attrs.child(name)))
            })?;
            if name.len() > usize::from(u8::MAX) || text.len() > usize::from(u16::MAX) {
                return Err(DeployError::SchemaViolation(format!(
                    "{} is too long",
                    attrs.child(name)
                )));
            }
            revealed_attributes.insert(name.clone(), text.to_string());
        }
    }

    Ok(Policy {
        valid_to,
        created_at,
        revealed_attributes,
    })
}

fn decode_proofs(fields: &Fields<'_>) -> Result<ProofBundle, DeployError> {
    // Same key discipline as arData, decoded independently of it.
    let id_proofs = fields.object("proofIdCredPub")?;
    let mut proof_id_cred_pub = BTreeMap::new();
    for (key, value) in id_proofs.entries() {
        let id = parse_authority_key(key, &id_proofs.path)?;
        let text = value.as_str().ok_or_else(|| {
            DeployError::SchemaViolation(format!("{} must be a hex string", id_proofs.child(key)))
        })?;
        let bytes = decode_hex_at(text, &id_proofs.child(key))?;
        if proof_id_cred_pub.insert(id, bytes).is_some() {
            return Err(DeployError::InvalidAuthorityKey(format!(
                "{}: duplicate authority id {id}",
                id_proofs.path
            )));
        }
    }

    Ok(ProofBundle {
        challenge: fields.hex("challenge")?,
        commitments: fields.hex("commitments")?,
        cred_counter_less_than_max_accounts: fields.hex("credCounterLessThanMaxAccounts")?,
        proof_id_cred_pub,
        proof_ip_sig: fields.hex("proofIpSig")?,
        proof_reg_id: fields.hex("proofRegId")?,
        signature: fields.hex("signature")?,
    })
}

/// Authority ids must be plain base-10 digits. `"+1"` or `" 1"` are rejected
/// even though `str::parse` would accept some of them.
fn parse_authority_key(key: &str, path: &str) -> Result<ArIdentity, DeployError> {
    parse_decimal::<ArIdentity>(key).ok_or_else(|| {
        DeployError::InvalidAuthorityKey(format!(
            "{path}: {key:?} is not a non-negative base-10 integer"
        ))
    })
}

fn parse_decimal<T: std::str::FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_year_month(text: &str, path: &str) -> Result<YearMonth, DeployError> {
    let invalid = || DeployError::SchemaViolation(format!("{path}: {text:?} is not YYYYMM"));
    if text.len() != 6 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: u16 = text[..4].parse().map_err(|_| invalid())?;
    let month: u8 = text[4..].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok(YearMonth { year, month })
}

fn decode_hex_at(text: &str, path: &str) -> Result<ByteString, DeployError> {
    encoding::decode(text)
        .map(ByteString::new)
        .map_err(|e| match e {
            DeployError::MalformedHex(m) => DeployError::MalformedHex(format!("{path}: {m}")),
            other => other,
        })
}

/// Keyed view over one JSON object, tracking its path for diagnostics.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value, path: &str) -> Result<Self, DeployError> {
        let map = value.as_object().ok_or_else(|| {
            let shown = if path.is_empty() { "document" } else { path };
            DeployError::SchemaViolation(format!("{shown} must be a JSON object"))
        })?;
        Ok(Fields {
            map,
            path: path.to_string(),
        })
    }

    fn child(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        }
    }

    fn optional(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    fn require(&self, name: &str) -> Result<&'a Value, DeployError> {
        self.optional(name).ok_or_else(|| {
            DeployError::SchemaViolation(format!("missing field {}", self.child(name)))
        })
    }

    fn object(&self, name: &str) -> Result<Fields<'a>, DeployError> {
        Fields::of(self.require(name)?, &self.child(name))
    }

    fn string(&self, name: &str) -> Result<&'a str, DeployError> {
        self.require(name)?.as_str().ok_or_else(|| {
            DeployError::SchemaViolation(format!("{} must be a string", self.child(name)))
        })
    }

    fn hex(&self, name: &str) -> Result<ByteString, DeployError> {
        let text = self.require(name)?.as_str().ok_or_else(|| {
            DeployError::SchemaViolation(format!("{} must be a hex string", self.child(name)))
        })?;
        decode_hex_at(text, &self.child(name))
    }

    fn uint<T: TryFrom<u64>>(&self, name: &str) -> Result<T, DeployError> {
        let n = self.require(name)?.as_u64().ok_or_else(|| {
            DeployError::SchemaViolation(format!(
                "{} must be a non-negative integer",
                self.child(name)
            ))
        })?;
        T::try_from(n).map_err(|_| {
            DeployError::SchemaViolation(format!("{} value {n} is out of range", self.child(name)))
        })
    }

    fn entries(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.map.iter()
    }
}
