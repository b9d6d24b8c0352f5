//! Default derivation collaborator: BIP-39 seed + SLIP-0010 Ed25519 keys.
//!
//! Path: `m/44'/coin'/provider'/identity'/2'/credential'`, all hardened.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::derivation::{CredentialPath, KeyPair, Network, SeedDeriver, SeedMaterial};
use crate::error::DeployError;

type HmacSha512 = Hmac<Sha512>;

const CURVE_KEY: &[u8] = b"ed25519 seed";
const HARDENED: u32 = 0x8000_0000;
const PURPOSE: u32 = 44;
const ACCOUNT_SIGNING_KEY: u32 = 2;

#[derive(Debug, Default, Clone, Copy)]
pub struct Slip10Deriver;

impl Slip10Deriver {
    pub fn new() -> Self {
        Slip10Deriver
    }
}

impl SeedDeriver for Slip10Deriver {
    fn seed_from_phrase(&self, phrase: &str) -> Result<SeedMaterial, DeployError> {
        // Word list lookup is case-sensitive; issuers and users are not.
        let normalized = Zeroizing::new(
            phrase
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" "),
        );

        let mnemonic =
            bip39::Mnemonic::parse_in_normalized(bip39::Language::English, &normalized)
                .map_err(|e| DeployError::InvalidMnemonic(e.to_string()))?;

        let seed = Zeroizing::new(mnemonic.to_seed_normalized(""));
        Ok(SeedMaterial::new(seed.to_vec()))
    }

    fn signing_key(
        &self,
        seed: &SeedMaterial,
        network: Network,
        path: &CredentialPath,
    ) -> Result<KeyPair, DeployError> {
        let segments = [
            PURPOSE,
            network.coin_type(),
            path.provider,
            path.identity_index,
            ACCOUNT_SIGNING_KEY,
            path.credential_counter,
        ];

        let (mut key, mut chain) = master_key(seed.as_bytes())?;
        for index in segments {
            if index >= HARDENED {
                return Err(DeployError::SchemaViolation(format!(
                    "derivation index {index} must be below 2^31"
                )));
            }
            (key, chain) = hardened_child(&key, &chain, index | HARDENED)?;
        }

        Ok(KeyPair::from_secret(&key))
    }
}

type Node = (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>);

fn master_key(seed: &[u8]) -> Result<Node, DeployError> {
    Ok(split(hmac_sha512(CURVE_KEY, &[seed])?))
}

fn hardened_child(key: &[u8; 32], chain: &[u8; 32], index: u32) -> Result<Node, DeployError> {
    let index_bytes = index.to_be_bytes();
    let parts: [&[u8]; 3] = [&[0u8], key.as_slice(), &index_bytes];
    Ok(split(hmac_sha512(chain, &parts)?))
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>, DeployError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| DeployError::UnexpectedFault(format!("HMAC init failed: {e}")))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn split(digest: Zeroizing<[u8; 64]>) -> Node {
    let mut key = Zeroizing::new([0u8; 32]);
    let mut chain = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&digest[..32]);
    chain.copy_from_slice(&digest[32..]);
    (key, chain)
}
