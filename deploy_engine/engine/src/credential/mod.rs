//! Unsigned credential model, JSON decoder and binary encoding.

pub mod decode;
pub mod types;
pub mod wire;

pub use decode::{decode_credential, decode_credential_value, decode_payload};
pub use types::*;
pub use wire::encode_credential;
