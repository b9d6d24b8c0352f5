//! Hex codec used by every decoding step.
//!
//! Accepts an optional `0x` prefix on input. Output is always lower-case and
//! unprefixed.

use crate::error::DeployError;

/// Decode hex text into raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, DeployError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    if digits.len() % 2 != 0 {
        return Err(DeployError::MalformedHex(format!(
            "odd length {} in {:?}",
            digits.len(),
            abbreviate(text)
        )));
    }

    hex::decode(digits)
        .map_err(|e| DeployError::MalformedHex(format!("{e} in {:?}", abbreviate(text))))
}

/// Encode bytes as lower-case hex without a prefix.
pub fn encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Keep error messages bounded when a proof field is kilobytes long.
fn abbreviate(text: &str) -> String {
    const MAX: usize = 32;
    if text.len() <= MAX {
        text.to_string()
    } else {
        let cut = (0..=MAX).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &text[..cut])
    }
}
