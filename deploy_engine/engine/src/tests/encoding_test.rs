use proptest::prelude::*;

use crate::encoding::{decode, encode};
use crate::error::ErrorKind;

#[test]
fn decodes_with_and_without_prefix() {
    assert_eq!(decode("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
    assert_eq!(decode("0x00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
    assert_eq!(decode("0X00FF10").unwrap(), vec![0x00, 0xff, 0x10]);
}

#[test]
fn empty_input_is_empty_bytes() {
    assert!(decode("").unwrap().is_empty());
    assert!(decode("0x").unwrap().is_empty());
}

#[test]
fn odd_length_is_malformed() {
    let err = decode("0xabc").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedHex);
    assert!(err.diagnostic().contains("odd length 3"));
}

#[test]
fn non_hex_digit_is_malformed() {
    assert_eq!(decode("zz").unwrap_err().kind(), ErrorKind::MalformedHex);
    assert_eq!(decode("0x12 4").unwrap_err().kind(), ErrorKind::MalformedHex);
}

#[test]
fn long_input_is_abbreviated_in_diagnostics() {
    let text = format!("{}z", "ab".repeat(100));
    let err = decode(&text).unwrap_err();
    assert!(err.diagnostic().len() < text.len());
}

#[test]
fn encodes_lower_case_unprefixed() {
    assert_eq!(encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    assert_eq!(encode(&[]), "");
}

proptest! {
    #[test]
    fn bytes_survive_encode_then_decode(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        prop_assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn any_valid_spelling_canonicalizes(
        bytes in proptest::collection::vec(any::<u8>(), 0..64),
        upper in any::<bool>(),
        prefixed in any::<bool>(),
    ) {
        let digits = if upper { hex::encode_upper(&bytes) } else { hex::encode(&bytes) };
        let text = if prefixed { format!("0x{digits}") } else { digits };
        prop_assert_eq!(encode(&decode(&text).unwrap()), hex::encode(&bytes));
    }

    #[test]
    fn odd_digit_count_always_fails(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let text = format!("{}a", hex::encode(&bytes));
        prop_assert_eq!(decode(&text).unwrap_err().kind(), ErrorKind::MalformedHex);
    }

    #[test]
    fn stray_character_always_fails(
        bytes in proptest::collection::vec(any::<u8>(), 1..64),
        at in any::<prop::sample::Index>(),
    ) {
        let mut chars: Vec<char> = hex::encode(&bytes).chars().collect();
        let i = at.index(chars.len());
        chars[i] = 'g';
        let text: String = chars.into_iter().collect();
        prop_assert_eq!(decode(&text).unwrap_err().kind(), ErrorKind::MalformedHex);
    }
}
