use crate::error::{DeployError, ErrorKind};

#[test]
fn every_variant_maps_to_its_kind() {
    let cases = [
        (DeployError::MalformedHex("x".into()), ErrorKind::MalformedHex),
        (DeployError::SchemaViolation("x".into()), ErrorKind::SchemaViolation),
        (DeployError::InvalidAuthorityKey("x".into()), ErrorKind::InvalidAuthorityKey),
        (DeployError::InvalidMnemonic("x".into()), ErrorKind::InvalidMnemonic),
        (DeployError::SigningFailure("x".into()), ErrorKind::SigningFailure),
        (DeployError::ExpiredTransaction("x".into()), ErrorKind::ExpiredTransaction),
        (DeployError::ConnectionFailure("x".into()), ErrorKind::ConnectionFailure),
        (DeployError::RejectedByNode("x".into()), ErrorKind::RejectedByNode),
        (DeployError::TimedOut("x".into()), ErrorKind::TimedOut),
        (DeployError::UnexpectedFault("x".into()), ErrorKind::UnexpectedFault),
    ];
    for (error, kind) in cases {
        assert_eq!(error.kind(), kind);
        assert_eq!(error.diagnostic(), "x");
        assert_eq!(error.is_inconclusive(), kind == ErrorKind::TimedOut);
    }
}

#[test]
fn display_keeps_the_diagnostic() {
    let err = DeployError::RejectedByNode("duplicate credential id".into());
    assert_eq!(err.to_string(), "Rejected by node: duplicate credential id");
}

#[test]
fn node_status_is_a_rejection() {
    let err: DeployError = tonic::Status::invalid_argument("bad signature").into();
    assert_eq!(err.kind(), ErrorKind::RejectedByNode);
    assert!(err.diagnostic().contains("bad signature"));
}

#[test]
fn json_errors_are_schema_violations() {
    let err: DeployError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
}

#[test]
fn unavailable_status_is_a_connection_failure() {
    let err: DeployError = tonic::Status::unavailable("connection reset").into();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
}

#[test]
fn cut_off_call_is_inconclusive() {
    for status in [
        tonic::Status::deadline_exceeded("deadline"),
        tonic::Status::cancelled("Timeout expired"),
    ] {
        let err: DeployError = status.into();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
        assert!(err.is_inconclusive());
    }
}

#[test]
fn channel_not_ready_is_a_connection_failure() {
    let err: DeployError = crate::node::grpc::not_ready("connection refused").into();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
    assert!(err.diagnostic().contains("connection refused"));
}
