use crate::audit::{AuditEventType, AuditRecord, AuditTracker, now_rfc3339};

#[test]
fn test_audit_log_adds_and_retrieves() {
    let tracker = AuditTracker::new(10);

    tracker.log(AuditRecord {
        event_type: AuditEventType::Sign,
        tx_hash: Some("tx_1".into()),
        message: "Signed envelope".into(),
        timestamp: now_rfc3339(),
    });

    let recent = tracker.recent(1);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].tx_hash.as_deref(), Some("tx_1"));
    assert_eq!(recent[0].message, "Signed envelope");
    assert_eq!(recent[0].event_type_label(), "SIGN");
}

#[test]
fn test_audit_log_eviction() {
    let tracker = AuditTracker::new(3);

    for i in 0..5 {
        tracker.event(AuditEventType::Submit, Some(&format!("tx_{i}")), format!("Submitted #{i}"));
    }

    let recent = tracker.recent(5);
    assert_eq!(recent.len(), 3); // oldest two evicted
    assert_eq!(recent[0].tx_hash.as_deref(), Some("tx_4"));
    assert_eq!(recent[2].tx_hash.as_deref(), Some("tx_2"));

    let oldest_first = tracker.records();
    assert_eq!(oldest_first[0].tx_hash.as_deref(), Some("tx_2"));
}

#[test]
fn test_audit_log_zero_capacity_keeps_nothing() {
    let tracker = AuditTracker::new(0);
    tracker.event(AuditEventType::Error, None, "dropped");
    assert!(tracker.records().is_empty());
}

#[test]
fn test_audit_log_thread_safety() {
    use std::thread;

    let tracker = AuditTracker::new(100);

    thread::scope(|s| {
        for i in 0..10 {
            let tracker = &tracker;
            s.spawn(move || {
                tracker.event(AuditEventType::Derive, None, format!("Thread derive event {i}"));
            });
        }
    });

    let recent = tracker.recent(10);
    assert_eq!(recent.len(), 10);
}
