use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::packages::domain::PackageId;
use crate::packages::notifications::{NotificationEngine, NotificationError, ReminderPolicy};

fn policy() -> ReminderPolicy {
    ReminderPolicy {
        age_threshold: Duration::hours(12),
        cooldown: Duration::hours(12),
    }
}

#[test]
fn unnotified_is_stable_until_acknowledged() {
    let (repository, _, service) = build_service();
    let engine = NotificationEngine::new(repository);

    let record = service
        .register(intake("101", "food"), noon())
        .expect("intake succeeds");

    let first = engine.unnotified("101").expect("query succeeds");
    let second = engine.unnotified("101").expect("query succeeds");
    assert_eq!(first.len(), 1);
    assert_eq!(first, second, "reads must not have side effects");
    assert_eq!(first[0].id, record.id);

    engine.acknowledge(&[record.id.clone()]).expect("ack succeeds");

    let after = engine.unnotified("101").expect("query succeeds");
    assert!(after.is_empty(), "acknowledged packages never reappear");
}

#[test]
fn unnotified_is_scoped_to_the_department() {
    let (repository, _, service) = build_service();
    let engine = NotificationEngine::new(repository);

    service
        .register(intake("101", "food"), noon())
        .expect("intake succeeds");
    service
        .register(intake("102", "food"), noon())
        .expect("intake succeeds");

    let unit_101 = engine.unnotified("101").expect("query succeeds");
    assert_eq!(unit_101.len(), 1);
    assert_eq!(unit_101[0].department, "101");
}

#[test]
fn acknowledgment_is_idempotent_under_duplicates() {
    let (repository, _, service) = build_service();
    let engine = NotificationEngine::new(repository.clone());

    let record = service
        .register(intake("101", "food"), noon())
        .expect("intake succeeds");

    // Duplicate ids in one call, then the whole call again: same end state.
    let ids = vec![record.id.clone(), record.id.clone()];
    engine.acknowledge(&ids).expect("ack succeeds");
    engine.acknowledge(&ids).expect("ack succeeds");

    assert!(engine.unnotified("101").expect("query succeeds").is_empty());
}

#[test]
fn acknowledgment_ignores_unknown_ids() {
    let (repository, _, _) = build_service();
    let engine = NotificationEngine::new(repository);

    engine
        .acknowledge(&[PackageId("pkg-999999".to_string())])
        .expect("unknown ids are a no-op");
}

#[test]
fn urgent_due_requires_the_age_threshold() {
    let (repository, _, service) = build_service();
    let engine = NotificationEngine::new(repository);

    // 13h old: due. 3h old: too fresh.
    service
        .register(urgent_intake("101"), noon() - Duration::hours(13))
        .expect("intake succeeds");
    service
        .register(urgent_intake("101"), noon() - Duration::hours(3))
        .expect("intake succeeds");

    let due = engine
        .urgent_due("101", policy(), noon())
        .expect("query succeeds");
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].ingested_at, noon() - Duration::hours(13));
}

#[test]
fn urgent_due_skips_non_urgent_and_terminal_packages() {
    let (repository, _, service) = build_service();
    let engine = NotificationEngine::new(repository.clone());

    // Non-urgent, even if old.
    let plain = service
        .register(intake("101", "food"), noon() - Duration::hours(20))
        .expect("intake succeeds");
    assert!(!plain.urgent);

    // Urgent but withdrawn before the query.
    let withdrawn = seed_urgent(&repository, "101", noon() - Duration::hours(20));
    service
        .withdraw(&withdrawn.id, &concierge(), noon())
        .expect("withdrawal succeeds");

    let due = engine
        .urgent_due("101", policy(), noon())
        .expect("query succeeds");
    assert!(due.is_empty());
}

#[test]
fn reminder_cooldown_excludes_until_elapsed() {
    let (repository, _, _) = build_service();
    let engine = NotificationEngine::new(repository.clone());

    let record = seed_urgent(&repository, "101", noon() - Duration::hours(13));

    let before_stamp = engine
        .urgent_due("101", policy(), noon())
        .expect("query succeeds");
    assert_eq!(before_stamp.len(), 1);

    engine
        .stamp_reminder(&record.id, noon())
        .expect("stamp succeeds");

    // Inside the cooldown window: excluded.
    let within = engine
        .urgent_due("101", policy(), noon() + Duration::hours(11))
        .expect("query succeeds");
    assert!(within.is_empty());

    // Exactly at the boundary: included again.
    let at_boundary = engine
        .urgent_due("101", policy(), noon() + Duration::hours(12))
        .expect("query succeeds");
    assert_eq!(at_boundary.len(), 1);
}

#[test]
fn stamp_reminder_is_repeatable() {
    let (repository, _, _) = build_service();
    let engine = NotificationEngine::new(repository.clone());

    let record = seed_urgent(&repository, "101", noon() - Duration::hours(13));

    engine
        .stamp_reminder(&record.id, noon())
        .expect("first stamp succeeds");
    let stamped = engine
        .stamp_reminder(&record.id, noon() + Duration::hours(13))
        .expect("second stamp succeeds");

    assert_eq!(stamped.last_notified_at, Some(noon() + Duration::hours(13)));
}

#[test]
fn stamp_reminder_on_missing_package_is_not_found() {
    let (repository, _, _) = build_service();
    let engine = NotificationEngine::new(repository);

    let result = engine.stamp_reminder(&PackageId("pkg-999999".to_string()), noon());
    assert!(matches!(result, Err(NotificationError::NotFound)));
}

#[test]
fn notified_flag_never_resets() {
    let (repository, _, service) = build_service();
    let engine = NotificationEngine::new(repository.clone());

    let record = service
        .register(intake("101", "food"), noon())
        .expect("intake succeeds");
    engine.acknowledge(&[record.id.clone()]).expect("ack succeeds");

    // A reminder stamp later must not resurrect the one-shot flag.
    let _ = engine.stamp_reminder(&record.id, noon() + Duration::hours(1));
    assert!(engine.unnotified("101").expect("query succeeds").is_empty());
}

#[test]
fn engine_is_usable_from_shared_arcs() {
    // Two polling sessions over the same engine state.
    let (repository, _, service) = build_service();
    let engine = Arc::new(NotificationEngine::new(repository));

    let record = service
        .register(intake("101", "food"), noon())
        .expect("intake succeeds");

    let a = engine.clone();
    let b = engine.clone();
    a.acknowledge(&[record.id.clone()]).expect("ack succeeds");
    b.acknowledge(&[record.id.clone()]).expect("concurrent ack is safe");

    assert!(engine.unnotified("101").expect("query succeeds").is_empty());
}
