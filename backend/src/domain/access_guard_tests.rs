//! Tests for the access guard.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::MockModerationRepository;
use crate::test_support::MutableClock;

fn clock() -> Arc<MutableClock> {
    Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0)
            .single()
            .expect("instant"),
    ))
}

fn guard(moderation: MockModerationRepository, clock: Arc<MutableClock>) -> AccessGuard {
    AccessGuard::new(Arc::new(moderation), clock)
}

fn ban_until(seconds_from_now: i64, now: chrono::DateTime<Utc>) -> BanRecord {
    BanRecord {
        external_id: ExternalId::new(42),
        reason: "spam".to_owned(),
        banned_until: Some(now + TimeDelta::seconds(seconds_from_now)),
        banned_at: now,
    }
}

#[tokio::test]
async fn an_unbanned_identity_passes() {
    let mut moderation = MockModerationRepository::new();
    moderation.expect_find_ban().return_once(|_| Ok(None));

    guard(moderation, clock())
        .ensure_not_banned(ExternalId::new(42))
        .await
        .expect("passes");
}

#[tokio::test]
async fn an_active_ban_is_forbidden() {
    let clock = clock();
    let now = clock.utc();
    let mut moderation = MockModerationRepository::new();
    moderation
        .expect_find_ban()
        .return_once(move |_| Ok(Some(ban_until(3600, now))));

    let error = guard(moderation, clock)
        .ensure_not_banned(ExternalId::new(42))
        .await
        .expect_err("banned");

    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn an_expired_ban_passes() {
    let clock = clock();
    let now = clock.utc();
    let mut moderation = MockModerationRepository::new();
    moderation
        .expect_find_ban()
        .return_once(move |_| Ok(Some(ban_until(10, now))));

    let guard = guard(moderation, Arc::clone(&clock));
    clock.advance(Duration::from_secs(11));

    guard
        .ensure_not_banned(ExternalId::new(42))
        .await
        .expect("expired ban passes");
}

#[tokio::test]
async fn the_third_failed_attempt_triggers_an_automatic_ban() {
    let clock = clock();
    let now = clock.utc();
    let mut moderation = MockModerationRepository::new();
    moderation
        .expect_bump_failed_attempts()
        .times(1)
        .return_once(|_, _| Ok(3));
    moderation
        .expect_upsert_ban()
        .times(1)
        .withf(move |record| {
            record.banned_until == Some(now + TimeDelta::days(AUTO_BAN_DAYS))
        })
        .return_once(|_| Ok(()));
    moderation
        .expect_reset_failed_attempts()
        .times(1)
        .return_once(|_| Ok(()));

    let banned = guard(moderation, clock)
        .register_failed_attempt(ExternalId::new(42))
        .await
        .expect("attempt recorded");

    assert!(banned);
}

#[tokio::test]
async fn early_failed_attempts_only_count() {
    let mut moderation = MockModerationRepository::new();
    moderation
        .expect_bump_failed_attempts()
        .return_once(|_, _| Ok(2));
    moderation.expect_upsert_ban().times(0);

    let banned = guard(moderation, clock())
        .register_failed_attempt(ExternalId::new(42))
        .await
        .expect("attempt recorded");

    assert!(!banned);
}

#[tokio::test]
async fn unban_of_an_unknown_identity_is_not_found() {
    let mut moderation = MockModerationRepository::new();
    moderation.expect_delete_ban().return_once(|_| Ok(false));

    let error = guard(moderation, clock())
        .unban(ExternalId::new(42))
        .await
        .expect_err("nothing to lift");

    assert_eq!(error.code(), ErrorCode::NotFound);
}
