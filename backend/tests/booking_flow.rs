//! End-to-end booking behaviour over the in-process store.
//!
//! These tests exercise the real [`BookingService`] against a
//! [`MemoryStore`] with a deterministic clock, so every rule that spans
//! the service and the ledger (slot exclusivity, idempotent
//! resubmission, quotas, freshness, stub merging, retention) is checked
//! without a database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rstest::{fixture, rstest};

use laundry_backend::domain::ports::{ApplianceRepository, BookingRepository, UserRepository};
use laundry_backend::domain::{
    ApplianceId, ApplianceKind, BookingService, BookingServicePorts, DailyPurge, Error, ErrorCode,
    ExternalId, LaundryCalendar, OperatingHours, ScheduleReminder, TimerKey, UserId,
};
use laundry_backend::outbound::persistence::MemoryStore;
use laundry_backend::test_support::MutableClock;

struct NoopScheduler;

#[async_trait]
impl ScheduleReminder for NoopScheduler {
    async fn enqueue(&self, _key: TimerKey) -> Result<(), Error> {
        Ok(())
    }
}

struct World {
    store: Arc<MemoryStore>,
    clock: Arc<MutableClock>,
    service: BookingService,
    washer: ApplianceId,
    dryer: ApplianceId,
    resident: UserId,
    neighbour: UserId,
}

impl World {
    fn calendar() -> LaundryCalendar {
        let hours = OperatingHours::new(9, 23).expect("window");
        LaundryCalendar::new(chrono_tz::Europe::Moscow, hours)
    }

    /// 07:00 UTC is 10:00 in Moscow.
    fn start_instant() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 7, 0, 0)
            .single()
            .expect("instant")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).expect("date")
    }

    fn tomorrow() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 11).expect("date")
    }
}

#[fixture]
async fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(MutableClock::new(World::start_instant()));

    store
        .seed_if_empty(&[
            (ApplianceKind::Wash, "Washer #3".to_owned()),
            (ApplianceKind::Dry, "Dryer #2".to_owned()),
        ])
        .await
        .expect("seed");
    let catalog = store.list().await.expect("catalog");
    let washer = catalog
        .iter()
        .find(|a| a.kind == ApplianceKind::Wash)
        .expect("washer")
        .id;
    let dryer = catalog
        .iter()
        .find(|a| a.kind == ApplianceKind::Dry)
        .expect("dryer")
        .id;

    let resident = store
        .upsert(ExternalId::new(1001), "Ivanov", "222", None)
        .await
        .expect("resident")
        .id;
    let neighbour = store
        .upsert(ExternalId::new(1002), "Sidorov", "223", None)
        .await
        .expect("neighbour")
        .id;

    let service = BookingService::new(
        BookingServicePorts {
            ledger: store.clone(),
            appliances: store.clone(),
            users: store.clone(),
            scheduler: Arc::new(NoopScheduler),
        },
        World::calendar(),
        clock.clone(),
        3,
    );

    World {
        store,
        clock,
        service,
        washer,
        dryer,
        resident,
        neighbour,
    }
}

#[rstest]
#[tokio::test]
async fn resubmitting_an_owned_slot_returns_the_same_booking(#[future] world: World) {
    let world = world.await;
    let first = world
        .service
        .reserve(world.resident, world.washer, World::today(), 12)
        .await
        .expect("first reservation");
    let second = world
        .service
        .reserve(world.resident, world.washer, World::today(), 12)
        .await
        .expect("resubmission");
    assert_eq!(first, second);
}

#[rstest]
#[tokio::test]
async fn a_competitor_loses_the_slot_race(#[future] world: World) {
    let world = world.await;
    world
        .service
        .reserve(world.resident, world.washer, World::today(), 12)
        .await
        .expect("reservation");
    let error = world
        .service
        .reserve(world.neighbour, world.washer, World::today(), 12)
        .await
        .expect_err("taken slot");
    assert_eq!(error.code(), ErrorCode::SlotTaken);
}

#[rstest]
#[tokio::test]
async fn free_hours_exclude_booked_and_elapsed_slots(#[future] world: World) {
    let world = world.await;
    world
        .service
        .reserve(world.resident, world.washer, World::today(), 12)
        .await
        .expect("reservation");

    // Local time is 10:00; hour 10 has started, hour 11 has not.
    let free = world
        .service
        .free_hours(world.washer, World::today())
        .await
        .expect("free hours");
    assert!(!free.contains(&9));
    assert!(!free.contains(&10));
    assert!(free.contains(&11));
    assert!(!free.contains(&12));
    assert!(free.contains(&23));
}

#[rstest]
#[tokio::test]
async fn one_slot_per_appliance_kind_per_day(#[future] world: World) {
    let world = world.await;
    world
        .service
        .reserve(world.resident, world.washer, World::today(), 12)
        .await
        .expect("wash reservation");

    let error = world
        .service
        .reserve(world.resident, world.washer, World::today(), 15)
        .await
        .expect_err("second wash on the same day");
    assert_eq!(error.code(), ErrorCode::QuotaExceeded);

    // A different kind is a separate quota.
    world
        .service
        .reserve(world.resident, world.dryer, World::today(), 15)
        .await
        .expect("drying reservation");
}

#[rstest]
#[tokio::test]
async fn elapsed_slots_cannot_be_reserved(#[future] world: World) {
    let world = world.await;
    let error = world
        .service
        .reserve(world.resident, world.washer, World::today(), 9)
        .await
        .expect_err("slot in the past");
    assert_eq!(error.code(), ErrorCode::PastSlot);
}

#[rstest]
#[tokio::test]
async fn only_the_next_three_days_are_open_for_booking(#[future] world: World) {
    let world = world.await;
    let last_open = NaiveDate::from_ymd_opt(2026, 3, 12).expect("date");
    world
        .service
        .reserve(world.resident, world.washer, last_open, 12)
        .await
        .expect("day after tomorrow is still open");

    let too_far = NaiveDate::from_ymd_opt(2026, 3, 13).expect("date");
    let error = world
        .service
        .reserve(world.resident, world.washer, too_far, 12)
        .await
        .expect_err("beyond the window");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn cancellation_requires_ownership(#[future] world: World) {
    let world = world.await;
    let booking = world
        .service
        .reserve(world.resident, world.washer, World::today(), 12)
        .await
        .expect("reservation");

    let error = world
        .service
        .cancel(world.neighbour, booking)
        .await
        .expect_err("foreign cancellation");
    assert_eq!(error.code(), ErrorCode::Forbidden);

    world
        .service
        .cancel(world.resident, booking)
        .await
        .expect("own cancellation");
    let free = world
        .service
        .free_hours(world.washer, World::today())
        .await
        .expect("free hours");
    assert!(free.contains(&12));
}

#[rstest]
#[tokio::test]
async fn force_booked_stub_is_merged_into_the_real_identity(#[future] world: World) {
    let world = world.await;
    let (stub, booking) = world
        .service
        .force_book("Petrov", "310", world.washer, World::tomorrow(), 12)
        .await
        .expect("force booking");
    assert!(stub.is_stub());

    // The resident registers with their real chat identity later.
    let merged = world
        .store
        .merge_stub_into(ExternalId::new(777), "Petrov", "310")
        .await
        .expect("merge");
    assert!(!merged.is_stub());

    let upcoming = world
        .service
        .list_upcoming(merged.id)
        .await
        .expect("upcoming");
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming.first().expect("booking").booking.id, booking);
}

#[rstest]
#[tokio::test]
async fn upcoming_bookings_are_soonest_first_and_exclude_started_slots(#[future] world: World) {
    let world = world.await;
    world
        .service
        .reserve(world.resident, world.dryer, World::today(), 14)
        .await
        .expect("drying");
    world
        .service
        .reserve(world.resident, world.washer, World::today(), 12)
        .await
        .expect("wash");

    let hours: Vec<u8> = world
        .service
        .list_upcoming(world.resident)
        .await
        .expect("upcoming")
        .iter()
        .map(|details| details.booking.hour)
        .collect();
    assert_eq!(hours, vec![12, 14]);

    // Move local time past the wash slot's start; only the dryer remains.
    world.clock.advance_seconds(3 * 3600);
    let hours: Vec<u8> = world
        .service
        .list_upcoming(world.resident)
        .await
        .expect("upcoming")
        .iter()
        .map(|details| details.booking.hour)
        .collect();
    assert_eq!(hours, vec![14]);
}

#[rstest]
#[tokio::test]
async fn purge_keeps_yesterday_and_drops_older_days(#[future] world: World) {
    let world = world.await;
    let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).expect("date");
    let older = NaiveDate::from_ymd_opt(2026, 3, 8).expect("date");
    world
        .store
        .create(world.resident, world.washer, yesterday, 12)
        .await
        .expect("yesterday row");
    world
        .store
        .create(world.resident, world.washer, older, 12)
        .await
        .expect("older row");

    let purge = DailyPurge::new(world.store.clone(), World::calendar(), world.clock.clone());
    let deleted = purge.run_once().await.expect("purge");
    assert_eq!(deleted, 1);

    let remaining = world
        .store
        .on_dates(&[older, yesterday])
        .await
        .expect("rows");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining.first().expect("row").date, yesterday);
}
