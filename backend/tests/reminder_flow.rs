//! Reminder delivery guarantees over the in-process store.
//!
//! Drives the real dispatcher, scheduler, and watchdog against a
//! [`MemoryStore`], a deterministic clock, and an instant sleeper, and
//! checks the guarantees the rest of the system leans on: at most one
//! delivery per slot, no message for a cancelled booking, suppression of
//! back-to-back dryer reminders, and sweep-based self-healing when no
//! timer survives.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rstest::{fixture, rstest};

use laundry_backend::domain::ports::{
    ApplianceRepository, BookingRepository, NotifyError, ReminderNotifier, UserRepository,
};
use laundry_backend::domain::ports::ReminderTimerStore;
use laundry_backend::domain::{
    ApplianceId, ApplianceKind, DispatchOutcome, DispatchReminder, DispatcherPorts, ExternalId,
    LaundryCalendar, OperatingHours, ReminderDispatcher, ReminderKey, ReminderScheduler,
    SchedulerConfig, SchedulerPorts, Sleeper, TimerKey, UserId, WatchdogSweep,
};
use laundry_backend::outbound::persistence::MemoryStore;
use laundry_backend::test_support::MutableClock;

const LEAD_MINUTES: u32 = 30;
const LATE_WINDOW: Duration = Duration::from_secs(300);

/// Sleeper double that parks the armed task forever, so a timer whose
/// fire instant has not been reached never dispatches during a test.
struct NeverSleeper;

#[async_trait]
impl Sleeper for NeverSleeper {
    async fn sleep(&self, _duration: Duration) {
        futures::future::pending::<()>().await;
    }
}

/// Notifier double that records deliveries and can be told to fail.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(ExternalId, String)>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<(ExternalId, String)> {
        self.sent.lock().expect("notifier mutex").clone()
    }

    fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("notifier mutex") = failing;
    }
}

#[async_trait]
impl ReminderNotifier for RecordingNotifier {
    async fn send(&self, recipient: ExternalId, text: &str) -> Result<(), NotifyError> {
        if *self.failing.lock().expect("notifier mutex") {
            return Err(NotifyError::transport("gateway offline"));
        }
        self.sent
            .lock()
            .expect("notifier mutex")
            .push((recipient, text.to_owned()));
        Ok(())
    }
}

struct World {
    store: Arc<MemoryStore>,
    clock: Arc<MutableClock>,
    notifier: Arc<RecordingNotifier>,
    dispatcher: Arc<ReminderDispatcher>,
    washer: ApplianceId,
    dryer: ApplianceId,
    resident: UserId,
    resident_chat: ExternalId,
}

fn calendar() -> LaundryCalendar {
    let hours = OperatingHours::new(9, 23).expect("window");
    LaundryCalendar::new(chrono_tz::Europe::Moscow, hours)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).expect("date")
}

/// The instant a reminder for today's 12:00 Moscow slot fires:
/// 11:30 local, which is 08:30 UTC.
fn noon_fire_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 8, 30, 0)
        .single()
        .expect("instant")
}

impl World {
    fn key(&self, appliance: ApplianceId, hour: u8) -> ReminderKey {
        ReminderKey {
            user: self.resident,
            appliance,
            date: today(),
            hour,
            lead_minutes: LEAD_MINUTES,
        }
    }

    async fn book(&self, appliance: ApplianceId, hour: u8) {
        self.store
            .create(self.resident, appliance, today(), hour)
            .await
            .expect("booking");
    }
}

#[fixture]
async fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(MutableClock::new(noon_fire_instant()));
    let notifier = Arc::new(RecordingNotifier::default());

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

    let resident_chat = ExternalId::new(1001);
    let resident = store
        .upsert(resident_chat, "Ivanov", "222", None)
        .await
        .expect("resident")
        .id;

    let dispatcher = Arc::new(ReminderDispatcher::new(
        DispatcherPorts {
            ledger: store.clone(),
            users: store.clone(),
            appliances: store.clone(),
            sent_log: store.clone(),
            notifier: notifier.clone(),
        },
        calendar(),
        clock.clone(),
        LATE_WINDOW,
    ));

    World {
        store,
        clock,
        notifier,
        dispatcher,
        washer,
        dryer,
        resident,
        resident_chat,
    }
}

#[rstest]
#[tokio::test]
async fn a_due_reminder_is_delivered_exactly_once(#[future] world: World) {
    let world = world.await;
    world.book(world.washer, 12).await;
    let key = world.key(world.washer, 12);

    let first = world.dispatcher.dispatch(&key).await.expect("dispatch");
    assert_eq!(first, DispatchOutcome::Sent);

    // A racing timer or sweep hitting the same key is a no-op.
    let second = world.dispatcher.dispatch(&key).await.expect("dispatch");
    assert_eq!(second, DispatchOutcome::AlreadySent);

    let sent = world.notifier.sent();
    assert_eq!(sent.len(), 1);
    let (recipient, text) = sent.first().expect("delivery");
    assert_eq!(*recipient, world.resident_chat);
    assert!(text.contains("Washer #3"));
    assert!(text.contains("30 min"));
}

#[rstest]
#[tokio::test]
async fn a_cancelled_booking_never_produces_a_message(#[future] world: World) {
    let world = world.await;
    world.book(world.washer, 12).await;
    let key = world.key(world.washer, 12);

    // Cancellation deletes the row and leaves the timer alone; the
    // dispatch that later fires must notice the row is gone.
    let rows = world.store.on_dates(&[today()]).await.expect("rows");
    let booking = rows.first().expect("booking").id;
    world.store.delete(booking).await.expect("delete");

    let outcome = world.dispatcher.dispatch(&key).await.expect("dispatch");
    assert_eq!(outcome, DispatchOutcome::BookingGone);
    assert!(world.notifier.sent().is_empty());
}

#[rstest]
#[tokio::test]
async fn a_reminder_past_the_late_window_is_dropped(#[future] world: World) {
    let world = world.await;
    world.book(world.washer, 12).await;
    let key = world.key(world.washer, 12);

    world.clock.advance(LATE_WINDOW + Duration::from_secs(1));
    let outcome = world.dispatcher.dispatch(&key).await.expect("dispatch");
    assert_eq!(outcome, DispatchOutcome::Stale);
    assert!(world.notifier.sent().is_empty());
}

#[rstest]
#[tokio::test]
async fn a_dryer_slot_after_the_own_wash_is_not_announced_twice(#[future] world: World) {
    let world = world.await;
    world.book(world.washer, 12).await;
    world.book(world.dryer, 13).await;

    let outcome = world
        .dispatcher
        .dispatch(&world.key(world.dryer, 13))
        .await
        .expect("dispatch");
    assert_eq!(outcome, DispatchOutcome::Suppressed);
    assert!(world.notifier.sent().is_empty());
}

#[rstest]
#[tokio::test]
async fn the_sweep_delivers_when_no_timer_survived(#[future] world: World) {
    let world = world.await;
    world.book(world.washer, 12).await;

    let watchdog = WatchdogSweep::new(
        world.store.clone(),
        world.dispatcher.clone(),
        calendar(),
        world.clock.clone(),
        LEAD_MINUTES,
        LATE_WINDOW,
    );

    let stats = watchdog.sweep_once().await.expect("sweep");
    assert_eq!(stats.due, 1);
    assert_eq!(stats.sent, 1);
    assert_eq!(world.notifier.sent().len(), 1);

    // The next pass finds the sent-log entry and stays silent.
    let stats = watchdog.sweep_once().await.expect("sweep");
    assert_eq!(stats.due, 1);
    assert_eq!(stats.sent, 0);
    assert_eq!(world.notifier.sent().len(), 1);
}

#[rstest]
#[tokio::test]
async fn a_failed_send_is_retried_by_the_next_sweep(#[future] world: World) {
    let world = world.await;
    world.book(world.washer, 12).await;

    let watchdog = WatchdogSweep::new(
        world.store.clone(),
        world.dispatcher.clone(),
        calendar(),
        world.clock.clone(),
        LEAD_MINUTES,
        LATE_WINDOW,
    );

    world.notifier.set_failing(true);
    let stats = watchdog.sweep_once().await.expect("sweep");
    assert_eq!(stats.send_failures, 1);
    assert!(world.notifier.sent().is_empty());

    // The failure was not recorded as sent, so the next sweep delivers.
    world.notifier.set_failing(false);
    let stats = watchdog.sweep_once().await.expect("sweep");
    assert_eq!(stats.sent, 1);
    assert_eq!(world.notifier.sent().len(), 1);
}

#[rstest]
#[tokio::test]
async fn enqueueing_inside_the_lead_window_dispatches_immediately(#[future] world: World) {
    let world = world.await;
    world.book(world.washer, 12).await;

    let scheduler = ReminderScheduler::new(
        SchedulerPorts {
            ledger: world.store.clone(),
            timers: world.store.clone(),
            dispatcher: world.dispatcher.clone(),
            sleeper: Arc::new(NeverSleeper),
        },
        calendar(),
        world.clock.clone(),
        SchedulerConfig {
            lead_minutes: LEAD_MINUTES,
            late_window: LATE_WINDOW,
        },
    );

    // The clock already sits on the fire instant plus a second, inside
    // the late window, so the enqueue path sends without arming a task.
    world.clock.advance_seconds(1);
    scheduler
        .enqueue(TimerKey {
            user: world.resident,
            appliance: world.washer,
            date: today(),
            hour: 12,
        })
        .await
        .expect("enqueue");

    assert_eq!(scheduler.armed_count(), 0);
    assert_eq!(world.notifier.sent().len(), 1);
}

#[rstest]
#[tokio::test]
async fn restore_rearms_durable_timers_and_drops_expired_ones(#[future] world: World) {
    let world = world.await;
    world.book(world.washer, 12).await;
    world.book(world.dryer, 20).await;

    // Rows as a previous process would have left them: one long expired,
    // one still in the future.
    let expired = TimerKey {
        user: world.resident,
        appliance: world.washer,
        date: today(),
        hour: 12,
    };
    let future = TimerKey {
        user: world.resident,
        appliance: world.dryer,
        date: today(),
        hour: 20,
    };
    world
        .store
        .arm(&expired, LEAD_MINUTES, noon_fire_instant())
        .await
        .expect("arm");
    world
        .store
        .arm(
            &future,
            LEAD_MINUTES,
            noon_fire_instant() + chrono::TimeDelta::hours(8),
        )
        .await
        .expect("arm");

    // An hour past the washer's fire instant: outside the late window.
    world.clock.advance_seconds(3600);

    let scheduler = ReminderScheduler::new(
        SchedulerPorts {
            ledger: world.store.clone(),
            timers: world.store.clone(),
            dispatcher: world.dispatcher.clone(),
            sleeper: Arc::new(NeverSleeper),
        },
        calendar(),
        world.clock.clone(),
        SchedulerConfig {
            lead_minutes: LEAD_MINUTES,
            late_window: LATE_WINDOW,
        },
    );

    let restored = scheduler.restore().await.expect("restore");
    assert_eq!(restored, 1);
    assert_eq!(scheduler.armed_count(), 1);
    assert!(world.notifier.sent().is_empty());

    // The expired row was disarmed, not left to fire again next restart.
    let pending = world.store.pending().await.expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending.first().expect("timer").key, future);
}
