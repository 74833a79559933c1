//! Builders assembling the domain services over one storage backend.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::info;

use crate::config::AppSettings;
use crate::domain::ports::{
    ApplianceRepository, BookingRepository, ModerationRepository, ReminderLog, ReminderNotifier,
    ReminderTimerStore, UserRepository,
};
use crate::domain::{
    AccessGuard, BookingService, BookingServicePorts, DailyPurge, DispatcherPorts,
    LaundryCalendar, ReminderDispatcher, ReminderScheduler, SchedulerConfig, SchedulerPorts,
    TokioSleeper, WatchdogSweep,
};
use crate::inbound::http::state::HttpState;
use crate::outbound::notify::{HttpChatNotifier, LogNotifier, RetryingNotifier};
use crate::outbound::persistence::{
    DbPool, DieselApplianceRepository, DieselBookingRepository, DieselModerationRepository,
    DieselReminderLog, DieselTimerStore, DieselUserRepository, MemoryStore, PoolConfig,
    run_pending_migrations,
};

/// One handle per driven storage port.
pub struct StoragePorts {
    /// Slot ledger.
    pub ledger: Arc<dyn BookingRepository>,
    /// Resident store.
    pub users: Arc<dyn UserRepository>,
    /// Appliance catalog.
    pub appliances: Arc<dyn ApplianceRepository>,
    /// Reminder sent-log.
    pub sent_log: Arc<dyn ReminderLog>,
    /// Durable timer rows.
    pub timers: Arc<dyn ReminderTimerStore>,
    /// Bans and failed-attempt counters.
    pub moderation: Arc<dyn ModerationRepository>,
}

/// Long-running tasks the server loop drives.
pub struct BackgroundTasks {
    /// Timer owner; restored and rebuilt at startup.
    pub scheduler: Arc<ReminderScheduler>,
    /// Periodic reconciliation sweep.
    pub watchdog: Arc<WatchdogSweep>,
    /// Daily ledger retention.
    pub purge: Arc<DailyPurge>,
}

/// Everything `run` needs: handler state plus the background tasks.
pub struct Services {
    /// Dependency bundle for the HTTP handlers.
    pub http_state: HttpState,
    /// Background loops to spawn.
    pub tasks: BackgroundTasks,
}

async fn build_storage(settings: &AppSettings) -> Result<StoragePorts, String> {
    match settings.database_url.as_deref() {
        Some(url) => {
            run_pending_migrations(url).await?;
            let pool = DbPool::new(PoolConfig::new(url))
                .await
                .map_err(|error| format!("database pool: {error}"))?;
            info!("using the PostgreSQL storage backend");
            Ok(StoragePorts {
                ledger: Arc::new(DieselBookingRepository::new(pool.clone())),
                users: Arc::new(DieselUserRepository::new(pool.clone())),
                appliances: Arc::new(DieselApplianceRepository::new(pool.clone())),
                sent_log: Arc::new(DieselReminderLog::new(pool.clone())),
                timers: Arc::new(DieselTimerStore::new(pool.clone())),
                moderation: Arc::new(DieselModerationRepository::new(pool)),
            })
        }
        None => {
            info!("no database configured, using the in-process store");
            let store = Arc::new(MemoryStore::new());
            Ok(StoragePorts {
                ledger: store.clone(),
                users: store.clone(),
                appliances: store.clone(),
                sent_log: store.clone(),
                timers: store.clone(),
                moderation: store,
            })
        }
    }
}

fn build_notifier(settings: &AppSettings) -> Result<Arc<dyn ReminderNotifier>, String> {
    let Some(url) = settings.chat_gateway_url.as_deref() else {
        return Ok(Arc::new(LogNotifier));
    };
    let endpoint = url
        .parse()
        .map_err(|error| format!("chat gateway url: {error}"))?;
    let http = HttpChatNotifier::new(endpoint, settings.chat_gateway_token.clone())
        .map_err(|error| format!("chat gateway client: {error}"))?;
    Ok(Arc::new(RetryingNotifier::new(
        Arc::new(http),
        Arc::new(TokioSleeper),
        settings.notify_max_retries,
    )))
}

/// Assemble the full service stack from configuration.
///
/// # Errors
///
/// Returns a description of what could not be wired: bad settings, an
/// unreachable database, or a malformed gateway URL.
pub async fn build_services(settings: &AppSettings) -> Result<Services, String> {
    let calendar = LaundryCalendar::new(
        settings.timezone().map_err(|error| error.to_string())?,
        settings
            .operating_hours()
            .map_err(|error| error.to_string())?,
    );
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let storage = build_storage(settings).await?;
    let seeded = storage
        .appliances
        .seed_if_empty(&settings.catalog())
        .await
        .map_err(|error| format!("catalog seeding: {error}"))?;
    if seeded > 0 {
        info!(seeded, "appliance catalog seeded");
    }

    let notifier = build_notifier(settings)?;
    let dispatcher = Arc::new(ReminderDispatcher::new(
        DispatcherPorts {
            ledger: storage.ledger.clone(),
            users: storage.users.clone(),
            appliances: storage.appliances.clone(),
            sent_log: storage.sent_log.clone(),
            notifier,
        },
        calendar.clone(),
        clock.clone(),
        settings.late_window(),
    ));
    let scheduler = Arc::new(ReminderScheduler::new(
        SchedulerPorts {
            ledger: storage.ledger.clone(),
            timers: storage.timers.clone(),
            dispatcher: dispatcher.clone(),
            sleeper: Arc::new(TokioSleeper),
        },
        calendar.clone(),
        clock.clone(),
        SchedulerConfig {
            lead_minutes: settings.lead_minutes,
            late_window: settings.late_window(),
        },
    ));
    let watchdog = Arc::new(WatchdogSweep::new(
        storage.ledger.clone(),
        dispatcher,
        calendar.clone(),
        clock.clone(),
        settings.lead_minutes,
        settings.late_window(),
    ));
    let purge = Arc::new(DailyPurge::new(
        storage.ledger.clone(),
        calendar.clone(),
        clock.clone(),
    ));

    let bookings = Arc::new(BookingService::new(
        BookingServicePorts {
            ledger: storage.ledger,
            appliances: storage.appliances.clone(),
            users: storage.users.clone(),
            scheduler: scheduler.clone(),
        },
        calendar,
        clock.clone(),
        settings.booking_days_ahead,
    ));
    let guard = Arc::new(AccessGuard::new(storage.moderation, clock));

    Ok(Services {
        http_state: HttpState {
            bookings,
            guard,
            appliances: storage.appliances,
            users: storage.users,
        },
        tasks: BackgroundTasks {
            scheduler,
            watchdog,
            purge,
        },
    })
}
