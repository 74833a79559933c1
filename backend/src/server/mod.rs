//! Service assembly: storage backend selection, catalog seeding,
//! background task spawning, and HTTP server construction.

mod state_builders;

pub use state_builders::{BackgroundTasks, Services, StoragePorts, build_services};

use actix_web::body::MessageBody;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, middleware::Logger, web};
use tracing::{info, warn};

use crate::config::AppSettings;
use crate::inbound::http::admin::{
    create_ban, delete_ban, delete_booking, force_book, list_bans, list_bookings_for_date,
};
use crate::inbound::http::appliances::{free_hours, list_appliances};
use crate::inbound::http::bookings::{cancel_booking, create_booking, list_user_bookings};
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::register_user;

/// Dependencies each worker's `App` instance is built from.
#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    let api = web::scope("/api/v1")
        .service(list_appliances)
        .service(free_hours)
        .service(register_user)
        .service(create_booking)
        .service(cancel_booking)
        .service(list_user_bookings)
        .service(force_book)
        .service(list_bookings_for_date)
        .service(delete_booking)
        .service(create_ban)
        .service(delete_ban)
        .service(list_bans);

    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Logger::default())
        .service(api)
        .service(ready)
        .service(live)
}

/// Spawn the background loops and start the HTTP server.
///
/// Wires the stack from configuration: storage backend (PostgreSQL when
/// `database_url` is set, the in-process store otherwise), catalog
/// seeding, reminder restore and horizon rebuild, then the watchdog and
/// purge loops.
///
/// # Errors
///
/// Fails when configuration is unusable, the storage backend cannot be
/// reached, or the socket cannot be bound.
pub async fn run(settings: AppSettings) -> std::io::Result<()> {
    let services = build_services(&settings)
        .await
        .map_err(std::io::Error::other)?;

    let restored = services
        .tasks
        .scheduler
        .restore()
        .await
        .map_err(std::io::Error::other)?;
    info!(restored, "durable reminder timers restored");
    let rebuilt = services
        .tasks
        .scheduler
        .rebuild_for_horizon(settings.reminder_horizon_hours)
        .await
        .map_err(std::io::Error::other)?;
    info!(rebuilt, "reminder horizon rebuilt");

    spawn_background_loops(&settings, &services.tasks);

    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();
    let http_state = web::Data::new(services.http_state);

    let server: Server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .bind(settings.bind_addr())?
    .run();

    health_state.mark_ready();
    server.await
}

fn spawn_background_loops(settings: &AppSettings, tasks: &BackgroundTasks) {
    let watchdog = tasks.watchdog.clone();
    let mut ticker = tokio::time::interval(settings.watchdog_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            if let Err(error) = watchdog.sweep_once().await {
                warn!(%error, "watchdog sweep failed");
            }
        }
    });

    let purge = tasks.purge.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(purge.until_next_run()).await;
            if let Err(error) = purge.run_once().await {
                warn!(%error, "daily purge failed, will retry next cycle");
            }
        }
    });
}
