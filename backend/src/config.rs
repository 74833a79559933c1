//! Application configuration loaded via OrthoConfig.
//!
//! Every knob can come from the environment (`LAUNDRY_*`), a config
//! file, or CLI flags; the accessors fold in defaults that match the
//! house the service was written for.

use std::time::Duration;

use chrono_tz::Tz;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{ApplianceKind, InvalidOperatingHours, OperatingHours};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_TIMEZONE: &str = "Europe/Moscow";
const DEFAULT_WASHERS: [&str; 3] = ["Washer #3", "Washer #5", "Washer #6"];
const DEFAULT_DRYERS: [&str; 2] = ["Dryer #2", "Dryer #4"];

/// Settings the accessors could not reconcile into usable values.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The configured time zone is not in the tz database.
    #[error("unknown time zone: {0}")]
    UnknownTimezone(String),
    /// The configured hour window is malformed.
    #[error(transparent)]
    InvalidWindow(#[from] InvalidOperatingHours),
}

/// Configuration values for the booking service and its background tasks.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LAUNDRY")]
pub struct AppSettings {
    /// PostgreSQL connection URL; omit to run on the in-process store.
    pub database_url: Option<String>,
    /// Socket address to bind the HTTP server to.
    pub bind_addr: Option<String>,
    /// IANA time zone the house lives in.
    pub timezone: Option<String>,
    /// First bookable hour of the day.
    #[ortho_config(default = 9)]
    pub open_hour: u8,
    /// Last bookable hour of the day.
    #[ortho_config(default = 23)]
    pub close_hour: u8,
    /// Days open for booking, counting today as the first.
    #[ortho_config(default = 3)]
    pub booking_days_ahead: u32,
    /// Minutes before the slot start to deliver the reminder.
    #[ortho_config(default = 30)]
    pub lead_minutes: u32,
    /// Seconds past the fire time after which a reminder is stale.
    #[ortho_config(default = 300)]
    pub late_window_secs: u64,
    /// Seconds between watchdog sweep passes.
    #[ortho_config(default = 60)]
    pub watchdog_interval_secs: u64,
    /// Hours ahead the startup rebuild re-arms reminders for.
    #[ortho_config(default = 48)]
    pub reminder_horizon_hours: u32,
    /// Washer names seeded into an empty catalog.
    pub washers: Option<Vec<String>>,
    /// Dryer names seeded into an empty catalog.
    pub dryers: Option<Vec<String>>,
    /// Chat gateway endpoint reminders are POSTed to; omit to log only.
    pub chat_gateway_url: Option<String>,
    /// Bearer token for the chat gateway.
    pub chat_gateway_token: Option<String>,
    /// Extra attempts for rate-limited sends.
    #[ortho_config(default = 2)]
    pub notify_max_retries: u32,
}

impl AppSettings {
    /// The bind address, falling back to localhost.
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// The configured time zone, resolved against the tz database.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownTimezone`] for names the tz
    /// database does not know.
    pub fn timezone(&self) -> Result<Tz, SettingsError> {
        let name = self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
        name.parse()
            .map_err(|_| SettingsError::UnknownTimezone(name.to_owned()))
    }

    /// The bookable hour window.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidWindow`] when the hours are out
    /// of order or beyond 23.
    pub fn operating_hours(&self) -> Result<OperatingHours, SettingsError> {
        Ok(OperatingHours::new(self.open_hour, self.close_hour)?)
    }

    /// How far past the fire time a reminder is still worth sending.
    pub fn late_window(&self) -> Duration {
        Duration::from_secs(self.late_window_secs)
    }

    /// Pause between watchdog sweep passes.
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    /// The appliance catalog to seed on first startup, washers first.
    pub fn catalog(&self) -> Vec<(ApplianceKind, String)> {
        let washers = self
            .washers
            .clone()
            .unwrap_or_else(|| DEFAULT_WASHERS.map(str::to_owned).to_vec());
        let dryers = self
            .dryers
            .clone()
            .unwrap_or_else(|| DEFAULT_DRYERS.map(str::to_owned).to_vec());
        washers
            .into_iter()
            .map(|name| (ApplianceKind::Wash, name))
            .chain(dryers.into_iter().map(|name| (ApplianceKind::Dry, name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing and accessor fallbacks.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("laundry-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env([
            ("LAUNDRY_DATABASE_URL", None::<String>),
            ("LAUNDRY_BIND_ADDR", None::<String>),
            ("LAUNDRY_TIMEZONE", None::<String>),
            ("LAUNDRY_OPEN_HOUR", None::<String>),
            ("LAUNDRY_CLOSE_HOUR", None::<String>),
            ("LAUNDRY_LEAD_MINUTES", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(settings.timezone().expect("tz"), chrono_tz::Europe::Moscow);
        let hours = settings.operating_hours().expect("window");
        assert_eq!((hours.first(), hours.last()), (9, 23));
        assert_eq!(settings.booking_days_ahead, 3);
        assert_eq!(settings.lead_minutes, 30);
        assert_eq!(settings.late_window(), Duration::from_secs(300));
        assert_eq!(settings.catalog().len(), 5);
        assert!(settings.database_url.is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("LAUNDRY_TIMEZONE", Some("Europe/Berlin".to_owned())),
            ("LAUNDRY_OPEN_HOUR", Some("8".to_owned())),
            ("LAUNDRY_CLOSE_HOUR", Some("22".to_owned())),
            ("LAUNDRY_LEAD_MINUTES", Some("45".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.timezone().expect("tz"), chrono_tz::Europe::Berlin);
        let hours = settings.operating_hours().expect("window");
        assert_eq!((hours.first(), hours.last()), (8, 22));
        assert_eq!(settings.lead_minutes, 45);
    }

    #[rstest]
    fn bad_timezone_is_rejected_by_the_accessor() {
        let _guard = lock_env([("LAUNDRY_TIMEZONE", Some("Mars/Olympus".to_owned()))]);

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.timezone(),
            Err(SettingsError::UnknownTimezone(_))
        ));
    }
}
