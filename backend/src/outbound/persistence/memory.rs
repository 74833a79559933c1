//! In-process storage backend.
//!
//! Backs every domain port from one mutex-guarded state block. Used for
//! single-node deployments without a database and as the storage
//! backbone of the integration tests. Enforces the same uniqueness
//! rules the SQL schema does, including the slot-exclusivity index the
//! booking service relies on.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::ports::{
    ApplianceRepository, ApplianceStoreError, ArmedTimer, BanRecord, BookingRepository,
    BookingStoreError, ModerationRepository, ModerationStoreError, ReminderLog, ReminderLogError,
    ReminderTimerStore, TimerStoreError, UserRepository, UserStoreError,
};
use crate::domain::{
    Appliance, ApplianceId, ApplianceKind, Booking, BookingId, ExternalId, ReminderKey, TimerKey,
    User, UserId,
};

#[derive(Default)]
struct State {
    next_user_id: i64,
    next_appliance_id: i64,
    next_booking_id: i64,
    users: HashMap<i64, User>,
    appliances: Vec<Appliance>,
    bookings: HashMap<i64, Booking>,
    sent: HashSet<ReminderKey>,
    timers: HashMap<TimerKey, ArmedTimer>,
    bans: HashMap<i64, BanRecord>,
    failed_attempts: HashMap<i64, u32>,
}

impl State {
    fn slot_taken(&self, appliance: ApplianceId, date: NaiveDate, hour: u8) -> bool {
        self.bookings
            .values()
            .any(|b| b.appliance_id == appliance && b.date == date && b.hour == hour)
    }

    fn kind_of(&self, appliance: ApplianceId) -> Option<ApplianceKind> {
        self.appliances
            .iter()
            .find(|a| a.id == appliance)
            .map(|a| a.kind)
    }
}

/// Mutex-guarded implementation of every storage port.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create(
        &self,
        user: UserId,
        appliance: ApplianceId,
        date: NaiveDate,
        hour: u8,
    ) -> Result<BookingId, BookingStoreError> {
        let mut state = self.lock();
        if state.slot_taken(appliance, date, hour) {
            return Err(BookingStoreError::SlotConflict);
        }
        state.next_booking_id += 1;
        let id = state.next_booking_id;
        state.bookings.insert(
            id,
            Booking {
                id: BookingId::new(id),
                user_id: user,
                appliance_id: appliance,
                date,
                hour,
                created_at: Utc::now(),
            },
        );
        Ok(BookingId::new(id))
    }

    async fn find(&self, id: BookingId) -> Result<Option<Booking>, BookingStoreError> {
        Ok(self.lock().bookings.get(&id.as_i64()).cloned())
    }

    async fn delete(&self, id: BookingId) -> Result<bool, BookingStoreError> {
        Ok(self.lock().bookings.remove(&id.as_i64()).is_some())
    }

    async fn booked_hours(
        &self,
        appliance: ApplianceId,
        date: NaiveDate,
    ) -> Result<Vec<u8>, BookingStoreError> {
        let state = self.lock();
        let mut hours: Vec<u8> = state
            .bookings
            .values()
            .filter(|b| b.appliance_id == appliance && b.date == date)
            .map(|b| b.hour)
            .collect();
        hours.sort_unstable();
        Ok(hours)
    }

    async fn user_has_kind_on(
        &self,
        user: UserId,
        date: NaiveDate,
        kind: ApplianceKind,
    ) -> Result<bool, BookingStoreError> {
        let state = self.lock();
        Ok(state.bookings.values().any(|b| {
            b.user_id == user && b.date == date && state.kind_of(b.appliance_id) == Some(kind)
        }))
    }

    async fn user_has_kind_at(
        &self,
        user: UserId,
        date: NaiveDate,
        hour: u8,
        kind: ApplianceKind,
    ) -> Result<bool, BookingStoreError> {
        let state = self.lock();
        Ok(state.bookings.values().any(|b| {
            b.user_id == user
                && b.date == date
                && b.hour == hour
                && state.kind_of(b.appliance_id) == Some(kind)
        }))
    }

    async fn user_booking_at(
        &self,
        user: UserId,
        appliance: ApplianceId,
        date: NaiveDate,
        hour: u8,
    ) -> Result<Option<BookingId>, BookingStoreError> {
        Ok(self
            .lock()
            .bookings
            .values()
            .find(|b| {
                b.user_id == user && b.appliance_id == appliance && b.date == date && b.hour == hour
            })
            .map(|b| b.id))
    }

    async fn upcoming_for_user(
        &self,
        user: UserId,
        from_date: NaiveDate,
        from_hour: u8,
    ) -> Result<Vec<Booking>, BookingStoreError> {
        let state = self.lock();
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| {
                b.user_id == user
                    && (b.date > from_date || (b.date == from_date && b.hour >= from_hour))
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.date, b.hour));
        Ok(bookings)
    }

    async fn on_dates(&self, dates: &[NaiveDate]) -> Result<Vec<Booking>, BookingStoreError> {
        let state = self.lock();
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| dates.contains(&b.date))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.date, b.hour));
        Ok(bookings)
    }

    async fn all_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, BookingStoreError> {
        let state = self.lock();
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.date == date)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.appliance_id, b.hour));
        Ok(bookings)
    }

    async fn purge_before(&self, cutoff: NaiveDate) -> Result<u64, BookingStoreError> {
        let mut state = self.lock();
        let before = state.bookings.len();
        state.bookings.retain(|_, b| b.date >= cutoff);
        Ok((before - state.bookings.len()) as u64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn upsert<'a>(
        &self,
        external: ExternalId,
        surname: &str,
        room: &str,
        handle: Option<&'a str>,
    ) -> Result<User, UserStoreError> {
        let mut state = self.lock();
        if let Some(existing) = state
            .users
            .values_mut()
            .find(|u| u.external_id == external)
        {
            existing.surname = surname.to_owned();
            existing.room = room.to_owned();
            existing.handle = handle.map(str::to_owned);
            return Ok(existing.clone());
        }
        state.next_user_id += 1;
        let user = User {
            id: UserId::new(state.next_user_id),
            external_id: external,
            surname: surname.to_owned(),
            room: room.to_owned(),
            handle: handle.map(str::to_owned),
        };
        state.users.insert(user.id.as_i64(), user.clone());
        Ok(user)
    }

    async fn find_by_external_id(
        &self,
        external: ExternalId,
    ) -> Result<Option<User>, UserStoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.external_id == external)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserStoreError> {
        Ok(self.lock().users.get(&id.as_i64()).cloned())
    }

    async fn ensure_by_natural_key(
        &self,
        surname: &str,
        room: &str,
    ) -> Result<User, UserStoreError> {
        {
            let state = self.lock();
            if let Some(user) = state
                .users
                .values()
                .find(|u| u.surname == surname && u.room == room)
            {
                return Ok(user.clone());
            }
        }
        self.upsert(ExternalId::stub_for(surname, room), surname, room, None)
            .await
    }

    async fn merge_stub_into(
        &self,
        external: ExternalId,
        surname: &str,
        room: &str,
    ) -> Result<User, UserStoreError> {
        let mut state = self.lock();

        // Upsert the real resident first, keeping any handle a prior
        // registration recorded.
        let existing = state.users.values().find(|u| u.external_id == external);
        let (real_id, handle) = match existing {
            Some(user) => (user.id, user.handle.clone()),
            None => {
                state.next_user_id += 1;
                (UserId::new(state.next_user_id), None)
            }
        };
        let real = User {
            id: real_id,
            external_id: external,
            surname: surname.to_owned(),
            room: room.to_owned(),
            handle,
        };
        state.users.insert(real_id.as_i64(), real.clone());

        // Reassign the stub's bookings and drop the stub row; the whole
        // method holds the state lock, so readers never see it halfway.
        let stub_id = state
            .users
            .values()
            .find(|u| {
                u.surname == surname && u.room == room && u.is_stub() && u.id != real_id
            })
            .map(|u| u.id);
        if let Some(stub_id) = stub_id {
            for booking in state.bookings.values_mut() {
                if booking.user_id == stub_id {
                    booking.user_id = real_id;
                }
            }
            state.users.remove(&stub_id.as_i64());
        }
        Ok(real)
    }
}

#[async_trait]
impl ApplianceRepository for MemoryStore {
    async fn seed_if_empty(
        &self,
        catalog: &[(ApplianceKind, String)],
    ) -> Result<usize, ApplianceStoreError> {
        let mut state = self.lock();
        if !state.appliances.is_empty() {
            return Ok(0);
        }
        for (kind, name) in catalog {
            state.next_appliance_id += 1;
            let id = state.next_appliance_id;
            state.appliances.push(Appliance {
                id: ApplianceId::new(id),
                kind: *kind,
                name: name.clone(),
            });
        }
        Ok(catalog.len())
    }

    async fn list(&self) -> Result<Vec<Appliance>, ApplianceStoreError> {
        let mut appliances = self.lock().appliances.clone();
        appliances.sort_by_key(|a| (a.kind.as_str(), a.id));
        Ok(appliances)
    }

    async fn find(&self, id: ApplianceId) -> Result<Option<Appliance>, ApplianceStoreError> {
        Ok(self
            .lock()
            .appliances
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }
}

#[async_trait]
impl ReminderLog for MemoryStore {
    async fn record_sent(&self, key: &ReminderKey) -> Result<bool, ReminderLogError> {
        Ok(self.lock().sent.insert(*key))
    }

    async fn was_sent(&self, key: &ReminderKey) -> Result<bool, ReminderLogError> {
        Ok(self.lock().sent.contains(key))
    }
}

#[async_trait]
impl ReminderTimerStore for MemoryStore {
    async fn arm(
        &self,
        key: &TimerKey,
        lead_minutes: u32,
        fire_at: DateTime<Utc>,
    ) -> Result<(), TimerStoreError> {
        self.lock().timers.insert(
            *key,
            ArmedTimer {
                key: *key,
                lead_minutes,
                fire_at,
            },
        );
        Ok(())
    }

    async fn disarm(&self, key: &TimerKey) -> Result<(), TimerStoreError> {
        self.lock().timers.remove(key);
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<ArmedTimer>, TimerStoreError> {
        let mut timers: Vec<ArmedTimer> = self.lock().timers.values().cloned().collect();
        timers.sort_by_key(|t| t.fire_at);
        Ok(timers)
    }
}

#[async_trait]
impl ModerationRepository for MemoryStore {
    async fn find_ban(
        &self,
        external: ExternalId,
    ) -> Result<Option<BanRecord>, ModerationStoreError> {
        Ok(self.lock().bans.get(&external.as_i64()).cloned())
    }

    async fn upsert_ban(&self, record: &BanRecord) -> Result<(), ModerationStoreError> {
        self.lock()
            .bans
            .insert(record.external_id.as_i64(), record.clone());
        Ok(())
    }

    async fn delete_ban(&self, external: ExternalId) -> Result<bool, ModerationStoreError> {
        Ok(self.lock().bans.remove(&external.as_i64()).is_some())
    }

    async fn list_bans(&self) -> Result<Vec<BanRecord>, ModerationStoreError> {
        let mut bans: Vec<BanRecord> = self.lock().bans.values().cloned().collect();
        bans.sort_by_key(|b| std::cmp::Reverse(b.banned_at));
        Ok(bans)
    }

    async fn bump_failed_attempts(
        &self,
        external: ExternalId,
        _now: DateTime<Utc>,
    ) -> Result<u32, ModerationStoreError> {
        let mut state = self.lock();
        let count = state.failed_attempts.entry(external.as_i64()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn reset_failed_attempts(
        &self,
        external: ExternalId,
    ) -> Result<(), ModerationStoreError> {
        self.lock().failed_attempts.remove(&external.as_i64());
        Ok(())
    }
}
