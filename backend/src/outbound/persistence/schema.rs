//! Diesel table definitions for the laundry schema.
//!
//! Kept in sync with the SQL migrations by hand; the uniqueness indexes
//! backing the slot and sent-log invariants live in the migrations, not
//! here.

diesel::table! {
    users (id) {
        id -> Int8,
        external_id -> Int8,
        surname -> Text,
        room -> Text,
        handle -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    appliances (id) {
        id -> Int8,
        kind -> Text,
        name -> Text,
    }
}

diesel::table! {
    bookings (id) {
        id -> Int8,
        user_id -> Int8,
        appliance_id -> Int8,
        date -> Date,
        hour -> Int2,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reminders_sent (id) {
        id -> Int8,
        user_id -> Int8,
        appliance_id -> Int8,
        date -> Date,
        hour -> Int2,
        lead_minutes -> Int4,
        sent_at -> Timestamptz,
    }
}

diesel::table! {
    reminder_timers (id) {
        id -> Int8,
        user_id -> Int8,
        appliance_id -> Int8,
        date -> Date,
        hour -> Int2,
        lead_minutes -> Int4,
        fire_at -> Timestamptz,
    }
}

diesel::table! {
    bans (external_id) {
        external_id -> Int8,
        reason -> Text,
        banned_until -> Nullable<Timestamptz>,
        banned_at -> Timestamptz,
    }
}

diesel::table! {
    failed_attempts (external_id) {
        external_id -> Int8,
        attempts -> Int4,
        last_attempt_at -> Timestamptz,
    }
}

diesel::joinable!(bookings -> users (user_id));
diesel::joinable!(bookings -> appliances (appliance_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    appliances,
    bookings,
    reminders_sent,
    reminder_timers,
    bans,
    failed_attempts,
);
