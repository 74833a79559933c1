//! Resident identities.
//!
//! A user is known externally by an opaque chat identity and internally by
//! a store-assigned id. Residents pre-registered by an administrator exist
//! as *stub* users: their external id is a synthetic negative value derived
//! from the natural key (surname + room) until the real identity shows up
//! and the stub is merged away.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Internal, store-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw store identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw store identifier.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External chat identity of a resident.
///
/// Negative values are synthetic stub identities; real chat identities are
/// always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(i64);

/// Stub identities stay below this bound so they can never collide with a
/// real chat id.
const STUB_ID_SPACE: u64 = 100_000_000_000;

impl ExternalId {
    /// Wrap a raw external identity.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw external identity.
    pub fn as_i64(self) -> i64 {
        self.0
    }

    /// Whether this is a synthetic stub identity.
    pub fn is_stub(self) -> bool {
        self.0 < 0
    }

    /// Derive the deterministic stub identity for a natural key.
    ///
    /// Hashes `surname|room`, takes the leading eight digest bytes, reduces
    /// them into the stub id space, and negates. The same surname/room pair
    /// always maps to the same stub id.
    pub fn stub_for(surname: &str, room: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(surname.as_bytes());
        hasher.update(b"|");
        hasher.update(room.as_bytes());
        let digest = hasher.finalize();
        let mut prefix = [0_u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let reduced = u64::from_be_bytes(prefix) % STUB_ID_SPACE;
        Self(-(i64::try_from(reduced.max(1)).unwrap_or(1)))
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered resident (or an administrative stub awaiting merge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal identifier; booking rows reference this.
    pub id: UserId,
    /// External chat identity (negative for stubs).
    pub external_id: ExternalId,
    /// Resident surname.
    pub surname: String,
    /// Room number.
    pub room: String,
    /// Optional chat handle, when known.
    pub handle: Option<String>,
}

impl User {
    /// Whether this record is a stub awaiting merge with a real identity.
    pub fn is_stub(&self) -> bool {
        self.external_id.is_stub()
    }
}
