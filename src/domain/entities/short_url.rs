//! Short URL entity representing one code-to-destination mapping.

use chrono::{DateTime, Utc};

/// A short code mapped to its destination URL.
///
/// `code` is unique across all records whose `deleted_at` is `None`. The
/// record stays in storage after deletion; every read path filters on
/// `deleted_at` explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortUrl {
    pub id: i64,
    pub code: String,
    pub destination: String,
    pub owner: Option<i64>,
    /// Salted MAC of the link secret (see [`crate::utils::secret`]), never the raw value.
    pub secret_hash: Option<String>,
    pub custom_alias: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortUrl {
    /// Returns true if the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the record has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }

    /// Returns true if the record may be resolved: active, unexpired, not deleted.
    pub fn is_accessible(&self) -> bool {
        self.active && !self.is_expired() && !self.is_deleted()
    }

    pub fn has_secret(&self) -> bool {
        self.secret_hash.is_some()
    }
}

/// Input data for creating a new short URL.
///
/// The store assigns `id`, timestamps, `active = true` and `click_count = 0`.
#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub code: String,
    pub destination: String,
    pub owner: Option<i64>,
    pub secret_hash: Option<String>,
    pub custom_alias: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Owner-requested change to an existing short URL.
///
/// `None` fields are left unchanged. For the nested options, `Some(None)`
/// clears the value and `Some(Some(v))` sets it. `secret` carries the raw
/// secret; it is hashed before it reaches the store.
#[derive(Debug, Clone, Default)]
pub struct ShortUrlPatch {
    pub destination: Option<String>,
    pub active: Option<bool>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub secret: Option<Option<String>>,
}

impl ShortUrlPatch {
    pub fn is_empty(&self) -> bool {
        self.destination.is_none()
            && self.active.is_none()
            && self.expires_at.is_none()
            && self.secret.is_none()
    }
}

#[cfg(test)]
pub(crate) fn sample_short_url(id: i64, code: &str, destination: &str) -> ShortUrl {
    let now = Utc::now();
    ShortUrl {
        id,
        code: code.to_string(),
        destination: destination.to_string(),
        owner: Some(1),
        secret_hash: None,
        custom_alias: false,
        expires_at: None,
        active: true,
        click_count: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}
