//! Persistence for medical events and the donor directory.
//!
//! Two backends implement the same traits: an embedded SQLite database
//! (local deployments, tests) and the managed database's PostgREST API.
//! Both enforce the (patient, title, date) uniqueness in storage and report
//! a violation as [`StoreError::Duplicate`].

pub mod rest;
pub mod sqlite;

pub use rest::PostgrestStore;
pub use sqlite::SqliteStore;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::models::{BloodGroup, DonorContact, MedicalEventRecord, NewMedicalEvent};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate: This record already exists.")]
    Duplicate,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Datastore request failed: {0}")]
    Http(String),

    #[error("Datastore returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Datastore response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Medical event persistence.
pub trait MedicalEventStore: Send + Sync {
    /// Insert a new event. Fails with [`StoreError::Duplicate`] when an event
    /// with the same (patient_id, title, event_date) already exists.
    fn insert_event<'a>(
        &'a self,
        event: &'a NewMedicalEvent,
    ) -> BoxFuture<'a, Result<MedicalEventRecord, StoreError>>;
}

/// Lookup of donors who can be asked for blood.
pub trait DonorDirectory: Send + Sync {
    /// Donors of `blood_group` currently marked available, with the device
    /// token from their profile (unfiltered).
    fn available_donors(
        &self,
        blood_group: BloodGroup,
    ) -> BoxFuture<'_, Result<Vec<DonorContact>, StoreError>>;
}
