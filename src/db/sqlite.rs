use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{DonorDirectory, MedicalEventStore, StoreError};
use crate::models::{BloodGroup, DonorContact, MedicalEventRecord, NewMedicalEvent};

/// Embedded SQLite backend. The connection is shared behind a mutex and
/// only touched from blocking tasks.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path and run migrations
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing and ephemeral deployments)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Register or update a donor and their profile token.
    pub fn upsert_donor(
        &self,
        user_id: &str,
        blood_group: BloodGroup,
        available: bool,
        fcm_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO profiles (id, fcm_token) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET fcm_token = excluded.fcm_token",
            params![user_id, fcm_token],
        )?;
        conn.execute(
            "INSERT INTO blood_donors (user_id, blood_group, availability) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                blood_group = excluded.blood_group,
                availability = excluded.availability",
            params![user_id, blood_group.as_str(), available],
        )?;
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ═══════════════════════════════════════════
// Medical events
// ═══════════════════════════════════════════

fn insert_event_row(conn: &Connection, event: &NewMedicalEvent) -> Result<MedicalEventRecord, StoreError> {
    let record = MedicalEventRecord {
        id: Uuid::new_v4(),
        patient_id: event.patient_id.clone(),
        uploader_id: event.uploader_id.clone(),
        title: event.title.clone(),
        event_type: event.event_type,
        event_date: event.event_date,
        severity: event.severity,
        summary: event.summary.clone(),
        extracted_text: event.extracted_text.clone(),
        key_findings: event.key_findings.clone(),
        attachment_urls: event.attachment_urls.clone(),
        ai_details: event.ai_details.clone(),
        created_at: Utc::now().naive_utc(),
    };

    let key_findings = serde_json::to_string(&record.key_findings)
        .map_err(|e| StoreError::CorruptRow { table: "medical_events", reason: e.to_string() })?;
    let attachment_urls = serde_json::to_string(&record.attachment_urls)
        .map_err(|e| StoreError::CorruptRow { table: "medical_events", reason: e.to_string() })?;

    let result = conn.execute(
        "INSERT INTO medical_events (id, patient_id, uploader_id, title, event_type, event_date,
         severity, summary, extracted_text, key_findings, attachment_urls, ai_details, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            record.id.to_string(),
            record.patient_id,
            record.uploader_id,
            record.title,
            record.event_type.as_str(),
            record.event_date,
            record.severity.as_str(),
            record.summary,
            record.extracted_text,
            key_findings,
            attachment_urls,
            record.ai_details.to_string(),
            record.created_at,
        ],
    );

    match result {
        Ok(_) => Ok(record),
        Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate),
        Err(e) => Err(e.into()),
    }
}

impl MedicalEventStore for SqliteStore {
    fn insert_event<'a>(
        &'a self,
        event: &'a NewMedicalEvent,
    ) -> BoxFuture<'a, Result<MedicalEventRecord, StoreError>> {
        let event = event.clone();
        self.with_conn(move |conn| insert_event_row(conn, &event)).boxed()
    }
}

// ═══════════════════════════════════════════
// Donor directory
// ═══════════════════════════════════════════

fn select_available_donors(
    conn: &Connection,
    blood_group: BloodGroup,
) -> Result<Vec<DonorContact>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT d.user_id, p.fcm_token
         FROM blood_donors d
         JOIN profiles p ON p.id = d.user_id
         WHERE d.blood_group = ?1 AND d.availability = 1
         ORDER BY d.user_id",
    )?;
    let rows = stmt.query_map(params![blood_group.as_str()], |row| {
        Ok(DonorContact {
            user_id: row.get(0)?,
            fcm_token: row.get(1)?,
        })
    })?;
    let donors = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(donors)
}

impl DonorDirectory for SqliteStore {
    fn available_donors(
        &self,
        blood_group: BloodGroup,
    ) -> BoxFuture<'_, Result<Vec<DonorContact>, StoreError>> {
        self.with_conn(move |conn| select_available_donors(conn, blood_group))
            .boxed()
    }
}

/// Row lookup by the natural key, used by tests to inspect what was stored.
#[cfg(test)]
mod read_back {
    use std::str::FromStr;

    use chrono::{NaiveDate, NaiveDateTime};
    use rusqlite::{params, Connection, OptionalExtension, Row};
    use uuid::Uuid;

    use super::SqliteStore;
    use crate::db::StoreError;
    use crate::models::{EventType, MedicalEventRecord, Severity};

    impl SqliteStore {
        /// The event occupying a (patient_id, title, event_date) slot, if any.
        pub async fn find_event(
            &self,
            patient_id: &str,
            title: &str,
            event_date: NaiveDate,
        ) -> Result<Option<MedicalEventRecord>, StoreError> {
            let patient_id = patient_id.to_string();
            let title = title.to_string();
            self.with_conn(move |conn| find_event_row(conn, &patient_id, &title, event_date))
                .await
        }
    }

    fn find_event_row(
        conn: &Connection,
        patient_id: &str,
        title: &str,
        event_date: NaiveDate,
    ) -> Result<Option<MedicalEventRecord>, StoreError> {
        let raw = conn
            .query_row(
                "SELECT id, patient_id, uploader_id, title, event_type, event_date, severity,
                        summary, extracted_text, key_findings, attachment_urls, ai_details, created_at
                 FROM medical_events
                 WHERE patient_id = ?1 AND title = ?2 AND event_date = ?3",
                params![patient_id, title, event_date],
                RawEventRow::from_row,
            )
            .optional()?;
        raw.map(RawEventRow::into_record).transpose()
    }

    struct RawEventRow {
        id: String,
        patient_id: String,
        uploader_id: String,
        title: String,
        event_type: String,
        event_date: NaiveDate,
        severity: String,
        summary: Option<String>,
        extracted_text: Option<String>,
        key_findings: String,
        attachment_urls: String,
        ai_details: String,
        created_at: NaiveDateTime,
    }

    impl RawEventRow {
        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get(0)?,
                patient_id: row.get(1)?,
                uploader_id: row.get(2)?,
                title: row.get(3)?,
                event_type: row.get(4)?,
                event_date: row.get(5)?,
                severity: row.get(6)?,
                summary: row.get(7)?,
                extracted_text: row.get(8)?,
                key_findings: row.get(9)?,
                attachment_urls: row.get(10)?,
                ai_details: row.get(11)?,
                created_at: row.get(12)?,
            })
        }

        fn into_record(self) -> Result<MedicalEventRecord, StoreError> {
            let corrupt = |reason: String| StoreError::CorruptRow {
                table: "medical_events",
                reason,
            };
            Ok(MedicalEventRecord {
                id: Uuid::parse_str(&self.id).map_err(|e| corrupt(e.to_string()))?,
                patient_id: self.patient_id,
                uploader_id: self.uploader_id,
                title: self.title,
                event_type: EventType::from_str(&self.event_type).map_err(|e| corrupt(e.to_string()))?,
                event_date: self.event_date,
                severity: Severity::from_str(&self.severity).map_err(|e| corrupt(e.to_string()))?,
                summary: self.summary,
                extracted_text: self.extracted_text,
                key_findings: serde_json::from_str(&self.key_findings)
                    .map_err(|e| corrupt(e.to_string()))?,
                attachment_urls: serde_json::from_str(&self.attachment_urls)
                    .map_err(|e| corrupt(e.to_string()))?,
                ai_details: serde_json::from_str(&self.ai_details)
                    .map_err(|e| corrupt(e.to_string()))?,
                created_at: self.created_at,
            })
        }
    }
}
