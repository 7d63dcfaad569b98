use std::{borrow::Cow, str::FromStr, time::Duration};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Sqlite, SqlitePool, Transaction,
};
use thiserror::Error;
use uuid::Uuid;

use vaxtrack_core::types::UnknownStatusError;
use vaxtrack_core::{
    format_iso_date, parse_iso_date, Child, InvalidDateError, Notification, NotificationKind,
    Owner, OwnerKind, ScheduledDose, VaccinationRecord, VaccinationStatus,
};

const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Connect)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Opens a private in-memory database on a single long-lived connection.
    pub async fn connect_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StorageError::Connect)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for parent and clinic accounts.
    pub fn owners(&self) -> OwnerRepository {
        OwnerRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for child profiles.
    pub fn children(&self) -> ChildRepository {
        ChildRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for vaccination records.
    pub fn records(&self) -> RecordRepository {
        RecordRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for in-app reminders.
    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Raised when a stored row cannot be mapped back to a domain value.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    InvalidDate(#[from] InvalidDateError),
    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatusError),
    #[error("{0}")]
    UnknownVariant(String),
    #[error("column {column} out of range: {value}")]
    OutOfRange { column: &'static str, value: i64 },
}

/// Which set of children a query targets.
#[derive(Debug, Clone, Copy)]
pub enum ChildScope<'a> {
    /// Children owned by a parent account.
    Owner(&'a str),
    /// Children attached to a clinic.
    Clinic(&'a str),
}

/// Repository for parent and clinic accounts.
#[derive(Clone)]
pub struct OwnerRepository {
    pool: SqlitePool,
}

impl OwnerRepository {
    /// Creates a new owner with a generated identifier.
    pub async fn insert(&self, owner: &NewOwner<'_>) -> Result<Owner, OwnerError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO owners (id, kind, display_name, timezone, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(owner.kind.as_str())
        .bind(owner.display_name)
        .bind(owner.timezone)
        .bind(to_rfc3339(owner.created_at))
        .execute(&self.pool)
        .await?;

        Ok(Owner {
            id,
            kind: owner.kind,
            display_name: owner.display_name.to_string(),
            timezone: owner.timezone.to_string(),
            created_at: owner.created_at,
        })
    }

    /// Loads an owner by identifier.
    pub async fn fetch(&self, owner_id: &str) -> Result<Owner, OwnerError> {
        let row = sqlx::query_as::<_, OwnerRow>(
            "SELECT id, kind, display_name, timezone, created_at FROM owners WHERE id = ?",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OwnerError::NotFound)?;

        Ok(row.into_domain()?)
    }
}

/// Payload required to create an owner.
pub struct NewOwner<'a> {
    pub kind: OwnerKind,
    pub display_name: &'a str,
    pub timezone: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OwnerRow {
    id: String,
    kind: String,
    display_name: String,
    timezone: String,
    created_at: DateTime<Utc>,
}

impl OwnerRow {
    fn into_domain(self) -> Result<Owner, DecodeError> {
        Ok(Owner {
            kind: OwnerKind::from_str(&self.kind).map_err(DecodeError::UnknownVariant)?,
            id: self.id,
            display_name: self.display_name,
            timezone: self.timezone,
            created_at: self.created_at,
        })
    }
}

/// Errors that can occur while reading or writing owners.
#[derive(Debug, Error)]
pub enum OwnerError {
    #[error("owner not found")]
    NotFound,
    #[error("failed to decode owner row: {0}")]
    Decode(#[from] DecodeError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for child profiles.
#[derive(Clone)]
pub struct ChildRepository {
    pool: SqlitePool,
}

impl ChildRepository {
    /// Inserts a child together with its generated schedule in one transaction.
    pub async fn create_with_schedule(
        &self,
        child: &NewChild<'_>,
        schedule: &[ScheduledDose],
    ) -> Result<(Child, Vec<VaccinationRecord>), ChildError> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO children (id, owner_id, clinic_id, name, birth_date, country, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(child.owner_id)
        .bind(child.clinic_id)
        .bind(child.name)
        .bind(format_iso_date(child.birth_date))
        .bind(child.country)
        .bind(to_rfc3339(child.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if is_constraint(&err, SQLITE_CONSTRAINT_FOREIGNKEY) {
                ChildError::UnknownOwner
            } else {
                ChildError::Database(err)
            }
        })?;

        let mut records = Vec::with_capacity(schedule.len());
        for dose in schedule {
            let record = NewRecord {
                child_id: &id,
                vaccine_name: &dose.vaccine_name,
                vaccine_code: &dose.vaccine_code,
                dose_number: dose.dose_number,
                scheduled_date: dose.scheduled_date,
                administered_date: None,
                status: VaccinationStatus::Scheduled,
                notes: None,
                updated_at: child.created_at,
            };
            let inserted = insert_record(&mut tx, &record)
                .await
                .map_err(ChildError::Database)?;
            records.push(inserted);
        }

        tx.commit().await?;

        let created = Child {
            id,
            owner_id: child.owner_id.to_string(),
            clinic_id: child.clinic_id.map(str::to_string),
            name: child.name.to_string(),
            birth_date: child.birth_date,
            country: child.country.to_string(),
            created_at: child.created_at,
        };
        Ok((created, records))
    }

    /// Loads a child by identifier.
    pub async fn fetch(&self, child_id: &str) -> Result<Child, ChildError> {
        let row = sqlx::query_as::<_, ChildRow>(
            "SELECT id, owner_id, clinic_id, name, birth_date, country, created_at \
               FROM children WHERE id = ?",
        )
        .bind(child_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ChildError::NotFound)?;

        Ok(row.into_domain()?)
    }

    /// Lists the children in scope ordered by birth date and name.
    pub async fn list(&self, scope: ChildScope<'_>) -> Result<Vec<Child>, ChildError> {
        let (sql, key) = match scope {
            ChildScope::Owner(owner_id) => (
                "SELECT id, owner_id, clinic_id, name, birth_date, country, created_at \
                   FROM children WHERE owner_id = ? ORDER BY birth_date, name, id",
                owner_id,
            ),
            ChildScope::Clinic(clinic_id) => (
                "SELECT id, owner_id, clinic_id, name, birth_date, country, created_at \
                   FROM children WHERE clinic_id = ? ORDER BY birth_date, name, id",
                clinic_id,
            ),
        };

        let rows = sqlx::query_as::<_, ChildRow>(sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(ChildError::from))
            .collect()
    }

    /// Deletes a child; records and their reminders cascade.
    pub async fn delete(&self, child_id: &str) -> Result<(), ChildError> {
        let result = sqlx::query("DELETE FROM children WHERE id = ?")
            .bind(child_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ChildError::NotFound);
        }
        Ok(())
    }
}

/// Payload required to create a child.
pub struct NewChild<'a> {
    pub owner_id: &'a str,
    pub clinic_id: Option<&'a str>,
    pub name: &'a str,
    pub birth_date: NaiveDate,
    pub country: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ChildRow {
    id: String,
    owner_id: String,
    clinic_id: Option<String>,
    name: String,
    birth_date: String,
    country: String,
    created_at: DateTime<Utc>,
}

impl ChildRow {
    fn into_domain(self) -> Result<Child, DecodeError> {
        Ok(Child {
            birth_date: parse_iso_date(&self.birth_date)?,
            id: self.id,
            owner_id: self.owner_id,
            clinic_id: self.clinic_id,
            name: self.name,
            country: self.country,
            created_at: self.created_at,
        })
    }
}

/// Errors that can occur while reading or writing children.
#[derive(Debug, Error)]
pub enum ChildError {
    #[error("child not found")]
    NotFound,
    #[error("owner or clinic does not exist")]
    UnknownOwner,
    #[error("failed to decode child row: {0}")]
    Decode(#[from] DecodeError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for vaccination records.
#[derive(Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

const RECORD_COLUMNS: &str = "r.id, r.child_id, r.vaccine_name, r.vaccine_code, r.dose_number, \
     r.scheduled_date, r.administered_date, r.status, r.notes, r.updated_at";

impl RecordRepository {
    /// Inserts a manually logged dose.
    pub async fn insert(&self, record: &NewRecord<'_>) -> Result<VaccinationRecord, RecordError> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_record(&mut tx, record)
            .await
            .map_err(|err| {
                if is_constraint(&err, SQLITE_CONSTRAINT_UNIQUE) {
                    RecordError::DuplicateDose
                } else if is_constraint(&err, SQLITE_CONSTRAINT_FOREIGNKEY) {
                    RecordError::MissingChild
                } else {
                    RecordError::Database(err)
                }
            })?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Loads a record by identifier.
    pub async fn fetch(&self, record_id: &str) -> Result<VaccinationRecord, RecordError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM vaccination_records AS r WHERE r.id = ?");
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RecordError::NotFound)?;

        Ok(row.into_domain()?)
    }

    /// Lists a child's records in schedule order.
    pub async fn list_for_child(
        &self,
        child_id: &str,
    ) -> Result<Vec<VaccinationRecord>, RecordError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM vaccination_records AS r \
              WHERE r.child_id = ? \
              ORDER BY r.scheduled_date, r.vaccine_code, r.dose_number"
        );
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(child_id)
            .fetch_all(&self.pool)
            .await?;

        decode_records(rows)
    }

    /// Lists every record belonging to the children in scope.
    pub async fn list_for_scope(
        &self,
        scope: ChildScope<'_>,
    ) -> Result<Vec<VaccinationRecord>, RecordError> {
        let (filter, key) = match scope {
            ChildScope::Owner(owner_id) => ("c.owner_id = ?", owner_id),
            ChildScope::Clinic(clinic_id) => ("c.clinic_id = ?", clinic_id),
        };
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM vaccination_records AS r \
               JOIN children AS c ON c.id = r.child_id \
              WHERE {filter} \
              ORDER BY r.child_id, r.scheduled_date, r.vaccine_code, r.dose_number"
        );
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await?;

        decode_records(rows)
    }

    /// Lists records that still await administration, with their owner's timezone.
    pub async fn list_pending(&self) -> Result<Vec<PendingRecord>, RecordError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS}, o.id AS owner_id, o.timezone AS owner_timezone \
               FROM vaccination_records AS r \
               JOIN children AS c ON c.id = r.child_id \
               JOIN owners AS o ON o.id = c.owner_id \
              WHERE r.administered_date IS NULL \
                AND r.status != 'skipped' \
              ORDER BY r.scheduled_date, r.id"
        );
        let rows = sqlx::query_as::<_, PendingRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<PendingRecord, RecordError> {
                Ok(PendingRecord {
                    owner_id: row.owner_id,
                    owner_timezone: row.owner_timezone,
                    record: row.record.into_domain()?,
                })
            })
            .collect()
    }

    /// Records the administration of a dose. The stored status becomes `completed`.
    pub async fn mark_administered(
        &self,
        record_id: &str,
        administered_date: NaiveDate,
        notes: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<VaccinationRecord, RecordError> {
        let result = sqlx::query(
            "UPDATE vaccination_records \
                SET administered_date = ?, status = 'completed', \
                    notes = COALESCE(?, notes), updated_at = ? \
              WHERE id = ?",
        )
        .bind(format_iso_date(administered_date))
        .bind(notes)
        .bind(to_rfc3339(updated_at))
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RecordError::NotFound);
        }
        self.fetch(record_id).await
    }

    /// Applies the clinic skip override. Administered doses cannot be skipped.
    pub async fn mark_skipped(
        &self,
        record_id: &str,
        notes: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<VaccinationRecord, RecordError> {
        let current = self.fetch(record_id).await?;
        if current.administered_date.is_some() {
            return Err(RecordError::AlreadyAdministered);
        }

        sqlx::query(
            "UPDATE vaccination_records \
                SET status = 'skipped', notes = COALESCE(?, notes), updated_at = ? \
              WHERE id = ? AND administered_date IS NULL",
        )
        .bind(notes)
        .bind(to_rfc3339(updated_at))
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        self.fetch(record_id).await
    }

    /// Writes back a freshly derived status. Returns `false` when nothing changed.
    pub async fn sync_status(
        &self,
        record_id: &str,
        status: VaccinationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, RecordError> {
        let result = sqlx::query(
            "UPDATE vaccination_records SET status = ?, updated_at = ? \
              WHERE id = ? AND status != ? AND status != 'skipped' AND administered_date IS NULL",
        )
        .bind(status.as_str())
        .bind(to_rfc3339(updated_at))
        .bind(record_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn insert_record(
    tx: &mut Transaction<'_, Sqlite>,
    record: &NewRecord<'_>,
) -> Result<VaccinationRecord, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO vaccination_records \
         (id, child_id, vaccine_name, vaccine_code, dose_number, scheduled_date, administered_date, status, notes, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(record.child_id)
    .bind(record.vaccine_name)
    .bind(record.vaccine_code)
    .bind(i64::from(record.dose_number))
    .bind(format_iso_date(record.scheduled_date))
    .bind(record.administered_date.map(format_iso_date))
    .bind(record.status.as_str())
    .bind(record.notes)
    .bind(to_rfc3339(record.updated_at))
    .execute(&mut **tx)
    .await?;

    Ok(VaccinationRecord {
        id,
        child_id: record.child_id.to_string(),
        vaccine_name: record.vaccine_name.to_string(),
        vaccine_code: record.vaccine_code.to_string(),
        dose_number: record.dose_number,
        scheduled_date: record.scheduled_date,
        administered_date: record.administered_date,
        status: record.status,
        notes: record.notes.map(str::to_string),
        updated_at: record.updated_at,
    })
}

fn decode_records(rows: Vec<RecordRow>) -> Result<Vec<VaccinationRecord>, RecordError> {
    rows.into_iter()
        .map(|row| row.into_domain().map_err(RecordError::from))
        .collect()
}

/// Parameters required to insert a vaccination record.
pub struct NewRecord<'a> {
    pub child_id: &'a str,
    pub vaccine_name: &'a str,
    pub vaccine_code: &'a str,
    pub dose_number: u32,
    pub scheduled_date: NaiveDate,
    pub administered_date: Option<NaiveDate>,
    pub status: VaccinationStatus,
    pub notes: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

/// Unadministered record joined with the owning account.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub owner_id: String,
    pub owner_timezone: String,
    pub record: VaccinationRecord,
}

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: String,
    child_id: String,
    vaccine_name: String,
    vaccine_code: String,
    dose_number: i64,
    scheduled_date: String,
    administered_date: Option<String>,
    status: String,
    notes: Option<String>,
    updated_at: DateTime<Utc>,
}

impl RecordRow {
    fn into_domain(self) -> Result<VaccinationRecord, DecodeError> {
        let dose_number = u32::try_from(self.dose_number).map_err(|_| DecodeError::OutOfRange {
            column: "dose_number",
            value: self.dose_number,
        })?;
        let administered_date = self
            .administered_date
            .as_deref()
            .map(parse_iso_date)
            .transpose()?;

        Ok(VaccinationRecord {
            scheduled_date: parse_iso_date(&self.scheduled_date)?,
            administered_date,
            status: self.status.parse()?,
            dose_number,
            id: self.id,
            child_id: self.child_id,
            vaccine_name: self.vaccine_name,
            vaccine_code: self.vaccine_code,
            notes: self.notes,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    #[sqlx(flatten)]
    record: RecordRow,
    owner_id: String,
    owner_timezone: String,
}

/// Errors that can occur while reading or mutating vaccination records.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("vaccination record not found")]
    NotFound,
    #[error("child does not exist")]
    MissingChild,
    #[error("a record for this vaccine dose already exists")]
    DuplicateDose,
    #[error("dose has already been administered")]
    AlreadyAdministered,
    #[error("failed to decode record row: {0}")]
    Decode(#[from] DecodeError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for in-app reminders.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Creates a reminder unless one already exists for the same record and kind.
    pub async fn insert_if_absent(
        &self,
        notification: &NewNotification<'_>,
    ) -> Result<NotificationInsertOutcome, NotificationError> {
        let result = sqlx::query(
            "INSERT INTO notifications (id, owner_id, record_id, kind, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(record_id, kind) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(notification.owner_id)
        .bind(notification.record_id)
        .bind(notification.kind.as_str())
        .bind(to_rfc3339(notification.created_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(NotificationInsertOutcome::Duplicate)
        } else {
            Ok(NotificationInsertOutcome::Inserted)
        }
    }

    /// Lists an owner's reminders, newest first.
    pub async fn list_for_owner(
        &self,
        owner_id: &str,
        limit: i64,
    ) -> Result<Vec<Notification>, NotificationError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, owner_id, record_id, kind, created_at, read_at \
               FROM notifications WHERE owner_id = ? \
              ORDER BY created_at DESC, id \
              LIMIT ?",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(NotificationError::from))
            .collect()
    }

    /// Marks a reminder as read. Already-read reminders keep their first timestamp.
    pub async fn mark_read(
        &self,
        notification_id: &str,
        read_at: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = COALESCE(read_at, ?) WHERE id = ?",
        )
        .bind(to_rfc3339(read_at))
        .bind(notification_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }
}

/// Payload required to create a reminder.
pub struct NewNotification<'a> {
    pub owner_id: &'a str,
    pub record_id: &'a str,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Result of attempting to insert a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationInsertOutcome {
    Inserted,
    Duplicate,
}

impl NotificationInsertOutcome {
    pub fn is_duplicate(self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    owner_id: String,
    record_id: String,
    kind: String,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl NotificationRow {
    fn into_domain(self) -> Result<Notification, DecodeError> {
        Ok(Notification {
            kind: NotificationKind::from_str(&self.kind).map_err(DecodeError::UnknownVariant)?,
            id: self.id,
            owner_id: self.owner_id,
            record_id: self.record_id,
            created_at: self.created_at,
            read_at: self.read_at,
        })
    }
}

/// Errors that can occur while handling reminders.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification not found")]
    NotFound,
    #[error("failed to decode notification row: {0}")]
    Decode(#[from] DecodeError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn is_constraint(err: &sqlx::Error, code: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code() == Some(Cow::Borrowed(code)),
        _ => false,
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
