use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use vaxtrack_core::status::days_until;
use vaxtrack_core::{
    Child, ChildStats, DashboardStats, Owner, OwnerKind, VaccinationRecord, VaccinationStatus,
};
use vaxtrack_storage::{ChildError, ChildScope, Database, OwnerError, RecordError};

use crate::clock::{local_today, InvalidTimezone};

/// Record as presented to clients: the effective status next to the stored one.
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub id: String,
    pub child_id: String,
    pub vaccine_name: String,
    pub vaccine_code: String,
    pub dose_number: u32,
    pub scheduled_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administered_date: Option<NaiveDate>,
    pub status: VaccinationStatus,
    pub stored_status: VaccinationStatus,
    /// Days until the scheduled date; absent once administered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RecordView {
    pub fn new(record: VaccinationRecord, today: NaiveDate) -> Self {
        let status = record.status_on(today);
        let days_until = record
            .administered_date
            .is_none()
            .then(|| days_until(record.scheduled_date, today));
        Self {
            id: record.id,
            child_id: record.child_id,
            vaccine_name: record.vaccine_name,
            vaccine_code: record.vaccine_code,
            dose_number: record.dose_number,
            scheduled_date: record.scheduled_date,
            administered_date: record.administered_date,
            status,
            stored_status: record.status,
            days_until,
            notes: record.notes,
        }
    }
}

/// Child with its progress counters, used for list views.
#[derive(Debug, Clone, Serialize)]
pub struct ChildSummary {
    pub child: Child,
    pub stats: ChildStats,
    pub percent_complete: u32,
}

/// Child with every record and its counters.
#[derive(Debug, Clone, Serialize)]
pub struct ChildDetail {
    pub child: Child,
    pub records: Vec<RecordView>,
    pub stats: ChildStats,
    pub percent_complete: u32,
}

impl ChildDetail {
    pub fn new(child: Child, records: Vec<VaccinationRecord>, today: NaiveDate) -> Self {
        let stats = ChildStats::from_records(&records, today);
        Self {
            child,
            records: records
                .into_iter()
                .map(|record| RecordView::new(record, today))
                .collect(),
            percent_complete: stats.percent_complete(),
            stats,
        }
    }
}

/// Dashboard counters for a parent or clinic.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub owner_id: String,
    pub as_of: NaiveDate,
    #[serde(flatten)]
    pub stats: DashboardStats,
}

/// Loads an owner and checks it has the expected kind.
pub async fn load_owner(
    database: &Database,
    owner_id: &str,
    kind: OwnerKind,
) -> Result<Owner, ViewError> {
    let owner = database.owners().fetch(owner_id).await?;
    if owner.kind != kind {
        return Err(ViewError::WrongOwnerKind(kind));
    }
    Ok(owner)
}

/// Resolves "today" for the parent owning `child`.
pub async fn today_for_child(
    database: &Database,
    child: &Child,
    now: DateTime<Utc>,
) -> Result<NaiveDate, ViewError> {
    let owner = database.owners().fetch(&child.owner_id).await?;
    Ok(local_today(now, &owner.timezone)?)
}

pub async fn build_child_detail(
    database: &Database,
    child_id: &str,
    now: DateTime<Utc>,
) -> Result<ChildDetail, ViewError> {
    let child = database.children().fetch(child_id).await?;
    let today = today_for_child(database, &child, now).await?;
    let records = database.records().list_for_child(child_id).await?;
    Ok(ChildDetail::new(child, records, today))
}

pub async fn build_children_overview(
    database: &Database,
    owner_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<ChildSummary>, ViewError> {
    let owner = load_owner(database, owner_id, OwnerKind::Parent).await?;
    let today = local_today(now, &owner.timezone)?;
    let scope = ChildScope::Owner(owner_id);

    let children = database.children().list(scope).await?;
    let mut by_child = group_by_child(database.records().list_for_scope(scope).await?);

    Ok(children
        .into_iter()
        .map(|child| {
            let records = by_child.remove(&child.id).unwrap_or_default();
            let stats = ChildStats::from_records(&records, today);
            ChildSummary {
                child,
                percent_complete: stats.percent_complete(),
                stats,
            }
        })
        .collect())
}

pub async fn build_dashboard(
    database: &Database,
    owner_id: &str,
    kind: OwnerKind,
    now: DateTime<Utc>,
) -> Result<DashboardView, ViewError> {
    let owner = load_owner(database, owner_id, kind).await?;
    let today = local_today(now, &owner.timezone)?;
    let scope = match kind {
        OwnerKind::Parent => ChildScope::Owner(owner_id),
        OwnerKind::Clinic => ChildScope::Clinic(owner_id),
    };

    let children = database.children().list(scope).await?;
    let by_child = group_by_child(database.records().list_for_scope(scope).await?);
    let empty: Vec<VaccinationRecord> = Vec::new();

    let stats = DashboardStats::from_children(
        children.iter().map(|child| {
            by_child
                .get(&child.id)
                .map(Vec::as_slice)
                .unwrap_or(empty.as_slice())
        }),
        today,
    );

    Ok(DashboardView {
        owner_id: owner.id,
        as_of: today,
        stats,
    })
}

fn group_by_child(records: Vec<VaccinationRecord>) -> HashMap<String, Vec<VaccinationRecord>> {
    let mut grouped: HashMap<String, Vec<VaccinationRecord>> = HashMap::new();
    for record in records {
        grouped
            .entry(record.child_id.clone())
            .or_default()
            .push(record);
    }
    grouped
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("failed to load owner: {0}")]
    Owner(#[from] OwnerError),
    #[error("expected a {} account", .0.as_str())]
    WrongOwnerKind(OwnerKind),
    #[error("failed to load child: {0}")]
    Child(#[from] ChildError),
    #[error("failed to load records: {0}")]
    Record(#[from] RecordError),
    #[error(transparent)]
    Timezone(#[from] InvalidTimezone),
}
