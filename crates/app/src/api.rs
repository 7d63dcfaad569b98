use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use metrics::counter;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use vaxtrack_core::dates::parse_optional_iso_date;
use vaxtrack_core::guidelines::normalize_country;
use vaxtrack_core::{parse_iso_date, Notification, Owner, OwnerKind, ScheduledDose, VaccinationStatus};
use vaxtrack_storage::{NewChild, NewOwner, NewRecord, OwnerError};

use crate::clock::{local_today, parse_timezone};
use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::state::{
    build_child_detail, build_children_overview, build_dashboard, load_owner, today_for_child,
    ChildDetail, ChildSummary, DashboardView, RecordView, ViewError,
};

const DEFAULT_NOTIFICATION_LIMIT: i64 = 50;
const MAX_NOTIFICATION_LIMIT: i64 = 200;

type ApiResult<T> = Result<T, ProblemResponse>;

/// Counts the request outcome per route and passes the result through.
fn observe<T>(route: &'static str, result: ApiResult<T>) -> ApiResult<T> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(problem) if problem.status().is_client_error() => "client_error",
        Err(_) => "server_error",
    };
    counter!("api_requests_total", "route" => route, "result" => outcome).increment(1);
    result
}

/// Decodes a JSON body that may be omitted entirely; an empty body yields the defaults.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

fn require_non_empty(field: &'static str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ProblemResponse::bad_request(
            "missing_field",
            format!("{field} must not be empty"),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateOwnerRequest {
    pub kind: OwnerKind,
    pub display_name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

pub async fn create_owner(
    State(state): State<AppState>,
    body: Result<Json<CreateOwnerRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Owner>)> {
    observe("owners.create", create_owner_inner(&state, body).await)
}

async fn create_owner_inner(
    state: &AppState,
    body: Result<Json<CreateOwnerRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Owner>)> {
    let Json(body) = body?;
    require_non_empty("display_name", &body.display_name)?;
    parse_timezone(&body.timezone)?;

    let owner = state
        .storage()
        .owners()
        .insert(&NewOwner {
            kind: body.kind,
            display_name: body.display_name.trim(),
            timezone: &body.timezone,
            created_at: state.now(),
        })
        .await?;

    info!(stage = "api", owner_id = %owner.id, kind = owner.kind.as_str(), "owner created");
    Ok((StatusCode::CREATED, Json(owner)))
}

pub async fn owner_dashboard(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> ApiResult<Json<DashboardView>> {
    let result = build_dashboard(state.storage(), &owner_id, OwnerKind::Parent, state.now())
        .await
        .map(Json)
        .map_err(ProblemResponse::from);
    observe("owners.dashboard", result)
}

pub async fn clinic_dashboard(
    State(state): State<AppState>,
    Path(clinic_id): Path<String>,
) -> ApiResult<Json<DashboardView>> {
    let result = build_dashboard(state.storage(), &clinic_id, OwnerKind::Clinic, state.now())
        .await
        .map(Json)
        .map_err(ProblemResponse::from);
    observe("clinics.dashboard", result)
}

pub async fn list_children(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> ApiResult<Json<Vec<ChildSummary>>> {
    let result = build_children_overview(state.storage(), &owner_id, state.now())
        .await
        .map(Json)
        .map_err(ProblemResponse::from);
    observe("children.list", result)
}

#[derive(Debug, Deserialize)]
pub struct CreateChildRequest {
    pub name: String,
    pub birth_date: String,
    pub country: String,
    #[serde(default)]
    pub clinic_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateChildResponse {
    #[serde(flatten)]
    pub detail: ChildDetail,
    /// `false` when no national schedule exists for the child's country.
    pub guidelines_available: bool,
}

pub async fn create_child(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    body: Result<Json<CreateChildRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateChildResponse>)> {
    observe("children.create", create_child_inner(&state, &owner_id, body).await)
}

async fn create_child_inner(
    state: &AppState,
    owner_id: &str,
    body: Result<Json<CreateChildRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateChildResponse>)> {
    let Json(body) = body?;
    require_non_empty("name", &body.name)?;
    require_non_empty("country", &body.country)?;
    let birth_date = parse_iso_date(&body.birth_date)?;

    let now = state.now();
    let owner = load_owner(state.storage(), owner_id, OwnerKind::Parent).await?;
    let today = local_today(now, &owner.timezone).map_err(ViewError::from)?;
    if birth_date > today {
        return Err(ProblemResponse::bad_request(
            "invalid_birth_date",
            "birth_date must not be in the future",
        ));
    }

    if let Some(clinic_id) = body.clinic_id.as_deref() {
        match load_owner(state.storage(), clinic_id, OwnerKind::Clinic).await {
            Ok(_) => {}
            Err(ViewError::Owner(OwnerError::NotFound) | ViewError::WrongOwnerKind(_)) => {
                return Err(ProblemResponse::bad_request(
                    "unknown_clinic",
                    "clinic_id does not name a clinic",
                ));
            }
            Err(err) => return Err(err.into()),
        }
    }

    let country = normalize_country(&body.country);
    let schedule = state.schedules().generate(&country, birth_date);
    let guidelines_available = !schedule.is_empty();
    counter!("schedule_doses_generated_total").increment(schedule.len() as u64);

    let (child, records) = state
        .storage()
        .children()
        .create_with_schedule(
            &NewChild {
                owner_id,
                clinic_id: body.clinic_id.as_deref(),
                name: body.name.trim(),
                birth_date,
                country: &country,
                created_at: now,
            },
            &schedule,
        )
        .await?;

    info!(
        stage = "api",
        child_id = %child.id,
        %country,
        doses = records.len(),
        guidelines_available,
        "child created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateChildResponse {
            detail: ChildDetail::new(child, records, today),
            guidelines_available,
        }),
    ))
}

pub async fn get_child(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
) -> ApiResult<Json<ChildDetail>> {
    let result = build_child_detail(state.storage(), &child_id, state.now())
        .await
        .map(Json)
        .map_err(ProblemResponse::from);
    observe("children.get", result)
}

pub async fn delete_child(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
) -> ApiResult<StatusCode> {
    let result = state
        .storage()
        .children()
        .delete(&child_id)
        .await
        .map(|_| {
            info!(stage = "api", %child_id, "child deleted");
            StatusCode::NO_CONTENT
        })
        .map_err(ProblemResponse::from);
    observe("children.delete", result)
}

#[derive(Debug, Deserialize)]
pub struct LogDoseRequest {
    pub vaccine_name: String,
    pub vaccine_code: String,
    pub dose_number: u32,
    pub scheduled_date: String,
    #[serde(default)]
    pub administered_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn log_dose(
    State(state): State<AppState>,
    Path(child_id): Path<String>,
    body: Result<Json<LogDoseRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecordView>)> {
    observe("records.create", log_dose_inner(&state, &child_id, body).await)
}

async fn log_dose_inner(
    state: &AppState,
    child_id: &str,
    body: Result<Json<LogDoseRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecordView>)> {
    let Json(body) = body?;
    require_non_empty("vaccine_name", &body.vaccine_name)?;
    require_non_empty("vaccine_code", &body.vaccine_code)?;
    let scheduled_date = parse_iso_date(&body.scheduled_date)?;
    let administered_date = parse_optional_iso_date(body.administered_date.as_deref())?;

    let now = state.now();
    let child = state.storage().children().fetch(child_id).await?;
    let today = today_for_child(state.storage(), &child, now).await?;
    reject_future_administration(administered_date, today)?;

    let status = if administered_date.is_some() {
        VaccinationStatus::Completed
    } else {
        VaccinationStatus::Scheduled
    };
    let vaccine_code = body.vaccine_code.trim().to_ascii_uppercase();

    let record = state
        .storage()
        .records()
        .insert(&NewRecord {
            child_id,
            vaccine_name: body.vaccine_name.trim(),
            vaccine_code: &vaccine_code,
            dose_number: body.dose_number,
            scheduled_date,
            administered_date,
            status,
            notes: body.notes.as_deref(),
            updated_at: now,
        })
        .await?;

    info!(stage = "api", record_id = %record.id, %child_id, "dose logged");
    Ok((StatusCode::CREATED, Json(RecordView::new(record, today))))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdministerRequest {
    #[serde(default)]
    pub administered_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn administer_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<RecordView>> {
    observe("records.administer", administer_inner(&state, &record_id, &body).await)
}

async fn administer_inner(
    state: &AppState,
    record_id: &str,
    body: &Bytes,
) -> ApiResult<Json<RecordView>> {
    let body: AdministerRequest = optional_body(body)?;
    let now = state.now();
    let today = today_for_record(state, record_id).await?;
    let administered_date =
        parse_optional_iso_date(body.administered_date.as_deref())?.unwrap_or(today);
    reject_future_administration(Some(administered_date), today)?;

    let record = state
        .storage()
        .records()
        .mark_administered(record_id, administered_date, body.notes.as_deref(), now)
        .await?;

    info!(stage = "api", %record_id, %administered_date, "dose administered");
    Ok(Json(RecordView::new(record, today)))
}

#[derive(Debug, Default, Deserialize)]
pub struct SkipRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn skip_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<RecordView>> {
    observe("records.skip", skip_inner(&state, &record_id, &body).await)
}

async fn skip_inner(
    state: &AppState,
    record_id: &str,
    body: &Bytes,
) -> ApiResult<Json<RecordView>> {
    let body: SkipRequest = optional_body(body)?;
    let today = today_for_record(state, record_id).await?;
    let record = state
        .storage()
        .records()
        .mark_skipped(record_id, body.notes.as_deref(), state.now())
        .await?;

    info!(stage = "api", %record_id, "dose skipped");
    Ok(Json(RecordView::new(record, today)))
}

async fn today_for_record(state: &AppState, record_id: &str) -> ApiResult<NaiveDate> {
    let record = state.storage().records().fetch(record_id).await?;
    let child = state.storage().children().fetch(&record.child_id).await?;
    Ok(today_for_child(state.storage(), &child, state.now()).await?)
}

fn reject_future_administration(date: Option<NaiveDate>, today: NaiveDate) -> ApiResult<()> {
    match date {
        Some(date) if date > today => Err(ProblemResponse::bad_request(
            "invalid_administered_date",
            "administered_date must not be in the future",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Serialize)]
pub struct SupportedCountries {
    pub countries: Vec<&'static str>,
}

pub async fn list_schedules(State(state): State<AppState>) -> Json<SupportedCountries> {
    counter!("api_requests_total", "route" => "schedules.list", "result" => "ok").increment(1);
    Json(SupportedCountries {
        countries: state.schedules().supported_countries(),
    })
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub birth_date: String,
}

#[derive(Debug, Serialize)]
pub struct SchedulePreview {
    pub country: String,
    pub birth_date: NaiveDate,
    pub guidelines_available: bool,
    pub doses: Vec<ScheduledDose>,
}

pub async fn preview_schedule(
    State(state): State<AppState>,
    Path(country): Path<String>,
    query: Result<Query<PreviewQuery>, QueryRejection>,
) -> ApiResult<Json<SchedulePreview>> {
    observe("schedules.preview", preview_inner(&state, &country, query))
}

fn preview_inner(
    state: &AppState,
    country: &str,
    query: Result<Query<PreviewQuery>, QueryRejection>,
) -> ApiResult<Json<SchedulePreview>> {
    let Query(query) = query?;
    let birth_date = parse_iso_date(&query.birth_date)?;
    let country = normalize_country(country);
    let doses = state.schedules().generate(&country, birth_date);
    Ok(Json(SchedulePreview {
        guidelines_available: !doses.is_empty(),
        country,
        birth_date,
        doses,
    }))
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    query: Result<Query<NotificationQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Notification>>> {
    observe(
        "notifications.list",
        list_notifications_inner(&state, &owner_id, query).await,
    )
}

async fn list_notifications_inner(
    state: &AppState,
    owner_id: &str,
    query: Result<Query<NotificationQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Notification>>> {
    let Query(query) = query?;
    state.storage().owners().fetch(owner_id).await?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_NOTIFICATION_LIMIT)
        .clamp(1, MAX_NOTIFICATION_LIMIT);
    let notifications = state
        .storage()
        .notifications()
        .list_for_owner(owner_id, limit)
        .await?;
    Ok(Json(notifications))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> ApiResult<StatusCode> {
    let result = state
        .storage()
        .notifications()
        .mark_read(&notification_id, state.now())
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(ProblemResponse::from);
    observe("notifications.read", result)
}
