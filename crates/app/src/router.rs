use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use vaxtrack_core::ScheduleGenerator;
use vaxtrack_storage::Database;

use crate::api;
use crate::clock::{system_clock, Clock};
use crate::telemetry;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    clock: Clock,
    schedules: ScheduleGenerator,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database) -> Self {
        Self {
            metrics,
            storage,
            clock: system_clock(),
            schedules: ScheduleGenerator::default(),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn schedules(&self) -> &ScheduleGenerator {
        &self.schedules
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/owners", post(api::create_owner))
        .route("/owners/:owner_id/dashboard", get(api::owner_dashboard))
        .route(
            "/owners/:owner_id/children",
            get(api::list_children).post(api::create_child),
        )
        .route(
            "/owners/:owner_id/notifications",
            get(api::list_notifications),
        )
        .route("/clinics/:clinic_id/dashboard", get(api::clinic_dashboard))
        .route(
            "/children/:child_id",
            get(api::get_child).delete(api::delete_child),
        )
        .route("/children/:child_id/records", post(api::log_dose))
        .route("/records/:record_id/administer", post(api::administer_record))
        .route("/records/:record_id/skip", post(api::skip_record))
        .route("/schedules", get(api::list_schedules))
        .route("/schedules/:country", get(api::preview_schedule))
        .route(
            "/notifications/:notification_id/read",
            post(api::mark_notification_read),
        )
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use chrono::TimeZone;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::reminders::ReminderWorker;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 9, 0, 0).unwrap()
    }

    async fn setup_state() -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let database = Database::connect_in_memory().await.expect("connect");
        database.run_migrations().await.expect("migrations");
        let now = fixed_now();
        AppState::new(metrics, database).with_clock(Arc::new(move || now))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("handler should respond");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    async fn create_owner(app: &Router, kind: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/owners",
            Some(json!({ "kind": kind, "display_name": format!("{kind} account") })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("owner id").to_string()
    }

    async fn create_child(app: &Router, owner_id: &str, body: Value) -> (StatusCode, Value) {
        send(app, "POST", &format!("/owners/{owner_id}/children"), Some(body)).await
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(setup_state().await);
        let (status, _) = send(&app, "GET", "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let body = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn new_child_receives_national_schedule() {
        let app = app_router(setup_state().await);
        let owner_id = create_owner(&app, "parent").await;

        let (status, body) = create_child(
            &app,
            &owner_id,
            json!({ "name": "Ada", "birth_date": "2024-01-01", "country": "us" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["guidelines_available"], true);
        assert_eq!(body["child"]["country"], "US");
        assert_eq!(body["records"].as_array().expect("records").len(), 28);
        assert_eq!(body["stats"]["total"], 28);
        assert_eq!(body["stats"]["overdue"], 17);
        assert_eq!(body["stats"]["upcoming"], 11);
        assert_eq!(body["stats"]["completed"], 0);
        assert_eq!(body["percent_complete"], 0);

        let (status, dashboard) =
            send(&app, "GET", &format!("/owners/{owner_id}/dashboard"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["as_of"], "2024-08-01");
        assert_eq!(dashboard["children"], 1);
        assert_eq!(dashboard["total"], 28);
        assert_eq!(dashboard["overdue"], 17);

        let (status, children) =
            send(&app, "GET", &format!("/owners/{owner_id}/children"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(children.as_array().expect("children").len(), 1);
        assert_eq!(children[0]["stats"]["upcoming"], 11);
    }

    #[tokio::test]
    async fn unsupported_country_yields_empty_schedule() {
        let app = app_router(setup_state().await);
        let owner_id = create_owner(&app, "parent").await;

        let (status, body) = create_child(
            &app,
            &owner_id,
            json!({ "name": "Zed", "birth_date": "2024-01-01", "country": "ZZ" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["guidelines_available"], false);
        assert_eq!(body["stats"]["total"], 0);
        assert_eq!(body["percent_complete"], 0);
    }

    #[tokio::test]
    async fn rejects_invalid_child_input() {
        let app = app_router(setup_state().await);
        let owner_id = create_owner(&app, "parent").await;

        let (status, body) = create_child(
            &app,
            &owner_id,
            json!({ "name": "Ada", "birth_date": "01/01/2024", "country": "US" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "invalid_date");

        let (status, body) = create_child(
            &app,
            &owner_id,
            json!({ "name": "Ada", "birth_date": "2024-09-01", "country": "US" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "invalid_birth_date");

        let (status, body) = create_child(
            &app,
            "missing",
            json!({ "name": "Ada", "birth_date": "2024-01-01", "country": "US" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["type"], "owner_not_found");
    }

    #[tokio::test]
    async fn rejects_unknown_timezone_for_owner() {
        let app = app_router(setup_state().await);
        let (status, body) = send(
            &app,
            "POST",
            "/owners",
            Some(json!({ "kind": "parent", "display_name": "Parent", "timezone": "Mars/Olympus" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "invalid_timezone");
    }

    #[tokio::test]
    async fn administer_and_skip_update_progress() {
        let app = app_router(setup_state().await);
        let owner_id = create_owner(&app, "parent").await;
        let (_, child) = create_child(
            &app,
            &owner_id,
            json!({ "name": "Ada", "birth_date": "2024-01-01", "country": "US" }),
        )
        .await;
        let child_id = child["child"]["id"].as_str().expect("child id").to_string();
        let first = child["records"][0]["id"].as_str().expect("record id").to_string();
        let second = child["records"][1]["id"].as_str().expect("record id").to_string();

        let (status, record) =
            send(&app, "POST", &format!("/records/{first}/administer"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "completed");
        assert_eq!(record["stored_status"], "completed");
        assert_eq!(record["administered_date"], "2024-08-01");

        let (status, problem) = send(&app, "POST", &format!("/records/{first}/skip"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(problem["type"], "already_administered");

        let (status, record) = send(
            &app,
            "POST",
            &format!("/records/{second}/skip"),
            Some(json!({ "notes": "contraindicated" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "skipped");
        assert_eq!(record["notes"], "contraindicated");

        let (status, problem) = send(
            &app,
            "POST",
            &format!("/records/{second}/administer"),
            Some(json!({ "administered_date": "2024-09-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["type"], "invalid_administered_date");

        let (status, detail) = send(&app, "GET", &format!("/children/{child_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["stats"]["completed"], 1);
        assert_eq!(detail["stats"]["skipped"], 1);
        assert_eq!(detail["stats"]["overdue"], 15);
        assert_eq!(detail["percent_complete"], 3);
    }

    #[tokio::test]
    async fn logging_a_duplicate_dose_conflicts() {
        let app = app_router(setup_state().await);
        let owner_id = create_owner(&app, "parent").await;
        let (_, child) = create_child(
            &app,
            &owner_id,
            json!({ "name": "Ada", "birth_date": "2024-01-01", "country": "ZZ" }),
        )
        .await;
        let child_id = child["child"]["id"].as_str().expect("child id").to_string();
        let dose = json!({
            "vaccine_name": "Influenza",
            "vaccine_code": "flu",
            "dose_number": 1,
            "scheduled_date": "2024-08-10",
        });

        let (status, record) = send(
            &app,
            "POST",
            &format!("/children/{child_id}/records"),
            Some(dose.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["vaccine_code"], "FLU");
        assert_eq!(record["status"], "due_soon");
        assert_eq!(record["days_until"], 9);

        let (status, problem) =
            send(&app, "POST", &format!("/children/{child_id}/records"), Some(dose)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(problem["type"], "duplicate_dose");
    }

    #[tokio::test]
    async fn clinic_dashboard_covers_linked_children() {
        let app = app_router(setup_state().await);
        let parent_id = create_owner(&app, "parent").await;
        let clinic_id = create_owner(&app, "clinic").await;

        let (status, _) = create_child(
            &app,
            &parent_id,
            json!({
                "name": "Ada",
                "birth_date": "2024-01-01",
                "country": "US",
                "clinic_id": clinic_id,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, problem) = create_child(
            &app,
            &parent_id,
            json!({
                "name": "Bo",
                "birth_date": "2024-01-01",
                "country": "US",
                "clinic_id": parent_id,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["type"], "unknown_clinic");

        let (status, dashboard) =
            send(&app, "GET", &format!("/clinics/{clinic_id}/dashboard"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["children"], 1);
        assert_eq!(dashboard["overdue"], 17);

        let (status, _) = send(&app, "GET", &format!("/clinics/{parent_id}/dashboard"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_owner_dashboard_is_not_found() {
        let app = app_router(setup_state().await);
        let (status, body) = send(&app, "GET", "/owners/missing/dashboard", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["type"], "owner_not_found");
    }

    #[tokio::test]
    async fn schedule_preview_lists_dated_doses() {
        let app = app_router(setup_state().await);

        let (status, body) = send(&app, "GET", "/schedules", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["countries"], json!(["GB", "IN", "US"]));

        let (status, body) =
            send(&app, "GET", "/schedules/us?birth_date=2024-01-01", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["country"], "US");
        assert_eq!(body["guidelines_available"], true);
        let doses = body["doses"].as_array().expect("doses");
        assert_eq!(doses.len(), 28);
        assert_eq!(doses[0]["scheduled_date"], "2024-01-01");

        let (status, body) = send(&app, "GET", "/schedules/us?birth_date=soon", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "invalid_date");
    }

    #[tokio::test]
    async fn deleted_child_is_gone() {
        let app = app_router(setup_state().await);
        let owner_id = create_owner(&app, "parent").await;
        let (_, child) = create_child(
            &app,
            &owner_id,
            json!({ "name": "Ada", "birth_date": "2024-01-01", "country": "GB" }),
        )
        .await;
        let child_id = child["child"]["id"].as_str().expect("child id").to_string();

        let (status, _) = send(&app, "DELETE", &format!("/children/{child_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/children/{child_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["type"], "child_not_found");

        let (status, _) = send(&app, "DELETE", &format!("/children/{child_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reminders_are_listed_and_marked_read() {
        let state = setup_state().await;
        let app = app_router(state.clone());
        let owner_id = create_owner(&app, "parent").await;
        create_child(
            &app,
            &owner_id,
            json!({ "name": "Ada", "birth_date": "2024-01-01", "country": "US" }),
        )
        .await;

        let now = fixed_now();
        ReminderWorker::new(state.storage().clone(), std::time::Duration::from_secs(60))
            .with_clock(Arc::new(move || now))
            .run_once()
            .await
            .expect("sweep");

        let (status, body) = send(
            &app,
            "GET",
            &format!("/owners/{owner_id}/notifications?limit=5"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let notifications = body.as_array().expect("notifications");
        assert_eq!(notifications.len(), 5);
        assert!(notifications.iter().all(|n| n["kind"] == "overdue"));

        let id = notifications[0]["id"].as_str().expect("id").to_string();
        let (status, _) = send(&app, "POST", &format!("/notifications/{id}/read"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) =
            send(&app, "GET", &format!("/owners/{owner_id}/notifications"), None).await;
        assert_eq!(status, StatusCode::OK);
        let read = body
            .as_array()
            .expect("notifications")
            .iter()
            .filter(|n| n["id"] == id.as_str())
            .all(|n| n["read_at"].is_string());
        assert!(read);

        let (status, _) = send(&app, "POST", "/notifications/missing/read", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn first_record(app: &Router, owner_id: &str) -> (String, String) {
        let (_, child) = create_child(
            app,
            owner_id,
            json!({ "name": "Ada", "birth_date": "2024-01-01", "country": "US" }),
        )
        .await;
        let child_id = child["child"]["id"].as_str().expect("child id").to_string();
        let record_id = child["records"][0]["id"].as_str().expect("record id").to_string();
        (child_id, record_id)
    }

    #[tokio::test]
    async fn malformed_administer_body_leaves_record_untouched() {
        let app = app_router(setup_state().await);
        let owner_id = create_owner(&app, "parent").await;
        let (child_id, record_id) = first_record(&app, &owner_id).await;

        let (status, problem) = send(
            &app,
            "POST",
            &format!("/records/{record_id}/administer"),
            Some(json!({ "administered_date": 20240105, "notes": "lot 7" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["type"], "invalid_body");

        let (status, problem) = send(
            &app,
            "POST",
            &format!("/records/{record_id}/skip"),
            Some(json!({ "notes": 7 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["type"], "invalid_body");

        let (_, detail) = send(&app, "GET", &format!("/children/{child_id}"), None).await;
        let record = &detail["records"][0];
        assert_eq!(record["id"], record_id.as_str());
        assert_eq!(record["status"], "overdue");
        assert!(record.get("administered_date").is_none());
        assert!(record.get("notes").is_none());

        let (status, record) = send(
            &app,
            "POST",
            &format!("/records/{record_id}/administer"),
            Some(json!({ "administered_date": "2024-01-05", "notes": "lot 7" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["administered_date"], "2024-01-05");
        assert_eq!(record["notes"], "lot 7");
    }

    #[tokio::test]
    async fn extractor_rejections_render_problem_json() {
        let app = app_router(setup_state().await);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/schedules/us")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/problem+json"
        );
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let problem: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(problem["type"], "invalid_query");

        let (status, problem) = send(
            &app,
            "POST",
            "/owners",
            Some(json!({ "kind": "grandparent", "display_name": "Nan" })),
        )
        .await;
        assert!(status.is_client_error());
        assert_eq!(problem["type"], "invalid_body");

        let (status, problem) = send(
            &app,
            "GET",
            "/owners/missing/notifications?limit=many",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["type"], "invalid_query");
    }

    #[tokio::test]
    async fn corrupt_owner_rows_are_server_errors() {
        let state = setup_state().await;
        let app = app_router(state.clone());
        let parent_id = create_owner(&app, "parent").await;
        let clinic_id = create_owner(&app, "clinic").await;

        sqlx::query("UPDATE owners SET created_at = 'not a timestamp' WHERE id = ?")
            .bind(&clinic_id)
            .execute(state.storage().pool())
            .await
            .expect("corrupt clinic");
        let (status, problem) = create_child(
            &app,
            &parent_id,
            json!({
                "name": "Ada",
                "birth_date": "2024-01-01",
                "country": "US",
                "clinic_id": clinic_id,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem["type"], "internal_error");

        sqlx::query("UPDATE owners SET timezone = 'Mars/Olympus' WHERE id = ?")
            .bind(&parent_id)
            .execute(state.storage().pool())
            .await
            .expect("corrupt timezone");
        let (status, problem) = create_child(
            &app,
            &parent_id,
            json!({ "name": "Bo", "birth_date": "2024-01-01", "country": "US" }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem["type"], "internal_error");
    }
}
