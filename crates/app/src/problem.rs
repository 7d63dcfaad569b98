use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use vaxtrack_core::InvalidDateError;
use vaxtrack_storage::{ChildError, NotificationError, OwnerError, RecordError};

use crate::clock::InvalidTimezone;
use crate::state::ViewError;

#[derive(Debug, Serialize)]
struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    detail: String,
}

#[derive(Debug)]
pub struct ProblemResponse {
    status: StatusCode,
    body: ProblemDetails,
}

impl ProblemResponse {
    pub fn new<S: Into<String>>(status: StatusCode, problem_type: &'static str, detail: S) -> Self {
        Self {
            status,
            body: ProblemDetails {
                problem_type,
                title: status.canonical_reason().unwrap_or("error"),
                detail: detail.into(),
            },
        }
    }

    pub fn bad_request<S: Into<String>>(problem_type: &'static str, detail: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, problem_type, detail)
    }

    pub fn not_found<S: Into<String>>(problem_type: &'static str, detail: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, problem_type, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

fn internal_error(source: &dyn std::fmt::Display, detail: &'static str) -> ProblemResponse {
    error!(stage = "api", error = %source, "{detail}");
    ProblemResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", detail)
}

impl From<JsonRejection> for ProblemResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "invalid_body", rejection.body_text())
    }
}

impl From<QueryRejection> for ProblemResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("invalid_query", rejection.body_text())
    }
}

impl From<serde_json::Error> for ProblemResponse {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request("invalid_body", err.to_string())
    }
}

impl From<InvalidDateError> for ProblemResponse {
    fn from(err: InvalidDateError) -> Self {
        Self::bad_request("invalid_date", err.to_string())
    }
}

impl From<InvalidTimezone> for ProblemResponse {
    fn from(err: InvalidTimezone) -> Self {
        Self::bad_request("invalid_timezone", err.to_string())
    }
}

impl From<OwnerError> for ProblemResponse {
    fn from(err: OwnerError) -> Self {
        match err {
            OwnerError::NotFound => Self::not_found("owner_not_found", "owner does not exist"),
            other => internal_error(&other, "failed to load owner"),
        }
    }
}

impl From<ChildError> for ProblemResponse {
    fn from(err: ChildError) -> Self {
        match err {
            ChildError::NotFound => Self::not_found("child_not_found", "child does not exist"),
            ChildError::UnknownOwner => {
                Self::bad_request("unknown_owner", "owner or clinic does not exist")
            }
            other => internal_error(&other, "failed to access child"),
        }
    }
}

impl From<RecordError> for ProblemResponse {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound => {
                Self::not_found("record_not_found", "vaccination record does not exist")
            }
            RecordError::MissingChild => Self::not_found("child_not_found", "child does not exist"),
            RecordError::DuplicateDose => Self::new(
                StatusCode::CONFLICT,
                "duplicate_dose",
                "a record for this vaccine dose already exists",
            ),
            RecordError::AlreadyAdministered => Self::new(
                StatusCode::CONFLICT,
                "already_administered",
                "an administered dose cannot be skipped",
            ),
            other => internal_error(&other, "failed to access vaccination records"),
        }
    }
}

impl From<NotificationError> for ProblemResponse {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound => {
                Self::not_found("notification_not_found", "notification does not exist")
            }
            other => internal_error(&other, "failed to access notifications"),
        }
    }
}

impl From<ViewError> for ProblemResponse {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::Owner(inner) => inner.into(),
            ViewError::Child(inner) => inner.into(),
            ViewError::Record(inner) => inner.into(),
            ViewError::WrongOwnerKind(kind) => Self::not_found(
                "owner_not_found",
                format!("no {} account with this id", kind.as_str()),
            ),
            ViewError::Timezone(inner) => internal_error(&inner, "owner has an invalid timezone"),
        }
    }
}
