use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use super::store::StoreError;

/// Why an attendance operation was rejected. Each precondition violation gets
/// its own kind so clients can render an actionable message instead of a
/// blank failure.
#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,
    #[display(fmt = "Not checked in today")]
    NotCheckedIn,
    #[display(fmt = "Already checked out")]
    AlreadyCheckedOut,
    #[display(fmt = "Already on break")]
    AlreadyOnBreak,
    #[display(fmt = "Not on break")]
    NotOnBreak,
    #[display(fmt = "No attendance record for today")]
    NoAttendanceToday,
    #[display(fmt = "Attendance record not found")]
    NotFound,
    #[display(fmt = "storage failure: {}", _0)]
    Storage(StoreError),
}

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        AttendanceError::Storage(err)
    }
}

impl actix_web::ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::NotFound => StatusCode::NOT_FOUND,
            AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            // logged server-side, surfaced generically
            AttendanceError::Storage(err) => {
                tracing::error!(error = %err, "attendance storage failure");
                HttpResponse::InternalServerError().json(json!({
                    "message": "Failed to process request"
                }))
            }
            other => HttpResponse::build(other.status_code()).json(json!({
                "message": other.to_string()
            })),
        }
    }
}
