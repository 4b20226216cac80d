use crate::attendance::error::AttendanceError;
use crate::attendance::mysql::MySqlAttendanceStore;
use crate::attendance::service::{AttendanceService, HistoryPage, LiveStatus, TodayStatus};
use crate::attendance::store::{AttendanceStore, DateRange, HistoryFilter};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::{AttendanceDay, BreakRecord};
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub attendance: AttendanceDay,
    #[schema(format = "date-time", value_type = String)]
    pub check_in_time: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckOutResponse {
    #[schema(example = "Checked out successfully")]
    pub message: String,
    pub attendance: AttendanceDay,
    #[schema(format = "date-time", value_type = String)]
    pub check_out_time: DateTime<Utc>,
    #[schema(example = 455)]
    pub total_work_time: i64,
    #[schema(example = 45)]
    pub total_break_time: i64,
}

#[derive(Serialize, ToSchema)]
pub struct BreakStartResponse {
    #[schema(example = "Break started")]
    pub message: String,
    pub break_record: BreakRecord,
    #[schema(format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct BreakEndResponse {
    #[schema(example = "Break ended")]
    pub message: String,
    pub break_record: BreakRecord,
    #[schema(example = 15)]
    pub duration: i64,
    #[schema(example = 45)]
    pub total_break_time: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MyHistoryQuery {
    /// Inclusive lower bound on the record date
    #[param(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the record date
    #[param(example = "2026-01-31", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AllHistoryQuery {
    /// Single day to report on
    #[param(example = "2026-01-05", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    /// Filter by user
    pub user_id: Option<u64>,
    /// Filter by department
    pub department_id: Option<u64>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Rows per page
    pub limit: Option<u32>,
}

fn service(
    pool: &web::Data<MySqlPool>,
    config: &web::Data<Config>,
) -> AttendanceService<MySqlAttendanceStore> {
    AttendanceService::new(
        MySqlAttendanceStore::new(pool.get_ref().clone()),
        config.business_tz,
    )
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 200, description = "Checked in successfully", body = CheckInResponse),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let out = service(&pool, &config)
        .check_in(auth.user_id, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(CheckInResponse {
        message: "Checked in successfully".to_string(),
        attendance: out.day,
        check_in_time: out.check_in_time,
    }))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully", body = CheckOutResponse),
        (status = 400, description = "Not checked in, or already checked out", body = Object, example = json!({
            "message": "Already checked out"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let out = service(&pool, &config)
        .check_out(auth.user_id, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(CheckOutResponse {
        message: "Checked out successfully".to_string(),
        attendance: out.day,
        check_out_time: out.check_out_time,
        total_work_time: out.total_work_time,
        total_break_time: out.total_break_time,
    }))
}

/// Start a break
#[utoipa::path(
    post,
    path = "/api/v1/attendance/break-start",
    responses(
        (status = 200, description = "Break started", body = BreakStartResponse),
        (status = 400, description = "Not checked in, checked out, or already on break", body = Object, example = json!({
            "message": "Already on break"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn break_start(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let out = service(&pool, &config)
        .break_start(auth.user_id, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(BreakStartResponse {
        message: "Break started".to_string(),
        break_record: out.break_record,
        start_time: out.start_time,
    }))
}

/// End the active break
#[utoipa::path(
    post,
    path = "/api/v1/attendance/break-end",
    responses(
        (status = 200, description = "Break ended", body = BreakEndResponse),
        (status = 400, description = "No attendance today, or not on break", body = Object, example = json!({
            "message": "Not on break"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn break_end(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let out = service(&pool, &config)
        .break_end(auth.user_id, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(BreakEndResponse {
        message: "Break ended".to_string(),
        break_record: out.break_record,
        duration: out.duration,
        total_break_time: out.total_break_time,
    }))
}

/// Today's attendance status for the caller
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    responses(
        (status = 200, description = "Today's record and derived flags", body = TodayStatus),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let status = service(&pool, &config)
        .today(auth.user_id, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(status))
}

/// The caller's own attendance history
#[utoipa::path(
    get,
    path = "/api/v1/attendance/my",
    params(MyHistoryQuery),
    responses(
        (status = 200, description = "Attendance records, most recent first", body = [AttendanceDay]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<MyHistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let range = DateRange {
        start: query.start_date,
        end: query.end_date,
    };
    let records = service(&pool, &config)
        .history(auth.user_id, range)
        .await?;

    Ok(HttpResponse::Ok().json(records))
}

/// All attendance records (management)
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AllHistoryQuery),
    responses(
        (status = 200, description = "Paginated attendance records", body = HistoryPage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn all_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AllHistoryQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_management()?;

    let store = MySqlAttendanceStore::new(pool.get_ref().clone());

    let mut filter = HistoryFilter {
        date: query.date,
        user_id: query.user_id,
        department_id: query.department_id,
        user_scope: None,
    };

    // Managers see the employee population; admin and HR see everyone
    if auth.role == Role::Manager {
        let scope = store
            .user_ids_with_role(Role::Employee)
            .await
            .map_err(AttendanceError::from)?;
        filter.user_scope = Some(scope);
    }

    let svc = AttendanceService::new(store, config.business_tz);
    let page = svc
        .all_history(&filter, query.page.unwrap_or(1), query.limit.unwrap_or(20))
        .await?;

    Ok(HttpResponse::Ok().json(page))
}

/// Live presence snapshot (management)
#[utoipa::path(
    get,
    path = "/api/v1/attendance/live-status",
    responses(
        (status = 200, description = "Who is working, on break or checked out right now", body = LiveStatus),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn live_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_management()?;

    let live = service(&pool, &config).live_status(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(live))
}
