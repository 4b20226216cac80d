use crate::api::attendance::{
    BreakEndResponse, BreakStartResponse, CheckInResponse, CheckOutResponse,
};
use crate::attendance::service::{
    HistoryEntry, HistoryPage, LiveEntry, LiveStatus, LiveSummary, Pagination, TodayStatus,
};
use crate::model::attendance::{
    AttendanceDay, AttendanceRecord, AttendanceStatus, BreakRecord, UserSummary,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timeclock API",
        version = "1.0.0",
        description = r#"
## Attendance & Break Tracking Service

Daily check-in/check-out and break tracking for one business day per user,
with a live presence snapshot and attendance history for management.

### Key Features
- **Check-in / Check-out**
  - One attendance record per user per business day; work and break totals
    finalized at check-out
- **Breaks**
  - At most one active break at a time; totals recomputed on every break end
- **Live Status**
  - Real-time partition of today's records into working / on-break / checked-out
- **History**
  - Own history for employees, filtered and paginated history for management

### Security
All attendance endpoints require **JWT Bearer authentication**. The live
status and cross-user history views are restricted to admin, HR and manager
roles.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::break_start,
        crate::api::attendance::break_end,
        crate::api::attendance::today,
        crate::api::attendance::my_history,
        crate::api::attendance::all_history,
        crate::api::attendance::live_status,
    ),
    components(
        schemas(
            AttendanceStatus,
            AttendanceRecord,
            BreakRecord,
            AttendanceDay,
            UserSummary,
            CheckInResponse,
            CheckOutResponse,
            BreakStartResponse,
            BreakEndResponse,
            TodayStatus,
            LiveEntry,
            LiveSummary,
            LiveStatus,
            HistoryEntry,
            Pagination,
            HistoryPage
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance and break tracking APIs"),
    )
)]
pub struct ApiDoc;
