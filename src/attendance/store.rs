use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;

use crate::model::attendance::{AttendanceDay, BreakRecord, UserSummary};
use crate::model::role::Role;

use super::clock::DayBucket;

#[derive(Debug, Display)]
pub enum StoreError {
    /// The (user_id, date) unique key rejected an insert: a concurrent
    /// check-in already created today's record.
    #[display(fmt = "attendance record already exists for this day")]
    DuplicateDay,
    /// A guarded update matched no row: the record or break was concurrently
    /// finalized between our read and our write.
    #[display(fmt = "row was concurrently finalized")]
    Stale,
    #[display(fmt = "{}", _0)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Values for closing one break, computed by the service and applied by the
/// store inside the same transaction as the write that depends on them.
#[derive(Debug, Clone, Copy)]
pub struct BreakClose {
    pub break_id: u64,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
}

/// Optional bounds on the single-user history view (inclusive dates).
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Filters for the paginated management history view.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub date: Option<NaiveDate>,
    pub user_id: Option<u64>,
    pub department_id: Option<u64>,
    /// Restricts rows to a caller-visible population; resolved by the HTTP
    /// layer, never by this subsystem.
    pub user_scope: Option<Vec<u64>>,
}

/// A day row joined with who it belongs to, for the management views.
#[derive(Debug, Clone)]
pub struct DayWithUser {
    pub day: AttendanceDay,
    pub user: UserSummary,
}

/// Storage contract of the attendance subsystem.
///
/// Every mutating method is atomic in the implementation. Guarded writes
/// report `StoreError::Stale` when the targeted row was already finalized,
/// which lets the service re-validate its preconditions inside the write.
#[allow(async_fn_in_trait)]
pub trait AttendanceStore {
    /// Today's record plus its breaks (ordered by creation), if any.
    async fn find_day(
        &self,
        user_id: u64,
        day: &DayBucket,
    ) -> Result<Option<AttendanceDay>, StoreError>;

    /// Creates today's record with `check_in` set and `status = present`.
    async fn create_checked_in(
        &self,
        user_id: u64,
        day: &DayBucket,
        now: DateTime<Utc>,
    ) -> Result<AttendanceDay, StoreError>;

    /// Sets `check_in` on an existing record that lacks one. Normally
    /// unreachable; kept as the defensive half of check-in.
    async fn set_check_in(&self, record_id: u64, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// One transaction: optionally closes the still-active break, then writes
    /// `check_out` and both totals, guarded on `check_out IS NULL`.
    async fn finalize_check_out(
        &self,
        record_id: u64,
        now: DateTime<Utc>,
        total_break_time: i64,
        total_work_time: i64,
        close: Option<BreakClose>,
    ) -> Result<(), StoreError>;

    async fn insert_break(
        &self,
        record_id: u64,
        start_time: DateTime<Utc>,
    ) -> Result<BreakRecord, StoreError>;

    /// One transaction: closes the break (guarded on `end_time IS NULL`) and
    /// writes the recomputed `total_break_time` onto the record.
    async fn close_break(
        &self,
        record_id: u64,
        close: BreakClose,
        total_break_time: i64,
    ) -> Result<(), StoreError>;

    /// Bulk fetch of every record for the given day joined with user identity.
    /// One query pass; never one query per user.
    async fn day_for_all_users(&self, day: &DayBucket) -> Result<Vec<DayWithUser>, StoreError>;

    /// One user's history, most recent day first, capped at `limit` rows.
    async fn history(
        &self,
        user_id: u64,
        range: DateRange,
        limit: u32,
    ) -> Result<Vec<AttendanceDay>, StoreError>;

    /// Filtered page of history across users plus the total row count.
    async fn history_page(
        &self,
        filter: &HistoryFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<DayWithUser>, i64), StoreError>;

    /// Ids of every user holding the given role, for visible-population
    /// scoping by the HTTP layer.
    async fn user_ids_with_role(&self, role: Role) -> Result<Vec<u64>, StoreError>;
}
