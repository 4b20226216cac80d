use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;

use crate::model::attendance::{
    AttendanceDay, AttendanceRecord, AttendanceStatus, BreakRecord, UserSummary,
};
use crate::model::role::Role;

use super::clock::DayBucket;
use super::store::{
    AttendanceStore, BreakClose, DateRange, DayWithUser, HistoryFilter, StoreError,
};

const RECORD_COLUMNS: &str =
    "id, user_id, date, check_in, check_out, status, total_break_time, total_work_time";

const BREAK_COLUMNS: &str = "id, attendance_id, start_time, end_time, duration";

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

/// Attendance row joined with user identity for the management views.
#[derive(sqlx::FromRow)]
struct DayUserRow {
    id: u64,
    user_id: u64,
    date: NaiveDate,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    status: AttendanceStatus,
    total_break_time: Option<i64>,
    total_work_time: Option<i64>,
    name: String,
    position: Option<String>,
    department: Option<String>,
}

impl DayUserRow {
    fn split(self) -> (AttendanceRecord, UserSummary) {
        let user = UserSummary {
            id: self.user_id,
            name: self.name,
            position: self.position,
            department: self.department,
        };
        let record = AttendanceRecord {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            check_in: self.check_in,
            check_out: self.check_out,
            status: self.status,
            total_break_time: self.total_break_time,
            total_work_time: self.total_work_time,
        };
        (record, user)
    }
}

#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn breaks_for(&self, record_id: u64) -> Result<Vec<BreakRecord>, StoreError> {
        let sql = format!(
            "SELECT {BREAK_COLUMNS} FROM breaks WHERE attendance_id = ? ORDER BY id"
        );
        let breaks = sqlx::query_as::<_, BreakRecord>(&sql)
            .bind(record_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(breaks)
    }

    /// Breaks for a whole result page in one query, grouped by record id.
    async fn breaks_for_all(
        &self,
        record_ids: &[u64],
    ) -> Result<HashMap<u64, Vec<BreakRecord>>, StoreError> {
        if record_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; record_ids.len()].join(", ");
        let sql = format!(
            "SELECT {BREAK_COLUMNS} FROM breaks WHERE attendance_id IN ({placeholders}) ORDER BY id"
        );

        let mut query = sqlx::query_as::<_, BreakRecord>(&sql);
        for id in record_ids {
            query = query.bind(*id);
        }

        let mut grouped: HashMap<u64, Vec<BreakRecord>> = HashMap::new();
        for b in query.fetch_all(&self.pool).await? {
            grouped.entry(b.attendance_id).or_default().push(b);
        }
        Ok(grouped)
    }

    /// Joins a page of attendance/user rows with their breaks.
    async fn assemble(&self, rows: Vec<DayUserRow>) -> Result<Vec<DayWithUser>, StoreError> {
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        let mut breaks = self.breaks_for_all(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let (record, user) = row.split();
                let breaks = breaks.remove(&record.id).unwrap_or_default();
                DayWithUser {
                    day: AttendanceDay { record, breaks },
                    user,
                }
            })
            .collect())
    }
}

impl AttendanceStore for MySqlAttendanceStore {
    async fn find_day(
        &self,
        user_id: u64,
        day: &DayBucket,
    ) -> Result<Option<AttendanceDay>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ? AND date = ?");
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(day.date)
            .fetch_optional(&self.pool)
            .await?;

        match record {
            Some(record) => {
                let breaks = self.breaks_for(record.id).await?;
                Ok(Some(AttendanceDay { record, breaks }))
            }
            None => Ok(None),
        }
    }

    async fn create_checked_in(
        &self,
        user_id: u64,
        day: &DayBucket,
        now: DateTime<Utc>,
    ) -> Result<AttendanceDay, StoreError> {
        let result =
            sqlx::query("INSERT INTO attendance (user_id, date, check_in, status) VALUES (?, ?, ?, 'present')")
                .bind(user_id)
                .bind(day.date)
                .bind(now)
                .execute(&self.pool)
                .await;

        match result {
            Ok(done) => Ok(AttendanceDay {
                record: AttendanceRecord {
                    id: done.last_insert_id(),
                    user_id,
                    date: day.date,
                    check_in: Some(now),
                    check_out: None,
                    status: AttendanceStatus::Present,
                    total_break_time: None,
                    total_work_time: None,
                },
                breaks: Vec::new(),
            }),
            Err(e) => {
                // Duplicate (user_id, date): a concurrent check-in won the race
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23000") {
                        return Err(StoreError::DuplicateDay);
                    }
                }
                Err(e.into())
            }
        }
    }

    async fn set_check_in(&self, record_id: u64, now: DateTime<Utc>) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE attendance SET check_in = ?, status = 'present' WHERE id = ? AND check_in IS NULL",
        )
        .bind(now)
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(StoreError::Stale);
        }
        Ok(())
    }

    async fn finalize_check_out(
        &self,
        record_id: u64,
        now: DateTime<Utc>,
        total_break_time: i64,
        total_work_time: i64,
        close: Option<BreakClose>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(close) = close {
            let done =
                sqlx::query("UPDATE breaks SET end_time = ?, duration = ? WHERE id = ? AND end_time IS NULL")
                    .bind(close.end_time)
                    .bind(close.duration)
                    .bind(close.break_id)
                    .execute(&mut *tx)
                    .await?;
            if done.rows_affected() == 0 {
                return Err(StoreError::Stale);
            }
        }

        let done = sqlx::query(
            "UPDATE attendance SET check_out = ?, total_break_time = ?, total_work_time = ? \
             WHERE id = ? AND check_out IS NULL",
        )
        .bind(now)
        .bind(total_break_time)
        .bind(total_work_time)
        .bind(record_id)
        .execute(&mut *tx)
        .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::Stale);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_break(
        &self,
        record_id: u64,
        start_time: DateTime<Utc>,
    ) -> Result<BreakRecord, StoreError> {
        let done = sqlx::query("INSERT INTO breaks (attendance_id, start_time) VALUES (?, ?)")
            .bind(record_id)
            .bind(start_time)
            .execute(&self.pool)
            .await?;

        Ok(BreakRecord {
            id: done.last_insert_id(),
            attendance_id: record_id,
            start_time,
            end_time: None,
            duration: None,
        })
    }

    async fn close_break(
        &self,
        record_id: u64,
        close: BreakClose,
        total_break_time: i64,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let done =
            sqlx::query("UPDATE breaks SET end_time = ?, duration = ? WHERE id = ? AND end_time IS NULL")
                .bind(close.end_time)
                .bind(close.duration)
                .bind(close.break_id)
                .execute(&mut *tx)
                .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::Stale);
        }

        sqlx::query("UPDATE attendance SET total_break_time = ? WHERE id = ?")
            .bind(total_break_time)
            .bind(record_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn day_for_all_users(&self, day: &DayBucket) -> Result<Vec<DayWithUser>, StoreError> {
        let sql = format!(
            "SELECT a.{}, u.name, u.position, d.name AS department \
             FROM attendance a \
             JOIN users u ON u.id = a.user_id \
             LEFT JOIN departments d ON d.id = u.department_id \
             WHERE a.date = ? \
             ORDER BY a.id",
            RECORD_COLUMNS.replace(", ", ", a.")
        );

        let rows = sqlx::query_as::<_, DayUserRow>(&sql)
            .bind(day.date)
            .fetch_all(&self.pool)
            .await?;

        self.assemble(rows).await
    }

    async fn history(
        &self,
        user_id: u64,
        range: DateRange,
        limit: u32,
    ) -> Result<Vec<AttendanceDay>, StoreError> {
        // ---------- build WHERE clause dynamically ----------
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ?");
        if range.start.is_some() {
            sql.push_str(" AND date >= ?");
        }
        if range.end.is_some() {
            sql.push_str(" AND date <= ?");
        }
        sql.push_str(" ORDER BY date DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql).bind(user_id);
        if let Some(start) = range.start {
            query = query.bind(start);
        }
        if let Some(end) = range.end {
            query = query.bind(end);
        }
        let records = query.bind(limit).fetch_all(&self.pool).await?;

        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        let mut breaks = self.breaks_for_all(&ids).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let breaks = breaks.remove(&record.id).unwrap_or_default();
                AttendanceDay { record, breaks }
            })
            .collect())
    }

    async fn history_page(
        &self,
        filter: &HistoryFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<DayWithUser>, i64), StoreError> {
        // An empty visible population can match nothing; skip the round trip
        if matches!(&filter.user_scope, Some(scope) if scope.is_empty()) {
            return Ok((Vec::new(), 0));
        }

        let offset = (page - 1) * limit;

        // ---------- WHERE clause ----------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(date) = filter.date {
            where_sql.push_str(" AND a.date = ?");
            args.push(FilterValue::Date(date));
        }
        if let Some(user_id) = filter.user_id {
            where_sql.push_str(" AND a.user_id = ?");
            args.push(FilterValue::U64(user_id));
        }
        if let Some(department_id) = filter.department_id {
            where_sql.push_str(" AND u.department_id = ?");
            args.push(FilterValue::U64(department_id));
        }
        if let Some(scope) = &filter.user_scope {
            let placeholders = vec!["?"; scope.len()].join(", ");
            where_sql.push_str(&format!(" AND a.user_id IN ({placeholders})"));
            for id in scope {
                args.push(FilterValue::U64(*id));
            }
        }

        // ---------- COUNT query ----------
        let count_sql = format!(
            "SELECT COUNT(*) FROM attendance a JOIN users u ON u.id = a.user_id{where_sql}"
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_query = match arg {
                FilterValue::U64(v) => count_query.bind(*v),
                FilterValue::Date(d) => count_query.bind(*d),
            };
        }
        let total = count_query.fetch_one(&self.pool).await?;

        // ---------- data query ----------
        let data_sql = format!(
            "SELECT a.{}, u.name, u.position, d.name AS department \
             FROM attendance a \
             JOIN users u ON u.id = a.user_id \
             LEFT JOIN departments d ON d.id = u.department_id\
             {} ORDER BY a.date DESC, a.id DESC LIMIT ? OFFSET ?",
            RECORD_COLUMNS.replace(", ", ", a."),
            where_sql
        );

        let mut data_query = sqlx::query_as::<_, DayUserRow>(&data_sql);
        for arg in &args {
            data_query = match arg {
                FilterValue::U64(v) => data_query.bind(*v),
                FilterValue::Date(d) => data_query.bind(*d),
            };
        }
        let rows = data_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((self.assemble(rows).await?, total))
    }

    async fn user_ids_with_role(&self, role: Role) -> Result<Vec<u64>, StoreError> {
        let ids = sqlx::query_scalar::<_, u64>("SELECT id FROM users WHERE role = ?")
            .bind(role.as_ref())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
