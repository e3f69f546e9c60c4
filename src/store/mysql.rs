//! MySQL-backed store. Each unit of work is one sqlx transaction; row locks
//! are taken with `SELECT ... FOR UPDATE`. Table layout is in `schema.sql`.

use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, Transaction};

use super::{LeaveStore, RequestFilter, UnitOfWork};
use crate::{
    db::init_db,
    error::LeaveError,
    model::{
        employee::Employee,
        leave_attachment::{LeaveAttachment, NewLeaveAttachment},
        leave_ledger::LeaveLedger,
        leave_request::{LeaveCategory, LeaveRequest, NewLeaveRequest},
        quota_rule::QuotaRule,
    },
    utils::db_utils::{SqlValue, bind_query_as, bind_query_scalar, build_request_where},
};

const EMPLOYEE_COLUMNS: &str =
    "id, name, email, department, role, employment_type, status, hire_date";

const REQUEST_COLUMNS: &str = r#"
    lr.id, lr.employee_id, lr.category, lr.subtype,
    lr.start_date, lr.end_date, lr.start_half, lr.end_half,
    lr.reason, lr.status, lr.rejection_reason, lr.approver_id, lr.approved_at,
    lr.paid_deduction, lr.unpaid_deduction, lr.created_at
"#;

const ATTACHMENT_COLUMNS: &str =
    "id, leave_request_id, original_name, file_name, file_path, mime_type, size, uploaded_at";

const LEDGER_COLUMNS: &str =
    "employee_id, year, annual_total, annual_used, unpaid_used, compensatory_balance";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, LeaveError> {
        let pool = init_db(database_url, max_connections).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LeaveStore for MySqlStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LeaveError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlUnitOfWork { tx }))
    }
}

pub struct MySqlUnitOfWork {
    tx: Transaction<'static, MySql>,
}

impl MySqlUnitOfWork {
    async fn fetch_employee(&mut self, id: u64, for_update: bool) -> Result<Option<Employee>, LeaveError> {
        let sql = format!(
            "SELECT {} FROM employees WHERE id = ?{}",
            EMPLOYEE_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(employee)
    }

    async fn fetch_request(
        &mut self,
        id: u64,
        for_update: bool,
    ) -> Result<Option<LeaveRequest>, LeaveError> {
        let sql = format!(
            "SELECT {} FROM leave_requests lr WHERE lr.id = ?{}",
            REQUEST_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let request = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(request)
    }

    async fn fetch_ledger(
        &mut self,
        employee_id: u64,
        year: i32,
        for_update: bool,
    ) -> Result<Option<LeaveLedger>, LeaveError> {
        let sql = format!(
            "SELECT {} FROM leave_ledgers WHERE employee_id = ? AND year = ?{}",
            LEDGER_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let ledger = sqlx::query_as::<_, LeaveLedger>(&sql)
            .bind(employee_id)
            .bind(year)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(ledger)
    }
}

#[async_trait]
impl UnitOfWork for MySqlUnitOfWork {
    async fn lock_employee(&mut self, id: u64) -> Result<Option<Employee>, LeaveError> {
        self.fetch_employee(id, true).await
    }

    async fn find_employee(&mut self, id: u64) -> Result<Option<Employee>, LeaveError> {
        self.fetch_employee(id, false).await
    }

    async fn find_department_lead(
        &mut self,
        department: &str,
    ) -> Result<Option<Employee>, LeaveError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM employees
            WHERE department = ?
            AND role = 'department_lead'
            AND status = 'active'
            ORDER BY id
            LIMIT 1
            "#,
            EMPLOYEE_COLUMNS
        );
        let lead = sqlx::query_as::<_, Employee>(&sql)
            .bind(department)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(lead)
    }

    async fn list_employees(&mut self) -> Result<Vec<Employee>, LeaveError> {
        let sql = format!("SELECT {} FROM employees ORDER BY id", EMPLOYEE_COLUMNS);
        let rows = sqlx::query_as::<_, Employee>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn find_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        self.fetch_request(id, false).await
    }

    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        self.fetch_request(id, true).await
    }

    async fn list_requests(
        &mut self,
        filter: &RequestFilter,
    ) -> Result<Vec<LeaveRequest>, LeaveError> {
        let mut clause = build_request_where(filter);

        let mut paging = String::new();
        if let Some(limit) = filter.limit {
            paging.push_str(" LIMIT ? OFFSET ?");
            clause.values.push(SqlValue::U64(limit));
            clause.values.push(SqlValue::U64(filter.offset.unwrap_or(0)));
        }

        let sql = format!(
            r#"
            SELECT {}
            FROM leave_requests lr
            JOIN employees e ON e.id = lr.employee_id
            {}
            ORDER BY lr.created_at DESC, lr.id DESC
            {}
            "#,
            REQUEST_COLUMNS, clause.sql, paging
        );

        let query = bind_query_as(sqlx::query_as::<_, LeaveRequest>(&sql), clause.values);
        let rows = query.fetch_all(&mut *self.tx).await?;
        Ok(rows)
    }

    async fn count_requests(&mut self, filter: &RequestFilter) -> Result<u64, LeaveError> {
        let clause = build_request_where(filter);
        let sql = format!(
            "SELECT COUNT(*) FROM leave_requests lr JOIN employees e ON e.id = lr.employee_id{}",
            clause.sql
        );

        let query = bind_query_scalar(sqlx::query_scalar::<_, i64>(&sql), clause.values);
        let total = query.fetch_one(&mut *self.tx).await?;
        Ok(total.max(0) as u64)
    }

    async fn insert_request(
        &mut self,
        request: NewLeaveRequest,
    ) -> Result<LeaveRequest, LeaveError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, category, subtype, start_date, end_date, start_half, end_half,
                 reason, status, paid_deduction, unpaid_deduction, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.category)
        .bind(&request.subtype)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.start_half)
        .bind(request.end_half)
        .bind(&request.reason)
        .bind(request.paid_deduction)
        .bind(request.unpaid_deduction)
        .bind(request.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(request.into_request(result.last_insert_id()))
    }

    async fn update_request(&mut self, request: &LeaveRequest) -> Result<(), LeaveError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, rejection_reason = ?, approver_id = ?, approved_at = ?
            WHERE id = ?
            "#,
        )
        .bind(request.status)
        .bind(&request.rejection_reason)
        .bind(request.approver_id)
        .bind(request.approved_at)
        .bind(request.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LeaveError::not_found(format!(
                "Leave request {} not found",
                request.id
            )));
        }
        Ok(())
    }

    async fn insert_attachment(
        &mut self,
        attachment: NewLeaveAttachment,
    ) -> Result<LeaveAttachment, LeaveError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_attachments
                (leave_request_id, original_name, file_name, file_path, mime_type, size, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(attachment.leave_request_id)
        .bind(&attachment.original_name)
        .bind(&attachment.file_name)
        .bind(&attachment.file_path)
        .bind(&attachment.mime_type)
        .bind(attachment.size)
        .bind(attachment.uploaded_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(LeaveAttachment {
            id: result.last_insert_id(),
            leave_request_id: attachment.leave_request_id,
            original_name: attachment.original_name,
            file_name: attachment.file_name,
            file_path: attachment.file_path,
            mime_type: attachment.mime_type,
            size: attachment.size,
            uploaded_at: attachment.uploaded_at,
        })
    }

    async fn list_attachments(
        &mut self,
        request_id: u64,
    ) -> Result<Vec<LeaveAttachment>, LeaveError> {
        let sql = format!(
            "SELECT {} FROM leave_attachments WHERE leave_request_id = ? ORDER BY id",
            ATTACHMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, LeaveAttachment>(&sql)
            .bind(request_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    async fn find_ledger(
        &mut self,
        employee_id: u64,
        year: i32,
    ) -> Result<Option<LeaveLedger>, LeaveError> {
        self.fetch_ledger(employee_id, year, false).await
    }

    async fn lock_ledger(
        &mut self,
        employee_id: u64,
        year: i32,
    ) -> Result<Option<LeaveLedger>, LeaveError> {
        self.fetch_ledger(employee_id, year, true).await
    }

    async fn save_ledger(&mut self, ledger: &LeaveLedger) -> Result<(), LeaveError> {
        sqlx::query(
            r#"
            INSERT INTO leave_ledgers
                (employee_id, year, annual_total, annual_used, unpaid_used, compensatory_balance)
            VALUES (?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                annual_total = VALUES(annual_total),
                annual_used = VALUES(annual_used),
                unpaid_used = VALUES(unpaid_used),
                compensatory_balance = VALUES(compensatory_balance)
            "#,
        )
        .bind(ledger.employee_id)
        .bind(ledger.year)
        .bind(ledger.annual_total)
        .bind(ledger.annual_used)
        .bind(ledger.unpaid_used)
        .bind(ledger.compensatory_balance)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_quota_rule(
        &mut self,
        category: LeaveCategory,
        subtype: &str,
    ) -> Result<Option<QuotaRule>, LeaveError> {
        let rule = sqlx::query_as::<_, QuotaRule>(
            r#"
            SELECT category, subtype, day_limit, per_month, description
            FROM leave_quota_rules
            WHERE category = ? AND subtype = ?
            "#,
        )
        .bind(category)
        .bind(subtype)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(rule)
    }

    async fn list_quota_rules(&mut self) -> Result<Vec<QuotaRule>, LeaveError> {
        let rows = sqlx::query_as::<_, QuotaRule>(
            r#"
            SELECT category, subtype, day_limit, per_month, description
            FROM leave_quota_rules
            ORDER BY category, subtype
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn insert_quota_rule(&mut self, rule: &QuotaRule) -> Result<(), LeaveError> {
        sqlx::query(
            r#"
            INSERT INTO leave_quota_rules (category, subtype, day_limit, per_month, description)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.category)
        .bind(&rule.subtype)
        .bind(rule.day_limit)
        .bind(rule.per_month)
        .bind(&rule.description)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LeaveError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LeaveError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
