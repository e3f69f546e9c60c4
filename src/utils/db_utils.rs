use chrono::NaiveDate;
use sqlx::{
    MySql,
    mysql::MySqlArguments,
    query::{QueryAs, QueryScalar},
};

use crate::store::RequestFilter;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
}

/// ===============================
/// WHERE clause container
/// ===============================
#[derive(Debug, Default)]
pub struct SqlWhere {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build the WHERE clause for leave request listings.
/// Expects `leave_requests lr JOIN employees e`.
/// ===============================
pub fn build_request_where(filter: &RequestFilter) -> SqlWhere {
    let mut conditions: Vec<String> = Vec::new();
    let mut values = Vec::new();

    if let Some(employee_id) = filter.employee_id {
        conditions.push("lr.employee_id = ?".into());
        values.push(SqlValue::U64(employee_id));
    }

    if let Some(department) = &filter.department {
        conditions.push("e.department = ?".into());
        values.push(SqlValue::String(department.clone()));
    }

    if !filter.statuses.is_empty() {
        let marks = vec!["?"; filter.statuses.len()].join(", ");
        conditions.push(format!("lr.status IN ({})", marks));
        for status in &filter.statuses {
            values.push(SqlValue::String(status.to_string()));
        }
    }

    if let Some(category) = filter.category {
        conditions.push("lr.category = ?".into());
        values.push(SqlValue::String(category.to_string()));
    }

    if let Some(subtype) = &filter.subtype {
        conditions.push("lr.subtype = ?".into());
        values.push(SqlValue::String(subtype.clone()));
    }

    if let Some(from) = filter.start_from {
        conditions.push("lr.start_date >= ?".into());
        values.push(SqlValue::Date(from));
    }

    if let Some(to) = filter.start_to {
        conditions.push("lr.start_date <= ?".into());
        values.push(SqlValue::Date(to));
    }

    let sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    SqlWhere { sql, values }
}

pub fn bind_query_as<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: Vec<SqlValue>,
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
        };
    }
    query
}

pub fn bind_query_scalar<'q, O>(
    mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: Vec<SqlValue>,
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
        };
    }
    query
}
