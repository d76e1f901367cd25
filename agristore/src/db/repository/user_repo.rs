//! Repository for user accounts

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sea_query::{Alias, Asterisk, Expr, Func, Order, Query};
use serde::Serialize;

use crate::db::models::{User, UserIden, UserRole};
use crate::db::query::{self, codec, Filter};
use crate::db::repository::base;
use crate::error::Result;

/// Account counts for one role
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStatistics {
    pub role: UserRole,
    pub total: u64,
    pub active: u64,
}

const BY_USERNAME: &[(UserIden, Order)] = &[(UserIden::Username, Order::Asc)];

/// Lookup by email, ignoring case
pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    base::find_one_where(conn, by_email(email))
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    base::find_one_where(conn, Filter::all().eq(UserIden::Username, username))
}

pub fn find_user_by_phone(conn: &Connection, phone_number: &str) -> Result<Option<User>> {
    base::find_one_where(conn, Filter::all().eq(UserIden::PhoneNumber, phone_number))
}

pub fn exists_user_by_email(conn: &Connection, email: &str) -> Result<bool> {
    base::exists_where::<User>(conn, by_email(email))
}

pub fn exists_user_by_username(conn: &Connection, username: &str) -> Result<bool> {
    base::exists_where::<User>(conn, Filter::all().eq(UserIden::Username, username))
}

pub fn find_users_by_role(conn: &Connection, role: UserRole) -> Result<Vec<User>> {
    base::find_where_ordered(conn, by_role(role), BY_USERNAME)
}

pub fn find_active_users(conn: &Connection) -> Result<Vec<User>> {
    base::find_where_ordered(conn, by_active(true), BY_USERNAME)
}

pub fn find_inactive_users(conn: &Connection) -> Result<Vec<User>> {
    base::find_where_ordered(conn, by_active(false), BY_USERNAME)
}

pub fn find_users_by_role_and_active(
    conn: &Connection,
    role: UserRole,
    active: bool,
) -> Result<Vec<User>> {
    base::find_where_ordered(conn, by_role(role).and(by_active(active)), BY_USERNAME)
}

pub fn count_active_users(conn: &Connection) -> Result<u64> {
    base::count_where::<User>(conn, by_active(true))
}

pub fn count_users_by_role(conn: &Connection, role: UserRole) -> Result<u64> {
    base::count_where::<User>(conn, by_role(role))
}

/// Users whose username, email or full name contain `term`
pub fn search_users(conn: &Connection, term: &str) -> Result<Vec<User>> {
    let filter = Filter::all().search_any(
        [UserIden::Username, UserIden::Email, UserIden::FullName],
        term,
    );
    base::find_where_ordered(conn, filter, BY_USERNAME)
}

/// Users whose email address is at `domain`, e.g. `minagri.gov.rw`
pub fn find_users_by_email_domain(conn: &Connection, domain: &str) -> Result<Vec<User>> {
    let suffix = format!("@{}", domain.trim_start_matches('@'));
    base::find_where_ordered(
        conn,
        Filter::all().ends_with_ignore_case(UserIden::Email, &suffix),
        BY_USERNAME,
    )
}

pub fn find_users_created_after(conn: &Connection, since: DateTime<Utc>) -> Result<Vec<User>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(UserIden::CreatedAt, codec::ts(since)),
        &[(UserIden::CreatedAt, Order::Desc)],
    )
}

pub fn find_users_logged_in_after(conn: &Connection, since: DateTime<Utc>) -> Result<Vec<User>> {
    base::find_where_ordered(
        conn,
        Filter::all().gt(UserIden::LastLogin, codec::ts(since)),
        &[(UserIden::LastLogin, Order::Desc)],
    )
}

pub fn find_users_never_logged_in(conn: &Connection) -> Result<Vec<User>> {
    base::find_where_ordered(conn, Filter::all().is_null(UserIden::LastLogin), BY_USERNAME)
}

/// Users who never logged in or last logged in before `cutoff`
pub fn find_users_inactive_since(conn: &Connection, cutoff: DateTime<Utc>) -> Result<Vec<User>> {
    let filter = Filter::all().any_of(
        Filter::any()
            .is_null(UserIden::LastLogin)
            .lt(UserIden::LastLogin, codec::ts(cutoff)),
    );
    base::find_where_ordered(conn, filter, BY_USERNAME)
}

/// Total and active account counts per role, in role order
pub fn user_statistics_by_role(conn: &Connection) -> Result<Vec<RoleStatistics>> {
    let active = Func::coalesce([
        Func::sum(Expr::col(UserIden::IsActive)).into(),
        Expr::val(0).into(),
    ]);
    let stmt = Query::select()
        .column(UserIden::Role)
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("total"))
        .expr_as(active, Alias::new("active"))
        .from(UserIden::Table)
        .group_by_col(UserIden::Role)
        .order_by(UserIden::Role, Order::Asc)
        .to_owned();

    query::fetch_rows(conn, &stmt, |row| {
        let total: i64 = row.get(1)?;
        let active: i64 = row.get(2)?;
        Ok(RoleStatistics {
            role: row.get(0)?,
            total: total.max(0) as u64,
            active: active.max(0) as u64,
        })
    })
}

/// Stamp `at` as the user's last login
pub fn record_login(conn: &Connection, id: &str, at: DateTime<Utc>) -> Result<bool> {
    let updated = base::update_where::<User>(
        conn,
        vec![
            (UserIden::LastLogin, codec::ts(at).into()),
            (UserIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        by_id(id),
    )?;
    Ok(updated > 0)
}

pub fn set_user_active(conn: &Connection, id: &str, active: bool) -> Result<bool> {
    let updated = base::update_where::<User>(
        conn,
        vec![
            (UserIden::IsActive, active.into()),
            (UserIden::UpdatedAt, codec::ts(Utc::now()).into()),
        ],
        by_id(id),
    )?;
    Ok(updated > 0)
}

fn by_id(id: &str) -> Filter {
    Filter::all().eq(UserIden::Id, id)
}

fn by_email(email: &str) -> Filter {
    Filter::all().eq_ignore_case(UserIden::Email, email)
}

fn by_role(role: UserRole) -> Filter {
    Filter::all().eq(UserIden::Role, role)
}

fn by_active(active: bool) -> Filter {
    Filter::all().eq(UserIden::IsActive, active)
}
