use chrono::{NaiveDateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};

use crate::models::booking::DATE_TIME_FORMAT;
use crate::models::{
    BookingDraft, BookingId, BookingRecord, BookingSort, BookingStatus, DatePredicate,
    RegisteredStatus,
};

const BOOKING_COLUMNS: &str = "id, created_at, status, party, name, email, phone, message";

// ── Bookings ──

pub fn create_booking(conn: &Connection, draft: &BookingDraft) -> anyhow::Result<BookingRecord> {
    let created_at = draft.created_at.format(DATE_TIME_FORMAT).to_string();
    let now = now_string();

    conn.execute(
        "INSERT INTO bookings (created_at, status, party, name, email, phone, message, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            created_at,
            draft.status.as_str(),
            draft.party,
            draft.name,
            draft.email,
            draft.phone,
            draft.message,
            now,
        ],
    )?;

    Ok(BookingRecord {
        id: conn.last_insert_rowid(),
        created_at: draft.created_at,
        status: draft.status.clone(),
        party: draft.party,
        name: draft.name.clone(),
        email: draft.email.clone(),
        phone: draft.phone.clone(),
        message: draft.message.clone(),
    })
}

pub fn save_booking(conn: &Connection, id: BookingId, draft: &BookingDraft) -> anyhow::Result<bool> {
    let created_at = draft.created_at.format(DATE_TIME_FORMAT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET created_at = ?1, status = ?2, party = ?3, name = ?4, email = ?5,
                phone = ?6, message = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            created_at,
            draft.status.as_str(),
            draft.party,
            draft.name,
            draft.email,
            draft.phone,
            draft.message,
            now_string(),
            id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: BookingId) -> anyhow::Result<Option<BookingRecord>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn find_bookings(
    conn: &Connection,
    predicate: &DatePredicate,
    status: Option<&BookingStatus>,
    sort: &BookingSort,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<BookingRecord>> {
    let (where_sql, mut params_vec) = where_clause(predicate, status);
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings{where_sql} ORDER BY {} LIMIT ? OFFSET ?",
        sort.order_by_sql()
    );
    params_vec.push(Box::new(limit));
    params_vec.push(Box::new(offset));

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn count_bookings(
    conn: &Connection,
    predicate: &DatePredicate,
    status: Option<&BookingStatus>,
) -> anyhow::Result<i64> {
    let (where_sql, params_vec) = where_clause(predicate, status);
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM bookings{where_sql}"),
        params_refs.as_slice(),
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_bookings_by_status(
    conn: &Connection,
    predicate: &DatePredicate,
) -> anyhow::Result<Vec<(BookingStatus, i64)>> {
    let (where_sql, params_vec) = where_clause(predicate, None);
    let sql = format!("SELECT status, COUNT(*) FROM bookings{where_sql} GROUP BY status");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let status: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        Ok((BookingStatus::parse(&status), count))
    })?;

    let mut counts = vec![];
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

pub fn update_booking_status(
    conn: &Connection,
    id: BookingId,
    status: &BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_string(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: BookingId) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn where_clause(
    predicate: &DatePredicate,
    status: Option<&BookingStatus>,
) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

    if let Some(from) = predicate.from {
        clauses.push("created_at >= ?");
        params_vec.push(Box::new(from.format(DATE_TIME_FORMAT).to_string()));
    }
    if let Some(until) = predicate.until {
        clauses.push("created_at < ?");
        params_vec.push(Box::new(until.format(DATE_TIME_FORMAT).to_string()));
    }
    if let Some(status) = status {
        clauses.push("status = ?");
        params_vec.push(Box::new(status.as_str().to_string()));
    }

    if clauses.is_empty() {
        (String::new(), params_vec)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params_vec)
    }
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<BookingRecord> {
    let id: BookingId = row.get(0)?;
    let created_at_str: String = row.get(1)?;
    let status_str: String = row.get(2)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, DATE_TIME_FORMAT)
        .map_err(|e| anyhow::anyhow!("booking {id} has malformed created_at {created_at_str:?}: {e}"))?;

    Ok(BookingRecord {
        id,
        created_at,
        status: BookingStatus::parse(&status_str),
        party: row.get(3)?,
        name: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        message: row.get(7)?,
    })
}

// ── Statuses ──

pub fn list_statuses(conn: &Connection) -> anyhow::Result<Vec<RegisteredStatus>> {
    let mut stmt =
        conn.prepare("SELECT key, label FROM booking_statuses ORDER BY position ASC, key ASC")?;
    let rows = stmt.query_map([], |row| {
        let key: String = row.get(0)?;
        Ok(RegisteredStatus {
            key: BookingStatus::parse(&key),
            label: row.get(1)?,
        })
    })?;

    let mut statuses = vec![];
    for row in rows {
        statuses.push(row?);
    }
    Ok(statuses)
}

pub fn register_status(conn: &Connection, key: &str, label: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO booking_statuses (key, label, position)
         VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM booking_statuses))
         ON CONFLICT(key) DO UPDATE SET label = excluded.label",
        params![key, label],
    )?;
    Ok(())
}

fn now_string() -> String {
    Utc::now().naive_utc().format(DATE_TIME_FORMAT).to_string()
}
