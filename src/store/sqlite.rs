use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use super::{BookingStore, StoreError};
use crate::db::queries;
use crate::models::{
    BookingDraft, BookingId, BookingRecord, BookingSort, BookingStatus, DatePredicate,
    RegisteredStatus,
};

pub struct SqliteBookingStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteBookingStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db
            .lock()
            .map_err(|_| StoreError::Backend("database lock poisoned".to_string()))
    }
}

fn ensure_registered(conn: &Connection, status: &BookingStatus) -> Result<(), StoreError> {
    let statuses = queries::list_statuses(conn)?;
    if statuses.iter().any(|s| &s.key == status) {
        Ok(())
    } else {
        Err(StoreError::IllegalStatus(status.to_string()))
    }
}

impl BookingStore for SqliteBookingStore {
    fn find(
        &self,
        predicate: &DatePredicate,
        status: Option<&BookingStatus>,
        sort: &BookingSort,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<BookingRecord>, i64), StoreError> {
        let offset = (page.max(1) - 1).saturating_mul(per_page);
        let conn = self.conn()?;
        let records = queries::find_bookings(&conn, predicate, status, sort, per_page, offset)?;
        let total = queries::count_bookings(&conn, predicate, status)?;
        Ok((records, total))
    }

    fn count_by_status(
        &self,
        predicate: &DatePredicate,
    ) -> Result<Vec<(BookingStatus, i64)>, StoreError> {
        let conn = self.conn()?;
        Ok(queries::count_bookings_by_status(&conn, predicate)?)
    }

    fn update_status(&self, id: BookingId, status: &BookingStatus) -> Result<(), StoreError> {
        let conn = self.conn()?;
        ensure_registered(&conn, status)?;
        if queries::update_booking_status(&conn, id, status)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    fn delete(&self, id: BookingId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if queries::delete_booking(&conn, id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    fn registered_statuses(&self) -> Result<Vec<RegisteredStatus>, StoreError> {
        let conn = self.conn()?;
        Ok(queries::list_statuses(&conn)?)
    }

    fn get(&self, id: BookingId) -> Result<Option<BookingRecord>, StoreError> {
        let conn = self.conn()?;
        Ok(queries::get_booking_by_id(&conn, id)?)
    }

    fn insert(&self, draft: &BookingDraft) -> Result<BookingRecord, StoreError> {
        let conn = self.conn()?;
        ensure_registered(&conn, &draft.status)?;
        Ok(queries::create_booking(&conn, draft)?)
    }

    fn save(&self, id: BookingId, draft: &BookingDraft) -> Result<BookingRecord, StoreError> {
        let conn = self.conn()?;
        ensure_registered(&conn, &draft.status)?;
        if !queries::save_booking(&conn, id, draft)? {
            return Err(StoreError::NotFound(id));
        }
        queries::get_booking_by_id(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    fn register_status(&self, key: &str, label: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        Ok(queries::register_status(&conn, key, label)?)
    }
}
