pub mod sqlite;

use crate::models::{
    BookingDraft, BookingId, BookingRecord, BookingSort, BookingStatus, DatePredicate,
    ItemFailure, RegisteredStatus,
};

pub use sqlite::SqliteBookingStore;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("booking {0} not found")]
    NotFound(BookingId),

    #[error("status is not registered: {0}")]
    IllegalStatus(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<StoreError> for ItemFailure {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ItemFailure::NotFound,
            StoreError::IllegalStatus(status) => ItemFailure::IllegalStatus(status),
            StoreError::Backend(msg) => ItemFailure::StoreError(msg),
        }
    }
}

// Persistence for booking records. Each call is atomic per record; callers add no locking.
pub trait BookingStore: Send + Sync {
    fn find(
        &self,
        predicate: &DatePredicate,
        status: Option<&BookingStatus>,
        sort: &BookingSort,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<BookingRecord>, i64), StoreError>;

    fn count_by_status(
        &self,
        predicate: &DatePredicate,
    ) -> Result<Vec<(BookingStatus, i64)>, StoreError>;

    fn update_status(&self, id: BookingId, status: &BookingStatus) -> Result<(), StoreError>;

    fn delete(&self, id: BookingId) -> Result<(), StoreError>;

    fn registered_statuses(&self) -> Result<Vec<RegisteredStatus>, StoreError>;

    fn get(&self, id: BookingId) -> Result<Option<BookingRecord>, StoreError>;

    fn insert(&self, draft: &BookingDraft) -> Result<BookingRecord, StoreError>;

    fn save(&self, id: BookingId, draft: &BookingDraft) -> Result<BookingRecord, StoreError>;

    fn register_status(&self, key: &str, label: &str) -> Result<(), StoreError>;
}
