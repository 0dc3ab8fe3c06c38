use chrono::NaiveDateTime;

use crate::models::{DateRangeFilter, StatusCountTable};
use crate::store::{BookingStore, StoreError};

pub struct BookingCounter<'a> {
    store: &'a dyn BookingStore,
}

impl<'a> BookingCounter<'a> {
    pub fn new(store: &'a dyn BookingStore) -> Self {
        Self { store }
    }

    pub fn count_by_status(&self, filter: &DateRangeFilter) -> Result<StatusCountTable, StoreError> {
        self.count_by_status_at(filter, chrono::Utc::now().naive_utc())
    }

    pub fn count_by_status_at(
        &self,
        filter: &DateRangeFilter,
        now: NaiveDateTime,
    ) -> Result<StatusCountTable, StoreError> {
        let predicate = filter.to_predicate_at(now);
        let registered = self.store.registered_statuses()?;
        let observed = self.store.count_by_status(&predicate)?;
        Ok(StatusCountTable::build(&registered, &observed))
    }
}
