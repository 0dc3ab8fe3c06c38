use chrono::NaiveDateTime;
use serde::Serialize;

use super::counter::BookingCounter;
use crate::models::{
    BookingRecord, BookingSort, BookingStatus, DateRangeFilter, SortColumn, StatusCountTable,
};
use crate::store::{BookingStore, StoreError};

pub const DEFAULT_PER_PAGE: i64 = 30;

pub const BOOKING_COLUMNS: &[(&str, &str)] = &[
    ("date", "Date"),
    ("party", "Party"),
    ("name", "Name"),
    ("email", "Email"),
    ("phone", "Phone"),
    ("message", "Message"),
    ("status", "Status"),
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListError {
    #[error("per-page must be positive, got {0}")]
    InvalidPerPage(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(BookingStatus),
}

impl Serialize for StatusFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatusFilter::All => serializer.serialize_str("all"),
            StatusFilter::Only(status) => serializer.serialize_str(status.as_str()),
        }
    }
}

impl StatusFilter {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => None,
            Some("all") => Some(StatusFilter::All),
            Some(other) => Some(StatusFilter::Only(BookingStatus::parse(other))),
        }
    }

    pub fn status(&self) -> Option<&BookingStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(status),
        }
    }

    pub fn notification(&self, counts: &StatusCountTable) -> Option<String> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(BookingStatus::Trash) => {
                Some("You're viewing bookings that have been moved to the trash.".to_string())
            }
            StatusFilter::Only(status) => {
                let label = counts
                    .statuses
                    .iter()
                    .find(|c| &c.status == status)
                    .map(|c| c.label.as_str())
                    .unwrap_or(status.as_str());
                Some(format!("You're viewing bookings that have been marked as {label}."))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: i64,
    per_page: i64,
}

impl Paginator {
    pub fn new(page: i64, per_page: i64) -> Result<Self, ListError> {
        if per_page <= 0 {
            return Err(ListError::InvalidPerPage(per_page));
        }
        Ok(Self {
            page: page.max(1),
            per_page,
        })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn total_pages(&self, total_items: i64) -> i64 {
        if total_items <= 0 {
            0
        } else {
            (total_items + self.per_page - 1) / self.per_page
        }
    }

    pub fn paginate<T>(&self, items: Vec<T>, total_items: i64) -> Page<T> {
        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total_items,
            total_pages: self.total_pages(total_items),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

pub trait Listable {
    type Item;

    fn columns(&self) -> &'static [(&'static str, &'static str)];

    fn sortable_columns(&self) -> &'static [SortColumn];

    fn page(&self) -> &Page<Self::Item>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingListing {
    pub page: Page<BookingRecord>,
    pub sort: BookingSort,
    pub status: Option<StatusFilter>,
    pub counts: StatusCountTable,
}

impl Listable for BookingListing {
    type Item = BookingRecord;

    fn columns(&self) -> &'static [(&'static str, &'static str)] {
        BOOKING_COLUMNS
    }

    fn sortable_columns(&self) -> &'static [SortColumn] {
        &SortColumn::ALL
    }

    fn page(&self) -> &Page<BookingRecord> {
        &self.page
    }
}

pub struct BookingLister<'a> {
    store: &'a dyn BookingStore,
}

impl<'a> BookingLister<'a> {
    pub fn new(store: &'a dyn BookingStore) -> Self {
        Self { store }
    }

    pub fn list(
        &self,
        filter: &DateRangeFilter,
        status: Option<&StatusFilter>,
        sort: BookingSort,
        page: i64,
        per_page: i64,
    ) -> Result<BookingListing, ListError> {
        self.list_at(filter, status, sort, page, per_page, chrono::Utc::now().naive_utc())
    }

    // The count table and the page are computed against the same `now`, so
    // `total_items` always equals the count shown for the selected status.
    pub fn list_at(
        &self,
        filter: &DateRangeFilter,
        status: Option<&StatusFilter>,
        sort: BookingSort,
        page: i64,
        per_page: i64,
        now: NaiveDateTime,
    ) -> Result<BookingListing, ListError> {
        let paginator = Paginator::new(page, per_page)?;
        let counts = BookingCounter::new(self.store).count_by_status_at(filter, now)?;

        let narrowed = status.and_then(StatusFilter::status);
        let total_matching = match narrowed {
            Some(s) => counts.get(s),
            None => counts.total(),
        };

        let predicate = filter.to_predicate_at(now);
        let (records, _) = self.store.find(
            &predicate,
            narrowed,
            &sort,
            paginator.page(),
            paginator.per_page(),
        )?;

        Ok(BookingListing {
            page: paginator.paginate(records, total_matching),
            sort,
            status: status.cloned(),
            counts,
        })
    }
}
