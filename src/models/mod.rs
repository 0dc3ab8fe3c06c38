pub mod action;
pub mod booking;
pub mod counts;
pub mod filter;
pub mod sort;

pub use action::{
    ActionError, BookingAction, BulkActionResult, BulkNotice, ItemFailure, ItemOutcome, ItemResult,
};
pub use booking::{BookingDraft, BookingId, BookingRecord, BookingStatus, RegisteredStatus};
pub use counts::{StatusCount, StatusCountTable};
pub use filter::{
    DatePredicate, DateRangeFilter, FilterError, FilterRequest, Schedule, UPCOMING_BUFFER_SECONDS,
};
pub use sort::{BookingSort, SortColumn, SortDirection, SortError};
