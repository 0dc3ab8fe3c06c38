use std::fmt;

use serde::{Serialize, Serializer};

use super::booking::{BookingId, BookingStatus};

const SET_STATUS_PREFIX: &str = "set-status-";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingAction {
    Delete,
    SetStatus(BookingStatus),
    Extension(String),
}

impl BookingAction {
    // `is_extension` reports whether a collaborator registered the given key.
    pub fn parse(raw: &str, is_extension: impl Fn(&str) -> bool) -> Result<Self, ActionError> {
        let raw = raw.trim();
        if raw == "delete" {
            return Ok(BookingAction::Delete);
        }
        if let Some(status) = raw.strip_prefix(SET_STATUS_PREFIX) {
            if !status.is_empty() {
                return Ok(BookingAction::SetStatus(BookingStatus::parse(status)));
            }
        }
        if !raw.is_empty() && is_extension(raw) {
            return Ok(BookingAction::Extension(raw.to_string()));
        }
        Err(ActionError::UnknownAction(raw.to_string()))
    }

    pub fn key(&self) -> String {
        match self {
            BookingAction::Delete => "delete".to_string(),
            BookingAction::SetStatus(status) => format!("{SET_STATUS_PREFIX}{status}"),
            BookingAction::Extension(key) => key.clone(),
        }
    }

    fn past_tense(&self) -> (&'static str, &'static str) {
        match self {
            BookingAction::Delete => ("booking deleted successfully", "bookings deleted successfully"),
            BookingAction::SetStatus(BookingStatus::Confirmed) => {
                ("booking confirmed", "bookings confirmed")
            }
            BookingAction::SetStatus(BookingStatus::Pending) => {
                ("booking set to pending", "bookings set to pending")
            }
            BookingAction::SetStatus(BookingStatus::Closed) => ("booking closed", "bookings closed"),
            _ => ("booking updated", "bookings updated"),
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl Serialize for BookingAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ItemFailure {
    #[error("booking not found")]
    NotFound,

    #[error("illegal status: {0}")]
    IllegalStatus(String),

    #[error("store error: {0}")]
    StoreError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Success,
    Failed { error: ItemFailure },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success)
    }
}

impl From<Result<(), ItemFailure>> for ItemOutcome {
    fn from(result: Result<(), ItemFailure>) -> Self {
        match result {
            Ok(()) => ItemOutcome::Success,
            Err(error) => ItemOutcome::Failed { error },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub id: BookingId,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkActionResult {
    pub action: BookingAction,
    pub results: Vec<ItemResult>,
}

impl BulkActionResult {
    pub fn new(action: BookingAction) -> Self {
        Self {
            action,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, id: BookingId, outcome: ItemOutcome) {
        self.results.push(ItemResult { id, outcome });
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, id: BookingId) -> Option<&ItemOutcome> {
        self.results.iter().find(|r| r.id == id).map(|r| &r.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn notice(&self) -> Option<BulkNotice> {
        if self.is_empty() {
            return None;
        }
        Some(BulkNotice::summarize(self))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkNotice {
    pub action: String,
    pub succeeded: usize,
    pub failed: usize,
    pub messages: Vec<String>,
}

impl BulkNotice {
    fn summarize(result: &BulkActionResult) -> Self {
        let succeeded = result.succeeded();
        let failed = result.failed();
        let mut messages = Vec::new();

        if succeeded > 0 {
            let (one, many) = result.action.past_tense();
            let noun = if succeeded == 1 { one } else { many };
            messages.push(format!("{succeeded} {noun}."));
        }
        if failed > 0 {
            let noun = if failed == 1 {
                "booking had errors and could not be processed"
            } else {
                "bookings had errors and could not be processed"
            };
            messages.push(format!("{failed} {noun}."));
        }

        Self {
            action: result.action.key(),
            succeeded,
            failed,
            messages,
        }
    }
}
