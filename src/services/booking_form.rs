use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::gate::{AdminRequest, AdminRequestGate};
use super::notifier::BookingNotifier;
use crate::models::{
    ActionError, BookingDraft, BookingId, BookingRecord, BookingStatus, RegisteredStatus,
};
use crate::store::{BookingStore, StoreError};

pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingSubmission {
    pub id: String,
    pub date: String,
    pub time: String,
    pub party: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub post_status: String,
    pub send_notifications: bool,
}

impl BookingSubmission {
    pub fn from_fields(fields: &[FormField]) -> Self {
        let mut submission = Self::default();
        for field in fields {
            let value = field.value.trim().to_string();
            match field.name.as_str() {
                "ID" => submission.id = value,
                "rtb-date" => submission.date = value,
                "rtb-time" => submission.time = value,
                "rtb-party" => submission.party = value,
                "rtb-name" => submission.name = value,
                "rtb-email" => submission.email = value,
                "rtb-phone" => submission.phone = value,
                "rtb-message" => submission.message = value,
                "rtb-post-status" => submission.post_status = value,
                "rtb-notifications" => submission.send_notifications = !value.is_empty(),
                _ => {}
            }
        }
        submission
    }

    // Empty or `0` starts a new booking; anything else must name one.
    pub fn booking_id(&self) -> Result<Option<BookingId>, String> {
        if self.id.is_empty() {
            return Ok(None);
        }
        match self.id.parse::<BookingId>() {
            Ok(0) => Ok(None),
            Ok(id) if id > 0 => Ok(Some(id)),
            _ => Err("The booking you are editing could not be identified.".to_string()),
        }
    }
}

pub trait BookingValidator: Send + Sync {
    fn validate(
        &self,
        submission: &BookingSubmission,
        statuses: &[RegisteredStatus],
    ) -> Result<BookingDraft, FieldErrors>;
}

pub struct StandardValidator;

impl BookingValidator for StandardValidator {
    fn validate(
        &self,
        submission: &BookingSubmission,
        statuses: &[RegisteredStatus],
    ) -> Result<BookingDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let date = NaiveDate::parse_from_str(&submission.date, "%Y-%m-%d").ok();
        if date.is_none() {
            errors.insert(
                "date".to_string(),
                "Please enter the date you would like to book.".to_string(),
            );
        }

        let time = NaiveTime::parse_from_str(&submission.time, "%H:%M").ok();
        if time.is_none() {
            errors.insert(
                "time".to_string(),
                "Please enter the time you would like to book.".to_string(),
            );
        }

        let party = submission.party.parse::<i32>().ok().filter(|p| *p >= 1);
        if party.is_none() {
            errors.insert(
                "party".to_string(),
                "Please let us know how many people will be in your party.".to_string(),
            );
        }

        if submission.name.is_empty() {
            errors.insert(
                "name".to_string(),
                "Please enter a name for this booking.".to_string(),
            );
        }

        if submission.email.is_empty() || !submission.email.contains('@') {
            errors.insert(
                "email".to_string(),
                "Please enter an email address so we can confirm your booking.".to_string(),
            );
        }

        // An unknown status is ignored rather than reported.
        let status = statuses
            .iter()
            .map(|s| &s.key)
            .find(|key| key.as_str() == submission.post_status)
            .cloned()
            .unwrap_or(BookingStatus::Pending);

        match (date, time, party) {
            (Some(date), Some(time), Some(party)) if errors.is_empty() => Ok(BookingDraft {
                created_at: date.and_time(time),
                status,
                party,
                name: submission.name.clone(),
                email: submission.email.clone(),
                phone: non_empty(&submission.phone),
                message: non_empty(&submission.message),
            }),
            _ => Err(errors),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ModalOutcome {
    Saved {
        booking: BookingRecord,
    },
    Invalid {
        booking: BookingSubmission,
        fields: FieldErrors,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Rejected(#[from] ActionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AdminBookingForm<'a> {
    store: &'a dyn BookingStore,
    validator: &'a dyn BookingValidator,
    notifier: &'a dyn BookingNotifier,
}

impl<'a> AdminBookingForm<'a> {
    pub fn new(
        store: &'a dyn BookingStore,
        validator: &'a dyn BookingValidator,
        notifier: &'a dyn BookingNotifier,
    ) -> Self {
        Self {
            store,
            validator,
            notifier,
        }
    }

    pub async fn submit(
        &self,
        gate: &dyn AdminRequestGate,
        request: &AdminRequest,
        fields: &[FormField],
    ) -> Result<ModalOutcome, FormError> {
        if !gate.is_authentic(request) {
            return Err(ActionError::Unauthenticated.into());
        }
        if !gate.can_manage_bookings(gate.identify(request)) {
            return Err(ActionError::Unauthorized.into());
        }

        let submission = BookingSubmission::from_fields(fields);
        let statuses = self.store.registered_statuses()?;

        let mut errors = FieldErrors::new();
        let id = submission.booking_id().unwrap_or_else(|message| {
            errors.insert("id".to_string(), message);
            None
        });

        let draft = match self.validator.validate(&submission, &statuses) {
            Ok(draft) if errors.is_empty() => draft,
            validated => {
                errors.extend(validated.err().unwrap_or_default());
                tracing::info!(fields = errors.len(), "admin booking submission rejected");
                return Ok(ModalOutcome::Invalid {
                    booking: submission,
                    fields: errors,
                });
            }
        };

        let booking = match id {
            Some(id) => self.store.save(id, &draft)?,
            None => self.store.insert(&draft)?,
        };
        tracing::info!(id = booking.id, status = %booking.status, "admin booking saved");

        if submission.send_notifications {
            if let Err(e) = self.notifier.booking_saved(&booking).await {
                tracing::error!(error = %e, id = booking.id, "failed to send booking notification");
            }
        }

        Ok(ModalOutcome::Saved { booking })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::db;
    use crate::services::gate::TokenGate;
    use crate::store::SqliteBookingStore;

    struct RecordingNotifier {
        sent: Mutex<Vec<BookingId>>,
    }

    #[async_trait]
    impl BookingNotifier for RecordingNotifier {
        async fn booking_saved(&self, booking: &BookingRecord) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(booking.id);
            Ok(())
        }
    }

    fn setup_store() -> SqliteBookingStore {
        let conn = db::init_db(":memory:").unwrap();
        SqliteBookingStore::new(Arc::new(Mutex::new(conn)))
    }

    fn gate() -> TokenGate {
        TokenGate::new("admin".to_string(), Some("viewer".to_string()), "n".to_string())
    }

    fn authentic(gate: &TokenGate, token: &str) -> AdminRequest {
        let mut request = AdminRequest {
            bearer: Some(token.to_string()),
            nonce: None,
        };
        request.nonce = gate.issue_nonce(&request);
        request
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<FormField> {
        pairs
            .iter()
            .map(|(name, value)| FormField {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect()
    }

    fn valid_fields() -> Vec<FormField> {
        fields(&[
            ("rtb-date", "2025-06-20"),
            ("rtb-time", "19:30"),
            ("rtb-party", "4"),
            ("rtb-name", "Dana"),
            ("rtb-email", "dana@example.com"),
            ("rtb-post-status", "confirmed"),
            ("rtb-notifications", "1"),
        ])
    }

    #[tokio::test]
    async fn test_valid_submission_is_saved_and_notified() {
        let store = setup_store();
        let notifier = RecordingNotifier {
            sent: Mutex::new(vec![]),
        };
        let gate = gate();
        let form = AdminBookingForm::new(&store, &StandardValidator, &notifier);

        let outcome = form
            .submit(&gate, &authentic(&gate, "admin"), &valid_fields())
            .await
            .unwrap();

        let ModalOutcome::Saved { booking } = outcome else {
            panic!("expected saved booking");
        };
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.party, 4);
        assert_eq!(booking.created_at.to_string(), "2025-06-20 19:30:00");
        assert_eq!(*notifier.sent.lock().unwrap(), vec![booking.id]);
        assert!(store.get(booking.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_submission_keeps_input() {
        let store = setup_store();
        let gate = gate();
        let form = AdminBookingForm::new(&store, &StandardValidator, &LogNotifierForTests);

        let submitted = fields(&[
            ("rtb-date", "20/06/2025"),
            ("rtb-time", "19:30"),
            ("rtb-party", "0"),
            ("rtb-name", "Dana"),
            ("rtb-email", "not-an-email"),
        ]);
        let outcome = form
            .submit(&gate, &authentic(&gate, "admin"), &submitted)
            .await
            .unwrap();

        let ModalOutcome::Invalid { booking, fields } = outcome else {
            panic!("expected validation failure");
        };
        assert_eq!(booking.date, "20/06/2025");
        assert_eq!(booking.name, "Dana");
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["date", "email", "party"]);
    }

    #[tokio::test]
    async fn test_gate_failures_never_reach_store() {
        let store = setup_store();
        let gate = gate();
        let form = AdminBookingForm::new(&store, &StandardValidator, &LogNotifierForTests);

        let no_nonce = AdminRequest {
            bearer: Some("admin".to_string()),
            nonce: None,
        };
        assert_eq!(
            form.submit(&gate, &no_nonce, &valid_fields()).await.unwrap_err(),
            FormError::Rejected(ActionError::Unauthenticated)
        );
        assert_eq!(
            form.submit(&gate, &authentic(&gate, "viewer"), &valid_fields())
                .await
                .unwrap_err(),
            FormError::Rejected(ActionError::Unauthorized)
        );

        let (_, total) = store
            .find(
                &Default::default(),
                None,
                &Default::default(),
                1,
                30,
            )
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_edit_existing_booking() {
        let store = setup_store();
        let gate = gate();
        let form = AdminBookingForm::new(&store, &StandardValidator, &LogNotifierForTests);

        let ModalOutcome::Saved { booking } = form
            .submit(&gate, &authentic(&gate, "admin"), &valid_fields())
            .await
            .unwrap()
        else {
            panic!("expected saved booking");
        };

        let mut edit = valid_fields();
        edit.push(FormField {
            name: "ID".to_string(),
            value: booking.id.to_string(),
        });
        edit.push(FormField {
            name: "rtb-post-status".to_string(),
            value: "no-such-status".to_string(),
        });
        let ModalOutcome::Saved { booking: edited } = form
            .submit(&gate, &authentic(&gate, "admin"), &edit)
            .await
            .unwrap()
        else {
            panic!("expected saved booking");
        };
        assert_eq!(edited.id, booking.id);
        assert_eq!(edited.status, BookingStatus::Pending);

        edit[7].value = "9999".to_string();
        assert_eq!(
            form.submit(&gate, &authentic(&gate, "admin"), &edit)
                .await
                .unwrap_err(),
            FormError::Store(StoreError::NotFound(9999))
        );
    }

    #[tokio::test]
    async fn test_malformed_edit_id_is_a_field_error() {
        let store = setup_store();
        let gate = gate();
        let form = AdminBookingForm::new(&store, &StandardValidator, &LogNotifierForTests);

        form.submit(&gate, &authentic(&gate, "admin"), &valid_fields())
            .await
            .unwrap();

        for bad_id in ["1x", "-4"] {
            let mut edit = valid_fields();
            edit.push(FormField {
                name: "ID".to_string(),
                value: bad_id.to_string(),
            });
            let ModalOutcome::Invalid { booking, fields: errors } = form
                .submit(&gate, &authentic(&gate, "admin"), &edit)
                .await
                .unwrap()
            else {
                panic!("expected validation failure for ID {bad_id}");
            };
            assert_eq!(booking.id, bad_id);
            assert_eq!(errors.len(), 1);
            assert!(errors.contains_key("id"));
        }

        let (_, total) = store
            .find(&Default::default(), None, &Default::default(), 1, 30)
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_zero_or_empty_id_means_new_booking() {
        let mut submission = BookingSubmission::default();
        assert_eq!(submission.booking_id(), Ok(None));
        submission.id = "0".to_string();
        assert_eq!(submission.booking_id(), Ok(None));
        submission.id = "12".to_string();
        assert_eq!(submission.booking_id(), Ok(Some(12)));
    }

    struct LogNotifierForTests;

    #[async_trait]
    impl BookingNotifier for LogNotifierForTests {
        async fn booking_saved(&self, _booking: &BookingRecord) -> anyhow::Result<()> {
            Ok(())
        }
    }
}
