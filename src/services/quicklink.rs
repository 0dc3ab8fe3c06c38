use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::transitions::StatusTransitionProcessor;
use crate::models::{ActionError, BookingAction, BookingId, BookingStatus, BulkActionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuicklinkAction {
    Confirm,
    Close,
}

impl QuicklinkAction {
    pub fn parse(raw: &str) -> Result<Self, ActionError> {
        match raw.trim() {
            "confirm" => Ok(QuicklinkAction::Confirm),
            "close" => Ok(QuicklinkAction::Close),
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuicklinkAction::Confirm => "confirm",
            QuicklinkAction::Close => "close",
        }
    }

    pub fn to_booking_action(self) -> BookingAction {
        match self {
            QuicklinkAction::Confirm => BookingAction::SetStatus(BookingStatus::Confirmed),
            QuicklinkAction::Close => BookingAction::SetStatus(BookingStatus::Closed),
        }
    }
}

// Signs one-click links of the form `{id}.{action}.{signature}`. A token is
// only good for the booking and action it was issued for.
#[derive(Clone)]
pub struct QuicklinkSigner {
    secret: String,
}

impl QuicklinkSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, id: BookingId, action: QuicklinkAction) -> String {
        let signature = match self.mac(id, action) {
            Some(mac) => base64::engine::general_purpose::URL_SAFE_NO_PAD
                .encode(mac.finalize().into_bytes()),
            None => String::new(),
        };
        format!("{id}.{}.{signature}", action.as_str())
    }

    pub fn verify(&self, token: &str) -> Option<(BookingId, QuicklinkAction)> {
        let mut parts = token.trim().splitn(3, '.');
        let id: BookingId = parts.next()?.parse().ok()?;
        let action = QuicklinkAction::parse(parts.next()?).ok()?;
        let signature = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(parts.next()?)
            .ok()?;

        self.mac(id, action)?.verify_slice(&signature).ok()?;
        Some((id, action))
    }

    fn mac(&self, id: BookingId, action: QuicklinkAction) -> Option<Hmac<Sha1>> {
        let mut mac = Hmac::<Sha1>::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(format!("{id}:{}", action.as_str()).as_bytes());
        Some(mac)
    }
}

pub struct QuicklinkProcessor<'a> {
    signer: &'a QuicklinkSigner,
    transitions: StatusTransitionProcessor<'a>,
}

impl<'a> QuicklinkProcessor<'a> {
    pub fn new(signer: &'a QuicklinkSigner, transitions: StatusTransitionProcessor<'a>) -> Self {
        Self {
            signer,
            transitions,
        }
    }

    pub fn apply(
        &self,
        token: &str,
        requested_action: &str,
        can_manage: bool,
    ) -> Result<BulkActionResult, ActionError> {
        if !can_manage {
            return Err(ActionError::Unauthorized);
        }
        let action = QuicklinkAction::parse(requested_action)?;

        let (id, signed_action) = self.signer.verify(token).ok_or_else(|| {
            tracing::warn!("rejected quicklink with bad signature");
            ActionError::Unauthenticated
        })?;
        if signed_action != action {
            tracing::warn!(id, "quicklink action does not match its token");
            return Err(ActionError::Unauthenticated);
        }

        self.transitions
            .apply_action(action.to_booking_action(), &[id], can_manage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDateTime;

    use crate::db;
    use crate::models::{BookingDraft, ItemFailure, ItemOutcome};
    use crate::services::transitions::ActionRegistry;
    use crate::store::{BookingStore, SqliteBookingStore};

    fn setup_store() -> SqliteBookingStore {
        let conn = db::init_db(":memory:").unwrap();
        SqliteBookingStore::new(Arc::new(Mutex::new(conn)))
    }

    fn add(store: &SqliteBookingStore) -> BookingId {
        store
            .insert(&BookingDraft {
                created_at: NaiveDateTime::parse_from_str("2025-06-16 19:00", "%Y-%m-%d %H:%M")
                    .unwrap(),
                status: BookingStatus::Pending,
                party: 4,
                name: "Guest".to_string(),
                email: "guest@example.com".to_string(),
                phone: None,
                message: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_token_round_trip_and_tamper() {
        let signer = QuicklinkSigner::new("secret");
        let token = signer.issue(7, QuicklinkAction::Confirm);
        assert!(token.starts_with("7.confirm."));
        assert_eq!(signer.verify(&token), Some((7, QuicklinkAction::Confirm)));

        let forged = token.replacen("7.", "8.", 1);
        assert_eq!(signer.verify(&forged), None);
        assert_eq!(QuicklinkSigner::new("other").verify(&token), None);
        assert_eq!(signer.verify("garbage"), None);
    }

    #[test]
    fn test_confirm_matches_bulk_confirm() {
        let store = setup_store();
        let registry = ActionRegistry::new();
        let signer = QuicklinkSigner::new("secret");
        let via_link = add(&store);
        let via_bulk = add(&store);

        let token = signer.issue(via_link, QuicklinkAction::Confirm);
        let result = QuicklinkProcessor::new(&signer, StatusTransitionProcessor::new(&store, &registry))
            .apply(&token, "confirm", true)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.action, BookingAction::SetStatus(BookingStatus::Confirmed));

        StatusTransitionProcessor::new(&store, &registry)
            .apply("set-status-confirmed", &[via_bulk], true)
            .unwrap();

        let a = store.get(via_link).unwrap().unwrap().status;
        let b = store.get(via_bulk).unwrap().unwrap().status;
        assert_eq!(a, BookingStatus::Confirmed);
        assert_eq!(a, b);
    }

    #[test]
    fn test_close_sets_closed() {
        let store = setup_store();
        let registry = ActionRegistry::new();
        let signer = QuicklinkSigner::new("secret");
        let id = add(&store);

        let token = signer.issue(id, QuicklinkAction::Close);
        QuicklinkProcessor::new(&signer, StatusTransitionProcessor::new(&store, &registry))
            .apply(&token, "close", true)
            .unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().status, BookingStatus::Closed);
    }

    #[test]
    fn test_rejections_leave_booking_untouched() {
        let store = setup_store();
        let registry = ActionRegistry::new();
        let signer = QuicklinkSigner::new("secret");
        let id = add(&store);
        let processor =
            QuicklinkProcessor::new(&signer, StatusTransitionProcessor::new(&store, &registry));
        let confirm_token = signer.issue(id, QuicklinkAction::Confirm);

        assert_eq!(
            processor.apply(&confirm_token, "confirm", false).unwrap_err(),
            ActionError::Unauthorized
        );
        assert_eq!(
            processor.apply(&confirm_token, "delete", true).unwrap_err(),
            ActionError::UnknownAction("delete".to_string())
        );
        assert_eq!(
            processor.apply(&confirm_token, "close", true).unwrap_err(),
            ActionError::Unauthenticated
        );
        assert_eq!(store.get(id).unwrap().unwrap().status, BookingStatus::Pending);
    }

    #[test]
    fn test_missing_booking_is_item_failure() {
        let store = setup_store();
        let registry = ActionRegistry::new();
        let signer = QuicklinkSigner::new("secret");

        let token = signer.issue(31, QuicklinkAction::Confirm);
        let result =
            QuicklinkProcessor::new(&signer, StatusTransitionProcessor::new(&store, &registry))
                .apply(&token, "confirm", true)
                .unwrap();
        assert_eq!(
            result.get(31),
            Some(&ItemOutcome::Failed {
                error: ItemFailure::NotFound
            })
        );
    }
}
