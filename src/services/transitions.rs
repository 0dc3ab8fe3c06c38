use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::{
    ActionError, BookingAction, BookingId, BulkActionResult, ItemFailure, ItemOutcome,
};
use crate::store::BookingStore;

pub trait ExtensionAction: Send + Sync {
    fn apply(&self, store: &dyn BookingStore, id: BookingId) -> Result<(), ItemFailure>;
}

#[derive(Default, Clone)]
pub struct ActionRegistry {
    extensions: HashMap<String, Arc<dyn ExtensionAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, action: Arc<dyn ExtensionAction>) {
        self.extensions.insert(key.into(), action);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.extensions.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<&Arc<dyn ExtensionAction>> {
        self.extensions.get(key)
    }
}

pub struct StatusTransitionProcessor<'a> {
    store: &'a dyn BookingStore,
    registry: &'a ActionRegistry,
}

impl<'a> StatusTransitionProcessor<'a> {
    pub fn new(store: &'a dyn BookingStore, registry: &'a ActionRegistry) -> Self {
        Self { store, registry }
    }

    pub fn parse_action(&self, raw: &str) -> Result<BookingAction, ActionError> {
        BookingAction::parse(raw, |key| self.registry.contains(key))
    }

    pub fn apply(
        &self,
        raw_action: &str,
        ids: &[BookingId],
        can_manage: bool,
    ) -> Result<BulkActionResult, ActionError> {
        if !can_manage {
            return Err(ActionError::Unauthorized);
        }
        let action = self.parse_action(raw_action)?;
        self.apply_action(action, ids, can_manage)
    }

    // Duplicate ids are processed once, at their first position.
    pub fn apply_action(
        &self,
        action: BookingAction,
        ids: &[BookingId],
        can_manage: bool,
    ) -> Result<BulkActionResult, ActionError> {
        if !can_manage {
            return Err(ActionError::Unauthorized);
        }
        if let BookingAction::Extension(key) = &action {
            if !self.registry.contains(key) {
                return Err(ActionError::UnknownAction(key.clone()));
            }
        }

        let mut result = BulkActionResult::new(action);
        let mut seen = HashSet::new();

        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let outcome = self.apply_one(&result.action, id);
            if let Err(e) = &outcome {
                tracing::warn!(id, action = %result.action, error = %e, "booking action failed");
            }
            result.record(id, ItemOutcome::from(outcome));
        }

        if !result.is_empty() {
            tracing::info!(
                action = %result.action,
                succeeded = result.succeeded(),
                failed = result.failed(),
                "booking action applied"
            );
        }

        Ok(result)
    }

    fn apply_one(&self, action: &BookingAction, id: BookingId) -> Result<(), ItemFailure> {
        match action {
            BookingAction::Delete => self.store.delete(id).map_err(ItemFailure::from),
            BookingAction::SetStatus(status) => {
                self.store.update_status(id, status).map_err(ItemFailure::from)
            }
            BookingAction::Extension(key) => match self.registry.get(key) {
                Some(extension) => extension.apply(self.store, id),
                None => Err(ItemFailure::StoreError(format!("action {key} is not registered"))),
            },
        }
    }
}
