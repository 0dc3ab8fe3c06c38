use serde::Serialize;

use super::booking::{BookingStatus, RegisteredStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: BookingStatus,
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCountTable {
    pub total: i64,
    pub statuses: Vec<StatusCount>,
}

impl StatusCountTable {
    pub fn build(registered: &[RegisteredStatus], observed: &[(BookingStatus, i64)]) -> Self {
        let mut statuses: Vec<StatusCount> = registered
            .iter()
            .map(|s| StatusCount {
                status: s.key.clone(),
                label: s.label.clone(),
                count: 0,
            })
            .collect();

        for (status, count) in observed {
            match statuses.iter_mut().find(|s| &s.status == status) {
                Some(entry) => entry.count += count,
                None => statuses.push(StatusCount {
                    status: status.clone(),
                    label: status.to_string(),
                    count: *count,
                }),
            }
        }

        let total = statuses.iter().map(|s| s.count).sum();
        Self { total, statuses }
    }

    pub fn get(&self, status: &BookingStatus) -> i64 {
        self.statuses
            .iter()
            .find(|s| &s.status == status)
            .map(|s| s.count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.total
    }
}
