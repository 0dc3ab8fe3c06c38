use async_trait::async_trait;

use crate::models::BookingRecord;

#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn booking_saved(&self, booking: &BookingRecord) -> anyhow::Result<()>;
}

pub struct LogNotifier;

#[async_trait]
impl BookingNotifier for LogNotifier {
    async fn booking_saved(&self, booking: &BookingRecord) -> anyhow::Result<()> {
        tracing::info!(
            id = booking.id,
            email = %booking.email,
            status = %booking.status,
            "booking notification requested"
        );
        Ok(())
    }
}
