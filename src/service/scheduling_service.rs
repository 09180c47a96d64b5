use async_trait::async_trait;

use crate::clients::calcom_client::{CalComClient, SchedulingError};
use crate::models::booking::{Ack, Booking, BookingId};

/// Booking operations the chat loop performs. None of them are retried here.
#[async_trait]
pub trait SchedulingClient: Send + Sync {
    async fn list_bookings(&self) -> Result<Vec<Booking>, SchedulingError>;
    async fn create_booking(&self, start: &str, title: &str) -> Result<Booking, SchedulingError>;
    async fn cancel_booking(&self, id: BookingId) -> Result<Ack, SchedulingError>;
    async fn reschedule_booking(
        &self,
        id: BookingId,
        new_start: &str,
    ) -> Result<Booking, SchedulingError>;
}

#[async_trait]
impl SchedulingClient for CalComClient {
    async fn list_bookings(&self) -> Result<Vec<Booking>, SchedulingError> {
        CalComClient::list_bookings(self).await
    }

    async fn create_booking(&self, start: &str, title: &str) -> Result<Booking, SchedulingError> {
        CalComClient::create_booking(self, start, title).await
    }

    async fn cancel_booking(&self, id: BookingId) -> Result<Ack, SchedulingError> {
        CalComClient::cancel_booking(self, id).await
    }

    async fn reschedule_booking(
        &self,
        id: BookingId,
        new_start: &str,
    ) -> Result<Booking, SchedulingError> {
        CalComClient::reschedule_booking(self, id, new_start).await
    }
}
