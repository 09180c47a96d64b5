use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub type BookingId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Accepted,
    Pending,
    Cancelled,
    Rejected,
    AwaitingHost,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    #[serde(default)]
    pub title: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: BookingStatus,
}

impl Booking {
    // Anything the upstream has not cancelled can still be targeted.
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }
}

/// Raw list envelope. Entries are decoded one by one so a single odd booking
/// does not hide the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingList {
    #[serde(default)]
    pub bookings: Vec<Value>,
}

impl BookingList {
    pub fn into_bookings(self) -> Vec<Booking> {
        self.bookings
            .into_iter()
            .filter_map(|raw| {
                let id = raw.get("id").cloned().unwrap_or(Value::Null);
                match serde_json::from_value::<Booking>(raw) {
                    Ok(booking) => Some(booking),
                    Err(err) => {
                        warn!(
                            event_name = "calcom.booking_skipped",
                            id = %id,
                            error = %err,
                            "skipping unreadable booking"
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventType {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub length: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventTypeList {
    #[serde(default, alias = "eventTypes")]
    pub event_types: Vec<EventType>,
}
