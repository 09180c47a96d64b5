use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::booking::{Ack, Booking, BookingId, BookingList, EventType, EventTypeList};

pub const DEFAULT_BASE_URL: &str = "https://api.cal.com/v1/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    #[error("Unauthorized. Check your API key.")]
    Unauthorized,
    #[error("Not Found.")]
    NotFound,
    #[error("Unexpected error: {}", describe_upstream(.status, .detail))]
    Upstream { status: Option<u16>, detail: String },
    #[error("booking is not configured: {0} is missing")]
    Misconfigured(&'static str),
}

fn describe_upstream(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) if detail.is_empty() => code.to_string(),
        Some(code) => format!("{} ({})", code, detail),
        None => detail.to_string(),
    }
}

impl SchedulingError {
    fn upstream(detail: impl Into<String>) -> Self {
        SchedulingError::Upstream {
            status: None,
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for SchedulingError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key.
        let err = err.without_url();
        if err.is_timeout() {
            return SchedulingError::upstream(format!("request timed out: {}", err));
        }
        SchedulingError::upstream(err.to_string())
    }
}

/// Fixed fields sent with every new booking.
#[derive(Debug, Clone, Default)]
pub struct BookingDefaults {
    pub event_type_id: Option<i64>,
    pub attendee_name: Option<String>,
    pub attendee_email: Option<String>,
    pub time_zone: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct CalComClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    defaults: BookingDefaults,
}

impl CalComClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str, defaults: BookingDefaults) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            defaults,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, SchedulingError> {
        let response = request.query(&[("apiKey", self.api_key.as_str())]).send().await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(response),
            StatusCode::UNAUTHORIZED => Err(SchedulingError::Unauthorized),
            StatusCode::NOT_FOUND => Err(SchedulingError::NotFound),
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), body = %body, "scheduling API returned an unexpected status");
                Err(SchedulingError::Upstream {
                    status: Some(status.as_u16()),
                    detail: String::new(),
                })
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SchedulingError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            debug!(body = %text, "unreadable scheduling response");
            SchedulingError::upstream(format!("unreadable response: {}", e))
        })
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>, SchedulingError> {
        let response = self.send(self.http.get(self.url("bookings"))).await?;
        let list: BookingList = Self::read_json(response).await?;
        Ok(list.into_bookings())
    }

    pub async fn list_event_types(&self) -> Result<Vec<EventType>, SchedulingError> {
        let response = self.send(self.http.get(self.url("event-types"))).await?;
        let list: EventTypeList = Self::read_json(response).await?;
        Ok(list.event_types)
    }

    pub async fn create_booking(&self, start: &str, title: &str) -> Result<Booking, SchedulingError> {
        let body = self.booking_payload(start, title)?;
        let response = self.send(self.http.post(self.url("bookings")).json(&body)).await?;
        let value: Value = Self::read_json(response).await?;
        booking_from(value)
    }

    pub async fn cancel_booking(&self, id: BookingId) -> Result<Ack, SchedulingError> {
        self.send(self.http.delete(self.url(&format!("bookings/{}/cancel", id))))
            .await?;
        Ok(Ack {
            message: "Deleted successfully".to_string(),
        })
    }

    pub async fn reschedule_booking(
        &self,
        id: BookingId,
        new_start: &str,
    ) -> Result<Booking, SchedulingError> {
        let response = self
            .send(
                self.http
                    .patch(self.url(&format!("bookings/{}", id)))
                    .json(&json!({ "startTime": new_start })),
            )
            .await?;
        let value: Value = Self::read_json(response).await?;
        booking_from(value)
    }

    fn booking_payload(&self, start: &str, title: &str) -> Result<Value, SchedulingError> {
        let defaults = &self.defaults;
        let event_type_id = defaults
            .event_type_id
            .ok_or(SchedulingError::Misconfigured("CALCOM_EVENT_TYPE_ID"))?;
        let name = defaults
            .attendee_name
            .as_deref()
            .ok_or(SchedulingError::Misconfigured("ATTENDEE_NAME"))?;
        let email = defaults
            .attendee_email
            .as_deref()
            .ok_or(SchedulingError::Misconfigured("ATTENDEE_EMAIL"))?;

        Ok(json!({
            "eventTypeId": event_type_id,
            "start": start,
            "title": title,
            "responses": {
                "name": name,
                "email": email,
                "notes": title,
                "guests": [],
            },
            "metadata": {},
            "timeZone": defaults.time_zone,
            "language": defaults.language,
        }))
    }
}

// Writes come back either bare or wrapped in {"booking": ...}.
fn booking_from(value: Value) -> Result<Booking, SchedulingError> {
    let inner = match value {
        Value::Object(mut map) if map.contains_key("booking") => {
            map.remove("booking").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner)
        .map_err(|e| SchedulingError::upstream(format!("unreadable booking: {}", e)))
}
