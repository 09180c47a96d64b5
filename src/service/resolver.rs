use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clients::openai_client::ModelError;
use crate::models::booking::{Booking, BookingId};
use crate::models::message::Message;
use crate::models::tool::ResponseSchema;
use crate::service::openai_service::LanguageModel;

/// Total model attempts before a resolution is declared failed.
pub const MAX_RESOLVE_ATTEMPTS: usize = 3;

/// `id: None` means no booking matched. That is an answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingIdResolution {
    pub id: Option<BookingId>,
}

impl MeetingIdResolution {
    pub fn none() -> Self {
        Self { id: None }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not resolve meeting after {attempts} attempts: {last_error}")]
    ResolutionFailed { attempts: usize, last_error: String },
    #[error(transparent)]
    ModelCallFailed(#[from] ModelError),
}

/// Maps a free-text time description onto one of the caller's candidate bookings.
pub struct EntityResolver {
    model: Arc<dyn LanguageModel>,
    time_zone: Tz,
}

impl EntityResolver {
    pub fn new(model: Arc<dyn LanguageModel>, time_zone: Tz) -> Self {
        Self { model, time_zone }
    }

    /// The caller filters `candidates` down to the bookings that may be targeted.
    pub async fn resolve(
        &self,
        time_description: &str,
        candidates: &[Booking],
    ) -> Result<MeetingIdResolution, ResolveError> {
        if candidates.is_empty() {
            debug!(time_description, "no candidate bookings, skipping resolution");
            return Ok(MeetingIdResolution::none());
        }

        let schema = meeting_id_schema();
        let mut messages = vec![
            Message::system(RESOLVER_DIRECTIVE),
            Message::user(resolution_query(
                time_description,
                candidates,
                Utc::now(),
                self.time_zone,
            )),
        ];

        let mut last_error = String::new();
        for attempt in 1..=MAX_RESOLVE_ATTEMPTS {
            let raw = self.model.complete_structured(&messages, &schema).await?;
            let checked = match &raw {
                Some(raw) => validate(raw, candidates),
                None => Err("the reply had no content".to_string()),
            };
            match checked {
                Ok(resolution) => {
                    debug!(attempt, id = ?resolution.id, "meeting resolved");
                    return Ok(resolution);
                }
                Err(reason) => {
                    warn!(
                        event_name = "resolver.malformed_output",
                        attempt,
                        reason = %reason,
                        "resolver reply rejected"
                    );
                    if let Some(raw) = raw {
                        messages.push(Message::assistant(raw));
                    }
                    messages.push(Message::user(format!(
                        "That answer was invalid: {}. Reply again with only the JSON object.",
                        reason
                    )));
                    last_error = reason;
                }
            }
        }

        Err(ResolveError::ResolutionFailed {
            attempts: MAX_RESOLVE_ATTEMPTS,
            last_error,
        })
    }
}

const RESOLVER_DIRECTIVE: &str = "You match a user's description of a meeting to one meeting id from a list. \
     Reply ONLY with a JSON object of the shape {\"id\": <integer or null>}. \
     Use null when no meeting in the list fits the description.";

fn resolution_query(
    time_description: &str,
    candidates: &[Booking],
    now: DateTime<Utc>,
    time_zone: Tz,
) -> String {
    let listed: Vec<_> = candidates
        .iter()
        .map(|b| {
            json!({
                "id": b.id,
                "startTime": b.start_time.with_timezone(&time_zone).to_rfc3339(),
                "title": b.title,
            })
        })
        .collect();

    format!(
        "Find the meeting id around this timestamp. If it doesn't exist return null.\n\
         Current date and time: {now}\n\
         Timestamp: {description}\n\n\
         {meetings:#}",
        now = now.with_timezone(&time_zone).to_rfc3339(),
        description = time_description,
        meetings = Value::Array(listed)
    )
}

fn meeting_id_schema() -> ResponseSchema {
    ResponseSchema::new(
        "MeetingId",
        json!({
            "type": "object",
            "properties": {
                "id": { "type": ["integer", "null"] },
            },
            "required": ["id"],
            "additionalProperties": false,
        }),
    )
}

// A missing `id` is malformed, not a quiet `null`.
fn validate(raw: &str, candidates: &[Booking]) -> Result<MeetingIdResolution, String> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| format!("not a JSON object ({})", e))?;
    let id = match value.get("id") {
        None => return Err("the id field is missing".to_string()),
        Some(Value::Null) => None,
        Some(other) => Some(
            other
                .as_i64()
                .ok_or_else(|| format!("id must be an integer or null, got {}", other))?,
        ),
    };
    match id {
        Some(id) if !candidates.iter().any(|b| b.id == id) => {
            Err(format!("{} is not one of the listed meeting ids", id))
        }
        _ => Ok(MeetingIdResolution { id }),
    }
}
