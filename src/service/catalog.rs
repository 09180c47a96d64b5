use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::json;

use crate::models::action::ActionKind;
use crate::models::tool::ToolDefinition;

/// Tool definitions offered to the model during selection. Fixed for the
/// lifetime of the process.
pub fn tool_catalog(time_zone: Tz) -> Vec<ToolDefinition> {
    ActionKind::ALL
        .into_iter()
        .map(|kind| definition(kind, time_zone))
        .collect()
}

fn definition(kind: ActionKind, time_zone: Tz) -> ToolDefinition {
    let timestamp_hint = format!(
        "The date and time for the meeting as an RFC3339 timestamp, eg: 2024-07-03T16:40:00.000-04:00. \
         The user's timezone is {tz}, so use the matching offset. \
         Don't ask for this format from the user, convert the user's query into this format",
        tz = time_zone.name()
    );

    match kind {
        ActionKind::BookMeeting => ToolDefinition::function(
            kind.name(),
            "Book or schedule a meeting for the user",
            json!({
                "type": "object",
                "properties": {
                    "time": { "type": "string", "description": timestamp_hint },
                    "purpose": {
                        "type": "string",
                        "description": "The purpose/reason/title of the meeting",
                    },
                },
                "required": ["time", "purpose"],
            }),
        ),
        ActionKind::ListMeetings => ToolDefinition::function(
            kind.name(),
            "Get list of scheduled events/meetings of the user",
            json!({ "type": "object", "properties": {} }),
        ),
        ActionKind::CancelMeeting => ToolDefinition::function(
            kind.name(),
            "Cancel a meeting for the user",
            json!({
                "type": "object",
                "properties": {
                    "time": {
                        "type": "string",
                        "description": "The date and time of the meeting to cancel, as the user described it",
                    },
                },
                "required": ["time"],
            }),
        ),
        ActionKind::RescheduleMeeting => ToolDefinition::function(
            kind.name(),
            "Reschedule a meeting for the user",
            json!({
                "type": "object",
                "properties": {
                    "original_time": {
                        "type": "string",
                        "description": "The current date and time of the meeting, as the user described it",
                    },
                    "new_time": { "type": "string", "description": timestamp_hint },
                },
                "required": ["original_time", "new_time"],
            }),
        ),
    }
}

pub fn system_directive(now: DateTime<Utc>, time_zone: Tz) -> String {
    format!(
        "You are a chatbot who helps users to manage their events by interacting with their cal.com account. \
         When listing their meetings only list active ones by default unless they ask for canceled ones as well.\n\
         Current date and time: {now}\n\
         User timezone: {tz}",
        now = now.with_timezone(&time_zone).to_rfc3339(),
        tz = time_zone.name()
    )
}
