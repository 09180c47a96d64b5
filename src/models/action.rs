use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::models::message::Message;
use crate::models::tool::ToolCall;

/// The closed set of operations the model may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    BookMeeting,
    ListMeetings,
    CancelMeeting,
    RescheduleMeeting,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::BookMeeting,
        ActionKind::ListMeetings,
        ActionKind::CancelMeeting,
        ActionKind::RescheduleMeeting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::BookMeeting => "book_meeting",
            ActionKind::ListMeetings => "get_scheduled_events",
            ActionKind::CancelMeeting => "cancel_meeting",
            ActionKind::RescheduleMeeting => "reschedule_meeting",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookMeetingArgs {
    pub time: String,
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CancelMeetingArgs {
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RescheduleMeetingArgs {
    pub original_time: String,
    pub new_time: String,
}

/// An action with its decoded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    BookMeeting(BookMeetingArgs),
    ListMeetings,
    CancelMeeting(CancelMeetingArgs),
    RescheduleMeeting(RescheduleMeetingArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub correlation_id: String,
    pub kind: ActionKind,
    pub arguments: String,
}

impl ToolInvocation {
    /// Returns `None` for calls outside the catalog.
    pub fn from_call(call: &ToolCall) -> Option<Self> {
        if !call.is_function() {
            return None;
        }
        let kind = ActionKind::from_name(&call.function.name)?;
        Some(Self {
            correlation_id: call.id.clone(),
            kind,
            arguments: call.function.arguments.clone(),
        })
    }

    pub fn to_call(&self) -> ToolCall {
        ToolCall::function(&self.correlation_id, self.kind.name(), &self.arguments)
    }

    pub fn decode(&self) -> Result<Action, serde_json::Error> {
        let action = match self.kind {
            ActionKind::BookMeeting => Action::BookMeeting(serde_json::from_str(&self.arguments)?),
            ActionKind::ListMeetings => Action::ListMeetings,
            ActionKind::CancelMeeting => {
                Action::CancelMeeting(serde_json::from_str(&self.arguments)?)
            }
            ActionKind::RescheduleMeeting => {
                Action::RescheduleMeeting(serde_json::from_str(&self.arguments)?)
            }
        };
        Ok(action)
    }
}

/// What came of executing one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ToolOutcome {
    Success(Value),
    MeetingNotFound { query: String },
    Failed(String),
}

impl ToolOutcome {
    pub fn payload(&self) -> Value {
        match self {
            ToolOutcome::Success(value) => value.clone(),
            ToolOutcome::MeetingNotFound { query } => json!({
                "error": "Could not find meeting",
                "query": query,
            }),
            ToolOutcome::Failed(reason) => json!({ "error": reason }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub correlation_id: String,
    pub kind: ActionKind,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn new(invocation: &ToolInvocation, outcome: ToolOutcome) -> Self {
        Self {
            correlation_id: invocation.correlation_id.clone(),
            kind: invocation.kind,
            outcome,
        }
    }

    pub fn into_message(self) -> Message {
        Message::Tool {
            tool_call_id: self.correlation_id,
            name: self.kind.name().to_string(),
            content: format!("{:#}", self.outcome.payload()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_and_non_function_calls_are_not_invocations() {
        assert!(ToolInvocation::from_call(&ToolCall::function("c1", "delete_calendar", "{}")).is_none());

        let mut call = ToolCall::function("c2", "cancel_meeting", "{\"time\":\"3pm\"}");
        call.kind = "code_interpreter".to_string();
        assert!(ToolInvocation::from_call(&call).is_none());
    }

    #[test]
    fn decodes_reschedule_arguments() {
        let call = ToolCall::function(
            "c3",
            "reschedule_meeting",
            r#"{"original_time": "tomorrow 3pm", "new_time": "2024-07-05T15:00:00.000-04:00"}"#,
        );
        let invocation = ToolInvocation::from_call(&call).unwrap();
        assert_eq!(
            invocation.decode().unwrap(),
            Action::RescheduleMeeting(RescheduleMeetingArgs {
                original_time: "tomorrow 3pm".to_string(),
                new_time: "2024-07-05T15:00:00.000-04:00".to_string(),
            })
        );
        assert_eq!(invocation.to_call(), call);
    }

    #[test]
    fn list_meetings_ignores_its_arguments() {
        let invocation =
            ToolInvocation::from_call(&ToolCall::function("c4", "get_scheduled_events", "")).unwrap();
        assert_eq!(invocation.decode().unwrap(), Action::ListMeetings);
    }

    #[test]
    fn missing_required_argument_fails_to_decode() {
        let invocation =
            ToolInvocation::from_call(&ToolCall::function("c5", "book_meeting", r#"{"time": "noon"}"#))
                .unwrap();
        assert!(invocation.decode().is_err());
    }

    #[test]
    fn not_found_result_becomes_an_error_tool_message() {
        let invocation =
            ToolInvocation::from_call(&ToolCall::function("c6", "cancel_meeting", "{}")).unwrap();
        let message = ToolResult::new(
            &invocation,
            ToolOutcome::MeetingNotFound {
                query: "friday".to_string(),
            },
        )
        .into_message();

        let Message::Tool { tool_call_id, name, content } = message else {
            panic!("expected a tool message");
        };
        assert_eq!(tool_call_id, "c6");
        assert_eq!(name, "cancel_meeting");
        let payload: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(payload["error"], "Could not find meeting");
        assert_eq!(payload["query"], "friday");
    }
}
