#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use bookingBot::clients::calcom_client::SchedulingError;
use bookingBot::clients::openai_client::{AssistantReply, ModelError};
use bookingBot::models::booking::{Ack, Booking, BookingId, BookingStatus};
use bookingBot::models::message::Message;
use bookingBot::models::tool::{ResponseSchema, ToolCall, ToolDefinition};
use bookingBot::service::openai_service::LanguageModel;
use bookingBot::service::scheduling_service::SchedulingClient;
use chrono::{TimeZone, Utc};

/// One recorded `complete` call.
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Replays queued replies in order. An exhausted queue fails the call.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<AssistantReply, ModelError>>>,
    structured: Mutex<VecDeque<Result<Option<String>, ModelError>>>,
    pub completions: Mutex<Vec<CompletionCall>>,
    pub structured_calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_with_tools(self, content: Option<&str>, tool_calls: Vec<ToolCall>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(AssistantReply {
            content: content.map(str::to_string),
            tool_calls,
            refusal: None,
        }));
        self
    }

    pub fn reply(self, content: &str) -> Self {
        self.reply_with_tools(Some(content), Vec::new())
    }

    pub fn reply_error(self, status: u16) -> Self {
        self.replies.lock().unwrap().push_back(Err(ModelError::Status {
            status,
            body: "upstream failure".to_string(),
        }));
        self
    }

    pub fn structured(self, raw: &str) -> Self {
        self.structured.lock().unwrap().push_back(Ok(Some(raw.to_string())));
        self
    }

    /// A structured reply with no content, as a refusal arrives.
    pub fn structured_empty(self) -> Self {
        self.structured.lock().unwrap().push_back(Ok(None));
        self
    }

    pub fn structured_error(self, status: u16) -> Self {
        self.structured.lock().unwrap().push_back(Err(ModelError::Status {
            status,
            body: "upstream failure".to_string(),
        }));
        self
    }

    pub fn completion_count(&self) -> usize {
        self.completions.lock().unwrap().len()
    }

    pub fn structured_count(&self) -> usize {
        self.structured_calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply, ModelError> {
        self.completions.lock().unwrap().push(CompletionCall {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name().to_string()).collect(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ModelError::EmptyResponse))
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        _schema: &ResponseSchema,
    ) -> Result<Option<String>, ModelError> {
        self.structured_calls.lock().unwrap().push(messages.to_vec());
        self.structured
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ModelError::EmptyResponse))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingCall {
    List,
    Create { start: String, title: String },
    Cancel(BookingId),
    Reschedule { id: BookingId, new_start: String },
}

/// In-memory scheduling backend that records every call.
#[derive(Default)]
pub struct FakeScheduling {
    pub bookings: Vec<Booking>,
    pub list_error: Option<SchedulingError>,
    pub write_error: Option<SchedulingError>,
    pub calls: Mutex<Vec<SchedulingCall>>,
}

impl FakeScheduling {
    pub fn with_bookings(bookings: Vec<Booking>) -> Self {
        Self {
            bookings,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SchedulingCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<SchedulingCall> {
        self.calls()
            .into_iter()
            .filter(|c| *c != SchedulingCall::List)
            .collect()
    }

    fn record(&self, call: SchedulingCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_result(&self) -> Result<(), SchedulingError> {
        match &self.write_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl SchedulingClient for FakeScheduling {
    async fn list_bookings(&self) -> Result<Vec<Booking>, SchedulingError> {
        self.record(SchedulingCall::List);
        match &self.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.bookings.clone()),
        }
    }

    async fn create_booking(&self, start: &str, title: &str) -> Result<Booking, SchedulingError> {
        self.record(SchedulingCall::Create {
            start: start.to_string(),
            title: title.to_string(),
        });
        self.write_result()?;
        Ok(Booking {
            id: 900,
            title: title.to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 7, 4, 19, 0, 0).unwrap(),
            end_time: None,
            status: BookingStatus::Accepted,
        })
    }

    async fn cancel_booking(&self, id: BookingId) -> Result<Ack, SchedulingError> {
        self.record(SchedulingCall::Cancel(id));
        self.write_result()?;
        Ok(Ack {
            message: "Deleted successfully".to_string(),
        })
    }

    async fn reschedule_booking(
        &self,
        id: BookingId,
        new_start: &str,
    ) -> Result<Booking, SchedulingError> {
        self.record(SchedulingCall::Reschedule {
            id,
            new_start: new_start.to_string(),
        });
        self.write_result()?;
        let mut booking = self
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(SchedulingError::NotFound)?;
        booking.status = BookingStatus::Accepted;
        Ok(booking)
    }
}

pub fn booking(id: BookingId, title: &str, day: u32, hour: u32, status: BookingStatus) -> Booking {
    Booking {
        id,
        title: title.to_string(),
        start_time: Utc.with_ymd_and_hms(2024, 7, day, hour, 0, 0).unwrap(),
        end_time: None,
        status,
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall::function(id, name, arguments)
}

pub fn tool_messages(history: &[Message]) -> Vec<(String, String, serde_json::Value)> {
    history
        .iter()
        .filter_map(|m| match m {
            Message::Tool {
                tool_call_id,
                name,
                content,
            } => Some((
                tool_call_id.clone(),
                name.clone(),
                serde_json::from_str(content).unwrap_or(serde_json::Value::Null),
            )),
            _ => None,
        })
        .collect()
}
