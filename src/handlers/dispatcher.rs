use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::clients::openai_client::ModelError;
use crate::models::action::{Action, ToolInvocation, ToolOutcome, ToolResult};
use crate::models::booking::{Booking, BookingId};
use crate::models::conversation::Conversation;
use crate::models::message::Message;
use crate::models::tool::ToolDefinition;
use crate::service::catalog::{system_directive, tool_catalog};
use crate::service::openai_service::LanguageModel;
use crate::service::resolver::EntityResolver;
use crate::service::scheduling_service::SchedulingClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Selecting,
    Synthesizing,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnStage::Selecting => write!(f, "selecting tools"),
            TurnStage::Synthesizing => write!(f, "synthesizing a reply"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("model call failed while {stage}: {source}")]
    ModelCallFailed {
        stage: TurnStage,
        #[source]
        source: ModelError,
    },
}

impl DispatchError {
    fn at(stage: TurnStage) -> impl FnOnce(ModelError) -> Self {
        move |source| DispatchError::ModelCallFailed { stage, source }
    }
}

/// Runs one chat turn: tool selection, in-order execution, reply synthesis.
pub struct ToolDispatcher {
    model: Arc<dyn LanguageModel>,
    scheduling: Arc<dyn SchedulingClient>,
    resolver: EntityResolver,
    catalog: Vec<ToolDefinition>,
    time_zone: Tz,
}

impl ToolDispatcher {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        scheduling: Arc<dyn SchedulingClient>,
        time_zone: Tz,
    ) -> Self {
        Self {
            resolver: EntityResolver::new(model.clone(), time_zone),
            catalog: tool_catalog(time_zone),
            model,
            scheduling,
            time_zone,
        }
    }

    /// Returns `history` extended with this turn, without the system directive.
    pub async fn handle_turn(
        &self,
        history: Vec<Message>,
        query: &str,
    ) -> Result<Vec<Message>, DispatchError> {
        let turn_id = Uuid::new_v4();
        let span = info_span!("chat_turn", %turn_id, history_len = history.len());
        self.run_turn(history, query).instrument(span).await
    }

    async fn run_turn(
        &self,
        history: Vec<Message>,
        query: &str,
    ) -> Result<Vec<Message>, DispatchError> {
        let mut conversation =
            Conversation::start(system_directive(Utc::now(), self.time_zone), history);
        conversation.push(Message::user(query));

        let selection = self
            .model
            .complete(conversation.messages(), &self.catalog)
            .await
            .map_err(DispatchError::at(TurnStage::Selecting))?;

        let invocations: Vec<ToolInvocation> = selection
            .tool_calls
            .iter()
            .filter_map(|call| {
                let invocation = ToolInvocation::from_call(call);
                if invocation.is_none() {
                    warn!(
                        event_name = "dispatch.unknown_tool",
                        tool = %call.function.name,
                        kind = %call.kind,
                        correlation_id = %call.id,
                        "skipping tool call outside the catalog"
                    );
                }
                invocation
            })
            .collect();

        if invocations.is_empty() {
            info!(event_name = "dispatch.direct_reply", "model answered without tools");
            conversation.push(Message::assistant(selection.content.unwrap_or_default()));
            return Ok(conversation.into_history());
        }

        // Only calls that get a result are echoed back, so every call in the log is paired.
        conversation.push(Message::Assistant {
            content: selection.content,
            tool_calls: invocations.iter().map(ToolInvocation::to_call).collect(),
        });

        for invocation in &invocations {
            let result = self.execute(invocation).await;
            conversation.push(result.into_message());
        }

        let reply = self
            .model
            .complete(conversation.messages(), &[])
            .await
            .map_err(DispatchError::at(TurnStage::Synthesizing))?;
        conversation.push(Message::assistant(reply.content.unwrap_or_default()));

        info!(
            event_name = "dispatch.turn_complete",
            tools_run = invocations.len(),
            "chat turn complete"
        );
        Ok(conversation.into_history())
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult {
        let outcome = match invocation.decode() {
            Ok(action) => self.run(action).await,
            Err(err) => ToolOutcome::Failed(format!(
                "invalid arguments for {}: {}",
                invocation.kind.name(),
                err
            )),
        };

        if outcome.is_success() {
            info!(
                event_name = "dispatch.tool_succeeded",
                tool = invocation.kind.name(),
                correlation_id = %invocation.correlation_id,
                "tool executed"
            );
        } else {
            warn!(
                event_name = "dispatch.tool_failed",
                tool = invocation.kind.name(),
                correlation_id = %invocation.correlation_id,
                outcome = ?outcome,
                "tool did not succeed"
            );
        }

        ToolResult::new(invocation, outcome)
    }

    async fn run(&self, action: Action) -> ToolOutcome {
        match action {
            Action::BookMeeting(args) => {
                outcome_of(self.scheduling.create_booking(&args.time, &args.purpose).await)
            }
            Action::ListMeetings => match self.scheduling.list_bookings().await {
                Ok(bookings) => ToolOutcome::Success(json!({ "bookings": bookings })),
                Err(err) => ToolOutcome::Failed(err.to_string()),
            },
            Action::CancelMeeting(args) => match self.find_active(&args.time).await {
                Ok(Some(id)) => outcome_of(self.scheduling.cancel_booking(id).await),
                Ok(None) => ToolOutcome::MeetingNotFound { query: args.time },
                Err(outcome) => outcome,
            },
            Action::RescheduleMeeting(args) => match self.find_active(&args.original_time).await {
                Ok(Some(id)) => {
                    outcome_of(self.scheduling.reschedule_booking(id, &args.new_time).await)
                }
                Ok(None) => ToolOutcome::MeetingNotFound {
                    query: args.original_time,
                },
                Err(outcome) => outcome,
            },
        }
    }

    /// Resolves a description against the bookings that are still active.
    async fn find_active(&self, time_description: &str) -> Result<Option<BookingId>, ToolOutcome> {
        let bookings = self
            .scheduling
            .list_bookings()
            .await
            .map_err(|err| ToolOutcome::Failed(err.to_string()))?;
        let active: Vec<Booking> = bookings.into_iter().filter(Booking::is_active).collect();

        let resolution = self
            .resolver
            .resolve(time_description, &active)
            .await
            .map_err(|err| ToolOutcome::Failed(err.to_string()))?;
        Ok(resolution.id)
    }
}

fn outcome_of<T: Serialize, E: fmt::Display>(result: Result<T, E>) -> ToolOutcome {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(payload) => ToolOutcome::Success(payload),
            Err(err) => ToolOutcome::Failed(err.to_string()),
        },
        Err(err) => ToolOutcome::Failed(err.to_string()),
    }
}
