use async_trait::async_trait;
use tracing::warn;

use crate::clients::openai_client::{AssistantReply, ChatCompletionRequest, ModelError, OpenAIClient};
use crate::models::message::Message;
use crate::models::tool::{ResponseSchema, ToolDefinition};

/// The two completion shapes the chat loop consumes.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-form completion. A non-empty `tools` slice is offered with automatic tool choice.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply, ModelError>;

    /// Schema-constrained completion. Returns the raw content, or `None` when the
    /// model sent none (a refusal); the caller validates it.
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &ResponseSchema,
    ) -> Result<Option<String>, ModelError>;
}

pub struct OpenAIService {
    client: OpenAIClient,
    chat_model: String,
    structured_model: String,
}

impl OpenAIService {
    pub fn new(client: OpenAIClient, chat_model: String, structured_model: String) -> Self {
        Self {
            client,
            chat_model,
            structured_model,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIService {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply, ModelError> {
        let with_tools = !tools.is_empty();
        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages,
            tools: with_tools.then_some(tools),
            tool_choice: with_tools.then_some("auto"),
            response_format: None,
            temperature: 0.2,
        };
        self.client.chat_completion(&request).await
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &ResponseSchema,
    ) -> Result<Option<String>, ModelError> {
        let request = ChatCompletionRequest {
            model: &self.structured_model,
            messages,
            tools: None,
            tool_choice: None,
            response_format: Some(schema.response_format()),
            temperature: 0.0,
        };
        let reply = self.client.chat_completion(&request).await?;
        if let Some(refusal) = &reply.refusal {
            warn!(event_name = "model.structured_refusal", refusal = %refusal, "structured request refused");
        }
        Ok(reply.content)
    }
}
