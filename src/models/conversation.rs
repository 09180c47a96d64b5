use crate::models::message::Message;

/// Ordered context for a single chat turn. Callers hand over their history
/// by value and get the extended history back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn start(directive: impl Into<String>, history: Vec<Message>) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(Message::system(directive));
        messages.extend(history);
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops the leading directive.
    pub fn into_history(self) -> Vec<Message> {
        let mut messages = self.messages;
        if messages.first().is_some_and(Message::is_system) {
            messages.remove(0);
        }
        messages
    }
}
