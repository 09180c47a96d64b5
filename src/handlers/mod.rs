pub mod chat;
pub mod dispatcher;
