pub mod action;
pub mod booking;
pub mod conversation;
pub mod message;
pub mod tool;
