pub mod catalog;
pub mod openai_service;
pub mod resolver;
pub mod scheduling_service;
