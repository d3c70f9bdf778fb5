//! Domain models for the relay service.

pub mod chat;

pub use chat::{ChatRequest, ChatResponse, Question};
