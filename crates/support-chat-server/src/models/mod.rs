pub mod chat;

pub use chat::{ChatMessageDto, ChatRequest, ChatSessionDto, FaqDto, FaqQuery};
