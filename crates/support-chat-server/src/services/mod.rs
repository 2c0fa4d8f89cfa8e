pub mod conversation;
pub mod faq_service;
pub mod gemini;

pub use conversation::ConversationManager;
pub use faq_service::FaqService;
pub use gemini::GeminiClient;
