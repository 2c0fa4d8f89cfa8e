pub mod chat;
pub mod faq;
pub mod health;
