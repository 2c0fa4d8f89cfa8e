pub mod settings;

pub use settings::{
    AuthConfig, ConversationConfig, DatabaseConfig, GenerationConfig, ServerConfig, Settings,
};
