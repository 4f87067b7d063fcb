pub mod chat;
pub mod error;
pub mod retry;
pub mod util;

pub use chat::{ChatApi, Message, MessageRole, OpenAiChat};
pub use error::LlmError;
pub use retry::{retry, RetryPolicy};
