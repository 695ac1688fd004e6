pub mod openai;

pub use openai::{CompletionClient, CompletionError, CompletionRequest, MockCompletions, OpenAiClient, OpenAiClientConfig};
