//! LLM provider implementations

mod factory;
mod http_client;
mod openai;

pub use factory::{LlmProviderFactory, ModelBackends, OPENAI_API_KEY_ENV, ResolvedBackend};
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::{DEFAULT_OLLAMA_BASE_URL, DEFAULT_OPENAI_BASE_URL, OpenAiProvider};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
