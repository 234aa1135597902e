pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod backoff;
pub mod service;
pub mod server;

/*

genbridge: one provider-neutral completion API in front of Google's
generation backends (AI Studio and Vertex AI), plus an OpenAI-compatible
HTTP front end.

genbridge/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports
│   ├── main.rs         # Server binary
│   ├── error.rs        # Shared error taxonomy
│   ├── config.rs       # Process, backend, upload and content config
│   ├── request.rs      # Canonical request/response types
│   ├── backoff.rs      # Asset poll timing
│   ├── service.rs      # CompletionService trait
│   ├── providers/
│   │   └── genai/      # The Google adapter
│   └── server/         # axum router, bearer auth, OpenAI bodies
└── tests/

*/

pub use error::Error;
pub use service::{CompletionService, CompletionStream};
pub use request::{
  Completion, CompletionObject, CompletionOptions, ContentItem, ImageUrl,
  Message, MessageBody, MessageContent, Model
};
pub use config::{AppConfig, Credentials, GenAiConfig};
pub use providers::GenerativeAi;
