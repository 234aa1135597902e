//! The completion capability set every backend adapter implements

use async_trait::async_trait;
use futures::stream::BoxStream;
use crate::error::Error;
use crate::request::{Completion, CompletionOptions, Message, Model};

/// Lazy, single-pass sequence of completion chunks. Dropping it stops
/// production and releases the backend connection.
pub type CompletionStream = BoxStream<'static, Result<Completion, Error>>;

/// Provider-neutral completion service.
///
/// `Candidate` is the adapter's own translated message type: candidates
/// produced by one adapter's `format_messages` can only be handed back to
/// that adapter.
#[async_trait]
pub trait CompletionService: Send + Sync
{   type Candidate: Send + Sync + 'static;

    /// Models offered by the backend
    async fn models(&self) -> Result<Vec<Model>, Error>;

    /// One completion per candidate that produced content, ordered by
    /// ascending backend index
    async fn chat_completion(
      &self
    , model: &Model
    , candidates: &[Self::Candidate]
    , options: &CompletionOptions
    ) -> Result<Vec<Completion>, Error>;

    /// Streamed completion chunks; per index, `finish_reason` is set only
    /// on the last chunk
    async fn chat_completion_stream(
      &self
    , model: &Model
    , candidates: &[Self::Candidate]
    , options: &CompletionOptions
    ) -> Result<CompletionStream, Error>;

    /// Advisory prompt size; may overestimate
    async fn count_tokens(
      &self
    , model: &Model
    , candidates: &[Self::Candidate]
    ) -> Result<u64, Error>;

    /// Translate messages, resolving every image reference
    async fn format_messages(&self, messages: &[Message])
      -> Result<Vec<Self::Candidate>, Error>;
}
