//! Raw backend chunk stream -> completion chunk stream

use std::collections::HashSet;
use futures::stream::StreamExt;
use log::debug;
use crate::config::EmptyCandidatePolicy;
use crate::request::{Completion, CompletionObject};
use crate::service::CompletionStream;
use super::backend::ResponseStream;
use super::response::to_completions;

/// Tracks which candidate indices have reached a terminal chunk.
#[derive(Debug, Default)]
pub struct FinishGate
{   finished: HashSet<u32>
}

impl FinishGate
{   pub fn new() -> Self
    {   FinishGate::default()
    }

    /// Whether the chunk may be forwarded. A chunk carrying a finish
    /// reason closes its index.
    pub fn admit(&mut self, completion: &Completion) -> bool
    {   if self.finished.contains(&completion.index)
        {   debug!(
              "Suppressing chunk for finished index {}",
              completion.index
            );
            return false;
        }
        if completion.finish_reason.is_some()
        {   self.finished.insert(completion.index);
        }
        true
    }
}

/// Adapt a backend stream. Chunks keep backend order; candidates without
/// content are skipped; nothing is emitted for an index after its
/// terminal chunk.
pub fn completion_stream(
  raw: ResponseStream
, model_id: String
) -> CompletionStream
{   let stream = async_stream::try_stream! {
      let mut raw = raw;
      let mut gate = FinishGate::new();
      while let Some(chunk) = raw.next().await
      {   let chunk = chunk?;
          let completions = to_completions(
            &chunk
          , &model_id
          , CompletionObject::Chunk
          , EmptyCandidatePolicy::Filter
          )?;
          for completion in completions
          {   if gate.admit(&completion)
              {   yield completion;
              }
          }
      }
      debug!("Backend stream for {} finished", model_id);
    };
    Box::pin(stream)
}
