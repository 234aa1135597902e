//! Backend responses -> canonical completions

use log::{error, trace};
use crate::config::EmptyCandidatePolicy;
use crate::error::Error;
use crate::request::{Completion, CompletionObject};
use super::wire::{GenerateContentResponse, ResponseCandidate};

/// Seconds since the epoch for an RFC 3339 timestamp, or now.
pub fn created_at(create_time: Option<&str>) -> f64
{   create_time
      .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
      .map(|t| t.timestamp_millis() as f64 / 1000.0)
      .unwrap_or_else(|| {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
      })
}

/// Generated text of a candidate, or `None` when no part carries
/// non-thought text.
pub fn candidate_text(candidate: &ResponseCandidate) -> Option<String>
{   let texts: Vec<&str> = candidate.content.as_ref()?
      .parts.iter()
      .filter(|part| part.thought != Some(true))
      .filter_map(|part| part.text.as_deref())
      .collect();
    if texts.is_empty()
    {   return None;
    }
    Some(texts.concat())
}

/// Convert every candidate that produced content, in ascending index order.
pub fn to_completions(
  response: &GenerateContentResponse
, model_id: &str
, object: CompletionObject
, empty_candidates: EmptyCandidatePolicy
) -> Result<Vec<Completion>, Error>
{   let created = created_at(response.create_time.as_deref());
    let mut completions = vec![];

    for candidate in &response.candidates
    {   let content = match candidate_text(candidate)
        {   Some(content) => content
          , None => match empty_candidates
            {   EmptyCandidatePolicy::Filter => {
                  trace!("Skipping empty candidate {}", candidate.index);
                  continue;
                }
              , EmptyCandidatePolicy::Reject => {
                  error!("Candidate {} has no content", candidate.index);
                  return Err(Error::Provider(format!(
                    "candidate {} has no content (finish reason {:?})"
                  , candidate.index
                  , candidate.finish_reason
                  )));
                }
            }
        };

        completions.push(Completion
        {   index: candidate.index
          , content
          , object
          , model: model_id.to_string()
          , created
          , role: candidate.content.as_ref()
              .and_then(|c| c.role.clone())
          , id: response.response_id.clone()
          , token_count: candidate.token_count
          , finish_reason: candidate.finish_reason.clone()
        });
    }

    completions.sort_by_key(|c| c.index);
    Ok(completions)
}
