//! OpenAI-compatible request/response bodies for the front end

use serde::{Deserialize, Serialize};
use crate::error::Error;
use crate::request::{Completion, CompletionOptions, Message, Model};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest
{   pub model: String
  , pub messages: Vec<Message>
  , #[serde(default)]
    pub stream: bool
  , #[serde(flatten)]
    pub options: CompletionOptions
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelList
{   pub object: &'static str
  , pub data: Vec<ModelEntry>
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry
{   pub id: String
  , pub object: &'static str
  , pub owned_by: &'static str
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub input_token_limit: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub output_token_limit: Option<u32>
}

impl ModelList
{   pub fn from_models(models: Vec<Model>) -> Self
    {   ModelList
        {   object: "list"
          , data: models.into_iter()
              .map(|model| ModelEntry
              {   id: model.short_id().to_string()
                , object: "model"
                , owned_by: "google"
                , name: model.name
                , description: model.description
                , input_token_limit: model.input_token_limit
                , output_token_limit: model.output_token_limit
              })
              .collect()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionResponse
{   pub id: String
  , pub object: &'static str
  , pub created: i64
  , pub model: String
  , pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Serialize)]
pub struct Choice
{   pub index: u32
  , pub message: ChoiceMessage
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceMessage
{   pub role: String
  , pub content: String
}

impl ChatCompletionResponse
{   pub fn from_completions(completions: &[Completion], model: &str) -> Self
    {   let created = completions.first()
          .map(|c| c.created)
          .unwrap_or_else(|| chrono::Utc::now().timestamp() as f64);
        ChatCompletionResponse
        {   id: completions.first()
              .map(response_id)
              .unwrap_or_else(|| fallback_id(created))
          , object: "chat.completion"
          , created: created as i64
          , model: model.to_string()
          , choices: completions.iter()
              .map(|c| Choice
              {   index: c.index
                , message: ChoiceMessage
                  {   role: openai_role(c.role.as_deref())
                    , content: c.content.clone()
                  }
                , finish_reason: c.finish_reason.as_deref()
                    .map(openai_finish_reason)
              })
              .collect()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk
{   pub id: String
  , pub object: &'static str
  , pub created: i64
  , pub model: String
  , pub choices: Vec<ChunkChoice>
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice
{   pub index: u32
  , pub delta: Delta
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Serialize)]
pub struct Delta
{   pub role: String
  , pub content: String
}

impl ChatCompletionChunk
{   pub fn from_completion(completion: &Completion, model: &str) -> Self
    {   ChatCompletionChunk
        {   id: response_id(completion)
          , object: "chat.completion.chunk"
          , created: completion.created as i64
          , model: model.to_string()
          , choices: vec![ChunkChoice
            {   index: completion.index
              , delta: Delta
                {   role: openai_role(completion.role.as_deref())
                  , content: completion.content.clone()
                }
              , finish_reason: completion.finish_reason.as_deref()
                  .map(openai_finish_reason)
            }]
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody
{   pub error: ErrorDetail
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail
{   pub message: String
  , #[serde(rename = "type")]
    pub kind: String
}

impl ErrorBody
{   pub fn new(message: impl Into<String>, kind: impl Into<String>) -> Self
    {   ErrorBody
        {   error: ErrorDetail
            {   message: message.into()
              , kind: kind.into()
            }
        }
    }
}

impl From<&Error> for ErrorBody
{   fn from(error: &Error) -> Self
    {   ErrorBody::new(error.to_string(), error.kind())
    }
}

fn response_id(completion: &Completion) -> String
{   completion.id.clone()
      .unwrap_or_else(|| fallback_id(completion.created))
}

fn fallback_id(created: f64) -> String
{   format!("chatcmpl-{}", (created * 1000.0) as i64)
}

/// Backend role -> OpenAI role.
pub fn openai_role(role: Option<&str>) -> String
{   match role
    {   Some("model") | None => "assistant".to_string()
      , Some(other) => other.to_string()
    }
}

/// Backend finish reason -> OpenAI finish reason.
pub fn openai_finish_reason(reason: &str) -> String
{   match reason
    {   "STOP" => "stop".to_string()
      , "MAX_TOKENS" => "length".to_string()
      , "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT"
      | "SPII" | "IMAGE_SAFETY" => "content_filter".to_string()
      , other => other.to_lowercase()
    }
}
