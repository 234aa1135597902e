//! Canonical, provider-neutral request and response types

use std::collections::HashMap;
use serde::{Deserialize, Deserializer, Serialize};

/// A generation model offered by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model
{   /// Backend identifier (e.g. "models/gemini-1.5-pro")
    pub id: String
  , /// Human-readable name
    #[serde(default)]
    pub name: Option<String>
  , #[serde(default)]
    pub description: Option<String>
  , /// Maximum prompt size in tokens
    #[serde(default)]
    pub input_token_limit: Option<u32>
  , /// Maximum tokens the model can generate in one response
    #[serde(default)]
    pub output_token_limit: Option<u32>
}

impl Model
{   pub fn new(id: impl Into<String>) -> Self
    {   Model
        {   id: id.into()
          , name: None
          , description: None
          , input_token_limit: None
          , output_token_limit: None
        }
    }

    /// Id without the "models/" collection prefix.
    pub fn short_id(&self) -> &str
    {   self.id.strip_prefix("models/").unwrap_or(&self.id)
    }
}

/// One chat message as sent by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message
{   #[serde(default)]
    pub role: Option<String>
  , pub content: MessageBody
}

impl Message
{   pub fn new(role: &str, content: impl Into<MessageBody>) -> Self
    {   Message
        {   role: Some(role.to_string())
          , content: content.into()
        }
    }

    pub fn user(content: impl Into<MessageBody>) -> Self
    {   Message::new("user", content)
    }

    pub fn system(content: impl Into<MessageBody>) -> Self
    {   Message::new("system", content)
    }

    pub fn assistant(content: impl Into<MessageBody>) -> Self
    {   Message::new("assistant", content)
    }
}

/// Message content: plain text or an ordered list of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody
{   Text(String)
  , Parts(Vec<ContentItem>)
}

impl From<&str> for MessageBody
{   fn from(s: &str) -> Self
    {   MessageBody::Text(s.to_string())
    }
}

impl From<String> for MessageBody
{   fn from(s: String) -> Self
    {   MessageBody::Text(s)
    }
}

impl From<Vec<ContentItem>> for MessageBody
{   fn from(items: Vec<ContentItem>) -> Self
    {   MessageBody::Parts(items)
    }
}

/// One element of a multi-part message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentItem
{   Raw(String)
  , Structured(MessageContent)
}

impl From<MessageContent> for ContentItem
{   fn from(content: MessageContent) -> Self
    {   ContentItem::Structured(content)
    }
}

/// Structured content part. `kind` is kept as a string so parts of
/// unrecognized types survive deserialization and reach the formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent
{   #[serde(rename = "type")]
    pub kind: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>
}

impl MessageContent
{   pub fn text(text: &str) -> Self
    {   MessageContent
        {   kind: "text".to_string()
          , text: Some(text.to_string())
          , image_url: None
        }
    }

    pub fn image_url(url: &str) -> Self
    {   MessageContent
        {   kind: "image_url".to_string()
          , text: None
          , image_url: Some(ImageUrl::Url(url.to_string()))
        }
    }
}

/// Image reference: either a bare string or the `{"url": ...}` object form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageUrl
{   Url(String)
  , Object
    {   url: String
      , #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>
    }
}

impl ImageUrl
{   pub fn url(&self) -> &str
    {   match self
        {   ImageUrl::Url(url) => url
          , ImageUrl::Object { url, .. } => url
        }
    }
}

/// Sampling and limit options accompanying a completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions
{   #[serde(default)]
    pub temperature: Option<f32>
  , #[serde(default)]
    pub top_p: Option<f32>
  , #[serde(default)]
    pub top_k: Option<u32>
  , /// Number of candidates to generate
    #[serde(default)]
    pub n: Option<u32>
  , #[serde(default, alias = "max_completion_tokens")]
    pub max_tokens: Option<u32>
  , #[serde(default, deserialize_with = "one_or_many")]
    pub stop: Option<Vec<String>>
}

fn one_or_many<'de, D>(deserializer: D)
  -> Result<Option<Vec<String>>, D::Error>
where D: Deserializer<'de>
{   #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany
    {   One(String)
      , Many(Vec<String>)
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)?
    {   Some(OneOrMany::One(s)) => Some(vec![s])
      , Some(OneOrMany::Many(v)) => Some(v)
      , None => None
    })
}

/// Whether a completion is a full response or a stream chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionObject
{   #[serde(rename = "chat.completion")]
    Full
  , #[serde(rename = "chat.completion.chunk")]
    Chunk
}

impl CompletionObject
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   CompletionObject::Full => "chat.completion"
          , CompletionObject::Chunk => "chat.completion.chunk"
        }
    }
}

/// One normalized generated-response unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion
{   /// Backend candidate position
    pub index: u32
  , pub content: String
  , pub object: CompletionObject
  , /// Id of the model that generated it
    pub model: String
  , /// Seconds since the Unix epoch
    pub created: f64
  , pub role: Option<String>
  , pub id: Option<String>
  , pub token_count: Option<u32>
  , /// Null until the terminal chunk for this index
    pub finish_reason: Option<String>
}

/// Adapter candidates grouped with the role mapping used to dispatch them.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateData<C>
{   pub candidates: Vec<C>
  , pub system_prompt: Option<String>
  , /// Canonical role -> backend role
    pub role_table: HashMap<String, String>
}

impl<C> CandidateData<C>
{   pub fn new(role_table: HashMap<String, String>) -> Self
    {   CandidateData
        {   candidates: vec![]
          , system_prompt: None
          , role_table
        }
    }

    /// Look up the backend role for a canonical role.
    pub fn resolve_role(&self, role: &str)
      -> Result<&str, crate::error::Error>
    {   self.role_table.get(role)
          .map(String::as_str)
          .ok_or_else(|| {
            crate::error::Error::InvalidRequest(
              format!("Unresolved message role: {}", role)
            )
          })
    }

    /// Append text to the system prompt, separating entries by a blank line.
    pub fn push_system_text(&mut self, text: &str)
    {   match &mut self.system_prompt
        {   Some(prompt) => {
              prompt.push_str("\n\n");
              prompt.push_str(text);
            }
          , None => {
              self.system_prompt = Some(text.to_string());
            }
        }
    }
}
