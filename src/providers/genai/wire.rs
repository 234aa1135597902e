//! Generative Language REST request/response shapes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<Part>
}

/// One content part. Exactly one of the payload fields is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>
}

impl Part
{   pub fn text(text: impl Into<String>) -> Self
    {   Part
        {   text: Some(text.into())
          , ..Part::default()
        }
    }

    pub fn inline(blob: Blob) -> Self
    {   Part
        {   inline_data: Some(blob)
          , ..Part::default()
        }
    }

    pub fn file(file_data: FileData) -> Self
    {   Part
        {   file_data: Some(file_data)
          , ..Part::default()
        }
    }
}

/// Inline bytes, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob
{   pub mime_type: String
  , pub data: String
}

/// Reference to a file in the backend asset store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData
{   pub mime_type: String
  , pub file_uri: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   pub temperature: f32
  , pub top_p: f32
  , pub top_k: u32
  , pub candidate_count: u32
  , pub max_output_tokens: u32
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory
{   HarmCategoryHarassment
  , HarmCategoryHateSpeech
  , HarmCategorySexuallyExplicit
  , HarmCategoryDangerousContent
  , HarmCategoryCivicIntegrity
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold
{   Off
  , BlockNone
  , BlockOnlyHigh
  , BlockMediumAndAbove
  , BlockLowAndAbove
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting
{   pub category: HarmCategory
  , pub threshold: HarmBlockThreshold
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , pub generation_config: GenerationConfig
  , pub safety_settings: Vec<SafetySetting>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<ResponseCandidate>
  , #[serde(default)]
    pub response_id: Option<String>
  , /// RFC 3339 timestamp
    #[serde(default)]
    pub create_time: Option<String>
  , #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCandidate
{   #[serde(default)]
    pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
  , /// Omitted by the backend for the first candidate
    #[serde(default)]
    pub index: u32
  , #[serde(default)]
    pub token_count: Option<u32>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata
{   #[serde(default)]
    pub prompt_token_count: Option<u32>
  , #[serde(default)]
    pub candidates_token_count: Option<u32>
  , #[serde(default)]
    pub total_token_count: Option<u32>
}

#[derive(Debug, Clone, Serialize)]
pub struct CountTokensRequest<'a>
{   pub contents: &'a [Content]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse
{   #[serde(default)]
    pub total_tokens: u64
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo
{   pub name: String
  , #[serde(default)]
    pub display_name: Option<String>
  , #[serde(default)]
    pub description: Option<String>
  , #[serde(default)]
    pub input_token_limit: Option<u32>
  , #[serde(default)]
    pub output_token_limit: Option<u32>
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListModelsResponse
{   #[serde(default)]
    pub models: Vec<ModelInfo>
  , #[serde(default)]
    pub next_page_token: Option<String>
}

/// Vertex AI Model Garden entry, e.g. "publishers/google/models/gemini-2.0-flash".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherModel
{   pub name: String
  , #[serde(default)]
    pub version_id: Option<String>
  , #[serde(default)]
    pub launch_stage: Option<String>
}

impl From<PublisherModel> for ModelInfo
{   fn from(model: PublisherModel) -> Self
    {   let id = model.name.rsplit('/').next().unwrap_or(&model.name);
        ModelInfo
        {   name: format!("models/{}", id)
          , ..ModelInfo::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPublisherModelsResponse
{   #[serde(default)]
    pub publisher_models: Vec<PublisherModel>
  , #[serde(default)]
    pub next_page_token: Option<String>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState
{   StateUnspecified
  , Processing
  , Active
  , Failed
  , #[serde(other)]
    Unknown
}

impl Default for FileState
{   fn default() -> Self
    {   FileState::StateUnspecified
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status
{   #[serde(default)]
    pub code: Option<i32>
  , #[serde(default)]
    pub message: Option<String>
}

/// Asset store entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File
{   /// Handle, e.g. "files/abc123"
    pub name: String
  , #[serde(default)]
    pub uri: Option<String>
  , #[serde(default)]
    pub mime_type: Option<String>
  , #[serde(default)]
    pub state: FileState
  , #[serde(default)]
    pub error: Option<Status>
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadFileResponse
{   pub file: File
}
