//! Configuration for the completion core and the HTTP front end

use std::collections::HashMap;
use std::path::Path;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use crate::providers::genai::wire::{
  HarmBlockThreshold, HarmCategory, SafetySetting
};

/// Default byte length at which assets are uploaded instead of inlined.
pub const DEFAULT_INLINE_LIMIT: usize = 20 * 1000 * 1000;

/// Which flavor of the generation API to talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendFlavor
{   /// Generative Language API, authenticated with an API key
    AiStudio
  , /// Vertex AI publisher models, authenticated with a bearer token
    Vertex
    {   project: String
      , location: String
    }
}

impl Default for BackendFlavor
{   fn default() -> Self
    {   BackendFlavor::AiStudio
    }
}

/// Backend connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig
{   #[serde(default)]
    pub flavor: BackendFlavor
  , /// API base URL (if custom)
    #[serde(default)]
    pub api_base: Option<String>
  , /// Asset upload base URL (if custom)
    #[serde(default)]
    pub upload_base: Option<String>
  , /// Model listing URL (if custom)
    #[serde(default)]
    pub models_url: Option<String>
  , /// Request timeout in seconds; streams are not bounded by it
    #[serde(default)]
    pub timeout_secs: Option<u64>
}

/// Asset size dispatch and upload polling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig
{   /// Payloads of at least this many bytes are uploaded
    pub inline_limit: usize
  , pub poll_interval_ms: u64
  , /// 1.0 keeps the interval fixed
    pub poll_backoff_multiplier: f32
  , pub max_poll_interval_ms: u64
  , /// Total time to wait for processing to finish
    pub max_wait_ms: u64
}

impl Default for UploadConfig
{   fn default() -> Self
    {   UploadConfig
        {   inline_limit: DEFAULT_INLINE_LIMIT
          , poll_interval_ms: 500
          , poll_backoff_multiplier: 1.0
          , max_poll_interval_ms: 5_000
          , max_wait_ms: 60_000
        }
    }
}

/// What the formatter does with content parts of unrecognized type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPartPolicy
{   #[default]
    Drop
  , Reject
}

/// What the adapter does with response candidates lacking content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCandidatePolicy
{   #[default]
    Filter
  , Reject
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPolicy
{   pub unknown_parts: UnknownPartPolicy
  , pub empty_candidates: EmptyCandidatePolicy
}

impl ContentPolicy
{   /// Fail loudly instead of dropping or filtering.
    pub fn strict() -> Self
    {   ContentPolicy
        {   unknown_parts: UnknownPartPolicy::Reject
          , empty_candidates: EmptyCandidatePolicy::Reject
        }
    }
}

/// Safety settings sent with every generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPolicy
{   pub settings: Vec<SafetySetting>
}

impl SafetyPolicy
{   /// Every harm category filter switched off.
    pub fn permissive() -> Self
    {   let settings = [
          HarmCategory::HarmCategoryHarassment
        , HarmCategory::HarmCategoryHateSpeech
        , HarmCategory::HarmCategorySexuallyExplicit
        , HarmCategory::HarmCategoryDangerousContent
        , HarmCategory::HarmCategoryCivicIntegrity
        ]
          .into_iter()
          .map(|category| SafetySetting
          {   category
            , threshold: HarmBlockThreshold::Off
          })
          .collect();
        SafetyPolicy { settings }
    }
}

impl Default for SafetyPolicy
{   fn default() -> Self
    {   SafetyPolicy::permissive()
    }
}

/// Canonical role -> backend role. "system" is handled separately.
pub fn default_role_table() -> HashMap<String, String>
{   [("user", "user"), ("assistant", "model"), ("model", "model")]
      .into_iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
}

/// Generation adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenAiConfig
{   pub backend: BackendConfig
  , pub upload: UploadConfig
  , pub content: ContentPolicy
  , pub safety: SafetyPolicy
  , pub role_table: HashMap<String, String>
}

impl Default for GenAiConfig
{   fn default() -> Self
    {   GenAiConfig
        {   backend: BackendConfig::default()
          , upload: UploadConfig::default()
          , content: ContentPolicy::default()
          , safety: SafetyPolicy::default()
          , role_table: default_role_table()
        }
    }
}

/// HTTP front end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig
{   pub bind_addr: String
  , /// Bearer secret; never serialized
    #[serde(skip_serializing)]
    pub password: Option<String>
}

impl Default for ServerConfig
{   fn default() -> Self
    {   ServerConfig
        {   bind_addr: "0.0.0.0:8000".to_string()
          , password: None
        }
    }
}

/// Backend credentials, kept out of the serialized config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials
{   ApiKey(String)
  , BearerToken(String)
}

/// Process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig
{   pub server: ServerConfig
  , pub genai: GenAiConfig
  , #[serde(skip)]
    pub credentials: Option<Credentials>
}

impl AppConfig
{   /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>)
      -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)
          .map_err(|e| {
            error!("Cannot read {}: {}", path.display(), e);
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        serde_json::from_str(&text)
          .map_err(|e| {
            error!("Cannot parse {}: {}", path.display(), e);
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })
    }

    /// Build configuration from the process environment.
    ///
    /// `GENBRIDGE_CONFIG` names an optional JSON file; `PASSWORD`,
    /// `BIND_ADDR`, `GEMINI_API_KEY`/`GOOGLE_API_KEY` and
    /// `VERTEX_ACCESS_TOKEN` override it.
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` with an explicit variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, crate::error::Error>
    where F: Fn(&str) -> Option<String>
    {   let mut config = match var("GENBRIDGE_CONFIG")
        {   Some(path) => AppConfig::from_json_file(path)?
          , None => AppConfig::default()
        };

        if let Some(password) = var("PASSWORD")
        {   config.server.password = Some(password);
        }
        if let Some(addr) = var("BIND_ADDR")
        {   config.server.bind_addr = addr;
        }

        config.credentials = match &config.genai.backend.flavor
        {   BackendFlavor::AiStudio => {
              var("GEMINI_API_KEY")
                .or_else(|| var("GOOGLE_API_KEY"))
                .map(Credentials::ApiKey)
            }
          , BackendFlavor::Vertex { .. } => {
              var("VERTEX_ACCESS_TOKEN")
                .map(Credentials::BearerToken)
            }
        };

        if config.credentials.is_none()
        {   error!("No backend credentials in environment");
            return Err(crate::error::Error::InvalidConfiguration(
              "missing backend credentials".to_string()
            ));
        }
        if config.server.password.is_none()
        {   warn!("PASSWORD not set; every request will be rejected");
        }
        Ok(config)
    }
}
