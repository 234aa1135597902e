#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use genbridge::config::GenAiConfig;
use genbridge::error::Error;
use genbridge::providers::genai::wire::{
  Content, File, FileState, GenerateContentRequest, GenerateContentResponse,
  ModelInfo, Part, ResponseCandidate, Status
};
use genbridge::providers::genai::{GenAiBackend, ResponseStream};
use genbridge::GenerativeAi;

/// Sets a flag when the stream holding it is dropped
pub struct DropFlag(pub Arc<AtomicBool>);

impl DropFlag
{   fn hold(&self) {}
}

impl Drop for DropFlag
{   fn drop(&mut self)
    {   self.0.store(true, Ordering::SeqCst);
    }
}

/// In-memory backend with scripted responses
#[derive(Default)]
pub struct StubBackend
{   pub models: Vec<ModelInfo>
  , pub response: GenerateContentResponse
  , pub chunks: Vec<GenerateContentResponse>
  , /// Keep the stream open after the scripted chunks
    pub hang_after_chunks: bool
  , pub token_count: u64
  , /// Returned by get_file in order; PROCESSING once exhausted
    pub file_states: Mutex<VecDeque<File>>
  , pub assets: HashMap<String, (Vec<u8>, String)>
  , pub fail_with: Option<Error>
  , pub model_lists: AtomicUsize
  , pub uploads: AtomicUsize
  , pub polls: AtomicUsize
  , pub uploaded_bytes: Mutex<Vec<Vec<u8>>>
  , pub last_request: Mutex<Option<GenerateContentRequest>>
  , pub last_counted: Mutex<Option<Vec<Content>>>
  , pub stream_dropped: Arc<AtomicBool>
}

impl StubBackend
{   pub fn new() -> Self
    {   StubBackend
        {   models: vec![model_info("models/gemini-test", Some(8192))]
          , ..StubBackend::default()
        }
    }

    pub fn replying(response: GenerateContentResponse) -> Self
    {   StubBackend
        {   response
          , ..StubBackend::new()
        }
    }

    pub fn streaming(chunks: Vec<GenerateContentResponse>) -> Self
    {   StubBackend
        {   chunks
          , ..StubBackend::new()
        }
    }

    pub fn with_file_states(self, states: Vec<FileState>) -> Self
    {   let files = states.into_iter()
          .map(|state| file("files/stub", state))
          .collect();
        *self.file_states.lock().unwrap() = files;
        self
    }

    pub fn polls(&self) -> usize
    {   self.polls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize
    {   self.uploads.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> GenerateContentRequest
    {   self.last_request.lock().unwrap()
          .clone()
          .expect("no generate request recorded")
    }

    fn check(&self) -> Result<(), Error>
    {   match &self.fail_with
        {   Some(e) => Err(e.clone())
          , None => Ok(())
        }
    }
}

#[async_trait]
impl GenAiBackend for StubBackend
{   async fn list_models(&self) -> Result<Vec<ModelInfo>, Error>
    {   self.model_lists.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.models.clone())
    }

    async fn generate(
      &self
    , _model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   *self.last_request.lock().unwrap() = Some(request.clone());
        self.check()?;
        Ok(self.response.clone())
    }

    async fn generate_stream(
      &self
    , _model: &str
    , request: &GenerateContentRequest
    ) -> Result<ResponseStream, Error>
    {   *self.last_request.lock().unwrap() = Some(request.clone());
        self.check()?;
        let guard = DropFlag(self.stream_dropped.clone());
        let chunks = stream::iter(self.chunks.clone().into_iter().map(Ok));
        let stream = if self.hang_after_chunks
        {   chunks.chain(stream::pending()).boxed()
        } else
        {   chunks.boxed()
        };
        Ok(stream.map(move |chunk| { guard.hold(); chunk }).boxed())
    }

    async fn count_tokens(
      &self
    , _model: &str
    , contents: &[Content]
    ) -> Result<u64, Error>
    {   *self.last_counted.lock().unwrap() = Some(contents.to_vec());
        self.check()?;
        Ok(self.token_count)
    }

    async fn upload_file(
      &self
    , bytes: Vec<u8>
    , mime_type: &str
    ) -> Result<File, Error>
    {   self.uploads.fetch_add(1, Ordering::SeqCst);
        self.uploaded_bytes.lock().unwrap().push(bytes);
        Ok(File
        {   name: "files/stub".to_string()
          , mime_type: Some(mime_type.to_string())
          , state: FileState::Processing
          , ..File::default()
        })
    }

    async fn get_file(&self, name: &str) -> Result<File, Error>
    {   self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.file_states.lock().unwrap()
          .pop_front()
          .unwrap_or_else(|| file(name, FileState::Processing)))
    }

    async fn fetch_asset(&self, url: &str)
      -> Result<(Vec<u8>, String), Error>
    {   self.assets.get(url)
          .cloned()
          .ok_or_else(|| Error::InvalidRequest(format!("not found: {}", url)))
    }
}

pub fn model_info(name: &str, output_token_limit: Option<u32>) -> ModelInfo
{   ModelInfo
    {   name: name.to_string()
      , display_name: Some("Gemini Test".to_string())
      , output_token_limit
      , ..ModelInfo::default()
    }
}

pub fn file(name: &str, state: FileState) -> File
{   File
    {   name: name.to_string()
      , uri: Some(format!("https://files.test/{}", name))
      , mime_type: Some("image/png".to_string())
      , state
      , error: match state
        {   FileState::Failed => Some(Status
            {   code: Some(3)
              , message: Some("unsupported image".to_string())
            })
          , _ => None
        }
    }
}

pub fn candidate(index: u32, text: &str, finish: Option<&str>)
  -> ResponseCandidate
{   ResponseCandidate
    {   content: Some(Content
        {   role: Some("model".to_string())
          , parts: vec![Part::text(text)]
        })
      , finish_reason: finish.map(str::to_string)
      , index
      , token_count: None
    }
}

pub fn response(candidates: Vec<ResponseCandidate>) -> GenerateContentResponse
{   GenerateContentResponse
    {   candidates
      , response_id: Some("resp-1".to_string())
      , create_time: Some("2024-05-01T12:00:00Z".to_string())
      , usage_metadata: None
    }
}

/// Response without a backend timestamp
pub fn untimed(candidates: Vec<ResponseCandidate>) -> GenerateContentResponse
{   GenerateContentResponse
    {   create_time: None
      , ..response(candidates)
    }
}

/// Candidate whose only part is model reasoning
pub fn thought_only(index: u32, finish: Option<&str>) -> ResponseCandidate
{   ResponseCandidate
    {   content: Some(Content
        {   role: Some("model".to_string())
          , parts: vec![Part
            {   text: Some("thinking".to_string())
              , thought: Some(true)
              , ..Part::default()
            }]
        })
      , finish_reason: finish.map(str::to_string)
      , index
      , token_count: None
    }
}

pub fn now_secs() -> f64
{   chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

pub fn service(backend: Arc<StubBackend>) -> GenerativeAi<StubBackend>
{   GenerativeAi::with_backend(backend, GenAiConfig::default())
}

pub fn service_with(backend: Arc<StubBackend>, config: GenAiConfig)
  -> GenerativeAi<StubBackend>
{   GenerativeAi::with_backend(backend, config)
}

/// `data:` URI for the given bytes
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String
{   use base64::Engine;
    format!(
      "data:{};base64,{}"
    , mime_type
    , base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
