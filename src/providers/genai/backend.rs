//! Transport to the generation backend

use std::time::Duration;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use log::{debug, error, trace};
use serde::de::DeserializeOwned;
use crate::config::{BackendConfig, BackendFlavor, Credentials};
use crate::error::Error;
use super::sse::SseDecoder;
use super::wire::{
  Content, CountTokensRequest, CountTokensResponse, File,
  GenerateContentRequest, GenerateContentResponse, ListModelsResponse,
  ListPublisherModelsResponse, ModelInfo, UploadFileResponse
};

const AI_STUDIO_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
const AI_STUDIO_UPLOAD_BASE: &str
  = "https://generativelanguage.googleapis.com/upload/v1beta/files";
const MODELS_PAGE_SIZE: u32 = 100;

/// Raw backend chunks of a streamed generation.
pub type ResponseStream
  = BoxStream<'static, Result<GenerateContentResponse, Error>>;

/// Every backend operation the adapter needs. Failures are already
/// normalized into `Error`.
#[async_trait]
pub trait GenAiBackend: Send + Sync
{   async fn list_models(&self) -> Result<Vec<ModelInfo>, Error>;

    async fn generate(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>;

    /// Dropping the returned stream closes the underlying connection.
    async fn generate_stream(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<ResponseStream, Error>;

    async fn count_tokens(
      &self
    , model: &str
    , contents: &[Content]
    ) -> Result<u64, Error>;

    /// Store bytes in the asset store and return the new entry.
    async fn upload_file(
      &self
    , bytes: Vec<u8>
    , mime_type: &str
    ) -> Result<File, Error>;

    /// Current state of an asset store entry by handle.
    async fn get_file(&self, name: &str) -> Result<File, Error>;

    /// Download a remote asset; returns body bytes and content type.
    async fn fetch_asset(&self, url: &str)
      -> Result<(Vec<u8>, String), Error>;
}

/// Shape of the model listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCatalog
{   /// `models` list of the Generative Language API
    Models
  , /// `publisherModels` list of the Vertex AI Model Garden
    PublisherModels
}

fn vertex_host(location: &str) -> String
{   match location
    {   "global" => "aiplatform.googleapis.com".to_string()
      , _ => format!("{}-aiplatform.googleapis.com", location)
    }
}

/// REST implementation over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct RestBackend
{   http: reqwest::Client
  , api_base: String
  , upload_base: Option<String>
  , models_url: String
  , catalog: ModelCatalog
  , credentials: Credentials
  , timeout: Option<Duration>
}

impl RestBackend
{   pub fn new(
      config: &BackendConfig
    , credentials: Credentials
    ) -> Result<Self, Error>
    {   let (default_api, default_upload) = match &config.flavor
        {   BackendFlavor::AiStudio => (
              AI_STUDIO_API_BASE.to_string()
            , Some(AI_STUDIO_UPLOAD_BASE.to_string())
            )
          , BackendFlavor::Vertex { project, location } => (
              format!(
                "https://{}/v1/projects/{}/locations/{}/publishers/google"
              , vertex_host(location), project, location
              )
            , None
            )
        };
        let api_base = config.api_base.clone().unwrap_or(default_api);

        // Vertex v1 has no publisher model list; Model Garden serves it
        let (default_models, catalog) = match &config.flavor
        {   BackendFlavor::AiStudio => (
              format!("{}/models", api_base)
            , ModelCatalog::Models
            )
          , BackendFlavor::Vertex { location, .. } => (
              format!(
                "https://{}/v1beta1/publishers/google/models"
              , vertex_host(location)
              )
            , ModelCatalog::PublisherModels
            )
        };

        let http = reqwest::Client::builder()
          .connect_timeout(Duration::from_secs(30))
          .build()
          .map_err(|e| {
            error!("Cannot build HTTP client: {}", e);
            Error::InvalidConfiguration(e.to_string())
          })?;

        debug!("Creating RestBackend for {:?}", config.flavor);
        Ok(RestBackend
        {   http
          , api_base
          , upload_base: config.upload_base.clone().or(default_upload)
          , models_url: config.models_url.clone().unwrap_or(default_models)
          , catalog
          , credentials
          , timeout: config.timeout_secs.map(Duration::from_secs)
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder)
      -> reqwest::RequestBuilder
    {   match &self.credentials
        {   Credentials::ApiKey(key) => {
              builder.header("x-goog-api-key", key)
            }
          , Credentials::BearerToken(token) => {
              builder.bearer_auth(token)
            }
        }
    }

    fn bounded(&self, builder: reqwest::RequestBuilder)
      -> reqwest::RequestBuilder
    {   match self.timeout
        {   Some(timeout) => builder.timeout(timeout)
          , None => builder
        }
    }

    /// Where the model list is fetched from.
    pub fn models_url(&self) -> &str
    {   &self.models_url
    }

    pub fn catalog(&self) -> ModelCatalog
    {   self.catalog
    }

    /// URL of a per-model method such as `generateContent`.
    pub fn model_url(&self, model: &str, method: &str) -> String
    {   let id = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:{}", self.api_base, id, method)
    }

    async fn send(&self, builder: reqwest::RequestBuilder)
      -> Result<reqwest::Response, Error>
    {   let response = builder
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::Provider(e.to_string())
          })?;

        let status = response.status();
        trace!("Backend response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Backend error {}: {}", status, error_text);
            return Err(Error::from_status(status.as_u16(), error_text));
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response)
      -> Result<T, Error>
    {   response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          Error::Provider(format!("malformed backend response: {}", e))
        })
    }
}

#[async_trait]
impl GenAiBackend for RestBackend
{   async fn list_models(&self) -> Result<Vec<ModelInfo>, Error>
    {   let mut models = vec![];
        let mut page_token: Option<String> = None;

        loop
        {   let mut query = vec![
              ("pageSize", MODELS_PAGE_SIZE.to_string())
            ];
            if let Some(token) = &page_token
            {   query.push(("pageToken", token.clone()));
            }

            let builder = self.http
              .get(&self.models_url)
              .query(&query);
            let response
              = self.send(self.bounded(self.authorize(builder))).await?;
            let next_page_token = match self.catalog
            {   ModelCatalog::Models => {
                  let page: ListModelsResponse
                    = Self::decode(response).await?;
                  models.extend(page.models);
                  page.next_page_token
                }
              , ModelCatalog::PublisherModels => {
                  let page: ListPublisherModelsResponse
                    = Self::decode(response).await?;
                  models.extend(
                    page.publisher_models.into_iter().map(ModelInfo::from)
                  );
                  page.next_page_token
                }
            };

            match next_page_token
            {   Some(token) if !token.is_empty() => {
                  page_token = Some(token);
                }
              , _ => break
            }
        }

        debug!("Retrieved {} models", models.len());
        Ok(models)
    }

    async fn generate(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<GenerateContentResponse, Error>
    {   trace!("generateContent request: {:?}", request);
        let builder = self.http
          .post(self.model_url(model, "generateContent"))
          .json(request);
        Self::decode(
          self.send(self.bounded(self.authorize(builder))).await?
        ).await
    }

    async fn generate_stream(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<ResponseStream, Error>
    {   trace!("streamGenerateContent request: {:?}", request);
        let builder = self.http
          .post(self.model_url(model, "streamGenerateContent"))
          .query(&[("alt", "sse")])
          .json(request);
        let response = self.send(self.authorize(builder)).await?;
        let mut body = Box::pin(response.bytes_stream());

        let stream = async_stream::try_stream! {
          let mut decoder = SseDecoder::new();
          while let Some(chunk) = body.next().await
          {   let chunk = chunk.map_err(|e| {
                error!("Stream interrupted: {}", e);
                Error::Provider(format!("stream interrupted: {}", e))
              })?;
              for data in decoder.feed(&chunk)
              {   if data.trim() == "[DONE]"
                  {   continue;
                  }
                  yield parse_chunk(&data)?;
              }
          }
          if let Some(data) = decoder.finish()
          {   if data.trim() != "[DONE]"
              {   yield parse_chunk(&data)?;
              }
          }
        };
        Ok(Box::pin(stream))
    }

    async fn count_tokens(
      &self
    , model: &str
    , contents: &[Content]
    ) -> Result<u64, Error>
    {   let builder = self.http
          .post(self.model_url(model, "countTokens"))
          .json(&CountTokensRequest { contents });
        let counted: CountTokensResponse = Self::decode(
          self.send(self.bounded(self.authorize(builder))).await?
        ).await?;
        Ok(counted.total_tokens)
    }

    async fn upload_file(
      &self
    , bytes: Vec<u8>
    , mime_type: &str
    ) -> Result<File, Error>
    {   let upload_base = self.upload_base.as_ref()
          .ok_or_else(|| {
            error!("No asset store for this backend");
            Error::InvalidRequest(
              "asset upload is not supported by this backend".to_string()
            )
          })?;
        debug!("Uploading {} bytes of {}", bytes.len(), mime_type);

        let start = self.http
          .post(upload_base)
          .header("X-Goog-Upload-Protocol", "resumable")
          .header("X-Goog-Upload-Command", "start")
          .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
          .header("X-Goog-Upload-Header-Content-Type", mime_type)
          .json(&serde_json::json!({ "file": { "mimeType": mime_type } }));
        let started = self.send(self.bounded(self.authorize(start))).await?;

        let session = started.headers()
          .get("x-goog-upload-url")
          .and_then(|v| v.to_str().ok())
          .map(str::to_string)
          .ok_or_else(|| {
            error!("Upload session URL missing");
            Error::Provider("upload session URL missing".to_string())
          })?;

        let finalize = self.http
          .post(session)
          .header("X-Goog-Upload-Offset", "0")
          .header("X-Goog-Upload-Command", "upload, finalize")
          .header(reqwest::header::CONTENT_TYPE, mime_type)
          .body(bytes);
        let uploaded: UploadFileResponse = Self::decode(
          self.send(self.bounded(self.authorize(finalize))).await?
        ).await?;

        debug!("Uploaded as {}", uploaded.file.name);
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<File, Error>
    {   let builder = self.http
          .get(format!("{}/{}", self.api_base, name));
        Self::decode(
          self.send(self.bounded(self.authorize(builder))).await?
        ).await
    }

    async fn fetch_asset(&self, url: &str)
      -> Result<(Vec<u8>, String), Error>
    {   debug!("Fetching asset {}", url);
        let response = self
          .send(self.bounded(self.http.get(url)))
          .await
          .map_err(|e| match e
          {   Error::Provider(msg) | Error::Auth(msg) => {
                Error::InvalidRequest(
                  format!("cannot fetch {}: {}", url, msg)
                )
              }
            , other => other
          })?;

        let mime_type = response.headers()
          .get(reqwest::header::CONTENT_TYPE)
          .and_then(|v| v.to_str().ok())
          .and_then(|v| v.split(';').next())
          .map(|v| v.trim().to_string())
          .filter(|v| !v.is_empty())
          .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = response.bytes().await.map_err(|e| {
          error!("Failed to read asset body: {}", e);
          Error::InvalidRequest(format!("cannot fetch {}: {}", url, e))
        })?;
        Ok((bytes.to_vec(), mime_type))
    }
}

fn parse_chunk(data: &str) -> Result<GenerateContentResponse, Error>
{   serde_json::from_str(data).map_err(|e| {
      error!("Malformed stream chunk: {}", e);
      Error::Provider(format!("malformed stream chunk: {}", e))
    })
}
