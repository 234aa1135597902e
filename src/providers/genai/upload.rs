//! Image reference resolution: inline embedding or asset store upload

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, error, trace};
use tokio::time::{Instant, sleep, timeout_at};
use crate::backoff::PollPolicy;
use crate::config::UploadConfig;
use crate::error::Error;
use super::backend::GenAiBackend;
use super::wire::{Blob, FileData, FileState, Part};

const DATA_URI_MARKER: &str = ";base64,";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// A resolved, provider-consumable asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef
{   /// Bytes embedded in the request
    Inline(Blob)
  , /// Handle to an uploaded, processed file
    Remote(FileData)
}

impl From<AssetRef> for Part
{   fn from(asset: AssetRef) -> Self
    {   match asset
        {   AssetRef::Inline(blob) => Part::inline(blob)
          , AssetRef::Remote(file) => Part::file(file)
        }
    }
}

/// Processing states of an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState
{   Uploaded
  , Processing
  , Ready(FileData)
  , Failed(String)
}

/// True when a payload of `len` bytes goes through the asset store.
/// The limit itself is on the upload side.
pub fn requires_upload(len: usize, inline_limit: usize) -> bool
{   len >= inline_limit
}

/// Split a `data:<mime>;base64,<payload>` URI into bytes and mime type.
pub fn decode_data_uri(uri: &str) -> Result<(Vec<u8>, String), Error>
{   let (header, payload) = uri.split_once(DATA_URI_MARKER)
      .ok_or_else(|| {
        error!("Image reference is neither a URL nor a base64 data URI");
        Error::InvalidRequest(
          "image_url must be an http(s) URL or a base64 data URI"
            .to_string()
        )
      })?;

    let mime_type = header.strip_prefix("data:").unwrap_or(header).trim();
    let mime_type = if mime_type.is_empty()
    {   FALLBACK_MIME_TYPE.to_string()
    } else
    {   mime_type.to_string()
    };

    let bytes = STANDARD.decode(payload.trim()).map_err(|e| {
      error!("Base64 decode error: {}", e);
      Error::InvalidRequest(format!("invalid base64 image data: {}", e))
    })?;
    Ok((bytes, mime_type))
}

/// Resolves image references against one backend.
pub struct AssetUploader<'a, B: ?Sized>
{   backend: &'a B
  , config: &'a UploadConfig
}

impl<'a, B: GenAiBackend + ?Sized> AssetUploader<'a, B>
{   pub fn new(backend: &'a B, config: &'a UploadConfig) -> Self
    {   AssetUploader { backend, config }
    }

    /// Resolve one image reference to an inline or remote asset.
    pub async fn resolve(&self, image_ref: &str)
      -> Result<AssetRef, Error>
    {   let (bytes, mime_type) = self.acquire(image_ref).await?;

        if !requires_upload(bytes.len(), self.config.inline_limit)
        {   trace!("Inlining {} bytes of {}", bytes.len(), mime_type);
            return Ok(AssetRef::Inline(Blob
            {   mime_type
              , data: STANDARD.encode(&bytes)
            }));
        }

        let file = self.upload_and_wait(bytes, &mime_type).await?;
        Ok(AssetRef::Remote(file))
    }

    async fn acquire(&self, image_ref: &str)
      -> Result<(Vec<u8>, String), Error>
    {   if image_ref.starts_with("http://")
          || image_ref.starts_with("https://")
        {   self.backend.fetch_asset(image_ref).await
        } else
        {   decode_data_uri(image_ref)
        }
    }

    /// Upload, then poll until the asset is READY or FAILED, bounded by
    /// the configured maximum wait.
    async fn upload_and_wait(
      &self
    , bytes: Vec<u8>
    , mime_type: &str
    ) -> Result<FileData, Error>
    {   let policy = PollPolicy::from(self.config);
        let deadline = Instant::now() + policy.max_wait;

        let uploaded = self.backend.upload_file(bytes, mime_type).await?;
        let name = uploaded.name;
        let mut state = UploadState::Uploaded;
        let mut attempt = 0;

        loop
        {   debug!("Asset {} is {:?}, polling", name, state);
            let file = timeout_at(deadline, self.backend.get_file(&name))
              .await
              .map_err(|_| {
                error!("Asset {} poll exceeded deadline", name);
                Error::TimeoutExceeded(policy.max_wait)
              })??;

            state = match file.state
            {   FileState::Active => {
                  let uri = file.uri.ok_or_else(|| {
                    error!("Asset {} is active without a uri", name);
                    Error::Provider(format!("file {} has no uri", name))
                  })?;
                  UploadState::Ready(FileData
                  {   mime_type: file.mime_type
                        .unwrap_or_else(|| mime_type.to_string())
                    , file_uri: uri
                  })
                }
              , FileState::Failed => {
                  let diagnostic = file.error
                    .and_then(|status| status.message)
                    .unwrap_or_else(|| "no diagnostic".to_string());
                  UploadState::Failed(diagnostic)
                }
              , FileState::Processing
              | FileState::StateUnspecified
              | FileState::Unknown => UploadState::Processing
            };

            match state
            {   UploadState::Ready(file_data) => {
                  debug!("Asset {} ready at {}", name, file_data.file_uri);
                  return Ok(file_data);
                }
              , UploadState::Failed(diagnostic) => {
                  error!("Asset {} failed: {}", name, diagnostic);
                  return Err(Error::UploadFailed(diagnostic));
                }
              , UploadState::Uploaded | UploadState::Processing => {}
            }

            let delay = policy.backoff_for_attempt(attempt);
            attempt += 1;
            if Instant::now() + delay > deadline
            {   error!("Asset {} still processing at deadline", name);
                return Err(Error::TimeoutExceeded(policy.max_wait));
            }
            sleep(delay).await;
        }
    }
}
