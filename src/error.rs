use std::fmt;
use std::time::Duration;

/// Error type shared by the completion core and the front end.
/// Implements Clone so failures can be handed to several consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Backend rejected our credentials
    Auth(String)
  , /// Malformed input, unknown model or unresolvable content
    InvalidRequest(String)
  , /// Backend throttled the call
    RateLimited(String)
  , /// Opaque backend or transport failure
    Provider(String)
  , /// Uploaded asset reached the FAILED processing state
    UploadFailed(String)
  , /// Asset processing did not finish within the poll bound
    TimeoutExceeded(Duration)
  , /// Invalid process configuration
    InvalidConfiguration(String)
}

impl Error
{   /// Normalize a non-success backend HTTP status into the taxonomy.
    pub fn from_status(status: u16, body: String) -> Self
    {   match status
        {   401 | 403 => Error::Auth(body)
          , 400 | 404 | 413 => Error::InvalidRequest(body)
          , 429 => Error::RateLimited(body)
          , _ => Error::Provider(
              format!("HTTP {}: {}", status, body)
            )
        }
    }

    /// Short machine-readable name, used in front-end error bodies.
    pub fn kind(&self) -> &'static str
    {   match self
        {   Error::Auth(_) => "auth_error"
          , Error::InvalidRequest(_) => "invalid_request_error"
          , Error::RateLimited(_) => "rate_limit_error"
          , Error::Provider(_) => "provider_error"
          , Error::UploadFailed(_) => "upload_failed"
          , Error::TimeoutExceeded(_) => "timeout_exceeded"
          , Error::InvalidConfiguration(_) => "configuration_error"
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Auth(msg) => {
              write!(f, "Backend authentication failed: {}", msg)
            }
          , Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::RateLimited(msg) => {
              write!(f, "Backend rate limit exceeded: {}", msg)
            }
          , Error::Provider(msg) => {
              write!(f, "Provider error: {}", msg)
            }
          , Error::UploadFailed(msg) => {
              write!(f, "Failed to upload file: {}", msg)
            }
          , Error::TimeoutExceeded(waited) => {
              write!(f,
                "Asset processing exceeded {} ms",
                waited.as_millis()
              )
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}
