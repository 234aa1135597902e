//! OpenAI-compatible HTTP front end over a `CompletionService`

pub mod auth;
pub mod openai;

use std::sync::Arc;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use futures::stream::{self, StreamExt};
use log::{debug, error, info};
use tokio::sync::RwLock;
use crate::config::ServerConfig;
use crate::error::Error;
use crate::request::Model;
use crate::service::CompletionService;
use self::openai::{
  ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse,
  ErrorBody, ModelList
};

pub struct AppState<S>
{   pub service: Arc<S>
  , /// Last model list fetched from the backend
    pub models: Arc<RwLock<Vec<Model>>>
}

impl<S> AppState<S>
{   pub fn new(service: Arc<S>) -> Self
    {   AppState
        {   service
          , models: Arc::new(RwLock::new(vec![]))
        }
    }
}

impl<S> Clone for AppState<S>
{   fn clone(&self) -> Self
    {   AppState
        {   service: self.service.clone()
          , models: self.models.clone()
        }
    }
}

/// Error wrapper that renders as an OpenAI-style error body.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError
{   fn from(error: Error) -> Self
    {   ApiError(error)
    }
}

/// HTTP status reported for each error kind.
pub fn status_for(error: &Error) -> StatusCode
{   match error
    {   Error::InvalidRequest(_) => StatusCode::BAD_REQUEST
      , Error::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS
      , Error::Auth(_) | Error::Provider(_) => StatusCode::BAD_GATEWAY
      , Error::UploadFailed(_) => StatusCode::UNPROCESSABLE_ENTITY
      , Error::TimeoutExceeded(_) => StatusCode::GATEWAY_TIMEOUT
      , Error::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError
{   fn into_response(self) -> Response
    {   let status = status_for(&self.0);
        if status.is_server_error()
        {   error!("Request failed: {}", self.0);
        }
        else
        {   debug!("Request rejected: {}", self.0);
        }
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

/// Build the router. Every route requires `Authorization: Bearer <password>`;
/// with no password configured every request is rejected.
pub fn router<S>(service: Arc<S>, config: &ServerConfig) -> Router
where S: CompletionService + 'static
{   let secret: auth::Secret = config.password.as_deref().map(Arc::from);
    Router::new()
      .route("/v1/models", get(list_models::<S>))
      .route("/models", get(list_models::<S>))
      .route("/v1/chat/completions", post(chat_completions::<S>))
      .route("/chat/completions", post(chat_completions::<S>))
      .route_layer(middleware::from_fn_with_state(secret, auth::require_bearer))
      .with_state(AppState::new(service))
}

/// Bind `config.bind_addr` and serve until the process stops.
pub async fn serve<S>(service: Arc<S>, config: ServerConfig)
  -> Result<(), Error>
where S: CompletionService + 'static
{   let listener = tokio::net::TcpListener::bind(&config.bind_addr).await
      .map_err(|e| {
        error!("Cannot bind {}: {}", config.bind_addr, e);
        Error::InvalidConfiguration(format!("{}: {}", config.bind_addr, e))
      })?;
    info!("Listening on {}", config.bind_addr);
    axum::serve(listener, router(service, &config)).await
      .map_err(|e| Error::Provider(e.to_string()))
}

fn find_model(models: &[Model], id: &str) -> Option<Model>
{   let wanted = id.strip_prefix("models/").unwrap_or(id);
    models.iter().find(|model| model.short_id() == wanted).cloned()
}

/// Find a model by its short id or its "models/" prefixed id. The cached
/// list is refreshed from the backend only when the id is not in it.
pub async fn resolve_model<S>(state: &AppState<S>, id: &str)
  -> Result<Model, Error>
where S: CompletionService
{   if let Some(model) = find_model(&state.models.read().await, id)
    {   return Ok(model);
    }

    debug!("Model {} not cached, refreshing model list", id);
    let models = state.service.models().await?;
    let found = find_model(&models, id);
    *state.models.write().await = models;
    found.ok_or_else(|| Error::InvalidRequest(format!("Unknown model: {}", id)))
}

async fn list_models<S>(State(state): State<AppState<S>>)
  -> Result<Json<ModelList>, ApiError>
where S: CompletionService + 'static
{   let models = state.service.models().await?;
    *state.models.write().await = models.clone();
    Ok(Json(ModelList::from_models(models)))
}

async fn chat_completions<S>(
  State(state): State<AppState<S>>
, Json(request): Json<ChatCompletionRequest>
) -> Result<Response, ApiError>
where S: CompletionService + 'static
{   let model = resolve_model(&state, &request.model).await?;
    let candidates = state.service.format_messages(&request.messages).await?;
    let model_name = model.short_id().to_string();

    if !request.stream
    {   let completions = state.service
          .chat_completion(&model, &candidates, &request.options)
          .await?;
        return Ok(Json(
          ChatCompletionResponse::from_completions(&completions, &model_name)
        ).into_response());
    }

    let completions = state.service
      .chat_completion_stream(&model, &candidates, &request.options)
      .await?;
    let events = completions
      .map(move |item| match item
      {   Ok(completion) => Event::default().json_data(
            ChatCompletionChunk::from_completion(&completion, &model_name)
          )
        , Err(e) => {
            error!("Stream failed: {}", e);
            Event::default().event("error").json_data(ErrorBody::from(&e))
          }
      })
      .chain(stream::once(async { Ok(Event::default().data("[DONE]")) }));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()).into_response())
}
