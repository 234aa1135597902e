//! Google Generative Language / Vertex AI adapter

pub mod backend;
pub mod config;
pub mod format;
pub mod response;
pub mod sse;
pub mod stream;
pub mod upload;
pub mod wire;

use std::sync::Arc;
use async_trait::async_trait;
use log::{debug, error, info};
use crate::config::{BackendFlavor, Credentials, GenAiConfig};
use crate::error::Error;
use crate::request::{
  CandidateData, Completion, CompletionObject, CompletionOptions, Message,
  Model
};
use crate::service::{CompletionService, CompletionStream};
use self::wire::{Content, GenerateContentRequest, Part};

pub use backend::{GenAiBackend, ModelCatalog, ResponseStream, RestBackend};
pub use format::{Candidate, MessageFormatter};
pub use upload::{AssetRef, AssetUploader};

/// Canonical role whose text becomes the system instruction.
pub const SYSTEM_ROLE: &str = "system";

/// Completion service backed by the generation REST API.
pub struct GenerativeAi<B: ?Sized = RestBackend>
{   backend: Arc<B>
  , config: GenAiConfig
}

impl GenerativeAi<RestBackend>
{   /// Connect with the backend described by `config`
    pub fn from_config(
      config: GenAiConfig
    , credentials: Credentials
    ) -> Result<Self, Error>
    {   let backend = RestBackend::new(&config.backend, credentials)?;
        Ok(GenerativeAi::with_backend(Arc::new(backend), config))
    }

    /// AI Studio, authenticated with an API key
    pub fn ai_studio(
      api_key: String
    , mut config: GenAiConfig
    ) -> Result<Self, Error>
    {   config.backend.flavor = BackendFlavor::AiStudio;
        GenerativeAi::from_config(config, Credentials::ApiKey(api_key))
    }

    /// Vertex AI, authenticated with an OAuth access token
    pub fn vertex(
      access_token: String
    , project: String
    , location: String
    , mut config: GenAiConfig
    ) -> Result<Self, Error>
    {   config.backend.flavor = BackendFlavor::Vertex { project, location };
        GenerativeAi::from_config(
          config
        , Credentials::BearerToken(access_token)
        )
    }
}

impl<B: GenAiBackend + ?Sized> GenerativeAi<B>
{   pub fn with_backend(backend: Arc<B>, config: GenAiConfig) -> Self
    {   info!("Creating GenerativeAi adapter");
        GenerativeAi { backend, config }
    }

    pub fn config(&self) -> &GenAiConfig
    {   &self.config
    }

    /// Map candidate roles through the role table and pull system text
    /// out into the system prompt.
    pub fn assemble(&self, candidates: &[Candidate])
      -> Result<CandidateData<Content>, Error>
    {   let mut data = CandidateData::new(self.config.role_table.clone());

        for candidate in candidates
        {   let role = match candidate.role()
            {   Some(SYSTEM_ROLE) => {
                  let text = candidate.text();
                  if !text.is_empty()
                  {   data.push_system_text(&text);
                  }
                  continue;
                }
              , Some(role) => Some(data.resolve_role(role)?.to_string())
              , None => None
            };
            data.candidates.push(Content
            {   role
              , parts: candidate.parts().to_vec()
            });
        }

        if data.candidates.is_empty()
        {   error!("No non-system candidates to send");
            return Err(Error::InvalidRequest(
              "at least one non-system message is required".to_string()
            ));
        }
        Ok(data)
    }

    fn build_request(
      &self
    , model: &Model
    , candidates: &[Candidate]
    , options: &CompletionOptions
    ) -> Result<GenerateContentRequest, Error>
    {   if model.id.is_empty()
        {   error!("Empty model id");
            return Err(Error::InvalidRequest("model id is empty".to_string()));
        }
        let data = self.assemble(candidates)?;
        Ok(GenerateContentRequest
        {   contents: data.candidates
          , generation_config: config::generation_config(model, options)
          , safety_settings: config::safety_settings(&self.config.safety)
          , system_instruction: system_instruction(
              data.system_prompt
            , candidates
            , None
            )
        })
    }
}

/// System prompt text followed by the non-text parts of every system
/// candidate, in encounter order.
fn system_instruction(
  prompt: Option<String>
, candidates: &[Candidate]
, role: Option<&str>
) -> Option<Content>
{   let mut parts: Vec<Part> = prompt.into_iter().map(Part::text).collect();
    parts.extend(
      candidates.iter()
        .filter(|candidate| candidate.role() == Some(SYSTEM_ROLE))
        .flat_map(|candidate| candidate.parts())
        .filter(|part| part.text.is_none())
        .cloned()
    );
    if parts.is_empty()
    {   return None;
    }
    Some(Content
    {   role: role.map(str::to_string)
      , parts
    })
}

#[async_trait]
impl<B: GenAiBackend + ?Sized> CompletionService for GenerativeAi<B>
{   type Candidate = Candidate;

    async fn models(&self) -> Result<Vec<Model>, Error>
    {   let models = self.backend.list_models().await?
          .into_iter()
          .map(|info| Model
          {   id: info.name
            , name: info.display_name
            , description: info.description
            , input_token_limit: info.input_token_limit
            , output_token_limit: info.output_token_limit
          })
          .collect();
        Ok(models)
    }

    async fn chat_completion(
      &self
    , model: &Model
    , candidates: &[Candidate]
    , options: &CompletionOptions
    ) -> Result<Vec<Completion>, Error>
    {   let request = self.build_request(model, candidates, options)?;
        let response = self.backend.generate(&model.id, &request).await?;
        let completions = response::to_completions(
          &response
        , &model.id
        , CompletionObject::Full
        , self.config.content.empty_candidates
        )?;
        debug!("{} returned {} completions", model.id, completions.len());
        Ok(completions)
    }

    async fn chat_completion_stream(
      &self
    , model: &Model
    , candidates: &[Candidate]
    , options: &CompletionOptions
    ) -> Result<CompletionStream, Error>
    {   let request = self.build_request(model, candidates, options)?;
        let raw = self.backend.generate_stream(&model.id, &request).await?;
        debug!("Streaming from {}", model.id);
        Ok(stream::completion_stream(raw, model.id.clone()))
    }

    async fn count_tokens(
      &self
    , model: &Model
    , candidates: &[Candidate]
    ) -> Result<u64, Error>
    {   let data = self.assemble(candidates)?;
        let mut contents = Vec::with_capacity(data.candidates.len() + 1);
        contents.extend(
          system_instruction(data.system_prompt, candidates, Some("user"))
        );
        contents.extend(data.candidates);
        self.backend.count_tokens(&model.id, &contents).await
    }

    async fn format_messages(&self, messages: &[Message])
      -> Result<Vec<Candidate>, Error>
    {   let uploader = AssetUploader::new(
          self.backend.as_ref()
        , &self.config.upload
        );
        MessageFormatter::new(uploader, self.config.content.unknown_parts)
          .format(messages)
          .await
    }
}
