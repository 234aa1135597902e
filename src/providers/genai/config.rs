//! Canonical options -> backend generation config

use log::debug;
use crate::config::SafetyPolicy;
use crate::request::{CompletionOptions, Model};
use super::wire::{GenerationConfig, SafetySetting};

pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_TOP_K: u32 = 50;
pub const DEFAULT_CANDIDATE_COUNT: u32 = 1;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Output token budget actually requested: never above the model limit,
/// or above the default when the model does not declare one.
pub fn effective_max_tokens(
  requested: Option<u32>
, output_token_limit: Option<u32>
) -> u32
{   let ceiling = output_token_limit
      .filter(|limit| *limit > 0)
      .unwrap_or(DEFAULT_MAX_TOKENS);
    requested.unwrap_or(DEFAULT_MAX_TOKENS).min(ceiling)
}

pub fn generation_config(
  model: &Model
, options: &CompletionOptions
) -> GenerationConfig
{   let config = GenerationConfig
    {   temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE)
      , top_p: options.top_p.unwrap_or(DEFAULT_TOP_P)
      , top_k: options.top_k.unwrap_or(DEFAULT_TOP_K)
      , candidate_count: options.n.unwrap_or(DEFAULT_CANDIDATE_COUNT)
      , max_output_tokens: effective_max_tokens(
          options.max_tokens
        , model.output_token_limit
        )
      , stop_sequences: options.stop.clone()
          .filter(|stop| !stop.is_empty())
    };
    debug!("Generation config for {}: {:?}", model.id, config);
    config
}

pub fn safety_settings(policy: &SafetyPolicy) -> Vec<SafetySetting>
{   policy.settings.clone()
}
