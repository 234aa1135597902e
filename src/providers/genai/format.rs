//! Canonical messages -> backend candidates

use futures::future::try_join_all;
use log::{debug, error};
use crate::config::UnknownPartPolicy;
use crate::error::Error;
use crate::request::{ContentItem, Message, MessageBody, MessageContent};
use super::backend::GenAiBackend;
use super::upload::AssetUploader;
use super::wire::Part;

/// One formatted message, only valid for `GenerativeAi` calls.
/// Keeps the caller's role; it is mapped to a backend role at dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate
{   role: Option<String>
  , parts: Vec<Part>
}

impl Candidate
{   pub fn new(role: Option<String>, parts: Vec<Part>) -> Self
    {   Candidate { role, parts }
    }

    pub fn role(&self) -> Option<&str>
    {   self.role.as_deref()
    }

    pub fn parts(&self) -> &[Part]
    {   &self.parts
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String
    {   self.parts.iter()
          .filter_map(|part| part.text.as_deref())
          .collect::<Vec<_>>()
          .join("\n")
    }
}

pub struct MessageFormatter<'a, B: ?Sized>
{   uploader: AssetUploader<'a, B>
  , unknown_parts: UnknownPartPolicy
}

impl<'a, B: GenAiBackend + ?Sized> MessageFormatter<'a, B>
{   pub fn new(
      uploader: AssetUploader<'a, B>
    , unknown_parts: UnknownPartPolicy
    ) -> Self
    {   MessageFormatter { uploader, unknown_parts }
    }

    /// One candidate per message, in order, with every image resolved.
    pub async fn format(&self, messages: &[Message])
      -> Result<Vec<Candidate>, Error>
    {   debug!("Formatting {} messages", messages.len());
        let mut candidates = Vec::with_capacity(messages.len());
        for message in messages
        {   candidates.push(self.format_message(message).await?);
        }
        Ok(candidates)
    }

    async fn format_message(&self, message: &Message)
      -> Result<Candidate, Error>
    {   let parts = match &message.content
        {   MessageBody::Text(text) => vec![Part::text(text.as_str())]
          , MessageBody::Parts(items) => {
              // images resolve concurrently; try_join_all keeps item order
              try_join_all(items.iter().map(|item| self.format_item(item)))
                .await?
                .into_iter()
                .flatten()
                .collect()
            }
        };
        Ok(Candidate::new(message.role.clone(), parts))
    }

    async fn format_item(&self, item: &ContentItem)
      -> Result<Option<Part>, Error>
    {   match item
        {   ContentItem::Raw(text) => Ok(Some(Part::text(text.as_str())))
          , ContentItem::Structured(content) => {
              self.format_content(content).await
            }
        }
    }

    async fn format_content(&self, content: &MessageContent)
      -> Result<Option<Part>, Error>
    {   match content.kind.as_str()
        {   "text" => {
              let text = content.text.as_ref().ok_or_else(|| {
                error!("Text part without text");
                Error::InvalidRequest(
                  "content part of type text has no text".to_string()
                )
              })?;
              Ok(Some(Part::text(text.as_str())))
            }
          , "image_url" => {
              let image_url = content.image_url.as_ref().ok_or_else(|| {
                error!("Image part without image_url");
                Error::InvalidRequest(
                  "content part of type image_url has no image_url"
                    .to_string()
                )
              })?;
              let asset = self.uploader.resolve(image_url.url()).await?;
              Ok(Some(asset.into()))
            }
          , other => match self.unknown_parts
            {   UnknownPartPolicy::Drop => {
                  debug!("Dropping content part of type {}", other);
                  Ok(None)
                }
              , UnknownPartPolicy::Reject => {
                  error!("Unsupported content part type {}", other);
                  Err(Error::InvalidRequest(
                    format!("unsupported content part type: {}", other)
                  ))
                }
            }
        }
    }
}
