//! Server-sent event framing for streamed generation responses

/// Incremental decoder: feed raw body chunks, get back complete `data:`
/// payloads. Partial events (and split UTF-8 sequences) stay buffered
/// until their terminating blank line arrives.
#[derive(Debug, Default)]
pub struct SseDecoder
{   buffer: Vec<u8>
}

impl SseDecoder
{   pub fn new() -> Self
    {   SseDecoder::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String>
    {   self.buffer.extend(
          chunk.iter().copied().filter(|b| *b != b'\r')
        );

        let mut events = vec![];
        while let Some(end) = self.buffer
          .windows(2)
          .position(|w| w == b"\n\n")
        {   let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(data) = Self::data_of(&event[..end])
            {   events.push(data);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<String>
    {   let rest = std::mem::take(&mut self.buffer);
        Self::data_of(&rest)
    }

    fn data_of(event: &[u8]) -> Option<String>
    {   let text = String::from_utf8_lossy(event);
        let lines: Vec<&str> = text
          .lines()
          .filter_map(|line| line.strip_prefix("data:"))
          .map(|data| data.strip_prefix(' ').unwrap_or(data))
          .collect();

        if lines.is_empty()
        {   None
        } else
        {   Some(lines.join("\n"))
        }
    }
}
