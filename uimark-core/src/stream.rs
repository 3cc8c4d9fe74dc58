use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RenderConfig;
use crate::error::{Result, UimarkError};
use crate::model::{ParseMode, ParsedResponse};
use crate::response::{excerpt, parse_response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Empty,
    Streaming,
    Settled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pure_html: Option<String>,
    pub rendering: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

#[derive(Debug)]
pub struct ResponseStream {
    buffer: String,
    state: StreamState,
    config: RenderConfig,
}

impl ResponseStream {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            buffer: String::new(),
            state: StreamState::Empty,
            config,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn push(&mut self, chunk: &str) {
        if self.state == StreamState::Settled {
            warn!(len = chunk.len(), "dropping chunk pushed after the response settled");
            return;
        }
        if chunk.is_empty() {
            return;
        }
        self.buffer.push_str(chunk);
        self.state = StreamState::Streaming;
    }

    pub fn snapshot(&self) -> UiUpdate {
        let (text, mode) = match self.state {
            StreamState::Empty => return UiUpdate::default(),
            StreamState::Streaming => (complete_lines(&self.buffer), ParseMode::Streaming),
            StreamState::Settled => (self.buffer.as_str(), ParseMode::Settled),
        };

        let parsed = parse_response(text, None, mode, &self.config);
        UiUpdate {
            pure_html: parsed.html,
            rendering: mode.is_streaming(),
            name: parsed.name,
            emoji: parsed.emoji,
        }
    }

    pub fn finish(&mut self) -> Result<ParsedResponse> {
        self.state = StreamState::Settled;
        let parsed = parse_response(&self.buffer, None, ParseMode::Settled, &self.config);
        debug!(len = self.buffer.len(), has_html = parsed.html.is_some(), "response settled");

        if parsed.html.is_none() {
            return Err(UimarkError::NoHtml {
                excerpt: excerpt(&self.buffer, self.config.error_excerpt_chars),
            });
        }
        Ok(parsed)
    }

    pub fn into_text(self) -> String {
        self.buffer
    }
}

fn complete_lines(text: &str) -> &str {
    text.rfind('\n').map_or("", |end| &text[..end])
}
