use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::version::VersionLabel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub version: String,
    pub prompt: String,
    pub markdown: String,
}

impl Chapter {
    pub fn label(&self) -> VersionLabel {
        VersionLabel::parse(&self.version)
    }

    pub fn is_edit(&self) -> bool {
        self.version.contains('.')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    Streaming,
    Settled,
}

impl ParseMode {
    pub fn is_streaming(self) -> bool {
        self == Self::Streaming
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Script {
    pub text: String,
    pub src: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlAndJs {
    pub html: String,
    pub scripts: Vec<Script>,
    pub pure_html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "angular")]
    Angular,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "jsx")]
    Jsx,
    #[serde(rename = "preact")]
    Preact,
    #[serde(rename = "react")]
    React,
    #[serde(rename = "streamlit")]
    Streamlit,
    #[serde(rename = "svelte")]
    Svelte,
    #[serde(rename = "vue")]
    Vue,
    #[serde(rename = "web component")]
    WebComponent,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Angular => write!(f, "angular"),
            Self::Html => write!(f, "html"),
            Self::Jsx => write!(f, "jsx"),
            Self::Preact => write!(f, "preact"),
            Self::React => write!(f, "react"),
            Self::Streamlit => write!(f, "streamlit"),
            Self::Svelte => write!(f, "svelte"),
            Self::Vue => write!(f, "vue"),
            Self::WebComponent => write!(f, "web component"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<BTreeMap<Framework, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterListView {
    pub name: String,
    pub emoji: String,
    pub latest_version: usize,
    pub chapters: Vec<Chapter>,
}
