use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::chapter::{format_chapters, new_chapter, parse_chapters, with_frontmatter};
use crate::config::{DEFAULT_HEADER_SCAN_LIMIT, RenderConfig};
use crate::error::{Result, UimarkError};
use crate::frontmatter::extract_frontmatter;
use crate::html::{ImageLookup, process_html};
use crate::model::{Chapter, HtmlAndJs, Item, ParseMode, ParsedResponse};
use crate::response::{no_html_placeholder, parse_response};
use crate::version::VersionLabel;

pub const DEFAULT_NAME: &str = "pending";
pub const DEFAULT_EMOJI: &str = "❓";
const UNKNOWN_CHAPTER_HTML: &str =
    "<h1 class=\"text-red-800\">Unknown Error, unable to parse LLM Response</h1>";

impl Item {
    pub fn from_transcript(markdown: impl Into<String>, prompt: impl Into<String>) -> Self {
        let markdown = markdown.into();
        let front = extract_frontmatter(&markdown, DEFAULT_HEADER_SCAN_LIMIT);

        Self {
            prompt: prompt.into(),
            name: front.name,
            emoji: front.emoji,
            markdown: Some(markdown),
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &str {
        self.markdown.as_deref().unwrap_or_default()
    }

    pub fn begin_turn(&mut self, prompt: &str) {
        if self.prompt.is_empty() {
            self.prompt = prompt.to_string();
        }
        self.markdown
            .get_or_insert_with(String::new)
            .push_str(&new_chapter(prompt));
        self.prompts
            .get_or_insert_with(Vec::new)
            .push(prompt.to_string());
    }

    pub fn append_response(&mut self, response: &str) {
        if self.name.is_none() || self.emoji.is_none() {
            let front = extract_frontmatter(response, DEFAULT_HEADER_SCAN_LIMIT);
            if self.name.is_none() {
                self.name = front.name;
            }
            if self.emoji.is_none() {
                self.emoji = front.emoji;
            }
        }
        self.markdown
            .get_or_insert_with(String::new)
            .push_str(response);
    }
}

pub trait ItemSink {
    fn set_item(&mut self, item: Item);

    fn save_history(&mut self) {}
}

impl<F: FnMut(Item)> ItemSink for F {
    fn set_item(&mut self, item: Item) {
        self(item);
    }
}

#[derive(Debug)]
pub struct ItemView {
    item: Item,
    config: RenderConfig,
    chapters: Vec<Chapter>,
    pure_html_memo: Vec<OnceCell<String>>,
}

impl ItemView {
    pub fn new(item: Item, config: RenderConfig) -> Self {
        let chapters = parse_chapters(item.transcript(), &item.prompt);
        let pure_html_memo = chapters.iter().map(|_| OnceCell::new()).collect();
        Self {
            item,
            config,
            chapters,
            pure_html_memo,
        }
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn name(&self) -> &str {
        self.item.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    pub fn emoji(&self) -> &str {
        self.item.emoji.as_deref().unwrap_or(DEFAULT_EMOJI)
    }

    pub fn latest_version(&self) -> usize {
        self.chapters.len().saturating_sub(1)
    }

    pub fn latest_prompt(&self) -> &str {
        self.prompt(self.latest_version()).unwrap_or_default()
    }

    pub fn version(&self, idx: usize) -> String {
        if let Some(chapter) = self.chapters.get(idx) {
            return chapter.version.clone();
        }
        let edits = self.chapters.iter().filter(|chapter| chapter.is_edit()).count();
        idx.saturating_sub(edits).to_string()
    }

    pub fn prompt(&self, idx: usize) -> Option<&str> {
        if idx > self.latest_version() {
            return None;
        }
        Some(
            self.chapters
                .get(idx)
                .map_or(self.item.prompt.as_str(), |chapter| chapter.prompt.as_str()),
        )
    }

    pub fn parsed(&self, idx: usize) -> Option<ParsedResponse> {
        let chapter = self.chapters.get(idx)?;
        Some(parse_response(
            &chapter.markdown,
            Some(&chapter.version),
            ParseMode::Settled,
            &self.config,
        ))
    }

    // Settled results are memoized; streaming results never are.
    pub fn pure_html(&self, idx: usize, mode: ParseMode) -> Option<String> {
        let Some(chapter) = self.chapters.get(idx) else {
            return Some(UNKNOWN_CHAPTER_HTML.to_string());
        };
        if let Some(cached) = self.pure_html_memo.get(idx).and_then(OnceCell::get) {
            return Some(cached.clone());
        }

        let parsed = parse_response(&chapter.markdown, Some(&chapter.version), mode, &self.config);
        if mode.is_streaming() {
            return parsed.html;
        }

        let html = parsed
            .html
            .unwrap_or_else(|| no_html_placeholder(&chapter.markdown, &self.config));
        if let Some(cell) = self.pure_html_memo.get(idx) {
            let _ = cell.set(html.clone());
        }
        Some(html)
    }

    pub async fn html(
        &self,
        idx: usize,
        images: Option<&dyn ImageLookup>,
        mode: ParseMode,
    ) -> Result<Option<HtmlAndJs>> {
        if idx > self.latest_version() || self.chapters.is_empty() {
            return Ok(None);
        }
        let Some(pure) = self.pure_html(idx, mode).filter(|html| !html.is_empty()) else {
            return Ok(None);
        };
        process_html(&pure, images, &self.config).await.map(Some)
    }

    pub fn to_markdown(&self) -> String {
        format_chapters(&self.chapters, self.name(), self.emoji())
    }

    pub fn delete_chapter(&self, idx: usize, sink: &mut dyn ItemSink) -> Result<String> {
        if idx >= self.chapters.len() {
            return Err(UimarkError::ChapterOutOfRange {
                index: idx,
                len: self.chapters.len(),
            });
        }

        let mut chapters = self.chapters.clone();
        let removed = chapters.remove(idx);
        debug!(idx, version = %removed.version, "deleted chapter");

        let markdown = format_chapters(&chapters, self.name(), self.emoji());
        sink.set_item(self.with_markdown(markdown.clone()));
        Ok(markdown)
    }

    // Editing an edit replaces it in place. Editing a generation inserts after
    // that generation's existing edits.
    pub fn edit_chapter(&self, html: &str, idx: usize, sink: &mut dyn ItemSink) -> Result<usize> {
        if self.chapters.is_empty() {
            return Ok(0);
        }
        if idx >= self.chapters.len() {
            return Err(UimarkError::ChapterOutOfRange {
                index: idx,
                len: self.chapters.len(),
            });
        }

        let version = self.version(idx);
        let mut chapters = self.chapters.clone();

        let new_idx = if VersionLabel::parse(&version).is_edit() {
            let prompt = self
                .prompt(idx)
                .unwrap_or_else(|| self.latest_prompt())
                .to_string();
            chapters[idx] = Chapter {
                markdown: with_frontmatter(html, &prompt, &version),
                version,
                prompt,
            };
            idx
        } else {
            let insert_at = chapters
                .iter()
                .enumerate()
                .skip(idx + 1)
                .find(|(_, chapter)| !chapter.is_edit())
                .map_or(chapters.len(), |(position, _)| position);
            let label = chapters[insert_at - 1]
                .label()
                .next_edit()
                .map_or_else(|| format!("{version}.1"), |label| label.to_string());
            let prompt = self.prompt(idx).unwrap_or_default().to_string();
            chapters.insert(
                insert_at,
                Chapter {
                    markdown: with_frontmatter(html, &prompt, &label),
                    version: label,
                    prompt,
                },
            );
            insert_at
        };

        debug!(idx, new_idx, version = %chapters[new_idx].version, "edited chapter");
        let markdown = format_chapters(&chapters, self.name(), self.emoji());
        sink.set_item(self.with_markdown(markdown));
        sink.save_history();
        Ok(new_idx)
    }

    fn with_markdown(&self, markdown: String) -> Item {
        Item {
            markdown: Some(markdown),
            ..self.item.clone()
        }
    }
}
