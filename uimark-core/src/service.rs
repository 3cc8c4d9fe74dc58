use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::RenderConfig;
use crate::error::{Result, UimarkError};
use crate::html::ImageLookup;
use crate::item::ItemView;
use crate::model::{ChapterListView, HtmlAndJs, Item, ParseMode};
use crate::render;

pub fn read_transcript(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| UimarkError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.is_empty() {
        return Err(UimarkError::EmptyTranscript {
            path: path.to_path_buf(),
        });
    }

    String::from_utf8(bytes).map_err(|_| UimarkError::NonUtf8Transcript {
        path: path.to_path_buf(),
    })
}

pub fn write_transcript(path: &Path, markdown: &str) -> Result<()> {
    fs::write(path, markdown).map_err(|source| UimarkError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_item(path: &Path, prompt: &str) -> Result<Item> {
    let markdown = read_transcript(path)?;
    Ok(Item::from_transcript(markdown, prompt))
}

pub fn load_view(path: &Path, prompt: &str, config: &RenderConfig) -> Result<ItemView> {
    let item = load_item(path, prompt)?;
    Ok(ItemView::new(item, config.clone()))
}

pub fn render_transcript_markdown(path: &Path, view: &ItemView) -> String {
    render::render_item_markdown(path, view)
}

pub fn chapter_list_view(view: &ItemView) -> ChapterListView {
    ChapterListView {
        name: view.name().to_string(),
        emoji: view.emoji().to_string(),
        latest_version: view.latest_version(),
        chapters: view.chapters().to_vec(),
    }
}

pub fn chapter_list_view_to_raw_json(view: &ChapterListView) -> Result<String> {
    serde_json::to_string_pretty(view).map_err(|err| UimarkError::Serialization(err.to_string()))
}

pub fn payload_to_raw_json(payload: &HtmlAndJs) -> Result<String> {
    serde_json::to_string_pretty(payload).map_err(|err| UimarkError::Serialization(err.to_string()))
}

pub fn chapter_pure_html(view: &ItemView, idx: usize) -> Result<String> {
    ensure_chapter(view, idx)?;
    Ok(view
        .pure_html(idx, ParseMode::Settled)
        .unwrap_or_default())
}

pub async fn chapter_payload(
    view: &ItemView,
    idx: usize,
    images: Option<&dyn ImageLookup>,
) -> Result<HtmlAndJs> {
    ensure_chapter(view, idx)?;
    let payload = view.html(idx, images, ParseMode::Settled).await?;
    Ok(payload.unwrap_or_else(|| HtmlAndJs {
        html: String::new(),
        scripts: Vec::new(),
        pure_html: String::new(),
    }))
}

pub fn delete_chapter_in_file(
    path: &Path,
    prompt: &str,
    idx: usize,
    config: &RenderConfig,
) -> Result<String> {
    let view = load_view(path, prompt, config)?;
    let mut updated = None;
    let markdown = view.delete_chapter(idx, &mut |item: Item| updated = Some(item))?;

    if let Some(item) = updated {
        write_transcript(path, item.transcript())?;
        debug!(path = %path.display(), idx, "rewrote transcript after delete");
    }
    Ok(markdown)
}

pub fn edit_chapter_in_file(
    path: &Path,
    prompt: &str,
    idx: usize,
    html: &str,
    config: &RenderConfig,
) -> Result<usize> {
    let view = load_view(path, prompt, config)?;
    let mut updated = None;
    let new_idx = view.edit_chapter(html, idx, &mut |item: Item| updated = Some(item))?;

    if let Some(item) = updated {
        write_transcript(path, item.transcript())?;
        debug!(path = %path.display(), idx, new_idx, "rewrote transcript after edit");
    }
    Ok(new_idx)
}

fn ensure_chapter(view: &ItemView, idx: usize) -> Result<()> {
    let len = view.chapters().len();
    if idx >= len {
        return Err(UimarkError::ChapterOutOfRange { index: idx, len });
    }
    Ok(())
}
