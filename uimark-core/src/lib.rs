pub mod chapter;
pub mod config;
pub mod error;
pub mod fence;
pub mod fixer;
pub mod frontmatter;
pub mod history;
pub mod html;
pub mod item;
pub mod model;
pub mod render;
pub mod response;
pub mod service;
pub mod stream;
pub mod version;

pub use chapter::{format_chapters, new_chapter, parse_chapters};
pub use config::RenderConfig;
pub use error::{Result, UimarkError};
pub use fixer::{ContentFixer, fix_html};
pub use history::SavedHistory;
pub use html::{CachedImageLookup, ImageLookup, ImageMeta, Orientation, process_html};
pub use item::{ItemSink, ItemView};
pub use model::{
    Chapter, ChapterListView, Framework, HtmlAndJs, Item, ParseMode, ParsedResponse, Script,
};
pub use response::parse_response;
pub use service::{
    chapter_list_view, chapter_list_view_to_raw_json, chapter_payload, chapter_pure_html,
    delete_chapter_in_file, edit_chapter_in_file, load_item, load_view, payload_to_raw_json,
    read_transcript, render_transcript_markdown, write_transcript,
};
pub use stream::{ResponseStream, StreamState, UiUpdate};
pub use version::VersionLabel;
