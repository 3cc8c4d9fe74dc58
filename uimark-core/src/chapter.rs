use tracing::debug;

use crate::frontmatter::{
    EMOJI_KEY, NAME_KEY, PROMPT_KEY, VERSION_KEY, field_value, has_field, is_delimiter,
};
use crate::model::Chapter;
use crate::version::VersionLabel;

const HEADER_PROBE_LINES: usize = 4;

// The newline ending the line before a delimiter belongs to the delimiter.
pub fn split_segments(transcript: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut segment_start = 0;
    let mut offset = 0;

    for line in transcript.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if !is_delimiter(line) {
            continue;
        }

        let segment = &transcript[segment_start..line_start];
        let segment = segment
            .strip_suffix("\r\n")
            .or_else(|| segment.strip_suffix('\n'))
            .unwrap_or(segment);
        segments.push(segment);
        segment_start = offset;
    }

    segments.push(&transcript[segment_start..]);
    segments
}

#[derive(Debug, Default)]
struct ChapterWalk {
    prompt: String,
    running_index: usize,
    offset: usize,
    pending_version: Option<String>,
    // Content index whose edit was already counted into `offset`.
    offset_counted_for: Option<usize>,
    chapters: Vec<Chapter>,
}

impl ChapterWalk {
    fn new(fallback_prompt: &str) -> Self {
        Self {
            prompt: fallback_prompt.to_string(),
            ..Self::default()
        }
    }

    fn visit(mut self, segment: &str) -> Self {
        if segment.lines().any(|line| has_field(line, VERSION_KEY)) {
            self.record_version(segment);
        }

        if is_header(segment) {
            if let Some(prompt) = segment
                .lines()
                .find_map(|line| field_value(line, PROMPT_KEY))
            {
                self.prompt = prompt.to_string();
            }
            return self;
        }

        if segment.trim().is_empty() {
            return self;
        }

        let version = self.pending_version.take().unwrap_or_else(|| {
            self.running_index
                .saturating_sub(self.offset)
                .to_string()
        });
        debug!(index = self.running_index, version = %version, "chapter");
        self.chapters.push(Chapter {
            version,
            prompt: self.prompt.clone(),
            markdown: segment.to_string(),
        });
        self.running_index += 1;
        self
    }

    fn record_version(&mut self, segment: &str) {
        let Some(raw) = segment
            .lines()
            .find_map(|line| field_value(line, VERSION_KEY))
        else {
            return;
        };

        let label = VersionLabel::parse(raw);
        if matches!(label, VersionLabel::Generation(_)) {
            // integer labels are positional
            return;
        }

        if label.is_edit() && self.offset_counted_for != Some(self.running_index) {
            self.offset += 1;
            self.offset_counted_for = Some(self.running_index);
        }
        self.pending_version = Some(raw.trim().to_string());
    }

    fn finish(mut self, transcript: &str) -> Vec<Chapter> {
        if self.chapters.is_empty() && !transcript.is_empty() {
            let markdown = split_segments(transcript)
                .last()
                .map(ToString::to_string)
                .unwrap_or_default();
            self.chapters.push(Chapter {
                version: "0".to_string(),
                prompt: self.prompt,
                markdown,
            });
        }
        self.chapters
    }
}

fn is_header(segment: &str) -> bool {
    segment
        .lines()
        .take(HEADER_PROBE_LINES)
        .any(|line| has_field(line, NAME_KEY) || has_field(line, PROMPT_KEY))
}

pub fn parse_chapters(transcript: &str, fallback_prompt: &str) -> Vec<Chapter> {
    split_segments(transcript)
        .into_iter()
        .fold(ChapterWalk::new(fallback_prompt), ChapterWalk::visit)
        .finish(transcript)
}

#[derive(Debug, Default)]
struct VersionWalk {
    offset: usize,
    last_emitted: Option<VersionLabel>,
}

impl VersionWalk {
    fn label_for(&mut self, index: usize, chapter: &Chapter) -> VersionLabel {
        let stored = chapter.label();
        let label = if stored.is_edit() {
            self.offset += 1;
            // consecutive edits form one chain and are renumbered in order
            self.last_emitted
                .as_ref()
                .filter(|last| last.is_edit())
                .and_then(VersionLabel::next_edit)
                .unwrap_or(stored)
        } else {
            let position = index.saturating_sub(self.offset);
            VersionLabel::Generation(u32::try_from(position).unwrap_or(u32::MAX))
        };
        self.last_emitted = Some(label.clone());
        label
    }
}

pub fn format_chapters(chapters: &[Chapter], name: &str, emoji: &str) -> String {
    let mut walk = VersionWalk::default();

    chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| {
            let version = walk.label_for(index, chapter);
            let mut block = String::from("---\n");
            if index == 0 {
                block.push_str(&format!("{NAME_KEY}: {}\n", single_line(name)));
                block.push_str(&format!("{EMOJI_KEY}: {}\n", single_line(emoji)));
            }
            block.push_str(&format!("{VERSION_KEY}: {version}\n"));
            block.push_str(&format!("{PROMPT_KEY}: {}\n", single_line(&chapter.prompt)));
            block.push_str("---\n");
            block.push_str(&chapter.markdown);
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn new_chapter(prompt: &str) -> String {
    format!("\n\n---\n{PROMPT_KEY}: {}\n---\n\n", single_line(prompt))
}

pub fn with_frontmatter(html: &str, prompt: &str, version: &str) -> String {
    format!(
        "\n\n---\n{PROMPT_KEY}: {}\n{VERSION_KEY}: {version}\n---\n\n{html}\n",
        single_line(prompt)
    )
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
