use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::ParseMode;

pub const INDEX_HTML_OPEN: &str = "<index_html>";
pub const INDEX_HTML_CLOSE: &str = "</index_html>";
pub const HTML_LANG: &str = "html";
pub const SCRIPT_LANG: &str = "javascript";

static OPEN_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlRegion {
    Found(String),
    Pending,
    Missing,
}

impl HtmlRegion {
    pub fn as_found(&self) -> Option<&str> {
        match self {
            Self::Found(html) => Some(html),
            Self::Pending | Self::Missing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub html: HtmlRegion,
    pub scripts: Vec<String>,
    pub commentary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    pub lang: String,
    pub start: usize,
    pub end: usize,
    pub body: String,
    pub closed: bool,
}

// A region is only accepted once its closing delimiter is present.
pub fn extract(text: &str, mode: ParseMode) -> Extraction {
    let (html, rest) = extract_html(text, mode);
    let (scripts, commentary) = extract_scripts(&rest);

    Extraction {
        html,
        scripts,
        commentary: commentary.trim().to_string(),
    }
}

fn extract_html(text: &str, mode: ParseMode) -> (HtmlRegion, String) {
    if let Some(start) = text.find(INDEX_HTML_OPEN) {
        let body_start = start + INDEX_HTML_OPEN.len();
        let Some(close) = text[body_start..].find(INDEX_HTML_CLOSE) else {
            return (HtmlRegion::Pending, text[..start].to_string());
        };
        let close = body_start + close;
        let html = text[body_start..close].trim().to_string();
        let rest = join_around(text, start, close + INDEX_HTML_CLOSE.len());
        return (HtmlRegion::Found(html), rest);
    }

    if let Some(block) = scan_fences(text)
        .into_iter()
        .find(|block| block.lang == HTML_LANG)
    {
        if !block.closed {
            return (HtmlRegion::Pending, text[..block.start].to_string());
        }
        let rest = join_around(text, block.start, block.end);
        return (HtmlRegion::Found(block.body.trim().to_string()), rest);
    }

    if mode.is_streaming() {
        return (HtmlRegion::Missing, text.to_string());
    }

    extract_bare_markup(text)
}

fn extract_bare_markup(text: &str) -> (HtmlRegion, String) {
    let Some(caps) = OPEN_TAG_RE.captures(text) else {
        return (HtmlRegion::Missing, text.to_string());
    };
    let Some(open) = caps.get(0) else {
        return (HtmlRegion::Missing, text.to_string());
    };
    let closing = format!("</{}>", &caps[1]);

    match text[open.start()..].rfind(&closing) {
        Some(close) => {
            let end = open.start() + close + closing.len();
            let html = text[open.start()..end].to_string();
            (HtmlRegion::Found(html), join_around(text, open.start(), end))
        }
        None => {
            let html = text[open.start()..].trim().to_string();
            (HtmlRegion::Found(html), text[..open.start()].to_string())
        }
    }
}

fn extract_scripts(text: &str) -> (Vec<String>, String) {
    let mut scripts = Vec::new();
    let mut commentary = String::new();
    let mut cursor = 0;

    for block in scan_fences(text) {
        if block.lang != SCRIPT_LANG {
            continue;
        }
        commentary.push_str(&text[cursor..block.start]);
        cursor = block.end;
        if block.closed {
            scripts.push(block.body.trim().to_string());
        }
    }
    commentary.push_str(&text[cursor..]);

    (scripts, commentary)
}

pub fn scan_fences(text: &str) -> Vec<FencedBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(usize, usize, String)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let Some(info) = line.trim().strip_prefix("```") else {
            continue;
        };

        match open.take() {
            None => {
                let lang = info
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                open = Some((line_start, offset, lang));
            }
            Some((start, body_start, lang)) => {
                if info.trim().is_empty() {
                    blocks.push(FencedBlock {
                        lang,
                        start,
                        end: offset,
                        body: text[body_start..line_start].to_string(),
                        closed: true,
                    });
                } else {
                    // closing fences carry no info string; this line is content
                    open = Some((start, body_start, lang));
                }
            }
        }
    }

    if let Some((start, body_start, lang)) = open {
        blocks.push(FencedBlock {
            lang,
            start,
            end: text.len(),
            body: text[body_start.min(text.len())..].to_string(),
            closed: false,
        });
    }

    blocks
}

fn join_around(text: &str, start: usize, end: usize) -> String {
    let before = text[..start].trim();
    let after = text[end..].trim();
    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) => format!("{before}\n\n{after}"),
    }
}
