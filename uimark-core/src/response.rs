use tracing::{debug, warn};

use crate::config::RenderConfig;
use crate::fence::{self, HtmlRegion};
use crate::fixer::ContentFixer;
use crate::frontmatter::{extract_frontmatter, is_delimiter};
use crate::model::{ParseMode, ParsedResponse};

const MALFORMED_WARN_LEN: usize = 1000;

pub fn parse_response(
    markdown: &str,
    version: Option<&str>,
    mode: ParseMode,
    config: &RenderConfig,
) -> ParsedResponse {
    let fixer = ContentFixer::from_config(config);

    if version.is_some_and(|version| version.contains('.')) {
        let html = fixer.fix(strip_leading_block(markdown).trim());
        return ParsedResponse {
            html: Some(html),
            ..ParsedResponse::default()
        };
    }

    let front = extract_frontmatter(markdown, config.header_scan_limit);
    let extraction = fence::extract(front.body, mode);

    let html = match &extraction.html {
        HtmlRegion::Found(html) => Some(fixer.fix(&with_scripts(html, &extraction.scripts))),
        HtmlRegion::Pending => None,
        HtmlRegion::Missing => {
            if !mode.is_streaming() && markdown.len() > MALFORMED_WARN_LEN {
                warn!(len = markdown.len(), "malformed llm response, no html found");
            }
            None
        }
    };

    if !mode.is_streaming() {
        debug!(
            has_html = html.is_some(),
            scripts = extraction.scripts.len(),
            "parsed settled response"
        );
    }

    ParsedResponse {
        name: front.name,
        emoji: front.emoji,
        html,
        commentary: Some(extraction.commentary).filter(|text| !text.is_empty()),
    }
}

fn with_scripts(html: &str, scripts: &[String]) -> String {
    let mut parts = Vec::with_capacity(scripts.len() + 1);
    parts.push(html.to_string());
    parts.extend(
        scripts
            .iter()
            .map(|script| format!("<script type=\"text/javascript\">{script}</script>")),
    );
    parts.join("\n")
}

fn strip_leading_block(markdown: &str) -> &str {
    let mut lines = markdown.split_inclusive('\n');
    let mut offset = 0;

    for line in lines.by_ref() {
        offset += line.len();
        if line.trim().is_empty() {
            continue;
        }
        if !is_delimiter(line) {
            return markdown;
        }
        break;
    }

    for line in lines {
        offset += line.len();
        if is_delimiter(line) {
            return &markdown[offset..];
        }
    }
    markdown
}

pub fn no_html_placeholder(raw: &str, config: &RenderConfig) -> String {
    let heading_class = if raw.trim().is_empty() {
        "text-xl font-bold text-red-700"
    } else {
        "text-xl font-bold"
    };
    format!(
        "<div class=\"p-8 prose dark:prose-invert\"><h1 class=\"{heading_class}\">Couldn't find any HTML, LLM Response:</h1><pre class=\"text-xs\"><code class=\"language-html\">{}</code></pre></div>",
        escape_html(&excerpt(raw, config.error_excerpt_chars))
    )
}

pub fn excerpt(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let mut out = raw
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
