pub const DELIMITER: &str = "---";
pub const NAME_KEY: &str = "name";
pub const EMOJI_KEY: &str = "emoji";
pub const PROMPT_KEY: &str = "prompt";
pub const VERSION_KEY: &str = "version";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter<'a> {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub body: &'a str,
}

// An `emoji:` line consumes everything through the next delimiter line.
pub fn extract_frontmatter(markdown: &str, scan_limit: usize) -> Frontmatter<'_> {
    let header_end = markdown
        .char_indices()
        .nth(scan_limit)
        .map_or(markdown.len(), |(idx, _)| idx);
    let header = &markdown[..header_end];

    let mut name = None;
    let mut emoji = None;
    let mut emoji_line_end = None;
    let mut offset = 0;

    for line in header.split_inclusive('\n') {
        offset += line.len();
        if name.is_none() {
            name = field_value(line, NAME_KEY).map(ToString::to_string);
        }
        if emoji.is_none()
            && let Some(value) = field_value(line, EMOJI_KEY)
        {
            emoji = Some(value.to_string());
            emoji_line_end = Some(offset);
        }
    }

    let body = emoji_line_end
        .and_then(|from| delimiter_after(markdown, from))
        .map_or(markdown, |end| &markdown[end..]);

    Frontmatter { name, emoji, body }
}

pub fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.trim()
        .strip_prefix(key)?
        .strip_prefix(": ")
        .map(str::trim_end)
}

pub fn has_field(line: &str, key: &str) -> bool {
    line.trim()
        .strip_prefix(key)
        .is_some_and(|rest| rest.starts_with(':'))
}

pub fn is_delimiter(line: &str) -> bool {
    line.trim() == DELIMITER
}

fn delimiter_after(markdown: &str, from: usize) -> Option<usize> {
    let mut offset = from;
    for line in markdown[from..].split_inclusive('\n') {
        offset += line.len();
        if is_delimiter(line) {
            return Some(offset);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::frontmatter::{extract_frontmatter, field_value, has_field};

    #[test]
    fn reads_name_and_emoji_and_consumes_block() {
        let raw = "---\nname: Landing Page\nemoji: 🚀\n---\n\n<index_html><p>x</p></index_html>";
        let front = extract_frontmatter(raw, 1000);

        assert_eq!(front.name.as_deref(), Some("Landing Page"));
        assert_eq!(front.emoji.as_deref(), Some("🚀"));
        assert_eq!(front.body, "\n<index_html><p>x</p></index_html>");
    }

    #[test]
    fn missing_frontmatter_is_not_an_error() {
        let raw = "<index_html><p>edit</p></index_html>";
        let front = extract_frontmatter(raw, 1000);

        assert_eq!(front.name, None);
        assert_eq!(front.emoji, None);
        assert_eq!(front.body, raw);
    }

    #[test]
    fn ignores_keys_past_the_scan_limit() {
        let raw = format!("{}\nname: Deep\n", "x".repeat(50));
        assert_eq!(extract_frontmatter(&raw, 20).name, None);
        assert_eq!(extract_frontmatter(&raw, 200).name.as_deref(), Some("Deep"));
    }

    #[test]
    fn unclosed_block_keeps_the_body() {
        let raw = "name: Foo\nemoji: 🎉\n<index_html>";
        let front = extract_frontmatter(raw, 1000);
        assert_eq!(front.emoji.as_deref(), Some("🎉"));
        assert_eq!(front.body, raw);
    }

    #[test]
    fn field_helpers() {
        assert_eq!(field_value("  prompt: make it blue \r", "prompt"), Some("make it blue"));
        assert_eq!(field_value("prompt:blue", "prompt"), None);
        assert!(has_field("prompt:blue", "prompt"));
        assert!(!has_field("prompts: x", "prompt"));
    }
}
