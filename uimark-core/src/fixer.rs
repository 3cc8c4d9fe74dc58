use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::{DEFAULT_ASSET_ORIGIN, RenderConfig};

static AUDIO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""[^"<>]*\.(?:mp3|wav)"|'[^'<>]*\.(?:mp3|wav)'"#).expect("valid regex")
});
static SVG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"?\s<>']+/([^/"?\s<>']+)\.svg(["?])"#).expect("valid regex"));
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

const NEUTRAL_TOKEN: &str = "-gray-";
const CANONICAL_TOKEN: &str = "-zinc-";
const PLACEHOLDER_HOSTS: &[&str] = &["via.placeholder.com", "via.placeholder.co", "placehold.it"];
const CANONICAL_PLACEHOLDER_HOST: &str = "placehold.co";
const AUDIO_ASSET: &str = "funky.mp3";
const ASSET_PREFIX: &str = "openui";
// Every rule either shrinks the text or moves it toward a canonical form, so a
// handful of passes always reaches the fixed point.
const MAX_PASSES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFixer {
    asset_origin: String,
}

impl Default for ContentFixer {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_ORIGIN)
    }
}

impl ContentFixer {
    pub fn new(asset_origin: impl Into<String>) -> Self {
        Self {
            asset_origin: asset_origin.into(),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.asset_origin.clone())
    }

    // Repeats until the text stops changing.
    pub fn fix(&self, html: &str) -> String {
        let mut current = self.fix_once(html);
        for _ in 0..MAX_PASSES {
            let next = self.fix_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn fix_once(&self, html: &str) -> String {
        let mut fixed = html.replace(NEUTRAL_TOKEN, CANONICAL_TOKEN);
        for host in PLACEHOLDER_HOSTS {
            fixed = fixed.replace(host, CANONICAL_PLACEHOLDER_HOST);
        }

        let audio = format!("\"{}/{ASSET_PREFIX}/{AUDIO_ASSET}\"", self.asset_origin);
        let fixed = AUDIO_RE.replace_all(&fixed, audio.as_str());

        let fixed = SVG_RE.replace_all(&fixed, |caps: &Captures<'_>| {
            format!(
                "\"{}/{ASSET_PREFIX}/{}.svg{}",
                self.asset_origin, &caps[1], &caps[2]
            )
        });

        strip_comments(&fixed)
    }
}

pub fn fix_html(html: &str) -> String {
    ContentFixer::default().fix(html)
}

pub fn strip_comments(html: &str) -> String {
    let mut current = COMMENT_RE.replace_all(html, "").into_owned();
    while COMMENT_RE.is_match(&current) {
        current = COMMENT_RE.replace_all(&current, "").into_owned();
    }
    current
}
