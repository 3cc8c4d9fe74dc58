use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::RenderConfig;
use crate::error::Result;
use crate::fixer::strip_comments;
use crate::model::{HtmlAndJs, Script};

static IMG_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid regex"));
static RAW_TEXT_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(script|style|textarea)\b[^>]*>").expect("valid regex"));
static DIMS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)x(\d+)").expect("valid regex"));
static SIDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)").expect("valid regex"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("valid selector"));
static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("valid selector"));

const DEFAULT_SIDE: u32 = 500;
// Removed when substitution is disabled.
const MANAGED_ATTRS: &[&str] = &["data-src", "data-blurhash", "width", "height", "loading"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Landscape,
    Portrait,
    Squarish,
}

impl Orientation {
    pub fn from_dims(width: u32, height: u32) -> Self {
        match width.cmp(&height) {
            std::cmp::Ordering::Greater => Self::Landscape,
            std::cmp::Ordering::Less => Self::Portrait,
            std::cmp::Ordering::Equal => Self::Squarish,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Squarish => "squarish",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub blurhash: Option<String>,
}

#[async_trait]
pub trait ImageLookup: Send + Sync {
    async fn lookup(
        &self,
        alt: &str,
        width: u32,
        height: u32,
        orientation: Orientation,
    ) -> Result<Option<ImageMeta>>;
}

// Keyed by alt text, unbounded.
#[derive(Debug)]
pub struct CachedImageLookup<L> {
    inner: L,
    cache: Mutex<HashMap<String, ImageMeta>>,
}

impl<L> CachedImageLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl<L: ImageLookup> ImageLookup for CachedImageLookup<L> {
    async fn lookup(
        &self,
        alt: &str,
        width: u32,
        height: u32,
        orientation: Orientation,
    ) -> Result<Option<ImageMeta>> {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(alt)
            .cloned();
        if let Some(meta) = cached {
            return Ok(Some(ImageMeta {
                url: sized_url(&meta.url, width, height),
                width,
                height,
                ..meta
            }));
        }

        let found = self.inner.lookup(alt, width, height, orientation).await?;
        if let Some(meta) = &found {
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(alt.to_string(), meta.clone());
        }
        Ok(found)
    }
}

// Sets the `w` and `h` query parameters, keeping every other parameter.
fn sized_url(url: &str, width: u32, height: u32) -> String {
    let (url, fragment) = match url.split_once('#') {
        Some((url, fragment)) => (url, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = url.split_once('?').unwrap_or((url, ""));

    let mut params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(key, _)| key);
            key != "w" && key != "h"
        })
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    params.push(format!("w={width}"));
    params.push(format!("h={height}"));

    let mut sized = format!("{base}?{}", params.join("&"));
    if let Some(fragment) = fragment {
        sized.push('#');
        sized.push_str(fragment);
    }
    sized
}

pub fn image_dims(src: &str) -> (u32, u32) {
    if let Some(caps) = DIMS_RE.captures(src)
        && let (Ok(width), Ok(height)) = (caps[1].parse(), caps[2].parse())
    {
        return (width, height);
    }
    if let Some(caps) = SIDE_RE.captures(src)
        && let Ok(side) = caps[1].parse()
    {
        return (side, side);
    }
    (DEFAULT_SIDE, DEFAULT_SIDE)
}

#[derive(Debug)]
struct ImgTag {
    start: usize,
    end: usize,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

impl ImgTag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn src(&self) -> &str {
        self.attr("src").unwrap_or_default()
    }

    fn has_managed_attrs(&self) -> bool {
        self.attrs
            .iter()
            .any(|(key, _)| MANAGED_ATTRS.contains(&key.as_str()))
    }

    fn render(&self, meta: Option<&ImageMeta>) -> String {
        let mut tag = String::from("<img");
        for (key, value) in &self.attrs {
            if MANAGED_ATTRS.contains(&key.as_str()) {
                continue;
            }
            push_attr(&mut tag, key, value);
        }
        if let Some(meta) = meta {
            push_attr(&mut tag, "data-src", &meta.url);
            push_attr(&mut tag, "width", &meta.width.to_string());
            push_attr(&mut tag, "height", &meta.height.to_string());
            push_attr(&mut tag, "loading", "lazy");
            if let Some(blurhash) = &meta.blurhash {
                push_attr(&mut tag, "data-blurhash", blurhash);
            }
        }
        tag.push_str(if self.self_closing { " />" } else { ">" });
        tag
    }
}

fn push_attr(tag: &mut String, key: &str, value: &str) {
    tag.push(' ');
    tag.push_str(key);
    tag.push_str("=\"");
    tag.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
    tag.push('"');
}

// An unclosed raw-text element runs to the end of the document.
fn raw_text_spans(html: &str) -> Vec<(usize, usize)> {
    let lower = html.to_ascii_lowercase();
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(caps) = RAW_TEXT_OPEN_RE.captures_at(html, from) {
        let Some(open) = caps.get(0) else {
            break;
        };
        let closing = format!("</{}", caps[1].to_ascii_lowercase());
        let end = lower[open.end()..]
            .find(&closing)
            .map(|close| open.end() + close)
            .and_then(|close| lower[close..].find('>').map(|gt| close + gt + 1))
            .unwrap_or(html.len());
        spans.push((open.start(), end));
        from = end;
    }

    spans
}

fn find_img_tags(html: &str) -> Vec<ImgTag> {
    let raw_text = raw_text_spans(html);
    IMG_TAG_RE
        .find_iter(html)
        .filter(|found| {
            !raw_text
                .iter()
                .any(|&(start, end)| found.start() > start && found.start() < end)
        })
        .filter_map(|found| {
            let fragment = Html::parse_fragment(found.as_str());
            let element = fragment.select(&IMG_SELECTOR).next()?;
            let attrs = element
                .value()
                .attrs()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            Some(ImgTag {
                start: found.start(),
                end: found.end(),
                attrs,
                self_closing: found.as_str().trim_end_matches('>').ends_with('/'),
            })
        })
        .collect()
}

pub async fn process_html(
    pure_html: &str,
    lookup: Option<&dyn ImageLookup>,
    config: &RenderConfig,
) -> Result<HtmlAndJs> {
    let html = strip_comments(pure_html);
    let tags = find_img_tags(&html);

    let replacements = match lookup {
        Some(lookup) => substitute_images(&tags, lookup, config.max_image_substitutions).await,
        None => tags
            .iter()
            .map(|tag| tag.has_managed_attrs().then(|| tag.render(None)))
            .collect(),
    };

    let mut output = String::with_capacity(html.len());
    let mut cursor = 0;
    for (tag, replacement) in tags.iter().zip(replacements) {
        if let Some(replacement) = replacement {
            output.push_str(&html[cursor..tag.start]);
            output.push_str(&replacement);
            cursor = tag.end;
        }
    }
    output.push_str(&html[cursor..]);

    let scripts = parse_scripts(&output);
    Ok(HtmlAndJs {
        html: output,
        scripts,
        pure_html: pure_html.to_string(),
    })
}

async fn substitute_images(
    tags: &[ImgTag],
    lookup: &dyn ImageLookup,
    limit: usize,
) -> Vec<Option<String>> {
    if tags.len() > limit {
        warn!(images = tags.len(), limit, "only substituting the first images");
    }

    let lookups = tags.iter().take(limit).map(|tag| async move {
        let src = tag.src();
        if src.contains(".svg") {
            return None;
        }
        let alt = tag.attr("alt").unwrap_or_default();
        let (width, height) = image_dims(src);
        let orientation = Orientation::from_dims(width, height);
        debug!(alt, width, height, %orientation, "looking up image");

        match lookup.lookup(alt, width, height, orientation).await {
            Ok(Some(meta)) => Some(tag.render(Some(&meta))),
            Ok(None) => None,
            Err(err) => {
                warn!(alt, error = %err, "image lookup failed");
                None
            }
        }
    });

    let mut replacements = join_all(lookups).await;
    replacements.resize(tags.len(), None);
    replacements
}

pub fn parse_scripts(html: &str) -> Vec<Script> {
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&SCRIPT_SELECTOR)
        .map(|script| Script {
            text: script.text().collect(),
            src: script.value().attr("src").unwrap_or_default().to_string(),
            kind: script.value().attr("type").map(ToString::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::config::RenderConfig;
    use crate::error::{Result, UimarkError};
    use crate::html::{
        CachedImageLookup, ImageLookup, ImageMeta, Orientation, image_dims, parse_scripts,
        process_html, sized_url,
    };

    #[derive(Default)]
    struct FakeLookup {
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, u32, u32, Orientation)>>,
    }

    #[async_trait]
    impl ImageLookup for FakeLookup {
        async fn lookup(
            &self,
            alt: &str,
            width: u32,
            height: u32,
            orientation: Orientation,
        ) -> Result<Option<ImageMeta>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .expect("lock")
                .push((alt.to_string(), width, height, orientation));
            match alt {
                "broken" => Err(UimarkError::ImageLookup("search unavailable".to_string())),
                "nothing" => Ok(None),
                _ => Ok(Some(ImageMeta {
                    url: format!("https://images.example/{alt}?w={width}&h={height}"),
                    width,
                    height,
                    blurhash: Some("LKO2".to_string()),
                })),
            }
        }
    }

    #[test]
    fn reads_dims_from_placeholder_urls() {
        assert_eq!(image_dims("https://placehold.co/600x400"), (600, 400));
        assert_eq!(image_dims("https://placehold.co/150"), (150, 150));
        assert_eq!(image_dims("photo.png"), (500, 500));
        assert_eq!(Orientation::from_dims(600, 400), Orientation::Landscape);
        assert_eq!(Orientation::from_dims(400, 600), Orientation::Portrait);
        assert_eq!(Orientation::from_dims(150, 150), Orientation::Squarish);
    }

    #[tokio::test]
    async fn substitutes_images_and_collects_scripts() {
        let lookup = FakeLookup::default();
        let pure = "<div><!-- hero --><img alt=\"cat\" src=\"https://placehold.co/600x400\"><img src=\"icon.svg\" alt=\"icon\"></div>\n<script type=\"text/javascript\">go()</script>";
        let out = process_html(pure, Some(&lookup), &RenderConfig::default())
            .await
            .expect("process");

        assert!(!out.html.contains("<!--"));
        assert!(out.html.contains(
            "<img alt=\"cat\" src=\"https://placehold.co/600x400\" data-src=\"https://images.example/cat?w=600&amp;h=400\" width=\"600\" height=\"400\" loading=\"lazy\" data-blurhash=\"LKO2\">"
        ));
        assert!(out.html.contains("<img src=\"icon.svg\" alt=\"icon\">"));
        assert_eq!(out.pure_html, pure);
        assert_eq!(out.scripts.len(), 1);
        assert_eq!(out.scripts[0].text, "go()");
        assert_eq!(out.scripts[0].kind.as_deref(), Some("text/javascript"));

        let seen = lookup.seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), &[("cat".to_string(), 600, 400, Orientation::Landscape)]);
    }

    #[tokio::test]
    async fn lookup_failures_leave_images_untouched() {
        let lookup = FakeLookup::default();
        let pure = "<img alt=\"broken\" src=\"a/10\"><img alt=\"nothing\" src=\"b/20\">";
        let out = process_html(pure, Some(&lookup), &RenderConfig::default())
            .await
            .expect("failures are not fatal");

        assert_eq!(out.html, pure);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn caps_the_number_of_lookups() {
        let lookup = FakeLookup::default();
        let config = RenderConfig {
            max_image_substitutions: 2,
            ..RenderConfig::default()
        };
        let pure = (0..5)
            .map(|idx| format!("<img alt=\"a{idx}\" src=\"x/{idx}0\">"))
            .collect::<String>();
        let out = process_html(&pure, Some(&lookup), &config)
            .await
            .expect("process");

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
        assert_eq!(out.html.matches("data-src").count(), 2);
        assert!(out.html.ends_with("<img alt=\"a4\" src=\"x/40\">"));
    }

    #[tokio::test]
    async fn strips_substitution_attrs_when_disabled() {
        let pure = "<p>x</p><img src=\"a.png\" data-src=\"old\" width=\"1\" loading=\"lazy\"/><img src=\"b.png\">";
        let out = process_html(pure, None, &RenderConfig::default())
            .await
            .expect("process");

        assert_eq!(out.html, "<p>x</p><img src=\"a.png\" /><img src=\"b.png\">");
    }

    #[tokio::test]
    async fn cache_serves_repeated_alt_text() {
        let cached = CachedImageLookup::new(FakeLookup::default());
        let first = cached
            .lookup("dog", 100, 100, Orientation::Squarish)
            .await
            .expect("lookup")
            .expect("hit");
        let second = cached
            .lookup("dog", 300, 200, Orientation::Landscape)
            .await
            .expect("lookup")
            .expect("hit");

        assert_eq!(first.url, "https://images.example/dog?w=100&h=100");
        assert_eq!(second.url, "https://images.example/dog?w=300&h=200");
        assert_eq!((second.width, second.height), (300, 200));
        assert_eq!(cached.cached(), 1);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resizes_cached_urls() {
        assert_eq!(
            sized_url("https://img.example/p?ixid=9&w=100&fit=crop&h=100", 640, 480),
            "https://img.example/p?ixid=9&fit=crop&w=640&h=480"
        );
        assert_eq!(sized_url("https://img.example/p#top", 10, 20), "https://img.example/p?w=10&h=20#top");
    }

    #[tokio::test]
    async fn leaves_markup_inside_scripts_alone() {
        let lookup = FakeLookup::default();
        let script = "<script>document.getElementById('g').innerHTML = \"<img alt=\\\"cat\\\" src=\\\"https://placehold.co/10\\\">\";</script>";
        let pure = format!(
            "<div id=\"g\"></div>\n{script}\n<style>/* <img alt=\"x\"> */</style><img alt=\"dog\" src=\"https://placehold.co/20\">"
        );
        let out = process_html(&pure, Some(&lookup), &RenderConfig::default())
            .await
            .expect("process");

        assert!(out.html.contains(script));
        assert!(out.html.contains("<style>/* <img alt=\"x\"> */</style>"));
        assert!(out.html.contains("data-src=\"https://images.example/dog?w=20&amp;h=20\""));
        assert_eq!(out.scripts.len(), 1);
        assert!(out.scripts[0].text.contains("<img alt=\\\"cat\\\" src=\\\"https://placehold.co/10\\\">"));

        let seen = lookup.seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), &[("dog".to_string(), 20, 20, Orientation::Squarish)]);
    }

    #[tokio::test]
    async fn unclosed_script_hides_trailing_images() {
        let lookup = FakeLookup::default();
        let pure = "<script>let tpl = '<img alt=\"cat\" src=\"a/10\">'";
        let out = process_html(pure, Some(&lookup), &RenderConfig::default())
            .await
            .expect("process");

        assert_eq!(out.html, pure);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn script_text_inside_style_does_not_hide_later_images() {
        let lookup = FakeLookup::default();
        let pure = "<style>/* <script> */</style><img alt=\"dog\" src=\"x/30\">";
        let out = process_html(pure, Some(&lookup), &RenderConfig::default())
            .await
            .expect("process");

        assert!(out.html.contains("data-src=\"https://images.example/dog?w=30&amp;h=30\""));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn parses_external_and_inline_scripts() {
        let scripts = parse_scripts(
            "<script src=\"https://cdn.example/lib.js\"></script><div><script>init()</script></div>",
        );
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].src, "https://cdn.example/lib.js");
        assert_eq!(scripts[0].text, "");
        assert_eq!(scripts[1].text, "init()");
        assert_eq!(scripts[1].kind, None);
    }
}
