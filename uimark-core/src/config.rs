use std::env;

pub const DEFAULT_ASSET_ORIGIN: &str = "http://localhost:7878";
pub const DEFAULT_HEADER_SCAN_LIMIT: usize = 1000;
pub const DEFAULT_MAX_IMAGE_SUBSTITUTIONS: usize = 10;
pub const DEFAULT_ERROR_EXCERPT_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub asset_origin: String,
    pub header_scan_limit: usize,
    pub max_image_substitutions: usize,
    pub error_excerpt_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            asset_origin: DEFAULT_ASSET_ORIGIN.to_string(),
            header_scan_limit: DEFAULT_HEADER_SCAN_LIMIT,
            max_image_substitutions: DEFAULT_MAX_IMAGE_SUBSTITUTIONS,
            error_excerpt_chars: DEFAULT_ERROR_EXCERPT_CHARS,
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // Precedence:
        // 1) UIMARK_ASSET_ORIGIN
        // 2) http://localhost:7878
        let asset_origin = env::var("UIMARK_ASSET_ORIGIN")
            .ok()
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .unwrap_or(defaults.asset_origin);

        // Precedence:
        // 1) UIMARK_MAX_IMAGES (must parse as an unsigned integer)
        // 2) 10
        let max_image_substitutions = env::var("UIMARK_MAX_IMAGES")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(defaults.max_image_substitutions);

        Self {
            asset_origin,
            max_image_substitutions,
            ..defaults
        }
    }
}
