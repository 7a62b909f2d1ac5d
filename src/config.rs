// ABOUTME: Configuration module for the beamer-slides application
// ABOUTME: Provides defaults and environment variable handling for conversion, build, preview and export

use crate::document::DocumentOptions;
use crate::html::HtmlOptions;
use crate::render::{CompileConfig, PageRange, PreviewConfig};
use crate::resources::ResourceFile;
use crate::themes::CustomTheme;
use std::env;
use std::path::PathBuf;

const DEFAULT_THEME: &str = "Madrid";
const DEFAULT_COLOR_THEME: &str = "default";
const DEFAULT_ASPECT_RATIO: &str = "169";
const DEFAULT_ENGINE: &str = "pdflatex";
const DEFAULT_PREVIEW_TOOL: &str = "pdftoppm";
const DEFAULT_PREVIEW_WIDTH: u32 = 1280;
const DEFAULT_HTML_THEME_BASE: &str = "themes";
const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Global configuration for the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub theme: String,
    pub color_theme: String,
    pub aspect_ratio: String,
    pub engine: String,
    pub engine_passes: u32,
    pub preview_tool: String,
    pub preview_width: u32,
    pub image_viewer: Option<String>,
    pub html_theme_base: String,
    pub theme_dir: Option<PathBuf>,
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            color_theme: DEFAULT_COLOR_THEME.to_string(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            engine: DEFAULT_ENGINE.to_string(),
            engine_passes: 1,
            preview_tool: DEFAULT_PREVIEW_TOOL.to_string(),
            preview_width: DEFAULT_PREVIEW_WIDTH,
            image_viewer: None,
            html_theme_base: DEFAULT_HTML_THEME_BASE.to_string(),
            theme_dir: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Create a new configuration instance with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            theme: env_string("BEAMER_THEME", DEFAULT_THEME),
            color_theme: env_string("BEAMER_COLOR_THEME", DEFAULT_COLOR_THEME),
            aspect_ratio: env_string("BEAMER_ASPECT_RATIO", DEFAULT_ASPECT_RATIO),
            engine: env_string("BEAMER_ENGINE", DEFAULT_ENGINE),
            engine_passes: env_parsed("BEAMER_ENGINE_PASSES", 1u32).max(1),
            preview_tool: env_string("BEAMER_PREVIEW_TOOL", DEFAULT_PREVIEW_TOOL),
            preview_width: env_parsed("BEAMER_PREVIEW_WIDTH", DEFAULT_PREVIEW_WIDTH),
            image_viewer: env::var("BEAMER_IMAGE_VIEWER")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            html_theme_base: env_string("BEAMER_HTML_THEME_BASE", DEFAULT_HTML_THEME_BASE),
            theme_dir: env::var("BEAMER_THEME_DIR").ok().map(PathBuf::from),
            debounce_ms: env_parsed("BEAMER_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
        }
    }

    /// Document defaults: explicit arguments, then a custom theme, then config
    pub fn get_document_options(
        &self,
        custom_theme: Option<&CustomTheme>,
        theme: Option<String>,
        color_theme: Option<String>,
        aspect_ratio: Option<String>,
    ) -> DocumentOptions {
        DocumentOptions {
            theme: theme
                .or_else(|| custom_theme.map(|t| t.base_theme.clone()))
                .unwrap_or_else(|| self.theme.clone()),
            color_theme: color_theme
                .or_else(|| custom_theme.map(|t| t.color_theme.clone()))
                .unwrap_or_else(|| self.color_theme.clone()),
            aspect_ratio: aspect_ratio
                .or_else(|| custom_theme.map(|t| t.aspect_ratio.clone()))
                .unwrap_or_else(|| self.aspect_ratio.clone()),
            title: None,
            author: None,
            date: None,
        }
    }

    /// Get a compile configuration with defaults from this config
    pub fn get_compile_config(&self, engine: Option<String>, passes: Option<u32>) -> CompileConfig {
        CompileConfig {
            engine: engine.unwrap_or_else(|| self.engine.clone()),
            passes: passes.unwrap_or(self.engine_passes).max(1),
        }
    }

    /// Get a preview configuration with defaults from this config
    pub fn get_preview_config(
        &self,
        output_dir: PathBuf,
        pages: Option<PageRange>,
        width: Option<u32>,
    ) -> PreviewConfig {
        PreviewConfig {
            tool: self.preview_tool.clone(),
            output_dir,
            prefix: "page".to_string(),
            pages: pages.unwrap_or_default(),
            width: width.unwrap_or(self.preview_width),
            viewer: self.image_viewer.clone(),
        }
    }

    /// Get HTML export options with defaults from this config
    pub fn get_html_options(
        &self,
        theme: Option<String>,
        css_files: Vec<ResourceFile>,
        js_files: Vec<ResourceFile>,
        embed_resources: bool,
    ) -> HtmlOptions {
        HtmlOptions {
            theme: theme.unwrap_or_else(|| "default".to_string()),
            theme_base_url: self.html_theme_base.clone(),
            css_files,
            js_files,
            embed_resources,
        }
    }
}
