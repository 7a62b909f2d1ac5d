// ABOUTME: Resource handling for the beamer-slides HTML export
// ABOUTME: Loads extra local or remote stylesheets and scripts and turns them into HTML tags

use crate::errors::{Result, SlidesError};
use log::info;
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Kind of resource referenced from the exported page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Stylesheet,
    Script,
}

/// Represents a resource file that can be either local or remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    pub path: String,
    pub is_remote: bool,
}

impl ResourceFile {
    /// Create a new ResourceFile from a local file path or a URL.
    pub fn new(path: &str) -> Self {
        let is_remote = path.starts_with("http://") || path.starts_with("https://");
        Self {
            path: path.to_string(),
            is_remote,
        }
    }

    /// Get the content of the resource, fetching it if remote.
    pub fn content(&self) -> Result<String> {
        if self.is_remote {
            self.fetch_remote_content()
        } else {
            self.read_local_content()
        }
    }

    /// Fetch content from a remote URL, retrying with exponential backoff
    fn fetch_remote_content(&self) -> Result<String> {
        info!("Fetching remote resource: {}", self.path);

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let mut retry_delay = 500;
        let mut last_error = None;

        for attempt in 1..=3 {
            match client.get(&self.path).send() {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.text()?);
                }
                Ok(response) => {
                    last_error = Some(SlidesError::InvalidResourcePath(format!(
                        "{} returned HTTP {}",
                        self.path,
                        response.status()
                    )));
                }
                Err(e) => last_error = Some(SlidesError::FetchError(e)),
            }

            if attempt < 3 {
                info!(
                    "Fetch attempt {} failed, retrying in {} ms",
                    attempt, retry_delay
                );
                std::thread::sleep(Duration::from_millis(retry_delay));
                retry_delay *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SlidesError::InvalidResourcePath(format!("Could not fetch {}", self.path))
        }))
    }

    fn read_local_content(&self) -> Result<String> {
        info!("Reading local resource: {}", self.path);
        let path = Path::new(&self.path);
        if !path.exists() {
            return Err(SlidesError::PathNotFoundError(path.to_path_buf()));
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Build the HTML tag for this resource.
    ///
    /// With `embed` the content is inlined (remote resources are fetched
    /// first); otherwise the resource is referenced by its path or URL.
    pub fn tag(&self, kind: ResourceKind, embed: bool) -> Result<String> {
        if !embed {
            return Ok(match kind {
                ResourceKind::Stylesheet => {
                    format!(r#"<link rel="stylesheet" href="{}">"#, self.path)
                }
                ResourceKind::Script => format!(r#"<script src="{}"></script>"#, self.path),
            });
        }

        let content = self.content()?;
        Ok(match kind {
            ResourceKind::Stylesheet => format!("<style>{}</style>", content),
            ResourceKind::Script => format!("<script>{}</script>", content),
        })
    }
}
