// ABOUTME: Custom theme store for the beamer-slides application
// ABOUTME: Persists named theme presets as one TOML file each under the user's config directory

use crate::errors::{Result, SlidesError};
use crate::utils;
use directories::ProjectDirs;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named preset of base theme, color theme and aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTheme {
    pub name: String,
    pub base_theme: String,
    pub color_theme: String,
    pub aspect_ratio: String,
}

impl CustomTheme {
    fn is_complete(&self) -> bool {
        [
            &self.name,
            &self.base_theme,
            &self.color_theme,
            &self.aspect_ratio,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Directory of `<name>.toml` theme files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeStore {
    dir: PathBuf,
}

impl ThemeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the platform config directory, e.g. `~/.config/beamer-slides/themes`.
    pub fn default_location() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "beamer-slides").ok_or_else(|| {
            SlidesError::ThemeError("Could not determine a configuration directory".to_string())
        })?;
        Ok(Self::new(dirs.config_dir().join("themes")))
    }

    /// Use `dir` when given, otherwise the platform location.
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Ok(Self::new(dir)),
            None => Self::default_location(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.toml", name))
    }

    /// Load every valid theme, sorted by name.
    ///
    /// Files that cannot be read or parsed, and records with an empty field,
    /// are skipped.
    pub fn load_all(&self) -> Result<Vec<CustomTheme>> {
        if !self.dir.exists() {
            debug!("Theme directory {:?} does not exist", self.dir);
            return Ok(Vec::new());
        }

        let mut themes = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !utils::has_extension(&path, "toml") {
                continue;
            }
            match load_theme_file(&path) {
                Ok(theme) if theme.is_complete() => themes.push(theme),
                Ok(_) => warn!("Skipping theme file with empty fields: {:?}", path),
                Err(e) => warn!("Skipping theme file {:?}: {}", path, e),
            }
        }

        themes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(themes)
    }

    pub fn get(&self, name: &str) -> Result<Option<CustomTheme>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|theme| theme.name == name))
    }

    /// Write a theme, replacing any theme with the same name.
    pub fn save(&self, theme: &CustomTheme) -> Result<PathBuf> {
        validate_name(&theme.name)?;
        if !theme.is_complete() {
            return Err(SlidesError::ThemeError(format!(
                "Theme {} has empty fields",
                theme.name
            )));
        }

        utils::ensure_directory_exists(&self.dir)?;
        let path = self.path_for(&theme.name);
        fs::write(&path, toml::to_string(theme)?)?;
        info!("Saved theme {} to {:?}", theme.name, path);
        Ok(path)
    }

    /// Delete a theme. Returns whether a file was removed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        info!("Removed theme {}", name);
        Ok(true)
    }
}

fn load_theme_file(path: &Path) -> Result<CustomTheme> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Theme names become file names, so only a safe character set is allowed.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SlidesError::ValidationError(format!(
            "Invalid theme name {:?}: use letters, digits, '-' or '_'",
            name
        )))
    }
}
