// ABOUTME: External tool module for the beamer-slides application
// ABOUTME: Compiles LaTeX with a typesetting engine and rasterises PDF pages for terminal preview

use crate::errors::{Result, SlidesError};
use crate::utils;
use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::str::FromStr;
use std::time::Instant;

/// Number of engine log lines kept in a compile error
const LOG_TAIL_LINES: usize = 20;

/// Configuration for the typesetting engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    pub engine: String,
    pub passes: u32,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            engine: "pdflatex".to_string(),
            passes: 1,
        }
    }
}

/// 1-based inclusive page range; `last: None` runs to the end of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u32,
    pub last: Option<u32>,
}

impl Default for PageRange {
    fn default() -> Self {
        Self {
            first: 1,
            last: None,
        }
    }
}

impl FromStr for PageRange {
    type Err = SlidesError;

    /// Accepts `N`, `N-M` and `N-`.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |value: &str| -> Result<u32> {
            value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|page| *page > 0)
                .ok_or_else(|| SlidesError::ValidationError(format!("Invalid page number: {:?}", value)))
        };

        let range = match s.split_once('-') {
            None => {
                let page = parse(s)?;
                Self {
                    first: page,
                    last: Some(page),
                }
            }
            Some((first, "")) => Self {
                first: parse(first)?,
                last: None,
            },
            Some((first, last)) => Self {
                first: parse(first)?,
                last: Some(parse(last)?),
            },
        };

        if let Some(last) = range.last {
            if last < range.first {
                return Err(SlidesError::ValidationError(format!(
                    "Page range {} ends before it starts",
                    s
                )));
            }
        }
        Ok(range)
    }
}

/// Configuration for page rasterisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub tool: String,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub pages: PageRange,
    pub width: u32,
    /// Command used to show each image in the terminal, e.g. `chafa`
    pub viewer: Option<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            tool: "pdftoppm".to_string(),
            output_dir: PathBuf::from("."),
            prefix: "page".to_string(),
            pages: PageRange::default(),
            width: 1280,
            viewer: None,
        }
    }
}

fn tail(output: &Output, lines: usize) -> String {
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let all: Vec<&str> = combined.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Compile a `.tex` file and return the path of the produced PDF.
///
/// The engine runs in the source directory. Success is a zero exit status
/// on every pass.
pub fn compile_document(tex_path: &Path, config: &CompileConfig) -> Result<PathBuf> {
    info!("Compiling {:?} with {}", tex_path, config.engine);
    utils::validate_file_exists(tex_path)?;

    let working_dir = match tex_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = tex_path
        .file_name()
        .ok_or_else(|| SlidesError::ValidationError(format!("Not a file path: {:?}", tex_path)))?;

    let start_time = Instant::now();
    for pass in 1..=config.passes {
        debug!("Engine pass {} of {}", pass, config.passes);
        let output = Command::new(&config.engine)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(file_name)
            .current_dir(&working_dir)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SlidesError::EngineNotFound(config.engine.clone()),
                _ => SlidesError::FileReadError(e),
            })?;

        if !output.status.success() {
            return Err(SlidesError::CompileError {
                path: tex_path.to_path_buf(),
                log: tail(&output, LOG_TAIL_LINES),
            });
        }
    }

    let pdf_path = tex_path.with_extension("pdf");
    info!(
        "Compiled {:?} in {:.2} seconds",
        pdf_path,
        start_time.elapsed().as_secs_f64()
    );
    Ok(pdf_path)
}

/// Page number encoded in a rasteriser output name: `page-7.png`,
/// `page-007.png`, or `page.png` for single-file output.
fn page_number(path: &Path, prefix: &str) -> Option<u32> {
    let stem = path.file_stem()?.to_string_lossy();
    let rest = stem.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(1);
    }
    rest.strip_prefix('-')?.parse::<u32>().ok()
}

/// Find page images written with `prefix` in `dir`, ordered by page.
pub fn find_page_images(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}*.png",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(prefix)
    );

    let mut pages: Vec<(u32, PathBuf)> = glob::glob(&pattern)
        .map_err(|e| SlidesError::PreviewError(format!("Invalid glob pattern: {}", e)))?
        .flatten()
        .filter_map(|path| page_number(&path, prefix).map(|page| (page, path)))
        .collect();
    pages.sort();

    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// The image for the first page. The rasteriser pads page numbers to the
/// width of the page count, so several names are possible.
pub fn first_page_image(dir: &Path, prefix: &str) -> Option<PathBuf> {
    ["-1", "-01", "-001", "-0001", ""]
        .iter()
        .map(|suffix| dir.join(format!("{}{}.png", prefix, suffix)))
        .find(|candidate| candidate.exists())
}

/// Rasterise PDF pages to PNG images.
pub fn render_pages(pdf_path: &Path, config: &PreviewConfig) -> Result<Vec<PathBuf>> {
    info!("Rendering pages of {:?}", pdf_path);
    utils::validate_file_exists(pdf_path)?;
    utils::validate_directory_writable(&config.output_dir)?;

    for stale in find_page_images(&config.output_dir, &config.prefix)? {
        debug!("Removing stale page image {:?}", stale);
        if let Err(e) = fs::remove_file(&stale) {
            warn!("Failed to remove stale image {:?}: {}", stale, e);
        }
    }

    let mut command = Command::new(&config.tool);
    command
        .arg("-png")
        .arg("-f")
        .arg(config.pages.first.to_string());
    if let Some(last) = config.pages.last {
        command.arg("-l").arg(last.to_string());
    }
    command
        .arg("-scale-to-x")
        .arg(config.width.to_string())
        .arg("-scale-to-y")
        .arg("-1")
        .arg(pdf_path)
        .arg(config.output_dir.join(&config.prefix));

    let output = command.output().map_err(|e| match e.kind() {
        ErrorKind::NotFound => SlidesError::PreviewToolNotFound(config.tool.clone()),
        _ => SlidesError::FileReadError(e),
    })?;
    if !output.status.success() {
        return Err(SlidesError::PreviewError(tail(&output, LOG_TAIL_LINES)));
    }

    let images = find_page_images(&config.output_dir, &config.prefix)?;
    if images.is_empty() {
        return Err(SlidesError::NoPagesFoundError(format!(
            "{}/{}*.png",
            config.output_dir.display(),
            config.prefix
        )));
    }
    if first_page_image(&config.output_dir, &config.prefix).is_none() {
        debug!("First page image uses an unexpected name");
    }
    info!("Rendered {} page image(s)", images.len());

    if let Some(viewer) = &config.viewer {
        for image in &images {
            display_image(viewer, image)?;
        }
    }

    Ok(images)
}

/// Show an image with a terminal viewer command such as `chafa` or `kitty +kitten icat`.
pub fn display_image(viewer: &str, image: &Path) -> Result<()> {
    let mut parts = viewer.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| SlidesError::ConfigError("Image viewer command is empty".to_string()))?;

    let status = Command::new(program)
        .args(parts)
        .arg(image)
        .status()
        .map_err(|e| SlidesError::PreviewError(format!("Failed to run {}: {}", program, e)))?;
    if !status.success() {
        warn!("Image viewer exited with {} for {:?}", status, image);
    }
    Ok(())
}
