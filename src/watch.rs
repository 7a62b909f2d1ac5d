// ABOUTME: Watch module for monitoring source changes and rebuilding outputs
// ABOUTME: Coalesces rebuild requests, regenerates LaTeX, PDF and HTML, and can serve the HTML export

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use notify_debouncer_full::new_debouncer;
use tiny_http::{Header, Response, Server, StatusCode};

use crate::document::{markdown_to_latex, DocumentOptions};
use crate::errors::{Result, SlidesError};
use crate::html::{self, HtmlOptions};
use crate::lint::{self, LintSummary};
use crate::render::{self, CompileConfig};
use crate::utils;

/// Extensions whose changes trigger a rebuild
const WATCHED_EXTENSIONS: &[&str] = &["md", "tex", "sty", "bib"];

/// Configuration for watch mode
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Markdown or LaTeX source to watch
    pub source_path: PathBuf,

    /// Defaults used when converting Markdown sources
    pub document_options: DocumentOptions,

    /// Engine settings; `None` skips PDF compilation
    pub compile: Option<CompileConfig>,

    /// Where to write the HTML export, if wanted
    pub html_output: Option<PathBuf>,

    pub html_options: HtmlOptions,

    /// Debounce time in milliseconds
    pub debounce_ms: u64,

    /// Whether to serve the HTML export over HTTP
    pub serve: bool,

    /// Port for the local web server
    pub port: u16,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::new(),
            document_options: DocumentOptions::default(),
            compile: Some(CompileConfig::default()),
            html_output: None,
            html_options: HtmlOptions::default(),
            debounce_ms: 500,
            serve: false,
            port: 8080,
        }
    }
}

impl WatchConfig {
    fn is_markdown(&self) -> bool {
        utils::has_extension(&self.source_path, "md")
    }

    /// The `.tex` file that gets compiled: the source itself, or the file
    /// generated next to a Markdown source.
    pub fn latex_path(&self) -> PathBuf {
        if self.is_markdown() {
            self.source_path.with_extension("tex")
        } else {
            self.source_path.clone()
        }
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    running: bool,
    pending: bool,
}

/// Serialises rebuilds. While one runs, any number of further requests
/// collapse into a single pending rebuild.
#[derive(Debug, Default)]
pub struct RebuildScheduler {
    state: Mutex<SchedulerState>,
}

impl RebuildScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a rebuild. Returns `true` when the caller should start one
    /// now; `false` means one is running and the request was queued.
    pub fn request(&self) -> bool {
        let mut state = self.state.lock();
        if state.running {
            state.pending = true;
            false
        } else {
            state.running = true;
            true
        }
    }

    /// Mark the current rebuild finished. Returns `true` when a queued
    /// request means the caller should rebuild again right away.
    pub fn finish(&self) -> bool {
        let mut state = self.state.lock();
        if state.pending {
            state.pending = false;
            true
        } else {
            state.running = false;
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().pending
    }
}

/// What a single rebuild produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub latex_path: PathBuf,
    pub lint: LintSummary,
    pub pdf_path: Option<PathBuf>,
    pub html_path: Option<PathBuf>,
}

/// Regenerate every output from the current state of the source.
///
/// Errors from [`lint::build_blockers`] skip compilation but the HTML export
/// is still written.
pub fn rebuild(config: &WatchConfig) -> Result<RebuildOutcome> {
    info!("Rebuilding from {:?}", config.source_path);
    let source = fs::read_to_string(&config.source_path)?;
    let latex_path = config.latex_path();

    let latex = if config.is_markdown() {
        let latex = markdown_to_latex(&source, &config.document_options);
        utils::ensure_parent_directory_exists(&latex_path)?;
        fs::write(&latex_path, &latex).map_err(|source| SlidesError::FileWriteError {
            path: latex_path.clone(),
            source,
        })?;
        debug!("Wrote {:?}", latex_path);
        latex
    } else {
        source
    };

    let issues = lint::lint_source(&latex);
    let summary = LintSummary::from_issues(&issues);
    if !issues.is_empty() {
        warn!(
            "{}",
            lint::format_report(&latex_path.to_string_lossy(), &issues).trim_end()
        );
    }

    let blockers = lint::build_blockers(&latex);
    let pdf_path = match &config.compile {
        Some(_) if !blockers.is_empty() => {
            warn!("Skipping compilation: {} blocking error(s)", blockers.len());
            None
        }
        Some(compile) => Some(render::compile_document(&latex_path, compile)?),
        None => None,
    };

    let html_path = match &config.html_output {
        Some(output) => {
            let page = html::latex_source_to_html(&latex, &config.html_options);
            html::write_html_to_file(&page, output)?;
            Some(output.clone())
        }
        None => None,
    };

    Ok(RebuildOutcome {
        latex_path,
        lint: summary,
        pdf_path,
        html_path,
    })
}

/// Run rebuilds on a worker thread until no request is pending.
fn spawn_rebuild(scheduler: Arc<RebuildScheduler>, config: Arc<WatchConfig>) {
    thread::spawn(move || loop {
        match rebuild(&config) {
            Ok(outcome) => info!("Rebuild finished: {}", outcome.lint),
            Err(e) => error!("Rebuild failed: {}", e),
        }
        if !scheduler.finish() {
            break;
        }
        debug!("Changes arrived during the rebuild, running again");
    });
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Map a request URL onto a file below `root`, refusing parent components.
fn resolve_request_path(root: &Path, index_file: &str, url: &str) -> Option<PathBuf> {
    let url_path = url.split(['?', '#']).next().unwrap_or("/");
    let relative = url_path.trim_start_matches('/');
    if relative.is_empty() {
        return Some(root.join(index_file));
    }

    let relative = Path::new(relative);
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

/// Serve the directory holding the HTML export on a background thread
fn start_server(html_path: &Path, port: u16) -> Result<()> {
    let server = Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| SlidesError::WatchError(format!("Failed to start HTTP server: {}", e)))?;

    let root = match html_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let index_file = html_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    thread::spawn(move || {
        info!("HTTP server listening on http://localhost:{}", port);
        println!("Serving slides at http://localhost:{}", port);

        for request in server.incoming_requests() {
            let file_path = resolve_request_path(&root, &index_file, request.url());
            debug!("Request for {} -> {:?}", request.url(), file_path);

            let response = match file_path.filter(|path| path.is_file()) {
                Some(path) => match fs::read(&path) {
                    Ok(content) => {
                        let response = Response::from_data(content);
                        match Header::from_bytes("Content-Type", content_type(&path)) {
                            Ok(header) => response.with_header(header),
                            Err(_) => response,
                        }
                    }
                    Err(e) => {
                        error!("Failed to read file {:?}: {}", path, e);
                        Response::from_data(format!("Failed to read file: {}", e).into_bytes())
                            .with_status_code(StatusCode(500))
                    }
                },
                None => Response::from_data(b"404 Not Found".to_vec()).with_status_code(StatusCode(404)),
            };

            if let Err(e) = request.respond(response) {
                error!("Failed to send response: {}", e);
            }
        }
    });

    Ok(())
}

/// Whether a changed path should trigger a rebuild
fn is_relevant_path(path: &Path, config: &WatchConfig, generated: &[PathBuf]) -> bool {
    let path_abs = utils::get_absolute_path(path).unwrap_or_else(|_| path.to_path_buf());
    let source_abs = utils::get_absolute_path(&config.source_path)
        .unwrap_or_else(|_| config.source_path.clone());

    if path_abs == source_abs || path == config.source_path {
        return true;
    }
    if generated.iter().any(|output| *output == path_abs || output == path) {
        return false;
    }

    WATCHED_EXTENSIONS
        .iter()
        .any(|extension| utils::has_extension(path, extension))
}

/// Watch a Markdown or LaTeX source and rebuild outputs when it changes
pub fn watch_source(config: WatchConfig) -> Result<()> {
    utils::validate_file_exists(&config.source_path)?;
    if let Some(html_output) = &config.html_output {
        utils::ensure_parent_directory_exists(html_output)?;
    }

    let scheduler = Arc::new(RebuildScheduler::new());
    let config = Arc::new(config);

    if scheduler.request() {
        match rebuild(&config) {
            Ok(outcome) => info!("Initial build finished: {}", outcome.lint),
            Err(e) => error!("Initial build failed: {}", e),
        }
        scheduler.finish();
    }

    if config.serve {
        match &config.html_output {
            Some(html_output) => start_server(html_output, config.port)?,
            None => warn!("--serve needs an HTML output; not starting the server"),
        }
    }

    // Outputs written by a rebuild must not trigger another one.
    let mut generated = Vec::new();
    if config.is_markdown() {
        generated.push(config.latex_path());
    }
    if let Some(html_output) = &config.html_output {
        generated.push(html_output.clone());
    }
    let generated: Vec<PathBuf> = generated
        .into_iter()
        .map(|path| utils::get_absolute_path(&path).unwrap_or(path))
        .collect();

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms), None, tx)
        .map_err(|e| SlidesError::WatchError(format!("Failed to create file watcher: {}", e)))?;

    let watch_path = match config.source_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let abs_watch_path = utils::get_absolute_path(&watch_path)?;
    debouncer
        .watcher()
        .watch(&abs_watch_path, RecursiveMode::NonRecursive)
        .map_err(|e| {
            SlidesError::WatchError(format!("Failed to watch {:?}: {}", abs_watch_path, e))
        })?;

    info!("Watching for changes in {:?}", abs_watch_path);
    println!(
        "Watching {:?} for changes (Press Ctrl+C to stop)",
        config.source_path
    );

    for result in rx {
        match result {
            Ok(events) => {
                let relevant = events.iter().any(|event| {
                    event
                        .paths
                        .iter()
                        .any(|path| is_relevant_path(path, &config, &generated))
                });
                if !relevant {
                    continue;
                }

                if scheduler.request() {
                    spawn_rebuild(Arc::clone(&scheduler), Arc::clone(&config));
                } else {
                    debug!("Rebuild in progress, change queued");
                }
            }
            Err(errors) => error!("Watch error: {:?}", errors),
        }
    }

    Ok(())
}
