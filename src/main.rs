// ABOUTME: Main entry point for the beamer-slides program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use anyhow::{anyhow, Context};
use beamer_slides::lint::{self, LintSummary};
use beamer_slides::render::{self, PageRange};
use beamer_slides::{
    document, html, utils, watch, Config, CustomTheme, DocumentOptions, ResourceFile,
    SlidesError, ThemeStore, WatchConfig,
};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert Markdown to Beamer LaTeX
    Convert(ConvertArgs),

    /// Build a PDF from Markdown or LaTeX (convert, lint, compile)
    Build(BuildArgs),

    /// Export Beamer LaTeX as a single HTML page
    Html(HtmlArgs),

    /// Check Beamer LaTeX for structural problems
    Lint(LintArgs),

    /// Render PDF pages to images
    Preview(PreviewArgs),

    /// Rebuild outputs whenever the source changes
    Watch(WatchArgs),

    /// Manage custom themes
    #[command(subcommand)]
    Theme(ThemeCommands),
}

#[derive(Args, Debug)]
struct ThemeArgs {
    /// Beamer theme (frontmatter takes precedence)
    #[arg(long)]
    theme: Option<String>,

    /// Beamer color theme (frontmatter takes precedence)
    #[arg(long)]
    color_theme: Option<String>,

    /// Aspect ratio, e.g. 169 or 43 (frontmatter takes precedence)
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Name of a saved custom theme to use as defaults
    #[arg(long)]
    custom_theme: Option<String>,

    /// Title used when the frontmatter has none
    #[arg(long)]
    title: Option<String>,

    /// Author used when the frontmatter has none
    #[arg(long)]
    author: Option<String>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Path to the Markdown file
    input: PathBuf,

    /// Path to the output .tex file (defaults to the input with a .tex extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    theme: ThemeArgs,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Typesetting engine, e.g. pdflatex, xelatex, lualatex
    #[arg(long)]
    engine: Option<String>,

    /// Number of engine passes
    #[arg(long)]
    passes: Option<u32>,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Path to the Markdown or LaTeX file
    input: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    theme: ThemeArgs,
}

#[derive(Args, Debug)]
struct ResourceArgs {
    /// HTML theme name for the linked <theme>.css and <theme>.js
    #[arg(long)]
    html_theme: Option<String>,

    /// CSS files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    css: Option<Vec<String>>,

    /// JavaScript files to include (local paths or URLs)
    #[arg(long, value_delimiter = ',')]
    js: Option<Vec<String>>,

    /// Mode for CSS/JS: 'embed' to embed content or 'link' to reference
    #[arg(long, default_value = "embed")]
    mode: String,
}

#[derive(Args, Debug)]
struct HtmlArgs {
    /// Path to the LaTeX file
    input: PathBuf,

    /// Path to output HTML file (defaults to the input with a .html extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    resources: ResourceArgs,
}

#[derive(Args, Debug)]
struct LintArgs {
    /// Path to the LaTeX file
    input: PathBuf,

    /// Attempt automatic fixes before checking
    #[arg(long)]
    fix: bool,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Path to a LaTeX file (compiled first) or a PDF
    input: PathBuf,

    /// Pages to render: N, N-M or N-
    #[arg(long)]
    pages: Option<String>,

    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Directory for the page images (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Path to the Markdown or LaTeX file
    input: PathBuf,

    /// Also write an HTML export to this path
    #[arg(long)]
    html: Option<PathBuf>,

    /// Skip PDF compilation
    #[arg(long)]
    no_compile: bool,

    /// Serve the HTML export over HTTP
    #[arg(long)]
    serve: bool,

    /// Port for the local web server
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Debounce time in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    theme: ThemeArgs,

    #[command(flatten)]
    resources: ResourceArgs,
}

#[derive(Subcommand, Debug)]
enum ThemeCommands {
    /// List saved themes
    List,

    /// Show one saved theme
    Show { name: String },

    /// Save a theme, replacing one with the same name
    Add {
        name: String,

        /// Beamer theme
        #[arg(long)]
        base: String,

        /// Beamer color theme
        #[arg(long, default_value = "default")]
        color: String,

        /// Aspect ratio
        #[arg(long, default_value = "169")]
        aspect_ratio: String,
    },

    /// Delete a saved theme
    Remove { name: String },
}

fn init_logger(level: &str) {
    let log_level = LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", level);
        LevelFilter::Warn
    });

    // RUST_LOG, when set, refines the command-line level
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_env(env_logger::Env::default())
        .init();
}

fn theme_store(config: &Config) -> beamer_slides::Result<ThemeStore> {
    ThemeStore::open(config.theme_dir.as_deref())
}

fn document_options(config: &Config, args: &ThemeArgs) -> anyhow::Result<DocumentOptions> {
    let custom = match &args.custom_theme {
        Some(name) => Some(
            theme_store(config)?
                .get(name)?
                .ok_or_else(|| anyhow!("Unknown custom theme: {}", name))?,
        ),
        None => None,
    };

    let mut options = config.get_document_options(
        custom.as_ref(),
        args.theme.clone(),
        args.color_theme.clone(),
        args.aspect_ratio.clone(),
    );
    options.title = args.title.clone();
    options.author = args.author.clone();
    Ok(options)
}

fn html_options(config: &Config, args: &ResourceArgs) -> anyhow::Result<html::HtmlOptions> {
    let embed = match args.mode.as_str() {
        "embed" => true,
        "link" => false,
        other => {
            return Err(SlidesError::ValidationError(format!(
                "Invalid mode {:?}: use 'embed' or 'link'",
                other
            ))
            .into())
        }
    };

    let to_resources = |files: &Option<Vec<String>>| -> Vec<ResourceFile> {
        files
            .as_ref()
            .map(|files| files.iter().map(|path| ResourceFile::new(path)).collect())
            .unwrap_or_default()
    };

    Ok(config.get_html_options(
        args.html_theme.clone(),
        to_resources(&args.css),
        to_resources(&args.js),
        embed,
    ))
}

/// Convert Markdown to a `.tex` file and return its path
fn convert_to_file(input: &Path, output: &Path, options: &DocumentOptions) -> anyhow::Result<()> {
    utils::validate_file_exists(input)?;
    let source = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let latex = document::markdown_to_latex(&source, options);
    utils::ensure_parent_directory_exists(output)?;
    fs::write(output, latex).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}

/// Lint a file, print the report, and fail when errors were found
fn lint_and_report(path: &Path) -> anyhow::Result<LintSummary> {
    let issues = lint::lint_file(path)?;
    let summary = LintSummary::from_issues(&issues);
    print!("{}", lint::format_report(&path.to_string_lossy(), &issues));
    if summary.has_errors() {
        return Err(SlidesError::LintFailed(summary.errors).into());
    }
    Ok(summary)
}

/// Print the full lint report, but only fail on errors that stop a build
fn check_before_build(path: &Path) -> anyhow::Result<()> {
    utils::validate_file_exists(path)?;
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let issues = lint::lint_source(&source);
    print!("{}", lint::format_report(&path.to_string_lossy(), &issues));

    let blockers = lint::build_blockers(&source);
    if !blockers.is_empty() {
        return Err(SlidesError::LintFailed(blockers.len()).into());
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env();
    debug!("Configuration: {:?}", config);

    match cli.command {
        Some(Commands::Convert(args)) => {
            let options = document_options(&config, &args.theme)?;
            let output = args
                .output
                .unwrap_or_else(|| args.input.with_extension("tex"));
            convert_to_file(&args.input, &output, &options)?;
            println!("LaTeX generated successfully: {:?}", output);
        }
        Some(Commands::Build(args)) => {
            let tex_path = if utils::has_extension(&args.input, "md") {
                let options = document_options(&config, &args.theme)?;
                let tex_path = args.input.with_extension("tex");
                convert_to_file(&args.input, &tex_path, &options)?;
                tex_path
            } else {
                args.input
            };

            check_before_build(&tex_path)?;
            let compile = config.get_compile_config(args.engine.engine, args.engine.passes);
            let pdf_path = render::compile_document(&tex_path, &compile)?;
            println!("PDF built successfully: {:?}", pdf_path);
        }
        Some(Commands::Html(args)) => {
            let options = html_options(&config, &args.resources)?;
            let output = args
                .output
                .unwrap_or_else(|| args.input.with_extension("html"));
            let page = html::generate_html(&args.input, &options)?;
            html::write_html_to_file(&page, &output)?;
            println!("HTML generated successfully: {:?}", output);
        }
        Some(Commands::Lint(args)) => {
            utils::validate_file_exists(&args.input)?;
            if args.fix {
                let source = fs::read_to_string(&args.input)?;
                let fixed = lint::fix_source(&source);
                if fixed != source {
                    fs::write(&args.input, fixed)?;
                }
            }
            lint_and_report(&args.input)?;
        }
        Some(Commands::Preview(args)) => {
            let pdf_path = if utils::has_extension(&args.input, "pdf") {
                args.input.clone()
            } else {
                let compile = config.get_compile_config(args.engine.engine, args.engine.passes);
                render::compile_document(&args.input, &compile)?
            };

            let pages = args.pages.as_deref().map(PageRange::from_str).transpose()?;
            let output_dir = args.output_dir.unwrap_or_else(|| match pdf_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            });
            let preview = config.get_preview_config(output_dir, pages, args.width);
            let images = render::render_pages(&pdf_path, &preview)?;
            for image in images {
                println!("{}", image.display());
            }
        }
        Some(Commands::Watch(args)) => {
            let compile = if args.no_compile {
                None
            } else {
                Some(config.get_compile_config(args.engine.engine, args.engine.passes))
            };
            let watch_config = WatchConfig {
                document_options: document_options(&config, &args.theme)?,
                html_options: html_options(&config, &args.resources)?,
                source_path: args.input,
                compile,
                html_output: args.html,
                debounce_ms: args.debounce_ms.unwrap_or(config.debounce_ms),
                serve: args.serve,
                port: args.port,
            };
            watch::watch_source(watch_config)?;
        }
        Some(Commands::Theme(command)) => run_theme_command(&config, command)?,
        None => {
            println!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

fn run_theme_command(config: &Config, command: ThemeCommands) -> anyhow::Result<()> {
    let store = theme_store(config)?;
    match command {
        ThemeCommands::List => {
            let themes = store.load_all()?;
            if themes.is_empty() {
                println!("No custom themes in {:?}", store.dir());
            }
            for theme in themes {
                println!(
                    "{}: {} / {} / {}",
                    theme.name, theme.base_theme, theme.color_theme, theme.aspect_ratio
                );
            }
        }
        ThemeCommands::Show { name } => {
            let theme = store
                .get(&name)?
                .ok_or_else(|| anyhow!("Unknown custom theme: {}", name))?;
            print!("{}", toml::to_string(&theme)?);
        }
        ThemeCommands::Add {
            name,
            base,
            color,
            aspect_ratio,
        } => {
            let path = store.save(&CustomTheme {
                name,
                base_theme: base,
                color_theme: color,
                aspect_ratio,
            })?;
            println!("Theme saved: {:?}", path);
        }
        ThemeCommands::Remove { name } => {
            if store.remove(&name)? {
                println!("Theme removed: {}", name);
            } else {
                return Err(anyhow!("Unknown custom theme: {}", name));
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logger(&cli.log_level);
    info!("Starting beamer-slides");

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
