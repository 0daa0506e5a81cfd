//! Merdit - A terminal mermaid diagram editor with live preview.
//!
//! # Usage
//!
//! ```bash
//! merdit
//! merdit edit diagram.mmd
//! merdit edit --link 'http://localhost:3000/?data=...'
//! merdit render diagram.mmd -o diagram.svg
//! merdit share diagram.mmd
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use merdit::app::App;
use merdit::config::{
    ConfigFlags, DEFAULT_BASE_URL, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use merdit::export::{export_png, export_svg};
use merdit::perf;
use merdit::render::{MermaidEngine, PollResult, RenderOutcome, RenderPipeline};
use merdit::state::{
    AddressBar, DEFAULT_DIAGRAM_CODE, FileStorage, Location, MemoryStorage, Storage,
    StoreDefaults, Theme, decode, default_storage_dir,
};
use merdit::templates::{TemplateLibrary, share_url_for};

/// A terminal mermaid diagram editor with live preview
#[derive(Parser, Debug)]
#[command(name = "merdit", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Theme used when no saved or linked diagram picks one
    #[arg(long, global = true, value_name = "THEME")]
    theme: Option<Theme>,

    /// Directory of extra *.mermaid templates
    #[arg(long, global = true, value_name = "DIR")]
    templates: Option<PathBuf>,

    /// Base URL for shareable links
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Directory holding the saved session
    #[arg(long, global = true, value_name = "DIR")]
    storage_dir: Option<PathBuf>,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Disable the image preview
    #[arg(long, global = true)]
    no_images: bool,

    /// Force image rendering to use half-cell fallback mode
    #[arg(long, global = true)]
    force_half_cell: bool,

    /// Enable startup performance logging
    #[arg(long, global = true)]
    perf: bool,

    /// Write detailed render/image debug events to a file
    #[arg(long, global = true, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edit a diagram interactively (the default)
    Edit {
        /// Source used when nothing is restored from a link or storage
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Open the diagram encoded in this shareable link
        #[arg(long, value_name = "URL")]
        link: Option<String>,
    },
    /// Render a diagram file once and exit
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (defaults to FILE with an .svg or .png extension)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Write a PNG at twice the diagram's natural width
        #[arg(long)]
        png: bool,
    },
    /// Print a shareable link for a diagram file
    Share {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Decode a shareable link and print its source
    Open {
        #[arg(value_name = "URL")]
        url: String,
    },
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn run_render(file: &Path, output: Option<PathBuf>, png: bool, theme: Theme) -> Result<()> {
    let source = read_source(file)?;
    let mut pipeline = RenderPipeline::new(MermaidEngine::new(), theme);
    let artifact = match pipeline.render_current(&source, theme) {
        PollResult::Placeholder => anyhow::bail!("{} is empty", file.display()),
        PollResult::Rendered(RenderOutcome::Failure(message)) => {
            anyhow::bail!("{}: {message}", file.display())
        }
        PollResult::Rendered(RenderOutcome::Success(artifact)) => artifact,
    };

    let extension = if png { "png" } else { "svg" };
    let output = output.unwrap_or_else(|| file.with_extension(extension));
    let written = if png {
        export_png(Some(&artifact), &output)?
    } else {
        export_svg(Some(&artifact), &output)?
    };
    println!("{}", written.display());
    Ok(())
}

fn run_share(file: &Path, theme: Theme, base_url: &str) -> Result<()> {
    let source = read_source(file)?;
    let link = share_url_for(&source, theme, base_url).context("Failed to encode diagram")?;
    println!("{link}");
    Ok(())
}

fn run_open(url: &str) -> Result<()> {
    let location = AddressBar::parse(url)?;
    let payload = location
        .data_param()
        .with_context(|| format!("{url} has no data parameter"))?;
    let doc = decode(&payload, Theme::Default).context("Failed to decode link")?;
    println!("{}", doc.source_text);
    eprintln!("theme: {}", doc.theme);
    Ok(())
}

fn run_editor(
    effective: &ConfigFlags,
    file: Option<&Path>,
    link: Option<&str>,
    global_path: PathBuf,
    local_path: PathBuf,
) -> Result<()> {
    let base_url = effective.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    let location = AddressBar::parse(link.unwrap_or(base_url))?;

    let storage: Box<dyn Storage> = if effective.ephemeral {
        Box::new(MemoryStorage::new())
    } else {
        let dir = effective
            .storage_dir
            .clone()
            .unwrap_or_else(default_storage_dir);
        Box::new(FileStorage::new(dir))
    };

    let source_text = match file {
        Some(path) => read_source(path)?,
        None => DEFAULT_DIAGRAM_CODE.to_string(),
    };
    let defaults = StoreDefaults {
        source_text,
        theme: effective.theme.unwrap_or_default(),
    };

    let templates = effective
        .templates
        .as_deref()
        .map_or_else(TemplateLibrary::builtin, TemplateLibrary::with_dir);

    let app = App::new(location)
        .with_storage(storage)
        .with_defaults(defaults)
        .with_templates(templates)
        .with_force_half_cell(effective.force_half_cell)
        .with_images_enabled(!effective.no_images)
        .with_config_paths(
            Some(global_path),
            if local_path.exists() {
                Some(local_path)
            } else {
                None
            },
        );

    app.run().context("Application error")
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os(perf::DEBUG_LOG_ENV).map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize render debug log {}: {}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    let theme = effective.theme.unwrap_or_default();
    let base_url = effective.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

    match cli.command {
        Some(Command::Render { file, output, png }) => run_render(&file, output, png, theme),
        Some(Command::Share { file }) => run_share(&file, theme, base_url),
        Some(Command::Open { url }) => run_open(&url),
        Some(Command::Edit { file, link }) => run_editor(
            &effective,
            file.as_deref(),
            link.as_deref(),
            global_path,
            local_path,
        ),
        None => run_editor(&effective, None, None, global_path, local_path),
    }
}
