use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use pathchakro_render::{HtmlRenderer, RawContent, RenderConfig};

#[derive(Parser)]
#[command(version, about = "Pathchakro - render stored rich-text documents to safe HTML", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Render policy file (KDL)
    #[arg(long, global = true, env = "PATHCHAKRO_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a stored document (JSON, double-encoded JSON, or plain text) to HTML
    Render {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail instead of printing nothing when the document cannot be rendered
        #[arg(long)]
        strict: bool,
    },
    /// Run only the sanitizer over an HTML fragment
    Sanitize {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let renderer = HtmlRenderer::new(config);

    match cli.command {
        Commands::Render {
            input,
            output,
            strict,
        } => {
            let stored = read_input(&input)?;
            let html = if strict {
                renderer.try_render(stored_content(&stored))?
            } else {
                renderer.render(stored_content(&stored))
            };
            write_output(output.as_deref(), &html)?;
        }
        Commands::Sanitize { input, output } => {
            let html = read_input(&input)?;
            write_output(output.as_deref(), &renderer.sanitizer().clean(&html))?;
        }
    }

    Ok(())
}

/// A trailing newline from an editor or `echo` is not part of the document.
fn stored_content(stored: &str) -> RawContent<'_> {
    RawContent::Str(stored.strip_suffix('\n').unwrap_or(stored))
}

fn load_config(explicit: Option<&Path>) -> Result<RenderConfig> {
    if let Some(path) = explicit {
        return RenderConfig::load(path)
            .wrap_err_with(|| format!("loading render config {}", path.display()));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!(path = %path.display(), "using default render config");
            RenderConfig::load(&path)
                .wrap_err_with(|| format!("loading render config {}", path.display()))
        }
        _ => Ok(RenderConfig::default()),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pathchakro").join("render.kdl"))
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .into_diagnostic()
            .wrap_err("reading stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {}", input.display()))
    }
}

fn write_output(output: Option<&Path>, html: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, html)
            .into_diagnostic()
            .wrap_err_with(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(html.as_bytes()).into_diagnostic()?;
            if !html.is_empty() {
                stdout.write_all(b"\n").into_diagnostic()?;
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn init_miette() {
    let installed = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    if installed.is_err() {
        eprintln!("miette report hook was already installed");
    }
    miette::set_panic_hook();
}
