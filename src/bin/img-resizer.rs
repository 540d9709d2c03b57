use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use img_resizer::{default_output_path, PhotoFormat, Pipeline, PipelineConfig, Size};

#[derive(Parser)]
#[command(
    name = "img-resizer",
    about = "Fit an image into a preview box, optionally stamp a trial watermark, and re-encode it",
    version,
    after_help = "Simple usage: img-resizer <image>  (writes {name}_resized.jpg next to the input)\n\n\
                  Settings not given on the command line are read from --config (YAML)."
)]
struct Cli {
    /// Input image file
    input: PathBuf,

    /// Output file for the re-encoded image (default: {name}_resized.{ext})
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the framed preview (JPEG, quality 100) to this file
    #[arg(short, long)]
    preview: Option<PathBuf>,

    /// Preview box width in pixels
    #[arg(long, default_value = "640")]
    width: u32,

    /// Preview box height in pixels
    #[arg(long, default_value = "480")]
    height: u32,

    /// YAML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stamp the trial watermark on the preview
    #[arg(long)]
    trial: bool,

    /// Output quality (0-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Output format (bmp, gif, ico, jpeg, png, tiff)
    #[arg(short, long)]
    format: Option<PhotoFormat>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Some(q) = cli.quality {
        if q > 100 {
            eprintln!("Error: Quality must be between 0 and 100");
            process::exit(1);
        }
    }

    let mut config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: Failed to read settings {}: {e}", path.display());
                process::exit(1);
            }
        },
        None => PipelineConfig::default(),
    };
    if cli.trial {
        config.trial_mode = true;
    }
    if let Some(q) = cli.quality {
        config.output_quality = q;
    }
    if let Some(f) = cli.format {
        config.output_format = f;
    }

    let pipeline = match Pipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Fatal: Failed to initialize pipeline: {e}");
            process::exit(1);
        }
    };

    let source = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(path = %cli.input.display(), error = %e, "read failed");
            eprintln!("Error: {}", img_resizer::error::LOAD_FAILURE_MESSAGE);
            process::exit(1);
        }
    };

    let preview = match pipeline.build_preview(&source, Size::new(cli.width, cli.height)) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "preview failed");
            eprintln!("Error: {}", e.user_message());
            process::exit(1);
        }
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, preview.output_format));
    write_or_exit(&output, &preview.output_bytes);
    if let Some(path) = &cli.preview {
        write_or_exit(path, &preview.preview_bytes);
    }

    if !cli.quiet {
        eprintln!("{}", preview.status_line(source.len()));
        eprintln!("[OK] {}", output.display());
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_or_exit(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: Failed to create output directory: {e}");
                process::exit(1);
            }
        }
    }
    if let Err(e) = std::fs::write(path, bytes) {
        eprintln!("[FAIL] {}: {e}", path.display());
        process::exit(1);
    }
}
