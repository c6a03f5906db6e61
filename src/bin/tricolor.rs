use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tricolor_overlay::config::Config;
use tricolor_overlay::{
    default_output_path, server, Compositor, EmblemOutcome, ProcessOptions, ProcessResult,
};

#[derive(Parser)]
#[command(
    name = "tricolor",
    about = "Overlay a tricolor gradient and a centered emblem onto images",
    version,
    after_help = "Environment: HOST, PORT, TRICOLOR_ASSETS_DIR, TRICOLOR_MAX_UPLOAD_MB, RUST_LOG"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Bind address (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Listening port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding the emblem asset (overrides TRICOLOR_ASSETS_DIR)
        #[arg(long)]
        assets_dir: Option<PathBuf>,
    },

    /// Apply the overlay to a single image file
    Apply {
        /// Input image file
        input: PathBuf,

        /// Output file (default: {name}_tricolor.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the centered emblem
        #[arg(long)]
        no_emblem: bool,

        /// Directory holding the emblem asset (overrides TRICOLOR_ASSETS_DIR)
        #[arg(long)]
        assets_dir: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Suppress all non-error output
        #[arg(short, long)]
        quiet: bool,
    },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();

    match cli.command {
        Command::Serve {
            host,
            port,
            assets_dir,
        } => {
            init_tracing("tricolor_overlay=info,tower_http=info");

            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = assets_dir {
                config.assets_dir = dir;
            }
            info!(
                "Loaded configuration: host={}, port={}, assets_dir={}",
                config.host,
                config.port,
                config.assets_dir.display()
            );

            server::serve(&config).await?;
        }
        Command::Apply {
            input,
            output,
            no_emblem,
            assets_dir,
            verbose,
            quiet,
        } => {
            let level = if quiet {
                "error"
            } else if verbose {
                "tricolor_overlay=debug"
            } else {
                "tricolor_overlay=info"
            };
            init_tracing(level);

            if !input.exists() {
                eprintln!("Error: Input path does not exist: {}", input.display());
                process::exit(1);
            }

            let assets_dir = assets_dir.unwrap_or(config.assets_dir);
            let compositor = Compositor::new(&assets_dir);
            let output = output.unwrap_or_else(|| default_output_path(&input));
            let opts = ProcessOptions {
                include_emblem: !no_emblem,
            };

            let result = compositor.process_file(&input, &output, &opts);
            print_result(&result, verbose, quiet);
            if !result.success {
                process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_result(result: &ProcessResult, verbose: bool, quiet: bool) {
    if quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        match &result.output {
            Some(out) => eprintln!("[OK] {filename} -> {}", out.display()),
            None => eprintln!("[OK] {filename}"),
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if verbose {
        if let Some(EmblemOutcome::Applied(p)) = &result.emblem {
            eprintln!("  -> emblem {0}x{0} at ({1}, {2})", p.side, p.x, p.y);
        }
        if !result.message.is_empty() {
            eprintln!("  -> {}", result.message);
        }
    }
}
