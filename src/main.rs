//! Gold Editor CLI - review and edit gold annotation datasets.

use clap::Parser;
#[cfg(feature = "server")]
use gold_editor::cli::Commands::Serve;
use gold_editor::cli::{Cli, Commands};
use gold_editor::commands::{self, Output};
use gold_editor::config::{ConfigOverrides, LogFormat, ResolvedSettings};
use std::process;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    let result = run(cli);

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), gold_editor::Error> {
    let mut overrides = ConfigOverrides::new();
    overrides.config_file = cli.config;
    overrides.data_root = cli.data_root;
    #[cfg(feature = "server")]
    if let Serve { host, port } = &cli.command {
        overrides.host = host.clone();
        overrides.port = *port;
    }

    let resolved = ResolvedSettings::resolve(&overrides)?;
    init_tracing(&resolved.log_level.value, resolved.log_format.value);
    let human = cli.human_readable;

    match cli.command {
        #[cfg(feature = "server")]
        Serve { .. } => run_server(resolved.into_settings()),
        Commands::Files => {
            output(&commands::files(&resolved.into_settings())?, human);
            Ok(())
        }
        Commands::Report => {
            output(&commands::report(&resolved.into_settings())?, human);
            Ok(())
        }
        Commands::Export { file_id, out } => {
            output(&commands::export(&resolved.into_settings(), &file_id, out)?, human);
            Ok(())
        }
        Commands::Backup { file_id } => {
            output(&commands::backup(&resolved.into_settings(), &file_id)?, human);
            Ok(())
        }
        Commands::Replace {
            file_id,
            index,
            record,
        } => {
            let settings = resolved.into_settings();
            output(&commands::replace(&settings, &file_id, index, &record)?, human);
            Ok(())
        }
        Commands::Config => {
            output(&commands::config_show(&resolved), human);
            Ok(())
        }
    }
}

/// Install the tracing subscriber: `RUST_LOG` if set, else the configured level.
fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output on stdout stays parseable.
    match format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Run the web server on a multi-threaded runtime.
#[cfg(feature = "server")]
fn run_server(settings: gold_editor::config::Settings) -> Result<(), gold_editor::Error> {
    if !settings.data_root.is_dir() {
        return Err(gold_editor::Error::Config(format!(
            "Data root {} is not a directory",
            settings.data_root.display()
        )));
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| gold_editor::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(gold_editor::server::start_server(settings))
}
