//! # Stickyprint CLI
//!
//! Command-line interface for the sticky-note printer service.
//!
//! ## Usage
//!
//! ```bash
//! # Run the HTTP server
//! stickyprint serve
//!
//! # Print directly from the command line
//! stickyprint text "Hello World!"
//! stickyprint qr "https://example.com"
//! stickyprint calendar
//! stickyprint todo todo.shopping
//!
//! # Printer management
//! stickyprint discover
//! stickyprint status
//!
//! # Use a specific config file and font
//! stickyprint --config /path/to/config.json text "Hello" --font console
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stickyprint::{config::AppConfig, server, service::StickyPrintService, StickyError};

/// Stickyprint - sticky-note printer utility
#[derive(Parser, Debug)]
#[command(name = "stickyprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file (JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve,

    /// Print text
    Text {
        /// Text to print
        text: String,

        /// Font to use (sans-serif, console, handwriting)
        #[arg(long, short, default_value = "sans-serif")]
        font: String,

        /// Job name
        #[arg(long, short = 'n', default_value = "CLI-Text")]
        name: String,
    },

    /// Print a QR code
    Qr {
        /// Data to encode
        data: String,

        /// Job name
        #[arg(long, short = 'n', default_value = "CLI-QR")]
        name: String,
    },

    /// Print today's calendar events
    Calendar {
        /// Calendar entity ID (default from config)
        #[arg(long, short)]
        entity: Option<String>,

        /// Font to use
        #[arg(long, short, default_value = "sans-serif")]
        font: String,

        /// Job name
        #[arg(long, short = 'n', default_value = "CLI-Calendar")]
        name: String,
    },

    /// Print a todo list
    Todo {
        /// Todo entity ID
        entity: String,

        /// Font to use
        #[arg(long, short, default_value = "console")]
        font: String,

        /// Job name
        #[arg(long, short = 'n', default_value = "CLI-Todo")]
        name: String,
    },

    /// Discover printers on the network
    Discover,

    /// Show service status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "stickyprint=debug,tower_http=debug"
    } else {
        "stickyprint=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

async fn run(cli: Cli) -> Result<(), StickyError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let service = Arc::new(StickyPrintService::new(config)?);

    match cli.command {
        Commands::Serve => {
            service.initialize().await;
            server::serve(service).await
        }

        Commands::Text { text, font, name } => {
            service.initialize().await;
            finish(service.print_text(&text, &font, &name).await, &name)
        }

        Commands::Qr { data, name } => {
            service.initialize().await;
            finish(service.print_qr_code(&data, &name).await, &name)
        }

        Commands::Calendar { entity, font, name } => {
            service.initialize().await;
            finish(
                service
                    .print_calendar_today(entity.as_deref(), &font, &name)
                    .await,
                &name,
            )
        }

        Commands::Todo { entity, font, name } => {
            service.initialize().await;
            finish(service.print_todo_list(&entity, &font, &name).await, &name)
        }

        Commands::Discover => {
            service.initialize().await;
            match service.endpoint().await {
                Some(endpoint) => {
                    println!("Found printer: {}", endpoint.uri);
                    println!("  Hostname: {}", endpoint.hostname);
                    println!("  Port: {}", endpoint.port);
                    Ok(())
                }
                None => Err(StickyError::Discovery("no printer found".to_string())),
            }
        }

        Commands::Status => {
            service.initialize().await;
            let status = service.status().await;
            println!("Service Status: {}", status.service);
            println!("Printer Status: {}", status.printer.status);
            if let Some(uri) = &status.printer.uri {
                println!("Printer URI: {}", uri);
            }
            println!("Auto-discover: {}", status.config.auto_discover);
            if !status.config.manual_ip.is_empty() {
                println!("Manual IP: {}", status.config.manual_ip);
            }
            println!("Default calendar: {}", status.config.default_calendar);
            Ok(())
        }
    }
}

/// Report a print outcome; failure maps to a non-zero exit code.
fn finish(success: bool, job_name: &str) -> Result<(), StickyError> {
    if success {
        println!("Printed successfully: {}", job_name);
        Ok(())
    } else {
        Err(StickyError::Printer(format!(
            "failed to print job '{}'",
            job_name
        )))
    }
}
