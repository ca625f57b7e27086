//! readpst: extract a PST archive to mbox/vCard/iCalendar files
//!
//! # Architecture
//!
//! - [`main`]: Process entry point: config, tracing, archive open, exit codes
//! - [`config`]: Command-line configuration
//! - [`errors`]: Application error model with process exit-code mapping
//! - [`archive`]: The `PstArchive`/`RtfDecompressor` traits the binary reader implements
//! - [`walker`]: Folder tree walk and bounded-concurrency dispatch
//! - [`model`]: Item/contact/appointment/journal/email data model
//! - [`mail`]: RFC 5322/MIME message assembly
//! - [`vcard`]: RFC 2426 vCard rendering
//! - [`ical`]: RFC 5545 iCalendar rendering
//! - [`body`]: MIME body-part rendering and charset sniffing
//! - [`headers`]: RFC 822 header-block inspection and manipulation
//! - [`charset`]: Date formatting, header encoding, and charset transcoding
//! - [`sanitize`]: Filename sanitization and unique-path resolution
//! - [`layout`]: Output directory layout per `-k`/`-r`/`-S` mode
//! - [`concurrency`]: Bounded-concurrency folder dispatch
//! - [`msg`]: `.msg` binary container placeholder for `-m`

mod archive;
mod body;
mod charset;
mod concurrency;
mod config;
mod errors;
mod headers;
mod ical;
mod layout;
mod mail;
mod model;
mod msg;
mod sanitize;
mod vcard;
mod walker;

use std::sync::Arc;

use chrono::Utc;
use config::Config;
use errors::AppError;
use tracing_subscriber::EnvFilter;

/// Application entry point
///
/// Parses CLI arguments, initializes tracing, opens the archive, and walks
/// its folder tree into the configured output layout. Maps any fatal error
/// to the process exit code documented for this tool's CLI.
#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("readpst: {e}");
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

async fn run() -> Result<(), AppError> {
    let config = Config::parse()?;
    init_tracing(&config);

    body::compile_charset_regex()?;

    let archive = open_archive(&config)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let config = Arc::new(config);
    let now = Utc::now();
    walker::run(archive, config, now).await
}

/// Initialize `tracing` from `-L`/`-q`/`-d`, falling back to `RUST_LOG` if set.
fn init_tracing(config: &Config) {
    let level = config
        .debug_level
        .map(config::DebugLevel::tracing_level)
        .unwrap_or(if config.quiet { tracing::Level::ERROR } else { tracing::Level::WARN });
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    match &config.debug_log {
        Some(path) => {
            let file = std::fs::File::create(path).expect("could not create debug log file");
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            // Leaked: the guard must outlive the subscriber, and this only runs once at startup.
            Box::leak(Box::new(guard));
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(non_blocking).with_ansi(false).init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

/// Open the PST archive and hand back a shared [`archive::PstArchive`].
///
/// Binary PST parsing lives outside this crate: a separate reader crate
/// implements [`archive::PstArchive`] against the `.pst` file at
/// `config.pst_file` and is linked in here. This is that integration point.
fn open_archive(config: &Config) -> Result<Arc<dyn archive::PstArchive>, AppError> {
    Err(AppError::ArchiveOpen(format!(
        "no PstArchive backend is linked into this build; cannot open {}",
        config.pst_file.display()
    )))
}
