//! Command-line configuration
//!
//! Parses CLI options into an immutable [`Config`] value using `clap`. The
//! config is built once in `main` and threaded by reference through the
//! walker and serializers instead of read from process globals.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Parser;

use crate::errors::{AppError, AppResult};

/// Output directory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Flat directory, one `<folder>.<kind>` file per folder
    Normal,
    /// `.{folder}.directory/` per folder, suitable for KMail
    Kmail,
    /// `<folder>/` nested directories, one file per kind
    Recurse,
    /// `<folder>/` nested directories, one file per item
    Separate,
}

/// Submode of [`LayoutMode::Recurse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecurseOptions {
    /// Also write Thunderbird `.type`/`.size` bookkeeping files
    pub thunderbird: bool,
}

/// Submode of [`LayoutMode::Separate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeparateOptions {
    /// Write RFC 822 headers+body with no enclosing mbox framing (MH style)
    pub mh: bool,
    /// Append a kind-specific extension (`.eml`, `.vcf`, `.ics`) to filenames
    pub extensions: bool,
    /// Also emit a `.msg` binary container alongside each message
    pub msg: bool,
}

/// Contact output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactMode {
    /// RFC 2426 vCard
    VCard,
    /// One `Name <address>` line per contact
    List,
}

/// Output-type mask: which item kinds are materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTypeMask {
    pub email: bool,
    pub appointment: bool,
    pub journal: bool,
    pub contact: bool,
}

impl Default for OutputTypeMask {
    fn default() -> Self {
        Self {
            email: true,
            appointment: true,
            journal: true,
            contact: true,
        }
    }
}

impl OutputTypeMask {
    /// Parse a `-t[eajc]` argument into a mask with every unlisted kind disabled
    pub fn parse(spec: &str) -> AppResult<Self> {
        let mut mask = Self {
            email: false,
            appointment: false,
            journal: false,
            contact: false,
        };
        for c in spec.chars() {
            match c {
                'e' => mask.email = true,
                'a' => mask.appointment = true,
                'j' => mask.journal = true,
                'c' => mask.contact = true,
                other => {
                    return Err(AppError::InvalidArgs(format!(
                        "unknown output type flag '{other}' in -t argument"
                    )));
                }
            }
        }
        Ok(mask)
    }
}

/// Debug verbosity level, mirrors the original `-L` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Debug,
    Info,
    Warn,
}

impl DebugLevel {
    fn from_level(n: u8) -> AppResult<Self> {
        match n {
            1 => Ok(Self::Debug),
            2 => Ok(Self::Info),
            3 => Ok(Self::Warn),
            other => Err(AppError::InvalidArgs(format!(
                "invalid debug level {other}, expected 1, 2, or 3"
            ))),
        }
    }

    /// Map to the `tracing` level this verbosity corresponds to
    pub fn tracing_level(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
        }
    }
}

/// Raw CLI arguments, parsed by `clap` before being validated into [`Config`]
#[derive(Debug, Parser)]
#[command(name = "readpst", version, about = "Extract a PST archive to mbox/vCard/iCalendar files")]
struct RawArgs {
    /// PST archive to read
    pst_file: PathBuf,

    /// Output directory; chdir here after opening the archive
    #[arg(short = 'o', default_value = ".")]
    output_dir: PathBuf,

    /// Quiet: only print error messages
    #[arg(short = 'q')]
    quiet: bool,

    /// Debug level: 1=debug, 2=info, 3=warn
    #[arg(short = 'L')]
    debug_level: Option<u8>,

    /// Debug log file
    #[arg(short = 'd')]
    debug_log: Option<PathBuf>,

    /// Default charset for items with no declared charset
    #[arg(short = 'C')]
    default_charset: Option<String>,

    /// Prefer UTF-8 output when available
    #[arg(short = '8')]
    prefer_utf8: bool,

    /// Include the Deleted Items branch
    #[arg(short = 'D')]
    include_deleted: bool,

    /// Overwrite existing output files instead of auto-bumping the name
    #[arg(short = 'w')]
    overwrite: bool,

    /// Do not attach the decompressed RTF body
    #[arg(short = 'b')]
    no_rtf: bool,

    /// Comma-separated list of attachment extensions to keep
    #[arg(short = 'a')]
    acceptable_extensions: Option<String>,

    /// Contact mode: 'v' for vCard, 'l' for one-line list
    #[arg(short = 'c')]
    contact_mode: Option<String>,

    /// Output type mask, e.g. "-t eac"
    #[arg(short = 't')]
    output_type: Option<String>,

    /// KMail layout
    #[arg(short = 'k')]
    kmail: bool,

    /// Recurse layout
    #[arg(short = 'r')]
    recurse: bool,

    /// Recurse layout + Thunderbird bookkeeping files
    #[arg(short = 'u')]
    recurse_thunderbird: bool,

    /// Separate layout, numeric filenames
    #[arg(short = 'S')]
    separate: bool,

    /// Separate + MH, no extensions
    #[arg(short = 'M')]
    separate_mh: bool,

    /// Separate + MH + extensions
    #[arg(short = 'e')]
    separate_mh_ext: bool,

    /// Separate + MH + extensions + .msg
    #[arg(short = 'm')]
    separate_mh_ext_msg: bool,

    /// Concurrency cap
    #[arg(short = 'j')]
    max_children: Option<usize>,
}

/// Immutable, validated configuration threaded through the walker and serializers
#[derive(Debug, Clone)]
pub struct Config {
    pub pst_file: PathBuf,
    pub output_dir: PathBuf,
    pub quiet: bool,
    pub debug_level: Option<DebugLevel>,
    pub debug_log: Option<PathBuf>,
    pub default_charset: Option<String>,
    pub prefer_utf8: bool,
    pub include_deleted: bool,
    pub overwrite: bool,
    pub save_rtf_body: bool,
    pub acceptable_extensions: Option<HashSet<String>>,
    pub contact_mode: ContactMode,
    pub output_type: OutputTypeMask,
    pub layout: LayoutMode,
    pub recurse: RecurseOptions,
    pub separate: SeparateOptions,
    pub max_children: Option<usize>,
}

impl Config {
    /// Parse `std::env::args` into a validated [`Config`]
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidArgs`] if more than one layout flag is
    /// given, or if a sub-argument (`-t`, `-c`, `-L`) is malformed.
    pub fn parse() -> AppResult<Self> {
        let raw = RawArgs::parse();
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawArgs) -> AppResult<Self> {
        let layout_flags = [
            raw.kmail,
            raw.recurse,
            raw.recurse_thunderbird,
            raw.separate,
            raw.separate_mh,
            raw.separate_mh_ext,
            raw.separate_mh_ext_msg,
        ];
        if layout_flags.iter().filter(|&&f| f).count() > 1 {
            return Err(AppError::InvalidArgs(
                "only one of -k -r -u -S -M -e -m may be specified".to_owned(),
            ));
        }

        let (layout, recurse, separate) = if raw.kmail {
            (LayoutMode::Kmail, RecurseOptions::default(), SeparateOptions::default())
        } else if raw.recurse {
            (LayoutMode::Recurse, RecurseOptions { thunderbird: false }, SeparateOptions::default())
        } else if raw.recurse_thunderbird {
            (LayoutMode::Recurse, RecurseOptions { thunderbird: true }, SeparateOptions::default())
        } else if raw.separate {
            (
                LayoutMode::Separate,
                RecurseOptions::default(),
                SeparateOptions { mh: false, extensions: false, msg: false },
            )
        } else if raw.separate_mh {
            (
                LayoutMode::Separate,
                RecurseOptions::default(),
                SeparateOptions { mh: true, extensions: false, msg: false },
            )
        } else if raw.separate_mh_ext {
            (
                LayoutMode::Separate,
                RecurseOptions::default(),
                SeparateOptions { mh: true, extensions: true, msg: false },
            )
        } else if raw.separate_mh_ext_msg {
            (
                LayoutMode::Separate,
                RecurseOptions::default(),
                SeparateOptions { mh: true, extensions: true, msg: true },
            )
        } else {
            (LayoutMode::Normal, RecurseOptions::default(), SeparateOptions::default())
        };

        let contact_mode = match raw.contact_mode.as_deref() {
            None => ContactMode::VCard,
            Some(s) if s.starts_with('v') => ContactMode::VCard,
            Some(s) if s.starts_with('l') => ContactMode::List,
            Some(other) => {
                return Err(AppError::InvalidArgs(format!("invalid -c argument '{other}'")));
            }
        };

        let output_type = match raw.output_type.as_deref() {
            None => OutputTypeMask::default(),
            Some(spec) => OutputTypeMask::parse(spec)?,
        };

        let debug_level = raw.debug_level.map(DebugLevel::from_level).transpose()?;

        let acceptable_extensions = raw.acceptable_extensions.map(|s| {
            s.split(',')
                .filter(|ext| !ext.is_empty())
                .map(|ext| ext.to_ascii_lowercase())
                .collect::<HashSet<_>>()
        });

        Ok(Self {
            pst_file: raw.pst_file,
            output_dir: raw.output_dir,
            quiet: raw.quiet,
            debug_level,
            debug_log: raw.debug_log,
            default_charset: raw.default_charset,
            prefer_utf8: raw.prefer_utf8,
            include_deleted: raw.include_deleted,
            overwrite: raw.overwrite,
            save_rtf_body: !raw.no_rtf,
            acceptable_extensions,
            contact_mode,
            output_type,
            layout,
            recurse,
            separate,
            max_children: raw.max_children,
        })
    }

    /// Resolve the effective worker pool size: the `-j` value, or 4x available parallelism
    pub fn effective_max_children(&self) -> usize {
        self.max_children.unwrap_or_else(|| {
            let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
            cpus * 4
        })
    }
}
