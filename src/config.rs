//! Configuration types for find-dir-stream
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::walker::{SchedulePolicy, TraversalOptions, DEFAULT_MAX_IN_FLIGHT_PROBES};
use clap::{Parser, ValueEnum};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Default listing limit for --overlap-waves
const DEFAULT_MAX_LISTINGS: usize = 4;

/// Stream directory listings, one line per directory
#[derive(Parser, Debug, Clone)]
#[command(
    name = "find-dir-stream",
    version,
    about = "Stream directory listings, one line per directory",
    long_about = "Walks a directory tree and prints one line per directory with the names it contains.\n\n\
                  Directories are listed one at a time and every entry is probed with stat to\n\
                  discover subdirectories. A directory is always printed before its children.",
    after_help = "EXAMPLES:\n    \
        find-dir-stream /usr/share\n    \
        find-dir-stream . --match 'src$'\n    \
        find-dir-stream ~/projects --format json -q\n    \
        find-dir-stream /data --overlap-waves --max-listings 8 --max-in-flight-probes 512"
)]
pub struct CliArgs {
    /// Directory to walk
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Only print directories whose path matches this regular expression
    #[arg(short = 'm', long = "match", value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Maximum stat calls in flight at once
    #[arg(
        short = 'p',
        long,
        default_value_t = DEFAULT_MAX_IN_FLIGHT_PROBES,
        value_name = "NUM"
    )]
    pub max_in_flight_probes: usize,

    /// Issue one stat call per entry without any cap
    #[arg(long, conflicts_with = "max_in_flight_probes")]
    pub unbounded_probes: bool,

    /// Start listing new directories while other directories are still being probed
    #[arg(long)]
    pub overlap_waves: bool,

    /// Maximum directory listings in flight (only with --overlap-waves)
    #[arg(long, default_value_t = DEFAULT_MAX_LISTINGS, value_name = "NUM")]
    pub max_listings: usize,

    /// Quiet mode - suppress header and summary
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// How events are written to stdout
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `<dir>: <name>,<name>,...`
    Text,
    /// One JSON object per line: {"dir": ..., "files": [...]}
    Json,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Directory to walk
    pub root: PathBuf,

    /// Compiled --match pattern
    pub pattern: Option<Regex>,

    /// Output format
    pub format: OutputFormat,

    /// Engine scheduling options
    pub options: TraversalOptions,

    /// Print header and summary
    pub show_summary: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl WalkConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRoot);
        }

        let max_in_flight_probes = if args.unbounded_probes {
            None
        } else if args.max_in_flight_probes == 0 {
            return Err(ConfigError::InvalidProbeLimit {
                limit: args.max_in_flight_probes,
            });
        } else {
            Some(args.max_in_flight_probes)
        };

        let policy = if args.overlap_waves {
            if args.max_listings == 0 {
                return Err(ConfigError::InvalidListingLimit {
                    limit: args.max_listings,
                });
            }
            SchedulePolicy::Overlapped {
                max_listings: args.max_listings,
            }
        } else {
            SchedulePolicy::GlobalBarrier
        };

        let pattern = args
            .pattern
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            root: args.root,
            pattern,
            format: args.format,
            options: TraversalOptions {
                policy,
                max_in_flight_probes,
            },
            show_summary: !args.quiet,
            verbose: args.verbose,
        })
    }

    /// Check if events for `dir` should be printed
    pub fn matches(&self, dir: &Path) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(&dir.to_string_lossy()),
            None => true,
        }
    }
}
