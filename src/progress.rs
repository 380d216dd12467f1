//! Header and summary output for the command-line walker
//!
//! Everything here goes to stderr; stdout carries only listing events.

use crate::walker::{SchedulePolicy, TraversalOptions, TraversalStats};
use console::style;
use std::time::Duration;

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

fn describe_policy(options: &TraversalOptions) -> String {
    let policy = match options.policy {
        SchedulePolicy::GlobalBarrier => "global barrier".to_string(),
        SchedulePolicy::Overlapped { max_listings } => {
            format!("overlapped ({max_listings} listings)")
        }
    };
    match options.max_in_flight_probes {
        Some(limit) => format!("{policy}, {limit} probes in flight"),
        None => format!("{policy}, unbounded probes"),
    }
}

/// Print a header at the start of the walk
pub fn print_header(root: &str, options: &TraversalOptions) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("find-dir-stream").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Root:").bold(), root);
    eprintln!("  {} {}", style("Scheduling:").bold(), describe_policy(options));
    eprintln!();
}

/// Print a summary of the walk results
pub fn print_summary(stats: &TraversalStats, printed: u64, duration: Duration) {
    let duration_secs = duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        stats.probes_issued as f64 / duration_secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("{}", style("Walk Complete").green().bold());
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(stats.events_emitted)
    );
    eprintln!("  {} {}", style("Printed:").bold(), format_number(printed));
    eprintln!(
        "  {} {}",
        style("Entries:").bold(),
        format_number(stats.probes_issued)
    );
    eprintln!(
        "  {} {:.1}s ({:.0} entries/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    let errors = stats.listings_failed + stats.probes_failed;
    if errors > 0 {
        eprintln!(
            "  {} {} ({} listing, {} stat)",
            style("Errors:").yellow().bold(),
            format_number(errors),
            format_number(stats.listings_failed),
            format_number(stats.probes_failed)
        );
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_describe_policy() {
        assert_eq!(
            describe_policy(&TraversalOptions::default()),
            "global barrier, 128 probes in flight"
        );
        let overlapped = TraversalOptions::unbounded()
            .with_policy(SchedulePolicy::Overlapped { max_listings: 4 });
        assert_eq!(describe_policy(&overlapped), "overlapped (4 listings), unbounded probes");
    }
}
