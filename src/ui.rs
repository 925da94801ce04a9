//! Terminal output for batch runs: progress bar and colored result lines.
//!
//! Uses `indicatif` for the bar and `console` for styling. One
//! [`BatchProgress`] instance accompanies one batch; per-item lines go
//! through the bar so they do not tear the redraw.

use std::path::Path;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::dispatch::BatchReport;

/// Visual progress for one batch of items.
pub struct BatchProgress {
    pb: ProgressBar,
    verbose: bool,
    green: Style,
    red: Style,
}

impl BatchProgress {
    /// Start a bar over `total` items with a stage label.
    pub fn start(total: u64, label: &str, verbose: bool) -> Self {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .expect("invalid template")
                .progress_chars("=>-"),
        );
        pb.set_message(label.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            verbose,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// A progress sink that draws nothing. Used by tests and by stages that
    /// report through their own channel.
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
            verbose: false,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Fix the bar length once the selection size is known.
    pub fn set_total(&self, total: u64) {
        self.pb.set_length(total);
    }

    /// Show which file is in flight.
    pub fn begin_item(&self, source: &Path) {
        let name = source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.pb.set_message(name);
    }

    pub fn item_succeeded(&self, output: &Path) {
        if self.verbose {
            self.pb.println(format!(
                "  {} wrote {}",
                self.green.apply_to("✓"),
                output.display()
            ));
        }
        self.pb.inc(1);
    }

    /// Per-item failures are always printed, with the offending source path.
    pub fn item_failed(&self, source: &Path, detail: &str) {
        self.pb.println(format!(
            "  {} {}: {detail}",
            self.red.apply_to("✗"),
            source.display()
        ));
        self.pb.inc(1);
    }

    /// Clear the bar and print the final tally.
    pub fn finish(&self, report: &BatchReport) {
        self.pb.finish_and_clear();
        let glyph = if report.all_succeeded() {
            self.green.apply_to("✓")
        } else {
            self.red.apply_to("✗")
        };
        println!(
            "  {glyph} {} succeeded, {} failed ({} total, {}ms)",
            report.succeeded, report.failed, report.total, report.duration_ms
        );
    }

    /// Pretty-print the full report as JSON, for verbose runs.
    pub fn print_report(&self, report: &BatchReport) {
        let style = if report.all_succeeded() {
            &self.green
        } else {
            &self.red
        };
        println!();
        println!("{}", style.apply_to("─── Batch Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}
