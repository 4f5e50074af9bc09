mod bootstrap;

use anyhow::{Context, Result};
use engage_core::settings::{expand_home, Settings};
use engage_data::analysis::{analyze_report, ChartOutcome};
use engage_ui::output::ChartPrinter;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("engage-charts v{} starting", env!("CARGO_PKG_VERSION"));

    let report = settings.resolve_report()?;
    tracing::info!(
        "Sources: {:?}, charts: {}",
        report.sources,
        report.charts.len()
    );

    if let Some(path) = &settings.save_config {
        let path = expand_home(&path.to_string_lossy());
        report
            .save_to(&path)
            .with_context(|| format!("saving report to {}", path.display()))?;
        tracing::info!("Saved report to {}", path.display());
    }

    let result = analyze_report(&report)?;

    for skipped in &result.skipped {
        tracing::warn!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    tracing::debug!("Report metadata: {}", serde_json::to_string(&result.metadata)?);

    if result.metadata.files_loaded == 0 {
        eprintln!("No data files found in {}.", report.sources.join(", "));
    }

    let output_dir = settings
        .output_dir
        .as_ref()
        .map(|dir| expand_home(&dir.to_string_lossy()));
    let mut printer = ChartPrinter::new(
        &settings.theme,
        settings.width,
        settings.height,
        settings.plain,
    );

    for (index, outcome) in result.charts.iter().enumerate() {
        match outcome {
            ChartOutcome::Ready(chart) => {
                printer.print(chart)?;
                if let Some(dir) = &output_dir {
                    let path = printer.write_to_dir(dir, index + 1, chart)?;
                    tracing::info!("Wrote {}", path.display());
                }
            }
            ChartOutcome::Empty(title) => printer.print_no_data(title)?,
        }
    }

    Ok(())
}
