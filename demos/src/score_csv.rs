//! Scores a local CSV file with the isolation forest and prints the result
//! in each output format.
//!
//! Run with `cargo run -p riskgate-demos --example score_csv`. Set
//! `RUST_LOG=riskgate=debug` to see the pipeline's structured logs.

use std::error::Error;

use riskgate::core::Parameters;
use riskgate::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter, ResultFormatter,
};
use riskgate::logging::setup::{init_logging, LoggingConfig};
use riskgate::runner::ModelRunner;
use riskgate::sources::{FileSource, SourceDescriptor};
use riskgate::test_fixtures::{auth_events_csv, write_file};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    init_logging(LoggingConfig::default().with_level(tracing::Level::WARN))?;

    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "auth_events.csv", &auth_events_csv(60, ','))?;

    let runner = ModelRunner::new();
    let descriptor = SourceDescriptor::File(FileSource::new(
        dir.path().to_string_lossy(),
        "auth_events.csv",
    ));
    let dataset = runner.load(&descriptor).await?;
    println!("Loaded {} rows from {}\n", dataset.num_rows(), descriptor.kind());

    let mut plugin = runner.registry().create("isolation-forest")?;
    let report = runner.run(plugin.as_mut(), dataset, Parameters::new(), true)?;

    println!("=== Human readable ===");
    let human = HumanFormatter::with_config(FormatterConfig::default().with_max_records(5));
    println!("{}", human.format(&report.frame)?);

    println!("=== JSON (anomalies only) ===");
    println!("{}", JsonFormatter::new().with_pretty(true).format(&report.frame)?);

    println!("=== Markdown (detailed) ===");
    let markdown = MarkdownFormatter::with_config(FormatterConfig::detailed().with_max_records(10))
        .with_heading_level(3);
    println!("{}", markdown.format(&report.frame)?);

    Ok(())
}
