//! Trains every built-in model on the same table and ranks them by the
//! highest risk each one reports.

use std::error::Error;

use riskgate::core::Parameters;
use riskgate::runner::ModelRunner;
use riskgate::sources::{SourceDescriptor, TableSource};
use riskgate::test_fixtures::session_with_tables;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    let runner = ModelRunner::new().with_session(session_with_tables().await?);

    println!("Available models:");
    for manifest in runner.registry().manifests() {
        println!("  {:<22} {:<20} {}", manifest.slug, manifest.family, manifest.description);
    }
    println!();

    let descriptor = SourceDescriptor::Table(TableSource::new("auth_events_2024_01")?);
    let dataset = runner.load(&descriptor).await?;

    let slugs: Vec<&str> = runner.registry().slugs();
    let parameters = Parameters::new().with("threshold", 25);
    let comparison = runner.compare(&slugs, &dataset, &parameters);

    println!("{:<22} {:>8} {:>10}", "model", "max risk", "anomalies");
    for report in comparison.reports() {
        println!(
            "{:<22} {:>8.1} {:>10}",
            report.model,
            report.max_risk().unwrap_or(0.0),
            report.anomaly_count()
        );
    }
    for (model, error) in comparison.failures() {
        println!("{model:<22} failed: {error}");
    }

    if let Some(best) = comparison.best() {
        println!("\nHighest risk reported by {}", best.model);
    }
    Ok(())
}
