//! Drives plugins through the legacy single-call surfaces.
//!
//! Shows both the row-level `execute` shim and the runner's envelope call,
//! which resolves a data-source descriptor before inference.

use std::error::Error;

use riskgate::core::CompatibilityShim;
use riskgate::plugins::ModelRegistry;
use riskgate::runner::ModelRunner;
use riskgate::test_fixtures::session_with_tables;
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    let registry = ModelRegistry::builtin();

    // Row-level shim: raw JSON rows in, flattened records out.
    let mut rows: Vec<_> = (0..25)
        .map(|i| json!({"user_id": format!("u{i}"), "logins": 6 + i % 4}))
        .collect();
    rows.push(json!({"user_id": "intruder", "logins": 700}));

    let mut autoencoder = registry.create("absolute-autoencoder")?;
    let envelope = autoencoder.execute_legacy(&rows);
    println!("execute_legacy on {} rows:", rows.len());
    println!("{}\n", serde_json::to_string_pretty(&envelope.to_json())?);

    // Descriptor-driven envelope against registered tables.
    let runner = ModelRunner::new().with_session(session_with_tables().await?);
    let inputs = [
        json!({"data_source": "index", "index_name": "auth_events_*", "threshold": 40}),
        json!({"data_source": "table", "table_name": "network_edges"}),
        json!({"data_source": "table"}),
    ];
    for (slug, input) in ["volume-check", "pagerank-centrality", "volume-check"]
        .into_iter()
        .zip(inputs)
    {
        let mut plugin = registry.create(slug)?;
        let response = runner.execute_legacy(plugin.as_mut(), &input).await;
        println!("{slug} <- {input}");
        println!("{}\n", serde_json::to_string_pretty(&response.to_json())?);
    }

    Ok(())
}
