//! `datacopilot check`: verify warehouse access and print table schemas.

use crate::ui;
use datacopilot_config::AppConfig;
use datacopilot_core::engine::QueryEngine;
use datacopilot_warehouse::BigQueryEngine;
use tracing::{info, warn};

/// Returns `Ok(false)` when the warehouse cannot be reached or listed.
pub async fn run(config: &AppConfig, tables: &[String]) -> Result<bool, Box<dyn std::error::Error>> {
    let engine = match BigQueryEngine::from_config(&config.bigquery) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("  ❌ Warehouse client could not be created: {e}");
            return Ok(false);
        }
    };

    println!(
        "{}",
        ui::boxed(&[
            "Data Copilot: connectivity check",
            &format!("Dataset:  {}", engine.dataset()),
            &format!("Billing:  {}", engine.billing_project()),
        ])
    );
    println!();

    let available = match engine.list_tables().await {
        Ok(names) => names,
        Err(e) => {
            eprintln!("  ❌ Could not list tables: {e}");
            return Ok(false);
        }
    };
    info!(count = available.len(), "Listed dataset tables");
    println!("  ✅ {} tables: {}", available.len(), available.join(", "));

    for table in tables {
        let table = table.trim();
        if table.is_empty() {
            continue;
        }
        println!();
        println!("{}", ui::rule());
        println!("{table}");
        println!("{}", ui::rule());
        match engine.schema(table).await {
            Ok(columns) => println!("{}", serde_json::to_string_pretty(&columns)?),
            Err(e) => {
                warn!(table, error = %e, "Schema lookup failed");
                println!("  ⚠️  Skipped: {e}");
            }
        }
    }

    Ok(true)
}
