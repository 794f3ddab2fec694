//! `datacopilot chat`: interactive question answering.

use crate::ui;
use datacopilot_agent::{GraphRegistry, SessionStore, TracingObserver, TurnController};
use datacopilot_config::AppConfig;
use datacopilot_core::event::DomainEvent;
use datacopilot_core::session::SessionId;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

const QUIT_WORDS: [&str; 3] = [":quit", "exit", "quit"];

pub async fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = GraphRegistry::new();
    let graph = registry
        .get_or_build_from_config(config)
        .await
        .map_err(|e| format!("Could not start the agent: {e}"))?;

    let mut events = graph.event_bus().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_event(&event);
        }
    });

    let controller = TurnController::new(graph).with_observer(Arc::new(TracingObserver));
    let session_config = config.session_config();
    let store = SessionStore::new();
    let session_id = SessionId::new();
    info!(session_id = %session_id, "Chat session started");

    println!();
    println!(
        "{}",
        ui::boxed(&[
            "Data Copilot",
            &format!("Dataset:  {}", session_config.dataset_id),
            &format!("Model:    {}", session_config.model_id),
            "",
            "Ask a question about the data.",
            "Type :quit to leave.",
        ])
    );
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if QUIT_WORDS.contains(&question) {
            break;
        }

        eprint!("  ...");
        let result = controller
            .run_turn_in_session(&store, &session_id, question, &session_config)
            .await;
        eprint!("\r     \r");

        match result {
            Ok(outcome) => {
                println!();
                println!("{}", outcome.into_text());
                println!();
            }
            Err(e) => {
                println!();
                println!("{}", ui::boxed(&["Something went wrong"]));
                println!("  {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::ToolExecuted {
            tool_name,
            success,
            duration_ms,
            ..
        } => debug!(tool = %tool_name, success, duration_ms, "Tool executed"),
        DomainEvent::ResponseGenerated {
            model, tokens_used, ..
        } => debug!(%model, tokens_used, "LLM responded"),
        other => debug!(event = ?other, "Domain event"),
    }
}
