//! SheetPilot - Demo REPL
//!
//! Wires a command session against HTTP collaborators when configured and
//! scripted offline stand-ins otherwise, then reads commands line by line.
//! The recording engine prints the mutations a real grid would receive.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::runtime::Runtime;

use sheetpilot::backend::client::HttpBackend;
use sheetpilot::backend::BackendAnalytics;
use sheetpilot::config::PilotConfig;
use sheetpilot::core::error::Result;
use sheetpilot::oracle::client::HttpOracle;
use sheetpilot::oracle::IntentOracle;
use sheetpilot::session::CommandSession;
use sheetpilot::testing::{MemoryStore, RecordingEngine, ScriptedBackend, ScriptedOracle};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("sheetpilot=debug")
        .init();

    tracing::info!("SheetPilot starting...");

    let rt = Runtime::new()?;
    let config = PilotConfig::from_env();

    let engine = Arc::new(RecordingEngine::ready());

    let oracle: Arc<dyn IntentOracle> = match HttpOracle::from_env() {
        Ok(oracle) => Arc::new(oracle),
        Err(_) => {
            tracing::warn!(
                "SHEETPILOT_ORACLE_API_KEY not set - only fast-path commands will resolve"
            );
            Arc::new(ScriptedOracle::failing("oracle not configured"))
        }
    };

    let backend: Arc<dyn BackendAnalytics> = match HttpBackend::from_env() {
        Ok(backend) => Arc::new(backend),
        Err(_) => {
            tracing::warn!("SHEETPILOT_BACKEND_URL not set - using a scripted backend");
            Arc::new(ScriptedBackend::new())
        }
    };

    let store = Arc::new(MemoryStore::new());
    let mut session = CommandSession::new(engine.clone(), oracle, backend, store, &config);

    println!("\n=== SHEETPILOT ===");
    println!("Natural language command routing for spreadsheets");
    println!();
    println!("Commands:");
    println!("  calls           - Show the engine mutations applied so far");
    println!("  transcript      - Print the conversation transcript");
    println!("  reset           - Clear the conversation");
    println!("  quit / q        - Exit");
    println!("  <any text>      - A spreadsheet command");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }
        if input == "calls" {
            for call in engine.calls() {
                println!("  {call}");
            }
            continue;
        }
        if input == "transcript" {
            for entry in session.transcript().entries() {
                println!("  [{:?}] {}", entry.author, entry.content);
            }
            continue;
        }
        if input == "reset" {
            session.reset();
            println!("Conversation cleared.");
            continue;
        }

        match rt.block_on(session.submit(input)) {
            Ok(message) => println!("{message}"),
            Err(e) => println!("Could not process command: {e}"),
        }
    }

    println!(
        "\nGoodbye! {} transcript entries, {} engine mutations.",
        session.transcript().len(),
        engine.calls().len()
    );
    Ok(())
}
