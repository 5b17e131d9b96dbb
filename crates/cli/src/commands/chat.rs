//! `supportline chat`: one-shot or interactive chat in the terminal.

use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;

use supportline_chat::{ChatEngine, ChatRequest};
use supportline_config::AppConfig;

pub async fn run(
    organization_id: String,
    session_id: Option<String>,
    message: Option<String>,
    documents: Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let top_k = config.chat.default_top_k;
    let score_threshold = config.chat.default_score_threshold;
    let state = supportline_gateway::build_state(config)?;

    for path in &documents {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let report = state.documents.ingest(&organization_id, &source, &text).await?;
        eprintln!(
            "  Ingested {source}: {} chunks into {}",
            report.chunks_processed, report.namespace
        );
    }

    let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let turn = |query: String| {
        let mut request = ChatRequest::new(&session_id, &organization_id, query);
        request.top_k = top_k;
        request.score_threshold = score_threshold;
        request
    };

    if let Some(msg) = message {
        let request = turn(msg);
        request.validate()?;
        let result = state.engine.chat(request).await?;
        println!("{}", result.response);
        print_sources(&result.sources);
        return Ok(());
    }

    println!();
    println!("  Supportline: Interactive Mode");
    println!();
    println!("  Organization: {organization_id}");
    println!("  Session:      {session_id}");
    println!("  Model:        {}", state.engine.model());
    println!();
    println!("  Commands: /history, /clear, exit");
    println!();

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "exit" | "quit" => break,
            "/history" => print_history(&state.engine, &session_id).await,
            "/clear" => match state.engine.clear(&session_id).await {
                Ok(()) => println!("  Session {session_id} cleared"),
                Err(e) => eprintln!("  [Error] {e}"),
            },
            query => {
                eprint!("  ...");
                let outcome = state.engine.chat(turn(query.to_string())).await;
                eprint!("\r     \r");
                match outcome {
                    Ok(result) => {
                        println!();
                        for line in result.response.lines() {
                            println!("  Assistant > {line}");
                        }
                        print_sources(&result.sources);
                        println!();
                    }
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_sources(sources: &[supportline_chat::Provenance]) {
    for source in sources {
        println!(
            "    source: {} #{} (score {:.2})",
            source.source_id, source.position_index, source.score
        );
    }
}

async fn print_history(engine: &ChatEngine, session_id: &str) {
    match engine.history(session_id).await {
        Ok(view) => {
            println!("  {} message(s)", view.total_messages);
            for turn in view.messages {
                println!("  [{}] {}", turn.role.as_str(), turn.content);
            }
        }
        Err(e) => eprintln!("  [Error] {e}"),
    }
}
