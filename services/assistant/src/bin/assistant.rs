//! services/assistant/src/bin/assistant.rs

use assistant_lib::{
    adapters::{FileIdentityAdapter, GeminiCompletionAdapter, SqliteBackend},
    chat::{run_turn, AppState, SessionState, TurnOutcome},
    config::Config,
    error::AppError,
};
use nexus_core::{DocumentStore, IdentityService, Role};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting assistant...");

    // --- 2. Resolve the User Identity ---
    let identity = FileIdentityAdapter::new(config.identity_path.clone());
    let user_id = identity.current_user().await?;
    info!("Identity ready: {}", user_id);

    // --- 3. Connect the Document Backend & Publish the First Snapshot ---
    let backend = Arc::new(SqliteBackend::connect(&config.database_url, user_id).await?);
    backend.run_migrations().await?;
    backend.refresh().await?;
    let store = DocumentStore::new(backend, user_id);
    let documents = store.subscribe();

    // --- 4. Initialize the Completion Adapter ---
    let completion = Arc::new(GeminiCompletionAdapter::new(
        config.gemini_base_url.clone(),
        config.gemini_model.clone(),
        config.gemini_api_key.clone(),
    ));

    // --- 5. Build Shared State & Run the Chat Loop ---
    let app = Arc::new(AppState {
        completion,
        documents,
    });
    let session = Arc::new(Mutex::new(SessionState::new(user_id)));

    println!("--- Nexus AI Assistant Initiated (RAG Active) ---");
    println!("Type 'exit' to quit. Documents: /add <title> :: <content>, /delete <id>, /docs");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("\nNexus: Session terminated. Have a productive day.");
            break;
        }

        if let Some(rest) = input.strip_prefix("/add ") {
            handle_add(&store, rest).await;
            continue;
        }
        if let Some(rest) = input.strip_prefix("/delete ") {
            handle_delete(&store, rest).await;
            continue;
        }
        if input == "/docs" {
            for document in app.documents.borrow().iter() {
                println!("  {}  {}", document.id, document.title);
            }
            continue;
        }

        match run_turn(app.clone(), session.clone(), input).await {
            Ok(TurnOutcome::Ignored) => {}
            Ok(_) => print_last_reply(&session).await,
            // The turn gate is already released; the next submission is allowed.
            Err(e) => eprintln!("[error] {e}"),
        }
    }

    Ok(())
}

/// Prints the assistant message the finished turn appended.
async fn print_last_reply(session: &Mutex<SessionState>) {
    let session = session.lock().await;
    if let Some(message) = session.messages.last() {
        if message.role == Role::Assistant {
            let marker = if message.used_retrieval {
                " [retrieved]"
            } else {
                ""
            };
            println!("Nexus:{marker} {}", message.text);
        }
    }
}

async fn handle_add(store: &DocumentStore, rest: &str) {
    let Some((title, content)) = rest.split_once("::") else {
        eprintln!("[store] Usage: /add <title> :: <content>");
        return;
    };
    match store.create(title, content).await {
        Ok(()) => println!("[store] Document saved."),
        Err(e) => eprintln!("[store] {e}"),
    }
}

async fn handle_delete(store: &DocumentStore, rest: &str) {
    match rest.trim().parse::<Uuid>() {
        Ok(id) => match store.delete(id).await {
            Ok(()) => println!("[store] Document deleted."),
            Err(e) => eprintln!("[store] {e}"),
        },
        Err(_) => eprintln!("[store] '/delete' expects a document id."),
    }
}
