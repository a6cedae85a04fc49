//! services/assistant/src/chat/turn.rs
//!
//! The tool-orchestration loop: drives one user utterance through at most two
//! model rounds and exactly one terminal outcome.

use std::sync::Arc;

use nexus_core::domain::{ContextEntry, Message, ModelReply, ModelRequest, ToolCall, RETRIEVAL_TOOL};
use nexus_core::ports::{PortError, PortResult};
use nexus_core::retrieval;
use tokio::sync::Mutex;
use tracing::info;

use crate::chat::state::{AppState, SessionState};

/// Request/response exchanges allowed within one turn. There is no third
/// round: two consecutive retrieval rounds exhaust the turn.
const MAX_TOOL_ROUNDS: usize = 2;

/// The terminal outcome of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The input was empty after trimming; nothing happened.
    Ignored,
    /// A final assistant message was appended.
    Answered,
    /// A non-retrieval tool call was short-circuited into a notice message.
    SimulatedAction,
}

/// Runs one turn for `input`.
///
/// The user message is appended before any network activity and survives a
/// failing turn. The busy gate is taken before the first request and released
/// on every path out.
pub async fn run_turn(
    app: Arc<AppState>,
    session: Arc<Mutex<SessionState>>,
    input: &str,
) -> PortResult<TurnOutcome> {
    let text = input.trim();
    if text.is_empty() {
        return Ok(TurnOutcome::Ignored);
    }

    let entries = {
        let mut session = session.lock().await;
        if session.busy {
            return Err(PortError::Busy);
        }
        session.busy = true;
        session.messages.push(Message::user(text));
        session
            .messages
            .iter()
            .map(ContextEntry::from_message)
            .collect::<Vec<_>>()
    };

    let result = drive_rounds(&app, &session, entries).await;
    session.lock().await.busy = false;
    result
}

/// The bounded request/response/dispatch loop of one turn.
async fn drive_rounds(
    app: &AppState,
    session: &Mutex<SessionState>,
    mut entries: Vec<ContextEntry>,
) -> PortResult<TurnOutcome> {
    let mut used_retrieval = false;

    for round in 0..MAX_TOOL_ROUNDS {
        // Only the first round may carry search augmentation, and only while
        // no retrieval round has fired.
        let request = ModelRequest {
            entries: entries.clone(),
            search_grounding: round == 0 && !used_retrieval,
        };
        let reply = app.completion.generate(request).await?;

        match reply {
            ModelReply::ToolCall(call) if call.name == RETRIEVAL_TOOL => {
                let query = call.str_arg("query").unwrap_or_default().to_string();
                // Read the freshest snapshot at the instant the tool fires.
                let snapshot = app.documents.borrow().clone();
                let context = retrieval::retrieve_document_context(&snapshot, &query);
                info!(round, query = %query, "Retrieval tool dispatched");

                used_retrieval = true;
                entries.push(ContextEntry::model_call(call));
                entries.push(ContextEntry::tool_response(RETRIEVAL_TOOL, context));
            }
            ModelReply::ToolCall(call) => {
                // Simulated tools never receive a second round.
                info!(tool = %call.name, "Simulated tool call short-circuited");
                let notice = simulated_action_notice(&call);
                session.lock().await.messages.push(Message::assistant(notice, false));
                return Ok(TurnOutcome::SimulatedAction);
            }
            ModelReply::Text(answer) => {
                session
                    .lock()
                    .await
                    .messages
                    .push(Message::assistant(answer, used_retrieval));
                return Ok(TurnOutcome::Answered);
            }
        }
    }

    Err(PortError::ExhaustedRounds)
}

/// The fixed-format notice emitted for tools that are never really dispatched.
fn simulated_action_notice(call: &ToolCall) -> String {
    let args = serde_json::Value::Object(call.args.clone()).to_string();
    format!(
        "Action acknowledged. `{}` has been queued with arguments {}. \
         (Simulated; no external action was performed.)",
        call.name, args
    )
}

//=========================================================================================
// Tests
//=========================================================================================
