//! services/assistant/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini completion endpoint.
//! It implements the `CompletionService` port from the `core` crate, speaking
//! the `generateContent` wire protocol over plain HTTP and wrapping every
//! logical request in the retry-with-backoff envelope.

const SYSTEM_INSTRUCTION: &str = r#"You are 'Nexus', a highly professional, proactive, and confidential AI assistant.

ROLE: Your primary function is to manage tasks, summarize technical documents,
and execute actions via the provided tools. You must prioritize efficiency
and clarity in all responses. You have access to a tool that searches the
user's private document store. You MUST use the 'retrieve_document_context'
tool whenever a query requires looking up specific details from the user's
documents. You may draft emails with the 'send_email' tool when asked.

TONE: Formal, succinct, and always helpful. Do not use emojis, unnecessary
pleasantries, or excessive enthusiasm. Get straight to the point.

CONFIDENTIALITY: All information provided to you, especially the contents of
the private document store, is strictly confidential.

ACTIONS: When asked to perform a task, acknowledge the request and confirm the
action you will take."#;

const GENERATION_TEMPERATURE: f64 = 0.3;

use async_trait::async_trait;
use nexus_core::domain::{
    ContextPart, ContextRole, ModelReply, ModelRequest, ToolCall, RETRIEVAL_TOOL, SEND_EMAIL_TOOL,
};
use nexus_core::ports::{CompletionService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::retry::{random_jitter, retry_with_backoff, RetryPolicy};

//=========================================================================================
// Wire Types (generateContent request/response shapes)
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    function_declarations: Option<Vec<WireFunctionDeclaration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
struct WireFunctionDeclaration {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    tools: Vec<WireTool>,
    system_instruction: WireContent,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<WireContent>,
}

/// The fixed declared tool set exposed to the model on every round.
fn declared_tools() -> Vec<WireFunctionDeclaration> {
    vec![
        WireFunctionDeclaration {
            name: RETRIEVAL_TOOL,
            description: "Searches the user's private document store for documents \
                          matching the query and returns their content.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Keywords to look up in the document store."
                    }
                },
                "required": ["query"]
            }),
        },
        WireFunctionDeclaration {
            name: SEND_EMAIL_TOOL,
            description: "Drafts and queues an email on behalf of the user.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "recipient": { "type": "string" },
                    "subject": { "type": "string" },
                    "body": { "type": "string" }
                },
                "required": ["recipient", "subject", "body"]
            }),
        },
    ]
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `CompletionService` port against a Gemini
/// `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiCompletionAdapter {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    policy: RetryPolicy,
}

impl GeminiCompletionAdapter {
    /// Creates a new adapter with the default transport retry policy.
    pub fn new(base_url: String, model: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            api_key,
            policy: RetryPolicy::transport_default(),
        }
    }

    /// Overrides the retry policy (used to shorten delays in tests).
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn build_request(request: &ModelRequest) -> GenerateContentRequest {
        let contents = request.entries.iter().map(to_wire_content).collect();

        let mut tools = vec![WireTool {
            function_declarations: Some(declared_tools()),
            google_search: None,
        }];
        if request.search_grounding {
            tools.push(WireTool {
                function_declarations: None,
                google_search: Some(json!({})),
            });
        }

        GenerateContentRequest {
            contents,
            tools,
            system_instruction: WireContent {
                role: None,
                parts: vec![WirePart {
                    text: Some(SYSTEM_INSTRUCTION.to_string()),
                    ..WirePart::default()
                }],
            },
            generation_config: WireGenerationConfig {
                temperature: GENERATION_TEMPERATURE,
            },
        }
    }

    /// Classifies the first content part of the first candidate.
    fn parse_reply(response: GenerateContentResponse) -> PortResult<ModelReply> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| PortError::MalformedReply("response carried no candidates".into()))?;
        let part = candidate
            .content
            .and_then(|content| content.parts.into_iter().next())
            .ok_or_else(|| PortError::MalformedReply("candidate carried no parts".into()))?;

        if let Some(call) = part.function_call {
            return Ok(ModelReply::ToolCall(ToolCall {
                name: call.name,
                args: call.args,
            }));
        }
        if let Some(text) = part.text {
            return Ok(ModelReply::Text(text));
        }
        Err(PortError::MalformedReply(
            "part is neither text nor a function call".into(),
        ))
    }
}

fn to_wire_content(entry: &nexus_core::domain::ContextEntry) -> WireContent {
    let role = match entry.role {
        ContextRole::User => "user",
        ContextRole::Model => "model",
        ContextRole::Tool => "tool",
    };
    let part = match &entry.part {
        ContextPart::Text(text) => WirePart {
            text: Some(text.clone()),
            ..WirePart::default()
        },
        ContextPart::FunctionCall(call) => WirePart {
            function_call: Some(WireFunctionCall {
                name: call.name.clone(),
                args: call.args.clone(),
            }),
            ..WirePart::default()
        },
        ContextPart::FunctionResponse { name, content } => WirePart {
            function_response: Some(WireFunctionResponse {
                name: name.clone(),
                response: json!({ "content": content }),
            }),
            ..WirePart::default()
        },
    };
    WireContent {
        role: Some(role.to_string()),
        parts: vec![part],
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for GeminiCompletionAdapter {
    async fn generate(&self, request: ModelRequest) -> PortResult<ModelReply> {
        let body = Self::build_request(&request);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let jitter = random_jitter(self.policy.jitter_ceiling);
        let response = retry_with_backoff(&self.policy, jitter, |attempt| {
            let client = self.client.clone();
            let url = url.clone();
            let api_key = self.api_key.clone();
            let body = body.clone();
            async move {
                debug!("Completion request attempt {}", attempt + 1);
                let response = client
                    .post(&url)
                    .header("x-goog-api-key", &api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| PortError::Transport(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(PortError::Transport(format!(
                        "completion endpoint returned {}",
                        status
                    )));
                }

                // The body is parsed only after a success status.
                response
                    .json::<GenerateContentResponse>()
                    .await
                    .map_err(|e| PortError::Transport(e.to_string()))
            }
        })
        .await?;

        Self::parse_reply(response)
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::domain::ContextEntry;

    fn request_with(entries: Vec<ContextEntry>, search: bool) -> Value {
        let request = ModelRequest {
            entries,
            search_grounding: search,
        };
        serde_json::to_value(GeminiCompletionAdapter::build_request(&request))
            .expect("request must serialize")
    }

    #[test]
    fn request_carries_persona_tools_and_temperature() {
        let body = request_with(vec![ContextEntry::user("hello")], false);

        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Nexus"));
        assert_eq!(body["generationConfig"]["temperature"], json!(0.3));

        let declarations = body["tools"][0]["functionDeclarations"]
            .as_array()
            .unwrap();
        let names: Vec<&str> = declarations
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec![RETRIEVAL_TOOL, SEND_EMAIL_TOOL]);
    }

    #[test]
    fn search_grounding_adds_a_second_tool_entry() {
        let body = request_with(vec![ContextEntry::user("hello")], true);
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools[1]["googleSearch"].is_object());

        let without = request_with(vec![ContextEntry::user("hello")], false);
        assert_eq!(without["tools"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn context_roles_map_to_protocol_roles() {
        let call = ToolCall {
            name: RETRIEVAL_TOOL.to_string(),
            args: json!({ "query": "Q4" }).as_object().unwrap().clone(),
        };
        let body = request_with(
            vec![
                ContextEntry::user("question"),
                ContextEntry::model_text("earlier answer"),
                ContextEntry::model_call(call),
                ContextEntry::tool_response(RETRIEVAL_TOOL, "## Q4 Goals\nbudget"),
            ],
            false,
        );
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "model");
        assert_eq!(
            contents[2]["parts"][0]["functionCall"]["args"]["query"],
            "Q4"
        );
        assert_eq!(contents[3]["role"], "tool");
        assert_eq!(
            contents[3]["parts"][0]["functionResponse"]["response"]["content"],
            "## Q4 Goals\nbudget"
        );
    }

    fn parse(value: Value) -> PortResult<ModelReply> {
        let response: GenerateContentResponse =
            serde_json::from_value(value).expect("response must deserialize");
        GeminiCompletionAdapter::parse_reply(response)
    }

    #[test]
    fn text_part_parses_as_final_text() {
        let reply = parse(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "Done." }] } }]
        }))
        .unwrap();
        assert_eq!(reply, ModelReply::Text("Done.".to_string()));
    }

    #[test]
    fn function_call_part_parses_as_tool_call() {
        let reply = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "functionCall": { "name": "retrieve_document_context", "args": { "query": "roadmap" } } }
            ] } }]
        }))
        .unwrap();
        match reply {
            ModelReply::ToolCall(call) => {
                assert_eq!(call.name, RETRIEVAL_TOOL);
                assert_eq!(call.str_arg("query"), Some("roadmap"));
            }
            other => panic!("expected a tool call, got {other:?}"),
        }
    }

    #[test]
    fn missing_candidate_is_a_malformed_reply() {
        let result = parse(json!({ "candidates": [] }));
        assert!(matches!(result, Err(PortError::MalformedReply(_))));

        let result = parse(json!({}));
        assert!(matches!(result, Err(PortError::MalformedReply(_))));
    }

    #[test]
    fn part_without_text_or_call_is_a_malformed_reply() {
        let result = parse(json!({
            "candidates": [{ "content": { "parts": [{}] } }]
        }));
        assert!(matches!(result, Err(PortError::MalformedReply(_))));
    }

    #[test]
    fn only_the_first_part_of_the_first_candidate_is_dispatched() {
        let reply = parse(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "first" }, { "text": "second" }] } },
                { "content": { "parts": [{ "text": "other candidate" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(reply, ModelReply::Text("first".to_string()));
    }
}
