//! Ollama client for embeddings, expansion and chat
//!
//! Ollama's reply layouts have changed between versions, so each endpoint
//! decodes through an ordered list of shape matchers: the first layout that
//! matches wins, and a reply nothing matches is an `UnrecognizedShape` error.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::error::{Error, Result};
use crate::transport::ResilientClient;

/// One known reply layout: a name for logs and a matcher
type Shape<T> = (&'static str, fn(&Value) -> Option<T>);

/// Embedding layouts, in priority order
const EMBEDDING_SHAPES: &[Shape<Vec<f32>>] = &[
    ("embeddings", embeddings_field),
    ("embedding", embedding_field),
    ("[object]", first_object_embedding),
    ("[vector]", first_nested_vector),
    ("vector", bare_vector),
];

/// Chat layouts, in priority order
const CHAT_SHAPES: &[Shape<String>] = &[
    ("response", response_field),
    ("message", message_text),
    ("message.content", message_content),
    ("choices[0].message.content", openai_choice_content),
];

/// Generate layouts, in priority order; the raw payload is the terminal case
const GENERATE_SHAPES: &[Shape<String>] = &[("response", response_field), ("text", text_field)];

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

/// Ollama API client. Every call goes through the shared resilient client.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: ResilientClient,
    base_url: String,
    health_timeout: Duration,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(http: ResilientClient, config: &OllamaConfig, health_timeout: Duration) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            health_timeout,
        }
    }

    /// Base URL the client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Embed `text` with `model` into one flat vector
    pub async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embed", self.base_url);
        let reply = self
            .http
            .post_json(&url, &EmbedRequest { model, input: text })
            .await?;
        decode_embedding(&reply)
    }

    /// Single-prompt completion (non-streaming)
    pub async fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let reply = self
            .http
            .post_json(
                &url,
                &GenerateRequest {
                    model,
                    prompt,
                    stream: false,
                },
            )
            .await?;
        Ok(decode_generate(&reply))
    }

    /// System + user chat exchange (non-streaming)
    pub async fn chat(&self, system: &str, user: &str, model: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
        };
        let reply = self.http.post_json(&url, &request).await?;
        decode_chat(&reply)
    }

    /// Names of locally available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let reply = self.http.get_json(&url).await?;
        let names = reply
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    /// Ask Ollama to download `model`
    pub async fn pull_model(&self, model: &str) -> Result<()> {
        let url = format!("{}/api/pull", self.base_url);
        self.http
            .post_json(&url, &json!({ "model": model, "stream": false }))
            .await?;
        Ok(())
    }

    /// Make sure `model` is available, pulling it when it is not listed.
    /// A failed listing only warns; a failed pull is an error.
    pub async fn ensure_model(&self, model: &str) -> Result<()> {
        match self.list_models().await {
            Ok(names) if names.iter().any(|name| model_matches(name, model)) => {
                tracing::info!(model, "Ollama model already available");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(model, error = %e, "Could not list Ollama models"),
        }

        tracing::info!(model, "Pulling Ollama model, this may take several minutes");
        self.pull_model(model).await.map_err(|e| {
            tracing::error!(model, error = %e, "Failed to pull Ollama model");
            e
        })?;
        tracing::info!(model, "Ollama model pull completed");
        Ok(())
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        self.http.probe(&self.base_url, self.health_timeout).await
    }
}

/// `name` is `model` itself or its `:latest` tag
fn model_matches(name: &str, model: &str) -> bool {
    name == model || name.strip_suffix(":latest") == Some(model)
}

/// Normalize any known embedding reply into one flat vector
pub fn decode_embedding(reply: &Value) -> Result<Vec<f32>> {
    for (name, matcher) in EMBEDDING_SHAPES {
        if let Some(vector) = matcher(reply) {
            tracing::trace!(shape = name, dims = vector.len(), "decoded embedding");
            return Ok(vector);
        }
    }
    Err(Error::unrecognized_shape("embedding", describe(reply)))
}

/// Extract the answer from any known chat reply
pub fn decode_chat(reply: &Value) -> Result<String> {
    first_text(reply, CHAT_SHAPES).ok_or_else(|| Error::unrecognized_shape("chat", describe(reply)))
}

/// Extract generated text; falls back to the whole payload rendered as text
pub fn decode_generate(reply: &Value) -> String {
    first_text(reply, GENERATE_SHAPES).unwrap_or_else(|| match reply {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// First non-blank match; failing that, the first match even if blank
fn first_text(reply: &Value, shapes: &[Shape<String>]) -> Option<String> {
    shapes
        .iter()
        .find_map(|(_, m)| m(reply).filter(|s| !s.trim().is_empty()))
        .or_else(|| shapes.iter().find_map(|(_, m)| m(reply)))
}

fn flat_vector(items: &[Value]) -> Option<Vec<f32>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// A vector field holding either a flat vector or a list whose first entry is one
fn vector_field(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    match items.first()? {
        Value::Array(inner) => flat_vector(inner),
        _ => flat_vector(items),
    }
}

fn embeddings_field(reply: &Value) -> Option<Vec<f32>> {
    reply.get("embeddings").and_then(vector_field)
}

fn embedding_field(reply: &Value) -> Option<Vec<f32>> {
    reply.get("embedding").and_then(vector_field)
}

fn first_object_embedding(reply: &Value) -> Option<Vec<f32>> {
    let first = reply.as_array()?.first()?;
    embeddings_field(first).or_else(|| embedding_field(first))
}

fn first_nested_vector(reply: &Value) -> Option<Vec<f32>> {
    flat_vector(reply.as_array()?.first()?.as_array()?)
}

fn bare_vector(reply: &Value) -> Option<Vec<f32>> {
    flat_vector(reply.as_array()?)
}

fn response_field(reply: &Value) -> Option<String> {
    reply.get("response")?.as_str().map(str::to_string)
}

fn text_field(reply: &Value) -> Option<String> {
    reply.get("text")?.as_str().map(str::to_string)
}

fn message_text(reply: &Value) -> Option<String> {
    reply.get("message")?.as_str().map(str::to_string)
}

fn message_content(reply: &Value) -> Option<String> {
    reply
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

fn openai_choice_content(reply: &Value) -> Option<String> {
    reply
        .pointer("/choices/0/message/content")?
        .as_str()
        .map(str::to_string)
}

/// Short description of an unexpected reply for error messages
fn describe(reply: &Value) -> String {
    match reply {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_list_of_one_vector() {
        let reply = json!({"model": "nomic-embed-text", "embeddings": [[0.1, 0.2, 0.3]]});
        assert_eq!(decode_embedding(&reply).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn embedding_flat_field() {
        let reply = json!({"embedding": [1.0, 2.0]});
        assert_eq!(decode_embedding(&reply).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn empty_embeddings_falls_through_to_embedding() {
        let reply = json!({"embeddings": [], "embedding": [0.5]});
        assert_eq!(decode_embedding(&reply).unwrap(), vec![0.5]);
    }

    #[test]
    fn list_of_objects() {
        let reply = json!([{"embeddings": [[0.4, 0.6]]}]);
        assert_eq!(decode_embedding(&reply).unwrap(), vec![0.4, 0.6]);
    }

    #[test]
    fn top_level_list_of_vectors() {
        let reply = json!([[0.7, 0.8], [0.1, 0.2]]);
        assert_eq!(decode_embedding(&reply).unwrap(), vec![0.7, 0.8]);
    }

    #[test]
    fn bare_numeric_list() {
        let reply = json!([3, 4.5]);
        assert_eq!(decode_embedding(&reply).unwrap(), vec![3.0, 4.5]);
    }

    #[test]
    fn unknown_embedding_shape_is_an_error() {
        for reply in [json!({"data": [1.0]}), json!([]), json!(["a", "b"]), json!(null)] {
            let err = decode_embedding(&reply).unwrap_err();
            assert!(
                matches!(err, Error::UnrecognizedShape { service: "embedding", .. }),
                "{reply} should not decode"
            );
        }
    }

    #[test]
    fn chat_message_object() {
        let reply = json!({"model": "llama3.1:8b", "message": {"role": "assistant", "content": "X is Y."}, "done": true});
        assert_eq!(decode_chat(&reply).unwrap(), "X is Y.");
    }

    #[test]
    fn chat_response_field_wins() {
        let reply = json!({"response": "from response", "message": {"content": "from message"}});
        assert_eq!(decode_chat(&reply).unwrap(), "from response");
    }

    #[test]
    fn chat_message_string() {
        assert_eq!(decode_chat(&json!({"message": "plain"})).unwrap(), "plain");
    }

    #[test]
    fn chat_openai_choices() {
        let reply = json!({"choices": [{"message": {"role": "assistant", "content": "openai style"}}]});
        assert_eq!(decode_chat(&reply).unwrap(), "openai style");
    }

    #[test]
    fn blank_response_falls_through() {
        let reply = json!({"response": "", "message": {"content": "real answer"}});
        assert_eq!(decode_chat(&reply).unwrap(), "real answer");
    }

    #[test]
    fn unknown_chat_shape_is_an_error() {
        let err = decode_chat(&json!({"output": "x"})).unwrap_err();
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn generate_prefers_response_then_text_then_raw() {
        assert_eq!(decode_generate(&json!({"response": "r", "text": "t"})), "r");
        assert_eq!(decode_generate(&json!({"text": "t"})), "t");
        assert_eq!(decode_generate(&json!({"other": 1})), r#"{"other":1}"#);
    }

    #[test]
    fn latest_tag_counts_as_present() {
        assert!(model_matches("nomic-embed-text:latest", "nomic-embed-text"));
        assert!(model_matches("llama3.1:8b", "llama3.1:8b"));
        assert!(!model_matches("llama3.1:70b", "llama3.1:8b"));
    }
}
