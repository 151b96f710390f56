use eventsource_stream::Eventsource;
use futures::{stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use chat_core::{Turn, TurnRole};

use crate::provider::{LLMError, LLMProvider, LLMStream, Result};
use crate::types::StreamFragment;

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request_body(
        &self,
        system_prompt: Option<&str>,
        turns: &[Turn],
        include_thoughts: bool,
    ) -> serde_json::Value {
        let contents: Vec<GeminiContent> = turns.iter().map(content_from_turn).collect();

        let mut body = serde_json::json!({
            "contents": contents,
        });

        if let Some(prompt) = system_prompt.filter(|p| !p.is_empty()) {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": prompt }],
            });
        }

        if include_thoughts {
            body["generationConfig"] = serde_json::json!({
                "thinkingConfig": { "includeThoughts": true },
            });
        }

        log::debug!("Request contents count: {}", turns.len());

        body
    }

    async fn post(&self, url: String, body: serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(LLMError::Api(format!("HTTP {}: {}", status, text)));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl LLMProvider for GeminiProvider {
    async fn chat_stream(
        &self,
        system_prompt: Option<&str>,
        turns: &[Turn],
        model: &str,
        include_thoughts: bool,
    ) -> Result<LLMStream> {
        let body = self.build_request_body(system_prompt, turns, include_thoughts);
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, model
        );

        let response = self.post(url, body).await?;

        let stream = response
            .bytes_stream()
            .eventsource()
            .map(|event| {
                let event = event.map_err(|e| LLMError::Stream(e.to_string()))?;
                let chunk: GenerateContentResponse =
                    serde_json::from_str(&event.data).map_err(LLMError::Json)?;
                Ok(parse_chunk(chunk))
            })
            .flat_map(|result: Result<Vec<StreamFragment>>| match result {
                Ok(fragments) => stream::iter(fragments.into_iter().map(Ok).collect::<Vec<_>>()),
                Err(e) => stream::iter(vec![Err(e)]),
            });

        Ok(Box::pin(stream))
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self.post(url, body).await?;
        let parsed: GenerateContentResponse = response.json().await?;

        let text = parse_chunk(parsed)
            .into_iter()
            .filter_map(|fragment| match fragment {
                StreamFragment::Text { content, .. } => Some(content),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(LLMError::Api("empty completion".to_string()));
        }
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPartOut>,
}

#[derive(Debug, Serialize)]
struct GeminiPartOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
    function_call: Option<serde_json::Value>,

    #[serde(rename = "functionResponse", skip_serializing_if = "Option::is_none")]
    function_response: Option<serde_json::Value>,

    #[serde(rename = "thoughtSignature", skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

fn content_from_turn(turn: &Turn) -> GeminiContent {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    };

    let part = if let Some(call) = &turn.function_call {
        GeminiPartOut {
            text: None,
            function_call: Some(call.clone()),
            function_response: None,
            thought_signature: turn.thought_signature.clone(),
        }
    } else if let Some(response) = &turn.function_response {
        GeminiPartOut {
            text: None,
            function_call: None,
            function_response: Some(response.clone()),
            thought_signature: None,
        }
    } else {
        GeminiPartOut {
            text: Some(turn.text.clone()),
            function_call: None,
            function_response: None,
            thought_signature: turn.thought_signature.clone(),
        }
    };

    GeminiContent {
        role,
        parts: vec![part],
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPartIn>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartIn {
    text: Option<String>,

    #[serde(default)]
    thought: bool,

    #[serde(rename = "thoughtSignature")]
    thought_signature: Option<String>,

    #[serde(rename = "functionCall")]
    function_call: Option<serde_json::Value>,

    #[serde(rename = "functionResponse")]
    function_response: Option<serde_json::Value>,
}

fn parse_chunk(chunk: GenerateContentResponse) -> Vec<StreamFragment> {
    let Some(content) = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
    else {
        return Vec::new();
    };

    content.parts.into_iter().filter_map(fragment_from_part).collect()
}

fn fragment_from_part(part: GeminiPartIn) -> Option<StreamFragment> {
    if let Some(payload) = part.function_call {
        return Some(StreamFragment::FunctionCall {
            payload,
            thought_signature: part.thought_signature,
        });
    }
    if let Some(payload) = part.function_response {
        return Some(StreamFragment::FunctionResponse { payload });
    }

    let text = part.text?;
    if text.is_empty() {
        return None;
    }
    if part.thought {
        Some(StreamFragment::Thought { content: text })
    } else {
        Some(StreamFragment::Text {
            content: text,
            thought_signature: part.thought_signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Vec<StreamFragment> {
        let chunk: GenerateContentResponse = serde_json::from_str(raw).expect("valid chunk");
        parse_chunk(chunk)
    }

    #[test]
    fn parses_text_parts() {
        let fragments = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello"},{"text":" there"}],"role":"model"}}]}"#,
        );
        assert_eq!(
            fragments,
            vec![
                StreamFragment::text("Hello"),
                StreamFragment::text(" there")
            ]
        );
    }

    #[test]
    fn flags_thought_parts_as_ephemeral() {
        let fragments = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"pondering","thought":true},{"text":"answer"}]}}]}"#,
        );
        assert_eq!(
            fragments,
            vec![
                StreamFragment::thought("pondering"),
                StreamFragment::text("answer")
            ]
        );
    }

    #[test]
    fn carries_thought_signature_on_text() {
        let fragments = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"answer","thoughtSignature":"sig-abc"}]}}]}"#,
        );
        assert_eq!(
            fragments,
            vec![StreamFragment::Text {
                content: "answer".to_string(),
                thought_signature: Some("sig-abc".to_string()),
            }]
        );
    }

    #[test]
    fn parses_function_call_parts() {
        let fragments = parse(
            r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"lookup","args":{"q":"tides"}}}]}}]}"#,
        );
        match &fragments[..] {
            [StreamFragment::FunctionCall { payload, .. }] => {
                assert_eq!(payload["name"], "lookup");
            }
            other => panic!("unexpected fragments: {:?}", other),
        }
    }

    #[test]
    fn empty_candidates_produce_no_fragments() {
        assert!(parse(r#"{"candidates":[]}"#).is_empty());
        assert!(parse(r#"{}"#).is_empty());
        assert!(parse(r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#).is_empty());
    }

    #[test]
    fn serializes_turns_with_signature_echo() {
        let turns = vec![
            Turn::user("hi"),
            Turn::model("hello").with_thought_signature("sig-1"),
            Turn::function_call(serde_json::json!({"name":"lookup"})),
            Turn::function_response(serde_json::json!({"name":"lookup","response":{}})),
        ];
        let provider = GeminiProvider::new("test-key");
        let body = provider.build_request_body(Some("be brief"), &turns, true);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(
            body["generationConfig"]["thinkingConfig"]["includeThoughts"],
            true
        );

        let contents = body["contents"].as_array().expect("contents");
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["parts"][0]["thoughtSignature"], "sig-1");
        assert_eq!(contents[2]["parts"][0]["functionCall"]["name"], "lookup");
        assert_eq!(
            contents[3]["parts"][0]["functionResponse"]["name"],
            "lookup"
        );
    }
}
