//! Multimodal image-to-diagram requests, one wire format per vendor.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::prompt;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Generation caps shared by both vendors.
const MAX_OUTPUT_TOKENS: u32 = 2000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn http_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| format!("Failed to create HTTP client: {e}"))
}

/// Vendor error bodies both reduce to an optional message.
#[derive(Deserialize)]
struct VendorError {
    message: Option<String>,
}

/// Relay the vendor-supplied message when there is one, else a generic label.
fn vendor_error_message(error: Option<VendorError>, fallback: &str) -> String {
    error
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

// --- OpenAI ---

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Option<Vec<OpenAiChoice>>,
    error: Option<VendorError>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

/// Chat-completions body: the system turn carries the full instruction set,
/// the user turn carries only the image as a data URL part.
fn openai_request_body(model: &str, image_base64: &str) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": prompt::IMAGE_SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": "Here is the image to convert:" },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{image_base64}") }
                    }
                ]
            }
        ],
        "max_tokens": MAX_OUTPUT_TOKENS,
        "temperature": 0
    })
}

fn extract_openai_text(body: OpenAiResponse) -> String {
    body.choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

pub(crate) async fn openai_generate(
    model: &str,
    api_key: &str,
    image_base64: &str,
) -> Result<String, String> {
    let client = http_client()?;
    let response = client
        .post(OPENAI_CHAT_URL)
        .bearer_auth(api_key)
        .json(&openai_request_body(model, image_base64))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    let status = response.status();
    let body: OpenAiResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse response: {e}"))?;

    if !status.is_success() || body.error.is_some() {
        return Err(vendor_error_message(body.error, "OpenAI API error"));
    }

    Ok(extract_openai_text(body))
}

// --- Gemini ---

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<VendorError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

/// generateContent body: Gemini has no system role here, so the prompt text
/// rides in the user parts next to the inline image data.
fn gemini_request_body(image_base64: &str) -> serde_json::Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [
                    { "text": prompt::IMAGE_SYSTEM_PROMPT },
                    { "inlineData": { "mimeType": "image/jpeg", "data": image_base64 } }
                ]
            }
        ],
        "generationConfig": { "temperature": 0, "maxOutputTokens": MAX_OUTPUT_TOKENS }
    })
}

fn gemini_url(model: &str, api_key: &str) -> String {
    format!("{GEMINI_BASE_URL}/{model}:generateContent?key={api_key}")
}

fn extract_gemini_text(body: GeminiResponse) -> String {
    body.candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .and_then(|parts| parts.into_iter().next())
        .and_then(|part| part.text)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

pub(crate) async fn gemini_generate(
    model: &str,
    api_key: &str,
    image_base64: &str,
) -> Result<String, String> {
    let client = http_client()?;
    let response = client
        .post(gemini_url(model, api_key))
        .json(&gemini_request_body(image_base64))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    let status = response.status();
    let body: GeminiResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse response: {e}"))?;

    if !status.is_success() || body.error.is_some() {
        return Err(vendor_error_message(body.error, "Gemini API error"));
    }

    Ok(extract_gemini_text(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_body_shape() {
        let body = openai_request_body("gpt-4.1", "QUJD");
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["temperature"], 0);
        assert_eq!(body["max_tokens"], 2000);
        let url = body["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert_eq!(url, "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn gemini_body_shape() {
        let body = gemini_request_body("QUJD");
        let parts = &body["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("Mermaid"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "QUJD");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2000);
    }

    #[test]
    fn gemini_url_embeds_model_and_key() {
        let url = gemini_url("gemini-2.0-flash", "AIzaKey");
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=AIzaKey"
        );
    }

    #[test]
    fn openai_success_extraction() {
        let body: OpenAiResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"  flowchart TD\n    A --> B  "}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_openai_text(body), "flowchart TD\n    A --> B");
    }

    #[test]
    fn openai_missing_content_is_empty() {
        let body: OpenAiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_openai_text(body), "");
    }

    #[test]
    fn gemini_success_extraction() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"graph LR\n    A --> B"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_gemini_text(body), "graph LR\n    A --> B");
    }

    #[test]
    fn vendor_message_passes_through_unmodified() {
        let body: OpenAiResponse = serde_json::from_str(
            r#"{"error":{"message":"Incorrect API key provided: sk-***"}}"#,
        )
        .unwrap();
        assert_eq!(
            vendor_error_message(body.error, "OpenAI API error"),
            "Incorrect API key provided: sk-***"
        );
    }

    #[test]
    fn missing_vendor_message_falls_back() {
        let body: GeminiResponse = serde_json::from_str(r#"{"error":{}}"#).unwrap();
        assert_eq!(
            vendor_error_message(body.error, "Gemini API error"),
            "Gemini API error"
        );
    }
}
