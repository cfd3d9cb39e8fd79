use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use limner_core::Vendor;

/// Caps for edit replies — a rewritten flowchart, not an essay.
const EDIT_MAX_TOKENS: u32 = 1500;
const EDIT_TEMPERATURE: f32 = 0.2;

fn map_backend(vendor: Vendor) -> LLMBackend {
    match vendor {
        Vendor::OpenAi => LLMBackend::OpenAI,
        Vendor::Gemini => LLMBackend::Google,
    }
}

/// Run a text-only chat completion against the vendor behind the model.
pub async fn generate(
    vendor: Vendor,
    model: &str,
    api_key: &str,
    system: &str,
    user_msg: &str,
) -> Result<String, String> {
    let mut builder = LLMBuilder::new()
        .backend(map_backend(vendor))
        .model(model)
        .system(system)
        .temperature(EDIT_TEMPERATURE)
        .max_tokens(EDIT_MAX_TOKENS);

    if !api_key.is_empty() {
        builder = builder.api_key(api_key);
    }

    let llm = builder.build().map_err(|e| format!("build LLM: {e}"))?;

    let messages = vec![ChatMessage::user().content(user_msg).build()];

    let response = llm.chat(&messages).await.map_err(|e| format!("chat: {e}"))?;

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err("LLM returned empty text".to_string()),
        None => Err("LLM returned no text".to_string()),
    }
}
