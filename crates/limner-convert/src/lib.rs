pub mod engine;
mod prompt;
mod vision;

use limner_core::Vendor;

/// Convert an uploaded diagram image (base64) into Mermaid flowchart source.
/// Branches on the model's vendor prefix; the reply is fence-stripped before
/// it is returned.
pub async fn image_to_diagram(
    model: &str,
    api_key: &str,
    image_base64: &str,
) -> Result<String, String> {
    let vendor = Vendor::from_model(model)?;

    eprintln!("[limner-convert] converting image via {} ({})", vendor.label(), model);

    let raw = match vendor {
        Vendor::OpenAi => vision::openai_generate(model, api_key, image_base64).await?,
        Vendor::Gemini => vision::gemini_generate(model, api_key, image_base64).await?,
    };

    let code = limner_core::strip_fences(&raw);
    if code.is_empty() {
        return Err("No Mermaid code returned.".to_string());
    }
    Ok(code)
}

/// Apply a natural-language edit to existing Mermaid source via the vendor's
/// chat API. The model is instructed to return only updated code.
pub async fn edit_diagram(
    model: &str,
    api_key: &str,
    instruction: &str,
    current_code: &str,
) -> Result<String, String> {
    let vendor = Vendor::from_model(model)?;

    eprintln!("[limner-convert] editing via {} ({})", vendor.label(), model);

    let raw = engine::generate(
        vendor,
        model,
        api_key,
        prompt::EDIT_SYSTEM_PROMPT,
        &prompt::edit_user_message(current_code, instruction),
    )
    .await?;

    let code = limner_core::strip_fences(&raw);
    if code.is_empty() {
        return Err("AI returned no updated code.".to_string());
    }
    Ok(code)
}
