use std::sync::{Arc, Mutex};

use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;

use limner_core::zoom::Zoom;
use limner_core::{InsertedNode, NodeShape, Vendor};

/// An uploaded diagram image, held in memory until the next upload or a
/// model switch discards it.
#[derive(Debug, Clone)]
struct UploadedImage {
    base64: String,
    file_stem: String,
}

/// Per-app session: the uploaded image, the selected model, the in-memory
/// API key (never written to disk) and the preview zoom.
#[derive(Debug)]
struct Session {
    image: Option<UploadedImage>,
    model: String,
    api_key: Option<String>,
    zoom: Zoom,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            image: None,
            model: "gpt-4.1".to_string(),
            api_key: None,
            zoom: Zoom::default(),
        }
    }
}

impl Session {
    fn set_image(&mut self, base64: String, file_name: &str) {
        self.image = Some(UploadedImage {
            base64,
            file_stem: limner_core::file_stem(file_name),
        });
    }

    /// Switch models. The uploaded image never survives a switch; the API
    /// key survives only when the vendor prefix is unchanged. Returns
    /// whether the key was retained.
    fn select_model(&mut self, model: String) -> bool {
        let retained =
            self.api_key.is_some() && limner_core::same_vendor_prefix(&self.model, &model);
        if !retained {
            self.api_key = None;
        }
        self.image = None;
        self.model = model;
        retained
    }

    fn file_stem(&self) -> String {
        self.image
            .as_ref()
            .map(|img| img.file_stem.clone())
            .unwrap_or_else(|| limner_core::DEFAULT_FILE_STEM.to_string())
    }

    /// Everything an image conversion needs. Fails before any network call
    /// when the image or key is missing or the key doesn't fit the vendor.
    fn conversion_input(&self) -> Result<(String, String, String), String> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| "Please upload an image first.".to_string())?;
        let (model, key) = self.edit_input()?;
        Ok((model, key, image.base64.clone()))
    }

    /// Model + validated key for requests that don't involve the image.
    fn edit_input(&self) -> Result<(String, String), String> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| "Missing API key.".to_string())?;
        let vendor = Vendor::from_model(&self.model)?;
        limner_core::validate_api_key(vendor, key)?;
        Ok((self.model.clone(), key.clone()))
    }
}

/// Managed state wrapping the session.
struct SessionState(Arc<Mutex<Session>>);

// --- Upload, model and key commands ---

#[tauri::command]
fn set_image(
    data: String,
    file_name: String,
    state: tauri::State<'_, SessionState>,
) -> Result<(), String> {
    if data.is_empty() {
        return Err("Missing image data.".to_string());
    }
    state.0.lock().unwrap().set_image(data, &file_name);
    Ok(())
}

#[tauri::command]
fn select_model(
    model: String,
    state: tauri::State<'_, SessionState>,
) -> Result<serde_json::Value, String> {
    // Reject unknown vendors up front so the session never holds a model
    // no request path can serve.
    Vendor::from_model(&model)?;
    let retained = state.0.lock().unwrap().select_model(model.clone());
    Ok(serde_json::json!({
        "model": model,
        "keyRetained": retained,
    }))
}

#[tauri::command]
fn set_api_key(key: String, state: tauri::State<'_, SessionState>) -> Result<(), String> {
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err("API Key cannot be empty.".to_string());
    }
    let mut session = state.0.lock().unwrap();
    let vendor = Vendor::from_model(&session.model)?;
    limner_core::validate_api_key(vendor, &key)?;
    session.api_key = Some(key);
    Ok(())
}

#[tauri::command]
fn clear_api_key(state: tauri::State<'_, SessionState>) -> Result<(), String> {
    state.0.lock().unwrap().api_key = None;
    Ok(())
}

#[tauri::command]
fn session_status(state: tauri::State<'_, SessionState>) -> Result<serde_json::Value, String> {
    let session = state.0.lock().unwrap();
    // Mask the API key — only report whether one is set
    Ok(serde_json::json!({
        "model": session.model,
        "hasKey": session.api_key.is_some(),
        "hasImage": session.image.is_some(),
        "fileStem": session.file_stem(),
        "zoom": session.zoom.level(),
    }))
}

// --- AI commands ---

#[tauri::command]
async fn generate_diagram(state: tauri::State<'_, SessionState>) -> Result<String, String> {
    let (model, key, image) = { state.0.lock().unwrap().conversion_input()? };

    match limner_convert::image_to_diagram(&model, &key, &image).await {
        Ok(code) => Ok(code),
        Err(e) => {
            // A failed request invalidates the stored key; the user re-enters
            // it on the next attempt.
            state.0.lock().unwrap().api_key = None;
            Err(e)
        }
    }
}

#[tauri::command]
async fn edit_diagram(
    prompt: String,
    current_code: String,
    state: tauri::State<'_, SessionState>,
) -> Result<String, String> {
    if current_code.trim().is_empty() {
        return Err("Please generate or enter Mermaid code first.".to_string());
    }
    if prompt.trim().is_empty() {
        return Err("Please enter a modification for the AI.".to_string());
    }

    let (model, key) = { state.0.lock().unwrap().edit_input()? };

    match limner_convert::edit_diagram(&model, &key, &prompt, &current_code).await {
        Ok(code) => Ok(code),
        Err(e) => {
            state.0.lock().unwrap().api_key = None;
            Err(e)
        }
    }
}

// --- Source editing commands ---

#[tauri::command]
fn insert_node(
    code: String,
    shape: String,
    label: Option<String>,
) -> Result<InsertedNode, String> {
    let shape = NodeShape::from_name(&shape)?;
    let label = label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| shape.default_label().to_string());
    Ok(limner_core::insert_node(&code, shape, &label))
}

#[tauri::command]
fn add_connection(
    code: String,
    source: String,
    target: String,
    label: Option<String>,
) -> Result<String, String> {
    limner_core::add_connection(&code, &source, &target, label.as_deref())
}

// --- Zoom commands ---

#[tauri::command]
fn zoom_in(state: tauri::State<'_, SessionState>) -> Result<f64, String> {
    Ok(state.0.lock().unwrap().zoom.zoom_in())
}

#[tauri::command]
fn zoom_out(state: tauri::State<'_, SessionState>) -> Result<f64, String> {
    Ok(state.0.lock().unwrap().zoom.zoom_out())
}

#[tauri::command]
fn zoom_reset(state: tauri::State<'_, SessionState>) -> Result<f64, String> {
    Ok(state.0.lock().unwrap().zoom.reset())
}

#[tauri::command]
fn zoom_fit(
    container_width: f64,
    svg_width: f64,
    state: tauri::State<'_, SessionState>,
) -> Result<f64, String> {
    state.0.lock().unwrap().zoom.fit(container_width, svg_width)
}

// --- Export commands ---

#[tauri::command]
fn live_editor_url(code: String) -> Result<String, String> {
    let code = code.trim();
    if code.is_empty() {
        return Err("No Mermaid code to open.".to_string());
    }
    limner_core::live::live_editor_url(code)
}

#[tauri::command]
fn open_live_editor(app: tauri::AppHandle, code: String) -> Result<String, String> {
    let url = live_editor_url(code)?;
    app.opener()
        .open_url(url.clone(), None::<&str>)
        .map_err(|e| e.to_string())?;
    Ok(url)
}

/// Ask for a destination via the save dialog and write the payload there.
/// Returns None when the user cancels.
fn save_payload(
    app: &tauri::AppHandle,
    file_name: &str,
    filter_name: &str,
    extensions: &[&str],
    bytes: Vec<u8>,
) -> Result<Option<String>, String> {
    let picked = app
        .dialog()
        .file()
        .set_file_name(file_name)
        .add_filter(filter_name, extensions)
        .blocking_save_file();

    let Some(path) = picked else {
        return Ok(None);
    };
    let path = path.into_path().map_err(|e| e.to_string())?;
    std::fs::write(&path, bytes).map_err(|e| e.to_string())?;
    Ok(Some(path.display().to_string()))
}

#[tauri::command]
async fn export_svg(
    app: tauri::AppHandle,
    svg: String,
    state: tauri::State<'_, SessionState>,
) -> Result<Option<String>, String> {
    if svg.trim().is_empty() {
        return Err("No diagram rendered to download.".to_string());
    }
    let stem = { state.0.lock().unwrap().file_stem() };
    save_payload(
        &app,
        &limner_core::export_file_name(&stem, "svg"),
        "SVG image",
        &["svg"],
        svg.into_bytes(),
    )
}

#[tauri::command]
async fn export_mmd(
    app: tauri::AppHandle,
    code: String,
    state: tauri::State<'_, SessionState>,
) -> Result<Option<String>, String> {
    let payload = limner_core::mmd_payload(&code);
    if payload.is_empty() {
        return Err("No Mermaid code to save.".to_string());
    }
    let stem = { state.0.lock().unwrap().file_stem() };
    save_payload(
        &app,
        &limner_core::export_file_name(&stem, "mmd"),
        "Mermaid source",
        &["mmd"],
        payload.into_bytes(),
    )
}

#[tauri::command]
async fn export_png(
    app: tauri::AppHandle,
    svg: String,
    state: tauri::State<'_, SessionState>,
) -> Result<Option<String>, String> {
    if svg.trim().is_empty() {
        return Err("No diagram rendered to download.".to_string());
    }
    let bytes = limner_export::svg_to_png(&svg, &limner_export::RasterOptions::default())
        .map_err(|e| e.to_string())?;
    let stem = { state.0.lock().unwrap().file_stem() };
    save_payload(
        &app,
        &limner_core::export_file_name(&stem, "png"),
        "PNG image",
        &["png"],
        bytes,
    )
}

#[tauri::command]
async fn export_jpeg(
    app: tauri::AppHandle,
    svg: String,
    state: tauri::State<'_, SessionState>,
) -> Result<Option<String>, String> {
    if svg.trim().is_empty() {
        return Err("No diagram rendered to download.".to_string());
    }
    let bytes = limner_export::svg_to_jpeg(&svg, &limner_export::RasterOptions::default())
        .map_err(|e| e.to_string())?;
    let stem = { state.0.lock().unwrap().file_stem() };
    save_payload(
        &app,
        &limner_core::export_file_name(&stem, "jpg"),
        "JPEG image",
        &["jpg", "jpeg"],
        bytes,
    )
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .manage(SessionState(Arc::new(Mutex::new(Session::default()))))
        .invoke_handler(tauri::generate_handler![
            set_image,
            select_model,
            set_api_key,
            clear_api_key,
            session_status,
            generate_diagram,
            edit_diagram,
            insert_node,
            add_connection,
            zoom_in,
            zoom_out,
            zoom_reset,
            zoom_fit,
            live_editor_url,
            open_live_editor,
            export_svg,
            export_mmd,
            export_png,
            export_jpeg,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_image_and_key() -> Session {
        let mut session = Session::default();
        session.set_image("aGVsbG8=".to_string(), "flow.png");
        session.api_key = Some("sk-test123".to_string());
        session
    }

    #[test]
    fn conversion_requires_an_image_before_anything_else() {
        let mut session = Session::default();
        session.api_key = Some("sk-test123".to_string());
        assert_eq!(
            session.conversion_input().unwrap_err(),
            "Please upload an image first."
        );
    }

    #[test]
    fn conversion_requires_a_key() {
        let mut session = Session::default();
        session.set_image("aGVsbG8=".to_string(), "flow.png");
        assert_eq!(session.conversion_input().unwrap_err(), "Missing API key.");
    }

    #[test]
    fn conversion_rejects_mismatched_key_format() {
        let mut session = session_with_image_and_key();
        session.api_key = Some("AIzaNotForGpt".to_string());
        assert!(session
            .conversion_input()
            .unwrap_err()
            .contains("expected 'sk-'"));
    }

    #[test]
    fn conversion_input_carries_session_fields() {
        let session = session_with_image_and_key();
        let (model, key, image) = session.conversion_input().unwrap();
        assert_eq!(model, "gpt-4.1");
        assert_eq!(key, "sk-test123");
        assert_eq!(image, "aGVsbG8=");
    }

    #[test]
    fn model_switch_always_clears_the_image() {
        let mut session = session_with_image_and_key();
        session.select_model("gpt-4.1-mini".to_string());
        assert!(session.image.is_none());
    }

    #[test]
    fn same_vendor_switch_retains_the_key() {
        let mut session = session_with_image_and_key();
        assert!(session.select_model("gpt-4.1-mini".to_string()));
        assert_eq!(session.api_key.as_deref(), Some("sk-test123"));
    }

    #[test]
    fn vendor_switch_clears_the_key() {
        let mut session = session_with_image_and_key();
        assert!(!session.select_model("gemini-2.0-flash".to_string()));
        assert!(session.api_key.is_none());
    }

    #[test]
    fn switch_without_a_key_reports_nothing_retained() {
        let mut session = Session::default();
        assert!(!session.select_model("gpt-4.1-mini".to_string()));
    }

    #[test]
    fn export_stem_follows_the_upload() {
        let mut session = Session::default();
        assert_eq!(session.file_stem(), "diagram");
        session.set_image("aGVsbG8=".to_string(), "invoice-flow.jpeg");
        assert_eq!(session.file_stem(), "invoice-flow");
    }
}
