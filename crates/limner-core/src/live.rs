//! Mermaid Live Editor handoff.
//!
//! mermaid.live reads its state from the URL fragment: a JSON payload,
//! deflated with pako and base64-encoded behind a `#pako:` marker.

use std::io::Write;

use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::Serialize;

/// Literal prefix of every Mermaid Live Editor link.
pub const LIVE_EDITOR_PREFIX: &str = "https://mermaid.live/edit#pako:";

#[derive(Serialize)]
struct LivePayload<'a> {
    code: &'a str,
    mermaid: MermaidConfig,
}

#[derive(Serialize)]
struct MermaidConfig {
    theme: &'static str,
}

/// Build a mermaid.live link for the given source. The payload is serialized
/// as JSON, deflated at maximum compression (zlib container, the format
/// `pako.deflate` emits at level 9) and base64-encoded.
pub fn live_editor_url(code: &str) -> Result<String, String> {
    let payload = LivePayload {
        code,
        mermaid: MermaidConfig { theme: "default" },
    };
    let json = serde_json::to_string(&payload).map_err(|e| e.to_string())?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(json.as_bytes())
        .map_err(|e| e.to_string())?;
    let deflated = encoder.finish().map_err(|e| e.to_string())?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(deflated);
    Ok(format!("{}{}", LIVE_EDITOR_PREFIX, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn decode_payload(url: &str) -> serde_json::Value {
        let encoded = url.strip_prefix(LIVE_EDITOR_PREFIX).unwrap();
        let deflated = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let mut decoder = flate2::read::ZlibDecoder::new(&deflated[..]);
        let mut json = String::new();
        decoder.read_to_string(&mut json).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn url_carries_the_pako_prefix() {
        let url = live_editor_url("flowchart TD\n    A --> B").unwrap();
        assert!(url.starts_with(LIVE_EDITOR_PREFIX));
    }

    #[test]
    fn payload_round_trips() {
        let code = "flowchart TD\n    A[\"Start\"] --> B{Done?}";
        let url = live_editor_url(code).unwrap();
        let payload = decode_payload(&url);
        assert_eq!(payload["code"], code);
        assert_eq!(payload["mermaid"]["theme"], "default");
    }
}
