pub mod live;
pub mod zoom;

use serde::{Deserialize, Serialize};

// --- Vendors ---

/// The external AI provider, selected via the model name prefix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Vendor {
    OpenAi,
    Gemini,
}

impl Vendor {
    /// Resolve the vendor from a model identifier ("gpt-4.1" → OpenAi,
    /// "gemini-2.0-flash" → Gemini).
    pub fn from_model(model: &str) -> Result<Vendor, String> {
        if model.starts_with("gpt-") {
            Ok(Vendor::OpenAi)
        } else if model.starts_with("gemini") {
            Ok(Vendor::Gemini)
        } else {
            Err("Unsupported model selected.".to_string())
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Vendor::OpenAi => "OpenAI",
            Vendor::Gemini => "Gemini",
        }
    }
}

/// Whether two model identifiers share a vendor prefix ("gpt-4.1" and
/// "gpt-4.1-mini" do, "gpt-4.1" and "gemini-2.0-flash" don't). Decides if a
/// stored API key survives a model switch.
pub fn same_vendor_prefix(a: &str, b: &str) -> bool {
    let prefix = |m: &str| m.split('-').next().unwrap_or("").to_string();
    prefix(a) == prefix(b)
}

/// Check a key against the vendor's format convention: OpenAI keys start
/// with "sk-", Gemini keys never do.
pub fn validate_api_key(vendor: Vendor, key: &str) -> Result<(), String> {
    match vendor {
        Vendor::OpenAi if !key.starts_with("sk-") => {
            Err("Invalid API key format for GPT models (expected 'sk-').".to_string())
        }
        Vendor::Gemini if key.starts_with("sk-") => {
            Err("Invalid API key for Gemini models (should not start with 'sk-').".to_string())
        }
        _ => Ok(()),
    }
}

// --- Mermaid source ---

/// Strip markdown code fences from an AI reply. Removes ```mermaid tags
/// (any case, plus the whitespace that follows them) and bare ``` fences,
/// then trims the result.
pub fn strip_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i..].starts_with("```") {
            i += 3;
            let tagged = raw[i..]
                .get(..7)
                .map_or(false, |tag| tag.eq_ignore_ascii_case("mermaid"));
            if tagged {
                i += 7;
                while let Some(c) = raw[i..].chars().next() {
                    if !c.is_whitespace() {
                        break;
                    }
                    i += c.len_utf8();
                }
            }
            continue;
        }
        if let Some(c) = raw[i..].chars().next() {
            out.push(c);
            i += c.len_utf8();
        }
    }
    out.trim().to_string()
}

/// Diagram headers that mark a started Mermaid source.
const DIAGRAM_HEADERS: [&str; 3] = ["flowchart", "graph", "sequenceDiagram"];

pub fn is_diagram_started(code: &str) -> bool {
    let trimmed = code.trim_start();
    DIAGRAM_HEADERS.iter().any(|h| trimmed.starts_with(h))
}

/// Allocate the next palette node id by scanning existing `N<number>` ids,
/// so ids stay unique after manual edits or AI rewrites.
pub fn next_node_id(code: &str) -> String {
    let max = code
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter_map(|tok| tok.strip_prefix('N').and_then(|n| n.parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    format!("N{}", max + 1)
}

// --- Node palette ---

/// Flowchart node shapes offered by the palette, each with a hard-coded
/// Mermaid syntax template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    Process,
    Decision,
    Terminator,
    Io,
    Subroutine,
    Database,
    Note,
}

impl NodeShape {
    pub fn from_name(name: &str) -> Result<NodeShape, String> {
        match name.trim().to_ascii_lowercase().as_str() {
            "process" => Ok(NodeShape::Process),
            "decision" => Ok(NodeShape::Decision),
            "terminator" => Ok(NodeShape::Terminator),
            "io" => Ok(NodeShape::Io),
            "subroutine" => Ok(NodeShape::Subroutine),
            "database" => Ok(NodeShape::Database),
            "note" => Ok(NodeShape::Note),
            other => Err(format!("Unknown node shape: {}", other)),
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            NodeShape::Process => "Process",
            NodeShape::Decision => "Decision",
            NodeShape::Terminator => "Terminator",
            NodeShape::Io => "Io",
            NodeShape::Subroutine => "Subroutine",
            NodeShape::Database => "Database",
            NodeShape::Note => "Note",
        }
    }

    /// Render the Mermaid syntax for a node of this shape.
    pub fn render(&self, id: &str, label: &str) -> String {
        match self {
            NodeShape::Process => format!("{}[\"{}\"]", id, label),
            NodeShape::Decision => format!("{}{{{}}}", id, label),
            NodeShape::Terminator => format!("{}([{}])", id, label),
            NodeShape::Io => format!("{}[/{}/]", id, label),
            NodeShape::Subroutine | NodeShape::Database => format!("{}[({})]", id, label),
            // Notes need a node to attach to, so the template carries its own
            // attachment point.
            NodeShape::Note => format!(
                "{id}[Note attachment point]\n    note right of {id} : {label}",
                id = id,
                label = label
            ),
        }
    }
}

/// Result of inserting a palette node into the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedNode {
    pub code: String,
    pub node_id: String,
}

/// Insert a new palette node, initializing `flowchart TD` when the source has
/// no diagram header yet. The node line lands directly after the header line
/// so connection lines stay below the nodes they reference.
pub fn insert_node(code: &str, shape: NodeShape, label: &str) -> InsertedNode {
    let current = code.trim();
    let base = if is_diagram_started(current) {
        current.to_string()
    } else {
        "flowchart TD".to_string()
    };
    let node_id = next_node_id(&base);
    let node_line = shape.render(&node_id, label);
    let code = match base.find('\n') {
        None => format!("{}\n    {}", base, node_line),
        Some(i) => format!("{}    {}\n{}", &base[..i + 1], node_line, &base[i + 1..]),
    };
    InsertedNode { code, node_id }
}

/// Render a connection line, labeled or plain.
pub fn connection_line(source: &str, target: &str, label: Option<&str>) -> String {
    match label {
        Some(l) if !l.trim().is_empty() => format!("{} -- \"{}\" --> {}", source, l, target),
        _ => format!("{} --> {}", source, target),
    }
}

/// Append a connection to the source. Errors when no diagram is started yet.
pub fn add_connection(
    code: &str,
    source: &str,
    target: &str,
    label: Option<&str>,
) -> Result<String, String> {
    let current = code.trim();
    if !is_diagram_started(current) {
        return Err("Start a diagram first (e.g. drag a node).".to_string());
    }
    Ok(format!(
        "{}\n    {}",
        current,
        connection_line(source, target, label)
    ))
}

// --- Export naming ---

/// Export stem used before any image has been uploaded.
pub const DEFAULT_FILE_STEM: &str = "diagram";

/// Derive the export stem from an uploaded file name ("flow.png" → "flow").
pub fn file_stem(file_name: &str) -> String {
    match file_name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => DEFAULT_FILE_STEM.to_string(),
    }
}

pub fn export_file_name(stem: &str, ext: &str) -> String {
    format!("{}.{}", stem, ext)
}

/// Exact payload of an `.mmd` export: the trimmed source.
pub fn mmd_payload(code: &str) -> String {
    code.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_from_model_prefixes() {
        assert_eq!(Vendor::from_model("gpt-4.1").unwrap(), Vendor::OpenAi);
        assert_eq!(Vendor::from_model("gpt-4.1-mini").unwrap(), Vendor::OpenAi);
        assert_eq!(
            Vendor::from_model("gemini-2.0-flash").unwrap(),
            Vendor::Gemini
        );
        assert_eq!(
            Vendor::from_model("claude-3").unwrap_err(),
            "Unsupported model selected."
        );
    }

    #[test]
    fn vendor_prefix_comparison() {
        assert!(same_vendor_prefix("gpt-4.1", "gpt-4.1-mini"));
        assert!(same_vendor_prefix("gemini-2.0-flash", "gemini-1.5-pro"));
        assert!(!same_vendor_prefix("gpt-4.1", "gemini-2.0-flash"));
    }

    #[test]
    fn api_key_format_rules() {
        assert!(validate_api_key(Vendor::OpenAi, "sk-abc123").is_ok());
        assert!(validate_api_key(Vendor::OpenAi, "AIzaSyAbc").is_err());
        assert!(validate_api_key(Vendor::Gemini, "AIzaSyAbc").is_ok());
        assert!(validate_api_key(Vendor::Gemini, "sk-abc123").is_err());
    }

    #[test]
    fn strips_mermaid_fences() {
        let raw = "```mermaid\nflowchart TD\n    A --> B\n```";
        assert_eq!(strip_fences(raw), "flowchart TD\n    A --> B");
    }

    #[test]
    fn strips_fences_case_insensitively() {
        let raw = "```Mermaid\ngraph LR\n    A --> B\n```\n";
        assert_eq!(strip_fences(raw), "graph LR\n    A --> B");
    }

    #[test]
    fn strips_bare_fences() {
        let raw = "```\nflowchart TD\n    A --> B\n```";
        assert_eq!(strip_fences(raw), "flowchart TD\n    A --> B");
    }

    #[test]
    fn unfenced_input_only_gets_trimmed() {
        assert_eq!(strip_fences("  flowchart TD\n    A --> B  "), "flowchart TD\n    A --> B");
    }

    #[test]
    fn fenced_reply_with_prose_keeps_only_trimmed_text() {
        let raw = "Here you go:\n```mermaid\nflowchart TD\n```";
        assert_eq!(strip_fences(raw), "Here you go:\nflowchart TD");
    }

    #[test]
    fn diagram_header_detection() {
        assert!(is_diagram_started("flowchart TD\n    A --> B"));
        assert!(is_diagram_started("  graph LR"));
        assert!(is_diagram_started("sequenceDiagram\n    A->>B: hi"));
        assert!(!is_diagram_started("just some text"));
        assert!(!is_diagram_started(""));
    }

    #[test]
    fn node_ids_scan_existing_source() {
        assert_eq!(next_node_id(""), "N1");
        assert_eq!(next_node_id("flowchart TD\n    N1[\"A\"]\n    N3{B}"), "N4");
        // ids inside labels don't confuse the scan
        assert_eq!(next_node_id("flowchart TD\n    Start[\"No ids here\"]"), "N1");
    }

    #[test]
    fn consecutive_notes_get_distinct_attachment_points() {
        let first = insert_node("", NodeShape::Note, "first");
        let second = insert_node(&first.code, NodeShape::Note, "second");
        assert_ne!(first.node_id, second.node_id);
    }

    #[test]
    fn shape_templates() {
        assert_eq!(NodeShape::Process.render("N1", "Load"), "N1[\"Load\"]");
        assert_eq!(NodeShape::Decision.render("N2", "Valid?"), "N2{Valid?}");
        assert_eq!(NodeShape::Terminator.render("N3", "Start"), "N3([Start])");
        assert_eq!(NodeShape::Io.render("N4", "Read"), "N4[/Read/]");
        assert_eq!(NodeShape::Database.render("N5", "Users"), "N5[(Users)]");
    }

    #[test]
    fn insert_node_initializes_empty_source() {
        let inserted = insert_node("", NodeShape::Process, "First");
        assert_eq!(inserted.node_id, "N1");
        assert_eq!(inserted.code, "flowchart TD\n    N1[\"First\"]");
    }

    #[test]
    fn insert_node_lands_after_header() {
        let code = "flowchart TD\n    N1[\"A\"]\n    N1 --> N2";
        let inserted = insert_node(code, NodeShape::Decision, "Check");
        assert_eq!(inserted.node_id, "N3");
        assert_eq!(
            inserted.code,
            "flowchart TD\n    N3{Check}\n    N1[\"A\"]\n    N1 --> N2"
        );
    }

    #[test]
    fn insert_node_replaces_non_diagram_text() {
        let inserted = insert_node("scratch notes", NodeShape::Process, "A");
        assert!(inserted.code.starts_with("flowchart TD\n"));
    }

    #[test]
    fn connection_lines() {
        assert_eq!(connection_line("N1", "N2", None), "N1 --> N2");
        assert_eq!(
            connection_line("N1", "N2", Some("yes")),
            "N1 -- \"yes\" --> N2"
        );
        assert_eq!(connection_line("N1", "N2", Some("  ")), "N1 --> N2");
    }

    #[test]
    fn add_connection_requires_started_diagram() {
        assert!(add_connection("", "N1", "N2", None).is_err());
        let code = add_connection("flowchart TD\n    N1[\"A\"]", "N1", "N2", Some("ok")).unwrap();
        assert!(code.ends_with("    N1 -- \"ok\" --> N2"));
    }

    #[test]
    fn export_naming() {
        assert_eq!(file_stem("flow.png"), "flow");
        assert_eq!(file_stem("archive.tar.gz"), "archive");
        assert_eq!(file_stem(""), DEFAULT_FILE_STEM);
        assert_eq!(export_file_name("flow", "mmd"), "flow.mmd");
    }

    #[test]
    fn mmd_payload_is_trimmed_source() {
        assert_eq!(mmd_payload("  flowchart TD\n    A --> B\n\n"), "flowchart TD\n    A --> B");
    }
}
