//! Markdown codec: YAML header block, labeled `[[target]]` references, and a
//! generated link block.
//!
//! Parsing is line-oriented. The header block populates [`NodeMeta`], with
//! unknown fields carried through as serialized strings. Inline references
//! are extracted as edges and rewritten in the stored content to the display
//! form, so serialization rebuilds the link list from the edge list alone
//! and a parse of the serialized form reproduces an equivalent node.
//!
//! A malformed header block never escapes this module: the whole input
//! becomes the body and the title falls back to the first heading line.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value as YamlValue;

use crate::{
    codec::{DISPLAY_CLOSE, DISPLAY_OPEN},
    properties::{Edge, Node, NodeId, NodeMeta, Position},
};

const HEADER_FENCE: &str = "---";
const LINK_SEPARATOR: &str = "-----------------";
const LINKS_HEADER: &str = "_Links:_";

static WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("wikilink pattern is valid"));
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#+\s*(.+)$").expect("heading pattern is valid"));

/// Parse raw document text into a [`Node`]. All extracted edges are
/// unresolved; resolution against the graph's id set happens during delta
/// computation.
pub fn parse_document(raw: &str, id: &NodeId) -> Node {
    let (header, body) = split_header(raw, id);

    let mut content_lines: Vec<String> = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut in_link_block = false;

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed == LINK_SEPARATOR {
            in_link_block = true;
            continue;
        }
        if in_link_block {
            if trimmed == LINKS_HEADER || trimmed.is_empty() {
                continue;
            }
            extract_line_references(line, &mut edges, None);
            continue;
        }
        match extract_line_references(line, &mut edges, Some(String::new())) {
            Some(rewritten) => content_lines.push(rewritten),
            None => content_lines.push(line.to_string()),
        }
    }

    // Trimmed on both ends so serialize-then-parse converges instead of
    // accumulating blank lines around the body.
    let content = content_lines.join("\n").trim().to_string();
    let mut meta = header;
    if meta.title.is_empty() {
        meta.title = derive_title(&content)
            .unwrap_or_else(|| id.stem().to_string());
    }

    Node {
        id: id.clone(),
        content,
        edges,
        meta,
    }
}

/// Serialize a node back to document text. Links are regenerated from the
/// edge list; the stored content's display markers are written as-is.
pub fn serialize_node(node: &Node) -> String {
    let mut out = String::new();
    out.push_str(HEADER_FENCE);
    out.push('\n');
    out.push_str(&header_yaml(&node.meta));
    out.push_str(HEADER_FENCE);
    out.push_str("\n\n");
    out.push_str(&node.content);
    out.push('\n');

    if !node.edges.is_empty() {
        out.push('\n');
        out.push_str(LINK_SEPARATOR);
        out.push('\n');
        out.push_str(LINKS_HEADER);
        out.push('\n');
        for edge in &node.edges {
            if edge.label.is_empty() {
                out.push_str(&format!("- [[{}]]\n", edge.reference));
            } else {
                out.push_str(&format!("- {} [[{}]]\n", edge.label, edge.reference));
            }
        }
    }
    out
}

/// Derive a title from the first markdown heading line, if any.
pub fn derive_title(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        HEADING_RE
            .captures(line.trim())
            .map(|c| c[1].trim().to_string())
    })
}

/// Extract `[[target]]` references from one line, pushing an [`Edge`] per
/// occurrence. Label text is whatever precedes the reference on the line,
/// bounded by the previous reference, with bullets and display markers
/// removed. When `rewrite` is set, returns the line with each reference
/// replaced by its display form.
fn extract_line_references(
    line: &str,
    edges: &mut Vec<Edge>,
    rewrite: Option<String>,
) -> Option<String> {
    let mut rewritten = rewrite;
    let mut previous_end = 0usize;
    let mut found = false;

    for caps in WIKILINK_RE.captures_iter(line) {
        found = true;
        let whole = caps.get(0).expect("capture 0 always present");
        let reference = caps[1].trim().to_string();
        let label = clean_label(&line[previous_end..whole.start()]);
        if let Some(out) = rewritten.as_mut() {
            out.push_str(&line[previous_end..whole.start()]);
            out.push(DISPLAY_OPEN);
            out.push_str(&reference);
            out.push(DISPLAY_CLOSE);
        }
        previous_end = whole.end();
        edges.push(Edge::unresolved(reference, label));
    }

    match rewritten {
        Some(mut out) if found => {
            out.push_str(&line[previous_end..]);
            Some(out)
        }
        _ => None,
    }
}

fn clean_label(text: &str) -> String {
    let trimmed = text.trim();
    let without_bullet = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix('-').filter(|_| trimmed == "-"))
        .or_else(|| trimmed.strip_prefix("* "))
        .unwrap_or(trimmed);
    without_bullet
        .chars()
        .filter(|c| *c != DISPLAY_OPEN && *c != DISPLAY_CLOSE)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split a leading YAML header block from the body. Returns default metadata
/// and the full input as body when no block is present or it fails to parse.
fn split_header(raw: &str, id: &NodeId) -> (NodeMeta, String) {
    let mut lines = raw.lines();
    if lines.next().map(str::trim) != Some(HEADER_FENCE) {
        return (NodeMeta::default(), raw.to_string());
    }

    let mut header_lines: Vec<&str> = Vec::new();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut closed = false;
    for line in lines {
        if !closed && line.trim() == HEADER_FENCE {
            closed = true;
            continue;
        }
        if closed {
            body_lines.push(line);
        } else {
            header_lines.push(line);
        }
    }

    if !closed {
        tracing::warn!("Unterminated header block in {}, treating input as body", id);
        return (NodeMeta::default(), raw.to_string());
    }

    let header_text = header_lines.join("\n");
    match serde_yaml::from_str::<YamlValue>(&header_text) {
        Ok(YamlValue::Mapping(mapping)) => {
            (meta_from_mapping(mapping), body_lines.join("\n"))
        }
        Ok(_) => {
            tracing::warn!("Header block in {} is not a mapping, treating input as body", id);
            (NodeMeta::default(), raw.to_string())
        }
        Err(e) => {
            tracing::warn!("Malformed header block in {}: {}, treating input as body", id, e);
            (NodeMeta::default(), raw.to_string())
        }
    }
}

fn meta_from_mapping(mapping: serde_yaml::Mapping) -> NodeMeta {
    let mut meta = NodeMeta::default();
    for (key, value) in mapping {
        let Some(key) = key.as_str().map(str::to_string) else {
            continue;
        };
        match key.as_str() {
            "title" => {
                if let Some(s) = value.as_str() {
                    meta.title = s.to_string();
                }
            }
            "color" => {
                meta.color = value.as_str().map(str::to_string);
            }
            "position" => {
                meta.position = parse_position(&value);
            }
            "is_context_node" => {
                meta.is_context_node = value.as_bool().unwrap_or(false);
            }
            "contained_node_ids" => {
                meta.contained_node_ids = value.as_sequence().map(|seq| {
                    seq.iter()
                        .filter_map(|v| v.as_str().map(NodeId::from))
                        .collect()
                });
            }
            _ => {
                meta.extra.insert(key, yaml_value_string(&value));
            }
        }
    }
    meta
}

fn parse_position(value: &YamlValue) -> Option<Position> {
    let mapping = value.as_mapping()?;
    let x = mapping.get(YamlValue::from("x"))?.as_f64()?;
    let y = mapping.get(YamlValue::from("y"))?.as_f64()?;
    Some(Position { x, y })
}

/// Passthrough fields keep string values verbatim; anything else is carried
/// in its serialized JSON form.
fn yaml_value_string(value: &YamlValue) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn header_yaml(meta: &NodeMeta) -> String {
    let mut mapping = serde_yaml::Mapping::new();
    mapping.insert(YamlValue::from("title"), YamlValue::from(meta.title.clone()));
    if let Some(color) = &meta.color {
        mapping.insert(YamlValue::from("color"), YamlValue::from(color.clone()));
    }
    if let Some(position) = &meta.position {
        let mut pos = serde_yaml::Mapping::new();
        pos.insert(YamlValue::from("x"), YamlValue::from(position.x));
        pos.insert(YamlValue::from("y"), YamlValue::from(position.y));
        mapping.insert(YamlValue::from("position"), YamlValue::Mapping(pos));
    }
    if meta.is_context_node {
        mapping.insert(YamlValue::from("is_context_node"), YamlValue::from(true));
    }
    if let Some(contained) = &meta.contained_node_ids {
        let seq: Vec<YamlValue> = contained
            .iter()
            .map(|id| YamlValue::from(id.as_str()))
            .collect();
        mapping.insert(
            YamlValue::from("contained_node_ids"),
            YamlValue::Sequence(seq),
        );
    }
    for (key, value) in &meta.extra {
        mapping.insert(YamlValue::from(key.clone()), YamlValue::from(value.clone()));
    }
    serde_yaml::to_string(&YamlValue::Mapping(mapping)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    #[test]
    fn parses_header_and_labeled_references() {
        let raw = "---\ntitle: Topic\ncolor: \"#ff0000\"\nposition:\n  x: 4.0\n  y: 2.0\n---\n\nintro text\nextends [[base]]\n[[floating]]\n";
        let node = parse_document(raw, &id("notes/topic.md"));
        assert_eq!(node.meta.title, "Topic");
        assert_eq!(node.meta.color.as_deref(), Some("#ff0000"));
        assert_eq!(node.meta.position, Some(Position { x: 4.0, y: 2.0 }));
        assert_eq!(node.edges.len(), 2);
        assert_eq!(node.edges[0].reference, "base");
        assert_eq!(node.edges[0].label, "extends");
        assert_eq!(node.edges[1].reference, "floating");
        assert_eq!(node.edges[1].label, "");
        assert!(node.content.contains("⟦base⟧"));
        assert!(!node.content.contains("[[base]]"));
    }

    #[test]
    fn passthrough_keeps_unknown_header_fields() {
        let raw = "---\ntitle: T\ncustom_field: hello\nnumeric_field: 42\nlist_field:\n  - 1\n  - 2\n---\nbody\n";
        let node = parse_document(raw, &id("t.md"));
        assert_eq!(node.meta.extra.get("custom_field").map(String::as_str), Some("hello"));
        assert_eq!(node.meta.extra.get("numeric_field").map(String::as_str), Some("42"));
        assert_eq!(node.meta.extra.get("list_field").map(String::as_str), Some("[1,2]"));
    }

    #[test]
    fn malformed_header_falls_back_to_heading_title() {
        let raw = "---\ntitle: [unbalanced\n---\n# Recovered Title\n\nbody text\n";
        let node = parse_document(raw, &id("t.md"));
        assert_eq!(node.meta.title, "Recovered Title");
        assert!(node.content.contains("body text"));
    }

    #[test]
    fn missing_header_derives_title_from_heading() {
        let node = parse_document("# My Heading\n\ntext", &id("notes/x.md"));
        assert_eq!(node.meta.title, "My Heading");
    }

    #[test]
    fn no_heading_falls_back_to_id_stem() {
        let node = parse_document("just text", &id("notes/fallback.md"));
        assert_eq!(node.meta.title, "fallback");
    }

    #[test]
    fn link_block_edges_are_extracted_not_stored_as_content() {
        let raw = "---\ntitle: T\n---\nbody\n\n-----------------\n_Links:_\n- extends [[base]]\n- [[other]]\n";
        let node = parse_document(raw, &id("t.md"));
        assert_eq!(node.content, "body");
        assert_eq!(node.edges.len(), 2);
        assert_eq!(node.edges[0].label, "extends");
        assert_eq!(node.edges[1].label, "");
    }

    #[test]
    fn multiple_references_per_line_take_interleaved_labels() {
        let raw = "---\ntitle: T\n---\nuses [[a]] and depends on [[b]]\n";
        let node = parse_document(raw, &id("t.md"));
        assert_eq!(node.edges[0].label, "uses");
        assert_eq!(node.edges[1].label, "and depends on");
    }

    #[test]
    fn round_trip_reproduces_equivalent_node() {
        let raw = "---\ntitle: Topic\ncolor: blue\n---\n\nsome text\nextends [[notes/base]]\n";
        let original = parse_document(raw, &id("notes/topic.md"));
        let reparsed = parse_document(&serialize_node(&original), &id("notes/topic.md"));
        assert_eq!(original.meta, reparsed.meta);
        assert_eq!(original.content, reparsed.content);
        assert_eq!(original.edges.len(), reparsed.edges.len());
        for (a, b) in original.edges.iter().zip(reparsed.edges.iter()) {
            assert_eq!(a.reference, b.reference);
            assert_eq!(a.label, b.label);
        }
    }

    #[test]
    fn display_markers_are_not_re_extracted() {
        let raw = "---\ntitle: T\n---\nalready ⟦linked⟧ text\n";
        let node = parse_document(raw, &id("t.md"));
        assert!(node.edges.is_empty());
        assert_eq!(node.content, "already ⟦linked⟧ text");
    }
}
