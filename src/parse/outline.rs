//! Outline shape returned by the text-generation collaborator, and the
//! JSON-first reader that turns its reply into outline nodes.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::model::config::IngestConfig;
use crate::parse::indent_parser::parse_indented;

/// Nesting beyond this is kept as a compact JSON string instead of expanded
const MAX_JSON_DEPTH: usize = 32;

/// Content of an outline node: either plain content strings or child nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineBody {
    Leaf(Vec<String>),
    Branch(Vec<OutlineNode>),
}

/// A titled outline node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub title: String,
    pub body: OutlineBody,
}

impl OutlineNode {
    pub fn leaf(title: impl Into<String>, content: Vec<String>) -> Self {
        OutlineNode {
            title: title.into(),
            body: OutlineBody::Leaf(content),
        }
    }

    pub fn branch(title: impl Into<String>, children: Vec<OutlineNode>) -> Self {
        OutlineNode {
            title: title.into(),
            body: OutlineBody::Branch(children),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.body, OutlineBody::Leaf(_))
    }

    pub fn children(&self) -> &[OutlineNode] {
        match &self.body {
            OutlineBody::Branch(children) => children,
            OutlineBody::Leaf(_) => &[],
        }
    }

    pub fn content(&self) -> &[String] {
        match &self.body {
            OutlineBody::Leaf(content) => content,
            OutlineBody::Branch(_) => &[],
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn len(&self) -> usize {
        1 + self.children().iter().map(OutlineNode::len).sum::<usize>()
    }

    /// The node's own line in text form: `title`, or `title: value` for a
    /// leaf holding a single content string.
    pub fn display_line(&self) -> String {
        match self.content() {
            [value] => format!("{}: {}", self.title, value),
            _ => self.title.clone(),
        }
    }

    fn write_text(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{}- {}\n", indent, self.display_line()));
        match &self.body {
            OutlineBody::Leaf(content) if content.len() > 1 => {
                for item in content {
                    out.push_str(&format!("{}  - {}\n", indent, item));
                }
            }
            OutlineBody::Leaf(_) => {}
            OutlineBody::Branch(children) => {
                for child in children {
                    child.write_text(depth + 1, out);
                }
            }
        }
    }
}

/// Render outline nodes as the indented bullet text the fallback parser reads
pub fn to_text(nodes: &[OutlineNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_text(0, &mut out);
    }
    out
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse one collaborator reply into outline roots.
///
/// Fences are stripped, then the text is read as JSON; if that fails or
/// yields nothing, the indentation parser takes over. An empty result means
/// neither path found any node.
pub fn parse_outline(text: &str, config: &IngestConfig) -> Vec<OutlineNode> {
    let body = strip_fences(text);
    if let Some(nodes) = parse_json_outline(&body)
        && !nodes.is_empty()
    {
        tracing::debug!(roots = nodes.len(), "outline read as JSON");
        return nodes;
    }
    let nodes = parse_indented(&body, config);
    tracing::debug!(roots = nodes.len(), "outline read by indentation parser");
    nodes
}

/// Opening fence with its optional language tag, then the interior up to the
/// next fence anywhere (same line included) or the end of the text.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z0-9_+.-]*[ \t]*(?:\r?\n)?([\s\S]*?)(?:```|\z)").expect("fence pattern")
});

/// Keep only the interior of the first fenced code block, if there is one.
/// An unterminated fence runs to the end of the text.
pub fn strip_fences(text: &str) -> String {
    match FENCE.captures(text) {
        Some(caps) => caps[1].trim_end().to_string(),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// JSON path
// ---------------------------------------------------------------------------

/// Read the whole text, or failing that its outermost `{...}` span, as JSON.
pub fn parse_json_value(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end]).ok()
}

/// JSON outline roots, or `None` if the text is not a JSON object or array.
///
/// A single-key object becomes one wrapping root titled by its key; extra
/// keys become sibling roots.
pub fn parse_json_outline(text: &str) -> Option<Vec<OutlineNode>> {
    match parse_json_value(text)? {
        Value::Object(map) => Some(expand_object(&map, 0)),
        Value::Array(items) => Some(flatten_array(&items, 0)),
        _ => None,
    }
}

/// Expand the entries of a JSON object into sibling nodes
pub fn expand_object(map: &Map<String, Value>, depth: usize) -> Vec<OutlineNode> {
    map.iter()
        .map(|(key, value)| expand_entry(key, value, depth))
        .collect()
}

/// One `key: value` entry. Objects nest, arrays flatten into children,
/// scalars become the leaf's single content string.
fn expand_entry(key: &str, value: &Value, depth: usize) -> OutlineNode {
    let title = key.trim();
    if depth >= MAX_JSON_DEPTH {
        return OutlineNode::leaf(title, vec![value.to_string()]);
    }
    let children = match value {
        Value::Object(map) => expand_object(map, depth + 1),
        Value::Array(items) => flatten_array(items, depth + 1),
        scalar => return OutlineNode::leaf(title, scalar_content(scalar)),
    };
    if children.is_empty() {
        OutlineNode::leaf(title, Vec::new())
    } else {
        OutlineNode::branch(title, children)
    }
}

/// Array elements become siblings: objects contribute their entries, nested
/// arrays flatten, scalars become content-less leaves titled by their value.
fn flatten_array(items: &[Value], depth: usize) -> Vec<OutlineNode> {
    let mut nodes = Vec::new();
    for item in items {
        match item {
            Value::Object(map) => nodes.extend(expand_object(map, depth)),
            Value::Array(inner) if depth < MAX_JSON_DEPTH => {
                nodes.extend(flatten_array(inner, depth + 1))
            }
            Value::Null => {}
            other => {
                if let Some(title) = scalar_content(other).pop() {
                    nodes.push(OutlineNode::leaf(title, Vec::new()));
                }
            }
        }
    }
    nodes
}

fn scalar_content(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s.trim().to_string()],
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> IngestConfig {
        IngestConfig::default()
    }

    #[test]
    fn json_plan_becomes_wrapped_tree() {
        let nodes = parse_outline(
            r#"{"Plan": {"Step One": "Buy ingredients", "Step Two": {"Sub A": "Prep", "Sub B": "Cook"}}}"#,
            &config(),
        );
        assert_eq!(
            nodes,
            vec![OutlineNode::branch(
                "Plan",
                vec![
                    OutlineNode::leaf("Step One", vec!["Buy ingredients".into()]),
                    OutlineNode::branch(
                        "Step Two",
                        vec![
                            OutlineNode::leaf("Sub A", vec!["Prep".into()]),
                            OutlineNode::leaf("Sub B", vec!["Cook".into()]),
                        ]
                    ),
                ]
            )]
        );
    }

    #[test]
    fn fenced_json_with_prose_around_it() {
        let text = "Here you go:\n```json\n{\"Trip\": [\"Book flights\", \"Pack\"]}\n```\nEnjoy!";
        let nodes = parse_outline(text, &config());
        assert_eq!(
            nodes,
            vec![OutlineNode::branch(
                "Trip",
                vec![
                    OutlineNode::leaf("Book flights", vec![]),
                    OutlineNode::leaf("Pack", vec![]),
                ]
            )]
        );
    }

    #[test]
    fn outermost_braces_located_inside_chatter() {
        let text = "Sure! {\"Garden\": {\"Dig\": \"beds\"}} Let me know.";
        let nodes = parse_outline(text, &config());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].title, "Garden");
        assert_eq!(nodes[0].children()[0].content(), ["beds".to_string()]);
    }

    #[test]
    fn arrays_flatten_objects_and_nested_arrays() {
        let nodes = parse_json_outline(
            r#"{"Launch": [{"Design": "mockups"}, ["Build", "Test"], null, 3, {"Ship": {}}]}"#,
        )
        .unwrap();
        let titles: Vec<&str> = nodes[0].children().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Design", "Build", "Test", "3", "Ship"]);
        assert!(nodes[0].children()[4].is_leaf());
    }

    #[test]
    fn multi_key_object_yields_sibling_roots() {
        let nodes = parse_json_outline(r#"{"A": "x", "B": {"C": true}}"#).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].children()[0].content(), ["true".to_string()]);
    }

    #[test]
    fn scalar_json_is_not_an_outline() {
        assert!(parse_json_outline("\"just a string\"").is_none());
        assert!(parse_json_outline("42").is_none());
        assert!(parse_json_outline("not json at all").is_none());
    }

    #[test]
    fn broken_json_falls_back_to_indentation() {
        let text = "- Alpha\n  - Beta\n  - Gamma\n- Delta";
        let nodes = parse_outline(text, &config());
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].title, "Alpha");
        assert_eq!(nodes[0].children().len(), 2);
        assert_eq!(nodes[1].title, "Delta");
    }

    #[test]
    fn truncated_json_is_salvaged_line_by_line() {
        let text = "{\n  \"Plan\": {\n    \"Shop\": \"eggs\",\n    \"Cook\": \"omelette\",";
        let nodes = parse_outline(text, &config());
        assert_eq!(
            nodes,
            vec![OutlineNode::branch(
                "Plan",
                vec![
                    OutlineNode::leaf("Shop", vec!["eggs".into()]),
                    OutlineNode::leaf("Cook", vec!["omelette".into()]),
                ]
            )]
        );
    }

    #[test]
    fn empty_reply_yields_nothing() {
        assert!(parse_outline("", &config()).is_empty());
        assert!(parse_outline("```\n```", &config()).is_empty());
        assert!(parse_outline("{}", &config()).is_empty());
    }

    #[test]
    fn strip_fences_keeps_interior() {
        assert_eq!(strip_fences("```\na\nb\n```"), "a\nb");
        assert_eq!(strip_fences("```text\na"), "a");
        assert_eq!(strip_fences("no fence"), "no fence");
        assert_eq!(strip_fences("```json {\"a\": 1} ```"), "{\"a\": 1}");
        assert_eq!(strip_fences("Sure:\n```\n  - a\n    - b\n```\nbye"), "  - a\n    - b");
    }

    #[test]
    fn single_line_fenced_json_keeps_its_body() {
        let nodes = parse_outline("```json {\"Plan\": {\"Shop\": \"eggs\"}} ```", &config());
        assert_eq!(
            nodes,
            vec![OutlineNode::branch(
                "Plan",
                vec![OutlineNode::leaf("Shop", vec!["eggs".into()])]
            )]
        );
    }

    #[test]
    fn to_text_renders_scalar_leaves_as_key_value() {
        let nodes = vec![OutlineNode::branch(
            "Plan",
            vec![
                OutlineNode::leaf("Step One", vec!["Buy ingredients".into()]),
                OutlineNode::leaf("Shopping", vec!["eggs".into(), "milk".into()]),
                OutlineNode::leaf("Done", vec![]),
            ],
        )];
        assert_eq!(
            to_text(&nodes),
            "- Plan\n  - Step One: Buy ingredients\n  - Shopping\n    - eggs\n    - milk\n  - Done\n"
        );
    }

    #[test]
    fn to_text_reparses_to_same_shape() {
        let nodes = vec![OutlineNode::branch(
            "Plan",
            vec![
                OutlineNode::leaf("Step One", vec!["Buy ingredients".into()]),
                OutlineNode::branch("Step Two", vec![OutlineNode::leaf("Sub A", vec![])]),
            ],
        )];
        assert_eq!(parse_outline(&to_text(&nodes), &config()), nodes);
    }
}
