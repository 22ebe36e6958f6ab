use std::sync::LazyLock;

use regex::Regex;

use crate::model::config::IngestConfig;
use crate::parse::outline::OutlineNode;

/// Bullet and list markers stripped from the start of a line: `-`, `*`, `+`,
/// `•`, `1.`, `2)`, `a.`, `iv)` and friends, each followed by whitespace.
/// Roman numerals run from i to xxxix so words like `Mild.` keep their text.
static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[-*+•]|\d+[.)]|[A-Za-z][.)]|(?i:x{0,3}(?:ix|iv|vi{0,3}|i{1,3})|x{1,3})[.)])\s+",
    )
    .expect("bullet pattern")
});

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+").expect("heading pattern"));

static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[ xX>]\]\s+").expect("checkbox pattern"));

/// `key: value` with a short key and non-empty value
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^:]{1,60}?):\s+(\S.*)$").expect("key/value pattern")
});

/// One non-blank input line after cleanup
#[derive(Debug)]
struct Line {
    level: usize,
    title: String,
    value: Option<String>,
}

/// Arena node while the tree is being assembled
#[derive(Debug)]
struct Raw {
    title: String,
    value: Option<String>,
    children: Vec<usize>,
}

/// Parse indented bullet text into outline roots.
///
/// The indentation unit is the smallest non-zero indent seen; each line's
/// level is its indent divided by that unit. A line attaches to the nearest
/// preceding line with a lower level. Lines that are pure JSON punctuation
/// are ignored so half-written JSON still yields its keys.
pub fn parse_indented(text: &str, config: &IngestConfig) -> Vec<OutlineNode> {
    let tab = " ".repeat(config.tab_width.max(1));
    let measured: Vec<(usize, &str)> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| (count_indent(l, &tab), l.trim()))
        .filter(|(_, l)| !is_json_punctuation(l))
        .collect();

    let unit = measured
        .iter()
        .map(|(indent, _)| *indent)
        .filter(|i| *i > 0)
        .min()
        .unwrap_or(1);

    let lines: Vec<Line> = measured
        .into_iter()
        .filter_map(|(indent, text)| {
            let (title, value) = clean_line(text)?;
            Some(Line {
                level: indent / unit,
                title,
                value,
            })
        })
        .collect();

    let mut arena: Vec<Raw> = Vec::with_capacity(lines.len());
    let mut roots: Vec<usize> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for line in lines {
        while stack.last().is_some_and(|(level, _)| *level >= line.level) {
            stack.pop();
        }
        let idx = arena.len();
        arena.push(Raw {
            title: line.title,
            value: line.value,
            children: Vec::new(),
        });
        match stack.last() {
            Some((_, parent)) => arena[*parent].children.push(idx),
            None => roots.push(idx),
        }
        stack.push((line.level, idx));
    }

    let headings: Vec<String> = config
        .heading_words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .collect();
    roots
        .iter()
        .map(|&idx| build(&arena, idx, &headings))
        .collect()
}

fn build(arena: &[Raw], idx: usize, headings: &[String]) -> OutlineNode {
    let raw = &arena[idx];
    if raw.children.is_empty() {
        return OutlineNode::leaf(raw.title.clone(), raw.value.iter().cloned().collect());
    }
    // A key/value line that turns out to have children keeps its whole text
    let title = match &raw.value {
        Some(value) => format!("{}: {}", raw.title, value),
        None => raw.title.clone(),
    };
    let children: Vec<OutlineNode> = raw
        .children
        .iter()
        .map(|&c| build(arena, c, headings))
        .collect();

    if is_heading(&raw.title, headings) && children.iter().all(OutlineNode::is_leaf) {
        let content = children.iter().map(OutlineNode::display_line).collect();
        return OutlineNode::leaf(title, content);
    }
    OutlineNode::branch(title, children)
}

fn is_heading(title: &str, headings: &[String]) -> bool {
    let normalized = title.trim().trim_end_matches(':').trim().to_lowercase();
    headings.iter().any(|h| *h == normalized)
}

/// Leading indentation in spaces, with each tab expanded
fn count_indent(line: &str, tab: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += tab.len(),
            _ => break,
        }
    }
    width
}

fn is_json_punctuation(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c, '{' | '}' | '[' | ']' | ',' | ' '))
}

/// Strip markers and JSON residue, then split `key: value`.
/// Returns `None` when nothing is left of the line.
fn clean_line(line: &str) -> Option<(String, Option<String>)> {
    let mut text = line.trim();
    text = strip_prefix_match(&HEADING, text);
    text = strip_prefix_match(&BULLET, text);
    text = strip_prefix_match(&CHECKBOX, text);
    text = text.trim_end_matches(',').trim_end();
    text = text.trim_end_matches(['{', '[']).trim_end();
    text = strip_emphasis(text);

    if let Some(caps) = KEY_VALUE.captures(text) {
        let key = unquote(&caps[1]);
        let value = unquote(&caps[2]);
        if !key.is_empty() && !value.is_empty() {
            return Some((key, Some(value)));
        }
    }
    let title = unquote(text.trim_end_matches(':'));
    if title.is_empty() {
        None
    } else {
        Some((title, None))
    }
}

fn strip_prefix_match<'a>(re: &Regex, text: &'a str) -> &'a str {
    match re.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

fn strip_emphasis(text: &str) -> &str {
    for marker in ["**", "__"] {
        if let Some(inner) = text
            .strip_prefix(marker)
            .and_then(|t| t.strip_suffix(marker))
        {
            return inner.trim();
        }
    }
    text
}

fn unquote(text: &str) -> String {
    let text = text.trim();
    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    strip_emphasis(text).trim().trim_end_matches(':').trim().to_string()
}
