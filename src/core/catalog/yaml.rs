//! YAML catalogs and their path index.
//!
//! The document is rebuilt from parser events so that every node keeps its
//! byte span. Event marks only give start positions; ends are recovered from
//! the source text:
//!
//! - quoted scalars end at their closing quote
//! - plain scalars end with their first line, before a comment, a `: `
//!   separator or (inside a flow collection) a flow indicator
//! - block scalars (`|`, `>`) end with their last more-indented line
//! - flow collections end at their closing bracket, block collections with
//!   their last child

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Number, Value};
use yaml_rust2::Yaml;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::CatalogError;
use super::source_map::SourceMap;
use crate::core::data::{LineIndex, SourceLocation, TextRange};

/// Position index mirroring the document: mapping keys and sequence indices as children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNode {
    pub key: Option<TextRange>,
    pub value: TextRange,
    /// `None` for scalars.
    pub children: Option<HashMap<String, IndexNode>>,
}

#[derive(Debug, Clone)]
pub struct YamlSourceMap {
    file_name: String,
    root: Option<IndexNode>,
}

impl YamlSourceMap {
    pub fn root(&self) -> Option<&IndexNode> {
        self.root.as_ref()
    }
}

impl SourceMap for YamlSourceMap {
    fn lookup_segments(&self, segments: &[String]) -> Option<SourceLocation> {
        let mut node = self.root.as_ref()?;
        for segment in segments {
            node = node.children.as_ref()?.get(segment)?;
        }
        Some(SourceLocation {
            file_name: self.file_name.clone(),
            key: node.key,
            value: Some(node.value),
        })
    }
}

/// Parse the first document of a YAML catalog into its data and its source map.
pub fn parse_yaml(text: &str, file_name: &str) -> Result<(Value, YamlSourceMap), CatalogError> {
    let body = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut builder = TreeBuilder::new(text);
    builder.skipped = text.chars().count() - body.chars().count();
    Parser::new(body.chars()).load(&mut builder, false)?;

    let index = LineIndex::new(text);
    let (data, root) = match &builder.root {
        Some(node) => (to_json(node), Some(build_index(node, None, &index))),
        None => (Value::Null, None),
    };

    Ok((
        data,
        YamlSourceMap {
            file_name: file_name.to_string(),
            root,
        },
    ))
}

#[derive(Debug, Clone)]
struct MarkedNode {
    value: NodeValue,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone)]
enum NodeValue {
    Scalar { text: String, plain: bool },
    Sequence(Vec<MarkedNode>),
    Mapping(Vec<(MarkedNode, MarkedNode)>),
}

impl MarkedNode {
    /// String form of a scalar used as mapping key.
    fn key_name(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Scalar { text, .. } => Some(text),
            _ => None,
        }
    }

    fn is_merge_key(&self) -> bool {
        matches!(&self.value, NodeValue::Scalar { text, plain: true } if text == "<<")
    }
}

enum FrameKind {
    Sequence(Vec<MarkedNode>),
    Mapping {
        entries: Vec<(MarkedNode, MarkedNode)>,
        pending_key: Option<MarkedNode>,
    },
}

struct Frame {
    kind: FrameKind,
    start: usize,
    anchor: usize,
    flow: bool,
}

struct TreeBuilder<'a> {
    text: &'a str,
    /// Byte offset of every char, markers count chars.
    char_offsets: Vec<usize>,
    /// Chars before the parsed body, a byte order mark.
    skipped: usize,
    stack: Vec<Frame>,
    anchors: HashMap<usize, MarkedNode>,
    root: Option<MarkedNode>,
}

impl<'a> TreeBuilder<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            char_offsets: text.char_indices().map(|(i, _)| i).collect(),
            skipped: 0,
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
        }
    }

    fn offset(&self, mark: Marker) -> usize {
        self.char_offsets
            .get(mark.index() + self.skipped)
            .copied()
            .unwrap_or(self.text.len())
    }

    fn in_flow(&self) -> bool {
        self.stack.last().is_some_and(|frame| frame.flow)
    }

    fn finish(&mut self, node: MarkedNode, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        self.push(node);
    }

    fn push(&mut self, node: MarkedNode) {
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame {
                kind: FrameKind::Sequence(items),
                ..
            }) => items.push(node),
            Some(Frame {
                kind:
                    FrameKind::Mapping {
                        entries,
                        pending_key,
                    },
                ..
            }) => match pending_key.take() {
                None => *pending_key = Some(node),
                Some(key) => entries.push((key, node)),
            },
        }
    }

    fn close(&mut self, offset: usize) {
        let Some(frame) = self.stack.pop() else {
            return;
        };

        let (value, last_end) = match frame.kind {
            FrameKind::Sequence(items) => {
                let last_end = items.iter().map(|item| item.end).max();
                (NodeValue::Sequence(items), last_end)
            }
            FrameKind::Mapping { entries, .. } => {
                let last_end = entries
                    .iter()
                    .map(|(key, value)| key.end.max(value.end))
                    .max();
                (NodeValue::Mapping(apply_merge_keys(entries)), last_end)
            }
        };

        let end = if frame.flow {
            (offset + 1).min(self.text.len())
        } else {
            last_end.unwrap_or(frame.start)
        };

        self.finish(
            MarkedNode {
                value,
                start: frame.start,
                end,
            },
            frame.anchor,
        );
    }

    fn open(&mut self, kind: FrameKind, offset: usize, anchor: usize, bracket: char) {
        let flow = self.text[offset..].starts_with(bracket);
        self.stack.push(Frame {
            kind,
            start: offset,
            anchor,
            flow,
        });
    }

    fn scalar_end(&self, start: usize, value: &str, style: TScalarStyle) -> usize {
        let rest = &self.text[start..];
        match style {
            TScalarStyle::SingleQuoted => quoted_end(rest, '\'').map_or(self.text.len(), |n| start + n),
            TScalarStyle::DoubleQuoted => quoted_end(rest, '"').map_or(self.text.len(), |n| start + n),
            TScalarStyle::Literal | TScalarStyle::Folded => block_scalar_end(self.text, start),
            _ if rest.starts_with(value) => start + value.len(),
            // Empty plain scalars have no text of their own.
            _ if value == "~" => start,
            _ => start + plain_len(rest, self.in_flow()),
        }
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, event: Event, mark: Marker) {
        let offset = self.offset(mark);
        match event {
            Event::Scalar(value, style, anchor, ..) => {
                let end = self.scalar_end(offset, &value, style);
                let node = MarkedNode {
                    value: NodeValue::Scalar {
                        text: value,
                        plain: style == TScalarStyle::Plain,
                    },
                    start: offset,
                    end,
                };
                self.finish(node, anchor);
            }
            Event::Alias(id) => {
                if let Some(node) = self.anchors.get(&id).cloned() {
                    self.push(node);
                }
            }
            Event::SequenceStart(anchor, ..) => {
                self.open(FrameKind::Sequence(Vec::new()), offset, anchor, '[')
            }
            Event::MappingStart(anchor, ..) => self.open(
                FrameKind::Mapping {
                    entries: Vec::new(),
                    pending_key: None,
                },
                offset,
                anchor,
                '{',
            ),
            Event::SequenceEnd | Event::MappingEnd => self.close(offset),
            _ => {}
        }
    }
}

/// Resolve `<<` entries: explicit keys first, then merged keys not already present.
///
/// With a sequence of merge sources, earlier sources take precedence.
fn apply_merge_keys(entries: Vec<(MarkedNode, MarkedNode)>) -> Vec<(MarkedNode, MarkedNode)> {
    let (merges, mut resolved): (Vec<_>, Vec<_>) =
        entries.into_iter().partition(|(key, _)| key.is_merge_key());
    if merges.is_empty() {
        return resolved;
    }

    let mut seen: HashSet<String> = resolved
        .iter()
        .filter_map(|(key, _)| key.key_name().map(str::to_string))
        .collect();

    for (_, source) in merges {
        let sources = match source.value {
            NodeValue::Mapping(entries) => vec![entries],
            NodeValue::Sequence(items) => items
                .into_iter()
                .filter_map(|item| match item.value {
                    NodeValue::Mapping(entries) => Some(entries),
                    _ => None,
                })
                .collect(),
            NodeValue::Scalar { .. } => Vec::new(),
        };
        for (key, value) in sources.into_iter().flatten() {
            if let Some(name) = key.key_name()
                && seen.insert(name.to_string())
            {
                resolved.push((key, value));
            }
        }
    }
    resolved
}

/// Byte length of a quoted scalar, both quotes included.
fn quoted_end(rest: &str, quote: char) -> Option<usize> {
    let mut chars = rest.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if quote == '"' => {
                chars.next();
            }
            c if c == quote => {
                // `''` is an escaped quote inside single quotes.
                if quote == '\'' && chars.peek().is_some_and(|(_, next)| *next == '\'') {
                    chars.next();
                    continue;
                }
                return Some(i + c.len_utf8());
            }
            _ => {}
        }
    }
    None
}

/// Byte length of the first line of a plain scalar.
fn plain_len(rest: &str, flow: bool) -> usize {
    let line = rest.split('\n').next().unwrap_or_default();
    let bytes = line.as_bytes();
    let is_flow_indicator = |b: u8| matches!(b, b',' | b'[' | b']' | b'{' | b'}');

    let mut stop = bytes.len();
    for (i, &b) in bytes.iter().enumerate() {
        let next = bytes.get(i + 1).copied();
        let comment = b == b'#' && i > 0 && matches!(bytes[i - 1], b' ' | b'\t');
        let separator = b == b':'
            && (matches!(next, None | Some(b' ' | b'\t' | b'\r'))
                || (flow && next.is_some_and(is_flow_indicator)));
        if comment || separator || (flow && is_flow_indicator(b)) {
            stop = i;
            break;
        }
    }
    line[..stop].trim_end().len()
}

/// End offset of a `|` or `>` scalar whose indicator is at `start`.
fn block_scalar_end(text: &str, start: usize) -> usize {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let header_end = text[start..].find('\n').map_or(text.len(), |i| start + i);
    let parent_indent = indentation(&text[line_start..header_end]);

    let header = &text[start..header_end];
    let header = header.split(" #").next().unwrap_or(header);
    let mut end = start + header.trim_end().len();

    let mut content_indent = None;
    let mut pos = header_end + 1;
    while pos < text.len() {
        let line_end = text[pos..].find('\n').map_or(text.len(), |i| pos + i);
        let line = text[pos..line_end].trim_end_matches('\r');
        if !line.trim().is_empty() {
            let indent = indentation(line);
            let required = *content_indent.get_or_insert(indent);
            if indent <= parent_indent || indent < required {
                break;
            }
            end = pos + line.len();
        }
        pos = line_end + 1;
    }
    end
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn to_json(node: &MarkedNode) -> Value {
    match &node.value {
        NodeValue::Scalar { text, plain: true } => resolve_plain(text),
        NodeValue::Scalar { text, .. } => Value::String(text.clone()),
        NodeValue::Sequence(items) => Value::Array(items.iter().map(to_json).collect()),
        NodeValue::Mapping(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                if let Some(name) = key.key_name() {
                    map.insert(name.to_string(), to_json(value));
                }
            }
            Value::Object(map)
        }
    }
}

/// Core schema resolution of an unquoted scalar.
fn resolve_plain(text: &str) -> Value {
    let yaml = Yaml::from_str(text);
    match yaml {
        Yaml::Integer(i) => Value::from(i),
        Yaml::Real(_) => yaml
            .as_f64()
            .and_then(Number::from_f64)
            .map_or_else(|| Value::String(text.to_string()), Value::Number),
        Yaml::Boolean(b) => Value::Bool(b),
        Yaml::Null => Value::Null,
        _ => Value::String(text.to_string()),
    }
}

fn build_index(node: &MarkedNode, key: Option<TextRange>, index: &LineIndex) -> IndexNode {
    let children = match &node.value {
        NodeValue::Scalar { .. } => None,
        NodeValue::Sequence(items) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), build_index(item, None, index)))
                .collect(),
        ),
        NodeValue::Mapping(entries) => {
            let mut children = HashMap::new();
            for (k, v) in entries {
                if let Some(name) = k.key_name() {
                    let key_range = index.range(k.start, k.end);
                    children.insert(name.to_string(), build_index(v, Some(key_range), index));
                }
            }
            Some(children)
        }
    };

    IndexNode {
        key,
        value: index.range(node.start, node.end),
        children,
    }
}
