//! JSON catalogs and their JSON-pointer source map.

use std::collections::HashMap;
use std::str::CharIndices;

use serde_json::Value;

use super::CatalogError;
use super::source_map::SourceMap;
use crate::core::data::{LineIndex, SourceLocation, TextRange};

/// Ranges recorded for one JSON pointer. String ranges include the quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerEntry {
    /// `None` for the document root and array items.
    pub key: Option<TextRange>,
    pub value: TextRange,
}

#[derive(Debug, Clone)]
pub struct JsonSourceMap {
    file_name: String,
    pointers: HashMap<String, PointerEntry>,
}

impl JsonSourceMap {
    pub fn entry(&self, pointer: &str) -> Option<&PointerEntry> {
        self.pointers.get(pointer)
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}

impl SourceMap for JsonSourceMap {
    fn lookup_segments(&self, segments: &[String]) -> Option<SourceLocation> {
        let pointer: String = segments
            .iter()
            .map(|segment| format!("/{}", escape_pointer(segment)))
            .collect();
        let entry = self.pointers.get(&pointer)?;
        Some(SourceLocation {
            file_name: self.file_name.clone(),
            key: entry.key,
            value: Some(entry.value),
        })
    }
}

/// Parse a JSON catalog into its data and its source map.
pub fn parse_json(text: &str, file_name: &str) -> Result<(Value, JsonSourceMap), CatalogError> {
    let body = text.strip_prefix('\u{feff}').unwrap_or(text);
    let data: Value = serde_json::from_str(body)?;

    let mut scanner = Scanner::new(text);
    scanner.skip_whitespace();
    scanner.value("", None)?;
    scanner.skip_whitespace();
    if scanner.pos < text.len() {
        return Err(scanner.error("trailing characters"));
    }

    Ok((
        data,
        JsonSourceMap {
            file_name: file_name.to_string(),
            pointers: scanner.pointers,
        },
    ))
}

/// `~` and `/` escaped as `~0` and `~1`.
pub fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    index: LineIndex<'a>,
    pointers: HashMap<String, PointerEntry>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: text.strip_prefix('\u{feff}').map_or(0, |_| '\u{feff}'.len_utf8()),
            index: LineIndex::new(text),
            pointers: HashMap::new(),
        }
    }

    fn error(&self, message: &str) -> CatalogError {
        CatalogError::Syntax {
            message: message.to_string(),
            position: self.index.position(self.pos),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), CatalogError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    /// Drop `pointer` and everything below it, before a duplicate key replaces them.
    fn forget(&mut self, pointer: &str) {
        if self.pointers.remove(pointer).is_some() {
            let prefix = format!("{}/", pointer);
            self.pointers.retain(|p, _| !p.starts_with(&prefix));
        }
    }

    fn value(&mut self, pointer: &str, key: Option<TextRange>) -> Result<(), CatalogError> {
        let start = self.pos;
        match self.peek() {
            Some(b'{') => self.object(pointer)?,
            Some(b'[') => self.array(pointer)?,
            Some(b'"') => {
                self.string()?;
            }
            Some(b't') => self.literal("true")?,
            Some(b'f') => self.literal("false")?,
            Some(b'n') => self.literal("null")?,
            Some(b'-' | b'0'..=b'9') => self.number(),
            _ => return Err(self.error("expected a value")),
        }

        let value = self.index.range(start, self.pos);
        self.pointers
            .insert(pointer.to_string(), PointerEntry { key, value });
        Ok(())
    }

    fn object(&mut self, pointer: &str) -> Result<(), CatalogError> {
        self.expect(b'{')?;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(());
        }

        loop {
            self.skip_whitespace();
            let key_start = self.pos;
            let name = self.string()?;
            let key = self.index.range(key_start, self.pos);
            self.skip_whitespace();
            self.expect(b':')?;
            self.skip_whitespace();

            let child = format!("{}/{}", pointer, escape_pointer(&name));
            self.forget(&child);
            self.value(&child, Some(key))?;

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn array(&mut self, pointer: &str) -> Result<(), CatalogError> {
        self.expect(b'[')?;
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(());
        }

        let mut index = 0;
        loop {
            self.skip_whitespace();
            self.value(&format!("{}/{}", pointer, index), None)?;
            index += 1;

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn literal(&mut self, word: &str) -> Result<(), CatalogError> {
        if self.text[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(())
        } else {
            Err(self.error("invalid literal"))
        }
    }

    fn number(&mut self) {
        while matches!(
            self.peek(),
            Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')
        ) {
            self.pos += 1;
        }
    }

    /// Consume a string token and return its unescaped value.
    fn string(&mut self) -> Result<String, CatalogError> {
        self.expect(b'"')?;
        let text = self.text;
        let mut value = String::new();
        let mut chars = text[self.pos..].char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Ok(value);
                }
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'u' => {
                            let mut units = vec![hex_unit(&mut chars).ok_or_else(|| {
                                self.error("invalid unicode escape")
                            })?];
                            if (0xD800..0xDC00).contains(&units[0]) {
                                let mut lookahead = chars.clone();
                                if matches!(lookahead.next(), Some((_, '\\')))
                                    && matches!(lookahead.next(), Some((_, 'u')))
                                    && let Some(low) = hex_unit(&mut lookahead)
                                {
                                    units.push(low);
                                    chars = lookahead;
                                }
                            }
                            value.extend(
                                char::decode_utf16(units)
                                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
                            );
                        }
                        other => value.push(other),
                    }
                }
                c => value.push(c),
            }
        }

        self.pos = self.text.len();
        Err(self.error("unterminated string"))
    }
}

fn hex_unit(chars: &mut CharIndices) -> Option<u16> {
    let digits: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
    if digits.len() != 4 {
        return None;
    }
    u16::from_str_radix(&digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::core::catalog::json::*;

    fn slice<'a>(text: &'a str, range: Option<TextRange>) -> Option<&'a str> {
        range?.slice(text)
    }

    #[test]
    fn test_nested_lookup() {
        let text = "{\n  \"app\": {\n    \"title\": \"Hello\"\n  }\n}";
        let (data, map) = parse_json(text, "messages.en.json").unwrap();
        assert_eq!(data["app"]["title"], "Hello");

        let location = map.lookup("app.title").unwrap();
        assert_eq!(location.file_name, "messages.en.json");
        assert_eq!(slice(text, location.key), Some("\"title\""));
        assert_eq!(slice(text, location.value), Some("\"Hello\""));

        let key = location.key.unwrap();
        assert_eq!((key.start.line, key.start.column), (2, 4));
        assert_eq!((key.end.line, key.end.column), (2, 11));
    }

    #[test]
    fn test_object_value_range() {
        let text = r#"{"a": {"b": 1}}"#;
        let (_, map) = parse_json(text, "x.json").unwrap();
        let location = map.lookup("a").unwrap();
        assert_eq!(slice(text, location.value), Some(r#"{"b": 1}"#));
    }

    #[test]
    fn test_array_items() {
        let text = r#"{"list": ["one", {"deep": true}]}"#;
        let (_, map) = parse_json(text, "x.json").unwrap();
        assert_eq!(slice(text, map.lookup("list.0").unwrap().value), Some("\"one\""));
        assert_eq!(map.lookup("list.0").unwrap().key, None);
        assert_eq!(
            slice(text, map.lookup("list[1].deep").unwrap().value),
            Some("true")
        );
    }

    #[test]
    fn test_pointer_escaping() {
        let text = r#"{"a/b": {"c~d": "v"}}"#;
        let (_, map) = parse_json(text, "x.json").unwrap();
        assert!(map.entry("/a~1b/c~0d").is_some());
        assert_eq!(slice(text, map.lookup("a/b.c~d").unwrap().value), Some("\"v\""));
    }

    #[test]
    fn test_escaped_key_names() {
        let text = r#"{"say \"hi\"": "x", "café": "y"}"#;
        let (_, map) = parse_json(text, "x.json").unwrap();
        assert!(map.lookup("say \"hi\"").is_some());
        assert!(map.lookup("café").is_some());
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let text = r#"{"a": {"old": 1}, "a": {"new": 2}}"#;
        let (data, map) = parse_json(text, "x.json").unwrap();
        assert_eq!(data["a"]["new"], 2);
        assert!(map.lookup("a.old").is_none());
        assert_eq!(slice(text, map.lookup("a.new").unwrap().value), Some("2"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_missing_path() {
        let (_, map) = parse_json(r#"{"a": 1}"#, "x.json").unwrap();
        assert!(map.lookup("b").is_none());
        assert!(map.lookup("a.b").is_none());
    }

    #[test]
    fn test_unicode_columns() {
        let text = "{\"é\": \"ü\"}";
        let (_, map) = parse_json(text, "x.json").unwrap();
        let value = map.lookup("é").unwrap().value.unwrap();
        assert_eq!(value.start.column, 6);
        assert_eq!(value.start.offset, 7);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_json("{\"a\": }", "x.json"),
            Err(CatalogError::Json(_))
        ));
    }
}
