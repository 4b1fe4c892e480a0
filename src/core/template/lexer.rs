//! Twig tokenizer.
//!
//! The lexer alternates between data mode (literal text) and tag mode
//! (`{% %}` and `{{ }}`), with `{# #}` comments dropped entirely. Malformed
//! input never aborts tokenization: it produces `Error` tokens and resumes at
//! the next plausible boundary so the parser can still recover.

use std::sync::LazyLock;

use regex::Regex;

use super::token::{Token, TokenKind, Trim};
use crate::core::data::LineIndex;

const BLOCK_START: &str = "{%";
const BLOCK_END: &str = "%}";
const VAR_START: &str = "{{";
const VAR_END: &str = "}}";
const COMMENT_START: &str = "{#";
const COMMENT_END: &str = "#}";

/// Operators, longest first so that matching is greedy.
const OPERATORS: &[&str] = &[
    "<=>", "**", "//", "==", "!=", "<=", ">=", "..", "??", "?:", "+", "-", "*", "/", "%", "~",
    "<", ">", "=",
];

const PUNCTUATION: &str = "()[]{}?:.,|";

/// Tags whose body is kept verbatim until the matching end tag.
const RAW_TAGS: &[&str] = &["verbatim", "raw"];

static END_VERBATIM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%([-~]?)\s*endverbatim\s*[-~]?%\}").unwrap());
static END_RAW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%([-~]?)\s*endraw\s*[-~]?%\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Block,
    Var,
    Comment,
}

/// Tokenize a whole template. The result always ends with an `Eof` token.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

pub struct Lexer<'a> {
    source: &'a str,
    index: LineIndex<'a>,
    current: usize,
    tokens: Vec<Token>,
    /// Open brackets inside the current tag, with their offsets.
    brackets: Vec<(char, usize)>,
    /// Trim requested by the previous closing delimiter for the next text run.
    trim_next: Option<Trim>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            index: LineIndex::new(source),
            current: 0,
            tokens: Vec::new(),
            brackets: Vec::new(),
            trim_next: None,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        while self.current < self.source.len() {
            match self.find_opener() {
                Some((offset, opener)) => {
                    let trim = self.source[offset + 2..]
                        .chars()
                        .next()
                        .and_then(Trim::from_char);
                    self.push_text(self.current, offset, trim);
                    self.current = offset;
                    match opener {
                        Opener::Comment => self.lex_comment(),
                        Opener::Block => self.lex_tag(TokenKind::BlockStart),
                        Opener::Var => self.lex_tag(TokenKind::VarStart),
                    }
                }
                None => {
                    self.push_text(self.current, self.source.len(), None);
                    self.current = self.source.len();
                }
            }
        }

        let end = self.source.len();
        self.push(TokenKind::Eof, String::new(), end, end);
        self.tokens
    }

    fn find_opener(&self) -> Option<(usize, Opener)> {
        let mut from = self.current;
        while let Some(pos) = self.source[from..].find('{') {
            let offset = from + pos;
            let rest = &self.source[offset..];
            if rest.starts_with(BLOCK_START) {
                return Some((offset, Opener::Block));
            }
            if rest.starts_with(VAR_START) {
                return Some((offset, Opener::Var));
            }
            if rest.starts_with(COMMENT_START) {
                return Some((offset, Opener::Comment));
            }
            from = offset + 1;
        }
        None
    }

    fn push(&mut self, kind: TokenKind, text: String, start: usize, end: usize) {
        let position = self.index.position(start);
        self.tokens.push(Token {
            kind,
            text,
            start,
            end,
            line: position.line,
            column: position.column,
        });
    }

    fn push_error(&mut self, message: impl Into<String>, start: usize, end: usize) {
        self.push(TokenKind::Error, message.into(), start, end);
    }

    /// Emit a text token for `start..end`, applying pending whitespace control.
    fn push_text(&mut self, start: usize, end: usize, trailing: Option<Trim>) {
        let mut start = start;
        let mut end = end;

        if let Some(trim) = self.trim_next.take() {
            let text = &self.source[start..end];
            let kept = text.trim_start_matches(|c| trim.strips(c));
            start += text.len() - kept.len();
        }
        if let Some(trim) = trailing {
            let text = &self.source[start..end];
            end = start + text.trim_end_matches(|c| trim.strips(c)).len();
        }

        if start < end {
            self.push(
                TokenKind::Text,
                self.source[start..end].to_string(),
                start,
                end,
            );
        }
    }

    fn lex_comment(&mut self) {
        let start = self.current;
        match self.source[start + 2..].find(COMMENT_END) {
            Some(pos) => {
                let close = start + 2 + pos;
                self.trim_next = self.source[..close]
                    .chars()
                    .next_back()
                    .filter(|_| close > start + 2)
                    .and_then(Trim::from_char);
                self.current = close + COMMENT_END.len();
            }
            None => {
                self.push_error("unclosed comment", start, self.source.len());
                self.current = self.source.len();
            }
        }
    }

    fn lex_tag(&mut self, kind: TokenKind) {
        let start = self.current;
        let (open, close, end_kind) = match kind {
            TokenKind::BlockStart => (BLOCK_START, BLOCK_END, TokenKind::BlockEnd),
            _ => (VAR_START, VAR_END, TokenKind::VarEnd),
        };

        let mut open_len = open.len();
        if self.source[start + open_len..]
            .chars()
            .next()
            .and_then(Trim::from_char)
            .is_some()
        {
            open_len += 1;
        }
        self.push(kind, open.to_string(), start, start + open_len);
        self.current = start + open_len;
        self.brackets.clear();

        loop {
            self.skip_whitespace();

            if self.current >= self.source.len() {
                self.push_error("unclosed tag", start, self.source.len());
                return;
            }

            if let Some((len, trim)) = self.match_close(close)
                && !self.closes_hash(close)
            {
                // The tag ends here even with brackets left open.
                if let Some(&(bracket, at)) = self.brackets.last() {
                    let end = at + bracket.len_utf8();
                    self.push_error(format!("unclosed \"{}\"", bracket), at, end);
                    self.brackets.clear();
                }
                self.push(
                    end_kind,
                    close.to_string(),
                    self.current,
                    self.current + len,
                );
                self.current += len;
                self.trim_next = trim;
                if end_kind == TokenKind::BlockEnd {
                    self.lex_raw_body();
                }
                return;
            }

            self.lex_expression_token(close);
        }
    }

    /// Length of the closing delimiter at the cursor, with its trim modifier.
    fn match_close(&self, close: &str) -> Option<(usize, Option<Trim>)> {
        let rest = &self.source[self.current..];
        if rest.starts_with(close) {
            return Some((close.len(), None));
        }
        let mut chars = rest.chars();
        let trim = chars.next().and_then(Trim::from_char)?;
        chars
            .as_str()
            .starts_with(close)
            .then_some((close.len() + 1, Some(trim)))
    }

    /// Whether the `}` run at the cursor closes open hashes rather than the print.
    ///
    /// `{{ {a: {b: 1}} }}` and `{{ {a: 1}}}` close hashes first. With exactly one
    /// brace too many for the open hashes, `{{ { }}`, the print ends.
    fn closes_hash(&self, close: &str) -> bool {
        if close != VAR_END {
            return false;
        }
        let open = self
            .brackets
            .iter()
            .rev()
            .take_while(|(c, _)| *c == '{')
            .count();
        let run = self.source[self.current..]
            .chars()
            .take_while(|c| *c == '}')
            .count();
        open > 0 && run > 0 && (run <= open || run >= open + 2)
    }

    /// After `{% verbatim %}` or `{% raw %}`, emit everything up to the end tag as text.
    fn lex_raw_body(&mut self) {
        let n = self.tokens.len();
        if n < 3 || self.tokens[n - 3].kind != TokenKind::BlockStart {
            return;
        }
        let name = &self.tokens[n - 2];
        if name.kind != TokenKind::Name || !RAW_TAGS.contains(&name.text.as_str()) {
            return;
        }

        let end_regex: &Regex = if name.text == "verbatim" {
            &END_VERBATIM_REGEX
        } else {
            &END_RAW_REGEX
        };

        let found = end_regex.captures(&self.source[self.current..]).and_then(|caps| {
            let whole = caps.get(0)?;
            let trim = caps
                .get(1)
                .and_then(|m| m.as_str().chars().next())
                .and_then(Trim::from_char);
            Some((self.current + whole.start(), trim))
        });

        match found {
            Some((end, trim)) => {
                self.push_text(self.current, end, trim);
                self.current = end;
            }
            None => {
                self.push_text(self.current, self.source.len(), None);
                self.current = self.source.len();
            }
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.source[self.current..];
        self.current += rest.len() - rest.trim_start().len();
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn lex_expression_token(&mut self, close: &str) {
        let start = self.current;
        let Some(c) = self.peek() else {
            return;
        };

        if c.is_ascii_digit() {
            self.lex_number();
        } else if c == '"' || c == '\'' {
            self.lex_string(c, close);
        } else if is_name_start(c) {
            self.lex_name();
        } else if let Some(op) = OPERATORS
            .iter()
            .find(|op| self.source[start..].starts_with(**op))
        {
            self.current += op.len();
            self.push(TokenKind::Operator, op.to_string(), start, self.current);
        } else if PUNCTUATION.contains(c) {
            self.current += c.len_utf8();
            self.lex_punctuation(c, start);
        } else {
            self.current += c.len_utf8();
            self.push_error(format!("unexpected character \"{}\"", c), start, self.current);
        }
    }

    fn lex_number(&mut self) {
        let start = self.current;
        let bytes = self.source.as_bytes();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        self.current = end;
        self.push(
            TokenKind::Number,
            self.source[start..end].to_string(),
            start,
            end,
        );
    }

    fn lex_name(&mut self) {
        let start = self.current;
        let rest = &self.source[start..];
        let len = rest
            .char_indices()
            .find(|(_, c)| !is_name_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let end = start + len;

        // Bitwise operators are spelled with a dash: `b-and`, `b-or`, `b-xor`.
        if &self.source[start..end] == "b" {
            for op in ["-and", "-or", "-xor"] {
                let after = end + op.len();
                if self.source[end..].starts_with(op)
                    && !self.source[after..].chars().next().is_some_and(is_name_char)
                {
                    self.current = after;
                    self.push(
                        TokenKind::Operator,
                        self.source[start..after].to_string(),
                        start,
                        after,
                    );
                    return;
                }
            }
        }

        self.current = end;
        self.push(
            TokenKind::Name,
            self.source[start..end].to_string(),
            start,
            end,
        );
    }

    fn lex_string(&mut self, quote: char, close: &str) {
        let start = self.current;
        let mut value = String::new();
        let mut chars = self.source[start + 1..].char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, e)) if e == quote || e == '\\' => value.push(e),
                    Some((_, e)) => {
                        value.push('\\');
                        value.push(e);
                    }
                    None => break,
                },
                c if c == quote => {
                    let end = start + 1 + i + c.len_utf8();
                    self.current = end;
                    self.push(TokenKind::String, value, start, end);
                    return;
                }
                c => value.push(c),
            }
        }

        // Unterminated: resume at the next closing delimiter so the tag still ends.
        let resume = self.source[start + 1..]
            .find(close)
            .map(|pos| {
                let at = start + 1 + pos;
                match self.source[..at].chars().next_back() {
                    Some('-' | '~') if at - 1 > start => at - 1,
                    _ => at,
                }
            })
            .unwrap_or(self.source.len());
        self.push_error("unterminated string", start, resume);
        self.current = resume;
        self.brackets.clear();
    }

    fn lex_punctuation(&mut self, c: char, start: usize) {
        match c {
            '(' | '[' | '{' => self.brackets.push((c, start)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if self.brackets.last().map(|(open, _)| *open) == Some(expected) {
                    self.brackets.pop();
                } else {
                    self.push_error(format!("unexpected \"{}\"", c), start, self.current);
                    return;
                }
            }
            _ => {}
        }
        self.push(TokenKind::Punctuation, c.to_string(), start, self.current);
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::core::template::lexer::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn k(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn test_text_only() {
        assert_eq!(
            kinds("Hello"),
            vec![k(TokenKind::Text, "Hello"), k(TokenKind::Eof, "")]
        );
    }

    #[test]
    fn test_print_with_filter() {
        assert_eq!(
            kinds("{{ 'key'|trans }}"),
            vec![
                k(TokenKind::VarStart, "{{"),
                k(TokenKind::String, "key"),
                k(TokenKind::Punctuation, "|"),
                k(TokenKind::Name, "trans"),
                k(TokenKind::VarEnd, "}}"),
                k(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_block_tag() {
        assert_eq!(
            kinds("{% trans_default_domain 'admin' %}"),
            vec![
                k(TokenKind::BlockStart, "{%"),
                k(TokenKind::Name, "trans_default_domain"),
                k(TokenKind::String, "admin"),
                k(TokenKind::BlockEnd, "%}"),
                k(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_comment_is_dropped() {
        assert_eq!(
            kinds("a{# note #}b"),
            vec![
                k(TokenKind::Text, "a"),
                k(TokenKind::Text, "b"),
                k(TokenKind::Eof, "")
            ]
        );
    }

    #[test]
    fn test_token_positions() {
        let tokens = tokenize("line one\n  {{ 'key' }}");
        let string = tokens
            .iter()
            .find(|t| t.kind == TokenKind::String)
            .unwrap();
        assert_eq!((string.line, string.column), (1, 5));
        assert_eq!((string.start, string.end), (14, 19));
    }

    #[test]
    fn test_token_dump() {
        let dump: Vec<String> = tokenize("{% trans_default_domain 'admin' %}\n<h1>{{ 'page.title'|trans }}</h1>\n")
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| format!("{}:{} {} {:?}", t.line, t.column, t.kind, t.text))
            .collect();

        insta::assert_snapshot!(dump.join("\n"), @r#"
        0:0 block start "{%"
        0:3 name "trans_default_domain"
        0:24 string "admin"
        0:32 block end "%}"
        0:34 text "\n<h1>"
        1:4 variable start "{{"
        1:7 string "page.title"
        1:19 punctuation "|"
        1:20 name "trans"
        1:26 variable end "}}"
        1:28 text "</h1>\n"
        "#);
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("{{ a ?? b ** 2 // 3 }}"),
            vec![
                k(TokenKind::VarStart, "{{"),
                k(TokenKind::Name, "a"),
                k(TokenKind::Operator, "??"),
                k(TokenKind::Name, "b"),
                k(TokenKind::Operator, "**"),
                k(TokenKind::Number, "2"),
                k(TokenKind::Operator, "//"),
                k(TokenKind::Number, "3"),
                k(TokenKind::VarEnd, "}}"),
                k(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_range_operator_after_number() {
        let tokens = kinds("{{ 1..5 }}");
        assert_eq!(tokens[1], k(TokenKind::Number, "1"));
        assert_eq!(tokens[2], k(TokenKind::Operator, ".."));
        assert_eq!(tokens[3], k(TokenKind::Number, "5"));
    }

    #[test]
    fn test_bitwise_operator() {
        let tokens = kinds("{{ a b-and b }}");
        assert_eq!(tokens[2], k(TokenKind::Operator, "b-and"));
        assert_eq!(tokens[3], k(TokenKind::Name, "b"));
    }

    #[test]
    fn test_hash_closing_braces_inside_print() {
        let tokens = kinds("{{ {a: {b: 1}} }}");
        let ends = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::VarEnd)
            .count();
        assert_eq!(ends, 1);
        assert_eq!(tokens[tokens.len() - 2], k(TokenKind::VarEnd, "}}"));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = kinds(r#"{{ 'it\'s' ~ "a\"b" }}"#);
        assert_eq!(tokens[1], k(TokenKind::String, "it's"));
        assert_eq!(tokens[3], k(TokenKind::String, "a\"b"));
    }

    #[test]
    fn test_whitespace_control() {
        assert_eq!(
            kinds("a  {{- x -}}  \n b {{~ y }}"),
            vec![
                k(TokenKind::Text, "a"),
                k(TokenKind::VarStart, "{{"),
                k(TokenKind::Name, "x"),
                k(TokenKind::VarEnd, "}}"),
                k(TokenKind::Text, "b"),
                k(TokenKind::VarStart, "{{"),
                k(TokenKind::Name, "y"),
                k(TokenKind::VarEnd, "}}"),
                k(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_line_trim_keeps_newlines() {
        let tokens = kinds("a \n {{~ x }}");
        assert_eq!(tokens[0], k(TokenKind::Text, "a \n"));
    }

    #[test]
    fn test_trimmed_text_span() {
        let tokens = tokenize("{%- if x -%}\n  body  \n{%- endif %}");
        let text = tokens.iter().find(|t| t.kind == TokenKind::Text).unwrap();
        assert_eq!(text.text, "body");
        assert_eq!((text.line, text.column), (1, 2));
    }

    #[test]
    fn test_unterminated_string_resyncs_at_tag_end() {
        let tokens = kinds("{{ 'oops }} after");
        assert_eq!(
            tokens,
            vec![
                k(TokenKind::VarStart, "{{"),
                k(TokenKind::Error, "unterminated string"),
                k(TokenKind::VarEnd, "}}"),
                k(TokenKind::Text, " after"),
                k(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_unclosed_tag() {
        let tokens = tokenize("text {% if x");
        let error = &tokens[tokens.len() - 2];
        assert_eq!(error.kind, TokenKind::Error);
        assert_eq!(error.text, "unclosed tag");
        assert_eq!((error.start, error.end), (5, 12));
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_unclosed_comment() {
        let tokens = kinds("a {# never closed");
        assert_eq!(tokens[1], k(TokenKind::Error, "unclosed comment"));
    }

    #[test]
    fn test_unbalanced_bracket() {
        let tokens = kinds("{{ a) }}");
        assert_eq!(tokens[2], k(TokenKind::Error, "unexpected \")\""));
        assert_eq!(tokens[3], k(TokenKind::VarEnd, "}}"));
    }

    #[test]
    fn test_unclosed_bracket_ends_at_tag_close() {
        let tokens = kinds("{{ foo( }}{{ 'a'|trans }}");
        assert_eq!(
            tokens,
            vec![
                k(TokenKind::VarStart, "{{"),
                k(TokenKind::Name, "foo"),
                k(TokenKind::Punctuation, "("),
                k(TokenKind::Error, "unclosed \"(\""),
                k(TokenKind::VarEnd, "}}"),
                k(TokenKind::VarStart, "{{"),
                k(TokenKind::String, "a"),
                k(TokenKind::Punctuation, "|"),
                k(TokenKind::Name, "trans"),
                k(TokenKind::VarEnd, "}}"),
                k(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_unclosed_bracket_in_block_tag() {
        let tokens = kinds("{% set x = [1, %}ok");
        assert_eq!(tokens[7], k(TokenKind::Error, "unclosed \"[\""));
        assert_eq!(tokens[8], k(TokenKind::BlockEnd, "%}"));
        assert_eq!(tokens[9], k(TokenKind::Text, "ok"));
    }

    #[test]
    fn test_unclosed_hash_ends_print() {
        let tokens = kinds("{{ { }}{{ 'a' }}");
        assert_eq!(tokens[2], k(TokenKind::Error, "unclosed \"{\""));
        assert_eq!(tokens[3], k(TokenKind::VarEnd, "}}"));
        assert_eq!(tokens[5], k(TokenKind::String, "a"));
    }

    #[test]
    fn test_hash_closed_right_before_print_end() {
        let tokens = kinds("{{ {a: 1}}}");
        assert_eq!(tokens[5], k(TokenKind::Punctuation, "}"));
        assert_eq!(tokens[6], k(TokenKind::VarEnd, "}}"));
        assert_eq!(tokens[7], k(TokenKind::Eof, ""));
    }

    #[test]
    fn test_unexpected_character() {
        let tokens = kinds("{{ a @ b }}");
        assert_eq!(tokens[2], k(TokenKind::Error, "unexpected character \"@\""));
        assert_eq!(tokens[3], k(TokenKind::Name, "b"));
    }

    #[test]
    fn test_verbatim_body_is_text() {
        assert_eq!(
            kinds("{% verbatim %}{{ 'x'|trans }}{% endverbatim %}"),
            vec![
                k(TokenKind::BlockStart, "{%"),
                k(TokenKind::Name, "verbatim"),
                k(TokenKind::BlockEnd, "%}"),
                k(TokenKind::Text, "{{ 'x'|trans }}"),
                k(TokenKind::BlockStart, "{%"),
                k(TokenKind::Name, "endverbatim"),
                k(TokenKind::BlockEnd, "%}"),
                k(TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_lexing_is_repeatable() {
        let source = "{% trans %}hello{% endtrans %} {{ 'a'|trans({}, 'b') }}";
        assert_eq!(tokenize(source), tokenize(source));
    }
}
