//! Recursive-descent Twig parser.
//!
//! Errors local to one tag or print are recorded as recovered and the parser
//! skips to the next tag boundary. Structural errors (unclosed paired tags,
//! stray end or branch tags) stop the parse: the resulting tree has an
//! unknown shape and must not be used to attribute keys to domains.

use std::fmt;

use thiserror::Error;

use super::annotate::annotate;
use super::ast::{Ast, NodeId, NodeKind};
use super::lexer::tokenize;
use super::token::{Token, TokenKind};
use crate::core::data::{LineIndex, TextRange};

/// Tags that take a body closed by `end<name>`.
///
/// `block` is only paired without a shortcut value and `set` only without `=`.
const PAIRED_TAGS: &[&str] = &[
    "apply",
    "autoescape",
    "block",
    "cache",
    "embed",
    "filter",
    "for",
    "guard",
    "macro",
    "sandbox",
    "set",
    "spaceless",
    "stopwatch",
    "verbatim",
    "raw",
    "with",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Malformed token reported by the lexer.
    Lexical,
    UnexpectedToken,
    /// A paired tag without its end tag.
    UnclosedTag,
    /// An end or branch tag without a matching opening tag.
    UnexpectedTag,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Lexical => write!(f, "lexical error"),
            ParseErrorKind::UnexpectedToken => write!(f, "unexpected token"),
            ParseErrorKind::UnclosedTag => write!(f, "unclosed tag"),
            ParseErrorKind::UnexpectedTag => write!(f, "unexpected tag"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {}, column {}", .range.start.line + 1, .range.start.column + 1)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub range: TextRange,
    /// Whether parsing continued past this error.
    pub recovered: bool,
}

/// Annotated syntax tree of one template plus everything that went wrong on the way.
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    pub ast: Ast,
    pub errors: Vec<ParseError>,
}

impl ParsedTemplate {
    /// True when an unrecoverable error made the tree unreliable.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| !e.recovered)
    }
}

/// Lex, parse and annotate a template.
pub fn parse(source: &str) -> ParsedTemplate {
    Parser::new(source).parse()
}

/// Marker for an unrecoverable error, already recorded in the error list.
struct Fatal;

type StatementResult<T> = Result<T, Fatal>;
type ExprResult = Result<NodeId, ParseError>;

struct OpenTag<'n> {
    name: &'n str,
    start: usize,
}

/// The tag that ended a body: its name has been consumed, its `%}` has not.
struct EndTag {
    name: String,
    start: usize,
}

#[derive(Default)]
struct TransHeader {
    vars: Option<NodeId>,
    count: Option<NodeId>,
    domain: Option<NodeId>,
    locale: Option<NodeId>,
}

pub struct Parser<'a> {
    source: &'a str,
    index: LineIndex<'a>,
    tokens: Vec<Token>,
    pos: usize,
    prev_end: usize,
    ast: Ast,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            index: LineIndex::new(source),
            tokens: tokenize(source),
            pos: 0,
            prev_end: 0,
            ast: Ast::new(),
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> ParsedTemplate {
        let body = match self.parse_body(None, &[]) {
            Ok((body, _)) => body,
            Err(Fatal) => Vec::new(),
        };
        let range = self.range(0, self.source.len());
        self.ast.finish_root(body, range);
        annotate(&mut self.ast);

        ParsedTemplate {
            ast: self.ast,
            errors: self.errors,
        }
    }

    // ============================================================
    // Token helpers
    // ============================================================

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        self.prev_end = token.end;
        token
    }

    fn range(&self, start: usize, end: usize) -> TextRange {
        self.index.range(start, end)
    }

    fn alloc(&mut self, kind: NodeKind, start: usize, end: usize) -> NodeId {
        let range = self.range(start, end);
        self.ast.alloc(kind, range)
    }

    /// Allocate a node spanning from the start of `first` to the last consumed token.
    fn alloc_from(&mut self, kind: NodeKind, first: NodeId) -> NodeId {
        let start = self.ast[first].range.start.offset;
        self.alloc(kind, start, self.prev_end)
    }

    fn error(
        &self,
        kind: ParseErrorKind,
        message: impl Into<String>,
        start: usize,
        end: usize,
    ) -> ParseError {
        ParseError {
            kind,
            message: message.into(),
            range: self.range(start, end),
            recovered: true,
        }
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        match token.kind {
            TokenKind::Error => self.error(
                ParseErrorKind::Lexical,
                token.text.clone(),
                token.start,
                token.end,
            ),
            _ => self.error(
                ParseErrorKind::UnexpectedToken,
                format!("unexpected {}", token),
                token.start,
                token.end,
            ),
        }
    }

    fn record(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    fn fatal(
        &mut self,
        kind: ParseErrorKind,
        message: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Fatal {
        let mut error = self.error(kind, message, start, end);
        error.recovered = false;
        self.errors.push(error);
        Fatal
    }

    /// Skip to the end of the current tag or print.
    ///
    /// A closing delimiter is consumed, an opening delimiter is left for the caller.
    fn recover(&mut self) {
        loop {
            match self.peek().kind {
                TokenKind::BlockEnd | TokenKind::VarEnd => {
                    self.advance();
                    return;
                }
                TokenKind::BlockStart | TokenKind::VarStart | TokenKind::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn expect_punctuation(&mut self, text: &str) -> Result<Token, ParseError> {
        if self.peek().is_punctuation(text) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            let mut error = self.unexpected(&token);
            if error.kind == ParseErrorKind::UnexpectedToken {
                error.message = format!("{}, expected \"{}\"", error.message, text);
            }
            Err(error)
        }
    }

    /// Consume the `%}` closing a tag, recovering if something else is there.
    fn finish_tag(&mut self) -> usize {
        let token = self.peek().clone();
        if token.kind == TokenKind::BlockEnd {
            self.advance();
            token.end
        } else {
            let error = self.unexpected(&token);
            self.record(error);
            self.recover();
            self.prev_end
        }
    }

    // ============================================================
    // Statements
    // ============================================================

    fn parse_body(
        &mut self,
        open: Option<&OpenTag>,
        terminators: &[&str],
    ) -> StatementResult<(Vec<NodeId>, EndTag)> {
        let mut body = Vec::new();

        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Eof => {
                    return match open {
                        None => Ok((
                            body,
                            EndTag {
                                name: String::new(),
                                start: token.start,
                            },
                        )),
                        Some(open) => Err(self.fatal(
                            ParseErrorKind::UnclosedTag,
                            format!(
                                "unclosed \"{}\" tag, expected \"{}\"",
                                open.name,
                                terminators.join("\" or \"")
                            ),
                            open.start,
                            token.start,
                        )),
                    };
                }
                TokenKind::Text => {
                    self.advance();
                    let id = self.alloc(
                        NodeKind::Text { value: token.text },
                        token.start,
                        token.end,
                    );
                    body.push(id);
                }
                TokenKind::VarStart => {
                    if let Some(id) = self.parse_print() {
                        body.push(id);
                    }
                }
                TokenKind::BlockStart => {
                    self.advance();
                    let name = self.peek().clone();
                    if name.kind != TokenKind::Name {
                        let error = self.unexpected(&name);
                        self.record(error);
                        self.recover();
                        continue;
                    }
                    if terminators.contains(&name.text.as_str()) {
                        self.advance();
                        return Ok((
                            body,
                            EndTag {
                                name: name.text,
                                start: token.start,
                            },
                        ));
                    }
                    if let Some(at) = name
                        .text
                        .strip_prefix("end")
                        .and_then(|opener| self.unpaired_opener(&body, opener))
                    {
                        // A tag not known to be paired turns out to have a body.
                        self.advance();
                        let end = self.finish_tag();
                        let inner = body.split_off(at + 1);
                        let range = self.range(self.ast[body[at]].range.start.offset, end);
                        self.ast.adopt_body(body[at], inner, range);
                        let error = self.error(
                            ParseErrorKind::UnexpectedTag,
                            format!("\"{}\" closes a tag parsed as unpaired", name.text),
                            token.start,
                            name.end,
                        );
                        self.record(error);
                        continue;
                    }
                    if is_closing_tag(&name.text) {
                        return Err(self.fatal(
                            ParseErrorKind::UnexpectedTag,
                            format!("unexpected \"{}\" tag", name.text),
                            token.start,
                            name.end,
                        ));
                    }
                    self.advance();
                    if let Some(id) = self.parse_tag(&name.text, token.start)? {
                        body.push(id);
                    }
                }
                _ => {
                    self.advance();
                    let error = self.unexpected(&token);
                    self.record(error);
                }
            }
        }
    }

    /// Position in `body` of the last unpaired generic tag named `name`.
    ///
    /// Tags with a known pairing never qualify, so a stray `endif` or `endfor` stays fatal.
    fn unpaired_opener(&self, body: &[NodeId], name: &str) -> Option<usize> {
        if PAIRED_TAGS.contains(&name) || matches!(name, "if" | "trans") {
            return None;
        }
        body.iter().rposition(|id| {
            matches!(
                &self.ast[*id].kind,
                NodeKind::GenericTag { name: tag, body: inner, .. } if tag == name && inner.is_empty()
            )
        })
    }

    fn parse_print(&mut self) -> Option<NodeId> {
        let start = self.advance();
        match self.parse_expression() {
            Ok(expression) => {
                let token = self.peek().clone();
                if token.kind == TokenKind::VarEnd {
                    self.advance();
                    Some(self.alloc(NodeKind::Print { expression }, start.start, token.end))
                } else {
                    let error = self.unexpected(&token);
                    self.record(error);
                    self.recover();
                    None
                }
            }
            Err(error) => {
                self.record(error);
                self.recover();
                None
            }
        }
    }

    fn parse_tag(&mut self, name: &str, start: usize) -> StatementResult<Option<NodeId>> {
        match name {
            "trans" => self.parse_trans(start).map(Some),
            "trans_default_domain" => Ok(self.parse_trans_default_domain(start)),
            "if" => self.parse_if(start).map(Some),
            _ => self.parse_generic(name, start).map(Some),
        }
    }

    fn parse_trans(&mut self, start: usize) -> StatementResult<NodeId> {
        let open = OpenTag {
            name: "trans",
            start,
        };

        match self.parse_trans_header() {
            Ok(header) => {
                let (body, _) = self.parse_body(Some(&open), &["endtrans"])?;
                let end = self.finish_tag();
                Ok(self.alloc(
                    NodeKind::TransStatement {
                        vars: header.vars,
                        count: header.count,
                        domain: header.domain,
                        locale: header.locale,
                        body,
                    },
                    start,
                    end,
                ))
            }
            Err(error) => {
                // Keep the structure but never treat a broken header as a translation.
                self.record(error);
                self.recover();
                let (body, _) = self.parse_body(Some(&open), &["endtrans"])?;
                let end = self.finish_tag();
                Ok(self.alloc(
                    NodeKind::GenericTag {
                        name: "trans".to_string(),
                        arguments: Vec::new(),
                        body,
                        alternate: Vec::new(),
                    },
                    start,
                    end,
                ))
            }
        }
    }

    fn parse_trans_header(&mut self) -> Result<TransHeader, ParseError> {
        let mut header = TransHeader::default();
        loop {
            let token = self.peek().clone();
            if token.kind == TokenKind::BlockEnd {
                self.advance();
                return Ok(header);
            }
            if token.kind != TokenKind::Name {
                return Err(self.unexpected(&token));
            }
            let slot = match token.text.as_str() {
                "with" => &mut header.vars,
                "count" => &mut header.count,
                "from" => &mut header.domain,
                "into" => &mut header.locale,
                _ => return Err(self.unexpected(&token)),
            };
            if slot.is_some() {
                return Err(self.error(
                    ParseErrorKind::UnexpectedToken,
                    format!("duplicate \"{}\" clause in trans tag", token.text),
                    token.start,
                    token.end,
                ));
            }
            self.advance();
            *slot = Some(self.parse_expression()?);
        }
    }

    fn parse_trans_default_domain(&mut self, start: usize) -> Option<NodeId> {
        match self.parse_expression() {
            Ok(domain) => {
                let end = self.finish_tag();
                Some(self.alloc(
                    NodeKind::TransDefaultDomainStatement { domain },
                    start,
                    end,
                ))
            }
            Err(error) => {
                self.record(error);
                self.recover();
                None
            }
        }
    }

    fn parse_if(&mut self, start: usize) -> StatementResult<NodeId> {
        let test = match self.parse_expression() {
            Ok(test) => {
                self.finish_tag();
                Some(test)
            }
            Err(error) => {
                self.record(error);
                self.recover();
                None
            }
        };

        let open = OpenTag { name: "if", start };
        let (consequent, branch) = self.parse_body(Some(&open), &["elseif", "else", "endif"])?;

        let (alternate, end) = match branch.name.as_str() {
            "elseif" => {
                let nested = self.parse_if(branch.start)?;
                let end = self.ast[nested].range.end.offset;
                (vec![nested], end)
            }
            "else" => {
                self.finish_tag();
                let (alternate, _) = self.parse_body(Some(&open), &["endif"])?;
                (alternate, self.finish_tag())
            }
            _ => (Vec::new(), self.finish_tag()),
        };

        Ok(self.alloc(
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            },
            start,
            end,
        ))
    }

    fn parse_generic(&mut self, name: &str, start: usize) -> StatementResult<NodeId> {
        let has_assignment = self.tag_has_assignment();
        let arguments = self.parse_tag_arguments();
        let tag_end = self.prev_end;

        let paired = match name {
            "block" => arguments.len() == 1,
            "set" => !has_assignment,
            _ => PAIRED_TAGS.contains(&name),
        };

        if !paired {
            return Ok(self.alloc(
                NodeKind::GenericTag {
                    name: name.to_string(),
                    arguments,
                    body: Vec::new(),
                    alternate: Vec::new(),
                },
                start,
                tag_end,
            ));
        }

        let open = OpenTag { name, start };
        let end_name = format!("end{}", name);
        let terminators: Vec<&str> = if name == "for" {
            vec![end_name.as_str(), "else"]
        } else {
            vec![end_name.as_str()]
        };

        let (body, end) = self.parse_body(Some(&open), &terminators)?;
        let alternate = if end.name == "else" {
            self.finish_tag();
            self.parse_body(Some(&open), &[end_name.as_str()])?.0
        } else {
            Vec::new()
        };
        let end = self.finish_tag();

        Ok(self.alloc(
            NodeKind::GenericTag {
                name: name.to_string(),
                arguments,
                body,
                alternate,
            },
            start,
            end,
        ))
    }

    /// Whether the current tag contains a top-level `=`.
    fn tag_has_assignment(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::BlockEnd | TokenKind::BlockStart | TokenKind::Eof => return false,
                TokenKind::Punctuation => match token.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    _ => {}
                },
                TokenKind::Operator if depth == 0 && token.text == "=" => return true,
                _ => {}
            }
        }
        false
    }

    fn parse_tag_arguments(&mut self) -> Vec<NodeId> {
        let mut arguments = Vec::new();
        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::BlockEnd => {
                    self.advance();
                    return arguments;
                }
                TokenKind::BlockStart | TokenKind::VarStart | TokenKind::Eof => {
                    let error = self.error(
                        ParseErrorKind::UnexpectedToken,
                        format!("unexpected {}, expected \"%}}\"", token),
                        token.start,
                        token.end,
                    );
                    self.record(error);
                    return arguments;
                }
                TokenKind::Error => {
                    self.advance();
                    let error = self.unexpected(&token);
                    self.record(error);
                }
                TokenKind::Punctuation if token.text == "," => {
                    self.advance();
                }
                TokenKind::Operator if token.text == "=" => {
                    self.advance();
                }
                _ => match self.parse_expression() {
                    Ok(id) => arguments.push(id),
                    Err(error) => {
                        self.record(error);
                        self.recover();
                        return arguments;
                    }
                },
            }
        }
    }

    // ============================================================
    // Expressions
    // ============================================================

    fn parse_expression(&mut self) -> ExprResult {
        let test = self.parse_binary(0)?;

        if self.peek().is_punctuation("?") {
            self.advance();
            let consequent = self.parse_expression()?;
            let alternate = if self.peek().is_punctuation(":") {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            return Ok(self.alloc_from(
                NodeKind::ConditionalExpression {
                    test,
                    consequent: Some(consequent),
                    alternate,
                },
                test,
            ));
        }

        if self.peek().is_operator("?:") {
            self.advance();
            let alternate = self.parse_expression()?;
            return Ok(self.alloc_from(
                NodeKind::ConditionalExpression {
                    test,
                    consequent: None,
                    alternate: Some(alternate),
                },
                test,
            ));
        }

        Ok(test)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> ExprResult {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.peek_binary_operator() {
            if op.precedence < min_precedence {
                break;
            }
            for _ in 0..op.tokens {
                self.advance();
            }
            let right = if op.operator.starts_with("is") {
                self.parse_test()?
            } else if op.right_associative {
                self.parse_binary(op.precedence)?
            } else {
                self.parse_binary(op.precedence + 1)?
            };
            left = self.alloc_from(
                NodeKind::BinaryExpression {
                    operator: op.operator,
                    left,
                    right,
                },
                left,
            );
        }

        Ok(left)
    }

    fn peek_binary_operator(&self) -> Option<BinaryOperator> {
        let token = self.peek();
        let next = self.peek_at(1);
        let op = |operator: &str, precedence: u8| BinaryOperator {
            operator: operator.to_string(),
            precedence,
            right_associative: false,
            tokens: 1,
        };

        match token.kind {
            TokenKind::Operator => match token.text.as_str() {
                "??" => Some(BinaryOperator {
                    right_associative: true,
                    ..op("??", 5)
                }),
                "**" => Some(BinaryOperator {
                    right_associative: true,
                    ..op("**", 200)
                }),
                "*" | "/" | "//" | "%" => Some(op(&token.text, 60)),
                "~" => Some(op("~", 40)),
                "+" | "-" => Some(op(&token.text, 30)),
                ".." => Some(op("..", 25)),
                "==" | "!=" | "<" | ">" | "<=" | ">=" | "<=>" => Some(op(&token.text, 20)),
                "b-and" => Some(op("b-and", 18)),
                "b-xor" => Some(op("b-xor", 17)),
                "b-or" => Some(op("b-or", 16)),
                _ => None,
            },
            TokenKind::Name => match token.text.as_str() {
                "or" => Some(op("or", 10)),
                "and" => Some(op("and", 15)),
                "in" | "matches" => Some(op(&token.text, 20)),
                "not" if next.is_name("in") => Some(BinaryOperator {
                    tokens: 2,
                    ..op("not in", 20)
                }),
                "starts" | "ends" if next.is_name("with") => Some(BinaryOperator {
                    tokens: 2,
                    ..op(&format!("{} with", token.text), 20)
                }),
                "is" if next.is_name("not") => Some(BinaryOperator {
                    tokens: 2,
                    ..op("is not", 100)
                }),
                "is" => Some(op("is", 100)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Right-hand side of `is` / `is not`: a test name with optional arguments.
    fn parse_test(&mut self) -> ExprResult {
        let token = self.peek().clone();
        if token.kind != TokenKind::Name {
            return Err(self.unexpected(&token));
        }
        self.advance();

        let mut name = token.text.clone();
        let mut end = token.end;
        let next = self.peek().clone();
        if next.kind == TokenKind::Name
            && matches!(
                (name.as_str(), next.text.as_str()),
                ("same", "as") | ("divisible", "by")
            )
        {
            self.advance();
            name = format!("{} {}", name, next.text);
            end = next.end;
        }

        let test = self.alloc(NodeKind::Identifier { name }, token.start, end);
        if self.peek().is_punctuation("(") {
            self.parse_call(test)
        } else {
            Ok(test)
        }
    }

    fn parse_unary(&mut self) -> ExprResult {
        let token = self.peek().clone();

        if token.is_name("not") {
            self.advance();
            let argument = self.parse_binary(50)?;
            return Ok(self.alloc(
                NodeKind::UnaryExpression {
                    operator: "not".to_string(),
                    argument,
                },
                token.start,
                self.prev_end,
            ));
        }

        if token.is_operator("-") || token.is_operator("+") {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.alloc(
                NodeKind::UnaryExpression {
                    operator: token.text,
                    argument,
                },
                token.start,
                self.prev_end,
            ));
        }

        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_primary(&mut self) -> ExprResult {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::String => {
                self.advance();
                Ok(self.alloc(
                    NodeKind::StringLiteral { value: token.text },
                    token.start,
                    token.end,
                ))
            }
            TokenKind::Number => {
                self.advance();
                Ok(self.alloc(
                    NodeKind::NumberLiteral { value: token.text },
                    token.start,
                    token.end,
                ))
            }
            TokenKind::Name => {
                self.advance();
                let kind = match token.text.as_str() {
                    "true" | "TRUE" => NodeKind::BooleanLiteral { value: true },
                    "false" | "FALSE" => NodeKind::BooleanLiteral { value: false },
                    "null" | "NULL" | "none" | "NONE" => NodeKind::NullLiteral,
                    _ => NodeKind::Identifier {
                        name: token.text.clone(),
                    },
                };
                let is_identifier = matches!(kind, NodeKind::Identifier { .. });
                let id = self.alloc(kind, token.start, token.end);
                if is_identifier && self.peek().is_punctuation("(") {
                    self.parse_call(id)
                } else {
                    Ok(id)
                }
            }
            TokenKind::Punctuation => match token.text.as_str() {
                "(" => {
                    self.advance();
                    let inner = self.parse_expression()?;
                    self.expect_punctuation(")")?;
                    Ok(inner)
                }
                "[" => self.parse_array(),
                "{" => self.parse_hash(),
                _ => Err(self.unexpected(&token)),
            },
            _ => Err(self.unexpected(&token)),
        }
    }

    fn parse_array(&mut self) -> ExprResult {
        let open = self.advance();
        let mut elements = Vec::new();
        while !self.peek().is_punctuation("]") {
            elements.push(self.parse_expression()?);
            if self.peek().is_punctuation(",") {
                self.advance();
            } else {
                break;
            }
        }
        let close = self.expect_punctuation("]")?;
        Ok(self.alloc(
            NodeKind::ArrayExpression { elements },
            open.start,
            close.end,
        ))
    }

    fn parse_hash(&mut self) -> ExprResult {
        let open = self.advance();
        let mut properties = Vec::new();

        while !self.peek().is_punctuation("}") {
            let key_token = self.peek().clone();
            let key = match key_token.kind {
                TokenKind::String => {
                    self.advance();
                    self.alloc(
                        NodeKind::StringLiteral {
                            value: key_token.text.clone(),
                        },
                        key_token.start,
                        key_token.end,
                    )
                }
                TokenKind::Number => {
                    self.advance();
                    self.alloc(
                        NodeKind::NumberLiteral {
                            value: key_token.text.clone(),
                        },
                        key_token.start,
                        key_token.end,
                    )
                }
                TokenKind::Name => {
                    self.advance();
                    self.alloc(
                        NodeKind::Identifier {
                            name: key_token.text.clone(),
                        },
                        key_token.start,
                        key_token.end,
                    )
                }
                TokenKind::Punctuation if key_token.text == "(" => {
                    self.advance();
                    let key = self.parse_expression()?;
                    self.expect_punctuation(")")?;
                    key
                }
                _ => return Err(self.unexpected(&key_token)),
            };

            let value = if self.peek().is_punctuation(":") {
                self.advance();
                self.parse_expression()?
            } else if key_token.kind == TokenKind::Name {
                // `{ name }` is short for `{ name: name }`.
                self.alloc(
                    NodeKind::Identifier {
                        name: key_token.text.clone(),
                    },
                    key_token.start,
                    key_token.end,
                )
            } else {
                let token = self.peek().clone();
                return Err(self.unexpected(&token));
            };

            let property = self.alloc(
                NodeKind::ObjectProperty { key, value },
                key_token.start,
                self.prev_end,
            );
            properties.push(property);

            if self.peek().is_punctuation(",") {
                self.advance();
            } else {
                break;
            }
        }

        let close = self.expect_punctuation("}")?;
        Ok(self.alloc(
            NodeKind::ObjectExpression { properties },
            open.start,
            close.end,
        ))
    }

    fn parse_postfix(&mut self, mut expression: NodeId) -> ExprResult {
        loop {
            let token = self.peek().clone();

            if token.is_punctuation(".") {
                self.advance();
                let name = self.peek().clone();
                let property = match name.kind {
                    TokenKind::Name => NodeKind::Identifier {
                        name: name.text.clone(),
                    },
                    TokenKind::Number => NodeKind::NumberLiteral {
                        value: name.text.clone(),
                    },
                    _ => return Err(self.unexpected(&name)),
                };
                self.advance();
                let property = self.alloc(property, name.start, name.end);
                expression = self.alloc_from(
                    NodeKind::MemberExpression {
                        object: expression,
                        property,
                        computed: false,
                    },
                    expression,
                );
                if self.peek().is_punctuation("(") {
                    expression = self.parse_call(expression)?;
                }
            } else if token.is_punctuation("[") {
                self.advance();
                let property = self.parse_expression()?;
                self.expect_punctuation("]")?;
                expression = self.alloc_from(
                    NodeKind::MemberExpression {
                        object: expression,
                        property,
                        computed: true,
                    },
                    expression,
                );
            } else if token.is_punctuation("|") {
                self.advance();
                let name = self.peek().clone();
                if name.kind != TokenKind::Name {
                    return Err(self.unexpected(&name));
                }
                self.advance();
                let mut filter = self.alloc(
                    NodeKind::Identifier {
                        name: name.text.clone(),
                    },
                    name.start,
                    name.end,
                );
                if self.peek().is_punctuation("(") {
                    filter = self.parse_call(filter)?;
                }
                expression = self.alloc_from(
                    NodeKind::FilterExpression { expression, filter },
                    expression,
                );
            } else {
                return Ok(expression);
            }
        }
    }

    /// Parse `(args)` after `callee`. Arguments may be positional or named (`name=value`, `name: value`).
    fn parse_call(&mut self, callee: NodeId) -> ExprResult {
        self.expect_punctuation("(")?;
        let mut arguments = Vec::new();

        while !self.peek().is_punctuation(")") {
            let token = self.peek().clone();
            let next = self.peek_at(1);
            if token.kind == TokenKind::Name && (next.is_operator("=") || next.is_punctuation(":"))
            {
                self.advance();
                self.advance();
                let key = self.alloc(
                    NodeKind::Identifier {
                        name: token.text.clone(),
                    },
                    token.start,
                    token.end,
                );
                let value = self.parse_expression()?;
                let argument = self.alloc(
                    NodeKind::NamedArgument { key, value },
                    token.start,
                    self.prev_end,
                );
                arguments.push(argument);
            } else {
                arguments.push(self.parse_expression()?);
            }

            if self.peek().is_punctuation(",") {
                self.advance();
            } else {
                break;
            }
        }

        let close = self.expect_punctuation(")")?;
        let start = self.ast[callee].range.start.offset;
        Ok(self.alloc(
            NodeKind::CallExpression { callee, arguments },
            start,
            close.end,
        ))
    }
}

struct BinaryOperator {
    operator: String,
    precedence: u8,
    right_associative: bool,
    tokens: usize,
}

/// End and branch tags that are only valid inside their opening tag.
fn is_closing_tag(name: &str) -> bool {
    name.starts_with("end") || name == "else" || name == "elseif"
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::core::template::ast::NodeType;
    use crate::core::template::parser::*;

    fn root_body(parsed: &ParsedTemplate) -> Vec<NodeId> {
        match &parsed.ast[parsed.ast.root()].kind {
            NodeKind::Template { body } => body.clone(),
            other => panic!("root is not a template: {:?}", other),
        }
    }

    fn body_types(parsed: &ParsedTemplate) -> Vec<NodeType> {
        root_body(parsed)
            .into_iter()
            .map(|id| parsed.ast[id].node_type())
            .collect()
    }

    #[test]
    fn test_text_and_print() {
        let parsed = parse("Hello {{ name }}!");
        assert!(parsed.errors.is_empty());
        assert_eq!(
            body_types(&parsed),
            vec![NodeType::Text, NodeType::Print, NodeType::Text]
        );
    }

    #[test]
    fn test_filter_with_call_arguments() {
        let parsed = parse("{{ 'greeting'|trans({}, 'messages', 'fr') }}");
        assert!(parsed.errors.is_empty());
        let ast = &parsed.ast;

        let NodeKind::Print { expression } = ast[root_body(&parsed)[0]].kind else {
            panic!("expected print");
        };
        let NodeKind::FilterExpression { expression, filter } = ast[expression].kind else {
            panic!("expected filter expression");
        };
        assert_eq!(ast.string_value(expression), Some("greeting"));
        let NodeKind::CallExpression { callee, arguments } = &ast[filter].kind else {
            panic!("expected call");
        };
        assert_eq!(ast[*callee].kind.attribute("name"), Some("trans"));
        assert_eq!(arguments.len(), 3);
        assert_eq!(ast[arguments[0]].node_type(), NodeType::ObjectExpression);
        assert_eq!(ast.string_value(arguments[1]), Some("messages"));
        assert_eq!(ast.string_value(arguments[2]), Some("fr"));
    }

    #[test]
    fn test_string_literal_range_includes_quotes() {
        let source = "{{ 'key'|trans }}";
        let parsed = parse(source);
        let NodeKind::Print { expression } = parsed.ast[root_body(&parsed)[0]].kind else {
            panic!("expected print");
        };
        let NodeKind::FilterExpression { expression, .. } = parsed.ast[expression].kind else {
            panic!("expected filter expression");
        };
        assert_eq!(parsed.ast[expression].range.slice(source), Some("'key'"));
    }

    #[test]
    fn test_named_arguments() {
        let parsed = parse("{{ 'k'|trans(domain='admin', locale: 'de') }}");
        assert!(parsed.errors.is_empty());
        let named = parsed
            .ast
            .ids()
            .filter(|id| parsed.ast[*id].node_type() == NodeType::NamedArgument)
            .count();
        assert_eq!(named, 2);
    }

    #[test]
    fn test_trans_tag_clauses() {
        let parsed =
            parse("{% trans with {'%name%': 'x'} from 'admin' into 'fr' %}hello{% endtrans %}");
        assert!(parsed.errors.is_empty());
        let ast = &parsed.ast;
        let NodeKind::TransStatement {
            vars,
            domain,
            locale,
            body,
            ..
        } = &ast[root_body(&parsed)[0]].kind
        else {
            panic!("expected trans statement");
        };
        assert_eq!(ast[vars.unwrap()].node_type(), NodeType::ObjectExpression);
        assert_eq!(ast.string_value(domain.unwrap()), Some("admin"));
        assert_eq!(ast.string_value(locale.unwrap()), Some("fr"));
        assert_eq!(body.len(), 1);
        assert_eq!(ast[body[0]].kind.attribute("value"), Some("hello"));
    }

    #[test]
    fn test_malformed_trans_header_becomes_generic_tag() {
        let parsed = parse("{% trans 'oops' %}key.name{% endtrans %}");
        assert!(!parsed.has_errors());
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].recovered);
        assert_eq!(body_types(&parsed), vec![NodeType::GenericTag]);
    }

    #[test]
    fn test_if_elseif_else() {
        let parsed = parse("{% if a %}1{% elseif b %}2{% else %}3{% endif %}");
        assert!(parsed.errors.is_empty());
        let ast = &parsed.ast;
        let NodeKind::IfStatement {
            test,
            consequent,
            alternate,
        } = &ast[root_body(&parsed)[0]].kind
        else {
            panic!("expected if");
        };
        assert!(test.is_some());
        assert_eq!(consequent.len(), 1);
        assert_eq!(alternate.len(), 1);
        let NodeKind::IfStatement {
            consequent,
            alternate,
            ..
        } = &ast[alternate[0]].kind
        else {
            panic!("expected nested if for elseif");
        };
        assert_eq!(ast[consequent[0]].kind.attribute("value"), Some("2"));
        assert_eq!(ast[alternate[0]].kind.attribute("value"), Some("3"));
    }

    #[test]
    fn test_for_else() {
        let parsed = parse("{% for item in items %}x{% else %}none{% endfor %}");
        assert!(parsed.errors.is_empty());
        let NodeKind::GenericTag {
            name,
            arguments,
            body,
            alternate,
        } = &parsed.ast[root_body(&parsed)[0]].kind
        else {
            panic!("expected generic tag");
        };
        assert_eq!(name, "for");
        assert_eq!(arguments.len(), 1);
        assert_eq!(
            parsed.ast[arguments[0]].kind.attribute("operator"),
            Some("in")
        );
        assert_eq!(body.len(), 1);
        assert_eq!(alternate.len(), 1);
    }

    #[test]
    fn test_set_paired_only_without_assignment() {
        let parsed = parse("{% set a = 1 %}{% set b %}text{% endset %}");
        assert!(parsed.errors.is_empty());
        let ast = &parsed.ast;
        let bodies: Vec<usize> = root_body(&parsed)
            .into_iter()
            .map(|id| match &ast[id].kind {
                NodeKind::GenericTag { body, .. } => body.len(),
                _ => usize::MAX,
            })
            .collect();
        assert_eq!(bodies, vec![0, 1]);
    }

    #[test]
    fn test_block_shortcut_is_unpaired() {
        let parsed = parse("{% block title 'Home' %}{% block body %}x{% endblock %}");
        assert!(parsed.errors.is_empty());
        assert_eq!(root_body(&parsed).len(), 2);
    }

    #[test]
    fn test_verbatim_body() {
        let parsed = parse("{% verbatim %}{{ 'x'|trans }}{% endverbatim %}");
        assert!(parsed.errors.is_empty());
        let NodeKind::GenericTag { body, .. } = &parsed.ast[root_body(&parsed)[0]].kind else {
            panic!("expected generic tag");
        };
        assert_eq!(parsed.ast[body[0]].node_type(), NodeType::Text);
    }

    #[test]
    fn test_operator_precedence() {
        let parsed = parse("{{ 1 + 2 * 3 }}");
        let ast = &parsed.ast;
        let NodeKind::Print { expression } = ast[root_body(&parsed)[0]].kind else {
            panic!("expected print");
        };
        let NodeKind::BinaryExpression {
            operator, right, ..
        } = &ast[expression].kind
        else {
            panic!("expected binary");
        };
        assert_eq!(operator, "+");
        assert_eq!(ast[*right].kind.attribute("operator"), Some("*"));
    }

    #[test]
    fn test_is_not_test() {
        let parsed = parse("{% if user is not defined %}{% endif %}");
        assert!(parsed.errors.is_empty());
        let NodeKind::IfStatement { test, .. } = &parsed.ast[root_body(&parsed)[0]].kind else {
            panic!("expected if");
        };
        let test = test.unwrap();
        assert_eq!(parsed.ast[test].kind.attribute("operator"), Some("is not"));
    }

    #[test]
    fn test_conditional_expression() {
        let parsed = parse("{{ a ? 'x' : 'y' }}{{ b ?: 'z' }}");
        assert!(parsed.errors.is_empty());
        let count = parsed
            .ast
            .ids()
            .filter(|id| parsed.ast[*id].node_type() == NodeType::ConditionalExpression)
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_recovers_from_broken_print() {
        let parsed = parse("{{ 'a'| }}{% if %}{% endif %}{{ 'b'|trans }}");
        assert!(!parsed.has_errors());
        assert_eq!(parsed.errors.len(), 2);
        assert!(parsed.errors.iter().all(|e| e.recovered));
        assert_eq!(
            body_types(&parsed),
            vec![NodeType::IfStatement, NodeType::Print]
        );
    }

    #[test]
    fn test_lexical_error_is_recovered() {
        let parsed = parse("{{ 'unterminated }}{{ key|trans }}");
        assert!(!parsed.has_errors());
        assert_eq!(parsed.errors[0].kind, ParseErrorKind::Lexical);
        assert_eq!(body_types(&parsed), vec![NodeType::Print]);
    }

    #[test]
    fn test_unclosed_tag_is_fatal() {
        let parsed = parse("{% if a %}{{ 'x'|trans }}");
        assert!(parsed.has_errors());
        let error = parsed.errors.last().unwrap();
        assert_eq!(error.kind, ParseErrorKind::UnclosedTag);
        assert_eq!(
            error.message,
            "unclosed \"if\" tag, expected \"elseif\" or \"else\" or \"endif\""
        );
        assert!(root_body(&parsed).is_empty());
    }

    #[test]
    fn test_stray_end_tag_is_fatal() {
        let parsed = parse("{{ 'x'|trans }}{% endif %}");
        assert!(parsed.has_errors());
        assert_eq!(
            parsed.errors.last().unwrap().kind,
            ParseErrorKind::UnexpectedTag
        );
    }

    #[test]
    fn test_unknown_paired_tag_adopts_body() {
        let source = "{% component 'card' %}{{ 'a'|trans }}{% endcomponent %}{{ 'b' }}";
        let parsed = parse(source);
        assert!(!parsed.has_errors());
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].recovered);
        assert_eq!(parsed.errors[0].kind, ParseErrorKind::UnexpectedTag);
        assert_eq!(
            body_types(&parsed),
            vec![NodeType::GenericTag, NodeType::Print]
        );

        let tag = root_body(&parsed)[0];
        let NodeKind::GenericTag { name, body, .. } = &parsed.ast[tag].kind else {
            panic!("expected generic tag");
        };
        assert_eq!(name, "component");
        assert_eq!(body.len(), 1);
        assert_eq!(parsed.ast[body[0]].parent(), Some(tag));
        assert_eq!(
            parsed.ast[tag].range.slice(source),
            Some("{% component 'card' %}{{ 'a'|trans }}{% endcomponent %}")
        );
    }

    #[test]
    fn test_stopwatch_is_paired() {
        let parsed = parse("{% stopwatch 'x' %}{{ 'a'|trans }}{% endstopwatch %}");
        assert!(parsed.errors.is_empty());
        assert_eq!(body_types(&parsed), vec![NodeType::GenericTag]);
    }

    #[test]
    fn test_end_tag_of_known_paired_tag_is_not_adopted() {
        let parsed = parse("{% include 'x' %}{% if a %}{% endif %}{% endfor %}");
        assert!(parsed.has_errors());
    }

    #[test]
    fn test_mismatched_end_tag_is_fatal() {
        let parsed = parse("{% block content %}{% endfor %}");
        assert!(parsed.has_errors());
    }

    #[test]
    fn test_error_display_is_one_based() {
        let parsed = parse("\n  {{ @ }}");
        let error = &parsed.errors[0];
        assert_eq!(
            error.to_string(),
            "unexpected character \"@\" at line 2, column 6"
        );
    }
}
