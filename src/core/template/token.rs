use std::fmt;

/// Whitespace control modifier on a tag delimiter (`{%-`, `~%}`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    /// `-`: strip all whitespace, newlines included.
    All,
    /// `~`: strip spaces and tabs only.
    Line,
}

impl Trim {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(Trim::All),
            '~' => Some(Trim::Line),
            _ => None,
        }
    }

    pub fn strips(self, c: char) -> bool {
        match self {
            Trim::All => c.is_whitespace(),
            Trim::Line => c == ' ' || c == '\t' || c == '\0' || c == '\x0B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text between tags. The token text is the (possibly trimmed) content.
    Text,
    /// `{%`
    BlockStart,
    /// `%}`
    BlockEnd,
    /// `{{`
    VarStart,
    /// `}}`
    VarEnd,
    Name,
    Number,
    /// Quoted string. The token text holds the unescaped value.
    String,
    Operator,
    Punctuation,
    /// Malformed input. The token text holds a description of the problem.
    Error,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Text => "text",
            TokenKind::BlockStart => "block start",
            TokenKind::BlockEnd => "block end",
            TokenKind::VarStart => "variable start",
            TokenKind::VarEnd => "variable end",
            TokenKind::Name => "name",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Operator => "operator",
            TokenKind::Punctuation => "punctuation",
            TokenKind::Error => "error",
            TokenKind::Eof => "end of template",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// Zero-based line of `start`.
    pub line: usize,
    /// Zero-based character column of `start`.
    pub column: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_name(&self, text: &str) -> bool {
        self.is(TokenKind::Name, text)
    }

    pub fn is_punctuation(&self, text: &str) -> bool {
        self.is(TokenKind::Punctuation, text)
    }

    pub fn is_operator(&self, text: &str) -> bool {
        self.is(TokenKind::Operator, text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of template"),
            TokenKind::Text => write!(f, "text"),
            _ => write!(f, "{} \"{}\"", self.kind, self.text),
        }
    }
}
