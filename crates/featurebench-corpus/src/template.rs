//! Text-format parser for request-template documents.
//!
//! The template is a protobuf-text-format document against a fixed schema:
//!
//! ```text
//! requests_per_featurestore {
//!   featurestore_id: "fs"
//!   requests {
//!     read_feature_values_request {
//!       entity_type: "users"
//!       entity_id: "${ENTITY_ID}"
//!       feature_selector { id_matcher { ids: "age" ids: "height" } }
//!     }
//!   }
//! }
//! ```
//!
//! The parser accepts the subset the schema needs: quoted string scalars,
//! nested messages (with an optional `:` before `{`), repeated fields by
//! re-occurrence, and `#` line comments. Unknown fields and duplicate
//! singular fields are rejected.

use std::iter::Peekable;
use std::str::Chars;

use featurebench_core::{BenchError, BenchResult};

/// Parsed template document: the `requests_per_featurestore` groups in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestTemplate {
    pub groups: Vec<FeaturestoreGroup>,
}

/// One `requests_per_featurestore` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturestoreGroup {
    pub featurestore_id: String,
    pub requests: Vec<TemplateRequest>,
}

/// One templated request: the `oneof` between the point and streaming read
/// shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRequest {
    Read(ReadTemplate),
    StreamingRead(StreamingReadTemplate),
}

/// Template for a single-entity read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTemplate {
    pub entity_type: String,
    pub entity_id: String,
    pub feature_ids: Vec<String>,
}

/// Template for a streaming read over several entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingReadTemplate {
    pub entity_type: String,
    pub entity_ids: Vec<String>,
    pub feature_ids: Vec<String>,
}

/// Parses a template document.
///
/// # Errors
///
/// Returns `BenchError::InputMalformed` on any lexical or structural error,
/// with the offending line number.
pub fn parse_template(input: &str) -> BenchResult<RequestTemplate> {
    let tokens = tokenize(input)?;
    Parser { tokens, pos: 0 }.parse_document()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Colon,
    LBrace,
    RBrace,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("`{name}`"),
            Token::Str(_) => "string literal".to_string(),
            Token::Colon => "`:`".to_string(),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
        }
    }
}

fn template_error(line: usize, message: impl std::fmt::Display) -> BenchError {
    BenchError::input(format!("template line {line}: {message}"))
}

fn tokenize(input: &str) -> BenchResult<Vec<(Token, usize)>> {
    let mut chars: Peekable<Chars<'_>> = input.chars().peekable();
    let mut tokens = Vec::new();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Line comment.
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ':' => {
                tokens.push((Token::Colon, line));
                chars.next();
            }
            '{' => {
                tokens.push((Token::LBrace, line));
                chars.next();
            }
            '}' => {
                tokens.push((Token::RBrace, line));
                chars.next();
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None | Some('\n') => {
                            return Err(template_error(line, "unterminated string literal"));
                        }
                        Some(c) if c == quote => break,
                        Some('\\') => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(c @ ('\\' | '"' | '\'')) => value.push(c),
                            other => {
                                return Err(template_error(
                                    line,
                                    format!("unsupported escape `\\{}`", other.unwrap_or(' ')),
                                ));
                            }
                        },
                        Some(c) => value.push(c),
                    }
                }
                tokens.push((Token::Str(value), line));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Token::Ident(name), line));
            }
            other => {
                return Err(template_error(line, format!("unexpected character `{other}`")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn parse_document(mut self) -> BenchResult<RequestTemplate> {
        let mut groups = Vec::new();
        while self.pos < self.tokens.len() {
            let (name, line) = self.field_name()?;
            if name != "requests_per_featurestore" {
                return Err(template_error(
                    line,
                    format!("unknown field `{name}` at document root"),
                ));
            }
            self.open_message()?;
            groups.push(self.parse_group()?);
        }
        Ok(RequestTemplate { groups })
    }

    fn parse_group(&mut self) -> BenchResult<FeaturestoreGroup> {
        let mut featurestore_id: Option<String> = None;
        let mut requests = Vec::new();

        while !self.consume_rbrace()? {
            let (name, line) = self.field_name()?;
            match name.as_str() {
                "featurestore_id" => {
                    let value = self.string_value()?;
                    if featurestore_id.replace(value).is_some() {
                        return Err(template_error(
                            line,
                            "singular field `featurestore_id` specified more than once",
                        ));
                    }
                }
                "requests" => {
                    self.open_message()?;
                    requests.push(self.parse_request(line)?);
                }
                other => {
                    return Err(template_error(
                        line,
                        format!("unknown field `{other}` in `requests_per_featurestore`"),
                    ));
                }
            }
        }

        Ok(FeaturestoreGroup {
            featurestore_id: featurestore_id.unwrap_or_default(),
            requests,
        })
    }

    fn parse_request(&mut self, open_line: usize) -> BenchResult<TemplateRequest> {
        let mut request: Option<TemplateRequest> = None;

        while !self.consume_rbrace()? {
            let (name, line) = self.field_name()?;
            if request.is_some() {
                return Err(template_error(
                    line,
                    "`requests` carries more than one request variant",
                ));
            }
            match name.as_str() {
                "read_feature_values_request" => {
                    self.open_message()?;
                    request = Some(TemplateRequest::Read(self.parse_read()?));
                }
                "streaming_read_feature_values_request" => {
                    self.open_message()?;
                    request = Some(TemplateRequest::StreamingRead(self.parse_streaming_read()?));
                }
                other => {
                    return Err(template_error(
                        line,
                        format!("unknown field `{other}` in `requests`"),
                    ));
                }
            }
        }

        request.ok_or_else(|| template_error(open_line, "`requests` is missing a request variant"))
    }

    fn parse_read(&mut self) -> BenchResult<ReadTemplate> {
        let mut entity_type: Option<String> = None;
        let mut entity_id: Option<String> = None;
        let mut feature_ids: Option<Vec<String>> = None;

        while !self.consume_rbrace()? {
            let (name, line) = self.field_name()?;
            match name.as_str() {
                "entity_type" => {
                    if entity_type.replace(self.string_value()?).is_some() {
                        return Err(duplicate_singular(line, "entity_type"));
                    }
                }
                "entity_id" => {
                    if entity_id.replace(self.string_value()?).is_some() {
                        return Err(duplicate_singular(line, "entity_id"));
                    }
                }
                "feature_selector" => {
                    self.open_message()?;
                    if feature_ids.replace(self.parse_feature_selector()?).is_some() {
                        return Err(duplicate_singular(line, "feature_selector"));
                    }
                }
                other => {
                    return Err(template_error(
                        line,
                        format!("unknown field `{other}` in `read_feature_values_request`"),
                    ));
                }
            }
        }

        Ok(ReadTemplate {
            entity_type: entity_type.unwrap_or_default(),
            entity_id: entity_id.unwrap_or_default(),
            feature_ids: feature_ids.unwrap_or_default(),
        })
    }

    fn parse_streaming_read(&mut self) -> BenchResult<StreamingReadTemplate> {
        let mut entity_type: Option<String> = None;
        let mut entity_ids = Vec::new();
        let mut feature_ids: Option<Vec<String>> = None;

        while !self.consume_rbrace()? {
            let (name, line) = self.field_name()?;
            match name.as_str() {
                "entity_type" => {
                    if entity_type.replace(self.string_value()?).is_some() {
                        return Err(duplicate_singular(line, "entity_type"));
                    }
                }
                "entity_ids" => entity_ids.push(self.string_value()?),
                "feature_selector" => {
                    self.open_message()?;
                    if feature_ids.replace(self.parse_feature_selector()?).is_some() {
                        return Err(duplicate_singular(line, "feature_selector"));
                    }
                }
                other => {
                    return Err(template_error(
                        line,
                        format!(
                            "unknown field `{other}` in `streaming_read_feature_values_request`"
                        ),
                    ));
                }
            }
        }

        Ok(StreamingReadTemplate {
            entity_type: entity_type.unwrap_or_default(),
            entity_ids,
            feature_ids: feature_ids.unwrap_or_default(),
        })
    }

    /// `feature_selector { id_matcher { ids: "a" ... } }`, already inside the
    /// selector's braces.
    fn parse_feature_selector(&mut self) -> BenchResult<Vec<String>> {
        let mut ids: Option<Vec<String>> = None;

        while !self.consume_rbrace()? {
            let (name, line) = self.field_name()?;
            if name != "id_matcher" {
                return Err(template_error(
                    line,
                    format!("unknown field `{name}` in `feature_selector`"),
                ));
            }
            self.open_message()?;
            if ids.replace(self.parse_id_matcher()?).is_some() {
                return Err(duplicate_singular(line, "id_matcher"));
            }
        }

        Ok(ids.unwrap_or_default())
    }

    fn parse_id_matcher(&mut self) -> BenchResult<Vec<String>> {
        let mut ids = Vec::new();
        while !self.consume_rbrace()? {
            let (name, line) = self.field_name()?;
            if name != "ids" {
                return Err(template_error(
                    line,
                    format!("unknown field `{name}` in `id_matcher`"),
                ));
            }
            ids.push(self.string_value()?);
        }
        Ok(ids)
    }

    fn field_name(&mut self) -> BenchResult<(String, usize)> {
        match self.next() {
            Some((Token::Ident(name), line)) => Ok((name, line)),
            Some((token, line)) => Err(template_error(
                line,
                format!("expected a field name, found {}", token.describe()),
            )),
            None => Err(template_error(self.last_line(), "unexpected end of template")),
        }
    }

    /// Consumes the opening of a message value: `{` or `: {`.
    fn open_message(&mut self) -> BenchResult<()> {
        if matches!(self.peek(), Some((Token::Colon, _))) {
            self.pos += 1;
        }
        match self.next() {
            Some((Token::LBrace, _)) => Ok(()),
            Some((token, line)) => Err(template_error(
                line,
                format!("expected `{{`, found {}", token.describe()),
            )),
            None => Err(template_error(self.last_line(), "unexpected end of template")),
        }
    }

    /// Consumes `: "value"` after a scalar field name.
    fn string_value(&mut self) -> BenchResult<String> {
        match self.next() {
            Some((Token::Colon, _)) => {}
            Some((token, line)) => {
                return Err(template_error(
                    line,
                    format!("expected `:`, found {}", token.describe()),
                ));
            }
            None => return Err(template_error(self.last_line(), "unexpected end of template")),
        }
        match self.next() {
            Some((Token::Str(value), _)) => Ok(value),
            Some((token, line)) => Err(template_error(
                line,
                format!("expected a string literal, found {}", token.describe()),
            )),
            None => Err(template_error(self.last_line(), "unexpected end of template")),
        }
    }

    /// Consumes a `}` if it is next; errors on end of input.
    fn consume_rbrace(&mut self) -> BenchResult<bool> {
        match self.peek() {
            Some((Token::RBrace, _)) => {
                self.pos += 1;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(template_error(
                self.last_line(),
                "unexpected end of template (unbalanced `{`)",
            )),
        }
    }

    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|(_, line)| *line).unwrap_or(1)
    }
}

fn duplicate_singular(line: usize, field: &str) -> BenchError {
    template_error(
        line,
        format!("singular field `{field}` specified more than once"),
    )
}
