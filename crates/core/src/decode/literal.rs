//! Decoder for bodies shipped as a quoted script assignment.
//!
//! Some sites embed the article as `GLOBAL_CONFIG.larkContent = '...';` in a
//! `<script>` block. The quoted payload is JS-string escaped around HTML that
//! is itself entity escaped, so decoding is two passes: unescape the string
//! literal, then decode character references.
//!
//! The literal is never executed. [`LiteralStrategy::Grammar`] parses it with
//! the JS string escape grammar; [`LiteralStrategy::JsonRewrap`] rewrites it
//! into a JSON string and lets serde_json unescape it. Both agree on payloads
//! that only use escapes JSON also knows (plus `\'`).

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::entities::decode_entities;
use crate::error::DecodeError;

/// Names of the assignment to look for. `None` matches any identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentPattern {
    pub object: Option<String>,
    pub field: Option<String>,
}

impl AssignmentPattern {
    pub fn new(object: impl Into<String>, field: impl Into<String>) -> Self {
        Self { object: Some(object.into()), field: Some(field.into()) }
    }

    /// Parses `OBJECT.FIELD`.
    pub fn parse(text: &str) -> Option<Self> {
        let (object, field) = text.trim().split_once('.')?;
        let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
        (valid(object) && valid(field)).then(|| Self::new(object, field))
    }

    fn regex(&self) -> Regex {
        match (&self.object, &self.field) {
            (None, None) => ANY_ASSIGNMENT_RE.clone(),
            (object, field) => assignment_regex(object.as_deref(), field.as_deref()),
        }
    }
}

static ANY_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| assignment_regex(None, None));

fn assignment_regex(object: Option<&str>, field: Option<&str>) -> Regex {
    const IDENT: &str = r"[A-Za-z_$][\w$]*";
    let object = object.map(regex::escape).unwrap_or_else(|| IDENT.to_string());
    let field = field.map(regex::escape).unwrap_or_else(|| IDENT.to_string());
    let pattern = format!(
        r#"(?s)(?P<object>{object})\.(?P<field>{field})\s*=\s*(?:'(?P<sq>(?:[^'\\]|\\.)*)'|"(?P<dq>(?:[^"\\]|\\.)*)")\s*;"#
    );
    Regex::new(&pattern).unwrap()
}

/// A located `OBJECT.FIELD = '<payload>';` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub object: String,
    pub field: String,
    /// Raw payload between the outer quotes, still escaped.
    pub payload: String,
}

impl Assignment {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let payload = caps.name("sq").or_else(|| caps.name("dq"))?;
        Some(Self {
            object: caps["object"].to_string(),
            field: caps["field"].to_string(),
            payload: payload.as_str().to_string(),
        })
    }

    /// Whether the still-escaped payload carries markup, in plain, JS-escaped
    /// or entity-escaped form.
    pub fn carries_markup(&self) -> bool {
        let lower = self.payload.to_ascii_lowercase();
        ["<", "\\x3c", "\\u003c", "&lt;", "&#60;", "&#x3c;"].iter().any(|open| lower.contains(open))
    }
}

/// Finds the first assignment statement matching `pattern`.
pub fn find_assignment(text: &str, pattern: &AssignmentPattern) -> Option<Assignment> {
    Assignment::from_captures(&pattern.regex().captures(text)?)
}

/// Finds every assignment statement matching `pattern`, in order.
pub fn find_assignments(text: &str, pattern: &AssignmentPattern) -> Vec<Assignment> {
    pattern.regex().captures_iter(text).filter_map(|caps| Assignment::from_captures(&caps)).collect()
}

/// How the quoted payload is unescaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralStrategy {
    /// Dedicated JS string literal unescaper.
    #[default]
    Grammar,
    /// Re-quote as a JSON string and unescape with serde_json.
    JsonRewrap,
}

/// Decodes a raw payload into HTML.
pub fn decode_literal(payload: &str, strategy: LiteralStrategy) -> Result<String, DecodeError> {
    let unescaped = match strategy {
        LiteralStrategy::Grammar => unescape_js(payload)?,
        LiteralStrategy::JsonRewrap => unescape_via_json(payload)?,
    };
    Ok(decode_entities(&unescaped))
}

fn malformed(offset: usize, reason: impl Into<String>) -> DecodeError {
    DecodeError::MalformedEscape { offset, reason: reason.into() }
}

fn read_hex(chars: &mut Peekable<CharIndices<'_>>, count: usize, offset: usize) -> Result<u32, DecodeError> {
    let mut value = 0u32;
    for _ in 0..count {
        let digit = chars
            .next()
            .and_then(|(_, c)| c.to_digit(16))
            .ok_or_else(|| malformed(offset, format!("expected {count} hex digits")))?;
        value = value * 16 + digit;
    }
    Ok(value)
}

fn read_braced_hex(chars: &mut Peekable<CharIndices<'_>>, offset: usize) -> Result<u32, DecodeError> {
    let mut value = 0u32;
    let mut digits = 0;
    loop {
        match chars.next() {
            Some((_, '}')) if digits > 0 => return Ok(value),
            Some((_, c)) if c.is_ascii_hexdigit() && digits < 6 => {
                value = value * 16 + c.to_digit(16).unwrap_or(0);
                digits += 1;
            }
            _ => return Err(malformed(offset, "invalid \\u{...} escape")),
        }
    }
}

fn read_unicode(chars: &mut Peekable<CharIndices<'_>>, offset: usize) -> Result<char, DecodeError> {
    if matches!(chars.peek(), Some((_, '{'))) {
        chars.next();
        let code = read_braced_hex(chars, offset)?;
        return char::from_u32(code).ok_or_else(|| malformed(offset, "code point out of range"));
    }

    let code = read_hex(chars, 4, offset)?;
    match code {
        0xD800..=0xDBFF => {
            let mut lookahead = chars.clone();
            let low = match (lookahead.next(), lookahead.next()) {
                (Some((_, '\\')), Some((_, 'u'))) => read_hex(&mut lookahead, 4, offset).ok(),
                _ => None,
            };
            match low {
                Some(low @ 0xDC00..=0xDFFF) => {
                    *chars = lookahead;
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(combined).ok_or_else(|| malformed(offset, "invalid surrogate pair"))
                }
                _ => Err(malformed(offset, "lone leading surrogate")),
            }
        }
        0xDC00..=0xDFFF => Err(malformed(offset, "lone trailing surrogate")),
        _ => char::from_u32(code).ok_or_else(|| malformed(offset, "code point out of range")),
    }
}

/// Unescapes the body of a JS string literal.
pub fn unescape_js(payload: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(payload.len());
    let mut chars = payload.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        let (_, escaped) = chars.next().ok_or_else(|| malformed(offset, "dangling backslash"))?;
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !matches!(chars.peek(), Some((_, c)) if c.is_ascii_digit()) => out.push('\0'),
            '0'..='9' => return Err(malformed(offset, "octal escapes are not supported")),
            'x' => {
                let code = read_hex(&mut chars, 2, offset)?;
                out.push(char::from_u32(code).ok_or_else(|| malformed(offset, "invalid \\x escape"))?);
            }
            'u' => out.push(read_unicode(&mut chars, offset)?),
            // line continuations
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Unescapes by rewriting the literal into a JSON string.
///
/// `\'` becomes `'`, bare `"` and control characters are escaped, and the
/// JS-only escapes `\v`, `\0` and `\xHH` are converted to `\uXXXX`. Anything
/// else is handed to serde_json verbatim, so escapes JSON does not know fail.
pub fn unescape_via_json(payload: &str) -> Result<String, DecodeError> {
    let mut json = String::with_capacity(payload.len() + 2);
    json.push('"');
    let mut chars = payload.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(|| malformed(offset, "dangling backslash"))?;
                match escaped {
                    '\'' => json.push('\''),
                    'v' => json.push_str("\\u000b"),
                    '0' if !matches!(chars.peek(), Some((_, c)) if c.is_ascii_digit()) => json.push_str("\\u0000"),
                    'x' => {
                        let code = read_hex(&mut chars, 2, offset)?;
                        json.push_str(&format!("\\u{code:04x}"));
                    }
                    '\n' => {}
                    other => {
                        json.push('\\');
                        json.push(other);
                    }
                }
            }
            '"' => json.push_str("\\\""),
            c if (c as u32) < 0x20 => json.push_str(&format!("\\u{:04x}", c as u32)),
            c => json.push(c),
        }
    }

    json.push('"');
    Ok(serde_json::from_str::<String>(&json)?)
}
