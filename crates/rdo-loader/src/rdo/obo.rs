// OBO Stanza Reader
//
// Tokenizes an OBO 1.2/1.4 document at the stanza level: header tags, then
// `[Name]` stanzas holding ordered `tag: value` lists. Tag values keep their
// raw text; trailing `{modifiers}` and `! comments` are split off. Tag
// semantics (quoted definitions, identifiers) are left to the caller.

use crate::rdo::{RdoError, Result};
use std::collections::HashMap;
use std::io::BufRead;

/// A single tag value with its trailing qualifiers removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagValue {
    pub value: String,
    /// Contents of a trailing `{...}` block, without the braces
    pub modifiers: Option<String>,
    /// Text after an unescaped `!`
    pub comment: Option<String>,
}

impl TagValue {
    /// Split a raw tag value into value, modifiers and comment
    pub fn parse(raw: &str) -> Self {
        let (body, comment) = match find_unquoted(raw, '!') {
            Some(idx) => {
                let comment = raw[idx + 1..].trim();
                (&raw[..idx], (!comment.is_empty()).then(|| comment.to_string()))
            },
            None => (raw, None),
        };

        let body = body.trim();
        let (value, modifiers) = match split_modifiers(body) {
            Some((value, modifiers)) => (value, Some(modifiers.to_string())),
            None => (body, None),
        };

        TagValue {
            value: value.trim().to_string(),
            modifiers,
            comment,
        }
    }
}

/// A parsed `[Name]` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
    /// Stanza type, e.g. "Term" or "Typedef"
    pub name: String,
    pub tags: HashMap<String, Vec<TagValue>>,
}

impl Stanza {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: HashMap::new(),
        }
    }

    /// First value of `tag`, if present
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.tags
            .get(tag)
            .and_then(|values| values.first())
            .map(|v| v.value.as_str())
    }

    /// All values of `tag` in file order
    pub fn values(&self, tag: &str) -> &[TagValue] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    fn push(&mut self, tag: String, value: TagValue) {
        self.tags.entry(tag).or_default().push(value);
    }
}

/// Streaming stanza iterator over an OBO document
///
/// Header tags become available through [`OboReader::header`] once the first
/// stanza has been read (or the input is exhausted).
pub struct OboReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
    header: HashMap<String, Vec<TagValue>>,
    next_stanza: Option<String>,
    in_header: bool,
    done: bool,
}

impl<R: BufRead> OboReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            header: HashMap::new(),
            next_stanza: None,
            in_header: true,
            done: false,
        }
    }

    /// Header tag values seen so far
    pub fn header(&self) -> &HashMap<String, Vec<TagValue>> {
        &self.header
    }

    fn read_line(&mut self) -> Option<Result<String>> {
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(line.map_err(RdoError::from))
    }

    /// Advance to the next stanza header, collecting header tags on the way
    fn seek_stanza(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.read_line() {
            let line = line?;
            let trimmed = line.trim();

            if is_skippable(trimmed) {
                continue;
            }

            if let Some(name) = stanza_name(trimmed) {
                self.in_header = false;
                return Ok(Some(name.to_string()));
            }

            let (tag, value) = self.parse_tag_line(trimmed)?;
            if self.in_header {
                self.header.entry(tag).or_default().push(value);
            }
        }

        self.in_header = false;
        Ok(None)
    }

    fn read_stanza(&mut self, name: String) -> Result<Stanza> {
        let mut stanza = Stanza::new(name);

        while let Some(line) = self.read_line() {
            let line = line?;
            let trimmed = line.trim();

            if is_skippable(trimmed) {
                continue;
            }

            if let Some(next) = stanza_name(trimmed) {
                self.next_stanza = Some(next.to_string());
                return Ok(stanza);
            }

            let (tag, value) = self.parse_tag_line(trimmed)?;
            stanza.push(tag, value);
        }

        self.done = true;
        Ok(stanza)
    }

    fn parse_tag_line(&self, line: &str) -> Result<(String, TagValue)> {
        let Some((tag, raw)) = line.split_once(':') else {
            return Err(RdoError::Parse {
                line: self.line_no,
                message: format!("expected `tag: value`, found {:?}", line),
            });
        };

        let tag = tag.trim();
        if tag.is_empty() {
            return Err(RdoError::Parse {
                line: self.line_no,
                message: "empty tag name".to_string(),
            });
        }

        Ok((tag.to_string(), TagValue::parse(raw)))
    }
}

impl<R: BufRead> Iterator for OboReader<R> {
    type Item = Result<Stanza>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let name = match self.next_stanza.take() {
            Some(name) => name,
            None => match self.seek_stanza() {
                Ok(Some(name)) => name,
                Ok(None) => {
                    self.done = true;
                    return None;
                },
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                },
            },
        };

        let stanza = self.read_stanza(name);
        if stanza.is_err() {
            self.done = true;
        }
        Some(stanza)
    }
}

fn is_skippable(line: &str) -> bool {
    line.is_empty() || line.starts_with('!')
}

fn stanza_name(line: &str) -> Option<&str> {
    line.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

/// Byte index of the first `needle` outside double quotes and not escaped
fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(idx),
            _ => {},
        }
    }

    None
}

/// Split `value {modifiers}` into its parts when the value ends with a block
fn split_modifiers(body: &str) -> Option<(&str, &str)> {
    let inner_end = body.strip_suffix('}')?.len();
    let open = find_unquoted(body, '{')?;
    if open >= inner_end {
        return None;
    }
    Some((&body[..open], body[open + 1..inner_end].trim()))
}

// ============================================================================
// Tests
// ============================================================================
