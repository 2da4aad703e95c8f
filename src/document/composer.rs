//! Document Composer
//!
//! Composes schema text into a [`Node`] tree. Handles the block-style YAML
//! subset property schemas are written in:
//! - block mappings and block sequences, nested by indentation
//! - anchors on mappings and aliases, kept as written
//! - plain, quoted and block (`|`, `>`) scalars
//! - flow collections (`[a, b]`, `{a: b}`)
//! - full-line and trailing comments
//!
//! Quoted scalars and flow collections are handed to `serde_yaml`, which
//! handles escapes and flow syntax; everything indentation-based is done
//! here so that anchors, aliases and comments survive.

use tracing::trace;

use super::{Alias, Entry, Mapping, Mark, Node, Scalar, Sequence};
use crate::error::{GeneratorError, Result};

/// Compose schema text into a node tree
pub fn compose(text: &str) -> Result<Node> {
    let mut composer = Composer::new(text);

    let mut comment = composer.collect_comments();
    if composer.current().map(|l| l.text == "---").unwrap_or(false) {
        composer.pos += 1;
        comment.extend(composer.collect_comments());
    }

    let Some(first) = composer.current() else {
        return Ok(Node::Mapping(Mapping {
            comment,
            mark: Mark::new(1),
            ..Mapping::default()
        }));
    };
    composer.check_indentation(first)?;

    let indent = first.indent;
    let mark = Mark::new(first.number);
    let root = if is_sequence_item(first.text) {
        Node::Sequence(composer.parse_sequence(indent)?)
    } else if split_key(first.text, first.number)?.is_some() {
        Node::Mapping(composer.parse_mapping(indent, None, comment, mark)?)
    } else {
        composer.pos += 1;
        composer.inline_value(strip_comment(first.text), first.number)?
    };

    if let Some(line) = composer.current() {
        return Err(GeneratorError::Syntax {
            line: line.number,
            message: "unexpected content after the end of the document".to_string(),
        });
    }

    Ok(root)
}

// =============================================================================
// Source Lines
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Comment,
    Content,
}

#[derive(Debug, Clone, Copy)]
struct SourceLine<'a> {
    /// 1-based line number
    number: usize,
    raw: &'a str,
    /// Number of leading spaces
    indent: usize,
    /// Line text without indentation and trailing whitespace
    text: &'a str,
    kind: LineKind,
    /// A tab appears in the indentation
    tabbed: bool,
}

impl<'a> SourceLine<'a> {
    fn new(index: usize, raw: &'a str) -> Self {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let after_spaces = raw.trim_start_matches(' ');
        let indent = raw.len() - after_spaces.len();
        let text = after_spaces.trim();
        let tabbed = after_spaces.starts_with('\t');

        let kind = if text.is_empty() {
            LineKind::Blank
        } else if text.starts_with('#') {
            LineKind::Comment
        } else {
            LineKind::Content
        };

        Self {
            number: index + 1,
            raw,
            indent,
            text,
            kind,
            tabbed,
        }
    }
}

// =============================================================================
// Composer
// =============================================================================

struct Composer<'a> {
    lines: Vec<SourceLine<'a>>,
    pos: usize,
    /// Keys leading to the node being composed, for diagnostics
    path: Vec<String>,
}

impl<'a> Composer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text
                .strip_suffix('\n')
                .unwrap_or(text)
                .split('\n')
                .enumerate()
                .map(|(i, l)| SourceLine::new(i, l))
                .collect(),
            pos: 0,
            path: Vec::new(),
        }
    }

    /// Skip blank and comment lines, returning the comments
    fn collect_comments(&mut self) -> Vec<String> {
        let mut comments = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            match line.kind {
                LineKind::Blank => {}
                LineKind::Comment => comments.push(line.text.to_string()),
                LineKind::Content => break,
            }
            self.pos += 1;
        }
        comments
    }

    /// The next content line, without consuming it
    fn current(&self) -> Option<SourceLine<'a>> {
        self.lines[self.pos.min(self.lines.len())..]
            .iter()
            .find(|l| l.kind == LineKind::Content)
            .copied()
    }

    fn check_indentation(&self, line: SourceLine<'a>) -> Result<()> {
        if line.tabbed {
            return Err(GeneratorError::Syntax {
                line: line.number,
                message: "tabs are not allowed in indentation".to_string(),
            });
        }
        Ok(())
    }

    fn path_string(&self) -> String {
        if self.path.is_empty() {
            "<document>".to_string()
        } else {
            self.path.join(".")
        }
    }

    fn parse_mapping(
        &mut self,
        indent: usize,
        anchor: Option<String>,
        comment: Vec<String>,
        mark: Mark,
    ) -> Result<Mapping> {
        let mut entries: Vec<Entry> = Vec::new();

        loop {
            let start = self.pos;
            let preceding = self.collect_comments();
            let Some(line) = self.current() else { break };
            if line.indent < indent {
                // Comments above a dedented key belong to that key
                self.pos = start;
                break;
            }
            self.check_indentation(line)?;
            if line.indent > indent {
                return Err(GeneratorError::Syntax {
                    line: line.number,
                    message: format!("unexpected indentation in `{}`", self.path_string()),
                });
            }
            if is_sequence_item(line.text) {
                // Left for the caller, which reports it if nothing claims it
                self.pos = start;
                break;
            }

            let Some((key, rest)) = split_key(line.text, line.number)? else {
                return Err(GeneratorError::Syntax {
                    line: line.number,
                    message: format!("expected `key: value`, found `{}`", line.text),
                });
            };

            if entries.iter().any(|e| e.key == key) {
                return Err(GeneratorError::DuplicateKey {
                    path: self.path_string(),
                    key,
                    line: line.number,
                });
            }

            self.pos += 1;
            self.path.push(key.clone());
            let value = self.parse_value(rest, indent, line.number, false, preceding);
            self.path.pop();

            entries.push(Entry {
                key,
                value: value?,
                mark: Mark::new(line.number),
            });
        }

        trace!(path = %self.path_string(), entries = entries.len(), "composed mapping");

        Ok(Mapping {
            anchor,
            comment,
            entries,
            mark,
        })
    }

    fn parse_sequence(&mut self, indent: usize) -> Result<Sequence> {
        let mark = Mark::new(self.current().map(|l| l.number).unwrap_or_default());
        let mut items = Vec::new();

        loop {
            let start = self.pos;
            self.collect_comments();
            let Some(line) = self.current() else { break };
            if line.indent < indent || (line.indent == indent && !is_sequence_item(line.text)) {
                self.pos = start;
                break;
            }
            self.check_indentation(line)?;
            if line.indent > indent {
                return Err(GeneratorError::Syntax {
                    line: line.number,
                    message: format!("unexpected indentation in `{}`", self.path_string()),
                });
            }

            let rest = line.text[1..].trim_start();
            if !starts_quoted_or_flow(rest) && split_key(rest, line.number)?.is_some() {
                return Err(GeneratorError::Syntax {
                    line: line.number,
                    message: "mappings inside sequences are not supported".to_string(),
                });
            }

            self.pos += 1;
            self.path.push(items.len().to_string());
            let item = self.parse_value(rest, indent, line.number, true, Vec::new());
            self.path.pop();
            items.push(item?);
        }

        Ok(Sequence { items, mark })
    }

    /// Parse the value following `key:` (or `- `) on line `line`
    ///
    /// `preceding` holds the comment lines right above the key; together with
    /// the comments between the key and the first nested entry they become
    /// the leading comment of a nested mapping.
    fn parse_value(
        &mut self,
        rest: &'a str,
        parent_indent: usize,
        line: usize,
        in_sequence: bool,
        preceding: Vec<String>,
    ) -> Result<Node> {
        let rest = strip_comment(rest);
        let (anchor, rest) = take_anchor(rest, line)?;
        let mark = Mark::new(line);

        if rest.is_empty() {
            let mut comment = preceding;
            comment.extend(self.collect_comments());
            let nested = self.current().filter(|next| {
                next.indent > parent_indent
                    || (!in_sequence && next.indent == parent_indent && is_sequence_item(next.text))
            });

            return match nested {
                Some(next) if is_sequence_item(next.text) => {
                    Ok(Node::Sequence(self.parse_sequence(next.indent)?))
                }
                Some(next) => {
                    let mapping = self.parse_mapping(next.indent, anchor, comment, mark)?;
                    Ok(Node::Mapping(mapping))
                }
                None => Ok(Node::Scalar(Scalar {
                    value: String::new(),
                    mark,
                })),
            };
        }

        if let Some(name) = rest.strip_prefix('*') {
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(GeneratorError::Syntax {
                    line,
                    message: format!("invalid alias `{}`", rest),
                });
            }
            return Ok(Node::Alias(Alias {
                name: name.to_string(),
                mark,
            }));
        }

        if rest.starts_with('|') || rest.starts_with('>') {
            return self.block_scalar(rest, parent_indent, line);
        }

        self.inline_value(rest, line)
    }

    /// A value that fits on one line: plain, quoted or flow
    fn inline_value(&self, text: &str, line: usize) -> Result<Node> {
        let mark = Mark::new(line);
        if !starts_quoted_or_flow(text) {
            return Ok(Node::Scalar(Scalar {
                value: text.to_string(),
                mark,
            }));
        }

        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| GeneratorError::Syntax {
                line,
                message: e.to_string(),
            })?;
        from_yaml(value, mark)
    }

    /// Literal (`|`) or folded (`>`) block scalar
    fn block_scalar(&mut self, header: &str, parent_indent: usize, line: usize) -> Result<Node> {
        let folded = header.starts_with('>');
        let chomping = header[1..].trim();
        if !matches!(chomping, "" | "-" | "+") {
            return Err(GeneratorError::Syntax {
                line,
                message: format!("unsupported block scalar header `{}`", header),
            });
        }

        // Block content is read from the raw text: `#` inside it is not a comment
        let mut body: Vec<&str> = Vec::new();
        let mut block_indent = None;
        while let Some(&source) = self.lines.get(self.pos) {
            if source.kind != LineKind::Blank {
                if source.indent <= parent_indent || source.tabbed {
                    break;
                }
                let indent = *block_indent.get_or_insert(source.indent);
                if source.indent < indent {
                    break;
                }
                body.push(&source.raw[indent..]);
            } else {
                body.push("");
            }
            self.pos += 1;
        }

        let trailing_blank = body.iter().rev().take_while(|l| l.trim().is_empty()).count();
        let content = &body[..body.len() - trailing_blank];
        // Blank lines past the block belong to whatever follows
        if chomping != "+" {
            self.pos -= trailing_blank;
        }

        let mut value = if folded {
            fold_lines(content)
        } else {
            content.iter().map(|l| l.trim_end()).collect::<Vec<_>>().join("\n")
        };

        if !value.is_empty() {
            match chomping {
                "-" => {}
                "+" => value.push_str(&"\n".repeat(trailing_blank + 1)),
                _ => value.push('\n'),
            }
        }

        Ok(Node::Scalar(Scalar {
            value,
            mark: Mark::new(line),
        }))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn is_sequence_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

fn starts_quoted_or_flow(text: &str) -> bool {
    text.starts_with(['"', '\'', '[', '{'])
}

/// Split `key: rest`; `None` when the line is not a mapping entry
fn split_key(text: &str, line: usize) -> Result<Option<(String, &str)>> {
    if text.starts_with(['"', '\'']) {
        let quote = text.as_bytes()[0] as char;
        let Some(end) = closing_quote(text, quote) else {
            return Err(GeneratorError::Syntax {
                line,
                message: "unterminated quoted key".to_string(),
            });
        };
        let after = &text[end + 1..];
        let Some(rest) = after.strip_prefix(':') else {
            return Ok(None);
        };
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return Ok(None);
        }
        let key: String =
            serde_yaml::from_str(&text[..=end]).map_err(|e| GeneratorError::Syntax {
                line,
                message: e.to_string(),
            })?;
        return Ok(Some((key, rest.trim_start())));
    }

    if starts_quoted_or_flow(text) || text.starts_with(['*', '&', '#', '|', '>']) {
        return Ok(None);
    }

    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && i > 0 && bytes[i - 1] == b' ' {
            return Ok(None);
        }
        if b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            let key = text[..i].trim_end();
            if key.is_empty() {
                return Ok(None);
            }
            return Ok(Some((key.to_string(), text[i + 1..].trim_start())));
        }
    }

    Ok(None)
}

fn closing_quote(text: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                return Some(i);
            }
        } else if c == '\'' {
            // '' is an escaped quote inside single quotes
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
            } else {
                return Some(i);
            }
        }
    }
    None
}

/// Remove a trailing ` # comment`, respecting quotes
fn strip_comment(text: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => {
                if c == '#' && prev.map(char::is_whitespace).unwrap_or(true) {
                    return text[..i].trim_end();
                }
                if (c == '"' || c == '\'') && prev.map(|p| " [{,:".contains(p)).unwrap_or(true) {
                    quote = Some(c);
                }
            }
        }
        prev = Some(c);
    }

    text.trim()
}

/// Split a leading `&anchor` off a value
fn take_anchor(text: &str, line: usize) -> Result<(Option<String>, &str)> {
    let Some(after) = text.strip_prefix('&') else {
        return Ok((None, text));
    };
    let end = after.find(char::is_whitespace).unwrap_or(after.len());
    let name = &after[..end];
    if name.is_empty() {
        return Err(GeneratorError::Syntax {
            line,
            message: "empty anchor name".to_string(),
        });
    }
    Ok((Some(name.to_string()), after[end..].trim_start()))
}

fn fold_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut previous_blank = true;
    for line in lines {
        let line = line.trim_end();
        if line.is_empty() {
            out.push('\n');
            previous_blank = true;
        } else {
            if !previous_blank {
                out.push(' ');
            }
            out.push_str(line);
            previous_blank = false;
        }
    }
    out
}

fn from_yaml(value: serde_yaml::Value, mark: Mark) -> Result<Node> {
    use serde_yaml::Value;

    let scalar = |value: String| Node::Scalar(Scalar { value, mark });
    Ok(match value {
        Value::Null => scalar(String::new()),
        Value::Bool(b) => scalar(b.to_string()),
        Value::Number(n) => scalar(n.to_string()),
        Value::String(s) => scalar(s),
        Value::Sequence(items) => Node::Sequence(Sequence {
            items: items
                .into_iter()
                .map(|item| from_yaml(item, mark))
                .collect::<Result<_>>()?,
            mark,
        }),
        Value::Mapping(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                let key = match from_yaml(key, mark)? {
                    Node::Scalar(s) => s.value,
                    other => {
                        return Err(GeneratorError::Syntax {
                            line: mark.line,
                            message: format!("mapping keys must be scalars, found {}", other.kind()),
                        })
                    }
                };
                entries.push(Entry {
                    key,
                    value: from_yaml(value, mark)?,
                    mark,
                });
            }
            Node::Mapping(Mapping {
                entries,
                mark,
                ..Mapping::default()
            })
        }
        Value::Tagged(tagged) => {
            return Err(GeneratorError::Syntax {
                line: mark.line,
                message: format!("tags are not supported (`{}`)", tagged.tag),
            })
        }
    })
}
