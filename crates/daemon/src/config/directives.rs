// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented directive parser for `pqd.conf` and `pq-files.conf`.
//!
//! Grammar: one `Name value...` directive per line, `#` comments, and
//! `<Block arg> ... </Block>` sections. `Include path` splices another
//! file at parse time.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A parsed configuration item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Directive {
        name: String,
        value: String,
        file: PathBuf,
        line: usize,
    },
    Block {
        name: String,
        arg: String,
        items: Vec<Item>,
        file: PathBuf,
        line: usize,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: {message}")]
    Syntax {
        file: PathBuf,
        line: usize,
        message: String,
    },
}

/// Parse a file, following Include directives.
pub fn parse_file(path: &Path) -> Result<Vec<Item>, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_text(&text, path)
}

/// Parse directive text attributed to `file`.
pub fn parse_text(text: &str, file: &Path) -> Result<Vec<Item>, ParseError> {
    let mut lines = text.lines().enumerate();
    let items = parse_items(&mut lines, file, None)?;
    Ok(items)
}

fn parse_items(
    lines: &mut std::iter::Enumerate<std::str::Lines<'_>>,
    file: &Path,
    open_block: Option<&str>,
) -> Result<Vec<Item>, ParseError> {
    let mut items = Vec::new();

    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("</") {
            let name = rest.trim_end_matches('>').trim();
            match open_block {
                Some(open) if open.eq_ignore_ascii_case(name) => return Ok(items),
                _ => {
                    return Err(ParseError::Syntax {
                        file: file.to_path_buf(),
                        line: line_no,
                        message: format!("unexpected closing tag </{name}>"),
                    })
                }
            }
        }

        if let Some(rest) = line.strip_prefix('<') {
            let Some(inner) = rest.strip_suffix('>') else {
                return Err(ParseError::Syntax {
                    file: file.to_path_buf(),
                    line: line_no,
                    message: format!("unterminated block tag: {line}"),
                });
            };
            let (name, arg) = split_word(inner);
            let nested = parse_items(lines, file, Some(name))?;
            items.push(Item::Block {
                name: name.to_string(),
                arg: arg.to_string(),
                items: nested,
                file: file.to_path_buf(),
                line: line_no,
            });
            continue;
        }

        let (name, value) = split_word(line);
        if name.eq_ignore_ascii_case("Include") {
            let target = resolve_include(file, value);
            let mut included = parse_file(&target)?;
            items.append(&mut included);
            continue;
        }
        items.push(Item::Directive {
            name: name.to_string(),
            value: value.to_string(),
            file: file.to_path_buf(),
            line: line_no,
        });
    }

    match open_block {
        Some(open) => Err(ParseError::Syntax {
            file: file.to_path_buf(),
            line: 0,
            message: format!("unclosed block <{open}>"),
        }),
        None => Ok(items),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn split_word(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    }
}

fn resolve_include(from: &Path, value: &str) -> PathBuf {
    let target = Path::new(value);
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        from.parent().unwrap_or(Path::new(".")).join(target)
    }
}

#[cfg(test)]
#[path = "directives_tests.rs"]
mod tests;
