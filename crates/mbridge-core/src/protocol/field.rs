//! Anchored field extraction for the bridge's JSON-like subset.
//!
//! This is not a JSON parser. A value is located by its `"<key>":` anchor (the
//! key must be a whole quoted token, so `theta` never matches `"thetas":`) and
//! classified by its first character:
//! - `"` quoted string, backslash escapes honoured.
//! - `{` nested object, returned without the outer braces.
//! - anything else: a bare token up to the next `,`, `}` or end of text.
//!   A token starting with `[` runs to its matching `]`.
//!
//! When a key is anchored more than once, a quoted match wins over a nested
//! object, which wins over a bare token. Nesting depth is not considered: a
//! quoted `"type"` inside a nested `data` object shadows a bare top-level
//! `"type": 2`.

/// Shape of a value found after an anchor. Ordered by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueKind {
    Quoted,
    Object,
    Bare,
}

/// One extracted value, borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub kind: ValueKind,
    /// Raw slice: quoted values are still escaped, objects have no braces.
    pub raw: &'a str,
}

impl Field<'_> {
    /// Decoded text of the value.
    pub fn text(&self) -> String {
        match self.kind {
            ValueKind::Quoted => unescape(self.raw),
            ValueKind::Object | ValueKind::Bare => self.raw.to_owned(),
        }
    }
}

/// Locate `key` in `text` using the three-tier precedence.
pub fn extract<'a>(text: &'a str, key: &str) -> Option<Field<'a>> {
    let needle = format!("\"{key}\"");
    let mut best: Option<Field<'a>> = None;

    for (idx, _) in text.match_indices(needle.as_str()) {
        let Some(value) = value_after_anchor(&text[idx + needle.len()..]) else {
            continue;
        };
        let Some(field) = classify(value) else {
            continue;
        };
        if best.map_or(true, |b| field.kind < b.kind) {
            best = Some(field);
        }
        if field.kind == ValueKind::Quoted {
            break;
        }
    }

    best
}

/// Decoded value of `key`, or an empty string when the key is absent.
pub fn extract_field(text: &str, key: &str) -> String {
    extract(text, key).map(|f| f.text()).unwrap_or_default()
}

/// Items of a bracketed list such as `["A", "B"]` or `[a, b]`. Quoted items
/// are unescaped, bare items trimmed. `None` when `text` is not a list.
pub fn split_list(text: &str) -> Option<Vec<String>> {
    let mut rest = text.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
    let mut items = Vec::new();

    while !rest.is_empty() {
        let tail = if let Some(body) = rest.strip_prefix('"') {
            let end = closing_quote(body)?;
            items.push(unescape(&body[..end]));
            body[end + 1..].trim_start()
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            items.push(rest[..end].trim().to_owned());
            &rest[end..]
        };
        rest = match tail.strip_prefix(',') {
            Some(next) => next.trim_start(),
            None if tail.is_empty() => tail,
            None => return None,
        };
    }
    Some(items)
}

/// Escape text for embedding inside a quoted wire string.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape`]. Unknown escapes are kept verbatim.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 => out.push(decoded),
                    _ => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// --------------------
// Scanning helpers
// --------------------

/// Text right after `:` (leading whitespace skipped), if the anchor is a key.
fn value_after_anchor(rest: &str) -> Option<&str> {
    rest.trim_start().strip_prefix(':').map(str::trim_start)
}

fn classify(value: &str) -> Option<Field<'_>> {
    if let Some(body) = value.strip_prefix('"') {
        if let Some(end) = closing_quote(body) {
            return Some(Field {
                kind: ValueKind::Quoted,
                raw: &body[..end],
            });
        }
    } else if value.starts_with('{') {
        if let Some(end) = closing_delim(value, b'{', b'}') {
            return Some(Field {
                kind: ValueKind::Object,
                raw: value[1..end].trim(),
            });
        }
    }
    bare(value)
}

fn bare(value: &str) -> Option<Field<'_>> {
    if value.starts_with('[') {
        if let Some(end) = closing_delim(value, b'[', b']') {
            return Some(Field {
                kind: ValueKind::Bare,
                raw: &value[..=end],
            });
        }
    }

    let end = value.find([',', '}']).unwrap_or(value.len());
    let raw = value[..end].trim();
    if raw.is_empty() {
        return None;
    }
    Some(Field {
        kind: ValueKind::Bare,
        raw,
    })
}

/// Index of the first unescaped `"` in `body`.
fn closing_quote(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in body.bytes().enumerate() {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Index of the delimiter closing the one at `value[0]`, skipping quoted text.
fn closing_delim(value: &str, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;

    for (i, b) in value.bytes().enumerate() {
        if in_str {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_str = false,
                _ => {}
            }
            continue;
        }
        if b == b'"' {
            in_str = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}
