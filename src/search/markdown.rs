//! Markdown-to-plain-text normalization
//!
//! Posts are authored in markdown but snippets must show readable prose,
//! so search runs over a stripped rendition of the content. Stripping is
//! a fixed pipeline of small scanner passes; each pass handles one
//! construct and leaves malformed syntax untouched.

/// Strip markdown syntax from post content, leaving plain text.
pub fn strip_markdown(content: &str) -> String {
    let text = strip_fenced_code(content);
    let text = strip_inline_code(&text);
    let text = strip_images(&text);
    let text = strip_links(&text);
    let text = strip_headings(&text);
    let text = unwrap_emphasis(&text, "**", '*');
    let text = unwrap_emphasis(&text, "__", '_');
    let text = unwrap_emphasis(&text, "*", '*');
    let text = unwrap_emphasis(&text, "_", '_');
    let text = unwrap_emphasis(&text, "~~", '~');
    let text = strip_blockquotes(&text);
    let text = strip_horizontal_rules(&text);
    let text = strip_list_markers(&text);
    let text = collapse_blank_lines(&text);
    text.trim().to_string()
}

/// Remove fenced code blocks. An unterminated fence is left as-is.
fn strip_fenced_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        match rest[open + 3..].find("```") {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + 3 + close + 3..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Remove inline code spans. A dangling backtick is left as-is.
fn strip_inline_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('`') {
        match rest[open + 1..].find('`') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + 1 + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Remove image syntax entirely. Alt text and URL may be empty.
fn strip_images(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("![") {
        match parse_span(&rest[open + 1..], true) {
            Some((consumed, _)) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + 1 + consumed..];
            }
            None => {
                out.push_str(&rest[..open + 2]);
                rest = &rest[open + 2..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Replace `[text](url)` links by their text. Text and URL must be
/// non-empty for the span to count as a link.
fn strip_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        match parse_span(&rest[open..], false) {
            Some((consumed, label)) => {
                out.push_str(&rest[..open]);
                out.push_str(label);
                rest = &rest[open + consumed..];
            }
            None => {
                out.push_str(&rest[..open + 1]);
                rest = &rest[open + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse a `[label](url)` span at the start of `s`. Returns the byte
/// length consumed and the label. Empty labels and URLs only count when
/// `allow_empty` is set.
fn parse_span(s: &str, allow_empty: bool) -> Option<(usize, &str)> {
    let close = s.find(']')?;
    let label = &s[1..close];
    if label.is_empty() && !allow_empty {
        return None;
    }
    let after = &s[close + 1..];
    if !after.starts_with('(') {
        return None;
    }
    let url_close = after.find(')')?;
    if url_close == 1 && !allow_empty {
        return None;
    }
    Some((close + 1 + url_close + 1, label))
}

/// Strip 1-6 leading `#` markers plus the whitespace after them.
fn strip_headings(text: &str) -> String {
    map_lines(text, |line| {
        let hashes = line.len() - line.trim_start_matches('#').len();
        let rest = &line[hashes..];
        if (1..=6).contains(&hashes) && rest.starts_with(char::is_whitespace) {
            rest.trim_start().to_string()
        } else {
            line.to_string()
        }
    })
}

/// Unwrap `<delim>content<delim>` emphasis spans, keeping the content.
/// Content must be non-empty and free of the delimiter character.
fn unwrap_emphasis(text: &str, delim: &str, marker: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(delim) {
        let content = &rest[open + delim.len()..];
        let span = match content.find(marker) {
            Some(len) if len > 0 && content[len..].starts_with(delim) => Some(len),
            _ => None,
        };
        match span {
            Some(len) => {
                out.push_str(&rest[..open]);
                out.push_str(&content[..len]);
                rest = &content[len + delim.len()..];
            }
            None => {
                out.push_str(&rest[..open + delim.len()]);
                rest = content;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Strip one level of `>` blockquote markers at line start.
fn strip_blockquotes(text: &str) -> String {
    map_lines(text, |line| match line.strip_prefix('>') {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start().to_string(),
        _ => line.to_string(),
    })
}

/// Delete lines made of 3+ rule characters (`-` or `*`, mixing allowed).
fn strip_horizontal_rules(text: &str) -> String {
    map_lines(text, |line| {
        if line.len() >= 3 && line.chars().all(|c| matches!(c, '-' | '*')) {
            String::new()
        } else {
            line.to_string()
        }
    })
}

/// Strip bullet and numbered list markers, including their leading indent.
fn strip_list_markers(text: &str) -> String {
    map_lines(text, |line| {
        let rest = line.trim_start();
        let after_marker = if let Some(r) = rest.strip_prefix(['-', '*', '+']) {
            Some(r)
        } else {
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits > 0 && rest[digits..].starts_with('.') {
                Some(&rest[digits + 1..])
            } else {
                None
            }
        };
        match after_marker {
            Some(r) if r.starts_with(char::is_whitespace) => r.trim_start().to_string(),
            _ => line.to_string(),
        }
    })
}

/// Collapse runs of 3+ newlines down to a single blank line.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for c in text.chars() {
        if c == '\n' {
            newlines += 1;
            continue;
        }
        for _ in 0..newlines.min(2) {
            out.push('\n');
        }
        newlines = 0;
        out.push(c);
    }
    for _ in 0..newlines.min(2) {
        out.push('\n');
    }
    out
}

fn map_lines(text: &str, f: impl Fn(&str) -> String) -> String {
    text.split('\n').map(f).collect::<Vec<_>>().join("\n")
}
