//! Conversion of a markup fragment into a single renderable unit.
//!
//! The fragment is trimmed first so that surrounding whitespace never
//! becomes a unit of its own. Only the first top-level node is kept;
//! leading comments, declarations and stray closing tags are skipped.

use alloc::string::{String, ToString};

use crate::error::FragmentError;

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching closing tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// One structural unit ready to be substituted into the render target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renderable {
    /// Markup of exactly one top-level element, including its children.
    Element(String),

    /// A leading run of text before any element.
    Text(String),
}

impl Renderable {
    /// Convert a fragment into its first top-level node.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::Empty`] for a blank fragment and
    /// [`FragmentError::Unbalanced`] if the first element never closes.
    pub fn from_fragment(fragment: &str) -> Result<Self, FragmentError> {
        let mut rest = fragment.trim();

        while let Some(after) = skip_markup_declaration(rest)? {
            rest = after.trim_start();
        }

        if rest.is_empty() {
            return Err(FragmentError::Empty);
        }

        if !rest.starts_with('<') {
            let end = rest.find('<').unwrap_or(rest.len());
            return Ok(Self::Text(rest[..end].to_string()));
        }

        let end = first_element_end(rest)?;
        Ok(Self::Element(rest[..end].to_string()))
    }

    /// The markup or text of this unit.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Element(markup) => markup,
            Self::Text(text) => text,
        }
    }
}

/// If `s` starts with a comment, a `<!`/`<?` declaration or a closing tag
/// with nothing to close, return what follows it.
fn skip_markup_declaration(s: &str) -> Result<Option<&str>, FragmentError> {
    if let Some(body) = s.strip_prefix("<!--") {
        let end = body.find("-->").ok_or(FragmentError::Unbalanced)?;
        return Ok(Some(&body[end + 3..]));
    }

    if s.starts_with("<!") || s.starts_with("<?") || s.starts_with("</") {
        let end = tag_end(s, 0).ok_or(FragmentError::Unbalanced)?;
        return Ok(Some(&s[end..]));
    }

    Ok(None)
}

/// Byte offset just past the element that starts at offset 0 of `s`.
fn first_element_end(s: &str) -> Result<usize, FragmentError> {
    let mut depth = 0usize;
    let mut pos = 0usize;

    loop {
        let open = pos + s[pos..].find('<').ok_or(FragmentError::Unbalanced)?;

        if s[open..].starts_with("<!--") {
            let close = s[open + 4..]
                .find("-->")
                .ok_or(FragmentError::Unbalanced)?;
            pos = open + 4 + close + 3;
            continue;
        }

        let end = tag_end(s, open).ok_or(FragmentError::Unbalanced)?;
        let tag = &s[open + 1..end - 1];

        if tag.starts_with('/') {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Ok(end);
            }
        } else if tag.starts_with('!') || tag.starts_with('?') {
            // declaration inside an element
        } else {
            let name = tag_name(tag);
            let self_closing = tag.trim_end().ends_with('/');
            let void = VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(&name));

            if self_closing || void {
                if depth == 0 {
                    return Ok(end);
                }
            } else if RAW_TEXT_ELEMENTS.iter().any(|r| r.eq_ignore_ascii_case(&name)) {
                let close = raw_text_close(s, end, &name).ok_or(FragmentError::Unbalanced)?;
                if depth == 0 {
                    return Ok(close);
                }
                pos = close;
                continue;
            } else {
                depth += 1;
            }
        }

        pos = end;
    }
}

/// Byte offset just past the `>` closing the tag opened at `open`, honoring quotes.
fn tag_end(s: &str, open: usize) -> Option<usize> {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate().skip(open + 1) {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if q == b => quote = None,
            (None, b'>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn tag_name(tag: &str) -> String {
    tag.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Byte offset just past `</name>` searching from `from`.
fn raw_text_close(s: &str, from: usize, name: &str) -> Option<usize> {
    let needle = alloc::format!("</{name}");
    let lower = s[from..].to_ascii_lowercase();
    let start = from + lower.find(&needle)?;
    tag_end(s, start)
}
