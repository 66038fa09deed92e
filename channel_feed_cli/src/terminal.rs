//! Terminal render target and notifier.

use std::io::{self, Write};

use channel_feed::{
    fragment::Renderable,
    sink::{Notifier, RenderSink},
};

/// Elements that end a line of output.
const BLOCK_TAGS: &[&str] = &["br", "div", "p", "li", "tr", "h1", "h2", "h3", "h4"];

/// Prints each update as plain text, replacing the previous one.
///
/// On a terminal the previous update is cleared first.
#[derive(Debug)]
pub(crate) struct TerminalSink<W> {
    out: W,
    clear: bool,
}

impl TerminalSink<io::Stdout> {
    pub(crate) fn stdout() -> Self {
        use std::io::IsTerminal;

        let out = io::stdout();
        let clear = out.is_terminal();
        Self { out, clear }
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn replace(&mut self, container_id: &str, old_child_id: &str, unit: Renderable) {
        let text = match &unit {
            Renderable::Element(markup) => markup_to_text(markup),
            Renderable::Text(text) => unescape_markup(text.trim()),
        };

        let result = (|| {
            if self.clear {
                write!(self.out, "\x1b[2J\x1b[H")?;
            }
            writeln!(self.out, "── {container_id} / {old_child_id} ──")?;
            writeln!(self.out, "{text}")?;
            self.out.flush()
        })();

        if let Err(e) = result {
            tracing::warn!("failed to render update: {e}");
        }
    }
}

/// Writes application errors to stderr.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&mut self, message: &str) {
        eprintln!("channel-feed: {message}");
    }
}

/// Strip tags, breaking lines at block elements.
fn markup_to_text(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            rest = &rest[open..];
            break;
        };

        let tag = rest[open + 1..open + close].trim_start_matches('/');
        let name: String = tag
            .chars()
            .take_while(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        if BLOCK_TAGS.contains(&name.as_str()) && !text.ends_with('\n') && !text.is_empty() {
            text.push('\n');
        }

        rest = &rest[open + close + 1..];
    }
    text.push_str(rest);

    let lines: Vec<_> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(unescape_markup)
        .collect();
    lines.join("\n")
}

fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Escape text for inclusion in markup.
pub(crate) fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
