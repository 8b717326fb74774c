//! Lesson bodies arrive as HTML from the server. They are never passed on
//! as markup: [`to_blocks`] reduces them to plain-text blocks, dropping
//! scripts, embedded frames, attributes and any tag it does not know.
//! Terminal control sequences are markup too: [`plain_text`] removes them
//! from block text and from every other server string shown on screen.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static DANGEROUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<iframe\b.*?</iframe\s*>|<object\b.*?</object\s*>|<!--.*?-->",
    )
    .expect("static regex")
});

// quoted attribute values may contain '>'
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)\b(?:"[^"]*"|'[^']*'|[^'">])*>"#)
        .expect("static regex")
});

// CSI, OSC (BEL or ST terminated) and two-byte escapes
static TERMINAL_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?|\x1b[@-_]?|\x{9b}[0-?]*[ -/]*[@-~]")
        .expect("static regex")
});

static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem(String),
    Code(String),
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Heading { level, text } => {
                write!(f, "{} {}", "#".repeat(*level as usize), text)
            }
            Block::Paragraph(text) => f.write_str(text),
            Block::ListItem(text) => write!(f, "  • {}", text),
            Block::Code(text) => {
                for (i, line) in text.lines().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "    {}", line)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Paragraph,
    Heading(u8),
    ListItem,
    Code,
}

struct Builder {
    blocks: Vec<Block>,
    buffer: String,
    kind: Kind,
}

impl Builder {
    fn flush(&mut self) {
        let raw = std::mem::take(&mut self.buffer);
        let decoded = plain_text(&decode_entities(&raw));
        let text = if self.kind == Kind::Code {
            decoded.trim_matches('\n').to_string()
        } else {
            decoded.split_whitespace().collect::<Vec<_>>().join(" ")
        };
        if text.is_empty() {
            return;
        }
        self.blocks.push(match self.kind {
            Kind::Paragraph => Block::Paragraph(text),
            Kind::Heading(level) => Block::Heading { level, text },
            Kind::ListItem => Block::ListItem(text),
            Kind::Code => Block::Code(text),
        });
    }

    fn switch(&mut self, kind: Kind) {
        self.flush();
        self.kind = kind;
    }
}

pub fn to_blocks(html: &str) -> Vec<Block> {
    let cleaned = DANGEROUS.replace_all(html, "");
    let mut builder = Builder {
        blocks: Vec::new(),
        buffer: String::new(),
        kind: Kind::Paragraph,
    };

    let mut last = 0;
    for caps in TAG.captures_iter(&cleaned) {
        let Some(whole) = caps.get(0) else { continue };
        builder.buffer.push_str(&cleaned[last..whole.start()]);
        last = whole.end();

        let closing = &caps[1] == "/";
        let name = caps[2].to_ascii_lowercase();
        match (name.as_str(), closing) {
            ("h1" | "h2" | "h3" | "h4" | "h5" | "h6", false) => {
                let level = name[1..].parse().unwrap_or(1);
                builder.switch(Kind::Heading(level));
            }
            ("li", false) => builder.switch(Kind::ListItem),
            ("pre", false) => builder.switch(Kind::Code),
            ("br", _) if builder.kind == Kind::Code => builder.buffer.push('\n'),
            (
                "p" | "div" | "br" | "ul" | "ol" | "li" | "pre" | "blockquote" | "section"
                | "article" | "table" | "tr" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6",
                _,
            ) => builder.switch(Kind::Paragraph),
            ("td" | "th", true) => builder.buffer.push(' '),
            _ => {}
        }
    }
    builder.buffer.push_str(&cleaned[last..]);
    builder.flush();
    builder.blocks
}

/// Strip terminal escape sequences and control characters other than
/// newline and tab.
pub fn plain_text(text: &str) -> String {
    TERMINAL_ESCAPE
        .replace_all(text, "")
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'");

    let numeric = NUMERIC_ENTITY.replace_all(&named, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    // last, so "&amp;lt;" stays "&lt;"
    numeric.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_and_headings_become_blocks() {
        let blocks = to_blocks("<h2>Ownership</h2><p>Every value has <b>one</b> owner.</p>");
        assert_eq!(
            blocks,
            vec![
                Block::Heading { level: 2, text: "Ownership".to_string() },
                Block::Paragraph("Every value has one owner.".to_string()),
            ]
        );
    }

    #[test]
    fn scripts_and_handlers_are_dropped() {
        let blocks = to_blocks(
            r#"<p onclick="steal()">Hi</p><script>alert('x')</script><img src=x onerror="boom()">"#,
        );
        assert_eq!(blocks, vec![Block::Paragraph("Hi".to_string())]);
    }

    #[test]
    fn lists_and_code_keep_their_shape() {
        let blocks = to_blocks("<ul><li>one</li><li>two</li></ul><pre>let x = 1;\nlet y = 2;</pre>");
        assert_eq!(
            blocks,
            vec![
                Block::ListItem("one".to_string()),
                Block::ListItem("two".to_string()),
                Block::Code("let x = 1;\nlet y = 2;".to_string()),
            ]
        );
    }

    #[test]
    fn entities_are_decoded_once() {
        let blocks = to_blocks("<p>a &lt;b&gt; &amp;lt; &#233;&#x21;</p>");
        assert_eq!(blocks, vec![Block::Paragraph("a <b> &lt; é!".to_string())]);
    }

    #[test]
    fn quoted_attributes_may_contain_angle_brackets() {
        assert_eq!(
            to_blocks(r#"<p title="a>b" data-x='c>d'>Hello</p>"#),
            vec![Block::Paragraph("Hello".to_string())]
        );
    }

    #[test]
    fn terminal_escapes_do_not_survive() {
        let blocks = to_blocks("<p>safe\u{1b}]0;pwned\u{07}\u{1b}[2Jtext</p><p>&#27;[31mred</p>");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("safetext".to_string()),
                Block::Paragraph("red".to_string()),
            ]
        );
    }

    #[test]
    fn plain_text_keeps_newlines_and_tabs() {
        assert_eq!(plain_text("a\u{1b}[2J\tb\nc\u{7}\u{0}"), "a\tb\nc");
        assert_eq!(plain_text("\u{9b}31mx"), "x");
    }

    #[test]
    fn plain_text_is_a_single_paragraph() {
        assert_eq!(
            to_blocks("  just   text "),
            vec![Block::Paragraph("just text".to_string())]
        );
        assert!(to_blocks("").is_empty());
    }
}
