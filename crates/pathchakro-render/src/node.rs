//! Closed set of node kinds the renderer understands.

use serde_json::Value;

use crate::document::RawNode;
use crate::marks::Mark;

/// Heading level used when `attrs.level` is missing or out of range.
pub const DEFAULT_HEADING_LEVEL: u8 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum Node<'a> {
    Doc(&'a [RawNode]),
    Paragraph(&'a [RawNode]),
    Heading {
        level: u8,
        children: &'a [RawNode],
    },
    BulletList(&'a [RawNode]),
    OrderedList {
        start: Option<i64>,
        children: &'a [RawNode],
    },
    ListItem(&'a [RawNode]),
    Blockquote(&'a [RawNode]),
    CodeBlock {
        language: Option<String>,
        children: &'a [RawNode],
    },
    Image(ImageAttrs),
    Embed(EmbedAttrs),
    HardBreak,
    HorizontalRule,
    Text {
        text: &'a str,
        marks: Vec<Mark<'a>>,
    },
    /// Anything the editor may emit that we have no tag for. Only the
    /// children are rendered.
    Unknown {
        kind: &'a str,
        children: &'a [RawNode],
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAttrs {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub width: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedAttrs {
    pub src: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

impl<'a> Node<'a> {
    pub fn classify(raw: &'a RawNode) -> Self {
        let children = raw.content.as_slice();
        match raw.kind() {
            "doc" => Node::Doc(children),
            "paragraph" => Node::Paragraph(children),
            "heading" => Node::Heading {
                level: heading_level(raw.attr("level")),
                children,
            },
            "bulletList" => Node::BulletList(children),
            "orderedList" => Node::OrderedList {
                start: raw.attr("start").and_then(integer),
                children,
            },
            "listItem" => Node::ListItem(children),
            "blockquote" => Node::Blockquote(children),
            "codeBlock" => Node::CodeBlock {
                language: raw.attr_str("language"),
                children,
            },
            "image" => Node::Image(ImageAttrs {
                src: raw.attr_str("src"),
                alt: raw.attr_str("alt"),
                title: raw.attr_str("title"),
                width: raw.attr_str("width"),
            }),
            "youtube" | "iframe" => Node::Embed(EmbedAttrs {
                src: raw.attr_str("src"),
                width: raw.attr_str("width"),
                height: raw.attr_str("height"),
            }),
            "hardBreak" => Node::HardBreak,
            "horizontalRule" => Node::HorizontalRule,
            "text" => Node::Text {
                text: raw.text.as_deref().unwrap_or(""),
                marks: raw.marks.iter().map(Mark::classify).collect(),
            },
            kind => Node::Unknown { kind, children },
        }
    }
}

/// Levels 1 through 6 are kept. Anything else, including a missing or
/// non-numeric level, falls back to [`DEFAULT_HEADING_LEVEL`].
pub fn heading_level(level: Option<&Value>) -> u8 {
    level
        .and_then(integer)
        .filter(|level| (1..=6).contains(level))
        .and_then(|level| u8::try_from(level).ok())
        .unwrap_or(DEFAULT_HEADING_LEVEL)
}

/// Integer coercion for attributes the editor sometimes stores as strings.
/// Fractions are truncated.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}
