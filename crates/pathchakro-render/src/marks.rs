use std::fmt::Write;

use pulldown_cmark_escape::{escape_html, escape_html_body_text};

use crate::config::RenderConfig;
use crate::document::RawMark;
use crate::validate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark<'a> {
    Bold,
    Italic,
    Strike,
    Underline,
    Code,
    Link {
        href: &'a str,
        target: Option<&'a str>,
        rel: Option<&'a str>,
    },
    TextStyle {
        color: Option<&'a str>,
    },
    Highlight {
        color: Option<&'a str>,
    },
    Unknown(&'a str),
}

impl<'a> Mark<'a> {
    pub fn classify(raw: &'a RawMark) -> Self {
        match raw.kind() {
            "bold" => Mark::Bold,
            "italic" => Mark::Italic,
            "strike" | "strikethrough" => Mark::Strike,
            "underline" => Mark::Underline,
            "code" => Mark::Code,
            "link" => Mark::Link {
                href: raw.attr_str("href").unwrap_or(""),
                target: raw.attr_str("target"),
                rel: raw.attr_str("rel"),
            },
            "textStyle" => Mark::TextStyle {
                color: raw.attr_str("color"),
            },
            "highlight" => Mark::Highlight {
                color: raw.attr_str("color"),
            },
            other => Mark::Unknown(other),
        }
    }
}

/// Writes `text` escaped and wrapped in `marks`, the first mark outermost.
pub fn render_marked_text(
    html: &mut String,
    text: &str,
    marks: &[Mark<'_>],
    config: &RenderConfig,
) -> std::fmt::Result {
    let mut closers = Vec::with_capacity(marks.len());
    for mark in marks {
        if let Some(close) = start_mark(html, mark, config)? {
            closers.push(close);
        }
    }

    let _ = escape_html_body_text(&mut *html, text);

    for close in closers.into_iter().rev() {
        html.push_str(close);
    }
    Ok(())
}

/// Opens the tag for `mark` and returns its closing tag, or `None` when the
/// mark is dropped.
fn start_mark(
    html: &mut String,
    mark: &Mark<'_>,
    config: &RenderConfig,
) -> Result<Option<&'static str>, std::fmt::Error> {
    let close = match mark {
        Mark::Bold => {
            html.push_str("<strong>");
            "</strong>"
        }
        Mark::Italic => {
            html.push_str("<em>");
            "</em>"
        }
        Mark::Strike => {
            html.push_str("<s>");
            "</s>"
        }
        Mark::Underline => {
            html.push_str("<u>");
            "</u>"
        }
        Mark::Code => {
            html.push_str("<code>");
            "</code>"
        }
        Mark::Link { href, target, rel } => {
            let href = validate::link_href(href, &config.url_schemes).unwrap_or_else(|rejected| {
                tracing::debug!(%rejected, "neutralizing link href");
                "#"
            });
            html.push_str("<a href=\"");
            let _ = escape_html(&mut *html, href);
            html.push('"');

            if let Some(target) = target {
                match validate::link_target(target, &config.link_targets) {
                    Ok(target) => write!(html, " target=\"{target}\"")?,
                    Err(rejected) => tracing::debug!(%rejected, "dropping link target"),
                }
            }
            if let Some(rel) = rel {
                match validate::link_rel(rel, &config.link_rel) {
                    Ok(rel) => write!(html, " rel=\"{rel}\"")?,
                    Err(rejected) => tracing::debug!(%rejected, "dropping link rel"),
                }
            }
            html.push('>');
            "</a>"
        }
        Mark::TextStyle { color: None } => return Ok(None),
        Mark::TextStyle { color: Some(color) } => match validate::css_color(color) {
            Ok(color) => {
                write!(html, "<span style=\"color: {color}\">")?;
                "</span>"
            }
            Err(rejected) => {
                tracing::debug!(%rejected, "dropping text color");
                return Ok(None);
            }
        },
        Mark::Highlight { color: None } => {
            html.push_str("<mark>");
            "</mark>"
        }
        Mark::Highlight { color: Some(color) } => match validate::css_color(color) {
            Ok(color) => {
                write!(html, "<mark style=\"background-color: {color}\">")?;
                "</mark>"
            }
            Err(rejected) => {
                tracing::debug!(%rejected, "dropping highlight");
                return Ok(None);
            }
        },
        Mark::Unknown(kind) => {
            tracing::debug!(kind, "ignoring unknown mark");
            return Ok(None);
        }
    };
    Ok(Some(close))
}
