use std::fmt::Write;

use pulldown_cmark_escape::escape_html;

use crate::config::RenderConfig;
use crate::document::RawNode;
use crate::error::RenderError;
use crate::marks::render_marked_text;
use crate::node::{EmbedAttrs, ImageAttrs, Node};
use crate::validate;

/// Renders `root` and everything below it to unsanitized HTML.
pub fn render_tree(root: &RawNode, config: &RenderConfig) -> Result<String, RenderError> {
    let mut html = String::new();
    render_node(&mut html, root, config, 0)?;
    Ok(html)
}

fn render_node(
    html: &mut String,
    raw: &RawNode,
    config: &RenderConfig,
    depth: usize,
) -> Result<(), RenderError> {
    if depth >= config.max_depth {
        return Err(RenderError::NestingTooDeep {
            limit: config.max_depth,
        });
    }

    match Node::classify(raw) {
        Node::Doc(children) => render_children(html, children, config, depth)?,
        Node::Paragraph(children) => wrap(html, "p", children, config, depth)?,
        Node::Heading { level, children } => {
            write!(html, "<h{level}>")?;
            render_children(html, children, config, depth)?;
            write!(html, "</h{level}>")?;
        }
        Node::BulletList(children) => wrap(html, "ul", children, config, depth)?,
        Node::OrderedList { start, children } => {
            match start {
                Some(start) if start != 1 => write!(html, "<ol start=\"{start}\">")?,
                _ => html.push_str("<ol>"),
            }
            render_children(html, children, config, depth)?;
            html.push_str("</ol>");
        }
        Node::ListItem(children) => wrap(html, "li", children, config, depth)?,
        Node::Blockquote(children) => wrap(html, "blockquote", children, config, depth)?,
        Node::CodeBlock { language, children } => {
            html.push_str("<pre><code");
            if let Some(language) = language.as_deref() {
                match validate::code_language(language) {
                    Ok(language) => write!(html, " class=\"language-{language}\"")?,
                    Err(rejected) => tracing::debug!(%rejected, "dropping code block language"),
                }
            }
            html.push('>');
            render_children(html, children, config, depth)?;
            html.push_str("</code></pre>");
        }
        Node::Image(image) => render_image(html, &image)?,
        Node::Embed(embed) => render_embed(html, &embed, config)?,
        Node::HardBreak => html.push_str("<br>"),
        Node::HorizontalRule => html.push_str("<hr>"),
        Node::Text { text, marks } => render_marked_text(html, text, &marks, config)?,
        Node::Unknown { kind, children } => {
            tracing::debug!(kind, "rendering children of unrecognized node");
            render_children(html, children, config, depth)?;
        }
    }
    Ok(())
}

fn render_children(
    html: &mut String,
    children: &[RawNode],
    config: &RenderConfig,
    depth: usize,
) -> Result<(), RenderError> {
    for child in children {
        render_node(html, child, config, depth + 1)?;
    }
    Ok(())
}

fn wrap(
    html: &mut String,
    tag: &str,
    children: &[RawNode],
    config: &RenderConfig,
    depth: usize,
) -> Result<(), RenderError> {
    write!(html, "<{tag}>")?;
    render_children(html, children, config, depth)?;
    write!(html, "</{tag}>")?;
    Ok(())
}

fn render_image(html: &mut String, image: &ImageAttrs) -> std::fmt::Result {
    html.push_str("<img");
    push_attr(html, "src", image.src.as_deref());
    push_attr(html, "alt", image.alt.as_deref());
    push_attr(html, "title", image.title.as_deref());
    if let Some(width) = image.width.as_deref() {
        match validate::css_length(width) {
            Ok(width) => write!(html, " style=\"width: {width}\"")?,
            Err(rejected) => tracing::debug!(%rejected, "omitting image width"),
        }
    }
    html.push('>');
    Ok(())
}

fn render_embed(html: &mut String, embed: &EmbedAttrs, config: &RenderConfig) -> std::fmt::Result {
    let Some(src) = embed.src.as_deref() else {
        tracing::warn!("dropping embed without a source");
        return Ok(());
    };
    let src = match validate::iframe_src(src, &config.iframe_hosts) {
        Ok(src) => src,
        Err(rejected) => {
            tracing::warn!(%rejected, "dropping embed from a host that is not allowed");
            return Ok(());
        }
    };

    html.push_str("<iframe");
    push_attr(html, "src", Some(src));
    for (name, value) in [("width", &embed.width), ("height", &embed.height)] {
        if let Some(pixels) = value.as_deref().and_then(pixel_count) {
            write!(html, " {name}=\"{pixels}\"")?;
        }
    }
    html.push_str(" frameborder=\"0\" allowfullscreen=\"true\"></iframe>");
    Ok(())
}

/// Iframe dimensions are plain attributes, so only whole pixel counts survive.
fn pixel_count(value: &str) -> Option<u32> {
    value.trim().trim_end_matches("px").parse().ok()
}

fn push_attr(html: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        html.push(' ');
        html.push_str(name);
        html.push_str("=\"");
        let _ = escape_html(&mut *html, value);
        html.push('"');
    }
}
