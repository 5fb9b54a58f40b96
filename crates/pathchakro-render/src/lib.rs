//! Pathchakro rich-text renderer
//!
//! Turns documents saved by the post, review and course editors into HTML that
//! is safe to drop straight into a page. Stored content is untrusted and often
//! messy, so rendering never fails: the worst case is an empty string.
//!
//! ```
//! let stored = r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"Hello"}]}]}"#;
//! assert_eq!(pathchakro_render::generate_html(stored), "<p>Hello</p>");
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use pulldown_cmark_escape::escape_html_body_text;

pub mod config;
pub mod decode;
pub mod document;
pub mod error;
pub mod marks;
pub mod node;
pub mod render;
pub mod sanitize;
pub mod validate;

pub use config::RenderConfig;
pub use decode::{Decoded, RawContent, decode, decode_with_limit};
pub use document::{RawMark, RawNode};
pub use error::{ConfigError, RejectedValue, RenderError, ValueKind};
pub use sanitize::Sanitizer;

static DEFAULT_RENDERER: LazyLock<HtmlRenderer> =
    LazyLock::new(|| HtmlRenderer::new(RenderConfig::default()));

/// Renders stored content with the default policy.
///
/// Accepts anything convertible to [`RawContent`]: `&str`, `Option<&str>`,
/// `&String`, or `&serde_json::Value`.
pub fn generate_html<'a>(content: impl Into<RawContent<'a>>) -> String {
    DEFAULT_RENDERER.render(content)
}

/// A renderer bound to one [`RenderConfig`].
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    config: RenderConfig,
    sanitizer: Sanitizer,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl HtmlRenderer {
    pub fn new(config: RenderConfig) -> Self {
        let sanitizer = Sanitizer::new(&config);
        Self { config, sanitizer }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Renders stored content, logging any failure and returning `""` for it.
    pub fn render<'a>(&self, content: impl Into<RawContent<'a>>) -> String {
        match self.try_render(content) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(error = %e, "failed to render document");
                String::new()
            }
        }
    }

    /// Like [`HtmlRenderer::render`] but reports failures instead of hiding them.
    pub fn try_render<'a>(&self, content: impl Into<RawContent<'a>>) -> Result<String, RenderError> {
        let content = content.into();
        panic::catch_unwind(AssertUnwindSafe(|| {
            let decoded = decode_with_limit(content, self.config.max_depth)?;
            self.render_decoded(decoded)
        }))
            .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(payload.as_ref()))))
    }

    fn render_decoded(&self, decoded: Decoded) -> Result<String, RenderError> {
        let raw_html = match decoded {
            Decoded::Document(root) => render::render_tree(&root, &self.config)?,
            Decoded::PlainText(text) => {
                let mut html = String::with_capacity(text.len() + 7);
                html.push_str("<p>");
                let _ = escape_html_body_text(&mut html, &text);
                html.push_str("</p>");
                html
            }
            Decoded::Unrecoverable => return Ok(String::new()),
        };
        Ok(self.sanitizer.clean(&raw_html))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
