use miette::Diagnostic;
use thiserror::Error;

/// Failures inside the tree walk or the sanitizer.
///
/// These never reach callers of [`crate::generate_html`]; they are logged and
/// turned into an empty string there. [`crate::HtmlRenderer::try_render`]
/// exposes them for callers that want to know.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("failed to write html: {0}")]
    #[diagnostic(code(render::format))]
    Format(#[from] std::fmt::Error),

    #[error("document nesting exceeds {limit} levels")]
    #[diagnostic(
        code(render::nesting_too_deep),
        help("raise `max-depth` in the render config if documents this deep are legitimate")
    )]
    NestingTooDeep { limit: usize },

    #[error("renderer panicked: {0}")]
    #[diagnostic(code(render::panicked))]
    Panicked(String),
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    #[diagnostic(code(config::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid KDL in render config: {0}")]
    #[diagnostic(code(config::kdl))]
    Kdl(#[from] kdl::KdlError),

    #[error("unknown setting `{name}` in render config")]
    #[diagnostic(
        code(config::unknown_setting),
        help(
            "known settings: url-schemes, iframe-hosts, link-targets, link-rel, extra-tags, max-depth"
        )
    )]
    UnknownSetting { name: String },

    #[error("invalid value for `{setting}`: {reason}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue {
        setting: &'static str,
        reason: String,
    },
}

/// The kind of value a validator was asked to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Color,
    Length,
    Display,
    Href,
    Target,
    Rel,
    Language,
    IframeSrc,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Color => "color",
            ValueKind::Length => "length",
            ValueKind::Display => "display",
            ValueKind::Href => "href",
            ValueKind::Target => "target",
            ValueKind::Rel => "rel",
            ValueKind::Language => "code language",
            ValueKind::IframeSrc => "iframe src",
        };
        f.write_str(name)
    }
}

/// A value that failed one of the allowlist checks in [`crate::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rejected {kind} value {value:?}")]
pub struct RejectedValue {
    pub kind: ValueKind,
    pub value: String,
}

impl RejectedValue {
    pub fn new(kind: ValueKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
