//! Render policy configuration.
//!
//! Every allowlist the renderer and sanitizer consult lives here, with
//! defaults matching what the editor produces. A config file only needs the
//! settings it wants to change:
//!
//! ```kdl
//! iframe-hosts "www.youtube.com" "youtu.be" "player.vimeo.com"
//! max-depth 64
//! ```

use std::path::Path;

use kdl::{KdlDocument, KdlNode};

use crate::error::ConfigError;

pub const DEFAULT_URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

pub const DEFAULT_IFRAME_HOSTS: &[&str] = &["www.youtube.com", "youtu.be", "player.vimeo.com"];

pub const DEFAULT_LINK_TARGETS: &[&str] = &["_blank", "_self", "_parent", "_top"];

pub const DEFAULT_LINK_REL: &[&str] = &["noopener", "noreferrer", "nofollow"];

/// Added on top of the sanitizer's own default tag set.
pub const DEFAULT_EXTRA_TAGS: &[&str] = &["h1", "h2", "img", "iframe", "u", "s", "span", "mark"];

pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Tags whose content the sanitizer removes wholesale; they can never be allowed.
pub const FORBIDDEN_TAGS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Schemes kept on link hrefs and sanitized URL attributes, without the colon.
    pub url_schemes: Vec<String>,
    pub iframe_hosts: Vec<String>,
    pub link_targets: Vec<String>,
    pub link_rel: Vec<String>,
    pub extra_tags: Vec<String>,
    /// Deepest node nesting the tree walk accepts.
    pub max_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            url_schemes: owned(DEFAULT_URL_SCHEMES),
            iframe_hosts: owned(DEFAULT_IFRAME_HOSTS),
            link_targets: owned(DEFAULT_LINK_TARGETS),
            link_rel: owned(DEFAULT_LINK_REL),
            extra_tags: owned(DEFAULT_EXTRA_TAGS),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl RenderConfig {
    /// Reads and parses a KDL config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_kdl(&text)?;
        tracing::debug!(path = %path.display(), "loaded render config");
        Ok(config)
    }

    /// Parses a KDL config. Settings not mentioned keep their defaults.
    pub fn from_kdl(text: &str) -> Result<Self, ConfigError> {
        let doc: KdlDocument = text.parse()?;
        let mut config = Self::default();

        for node in doc.nodes() {
            match node.name().value() {
                "url-schemes" => {
                    config.url_schemes = string_entries(node, "url-schemes")?
                        .into_iter()
                        .map(|scheme| scheme.trim_end_matches(':').to_ascii_lowercase())
                        .collect();
                }
                "iframe-hosts" => {
                    config.iframe_hosts = string_entries(node, "iframe-hosts")?
                        .into_iter()
                        .map(|host| host.to_ascii_lowercase())
                        .collect();
                }
                "link-targets" => config.link_targets = string_entries(node, "link-targets")?,
                "link-rel" => config.link_rel = string_entries(node, "link-rel")?,
                "extra-tags" => config.extra_tags = extra_tags(node)?,
                "max-depth" => config.max_depth = max_depth(node)?,
                other => {
                    return Err(ConfigError::UnknownSetting {
                        name: other.to_string(),
                    });
                }
            }
        }

        Ok(config)
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn string_entries(node: &KdlNode, setting: &'static str) -> Result<Vec<String>, ConfigError> {
    node.entries()
        .iter()
        .map(|entry| {
            if let Some(name) = entry.name() {
                return Err(ConfigError::InvalidValue {
                    setting,
                    reason: format!("unexpected property `{}`", name.value()),
                });
            }
            entry
                .value()
                .as_string()
                .map(str::to_string)
                .ok_or_else(|| ConfigError::InvalidValue {
                    setting,
                    reason: format!("expected a string, found {}", entry.value()),
                })
        })
        .collect()
}

fn extra_tags(node: &KdlNode) -> Result<Vec<String>, ConfigError> {
    let tags: Vec<String> = string_entries(node, "extra-tags")?
        .into_iter()
        .map(|tag| tag.to_ascii_lowercase())
        .collect();
    if let Some(tag) = tags.iter().find(|tag| FORBIDDEN_TAGS.contains(&tag.as_str())) {
        return Err(ConfigError::InvalidValue {
            setting: "extra-tags",
            reason: format!("`{tag}` cannot be allowed"),
        });
    }
    Ok(tags)
}

fn max_depth(node: &KdlNode) -> Result<usize, ConfigError> {
    let [entry] = node.entries() else {
        return Err(ConfigError::InvalidValue {
            setting: "max-depth",
            reason: format!("expected exactly one value, found {}", node.entries().len()),
        });
    };
    entry
        .value()
        .as_i64()
        .filter(|depth| *depth > 0)
        .and_then(|depth| usize::try_from(depth).ok())
        .ok_or_else(|| ConfigError::InvalidValue {
            setting: "max-depth",
            reason: format!("expected a positive integer, found {}", entry.value()),
        })
}
