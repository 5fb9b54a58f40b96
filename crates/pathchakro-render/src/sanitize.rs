//! Allowlist HTML sanitization.
//!
//! Runs over everything the renderer produces, even though the renderer
//! already validated each value, and is a fixed point: cleaning cleaned
//! output changes nothing.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use ammonia::Builder;

use crate::config::{FORBIDDEN_TAGS, RenderConfig};
use crate::validate;

const GENERIC_ATTRIBUTES: &[&str] = &["class", "style"];

const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "target", "rel", "class"]),
    ("img", &["src", "alt", "title", "style", "class", "width", "height"]),
    (
        "iframe",
        &["src", "width", "height", "frameborder", "allowfullscreen", "class", "style"],
    ),
];

/// Style properties kept by the sanitizer, and the check each value must pass.
const STYLE_PROPERTIES: &[(&str, StyleValue)] = &[
    ("color", StyleValue::Color),
    ("background-color", StyleValue::Color),
    ("width", StyleValue::Length),
    ("height", StyleValue::Length),
    ("max-width", StyleValue::Length),
    ("display", StyleValue::Display),
];

#[derive(Debug, Clone, Copy)]
enum StyleValue {
    Color,
    Length,
    Display,
}

impl StyleValue {
    fn check(self, value: &str) -> Option<Cow<'_, str>> {
        match self {
            StyleValue::Color => validate::css_color(value).ok().map(Cow::Borrowed),
            StyleValue::Length => validate::css_length(value).ok(),
            StyleValue::Display => validate::css_display(value).ok().map(Cow::Borrowed),
        }
    }
}

/// The attribute-level rules ammonia has no built-in notion of.
#[derive(Debug)]
struct AttributeRules {
    iframe_hosts: Vec<String>,
    link_targets: Vec<String>,
    link_rel: Vec<String>,
}

impl AttributeRules {
    fn filter<'u>(&self, element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
        match (element, attribute) {
            (_, "style") => filter_style(value),
            ("iframe", "src") => validate::iframe_src(value, &self.iframe_hosts)
                .ok()
                .map(Cow::Borrowed),
            ("a", "target") => validate::link_target(value, &self.link_targets)
                .ok()
                .map(Cow::Borrowed),
            ("a", "rel") => validate::link_rel(value, &self.link_rel).ok().map(Cow::Owned),
            _ => Some(Cow::Borrowed(value)),
        }
    }
}

/// Keeps the allowlisted declarations of a `style` attribute, re-serialized
/// as `prop: value; prop: value`.
fn filter_style(style: &str) -> Option<Cow<'_, str>> {
    let mut kept = Vec::new();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let Some((name, rule)) = STYLE_PROPERTIES.iter().find(|(name, _)| *name == property)
        else {
            continue;
        };
        if let Some(value) = rule.check(value) {
            kept.push(format!("{name}: {value}"));
        }
    }

    if kept.is_empty() {
        None
    } else {
        let filtered = kept.join("; ");
        if filtered == style {
            Some(Cow::Borrowed(style))
        } else {
            Some(Cow::Owned(filtered))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sanitizer {
    builder: Arc<Builder<'static>>,
}

impl Sanitizer {
    pub fn new(config: &RenderConfig) -> Self {
        let rules = AttributeRules {
            iframe_hosts: config.iframe_hosts.clone(),
            link_targets: config.link_targets.clone(),
            link_rel: config.link_rel.clone(),
        };

        let mut builder = Builder::default();
        builder
            .add_tags(allowed_extra_tags(&config.extra_tags))
            .add_generic_attributes(GENERIC_ATTRIBUTES.iter().copied())
            .url_schemes(config.url_schemes.iter().map(|s| intern(s)).collect::<HashSet<_>>())
            // `rel` is ours to filter; ammonia refuses to allow it while it adds its own.
            .link_rel(None);
        for (tag, attributes) in TAG_ATTRIBUTES {
            builder.add_tag_attributes(*tag, attributes.iter().copied());
        }
        builder.attribute_filter(move |element, attribute, value| {
            rules.filter(element, attribute, value)
        });

        Self {
            builder: Arc::new(builder),
        }
    }

    pub fn clean(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

fn allowed_extra_tags(tags: &[String]) -> impl Iterator<Item = &'static str> + '_ {
    tags.iter().filter_map(|tag| {
        let tag = tag.to_ascii_lowercase();
        if FORBIDDEN_TAGS.contains(&tag.as_str()) {
            tracing::warn!(tag = %tag, "refusing to allow tag");
            None
        } else {
            Some(intern(&tag))
        }
    })
}

/// `Builder` only borrows tag and scheme names. Each distinct name is leaked
/// once and shared by every sanitizer after that.
fn intern(value: &str) -> &'static str {
    static INTERNED: LazyLock<Mutex<HashSet<&'static str>>> = LazyLock::new(Default::default);

    let mut interned = INTERNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(&existing) = interned.get(value) {
        return existing;
    }
    let leaked: &'static str = Box::leak(value.to_owned().into_boxed_str());
    interned.insert(leaked);
    leaked
}
