//! Allowlist checks for attribute and CSS values.
//!
//! Each check returns the accepted (possibly normalized) value or a
//! [`RejectedValue`]. The renderer and the sanitizer share these, so a value
//! accepted at render time is accepted again when the output is re-sanitized.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{RejectedValue, ValueKind};

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{3,8}$").expect("hex color regex"));

static RGB_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*[0-9.%\s,/]+\)$").expect("rgb color regex")
});

static HSL_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^hsla?\(\s*[0-9.%\s,/deg]+\)$").expect("hsl color regex")
});

static KEYWORD_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").expect("keyword color regex"));

static VAR_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^var\(--[a-zA-Z0-9_-]+\)$").expect("css var regex"));

static LENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<number>[0-9]+(?:\.[0-9]+)?)(?P<unit>px|%|em|rem|vw|vh)?$")
        .expect("css length regex")
});

static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+#.-]+$").expect("code language regex"));

const DISPLAY_VALUES: &[&str] = &["block", "inline", "inline-block", "flex", "grid", "none"];

/// Relative hrefs are resolved against this before their scheme is checked.
static DUMMY_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://pathchakro.invalid/").expect("dummy base url"));

/// Hex, `rgb()`/`rgba()`, `hsl()`/`hsla()`, a bare keyword, or `var(--name)`.
pub fn css_color(value: &str) -> Result<&str, RejectedValue> {
    let value = value.trim();
    let accepted = [
        &HEX_COLOR_RE,
        &RGB_COLOR_RE,
        &HSL_COLOR_RE,
        &KEYWORD_COLOR_RE,
        &VAR_COLOR_RE,
    ]
    .iter()
    .any(|re| re.is_match(value));

    if accepted {
        Ok(value)
    } else {
        Err(RejectedValue::new(ValueKind::Color, value))
    }
}

/// A number with an optional `px`, `%`, `em`, `rem`, `vw` or `vh` unit.
/// Bare numbers come back as pixels.
pub fn css_length(value: &str) -> Result<Cow<'_, str>, RejectedValue> {
    let value = value.trim();
    let Some(caps) = LENGTH_RE.captures(value) else {
        return Err(RejectedValue::new(ValueKind::Length, value));
    };
    if caps.name("unit").is_some() {
        Ok(Cow::Borrowed(value))
    } else {
        Ok(Cow::Owned(format!("{}px", &caps["number"])))
    }
}

pub fn css_display(value: &str) -> Result<&str, RejectedValue> {
    let value = value.trim();
    if DISPLAY_VALUES.contains(&value) {
        Ok(value)
    } else {
        Err(RejectedValue::new(ValueKind::Display, value))
    }
}

/// Accepts an href whose scheme, after resolving against a dummy base, is in
/// `schemes`. The trimmed original is returned so relative links stay relative.
pub fn link_href<'a, S: AsRef<str>>(href: &'a str, schemes: &[S]) -> Result<&'a str, RejectedValue> {
    let href = href.trim();
    let resolved =
        DUMMY_BASE.join(href).map_err(|_| RejectedValue::new(ValueKind::Href, href))?;
    if schemes.iter().any(|s| s.as_ref() == resolved.scheme()) {
        Ok(href)
    } else {
        Err(RejectedValue::new(ValueKind::Href, href))
    }
}

pub fn link_target<'a, S: AsRef<str>>(
    target: &'a str,
    allowed: &[S],
) -> Result<&'a str, RejectedValue> {
    let target = target.trim();
    if allowed.iter().any(|t| t.as_ref() == target) {
        Ok(target)
    } else {
        Err(RejectedValue::new(ValueKind::Target, target))
    }
}

/// Keeps the allowlisted tokens of a `rel` value, in their original order.
/// Rejected when nothing survives.
pub fn link_rel<S: AsRef<str>>(rel: &str, allowed: &[S]) -> Result<String, RejectedValue> {
    let kept: Vec<&str> = rel
        .split_ascii_whitespace()
        .filter(|token| allowed.iter().any(|a| a.as_ref().eq_ignore_ascii_case(token)))
        .collect();
    if kept.is_empty() {
        Err(RejectedValue::new(ValueKind::Rel, rel))
    } else {
        Ok(kept.join(" "))
    }
}

/// The suffix of a `language-` class on code blocks.
pub fn code_language(language: &str) -> Result<&str, RejectedValue> {
    let language = language.trim();
    if LANGUAGE_RE.is_match(language) {
        Ok(language)
    } else {
        Err(RejectedValue::new(ValueKind::Language, language))
    }
}

/// An absolute URL served from one of `hosts`.
pub fn iframe_src<'a, S: AsRef<str>>(src: &'a str, hosts: &[S]) -> Result<&'a str, RejectedValue> {
    let src = src.trim();
    let host = Url::parse(src)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase));
    match host {
        Some(host) if hosts.iter().any(|h| h.as_ref() == host) => Ok(src),
        _ => Err(RejectedValue::new(ValueKind::IframeSrc, src)),
    }
}
