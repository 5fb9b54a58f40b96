// Whole-pipeline checks: stored content in, sanitized HTML out.

use pathchakro_render::{HtmlRenderer, RenderConfig, RenderError, Sanitizer, generate_html};
use serde_json::{Value, json};

fn text(s: &str) -> Value {
    json!({"type": "text", "text": s})
}

fn paragraph(children: Vec<Value>) -> Value {
    json!({"type": "paragraph", "content": children})
}

fn doc(children: Vec<Value>) -> Value {
    json!({"type": "doc", "content": children})
}

/// A spread of documents touching every node and mark kind, including hostile values.
fn sample_documents() -> Vec<Value> {
    vec![
        doc(vec![paragraph(vec![text("plain")])]),
        doc(vec![
            json!({"type": "heading", "attrs": {"level": 1}, "content": [text("Title")]}),
            json!({"type": "heading", "attrs": {"level": "7"}, "content": [text("Too deep")]}),
            paragraph(vec![
                json!({"type": "text", "text": "bold", "marks": [{"type": "bold"}, {"type": "italic"}]}),
                json!({"type": "hardBreak"}),
                json!({"type": "text", "text": "<script>alert(1)</script>"}),
            ]),
        ]),
        doc(vec![paragraph(vec![
            json!({"type": "text", "text": "bad link", "marks": [{"type": "link", "attrs": {"href": "javascript:alert(1)", "target": "_blank", "rel": "noopener"}}]}),
            json!({"type": "text", "text": "data", "marks": [{"type": "link", "attrs": {"href": "data:text/html;base64,PHNjcmlwdD4="}}]}),
            json!({"type": "text", "text": "good", "marks": [{"type": "link", "attrs": {"href": "https://pathchakro.example/books/1"}}]}),
        ])]),
        doc(vec![paragraph(vec![
            json!({"type": "text", "text": "styled", "marks": [{"type": "textStyle", "attrs": {"color": "red\" onmouseover=\"alert(1)"}}]}),
            json!({"type": "text", "text": "hl", "marks": [{"type": "highlight", "attrs": {"color": "#ff0"}}]}),
            json!({"type": "text", "text": "c", "marks": [{"type": "code"}, {"type": "strike"}, {"type": "underline"}]}),
        ])]),
        doc(vec![
            json!({"type": "bulletList", "content": [{"type": "listItem", "content": [paragraph(vec![text("a")])]}]}),
            json!({"type": "orderedList", "attrs": {"start": 4}, "content": [{"type": "listItem", "content": [paragraph(vec![text("b")])]}]}),
            json!({"type": "blockquote", "content": [paragraph(vec![text("quoted")])]}),
            json!({"type": "codeBlock", "attrs": {"language": "js"}, "content": [text("if (a < b) { run(); }")]}),
            json!({"type": "horizontalRule"}),
        ]),
        doc(vec![
            json!({"type": "image", "attrs": {"src": "javascript:alert(1)", "alt": "x\" onerror=\"alert(1)", "width": "50%"}}),
            json!({"type": "image", "attrs": {"src": "https://cdn.example/a.png", "width": "300"}}),
            json!({"type": "youtube", "attrs": {"src": "https://www.youtube.com/embed/abc", "width": 640, "height": 360}}),
            json!({"type": "iframe", "attrs": {"src": "https://evil.example/phish"}}),
        ]),
        doc(vec![json!({"type": "customBlock", "content": [paragraph(vec![text("inside")])]})]),
    ]
}

const ALLOWED_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "code", "img",
    "iframe", "br", "hr", "strong", "em", "s", "u", "a", "span", "mark",
];

const GLOBAL_ATTRIBUTES: &[&str] = &["class", "style", "lang", "title"];

const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "target", "rel"]),
    ("img", &["src", "alt", "width", "height"]),
    ("iframe", &["src", "width", "height", "frameborder", "allowfullscreen"]),
    ("ol", &["start"]),
];

/// Opening tags in `html` with their attribute names. Attribute values are
/// always double quoted in sanitized output.
fn elements(html: &str) -> Vec<(String, Vec<String>)> {
    let mut found = Vec::new();
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        rest = &rest[open + 1..];
        if rest.starts_with('/') {
            continue;
        }
        let name_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        let name = rest[..name_len].to_string();
        rest = &rest[name_len..];

        let mut attributes = Vec::new();
        loop {
            rest = rest.trim_start();
            if let Some(after) = rest.strip_prefix('>') {
                rest = after;
                break;
            }
            let attr_len = rest
                .find(|c: char| c == '=' || c == '>' || c.is_whitespace())
                .unwrap_or(rest.len());
            assert!(attr_len > 0, "malformed tag <{name}> in {html}");
            attributes.push(rest[..attr_len].to_string());
            rest = &rest[attr_len..];
            if let Some(value) = rest.strip_prefix("=\"") {
                let end = value.find('"').expect("unterminated attribute value");
                rest = &value[end + 1..];
            }
        }
        found.push((name, attributes));
    }
    found
}

fn attribute_allowed(tag: &str, attribute: &str) -> bool {
    GLOBAL_ATTRIBUTES.contains(&attribute)
        || TAG_ATTRIBUTES
            .iter()
            .any(|(t, attributes)| *t == tag && attributes.contains(&attribute))
}

#[test]
fn output_contains_only_allowed_markup() {
    for document in sample_documents() {
        let html = generate_html(document.to_string().as_str());
        assert!(!html.contains("<script"), "{html}");
        assert!(!html.to_ascii_lowercase().contains("javascript:"), "{html}");
        for (tag, attributes) in elements(&html) {
            assert!(ALLOWED_TAGS.contains(&tag.as_str()), "unexpected <{tag}> in {html}");
            for attribute in attributes {
                assert!(
                    attribute_allowed(&tag, &attribute),
                    "unexpected {attribute} on <{tag}> in {html}"
                );
            }
        }
    }
}

#[test]
fn attribute_scan_sees_every_attribute() {
    let found = elements(r#"<p><a href="/x" onclick="y">a &gt; b</a><img src="/i.png" alt="q > r"></p>"#);
    assert_eq!(
        found,
        vec![
            ("p".to_string(), vec![]),
            ("a".to_string(), vec!["href".to_string(), "onclick".to_string()]),
            ("img".to_string(), vec!["src".to_string(), "alt".to_string()]),
        ]
    );
    assert!(!attribute_allowed("a", "onclick"));
    assert!(!attribute_allowed("p", "start"));
}

#[test]
fn sanitizing_output_is_a_fixed_point() {
    let sanitizer = Sanitizer::new(&RenderConfig::default());
    for document in sample_documents() {
        let html = generate_html(document.to_string().as_str());
        assert_eq!(sanitizer.clean(&html), html);
    }
}

#[test]
fn double_encoding_renders_identically() {
    for document in sample_documents() {
        let once = document.to_string();
        let twice = Value::String(once.clone()).to_string();
        assert_eq!(generate_html(twice.as_str()), generate_html(once.as_str()));
    }
}

#[test]
fn parsed_values_render_like_their_strings() {
    for document in sample_documents() {
        assert_eq!(
            generate_html(&document),
            generate_html(document.to_string().as_str())
        );
    }
}

#[test]
fn non_json_strings_become_a_paragraph() {
    for (input, expected) in [
        ("hello", "<p>hello</p>"),
        ("3 < 4 & 5 > 2", "<p>3 &lt; 4 &amp; 5 &gt; 2</p>"),
        ("<script>alert(1)</script>", "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>"),
        ("{not json", "<p>{not json</p>"),
    ] {
        assert_eq!(generate_html(input), expected);
    }
}

#[test]
fn missing_input_is_empty() {
    assert_eq!(generate_html(None::<&str>), "");
    assert_eq!(generate_html(&Value::Null), "");
    assert_eq!(generate_html(""), "");
}

#[test]
fn out_of_range_headings_render_as_h2() {
    for level in [json!(0), json!(9), json!("abc"), json!(null)] {
        let document = doc(vec![json!({"type": "heading", "attrs": {"level": level}, "content": [text("T")]})]);
        assert_eq!(generate_html(&document), "<h2>T</h2>");
    }
}

#[test]
fn javascript_links_point_nowhere() {
    let document = doc(vec![paragraph(vec![json!({
        "type": "text",
        "text": "click",
        "marks": [{"type": "link", "attrs": {"href": "javascript:alert(1)"}}]
    })])]);
    assert_eq!(generate_html(&document), "<p><a href=\"#\">click</a></p>");
}

#[test]
fn image_width_handling() {
    let image = |width: &str| doc(vec![json!({"type": "image", "attrs": {"src": "/cover.png", "width": width}})]);

    assert_eq!(generate_html(&image("abc")), "<img src=\"/cover.png\">");
    assert_eq!(
        generate_html(&image("300")),
        "<img src=\"/cover.png\" style=\"width: 300px\">"
    );
}

#[test]
fn unknown_nodes_render_only_children() {
    let document = doc(vec![json!({
        "type": "customBlock",
        "content": [paragraph(vec![text("one")]), paragraph(vec![text("two")])]
    })]);
    assert_eq!(generate_html(&document), "<p>one</p><p>two</p>");
}

#[test]
fn bare_arrays_and_untyped_docs() {
    let nodes = json!([paragraph(vec![text("a")]), paragraph(vec![text("b")])]);
    assert_eq!(generate_html(&nodes), "<p>a</p><p>b</p>");

    let untyped = json!({"content": [paragraph(vec![text("c")])]});
    assert_eq!(generate_html(&untyped), "<p>c</p>");

    assert_eq!(generate_html(&json!({"title": "no content"})), "");
}

#[test]
fn full_render_snapshot() {
    let document = doc(vec![
        json!({"type": "heading", "attrs": {"level": 3}, "content": [text("Reading list")]}),
        json!({"type": "bulletList", "content": [
            {"type": "listItem", "content": [paragraph(vec![
                json!({"type": "text", "text": "Gitanjali", "marks": [{"type": "link", "attrs": {"href": "/books/gitanjali", "target": "_blank", "rel": "noopener noreferrer"}}]})
            ])]}
        ]}),
        paragraph(vec![json!({"type": "text", "text": "due soon", "marks": [{"type": "highlight", "attrs": {"color": "#fde68a"}}]})]),
    ]);

    insta::assert_snapshot!(
        generate_html(&document),
        @r#"<h3>Reading list</h3><ul><li><p><a href="/books/gitanjali" target="_blank" rel="noopener noreferrer">Gitanjali</a></p></li></ul><p><mark style="background-color: #fde68a">due soon</mark></p>"#
    );
}

#[test]
fn custom_config_widens_iframe_hosts() {
    let config = RenderConfig::from_kdl(r#"iframe-hosts "media.pathchakro.example""#).unwrap();
    let renderer = HtmlRenderer::new(config);
    let document = doc(vec![json!({"type": "iframe", "attrs": {"src": "https://media.pathchakro.example/v/1"}})]);

    assert_eq!(
        renderer.render(&document),
        "<iframe src=\"https://media.pathchakro.example/v/1\" frameborder=\"0\" allowfullscreen=\"true\"></iframe>"
    );
    assert_eq!(generate_html(&document), "");
}

fn nested_blockquotes(levels: usize) -> Value {
    let mut node = paragraph(vec![text("deep")]);
    for _ in 0..levels {
        node = json!({"type": "blockquote", "content": [node]});
    }
    doc(vec![node])
}

#[test]
fn deeply_nested_strings_render_like_values() {
    let document = nested_blockquotes(70);
    let html = generate_html(document.to_string().as_str());

    assert_eq!(html, generate_html(&document));
    assert!(html.starts_with("<blockquote><blockquote>"), "{html}");
    assert_eq!(html.matches("<blockquote>").count(), 70);
}

#[test]
fn nesting_past_max_depth_is_empty_either_way() {
    let document = nested_blockquotes(200);
    let renderer = HtmlRenderer::default();

    assert_eq!(generate_html(document.to_string().as_str()), "");
    assert_eq!(generate_html(&document), "");
    assert!(matches!(
        renderer.try_render(document.to_string().as_str()),
        Err(RenderError::NestingTooDeep { limit: 128 })
    ));
    assert!(matches!(
        renderer.try_render(&document),
        Err(RenderError::NestingTooDeep { limit: 128 })
    ));
}
