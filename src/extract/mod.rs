//! Extraction policy applied to an already-fetched HTML document.
//!
//! Everything here is total: missing elements or attributes just leave the
//! corresponding field unset.

mod element;

pub use element::MarkupElement;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::models::{ImageRef, Meta, OpenGraph, PageMetadata};

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^\s$.?#].[^\s]*").expect("valid URL pattern"));

static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static CANONICAL: Lazy<Selector> = Lazy::new(|| selector("link[rel=canonical]"));
static META: Lazy<Selector> = Lazy::new(|| selector("meta"));
static ICON: Lazy<Selector> = Lazy::new(|| selector(r#"link[rel*="icon"]"#));
static IMG: Lazy<Selector> = Lazy::new(|| selector("img"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Where a recognised `<meta>` key is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    MetaTitle,
    MetaDescription,
    MetaImage,
    OgTitle,
    OgDescription,
    OgImage,
    OgUrl,
    OgSiteName,
    OgType,
    OgCard,
}

const META_KEYS: &[(&str, Field)] = &[
    ("title", Field::MetaTitle),
    ("description", Field::MetaDescription),
    ("image", Field::MetaImage),
    ("og:title", Field::OgTitle),
    ("og:description", Field::OgDescription),
    ("og:image", Field::OgImage),
    ("og:url", Field::OgUrl),
    ("og:site_name", Field::OgSiteName),
    ("og:type", Field::OgType),
    ("twitter:card", Field::OgCard),
];

impl Field {
    fn lookup(key: &str) -> Option<Field> {
        META_KEYS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, field)| *field)
    }

    fn slot<'a>(self, meta: &'a mut Meta, og: &'a mut OpenGraph) -> &'a mut Option<String> {
        match self {
            Field::MetaTitle => &mut meta.title,
            Field::MetaDescription => &mut meta.description,
            Field::MetaImage => &mut meta.image,
            Field::OgTitle => &mut og.title,
            Field::OgDescription => &mut og.description,
            Field::OgImage => &mut og.image,
            Field::OgUrl => &mut og.url,
            Field::OgSiteName => &mut og.site_name,
            Field::OgType => &mut og.kind,
            Field::OgCard => &mut og.card,
        }
    }
}

/// Returns `true` if `url` starts with `http://` or `https://` followed by
/// at least two non-whitespace characters. This is a sanity check, not URL
/// validation.
pub fn looks_like_http_url(url: &str) -> bool {
    HTTP_URL.is_match(url)
}

/// Parse `html` and extract metadata, resolving relative URLs against `base`.
pub fn extract_from_html(html: &str, base: &Url) -> PageMetadata {
    let document = Html::parse_document(html);

    let mut meta = Meta::default();
    let mut og = OpenGraph::default();

    if let Some(title) = document.select(&TITLE).next() {
        meta.title = Some(MarkupElement::text(&title));
    }

    if let Some(canonical) = document.select(&CANONICAL).next() {
        meta.url = canonical.attr("href").map(str::to_string);
    }

    for el in document.select(&META) {
        sweep_meta(&el, &mut meta, &mut og);
    }

    og.logo = best_icon_href(document.select(&ICON).collect())
        .map(|href| resolve_icon_href(href, base));

    let images: Vec<ImageRef> = document
        .select(&IMG)
        .filter_map(|el| resolve_image(&el, base))
        .collect();

    tracing::debug!(
        url = %base,
        images = images.len(),
        has_title = meta.title.is_some(),
        has_logo = og.logo.is_some(),
        "Extracted page metadata"
    );

    PageMetadata { meta, og, images }
}

/// Apply one `<meta>` element. The identifying key is `name`, falling back to
/// `property`; later elements overwrite earlier ones.
fn sweep_meta<E: MarkupElement>(el: &E, meta: &mut Meta, og: &mut OpenGraph) {
    let Some(key) = el.non_empty_attr("name").or_else(|| el.attr("property")) else {
        return;
    };
    let Some(field) = Field::lookup(key) else {
        return;
    };
    if let Some(content) = el.non_empty_attr("content") {
        *field.slot(meta, og) = Some(content.to_string());
    }
}

/// Numeric size hint from a `sizes="WxH"` attribute: the leading integer of
/// the part before the first `x`, or `0`.
pub fn icon_size<E: MarkupElement>(el: &E) -> i64 {
    el.attr("sizes")
        .and_then(|sizes| sizes.split('x').next())
        .map(parse_leading_int)
        .unwrap_or(0)
}

/// Lenient integer parse: skips leading whitespace, accepts a sign, then
/// reads digits until the first non-digit. No digits yields `0`.
fn parse_leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    if negative {
        -value
    } else {
        value
    }
}

/// `href` of the largest icon. Ties keep document order. An empty `href`
/// is returned as-is.
fn best_icon_href<E: MarkupElement>(mut icons: Vec<E>) -> Option<String> {
    icons.sort_by_key(|el| std::cmp::Reverse(icon_size(el)));
    icons
        .first()
        .and_then(|el| el.attr("href"))
        .map(str::to_string)
}

/// Hrefs without `http` anywhere are treated as origin-relative and
/// prefixed with the page origin verbatim.
fn resolve_icon_href(href: String, base: &Url) -> String {
    if href.is_empty() || href.contains("http") {
        href
    } else {
        format!("{}{}", base.origin().ascii_serialization(), href)
    }
}

fn resolve_image<E: MarkupElement>(el: &E, base: &Url) -> Option<ImageRef> {
    let src = el.non_empty_attr("src")?;
    match base.join(src) {
        Ok(resolved) => Some(ImageRef {
            src: resolved.to_string(),
        }),
        Err(e) => {
            tracing::debug!(error = %e, src, "Skipping unresolvable image source");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    fn extract(html: &str) -> PageMetadata {
        extract_from_html(html, &base("https://example.com/page"))
    }

    #[test]
    fn url_pattern_accepts_http_and_https() {
        assert!(looks_like_http_url("http://example.com"));
        assert!(looks_like_http_url("https://example.com/a?b=c"));
        assert!(looks_like_http_url("HTTPS://EXAMPLE.COM"));
    }

    #[test]
    fn url_pattern_rejects_other_input() {
        assert!(!looks_like_http_url(""));
        assert!(!looks_like_http_url("example.com"));
        assert!(!looks_like_http_url("ftp://example.com"));
        assert!(!looks_like_http_url("https://"));
        assert!(!looks_like_http_url("https://a"));
        assert!(!looks_like_http_url("https://.example.com"));
        assert!(!looks_like_http_url("https:// example.com"));
        assert!(!looks_like_http_url(" https://example.com"));
    }

    #[test]
    fn extracts_title_text() {
        let page = extract("<html><head><title>Hello</title></head></html>");
        assert_eq!(page.meta.title.as_deref(), Some("Hello"));
    }

    #[test]
    fn empty_title_element_still_sets_title() {
        let page = extract("<html><head><title></title></head></html>");
        assert_eq!(page.meta.title.as_deref(), Some(""));
    }

    #[test]
    fn canonical_href_is_taken_literally() {
        let page = extract(r#"<html><head><link rel="canonical" href="/canon"></head></html>"#);
        assert_eq!(page.meta.url.as_deref(), Some("/canon"));
    }

    #[test]
    fn canonical_without_href_leaves_url_unset() {
        let page = extract(r#"<html><head><link rel="canonical"></head></html>"#);
        assert!(page.meta.url.is_none());
    }

    #[test]
    fn last_og_tag_wins() {
        let page = extract(
            r#"<html><head>
            <meta property="og:title" content="A"/>
            <meta property="og:title" content="B"/>
            </head></html>"#,
        );
        assert_eq!(page.og.title.as_deref(), Some("B"));
    }

    #[test]
    fn maps_all_known_keys() {
        let page = extract(
            r#"<html><head>
            <meta name="title" content="mt"/>
            <meta name="description" content="md"/>
            <meta name="image" content="mi"/>
            <meta property="og:title" content="ot"/>
            <meta property="og:description" content="od"/>
            <meta property="og:image" content="oi"/>
            <meta property="og:url" content="ou"/>
            <meta property="og:site_name" content="os"/>
            <meta property="og:type" content="article"/>
            <meta name="twitter:card" content="summary"/>
            </head></html>"#,
        );
        assert_eq!(page.meta.title.as_deref(), Some("mt"));
        assert_eq!(page.meta.description.as_deref(), Some("md"));
        assert_eq!(page.meta.image.as_deref(), Some("mi"));
        assert_eq!(page.og.title.as_deref(), Some("ot"));
        assert_eq!(page.og.description.as_deref(), Some("od"));
        assert_eq!(page.og.image.as_deref(), Some("oi"));
        assert_eq!(page.og.url.as_deref(), Some("ou"));
        assert_eq!(page.og.site_name.as_deref(), Some("os"));
        assert_eq!(page.og.kind.as_deref(), Some("article"));
        assert_eq!(page.og.card.as_deref(), Some("summary"));
    }

    #[test]
    fn meta_title_overrides_title_element() {
        let page = extract(
            r#"<html><head><title>Tag</title><meta name="title" content="Meta"/></head></html>"#,
        );
        assert_eq!(page.meta.title.as_deref(), Some("Meta"));
    }

    #[test]
    fn name_takes_precedence_over_property() {
        let page = extract(
            r#"<html><head><meta name="keywords" property="og:title" content="X"/></head></html>"#,
        );
        assert!(page.og.title.is_none());
    }

    #[test]
    fn empty_name_falls_back_to_property() {
        let page =
            extract(r#"<html><head><meta name="" property="og:title" content="X"/></head></html>"#);
        assert_eq!(page.og.title.as_deref(), Some("X"));
    }

    #[test]
    fn unknown_and_empty_tags_contribute_nothing() {
        let page = extract(
            r#"<html><head>
            <meta name="keywords" content="a,b"/>
            <meta property="og:locale" content="en_US"/>
            <meta property="og:title" content=""/>
            <meta property="og:description"/>
            <meta charset="utf-8"/>
            </head></html>"#,
        );
        assert_eq!(page.meta, Meta::default());
        assert_eq!(page.og, OpenGraph::default());
    }

    #[test]
    fn empty_content_does_not_clear_earlier_value() {
        let page = extract(
            r#"<html><head>
            <meta property="og:title" content="Kept"/>
            <meta property="og:title" content=""/>
            </head></html>"#,
        );
        assert_eq!(page.og.title.as_deref(), Some("Kept"));
    }

    #[test]
    fn key_match_is_exact() {
        let page = extract(r#"<html><head><meta property="OG:TITLE" content="X"/></head></html>"#);
        assert!(page.og.title.is_none());
    }

    #[test]
    fn largest_icon_wins_in_either_order() {
        for html in [
            r#"<link rel="icon" sizes="16x16" href="/16.png"><link rel="icon" sizes="32x32" href="/32.png">"#,
            r#"<link rel="icon" sizes="32x32" href="/32.png"><link rel="icon" sizes="16x16" href="/16.png">"#,
        ] {
            let page = extract(&format!("<html><head>{html}</head></html>"));
            assert_eq!(page.og.logo.as_deref(), Some("https://example.com/32.png"));
        }
    }

    #[test]
    fn equal_sizes_keep_document_order() {
        let page = extract(
            r#"<html><head>
            <link rel="shortcut icon" href="/first.ico">
            <link rel="apple-touch-icon" href="/second.png">
            </head></html>"#,
        );
        assert_eq!(
            page.og.logo.as_deref(),
            Some("https://example.com/first.ico")
        );
    }

    #[test]
    fn sized_icon_beats_unsized() {
        let page = extract(
            r#"<html><head>
            <link rel="icon" href="/plain.ico">
            <link rel="apple-touch-icon" sizes="180x180" href="/touch.png">
            </head></html>"#,
        );
        assert_eq!(
            page.og.logo.as_deref(),
            Some("https://example.com/touch.png")
        );
    }

    #[test]
    fn origin_relative_icon_is_prefixed() {
        let page = extract(r#"<html><head><link rel="icon" href="/favicon.ico"></head></html>"#);
        assert_eq!(
            page.og.logo.as_deref(),
            Some("https://example.com/favicon.ico")
        );
    }

    #[test]
    fn absolute_icon_is_kept() {
        let page = extract(
            r#"<html><head><link rel="icon" href="https://cdn.example.net/i.png"></head></html>"#,
        );
        assert_eq!(
            page.og.logo.as_deref(),
            Some("https://cdn.example.net/i.png")
        );
    }

    #[test]
    fn icon_origin_keeps_non_default_port() {
        let page = extract_from_html(
            r#"<html><head><link rel="icon" href="/f.ico"></head></html>"#,
            &base("http://localhost:8080/a/b"),
        );
        assert_eq!(page.og.logo.as_deref(), Some("http://localhost:8080/f.ico"));
    }

    #[test]
    fn path_relative_icon_is_concatenated_verbatim() {
        let page = extract(r#"<html><head><link rel="icon" href="favicon.ico"></head></html>"#);
        assert_eq!(
            page.og.logo.as_deref(),
            Some("https://example.comfavicon.ico")
        );
    }

    #[test]
    fn no_icons_leaves_logo_unset() {
        let page = extract("<html><head><title>x</title></head></html>");
        assert!(page.og.logo.is_none());
    }

    #[test]
    fn empty_icon_href_is_kept_unprefixed() {
        let page = extract(r#"<html><head><link rel="icon" href=""></head></html>"#);
        assert_eq!(page.og.logo.as_deref(), Some(""));
    }

    #[test]
    fn largest_icon_without_href_leaves_logo_unset() {
        let page = extract(
            r#"<html><head>
            <link rel="icon" sizes="16x16" href="/16.png">
            <link rel="icon" sizes="64x64">
            </head></html>"#,
        );
        assert!(page.og.logo.is_none());
    }

    #[test]
    fn icon_size_parsing() {
        fn size(html: &str) -> i64 {
            let doc = Html::parse_fragment(html);
            let el = doc.select(&ICON).next().unwrap();
            icon_size(&el)
        }
        assert_eq!(size(r#"<link rel="icon" sizes="32x32">"#), 32);
        assert_eq!(size(r#"<link rel="icon" sizes="192x192 512x512">"#), 192);
        assert_eq!(size(r#"<link rel="icon" sizes=" 48x48">"#), 48);
        assert_eq!(size(r#"<link rel="icon" sizes="64X64">"#), 64);
        assert_eq!(size(r#"<link rel="icon" sizes="any">"#), 0);
        assert_eq!(size(r#"<link rel="icon" sizes="x32">"#), 0);
        assert_eq!(size(r#"<link rel="icon" sizes="">"#), 0);
        assert_eq!(size(r#"<link rel="icon">"#), 0);
    }

    #[test]
    fn leading_int_handles_signs_and_overflow() {
        assert_eq!(parse_leading_int("-5"), -5);
        assert_eq!(parse_leading_int("+7px"), 7);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn images_resolve_against_page_url() {
        let page = extract_from_html(
            r#"<html><body>
            <img src="/a.png">
            <img src="b.png">
            <img src="https://cdn.example.net/c.png">
            </body></html>"#,
            &base("https://example.com/dir/page"),
        );
        let srcs: Vec<&str> = page.images.iter().map(|i| i.src.as_str()).collect();
        assert_eq!(
            srcs,
            vec![
                "https://example.com/a.png",
                "https://example.com/dir/b.png",
                "https://cdn.example.net/c.png",
            ]
        );
    }

    #[test]
    fn images_skip_missing_src_and_keep_duplicates() {
        let page = extract(
            r#"<html><body>
            <img>
            <img src="">
            <img src="/x.png">
            <img src="/x.png">
            </body></html>"#,
        );
        assert_eq!(page.images.len(), 2);
        assert_eq!(page.images[0], page.images[1]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = r#"<html><head>
            <title>T</title>
            <meta property="og:image" content="/og.png"/>
            <link rel="icon" sizes="16x16" href="/16.png">
            </head><body><img src="a.png"></body></html>"#;
        assert_eq!(extract(html), extract(html));
    }

    #[test]
    fn malformed_markup_is_best_effort() {
        let page = extract(r#"<title>Broken<meta property="og:title" content="X"><img src=/i.png"#);
        assert!(page.meta.title.is_some());
        assert!(page.og.logo.is_none());
    }
}
