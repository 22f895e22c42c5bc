//! HTML to readable text, in stages
//!
//! ```text
//! extract_title ─┐
//! extract_main ──┴─▶ strip_noise ─▶ convert_structure ─▶ decode_entities ─▶ normalize_whitespace
//! ```
//!
//! `extract_title` and `extract_main` use a real DOM (`scraper`); the rest
//! are targeted regex rewrites over the serialized main region. Every stage
//! is a pure `&str -> String` function.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};

/// Which element the main content was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainRegion {
    Main,
    Article,
    RoleMain,
    Body,
    /// No recognizable container; the whole input was used
    Document,
}

impl MainRegion {
    /// A focused region is narrower than the page body, so page chrome
    /// such as `<header>` inside it can be dropped
    pub fn is_focused(&self) -> bool {
        matches!(self, MainRegion::Main | MainRegion::Article | MainRegion::RoleMain)
    }
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static MAIN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("main").unwrap());
static ARTICLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article").unwrap());
static ROLE_MAIN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[role="main"]"#).unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "aside", "iframe", "form", "select", "noscript", "svg",
    "template",
];

static NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NOISE_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect()
});
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<header\b[^>]*>.*?</header\s*>").unwrap());
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static PRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre\b[^>]*>(.*?)</pre\s*>").unwrap());
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<code\b[^>]*>(.*?)</code\s*>").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:strong|b)\b[^>]*>(.*?)</(?:strong|b)\s*>").unwrap()
});
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:em|i)\b[^>]*>(.*?)</(?:em|i)\s*>").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});
static BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<blockquote\b[^>]*>(.*?)</blockquote\s*>").unwrap());
static TABLE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").unwrap());
static TABLE_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]\s*>").unwrap());
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<hr\b[^>]*>").unwrap());
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:p|div|section|header|article|main|ul|ol|li|dl|dd|dt|table|thead|tbody|tfoot|figure|figcaption)\b[^>]*>",
    )
    .unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});").unwrap()
});
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\x0c]+").unwrap());

/// Text of the `<title>` element, whitespace-collapsed
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>())?;
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

/// Serialized HTML of the main content region.
///
/// Tries `<main>`, then the longest `<article>`, then `[role="main"]`, then
/// `<body>`.
pub fn extract_main(html: &str) -> (String, MainRegion) {
    let document = Html::parse_document(html);

    if let Some(main) = document.select(&MAIN).next() {
        return (main.html(), MainRegion::Main);
    }
    if let Some(article) = document.select(&ARTICLE).max_by_key(text_len) {
        return (article.html(), MainRegion::Article);
    }
    if let Some(role_main) = document.select(&ROLE_MAIN).next() {
        return (role_main.html(), MainRegion::RoleMain);
    }
    if let Some(body) = document.select(&BODY).next() {
        return (body.html(), MainRegion::Body);
    }
    (html.to_string(), MainRegion::Document)
}

fn text_len(element: &ElementRef) -> usize {
    element.text().map(str::len).sum()
}

/// Remove non-content elements and comments.
///
/// `<header>` is removed only when `strip_header` is set.
pub fn strip_noise(html: &str, strip_header: bool) -> String {
    let mut out = COMMENT.replace_all(html, "").into_owned();
    for re in NOISE.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    if strip_header {
        out = HEADER.replace_all(&out, "").into_owned();
    }
    out
}

/// Rewrite structural markup as plain-text equivalents, then drop all
/// remaining tags. Entities are left encoded.
pub fn convert_structure(html: &str) -> String {
    let out = PRE.replace_all(html, |caps: &Captures| {
        let body = TAG.replace_all(&caps[1], "");
        format!("\n\n```\n{}\n```\n\n", body.trim_matches('\n'))
    });
    let out = CODE.replace_all(&out, |caps: &Captures| {
        format!("`{}`", TAG.replace_all(&caps[1], ""))
    });
    let out = BOLD.replace_all(&out, "**$1**");
    let out = ITALIC.replace_all(&out, "*$1*");
    let out = LINK.replace_all(&out, |caps: &Captures| {
        let href = caps[1].trim();
        let text = inline_text(&caps[2]);
        let navigable = !href.is_empty()
            && !href.starts_with('#')
            && !href.to_ascii_lowercase().starts_with("javascript:");
        match (text.is_empty(), navigable) {
            (true, true) => href.to_string(),
            (false, true) if text != href => format!("{} ({})", text, href),
            _ => text,
        }
    });
    let out = HEADING.replace_all(&out, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), inline_text(&caps[2]))
    });
    let out = TABLE_ROW.replace_all(&out, |caps: &Captures| {
        let cells: Vec<String> = TABLE_CELL
            .captures_iter(&caps[1])
            .map(|cell| inline_text(&cell[1]))
            .collect();
        format!("\n{}\n", cells.join(" | "))
    });
    let out = BLOCKQUOTE.replace_all(&out, |caps: &Captures| {
        let body = BLOCK_END.replace_all(&caps[1], "\n");
        let quoted: Vec<String> = TAG
            .replace_all(&body, "")
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| format!("> {}", line))
            .collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    });
    let out = LIST_ITEM.replace_all(&out, "\n- ");
    let out = LINE_BREAK.replace_all(&out, "\n");
    let out = RULE.replace_all(&out, "\n\n---\n\n");
    let out = BLOCK_END.replace_all(&out, "\n");
    TAG.replace_all(&out, "").into_owned()
}

/// Tags removed and whitespace collapsed to single spaces
fn inline_text(html: &str) -> String {
    TAG.replace_all(html, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode named and numeric character references in a single pass.
///
/// Unknown names and invalid code points are left as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            match decoded {
                Some('\u{a0}') => " ".to_string(),
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "bull" => '•',
        "middot" => '·',
        "times" => '×',
        "divide" => '÷',
        "deg" => '°',
        "plusmn" => '±',
        "para" => '¶',
        "sect" => '§',
        "cent" => '¢',
        "pound" => '£',
        "euro" => '€',
        "yen" => '¥',
        "larr" => '←',
        "rarr" => '→',
        "uarr" => '↑',
        "darr" => '↓',
        "shy" => '\u{ad}',
        "zwj" => '\u{200d}',
        "zwnj" => '\u{200c}',
        _ => return None,
    };
    Some(c)
}

/// Collapse runs of spaces, trim lines and keep at most one blank line in
/// a row. Lines inside ``` fences are kept verbatim.
pub fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0;

    for raw in text.lines() {
        let raw = raw.trim_end_matches('\r');
        if raw.trim_start().starts_with("```") {
            in_fence = !in_fence;
            lines.push(raw.trim().to_string());
            blank_run = 0;
            continue;
        }
        if in_fence {
            lines.push(raw.trim_end().to_string());
            continue;
        }

        let line = INLINE_SPACE.replace_all(raw.trim(), " ").into_owned();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || lines.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Full pipeline: title plus cleaned main-region text
pub fn html_to_text(html: &str) -> (Option<String>, String) {
    let title = extract_title(html);
    let (region, kind) = extract_main(html);
    let stripped = strip_noise(&region, kind.is_focused());
    let converted = convert_structure(&stripped);
    let decoded = decode_entities(&converted);
    (title, normalize_whitespace(&decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title>  Hello\n   World </title></head><body></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Hello World"));
        assert_eq!(extract_title("<html><body>x</body></html>"), None);
    }

    #[test]
    fn test_extract_main_preference_order() {
        let html = r#"<body><div role="main">r</div><article>a</article><main>m</main></body>"#;
        let (region, kind) = extract_main(html);
        assert_eq!(kind, MainRegion::Main);
        assert!(region.contains(">m<"));

        let html = "<body><article>short</article><article>the longer one</article></body>";
        let (region, kind) = extract_main(html);
        assert_eq!(kind, MainRegion::Article);
        assert!(region.contains("the longer one"));

        let html = r#"<body><div role="main">r</div><p>other</p></body>"#;
        assert_eq!(extract_main(html).1, MainRegion::RoleMain);

        let (region, kind) = extract_main("<body><p>just body</p></body>");
        assert_eq!(kind, MainRegion::Body);
        assert!(region.contains("just body"));
    }

    #[test]
    fn test_strip_noise() {
        let html = "<header>Site</header><nav>menu</nav><p>keep</p><script>var x=1;</script>\
                    <!-- note --><style>p{}</style><footer>foot</footer><aside>ad</aside>";
        let kept = strip_noise(html, false);
        assert!(kept.contains("keep"));
        assert!(kept.contains("Site"));
        for gone in ["menu", "var x", "note", "p{}", "foot", "ad<"] {
            assert!(!kept.contains(gone), "{gone} should be stripped");
        }
        assert!(!strip_noise(html, true).contains("Site"));
    }

    #[test]
    fn test_convert_headings_and_inline() {
        let out = convert_structure("<h2>Install <em>now</em></h2><p>Use <code>cargo</code> and <strong>care</strong>.</p>");
        assert!(out.contains("## Install *now*"));
        assert!(out.contains("Use `cargo` and **care**."));
    }

    #[test]
    fn test_convert_pre_block() {
        let out = convert_structure("<pre><code>fn main() {\n    run();\n}</code></pre>");
        assert!(out.contains("```\nfn main() {\n    run();\n}\n```"));
    }

    #[test]
    fn test_convert_links_lists_tables() {
        let out = convert_structure(
            r##"<ul><li><a href="https://a.test/">A</a></li><li><a href="#top">Top</a></li></ul>
            <table><tr><th>k</th><th>v</th></tr><tr><td>x</td><td>1</td></tr></table>"##,
        );
        assert!(out.contains("- A (https://a.test/)"));
        assert!(out.contains("- Top"));
        assert!(!out.contains("#top"));
        assert!(out.contains("k | v"));
        assert!(out.contains("x | 1"));
    }

    #[test]
    fn test_convert_blockquote() {
        let out = convert_structure("<blockquote><p>line one</p><p>line two</p></blockquote>");
        assert!(out.contains("> line one\n> line two"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("&copy; &hellip;"), "© …");
        assert_eq!(decode_entities("&bogus; &#xFFFFFF;"), "&bogus; &#xFFFFFF;");
        // Single pass: no double decoding
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_normalize_whitespace() {
        let text = "\n\n  a   b  \n\n\n\n c\t\td \n\n";
        assert_eq!(normalize_whitespace(text), "a b\n\nc d");
    }

    #[test]
    fn test_normalize_keeps_fences() {
        let text = "intro\n```\n    indented   code\n\n\n\nmore\n```\n\n\n\nafter";
        assert_eq!(
            normalize_whitespace(text),
            "intro\n```\n    indented   code\n\n\n\nmore\n```\n\nafter"
        );
    }

    #[test]
    fn test_pipeline_keeps_header_on_body_fallback() {
        let html = "<html><body><header>Brand</header><p>Body text</p></body></html>";
        let (_, text) = html_to_text(html);
        assert!(text.contains("Brand"));

        let html = "<html><body><main><header>Article head</header><p>Body</p></main></body></html>";
        let (_, text) = html_to_text(html);
        assert!(!text.contains("Article head"));
    }

    #[test]
    fn test_pipeline_escaped_markup_survives_as_text() {
        let html = "<html><body><p>Use &lt;div&gt; for blocks &amp; more</p></body></html>";
        let (_, text) = html_to_text(html);
        assert_eq!(text, "Use <div> for blocks & more");
    }
}
