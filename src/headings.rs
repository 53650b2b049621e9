// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Heading Anchors and Table of Contents
//!
//! Post-processes rendered article HTML:
//!
//! - [`add_heading_ids`] gives every `<h2>`/`<h3>` a unique `id` attribute.
//! - [`extract_toc_headings`] lists the same headings as [`TocEntry`] values.
//!
//! Both share [`slugify`], [`strip_tags`] and the [`UsedIds`] collision rule:
//! a taken id gets `-2`, `-3`, … appended until it is free. Ids are unique
//! within one call only; nothing is shared between documents.
//!
//! The two functions deliberately disagree on headings with no text: the
//! annotator falls back to `section-2` / `section-3`, the extractor drops
//! them from the table of contents.
//!
//! ## Limitations
//!
//! Headings are located with a regular expression, not an HTML parser. A
//! heading nested inside another heading of the same level, or an attribute
//! value containing `>`, is not matched correctly. Unbalanced headings are
//! left untouched.
//!
//! ```
//! use chainpress::headings::{add_heading_ids, extract_toc_headings};
//!
//! let html = add_heading_ids("<h2>Intro</h2><h2>Intro</h2>");
//! assert_eq!(html, r#"<h2 id="intro">Intro</h2><h2 id="intro-2">Intro</h2>"#);
//!
//! let toc = extract_toc_headings(&html);
//! assert_eq!(toc[1].id, "intro-2");
//! ```

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h2([^>]*)>(.*?)</h2>|<h3([^>]*)>(.*?)</h3>")
        .expect("heading pattern is valid")
});

// Group 1 spans the whole attribute, groups 2-4 hold the value per quoting style.
static ID_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:^|\s)(id\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))"#,
    )
    .expect("id attribute pattern is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9\s-]").expect("slug filter pattern is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static HYPHENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("hyphen pattern is valid"));

/// One entry of an article's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Anchor id, unique within the document.
    pub id: String,
    /// Heading text with markup removed and surrounding whitespace trimmed.
    pub text: String,
    /// Heading level, 2 or 3.
    pub level: u8,
}

/// Ids already handed out while scanning one document.
#[derive(Debug, Clone, Default)]
pub struct UsedIds {
    ids: HashSet<String>,
}

impl UsedIds {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `base`, or the first free `base-2`, `base-3`, … and returns
    /// the reserved id.
    pub fn claim(&mut self, base: &str) -> String {
        if self.ids.insert(base.to_string()) {
            return base.to_string();
        }

        let mut suffix = 2usize;
        loop {
            let candidate = format!("{}-{}", base, suffix);
            if self.ids.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Returns `true` if `id` has been claimed.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of claimed ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing has been claimed yet.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A `<h2>` or `<h3>` element located in an HTML string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingMatch<'a> {
    /// Heading level, 2 or 3.
    pub level: u8,
    /// Everything between the tag name and the closing `>` of the opening tag.
    pub raw_attributes: &'a str,
    /// Markup between the opening and closing tags.
    pub inner_html: &'a str,
    /// Byte range of the whole element in the source.
    pub span: Range<usize>,
    tag_name: &'a str,
    open_tag_end: usize,
    source: &'a str,
}

impl HeadingMatch<'_> {
    /// The heading's `id` attribute, if present and non-empty.
    pub fn existing_id(&self) -> Option<&str> {
        ID_ATTR_RE
            .captures(self.raw_attributes)
            .and_then(|caps| id_value(&caps))
            .filter(|id| !id.is_empty())
    }

    /// Heading text with markup removed, untrimmed.
    pub fn text(&self) -> String {
        strip_tags(self.inner_html)
    }

    /// Id used when the heading has no text to slugify.
    pub fn fallback_id(&self) -> String {
        format!("section-{}", self.level)
    }

    /// Appends the element to `out` with its `id` attribute set to `id`.
    ///
    /// An element whose id already equals `id` is copied byte for byte.
    fn write_with_id(&self, out: &mut String, id: &str) {
        if self.existing_id() == Some(id) {
            out.push_str(&self.source[self.span.clone()]);
            return;
        }

        let attribute = format!("id=\"{}\"", id);
        out.push('<');
        out.push_str(self.tag_name);
        match ID_ATTR_RE
            .captures(self.raw_attributes)
            .and_then(|caps| caps.get(1))
        {
            Some(existing) => {
                out.push_str(&self.raw_attributes[..existing.start()]);
                out.push_str(&attribute);
                out.push_str(&self.raw_attributes[existing.end()..]);
            }
            None => {
                out.push_str(self.raw_attributes);
                out.push(' ');
                out.push_str(&attribute);
            }
        }
        out.push('>');
        out.push_str(&self.source[self.open_tag_end..self.span.end]);
    }
}

fn id_value<'h>(caps: &Captures<'h>) -> Option<&'h str> {
    caps.get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map(|m| m.as_str())
}

/// Finds every non-overlapping `<h2>`/`<h3>` element, in document order.
///
/// Matching is case-insensitive and the element body may span lines.
pub fn find_headings(html: &str) -> impl Iterator<Item = HeadingMatch<'_>> + '_ {
    HEADING_RE.captures_iter(html).filter_map(move |caps| {
        let whole = caps.get(0)?;
        let (level, attrs, inner) = match (caps.get(1), caps.get(2)) {
            (Some(attrs), Some(inner)) => (2, attrs, inner),
            _ => (3, caps.get(3)?, caps.get(4)?),
        };
        Some(HeadingMatch {
            level,
            raw_attributes: attrs.as_str(),
            inner_html: inner.as_str(),
            span: whole.range(),
            tag_name: &html[whole.start() + 1..whole.start() + 3],
            open_tag_end: attrs.end() + 1,
            source: html,
        })
    })
}

/// Converts heading text into a lowercase, hyphen-separated slug.
///
/// `&` and `&amp;` become `and`; anything outside `[a-z0-9\s-]` is dropped.
/// The result may be empty.
///
/// ```
/// assert_eq!(chainpress::headings::slugify("Gas & Fees!"), "gas-and-fees");
/// ```
pub fn slugify(text: &str) -> String {
    let lowered = text
        .to_lowercase()
        .replace("&amp;", "and")
        .replace('&', "and");
    let cleaned = DISALLOWED_RE.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_RE.replace_all(cleaned.trim(), "-");
    HYPHENS_RE.replace_all(&hyphenated, "-").into_owned()
}

/// Removes every tag and decodes a fixed set of named entities.
///
/// Only `&nbsp;`, `&amp;`, `&lt;`, `&gt;`, `&quot;` and `&#39;` are decoded,
/// in that order. Other entities are left as written.
///
/// ```
/// assert_eq!(chainpress::headings::strip_tags("<b>A &amp; B</b>"), "A & B");
/// ```
pub fn strip_tags(html: &str) -> String {
    TAG_RE
        .replace_all(html, "")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

/// Returns `html` with a unique `id` on every `<h2>` and `<h3>`.
///
/// Existing unique ids are kept; colliding ones are suffixed. Headings
/// without an id get the slug of their text, or `section-2` / `section-3`
/// when the text slugifies to nothing. Running it on its own output changes
/// nothing.
pub fn add_heading_ids(html: &str) -> String {
    let mut used = UsedIds::new();
    let mut out = String::with_capacity(html.len() + 64);
    let mut last = 0;

    for heading in find_headings(html) {
        out.push_str(&html[last..heading.span.start]);

        let id = match heading.existing_id() {
            Some(existing) => used.claim(existing),
            None => {
                let slug = slugify(&heading.text());
                if slug.is_empty() {
                    used.claim(&heading.fallback_id())
                } else {
                    used.claim(&slug)
                }
            }
        };

        heading.write_with_id(&mut out, &id);
        last = heading.span.end;
    }

    out.push_str(&html[last..]);
    out
}

/// Lists the `<h2>`/`<h3>` headings of `html` in document order.
///
/// Each entry uses the heading's own id when it has one, otherwise the slug
/// of its text. Headings with neither are skipped. The input is not modified.
pub fn extract_toc_headings(html: &str) -> Vec<TocEntry> {
    let mut used = UsedIds::new();

    find_headings(html)
        .filter_map(|heading| {
            let text = heading.text();
            let base = match heading.existing_id() {
                Some(existing) => existing.to_string(),
                None => slugify(&text),
            };
            if base.is_empty() {
                return None;
            }

            Some(TocEntry {
                id: used.claim(&base),
                text: text.trim().to_string(),
                level: heading.level,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_of(html: &str) -> Vec<String> {
        find_headings(html)
            .map(|h| h.existing_id().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Gas & Fees!"), "gas-and-fees");
        assert_eq!(slugify("Gas &amp; Fees"), "gas-and-fees");
        assert_eq!(slugify("  Layer   2 -- Rollups  "), "layer-2-rollups");
        assert_eq!(slugify("Proof-of-Stake"), "proof-of-stake");
        assert_eq!(slugify("¿Qué?"), "qu");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>A &amp; B</b>"), "A & B");
        assert_eq!(
            strip_tags("a&nbsp;&lt;b&gt; &quot;c&quot; &#39;d&#39;"),
            "a <b> \"c\" 'd'"
        );
        assert_eq!(strip_tags("&copy; <i>2024</i>"), "&copy; 2024");
        assert_eq!(strip_tags("  <span>x</span> "), "  x ");
    }

    #[test]
    fn test_used_ids_suffixes() {
        let mut used = UsedIds::new();
        assert!(used.is_empty());
        assert_eq!(used.claim("intro"), "intro");
        assert_eq!(used.claim("intro"), "intro-2");
        assert_eq!(used.claim("intro"), "intro-3");
        assert_eq!(used.claim("intro-2"), "intro-2-2");
        assert!(used.contains("intro-3"));
        assert_eq!(used.len(), 4);
    }

    #[test]
    fn test_duplicate_headings_get_suffix() {
        let html = add_heading_ids("<h2>Intro</h2>\n<p>x</p>\n<h2>Intro</h2>");
        assert_eq!(
            html,
            "<h2 id=\"intro\">Intro</h2>\n<p>x</p>\n<h2 id=\"intro-2\">Intro</h2>"
        );
    }

    #[test]
    fn test_existing_unique_id_kept() {
        let input = r#"<h2 class="title" id="custom">Overview</h2>"#;
        assert_eq!(add_heading_ids(input), input);
    }

    #[test]
    fn test_colliding_existing_id_rewritten() {
        let html = add_heading_ids(
            r#"<h2 id="fees">Fees</h2><h3 class="sub" id='fees'>More</h3>"#,
        );
        assert_eq!(
            html,
            r#"<h2 id="fees">Fees</h2><h3 class="sub" id="fees-2">More</h3>"#
        );
    }

    #[test]
    fn test_generated_id_collides_with_later_existing_id() {
        let html =
            add_heading_ids(r#"<h2>Intro</h2><h2 id="intro">Again</h2>"#);
        assert_eq!(ids_of(&html), ["intro", "intro-2"]);
    }

    #[test]
    fn test_empty_headings_fall_back_per_level() {
        let html = add_heading_ids(
            r#"<h2><img src="logo.png"></h2><h2> </h2><h3></h3><h2>!!</h2>"#,
        );
        assert_eq!(
            ids_of(&html),
            ["section-2", "section-2-2", "section-3", "section-2-3"]
        );
    }

    #[test]
    fn test_empty_id_attribute_replaced() {
        let html = add_heading_ids(r#"<h2 id="">Gas &amp; Fees</h2>"#);
        assert_eq!(html, r#"<h2 id="gas-and-fees">Gas &amp; Fees</h2>"#);
    }

    #[test]
    fn test_data_id_is_not_an_id() {
        let html = add_heading_ids(r#"<h2 data-id="x">Hello</h2>"#);
        assert_eq!(html, r#"<h2 data-id="x" id="hello">Hello</h2>"#);
    }

    #[test]
    fn test_case_and_multiline() {
        let html = add_heading_ids("<H2>Title</H2>\n<h3>\n  Multi\n  line\n</h3>");
        assert_eq!(
            html,
            "<H2 id=\"title\">Title</H2>\n<h3 id=\"multi-line\">\n  Multi\n  line\n</h3>"
        );
    }

    #[test]
    fn test_other_levels_and_unbalanced_untouched() {
        let input = "<h1>Top</h1><h4>Deep</h4><h2>Open only<h3>Mixed</h2>";
        let html = add_heading_ids(input);
        assert!(html.starts_with("<h1>Top</h1><h4>Deep</h4>"));
        assert!(html.contains("<h2 id=\"open-onlymixed\">"));

        let no_close = "<h2>never closed";
        assert_eq!(add_heading_ids(no_close), no_close);
    }

    #[test]
    fn test_all_ids_unique_and_present() {
        let inputs = [
            "<h2>A</h2><h2>A</h2><h3>A</h3><h2 id=\"a-2\">B</h2>",
            "<h2></h2><h3></h3><h2></h2><h2 id=\"section-2\">x</h2>",
            "<h3 id='q'>1</h3><h3 id=\"q\">2</h3><h2>Q</h2><h2>q</h2>",
        ];

        for input in inputs {
            let ids = ids_of(&add_heading_ids(input));
            assert!(ids.iter().all(|id| !id.is_empty()), "{:?}", ids);
            let unique: HashSet<_> = ids.iter().collect();
            assert_eq!(unique.len(), ids.len(), "{:?}", ids);
        }
    }

    #[test]
    fn test_add_heading_ids_idempotent() {
        let inputs = [
            "<h2>Intro</h2><h2>Intro</h2><h3></h3>",
            r#"<h2 id="x">A</h2><h3 id="x">B</h3><p>text</p>"#,
            "<h2>Gas &amp; Fees</h2><h3><code>eth_call</code></h3>",
        ];

        for input in inputs {
            let once = add_heading_ids(input);
            assert_eq!(add_heading_ids(&once), once);
        }
    }

    #[test]
    fn test_toc_no_headings() {
        assert!(extract_toc_headings("<p>No headings here</p>").is_empty());
        assert!(extract_toc_headings("").is_empty());
    }

    #[test]
    fn test_toc_order_levels_and_text() {
        let toc = extract_toc_headings(
            r#"<h2 id="start">Getting <code>started</code></h2>
<h3>Sub &amp; More</h3>
<h1>Ignored</h1>
<h2>Getting started</h2>"#,
        );

        assert_eq!(
            toc,
            vec![
                TocEntry {
                    id: "start".to_string(),
                    text: "Getting started".to_string(),
                    level: 2,
                },
                TocEntry {
                    id: "sub-and-more".to_string(),
                    text: "Sub & More".to_string(),
                    level: 3,
                },
                TocEntry {
                    id: "getting-started".to_string(),
                    text: "Getting started".to_string(),
                    level: 2,
                },
            ]
        );
    }

    #[test]
    fn test_toc_deduplicates_ids() {
        let toc = extract_toc_headings("<h2>Intro</h2><h3>Intro</h3>");
        let ids: Vec<_> = toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["intro", "intro-2"]);
    }

    #[test]
    fn test_empty_heading_asymmetry() {
        let input = "<h2> </h2><h2>Real</h2>";

        let annotated = add_heading_ids(input);
        assert_eq!(ids_of(&annotated), ["section-2", "real"]);

        let toc = extract_toc_headings(input);
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].id, "real");

        // After annotation the fallback id is an existing id, so it is listed.
        let toc = extract_toc_headings(&annotated);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].id, "section-2");
        assert_eq!(toc[0].text, "");
    }

    #[test]
    fn test_toc_matches_annotated_ids() {
        let annotated =
            add_heading_ids("<h2>One</h2><h3>Two</h3><h2>One</h2>");
        let toc = extract_toc_headings(&annotated);
        let toc_ids: Vec<_> = toc.iter().map(|e| e.id.clone()).collect();
        assert_eq!(toc_ids, ids_of(&annotated));
    }

    #[test]
    fn test_toc_entry_serializes_for_templates() {
        let entry = TocEntry {
            id: "intro".to_string(),
            text: "Intro".to_string(),
            level: 2,
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"id": "intro", "text": "Intro", "level": 2})
        );
    }
}
