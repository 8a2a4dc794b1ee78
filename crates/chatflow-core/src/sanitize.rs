//! Markup sanitization for assistant output.
//!
//! A fixed allow-list pass over untrusted markup. This is deliberately not
//! a general HTML parser: the denylist and attribute-stripping passes run
//! before the allow-list filter, so malformed or adversarial markup
//! degrades to stripped plain text, never to executable content.
//!
//! Because the pacer re-sanitizes the whole display accumulator on every
//! tick, the input routinely ends mid-tag. Unterminated denylisted blocks
//! are removed through end-of-input and a trailing partial tag is
//! stripped, so a tag split across chunk boundaries is never exposed.

use once_cell::sync::Lazy;
use regex::Regex;

const EMBED_TOKEN_PREFIX: &str = "__TRUSTED_EMBED_";

/// Tags whose entire element, contents included, is removed.
const BLOCK_TAGS: [&str; 6] = ["script", "style", "noscript", "iframe", "object", "embed"];

/// Scheduling-widget embeds from the trusted domain are set aside before
/// stripping and restored afterwards.
static TRUSTED_EMBED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<iframe\s+[^>]*src=["']https?://(?:www\.)?calendly\.com[^"']*["'][^>]*>.*?</iframe\s*>"#,
    )
    .expect("trusted embed regex")
});

/// One regex per block tag; the regex crate has no backreferences, so the
/// closing tag cannot be matched generically. `\z` handles a block whose
/// closing tag has not arrived yet.
static BLOCK_ELEMENTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    BLOCK_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?(?:</{tag}\s*>|\z)"))
                .expect("block element regex")
        })
        .collect()
});

/// Leftover denylisted tags: orphan closers of the block set plus
/// structural tags stripped without their contents.
static DENY_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:script|style|noscript|iframe|object|embed|form|link|meta)\b[^>]*>")
        .expect("deny tag regex")
});

static ON_HANDLER_DQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\son\w+="[^"]*""#).expect("handler regex"));
static ON_HANDLER_SQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\son\w+='[^']*'").expect("handler regex"));
/// Unquoted handler values; runs after the quoted passes so it only sees
/// leftovers.
static ON_HANDLER_UQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\son\w+=[^\s>'"]+"#).expect("handler regex"));
static JAVASCRIPT_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript:").expect("scheme regex"));

static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("any tag regex"));

/// The fixed allow-set of inline/structural tags, matched against one
/// complete tag. Attributes on allowed tags ride along; dangerous ones
/// were already stripped by the earlier passes.
static ALLOWED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^</?(?:h1|h2|h3|h4|p|ul|ol|li|b|strong|i|em|br|hr|code|pre|a|button)\b(?:\s[^>]*)?/?>$",
    )
    .expect("allowed tag regex")
});

/// A tag-like `<...` opened at the very end of input with no closing `>`,
/// or a bare `<` as the last character (the next chunk may turn it into a
/// tag). A `<` followed by whitespace (e.g. "a < b") is left alone.
static TRAILING_PARTIAL_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<[/!a-zA-Z][^>]*\z|<\z").expect("trailing tag regex"));

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\n\s*){2,}").expect("blank regex"));
static P_OPEN_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<p>\s+").expect("p regex"));
static P_CLOSE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+</p>").expect("p regex"));
static LI_OPEN_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li>\s+").expect("li regex"));
static LI_CLOSE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+</li>").expect("li regex"));
static EMPTY_P: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<p>\s*</p>").expect("empty p regex"));

/// Reduces untrusted markup to the fixed allow-set.
///
/// Pure and infallible: any input maps to a string containing only
/// allow-listed tags plus explicitly trusted embeds. Unmatched or
/// malformed markup is stripped, never executed.
pub fn sanitize(raw: &str) -> String {
    // 1. Set trusted embeds aside so the iframe stripping below does not
    //    destroy them.
    let mut embeds: Vec<String> = Vec::new();
    let mut safe = TRUSTED_EMBED
        .replace_all(raw, |caps: &regex::Captures| {
            embeds.push(caps[0].to_string());
            format!("{}{}__", EMBED_TOKEN_PREFIX, embeds.len() - 1)
        })
        .into_owned();

    // 2. Remove denylisted elements with their contents, then any leftover
    //    denylisted tags.
    for element in BLOCK_ELEMENTS.iter() {
        safe = element.replace_all(&safe, "").into_owned();
    }
    safe = DENY_TAG.replace_all(&safe, "").into_owned();

    // 3. Strip inline handlers and javascript: URLs.
    safe = ON_HANDLER_DQ.replace_all(&safe, "").into_owned();
    safe = ON_HANDLER_SQ.replace_all(&safe, "").into_owned();
    safe = ON_HANDLER_UQ.replace_all(&safe, "").into_owned();
    safe = JAVASCRIPT_SCHEME.replace_all(&safe, "").into_owned();

    // 4. Allow-list filter: delete every complete tag outside the allow-set.
    safe = ANY_TAG
        .replace_all(&safe, |caps: &regex::Captures| {
            if ALLOWED_TAG.is_match(&caps[0]) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned();

    // 5. A tag cut off by a chunk boundary must not leak as text.
    safe = TRAILING_PARTIAL_TAG.replace(&safe, "").into_owned();

    // 6. Put the trusted embeds back.
    for (index, embed) in embeds.iter().enumerate() {
        safe = safe.replace(&format!("{EMBED_TOKEN_PREFIX}{index}__"), embed);
    }

    safe
}

/// Cosmetic whitespace cleanup inside block tags.
///
/// Collapses runs of blank lines, trims padding just inside paragraphs and
/// list items, and drops empty paragraphs. Independent of the security
/// guarantees of [`sanitize`].
pub fn normalize(html: &str) -> String {
    let mut out = BLANK_RUNS.replace_all(html, "\n").into_owned();
    out = P_OPEN_WS.replace_all(&out, "<p>").into_owned();
    out = P_CLOSE_WS.replace_all(&out, "</p>").into_owned();
    out = LI_OPEN_WS.replace_all(&out, "<li>").into_owned();
    out = LI_CLOSE_WS.replace_all(&out, "</li>").into_owned();
    out = EMPTY_P.replace_all(&out, "").into_owned();
    out
}

/// [`sanitize`] followed by [`normalize`]; what the pacer renders.
pub fn sanitize_and_normalize(raw: &str) -> String {
    normalize(&sanitize(raw))
}
