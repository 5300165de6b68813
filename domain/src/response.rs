use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::{Citation, ParsedAnswer};

/// Substituted when the reply cannot be processed at all. Parsing itself
/// never fails outward; the model's formatting is untrusted by design.
pub const FALLBACK_ANSWER: &str = "Error parsing the response from the language model.";

/// Label used when a source line carries a URL but no recognizable label.
pub const DEFAULT_CITATION_LABEL: &str = "Source reference";

// Checked in order; the first exact (case-sensitive) substring match
// splits the reply into answer and sources regions.
const SOURCE_HEADINGS: [&str; 4] = ["Sources:", "Source:", "References:", "Reference:"];

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.|-)\s*").expect("ordinal pattern"));

// URL alternatives, most explicit first: `url: [..]`, `[http..]`,
// `url: http..`, bare `http..`. Bare tokens stop before `)` and `]` so
// markdown-style wrapping does not leak into the URL.
static URL_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)url:\s*\[([^\]]+)\]|\[(http[^\]]+)\]|url:\s*(http[^\s)\]]+)|(http[^\s)\]]+)")
        .expect("url pattern")
});

// Label alternatives: `text: [..]`, `text: "..."`, then any quoted run
// (straight or curly quotes).
static LABEL_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("(?i)text:\\s*\\[([^\\]]*)\\]|text:\\s*\"([^\"]*)\"|\"([^\"]*)\"|\u{201C}([^\u{201D}]*)\u{201D}")
        .expect("label pattern")
});

/// Parse a model reply into a trimmed answer and its cited links.
///
/// Total function: lines that do not yield a URL starting with `http` are
/// silently skipped, and any internal inconsistency degrades to a fixed
/// fallback answer with no citations.
pub fn parse(raw: &str) -> ParsedAnswer {
    extract(raw).unwrap_or_else(|| ParsedAnswer {
        answer: FALLBACK_ANSWER.to_string(),
        links: Vec::new(),
    })
}

fn extract(raw: &str) -> Option<ParsedAnswer> {
    let (answer, sources) = split_regions(raw)?;
    let mut links = Vec::new();
    if let Some(sources) = sources {
        for line in sources.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let line = ORDINAL.replace(line, "");
            if let Some(citation) = extract_citation(line.as_ref()) {
                links.push(citation);
            }
        }
    }
    Some(ParsedAnswer {
        answer: answer.trim().to_string(),
        links,
    })
}

fn split_regions(raw: &str) -> Option<(&str, Option<&str>)> {
    for heading in SOURCE_HEADINGS {
        if let Some(pos) = raw.find(heading) {
            let answer = raw.get(..pos)?;
            let sources = raw.get(pos + heading.len()..)?;
            return Some((answer, Some(sources)));
        }
    }
    Some((raw, None))
}

fn extract_citation(line: &str) -> Option<Citation> {
    let url = URL_PATTERNS
        .captures(line)
        .and_then(|caps| first_group(&caps))
        .map(str::trim)?;
    if !url.starts_with("http") {
        return None;
    }
    let text = LABEL_PATTERNS
        .captures(line)
        .and_then(|caps| first_group(&caps).map(str::trim))
        .filter(|label| !label.is_empty())
        .unwrap_or(DEFAULT_CITATION_LABEL);
    Some(Citation {
        url: url.to_string(),
        text: text.to_string(),
    })
}

fn first_group<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.iter().skip(1).flatten().next().map(|m| m.as_str())
}
