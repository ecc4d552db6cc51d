//! Intent classifier
//!
//! Maps free-form text to a structured [`ParsedIntent`] by running an ordered
//! list of pure matchers and returning the first structural match. The order
//! is load-bearing: an utterance such as "type open chrome" satisfies both the
//! typing and the app-launch matchers and must resolve to typing.
//!
//! Matching is case-insensitive. Payloads whose case can matter (typed text,
//! URLs, file paths) are captured from the caller's text; names and queries
//! are captured from the normalized, lowercased text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::intent::{BrowserAction, FileAction, Intent, ParsedIntent, SystemAction};

/// Quote pairs tried in order when extracting quoted content
const QUOTE_PAIRS: &[(char, char)] = &[('"', '"'), ('\'', '\''), ('«', '»')];

/// Trailing tokens dropped from captured application names
const POLITENESS_SUFFIXES: &[&str] = &["please", "now", "for me"];

static QUOTE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#""([^"]+)""#).expect("valid double quote regex"),
        Regex::new(r"'([^']+)'").expect("valid single quote regex"),
        Regex::new(r"«([^»]+)»").expect("valid guillemet regex"),
    ]
});

static TYPING_VERB_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?:type|write|enter|input)\s+(.+)$").expect("valid typing regex")
});

static APP_LAUNCH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:open|launch|start|run)\s+(.+)$").expect("valid app launch regex")
});

/// Checked before the Google patterns, whose bare `search X` would take it
static SEARCH_YOUTUBE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^search\s+(?:on\s+)?youtube\s+(?:for\s+)?(.+)$")
        .expect("valid youtube search regex")
});

static GOOGLE_SEARCH_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?s)^search\s+(?:google\s+)?for\s+(.+)$").expect("valid search-for regex"),
        Regex::new(r"(?s)^google\s+(.+)$").expect("valid google regex"),
        Regex::new(r"(?s)^search\s+(.+)$").expect("valid search regex"),
        Regex::new(r"(?s)^look\s+up\s+(.+)$").expect("valid look-up regex"),
    ]
});

static YOUTUBE_SEARCH_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?s)^(?:open\s+)?youtube\s+(?:for\s+)?(.+)$").expect("valid youtube regex"),
        Regex::new(r"(?s)^play\s+(.+)\s+on\s+youtube$").expect("valid youtube play regex"),
    ]
});

static URL_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)^(?:open\s+|go\s+to\s+)(https?://\S+)").expect("valid url regex"),
        Regex::new(r"(?i)^(?:open\s+|go\s+to\s+)(www\.\S+)").expect("valid www regex"),
    ]
});

static COPY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^copy\s+(?:(?:files?|folder|directory)\s+)?(?:from\s+)?(.+?)\s+(?:to|into)\s+(.+)$",
    )
    .expect("valid copy regex")
});

static MOVE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^move\s+(?:(?:files?|folder|directory)\s+)?(?:from\s+)?(.+?)\s+(?:to|into)\s+(.+)$",
    )
    .expect("valid move regex")
});

static DELETE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?:delete|remove)\s+(?:(?:file|folder)\s+)?(?:(?:at|in)\s+)?(.+)$")
        .expect("valid delete regex")
});

/// Keyword checks for system control, evaluated in order
static SYSTEM_KEYWORDS: Lazy<Vec<(Regex, SystemAction)>> = Lazy::new(|| {
    [
        (r"volume\s+up|increase\s+volume|louder", SystemAction::VolumeUp),
        (r"volume\s+down|decrease\s+volume|quieter", SystemAction::VolumeDown),
        (r"\b(?:mute|silence)\b", SystemAction::Mute),
        (r"\bunmute\b", SystemAction::Unmute),
        (r"screenshot|screen\s+shot|take\s+a?\s*picture", SystemAction::Screenshot),
        (r"shut\s*down|turn\s+off|power\s+off", SystemAction::Shutdown),
        (r"restart|reboot", SystemAction::Restart),
    ]
    .into_iter()
    .map(|(pattern, action)| {
        (
            Regex::new(pattern).expect("valid system keyword regex"),
            action,
        )
    })
    .collect()
});

/// Normalize text for matching: lowercase, trim, strip trailing `.`, `!`, `?`
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_string()
}

/// Extract the first quoted span, trying double quotes, single quotes and
/// guillemets in that order
pub fn extract_quoted_text(text: &str) -> Option<String> {
    QUOTE_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// One utterance in the forms the matchers need
struct Utterance<'a> {
    original: &'a str,
    /// Trimmed, trailing punctuation removed, case preserved
    trimmed: String,
    /// Lowercased form of `trimmed`
    normalized: String,
}

impl<'a> Utterance<'a> {
    fn new(original: &'a str) -> Self {
        let trimmed = original.trim().trim_end_matches(['.', '!', '?']).to_string();
        Self {
            original,
            trimmed,
            normalized: normalize_text(original),
        }
    }
}

type Matcher = fn(&Utterance<'_>) -> Option<Intent>;

/// Matchers in priority order; the first `Some` wins
const MATCHERS: &[(&str, Matcher)] = &[
    ("typing", match_typing),
    ("app_launch", match_app_launch),
    ("browser", match_browser),
    ("file", match_file),
    ("system", match_system),
];

/// Stateless, thread-safe intent classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify text into a structured intent. Never fails: unmatched text is
    /// chat, blank text is unknown.
    pub fn classify(&self, text: &str) -> ParsedIntent {
        if text.trim().is_empty() {
            return ParsedIntent::new(Intent::Unknown, text);
        }

        let utterance = Utterance::new(text);

        for (rule, matcher) in MATCHERS {
            if let Some(intent) = matcher(&utterance) {
                tracing::debug!(rule = *rule, kind = %intent.kind(), "Intent matched");
                return ParsedIntent::new(intent, text);
            }
        }

        tracing::debug!("No structural match, falling back to chat");
        ParsedIntent::new(
            Intent::Chat {
                message: utterance.original.to_string(),
            },
            text,
        )
    }
}

fn match_typing(utterance: &Utterance<'_>) -> Option<Intent> {
    let normalized = &utterance.normalized;

    if normalized.contains("type this") || normalized.contains("type the following") {
        if let Some((_, rest)) = utterance.trimmed.split_once(':') {
            if let Some(text) = typed_content(rest) {
                return Some(Intent::Typing { text });
            }
        }
    }

    let caps = TYPING_VERB_REGEX.captures(&utterance.trimmed)?;
    let text = typed_content(caps.get(1)?.as_str())?;
    Some(Intent::Typing { text })
}

/// Unquote typed content when it opens with a quote, otherwise keep it verbatim
fn typed_content(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let opens_quoted = QUOTE_PAIRS.iter().any(|(open, _)| raw.starts_with(*open));

    let text = if opens_quoted {
        extract_quoted_text(raw).unwrap_or_else(|| strip_quotes(raw).to_string())
    } else {
        raw.to_string()
    };

    (!text.trim().is_empty()).then_some(text)
}

fn match_app_launch(utterance: &Utterance<'_>) -> Option<Intent> {
    let caps = APP_LAUNCH_REGEX.captures(&utterance.normalized)?;
    let mut name = caps.get(1)?.as_str().trim();

    // "open www.example.com" is a browser request, not an application
    if looks_like_url(name) {
        return None;
    }

    loop {
        let current = name;
        let stripped = POLITENESS_SUFFIXES.iter().find_map(move |suffix| {
            current
                .strip_suffix(*suffix)
                .filter(|rest| rest.ends_with(char::is_whitespace))
        });
        match stripped {
            Some(rest) => name = rest.trim_end(),
            None => break,
        }
    }

    if name.is_empty() {
        return None;
    }

    Some(Intent::AppLaunch {
        app_name: name.to_string(),
    })
}

fn looks_like_url(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

fn match_browser(utterance: &Utterance<'_>) -> Option<Intent> {
    let normalized = &utterance.normalized;

    if let Some(caps) = SEARCH_YOUTUBE_REGEX.captures(normalized) {
        return Some(Intent::Browser(BrowserAction::YoutubeSearch {
            query: caps.get(1)?.as_str().trim().to_string(),
        }));
    }

    for re in GOOGLE_SEARCH_REGEXES.iter() {
        if let Some(caps) = re.captures(normalized) {
            return Some(Intent::Browser(BrowserAction::GoogleSearch {
                query: caps.get(1)?.as_str().trim().to_string(),
            }));
        }
    }

    for re in YOUTUBE_SEARCH_REGEXES.iter() {
        if let Some(caps) = re.captures(normalized) {
            return Some(Intent::Browser(BrowserAction::YoutubeSearch {
                query: caps.get(1)?.as_str().trim().to_string(),
            }));
        }
    }

    for re in URL_REGEXES.iter() {
        if let Some(caps) = re.captures(&utterance.trimmed) {
            let url = caps.get(1)?.as_str();
            let url = if url.to_lowercase().starts_with("http") {
                url.to_string()
            } else {
                format!("https://{}", url)
            };
            return Some(Intent::Browser(BrowserAction::OpenUrl { url }));
        }
    }

    None
}

fn match_file(utterance: &Utterance<'_>) -> Option<Intent> {
    let text = &utterance.trimmed;

    if let Some(caps) = COPY_REGEX.captures(text) {
        return Some(Intent::File(FileAction::Copy {
            source: strip_quotes(caps.get(1)?.as_str()).to_string(),
            destination: strip_quotes(caps.get(2)?.as_str()).to_string(),
        }));
    }

    if let Some(caps) = MOVE_REGEX.captures(text) {
        return Some(Intent::File(FileAction::Move {
            source: strip_quotes(caps.get(1)?.as_str()).to_string(),
            destination: strip_quotes(caps.get(2)?.as_str()).to_string(),
        }));
    }

    if let Some(caps) = DELETE_REGEX.captures(text) {
        return Some(Intent::File(FileAction::Delete {
            path: strip_quotes(caps.get(1)?.as_str()).to_string(),
        }));
    }

    None
}

fn strip_quotes(segment: &str) -> &str {
    segment.trim().trim_matches(|c| c == '"' || c == '\'')
}

fn match_system(utterance: &Utterance<'_>) -> Option<Intent> {
    SYSTEM_KEYWORDS
        .iter()
        .find(|(re, _)| re.is_match(&utterance.normalized))
        .map(|(_, action)| Intent::System { action: *action })
}
