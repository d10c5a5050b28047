use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_PLACEHOLDER: &str = "[TIMESTAMP]";
pub const NUMBER_PLACEHOLDER: &str = "#";

const RICH_TEXT_TAGS: &[&str] = &[
    "b", "i", "u", "s", "em", "strong", "font", "color", "span", "ruby", "rt", "rp",
];

static RICH_TEXT_PAIRS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    RICH_TEXT_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}(?:\s[^>]*)?>(.*?)</{tag}\s*>"))
                .expect("rich text tag pattern")
        })
        .collect()
});
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("tag pattern"));
static ASS_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\\[1-4]?c&H[0-9a-f]+&?\}").expect("ass color pattern")
});
static FONT_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<font\s+color\s*=\s*["']?[^"'>]*["']?\s*>|</font\s*>"#)
        .expect("font color pattern")
});
static ASS_OVERRIDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\\[^{}]*\}").expect("ass override pattern"));
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>]+").expect("url pattern")
});
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{1,2}:\d{2}:\d{2}(?:[,.]\d{1,3})?(?:\s*-->\s*\d{1,2}:\d{2}:\d{2}(?:[,.]\d{1,3})?)?",
    )
    .expect("timestamp pattern")
});
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern"));
static MUSIC_NOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[♩♪♫♬]").expect("music note pattern"));
static REPEATED_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!{2,}|\?{2,}|\.{2,}|,{2,}|;{2,}|:{2,}").expect("punctuation pattern"));
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{Extended_Pictographic}\x{FE0F}\x{200D}\x{1F3FB}-\x{1F3FF}]")
        .expect("emoji pattern")
});
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\[\]\n]*\]|\([^()\n]*\)").expect("bracket pattern"));

/// Independent toggles, each removing or replacing one category of
/// formatting noise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripOptions {
    pub html: bool,
    pub colors: bool,
    pub styles: bool,
    pub urls: bool,
    pub timestamps: bool,
    pub numbers: bool,
    pub punctuation: bool,
    pub emojis: bool,
    pub brackets: bool,
}

impl StripOptions {
    pub fn all() -> Self {
        Self {
            html: true,
            colors: true,
            styles: true,
            urls: true,
            timestamps: true,
            numbers: true,
            punctuation: true,
            emojis: true,
            brackets: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

type Pass = fn(&str) -> String;

/// Applies every enabled pass in a fixed order, then repeats the round until
/// nothing changes, so the result is a fixed point of the enabled passes.
/// Timestamps are replaced before the numbers pass sees their digits.
///
/// A later pass can expose a match for an earlier one (removing `😀` from
/// `!😀!` leaves `!!`), which the next round resolves. Every changing round
/// either removes digits or shortens the text, so the loop terminates.
pub fn strip_formatting(text: &str, options: &StripOptions) -> String {
    let passes: [(bool, Pass); 9] = [
        (options.html, strip_html),
        (options.colors, strip_colors),
        (options.styles, strip_styles),
        (options.urls, strip_urls),
        (options.timestamps, replace_timestamps),
        (options.numbers, replace_numbers),
        (options.punctuation, strip_punctuation),
        (options.emojis, strip_emojis),
        (options.brackets, strip_brackets),
    ];
    let enabled: Vec<Pass> = passes
        .into_iter()
        .filter_map(|(enabled, pass)| enabled.then_some(pass))
        .collect();
    if enabled.is_empty() {
        return text.to_string();
    }

    until_stable(text.to_string(), |current| {
        enabled
            .iter()
            .fold(current.to_string(), |acc, pass| pass(&acc))
    })
}

fn strip_html(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut changed = false;
        for pattern in RICH_TEXT_PAIRS.iter() {
            let unwrapped = pattern.replace_all(&current, "$1").into_owned();
            if unwrapped != current {
                current = unwrapped;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    until_stable(current, |text| ANY_TAG.replace_all(text, "").into_owned())
}

fn strip_colors(text: &str) -> String {
    let without_ass = ASS_COLOR.replace_all(text, "");
    FONT_COLOR.replace_all(&without_ass, "").into_owned()
}

fn strip_styles(text: &str) -> String {
    ASS_OVERRIDE.replace_all(text, "").into_owned()
}

fn strip_urls(text: &str) -> String {
    URL.replace_all(text, "").into_owned()
}

fn replace_timestamps(text: &str) -> String {
    TIMESTAMP
        .replace_all(text, TIMESTAMP_PLACEHOLDER)
        .into_owned()
}

fn replace_numbers(text: &str) -> String {
    DIGITS.replace_all(text, NUMBER_PLACEHOLDER).into_owned()
}

fn strip_punctuation(text: &str) -> String {
    let without_notes = MUSIC_NOTES.replace_all(text, "");
    REPEATED_PUNCTUATION
        .replace_all(&without_notes, |caps: &Captures<'_>| caps[0][..1].to_string())
        .into_owned()
}

fn strip_emojis(text: &str) -> String {
    EMOJI.replace_all(text, "").into_owned()
}

fn strip_brackets(text: &str) -> String {
    until_stable(text.to_string(), |text| {
        BRACKETED
            .replace_all(text, |caps: &Captures<'_>| {
                if &caps[0] == TIMESTAMP_PLACEHOLDER {
                    TIMESTAMP_PLACEHOLDER.to_string()
                } else {
                    String::new()
                }
            })
            .into_owned()
    })
}

// Removing an inner match can expose an outer one (`[[x]]`, `<<b>>`), and
// one pass can expose another's match.
fn until_stable(mut text: String, pass: impl Fn(&str) -> String) -> String {
    loop {
        let next = pass(&text);
        if next == text {
            return text;
        }
        text = next;
    }
}
