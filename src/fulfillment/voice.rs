//! Text shaping for spoken replies.

use crate::config::VoiceConfig;
use regex::{NoExpand, Regex};
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\\(),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+")
        .expect("URL pattern is valid")
});

/// Markdown markers stripped before speaking. Order matters: fences before emphasis.
const MARKUP: [&str; 5] = ["```", "**", "__", "*", "_"];

/// Make model output suitable for text-to-speech.
///
/// Strips markdown markers, swaps URLs for `config.url_replacement`, and cuts
/// replies longer than `config.max_response_chars` at the last word boundary
/// before appending `...`.
pub fn optimize_for_voice(text: &str, config: &VoiceConfig) -> String {
    let mut text = text.to_string();
    for marker in MARKUP {
        text = text.replace(marker, "");
    }

    let text = URL_PATTERN.replace_all(&text, NoExpand(config.url_replacement.as_str()));
    let text = truncate_at_word(&text, config.max_response_chars);

    text.trim().to_string()
}

fn truncate_at_word(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];
    let head = head.rsplit_once(' ').map_or(head, |(before, _)| before);
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VoiceConfig {
        VoiceConfig::default()
    }

    #[test]
    fn strips_markdown_markers() {
        let out = optimize_for_voice("**Bold** and __under__ and *it* _x_ ```code```", &config());
        assert_eq!(out, "Bold and under and it x code");
    }

    #[test]
    fn underscores_inside_words_are_removed() {
        assert_eq!(optimize_for_voice("snake_case", &config()), "snakecase");
    }

    #[test]
    fn replaces_urls() {
        let out = optimize_for_voice("See https://example.com/docs?x=1 for details", &config());
        assert_eq!(
            out,
            "See check the link I sent to your phone for details"
        );
    }

    #[test]
    fn replaces_every_url() {
        let out = optimize_for_voice("a http://a.io b https://b.io", &config());
        assert_eq!(
            out,
            "a check the link I sent to your phone b check the link I sent to your phone"
        );
    }

    #[test]
    fn custom_url_replacement() {
        let cfg = VoiceConfig {
            url_replacement: "see the app".into(),
            ..VoiceConfig::default()
        };
        assert_eq!(optimize_for_voice("go to https://x.dev", &cfg), "go to see the app");
    }

    #[test]
    fn replacement_is_literal() {
        let cfg = VoiceConfig {
            url_replacement: "$1 link".into(),
            ..VoiceConfig::default()
        };
        assert_eq!(optimize_for_voice("at https://x.dev", &cfg), "at $1 link");
    }

    #[test]
    fn short_text_is_only_trimmed() {
        assert_eq!(optimize_for_voice("  hello there \n", &config()), "hello there");
    }

    #[test]
    fn long_text_cut_at_word_boundary() {
        let text = "word ".repeat(200);
        let out = optimize_for_voice(&text, &config());
        assert!(out.ends_with("word..."));
        assert!(out.chars().count() <= 503);
        assert!(!out.contains("  "));
    }

    #[test]
    fn exact_limit_is_not_truncated() {
        let text = "a".repeat(500);
        assert_eq!(optimize_for_voice(&text, &config()), text);
    }

    #[test]
    fn long_text_without_spaces_is_hard_cut() {
        let text = "a".repeat(600);
        let out = optimize_for_voice(&text, &config());
        assert_eq!(out, format!("{}...", "a".repeat(500)));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let text = "é".repeat(10);
        let cfg = VoiceConfig {
            max_response_chars: 4,
            ..VoiceConfig::default()
        };
        assert_eq!(optimize_for_voice(&text, &cfg), "éééé...");
    }
}
