//! Bounded-string helpers shared by run failure reasons, station summaries,
//! and runner log excerpts (spec §7/§9: 500 chars for summaries/reasons,
//! 4000 chars for log excerpts).

pub const SUMMARY_LIMIT: usize = 500;
pub const LOG_EXCERPT_LIMIT: usize = 4000;

const TRUNCATION_SUFFIX: &str = "… (truncated)";

/// Truncate `s` to at most `limit` chars, appending a truncation marker when
/// truncation occurred. Operates on `char` boundaries so multi-byte UTF-8
/// text is never split mid-codepoint.
pub fn truncate_with_marker(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }

    let keep = limit.saturating_sub(TRUNCATION_SUFFIX.chars().count());
    let head: String = s.chars().take(keep).collect();
    format!("{head}{TRUNCATION_SUFFIX}")
}

pub fn truncate_summary(s: &str) -> String {
    truncate_with_marker(s, SUMMARY_LIMIT)
}

/// Truncate a log excerpt to [`LOG_EXCERPT_LIMIT`] chars. Returns the
/// (possibly truncated) text plus whether truncation occurred and the
/// original length — both persisted onto the artifact per spec §4.3 step 8.
pub struct LogExcerpt {
    pub text: String,
    pub truncated: bool,
    pub original_length: usize,
}

pub fn excerpt_logs(s: &str) -> LogExcerpt {
    let original_length = s.chars().count();
    if original_length <= LOG_EXCERPT_LIMIT {
        return LogExcerpt {
            text: s.to_string(),
            truncated: false,
            original_length,
        };
    }

    let head: String = s.chars().take(LOG_EXCERPT_LIMIT).collect();
    LogExcerpt {
        text: format!("{head}\n… (truncated, original length {original_length} chars)"),
        truncated: true,
        original_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_untouched() {
        let s = "hello";
        assert_eq!(truncate_with_marker(s, 500), "hello");
    }

    #[test]
    fn long_string_truncated_with_marker() {
        let s = "x".repeat(600);
        let out = truncate_with_marker(&s, 500);
        assert!(out.chars().count() <= 500);
        assert!(out.ends_with("(truncated)"));
    }

    #[test]
    fn exactly_4000_not_truncated() {
        let s = "a".repeat(4000);
        let out = excerpt_logs(&s);
        assert!(!out.truncated);
        assert_eq!(out.text.chars().count(), 4000);
    }

    #[test]
    fn over_4000_truncated_with_original_length() {
        let s = "a".repeat(4001);
        let out = excerpt_logs(&s);
        assert!(out.truncated);
        assert_eq!(out.original_length, 4001);
        assert!(out.text.contains("4001"));
    }
}
