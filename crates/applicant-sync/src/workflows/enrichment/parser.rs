use serde::Serialize;

/// Fields extracted from a model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub summary: String,
    pub score: Option<i64>,
    pub issues: String,
    pub follow_ups: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    None,
    InFollowUps,
}

/// Parse the labelled response line by line.
///
/// Prefixes are case-sensitive. Once `Follow-Ups:` is seen, every unlabelled
/// line is appended to the follow-ups text until another label appears.
pub fn parse_response(text: &str) -> Enrichment {
    let mut enrichment = Enrichment::default();
    let mut state = ParseState::None;

    for line in text.split('\n') {
        if let Some(rest) = line.strip_prefix("Summary:") {
            enrichment.summary = rest.trim().to_string();
            state = ParseState::None;
        } else if let Some(rest) = line.strip_prefix("Score:") {
            enrichment.score = rest.trim().parse::<i64>().ok();
            state = ParseState::None;
        } else if let Some(rest) = line.strip_prefix("Issues:") {
            enrichment.issues = rest.trim().to_string();
            state = ParseState::None;
        } else if let Some(rest) = line.strip_prefix("Follow-Ups:") {
            enrichment.follow_ups = rest.trim().to_string();
            state = ParseState::InFollowUps;
        } else if state == ParseState::InFollowUps {
            enrichment.follow_ups.push('\n');
            enrichment.follow_ups.push_str(line.trim());
        }
    }

    enrichment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections_with_multiline_follow_ups() {
        let parsed = parse_response(
            "Summary: Strong backend engineer.\nScore: 8\nIssues: None\nFollow-Ups:\n  - Notice period?\n  - Visa status?",
        );
        assert_eq!(parsed.summary, "Strong backend engineer.");
        assert_eq!(parsed.score, Some(8));
        assert_eq!(parsed.issues, "None");
        assert_eq!(parsed.follow_ups, "\n- Notice period?\n- Visa status?");
    }

    #[test]
    fn non_integer_score_is_absent() {
        let parsed = parse_response("Summary: ok\nScore: 8/10\nIssues: gaps");
        assert_eq!(parsed.score, None);
        assert_eq!(parsed.issues, "gaps");
    }

    #[test]
    fn prefixes_are_case_sensitive() {
        let parsed = parse_response("summary: lower\nSCORE: 3\nSummary: upper");
        assert_eq!(parsed.summary, "upper");
        assert_eq!(parsed.score, None);
    }

    #[test]
    fn lines_before_follow_ups_are_ignored() {
        let parsed = parse_response("Here you go:\nSummary: short\nstray line\nScore: 5\r");
        assert_eq!(parsed.summary, "short");
        assert_eq!(parsed.score, Some(5));
        assert_eq!(parsed.follow_ups, "");
    }
}
