/// Analyst prompt for one applicant. The snapshot text is embedded verbatim.
pub fn build_prompt(snapshot_json: &str) -> String {
    format!(
        "You are a recruiting analyst. Given this JSON applicant profile, do four things:\n\
         1. Provide a concise 75-word summary.\n\
         2. Rate overall candidate quality from 1-10 (higher is better).\n\
         3. List any data gaps or inconsistencies you notice.\n\
         4. Suggest up to three follow-up questions to clarify gaps.\n\
         \n\
         Return exactly:\n\
         Summary: <text>\n\
         Score: <integer>\n\
         Issues: <comma-separated list or 'None'>\n\
         Follow-Ups: <bullet list>\n\
         \n\
         Applicant JSON: {snapshot_json}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_requests_labelled_sections_and_embeds_snapshot() {
        let prompt = build_prompt(r#"{"personal":{"name":"Ada"}}"#);
        for label in ["Summary:", "Score:", "Issues:", "Follow-Ups:"] {
            assert!(prompt.contains(label), "missing {label}");
        }
        assert!(prompt.ends_with("Applicant JSON: {\"personal\":{\"name\":\"Ada\"}}\n"));
        assert!(prompt.starts_with("You are a recruiting analyst."));
    }
}
