use serde::Serialize;

use super::config::ShortlistRules;
use crate::workflows::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Experience,
    Compensation,
    Location,
}

impl Criterion {
    pub fn failure_message(self) -> &'static str {
        match self {
            Criterion::Experience => "Experience criteria not met.",
            Criterion::Compensation => "Compensation criteria not met.",
            Criterion::Location => "Location criteria not met.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionResult {
    pub criterion: Criterion,
    pub met: bool,
    pub reasons: Vec<String>,
}

pub(crate) fn experience(snapshot: &Snapshot, rules: &ShortlistRules) -> CriterionResult {
    let mut reasons = Vec::new();

    let tier_one = snapshot.experience.iter().find(|entry| {
        let company = entry.company.to_lowercase();
        rules
            .tier_one_companies
            .iter()
            .any(|tier| company.contains(tier.as_str()))
    });
    if let Some(entry) = tier_one {
        reasons.push(format!("Worked at Tier-1 company: {}", entry.company));
    }

    // Plain year subtraction; a missing end date counts as year 0.
    let total_years: i64 = snapshot
        .experience
        .iter()
        .map(|entry| leading_year(&entry.end) - leading_year(&entry.start))
        .sum();
    if total_years >= rules.minimum_experience_years {
        reasons.push(format!("Total experience of {total_years} years"));
    }

    CriterionResult {
        criterion: Criterion::Experience,
        met: !reasons.is_empty(),
        reasons,
    }
}

pub(crate) fn compensation(snapshot: &Snapshot, rules: &ShortlistRules) -> CriterionResult {
    let mut reasons = Vec::new();

    if let Some(salary) = &snapshot.salary {
        let present = |value: Option<f64>| value.filter(|amount| *amount != 0.0);
        let availability = present(salary.availability())
            .filter(|hours| *hours >= rules.minimum_weekly_hours);
        let within = |rate: Option<f64>| present(rate).filter(|rate| *rate <= rules.maximum_hourly_rate);

        if let Some(hours) = availability {
            if let Some(rate) = within(salary.preferred_rate()) {
                reasons.push(format!(
                    "Preferred rate ${}/hr and availability {} hrs/wk",
                    amount(rate),
                    amount(hours)
                ));
            } else if let Some(rate) = within(salary.min_rate()) {
                reasons.push(format!(
                    "Minimum rate ${}/hr and availability {} hrs/wk",
                    amount(rate),
                    amount(hours)
                ));
            }
        }
    }

    CriterionResult {
        criterion: Criterion::Compensation,
        met: !reasons.is_empty(),
        reasons,
    }
}

pub(crate) fn location(snapshot: &Snapshot, rules: &ShortlistRules) -> CriterionResult {
    let location = snapshot
        .personal
        .as_ref()
        .map(|personal| personal.location.to_lowercase())
        .unwrap_or_default();

    let met = rules
        .allowed_locations
        .iter()
        .any(|region| location.contains(region.as_str()));

    CriterionResult {
        criterion: Criterion::Location,
        met,
        reasons: if met {
            vec![format!("Located in allowed region: {location}")]
        } else {
            Vec::new()
        },
    }
}

/// Leading four-digit year of a date string, or 0.
fn leading_year(date: &str) -> i64 {
    date.trim()
        .get(..4)
        .filter(|year| year.bytes().all(|byte| byte.is_ascii_digit()))
        .and_then(|year| year.parse().ok())
        .unwrap_or(0)
}

fn amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(raw: &str) -> Snapshot {
        Snapshot::parse(raw).expect("parses")
    }

    #[test]
    fn leading_year_reads_four_digits_only() {
        assert_eq!(leading_year("2019-04-01"), 2019);
        assert_eq!(leading_year("2021"), 2021);
        assert_eq!(leading_year("04/2019"), 0);
        assert_eq!(leading_year(""), 0);
        assert_eq!(leading_year("20é9"), 0);
    }

    #[test]
    fn experience_sums_years_across_entries() {
        let rules = ShortlistRules::default();
        let result = experience(
            &snapshot(
                r#"{"experience":[{"company":"Acme","start":"2015","end":"2017"},{"company":"Initech","start":"2018-01-01","end":"2020-06-30"}]}"#,
            ),
            &rules,
        );
        assert!(result.met);
        assert_eq!(result.reasons, vec!["Total experience of 4 years".to_string()]);
    }

    #[test]
    fn tier_one_match_is_case_insensitive_substring() {
        let rules = ShortlistRules::default();
        let result = experience(
            &snapshot(r#"{"experience":[{"company":"Amazon Web Services","start":"2023","end":"2024"}]}"#),
            &rules,
        );
        assert!(result.met);
        assert_eq!(
            result.reasons,
            vec!["Worked at Tier-1 company: Amazon Web Services".to_string()]
        );
    }

    #[test]
    fn compensation_falls_back_to_minimum_rate() {
        let rules = ShortlistRules::default();
        let result = compensation(
            &snapshot(r#"{"salary":{"preferred_rate":150,"min_rate":"90","availability":40}}"#),
            &rules,
        );
        assert!(result.met);
        assert_eq!(
            result.reasons,
            vec!["Minimum rate $90/hr and availability 40 hrs/wk".to_string()]
        );
    }

    #[test]
    fn compensation_requires_availability_and_non_zero_rate() {
        let rules = ShortlistRules::default();
        let low_hours = compensation(
            &snapshot(r#"{"salary":{"preferred_rate":50,"availability":10}}"#),
            &rules,
        );
        assert!(!low_hours.met);
        let zero_rate = compensation(
            &snapshot(r#"{"salary":{"preferred_rate":0,"availability":30}}"#),
            &rules,
        );
        assert!(!zero_rate.met);
        let no_salary = compensation(&snapshot("{}"), &rules);
        assert!(!no_salary.met);
    }

    #[test]
    fn location_matches_region_substrings() {
        let rules = ShortlistRules::default();
        assert!(location(&snapshot(r#"{"personal":{"location":"Austin, US"}}"#), &rules).met);
        assert!(!location(&snapshot(r#"{"personal":{"location":"fr"}}"#), &rules).met);
        assert!(!location(&snapshot("{}"), &rules).met);
    }
}
