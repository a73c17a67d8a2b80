use serde::{Deserialize, Serialize};

/// Thresholds and lists the shortlist criteria are checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistRules {
    /// Lowercase company name fragments matched as substrings.
    pub tier_one_companies: Vec<String>,
    pub minimum_experience_years: i64,
    pub maximum_hourly_rate: f64,
    pub minimum_weekly_hours: f64,
    /// Lowercase region codes matched as substrings of the location.
    pub allowed_locations: Vec<String>,
}

impl Default for ShortlistRules {
    fn default() -> Self {
        Self {
            tier_one_companies: [
                "google",
                "meta",
                "openai",
                "amazon",
                "apple",
                "microsoft",
                "netflix",
            ]
            .map(String::from)
            .to_vec(),
            minimum_experience_years: 4,
            maximum_hourly_rate: 100.0,
            minimum_weekly_hours: 20.0,
            allowed_locations: ["us", "ca", "uk", "de", "in"].map(String::from).to_vec(),
        }
    }
}
