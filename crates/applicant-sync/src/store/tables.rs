//! Table and field names of the applicant base.
//!
//! These names are the contract with the backing base; a different backend must
//! expose the same shape.

pub mod applicants {
    pub const TABLE: &str = "Applicants";
    pub const APPLICANT_ID: &str = "Applicant ID";
    pub const COMPRESSED_JSON: &str = "Compressed JSON";
    pub const JSON_HASH: &str = "JSON Hash";
    pub const LLM_SUMMARY: &str = "LLM Summary";
    pub const LLM_SCORE: &str = "LLM Score";
    pub const LLM_ISSUES: &str = "LLM Issues";
    pub const LLM_FOLLOW_UPS: &str = "LLM Follow-Ups";
    pub const SHORTLIST_STATUS: &str = "Shortlist Status";
}

pub mod personal {
    pub const TABLE: &str = "Personal Details";
    pub const APPLICANT_LINK: &str = "Applicant ID";
    pub const FULL_NAME: &str = "Full Name";
    pub const EMAIL: &str = "Email";
    pub const LOCATION: &str = "Location";
    pub const LINKEDIN: &str = "LinkedIn";
}

pub mod work {
    pub const TABLE: &str = "Work Experience";
    pub const APPLICANT_LINK: &str = "Applicant ID";
    pub const COMPANY: &str = "Company";
    pub const TITLE: &str = "Title";
    pub const START_DATE: &str = "Start Date";
    pub const END_DATE: &str = "End Date";
    pub const TECHNOLOGIES: &str = "Technologies Used";
}

pub mod salary {
    pub const TABLE: &str = "Salary Preferences";
    pub const APPLICANT_LINK: &str = "Applicant ID";
    pub const PREFERRED_RATE: &str = "Preferred Rate";
    pub const MINIMUM_RATE: &str = "Minimum Rate";
    pub const CURRENCY: &str = "Currency";
    pub const AVAILABILITY: &str = "Availability (hrs/wk)";
}

pub mod leads {
    pub const TABLE: &str = "Shortlisted Leads";
    pub const APPLICANT_LINK: &str = "Applicant";
    pub const COMPRESSED_JSON: &str = "Compressed JSON";
    pub const SCORE_REASON: &str = "Score Reason";
}
