use serde::{Deserialize, Serialize};

/// A consent whose data use limitations the committee reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub use_restriction: Option<String>,
    pub translated_use_restriction: Option<String>,
}

/// A request for access to one or more datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccessRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub dar_code: String,
    pub project_title: String,
    /// Structured restriction derived from the research purpose, if any.
    pub restriction: Option<String>,
    pub translated_restriction: Option<String>,
    #[serde(default)]
    pub datasets: Vec<String>,
}

impl DataAccessRequest {
    /// Requests with a structured restriction get a companion research purpose review.
    pub fn has_structured_restriction(&self) -> bool {
        self.restriction
            .as_deref()
            .map_or(false, |restriction| !restriction.trim().is_empty())
    }

    pub fn requests_dataset(&self, dataset_id: &str) -> bool {
        self.datasets.iter().any(|d| d == dataset_id)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Consent {
        pub fn example() -> Self {
            Self {
                id: "C1".to_string(),
                name: "Cohort consent".to_string(),
                use_restriction: Some("GRU".to_string()),
                translated_use_restriction: Some("General research use".to_string()),
            }
        }
    }

    impl DataAccessRequest {
        pub fn structured_example() -> Self {
            Self {
                id: "D1".to_string(),
                dar_code: "DAR-1".to_string(),
                project_title: "Cancer genomics".to_string(),
                restriction: Some("DS:cancer".to_string()),
                translated_restriction: Some("Disease-specific research: cancer".to_string()),
                datasets: vec!["DS-1".to_string()],
            }
        }

        pub fn unstructured_example() -> Self {
            Self {
                id: "D2".to_string(),
                dar_code: "DAR-2".to_string(),
                project_title: "Population study".to_string(),
                restriction: None,
                translated_restriction: None,
                datasets: vec!["DS-2".to_string()],
            }
        }
    }
}
