use serde::{Deserialize, Serialize};

use crate::model::db::subject::{Consent, DataAccessRequest};

/// An API-friendly consent, used for both requests and responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentDescription {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub use_restriction: Option<String>,
    #[serde(default)]
    pub translated_use_restriction: Option<String>,
}

impl From<Consent> for ConsentDescription {
    fn from(consent: Consent) -> Self {
        Self {
            id: consent.id,
            name: consent.name,
            use_restriction: consent.use_restriction,
            translated_use_restriction: consent.translated_use_restriction,
        }
    }
}

impl From<ConsentDescription> for Consent {
    fn from(consent: ConsentDescription) -> Self {
        Self {
            id: consent.id,
            name: consent.name,
            use_restriction: consent.use_restriction,
            translated_use_restriction: consent.translated_use_restriction,
        }
    }
}

/// An API-friendly data access request, used for both requests and responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DarDescription {
    pub id: String,
    pub dar_code: String,
    pub project_title: String,
    #[serde(default)]
    pub restriction: Option<String>,
    #[serde(default)]
    pub translated_restriction: Option<String>,
    #[serde(default)]
    pub datasets: Vec<String>,
}

impl From<DataAccessRequest> for DarDescription {
    fn from(dar: DataAccessRequest) -> Self {
        Self {
            id: dar.id,
            dar_code: dar.dar_code,
            project_title: dar.project_title,
            restriction: dar.restriction,
            translated_restriction: dar.translated_restriction,
            datasets: dar.datasets,
        }
    }
}

impl From<DarDescription> for DataAccessRequest {
    fn from(dar: DarDescription) -> Self {
        Self {
            id: dar.id,
            dar_code: dar.dar_code,
            project_title: dar.project_title,
            restriction: dar.restriction,
            translated_restriction: dar.translated_restriction,
            datasets: dar.datasets,
        }
    }
}
