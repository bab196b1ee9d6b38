use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonType {
    /// Pessoa física (CPF holder).
    #[serde(rename = "PF")]
    Individual,
    /// Pessoa jurídica (CNPJ holder).
    #[default]
    #[serde(rename = "PJ")]
    Company,
}

/// Client snapshot carried on a quote. Formatting and document validation are
/// handled by the editing surface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    pub name: String,
    #[serde(default)]
    pub person_type: PersonType,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl ClientDetails {
    pub fn new(name: impl Into<String>, person_type: PersonType) -> Self {
        Self { name: name.into(), person_type, ..Self::default() }
    }
}
