use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_BRAND_COLOR: &str = "#2563eb";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyKind {
    #[serde(rename = "pessoa_fisica")]
    Individual,
    #[default]
    #[serde(rename = "pessoa_juridica")]
    Company,
}

/// Issuer of a quote, snapshotted onto every quote it emits.
///
/// Keys follow the stored company profile (`razao_social`, `nome_fantasia`,
/// `cnpj`, ...). Keys this type does not model, such as `id` or `owner_id`,
/// are kept in `extra` so a profile read from a record is written back intact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default, rename = "razao_social")]
    pub legal_name: String,
    #[serde(default, rename = "nome_fantasia")]
    pub trade_name: String,
    /// CPF or CNPJ, already formatted.
    #[serde(default, rename = "cnpj")]
    pub document: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "telefone")]
    pub phone: String,
    #[serde(default, rename = "endereco", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_color: Option<String>,
    #[serde(default, rename = "tipo_empresa")]
    pub kind: CompanyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, rename = "showSignature", skip_serializing_if = "Option::is_none")]
    pub show_signature: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompanyProfile {
    pub fn new(legal_name: impl Into<String>, kind: CompanyKind) -> Self {
        Self { legal_name: legal_name.into(), kind, ..Self::default() }
    }

    /// Name shown on quotes: the trade name when set, else the legal name.
    /// Older records only carry a bare `name` key, which is used last.
    pub fn display_name(&self) -> &str {
        [self.trade_name.as_str(), self.legal_name.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|name| !name.is_empty())
            .or_else(|| self.extra.get("name").and_then(Value::as_str).map(str::trim))
            .unwrap_or_default()
    }

    pub fn brand_color(&self) -> &str {
        self.brand_color
            .as_deref()
            .map(str::trim)
            .filter(|color| !color.is_empty())
            .unwrap_or(DEFAULT_BRAND_COLOR)
    }

    /// Signature block on rendered quotes is on unless switched off.
    pub fn shows_signature(&self) -> bool {
        self.show_signature.unwrap_or(true)
    }
}
