use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Path must start with '/': {0}")]
    InvalidPath(String),

    #[error("Invalid HubSpot base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Classification delimiter cannot be empty")]
    EmptyDelimiter,

    #[error("At least one enterprise label is required")]
    NoEnterpriseLabels,

    #[error("Empty enterprise label")]
    EmptyEnterpriseLabel,

    #[error("Empty property name: {0}")]
    EmptyProperty(&'static str),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }

    fn admin() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3001,
        }
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Cors {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl Default for Cors {
    fn default() -> Self {
        Cors {
            allow_origin: "https://studio.design".into(),
            allow_methods: "GET,OPTIONS".into(),
            allow_headers: "Content-Type".into(),
        }
    }
}

/// Which HubSpot endpoint resolves a tracking cookie to a contact.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// `POST /crm/v3/objects/contacts/search` with an EQ filter on the cookie property.
    #[default]
    Search,
    /// `POST /crm/v3/objects/contacts/batch/read` keyed by the cookie property.
    BatchRead,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HubSpot {
    pub base_url: String,
    /// Environment variable holding the private app token.
    pub token_env: String,
    pub strategy: Strategy,
    /// Contact property that stores the `hubspotutk` cookie value.
    pub utk_property: String,
    pub classification_property: String,
    /// No timeout is applied to upstream calls unless set.
    pub timeout_secs: Option<u64>,
}

impl Default for HubSpot {
    fn default() -> Self {
        HubSpot {
            base_url: "https://api.hubapi.com".into(),
            token_env: "HUBSPOT_TOKEN".into(),
            strategy: Strategy::default(),
            utk_property: "hs_analytics_cookie".into(),
            classification_property: "contact_type".into(),
            timeout_secs: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Classification {
    pub delimiter: String,
    /// Exact, case-sensitive labels that mark a contact as enterprise tier.
    pub enterprise_labels: Vec<String>,
}

impl Default for Classification {
    fn default() -> Self {
        Classification {
            delimiter: ";".into(),
            enterprise_labels: vec!["enterprise".into(), "general business".into()],
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default = "Listener::admin")]
    pub admin_listener: Listener,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub cors: Cors,
    #[serde(default)]
    pub hubspot: HubSpot,
    #[serde(default)]
    pub classification: Classification,
}

fn default_path() -> String {
    "/enterprise-check".into()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default(),
            admin_listener: Listener::admin(),
            path: default_path(),
            cors: Cors::default(),
            hubspot: HubSpot::default(),
            classification: Classification::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if !self.path.starts_with('/') {
            return Err(ValidationError::InvalidPath(self.path.clone()));
        }

        Url::parse(&self.hubspot.base_url)
            .map_err(|e| ValidationError::InvalidBaseUrl(format!("{}: {e}", self.hubspot.base_url)))?;

        if self.hubspot.utk_property.is_empty() {
            return Err(ValidationError::EmptyProperty("utk_property"));
        }
        if self.hubspot.classification_property.is_empty() {
            return Err(ValidationError::EmptyProperty("classification_property"));
        }

        if self.classification.delimiter.is_empty() {
            return Err(ValidationError::EmptyDelimiter);
        }
        if self.classification.enterprise_labels.is_empty() {
            return Err(ValidationError::NoEnterpriseLabels);
        }
        if self
            .classification
            .enterprise_labels
            .iter()
            .any(|label| label.trim().is_empty())
        {
            return Err(ValidationError::EmptyEnterpriseLabel);
        }

        Ok(())
    }
}
