//! Resolves a tracking cookie to a HubSpot contact record.
//!
//! There are two interchangeable strategies selected by config: a filtered
//! CRM search and a batch read keyed by the cookie property. Both request only
//! the classification property and return at most one record.

mod batch_read;
mod search;

pub use batch_read::BatchReadDirectory;
pub use search::SearchDirectory;

use crate::config::{HubSpot as HubSpotConfig, Strategy};
use crate::errors::EnterpriseCheckError;
use crate::metrics_defs::UPSTREAM_DURATION;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::histogram;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// HubSpot private app token. Never printed.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    /// Reads the token from `var`. Unset and empty both mean no credential.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(Credential)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContactRecord {
    pub id: String,
    /// `None` if the property was not returned, `Some(Value::Null)` if it is unset.
    pub classification: Option<Value>,
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Looks up the first contact whose cookie property equals `utk`.
    async fn find_contact(
        &self,
        credential: &Credential,
        utk: &str,
    ) -> Result<Option<ContactRecord>, EnterpriseCheckError>;
}

pub fn build_directory(
    config: &HubSpotConfig,
) -> Result<Arc<dyn ContactDirectory>, EnterpriseCheckError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = Upstream {
        client: builder.build()?,
        base_url: config.base_url.trim_end_matches('/').to_string(),
    };

    let directory: Arc<dyn ContactDirectory> = match config.strategy {
        Strategy::Search => Arc::new(SearchDirectory::new(
            client,
            &config.utk_property,
            &config.classification_property,
        )),
        Strategy::BatchRead => Arc::new(BatchReadDirectory::new(
            client,
            &config.utk_property,
            &config.classification_property,
        )),
    };

    tracing::info!(
        strategy = directory.name(),
        base_url = %config.base_url,
        "contact directory configured"
    );
    Ok(directory)
}

/// A contact object as returned by both the search and batch read endpoints.
#[derive(Debug, Deserialize)]
struct ContactObject {
    #[serde(default)]
    id: String,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

impl ContactObject {
    fn into_record(mut self, classification_property: &str) -> ContactRecord {
        ContactRecord {
            classification: self.properties.remove(classification_property),
            id: self.id,
        }
    }
}

/// Both endpoints wrap matches in a `results` array.
#[derive(Debug, Deserialize)]
struct ContactResults {
    #[serde(default)]
    results: Vec<ContactObject>,
}

impl ContactResults {
    fn first_record(self, classification_property: &str) -> Option<ContactRecord> {
        self.results
            .into_iter()
            .next()
            .map(|contact| contact.into_record(classification_property))
    }
}

#[derive(Clone)]
struct Upstream {
    client: reqwest::Client,
    base_url: String,
}

impl Upstream {
    /// POSTs a JSON body and decodes a success response. Non-success statuses
    /// carry the upstream body back as `details`.
    async fn post_json<B, T>(
        &self,
        strategy: &'static str,
        path: &str,
        credential: &Credential,
        body: &B,
    ) -> Result<T, EnterpriseCheckError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.expose())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        histogram!(UPSTREAM_DURATION, "strategy" => strategy, "status" => status.as_str().to_string())
            .record(started.elapsed().as_secs_f64());

        if !status.is_success() {
            let details = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            tracing::warn!(strategy, %status, "HubSpot returned an error");
            return Err(EnterpriseCheckError::UpstreamStatus { status, details });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubSpot;
    use crate::testutils::MockHubSpot;
    use http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("pat-na1-secret");
        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
    }

    #[test]
    fn test_credential_from_env() {
        assert!(Credential::from_env("ENTERPRISE_CHECK_TEST_UNSET_TOKEN").is_none());
    }

    #[test]
    fn test_first_record() {
        let results: ContactResults = serde_json::from_value(json!({
            "total": 2,
            "results": [
                {"id": "101", "properties": {"contact_type": "enterprise", "hs_object_id": "101"}},
                {"id": "102", "properties": {"contact_type": "smb"}}
            ]
        }))
        .unwrap();

        let record = results.first_record("contact_type").unwrap();
        assert_eq!(record.id, "101");
        assert_eq!(record.classification, Some(json!("enterprise")));

        let results: ContactResults =
            serde_json::from_value(json!({"results": [{"id": "7", "properties": {"contact_type": null}}]}))
                .unwrap();
        let record = results.first_record("contact_type").unwrap();
        assert_eq!(record.classification, Some(Value::Null));

        let results: ContactResults =
            serde_json::from_value(json!({"results": [{"id": "7", "properties": {}}]})).unwrap();
        assert_eq!(results.first_record("contact_type").unwrap().classification, None);

        let results: ContactResults = serde_json::from_value(json!({})).unwrap();
        assert!(results.first_record("contact_type").is_none());
    }

    #[tokio::test]
    async fn test_build_directory_selects_strategy() {
        let search = build_directory(&HubSpot::default()).unwrap();
        assert_eq!(search.name(), "search");

        let batch = build_directory(&HubSpot {
            strategy: Strategy::BatchRead,
            timeout_secs: Some(2),
            ..HubSpot::default()
        })
        .unwrap();
        assert_eq!(batch.name(), "batch_read");
    }

    #[tokio::test]
    async fn test_error_details_fall_back_to_text() {
        let mock = MockHubSpot::start(StatusCode::BAD_GATEWAY, "upstream exploded").await;
        let upstream = Upstream {
            client: reqwest::Client::new(),
            base_url: mock.url(),
        };

        let result: Result<Value, _> = upstream
            .post_json("search", "/anything", &Credential::new("token"), &json!({}))
            .await;

        match result {
            Err(EnterpriseCheckError::UpstreamStatus { status, details }) => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(details, json!("upstream exploded"));
            }
            other => panic!("expected upstream status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let mock = MockHubSpot::start(StatusCode::OK, "<html>not json</html>").await;
        let upstream = Upstream {
            client: reqwest::Client::new(),
            base_url: mock.url(),
        };

        let result: Result<ContactResults, _> = upstream
            .post_json("search", "/anything", &Credential::new("token"), &json!({}))
            .await;

        assert!(matches!(result, Err(EnterpriseCheckError::Decode(_))));
    }
}
