use super::{ContactDirectory, ContactRecord, ContactResults, Credential, Upstream};
use crate::errors::EnterpriseCheckError;
use async_trait::async_trait;
use serde::Serialize;

const BATCH_READ_PATH: &str = "/crm/v3/objects/contacts/batch/read";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchReadRequest<'a> {
    id_property: &'a str,
    inputs: [BatchInput<'a>; 1],
    properties: [&'a str; 1],
}

#[derive(Serialize)]
struct BatchInput<'a> {
    id: &'a str,
}

/// Reads the contact directly, using the cookie property as the record key.
///
/// HubSpot answers 207 Multi-Status with an empty `results` list when the id is
/// unknown, which is reported as no match rather than an error.
pub struct BatchReadDirectory {
    upstream: Upstream,
    utk_property: String,
    classification_property: String,
}

impl BatchReadDirectory {
    pub(super) fn new(upstream: Upstream, utk_property: &str, classification_property: &str) -> Self {
        BatchReadDirectory {
            upstream,
            utk_property: utk_property.to_string(),
            classification_property: classification_property.to_string(),
        }
    }
}

#[async_trait]
impl ContactDirectory for BatchReadDirectory {
    fn name(&self) -> &'static str {
        "batch_read"
    }

    async fn find_contact(
        &self,
        credential: &Credential,
        utk: &str,
    ) -> Result<Option<ContactRecord>, EnterpriseCheckError> {
        let request = BatchReadRequest {
            id_property: self.utk_property.as_str(),
            inputs: [BatchInput { id: utk }],
            properties: [self.classification_property.as_str()],
        };

        let results: ContactResults = self
            .upstream
            .post_json(self.name(), BATCH_READ_PATH, credential, &request)
            .await?;

        Ok(results.first_record(&self.classification_property))
    }
}
