use super::{ContactDirectory, ContactRecord, ContactResults, Credential, Upstream};
use crate::errors::EnterpriseCheckError;
use async_trait::async_trait;
use serde::Serialize;

const SEARCH_PATH: &str = "/crm/v3/objects/contacts/search";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    filter_groups: [FilterGroup<'a>; 1],
    properties: [&'a str; 1],
    limit: u32,
}

#[derive(Serialize)]
struct FilterGroup<'a> {
    filters: [Filter<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Filter<'a> {
    property_name: &'a str,
    operator: &'static str,
    value: &'a str,
}

/// Finds the contact with a CRM search filtered on the cookie property.
pub struct SearchDirectory {
    upstream: Upstream,
    utk_property: String,
    classification_property: String,
}

impl SearchDirectory {
    pub(super) fn new(upstream: Upstream, utk_property: &str, classification_property: &str) -> Self {
        SearchDirectory {
            upstream,
            utk_property: utk_property.to_string(),
            classification_property: classification_property.to_string(),
        }
    }

    fn request<'a>(&'a self, utk: &'a str) -> SearchRequest<'a> {
        SearchRequest {
            filter_groups: [FilterGroup {
                filters: [Filter {
                    property_name: self.utk_property.as_str(),
                    operator: "EQ",
                    value: utk,
                }],
            }],
            properties: [self.classification_property.as_str()],
            limit: 1,
        }
    }
}

#[async_trait]
impl ContactDirectory for SearchDirectory {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn find_contact(
        &self,
        credential: &Credential,
        utk: &str,
    ) -> Result<Option<ContactRecord>, EnterpriseCheckError> {
        let results: ContactResults = self
            .upstream
            .post_json(self.name(), SEARCH_PATH, credential, &self.request(utk))
            .await?;

        Ok(results.first_record(&self.classification_property))
    }
}
