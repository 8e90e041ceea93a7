use crate::classification::Classifier;
use crate::config::{Config, Cors};
use crate::directory::{ContactDirectory, Credential, build_directory};
use crate::errors::EnterpriseCheckError;
use crate::metrics_defs::{LOOKUP_OUTCOME, REQUEST_DURATION};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, HeaderMap, HeaderValue,
};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use shared::http::{full_body, make_boxed_error_response};
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Body of every successful lookup response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub found: bool,
    pub is_enterprise: bool,
    /// Raw classification value, exactly as HubSpot returned it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl LookupResult {
    pub fn no_utk() -> Self {
        LookupResult {
            found: false,
            is_enterprise: false,
            contact_type: None,
            reason: Some("no_utk"),
        }
    }

    pub fn not_found() -> Self {
        LookupResult {
            found: false,
            is_enterprise: false,
            contact_type: None,
            reason: None,
        }
    }

    pub fn matched(contact_type: Option<Value>, is_enterprise: bool) -> Self {
        LookupResult {
            found: true,
            is_enterprise,
            contact_type,
            reason: None,
        }
    }

    fn outcome(&self) -> &'static str {
        match (self.found, self.is_enterprise) {
            (true, true) => "enterprise",
            (true, false) => "non_enterprise",
            (false, _) if self.reason.is_some() => "no_utk",
            (false, _) => "not_found",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Clone, Debug)]
struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsHeaders {
    fn try_from_config(cors: &Cors) -> Result<Self, EnterpriseCheckError> {
        let value = |name: &str, raw: &str| {
            HeaderValue::from_str(raw).map_err(|e| {
                EnterpriseCheckError::InvalidConfig(format!("cors.{name} {raw:?}: {e}"))
            })
        };

        Ok(CorsHeaders {
            allow_origin: value("allow_origin", &cors.allow_origin)?,
            allow_methods: value("allow_methods", &cors.allow_methods)?,
            allow_headers: value("allow_headers", &cors.allow_headers)?,
        })
    }

    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }
}

/// Extracts the `utk` query parameter. The first occurrence wins.
pub fn utk_from_query(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "utk")
        .map(|(_, value)| value.into_owned())
}

/// Answers "is this visitor from an enterprise-tier account" for a `hubspotutk`
/// cookie value. Holds no per-request state.
pub struct EnterpriseCheck {
    credential: Option<Credential>,
    credential_env: String,
    directory: Arc<dyn ContactDirectory>,
    classifier: Classifier,
    cors: CorsHeaders,
}

impl EnterpriseCheck {
    pub fn new(
        config: &Config,
        credential: Option<Credential>,
        directory: Arc<dyn ContactDirectory>,
    ) -> Result<Self, EnterpriseCheckError> {
        Ok(EnterpriseCheck {
            credential,
            credential_env: config.hubspot.token_env.clone(),
            directory,
            classifier: Classifier::from_config(&config.classification),
            cors: CorsHeaders::try_from_config(&config.cors)?,
        })
    }

    /// Validates the config, reads the token from the environment and builds
    /// the configured directory strategy.
    pub fn from_config(config: &Config) -> Result<Self, EnterpriseCheckError> {
        config.validate()?;

        let credential = Credential::from_env(&config.hubspot.token_env);
        if credential.is_none() {
            tracing::warn!(
                env = %config.hubspot.token_env,
                "HubSpot token is not set, lookups will fail"
            );
        }

        let directory = build_directory(&config.hubspot)?;
        EnterpriseCheck::new(config, credential, directory)
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub async fn lookup(&self, utk: &str) -> Result<LookupResult, EnterpriseCheckError> {
        let utk = utk.trim();
        if utk.is_empty() {
            return Ok(LookupResult::no_utk());
        }

        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| EnterpriseCheckError::MissingCredential(self.credential_env.clone()))?;

        let result = match self.directory.find_contact(credential, utk).await? {
            None => LookupResult::not_found(),
            Some(record) => {
                let is_enterprise = self.classifier.is_enterprise(record.classification.as_ref());
                tracing::debug!(contact_id = %record.id, is_enterprise, "contact classified");
                LookupResult::matched(record.classification, is_enterprise)
            }
        };
        Ok(result)
    }

    pub async fn handle(&self, method: &Method, query: Option<&str>) -> Response<Bytes> {
        if *method == Method::OPTIONS {
            counter!(LOOKUP_OUTCOME, "outcome" => "preflight").increment(1);
            return self.respond(StatusCode::OK, Bytes::new());
        }

        let started = Instant::now();
        let utk = utk_from_query(query).unwrap_or_default();

        let (outcome, response) = match self.lookup(&utk).await {
            Ok(result) => (result.outcome(), self.json(StatusCode::OK, &result)),
            Err(err) => (err.outcome(), self.error_response(err)),
        };

        histogram!(REQUEST_DURATION, "outcome" => outcome).record(started.elapsed().as_secs_f64());
        counter!(LOOKUP_OUTCOME, "outcome" => outcome).increment(1);
        tracing::debug!(outcome, status = %response.status(), "lookup handled");

        response
    }

    pub fn error_response(&self, err: EnterpriseCheckError) -> Response<Bytes> {
        let (status, body) = match err {
            EnterpriseCheckError::MissingCredential(ref env) => {
                tracing::error!(env = %env, "rejecting lookup, HubSpot token is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: err.to_string(),
                        details: None,
                        message: None,
                    },
                )
            }
            EnterpriseCheckError::UpstreamStatus { status, details } => (
                status,
                ErrorBody {
                    error: "HubSpot API error".into(),
                    details: Some(details),
                    message: None,
                },
            ),
            other => {
                tracing::error!(error = %other, "lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "server_error".into(),
                        details: None,
                        message: Some(other.to_string()),
                    },
                )
            }
        };

        self.json(status, &body)
    }

    pub fn apply_cors(&self, headers: &mut HeaderMap) {
        self.cors.apply(headers);
    }

    fn json<T: Serialize>(&self, status: StatusCode, value: &T) -> Response<Bytes> {
        let (status, bytes) = match serde_json::to_vec(value) {
            Ok(bytes) => (status, Bytes::from(bytes)),
            Err(err) => {
                tracing::error!(error = %err, "could not serialize response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Bytes::from_static(br#"{"error":"server_error"}"#),
                )
            }
        };

        let mut response = self.respond(status, bytes);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn respond(&self, status: StatusCode, body: Bytes) -> Response<Bytes> {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        self.apply_cors(response.headers_mut());
        response
    }
}

/// Serves the lookup on a single path. Each lookup runs in its own task so a
/// panic still produces a `server_error` response.
pub struct EnterpriseCheckService {
    check: Arc<EnterpriseCheck>,
    path: String,
}

impl EnterpriseCheckService {
    pub fn new(check: Arc<EnterpriseCheck>, path: impl Into<String>) -> Self {
        EnterpriseCheckService {
            check,
            path: path.into(),
        }
    }
}

impl Service<Request<Incoming>> for EnterpriseCheckService {
    type Response = Response<BoxBody<Bytes, EnterpriseCheckError>>;
    type Error = EnterpriseCheckError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let check = self.check.clone();

        if req.uri().path() != self.path {
            let mut response = make_boxed_error_response(StatusCode::NOT_FOUND);
            check.apply_cors(response.headers_mut());
            return Box::pin(async move { Ok::<_, EnterpriseCheckError>(response) });
        }

        let method = req.method().clone();
        let query = req.uri().query().map(String::from);

        Box::pin(async move {
            let task_check = check.clone();
            let handled =
                tokio::spawn(async move { task_check.handle(&method, query.as_deref()).await })
                    .await;

            let response = handled.unwrap_or_else(|err| {
                check.error_response(EnterpriseCheckError::Panicked(err.to_string()))
            });
            Ok::<_, EnterpriseCheckError>(response.map(full_body))
        })
    }
}
