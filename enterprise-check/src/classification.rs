//! Decides whether a contact's classification value marks it as enterprise tier.
//!
//! HubSpot multi-select properties come back as a single `;`-joined string, but
//! callers may also see a JSON list or a bare scalar. All of them are reduced to a
//! flat list of trimmed, non-empty tokens before matching.

use crate::config::Classification as ClassificationConfig;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Clone, Debug)]
pub struct Classifier {
    delimiter: String,
    labels: HashSet<String>,
}

impl Classifier {
    pub fn new<D, I, L>(delimiter: D, labels: I) -> Self
    where
        D: Into<String>,
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Classifier {
            delimiter: delimiter.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &ClassificationConfig) -> Self {
        Classifier::new(
            config.delimiter.as_str(),
            config.enterprise_labels.iter().map(String::as_str),
        )
    }

    pub fn tokens(&self, value: &Value) -> Vec<String> {
        let mut tokens = Vec::new();
        self.collect_tokens(value, &mut tokens);
        tokens
    }

    fn collect_tokens(&self, value: &Value, tokens: &mut Vec<String>) {
        match value {
            Value::String(s) => self.split_into(s, tokens),
            Value::Number(n) => self.split_into(&n.to_string(), tokens),
            Value::Bool(b) => self.split_into(&b.to_string(), tokens),
            Value::Array(items) => {
                for item in items {
                    self.collect_tokens(item, tokens);
                }
            }
            Value::Null | Value::Object(_) => {}
        }
    }

    fn split_into(&self, s: &str, tokens: &mut Vec<String>) {
        tokens.extend(
            s.split(self.delimiter.as_str())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
        );
    }

    pub fn is_enterprise(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        self.tokens(value)
            .iter()
            .any(|token| self.labels.contains(token))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Classifier::from_config(&ClassificationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokens() {
        let classifier = Classifier::default();

        assert_eq!(
            classifier.tokens(&json!(" smb ;; general business ;")),
            vec!["smb", "general business"]
        );
        assert_eq!(
            classifier.tokens(&json!(["enterprise", " smb;partner ", ""])),
            vec!["enterprise", "smb", "partner"]
        );
        assert_eq!(classifier.tokens(&json!(42)), vec!["42"]);
        assert!(classifier.tokens(&json!("")).is_empty());
        assert!(classifier.tokens(&json!("  ;  ")).is_empty());
        assert!(classifier.tokens(&Value::Null).is_empty());
        assert!(classifier.tokens(&json!({"label": "enterprise"})).is_empty());
    }

    #[test]
    fn test_default_labels() {
        let classifier = Classifier::default();

        assert!(classifier.is_enterprise(Some(&json!("enterprise"))));
        assert!(classifier.is_enterprise(Some(&json!("smb;general business"))));
        assert!(classifier.is_enterprise(Some(&json!(["smb", "enterprise"]))));
        assert!(classifier.is_enterprise(Some(&json!(" enterprise "))));

        assert!(!classifier.is_enterprise(Some(&json!("smb"))));
        assert!(!classifier.is_enterprise(Some(&json!("Enterprise"))));
        assert!(!classifier.is_enterprise(Some(&json!("enterprise plus"))));
        assert!(!classifier.is_enterprise(Some(&json!(""))));
        assert!(!classifier.is_enterprise(Some(&Value::Null)));
        assert!(!classifier.is_enterprise(None));
    }

    #[test]
    fn test_localized_labels() {
        let classifier = Classifier::new(
            ";",
            ["enterprise", "general business", "エンタープライズ", "一般企業"],
        );

        assert!(classifier.is_enterprise(Some(&json!("エンタープライズ"))));
        assert!(classifier.is_enterprise(Some(&json!("smb; 一般企業"))));
        assert!(!classifier.is_enterprise(Some(&json!("中小企業"))));

        // The ASCII-only set does not recognise localized labels
        assert!(!Classifier::default().is_enterprise(Some(&json!("エンタープライズ"))));
    }

    #[test]
    fn test_custom_delimiter() {
        let classifier = Classifier::new(",", ["enterprise"]);
        assert!(classifier.is_enterprise(Some(&json!("smb, enterprise"))));
        assert!(!classifier.is_enterprise(Some(&json!("smb; enterprise"))));
    }
}
