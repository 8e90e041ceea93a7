use enterprise_check::config::Config as EnterpriseCheckConfig;
use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub enterprise_check: Option<EnterpriseCheckConfig>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use enterprise_check::config::Strategy;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn enterprise_check_config() {
        let yaml = r#"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://public@sentry.example.com/1
            enterprise_check:
                listener:
                    host: 0.0.0.0
                    port: 8080
                hubspot:
                    strategy: batch_read
                    token_env: HUBSPOT_PRIVATE_APP_TOKEN
                classification:
                    enterprise_labels:
                        - enterprise
                        - general business
                        - エンタープライズ
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );
        assert_eq!(
            config.common.logging.map(|l| l.sentry_dsn).as_deref(),
            Some("https://public@sentry.example.com/1")
        );

        let check = config.enterprise_check.expect("enterprise check config");
        assert_eq!(check.listener.port, 8080);
        assert_eq!(check.hubspot.strategy, Strategy::BatchRead);
        assert_eq!(check.hubspot.token_env, "HUBSPOT_PRIVATE_APP_TOKEN");
        assert_eq!(check.classification.enterprise_labels.len(), 3);
        assert!(check.validate().is_ok());
    }

    #[test]
    fn minimal_config() {
        let tmp = write_tmp_file("enterprise_check: {}\n");
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common, CommonConfig::default());
        assert_eq!(
            config.enterprise_check,
            Some(EnterpriseCheckConfig::default())
        );
    }

    #[test]
    fn invalid_config() {
        let tmp = write_tmp_file("enterprise_check:\n  hubspot:\n    strategy: crawl\n");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));

        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/hubcheck.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
