use std::fmt;

use sqlx::postgres::PgConnectOptions;

use crate::libs::error::{Error, Result};

/// Where and as whom to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "emailing_server".to_string(),
            username: "emailing_agent".to_string(),
            password: "postgres".to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Reads `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USERNAME` and `DB_PASSWORD`,
    /// falling back to [`ConnectionConfig::default`] for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("DB_PORT is not a valid port: {}", raw)))?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port,
            database: lookup("DB_NAME").unwrap_or(defaults.database),
            username: lookup("DB_USERNAME").unwrap_or(defaults.username),
            password: lookup("DB_PASSWORD").unwrap_or(defaults.password),
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let config = ConnectionConfig::from_lookup(lookup_in(&[])).unwrap();
        assert_eq!(config, ConnectionConfig::default());
        assert_eq!(config.database, "emailing_server");
        assert_eq!(config.username, "emailing_agent");
        assert_eq!(config.password, "postgres");
    }

    #[test]
    fn variables_override_defaults() {
        let config = ConnectionConfig::from_lookup(lookup_in(&[
            ("DB_USERNAME", "mailer"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_PORT", "6543"),
        ]))
        .unwrap();

        assert_eq!(config.username, "mailer");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.port, 6543);
        assert_eq!(config.host, "localhost");
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn bad_port_is_a_config_error() {
        let err = ConnectionConfig::from_lookup(lookup_in(&[("DB_PORT", "abc")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
