use std::env;
use std::str::FromStr;

use log::warn;

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/teamup";
pub const DEFAULT_PORT: u16 = 8080;

/// How PUT decides whether the caller owns a request.
///
/// Both modes compare the payload's `owner_fingerprint` with the stored one.
/// `Payload` then writes the payload's fingerprint back as part of the full
/// overwrite, which is how the service has always behaved. `Stored` treats
/// the stored fingerprint as the only authority and never rewrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerCheck {
    #[default]
    Payload,
    Stored,
}

impl FromStr for OwnerCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payload" => Ok(OwnerCheck::Payload),
            "stored" => Ok(OwnerCheck::Stored),
            other => Err(format!("unknown owner check mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    /// Overrides the database named in the connection string.
    pub database_name: Option<String>,
    pub cors_origin: String,
    pub port: u16,
    pub environment: String,
    pub update_owner_check: OwnerCheck,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongodb_uri: DEFAULT_MONGODB_URI.to_string(),
            database_name: None,
            cors_origin: "*".to_string(),
            port: DEFAULT_PORT,
            environment: "development".to_string(),
            update_owner_check: OwnerCheck::Payload,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparseable values
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Invalid PORT '{}', using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => defaults.port,
        };

        let update_owner_check = match lookup("UPDATE_OWNER_CHECK") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, using payload check", e);
                OwnerCheck::Payload
            }),
            None => defaults.update_owner_check,
        };

        Self {
            mongodb_uri: lookup("MONGODB_URI").unwrap_or(defaults.mongodb_uri),
            database_name: lookup("DATABASE_NAME").filter(|name| !name.trim().is_empty()),
            cors_origin: lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            port,
            environment: lookup("NODE_ENV").unwrap_or(defaults.environment),
            update_owner_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[]));

        assert_eq!(config.mongodb_uri, DEFAULT_MONGODB_URI);
        assert_eq!(config.database_name, None);
        assert_eq!(config.cors_origin, "*");
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "development");
        assert_eq!(config.update_owner_check, OwnerCheck::Payload);
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup(&[
            ("MONGODB_URI", "mongodb://db:27017/teams?retryWrites=true"),
            ("DATABASE_NAME", "staging"),
            ("CORS_ORIGIN", "https://teamup.example"),
            ("PORT", "3000"),
            ("NODE_ENV", "production"),
            ("UPDATE_OWNER_CHECK", "Stored"),
        ]));

        assert_eq!(config.mongodb_uri, "mongodb://db:27017/teams?retryWrites=true");
        assert_eq!(config.database_name.as_deref(), Some("staging"));
        assert_eq!(config.cors_origin, "https://teamup.example");
        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, "production");
        assert_eq!(config.update_owner_check, OwnerCheck::Stored);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "eighty"),
            ("UPDATE_OWNER_CHECK", "whatever"),
            ("DATABASE_NAME", "  "),
        ]));

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.update_owner_check, OwnerCheck::Payload);
        assert_eq!(config.database_name, None);
    }
}
