use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use entraide_auth::AuthConfig;
use entraide_auth::token::DEFAULT_TOKEN_TTL_HOURS;

#[derive(Debug)]
pub struct ServerConfig {
    pub auth: AuthConfig,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build the configuration from a set of `ENTRAIDE_*` variables.
    /// The JWT secret has no default.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(String::as_str);

        let jwt_secret = get("ENTRAIDE_JWT_SECRET")
            .ok_or_else(|| anyhow!("ENTRAIDE_JWT_SECRET is not set"))?;
        let ttl_hours: i64 = get("ENTRAIDE_TOKEN_TTL_HOURS")
            .map(|v| v.parse().context("ENTRAIDE_TOKEN_TTL_HOURS must be an integer"))
            .transpose()?
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);
        let ttl = chrono::Duration::try_hours(ttl_hours)
            .ok_or_else(|| anyhow!("ENTRAIDE_TOKEN_TTL_HOURS is out of range"))?;
        let auth = AuthConfig::new(jwt_secret, ttl)?;

        let db_path = PathBuf::from(get("ENTRAIDE_DB_PATH").unwrap_or("entraide.db"));
        let host = get("ENTRAIDE_HOST").unwrap_or("0.0.0.0");
        let port: u16 = get("ENTRAIDE_PORT")
            .unwrap_or("3000")
            .parse()
            .context("ENTRAIDE_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;
        let timeout_secs: u64 = get("ENTRAIDE_REQUEST_TIMEOUT_SECS")
            .unwrap_or("30")
            .parse()
            .context("ENTRAIDE_REQUEST_TIMEOUT_SECS must be an integer")?;

        Ok(Self {
            auth,
            db_path,
            addr,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults_apply() {
        let config = ServerConfig::from_vars(&vars(&[("ENTRAIDE_JWT_SECRET", SECRET)])).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_path, PathBuf::from("entraide.db"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.auth.token_ttl(), chrono::Duration::days(7));
    }

    #[test]
    fn missing_secret_fails() {
        assert!(ServerConfig::from_vars(&vars(&[])).is_err());
        assert!(
            ServerConfig::from_vars(&vars(&[(
                "ENTRAIDE_JWT_SECRET",
                "your-secret-key-change-this"
            )]))
            .is_err()
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ServerConfig::from_vars(&vars(&[
            ("ENTRAIDE_JWT_SECRET", SECRET),
            ("ENTRAIDE_HOST", "127.0.0.1"),
            ("ENTRAIDE_PORT", "8080"),
            ("ENTRAIDE_TOKEN_TTL_HOURS", "1"),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.auth.token_ttl(), chrono::Duration::hours(1));

        let huge_ttl = vars(&[
            ("ENTRAIDE_JWT_SECRET", SECRET),
            ("ENTRAIDE_TOKEN_TTL_HOURS", "9000000000000000000"),
        ]);
        assert!(ServerConfig::from_vars(&huge_ttl).is_err());
        let year_plus = vars(&[("ENTRAIDE_JWT_SECRET", SECRET), ("ENTRAIDE_TOKEN_TTL_HOURS", "8761")]);
        assert!(ServerConfig::from_vars(&year_plus).is_err());

        let bad_port = vars(&[("ENTRAIDE_JWT_SECRET", SECRET), ("ENTRAIDE_PORT", "http")]);
        assert!(ServerConfig::from_vars(&bad_port).is_err());
    }
}
