use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("DEVHOME_JWT_SECRET").unwrap_or_else(|| {
            warn!("DEVHOME_JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.into()
        });
        let db_path = get("DEVHOME_DB_PATH").unwrap_or_else(|| "devhome.db".into());
        let host = get("DEVHOME_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("DEVHOME_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("DEVHOME_PORT must be a port number")?;
        let ttl_hours: i64 = get("DEVHOME_TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "8".into())
            .parse()
            .context("DEVHOME_TOKEN_TTL_HOURS must be a whole number of hours")?;
        let token_ttl = chrono::Duration::try_hours(ttl_hours)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .context("DEVHOME_TOKEN_TTL_HOURS must be a positive number of hours in range")?;

        Ok(Self {
            db_path: PathBuf::from(db_path),
            addr: format!("{}:{}", host, port)
                .parse()
                .context("DEVHOME_HOST must be an IP address")?,
            jwt_secret,
            token_ttl,
        })
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
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr.port(), 5000);
        assert_eq!(config.db_path, PathBuf::from("devhome.db"));
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.token_ttl, chrono::Duration::hours(8));
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DEVHOME_HOST", "127.0.0.1"),
            ("DEVHOME_PORT", "8080"),
            ("DEVHOME_JWT_SECRET", "s3cret"),
            ("DEVHOME_TOKEN_TTL_HOURS", "24"),
        ]))
        .unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_ttl, chrono::Duration::hours(24));
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("DEVHOME_PORT", "http")])).is_err());
    }

    #[test]
    fn token_ttl_out_of_range_is_an_error() {
        for hours in ["0", "-3", "9999999999999"] {
            assert!(
                Config::from_lookup(lookup(&[("DEVHOME_TOKEN_TTL_HOURS", hours)])).is_err(),
                "accepted {hours}"
            );
        }
    }
}
