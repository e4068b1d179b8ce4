// src/config.rs
use crate::error::{DashboardError, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub id_token: Option<String>,
    pub dev_user: Option<String>,
    pub dev_secret: String,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub login_route: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_url = env::var("DASHBOARD_API_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(DashboardError::Config(
                "DASHBOARD_API_URL must start with http:// or https://".into(),
            ));
        }

        let id_token = env::var("DASHBOARD_ID_TOKEN").ok().filter(|t| !t.trim().is_empty());
        let dev_user = env::var("DASHBOARD_DEV_USER").ok().filter(|u| !u.trim().is_empty());
        let dev_secret = env::var("DASHBOARD_DEV_SECRET").unwrap_or_else(|_| "dev-secret".to_string());

        let refresh_interval = Duration::from_secs(Self::parse_secs("DASHBOARD_REFRESH_SECS", 10)?);
        let request_timeout = Duration::from_secs(Self::parse_secs("DASHBOARD_TIMEOUT_SECS", 30)?);
        let login_route = env::var("DASHBOARD_LOGIN_ROUTE").unwrap_or_else(|_| "/login".to_string());

        Ok(Config {
            api_url,
            id_token,
            dev_user,
            dev_secret,
            refresh_interval,
            request_timeout,
            login_route,
        })
    }

    fn parse_secs(key: &str, default: u64) -> Result<u64> {
        let secs = match env::var(key) {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| DashboardError::Config(format!("{} must be a whole number of seconds", key)))?,
            Err(_) => default,
        };
        if secs == 0 {
            return Err(DashboardError::Config(format!("{} must be greater than zero", key)));
        }
        Ok(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_fall_back_and_reject_zero() {
        env::remove_var("DASHBOARD_TEST_UNSET_SECS");
        assert_eq!(Config::parse_secs("DASHBOARD_TEST_UNSET_SECS", 10).unwrap(), 10);

        env::set_var("DASHBOARD_TEST_ZERO_SECS", "0");
        assert!(Config::parse_secs("DASHBOARD_TEST_ZERO_SECS", 10).is_err());

        env::set_var("DASHBOARD_TEST_BAD_SECS", "ten");
        assert!(Config::parse_secs("DASHBOARD_TEST_BAD_SECS", 10).is_err());

        env::set_var("DASHBOARD_TEST_OK_SECS", " 15 ");
        assert_eq!(Config::parse_secs("DASHBOARD_TEST_OK_SECS", 10).unwrap(), 15);
    }
}
