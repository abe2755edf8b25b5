use std::fmt;

use anyhow::{anyhow, Result};

use crate::args::BaseArgs;
use crate::config::{self, Config};

pub const DEFAULT_SERVICE_URL: &str = "https://erebor.lti.cs.cmu.edu";

/// Basic-auth pair sent with every request.
#[derive(Clone)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"********")
            .finish()
    }
}

/// Resolved connection settings for one run of the CLI
#[derive(Debug, Clone)]
pub struct Session {
    pub service_url: String,
    pub credentials: Credentials,
    /// Database the catalog listing and uploads are restricted to
    pub scope: Option<String>,
    pub insecure: bool,
}

impl Session {
    /// Flags and env vars win over the config file; the password is never read from config.
    pub fn from_args(base: &BaseArgs, config: &Config) -> Result<Self> {
        let user = non_empty(base.user.clone())
            .or_else(|| non_empty(config.user.clone()))
            .ok_or_else(|| anyhow!("DiscourseDB user required. Use --user or set DDB_USER"))?;
        let password = non_empty(base.password.clone()).ok_or_else(|| {
            anyhow!("DiscourseDB password required. Use --password or set DDB_PASSWORD")
        })?;
        let service_url = non_empty(base.url.clone())
            .or_else(|| non_empty(config.url.clone()))
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
        let scope = non_empty(base.database.clone()).or_else(|| non_empty(config.database.clone()));

        Ok(Self {
            service_url,
            credentials: Credentials::new(user, password),
            scope,
            insecure: base.insecure,
        })
    }
}

pub fn resolve(base: &BaseArgs) -> Result<Session> {
    let config = config::load().unwrap_or_default();
    Session::from_args(base, &config)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseArgs {
        BaseArgs {
            user: Some("alice@example.com".into()),
            password: Some("secret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_to_public_service() {
        let session = Session::from_args(&base(), &Config::default()).unwrap();
        assert_eq!(session.service_url, DEFAULT_SERVICE_URL);
        assert_eq!(session.scope, None);
        assert!(!session.insecure);
    }

    #[test]
    fn flags_take_precedence_over_config() {
        let mut args = base();
        args.database = Some("discoursedb_ext_cmu".into());
        let config = Config {
            url: Some("https://ddb.example.org".into()),
            database: Some("other".into()),
            user: Some("bob@example.com".into()),
            ..Default::default()
        };
        let session = Session::from_args(&args, &config).unwrap();
        assert_eq!(session.service_url, "https://ddb.example.org");
        assert_eq!(session.scope.as_deref(), Some("discoursedb_ext_cmu"));
        assert_eq!(session.credentials.user(), "alice@example.com");
    }

    #[test]
    fn user_can_come_from_config() {
        let mut args = base();
        args.user = None;
        let config = Config {
            user: Some("bob@example.com".into()),
            ..Default::default()
        };
        let session = Session::from_args(&args, &config).unwrap();
        assert_eq!(session.credentials.user(), "bob@example.com");
    }

    #[test]
    fn missing_password_is_an_error() {
        let mut args = base();
        args.password = Some(String::new());
        let err = Session::from_args(&args, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("DDB_PASSWORD"));
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", Credentials::new("alice", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
