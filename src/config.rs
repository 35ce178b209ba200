use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SmokeError;

pub const DEFAULT_SERVER: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1433;
pub const DEFAULT_DATABASE: &str = "master";
pub const DEFAULT_USER: &str = "sa";
pub const DEFAULT_DRIVER: &str = "ODBC Driver 18 for SQL Server";

/// `Encrypt` setting of the connection descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptMode {
    /// Encrypt the login only.
    #[default]
    No,
    /// Encrypt the whole session.
    Yes,
    /// TDS 8 strict encryption; the client treats it like `Yes`.
    Strict,
}

impl EncryptMode {
    #[must_use]
    pub fn as_odbc(self) -> &'static str {
        match self {
            EncryptMode::No => "no",
            EncryptMode::Yes => "yes",
            EncryptMode::Strict => "strict",
        }
    }
}

impl FromStr for EncryptMode {
    type Err = SmokeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "no" | "false" | "optional" => Ok(EncryptMode::No),
            "yes" | "true" | "mandatory" => Ok(EncryptMode::Yes),
            "strict" => Ok(EncryptMode::Strict),
            other => Err(SmokeError::ConfigError(format!(
                "invalid Encrypt value: {other}"
            ))),
        }
    }
}

/// Parse an ODBC yes/no flag.
///
/// # Errors
/// Returns `SmokeError::ConfigError` for anything other than yes/no/true/false.
pub fn parse_odbc_bool(key: &str, value: &str) -> Result<bool, SmokeError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" => Ok(true),
        "no" | "false" => Ok(false),
        other => Err(SmokeError::ConfigError(format!(
            "invalid {key} value: {other}"
        ))),
    }
}

/// Everything needed to reach and authenticate against one SQL Server.
///
/// `port: None` means "not given": a named instance is then looked up through
/// the SQL Browser, otherwise [`DEFAULT_PORT`] is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    pub server: String,
    pub port: Option<u16>,
    pub database: String,
    pub user: String,
    pub password: String,
    pub driver: String,
    pub encrypt: EncryptMode,
    pub trust_server_certificate: bool,
    pub instance_name: Option<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: None,
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            driver: DEFAULT_DRIVER.to_string(),
            encrypt: EncryptMode::No,
            trust_server_certificate: true,
            instance_name: None,
        }
    }
}

impl ServerOptions {
    #[must_use]
    pub fn builder() -> ServerOptionsBuilder {
        ServerOptionsBuilder::default()
    }

    /// Load options from a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns `SmokeError::ConfigError` if the file cannot be read or parsed.
    pub fn from_json_path(path: &Path) -> Result<Self, SmokeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SmokeError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// # Errors
    /// Returns `SmokeError::ConfigError` if the JSON is malformed.
    pub fn from_json_str(raw: &str) -> Result<Self, SmokeError> {
        serde_json::from_str(raw)
            .map_err(|e| SmokeError::ConfigError(format!("invalid config json: {e}")))
    }

    /// Reject options that cannot describe a server at all.
    ///
    /// # Errors
    /// Returns `SmokeError::ConfigError` for an empty server, a port of 0, or
    /// an empty instance name.
    pub fn validate(&self) -> Result<(), SmokeError> {
        if self.server.trim().is_empty() {
            return Err(SmokeError::ConfigError("server must not be empty".to_string()));
        }
        if self.port == Some(0) {
            return Err(SmokeError::ConfigError("port must not be 0".to_string()));
        }
        if self
            .instance_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(SmokeError::ConfigError(
                "instance name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Port to dial when no SQL Browser lookup happens.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Copy with the password masked, for logging.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = "***".to_string();
        }
        copy
    }
}

/// Fluent builder for [`ServerOptions`].
#[derive(Debug, Clone, Default)]
pub struct ServerOptionsBuilder {
    opts: ServerOptions,
}

impl ServerOptionsBuilder {
    #[must_use]
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.opts.server = server.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.opts.database = database.into();
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.opts.user = user.into();
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.password = password.into();
        self
    }

    #[must_use]
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.opts.driver = driver.into();
        self
    }

    #[must_use]
    pub fn encrypt(mut self, encrypt: EncryptMode) -> Self {
        self.opts.encrypt = encrypt;
        self
    }

    #[must_use]
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.opts.trust_server_certificate = trust;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.opts.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn finish(self) -> ServerOptions {
        self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_developer_server() {
        let opts = ServerOptions::default();
        assert_eq!(opts.server, "localhost");
        assert_eq!(opts.port, None);
        assert_eq!(opts.effective_port(), 1433);
        assert_eq!(opts.database, "master");
        assert_eq!(opts.user, "sa");
        assert_eq!(opts.encrypt, EncryptMode::No);
        assert!(opts.trust_server_certificate);
        assert!(opts.password.is_empty());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let opts =
            ServerOptions::from_json_str(r#"{"server":"db.internal","encrypt":"strict"}"#).unwrap();
        assert_eq!(opts.server, "db.internal");
        assert_eq!(opts.encrypt, EncryptMode::Strict);
        assert_eq!(opts.database, "master");
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = ServerOptions::from_json_str("{server:").unwrap_err();
        assert!(matches!(err, SmokeError::ConfigError(_)));
    }

    #[test]
    fn validate_rejects_unusable_servers() {
        assert!(ServerOptions::default().validate().is_ok());
        let empty = ServerOptions::builder().server("  ").finish();
        assert!(matches!(empty.validate(), Err(SmokeError::ConfigError(_))));
        let zero = ServerOptions::builder().port(Some(0)).finish();
        assert!(zero.validate().is_err());
        let blank_instance = ServerOptions::builder()
            .instance_name(Some(String::new()))
            .finish();
        assert!(blank_instance.validate().is_err());
    }

    #[test]
    fn redacted_masks_password_only() {
        let opts = ServerOptions::builder().password("!Passw0rd").finish();
        let shown = opts.redacted();
        assert_eq!(shown.password, "***");
        assert_eq!(shown.user, opts.user);
    }

    #[test]
    fn encrypt_accepts_odbc_spellings() {
        assert_eq!("Optional".parse::<EncryptMode>().unwrap(), EncryptMode::No);
        assert_eq!("mandatory".parse::<EncryptMode>().unwrap(), EncryptMode::Yes);
        assert_eq!("TRUE".parse::<EncryptMode>().unwrap(), EncryptMode::Yes);
        assert!("maybe".parse::<EncryptMode>().is_err());
    }

    #[test]
    fn odbc_bool_rejects_garbage() {
        assert!(parse_odbc_bool("TrustServerCertificate", "yes").unwrap());
        assert!(!parse_odbc_bool("TrustServerCertificate", "False").unwrap());
        assert!(parse_odbc_bool("TrustServerCertificate", "1").is_err());
    }
}
