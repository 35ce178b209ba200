//! ODBC-style connection descriptor.
//!
//! A descriptor is an ordered list of `key=value` pairs. It renders to the
//! familiar connection-string form
//!
//! ```text
//! DRIVER={ODBC Driver 18 for SQL Server};SERVER=localhost,1433;DATABASE=master;UID=sa;PWD=...;Encrypt=no;TrustServerCertificate=yes;
//! ```
//!
//! and can be parsed back from it. Keys compare case-insensitively; values may
//! be wrapped in braces, with `}}` standing for a literal `}`.

use std::fmt;

use crate::config::{EncryptMode, ServerOptions, parse_odbc_bool};
use crate::error::SmokeError;

pub const KEY_DRIVER: &str = "DRIVER";
pub const KEY_SERVER: &str = "SERVER";
pub const KEY_DATABASE: &str = "DATABASE";
pub const KEY_UID: &str = "UID";
pub const KEY_PWD: &str = "PWD";
pub const KEY_ENCRYPT: &str = "Encrypt";
pub const KEY_TRUST_CERT: &str = "TrustServerCertificate";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionDescriptor {
    params: Vec<(String, String)>,
}

/// Parsed form of the `SERVER` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
}

impl ServerAddress {
    /// Parse `host`, `host,port`, `tcp:host,port` or `host\instance`.
    ///
    /// # Errors
    /// Returns `SmokeError::ConfigError` for an empty host or a bad port.
    pub fn parse(raw: &str) -> Result<Self, SmokeError> {
        let raw = raw.trim();
        let raw = match raw.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("tcp:") => &raw[4..],
            _ => raw,
        };

        let (host_part, port) = match raw.split_once(',') {
            Some((host, port)) => {
                let port = port.trim().parse::<u16>().map_err(|e| {
                    SmokeError::ConfigError(format!("invalid port in SERVER '{raw}': {e}"))
                })?;
                (host.trim(), Some(port))
            }
            None => (raw, None),
        };

        let (host, instance_name) = match host_part.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => (host, Some(instance.to_string())),
            Some((host, _)) => (host, None),
            None => (host_part, None),
        };

        if host.is_empty() {
            return Err(SmokeError::ConfigError(format!(
                "SERVER '{raw}' has no host"
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            instance_name,
        })
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)?;
        if let Some(instance) = &self.instance_name {
            write!(f, "\\{instance}")?;
        }
        if let Some(port) = self.port {
            write!(f, ",{port}")?;
        }
        Ok(())
    }
}

impl ConnectionDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the descriptor for `opts`, in the canonical key order.
    #[must_use]
    pub fn from_options(opts: &ServerOptions) -> Self {
        // without an instance the port is always spelled out; with one, only
        // an explicit port is, since its absence selects the SQL Browser
        let port = match &opts.instance_name {
            Some(_) => opts.port,
            None => Some(opts.effective_port()),
        };
        let address = ServerAddress {
            host: opts.server.clone(),
            port,
            instance_name: opts.instance_name.clone(),
        };
        let mut descriptor = Self::new();
        let driver = opts
            .driver
            .trim()
            .trim_start_matches('{')
            .trim_end_matches('}');
        descriptor.set(KEY_DRIVER, driver);
        descriptor.set(KEY_SERVER, &address.to_string());
        descriptor.set(KEY_DATABASE, &opts.database);
        descriptor.set(KEY_UID, &opts.user);
        descriptor.set(KEY_PWD, &opts.password);
        descriptor.set(KEY_ENCRYPT, opts.encrypt.as_odbc());
        descriptor.set(
            KEY_TRUST_CERT,
            if opts.trust_server_certificate { "yes" } else { "no" },
        );
        descriptor
    }

    /// Parse an ODBC connection string.
    ///
    /// # Errors
    /// Returns `SmokeError::ConfigError` for a segment without `=`, an empty
    /// key, or an unterminated `{...}` value.
    pub fn parse(input: &str) -> Result<Self, SmokeError> {
        let mut descriptor = Self::new();
        let mut chars = input.chars().peekable();

        loop {
            let mut key = String::new();
            let mut saw_eq = false;
            for ch in chars.by_ref() {
                match ch {
                    '=' => {
                        saw_eq = true;
                        break;
                    }
                    ';' => break,
                    other => key.push(other),
                }
            }
            let key = key.trim().to_string();

            if !saw_eq {
                if !key.is_empty() {
                    return Err(SmokeError::ConfigError(format!(
                        "connection string segment '{key}' has no '='"
                    )));
                }
                if chars.peek().is_none() {
                    break;
                }
                continue;
            }
            if key.is_empty() {
                return Err(SmokeError::ConfigError(
                    "connection string has an empty key".to_string(),
                ));
            }

            while chars.peek().is_some_and(|c| *c == ' ') {
                chars.next();
            }

            let mut value = String::new();
            if chars.peek() == Some(&'{') {
                chars.next();
                let mut closed = false;
                while let Some(ch) = chars.next() {
                    if ch == '}' {
                        if chars.peek() == Some(&'}') {
                            chars.next();
                            value.push('}');
                        } else {
                            closed = true;
                            break;
                        }
                    } else {
                        value.push(ch);
                    }
                }
                if !closed {
                    return Err(SmokeError::ConfigError(format!(
                        "unterminated '{{' in value of {key}"
                    )));
                }
                // anything between the closing brace and ';' is ignored
                for ch in chars.by_ref() {
                    if ch == ';' {
                        break;
                    }
                }
            } else {
                for ch in chars.by_ref() {
                    if ch == ';' {
                        break;
                    }
                    value.push(ch);
                }
                value = value.trim().to_string();
            }

            descriptor.set(&key, &value);
            if chars.peek().is_none() {
                break;
            }
        }

        Ok(descriptor)
    }

    /// Look up a value by key, ignoring ASCII case.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a key, replacing an existing entry in place or appending.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(entry) = self
            .params
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            entry.1 = value.to_string();
        } else {
            self.params.push((key.to_string(), value.to_string()));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Full connection string, password included.
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        self.render(false)
    }

    /// Resolve the descriptor back into [`ServerOptions`]; missing keys keep
    /// their defaults and unknown keys are ignored.
    ///
    /// # Errors
    /// Returns `SmokeError::ConfigError` if `SERVER`, `Encrypt` or
    /// `TrustServerCertificate` hold invalid values.
    pub fn to_options(&self) -> Result<ServerOptions, SmokeError> {
        let mut opts = ServerOptions::default();
        if let Some(driver) = self.get(KEY_DRIVER) {
            opts.driver = driver.to_string();
        }
        if let Some(server) = self.get(KEY_SERVER) {
            let address = ServerAddress::parse(server)?;
            opts.server = address.host;
            opts.instance_name = address.instance_name;
            opts.port = address.port;
        }
        if let Some(database) = self.get(KEY_DATABASE) {
            opts.database = database.to_string();
        }
        if let Some(user) = self.get(KEY_UID) {
            opts.user = user.to_string();
        }
        if let Some(password) = self.get(KEY_PWD) {
            opts.password = password.to_string();
        }
        if let Some(encrypt) = self.get(KEY_ENCRYPT) {
            opts.encrypt = encrypt.parse::<EncryptMode>()?;
        }
        if let Some(trust) = self.get(KEY_TRUST_CERT) {
            opts.trust_server_certificate = parse_odbc_bool(KEY_TRUST_CERT, trust)?;
        }
        Ok(opts)
    }

    /// [`to_options`](Self::to_options) as seen by a connector: a descriptor
    /// that does not describe a reachable server is a connection failure.
    ///
    /// # Errors
    /// Returns `SmokeError::ConnectionError` if the descriptor holds invalid or
    /// unusable values.
    pub fn connect_options(&self) -> Result<ServerOptions, SmokeError> {
        self.to_options()
            .and_then(|opts| opts.validate().map(|()| opts))
            .map_err(|e| SmokeError::ConnectionError(format!("invalid connection descriptor: {e}")))
    }

    fn render(&self, redact_password: bool) -> String {
        let mut out = String::new();
        for (key, value) in &self.params {
            out.push_str(key);
            out.push('=');
            if redact_password && key.eq_ignore_ascii_case(KEY_PWD) {
                out.push_str("***");
            } else if key.eq_ignore_ascii_case(KEY_DRIVER) || needs_braces(value) {
                out.push('{');
                out.push_str(&value.replace('}', "}}"));
                out.push('}');
            } else {
                out.push_str(value);
            }
            out.push(';');
        }
        out
    }
}

fn needs_braces(value: &str) -> bool {
    value.contains([';', '{', '}']) || value.starts_with(' ') || value.ends_with(' ')
}

/// Renders with `PWD` masked; use [`ConnectionDescriptor::to_connection_string`]
/// for the real thing.
impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "DRIVER={ODBC Driver 18 for SQL Server};SERVER=localhost,1433;DATABASE=master;UID=sa;PWD=!Passw0rd;Encrypt=no;TrustServerCertificate=yes;";

    fn local_options() -> ServerOptions {
        ServerOptions::builder()
            .port(Some(1433))
            .password("!Passw0rd")
            .finish()
    }

    #[test]
    fn renders_canonical_connection_string() {
        let descriptor = ConnectionDescriptor::from_options(&local_options());
        assert_eq!(descriptor.to_connection_string(), CANONICAL);
        assert_eq!(descriptor.len(), 7);
    }

    #[test]
    fn unset_port_renders_default() {
        let opts = ServerOptions::builder().password("!Passw0rd").finish();
        assert_eq!(
            ConnectionDescriptor::from_options(&opts).to_connection_string(),
            CANONICAL
        );
    }

    #[test]
    fn named_instance_keeps_explicit_port() {
        let parsed = ConnectionDescriptor::parse("SERVER=db\\SQLEXPRESS,1500")
            .unwrap()
            .to_options()
            .unwrap();
        assert_eq!(parsed.instance_name.as_deref(), Some("SQLEXPRESS"));
        assert_eq!(parsed.port, Some(1500));

        let rendered = ConnectionDescriptor::from_options(&parsed);
        assert_eq!(rendered.get("SERVER"), Some("db\\SQLEXPRESS,1500"));
        let reparsed = rendered.to_options().unwrap();
        assert_eq!(reparsed.port, Some(1500));
        assert_eq!(reparsed, parsed);
    }

    #[test]
    fn named_instance_without_port_renders_bare() {
        let opts = ServerOptions::builder()
            .server("db")
            .instance_name(Some("SQLEXPRESS".to_string()))
            .finish();
        let rendered = ConnectionDescriptor::from_options(&opts);
        assert_eq!(rendered.get("SERVER"), Some("db\\SQLEXPRESS"));
        assert_eq!(rendered.to_options().unwrap().port, None);
    }

    #[test]
    fn unusable_descriptor_is_a_connection_error() {
        let err = ConnectionDescriptor::parse("SERVER=,1433")
            .unwrap()
            .connect_options()
            .unwrap_err();
        assert!(matches!(err, SmokeError::ConnectionError(_)));

        let err = ConnectionDescriptor::parse("Encrypt=sometimes")
            .unwrap()
            .connect_options()
            .unwrap_err();
        assert!(err.to_string().contains("invalid connection descriptor"));
    }

    #[test]
    fn braced_driver_name_is_not_double_wrapped() {
        let opts = ServerOptions::builder()
            .driver("{ODBC Driver 18 for SQL Server}")
            .finish();
        let rendered = ConnectionDescriptor::from_options(&opts).to_connection_string();
        assert!(rendered.starts_with("DRIVER={ODBC Driver 18 for SQL Server};"));
    }

    #[test]
    fn display_hides_password() {
        let shown = ConnectionDescriptor::from_options(&local_options()).to_string();
        assert!(shown.contains("PWD=***;"));
        assert!(!shown.contains("Passw0rd"));
    }

    #[test]
    fn parses_canonical_form_back_to_options() {
        let descriptor = ConnectionDescriptor::parse(CANONICAL).unwrap();
        assert_eq!(descriptor.get("driver"), Some("ODBC Driver 18 for SQL Server"));
        assert_eq!(descriptor.get("pwd"), Some("!Passw0rd"));
        assert_eq!(descriptor.to_options().unwrap(), local_options());
    }

    #[test]
    fn braced_values_keep_separators() {
        let descriptor =
            ConnectionDescriptor::parse("UID=app;PWD={se;cr}}et};DATABASE=testing").unwrap();
        assert_eq!(descriptor.get("PWD"), Some("se;cr}et"));
        assert_eq!(descriptor.get("DATABASE"), Some("testing"));
        assert_eq!(
            descriptor.to_connection_string(),
            "UID=app;PWD={se;cr}}et};DATABASE=testing;"
        );
    }

    #[test]
    fn rejects_malformed_segments() {
        assert!(ConnectionDescriptor::parse("SERVER=x;garbage;").is_err());
        assert!(ConnectionDescriptor::parse("=value").is_err());
        assert!(ConnectionDescriptor::parse("PWD={open").is_err());
    }

    #[test]
    fn tolerates_empty_segments() {
        let descriptor = ConnectionDescriptor::parse(";;SERVER=db;;").unwrap();
        assert_eq!(descriptor.len(), 1);
        assert!(ConnectionDescriptor::parse("").unwrap().is_empty());
    }

    #[test]
    fn later_keys_override_earlier_ones() {
        let descriptor = ConnectionDescriptor::parse("UID=a;uid=b").unwrap();
        assert_eq!(descriptor.len(), 1);
        assert_eq!(descriptor.get("UID"), Some("b"));
    }

    #[test]
    fn server_address_forms() {
        let plain = ServerAddress::parse("db").unwrap();
        assert_eq!((plain.host.as_str(), plain.port), ("db", None));

        let tcp = ServerAddress::parse("tcp:10.3.0.202,14330").unwrap();
        assert_eq!((tcp.host.as_str(), tcp.port), ("10.3.0.202", Some(14330)));

        let named = ServerAddress::parse("db\\SQLEXPRESS").unwrap();
        assert_eq!(named.instance_name.as_deref(), Some("SQLEXPRESS"));
        assert_eq!(named.to_string(), "db\\SQLEXPRESS");

        let pinned = ServerAddress::parse("db\\SQLEXPRESS,1500").unwrap();
        assert_eq!(pinned.port, Some(1500));
        assert_eq!(pinned.to_string(), "db\\SQLEXPRESS,1500");

        assert!(ServerAddress::parse("db,notaport").is_err());
        assert!(ServerAddress::parse(",1433").is_err());
    }

    #[test]
    fn named_instance_drops_default_port() {
        let opts = ConnectionDescriptor::parse("SERVER=db\\SQLEXPRESS")
            .unwrap()
            .to_options()
            .unwrap();
        assert_eq!(opts.instance_name.as_deref(), Some("SQLEXPRESS"));
        assert_eq!(opts.port, None);
    }

    #[test]
    fn invalid_flags_surface_as_config_errors() {
        let err = ConnectionDescriptor::parse("Encrypt=sometimes")
            .unwrap()
            .to_options()
            .unwrap_err();
        assert!(matches!(err, SmokeError::ConfigError(_)));
    }
}
