use clap::Parser;
use mssql_smoke::{ConnectionDescriptor, EncryptMode, ServerOptions, SmokeError};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "SQL Server connectivity smoke run")]
pub(crate) struct Args {
    /// JSON file with server options; flags override it
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Full ODBC connection string; its keys override everything else
    #[arg(long)]
    pub(crate) connection_string: Option<String>,
    #[arg(long)]
    pub(crate) server: Option<String>,
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[arg(long)]
    pub(crate) database: Option<String>,
    #[arg(long)]
    pub(crate) user: Option<String>,
    #[arg(long)]
    pub(crate) password: Option<String>,
    #[arg(long)]
    pub(crate) driver: Option<String>,
    #[arg(long, value_enum)]
    pub(crate) encrypt: Option<EncryptMode>,
    #[arg(long)]
    pub(crate) trust_server_certificate: Option<bool>,
    #[arg(long)]
    pub(crate) instance_name: Option<String>,
    /// Also write log output to this file
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    #[arg(long)]
    pub(crate) verbose: bool,
}

impl Args {
    /// Defaults, then the config file, then flags, then the connection string.
    /// The merged options are validated before they are returned.
    pub(crate) fn resolve_options(&self) -> Result<ServerOptions, SmokeError> {
        let mut opts = match &self.config {
            Some(path) => ServerOptions::from_json_path(path)?,
            None => ServerOptions::default(),
        };

        if let Some(server) = &self.server {
            opts.server.clone_from(server);
        }
        if let Some(port) = self.port {
            opts.port = Some(port);
        }
        if let Some(database) = &self.database {
            opts.database.clone_from(database);
        }
        if let Some(user) = &self.user {
            opts.user.clone_from(user);
        }
        if let Some(password) = &self.password {
            opts.password.clone_from(password);
        }
        if let Some(driver) = &self.driver {
            opts.driver.clone_from(driver);
        }
        if let Some(encrypt) = self.encrypt {
            opts.encrypt = encrypt;
        }
        if let Some(trust) = self.trust_server_certificate {
            opts.trust_server_certificate = trust;
        }
        if self.instance_name.is_some() {
            opts.instance_name.clone_from(&self.instance_name);
        }

        if let Some(raw) = &self.connection_string {
            let mut descriptor = ConnectionDescriptor::from_options(&opts);
            for (key, value) in ConnectionDescriptor::parse(raw)?.iter() {
                descriptor.set(key, value);
            }
            opts = descriptor.to_options()?;
        }

        opts.validate()?;
        Ok(opts)
    }
}
