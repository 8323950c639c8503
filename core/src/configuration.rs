use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    pub port: u16,
    pub host: String,
    pub name: String,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
        )
    }

    pub fn connection_string(&self) -> String {
        format!("{}/{}", self.without_db(), self.name)
    }

    pub fn connection_string_without_db(&self) -> String {
        self.without_db()
    }
}

/// Per-action concurrency ceilings for the request driver (spec §6).
///
/// `None` means "no budget configured" — the corresponding action is
/// skipped entirely by Pass A of `process_requests` (spec §4.8).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TransferThresholds {
    pub active_staging_transfers_threshold: Option<i64>,
    pub active_archiving_transfers_threshold: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WideAreaBackendSettings {
    pub endpoint: String,
    pub bring_online_seconds: i64,
    pub archive_timeout_seconds: i64,
    pub copy_pin_lifetime_seconds: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub thresholds: TransferThresholds,
    pub wide_area_backend: WideAreaBackendSettings,
    pub mail: MailSettings,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT");
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(configuration_directory.join(environment_filename)))
        .add_source(
            config::Environment::with_prefix("DATABASE")
                .prefix_separator("_")
                .separator("__"),
        )
        .add_source(
            config::Environment::with_prefix("COLD")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not a supported environment. Use either `local` or `production`."
            )),
        }
    }
}
