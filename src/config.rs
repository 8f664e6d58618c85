use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub academy: AcademyConfig,
    #[serde(default)]
    pub checkin: CheckInConfig,
    #[serde(default)]
    pub credits: CreditsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcademyConfig {
    /// Offset of the academy's wall clock from UTC (e.g. -3 for Brasília)
    pub utc_offset_hours: i8,
}

impl AcademyConfig {
    pub fn utc_offset(&self) -> Result<time::UtcOffset, config::ConfigError> {
        time::UtcOffset::from_hms(self.utc_offset_hours, 0, 0).map_err(|_| {
            config::ConfigError::Message(format!(
                "academy.utc_offset_hours must be within -23..=23, got {}",
                self.utc_offset_hours
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInConfig {
    #[serde(default = "default_window_minutes")]
    pub window_before_minutes: i64,
    #[serde(default = "default_window_minutes")]
    pub window_after_minutes: i64,
    #[serde(default = "default_upcoming_limit")]
    pub upcoming_limit: usize,
    #[serde(default = "default_credits_per_lesson")]
    pub credits_per_lesson: i32,
    #[serde(default = "default_attempts_per_minute")]
    pub attempts_per_minute: u32,
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            window_before_minutes: default_window_minutes(),
            window_after_minutes: default_window_minutes(),
            upcoming_limit: default_upcoming_limit(),
            credits_per_lesson: default_credits_per_lesson(),
            attempts_per_minute: default_attempts_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditsConfig {
    #[serde(default = "default_expiring_days")]
    pub default_expiring_days: i64,
    #[serde(default = "default_max_expiring_days")]
    pub max_expiring_days: i64,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            default_expiring_days: default_expiring_days(),
            max_expiring_days: default_max_expiring_days(),
        }
    }
}

fn default_window_minutes() -> i64 {
    60
}

fn default_upcoming_limit() -> usize {
    20
}

fn default_credits_per_lesson() -> i32 {
    1
}

fn default_attempts_per_minute() -> u32 {
    5
}

fn default_expiring_days() -> i64 {
    7
}

fn default_max_expiring_days() -> i64 {
    365
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("TATAME")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.academy.utc_offset()?;

        Ok(config)
    }
}
