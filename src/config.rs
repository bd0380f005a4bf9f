use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub ticket: TicketConfig,
    pub raffle: RaffleConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

/// Ticket issuance and signature settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketConfig {
    /// HMAC signing key. Required: startup fails when missing or empty.
    pub secret_key: String,
    /// Signature enforcement on admission. Disabling is a deliberate,
    /// auditable escape hatch for development environments only.
    #[serde(default = "default_true")]
    pub enforce_signature: bool,
    /// Upper bound for one issuance batch.
    #[serde(default = "default_max_batch")]
    pub max_batch: u32,
    /// Regeneration attempts per ticket on identifier collision.
    #[serde(default = "default_issue_retries")]
    pub issue_retries: u32,
}

/// Raffle state machine and draw settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleConfig {
    /// Grace window between reaching capacity and the automatic draw.
    #[serde(default = "default_grace_minutes")]
    pub draw_grace_minutes: i64,
    /// Minimum active participations for a non-forced draw.
    #[serde(default = "default_min_participants")]
    pub min_participants: i64,
    /// AutoDrawScheduler tick interval.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Bounded retries for serialization conflicts.
    #[serde(default = "default_txn_retries")]
    pub txn_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifierConfig {
    /// Optional webhook endpoint for best-effort event delivery.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_max_batch() -> u32 {
    100
}
fn default_issue_retries() -> u32 {
    5
}
fn default_grace_minutes() -> i64 {
    5
}
fn default_min_participants() -> i64 {
    2
}
fn default_sweep_interval() -> u64 {
    5
}
fn default_txn_retries() -> u32 {
    3
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build from environment variables and defaults.
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL").ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL is required when no config.toml is present")
                })?;
                let secret_key = get_env("TICKET_SECRET_KEY").ok_or_else(|| {
                    anyhow::anyhow!("TICKET_SECRET_KEY is required when no config.toml is present")
                })?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    ticket: TicketConfig {
                        secret_key,
                        enforce_signature: get_env_parse("TICKET_ENFORCE_SIGNATURE", true),
                        max_batch: get_env_parse("TICKET_MAX_BATCH", default_max_batch()),
                        issue_retries: get_env_parse(
                            "TICKET_ISSUE_RETRIES",
                            default_issue_retries(),
                        ),
                    },
                    raffle: RaffleConfig {
                        draw_grace_minutes: get_env_parse(
                            "RAFFLE_DRAW_GRACE_MINUTES",
                            default_grace_minutes(),
                        ),
                        min_participants: get_env_parse(
                            "RAFFLE_MIN_PARTICIPANTS",
                            default_min_participants(),
                        ),
                        sweep_interval_secs: get_env_parse(
                            "RAFFLE_SWEEP_INTERVAL_SECS",
                            default_sweep_interval(),
                        ),
                        txn_retries: get_env_parse("RAFFLE_TXN_RETRIES", default_txn_retries()),
                    },
                    notifier: NotifierConfig {
                        webhook_url: get_env("NOTIFIER_WEBHOOK_URL"),
                    },
                }
            }
            Err(e) => {
                return Err(anyhow::anyhow!("Failed to read config file {config_path}: {e}"));
            }
        };

        // Environment variables override file values when both are present.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("TICKET_SECRET_KEY") {
            config.ticket.secret_key = v;
        }
        if let Ok(v) = env::var("TICKET_ENFORCE_SIGNATURE")
            && let Ok(b) = v.parse()
        {
            config.ticket.enforce_signature = b;
        }
        if let Ok(v) = env::var("TICKET_MAX_BATCH")
            && let Ok(n) = v.parse()
        {
            config.ticket.max_batch = n;
        }
        if let Ok(v) = env::var("TICKET_ISSUE_RETRIES")
            && let Ok(n) = v.parse()
        {
            config.ticket.issue_retries = n;
        }
        if let Ok(v) = env::var("RAFFLE_DRAW_GRACE_MINUTES")
            && let Ok(n) = v.parse()
        {
            config.raffle.draw_grace_minutes = n;
        }
        if let Ok(v) = env::var("RAFFLE_MIN_PARTICIPANTS")
            && let Ok(n) = v.parse()
        {
            config.raffle.min_participants = n;
        }
        if let Ok(v) = env::var("RAFFLE_SWEEP_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            config.raffle.sweep_interval_secs = n;
        }
        if let Ok(v) = env::var("RAFFLE_TXN_RETRIES")
            && let Ok(n) = v.parse()
        {
            config.raffle.txn_retries = n;
        }
        if let Ok(v) = env::var("NOTIFIER_WEBHOOK_URL") {
            config.notifier.webhook_url = Some(v);
        }

        // The signing key has no insecure fallback: refuse to start without it.
        if config.ticket.secret_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "ticket.secret_key (TICKET_SECRET_KEY) must be set and non-empty"
            ));
        }

        Ok(config)
    }
}
