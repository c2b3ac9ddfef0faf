use std::{env, net::IpAddr, time::Duration};

use log::*;
use order_engine::SignatureVerifier;
use pod_tools::PodConfig;
use store_common::{
    helpers::{env_duration_secs, env_flag, env_string},
    Secret,
};

use crate::{errors::ServerError, integrations::email::EmailConfig};

const DEFAULT_STORE_HOST: &str = "127.0.0.1";
const DEFAULT_STORE_PORT: u16 = 8480;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/store.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_SIGNATURE_HEADER: &str = "X-Payment-Signature";
const DEFAULT_SIGNATURE_TOLERANCE: Duration = Duration::from_secs(300);
const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(40);

const REQUIRED_ENVS: [&str; 4] =
    ["STORE_WEBHOOK_SECRET", "STORE_POD_API_TOKEN", "STORE_EMAIL_API_KEY", "STORE_OPERATOR_EMAIL"];

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub webhook: WebhookConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    pub pod: PodConfig,
    /// Path to the JSON product catalog. Without one, no physical order can be fulfilled.
    pub catalog_path: Option<String>,
    pub email: EmailConfig,
    pub operator_email: String,
    /// The `/api` endpoints are only mounted when this is set.
    pub admin_api_key: Option<Secret<String>>,
}

/// Everything the webhook route needs to accept an event.
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub secret: Secret<String>,
    pub signature_header: String,
    /// Maximum age of a signature. Zero disables the check.
    pub tolerance: Duration,
    /// Upper bound on handling a single webhook call.
    pub timeout: Duration,
    /// If supplied, webhook calls are only accepted from these addresses.
    /// To explicitly disable the whitelist, set `STORE_GATEWAY_IP_WHITELIST` to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl WebhookConfig {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Secret::new(secret.to_string()),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            tolerance: DEFAULT_SIGNATURE_TOLERANCE,
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
            whitelist: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.secret.clone(), self.tolerance)
    }

    fn from_env(secret: Secret<String>) -> Self {
        let signature_header =
            env_string("STORE_SIGNATURE_HEADER").unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.to_string());
        let tolerance = env_duration_secs("STORE_SIGNATURE_TOLERANCE_SECS", DEFAULT_SIGNATURE_TOLERANCE);
        if tolerance.is_zero() {
            warn!("🪛️ STORE_SIGNATURE_TOLERANCE_SECS is 0. Signature timestamps will not be checked for replays.");
        }
        let timeout = env_duration_secs("STORE_WEBHOOK_TIMEOUT_SECS", DEFAULT_WEBHOOK_TIMEOUT);
        let whitelist = env::var("STORE_GATEWAY_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The gateway IP whitelist was configured, but is empty.  The server will run, but won't \
                     accept any payment events."
                );
            },
            None => {
                info!("🪛️ No gateway IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Gateway IP whitelist: {addrs}");
            },
        }
        Self { secret, signature_header, tolerance, timeout, whitelist }
    }
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Gateway IP whitelist is disabled. If this is not what you want, set STORE_GATEWAY_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in STORE_GATEWAY_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect();
    Some(ip_addrs)
}

impl ServerConfig {
    /// Loads the configuration from the environment. Every missing required variable is named in the error.
    pub fn try_from_env() -> Result<Self, ServerError> {
        let missing = REQUIRED_ENVS.iter().filter(|name| env_string(name).is_none()).copied().collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ServerError::ConfigurationError(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        let host = env_string("STORE_HOST").unwrap_or_else(|| DEFAULT_STORE_HOST.into());
        let port = env_string("STORE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for STORE_PORT. {e} Using the default, {DEFAULT_STORE_PORT}, \
                         instead."
                    );
                    DEFAULT_STORE_PORT
                })
            })
            .unwrap_or(DEFAULT_STORE_PORT);
        let database_url = env_string("STORE_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ STORE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let db_max_connections = env_string("STORE_DB_MAX_CONNECTIONS")
            .map(|s| {
                s.parse::<u32>().ok().filter(|n| *n > 0).unwrap_or_else(|| {
                    warn!("🪛️ Invalid value for STORE_DB_MAX_CONNECTIONS ({s}). Using {DEFAULT_DB_MAX_CONNECTIONS}.");
                    DEFAULT_DB_MAX_CONNECTIONS
                })
            })
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let secret = env_string("STORE_WEBHOOK_SECRET").map(Secret::new).unwrap_or_default();
        let webhook = WebhookConfig::from_env(secret);
        let use_x_forwarded_for = env_flag("STORE_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("STORE_USE_FORWARDED", false);
        let pod = PodConfig::try_from_env().map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
        let catalog_path = env_string("STORE_PRODUCT_CATALOG");
        let email = EmailConfig::try_from_env()?;
        let operator_email = env_string("STORE_OPERATOR_EMAIL").unwrap_or_default();
        let admin_api_key = env_string("STORE_ADMIN_API_KEY").map(Secret::new);
        if admin_api_key.is_none() {
            info!("🪛️ STORE_ADMIN_API_KEY is not set. The /api endpoints are disabled.");
        }
        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
            webhook,
            use_x_forwarded_for,
            use_forwarded,
            pod,
            catalog_path,
            email,
            operator_email,
            admin_api_key,
        })
    }

    /// The webhook bound should leave room for two provider calls and three email sends. Returns false, with a
    /// warning, when it does not.
    pub fn check_timeouts(&self) -> bool {
        let worst_case = self.pod.timeout * 2 + self.email.timeout * 3;
        let ok = worst_case < self.webhook.timeout;
        if !ok {
            warn!(
                "🪛️ STORE_WEBHOOK_TIMEOUT_SECS ({}s) is not longer than the worst case for fulfillment and \
                 notifications ({}s). Slow orders will be answered before they are fulfilled.",
                self.webhook.timeout.as_secs(),
                worst_case.as_secs()
            );
        }
        ok
    }
}
