use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of worker threads (actix default when unset)
    pub workers: Option<usize>,
    /// Take the client address from `Forwarded` / `X-Forwarded-For`
    pub trust_forwarded_headers: bool,
    /// Value of the `Content-Security-Policy` header attached to every response
    pub content_security_policy: String,
}

/// Classifier configuration. Every list is matched as described on
/// [`crate::core::Classifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Case-insensitive substrings that hard-block a path
    pub blocked_path_substrings: Vec<String>,
    /// Case-insensitive substrings that hard-block a user agent
    pub suspicious_agent_substrings: Vec<String>,
    /// Decoy paths answered for GET/HEAD
    pub decoy_get_paths: Vec<String>,
    /// Decoy paths answered for POST
    pub decoy_post_paths: Vec<String>,
    /// Server-side scripting suffix this service never executes
    pub script_suffix: String,
    /// Regular expressions for shell, command and traversal probing
    pub attack_patterns: Vec<String>,
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Time window in seconds
    pub window_seconds: u64,
    /// Requests allowed per source address in one window
    pub max_requests: u32,
    /// Interval of the background sweep of expired buckets, in seconds
    pub cleanup_interval_seconds: u64,
}

/// Event store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStoreConfig {
    /// Maximum number of retained events; the oldest are evicted first
    pub capacity: usize,
    /// Number of events served by the logs endpoint
    pub recent_limit: usize,
    /// Number of entries in the `topPaths` statistic
    pub top_paths_limit: usize,
}

/// Inclusive delay range in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Honeypot responder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoneypotConfig {
    /// Delay for GET requests to decoy paths
    pub decoy_get: DelayRange,
    /// Delay for POST requests to decoy paths
    pub decoy_post: DelayRange,
    /// Delay for the scripting-suffix catch-all
    pub script_catch_all: DelayRange,
    /// Delay for attack-pattern matches
    pub attack_pattern: DelayRange,
    /// Fabricated server banner shown on decoy error pages
    pub server_banner: String,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder and serve `/metrics`
    pub enabled: bool,
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Classifier configuration
    pub classifier: ClassifierConfig,
    /// Rate limit configuration
    pub rate_limit: RateLimitConfig,
    /// Event store configuration
    pub event_store: EventStoreConfig,
    /// Honeypot configuration
    pub honeypot: HoneypotConfig,
    /// Metrics configuration
    pub metrics: MetricsConfig,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            trust_forwarded_headers: false,
            content_security_policy: "default-src 'self'; script-src 'self' 'unsafe-inline'; \
                                      style-src 'self' 'unsafe-inline'; img-src 'self' data:"
                .to_string(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            blocked_path_substrings: strings(&[
                "/phpmyadmin",
                "/pma/",
                "/myadmin",
                "/adminer",
                "/mysqladmin",
                "/.env",
                "/.git/",
                "/.svn/",
                "/.hg/",
                "/.ds_store",
                "/.aws/",
                "/server-status",
                "/wp-sitemap",
                "/sitemap_index.xml",
                "/joomla/administrator",
                "/typo3/",
            ]),
            suspicious_agent_substrings: strings(&[
                "curl",
                "wget",
                "python-requests",
                "python-urllib",
                "aiohttp",
                "go-http-client",
                "java/",
                "okhttp",
                "libwww-perl",
                "httpclient",
                "scrapy",
                "headlesschrome",
                "bot",
                "crawler",
                "spider",
                "scan",
                "exploit",
                "nikto",
                "sqlmap",
                "nmap",
                "zgrab",
            ]),
            decoy_get_paths: strings(&[
                "/wp-admin/setup-config.php",
                "/wp-admin/install.php",
                "/wp-config.php",
                "/wp-login.php",
                "/xmlrpc.php",
                "/administrator/index.php",
                "/admin/config.php",
                "/config.php",
                "/install.php",
                "/setup.php",
                "/phpinfo.php",
                "/user/login",
                "/admin/login",
            ]),
            decoy_post_paths: strings(&[
                "/wp-login.php",
                "/xmlrpc.php",
                "/wp-admin/admin-ajax.php",
                "/administrator/index.php",
                "/user/login",
                "/admin/login",
            ]),
            script_suffix: ".php".to_string(),
            attack_patterns: strings(&[
                r"(?i)^/\.well-known/.+\.(cgi|pl|sh|asp|aspx|jsp)$",
                r"(?i)/cgi-bin/",
                r"(?i)\b(shell|cmd|eval|exec)\b",
                r"(?i)^/(etc|proc|bin|usr|var|tmp|dev|root)/",
                r"\.\./",
                r"(?i)%2e%2e(%2f|/)",
                r"(?i)\.\.%2f",
            ]),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_requests: 50,
            cleanup_interval_seconds: 300,
        }
    }
}

impl RateLimitConfig {
    /// Get the counting window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    /// Get the cleanup sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            recent_limit: 100,
            top_paths_limit: 10,
        }
    }
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }
}

impl Default for HoneypotConfig {
    fn default() -> Self {
        Self {
            decoy_get: DelayRange::new(5_000, 15_000),
            decoy_post: DelayRange::new(8_000, 23_000),
            script_catch_all: DelayRange::new(3_000, 10_000),
            attack_pattern: DelayRange::new(15_000, 35_000),
            server_banner: "Apache/2.4.41 (Ubuntu)".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
