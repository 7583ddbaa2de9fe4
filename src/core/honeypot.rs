//! Honeypot responder for the edge interdiction service.
//!
//! Builds deceptive, deliberately slow responses for requests the classifier
//! diverted to decoys. Delay bands escalate with how hostile the request
//! looks. The responder only computes the response; the caller waits.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;

use crate::core::classifier::{RequestDescriptor, Verdict};
use crate::models::{DelayRange, HoneypotConfig};

/// Deceptive response to send after `delay`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoyResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

/// Decoy response generator
#[derive(Debug, Clone)]
pub struct HoneypotResponder {
    config: HoneypotConfig,
}

impl HoneypotResponder {
    /// Create a new responder instance
    pub fn new(config: HoneypotConfig) -> Self {
        Self { config }
    }

    /// Decoy for `verdict`, or `None` when the verdict is not a decoy verdict
    pub fn respond(&self, verdict: Verdict, request: &RequestDescriptor<'_>) -> Option<DecoyResponse> {
        let (status, body, range) = match verdict {
            Verdict::Honeypot if request.method.eq_ignore_ascii_case("POST") => {
                (500, database_error_page(), self.config.decoy_post)
            }
            Verdict::Honeypot => (200, maintenance_page(), self.config.decoy_get),
            Verdict::ScriptCatchAll => (
                404,
                not_found_page(request.path, &self.config.server_banner),
                self.config.script_catch_all,
            ),
            Verdict::AttackPattern => (
                403,
                forbidden_page(request.path, &self.config.server_banner),
                self.config.attack_pattern,
            ),
            Verdict::Allow | Verdict::BlockPath | Verdict::BlockAgent => return None,
        };

        Some(DecoyResponse {
            status,
            body,
            delay: jitter(range),
        })
    }
}

fn jitter(range: DelayRange) -> Duration {
    if range.min_ms >= range.max_ms {
        return Duration::from_millis(range.min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(range.min_ms..=range.max_ms))
}

fn maintenance_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="30">
<title>Maintenance</title>
</head>
<body>
<h1>Briefly unavailable for scheduled maintenance.</h1>
<p>Loading configuration, please wait&hellip;</p>
</body>
</html>
"#
    .to_string()
}

fn database_error_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Database Error</title>
</head>
<body>
<h1>Error establishing a database connection</h1>
<p>The server could not reach the database. Retrying&hellip;</p>
<script>setTimeout(function () { window.location.reload(); }, 10000);</script>
</body>
</html>
"#
    .to_string()
}

fn not_found_page(path: &str, banner: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>404 Not Found</title></head>
<body>
<h1>Not Found</h1>
<p>The requested URL {} was not found on this server.</p>
<hr>
<address>{} Server at localhost Port 80</address>
<p>{}</p>
</body>
</html>
"#,
        escape_html(path),
        escape_html(banner),
        Utc::now().format("%a, %d %b %Y %H:%M:%S GMT"),
    )
}

fn forbidden_page(path: &str, banner: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>403 Forbidden</title></head>
<body>
<h1>Forbidden</h1>
<p>You don't have permission to access {} on this server.</p>
<hr>
<address>{} Server at localhost Port 80</address>
</body>
</html>
"#,
        escape_html(path),
        escape_html(banner),
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responder() -> HoneypotResponder {
        HoneypotResponder::new(HoneypotConfig::default())
    }

    fn within(delay: Duration, min_ms: u64, max_ms: u64) -> bool {
        delay >= Duration::from_millis(min_ms) && delay <= Duration::from_millis(max_ms)
    }

    #[test]
    fn test_decoy_get_is_maintenance_page() {
        let request = RequestDescriptor::new("/wp-admin/setup-config.php", "GET", None);
        for _ in 0..50 {
            let decoy = responder().respond(Verdict::Honeypot, &request).unwrap();
            assert_eq!(decoy.status, 200);
            assert!(decoy.body.contains(r#"http-equiv="refresh""#));
            assert!(within(decoy.delay, 5_000, 15_000), "{:?}", decoy.delay);
        }
    }

    #[test]
    fn test_decoy_post_is_database_error() {
        let request = RequestDescriptor::new("/wp-login.php", "POST", Some("Mozilla/5.0"));
        for _ in 0..50 {
            let decoy = responder().respond(Verdict::Honeypot, &request).unwrap();
            assert_eq!(decoy.status, 500);
            assert!(decoy.body.contains("database connection"));
            assert!(decoy.body.contains("location.reload()"));
            assert!(within(decoy.delay, 8_000, 23_000), "{:?}", decoy.delay);
        }
    }

    #[test]
    fn test_catch_all_and_attack_pages() {
        let request = RequestDescriptor::new("/<script>.php", "GET", None);
        let decoy = responder().respond(Verdict::ScriptCatchAll, &request).unwrap();
        assert_eq!(decoy.status, 404);
        assert!(decoy.body.contains("Apache/2.4.41 (Ubuntu) Server at"));
        assert!(decoy.body.contains("/&lt;script&gt;.php"));
        assert!(decoy.body.contains("GMT"));
        assert!(within(decoy.delay, 3_000, 10_000));

        let request = RequestDescriptor::new("/cgi-bin/test", "GET", None);
        let decoy = responder().respond(Verdict::AttackPattern, &request).unwrap();
        assert_eq!(decoy.status, 403);
        assert!(decoy.body.contains("Forbidden"));
        assert!(decoy.body.contains("Apache/2.4.41"));
        assert!(within(decoy.delay, 15_000, 35_000));
    }

    #[test]
    fn test_non_decoy_verdicts_have_no_response() {
        let request = RequestDescriptor::new("/", "GET", None);
        for verdict in [Verdict::Allow, Verdict::BlockPath, Verdict::BlockAgent] {
            assert!(responder().respond(verdict, &request).is_none());
        }
    }

    #[test]
    fn test_configured_ranges_and_banner() {
        let responder = HoneypotResponder::new(HoneypotConfig {
            script_catch_all: DelayRange::new(0, 0),
            server_banner: "nginx/1.18.0".to_string(),
            ..HoneypotConfig::default()
        });
        let request = RequestDescriptor::new("/index.php", "GET", None);
        let decoy = responder.respond(Verdict::ScriptCatchAll, &request).unwrap();
        assert_eq!(decoy.delay, Duration::ZERO);
        assert!(decoy.body.contains("nginx/1.18.0 Server at"));
    }
}
