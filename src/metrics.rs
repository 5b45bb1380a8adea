use std::{
    collections::BTreeMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicI64, Ordering},
    },
};

const NAMESPACE: &str = "domain_watch";

/// Sink for the gauges the monitor loop maintains.
pub trait Metrics: Send + Sync {
    /// Unix time of the last completed tick.
    fn set_last_tick(&self, unix: i64);
    /// Whether the last check of `domain` succeeded.
    fn set_update_success(&self, domain: &str, success: bool);
    /// Unix time at which `domain` expires.
    fn set_expiration(&self, domain: &str, unix: i64);
    /// Drops the expiration of `domain` once it is no longer known.
    fn clear_expiration(&self, domain: &str);
    /// Counts one more watched domain.
    fn add_domain(&self);

    /// Human-readable dump of the current values, if the sink keeps any.
    fn snapshot(&self) -> Option<String> {
        None
    }
}

/// In-memory gauge set, rendered in the Prometheus text format.
#[derive(Debug, Default)]
pub struct Gauges {
    last_tick: AtomicI64,
    domains: AtomicI64,
    success: Mutex<BTreeMap<String, bool>>,
    expiration: Mutex<BTreeMap<String, i64>>,
}

impl Gauges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_tick(&self) -> i64 {
        self.last_tick.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn domains(&self) -> i64 {
        self.domains.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn update_success(&self, domain: &str) -> Option<bool> {
        self.success
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
            .copied()
    }

    #[must_use]
    pub fn expiration(&self, domain: &str) -> Option<i64> {
        self.expiration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
            .copied()
    }

    /// Renders every gauge in the Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = gauge_header(
            "last_fetch_seconds",
            "Unix timestamp for when the last fetch occurred.",
        );
        out.push_str(&format!("{NAMESPACE}_last_fetch_seconds {}\n", self.last_tick()));

        out.push_str(&gauge_header("domains", "Number of domains that are being watched."));
        out.push_str(&format!("{NAMESPACE}_domains {}\n", self.domains()));

        out.push_str(&gauge_header("update_success", "Whether the last fetch succeeded."));
        let success = self.success.lock().unwrap_or_else(PoisonError::into_inner);
        for (domain, ok) in success.iter() {
            let value = u8::from(*ok);
            out.push_str(&format!("{NAMESPACE}_update_success{{domain=\"{domain}\"}} {value}\n"));
        }
        drop(success);

        out.push_str(&gauge_header(
            "expires_timestamp_seconds",
            "Unix timestamp for when the domain will expire.",
        ));
        let expiration = self.expiration.lock().unwrap_or_else(PoisonError::into_inner);
        for (domain, unix) in expiration.iter() {
            out.push_str(&format!(
                "{NAMESPACE}_expires_timestamp_seconds{{domain=\"{domain}\"}} {unix}\n"
            ));
        }

        out
    }
}

fn gauge_header(name: &str, help: &str) -> String {
    format!("# HELP {NAMESPACE}_{name} {help}\n# TYPE {NAMESPACE}_{name} gauge\n")
}

impl Metrics for Gauges {
    fn set_last_tick(&self, unix: i64) {
        self.last_tick.store(unix, Ordering::Relaxed);
    }

    fn set_update_success(&self, domain: &str, success: bool) {
        self.success
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(domain.to_string(), success);
    }

    fn set_expiration(&self, domain: &str, unix: i64) {
        self.expiration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(domain.to_string(), unix);
    }

    fn clear_expiration(&self, domain: &str) {
        self.expiration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(domain);
    }

    fn add_domain(&self) {
        self.domains.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Option<String> {
        Some(self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauges_record_values() {
        let gauges = Gauges::new();
        gauges.add_domain();
        gauges.add_domain();
        gauges.set_update_success("example.com", true);
        gauges.set_update_success("example.org", false);
        gauges.set_expiration("example.com", 1_900_000_000);
        gauges.set_last_tick(1_700_000_000);

        assert_eq!(gauges.domains(), 2);
        assert_eq!(gauges.last_tick(), 1_700_000_000);
        assert_eq!(gauges.update_success("example.com"), Some(true));
        assert_eq!(gauges.update_success("example.org"), Some(false));
        assert_eq!(gauges.update_success("example.net"), None);
        assert_eq!(gauges.expiration("example.com"), Some(1_900_000_000));
    }

    #[test]
    fn test_cleared_expiration_is_not_rendered() {
        let gauges = Gauges::new();
        gauges.set_expiration("example.com", 42);
        gauges.clear_expiration("example.com");

        assert_eq!(gauges.expiration("example.com"), None);
        assert!(!gauges.render().contains("{domain=\"example.com\"} 42"));
    }

    #[test]
    fn test_render() {
        let gauges = Gauges::new();
        gauges.add_domain();
        gauges.set_update_success("example.com", false);
        gauges.set_expiration("example.com", 42);

        let text = gauges.render();
        assert!(text.contains("domain_watch_domains 1\n"));
        assert!(text.contains("domain_watch_update_success{domain=\"example.com\"} 0\n"));
        assert!(
            text.contains("domain_watch_expires_timestamp_seconds{domain=\"example.com\"} 42\n")
        );
        assert!(text.contains("# TYPE domain_watch_last_fetch_seconds gauge\n"));
    }
}
