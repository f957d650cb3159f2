use super::request::AjaxEndpoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(50);
pub const DEFAULT_MAX_DELAY_FACTOR: u32 = 3;
pub const DEFAULT_PENDING_KEY: &str = "core/amd:scheduled-pending";

/// Site and scheduling settings for the batching scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AjaxConfig {
    /// Site root, e.g. `https://lms.example.org`
    pub wwwroot: String,

    /// Session key appended to every service URL
    pub sesskey: String,

    /// Postponement added per enqueue
    #[serde(with = "duration_ms", rename = "delay_ms")]
    pub delay: Duration,

    /// Accumulated postponement stops growing at `delay * max_delay_factor`
    pub max_delay_factor: u32,

    /// Key under which scheduled work is reported as pending
    pub pending_key: String,
}

impl Default for AjaxConfig {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl AjaxConfig {
    pub fn new(wwwroot: &str, sesskey: &str) -> Self {
        Self {
            wwwroot: wwwroot.trim_end_matches('/').to_string(),
            sesskey: sesskey.to_string(),
            delay: DEFAULT_DELAY,
            max_delay_factor: DEFAULT_MAX_DELAY_FACTOR,
            pending_key: DEFAULT_PENDING_KEY.to_string(),
        }
    }

    /// Set the per-enqueue delay
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the delay cap factor
    pub fn max_delay_factor(mut self, factor: u32) -> Self {
        self.max_delay_factor = factor;
        self
    }

    /// Set the pending indicator key
    pub fn pending_key(mut self, key: &str) -> Self {
        self.pending_key = key.to_string();
        self
    }

    /// Longest accumulated postponement.
    pub fn max_delay(&self) -> Duration {
        self.delay * self.max_delay_factor
    }

    pub fn service_url(&self, endpoint: AjaxEndpoint) -> String {
        format!(
            "{}/lib/ajax/{}?sesskey={}",
            self.wwwroot,
            endpoint.script(),
            self.sesskey
        )
    }

    /// Parse from a site URL carrying the session key
    ///
    /// Format: "https://host[/path]?sesskey=KEY"
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = AjaxConfig::from_url("https://lms.example.org/?sesskey=abc123")?;
    /// ```
    pub fn from_url(url: &str) -> Result<Self, String> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err("URL must start with 'http://' or 'https://'".to_string());
        }

        let (root, query) = url
            .split_once('?')
            .ok_or_else(|| "URL has no query string with a sesskey".to_string())?;

        let sesskey = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| *name == "sesskey")
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| "URL has no sesskey parameter".to_string())?;

        let config = Self::new(root, sesskey);
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.wwwroot.is_empty() {
            return Err("wwwroot cannot be empty".to_string());
        }

        if self.delay.is_zero() {
            return Err("delay must be > 0".to_string());
        }

        if self.max_delay_factor == 0 {
            return Err("max_delay_factor must be > 0".to_string());
        }

        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AjaxConfig::new("https://lms.example.org/", "abc");
        assert_eq!(config.wwwroot, "https://lms.example.org");
        assert_eq!(config.delay, Duration::from_millis(50));
        assert_eq!(config.max_delay(), Duration::from_millis(150));
        assert_eq!(config.pending_key, "core/amd:scheduled-pending");
    }

    #[test]
    fn test_service_urls() {
        let config = AjaxConfig::new("https://lms.example.org", "abc");
        assert_eq!(
            config.service_url(AjaxEndpoint::Session),
            "https://lms.example.org/lib/ajax/service.php?sesskey=abc"
        );
        assert_eq!(
            config.service_url(AjaxEndpoint::NoLogin),
            "https://lms.example.org/lib/ajax/service-nologin.php?sesskey=abc"
        );
    }

    #[test]
    fn test_from_url() {
        let config = AjaxConfig::from_url("https://lms.example.org/moodle/?lang=en&sesskey=k1").unwrap();
        assert_eq!(config.wwwroot, "https://lms.example.org/moodle");
        assert_eq!(config.sesskey, "k1");

        assert!(AjaxConfig::from_url("ftp://lms.example.org/?sesskey=k1").is_err());
        assert!(AjaxConfig::from_url("https://lms.example.org/").is_err());
        assert!(AjaxConfig::from_url("https://lms.example.org/?sesskey=").is_err());
    }

    #[test]
    fn test_json_round_trip_uses_millis() {
        let config: AjaxConfig =
            serde_json::from_str(r#"{"wwwroot":"https://a.example","sesskey":"s","delay_ms":20}"#).unwrap();
        assert_eq!(config.delay, Duration::from_millis(20));
        assert_eq!(config.max_delay_factor, 3);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["delay_ms"], 20);
    }
}
