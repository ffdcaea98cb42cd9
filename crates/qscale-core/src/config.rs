//! qscale.toml configuration parser.
//!
//! Configuration arrives in layers: an optional TOML file, then command
//! line flags (or their environment variables). Each layer is a
//! [`RawConfig`] where every field is optional; [`RawConfig::merge`] lets a
//! later layer override an earlier one and [`RawConfig::resolve`] applies
//! defaults and validation to produce the immutable [`ScalerConfig`] the
//! control loop runs with.
//!
//! ```toml
//! [scaling]
//! poll_interval = "5s"
//! scale_up_cooldown = "10s"
//! scale_down_cooldown = "30s"
//! scale_up_messages = 100
//! scale_down_messages = 10
//! min_replicas = 1
//! max_replicas = 5
//!
//! [queue]
//! url = "https://sqs.us-east-1.amazonaws.com/123456789012/jobs"
//! region = "us-east-1"
//!
//! [workload]
//! namespace = "default"
//! name = "worker"
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SCALE_UP_COOLDOWN: Duration = Duration::from_secs(10);
pub const DEFAULT_SCALE_DOWN_COOLDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_SCALE_UP_MESSAGES: u64 = 100;
pub const DEFAULT_SCALE_DOWN_MESSAGES: u64 = 10;
pub const DEFAULT_MIN_REPLICAS: i32 = 1;
pub const DEFAULT_MAX_REPLICAS: i32 = 5;
pub const DEFAULT_NAMESPACE: &str = "default";

// ── Resolved configuration ────────────────────────────────────────

/// Fully resolved, validated configuration. Never mutated after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalerConfig {
    pub scaling: ScalingConfig,
    pub queue: QueueConfig,
    pub workload: WorkloadRef,
}

/// Thresholds, cooldowns, cadence and bounds of the scaling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingConfig {
    pub poll_interval: Duration,
    pub scale_up_cooldown: Duration,
    pub scale_down_cooldown: Duration,
    /// Backlog at or above which a scale-up is requested.
    pub scale_up_messages: u64,
    /// Backlog at or below which a scale-down is requested.
    pub scale_down_messages: u64,
    pub min_replicas: i32,
    pub max_replicas: i32,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            scale_up_cooldown: DEFAULT_SCALE_UP_COOLDOWN,
            scale_down_cooldown: DEFAULT_SCALE_DOWN_COOLDOWN,
            scale_up_messages: DEFAULT_SCALE_UP_MESSAGES,
            scale_down_messages: DEFAULT_SCALE_DOWN_MESSAGES,
            min_replicas: DEFAULT_MIN_REPLICAS,
            max_replicas: DEFAULT_MAX_REPLICAS,
        }
    }
}

impl ScalingConfig {
    /// Reject settings that would make the policy misbehave.
    ///
    /// With `scale_up_messages <= scale_down_messages` both thresholds could
    /// match the same backlog; that is refused here rather than left to the
    /// scale-up-first tie-break.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.min_replicas < 0 {
            return Err(ConfigError::Invalid(format!(
                "min_replicas must not be negative (got {})",
                self.min_replicas
            )));
        }
        if self.min_replicas > self.max_replicas {
            return Err(ConfigError::Invalid(format!(
                "min_replicas ({}) must not exceed max_replicas ({})",
                self.min_replicas, self.max_replicas
            )));
        }
        if self.scale_up_messages <= self.scale_down_messages {
            return Err(ConfigError::Invalid(format!(
                "scale_up_messages ({}) must be greater than scale_down_messages ({})",
                self.scale_up_messages, self.scale_down_messages
            )));
        }
        Ok(())
    }
}

/// Where the backlog is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub url: String,
    /// AWS region; the SDK default chain is used when unset.
    pub region: Option<String>,
    /// Endpoint override, e.g. a local SQS emulator.
    pub endpoint: Option<String>,
}

/// Namespace + name of the workload being scaled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
}

impl WorkloadRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl ScalerConfig {
    /// Render as TOML, in the same shape [`RawConfig`] reads.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(&RawConfig::from(self))?)
    }
}

// ── Raw (layered) configuration ───────────────────────────────────

/// One configuration layer. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub scaling: RawScaling,
    #[serde(default)]
    pub queue: RawQueue,
    #[serde(default)]
    pub workload: RawWorkload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScaling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_up_cooldown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_down_cooldown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_up_messages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_down_messages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawQueue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWorkload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RawConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Layer `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merge(self, overrides: RawConfig) -> RawConfig {
        let (base, over) = (self, overrides);
        RawConfig {
            scaling: RawScaling {
                poll_interval: over.scaling.poll_interval.or(base.scaling.poll_interval),
                scale_up_cooldown: over
                    .scaling
                    .scale_up_cooldown
                    .or(base.scaling.scale_up_cooldown),
                scale_down_cooldown: over
                    .scaling
                    .scale_down_cooldown
                    .or(base.scaling.scale_down_cooldown),
                scale_up_messages: over
                    .scaling
                    .scale_up_messages
                    .or(base.scaling.scale_up_messages),
                scale_down_messages: over
                    .scaling
                    .scale_down_messages
                    .or(base.scaling.scale_down_messages),
                min_replicas: over.scaling.min_replicas.or(base.scaling.min_replicas),
                max_replicas: over.scaling.max_replicas.or(base.scaling.max_replicas),
            },
            queue: RawQueue {
                url: over.queue.url.or(base.queue.url),
                region: over.queue.region.or(base.queue.region),
                endpoint: over.queue.endpoint.or(base.queue.endpoint),
            },
            workload: RawWorkload {
                namespace: over.workload.namespace.or(base.workload.namespace),
                name: over.workload.name.or(base.workload.name),
            },
        }
    }

    /// Apply defaults, parse durations and validate.
    pub fn resolve(self) -> ConfigResult<ScalerConfig> {
        let s = self.scaling;
        let scaling = ScalingConfig {
            poll_interval: resolve_duration("poll_interval", s.poll_interval, DEFAULT_POLL_INTERVAL)?,
            scale_up_cooldown: resolve_duration(
                "scale_up_cooldown",
                s.scale_up_cooldown,
                DEFAULT_SCALE_UP_COOLDOWN,
            )?,
            scale_down_cooldown: resolve_duration(
                "scale_down_cooldown",
                s.scale_down_cooldown,
                DEFAULT_SCALE_DOWN_COOLDOWN,
            )?,
            scale_up_messages: s.scale_up_messages.unwrap_or(DEFAULT_SCALE_UP_MESSAGES),
            scale_down_messages: s.scale_down_messages.unwrap_or(DEFAULT_SCALE_DOWN_MESSAGES),
            min_replicas: s.min_replicas.unwrap_or(DEFAULT_MIN_REPLICAS),
            max_replicas: s.max_replicas.unwrap_or(DEFAULT_MAX_REPLICAS),
        };
        scaling.validate()?;

        let queue = QueueConfig {
            url: required("queue.url", self.queue.url)?,
            region: non_empty(self.queue.region),
            endpoint: non_empty(self.queue.endpoint),
        };

        let workload = WorkloadRef {
            namespace: non_empty(self.workload.namespace)
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            name: required("workload.name", self.workload.name)?,
        };

        Ok(ScalerConfig {
            scaling,
            queue,
            workload,
        })
    }
}

impl From<&ScalerConfig> for RawConfig {
    fn from(config: &ScalerConfig) -> Self {
        let s = &config.scaling;
        RawConfig {
            scaling: RawScaling {
                poll_interval: Some(format_duration(s.poll_interval)),
                scale_up_cooldown: Some(format_duration(s.scale_up_cooldown)),
                scale_down_cooldown: Some(format_duration(s.scale_down_cooldown)),
                scale_up_messages: Some(s.scale_up_messages),
                scale_down_messages: Some(s.scale_down_messages),
                min_replicas: Some(s.min_replicas),
                max_replicas: Some(s.max_replicas),
            },
            queue: RawQueue {
                url: Some(config.queue.url.clone()),
                region: config.queue.region.clone(),
                endpoint: config.queue.endpoint.clone(),
            },
            workload: RawWorkload {
                namespace: Some(config.workload.namespace.clone()),
                name: Some(config.workload.name.clone()),
            },
        }
    }
}

fn resolve_duration(
    field: &'static str,
    value: Option<String>,
    default: Duration,
) -> ConfigResult<Duration> {
    match value {
        Some(v) => parse_duration(&v).ok_or(ConfigError::InvalidDuration { field, value: v }),
        None => Ok(default),
    }
}

fn required(field: &'static str, value: Option<String>) -> ConfigResult<String> {
    non_empty(value).ok_or(ConfigError::Missing(field))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── Durations ─────────────────────────────────────────────────────

/// Parse a duration string like "500ms", "30s", "5m", "1h" or a bare
/// number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Inverse of [`parse_duration`], picking the largest exact unit.
pub fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() != 0 {
        return format!("{}ms", d.as_millis());
    }
    let secs = d.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal() -> RawConfig {
        RawConfig {
            queue: RawQueue {
                url: Some("https://sqs.example/jobs".to_string()),
                ..Default::default()
            },
            workload: RawWorkload {
                name: Some("worker".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn resolve_applies_defaults() {
        let config = minimal().resolve().unwrap();
        assert_eq!(config.scaling, ScalingConfig::default());
        assert_eq!(config.workload, WorkloadRef::new("default", "worker"));
        assert_eq!(config.queue.url, "https://sqs.example/jobs");
        assert_eq!(config.queue.region, None);
    }

    #[test]
    fn resolve_requires_queue_and_workload() {
        let mut raw = minimal();
        raw.queue.url = None;
        assert!(matches!(raw.resolve(), Err(ConfigError::Missing("queue.url"))));

        let mut raw = minimal();
        raw.workload.name = Some("  ".to_string());
        assert!(matches!(raw.resolve(), Err(ConfigError::Missing("workload.name"))));
    }

    #[test]
    fn resolve_rejects_inverted_thresholds() {
        let mut raw = minimal();
        raw.scaling.scale_up_messages = Some(10);
        raw.scaling.scale_down_messages = Some(10);
        assert!(matches!(raw.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn resolve_rejects_inverted_bounds() {
        let mut raw = minimal();
        raw.scaling.min_replicas = Some(6);
        raw.scaling.max_replicas = Some(5);
        assert!(matches!(raw.resolve(), Err(ConfigError::Invalid(_))));

        let mut raw = minimal();
        raw.scaling.min_replicas = Some(-1);
        assert!(matches!(raw.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn resolve_rejects_zero_poll_interval() {
        let mut raw = minimal();
        raw.scaling.poll_interval = Some("0s".to_string());
        assert!(matches!(raw.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn resolve_reports_bad_duration_field() {
        let mut raw = minimal();
        raw.scaling.scale_up_cooldown = Some("soon".to_string());
        match raw.resolve() {
            Err(ConfigError::InvalidDuration { field, value }) => {
                assert_eq!(field, "scale_up_cooldown");
                assert_eq!(value, "soon");
            }
            other => panic!("expected InvalidDuration, got {other:?}"),
        }
    }

    #[test]
    fn merge_prefers_overrides() {
        let mut file = minimal();
        file.scaling.max_replicas = Some(10);
        file.scaling.min_replicas = Some(2);
        file.queue.region = Some("eu-west-1".to_string());

        let flags = RawConfig {
            scaling: RawScaling {
                max_replicas: Some(20),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = file.merge(flags).resolve().unwrap();
        assert_eq!(config.scaling.max_replicas, 20);
        assert_eq!(config.scaling.min_replicas, 2);
        assert_eq!(config.queue.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn parse_full_file() {
        let toml_str = r#"
[scaling]
poll_interval = "1s"
scale_up_cooldown = "2m"
scale_down_cooldown = "500ms"
scale_up_messages = 50
scale_down_messages = 5
min_replicas = 0
max_replicas = 8

[queue]
url = "https://sqs.us-east-1.amazonaws.com/1/jobs"
region = "us-east-1"
endpoint = "http://localhost:4566"

[workload]
namespace = "batch"
name = "consumer"
"#;
        let config = RawConfig::from_toml_str(toml_str).unwrap().resolve().unwrap();
        assert_eq!(config.scaling.poll_interval, Duration::from_secs(1));
        assert_eq!(config.scaling.scale_up_cooldown, Duration::from_secs(120));
        assert_eq!(config.scaling.scale_down_cooldown, Duration::from_millis(500));
        assert_eq!(config.scaling.min_replicas, 0);
        assert_eq!(config.queue.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.workload.to_string(), "batch/consumer");
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let toml_str = r#"
[scaling]
max_pods = 5
"#;
        assert!(matches!(
            RawConfig::from_toml_str(toml_str),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_file_reads_and_reports_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[workload]\nname = \"worker\"").unwrap();
        let raw = RawConfig::from_file(file.path()).unwrap();
        assert_eq!(raw.workload.name.as_deref(), Some("worker"));

        let missing = RawConfig::from_file(Path::new("/nonexistent/qscale.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn rendered_config_reads_back() {
        let config = minimal().resolve().unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("scale_down_cooldown = \"30s\""));

        let reparsed = RawConfig::from_toml_str(&rendered).unwrap().resolve().unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("12"), Some(Duration::from_secs(12)));
        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration("-5s"), None);
    }

    #[test]
    fn format_duration_values() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
