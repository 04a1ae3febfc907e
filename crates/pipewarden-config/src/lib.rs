//! Shared configuration for the pipewarden daemon.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then an optional
//! configuration file, then `PIPEWARDEN_*` environment variables, then CLI
//! flags. Every relative path is resolved against [`Config::base_dir`], so a
//! deployment can be relocated by overriding a single value.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::*;
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "PIPEWARDEN")]
pub struct Config {
    /// Host the HTTP control surface binds to.
    #[serde(default = "default_listen_host")]
    #[ortho_config(default = default_listen_host())]
    pub listen_host: String,
    /// Port the HTTP control surface binds to.
    #[serde(default = "default_listen_port")]
    #[ortho_config(default = default_listen_port())]
    pub listen_port: u16,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Encoding of daemon log events.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Root every relative path below is resolved against.
    #[serde(default = "default_base_dir")]
    #[ortho_config(default = default_base_dir())]
    pub base_dir: Utf8PathBuf,
    /// Directory receiving `<name>.out.log` and `<name>.err.log`.
    #[serde(default = "default_log_dir")]
    #[ortho_config(default = default_log_dir())]
    pub log_dir: Utf8PathBuf,

    /// Registry name of the inference engine.
    #[serde(default = "default_engine_name")]
    #[ortho_config(default = default_engine_name())]
    pub engine_name: String,
    /// Inference engine executable.
    #[serde(default = "default_engine_binary")]
    #[ortho_config(default = default_engine_binary())]
    pub engine_binary: Utf8PathBuf,
    /// Working directory of the inference engine.
    #[serde(default = "default_engine_workdir")]
    #[ortho_config(default = default_engine_workdir())]
    pub engine_workdir: Utf8PathBuf,
    /// Engine configuration used in web mode.
    #[serde(default = "default_engine_web_config")]
    #[ortho_config(default = default_engine_web_config())]
    pub engine_web_config: Utf8PathBuf,
    /// Engine configuration used in native mode.
    #[serde(default = "default_engine_native_config")]
    #[ortho_config(default = default_engine_native_config())]
    pub engine_native_config: Utf8PathBuf,

    /// Registry name of the media relay.
    #[serde(default = "default_relay_name")]
    #[ortho_config(default = default_relay_name())]
    pub relay_name: String,
    /// Media relay executable.
    #[serde(default = "default_relay_binary")]
    #[ortho_config(default = default_relay_binary())]
    pub relay_binary: Utf8PathBuf,
    /// Media relay configuration file.
    #[serde(default = "default_relay_config")]
    #[ortho_config(default = default_relay_config())]
    pub relay_config: Utf8PathBuf,
    /// Working directory of the media relay.
    #[serde(default = "default_relay_workdir")]
    #[ortho_config(default = default_relay_workdir())]
    pub relay_workdir: Utf8PathBuf,
    /// Host probed before the relay is started.
    #[serde(default = "default_relay_upstream_host")]
    #[ortho_config(default = default_relay_upstream_host())]
    pub relay_upstream_host: String,
    /// Port probed before the relay is started.
    #[serde(default = "default_relay_upstream_port")]
    #[ortho_config(default = DEFAULT_RELAY_UPSTREAM_PORT)]
    pub relay_upstream_port: u16,
    /// Milliseconds to wait for the relay upstream to bind.
    #[serde(default = "default_readiness_timeout_ms")]
    #[ortho_config(default = DEFAULT_READINESS_TIMEOUT_MS)]
    pub readiness_timeout_ms: u64,
    /// Milliseconds the reconcile guard outlives an operator action.
    #[serde(default = "default_settle_delay_ms")]
    #[ortho_config(default = DEFAULT_SETTLE_DELAY_MS)]
    pub settle_delay_ms: u64,

    /// Interpreter used to run the helper scripts.
    #[serde(default = "default_helper_interpreter")]
    #[ortho_config(default = default_helper_interpreter())]
    pub helper_interpreter: String,
    /// Registry name of the LED notifier.
    #[serde(default = "default_notifier_name")]
    #[ortho_config(default = default_notifier_name())]
    pub notifier_name: String,
    /// LED notifier script.
    #[serde(default = "default_notifier_script")]
    #[ortho_config(default = default_notifier_script())]
    pub notifier_script: Utf8PathBuf,
    /// Registry name of the metrics forwarder.
    #[serde(default = "default_forwarder_name")]
    #[ortho_config(default = default_forwarder_name())]
    pub forwarder_name: String,
    /// Metrics forwarder script.
    #[serde(default = "default_forwarder_script")]
    #[ortho_config(default = default_forwarder_script())]
    pub forwarder_script: Utf8PathBuf,
    /// Registry name of the telemetry publisher.
    #[serde(default = "default_telemetry_name")]
    #[ortho_config(default = default_telemetry_name())]
    pub telemetry_name: String,
    /// Telemetry publisher script.
    #[serde(default = "default_telemetry_script")]
    #[ortho_config(default = default_telemetry_script())]
    pub telemetry_script: Utf8PathBuf,
    /// Registry name of the relay actuator emulator.
    #[serde(default = "default_emulator_name")]
    #[ortho_config(default = default_emulator_name())]
    pub emulator_name: String,
    /// Relay actuator emulator script.
    #[serde(default = "default_emulator_script")]
    #[ortho_config(default = default_emulator_script())]
    pub emulator_script: Utf8PathBuf,

    /// Broker host handed to the engine and helpers.
    #[serde(default = "default_mqtt_host")]
    #[ortho_config(default = default_mqtt_host())]
    pub mqtt_host: String,
    /// Broker port handed to the engine and helpers.
    #[serde(default = "default_mqtt_port")]
    #[ortho_config(default = DEFAULT_MQTT_PORT)]
    pub mqtt_port: u16,
    /// Topic the engine publishes person counts on.
    #[serde(default = "default_mqtt_topic")]
    #[ortho_config(default = default_mqtt_topic())]
    pub mqtt_topic: String,
    /// Client identifier for the engine's broker session.
    #[serde(default)]
    pub mqtt_client_id: Option<String>,
    /// Topic the notifier subscribes to for LED toggles.
    #[serde(default = "default_led_toggle_topic")]
    #[ortho_config(default = default_led_toggle_topic())]
    pub led_toggle_topic: String,
    /// GPIO pin driven by the notifier.
    #[serde(default = "default_led_pin")]
    #[ortho_config(default = default_led_pin())]
    pub led_pin: u16,
    /// Seconds the LED stays lit after a detection.
    #[serde(default = "default_led_hold_secs")]
    #[ortho_config(default = default_led_hold_secs())]
    pub led_hold_secs: u64,

    /// Whether the forwarder mirrors metrics to the cloud.
    #[serde(default)]
    #[ortho_config(default = false)]
    pub cloud_enabled: bool,
    /// Provider label reported in the status snapshot.
    #[serde(default = "default_cloud_provider")]
    #[ortho_config(default = default_cloud_provider())]
    pub cloud_provider: String,
    /// Heartbeat file rewritten by the forwarder.
    #[serde(default = "default_heartbeat_path")]
    #[ortho_config(default = default_heartbeat_path())]
    pub heartbeat_path: Utf8PathBuf,
    /// Maximum heartbeat age, in seconds, still reported as healthy.
    #[serde(default = "default_heartbeat_ttl_secs")]
    #[ortho_config(default = DEFAULT_HEARTBEAT_TTL_SECS, cli_short = 'k')]
    pub heartbeat_ttl_secs: u64,
}

const fn default_relay_upstream_port() -> u16 {
    DEFAULT_RELAY_UPSTREAM_PORT
}

const fn default_readiness_timeout_ms() -> u64 {
    DEFAULT_READINESS_TIMEOUT_MS
}

const fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

const fn default_mqtt_port() -> u16 {
    DEFAULT_MQTT_PORT
}

const fn default_heartbeat_ttl_secs() -> u64 {
    DEFAULT_HEARTBEAT_TTL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            base_dir: default_base_dir(),
            log_dir: default_log_dir(),
            engine_name: default_engine_name(),
            engine_binary: default_engine_binary(),
            engine_workdir: default_engine_workdir(),
            engine_web_config: default_engine_web_config(),
            engine_native_config: default_engine_native_config(),
            relay_name: default_relay_name(),
            relay_binary: default_relay_binary(),
            relay_config: default_relay_config(),
            relay_workdir: default_relay_workdir(),
            relay_upstream_host: default_relay_upstream_host(),
            relay_upstream_port: DEFAULT_RELAY_UPSTREAM_PORT,
            readiness_timeout_ms: DEFAULT_READINESS_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            helper_interpreter: default_helper_interpreter(),
            notifier_name: default_notifier_name(),
            notifier_script: default_notifier_script(),
            forwarder_name: default_forwarder_name(),
            forwarder_script: default_forwarder_script(),
            telemetry_name: default_telemetry_name(),
            telemetry_script: default_telemetry_script(),
            emulator_name: default_emulator_name(),
            emulator_script: default_emulator_script(),
            mqtt_host: default_mqtt_host(),
            mqtt_port: DEFAULT_MQTT_PORT,
            mqtt_topic: default_mqtt_topic(),
            mqtt_client_id: None,
            led_toggle_topic: default_led_toggle_topic(),
            led_pin: default_led_pin(),
            led_hold_secs: default_led_hold_secs(),
            cloud_enabled: false,
            cloud_provider: default_cloud_provider(),
            heartbeat_path: default_heartbeat_path(),
            heartbeat_ttl_secs: DEFAULT_HEARTBEAT_TTL_SECS,
        }
    }
}

impl Config {
    /// Loads the configuration from the process arguments, environment and
    /// optional file.
    ///
    /// # Errors
    ///
    /// Returns the loader error when parsing or merging any layer fails.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads the configuration from an explicit argument list.
    ///
    /// # Errors
    ///
    /// Returns the loader error when parsing or merging any layer fails.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Log filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Encoding of daemon log events.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// `host:port` the control surface binds to.
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }

    /// Resolves `path` against [`Self::base_dir`] unless it is absolute.
    #[must_use]
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Absolute-or-base-relative directory for process log sinks.
    #[must_use]
    pub fn resolved_log_dir(&self) -> Utf8PathBuf {
        self.resolve(&self.log_dir)
    }

    /// Absolute-or-base-relative heartbeat file path.
    #[must_use]
    pub fn resolved_heartbeat_path(&self) -> Utf8PathBuf {
        self.resolve(&self.heartbeat_path)
    }

    /// Bound on waiting for the relay upstream port.
    #[must_use]
    pub const fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    /// Delay before the reconcile guard is released.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Maximum heartbeat age reported as healthy.
    #[must_use]
    pub const fn heartbeat_ttl(&self) -> Duration {
        Duration::from_secs(self.heartbeat_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let config = Config {
            base_dir: Utf8PathBuf::from("/opt/pipeline"),
            ..Config::default()
        };
        assert_eq!(
            config.resolve(Utf8Path::new("mediamtx/mediamtx")),
            Utf8PathBuf::from("/opt/pipeline/mediamtx/mediamtx")
        );
        assert_eq!(
            config.resolved_log_dir(),
            Utf8PathBuf::from("/opt/pipeline/data/logs")
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        let config = Config::default();
        assert_eq!(
            config.resolve(Utf8Path::new("/usr/bin/mediamtx")),
            Utf8PathBuf::from("/usr/bin/mediamtx")
        );
    }

    #[test]
    fn durations_follow_configured_values() {
        let config = Config {
            readiness_timeout_ms: 250,
            settle_delay_ms: 10,
            heartbeat_ttl_secs: 3,
            ..Config::default()
        };
        assert_eq!(config.readiness_timeout(), Duration::from_millis(250));
        assert_eq!(config.settle_delay(), Duration::from_millis(10));
        assert_eq!(config.heartbeat_ttl(), Duration::from_secs(3));
    }

    #[test]
    fn short_flags_are_unique_and_parse() {
        let config = Config::load_from_iter(["pipewardend", "-k", "12", "--listen-port", "9091"])
            .expect("arguments should parse");
        assert_eq!(config.heartbeat_ttl_secs, 12);
        assert_eq!(config.listen_port, 9091);
    }

    #[test]
    fn listen_address_joins_host_and_port() {
        assert_eq!(Config::default().listen_address(), "127.0.0.1:8081");
    }
}
