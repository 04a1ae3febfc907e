//! Built-in defaults matching the reference edge deployment.
//!
//! Paths are relative to [`crate::Config::base_dir`] unless absolute.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Address the control surface binds to.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Port the control surface binds to.
pub const DEFAULT_LISTEN_PORT: u16 = 8081;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Host the relay's upstream RTSP stream is published on.
pub const DEFAULT_RELAY_UPSTREAM_HOST: &str = "127.0.0.1";

/// Port the inference engine hands its RTSP stream off on.
pub const DEFAULT_RELAY_UPSTREAM_PORT: u16 = 8554;

/// Upper bound on waiting for the relay's upstream to bind.
pub const DEFAULT_READINESS_TIMEOUT_MS: u64 = 15_000;

/// Delay before the reconcile guard is released after an operator action.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;

/// Maximum heartbeat age that still counts as healthy.
pub const DEFAULT_HEARTBEAT_TTL_SECS: u64 = 30;

/// Provider label reported alongside the cloud status.
pub const DEFAULT_CLOUD_PROVIDER: &str = "dynamodb";

/// Broker used by the engine and the helper daemons.
pub const DEFAULT_MQTT_HOST: &str = "mqtt-dashboard.com";

/// Broker port used by the engine and the helper daemons.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Topic the engine publishes person counts on.
pub const DEFAULT_MQTT_TOPIC: &str = "deepstream/person_count";

/// Interpreter used for the Python helper daemons.
pub const DEFAULT_HELPER_INTERPRETER: &str = "python3";

/// Default log filter expression used by the daemon.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    String::from(DEFAULT_LOG_FILTER)
}

/// Default logging format for the daemon.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default listen host as an owned value.
#[must_use]
pub fn default_listen_host() -> String {
    String::from(DEFAULT_LISTEN_HOST)
}

/// Default listen port.
#[must_use]
pub const fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

/// Directory every relative path is resolved against.
#[must_use]
pub fn default_base_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("backend")
}

/// Directory receiving per-process stdout/stderr logs.
#[must_use]
pub fn default_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("data/logs")
}

/// Registry name of the inference engine.
#[must_use]
pub fn default_engine_name() -> String {
    String::from("deepstream")
}

/// Inference engine executable.
#[must_use]
pub fn default_engine_binary() -> Utf8PathBuf {
    Utf8PathBuf::from("deepstream/deepstream-test5-app")
}

/// Working directory of the inference engine.
#[must_use]
pub fn default_engine_workdir() -> Utf8PathBuf {
    Utf8PathBuf::from("deepstream")
}

/// Engine configuration producing the RTSP stream consumed by the relay.
#[must_use]
pub fn default_engine_web_config() -> Utf8PathBuf {
    Utf8PathBuf::from("deepstream/configs/DeepStream-Yolo/deepstream_app_config.txt")
}

/// Engine configuration rendering directly to the local display.
#[must_use]
pub fn default_engine_native_config() -> Utf8PathBuf {
    Utf8PathBuf::from("deepstream/configs/DeepStream-Yolo/deepstream_app_config_native.txt")
}

/// Registry name of the media relay.
#[must_use]
pub fn default_relay_name() -> String {
    String::from("mediamtx")
}

/// Media relay executable.
#[must_use]
pub fn default_relay_binary() -> Utf8PathBuf {
    Utf8PathBuf::from("mediamtx/mediamtx")
}

/// Media relay configuration file.
#[must_use]
pub fn default_relay_config() -> Utf8PathBuf {
    Utf8PathBuf::from("mediamtx/mediamtx.yml")
}

/// Working directory of the media relay.
#[must_use]
pub fn default_relay_workdir() -> Utf8PathBuf {
    Utf8PathBuf::from("mediamtx")
}

/// Default relay upstream host as an owned value.
#[must_use]
pub fn default_relay_upstream_host() -> String {
    String::from(DEFAULT_RELAY_UPSTREAM_HOST)
}

/// Registry name of the LED notifier started with the pipeline.
#[must_use]
pub fn default_notifier_name() -> String {
    String::from("led_notifier")
}

/// Script run by the LED notifier.
#[must_use]
pub fn default_notifier_script() -> Utf8PathBuf {
    Utf8PathBuf::from("mqtt/person_led_mqtt.py")
}

/// Registry name of the metrics forwarder that writes the heartbeat.
#[must_use]
pub fn default_forwarder_name() -> String {
    String::from("data_manager")
}

/// Script run by the metrics forwarder.
#[must_use]
pub fn default_forwarder_script() -> Utf8PathBuf {
    Utf8PathBuf::from("mqtt/data_manager.py")
}

/// Registry name of the device telemetry publisher.
#[must_use]
pub fn default_telemetry_name() -> String {
    String::from("telemetry")
}

/// Script run by the device telemetry publisher.
#[must_use]
pub fn default_telemetry_script() -> Utf8PathBuf {
    Utf8PathBuf::from("mqtt/jetson_telemetry.py")
}

/// Registry name of the relay actuator emulator.
#[must_use]
pub fn default_emulator_name() -> String {
    String::from("relay_emulator")
}

/// Script run by the relay actuator emulator.
#[must_use]
pub fn default_emulator_script() -> Utf8PathBuf {
    Utf8PathBuf::from("mqtt/relay_emulator.py")
}

/// Interpreter for the helper scripts as an owned value.
#[must_use]
pub fn default_helper_interpreter() -> String {
    String::from(DEFAULT_HELPER_INTERPRETER)
}

/// Heartbeat file rewritten by the metrics forwarder.
#[must_use]
pub fn default_heartbeat_path() -> Utf8PathBuf {
    Utf8PathBuf::from("data/ddb_heartbeat.json")
}

/// Default cloud provider label as an owned value.
#[must_use]
pub fn default_cloud_provider() -> String {
    String::from(DEFAULT_CLOUD_PROVIDER)
}

/// Default broker host as an owned value.
#[must_use]
pub fn default_mqtt_host() -> String {
    String::from(DEFAULT_MQTT_HOST)
}

/// Default engine topic as an owned value.
#[must_use]
pub fn default_mqtt_topic() -> String {
    String::from(DEFAULT_MQTT_TOPIC)
}

/// Topic the notifier listens on for LED toggles.
#[must_use]
pub fn default_led_toggle_topic() -> String {
    String::from("actuator/led_toggle")
}

/// GPIO pin driven by the notifier.
#[must_use]
pub const fn default_led_pin() -> u16 {
    7
}

/// Seconds the LED stays lit after a detection.
#[must_use]
pub const fn default_led_hold_secs() -> u64 {
    5
}
