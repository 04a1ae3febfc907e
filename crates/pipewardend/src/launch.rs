//! Builds the [`LaunchSpec`] of every supervised role from configuration.

use camino::{Utf8Path, Utf8PathBuf};

use pipewarden_config::Config;

use crate::orchestrator::Mode;
use crate::registry::LaunchSpec;

/// Resolved launch recipes for the pipeline and the background services.
#[derive(Debug, Clone)]
pub struct LaunchCatalogue {
    config: Config,
    engine_binary: Utf8PathBuf,
    relay_binary: Utf8PathBuf,
}

impl LaunchCatalogue {
    /// Resolves every configured path against the base directory.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            engine_binary: config.resolve(&config.engine_binary),
            relay_binary: config.resolve(&config.relay_binary),
            config: config.clone(),
        }
    }

    /// Registry name of the inference engine.
    #[must_use]
    pub fn engine_name(&self) -> &str {
        &self.config.engine_name
    }

    /// Registry name of the media relay.
    #[must_use]
    pub fn relay_name(&self) -> &str {
        &self.config.relay_name
    }

    /// Registry name of the LED notifier.
    #[must_use]
    pub fn notifier_name(&self) -> &str {
        &self.config.notifier_name
    }

    /// Registry name of the metrics forwarder.
    #[must_use]
    pub fn forwarder_name(&self) -> &str {
        &self.config.forwarder_name
    }

    /// Names reported by the status endpoint, in start order.
    #[must_use]
    pub fn pipeline_names(&self) -> [&str; 3] {
        [self.engine_name(), self.relay_name(), self.notifier_name()]
    }

    /// Command-line pattern matching any engine instance, tracked or not.
    #[must_use]
    pub fn engine_pattern(&self) -> &Utf8Path {
        &self.engine_binary
    }

    /// Command-line pattern matching any relay instance, tracked or not.
    #[must_use]
    pub fn relay_pattern(&self) -> &Utf8Path {
        &self.relay_binary
    }

    /// Engine launch for the given output mode.
    #[must_use]
    pub fn engine(&self, mode: Mode) -> LaunchSpec {
        let config = &self.config;
        let engine_config = match mode {
            Mode::Web => &config.engine_web_config,
            Mode::Native => &config.engine_native_config,
        };
        let spec = LaunchSpec::new(&config.engine_name, self.engine_binary.clone())
            .arg("-c")
            .arg(config.resolve(engine_config).into_string())
            .current_dir(config.resolve(&config.engine_workdir))
            .env("MQTT_HOST", &config.mqtt_host)
            .env("MQTT_PORT", config.mqtt_port.to_string())
            .env("MQTT_TOPIC", &config.mqtt_topic);
        match &config.mqtt_client_id {
            Some(client_id) => spec.env("MQTT_CLIENT_ID", client_id),
            None => spec,
        }
    }

    /// Relay launch; it consumes the engine's RTSP hand-off.
    #[must_use]
    pub fn relay(&self) -> LaunchSpec {
        let config = &self.config;
        LaunchSpec::new(&config.relay_name, self.relay_binary.clone())
            .arg(config.resolve(&config.relay_config).into_string())
            .current_dir(config.resolve(&config.relay_workdir))
    }

    /// LED notifier launch, started last by the start operation.
    #[must_use]
    pub fn notifier(&self) -> LaunchSpec {
        let config = &self.config;
        self.helper(&config.notifier_name, &config.notifier_script)
            .env("MQTT_HOST", &config.mqtt_host)
            .env("MQTT_PORT", config.mqtt_port.to_string())
            .env("LED_TOGGLE_TOPIC", &config.led_toggle_topic)
            .env("LED_PIN", config.led_pin.to_string())
            .env("LED_HOLD_SECONDS", config.led_hold_secs.to_string())
    }

    /// Services started once at daemon launch and left alone by stop.
    #[must_use]
    pub fn background_services(&self) -> Vec<LaunchSpec> {
        let config = &self.config;
        let forwarder = self
            .helper(&config.forwarder_name, &config.forwarder_script)
            .env("MQTT_URL", self.mqtt_url())
            .env("DDB_ENABLED", if config.cloud_enabled { "1" } else { "0" })
            .env(
                "DDB_HEARTBEAT_PATH",
                config.resolved_heartbeat_path().into_string(),
            );
        let telemetry = self
            .helper(&config.telemetry_name, &config.telemetry_script)
            .env("MQTT_HOST", &config.mqtt_host)
            .env("MQTT_PORT", config.mqtt_port.to_string());
        let emulator = self
            .helper(&config.emulator_name, &config.emulator_script)
            .env("MQTT_URL", self.mqtt_url());
        vec![forwarder, telemetry, emulator]
    }

    fn helper(&self, name: &str, script: &Utf8Path) -> LaunchSpec {
        let config = &self.config;
        LaunchSpec::new(name, config.helper_interpreter.as_str())
            .arg(config.resolve(script).into_string())
            .current_dir(config.base_dir.clone())
            .env("PYTHONUNBUFFERED", "1")
    }

    fn mqtt_url(&self) -> String {
        format!("mqtt://{}:{}", self.config.mqtt_host, self.config.mqtt_port)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn catalogue() -> LaunchCatalogue {
        let config = Config {
            base_dir: Utf8PathBuf::from("/opt/pipeline"),
            mqtt_client_id: Some(String::from("edge-01")),
            ..Config::default()
        };
        LaunchCatalogue::new(&config)
    }

    #[rstest]
    #[case(Mode::Web, "deepstream_app_config.txt")]
    #[case(Mode::Native, "deepstream_app_config_native.txt")]
    fn engine_selects_mode_configuration(
        catalogue: LaunchCatalogue,
        #[case] mode: Mode,
        #[case] file: &str,
    ) {
        let spec = catalogue.engine(mode);
        let args = spec.args();
        assert_eq!(args.first().map(String::as_str), Some("-c"));
        let config_arg = args.get(1).expect("config argument");
        assert!(config_arg.starts_with("/opt/pipeline/"), "{config_arg}");
        assert!(config_arg.ends_with(file), "{config_arg}");
    }

    #[rstest]
    fn engine_carries_broker_environment(catalogue: LaunchCatalogue) {
        let spec = catalogue.engine(Mode::Web);
        let env = spec.envs();
        assert_eq!(env.get("MQTT_HOST").map(String::as_str), Some("mqtt-dashboard.com"));
        assert_eq!(env.get("MQTT_PORT").map(String::as_str), Some("1883"));
        assert_eq!(env.get("MQTT_CLIENT_ID").map(String::as_str), Some("edge-01"));
        assert_eq!(
            spec.workdir().map(Utf8Path::as_str),
            Some("/opt/pipeline/deepstream")
        );
    }

    #[rstest]
    fn patterns_use_resolved_binaries(catalogue: LaunchCatalogue) {
        assert_eq!(
            catalogue.engine_pattern().as_str(),
            "/opt/pipeline/deepstream/deepstream-test5-app"
        );
        assert_eq!(catalogue.relay_pattern().as_str(), "/opt/pipeline/mediamtx/mediamtx");
    }

    #[rstest]
    fn notifier_receives_led_settings(catalogue: LaunchCatalogue) {
        let spec = catalogue.notifier();
        assert_eq!(spec.name(), "led_notifier");
        assert_eq!(spec.command().as_str(), "python3");
        assert_eq!(spec.envs().get("LED_PIN").map(String::as_str), Some("7"));
        assert_eq!(
            spec.envs().get("LED_HOLD_SECONDS").map(String::as_str),
            Some("5")
        );
    }

    #[rstest]
    fn background_services_exclude_pipeline(catalogue: LaunchCatalogue) {
        let names: Vec<String> = catalogue
            .background_services()
            .iter()
            .map(|spec| spec.name().to_owned())
            .collect();
        assert_eq!(names, ["data_manager", "telemetry", "relay_emulator"]);
        for name in catalogue.pipeline_names() {
            assert!(!names.iter().any(|service| service == name));
        }
    }

    #[rstest]
    fn forwarder_reports_cloud_flag_and_heartbeat(catalogue: LaunchCatalogue) {
        let services = catalogue.background_services();
        let forwarder = services.first().expect("forwarder");
        assert_eq!(
            forwarder.envs().get("DDB_ENABLED").map(String::as_str),
            Some("0")
        );
        assert_eq!(
            forwarder.envs().get("DDB_HEARTBEAT_PATH").map(String::as_str),
            Some("/opt/pipeline/data/ddb_heartbeat.json")
        );
    }
}
