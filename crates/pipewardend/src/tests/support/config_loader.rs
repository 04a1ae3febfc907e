//! Configuration loaders covering the failure path.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoError;

use pipewarden_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader that intentionally fails by passing an invalid CLI value.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("pipewardend"),
            OsString::from("--listen-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
