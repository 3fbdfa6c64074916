//! Configuration vault – reads/writes `~/.waggle/config.toml`.
//!
//! ```toml
//! llm_url = "http://localhost:11434"
//! model = "llama3"
//! tick_hz = 30.0
//!
//! [engine.fov]
//! half_angle_deg = 45.0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use waggle_runtime::EngineConfig;

/// Persisted CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the OpenAI-compatible model server.
    #[serde(default = "default_llm_url")]
    pub llm_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Simulation ticks per second for `/run` and `/ask`.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f32,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_llm_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3".to_string()
}
fn default_tick_hz() -> f32 {
    30.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_url: default_llm_url(),
            model: default_model(),
            tick_hz: default_tick_hz(),
            engine: EngineConfig::default(),
        }
    }
}

/// Return the path to `~/.waggle/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".waggle").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `WAGGLE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `WAGGLE_LLM_URL` | `llm_url` |
/// | `WAGGLE_MODEL` | `model` |
/// | `WAGGLE_TICK_HZ` | `tick_hz` |
/// | `WAGGLE_FOV_HALF_ANGLE` | `engine.fov.half_angle_deg` |
///
/// Values that do not parse, or parse to NaN or infinity, are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("WAGGLE_LLM_URL") {
        cfg.llm_url = v;
    }
    if let Ok(v) = std::env::var("WAGGLE_MODEL") {
        cfg.model = v;
    }
    if let Ok(v) = std::env::var("WAGGLE_TICK_HZ")
        && let Ok(hz) = v.parse::<f32>()
        && hz.is_finite()
        && hz > 0.0
    {
        cfg.tick_hz = hz;
    }
    if let Ok(v) = std::env::var("WAGGLE_FOV_HALF_ANGLE")
        && let Ok(deg) = v.parse::<f32>()
        && deg.is_finite()
    {
        cfg.engine.fov.half_angle_deg = deg;
    }
}

/// Save the config to disk, creating `~/.waggle/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
