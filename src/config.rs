use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::modules::celebration::PodiumEntry;
use crate::modules::notifications::{ManagerConfig, DEFAULT_DISMISS_AFTER, DEFAULT_EXTEND, DEFAULT_FADE};

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct FlashConfig {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct PodiumConfig {
    pub user: String,
    pub points: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub dismiss_after_ms: u64,
    pub fade_ms: u64,
    pub extend_ms: u64,
    pub native_dismiss: bool,
    pub flash: Vec<FlashConfig>,
    pub podium: Vec<PodiumConfig>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            dismiss_after_ms: DEFAULT_DISMISS_AFTER.as_millis() as u64,
            fade_ms: DEFAULT_FADE.as_millis() as u64,
            extend_ms: DEFAULT_EXTEND.as_millis() as u64,
            native_dismiss: true,
            flash: vec![
                FlashConfig { message: "Welcome back! Your dashboard is ready.".into(), ..Default::default() },
                FlashConfig { message: "Invalid credentials for the linked account".into(), ..Default::default() },
                FlashConfig {
                    message: "Scheduled maintenance on Sunday".into(),
                    category: Some("warning".into()),
                    permanent: true,
                },
            ],
            podium: vec![
                PodiumConfig { user: "ada".into(), points: 1280 },
                PodiumConfig { user: "grace".into(), points: 1175 },
                PodiumConfig { user: "linus".into(), points: 990 },
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub path: PathBuf,
    pub dismiss_after: Duration,
    pub fade: Duration,
    pub extend: Duration,
    pub native_dismiss: bool,
    pub flash: Vec<FlashConfig>,
    pub podium: Vec<PodiumEntry>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(config_path()?)
    }

    /// Reads `path`, writing the defaults there first if it does not exist.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            let toml = toml::to_string_pretty(&ConfigFile::default())?;
            if let Some(parent) = path.parent() { fs::create_dir_all(parent)?; }
            fs::write(&path, toml).with_context(|| format!("Writing {:?}", &path))?;
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Reading {:?}", &path))?;
        let cfg: ConfigFile = toml::from_str(&content).with_context(|| "Parsing config TOML")?;
        Ok(Self::from_file(path, cfg))
    }

    fn from_file(path: PathBuf, cfg: ConfigFile) -> Self {
        Self {
            path,
            dismiss_after: millis_or(cfg.dismiss_after_ms, DEFAULT_DISMISS_AFTER),
            fade: millis_or(cfg.fade_ms, DEFAULT_FADE),
            extend: millis_or(cfg.extend_ms, DEFAULT_EXTEND),
            native_dismiss: cfg.native_dismiss,
            flash: cfg.flash,
            podium: cfg.podium.into_iter().map(|p| PodiumEntry { user: p.user, points: p.points }).collect(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml = toml::to_string_pretty(&self.to_file())?;
        if let Some(parent) = self.path.parent() { fs::create_dir_all(parent)?; }
        fs::write(&self.path, toml).with_context(|| format!("Writing {:?}", &self.path))?;
        Ok(())
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig { dismiss_after: self.dismiss_after, fade: self.fade }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn to_file(&self) -> ConfigFile {
        ConfigFile {
            dismiss_after_ms: self.dismiss_after.as_millis() as u64,
            fade_ms: self.fade.as_millis() as u64,
            extend_ms: self.extend.as_millis() as u64,
            native_dismiss: self.native_dismiss,
            flash: self.flash.clone(),
            podium: self.podium.iter().map(|p| PodiumConfig { user: p.user.clone(), points: p.points }).collect(),
        }
    }
}

fn millis_or(ms: u64, fallback: Duration) -> Duration {
    if ms == 0 { fallback } else { Duration::from_millis(ms) }
}

fn config_path() -> Result<PathBuf> {
    let base = config_dir().context("Could not determine config directory")?;
    Ok(base.join("herald").join("config.toml"))
}
