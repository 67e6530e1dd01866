//! Player settings that survive restarts
//!
//! Kept as YAML under the platform config directory
//! (`~/.config/zema-player/config.yaml` on Linux). Every field has a default,
//! so a partial file is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::render::layout::{MAX_ZOOM, MIN_ZOOM};
use crate::transport::bookmarks::BookmarkStore;
use crate::transport::dsp::{DEFAULT_TEMPO_PERCENT, MAX_TEMPO_PERCENT, MIN_TEMPO_PERCENT};
use crate::transport::{RepeatMode, TransportSettings, DEFAULT_SEEK_AMOUNT, SEEK_AMOUNTS};
use crate::waveform::{Waveform, DEFAULT_BARS};

/// Everything the player persists apart from bookmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Transport defaults (skip distance, tempo, repeat)
    pub transport: TransportConfig,
    /// Display settings (waveform resolution, zoom)
    pub display: DisplayConfig,
    /// Where per-track bookmarks are stored
    /// Default: ~/.local/share/zema-player
    pub data_dir: PathBuf,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("zema-player");

        Self {
            transport: TransportConfig::default(),
            display: DisplayConfig::default(),
            data_dir,
        }
    }
}

/// Skip, tempo and repeat defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Skip forward/back distance in seconds (one of SEEK_AMOUNTS)
    pub seek_amount_secs: f64,
    /// Tempo applied when a track starts
    pub default_tempo_percent: f64,
    pub repeat_mode: RepeatMode,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            seek_amount_secs: DEFAULT_SEEK_AMOUNT,
            default_tempo_percent: DEFAULT_TEMPO_PERCENT,
            repeat_mode: RepeatMode::Off,
        }
    }
}

impl TransportConfig {
    /// Configured skip distance, snapped to the nearest offered option
    pub fn seek_amount(&self) -> f64 {
        if !self.seek_amount_secs.is_finite() {
            return DEFAULT_SEEK_AMOUNT;
        }
        SEEK_AMOUNTS
            .iter()
            .copied()
            .min_by(|a, b| {
                (a - self.seek_amount_secs)
                    .abs()
                    .total_cmp(&(b - self.seek_amount_secs).abs())
            })
            .unwrap_or(DEFAULT_SEEK_AMOUNT)
    }

    pub fn default_tempo(&self) -> f64 {
        if self.default_tempo_percent.is_finite() {
            self.default_tempo_percent.clamp(MIN_TEMPO_PERCENT, MAX_TEMPO_PERCENT)
        } else {
            DEFAULT_TEMPO_PERCENT
        }
    }
}

/// Waveform and view defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Number of waveform bars per track (200..=3000)
    pub waveform_bars: usize,
    /// Waveform zoom level (1..=10)
    pub waveform_zoom: u8,
    /// Switch to the fullscreen view whenever a new track starts
    pub open_fullscreen_on_track_change: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            waveform_bars: DEFAULT_BARS,
            waveform_zoom: MIN_ZOOM,
            open_fullscreen_on_track_change: true,
        }
    }
}

impl DisplayConfig {
    pub fn waveform_bars(&self) -> usize {
        Waveform::clamp_bars(self.waveform_bars)
    }

    pub fn waveform_zoom(&self) -> u8 {
        self.waveform_zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

impl PlayerConfig {
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            seek_amount: self.transport.seek_amount(),
            waveform_bars: self.display.waveform_bars(),
            repeat: self.transport.repeat_mode,
            bookmark_store: BookmarkStore::new(self.data_dir.join("bookmarks")),
        }
    }
}

/// `<config dir>/zema-player/config.yaml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("zema-player")
        .join("config.yaml")
}

/// Read the player config at `path`
///
/// A missing file gives the defaults. So does an unreadable or malformed
/// one, after a warning naming the problem.
pub fn load_config(path: &Path) -> PlayerConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("load_config: no config at {}, starting with defaults", path.display());
            return PlayerConfig::default();
        }
        Err(e) => {
            log::warn!("load_config: cannot read {}: {}; using defaults", path.display(), e);
            return PlayerConfig::default();
        }
    };

    match serde_yaml::from_str::<PlayerConfig>(&contents) {
        Ok(config) => {
            log::debug!(
                "load_config: skip {}s, tempo {}%, repeat {:?}, {} bars at zoom {}x",
                config.transport.seek_amount(),
                config.transport.default_tempo(),
                config.transport.repeat_mode,
                config.display.waveform_bars(),
                config.display.waveform_zoom()
            );
            config
        }
        Err(e) => {
            log::warn!("load_config: {} is not valid player config: {}; using defaults", path.display(), e);
            PlayerConfig::default()
        }
    }
}

/// Write the player config to `path`, creating its directory on first save
pub fn save_config(config: &PlayerConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating player config directory {}", dir.display()))?;
    }
    let yaml = serde_yaml::to_string(config).context("encoding player config")?;
    std::fs::write(path, yaml).with_context(|| format!("writing player config {}", path.display()))?;
    log::debug!("save_config: wrote {}", path.display());
    Ok(())
}
