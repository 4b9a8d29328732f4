use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alarm::{Alarm, InvalidAlarm};

// everything in this module is host-side persistence: the engine never
// reads or writes files, it is handed the loaded alarms

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("couldn't access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid alarm {id} in {path}")]
    Invalid {
        id: u64,
        path: PathBuf,
        #[source]
        source: InvalidAlarm,
    },
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    /// playback volume as a 0.0-1.0 fraction
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[must_use]
pub const fn default_volume() -> f32 {
    0.7
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            volume: default_volume(),
        }
    }
}

impl Settings {
    /// a missing file is not an error, it just means defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let mut settings: Self =
                    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                // a hand-edited volume outside 0.0-1.0 would go
                // straight to the audio sink
                settings.volume = settings.volume.clamp(0.0, 1.0);
                Ok(settings)
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        write_json(self, path)
    }
}

/// a missing alarm file means no alarms yet
pub fn load_alarms(path: &Path) -> Result<Vec<Alarm>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let alarms: Vec<Alarm> =
                serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            // serde accepts any number for hour/minute; hold loaded
            // alarms to the same invariant `Alarm::new` enforces so
            // they can't panic the engine later
            for alarm in &alarms {
                alarm.validate().map_err(|source| ConfigError::Invalid {
                    id: alarm.id,
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            Ok(alarms)
        }
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn save_alarms(alarms: &[Alarm], path: &Path) -> Result<(), ConfigError> {
    write_json(&alarms, path)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let raw = serde_json::to_string_pretty(value).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, raw).map_err(io_err)
}

#[must_use]
pub fn alarms_path() -> PathBuf {
    data_dir().join("alarms.json")
}

#[must_use]
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

#[must_use]
pub fn ringtones_path() -> PathBuf {
    data_dir().join("ringtones")
}

/// resolves a ringtone name to the file the audio thread plays;
/// `None` means the "Default" sentinel, the built-in tone
#[must_use]
pub fn ringtone_path(name: &str) -> Option<PathBuf> {
    (name != "Default").then(|| ringtones_path().join(name))
}

#[must_use]
pub fn is_present() -> bool {
    settings_path().exists()
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "ring_ring")
        .expect("couldn't get data directory path")
        .data_dir()
        .to_path_buf()
}
