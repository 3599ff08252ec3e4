use thiserror::Error;

const DEFAULT_DATABASE_PATH: &str = "data/mediaman.db";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown DATABASE_MODE {0:?} (expected \"local\" or \"memory\")")]
    UnknownMode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMode {
    /// libsql file on disk.
    Local { path: String },
    /// Nothing is kept after exit.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store: StoreMode,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = lookup("DATABASE_MODE").unwrap_or_else(|| "local".into());
        let store = match mode.trim().to_ascii_lowercase().as_str() {
            "local" => StoreMode::Local {
                path: lookup("DATABASE_PATH")
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DATABASE_PATH.into()),
            },
            "memory" => StoreMode::Memory,
            _ => return Err(ConfigError::UnknownMode(mode)),
        };
        Ok(Self { store })
    }
}
