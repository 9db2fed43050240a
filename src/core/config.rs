use std::{
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
    time::Duration,
};

use serde::{
    Deserialize,
    Serialize,
};

use super::{
    BotError,
    Identity,
};
use crate::persistence::{
    get_data_file_path,
    load_json,
    save_json,
};

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Generation backend (Ollama)
    pub ollama_url: String,
    pub ollama_model: String,

    // Flashcard store (AnkiConnect)
    pub anki_url: String,
    pub anki_deck_name: String,
    pub anki_model_name: String,
    pub anki_launch_command: Option<String>,

    // Bot behavior
    pub max_generation_attempts: u32,
    pub generation_timeout_secs: u64,
    pub sync_timeout_secs: u64,
    pub spell_check_timeout_secs: u64,
    pub spell_check_backend_fallback: bool,
    pub dictionary_path: Option<PathBuf>,
    pub session_timeout_secs: u64,

    // Access control
    pub max_auth_attempts: u32,
    pub auth_code: Option<String>,
    pub authorized_identity: Option<String>,

    // Transport
    pub listen_addr: String,

    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434/api/generate".to_string(),
            ollama_model: "gemma2:9b".to_string(),
            anki_url: "http://localhost:8765".to_string(),
            anki_deck_name: "Default".to_string(),
            anki_model_name: "Basic".to_string(),
            anki_launch_command: None,
            max_generation_attempts: 4,
            generation_timeout_secs: 60,
            sync_timeout_secs: 30,
            spell_check_timeout_secs: 20,
            spell_check_backend_fallback: true,
            dictionary_path: None,
            session_timeout_secs: 30 * 60,
            max_auth_attempts: 5,
            auth_code: None,
            authorized_identity: None,
            listen_addr: "127.0.0.1:8767".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from the app config dir when no path is given
    /// (writing a default file there on first run), then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, BotError> {
        let mut settings = match path {
            Some(path) => load_json::<Settings>(path)?.ok_or_else(|| {
                BotError::FailedToLoadFile(format!("{} does not exist", path.display()))
            })?,
            None => {
                let default_path = get_data_file_path(SETTINGS_FILE);
                match load_json::<Settings>(&default_path)? {
                    Some(settings) => settings,
                    None => {
                        let settings = Settings::default();
                        if let Err(e) = save_json(&settings, &default_path) {
                            log::warn!("Could not write default settings: {}", e);
                        }
                        settings
                    }
                }
            }
        };

        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), BotError> {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = text("OLLAMA_URL") {
            self.ollama_url = v;
        }
        if let Some(v) = text("OLLAMA_MODEL") {
            self.ollama_model = v;
        }
        if let Some(v) = text("ANKI_URL") {
            self.anki_url = v;
        }
        if let Some(v) = text("ANKI_DECK_NAME") {
            self.anki_deck_name = v;
        }
        if let Some(v) = text("ANKI_MODEL_NAME") {
            self.anki_model_name = v;
        }
        if let Some(v) = text("ANKI_LAUNCH_COMMAND") {
            self.anki_launch_command = Some(v);
        }
        if let Some(v) = text("MAX_GENERATION_ATTEMPTS") {
            self.max_generation_attempts = parse_value("MAX_GENERATION_ATTEMPTS", &v)?;
        }
        if let Some(v) = text("GENERATION_TIMEOUT") {
            self.generation_timeout_secs = parse_value("GENERATION_TIMEOUT", &v)?;
        }
        if let Some(v) = text("SYNC_TIMEOUT") {
            self.sync_timeout_secs = parse_value("SYNC_TIMEOUT", &v)?;
        }
        if let Some(v) = text("SPELL_CHECK_TIMEOUT") {
            self.spell_check_timeout_secs = parse_value("SPELL_CHECK_TIMEOUT", &v)?;
        }
        if let Some(v) = text("SESSION_TIMEOUT") {
            self.session_timeout_secs = parse_value("SESSION_TIMEOUT", &v)?;
        }
        if let Some(v) = text("MAX_AUTH_ATTEMPTS") {
            self.max_auth_attempts = parse_value("MAX_AUTH_ATTEMPTS", &v)?;
        }
        if let Some(v) = text("AUTH_CODE") {
            self.auth_code = Some(v);
        }
        if let Some(v) = text("AUTHORIZED_IDENTITY") {
            self.authorized_identity = Some(v);
        }
        if let Some(v) = text("DICTIONARY_PATH") {
            self.dictionary_path = Some(PathBuf::from(v));
        }
        if let Some(v) = text("LISTEN_ADDR") {
            self.listen_addr = v;
        }
        if let Some(v) = text("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), BotError> {
        if self.max_generation_attempts == 0 {
            return Err(BotError::Config("max_generation_attempts must be at least 1".into()));
        }
        if self.max_auth_attempts == 0 {
            return Err(BotError::Config("max_auth_attempts must be at least 1".into()));
        }
        if self.generation_timeout_secs == 0 || self.sync_timeout_secs == 0 {
            return Err(BotError::Config("timeouts must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }

    pub fn spell_check_timeout(&self) -> Duration {
        Duration::from_secs(self.spell_check_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn preseeded_identity(&self) -> Option<Identity> {
        self.authorized_identity.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(Identity::new)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, BotError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| BotError::Config(format!("{key} has an invalid value: {value:?}")))
}
