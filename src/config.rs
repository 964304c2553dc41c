use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manages the per-user config directory and the settings document in it.
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

const SETTINGS_FILE: &str = "settings.toml";

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Read the settings document. A missing or unparseable file yields
    /// defaults; settings are never required for startup.
    pub fn load_settings(&self) -> Settings {
        match std::fs::read_to_string(self.settings_path()) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Settings::default(),
        }
    }

    /// Write the settings document, creating the config directory first.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.ensure_config_dir()?;
        let content = toml::to_string_pretty(settings)?;
        std::fs::write(self.settings_path(), content)?;
        Ok(())
    }
}

/// Persisted session settings, written after every mutating settings
/// action and reloaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub last_opened: Option<PathBuf>,
    pub last_exported: Option<PathBuf>,
    pub theme: ThemeSettings,
    pub smtp: SmtpSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeSettings {
    /// Accent color used for borders and highlights.
    pub accent: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            accent: "cyan".to_string(),
        }
    }
}

/// Saved email transport settings. The password is never persisted; only
/// the server and sender are remembered, and only when asked to.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SmtpSettings {
    /// "host:port", e.g. "smtp.gmail.com:587".
    pub server: Option<String>,
    pub sender: Option<String>,
    pub remember: bool,
}

impl ThemeSettings {
    /// Resolve the accent name to a terminal color; unknown names fall
    /// back to cyan.
    pub fn accent_color(&self) -> ratatui::style::Color {
        use ratatui::style::Color;
        match self.accent.to_ascii_lowercase().as_str() {
            "black" => Color::Black,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "magenta" => Color::Magenta,
            "white" => Color::White,
            "gray" | "grey" => Color::Gray,
            _ => Color::Cyan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = ConfigManager::with_dir(dir.path().join("nowhere"));
        assert_eq!(manager.load_settings(), Settings::default());
    }

    #[test]
    fn corrupt_settings_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        std::fs::write(manager.settings_path(), "last_opened = [not toml").unwrap();
        assert_eq!(manager.load_settings(), Settings::default());
    }

    #[test]
    fn settings_roundtrip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = ConfigManager::with_dir(dir.path().join("xltool"));

        let mut settings = Settings::default();
        settings.last_opened = Some(PathBuf::from("/data/input.xlsx"));
        settings.smtp.server = Some("smtp.example.com:587".to_string());
        settings.smtp.sender = Some("me@example.com".to_string());
        settings.smtp.remember = true;

        manager.save_settings(&settings).expect("save");
        assert_eq!(manager.load_settings(), settings);
    }

    #[test]
    fn unknown_accent_falls_back_to_cyan() {
        let theme = ThemeSettings {
            accent: "chartreuse".to_string(),
        };
        assert_eq!(theme.accent_color(), ratatui::style::Color::Cyan);
    }
}
