use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use crate::services::window_tracking::WINDOW_TRACKING_GENERATOR_ID;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub shortcuts: Vec<ShortcutBinding>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WindowConfig {
    /// auto | x11 | wayland | macos | none
    pub backend: String,
    pub polling_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    pub enabled: bool,
    pub generator_id: String,
    #[serde(default = "default_application_dirs")]
    pub directories: Vec<PathBuf>,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    pub cleanup_timeout_ms: u64,
    pub setup_timeout_ms: u64,
}

/// Привязка сочетания клавиш к действию точки входа по его `ref`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShortcutBinding {
    pub generator: String,
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub action: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            polling_interval_ms: 1000,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            generator_id: "applications".to_string(),
            directories: default_application_dirs(),
            debounce_ms: 1000,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cleanup_timeout_ms: 5000,
            setup_timeout_ms: 10000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            window: WindowConfig::default(),
            scanner: ScannerConfig::default(),
            registry: RegistryConfig::default(),
            shortcuts: Vec::new(),
        }
    }
}

/// Стандартные каталоги с описаниями установленных приложений
fn default_application_dirs() -> Vec<PathBuf> {
    let mut result = Vec::new();

    if cfg!(target_os = "macos") {
        result.push(PathBuf::from("/Applications"));
        result.push(PathBuf::from("/System/Applications"));
        if let Some(home) = dirs::home_dir() {
            result.push(home.join("Applications"));
        }
        return result;
    }

    if let Some(data_dir) = dirs::data_dir() {
        result.push(data_dir.join("applications"));
    }
    result.push(PathBuf::from("/usr/local/share/applications"));
    result.push(PathBuf::from("/usr/share/applications"));
    result.push(PathBuf::from("/var/lib/flatpak/exports/share/applications"));
    result
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("LAUNCHER_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        // Валидация настроек окон
        match self.window.backend.as_str() {
            "auto" | "x11" | "wayland" | "macos" | "none" => {}
            _ => anyhow::bail!("Неверный бэкенд отслеживания окон: {}", self.window.backend),
        }

        if self.window.polling_interval_ms < 100 {
            anyhow::bail!("polling_interval_ms должно быть минимум 100");
        }

        // Валидация сканера приложений
        if self.scanner.debounce_ms == 0 {
            anyhow::bail!("debounce_ms должно быть больше 0");
        }

        if self.registry.cleanup_timeout_ms == 0 || self.registry.setup_timeout_ms == 0 {
            anyhow::bail!("Таймауты реестра должны быть больше 0");
        }

        if self.scanner.generator_id.is_empty() {
            anyhow::bail!("generator_id сканера не может быть пустым");
        }

        if self.scanner.generator_id == WINDOW_TRACKING_GENERATOR_ID {
            anyhow::bail!(
                "generator_id сканера '{}' занят отслеживанием окон",
                self.scanner.generator_id
            );
        }

        // Валидация сочетаний клавиш
        let mut seen = HashSet::new();
        for (i, binding) in self.shortcuts.iter().enumerate() {
            if binding.key.is_empty() {
                anyhow::bail!("Пустая клавиша в сочетании #{}", i + 1);
            }

            if binding.action.is_empty() {
                anyhow::bail!("Пустой ref действия в сочетании #{}", i + 1);
            }

            for modifier in &binding.modifiers {
                match modifier.as_str() {
                    "ctrl" | "alt" | "shift" | "super" => {}
                    _ => anyhow::bail!("Неверный модификатор '{}' в сочетании #{}", modifier, i + 1),
                }
            }

            let mut modifiers = binding.modifiers.clone();
            modifiers.sort();
            if !seen.insert((binding.generator.clone(), binding.key.clone(), modifiers)) {
                anyhow::bail!("Повторяющееся сочетание #{} для генератора '{}'", i + 1, binding.generator);
            }
        }

        Ok(())
    }
}
