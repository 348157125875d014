use crate::error::{LauncherError, Result};
use std::fmt;
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Платформа, события окон которой отслеживаются
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBackend {
    X11,
    Wayland,
    Macos,
}

impl fmt::Display for WindowBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowBackend::X11 => write!(f, "x11"),
            WindowBackend::Wayland => write!(f, "wayland"),
            WindowBackend::Macos => write!(f, "macos"),
        }
    }
}

/// Определить бэкенд по настройке `window.backend`
pub fn resolve_backend(setting: &str) -> Result<Option<WindowBackend>> {
    match setting {
        "x11" => Ok(Some(WindowBackend::X11)),
        "wayland" => Ok(Some(WindowBackend::Wayland)),
        "macos" => Ok(Some(WindowBackend::Macos)),
        "none" => Ok(None),
        "auto" => Ok(detect_backend(|name| std::env::var(name).ok())),
        other => Err(LauncherError::Config(anyhow::anyhow!(
            "Неизвестный бэкенд отслеживания окон: {}",
            other
        ))),
    }
}

fn detect_backend<F>(env: F) -> Option<WindowBackend>
where
    F: Fn(&str) -> Option<String>,
{
    if cfg!(target_os = "macos") {
        return Some(WindowBackend::Macos);
    }

    if let Some(session) = env("XDG_SESSION_TYPE") {
        match session.as_str() {
            "wayland" => return Some(WindowBackend::Wayland),
            "x11" => return Some(WindowBackend::X11),
            _ => {}
        }
    }

    if env("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty()) {
        return Some(WindowBackend::Wayland);
    }

    if env("DISPLAY").is_some_and(|v| !v.is_empty()) {
        return Some(WindowBackend::X11);
    }

    None
}

/// Внешние утилиты, через которые бэкенд получает окна и выполняет действия
pub fn required_tools(backend: WindowBackend) -> &'static [&'static str] {
    match backend {
        WindowBackend::X11 => &["wmctrl", "gtk-launch"],
        WindowBackend::Wayland => &["swaymsg", "gtk-launch"],
        WindowBackend::Macos => &["osascript", "open"],
    }
}

/// Проверить наличие утилит; отсутствие не фатально, только предупреждение
pub fn check_backend_tools(backend: WindowBackend) -> bool {
    info!("Проверка утилит для бэкенда {}...", backend);

    let mut all_found = true;
    for tool in required_tools(backend) {
        if tool_available(tool) {
            info!("Утилита {} найдена", tool);
        } else {
            warn!("Утилита {} не найдена в PATH, часть функций будет недоступна", tool);
            all_found = false;
        }
    }
    all_found
}

fn tool_available(tool: &str) -> bool {
    Command::new("which")
        .arg(tool)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
