mod dry_run;
mod macos;
mod sway;
mod x11;
mod r#trait;

pub use self::r#trait::{create_platform_actions, PlatformActions};

use crate::error::{LauncherError, Result};
use std::process::{Command, Stdio};
use tracing::debug;

/// Запуск внешней утилиты без ожидания её завершения
fn spawn_detached(program: &str, args: &[&str]) -> Result<()> {
    debug!("Запуск: {} {:?}", program, args);
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| LauncherError::ServiceUnavailable(format!("{} не запускается: {}", program, e)))?;
    Ok(())
}

/// Запуск утилиты с проверкой кода возврата
fn run_checked(program: &str, args: &[&str]) -> Result<()> {
    debug!("Выполнение: {} {:?}", program, args);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| LauncherError::ServiceUnavailable(format!("{} не найден: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LauncherError::Internal(format!(
            "{} вернул ошибку: {}",
            program,
            stderr.trim()
        )));
    }
    Ok(())
}
