use crate::error::Result;
use crate::events::WindowId;
use tracing::{debug, info};

use super::r#trait::PlatformActions;
use super::spawn_detached;

/// На macOS идентификатор приложения это путь к бандлу
pub struct MacosPlatform;

impl MacosPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformActions for MacosPlatform {
    fn focus_window(&self, window_id: &WindowId, app_id: &str) -> Result<()> {
        // Окно по номеру из CLI не адресуется, активируем владельца
        debug!("Окно {} активируется через приложение", window_id);
        info!("Активация приложения {}", app_id);
        spawn_detached("open", &["-a", app_id])
    }

    fn open_application(&self, app_id: &str) -> Result<()> {
        info!("Запуск приложения {}", app_id);
        spawn_detached("open", &[app_id])
    }
}
