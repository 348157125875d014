use crate::error::Result;
use crate::events::WindowId;
use tracing::info;

use super::r#trait::PlatformActions;
use super::{run_checked, spawn_detached};

pub struct SwayPlatform;

impl SwayPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformActions for SwayPlatform {
    fn focus_window(&self, window_id: &WindowId, app_id: &str) -> Result<()> {
        info!("Фокус на окно {} ({})", window_id, app_id);
        let criteria = format!("[con_id={}]", window_id);
        run_checked("swaymsg", &[criteria.as_str(), "focus"])
    }

    fn open_application(&self, app_id: &str) -> Result<()> {
        info!("Запуск приложения {}", app_id);
        spawn_detached("gtk-launch", &[app_id])
    }
}
