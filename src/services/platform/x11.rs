use crate::error::Result;
use crate::events::WindowId;
use tracing::info;

use super::r#trait::PlatformActions;
use super::{run_checked, spawn_detached};

pub struct X11Platform;

impl X11Platform {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformActions for X11Platform {
    fn focus_window(&self, window_id: &WindowId, app_id: &str) -> Result<()> {
        info!("Фокус на окно {} ({})", window_id, app_id);
        run_checked("wmctrl", &["-i", "-a", window_id.as_str()])
    }

    fn open_application(&self, app_id: &str) -> Result<()> {
        info!("Запуск приложения {}", app_id);
        spawn_detached("gtk-launch", &[app_id])
    }
}
