use crate::error::Result;
use crate::events::WindowId;
use tracing::info;

use super::r#trait::PlatformActions;

pub struct DryRunPlatform;

impl PlatformActions for DryRunPlatform {
    fn focus_window(&self, window_id: &WindowId, app_id: &str) -> Result<()> {
        info!("[DRY RUN] Фокус на окно {} ({})", window_id, app_id);
        Ok(())
    }

    fn open_application(&self, app_id: &str) -> Result<()> {
        info!("[DRY RUN] Запуск приложения {}", app_id);
        Ok(())
    }
}
