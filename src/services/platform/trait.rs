use crate::error::Result;
use crate::events::WindowId;
use crate::utils::WindowBackend;
use std::sync::Arc;

/// Примитивы платформы, которые вызывают производные действия точек входа
pub trait PlatformActions: Send + Sync {
    /// Перевести фокус на окно приложения
    fn focus_window(&self, window_id: &WindowId, app_id: &str) -> Result<()>;

    /// Запустить приложение по его идентификатору
    fn open_application(&self, app_id: &str) -> Result<()>;
}

/// Factory function to create platform primitives for the backend, or logging ones in dry-run mode
pub fn create_platform_actions(
    backend: Option<WindowBackend>,
    dry_run: bool,
) -> Arc<dyn PlatformActions> {
    if dry_run {
        return Arc::new(super::dry_run::DryRunPlatform);
    }

    match backend {
        Some(WindowBackend::X11) | None => Arc::new(super::x11::X11Platform::new()),
        Some(WindowBackend::Wayland) => Arc::new(super::sway::SwayPlatform::new()),
        Some(WindowBackend::Macos) => Arc::new(super::macos::MacosPlatform::new()),
    }
}
