use crate::entries::{Accessory, ActionCommand, ActionDraft, OpenWindowRecord, ViewComponent};

pub const OPEN_APPLICATION_LABEL: &str = "Open application";
pub const FOCUS_WINDOW_LABEL: &str = "Focus window";
pub const SHOW_WINDOWS_LABEL: &str = "Show windows";

/// Действия и аксессуары записи приложения по его открытым окнам.
///
/// Результат зависит только от набора окон: при любом изменении их числа
/// вызывающий пересчитывает всё заново.
pub fn derive_presentation(
    app_id: &str,
    windows: &[OpenWindowRecord],
) -> (Vec<ActionDraft>, Vec<Accessory>) {
    match windows {
        [] => (
            vec![ActionDraft::command(
                OPEN_APPLICATION_LABEL,
                ActionCommand::OpenApplication {
                    app_id: app_id.to_string(),
                },
            )],
            Vec::new(),
        ),
        [window] => (
            vec![ActionDraft::command(
                FOCUS_WINDOW_LABEL,
                ActionCommand::FocusWindow {
                    window_id: window.window_id.clone(),
                    app_id: app_id.to_string(),
                },
            )],
            vec![Accessory::text("1 window open")],
        ),
        many => (
            vec![ActionDraft::view(
                SHOW_WINDOWS_LABEL,
                ViewComponent::WindowList {
                    app_id: app_id.to_string(),
                    windows: many.to_vec(),
                },
            )],
            vec![Accessory::text(format!("{} windows open", many.len()))],
        ),
    }
}
