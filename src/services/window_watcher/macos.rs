use crate::events::{MacosEvent, WindowEventBatch, WindowId, WindowLifecycleEvent};
use smallvec::smallvec;

/// Перевод события macOS. Путь к бандлу передаётся как подсказка desktop-файла:
/// это окончательный идентификатор приложения.
pub fn translate_macos(event: MacosEvent) -> WindowEventBatch {
    match event {
        MacosEvent::WindowOpened {
            bundle_path,
            window_id,
            title,
        } => {
            let window_id = WindowId::from(window_id);
            smallvec![
                WindowLifecycleEvent::Created {
                    window_id: window_id.clone(),
                },
                WindowLifecycleEvent::IdentityHintChanged {
                    window_id: window_id.clone(),
                    class_hint: None,
                    instance_hint: None,
                    desktop_file_hint: Some(bundle_path),
                },
                WindowLifecycleEvent::TitleChanged { window_id, title },
            ]
        }
        MacosEvent::WindowClosed { window_id } => smallvec![WindowLifecycleEvent::Destroyed {
            window_id: WindowId::from(window_id),
        }],
        MacosEvent::WindowTitleChanged { window_id, title } => {
            smallvec![WindowLifecycleEvent::TitleChanged {
                window_id: WindowId::from(window_id),
                title,
            }]
        }
    }
}
