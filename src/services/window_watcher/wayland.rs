use crate::events::{WaylandEvent, WindowEventBatch, WindowId, WindowLifecycleEvent};
use smallvec::smallvec;

/// Перевод события композитора. Видимость следует из существования окна,
/// app_id передаётся как class-подсказка.
pub fn translate_wayland(event: WaylandEvent) -> WindowEventBatch {
    match event {
        WaylandEvent::WindowOpened { window_id } => smallvec![WindowLifecycleEvent::Created {
            window_id: WindowId::new(window_id),
        }],
        WaylandEvent::WindowClosed { window_id } => smallvec![WindowLifecycleEvent::Destroyed {
            window_id: WindowId::new(window_id),
        }],
        WaylandEvent::WindowTitleChanged { window_id, title } => {
            smallvec![WindowLifecycleEvent::TitleChanged {
                window_id: WindowId::new(window_id),
                title,
            }]
        }
        WaylandEvent::WindowAppIdChanged { window_id, app_id } => {
            smallvec![WindowLifecycleEvent::IdentityHintChanged {
                window_id: WindowId::new(window_id),
                class_hint: Some(app_id),
                instance_hint: None,
                desktop_file_hint: None,
            }]
        }
    }
}
