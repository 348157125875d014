use crate::events::{WindowEventBatch, WindowId, WindowLifecycleEvent, WindowType, X11Event};
use smallvec::smallvec;

/// Перевод события X11 в нормализованные события.
///
/// `ReparentNotify` считается ещё и неявным map: часть клиентов (например,
/// некоторые файловые менеджеры) переподчиняет окно без последующего MapNotify.
pub fn translate_x11(event: X11Event) -> WindowEventBatch {
    match event {
        X11Event::Init {
            id,
            parent_id,
            override_redirect,
            mapped,
        } => smallvec![
            WindowLifecycleEvent::Created { window_id: id.into() },
            WindowLifecycleEvent::ReparentedTo {
                window_id: id.into(),
                parent_id: parent_id.into(),
            },
            WindowLifecycleEvent::override_redirect(id.into(), override_redirect),
            WindowLifecycleEvent::VisibilityChanged {
                window_id: id.into(),
                mapped,
            },
        ],
        X11Event::CreateNotify {
            id,
            parent_id,
            override_redirect,
        } => smallvec![
            WindowLifecycleEvent::Created { window_id: id.into() },
            WindowLifecycleEvent::ReparentedTo {
                window_id: id.into(),
                parent_id: parent_id.into(),
            },
            WindowLifecycleEvent::override_redirect(id.into(), override_redirect),
        ],
        X11Event::DestroyNotify { id } => {
            smallvec![WindowLifecycleEvent::Destroyed { window_id: id.into() }]
        }
        X11Event::MapNotify { id } => smallvec![WindowLifecycleEvent::VisibilityChanged {
            window_id: id.into(),
            mapped: true,
        }],
        X11Event::UnmapNotify { id } => smallvec![WindowLifecycleEvent::VisibilityChanged {
            window_id: id.into(),
            mapped: false,
        }],
        X11Event::ReparentNotify { id, parent_id } => smallvec![
            WindowLifecycleEvent::ReparentedTo {
                window_id: id.into(),
                parent_id: parent_id.into(),
            },
            WindowLifecycleEvent::VisibilityChanged {
                window_id: id.into(),
                mapped: true,
            },
        ],
        X11Event::TitlePropertyNotify { id, title } => smallvec![WindowLifecycleEvent::TitleChanged {
            window_id: id.into(),
            title,
        }],
        X11Event::ClassPropertyNotify {
            id,
            class,
            instance,
        } => smallvec![WindowLifecycleEvent::IdentityHintChanged {
            window_id: id.into(),
            class_hint: Some(class),
            instance_hint: Some(instance),
            desktop_file_hint: None,
        }],
        X11Event::HintsPropertyNotify { id, window_group } => smallvec![
            WindowLifecycleEvent::window_group(id.into(), window_group.map(WindowId::from))
        ],
        X11Event::ProtocolsPropertyNotify { id, protocols } => {
            smallvec![WindowLifecycleEvent::protocols(id.into(), protocols)]
        }
        X11Event::TransientForPropertyNotify { id, transient_for } => smallvec![
            WindowLifecycleEvent::transient_for(id.into(), transient_for.map(WindowId::from))
        ],
        X11Event::WindowTypePropertyNotify { id, types } => smallvec![
            WindowLifecycleEvent::window_types(
                id.into(),
                types.iter().map(|t| WindowType::parse(t)).collect(),
            )
        ],
        // Пустая строка снимает подсказку
        X11Event::DesktopFileNamePropertyNotify {
            id,
            desktop_file_name,
        } => smallvec![WindowLifecycleEvent::IdentityHintChanged {
            window_id: id.into(),
            class_hint: None,
            instance_hint: None,
            desktop_file_hint: Some(desktop_file_name.unwrap_or_default()),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_expands_to_full_state() {
        let batch = translate_x11(X11Event::Init {
            id: 1,
            parent_id: 0,
            override_redirect: false,
            mapped: true,
        });

        assert_eq!(batch.len(), 4);
        assert!(!batch.spilled());
        assert_eq!(batch[0], WindowLifecycleEvent::Created { window_id: 1u32.into() });
        assert_eq!(
            batch[3],
            WindowLifecycleEvent::VisibilityChanged { window_id: 1u32.into(), mapped: true }
        );
    }

    #[test]
    fn test_reparent_is_implicit_map() {
        let batch = translate_x11(X11Event::ReparentNotify { id: 5, parent_id: 2 });

        assert_eq!(
            batch.as_slice(),
            &[
                WindowLifecycleEvent::ReparentedTo {
                    window_id: 5u32.into(),
                    parent_id: 2u32.into(),
                },
                WindowLifecycleEvent::VisibilityChanged { window_id: 5u32.into(), mapped: true },
            ]
        );
    }

    #[test]
    fn test_window_type_names_are_parsed() {
        let batch = translate_x11(X11Event::WindowTypePropertyNotify {
            id: 3,
            types: vec!["_NET_WM_WINDOW_TYPE_NORMAL".to_string()],
        });

        assert_eq!(
            batch[0],
            WindowLifecycleEvent::window_types(3u32.into(), vec![WindowType::Normal])
        );
    }

    #[test]
    fn test_cleared_desktop_file_name() {
        let batch = translate_x11(X11Event::DesktopFileNamePropertyNotify {
            id: 3,
            desktop_file_name: None,
        });

        assert!(matches!(
            &batch[0],
            WindowLifecycleEvent::IdentityHintChanged { desktop_file_hint: Some(hint), .. }
                if hint.is_empty()
        ));
    }
}
