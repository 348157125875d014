//! Реконсилер Wayland. Понятия предков и override-redirect здесь нет: окно
//! видно, пока существует. Заголовок и app_id приходят раздельно, поэтому
//! окно привязывается только когда известны оба.

use super::{AppWindows, WindowReconciler};
use crate::events::{WindowEventBatch, WindowId, WindowLifecycleEvent};
use crate::services::registry::GeneratorContext;
use std::collections::{HashMap, HashSet};

use crate::debug_if_enabled;
use crate::trace_if_enabled;

#[derive(Debug, Default)]
struct PendingWindow {
    app_id: Option<String>,
    title: Option<String>,
}

pub struct WaylandReconciler {
    windows: HashMap<WindowId, PendingWindow>,
    unattributed: HashSet<WindowId>,
    apps: AppWindows,
}

impl WaylandReconciler {
    pub fn new(ctx: GeneratorContext) -> Self {
        Self {
            windows: HashMap::new(),
            unattributed: HashSet::new(),
            apps: AppWindows::new(ctx),
        }
    }

    /// app_id композитора либо совпадает с id записи, либо с её startup_wm_class
    fn resolve_app_id(&self, app_id: &str) -> Option<String> {
        if self.apps.entry_exists(app_id) {
            return Some(app_id.to_string());
        }
        self.apps.entry_by_wm_class(app_id)
    }

    fn reconcile(&mut self, id: &WindowId) {
        let Some(PendingWindow {
            app_id: Some(app_id),
            title: Some(title),
        }) = self.windows.get(id)
        else {
            // Поле стало неизвестным: прежняя привязка недействительна
            self.unattributed.remove(id);
            self.apps.unregister(id);
            return;
        };

        match self.resolve_app_id(app_id) {
            Some(resolved) => {
                let title = title.clone();
                self.unattributed.remove(id);
                self.apps.register(id, &resolved, &title);
            }
            None => {
                debug_if_enabled!("Окно {} с app_id {} не относится ни к одному приложению", id, app_id);
                self.unattributed.insert(id.clone());
                self.apps.unregister(id);
            }
        }
    }
}

impl WindowReconciler for WaylandReconciler {
    fn name(&self) -> &'static str {
        "wayland"
    }

    fn apply(&mut self, batch: WindowEventBatch) {
        for event in batch {
            trace_if_enabled!("Wayland: {}", event);
            let id = event.window_id().clone();

            match event {
                WindowLifecycleEvent::Created { .. } => {
                    self.windows.entry(id.clone()).or_default();
                }
                WindowLifecycleEvent::Destroyed { .. } => {
                    self.windows.remove(&id);
                    self.unattributed.remove(&id);
                    self.apps.unregister(&id);
                    continue;
                }
                WindowLifecycleEvent::TitleChanged { title, .. } => {
                    self.windows.entry(id.clone()).or_default().title = Some(title);
                }
                WindowLifecycleEvent::IdentityHintChanged { class_hint, .. } => {
                    self.windows.entry(id.clone()).or_default().app_id =
                        class_hint.filter(|app_id| !app_id.is_empty());
                }
                other => {
                    trace_if_enabled!("Wayland: событие {} не используется", other);
                    continue;
                }
            }

            self.reconcile(&id);
        }
    }

    fn retry_unattributed(&mut self) {
        let pending: Vec<WindowId> = self.unattributed.iter().cloned().collect();
        for id in pending {
            self.reconcile(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::entries::{ActionCommand, ActionDraft, EntryDraft};
    use crate::services::collaborators::ChannelSearchIndex;
    use crate::services::registry::EntrypointRegistry;
    use smallvec::smallvec;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn setup() -> (Arc<EntrypointRegistry>, WaylandReconciler) {
        let (index, _rx) = ChannelSearchIndex::new();
        let registry = EntrypointRegistry::new(&RegistryConfig::default(), Arc::new(index));
        for (local_id, wm_class) in [("org.gnome.Nautilus", None), ("code", Some("Code"))] {
            registry
                .add(
                    "applications",
                    local_id,
                    EntryDraft::new(local_id)
                        .with_startup_wm_class(wm_class.map(str::to_string))
                        .with_action(ActionDraft::command(
                            "Open application",
                            ActionCommand::OpenApplication { app_id: local_id.to_string() },
                        )),
                )
                .unwrap();
        }

        let ctx = GeneratorContext::new("windows", Arc::clone(&registry), CancellationToken::new());
        (registry, WaylandReconciler::new(ctx))
    }

    fn app_id(window: &str, app_id: &str) -> WindowLifecycleEvent {
        WindowLifecycleEvent::IdentityHintChanged {
            window_id: WindowId::new(window),
            class_hint: Some(app_id.to_string()),
            instance_hint: None,
            desktop_file_hint: None,
        }
    }

    fn title(window: &str, title: &str) -> WindowLifecycleEvent {
        WindowLifecycleEvent::TitleChanged {
            window_id: WindowId::new(window),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_waits_for_title_and_app_id() {
        let (registry, mut reconciler) = setup();

        reconciler.apply(smallvec![WindowLifecycleEvent::Created { window_id: WindowId::new("a") }]);
        reconciler.apply(smallvec![app_id("a", "org.gnome.Nautilus")]);
        assert!(registry.open_windows().is_empty());

        reconciler.apply(smallvec![title("a", "Home")]);
        let record = registry.open_windows().get(&WindowId::new("a")).unwrap();
        assert_eq!(record.app_id, "org.gnome.Nautilus");
        assert_eq!(record.title, "Home");
    }

    #[test]
    fn test_app_id_matches_startup_wm_class() {
        let (registry, mut reconciler) = setup();

        reconciler.apply(smallvec![title("b", "main.rs"), app_id("b", "Code")]);

        assert_eq!(
            registry.open_windows().get(&WindowId::new("b")).unwrap().app_id,
            "code"
        );
        assert_eq!(registry.lookup("code").unwrap().actions[0].label(), "Focus window");
    }

    #[test]
    fn test_app_id_change_moves_window() {
        let (registry, mut reconciler) = setup();
        reconciler.apply(smallvec![title("c", "Files"), app_id("c", "org.gnome.Nautilus")]);

        reconciler.apply(smallvec![app_id("c", "Code")]);

        assert_eq!(registry.open_windows().get(&WindowId::new("c")).unwrap().app_id, "code");
        assert_eq!(
            registry.lookup("org.gnome.Nautilus").unwrap().actions[0].label(),
            "Open application"
        );
    }

    #[test]
    fn test_cleared_app_id_unregisters_window() {
        let (registry, mut reconciler) = setup();
        reconciler.apply(smallvec![title("e", "Files"), app_id("e", "org.gnome.Nautilus")]);
        assert_eq!(
            registry.lookup("org.gnome.Nautilus").unwrap().actions[0].label(),
            "Focus window"
        );

        reconciler.apply(smallvec![app_id("e", "")]);

        assert!(registry.open_windows().get(&WindowId::new("e")).is_none());
        assert_eq!(
            registry.lookup("org.gnome.Nautilus").unwrap().actions[0].label(),
            "Open application"
        );

        // app_id вернулся: окно снова привязано
        reconciler.apply(smallvec![app_id("e", "org.gnome.Nautilus")]);
        assert_eq!(
            registry.open_windows().get(&WindowId::new("e")).unwrap().app_id,
            "org.gnome.Nautilus"
        );
    }

    #[test]
    fn test_close_removes_record() {
        let (registry, mut reconciler) = setup();
        reconciler.apply(smallvec![title("d", "Files"), app_id("d", "org.gnome.Nautilus")]);

        reconciler.apply(smallvec![WindowLifecycleEvent::Destroyed { window_id: WindowId::new("d") }]);

        assert!(registry.open_windows().is_empty());
        assert_eq!(
            registry.lookup("org.gnome.Nautilus").unwrap().actions[0].label(),
            "Open application"
        );
    }

    #[test]
    fn test_unknown_app_id_is_ignored() {
        let (registry, mut reconciler) = setup();
        reconciler.apply(smallvec![title("e", "Untitled"), app_id("e", "mystery")]);
        assert!(registry.open_windows().is_empty());
    }
}
