//! Реконсилер macOS: путь к бандлу приходит вместе с окном и сразу служит
//! идентификатором приложения.

use super::{AppWindows, WindowReconciler};
use crate::events::{WindowEventBatch, WindowId, WindowLifecycleEvent};
use crate::services::registry::GeneratorContext;
use std::collections::{HashMap, HashSet};

use crate::debug_if_enabled;

#[derive(Debug, Default)]
struct MacosWindow {
    bundle_path: Option<String>,
    title: String,
}

pub struct MacosReconciler {
    windows: HashMap<WindowId, MacosWindow>,
    unattributed: HashSet<WindowId>,
    apps: AppWindows,
}

impl MacosReconciler {
    pub fn new(ctx: GeneratorContext) -> Self {
        Self {
            windows: HashMap::new(),
            unattributed: HashSet::new(),
            apps: AppWindows::new(ctx),
        }
    }

    fn reconcile(&mut self, id: &WindowId) {
        let Some(MacosWindow {
            bundle_path: Some(bundle_path),
            title,
        }) = self.windows.get(id)
        else {
            return;
        };

        if self.apps.entry_exists(bundle_path) {
            let (bundle_path, title) = (bundle_path.clone(), title.clone());
            self.unattributed.remove(id);
            self.apps.register(id, &bundle_path, &title);
        } else {
            debug_if_enabled!("Бандл {} окна {} отсутствует в каталоге", bundle_path, id);
            self.unattributed.insert(id.clone());
        }
    }
}

impl WindowReconciler for MacosReconciler {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn apply(&mut self, batch: WindowEventBatch) {
        let mut touched: Option<WindowId> = None;

        for event in batch {
            let id = event.window_id().clone();
            match event {
                WindowLifecycleEvent::Created { .. } => {
                    self.windows.entry(id.clone()).or_default();
                }
                WindowLifecycleEvent::Destroyed { .. } => {
                    self.windows.remove(&id);
                    self.unattributed.remove(&id);
                    self.apps.unregister(&id);
                    touched = None;
                    continue;
                }
                WindowLifecycleEvent::TitleChanged { title, .. } => {
                    self.windows.entry(id.clone()).or_default().title = title;
                }
                WindowLifecycleEvent::IdentityHintChanged {
                    desktop_file_hint, ..
                } => {
                    self.windows.entry(id.clone()).or_default().bundle_path = desktop_file_hint;
                }
                _ => continue,
            }
            touched = Some(id);
        }

        if let Some(id) = touched {
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
