//! Выполнение действий точек входа: по индексу (основное/дополнительное
//! действие) и по сочетанию клавиш через `ref`.

use crate::entries::{Action, ActionCommand, LauncherEntry};
use crate::error::{LauncherError, Result};
use crate::events::{Modifiers, Shortcut};
use crate::services::collaborators::{ShortcutTable, ViewRenderer};
use crate::services::platform::PlatformActions;
use crate::services::registry::EntrypointRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ActionDispatcher {
    registry: Arc<EntrypointRegistry>,
    platform: Arc<dyn PlatformActions>,
    renderer: Arc<dyn ViewRenderer>,
    shortcuts: Arc<dyn ShortcutTable>,
}

impl ActionDispatcher {
    pub fn new(
        registry: Arc<EntrypointRegistry>,
        platform: Arc<dyn PlatformActions>,
        renderer: Arc<dyn ViewRenderer>,
        shortcuts: Arc<dyn ShortcutTable>,
    ) -> Self {
        Self {
            registry,
            platform,
            renderer,
            shortcuts,
        }
    }

    /// Действие `index` записи `local_id` (0 основное, 1 дополнительное).
    /// Ошибка логируется и возвращается, вызывающий цикл не падает.
    pub fn run_action(&self, local_id: &str, index: usize) -> Result<()> {
        let result = self.resolve(local_id, index).and_then(|(entry, action)| {
            self.execute(&entry, &action)
        });

        if let Err(e) = &result {
            warn!("Действие #{} для '{}' не выполнено: {}", index, local_id, e);
        }
        result
    }

    /// Найти `ref` по сочетанию и выполнить действие с этим `ref` среди записей
    /// генератора. `Ok(false)`, если сочетание ни к чему не привязано.
    pub fn run_action_for_shortcut(
        &self,
        generator_id: &str,
        key: &str,
        modifiers: Modifiers,
    ) -> Result<bool> {
        let shortcut = Shortcut::new(key, modifiers);
        let Some(action_ref) = self.shortcuts.resolve_ref(generator_id, &shortcut) else {
            debug!("Сочетание {} не привязано для '{}'", shortcut, generator_id);
            return Ok(false);
        };

        let found = self
            .registry
            .entries_for(generator_id)
            .into_iter()
            .find_map(|entry| {
                let action = entry
                    .actions
                    .iter()
                    .find(|action| action.action_ref() == Some(action_ref.as_str()))?
                    .clone();
                Some((entry, action))
            });

        let Some((entry, action)) = found else {
            let e = LauncherError::UnknownActionRef {
                generator_id: generator_id.to_string(),
                action_ref,
            };
            warn!("Сочетание {}: {}", shortcut, e);
            return Err(e);
        };

        match self.execute(&entry, &action) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Сочетание {} для {}: {}", shortcut, entry, e);
                Err(e)
            }
        }
    }

    fn resolve(&self, local_id: &str, index: usize) -> Result<(LauncherEntry, Action)> {
        let entry = self
            .registry
            .lookup(local_id)
            .ok_or_else(|| LauncherError::UnknownEntry(local_id.to_string()))?;

        let action = entry.actions.get(index).cloned().ok_or_else(|| {
            LauncherError::ActionIndexOutOfRange {
                local_id: local_id.to_string(),
                index,
                len: entry.actions.len(),
            }
        })?;

        Ok((entry, action))
    }

    fn execute(&self, entry: &LauncherEntry, action: &Action) -> Result<()> {
        info!("Выполнение '{}' для {}", action.label(), entry);

        match action {
            Action::Command { run, .. } => match run {
                ActionCommand::OpenApplication { app_id } => self.platform.open_application(app_id),
                ActionCommand::FocusWindow { window_id, app_id } => {
                    self.platform.focus_window(window_id, app_id)
                }
                ActionCommand::Callback(callback) => callback
                    .call()
                    .map_err(|e| LauncherError::Internal(format!("команда '{}': {}", action.label(), e))),
            },
            Action::View { view, .. } => self.renderer.open_view(view),
        }
    }
}
