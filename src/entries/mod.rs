//! Модель точки входа лаунчера: то, что генераторы пишут в реестр.

use crate::error::{LauncherError, Result};
use crate::events::WindowId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Произвольная команда генератора
#[derive(Clone)]
pub struct CommandCallback(Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>);

impl CommandCallback {
    #[allow(dead_code)]
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub fn call(&self) -> anyhow::Result<()> {
        (self.0)()
    }
}

impl fmt::Debug for CommandCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandCallback(..)")
    }
}

/// Что выполняет действие типа `Command`
#[derive(Debug, Clone)]
pub enum ActionCommand {
    OpenApplication { app_id: String },
    FocusWindow { window_id: WindowId, app_id: String },
    /// Для генераторов, которые выполняют действие сами
    #[allow(dead_code)]
    Callback(CommandCallback),
}

/// Компонент, который открывает действие типа `View`.
/// Рендерер внешний, для ядра это непрозрачные данные.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewComponent {
    WindowList {
        app_id: String,
        windows: Vec<OpenWindowRecord>,
    },
    #[allow(dead_code)]
    Custom {
        name: String,
        props: serde_json::Value,
    },
}

#[derive(Debug, Clone)]
pub enum Action {
    Command {
        action_ref: Option<String>,
        label: String,
        run: ActionCommand,
    },
    View {
        action_ref: Option<String>,
        label: String,
        view: ViewComponent,
    },
}

impl Action {
    pub fn label(&self) -> &str {
        match self {
            Action::Command { label, .. } | Action::View { label, .. } => label,
        }
    }

    pub fn action_ref(&self) -> Option<&str> {
        match self {
            Action::Command { action_ref, .. } | Action::View { action_ref, .. } => {
                action_ref.as_deref()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessory {
    pub text: String,
    pub icon: Option<String>,
}

impl Accessory {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon: None,
        }
    }
}

/// Открытое окно верхнего уровня, привязанное к приложению
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindowRecord {
    pub window_id: WindowId,
    pub app_id: String,
    pub title: String,
}

/// Зарегистрированная точка входа.
///
/// `(generator_id, local_id)` стабильный ключ, `uuid` меняется при каждой
/// перерегистрации.
#[derive(Debug, Clone)]
pub struct LauncherEntry {
    pub generator_id: String,
    pub local_id: String,
    pub uuid: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub startup_wm_class: Option<String>,
    pub accessories: Vec<Accessory>,
    pub actions: Vec<Action>,
}

impl LauncherEntry {
    /// Черновик с тем же содержимым, для повторной регистрации с новыми действиями
    pub fn to_draft(&self) -> EntryDraft {
        EntryDraft {
            name: self.name.clone(),
            icon: self.icon.clone(),
            startup_wm_class: self.startup_wm_class.clone(),
            accessories: self.accessories.clone(),
            actions: self.actions.iter().map(ActionDraft::from).collect(),
        }
    }
}

impl fmt::Display for LauncherEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} \"{}\"", self.generator_id, self.local_id, self.name)
    }
}

/// Действие в том виде, в котором его присылает генератор.
/// Форма проверяется при регистрации: задано ровно одно из `run`/`view`.
#[derive(Debug, Clone, Default)]
pub struct ActionDraft {
    pub action_ref: Option<String>,
    pub label: String,
    pub run: Option<ActionCommand>,
    pub view: Option<ViewComponent>,
}

impl ActionDraft {
    pub fn command(label: impl Into<String>, run: ActionCommand) -> Self {
        Self {
            label: label.into(),
            run: Some(run),
            ..Self::default()
        }
    }

    pub fn view(label: impl Into<String>, view: ViewComponent) -> Self {
        Self {
            label: label.into(),
            view: Some(view),
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn with_ref(mut self, action_ref: impl Into<String>) -> Self {
        self.action_ref = Some(action_ref.into());
        self
    }

    fn into_action(self, index: usize) -> Result<Action> {
        match (self.run, self.view) {
            (Some(run), None) => Ok(Action::Command {
                action_ref: self.action_ref,
                label: self.label,
                run,
            }),
            (None, Some(view)) => Ok(Action::View {
                action_ref: self.action_ref,
                label: self.label,
                view,
            }),
            (Some(_), Some(_)) => LauncherError::invalid_entry(format!(
                "действие #{} '{}' задаёт и run, и view",
                index, self.label
            )),
            (None, None) => LauncherError::invalid_entry(format!(
                "действие #{} '{}' не задаёт ни run, ни view",
                index, self.label
            )),
        }
    }
}

impl From<&Action> for ActionDraft {
    fn from(action: &Action) -> Self {
        match action.clone() {
            Action::Command { action_ref, label, run } => Self {
                action_ref,
                label,
                run: Some(run),
                view: None,
            },
            Action::View { action_ref, label, view } => Self {
                action_ref,
                label,
                run: None,
                view: Some(view),
            },
        }
    }
}

/// Содержимое точки входа до регистрации
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    pub name: String,
    pub icon: Option<String>,
    pub startup_wm_class: Option<String>,
    pub accessories: Vec<Accessory>,
    pub actions: Vec<ActionDraft>,
}

impl EntryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_startup_wm_class(mut self, class: Option<String>) -> Self {
        self.startup_wm_class = class;
        self
    }

    #[allow(dead_code)]
    pub fn with_action(mut self, action: ActionDraft) -> Self {
        self.actions.push(action);
        self
    }

    /// Проверяет инварианты и превращает черновик в точку входа со свежим uuid
    pub fn into_entry(self, generator_id: &str, local_id: &str) -> Result<LauncherEntry> {
        if self.actions.is_empty() {
            return LauncherError::invalid_entry(format!(
                "у '{}/{}' нет ни одного действия",
                generator_id, local_id
            ));
        }

        let mut refs = HashSet::new();
        let mut actions = Vec::with_capacity(self.actions.len());
        for (index, draft) in self.actions.into_iter().enumerate() {
            if let Some(action_ref) = &draft.action_ref {
                if !refs.insert(action_ref.clone()) {
                    return LauncherError::invalid_entry(format!(
                        "повторяющийся ref '{}' у '{}/{}'",
                        action_ref, generator_id, local_id
                    ));
                }
            }
            actions.push(draft.into_action(index)?);
        }

        Ok(LauncherEntry {
            generator_id: generator_id.to_string(),
            local_id: local_id.to_string(),
            uuid: Uuid::new_v4(),
            name: self.name,
            icon: self.icon,
            startup_wm_class: self.startup_wm_class,
            accessories: self.accessories,
            actions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_action() -> ActionDraft {
        ActionDraft::command(
            "Open application",
            ActionCommand::OpenApplication { app_id: "firefox".to_string() },
        )
    }

    #[test]
    fn test_entry_without_actions_is_rejected() {
        let result = EntryDraft::new("Firefox").into_entry("applications", "firefox");
        assert!(matches!(result, Err(LauncherError::InvalidEntry(_))));
    }

    #[test]
    fn test_action_with_run_and_view_is_rejected() {
        let mut action = open_action();
        action.view = Some(ViewComponent::Custom {
            name: "details".to_string(),
            props: serde_json::Value::Null,
        });

        let result = EntryDraft::new("Firefox")
            .with_action(action)
            .into_entry("applications", "firefox");
        assert!(matches!(result, Err(LauncherError::InvalidEntry(_))));
    }

    #[test]
    fn test_action_without_run_or_view_is_rejected() {
        let action = ActionDraft {
            label: "Nothing".to_string(),
            ..ActionDraft::default()
        };

        let result = EntryDraft::new("Firefox")
            .with_action(action)
            .into_entry("applications", "firefox");
        assert!(matches!(result, Err(LauncherError::InvalidEntry(_))));
    }

    #[test]
    fn test_duplicate_refs_are_rejected() {
        let result = EntryDraft::new("Firefox")
            .with_action(open_action().with_ref("open"))
            .with_action(open_action().with_ref("open"))
            .into_entry("applications", "firefox");
        assert!(matches!(result, Err(LauncherError::InvalidEntry(_))));
    }

    #[test]
    fn test_valid_entry_gets_fresh_uuid() {
        let draft = EntryDraft::new("Firefox").with_action(open_action());

        let first = draft.clone().into_entry("applications", "firefox").unwrap();
        let second = draft.into_entry("applications", "firefox").unwrap();

        assert_ne!(first.uuid, second.uuid);
        assert_eq!(first.actions.len(), 1);
        assert_eq!(first.actions[0].label(), "Open application");
    }

    #[test]
    fn test_to_draft_keeps_content() {
        let entry = EntryDraft::new("Firefox")
            .with_icon(Some("firefox".to_string()))
            .with_startup_wm_class(Some("firefox".to_string()))
            .with_action(open_action().with_ref("open"))
            .into_entry("applications", "org.mozilla.firefox")
            .unwrap();

        let again = entry.to_draft().into_entry("applications", "org.mozilla.firefox").unwrap();
        assert_eq!(again.name, "Firefox");
        assert_eq!(again.startup_wm_class.as_deref(), Some("firefox"));
        assert_eq!(again.actions[0].action_ref(), Some("open"));
        assert_ne!(again.uuid, entry.uuid);
    }
}
