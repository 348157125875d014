//! Реконсилер X11: проверка окна верхнего уровня с обходом предков и
//! разрешение приложения по цепочке подсказок.

use super::{AppWindows, WindowReconciler};
use crate::events::{WindowEventBatch, WindowId, WindowLifecycleEvent, WindowType};
use crate::services::registry::GeneratorContext;
use std::collections::{HashMap, HashSet};

use crate::debug_if_enabled;
use crate::trace_if_enabled;

/// Всё, что известно об одном окне X11
#[derive(Debug, Clone, Default)]
pub struct X11WindowState {
    pub id: WindowId,
    pub parent_id: Option<WindowId>,
    pub override_redirect: bool,
    pub mapped: bool,
    pub class: String,
    pub instance: String,
    pub title: String,
    pub protocols: Vec<String>,
    pub window_group: Option<WindowId>,
    pub transient_for: Option<WindowId>,
    pub window_types: Vec<WindowType>,
    pub desktop_file_name: Option<String>,
}

impl X11WindowState {
    fn new(id: WindowId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Откуда взялся id приложения
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// desktop-файл или совпадение startup_wm_class
    Hinted(String),
    /// сам instance или class окна
    Literal(String),
}

impl Resolution {
    pub fn app_id(&self) -> &str {
        match self {
            Resolution::Hinted(app_id) | Resolution::Literal(app_id) => app_id,
        }
    }
}

pub struct X11Reconciler {
    windows: HashMap<WindowId, X11WindowState>,
    unattributed: HashSet<WindowId>,
    /// Окна, привязанные по литеральному instance/class: при появлении записи
    /// с подходящим startup_wm_class привязка меняется
    literal: HashSet<WindowId>,
    apps: AppWindows,
}

impl X11Reconciler {
    pub fn new(ctx: GeneratorContext) -> Self {
        Self {
            windows: HashMap::new(),
            unattributed: HashSet::new(),
            literal: HashSet::new(),
            apps: AppWindows::new(ctx),
        }
    }

    #[allow(dead_code)]
    pub fn window(&self, id: &WindowId) -> Option<&X11WindowState> {
        self.windows.get(id)
    }

    fn state_mut(&mut self, id: &WindowId) -> &mut X11WindowState {
        self.windows
            .entry(id.clone())
            .or_insert_with(|| X11WindowState::new(id.clone()))
    }

    /// Обновить поля состояния; окна для перепроверки добавляются в `touched`
    fn update(&mut self, event: WindowLifecycleEvent, touched: &mut Vec<WindowId>) {
        let id = event.window_id().clone();

        match event {
            WindowLifecycleEvent::Created { .. } => {
                self.state_mut(&id);
            }
            WindowLifecycleEvent::Destroyed { .. } => {
                self.windows.remove(&id);
                self.unattributed.remove(&id);
                self.literal.remove(&id);
                touched.retain(|w| *w != id);
                self.apps.unregister(&id);
                return;
            }
            WindowLifecycleEvent::VisibilityChanged { mapped, .. } => {
                self.state_mut(&id).mapped = mapped;
                touched.extend(self.descendants(&id));
            }
            WindowLifecycleEvent::TitleChanged { title, .. } => {
                self.state_mut(&id).title = title;
            }
            WindowLifecycleEvent::IdentityHintChanged {
                class_hint,
                instance_hint,
                desktop_file_hint,
                ..
            } => {
                let state = self.state_mut(&id);
                if let Some(class) = class_hint {
                    state.class = class;
                }
                if let Some(instance) = instance_hint {
                    state.instance = instance;
                }
                if let Some(desktop_file) = desktop_file_hint {
                    state.desktop_file_name = Some(desktop_file).filter(|name| !name.is_empty());
                }
            }
            WindowLifecycleEvent::ReparentedTo { parent_id, .. } => {
                self.state_mut(&id).parent_id = Some(parent_id);
                touched.extend(self.descendants(&id));
            }
            WindowLifecycleEvent::Ancillary {
                override_redirect,
                transient_for,
                window_types,
                window_group,
                protocols,
                ..
            } => {
                let state = self.state_mut(&id);
                if let Some(override_redirect) = override_redirect {
                    state.override_redirect = override_redirect;
                }
                if let Some(transient_for) = transient_for {
                    state.transient_for = transient_for;
                }
                if let Some(window_types) = window_types {
                    state.window_types = window_types;
                }
                if let Some(window_group) = window_group {
                    state.window_group = window_group;
                }
                if let Some(protocols) = protocols {
                    state.protocols = protocols;
                }
            }
        }

        touched.push(id);
    }

    /// Окна, в цепочке предков которых есть `ancestor`
    fn descendants(&self, ancestor: &WindowId) -> Vec<WindowId> {
        self.windows
            .keys()
            .filter(|id| *id != ancestor && self.ancestors(id).any(|p| p == ancestor))
            .cloned()
            .collect()
    }

    /// Предки окна, известные таблице. Длина обхода ограничена размером таблицы,
    /// так что цикл в родителях не зацикливает обход.
    fn ancestors<'a>(&'a self, id: &WindowId) -> impl Iterator<Item = &'a WindowId> + 'a {
        let mut next = self.windows.get(id).and_then(|w| w.parent_id.as_ref());
        std::iter::from_fn(move || {
            let current = next?;
            let parent = self.windows.get(current)?;
            next = parent.parent_id.as_ref();
            Some(&parent.id)
        })
        .take(self.windows.len())
    }

    /// Окно верхнего уровня, которое может представлять приложение
    pub fn validate(&self, id: &WindowId) -> bool {
        let Some(window) = self.windows.get(id) else {
            return false;
        };

        if window.override_redirect || window.transient_for.is_some() || !window.mapped {
            return false;
        }
        if !window.window_types.contains(&WindowType::Normal) {
            return false;
        }

        self.ancestors(id)
            .all(|parent| self.windows.get(parent).is_some_and(|p| p.mapped))
    }

    /// Цепочка подсказок: desktop-файл, startup_wm_class по instance и class,
    /// затем сами instance и class
    pub fn resolve(&self, window: &X11WindowState) -> Option<Resolution> {
        if let Some(desktop_file) = &window.desktop_file_name {
            return Some(Resolution::Hinted(desktop_file.clone()));
        }

        let hints = [&window.instance, &window.class];
        hints
            .into_iter()
            .filter(|hint| !hint.is_empty())
            .find_map(|hint| self.apps.entry_by_wm_class(hint))
            .map(Resolution::Hinted)
            .or_else(|| {
                hints
                    .into_iter()
                    .find(|hint| !hint.is_empty())
                    .map(|hint| Resolution::Literal(hint.clone()))
            })
    }

    fn reconcile(&mut self, id: &WindowId) {
        if !self.validate(id) {
            self.unattributed.remove(id);
            self.literal.remove(id);
            self.apps.unregister(id);
            return;
        }

        let Some(window) = self.windows.get(id) else {
            return;
        };

        match self.resolve(window) {
            Some(resolution) if self.apps.entry_exists(resolution.app_id()) => {
                let title = window.title.clone();
                self.unattributed.remove(id);
                if matches!(resolution, Resolution::Literal(_)) {
                    self.literal.insert(id.clone());
                } else {
                    self.literal.remove(id);
                }
                self.apps.register(id, resolution.app_id(), &title);
            }
            resolved => {
                debug_if_enabled!(
                    "Окно {} (class={:?}, instance={:?}) не относится ни к одному приложению: {:?}",
                    id,
                    window.class,
                    window.instance,
                    resolved
                );
                self.unattributed.insert(id.clone());
                self.literal.remove(id);
                self.apps.unregister(id);
            }
        }
    }
}

impl WindowReconciler for X11Reconciler {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn apply(&mut self, batch: WindowEventBatch) {
        let mut touched = Vec::with_capacity(batch.len());
        for event in batch {
            trace_if_enabled!("X11: {}", event);
            self.update(event, &mut touched);
        }

        let mut seen = HashSet::new();
        for id in touched {
            if seen.insert(id.clone()) && self.windows.contains_key(&id) {
                self.reconcile(&id);
            }
        }
    }

    fn retry_unattributed(&mut self) {
        let pending: Vec<WindowId> = self
            .unattributed
            .iter()
            .chain(self.literal.iter())
            .cloned()
            .collect();
        for id in pending {
            self.reconcile(&id);
        }
    }
}
