//! Внешние соавторы ядра: поисковый индекс, таблица сочетаний клавиш и
//! рендерер представлений. Ядро видит только эти интерфейсы.

use crate::config::ShortcutBinding;
use crate::entries::ViewComponent;
use crate::error::Result;
use crate::events::{Modifiers, Shortcut};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Поисковый индекс, которому сообщают о каждом изменении реестра.
/// Вызов не должен блокировать вызывающего.
pub trait SearchIndex: Send + Sync {
    fn notify_changed(&self, refresh_list: bool);
}

/// Индекс, пересылающий уведомления в канал; потребитель живёт в отдельной задаче
pub struct ChannelSearchIndex {
    tx: mpsc::UnboundedSender<bool>,
}

impl ChannelSearchIndex {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<bool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SearchIndex for ChannelSearchIndex {
    fn notify_changed(&self, refresh_list: bool) {
        if self.tx.send(refresh_list).is_err() {
            debug!("Потребитель уведомлений поискового индекса уже остановлен");
        }
    }
}

/// Разрешает сочетание клавиш в `ref` действия
pub trait ShortcutTable: Send + Sync {
    fn resolve_ref(&self, generator_id: &str, shortcut: &Shortcut) -> Option<String>;
}

/// Таблица сочетаний из секции `[[shortcuts]]` конфигурации
pub struct ConfiguredShortcuts {
    bindings: HashMap<(String, Shortcut), String>,
}

impl ConfiguredShortcuts {
    pub fn new(bindings: &[ShortcutBinding]) -> Self {
        let bindings = bindings
            .iter()
            .map(|binding| {
                let shortcut = Shortcut::new(&binding.key, Modifiers::from_vec(&binding.modifiers));
                ((binding.generator.clone(), shortcut), binding.action.clone())
            })
            .collect::<HashMap<_, _>>();

        info!("Загружено {} сочетаний клавиш", bindings.len());
        Self { bindings }
    }
}

impl ShortcutTable for ConfiguredShortcuts {
    fn resolve_ref(&self, generator_id: &str, shortcut: &Shortcut) -> Option<String> {
        self.bindings
            .get(&(generator_id.to_string(), shortcut.clone()))
            .cloned()
    }
}

/// Открывает представление, на которое указывает действие типа `View`
pub trait ViewRenderer: Send + Sync {
    fn open_view(&self, view: &ViewComponent) -> Result<()>;
}

/// Рендерер без UI: только пишет в лог, что было бы открыто
pub struct LoggingViewRenderer;

impl ViewRenderer for LoggingViewRenderer {
    fn open_view(&self, view: &ViewComponent) -> Result<()> {
        match view {
            ViewComponent::WindowList { app_id, windows } => {
                info!("Открытие списка окон '{}' ({} шт.)", app_id, windows.len());
                for window in windows {
                    info!("  [{}] {}", window.window_id, window.title);
                }
            }
            ViewComponent::Custom { name, .. } => {
                info!("Открытие представления '{}'", name);
            }
        }
        Ok(())
    }
}
