//! Реконсилеры окон: превращают нормализованные события жизненного цикла
//! окон в записи об открытых окнах и пересчитывают действия приложений.
//!
//! Таблицы состояния окон принадлежат задаче реконсилера и не разделяются;
//! наружу уходят только вызовы `add` реестра.

pub mod derive;
pub mod macos;
pub mod wayland;
pub mod x11;

pub use macos::MacosReconciler;
pub use wayland::WaylandReconciler;
pub use x11::X11Reconciler;

use crate::entries::OpenWindowRecord;
use crate::error::Result;
use crate::events::{WindowEventBatch, WindowId};
use crate::launcher_error;
use crate::services::registry::GeneratorContext;
use derive::derive_presentation;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::debug_if_enabled;

pub trait WindowReconciler: Send {
    fn name(&self) -> &'static str;

    /// Применить пачку событий одного сырого события платформы
    fn apply(&mut self, batch: WindowEventBatch);

    /// Повторить разрешение окон без записи или с литеральной привязкой.
    /// Вызывается при каждом изменении каталога.
    fn retry_unattributed(&mut self);
}

/// Цикл реконсилера: события окон и изменения каталога.
/// Завершается ошибкой, когда наблюдатель закрывает канал.
pub async fn run_reconciler<R>(
    mut reconciler: R,
    mut events: mpsc::Receiver<WindowEventBatch>,
    mut catalog_changes: watch::Receiver<u64>,
) -> Result<()>
where
    R: WindowReconciler,
{
    info!("Реконсилер {} запущен", reconciler.name());
    catalog_changes.borrow_and_update();

    loop {
        tokio::select! {
            batch = events.recv() => match batch {
                Some(batch) => reconciler.apply(batch),
                None => {
                    warn!("Поток событий окон {} закрыт", reconciler.name());
                    return Err(launcher_error!(watcher_closed, "{}", reconciler.name()));
                }
            },
            changed = catalog_changes.changed() => {
                if changed.is_err() {
                    debug!("Реестр закрыт, реконсилер {} завершается", reconciler.name());
                    return Ok(());
                }
                catalog_changes.borrow_and_update();
                reconciler.retry_unattributed();
            }
        }
    }
}

/// Общий последний шаг всех реконсилеров: запись об окне и пересчёт
/// действий записи приложения
pub(crate) struct AppWindows {
    ctx: GeneratorContext,
}

impl AppWindows {
    pub(crate) fn new(ctx: GeneratorContext) -> Self {
        Self { ctx }
    }

    pub(crate) fn entry_exists(&self, app_id: &str) -> bool {
        self.ctx.registry().lookup(app_id).is_some()
    }

    /// Локальный id записи, у которой `startup_wm_class` совпадает с подсказкой
    pub(crate) fn entry_by_wm_class(&self, hint: &str) -> Option<String> {
        self.ctx
            .registry()
            .find(|entry| entry.startup_wm_class.as_deref() == Some(hint))
            .map(|entry| entry.local_id)
    }

    /// Вставить или обновить запись об окне; пересчёт только при изменении
    pub(crate) fn register(&self, window_id: &WindowId, app_id: &str, title: &str) {
        let record = OpenWindowRecord {
            window_id: window_id.clone(),
            app_id: app_id.to_string(),
            title: title.to_string(),
        };

        let previous = self.ctx.open_windows().upsert(record.clone());
        if previous.as_ref() == Some(&record) {
            return;
        }

        debug_if_enabled!("Окно {} -> {} \"{}\"", window_id, app_id, title);
        if let Some(previous) = previous.filter(|previous| previous.app_id != app_id) {
            self.refresh(&previous.app_id);
        }
        self.refresh(app_id);
    }

    /// Убрать запись об окне, если она есть, и пересчитать её приложение
    pub(crate) fn unregister(&self, window_id: &WindowId) {
        if let Some(record) = self.ctx.open_windows().remove(window_id) {
            debug_if_enabled!("Окно {} больше не относится к {}", window_id, record.app_id);
            self.refresh(&record.app_id);
        }
    }

    /// Перерегистрировать запись приложения с действиями по текущим окнам
    /// под её собственным генератором. Окна читаются под блокировкой реестра.
    pub(crate) fn refresh(&self, app_id: &str) {
        let open_windows = self.ctx.open_windows();
        let result = self.ctx.update_latest(app_id, |entry| {
            let windows = open_windows.for_app(app_id);
            let (actions, accessories) = derive_presentation(app_id, &windows);

            let mut draft = entry.to_draft();
            draft.actions = actions;
            draft.accessories = accessories;
            draft
        });

        match result {
            Ok(Some(_)) => {}
            Ok(None) => debug!("Запись {} исчезла из каталога, пересчёт пропущен", app_id),
            Err(e) => debug!("Не удалось обновить {}: {}", app_id, e),
        }
    }
}
