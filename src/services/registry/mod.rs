//! EntrypointRegistry: общее хранилище точек входа и менеджер жизненного
//! цикла генераторов.
//!
//! Все изменения каталога из всех задач проходят через `add`/`remove`; запись
//! сериализуется одной блокировкой, поэтому частичных записей не бывает.
//! Разрешение идентичности окон и прочая логика выполняются до вызова и
//! блокировку не держат.

mod generator;
mod open_windows;

pub use generator::{EntrypointGenerator, GeneratorContext};
pub use open_windows::OpenWindows;

use crate::config::RegistryConfig;
use crate::entries::{EntryDraft, LauncherEntry};
use crate::error::Result;
use crate::services::collaborators::SearchIndex;
use generator::GeneratorHandle;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::debug_if_enabled;

#[derive(Debug)]
struct StoredEntry {
    entry: LauncherEntry,
    written_at: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// generator_id -> local_id -> запись
    entries: HashMap<String, HashMap<String, StoredEntry>>,
    write_seq: u64,
}

pub struct EntrypointRegistry {
    state: RwLock<RegistryState>,
    open_windows: OpenWindows,
    search_index: Arc<dyn SearchIndex>,
    generators: Mutex<HashMap<String, GeneratorHandle>>,
    generation: AtomicU64,
    revision: watch::Sender<u64>,
    cleanup_timeout: Duration,
    setup_timeout: Duration,
}

impl EntrypointRegistry {
    pub fn new(config: &RegistryConfig, search_index: Arc<dyn SearchIndex>) -> Arc<Self> {
        info!("Инициализация EntrypointRegistry");

        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            state: RwLock::new(RegistryState::default()),
            open_windows: OpenWindows::new(),
            search_index,
            generators: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            revision,
            cleanup_timeout: Duration::from_millis(config.cleanup_timeout_ms),
            setup_timeout: Duration::from_millis(config.setup_timeout_ms),
        })
    }

    /// Вставляет или заменяет запись `(generator_id, local_id)` со свежим uuid
    pub fn add(&self, generator_id: &str, local_id: &str, draft: EntryDraft) -> Result<Uuid> {
        self.add_with(generator_id, local_id, || draft)
    }

    /// Как `add`, но черновик строится под блокировкой записи: вычисление по
    /// таблице окон и сама запись не перемежаются с чужими записями.
    /// `build` не должен обращаться к реестру.
    pub fn add_with<F>(&self, generator_id: &str, local_id: &str, build: F) -> Result<Uuid>
    where
        F: FnOnce() -> EntryDraft,
    {
        let uuid = {
            let mut state = self.state.write();
            let entry = build().into_entry(generator_id, local_id)?;
            store(&mut state, entry)
        };

        debug_if_enabled!("Точка входа {}/{} зарегистрирована ({})", generator_id, local_id, uuid);
        self.changed();
        Ok(uuid)
    }

    /// Пересобирает самую свежую запись с этим local_id под её же генератором.
    /// `Ok(None)`, если записи нет; удалённая запись не воскрешается.
    pub fn update_latest<F>(&self, local_id: &str, rebuild: F) -> Result<Option<LauncherEntry>>
    where
        F: FnOnce(&LauncherEntry) -> EntryDraft,
    {
        let updated = {
            let mut state = self.state.write();
            let Some(current) = latest(&state, |entry| entry.local_id == local_id) else {
                return Ok(None);
            };
            let generator_id = current.entry.generator_id.clone();
            let entry = rebuild(&current.entry).into_entry(&generator_id, local_id)?;
            store(&mut state, entry.clone());
            entry
        };

        debug_if_enabled!("Точка входа {} пересобрана ({})", updated, updated.uuid);
        self.changed();
        Ok(Some(updated))
    }

    /// Удаляет запись, если она есть. Возвращает, была ли запись.
    pub fn remove(&self, generator_id: &str, local_id: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            let removed = state
                .entries
                .get_mut(generator_id)
                .and_then(|entries| entries.remove(local_id))
                .is_some();
            if state.entries.get(generator_id).is_some_and(|entries| entries.is_empty()) {
                state.entries.remove(generator_id);
            }
            removed
        };

        if removed {
            debug_if_enabled!("Точка входа {}/{} удалена", generator_id, local_id);
        }
        self.changed();
        removed
    }

    #[allow(dead_code)]
    pub fn get(&self, generator_id: &str, local_id: &str) -> Option<LauncherEntry> {
        self.state
            .read()
            .entries
            .get(generator_id)
            .and_then(|entries| entries.get(local_id))
            .map(|stored| stored.entry.clone())
    }

    /// Все записи по local_id поверх всех генераторов; при совпадении побеждает
    /// последняя запись
    pub fn get_all(&self) -> HashMap<String, LauncherEntry> {
        let state = self.state.read();
        let mut latest: HashMap<&str, &StoredEntry> = HashMap::new();

        for stored in state.entries.values().flat_map(|entries| entries.values()) {
            match latest.get(stored.entry.local_id.as_str()) {
                Some(existing) if existing.written_at > stored.written_at => {}
                _ => {
                    latest.insert(&stored.entry.local_id, stored);
                }
            }
        }

        latest
            .into_iter()
            .map(|(local_id, stored)| (local_id.to_string(), stored.entry.clone()))
            .collect()
    }

    /// Самая свежая запись, удовлетворяющая условию
    pub fn find<P>(&self, predicate: P) -> Option<LauncherEntry>
    where
        P: Fn(&LauncherEntry) -> bool,
    {
        latest(&self.state.read(), predicate).map(|stored| stored.entry.clone())
    }

    /// Запись по local_id с тем же правилом, что и `get_all`
    pub fn lookup(&self, local_id: &str) -> Option<LauncherEntry> {
        self.find(|entry| entry.local_id == local_id)
    }

    /// Записи одного генератора, отсортированные по local_id
    pub fn entries_for(&self, generator_id: &str) -> Vec<LauncherEntry> {
        let state = self.state.read();
        let mut entries: Vec<LauncherEntry> = state
            .entries
            .get(generator_id)
            .map(|entries| entries.values().map(|stored| stored.entry.clone()).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.local_id.cmp(&b.local_id));
        entries
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.values().map(|entries| entries.len()).sum()
    }

    pub fn open_windows(&self) -> &OpenWindows {
        &self.open_windows
    }

    /// Подписка на ревизию каталога: значение растёт при каждом изменении
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Идентификаторы генераторов, переживших setup в текущем цикле
    pub fn running_generators(&self) -> HashSet<String> {
        self.generators.lock().keys().cloned().collect()
    }

    /// Цикл обновления: cleanup всех генераторов, очистка каталога и состояния
    /// окон, запуск генераторов заново
    pub async fn run_all(self: &Arc<Self>, generators: Vec<Arc<dyn EntrypointGenerator>>) {
        info!("Перезапуск генераторов ({} шт.)", generators.len());

        self.teardown_generators().await;
        self.clear();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pending = Vec::new();
        let mut seen = HashSet::new();

        for generator in generators {
            let id = generator.id().to_string();
            if !seen.insert(id.clone()) {
                warn!("Генератор '{}' указан повторно, пропускаем", id);
                continue;
            }
            pending.push((id, self.spawn_generator(generator, generation)));
        }

        for (id, ready) in pending {
            match tokio::time::timeout(self.setup_timeout, ready).await {
                Ok(Ok(true)) => debug!("Генератор '{}' запущен", id),
                Ok(Ok(false)) | Ok(Err(_)) => warn!("Генератор '{}' не запустился в этом цикле", id),
                Err(_) => warn!("Генератор '{}' не завершил setup за {:?}", id, self.setup_timeout),
            }
        }

        info!(
            "Генераторы запущены: {} из {}, точек входа: {}",
            self.generators.lock().len(),
            seen.len(),
            self.len()
        );
    }

    /// Остановка всех генераторов без перезапуска
    pub async fn stop_all(&self) {
        info!("Остановка всех генераторов");
        self.teardown_generators().await;
        self.clear();
    }

    fn spawn_generator(
        self: &Arc<Self>,
        generator: Arc<dyn EntrypointGenerator>,
        generation: u64,
    ) -> oneshot::Receiver<bool> {
        let id = generator.id().to_string();
        let token = CancellationToken::new();
        let ctx = GeneratorContext::new(id.clone(), Arc::clone(self), token.clone());
        let (ready_tx, ready_rx) = oneshot::channel();

        // Хэндл вставляется под той же блокировкой, которую задача берёт при
        // сбое, поэтому задача не может удалить себя раньше вставки
        let mut generators = self.generators.lock();

        let task_generator = Arc::clone(&generator);
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = drive_generator(task_generator.as_ref(), &ctx, generation, ready_tx) => {}
            }
        });

        generators.insert(
            id,
            GeneratorHandle {
                generator,
                token,
                task,
                generation,
            },
        );

        ready_rx
    }

    fn forget_generator(&self, generator_id: &str, generation: u64) {
        let mut generators = self.generators.lock();
        if generators
            .get(generator_id)
            .is_some_and(|handle| handle.generation == generation)
        {
            generators.remove(generator_id);
            info!("Генератор '{}' исключён до следующего перезапуска", generator_id);
        }
    }

    async fn teardown_generators(&self) {
        let handles: Vec<GeneratorHandle> = self
            .generators
            .lock()
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        if handles.is_empty() {
            return;
        }

        info!("Остановка {} генераторов", handles.len());

        // Каждый cleanup независим: сбой одного не мешает остальным
        let mut cleanups = JoinSet::new();
        for handle in handles {
            cleanups.spawn(handle.shutdown(self.cleanup_timeout));
        }

        while let Some(result) = cleanups.join_next().await {
            if let Err(e) = result {
                error!("Остановка генератора завершилась паникой: {}", e);
            }
        }
    }

    fn clear(&self) {
        {
            let mut state = self.state.write();
            state.entries.clear();
        }
        self.open_windows.clear();
        self.changed();
    }

    fn changed(&self) {
        self.revision.send_modify(|revision| *revision += 1);
        self.search_index.notify_changed(true);
    }
}

fn latest<P>(state: &RegistryState, predicate: P) -> Option<&StoredEntry>
where
    P: Fn(&LauncherEntry) -> bool,
{
    state
        .entries
        .values()
        .flat_map(|entries| entries.values())
        .filter(|stored| predicate(&stored.entry))
        .max_by_key(|stored| stored.written_at)
}

fn store(state: &mut RegistryState, entry: LauncherEntry) -> Uuid {
    state.write_seq += 1;
    let written_at = state.write_seq;
    let uuid = entry.uuid;
    state
        .entries
        .entry(entry.generator_id.clone())
        .or_default()
        .insert(entry.local_id.clone(), StoredEntry { entry, written_at });
    uuid
}

async fn drive_generator(
    generator: &dyn EntrypointGenerator,
    ctx: &GeneratorContext,
    generation: u64,
    ready: oneshot::Sender<bool>,
) {
    let id = ctx.generator_id();

    // Хэндл убирается до сигнала готовности, чтобы run_all уже видел генератор отсутствующим
    if let Err(e) = generator.setup(ctx).await {
        error!("Ошибка setup генератора '{}': {}", id, e);
        ctx.registry().forget_generator(id, generation);
        let _ = ready.send(false);
        return;
    }
    let _ = ready.send(true);

    match generator.run(ctx).await {
        Ok(()) => debug!("Генератор '{}' завершил работу", id),
        Err(e) => {
            error!("Генератор '{}' завершился с ошибкой: {}", id, e);
            ctx.registry().forget_generator(id, generation);
        }
    }
}

#[cfg(test)]
mod tests;
