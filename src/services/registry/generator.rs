use crate::entries::{EntryDraft, LauncherEntry};
use crate::error::Result;
use crate::launcher_error;
use crate::services::registry::{EntrypointRegistry, OpenWindows};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Генератор точек входа: независимая задача, которая со временем регистрирует
/// и отзывает записи каталога.
#[async_trait::async_trait]
pub trait EntrypointGenerator: Send + Sync {
    fn id(&self) -> &str;

    /// Начальная регистрация. `run_all` дожидается её завершения.
    async fn setup(&self, _ctx: &GeneratorContext) -> Result<()> {
        Ok(())
    }

    /// Долгоживущая часть; прерывается отменой контекста
    async fn run(&self, ctx: &GeneratorContext) -> Result<()> {
        ctx.cancelled().await;
        Ok(())
    }

    /// Вызывается перед перезапуском генератора или остановкой реестра
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

/// То, что генератор получает от реестра на время одного цикла
#[derive(Clone)]
pub struct GeneratorContext {
    generator_id: String,
    registry: Arc<EntrypointRegistry>,
    token: CancellationToken,
}

impl GeneratorContext {
    pub(crate) fn new(
        generator_id: impl Into<String>,
        registry: Arc<EntrypointRegistry>,
        token: CancellationToken,
    ) -> Self {
        Self {
            generator_id: generator_id.into(),
            registry,
            token,
        }
    }

    pub fn generator_id(&self) -> &str {
        &self.generator_id
    }

    pub fn registry(&self) -> &Arc<EntrypointRegistry> {
        &self.registry
    }

    pub fn open_windows(&self) -> &OpenWindows {
        self.registry.open_windows()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Регистрирует запись от имени своего генератора
    pub fn add(&self, local_id: &str, draft: EntryDraft) -> Result<Uuid> {
        self.ensure_active()?;
        self.registry.add(&self.generator_id, local_id, draft)
    }

    /// Регистрирует запись, черновик которой строится под блокировкой реестра
    pub fn add_with<F>(&self, local_id: &str, build: F) -> Result<Uuid>
    where
        F: FnOnce() -> EntryDraft,
    {
        self.ensure_active()?;
        self.registry.add_with(&self.generator_id, local_id, build)
    }

    /// Пересобирает чужую или свою запись по local_id, см. `EntrypointRegistry::update_latest`
    pub fn update_latest<F>(&self, local_id: &str, rebuild: F) -> Result<Option<LauncherEntry>>
    where
        F: FnOnce(&LauncherEntry) -> EntryDraft,
    {
        self.ensure_active()?;
        self.registry.update_latest(local_id, rebuild)
    }

    pub fn remove(&self, local_id: &str) -> Result<bool> {
        self.ensure_active()?;
        Ok(self.registry.remove(&self.generator_id, local_id))
    }

    // После отмены задача может ещё доработать до ближайшей точки ожидания;
    // записи от неё в очищенный реестр попасть не должны
    fn ensure_active(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(launcher_error!(generator_failed, "генератор '{}' остановлен", self.generator_id));
        }
        Ok(())
    }
}

/// Запущенный генератор
pub(crate) struct GeneratorHandle {
    pub(crate) generator: Arc<dyn EntrypointGenerator>,
    pub(crate) token: CancellationToken,
    pub(crate) task: JoinHandle<()>,
    pub(crate) generation: u64,
}

impl GeneratorHandle {
    /// Отмена + cleanup + ожидание задачи. Ошибки только логируются.
    pub(crate) async fn shutdown(self, timeout: Duration) {
        let id = self.generator.id().to_string();
        let mut task = self.task;

        self.token.cancel();

        match tokio::time::timeout(timeout, self.generator.cleanup()).await {
            Ok(Ok(())) => debug!("cleanup генератора '{}' выполнен", id),
            Ok(Err(e)) => error!("Ошибка cleanup генератора '{}': {}", id, e),
            Err(_) => warn!("Таймаут cleanup генератора '{}'", id),
        }

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => debug!("Задача генератора '{}' завершена", id),
            Ok(Err(e)) if e.is_panic() => error!("Задача генератора '{}' завершилась паникой", id),
            Ok(Err(_)) => debug!("Задача генератора '{}' прервана", id),
            Err(_) => {
                warn!("Задача генератора '{}' не завершилась за {:?}, прерываем", id, timeout);
                task.abort();
            }
        }
    }
}
