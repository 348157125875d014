//! Генератор отслеживания окон: наблюдатель платформы и реконсилер в одной
//! задаче. Свои записи он не создаёт, а дополняет записи приложений.

use crate::error::{LauncherError, Result};
use crate::services::reconciler::{
    run_reconciler, MacosReconciler, WaylandReconciler, WindowReconciler, X11Reconciler,
};
use crate::services::registry::{EntrypointGenerator, GeneratorContext};
use crate::services::window_watcher::{
    translate_macos, translate_wayland, translate_x11, PlatformSource, PlatformWatcher,
    WindowWatcherTrait,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::info;

pub const WINDOW_TRACKING_GENERATOR_ID: &str = "windows";

const EVENT_CHANNEL_CAPACITY: usize = 256;

type SourceFactory = Box<dyn Fn() -> Result<PlatformSource> + Send + Sync>;

pub struct WindowTrackingGenerator {
    id: String,
    source_factory: SourceFactory,
    // Источник создаётся в setup и забирается в run того же цикла
    source: Mutex<Option<PlatformSource>>,
}

impl WindowTrackingGenerator {
    pub fn new<F>(source_factory: F) -> Self
    where
        F: Fn() -> Result<PlatformSource> + Send + Sync + 'static,
    {
        Self {
            id: WINDOW_TRACKING_GENERATOR_ID.to_string(),
            source_factory: Box::new(source_factory),
            source: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl EntrypointGenerator for WindowTrackingGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn setup(&self, _ctx: &GeneratorContext) -> Result<()> {
        let source = (self.source_factory)()?;
        info!("Отслеживание окон: бэкенд {}", source.backend());
        *self.source.lock() = Some(source);
        Ok(())
    }

    async fn run(&self, ctx: &GeneratorContext) -> Result<()> {
        let source = self
            .source
            .lock()
            .take()
            .ok_or_else(|| LauncherError::Internal("источник окон не подготовлен".to_string()))?;

        // Каждый цикл начинается с пустых таблиц окон
        match source {
            PlatformSource::X11(source) => {
                track(
                    PlatformWatcher::new("x11", source, translate_x11),
                    X11Reconciler::new(ctx.clone()),
                    ctx,
                )
                .await
            }
            PlatformSource::Wayland(source) => {
                track(
                    PlatformWatcher::new("wayland", source, translate_wayland),
                    WaylandReconciler::new(ctx.clone()),
                    ctx,
                )
                .await
            }
            PlatformSource::Macos(source) => {
                track(
                    PlatformWatcher::new("macos", source, translate_macos),
                    MacosReconciler::new(ctx.clone()),
                    ctx,
                )
                .await
            }
        }
    }

    async fn cleanup(&self) -> Result<()> {
        self.source.lock().take();
        Ok(())
    }
}

async fn track<W, R>(watcher: W, reconciler: R, ctx: &GeneratorContext) -> Result<()>
where
    W: WindowWatcherTrait + Send + 'static,
    R: WindowReconciler,
{
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let catalog_changes = ctx.registry().subscribe_changes();

    tokio::try_join!(
        Box::new(watcher).run(tx),
        run_reconciler(reconciler, rx, catalog_changes),
    )?;
    Ok(())
}
