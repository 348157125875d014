use crate::config::WindowConfig;
use crate::error::Result;
use crate::events::{MacosEvent, WaylandEvent, WindowEventBatch, X11Event};
use crate::launcher_error;
use crate::utils::WindowBackend;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::dry_run::ScriptedX11Source;
use super::quartz::QuartzPoller;
use super::sway::SwayPoller;
use super::wmctrl::WmctrlPoller;

/// Поток сырых событий платформы. `None` означает, что поток закончился.
#[async_trait::async_trait]
pub trait RawEventSource<E>: Send {
    async fn next_event(&mut self) -> Option<E>;
}

/// Адаптер, который уже разбирает протокол сам, может отдавать события
/// через обычный канал
#[async_trait::async_trait]
impl<E: Send> RawEventSource<E> for mpsc::Receiver<E> {
    async fn next_event(&mut self) -> Option<E> {
        self.recv().await
    }
}

/// Trait for window watchers that feed a reconciler
#[async_trait::async_trait]
pub trait WindowWatcherTrait {
    /// Run until the raw source ends or the reconciler goes away
    async fn run(self: Box<Self>, events: mpsc::Sender<WindowEventBatch>) -> Result<()>;
}

/// Наблюдатель одной платформы: источник и функция перевода его событий
pub struct PlatformWatcher<E> {
    name: &'static str,
    source: Box<dyn RawEventSource<E>>,
    translate: fn(E) -> WindowEventBatch,
}

impl<E> PlatformWatcher<E> {
    pub fn new(
        name: &'static str,
        source: Box<dyn RawEventSource<E>>,
        translate: fn(E) -> WindowEventBatch,
    ) -> Self {
        Self {
            name,
            source,
            translate,
        }
    }
}

#[async_trait::async_trait]
impl<E: Send + 'static> WindowWatcherTrait for PlatformWatcher<E> {
    async fn run(self: Box<Self>, events: mpsc::Sender<WindowEventBatch>) -> Result<()> {
        let PlatformWatcher {
            name,
            mut source,
            translate,
        } = *self;
        info!("Наблюдатель окон {} запущен", name);

        while let Some(raw) = source.next_event().await {
            let batch = translate(raw);
            if batch.is_empty() {
                continue;
            }
            if events.send(batch).await.is_err() {
                debug!("Реконсилер {} остановлен, наблюдатель завершается", name);
                return Ok(());
            }
        }

        warn!("Источник событий окон {} завершился", name);
        Err(launcher_error!(watcher_closed, "источник {} завершился", name))
    }
}

/// Источник событий выбранной платформы
pub enum PlatformSource {
    X11(Box<dyn RawEventSource<X11Event>>),
    Wayland(Box<dyn RawEventSource<WaylandEvent>>),
    Macos(Box<dyn RawEventSource<MacosEvent>>),
}

impl PlatformSource {
    pub fn backend(&self) -> WindowBackend {
        match self {
            PlatformSource::X11(_) => WindowBackend::X11,
            PlatformSource::Wayland(_) => WindowBackend::Wayland,
            PlatformSource::Macos(_) => WindowBackend::Macos,
        }
    }
}

/// Factory function to create the raw event source for a backend
pub fn create_event_source(
    backend: WindowBackend,
    config: &WindowConfig,
    dry_run: bool,
) -> Result<PlatformSource> {
    if dry_run {
        return Ok(PlatformSource::X11(Box::new(ScriptedX11Source::new())));
    }

    let interval = Duration::from_millis(config.polling_interval_ms);
    match backend {
        WindowBackend::X11 => Ok(PlatformSource::X11(Box::new(WmctrlPoller::new(interval)))),
        WindowBackend::Wayland => Ok(PlatformSource::Wayland(Box::new(SwayPoller::new(interval)))),
        WindowBackend::Macos => Ok(PlatformSource::Macos(Box::new(QuartzPoller::new(interval)))),
    }
}
