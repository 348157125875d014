use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
mod config;
mod entries;
mod error;
mod events;
mod services;
mod utils;

use config::Config;
use services::{
    create_event_source, create_platform_actions, ActionDispatcher, AppScannerGenerator,
    ChannelSearchIndex, ConfiguredShortcuts, EntrypointGenerator, EntrypointRegistry,
    LoggingViewRenderer, WindowTrackingGenerator,
};
use utils::WindowBackend;

#[derive(Parser, Debug)]
#[command(name = "launcher-rust")]
#[command(about = "Каталог точек входа лаунчера с отслеживанием открытых окон приложений")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "launcher.toml")]
    config: String,

    /// Режим сухого запуска (эмуляция окон, без реальных действий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Arc::new(Config::load(&args.config)?);

    // Инициализация системы логирования
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level)?;

    info!("Запуск Launcher Rust v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - события окон эмулируются, действия только логируются");
    }

    let backend = utils::resolve_backend(&config.window.backend)?;
    match backend {
        Some(backend) => {
            info!("Бэкенд отслеживания окон: {}", backend);
            if !args.dry_run {
                utils::session::check_backend_tools(backend);
            }
        }
        None => warn!("Бэкенд окон не определён, отслеживание окон выключено"),
    }

    // Поисковый индекс: уведомления об изменениях каталога
    let (search_index, mut index_rx) = ChannelSearchIndex::new();
    let registry = EntrypointRegistry::new(&config.registry, Arc::new(search_index));

    let index_registry = Arc::downgrade(&registry);
    let index_handle = tokio::spawn(async move {
        while let Some(mut refresh_list) = index_rx.recv().await {
            // Пачка уведомлений схлопывается в одно обновление
            while let Ok(more) = index_rx.try_recv() {
                refresh_list |= more;
            }
            if let Some(registry) = index_registry.upgrade() {
                debug_if_enabled!(
                    "Поисковый индекс обновлён: записей {}, обновление списка: {}",
                    registry.len(),
                    refresh_list
                );
            }
        }
    });

    let dispatcher = Arc::new(ActionDispatcher::new(
        Arc::clone(&registry),
        create_platform_actions(backend, args.dry_run),
        Arc::new(LoggingViewRenderer),
        Arc::new(ConfiguredShortcuts::new(&config.shortcuts)),
    ));

    let generators = build_generators(&config, backend, args.dry_run);
    refresh_generators(&registry, &generators).await;

    info!("Все компоненты инициализированы");

    let (refresh_tx, mut refresh_rx) = mpsc::channel(4);
    let console_handle = std::io::stdin().is_terminal().then(|| {
        tokio::spawn(services::console::run_console(
            Arc::clone(&dispatcher),
            Arc::clone(&registry),
            refresh_tx.clone(),
        ))
    });

    let mut hangup = hangup_stream();

    // Ожидание сигнала завершения; SIGHUP и `refresh` перезапускают генераторы
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break;
            }
            _ = next_hangup(&mut hangup) => {
                info!("Получен SIGHUP, перезапуск генераторов");
                refresh_generators(&registry, &generators).await;
            }
            Some(()) = refresh_rx.recv() => {
                info!("Перезапуск генераторов по команде консоли");
                refresh_generators(&registry, &generators).await;
            }
        }
    }

    info!("Завершение работы...");

    if let Some(handle) = console_handle {
        handle.abort();
    }

    // Остановка генераторов (с таймаутом)
    let shutdown_timeout = tokio::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, registry.stop_all()).await {
        Ok(()) => info!("Все генераторы остановлены корректно"),
        Err(_) => warn!("Таймаут при остановке генераторов"),
    }

    index_handle.abort();
    drop(refresh_tx);

    info!("Launcher Rust завершил работу");
    Ok(())
}

/// Полный цикл обновления и отчёт о генераторах, не переживших setup
async fn refresh_generators(
    registry: &Arc<EntrypointRegistry>,
    generators: &[Arc<dyn EntrypointGenerator>],
) {
    registry.run_all(generators.to_vec()).await;

    let running = registry.running_generators();
    for generator in generators {
        if !running.contains(generator.id()) {
            warn!("Генератор '{}' не работает до следующего перезапуска", generator.id());
        }
    }
}

fn build_generators(
    config: &Config,
    backend: Option<WindowBackend>,
    dry_run: bool,
) -> Vec<Arc<dyn EntrypointGenerator>> {
    let mut generators: Vec<Arc<dyn EntrypointGenerator>> = Vec::new();

    if config.scanner.enabled {
        generators.push(Arc::new(AppScannerGenerator::new(&config.scanner)));
    } else {
        info!("Сканер приложений выключен");
    }

    // В dry-run окна эмулируются даже без графической сессии
    let backend = match (backend, dry_run) {
        (Some(backend), _) => Some(backend),
        (None, true) => Some(WindowBackend::X11),
        (None, false) => None,
    };

    if let Some(backend) = backend {
        let window_config = config.window.clone();
        generators.push(Arc::new(WindowTrackingGenerator::new(move || {
            create_event_source(backend, &window_config, dry_run)
        })));
    }

    generators
}

#[cfg(unix)]
type HangupStream = signal::unix::Signal;
#[cfg(not(unix))]
type HangupStream = ();

#[cfg(unix)]
fn hangup_stream() -> Option<HangupStream> {
    match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!("Не удалось подписаться на SIGHUP: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn hangup_stream() -> Option<HangupStream> {
    None
}

async fn next_hangup(stream: &mut Option<HangupStream>) {
    #[cfg(unix)]
    if let Some(stream) = stream {
        if stream.recv().await.is_some() {
            return;
        }
    }
    let _ = stream;
    std::future::pending::<()>().await
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
