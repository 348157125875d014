//! Сканер приложений: генератор, который регистрирует установленные
//! приложения (`.desktop` файлы и `.app` бандлы) и пересканирует каталоги
//! при изменениях файловой системы.

mod desktop_entry;

pub use desktop_entry::{parse_desktop_entry, DesktopEntry};

use crate::config::ScannerConfig;
use crate::entries::EntryDraft;
use crate::error::{LauncherError, Result};
use crate::launcher_error;
use crate::services::reconciler::derive::derive_presentation;
use crate::services::registry::{EntrypointGenerator, GeneratorContext};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::debug_if_enabled;

/// Глубже этого каталоги приложений не обходятся
const MAX_SCAN_DEPTH: usize = 8;

/// Найденное приложение
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredApp {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub startup_wm_class: Option<String>,
}

/// Обход всех каталогов; при совпадении id побеждает более ранний каталог
pub fn scan_directories(directories: &[PathBuf]) -> BTreeMap<String, DiscoveredApp> {
    let mut apps = BTreeMap::new();
    for root in directories {
        if root.is_dir() {
            scan_directory(root, &mut apps);
        }
    }
    apps
}

fn scan_directory(root: &Path, apps: &mut BTreeMap<String, DiscoveredApp>) {
    let mut pending = vec![(root.to_path_buf(), 0usize)];

    while let Some((dir, depth)) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Каталог {} недоступен: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let is_bundle = path.extension().is_some_and(|ext| ext == "app");

            if path.is_dir() && is_bundle {
                if let Some(app) = bundle_app(&path) {
                    apps.entry(app.id.clone()).or_insert(app);
                }
            } else if path.is_dir() {
                if depth < MAX_SCAN_DEPTH {
                    pending.push((path, depth + 1));
                }
            } else if path.extension().is_some_and(|ext| ext == "desktop") {
                if let Some(app) = desktop_app(root, &path) {
                    apps.entry(app.id.clone()).or_insert(app);
                }
            }
        }
    }
}

/// id desktop-файла: путь относительно каталога, `/` заменяется на `-`
pub fn desktop_file_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.to_str()?;
    let id = relative.strip_suffix(".desktop")?.replace(std::path::MAIN_SEPARATOR, "-");
    Some(id).filter(|id| !id.is_empty())
}

fn desktop_app(root: &Path, path: &Path) -> Option<DiscoveredApp> {
    let id = desktop_file_id(root, path)?;
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Не удалось прочитать {}: {}", path.display(), e);
            return None;
        }
    };

    let entry = parse_desktop_entry(&content)?;
    Some(DiscoveredApp {
        id,
        name: entry.name,
        icon: entry.icon,
        startup_wm_class: entry.startup_wm_class,
    })
}

/// Бандл macOS: id это путь к бандлу, имя это его основа
fn bundle_app(path: &Path) -> Option<DiscoveredApp> {
    Some(DiscoveredApp {
        id: path.to_str()?.to_string(),
        name: path.file_stem()?.to_str()?.to_string(),
        icon: None,
        startup_wm_class: None,
    })
}

pub struct AppScannerGenerator {
    id: String,
    directories: Vec<PathBuf>,
    debounce: Duration,
}

impl AppScannerGenerator {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            id: config.generator_id.clone(),
            directories: config.directories.clone(),
            debounce: Duration::from_millis(config.debounce_ms),
        }
    }

    /// Полный проход: удалить пропавшие приложения, перерегистрировать остальные
    async fn rescan(&self, ctx: &GeneratorContext) -> Result<usize> {
        let directories = self.directories.clone();
        let apps = tokio::task::spawn_blocking(move || scan_directories(&directories))
            .await
            .map_err(|e| LauncherError::Internal(format!("сканирование прервано: {}", e)))?;

        let stale: Vec<String> = ctx
            .registry()
            .entries_for(ctx.generator_id())
            .into_iter()
            .map(|entry| entry.local_id)
            .filter(|local_id| !apps.contains_key(local_id))
            .collect();

        for local_id in &stale {
            debug_if_enabled!("Приложение {} больше не установлено", local_id);
            ctx.remove(local_id)?;
        }

        // Действия берутся из текущих окон, чтобы пересканирование не
        // затирало то, что вывел трекер окон
        let open_windows = ctx.open_windows();
        for app in apps.values() {
            ctx.add_with(&app.id, || {
                let windows = open_windows.for_app(&app.id);
                let (actions, accessories) = derive_presentation(&app.id, &windows);

                let mut draft = EntryDraft::new(app.name.as_str())
                    .with_icon(app.icon.clone())
                    .with_startup_wm_class(app.startup_wm_class.clone());
                draft.actions = actions;
                draft.accessories = accessories;
                draft
            })?;
        }

        info!(
            "Сканирование приложений: {} найдено, {} удалено",
            apps.len(),
            stale.len()
        );
        Ok(apps.len())
    }

    fn watch_directories(&self, watcher: &mut RecommendedWatcher) -> Result<usize> {
        let mut watched = 0;
        for dir in &self.directories {
            if !dir.is_dir() {
                continue;
            }
            watcher.watch(dir, RecursiveMode::Recursive)?;
            debug!("Отслеживается каталог приложений {}", dir.display());
            watched += 1;
        }
        Ok(watched)
    }
}

fn is_relevant_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[async_trait::async_trait]
impl EntrypointGenerator for AppScannerGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn setup(&self, ctx: &GeneratorContext) -> Result<()> {
        self.rescan(ctx).await?;
        Ok(())
    }

    async fn run(&self, ctx: &GeneratorContext) -> Result<()> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = recommended_watcher(move |event| {
            let _ = event_tx.send(event);
        })?;

        if self.watch_directories(&mut watcher)? == 0 {
            warn!("Ни один каталог приложений не существует, отслеживание изменений выключено");
            ctx.cancelled().await;
            return Ok(());
        }

        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        return Err(launcher_error!(watcher_closed, "наблюдатель каталогов приложений"));
                    };
                    match event {
                        Ok(event) if is_relevant_event(&event) => {}
                        Ok(_) => continue,
                        Err(e) => {
                            warn!("Ошибка наблюдателя каталогов: {}", e);
                            continue;
                        }
                    }

                    // Пачка событий за окно debounce превращается в одно сканирование
                    let deadline = tokio::time::sleep(self.debounce);
                    tokio::pin!(deadline);
                    loop {
                        tokio::select! {
                            _ = &mut deadline => break,
                            more = event_rx.recv() => if more.is_none() { break },
                        }
                    }

                    if let Err(e) = self.rescan(ctx).await {
                        warn!("Пересканирование приложений не удалось: {}", e);
                        if ctx.is_cancelled() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::entries::OpenWindowRecord;
    use crate::events::WindowId;
    use crate::services::collaborators::ChannelSearchIndex;
    use crate::services::registry::EntrypointRegistry;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_desktop(dir: &Path, relative: &str, name: &str, wm_class: Option<&str>) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut content = format!("[Desktop Entry]\nType=Application\nName={}\n", name);
        if let Some(wm_class) = wm_class {
            content.push_str(&format!("StartupWMClass={}\n", wm_class));
        }
        fs::write(path, content).unwrap();
    }

    fn scanner_config(dirs: Vec<PathBuf>) -> ScannerConfig {
        ScannerConfig {
            directories: dirs,
            debounce_ms: 50,
            ..ScannerConfig::default()
        }
    }

    #[test]
    fn test_desktop_file_id_from_subdirectory() {
        let root = Path::new("/usr/share/applications");
        assert_eq!(
            desktop_file_id(root, &root.join("kde4/kate.desktop")).as_deref(),
            Some("kde4-kate")
        );
        assert_eq!(desktop_file_id(root, &root.join("kate.txt")), None);
    }

    #[test]
    fn test_earlier_directory_wins() {
        let local = TempDir::new().unwrap();
        let system = TempDir::new().unwrap();
        write_desktop(local.path(), "firefox.desktop", "Firefox (local)", None);
        write_desktop(system.path(), "firefox.desktop", "Firefox", Some("firefox"));
        write_desktop(system.path(), "gnome/org.gnome.Nautilus.desktop", "Files", None);
        fs::create_dir_all(system.path().join("Safari.app/Contents")).unwrap();

        let apps = scan_directories(&[local.path().to_path_buf(), system.path().to_path_buf()]);

        assert_eq!(apps["firefox"].name, "Firefox (local)");
        assert!(apps.contains_key("gnome-org.gnome.Nautilus"));
        let safari = system.path().join("Safari.app");
        assert_eq!(apps[safari.to_str().unwrap()].name, "Safari");
        assert_eq!(apps.len(), 3);
    }

    #[tokio::test]
    async fn test_rescan_removes_uninstalled_and_keeps_window_actions() {
        let dir = TempDir::new().unwrap();
        write_desktop(dir.path(), "firefox.desktop", "Firefox", Some("firefox"));
        write_desktop(dir.path(), "gimp.desktop", "GIMP", None);

        let (index, _rx) = ChannelSearchIndex::new();
        let registry = EntrypointRegistry::new(&RegistryConfig::default(), Arc::new(index));
        let scanner = Arc::new(AppScannerGenerator::new(&scanner_config(vec![dir.path().to_path_buf()])));
        registry
            .run_all(vec![scanner.clone() as Arc<dyn EntrypointGenerator>])
            .await;
        assert_eq!(registry.entries_for("applications").len(), 2);

        registry.open_windows().upsert(OpenWindowRecord {
            window_id: WindowId::from(1u32),
            app_id: "firefox".to_string(),
            title: "Mozilla Firefox".to_string(),
        });
        fs::remove_file(dir.path().join("gimp.desktop")).unwrap();

        let ctx = GeneratorContext::new(
            "applications",
            Arc::clone(&registry),
            tokio_util::sync::CancellationToken::new(),
        );
        assert_eq!(scanner.rescan(&ctx).await.unwrap(), 1);

        let entries = registry.entries_for("applications");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actions[0].label(), "Focus window");
        assert_eq!(entries[0].startup_wm_class.as_deref(), Some("firefox"));
    }

    #[tokio::test]
    async fn test_filesystem_change_triggers_rescan() {
        let dir = TempDir::new().unwrap();
        write_desktop(dir.path(), "firefox.desktop", "Firefox", None);

        let (index, _rx) = ChannelSearchIndex::new();
        let registry = EntrypointRegistry::new(&RegistryConfig::default(), Arc::new(index));
        registry
            .run_all(vec![Arc::new(AppScannerGenerator::new(&scanner_config(vec![
                dir.path().to_path_buf(),
            ])))])
            .await;

        // Наблюдатель ставится в run, уже после setup
        tokio::time::sleep(Duration::from_millis(200)).await;
        write_desktop(dir.path(), "gimp.desktop", "GIMP", None);

        tokio::time::timeout(Duration::from_secs(5), async {
            while registry.lookup("gimp").is_none() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("новое приложение не появилось");
    }

    #[tokio::test]
    async fn test_burst_of_changes_coalesces_into_one_rescan() {
        let dir = TempDir::new().unwrap();
        write_desktop(dir.path(), "firefox.desktop", "Firefox", None);

        let (index, _rx) = ChannelSearchIndex::new();
        let registry = EntrypointRegistry::new(&RegistryConfig::default(), Arc::new(index));
        let config = ScannerConfig {
            debounce_ms: 500,
            ..scanner_config(vec![dir.path().to_path_buf()])
        };
        registry
            .run_all(vec![Arc::new(AppScannerGenerator::new(&config))])
            .await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Каждое сканирование перерегистрирует firefox со свежим uuid
        let initial = registry.lookup("firefox").unwrap().uuid;
        for n in 0..10 {
            write_desktop(dir.path(), &format!("app{}.desktop", n), "App", None);
        }

        let mut seen = HashSet::new();
        let observe = async {
            loop {
                if let Some(entry) = registry.lookup("firefox") {
                    if entry.uuid != initial {
                        seen.insert(entry.uuid);
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        let _ = tokio::time::timeout(Duration::from_millis(2000), observe).await;

        assert_eq!(registry.entries_for("applications").len(), 11);
        assert_eq!(seen.len(), 1);
    }
}
