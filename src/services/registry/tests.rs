use super::*;
use crate::entries::{ActionCommand, ActionDraft, OpenWindowRecord};
use crate::error::LauncherError;
use crate::events::WindowId;
use std::sync::atomic::{AtomicBool, AtomicUsize};

#[derive(Default)]
struct RecordingIndex {
    notifications: AtomicUsize,
}

impl SearchIndex for RecordingIndex {
    fn notify_changed(&self, _refresh_list: bool) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}

fn registry_with_index() -> (Arc<EntrypointRegistry>, Arc<RecordingIndex>) {
    let index = Arc::new(RecordingIndex::default());
    let config = RegistryConfig {
        cleanup_timeout_ms: 500,
        setup_timeout_ms: 1000,
    };
    (EntrypointRegistry::new(&config, index.clone()), index)
}

fn app_draft(name: &str) -> EntryDraft {
    EntryDraft::new(name).with_action(ActionDraft::command(
        "Open application",
        ActionCommand::OpenApplication { app_id: name.to_lowercase() },
    ))
}

/// Генератор, который регистрирует фиксированный набор записей
struct StaticGenerator {
    id: String,
    local_ids: Vec<String>,
    fail_setup: bool,
    fail_cleanup: bool,
    cleanups: AtomicUsize,
}

impl StaticGenerator {
    fn new(id: &str, local_ids: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            local_ids: local_ids.iter().map(|s| s.to_string()).collect(),
            fail_setup: false,
            fail_cleanup: false,
            cleanups: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl EntrypointGenerator for StaticGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn setup(&self, ctx: &GeneratorContext) -> Result<()> {
        if self.fail_setup {
            return Err(LauncherError::GeneratorFailed("setup сломан".to_string()));
        }
        for local_id in &self.local_ids {
            ctx.add(local_id, app_draft(local_id))?;
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        if self.fail_cleanup {
            return Err(LauncherError::Internal("cleanup сломан".to_string()));
        }
        Ok(())
    }
}

/// Генератор, который работает до отмены и отмечает её
struct LongRunningGenerator {
    cancelled: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl EntrypointGenerator for LongRunningGenerator {
    fn id(&self) -> &str {
        "long-running"
    }

    async fn run(&self, ctx: &GeneratorContext) -> Result<()> {
        ctx.cancelled().await;
        self.cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Генератор, который падает уже после setup
struct FailingRunGenerator;

#[async_trait::async_trait]
impl EntrypointGenerator for FailingRunGenerator {
    fn id(&self) -> &str {
        "failing-run"
    }

    async fn run(&self, _ctx: &GeneratorContext) -> Result<()> {
        Err(LauncherError::WatcherClosed("источник закрыт".to_string()))
    }
}

#[tokio::test]
async fn test_repeated_add_keeps_one_slot_with_new_uuid() {
    let (registry, _) = registry_with_index();

    let first = registry.add("applications", "firefox", app_draft("Firefox")).unwrap();
    let size_after_first = registry.get_all().len();
    let second = registry.add("applications", "firefox", app_draft("Firefox")).unwrap();

    assert_ne!(first, second);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get_all().len(), size_after_first);
    assert_eq!(registry.get("applications", "firefox").map(|e| e.uuid), Some(second));
}

#[tokio::test]
async fn test_invalid_entry_is_rejected_without_side_effects() {
    let (registry, index) = registry_with_index();

    let result = registry.add("applications", "broken", EntryDraft::new("Broken"));

    assert!(matches!(result, Err(LauncherError::InvalidEntry(_))));
    assert_eq!(registry.len(), 0);
    assert_eq!(index.notifications.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_every_mutation_notifies_index() {
    let (registry, index) = registry_with_index();

    registry.add("applications", "firefox", app_draft("Firefox")).unwrap();
    assert!(registry.remove("applications", "firefox"));
    assert!(!registry.remove("applications", "firefox"));

    assert_eq!(index.notifications.load(Ordering::SeqCst), 3);
    assert!(registry.get("applications", "firefox").is_none());
}

#[tokio::test]
async fn test_get_all_prefers_most_recent_write() {
    let (registry, _) = registry_with_index();

    registry.add("applications", "firefox", app_draft("Firefox (scanner)")).unwrap();
    registry.add("bookmarks", "firefox", app_draft("Firefox (bookmarks)")).unwrap();

    let all = registry.get_all();
    assert_eq!(all.len(), 1);
    assert_eq!(all["firefox"].name, "Firefox (bookmarks)");

    registry.add("applications", "firefox", app_draft("Firefox (rescan)")).unwrap();
    assert_eq!(registry.get_all()["firefox"].generator_id, "applications");
}

#[tokio::test]
async fn test_update_latest_keeps_owner_and_skips_removed_entry() {
    let (registry, _) = registry_with_index();
    registry.add("applications", "firefox", app_draft("Firefox")).unwrap();

    let updated = registry
        .update_latest("firefox", |entry| {
            let mut draft = entry.to_draft();
            draft.name = "Firefox (1 window)".to_string();
            draft
        })
        .unwrap()
        .unwrap();
    assert_eq!(updated.generator_id, "applications");
    assert_eq!(registry.lookup("firefox").unwrap().name, "Firefox (1 window)");

    registry.remove("applications", "firefox");
    let missing = registry.update_latest("firefox", |entry| entry.to_draft()).unwrap();
    assert!(missing.is_none());
    assert!(registry.lookup("firefox").is_none());
}

#[test]
fn test_concurrent_derivations_settle_on_current_window_count() {
    let (registry, _) = registry_with_index();
    registry.add("applications", "firefox", app_draft("Firefox")).unwrap();

    // Запись по числу окон, посчитанному под блокировкой реестра
    let counted = |windows: usize| {
        let mut draft = app_draft("Firefox");
        draft.name = format!("{} windows", windows);
        draft
    };

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for n in 0..200u32 {
                registry.open_windows().upsert(OpenWindowRecord {
                    window_id: WindowId::from(n),
                    app_id: "firefox".to_string(),
                    title: String::new(),
                });
                registry
                    .update_latest("firefox", |_| {
                        counted(registry.open_windows().for_app("firefox").len())
                    })
                    .unwrap();
            }
        });
        scope.spawn(|| {
            for _ in 0..200 {
                registry
                    .add_with("applications", "firefox", || {
                        counted(registry.open_windows().for_app("firefox").len())
                    })
                    .unwrap();
            }
        });
    });

    assert_eq!(registry.lookup("firefox").unwrap().name, "200 windows");
}

#[tokio::test]
async fn test_revision_advances_on_change() {
    let (registry, _) = registry_with_index();
    let mut changes = registry.subscribe_changes();
    let before = *changes.borrow_and_update();

    registry.add("applications", "firefox", app_draft("Firefox")).unwrap();

    assert!(changes.has_changed().unwrap());
    assert!(*changes.borrow_and_update() > before);
}

#[tokio::test]
async fn test_run_all_starts_generators_and_registers_entries() {
    let (registry, _) = registry_with_index();

    registry
        .run_all(vec![
            Arc::new(StaticGenerator::new("applications", &["firefox", "alacritty"])),
            Arc::new(StaticGenerator::new("bookmarks", &["rust-docs"])),
        ])
        .await;

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.entries_for("applications").len(), 2);
    assert_eq!(
        registry.running_generators(),
        HashSet::from(["applications".to_string(), "bookmarks".to_string()])
    );
}

#[tokio::test]
async fn test_failed_cleanup_does_not_block_other_generators() {
    let (registry, _) = registry_with_index();

    let mut broken = StaticGenerator::new("broken", &["a"]);
    broken.fail_cleanup = true;
    let broken = Arc::new(broken);
    let healthy = Arc::new(StaticGenerator::new("healthy", &["b"]));

    registry
        .run_all(vec![broken.clone(), healthy.clone()])
        .await;
    registry
        .run_all(vec![broken.clone(), healthy.clone()])
        .await;

    assert_eq!(broken.cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(healthy.cleanups.load(Ordering::SeqCst), 1);
    assert!(registry.get("healthy", "b").is_some());
    assert!(registry.get("broken", "a").is_some());
}

#[tokio::test]
async fn test_failed_setup_leaves_generator_absent() {
    let (registry, _) = registry_with_index();

    let mut broken = StaticGenerator::new("broken", &["a"]);
    broken.fail_setup = true;

    registry
        .run_all(vec![
            Arc::new(broken),
            Arc::new(StaticGenerator::new("healthy", &["b"])),
        ])
        .await;

    assert!(registry.get("healthy", "b").is_some());
    assert!(registry.entries_for("broken").is_empty());
    assert_eq!(registry.running_generators(), HashSet::from(["healthy".to_string()]));
}

#[tokio::test]
async fn test_generator_failing_after_setup_is_forgotten() {
    let (registry, _) = registry_with_index();

    registry.run_all(vec![Arc::new(FailingRunGenerator)]).await;

    for _ in 0..50 {
        if registry.running_generators().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(registry.running_generators().is_empty());
}

#[tokio::test]
async fn test_refresh_cancels_running_generator_and_clears_state() {
    let (registry, _) = registry_with_index();
    let cancelled = Arc::new(AtomicBool::new(false));

    registry
        .run_all(vec![Arc::new(LongRunningGenerator { cancelled: cancelled.clone() })])
        .await;
    registry.add("applications", "firefox", app_draft("Firefox")).unwrap();
    registry.open_windows().upsert(OpenWindowRecord {
        window_id: WindowId::from(1u32),
        app_id: "firefox".to_string(),
        title: "Mozilla Firefox".to_string(),
    });

    registry.run_all(Vec::new()).await;

    assert!(cancelled.load(Ordering::SeqCst));
    assert_eq!(registry.len(), 0);
    assert!(registry.open_windows().is_empty());
    assert!(registry.running_generators().is_empty());
}

#[tokio::test]
async fn test_stop_all_runs_cleanup() {
    let (registry, _) = registry_with_index();
    let generator = Arc::new(StaticGenerator::new("applications", &["firefox"]));

    registry.run_all(vec![generator.clone()]).await;
    registry.stop_all().await;

    assert_eq!(generator.cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 0);
}

#[tokio::test]
async fn test_cancelled_context_refuses_writes() {
    let (registry, _) = registry_with_index();
    let token = CancellationToken::new();
    let ctx = GeneratorContext::new("applications", registry.clone(), token.clone());

    token.cancel();

    assert!(ctx.add("firefox", app_draft("Firefox")).is_err());
    assert_eq!(registry.len(), 0);
}
