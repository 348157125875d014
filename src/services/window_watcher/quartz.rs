use super::r#trait::RawEventSource;
use crate::error::{LauncherError, Result};
use crate::events::MacosEvent;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

const MAX_FAILED_POLLS: u32 = 5;

/// JXA-скрипт: окна слоя 0 из CGWindowList и путь к бандлу владельца.
/// Без разрешения на запись экрана `kCGWindowName` пуст.
const WINDOW_LIST_SCRIPT: &str = r#"
ObjC.import('AppKit');
ObjC.import('CoreGraphics');
const info = ObjC.castRefToObject($.CGWindowListCopyWindowInfo(
    $.kCGWindowListOptionOnScreenOnly | $.kCGWindowListExcludeDesktopElements, 0));
const out = [];
for (let i = 0; i < info.count; i++) {
    const w = ObjC.deepUnwrap(info.objectAtIndex(i));
    if (w.kCGWindowLayer !== 0) continue;
    const app = $.NSRunningApplication.runningApplicationWithProcessIdentifier(w.kCGWindowOwnerPID);
    if (!app || app.isNil() || app.bundleURL.isNil()) continue;
    out.push({id: w.kCGWindowNumber, bundle_path: app.bundleURL.path.js, title: w.kCGWindowName || ''});
}
JSON.stringify(out);
"#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct QuartzWindow {
    id: u64,
    bundle_path: String,
    #[serde(default)]
    title: String,
}

/// Источник событий macOS на основе периодического опроса CGWindowList через `osascript`
pub struct QuartzPoller {
    interval: Duration,
    known: BTreeMap<u64, QuartzWindow>,
    pending: VecDeque<MacosEvent>,
    failed_polls: u32,
    polled_once: bool,
}

impl QuartzPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            known: BTreeMap::new(),
            pending: VecDeque::new(),
            failed_polls: 0,
            polled_once: false,
        }
    }

    fn list_windows(&self) -> Result<BTreeMap<u64, QuartzWindow>> {
        let output = Command::new("osascript")
            .args(["-l", "JavaScript", "-e", WINDOW_LIST_SCRIPT])
            .output()
            .map_err(|e| LauncherError::ServiceUnavailable(format!("osascript не найден: {}", e)))?;

        if !output.status.success() {
            return Err(LauncherError::ServiceUnavailable("osascript вернул ошибку".to_string()));
        }

        parse_window_list(&output.stdout)
    }

    fn diff(&mut self, current: BTreeMap<u64, QuartzWindow>) {
        for (id, previous) in &self.known {
            // Окно с тем же номером у другого бандла считается новым окном
            let gone = current
                .get(id)
                .map_or(true, |window| window.bundle_path != previous.bundle_path);
            if gone {
                self.pending.push_back(MacosEvent::WindowClosed { window_id: *id });
            }
        }

        for (id, window) in &current {
            match self.known.get(id) {
                Some(previous) if previous.bundle_path == window.bundle_path => {
                    if previous.title != window.title {
                        self.pending.push_back(MacosEvent::WindowTitleChanged {
                            window_id: *id,
                            title: window.title.clone(),
                        });
                    }
                }
                _ => self.pending.push_back(MacosEvent::WindowOpened {
                    bundle_path: window.bundle_path.clone(),
                    window_id: *id,
                    title: window.title.clone(),
                }),
            }
        }

        self.known = current;
    }
}

#[async_trait::async_trait]
impl RawEventSource<MacosEvent> for QuartzPoller {
    async fn next_event(&mut self) -> Option<MacosEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            if self.polled_once {
                tokio::time::sleep(self.interval).await;
            }
            self.polled_once = true;

            match self.list_windows() {
                Ok(current) => {
                    if self.failed_polls > 0 {
                        info!("osascript снова отвечает");
                    }
                    self.failed_polls = 0;
                    self.diff(current);
                }
                Err(e) => {
                    self.failed_polls += 1;
                    warn!("Опрос CGWindowList не удался ({}/{}): {}", self.failed_polls, MAX_FAILED_POLLS, e);
                    if self.failed_polls >= MAX_FAILED_POLLS {
                        return None;
                    }
                }
            }
        }
    }
}

fn parse_window_list(stdout: &[u8]) -> Result<BTreeMap<u64, QuartzWindow>> {
    let windows: Vec<QuartzWindow> = serde_json::from_slice(stdout)
        .map_err(|e| LauncherError::Internal(format!("некорректный ответ osascript: {}", e)))?;
    Ok(windows.into_iter().map(|window| (window.id, window)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"[
        {"id": 88, "bundle_path": "/Applications/Safari.app", "title": "Start Page"},
        {"id": 91, "bundle_path": "/System/Applications/Notes.app", "title": ""}
    ]"#;

    #[test]
    fn test_parse_window_list() {
        let windows = parse_window_list(LISTING.as_bytes()).unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[&88].bundle_path, "/Applications/Safari.app");
        assert_eq!(windows[&91].title, "");
        assert!(parse_window_list(b"execution error").is_err());
    }

    #[test]
    fn test_diff_reports_open_title_and_close() {
        let mut poller = QuartzPoller::new(Duration::from_millis(100));
        let mut windows = parse_window_list(LISTING.as_bytes()).unwrap();
        poller.diff(windows.clone());
        assert_eq!(poller.pending.len(), 2);
        poller.pending.clear();

        windows.remove(&91);
        if let Some(window) = windows.get_mut(&88) {
            window.title = "GitHub".to_string();
        }
        poller.diff(windows);

        let events: Vec<MacosEvent> = poller.pending.drain(..).collect();
        assert_eq!(
            events,
            vec![
                MacosEvent::WindowClosed { window_id: 91 },
                MacosEvent::WindowTitleChanged {
                    window_id: 88,
                    title: "GitHub".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_reused_window_number_is_reopened() {
        let mut poller = QuartzPoller::new(Duration::from_millis(100));
        let mut windows = parse_window_list(LISTING.as_bytes()).unwrap();
        poller.diff(windows.clone());
        poller.pending.clear();

        if let Some(window) = windows.get_mut(&88) {
            window.bundle_path = "/Applications/Mail.app".to_string();
        }
        poller.diff(windows);

        let events: Vec<MacosEvent> = poller.pending.drain(..).collect();
        assert_eq!(events[0], MacosEvent::WindowClosed { window_id: 88 });
        assert!(matches!(
            &events[1],
            MacosEvent::WindowOpened { window_id: 88, bundle_path, .. } if bundle_path == "/Applications/Mail.app"
        ));
    }
}
