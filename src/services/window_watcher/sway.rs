use super::r#trait::RawEventSource;
use crate::error::{LauncherError, Result};
use crate::events::WaylandEvent;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

const MAX_FAILED_POLLS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TreeWindow {
    app_id: Option<String>,
    title: String,
}

/// Источник событий Wayland на основе периодического `swaymsg -t get_tree`
pub struct SwayPoller {
    interval: Duration,
    known: HashMap<String, TreeWindow>,
    pending: VecDeque<WaylandEvent>,
    failed_polls: u32,
    polled_once: bool,
}

impl SwayPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            known: HashMap::new(),
            pending: VecDeque::new(),
            failed_polls: 0,
            polled_once: false,
        }
    }

    fn list_windows(&self) -> Result<HashMap<String, TreeWindow>> {
        let output = Command::new("swaymsg")
            .args(["-t", "get_tree", "-r"])
            .output()
            .map_err(|e| LauncherError::ServiceUnavailable(format!("swaymsg не найден: {}", e)))?;

        if !output.status.success() {
            return Err(LauncherError::ServiceUnavailable("swaymsg вернул ошибку".to_string()));
        }

        let tree: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| LauncherError::Internal(format!("некорректный ответ swaymsg: {}", e)))?;

        let mut windows = HashMap::new();
        collect_windows(&tree, &mut windows);
        Ok(windows)
    }

    fn diff(&mut self, current: HashMap<String, TreeWindow>) {
        for (id, window) in &current {
            let previous = self.known.get(id);
            if previous.is_none() {
                self.pending.push_back(WaylandEvent::WindowOpened { window_id: id.clone() });
            }
            if previous.map(|p| &p.title) != Some(&window.title) {
                self.pending.push_back(WaylandEvent::WindowTitleChanged {
                    window_id: id.clone(),
                    title: window.title.clone(),
                });
            }
            if let Some(app_id) = &window.app_id {
                if previous.and_then(|p| p.app_id.as_ref()) != Some(app_id) {
                    self.pending.push_back(WaylandEvent::WindowAppIdChanged {
                        window_id: id.clone(),
                        app_id: app_id.clone(),
                    });
                }
            }
        }

        for id in self.known.keys() {
            if !current.contains_key(id) {
                self.pending.push_back(WaylandEvent::WindowClosed { window_id: id.clone() });
            }
        }

        self.known = current;
    }
}

#[async_trait::async_trait]
impl RawEventSource<WaylandEvent> for SwayPoller {
    async fn next_event(&mut self) -> Option<WaylandEvent> {
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
                        info!("swaymsg снова отвечает");
                    }
                    self.failed_polls = 0;
                    self.diff(current);
                }
                Err(e) => {
                    self.failed_polls += 1;
                    warn!("Опрос swaymsg не удался ({}/{}): {}", self.failed_polls, MAX_FAILED_POLLS, e);
                    if self.failed_polls >= MAX_FAILED_POLLS {
                        return None;
                    }
                }
            }
        }
    }
}

/// Обход дерева sway: окна это узлы с `pid`. У нативных клиентов есть `app_id`,
/// у XWayland только `window_properties.class`.
fn collect_windows(node: &Value, windows: &mut HashMap<String, TreeWindow>) {
    if node.get("pid").is_some_and(|pid| !pid.is_null()) {
        if let Some(id) = node.get("id").and_then(Value::as_i64) {
            let app_id = node
                .get("app_id")
                .and_then(Value::as_str)
                .or_else(|| {
                    node.get("window_properties")
                        .and_then(|props| props.get("class"))
                        .and_then(Value::as_str)
                })
                .filter(|app_id| !app_id.is_empty())
                .map(str::to_string);

            windows.insert(
                id.to_string(),
                TreeWindow {
                    app_id,
                    title: node.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                },
            );
        }
    }

    for key in ["nodes", "floating_nodes"] {
        if let Some(children) = node.get(key).and_then(Value::as_array) {
            for child in children {
                collect_windows(child, windows);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Value {
        json!({
            "id": 1, "type": "root", "nodes": [{
                "id": 2, "type": "output", "nodes": [{
                    "id": 3, "type": "workspace",
                    "nodes": [
                        {"id": 10, "type": "con", "pid": 100, "app_id": "org.gnome.Nautilus", "name": "Home"},
                        {"id": 11, "type": "con", "pid": 101, "app_id": null,
                         "window_properties": {"class": "Code"}, "name": "main.rs"}
                    ],
                    "floating_nodes": [
                        {"id": 12, "type": "floating_con", "pid": 102, "app_id": "pavucontrol", "name": "Volume"}
                    ]
                }]
            }]
        })
    }

    #[test]
    fn test_collect_windows_from_tree() {
        let mut windows = HashMap::new();
        collect_windows(&tree(), &mut windows);

        assert_eq!(windows.len(), 3);
        assert_eq!(windows["10"].app_id.as_deref(), Some("org.gnome.Nautilus"));
        assert_eq!(windows["11"].app_id.as_deref(), Some("Code"));
        assert_eq!(windows["12"].title, "Volume");
    }

    #[test]
    fn test_diff_reports_open_change_and_close() {
        let mut poller = SwayPoller::new(Duration::from_millis(100));
        let mut windows = HashMap::new();
        collect_windows(&tree(), &mut windows);
        poller.diff(windows.clone());
        assert_eq!(poller.pending.len(), 9);
        poller.pending.clear();

        windows.remove("12");
        if let Some(window) = windows.get_mut("10") {
            window.title = "Documents".to_string();
        }
        poller.diff(windows);

        let events: Vec<WaylandEvent> = poller.pending.drain(..).collect();
        assert_eq!(
            events,
            vec![
                WaylandEvent::WindowTitleChanged {
                    window_id: "10".to_string(),
                    title: "Documents".to_string(),
                },
                WaylandEvent::WindowClosed { window_id: "12".to_string() },
            ]
        );
    }
}
