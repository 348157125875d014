use super::r#trait::RawEventSource;
use crate::error::{LauncherError, Result};
use crate::events::X11Event;
use std::collections::{HashMap, VecDeque};
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

use crate::debug_if_enabled;

/// После стольких неудачных опросов подряд поток считается закрытым
const MAX_FAILED_POLLS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListedWindow {
    class: String,
    instance: String,
    title: String,
}

/// Источник событий X11 на основе периодического `wmctrl -lx`.
///
/// wmctrl показывает только управляемые окна, поэтому каждое новое окно
/// считается видимым окном типа Normal без родителя.
pub struct WmctrlPoller {
    interval: Duration,
    known: HashMap<u32, ListedWindow>,
    pending: VecDeque<X11Event>,
    failed_polls: u32,
    first_poll: bool,
}

impl WmctrlPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            known: HashMap::new(),
            pending: VecDeque::new(),
            failed_polls: 0,
            first_poll: true,
        }
    }

    fn list_windows(&self) -> Result<HashMap<u32, ListedWindow>> {
        let output = Command::new("wmctrl")
            .args(["-l", "-x"])
            .output()
            .map_err(|e| LauncherError::ServiceUnavailable(format!("wmctrl не найден: {}", e)))?;

        if !output.status.success() {
            return Err(LauncherError::ServiceUnavailable("wmctrl вернул ошибку".to_string()));
        }

        Ok(parse_wmctrl_listing(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Разница между прошлым и текущим списком окон в виде событий X11
    fn diff(&mut self, current: HashMap<u32, ListedWindow>) {
        for (&id, window) in &current {
            match self.known.get(&id) {
                None => {
                    debug_if_enabled!("wmctrl: новое окно 0x{:08x} {:?}", id, window.title);
                    self.pending.push_back(if self.first_poll {
                        X11Event::Init {
                            id,
                            parent_id: 0,
                            override_redirect: false,
                            mapped: true,
                        }
                    } else {
                        X11Event::CreateNotify {
                            id,
                            parent_id: 0,
                            override_redirect: false,
                        }
                    });
                    if !self.first_poll {
                        self.pending.push_back(X11Event::MapNotify { id });
                    }
                    self.pending.push_back(X11Event::ClassPropertyNotify {
                        id,
                        class: window.class.clone(),
                        instance: window.instance.clone(),
                    });
                    self.pending.push_back(X11Event::TitlePropertyNotify {
                        id,
                        title: window.title.clone(),
                    });
                    self.pending.push_back(X11Event::WindowTypePropertyNotify {
                        id,
                        types: vec!["_NET_WM_WINDOW_TYPE_NORMAL".to_string()],
                    });
                }
                Some(previous) => {
                    if previous.class != window.class || previous.instance != window.instance {
                        self.pending.push_back(X11Event::ClassPropertyNotify {
                            id,
                            class: window.class.clone(),
                            instance: window.instance.clone(),
                        });
                    }
                    if previous.title != window.title {
                        self.pending.push_back(X11Event::TitlePropertyNotify {
                            id,
                            title: window.title.clone(),
                        });
                    }
                }
            }
        }

        for id in self.known.keys() {
            if !current.contains_key(id) {
                self.pending.push_back(X11Event::DestroyNotify { id: *id });
            }
        }

        self.known = current;
        self.first_poll = false;
    }
}

#[async_trait::async_trait]
impl RawEventSource<X11Event> for WmctrlPoller {
    async fn next_event(&mut self) -> Option<X11Event> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            if !self.first_poll {
                tokio::time::sleep(self.interval).await;
            }

            match self.list_windows() {
                Ok(current) => {
                    if self.failed_polls > 0 {
                        info!("wmctrl снова отвечает");
                    }
                    self.failed_polls = 0;
                    self.diff(current);
                }
                Err(e) => {
                    self.failed_polls += 1;
                    warn!("Опрос wmctrl не удался ({}/{}): {}", self.failed_polls, MAX_FAILED_POLLS, e);
                    if self.failed_polls >= MAX_FAILED_POLLS {
                        return None;
                    }
                    self.first_poll = false;
                }
            }
        }
    }
}

/// Строки `wmctrl -lx`: `0x03a00003  0 instance.Class  host Title words`
fn parse_wmctrl_listing(stdout: &str) -> HashMap<u32, ListedWindow> {
    let mut windows = HashMap::new();

    for line in stdout.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }

        let Ok(id) = u32::from_str_radix(parts[0].trim_start_matches("0x"), 16) else {
            continue;
        };

        // У окон без WM_CLASS wmctrl пишет "N/A"
        let (instance, class) = match parts[2].split_once('.') {
            Some((instance, class)) => (instance.to_string(), class.to_string()),
            None if parts[2] == "N/A" => (String::new(), String::new()),
            None => (parts[2].to_string(), String::new()),
        };

        windows.insert(
            id,
            ListedWindow {
                class,
                instance,
                title: parts.get(4..).map(|rest| rest.join(" ")).unwrap_or_default(),
            },
        );
    }

    windows
}
