use super::r#trait::RawEventSource;
use crate::events::X11Event;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::info;

/// Dry-run источник: проигрывает сценарий событий X11 вместо реального сервера.
/// После сценария поток просто молчит.
pub struct ScriptedX11Source {
    script: VecDeque<(Duration, X11Event)>,
}

impl ScriptedX11Source {
    pub fn new() -> Self {
        let step = Duration::from_secs(2);
        let mut script = VecDeque::new();

        for (id, class, instance, title) in [
            (0x0100_0001, "firefox", "Navigator", "Mozilla Firefox - dry_run"),
            (0x0100_0002, "Gnome-terminal", "gnome-terminal-server", "Terminal - dry_run"),
            (0x0100_0003, "firefox", "Navigator", "Second window - dry_run"),
        ] {
            script.push_back((
                step,
                X11Event::CreateNotify {
                    id,
                    parent_id: 0,
                    override_redirect: false,
                },
            ));
            script.push_back((
                Duration::ZERO,
                X11Event::ClassPropertyNotify {
                    id,
                    class: class.to_string(),
                    instance: instance.to_string(),
                },
            ));
            script.push_back((
                Duration::ZERO,
                X11Event::TitlePropertyNotify {
                    id,
                    title: title.to_string(),
                },
            ));
            script.push_back((
                Duration::ZERO,
                X11Event::WindowTypePropertyNotify {
                    id,
                    types: vec!["_NET_WM_WINDOW_TYPE_NORMAL".to_string()],
                },
            ));
            script.push_back((Duration::ZERO, X11Event::MapNotify { id }));
        }

        script.push_back((step, X11Event::DestroyNotify { id: 0x0100_0003 }));
        Self { script }
    }
}

#[async_trait::async_trait]
impl RawEventSource<X11Event> for ScriptedX11Source {
    async fn next_event(&mut self) -> Option<X11Event> {
        match self.script.pop_front() {
            Some((delay, event)) => {
                tokio::time::sleep(delay).await;
                info!("Dry-run: эмулируем событие X11 {:?}", event);
                Some(event)
            }
            None => {
                info!("Dry-run: сценарий окон завершён");
                std::future::pending().await
            }
        }
    }
}
