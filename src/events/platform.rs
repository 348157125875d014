//! Сырые события платформенных источников окон.
//!
//! Разбор протоколов (декодирование свойств X11, события wlr/sway, уведомления
//! NSWorkspace) выполняется нижележащим адаптером; сюда приходят уже готовые
//! структуры, которые наблюдатели переводят в `WindowLifecycleEvent`.

use serde::{Deserialize, Serialize};

/// Сырое событие X11
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum X11Event {
    /// Окно, существовавшее на момент запуска
    Init {
        id: u32,
        parent_id: u32,
        override_redirect: bool,
        mapped: bool,
    },
    CreateNotify {
        id: u32,
        parent_id: u32,
        override_redirect: bool,
    },
    DestroyNotify {
        id: u32,
    },
    MapNotify {
        id: u32,
    },
    UnmapNotify {
        id: u32,
    },
    ReparentNotify {
        id: u32,
        parent_id: u32,
    },
    TitlePropertyNotify {
        id: u32,
        title: String,
    },
    ClassPropertyNotify {
        id: u32,
        class: String,
        instance: String,
    },
    HintsPropertyNotify {
        id: u32,
        window_group: Option<u32>,
    },
    ProtocolsPropertyNotify {
        id: u32,
        protocols: Vec<String>,
    },
    TransientForPropertyNotify {
        id: u32,
        transient_for: Option<u32>,
    },
    WindowTypePropertyNotify {
        id: u32,
        types: Vec<String>,
    },
    DesktopFileNamePropertyNotify {
        id: u32,
        desktop_file_name: Option<String>,
    },
}

/// Сырое событие Wayland-композитора (foreign-toplevel / sway IPC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaylandEvent {
    WindowOpened { window_id: String },
    WindowClosed { window_id: String },
    WindowTitleChanged { window_id: String, title: String },
    WindowAppIdChanged { window_id: String, app_id: String },
}

/// Сырое событие macOS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacosEvent {
    WindowOpened {
        bundle_path: String,
        window_id: u64,
        title: String,
    },
    WindowClosed {
        window_id: u64,
    },
    WindowTitleChanged {
        window_id: u64,
        title: String,
    },
}
