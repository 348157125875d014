use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// События, полученные из одного сырого события платформы.
/// Реконсилер применяет их все и только потом проверяет окна.
pub type WindowEventBatch = SmallVec<[WindowLifecycleEvent; 4]>;

/// Идентификатор окна, общий для всех платформ.
/// Числовые id упорядочены как числа и идут раньше остальных.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn sort_key(&self) -> (bool, Option<u64>, &str) {
        let number = self.0.parse::<u64>().ok();
        (number.is_none(), number, &self.0)
    }
}

impl Ord for WindowId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for WindowId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u32> for WindowId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for WindowId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Тип окна по _NET_WM_WINDOW_TYPE
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowType {
    Normal,
    Dialog,
    Utility,
    Toolbar,
    Menu,
    Splash,
    Dock,
    Desktop,
    Notification,
    Other(String),
}

impl WindowType {
    pub fn parse(value: &str) -> Self {
        let name = value.trim_start_matches("_NET_WM_WINDOW_TYPE_");
        match name.to_lowercase().as_str() {
            "normal" => Self::Normal,
            "dialog" => Self::Dialog,
            "utility" => Self::Utility,
            "toolbar" => Self::Toolbar,
            "menu" | "dropdown_menu" | "popup_menu" => Self::Menu,
            "splash" => Self::Splash,
            "dock" => Self::Dock,
            "desktop" => Self::Desktop,
            "notification" => Self::Notification,
            _ => Self::Other(value.to_string()),
        }
    }
}

/// Нормализованное, платформонезависимое событие жизненного цикла окна.
///
/// X11 раскладывается на несколько таких событий за раз, Wayland и macOS
/// используют только часть вариантов.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowLifecycleEvent {
    Created {
        window_id: WindowId,
    },
    Destroyed {
        window_id: WindowId,
    },
    VisibilityChanged {
        window_id: WindowId,
        mapped: bool,
    },
    TitleChanged {
        window_id: WindowId,
        title: String,
    },
    IdentityHintChanged {
        window_id: WindowId,
        class_hint: Option<String>,
        instance_hint: Option<String>,
        desktop_file_hint: Option<String>,
    },
    ReparentedTo {
        window_id: WindowId,
        parent_id: WindowId,
    },
    Ancillary {
        window_id: WindowId,
        override_redirect: Option<bool>,
        transient_for: Option<Option<WindowId>>,
        window_types: Option<Vec<WindowType>>,
        window_group: Option<Option<WindowId>>,
        protocols: Option<Vec<String>>,
    },
}

impl WindowLifecycleEvent {
    pub fn window_id(&self) -> &WindowId {
        match self {
            Self::Created { window_id }
            | Self::Destroyed { window_id }
            | Self::VisibilityChanged { window_id, .. }
            | Self::TitleChanged { window_id, .. }
            | Self::IdentityHintChanged { window_id, .. }
            | Self::ReparentedTo { window_id, .. }
            | Self::Ancillary { window_id, .. } => window_id,
        }
    }

    fn ancillary(window_id: WindowId) -> Self {
        Self::Ancillary {
            window_id,
            override_redirect: None,
            transient_for: None,
            window_types: None,
            window_group: None,
            protocols: None,
        }
    }

    pub fn override_redirect(window_id: WindowId, value: bool) -> Self {
        let mut event = Self::ancillary(window_id);
        if let Self::Ancillary { override_redirect, .. } = &mut event {
            *override_redirect = Some(value);
        }
        event
    }

    pub fn transient_for(window_id: WindowId, value: Option<WindowId>) -> Self {
        let mut event = Self::ancillary(window_id);
        if let Self::Ancillary { transient_for, .. } = &mut event {
            *transient_for = Some(value);
        }
        event
    }

    pub fn window_types(window_id: WindowId, value: Vec<WindowType>) -> Self {
        let mut event = Self::ancillary(window_id);
        if let Self::Ancillary { window_types, .. } = &mut event {
            *window_types = Some(value);
        }
        event
    }

    pub fn window_group(window_id: WindowId, value: Option<WindowId>) -> Self {
        let mut event = Self::ancillary(window_id);
        if let Self::Ancillary { window_group, .. } = &mut event {
            *window_group = Some(value);
        }
        event
    }

    pub fn protocols(window_id: WindowId, value: Vec<String>) -> Self {
        let mut event = Self::ancillary(window_id);
        if let Self::Ancillary { protocols, .. } = &mut event {
            *protocols = Some(value);
        }
        event
    }
}

impl fmt::Display for WindowLifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { window_id } => write!(f, "Created({})", window_id),
            Self::Destroyed { window_id } => write!(f, "Destroyed({})", window_id),
            Self::VisibilityChanged { window_id, mapped } => {
                write!(f, "VisibilityChanged({}, mapped={})", window_id, mapped)
            }
            Self::TitleChanged { window_id, title } => {
                write!(f, "TitleChanged({}, \"{}\")", window_id, title)
            }
            Self::IdentityHintChanged { window_id, .. } => {
                write!(f, "IdentityHintChanged({})", window_id)
            }
            Self::ReparentedTo { window_id, parent_id } => {
                write!(f, "ReparentedTo({} -> {})", window_id, parent_id)
            }
            Self::Ancillary { window_id, .. } => write!(f, "Ancillary({})", window_id),
        }
    }
}
