//! WindowWatcher: responsibility and boundaries
//!
//! This module and its submodules are responsible ONLY for turning a platform's raw
//! window-manager events (X11, Wayland compositor, macOS) into normalized
//! `WindowLifecycleEvent` batches. They MUST NOT inspect the catalog or decide which
//! application a window belongs to; validation and identity resolution are done
//! exclusively by the reconcilers.

mod dry_run;
mod macos;
mod quartz;
mod sway;
mod wayland;
mod wmctrl;
mod x11;
mod r#trait;

pub use self::macos::translate_macos;
pub use self::r#trait::{create_event_source, PlatformSource, PlatformWatcher, WindowWatcherTrait};
pub use self::wayland::translate_wayland;
pub use self::x11::translate_x11;
