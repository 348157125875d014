pub mod keyboard;
pub mod platform;
pub mod window;

pub use keyboard::{Modifiers, Shortcut};
pub use platform::{MacosEvent, WaylandEvent, X11Event};
pub use window::{WindowEventBatch, WindowId, WindowLifecycleEvent, WindowType};
