pub mod app_scanner;
pub mod collaborators;
pub mod console;
pub mod dispatcher;
pub mod platform;
pub mod reconciler;
pub mod registry;
pub mod window_tracking;
pub mod window_watcher;

pub use app_scanner::AppScannerGenerator;
pub use collaborators::{ChannelSearchIndex, ConfiguredShortcuts, LoggingViewRenderer};
pub use dispatcher::ActionDispatcher;
pub use platform::create_platform_actions;
pub use registry::{EntrypointGenerator, EntrypointRegistry};
pub use window_tracking::WindowTrackingGenerator;
pub use window_watcher::create_event_source;
