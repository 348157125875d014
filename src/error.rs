use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка отслеживания файловой системы: {0}")]
    Watch(#[from] notify::Error),

    #[error("Некорректная точка входа: {0}")]
    InvalidEntry(String),

    #[error("Точка входа не найдена: {0}")]
    UnknownEntry(String),

    #[error("Действие #{index} вне диапазона для '{local_id}' (всего действий: {len})")]
    ActionIndexOutOfRange {
        local_id: String,
        index: usize,
        len: usize,
    },

    #[error("Действие с ref '{action_ref}' не найдено у генератора '{generator_id}'")]
    UnknownActionRef {
        generator_id: String,
        action_ref: String,
    },

    #[error("Генератор завершился с ошибкой: {0}")]
    GeneratorFailed(String),

    #[error("Поток событий окон закрыт: {0}")]
    WatcherClosed(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl LauncherError {
    pub fn invalid_entry<T>(msg: impl Into<String>) -> Result<T> {
        Err(LauncherError::InvalidEntry(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! launcher_error {
    (invalid_entry, $($arg:tt)*) => {
        $crate::error::LauncherError::InvalidEntry(format!($($arg)*))
    };
    (unknown_entry, $($arg:tt)*) => {
        $crate::error::LauncherError::UnknownEntry(format!($($arg)*))
    };
    (generator_failed, $($arg:tt)*) => {
        $crate::error::LauncherError::GeneratorFailed(format!($($arg)*))
    };
    (watcher_closed, $($arg:tt)*) => {
        $crate::error::LauncherError::WatcherClosed(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::LauncherError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::LauncherError::Internal(format!($($arg)*))
    };
}
