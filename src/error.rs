use thiserror::Error;

/// Насколько ошибка критична для цикла съёмки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Нарушает целостность результата: прогон прерывается без повторов
    IntegrityCritical,
    /// Побочное действие: ошибка логируется, цикл продолжается
    BestEffort,
}

#[derive(Error, Debug)]
pub enum ShotError {
    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка uinput: {0}")]
    Uinput(#[from] uinput::Error),

    #[error("Ошибка захвата экрана: {0}")]
    Capture(String),

    #[error("Ошибка сохранения кадра: {0}")]
    Save(String),

    #[error("Ошибка отправки клавиш: {0}")]
    Signal(String),

    #[error("Неверное описание клавиши: {0}")]
    InvalidKey(String),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl ShotError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(ShotError::DeviceNotFound(msg.into()))
    }

    pub fn severity(&self) -> Severity {
        match self {
            ShotError::Signal(_) => Severity::BestEffort,
            _ => Severity::IntegrityCritical,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShotError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! shot_error {
    (capture, $($arg:tt)*) => {
        $crate::error::ShotError::Capture(format!($($arg)*))
    };
    (save, $($arg:tt)*) => {
        $crate::error::ShotError::Save(format!($($arg)*))
    };
    (signal, $($arg:tt)*) => {
        $crate::error::ShotError::Signal(format!($($arg)*))
    };
    (invalid_key, $($arg:tt)*) => {
        $crate::error::ShotError::InvalidKey(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::ShotError::Permission(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::ShotError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::ShotError::Internal(format!($($arg)*))
    };
}
