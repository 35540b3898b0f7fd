pub mod device_finder;
pub mod permissions;

pub use device_finder::{DeviceFinder, DeviceKind};

// ✅ Макросы условного логирования: не форматируем сообщение, если уровень выключен
#[macro_export]
macro_rules! debug_if_enabled {
    ($($arg:tt)*) => {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!($($arg)*);
        }
    };
}
