use crate::error::{Result, ShotError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Какое устройство ввода ищем
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard,
    Pointer,
}

impl DeviceKind {
    /// Маркеры в именах /dev/input/by-id
    fn by_id_markers(&self) -> &'static [&'static str] {
        match self {
            DeviceKind::Keyboard => &["kbd", "keyboard"],
            DeviceKind::Pointer => &["mouse"],
        }
    }

    /// Приоритет кандидата по имени ссылки в by-id
    fn priority(&self, name: &str) -> u32 {
        match self {
            DeviceKind::Keyboard if name.ends_with("event-kbd") => 100,
            DeviceKind::Pointer if name.ends_with("event-mouse") => 100,
            _ if name.to_lowercase().contains(self.by_id_markers()[0]) => 50,
            _ => 10,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Keyboard => write!(f, "клавиатура"),
            DeviceKind::Pointer => write!(f, "мышь"),
        }
    }
}

pub struct DeviceFinder;

impl DeviceFinder {
    /// Найти устройство: путь из настройки или автопоиск при значении "auto"
    pub fn find_device(device_path: &str, kind: DeviceKind) -> Result<PathBuf> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            return if path.exists() {
                info!("Используется указанное устройство ({}): {:?}", kind, path);
                Ok(path)
            } else {
                ShotError::device_not_found(format!("Указанное устройство не найдено: {:?}", path))
            };
        }

        Self::auto_find(kind)
    }

    fn auto_find(kind: DeviceKind) -> Result<PathBuf> {
        info!("Автопоиск устройства ввода: {}", kind);

        if let Ok(device) = Self::find_by_id(kind) {
            info!("Найдено устройство по ID: {:?}", device);
            return Ok(device);
        }

        if let Ok(device) = Self::find_by_event_devices(kind) {
            info!("Найдено устройство среди event устройств: {:?}", device);
            return Ok(device);
        }

        ShotError::device_not_found(format!(
            "Не удалось найти устройство ({}). Убедитесь, что пользователь добавлен в группу 'input'",
            kind
        ))
    }

    fn find_by_id(kind: DeviceKind) -> Result<PathBuf> {
        let by_id_dir = Path::new("/dev/input/by-id");

        if !by_id_dir.exists() {
            debug!("Директория /dev/input/by-id не существует");
            return ShotError::device_not_found("Директория by-id не найдена");
        }

        let entries = fs::read_dir(by_id_dir)
            .map_err(|e| crate::shot_error!(permission, "Нет доступа к /dev/input/by-id: {}", e))?;

        let mut candidates = Vec::new();

        for entry in entries {
            let path = entry?.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_string();

            let lower = name.to_lowercase();
            if !lower.contains("event") || !kind.by_id_markers().iter().any(|m| lower.contains(m)) {
                continue;
            }

            if !Self::is_device_accessible(&path) {
                warn!("Устройство {:?} недоступно", path);
                continue;
            }

            if Self::matches_kind(&path, kind) {
                let priority = kind.priority(&name);
                info!("Кандидат ({}): {} (приоритет: {})", kind, name, priority);
                candidates.push((path, priority));
            } else {
                debug!("Устройство не прошло проверку ({}): {}", kind, name);
            }
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        match candidates.into_iter().next() {
            Some((path, _)) => Ok(path),
            None => ShotError::device_not_found(format!("Устройство ({}) не найдено в by-id", kind)),
        }
    }

    fn find_by_event_devices(kind: DeviceKind) -> Result<PathBuf> {
        let input_dir = Path::new("/dev/input");

        let entries = fs::read_dir(input_dir)
            .map_err(|e| crate::shot_error!(permission, "Нет доступа к /dev/input: {}", e))?;

        let mut event_devices = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_event = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with("event"));
            if is_event {
                event_devices.push(path);
            }
        }

        event_devices.sort();

        for device_path in event_devices {
            debug!("Проверяем устройство: {:?}", device_path);
            if Self::is_device_accessible(&device_path) && Self::matches_kind(&device_path, kind) {
                return Ok(device_path);
            }
        }

        ShotError::device_not_found(format!("Не найдено доступное устройство ({}) среди event устройств", kind))
    }

    /// Проверка возможностей устройства через evdev
    fn matches_kind(device_path: &Path, kind: DeviceKind) -> bool {
        let device = match evdev::Device::open(device_path) {
            Ok(device) => device,
            Err(e) => {
                debug!("Не удалось открыть устройство {:?}: {}", device_path, e);
                return false;
            }
        };

        let device_name = device.name().unwrap_or("Unknown").to_lowercase();
        let Some(keys) = device.supported_keys() else {
            return false;
        };

        match kind {
            DeviceKind::Keyboard => {
                if device_name.contains("mouse") || device_name.contains("touchpad") {
                    return false;
                }
                // У настоящей клавиатуры много клавиш, среди них обязательно Esc и буквы
                keys.contains(evdev::KeyCode::KEY_ESC)
                    && keys.contains(evdev::KeyCode::KEY_A)
                    && keys.iter().count() > 20
            }
            DeviceKind::Pointer => keys.contains(evdev::KeyCode::BTN_LEFT),
        }
    }

    fn is_device_accessible(device_path: &Path) -> bool {
        match fs::File::open(device_path) {
            Ok(_) => true,
            Err(e) => {
                debug!("Устройство {:?} недоступно: {}", device_path, e);
                false
            }
        }
    }
}
