use crate::error::Result;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{info, warn};

/// Доступ к /dev/input нужен для интерактивного выбора области
pub fn check_input_devices_access() -> Result<()> {
    let input_dir = "/dev/input";

    if !Path::new(input_dir).exists() {
        return Err(crate::shot_error!(permission, "Директория {} не существует", input_dir));
    }

    match fs::read_dir(input_dir) {
        Ok(_) => {
            info!("Доступ к {} подтвержден", input_dir);
            Ok(())
        }
        Err(e) => Err(crate::shot_error!(permission, "Нет доступа к {}: {}. Добавьте пользователя в группу 'input'",
            input_dir, e)),
    }
}

/// Доступ к /dev/uinput нужен для отправки клавиш
pub fn check_uinput_access() -> Result<()> {
    let uinput_device = "/dev/uinput";

    if !Path::new(uinput_device).exists() {
        warn!("{} не существует, возможно модуль uinput не загружен (sudo modprobe uinput)", uinput_device);
        return Ok(()); // Модуль может быть загружен позже, ошибку покажет создание устройства
    }

    let metadata = fs::metadata(uinput_device).map_err(|e| {
        crate::shot_error!(permission, "Не удалось проверить права доступа к {}: {}", uinput_device, e)
    })?;

    if !has_group_or_other_access(metadata.permissions().mode()) {
        return Err(crate::shot_error!(permission, "Нет прав доступа к {}. Добавьте пользователя в группу 'uinput' или 'input'",
            uinput_device));
    }

    info!("Доступ к {} подтвержден", uinput_device);
    Ok(())
}

/// Обычно 660 или 666
fn has_group_or_other_access(mode: u32) -> bool {
    mode & 0o006 != 0 || mode & 0o060 != 0
}
