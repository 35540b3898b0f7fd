use crate::error::{Result, ShotError};
use crate::events::{KeyChord, KeyState, VirtualKeyEvent};
use tracing::{debug, info};

/// Отправка сигнала между кадрами
pub trait SignalSender {
    fn send(&mut self, chord: &KeyChord) -> Result<()>;
}

/// Виртуальная клавиатура uinput
pub struct VirtualDevice {
    device: Option<uinput::Device>,
    dry_run: bool,
}

impl VirtualDevice {
    pub fn new(device_name: &str, dry_run: bool) -> Result<Self> {
        info!("Инициализация VirtualDevice '{}' (dry_run: {})", device_name, dry_run);

        let device = if dry_run {
            None
        } else {
            Some(Self::create_virtual_device(device_name)?)
        };

        Ok(Self { device, dry_run })
    }

    fn create_virtual_device(device_name: &str) -> Result<uinput::Device> {
        info!("Создание виртуального устройства uinput '{}' для отправки клавиш", device_name);

        let virtual_device = uinput::default()?
            .name(device_name)?
            .event(uinput::event::Keyboard::All)?
            .create()
            .map_err(|e| {
                ShotError::Internal(format!("Не удалось создать виртуальное устройство '{}': {}", device_name, e))
            })?;

        info!("Виртуальное устройство '{}' создано успешно", device_name);
        Ok(virtual_device)
    }

    pub fn send_event(&mut self, event: VirtualKeyEvent) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] Виртуальное событие: {:?}", event);
            return Ok(());
        }

        let Some(device) = &mut self.device else {
            return Err(ShotError::Signal("Виртуальное устройство недоступно".to_string()));
        };

        let keycode = event.key_code.value() as i32;
        let value = match event.state {
            KeyState::Pressed => 1,
            KeyState::Released => 0,
        };

        device
            .write(1, keycode, value)
            .map_err(|e| crate::shot_error!(signal, "не удалось отправить событие клавиши {}: {}", keycode, e))?;
        device
            .write(0, 0, 0)
            .map_err(|e| crate::shot_error!(signal, "не удалось синхронизировать события: {}", e))?;

        debug!("Виртуальное событие {} отправлено", event.key_code);
        Ok(())
    }

    /// Нажать модификаторы, нажать и отпустить клавишу, отпустить модификаторы
    /// в обратном порядке. Модификаторы отпускаются, даже если основная клавиша не ушла.
    pub fn tap_chord(&mut self, chord: &KeyChord) -> Result<()> {
        press_chord(chord, |event| self.send_event(event))
    }
}

impl SignalSender for VirtualDevice {
    fn send(&mut self, chord: &KeyChord) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] Сигнал {}", chord);
            return Ok(());
        }
        self.tap_chord(chord)
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if !self.dry_run {
            info!("Закрытие виртуального устройства");
        }
    }
}

fn press_chord<F>(chord: &KeyChord, mut emit: F) -> Result<()>
where
    F: FnMut(VirtualKeyEvent) -> Result<()>,
{
    let modifiers = chord.modifiers.key_codes();

    let mut pressed = 0;
    let mut outcome = Ok(());
    for code in &modifiers {
        if let Err(e) = emit(VirtualKeyEvent::press(*code)) {
            outcome = Err(e);
            break;
        }
        pressed += 1;
    }

    if outcome.is_ok() {
        outcome = emit(VirtualKeyEvent::press(chord.key))
            .and_then(|_| emit(VirtualKeyEvent::release(chord.key)));
    }

    for code in modifiers[..pressed].iter().rev() {
        if let Err(e) = emit(VirtualKeyEvent::release(*code)) {
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::KeyCode;

    fn code(key: evdev::KeyCode) -> KeyCode {
        KeyCode(key.code())
    }

    #[test]
    fn test_chord_press_order() {
        let chord = KeyChord::parse("Ctrl+Shift+Right").unwrap();
        let mut events = Vec::new();

        press_chord(&chord, |event| {
            events.push(event);
            Ok(())
        })
        .unwrap();

        assert_eq!(
            events,
            vec![
                VirtualKeyEvent::press(code(evdev::KeyCode::KEY_LEFTCTRL)),
                VirtualKeyEvent::press(code(evdev::KeyCode::KEY_LEFTSHIFT)),
                VirtualKeyEvent::press(code(evdev::KeyCode::KEY_RIGHT)),
                VirtualKeyEvent::release(code(evdev::KeyCode::KEY_RIGHT)),
                VirtualKeyEvent::release(code(evdev::KeyCode::KEY_LEFTSHIFT)),
                VirtualKeyEvent::release(code(evdev::KeyCode::KEY_LEFTCTRL)),
            ]
        );
    }

    #[test]
    fn test_modifiers_released_when_key_fails() {
        let chord = KeyChord::parse("Alt+Tab").unwrap();
        let tab = code(evdev::KeyCode::KEY_TAB);
        let mut events = Vec::new();

        let result = press_chord(&chord, |event| {
            if event.key_code == tab {
                return Err(ShotError::Signal("сбой".into()));
            }
            events.push(event);
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(
            events,
            vec![
                VirtualKeyEvent::press(code(evdev::KeyCode::KEY_LEFTALT)),
                VirtualKeyEvent::release(code(evdev::KeyCode::KEY_LEFTALT)),
            ]
        );
    }

    #[test]
    fn test_dry_run_sends_nothing() {
        let mut device = VirtualDevice::new("test", true).unwrap();
        assert!(device.send(&KeyChord::default()).is_ok());
        assert!(device.send_event(VirtualKeyEvent::press(KeyCode(28))).is_ok());
    }
}
