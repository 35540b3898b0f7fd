use crate::error::{Result, ShotError};
use crate::mappings::KeyNameToEvdevCode;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Состояние клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Код клавиши (evdev коды)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY_{}", self.0)
    }
}

/// Модификаторы клавиш
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

impl Modifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.super_key
    }

    /// Установить модификатор по имени; false, если имя не модификатор
    fn set_by_name(&mut self, name: &str) -> bool {
        match name.trim().to_lowercase().as_str() {
            "ctrl" | "control" => self.ctrl = true,
            "alt" => self.alt = true,
            "shift" => self.shift = true,
            "super" | "win" | "meta" => self.super_key = true,
            _ => return false,
        }
        true
    }

    /// Коды левых модификаторов в порядке нажатия: Ctrl, Alt, Shift, Super
    pub fn key_codes(&self) -> SmallVec<[KeyCode; 4]> {
        let mut codes = SmallVec::new();
        if self.ctrl {
            codes.push(KeyCode(evdev::KeyCode::KEY_LEFTCTRL.code()));
        }
        if self.alt {
            codes.push(KeyCode(evdev::KeyCode::KEY_LEFTALT.code()));
        }
        if self.shift {
            codes.push(KeyCode(evdev::KeyCode::KEY_LEFTSHIFT.code()));
        }
        if self.super_key {
            codes.push(KeyCode(evdev::KeyCode::KEY_LEFTMETA.code()));
        }
        codes
    }

    pub fn to_vec(&self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.ctrl { result.push("Ctrl"); }
        if self.alt { result.push("Alt"); }
        if self.shift { result.push("Shift"); }
        if self.super_key { result.push("Super"); }
        result
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.to_vec().join("+"))
        }
    }
}

/// Разобранное описание нажатия: набор модификаторов и основная клавиша.
///
/// Строка вида `"Ctrl+Shift+Right"` разбирается один раз при загрузке
/// конфигурации; при каждой отправке используется уже готовое значение.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub modifiers: Modifiers,
    pub key: KeyCode,
    key_name: String,
}

impl KeyChord {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(ShotError::InvalidKey("пустое описание клавиши".to_string()));
        }

        let parts: Vec<&str> = descriptor.split('+').map(str::trim).collect();
        let (main, prefix) = match parts.split_last() {
            Some(split) => split,
            None => return Err(crate::shot_error!(invalid_key, "'{}'", descriptor)),
        };

        let mut modifiers = Modifiers::new();
        for part in prefix {
            if !modifiers.set_by_name(part) {
                return Err(crate::shot_error!(
                    invalid_key,
                    "'{}' не является модификатором в '{}'",
                    part,
                    descriptor
                ));
            }
        }

        if main.is_empty() {
            return Err(crate::shot_error!(invalid_key, "нет основной клавиши в '{}'", descriptor));
        }
        if KeyNameToEvdevCode::is_modifier(main) {
            return Err(crate::shot_error!(
                invalid_key,
                "основная клавиша не может быть модификатором: '{}'",
                descriptor
            ));
        }

        let code = KeyNameToEvdevCode::translate(main)
            .map_err(|e| crate::shot_error!(invalid_key, "{}", e))?;

        Ok(Self {
            modifiers,
            key: KeyCode(code),
            key_name: main.to_string(),
        })
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }
}

impl Default for KeyChord {
    fn default() -> Self {
        Self {
            modifiers: Modifiers::new(),
            key: KeyCode(evdev::KeyCode::KEY_ENTER.code()),
            key_name: "Enter".to_string(),
        }
    }
}

impl FromStr for KeyChord {
    type Err = ShotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers.to_vec() {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key_name)
    }
}
