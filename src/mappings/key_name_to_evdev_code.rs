use evdev::KeyCode as EvKey;

/// Преобразование имён клавиш в evdev коды
/// Отвечает за трансляцию строковых имён клавиш (как их пишут в настройке `signal.key`)
/// в числовые коды evdev, которые принимает uinput
pub struct KeyNameToEvdevCode;

impl KeyNameToEvdevCode {
    /// Получить evdev код клавиши по её имени (регистронезависимо)
    pub fn translate(key_name: &str) -> Result<u16, String> {
        let normalized = key_name.trim().to_lowercase();
        let key = match normalized.as_str() {
            // Буквенные клавиши
            "a" => EvKey::KEY_A,
            "b" => EvKey::KEY_B,
            "c" => EvKey::KEY_C,
            "d" => EvKey::KEY_D,
            "e" => EvKey::KEY_E,
            "f" => EvKey::KEY_F,
            "g" => EvKey::KEY_G,
            "h" => EvKey::KEY_H,
            "i" => EvKey::KEY_I,
            "j" => EvKey::KEY_J,
            "k" => EvKey::KEY_K,
            "l" => EvKey::KEY_L,
            "m" => EvKey::KEY_M,
            "n" => EvKey::KEY_N,
            "o" => EvKey::KEY_O,
            "p" => EvKey::KEY_P,
            "q" => EvKey::KEY_Q,
            "r" => EvKey::KEY_R,
            "s" => EvKey::KEY_S,
            "t" => EvKey::KEY_T,
            "u" => EvKey::KEY_U,
            "v" => EvKey::KEY_V,
            "w" => EvKey::KEY_W,
            "x" => EvKey::KEY_X,
            "y" => EvKey::KEY_Y,
            "z" => EvKey::KEY_Z,

            // Цифровые клавиши (верхний ряд)
            "1" => EvKey::KEY_1,
            "2" => EvKey::KEY_2,
            "3" => EvKey::KEY_3,
            "4" => EvKey::KEY_4,
            "5" => EvKey::KEY_5,
            "6" => EvKey::KEY_6,
            "7" => EvKey::KEY_7,
            "8" => EvKey::KEY_8,
            "9" => EvKey::KEY_9,
            "0" => EvKey::KEY_0,

            // Специальные клавиши
            "space" => EvKey::KEY_SPACE,
            "enter" | "return" => EvKey::KEY_ENTER,
            "escape" | "esc" => EvKey::KEY_ESC,
            "backspace" | "back" => EvKey::KEY_BACKSPACE,
            "tab" => EvKey::KEY_TAB,

            // Пунктуация
            "minus" => EvKey::KEY_MINUS,
            "equal" => EvKey::KEY_EQUAL,
            "leftbrace" => EvKey::KEY_LEFTBRACE,
            "rightbrace" => EvKey::KEY_RIGHTBRACE,
            "backslash" => EvKey::KEY_BACKSLASH,
            "semicolon" => EvKey::KEY_SEMICOLON,
            "apostrophe" => EvKey::KEY_APOSTROPHE,
            "grave" => EvKey::KEY_GRAVE,
            "comma" => EvKey::KEY_COMMA,
            "dot" | "period" => EvKey::KEY_DOT,
            "slash" => EvKey::KEY_SLASH,

            // Навигация/редакция
            "insert" => EvKey::KEY_INSERT,
            "delete" => EvKey::KEY_DELETE,
            "home" => EvKey::KEY_HOME,
            "end" => EvKey::KEY_END,
            "pageup" | "prior" => EvKey::KEY_PAGEUP,
            "pagedown" | "next" => EvKey::KEY_PAGEDOWN,

            // Стрелки (Arrow* - так их показывает окно настроек исходной утилиты)
            "up" | "arrowup" => EvKey::KEY_UP,
            "down" | "arrowdown" => EvKey::KEY_DOWN,
            "left" | "arrowleft" => EvKey::KEY_LEFT,
            "right" | "arrowright" => EvKey::KEY_RIGHT,

            // Numpad
            "kp0" => EvKey::KEY_KP0,
            "kp1" => EvKey::KEY_KP1,
            "kp2" => EvKey::KEY_KP2,
            "kp3" => EvKey::KEY_KP3,
            "kp4" => EvKey::KEY_KP4,
            "kp5" => EvKey::KEY_KP5,
            "kp6" => EvKey::KEY_KP6,
            "kp7" => EvKey::KEY_KP7,
            "kp8" => EvKey::KEY_KP8,
            "kp9" => EvKey::KEY_KP9,
            "kpenter" => EvKey::KEY_KPENTER,

            // Функциональные клавиши
            "f1" => EvKey::KEY_F1,
            "f2" => EvKey::KEY_F2,
            "f3" => EvKey::KEY_F3,
            "f4" => EvKey::KEY_F4,
            "f5" => EvKey::KEY_F5,
            "f6" => EvKey::KEY_F6,
            "f7" => EvKey::KEY_F7,
            "f8" => EvKey::KEY_F8,
            "f9" => EvKey::KEY_F9,
            "f10" => EvKey::KEY_F10,
            "f11" => EvKey::KEY_F11,
            "f12" => EvKey::KEY_F12,

            // Модификаторы (левые)
            "ctrl" | "control" => EvKey::KEY_LEFTCTRL,
            "alt" => EvKey::KEY_LEFTALT,
            "shift" => EvKey::KEY_LEFTSHIFT,
            "super" | "win" | "meta" => EvKey::KEY_LEFTMETA,

            _ => return Err(format!("Unknown key: {}", key_name)),
        };

        Ok(key.code())
    }

    /// Проверить, является ли клавиша модификатором
    pub fn is_modifier(key_name: &str) -> bool {
        let normalized = key_name.trim().to_lowercase();
        matches!(
            normalized.as_str(),
            "ctrl" | "control" | "alt" | "shift" | "super" | "win" | "meta"
        )
    }
}
