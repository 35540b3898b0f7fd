use serde::{Deserialize, Serialize};
use std::fmt;

/// Информация о видимом окне верхнего уровня
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Идентификатор окна в виде, который понимает утилита (`0x04000007` и т.п.)
    pub id: String,
    pub title: String,
}

impl WindowInfo {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Точное совпадение заголовка
    pub fn has_title(&self, title: &str) -> bool {
        self.title == title
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" [{}]", self.title, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_info_creation() {
        let window = WindowInfo::new("0x04000007", "Viewer - book.pdf");

        assert_eq!(window.id, "0x04000007");
        assert_eq!(window.title, "Viewer - book.pdf");
        assert_eq!(window.to_string(), "\"Viewer - book.pdf\" [0x04000007]");
    }

    #[test]
    fn test_title_match_is_exact() {
        let window = WindowInfo::new("1", "Viewer - book.pdf");

        assert!(window.has_title("Viewer - book.pdf"));
        assert!(!window.has_title("Viewer"));
        assert!(!window.has_title("viewer - book.pdf"));
    }
}
