use std::fmt;

/// Абстрактное событие ввода для выбора области.
///
/// Координаты локальные: относительно левого верхнего угла виртуального
/// рабочего стола (всех мониторов вместе).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    PointerDown { x: i32, y: i32 },
    PointerMove { x: i32, y: i32, primary_held: bool },
    PointerUp { x: i32, y: i32 },
    CancelKey,
}

impl SelectionEvent {
    pub fn down(x: i32, y: i32) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn drag_to(x: i32, y: i32) -> Self {
        Self::PointerMove { x, y, primary_held: true }
    }

    pub fn up(x: i32, y: i32) -> Self {
        Self::PointerUp { x, y }
    }
}

impl fmt::Display for SelectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointerDown { x, y } => write!(f, "down({}, {})", x, y),
            Self::PointerMove { x, y, primary_held } => {
                write!(f, "move({}, {}{})", x, y, if *primary_held { ", held" } else { "" })
            }
            Self::PointerUp { x, y } => write!(f, "up({}, {})", x, y),
            Self::CancelKey => write!(f, "cancel"),
        }
    }
}
