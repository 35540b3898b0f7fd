use super::region::{Region, VirtualDesktopBounds};
use crate::events::SelectionEvent;

/// Протяжка не больше этого числа пикселей по любой оси считается случайным кликом
pub const MIN_DRAG_PIXELS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Dragging { origin_x: i32, origin_y: i32 },
    Completed(Region),
    Cancelled,
}

impl SelectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled)
    }

    pub fn region(&self) -> Option<Region> {
        match self {
            Self::Completed(region) => Some(*region),
            _ => None,
        }
    }
}

/// Нормализованный прямоугольник по двум углам (локальные координаты)
pub fn normalize(x0: i32, y0: i32, x1: i32, y1: i32) -> (i32, i32, u32, u32) {
    (x0.min(x1), y0.min(y1), x0.abs_diff(x1), y0.abs_diff(y1))
}

/// Чистая функция перехода автомата выбора области.
///
/// Терминальные состояния поглощают любые события.
pub fn transition(
    state: SelectionState,
    event: SelectionEvent,
    bounds: &VirtualDesktopBounds,
) -> SelectionState {
    if state.is_terminal() {
        return state;
    }

    match (state, event) {
        (_, SelectionEvent::CancelKey) => SelectionState::Cancelled,

        // Повторное нажатие во время протяжки начинает её заново
        (_, SelectionEvent::PointerDown { x, y }) => SelectionState::Dragging {
            origin_x: x,
            origin_y: y,
        },

        (SelectionState::Dragging { origin_x, origin_y }, SelectionEvent::PointerUp { x, y }) => {
            let (left, top, width, height) = normalize(origin_x, origin_y, x, y);
            if width > MIN_DRAG_PIXELS && height > MIN_DRAG_PIXELS {
                let (gx, gy) = bounds.to_global(left, top);
                SelectionState::Completed(Region::new(gx, gy, width, height))
            } else {
                SelectionState::Idle
            }
        }

        // Перемещение меняет только текущую точку для отрисовки, не состояние
        (state, SelectionEvent::PointerMove { .. }) => state,
        (SelectionState::Idle, SelectionEvent::PointerUp { .. }) => SelectionState::Idle,
        (state, _) => state,
    }
}
