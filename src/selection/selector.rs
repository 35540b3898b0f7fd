use super::region::{Region, VirtualDesktopBounds};
use super::state::{normalize, transition, SelectionState};
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::SelectionEvent;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Источник событий ввода для выбора области
pub trait SelectionEventSource {
    /// Следующее событие; `Ok(None)`, когда ввод закончился
    fn next_event(&mut self) -> Result<Option<SelectionEvent>>;
}

/// Снимок автомата и текущей точки протяжки.
/// Пишется обработчиком событий, читается отрисовкой - только целиком под мьютексом.
#[derive(Debug, Clone, Copy)]
struct DragSnapshot {
    state: SelectionState,
    current: (i32, i32),
}

pub struct RegionSelector {
    bounds: VirtualDesktopBounds,
    snapshot: Mutex<DragSnapshot>,
}

impl RegionSelector {
    pub fn new(bounds: VirtualDesktopBounds) -> Self {
        Self {
            bounds,
            snapshot: Mutex::new(DragSnapshot {
                state: SelectionState::Idle,
                current: (0, 0),
            }),
        }
    }

    /// Применить событие к автомату и вернуть новое состояние
    pub fn dispatch(&self, event: SelectionEvent) -> SelectionState {
        let mut snapshot = self.snapshot.lock();

        match event {
            SelectionEvent::PointerDown { x, y } => snapshot.current = (x, y),
            SelectionEvent::PointerMove { x, y, primary_held: true } => {
                if matches!(snapshot.state, SelectionState::Dragging { .. }) {
                    snapshot.current = (x, y);
                }
            }
            SelectionEvent::PointerUp { x, y } => snapshot.current = (x, y),
            _ => {}
        }

        snapshot.state = transition(snapshot.state, event, &self.bounds);
        snapshot.state
    }

    /// Прямоугольник текущей протяжки в глобальных координатах (для обратной связи)
    pub fn feedback(&self) -> Option<Region> {
        let snapshot = *self.snapshot.lock();
        match snapshot.state {
            SelectionState::Dragging { origin_x, origin_y } => {
                let (left, top, width, height) =
                    normalize(origin_x, origin_y, snapshot.current.0, snapshot.current.1);
                let (x, y) = self.bounds.to_global(left, top);
                Some(Region::new(x, y, width, height))
            }
            _ => None,
        }
    }

    /// Прокачивать события до терминального состояния или конца ввода
    pub fn run(&self, source: &mut dyn SelectionEventSource) -> Result<Option<Region>> {
        info!("Выбор области: зажмите левую кнопку и протяните прямоугольник, Esc - отмена");

        while let Some(event) = source.next_event()? {
            let state = self.dispatch(event);
            debug_if_enabled!("Событие выбора {} -> {:?}", event, state);

            if let Some(rect) = self.feedback() {
                debug_if_enabled!("Текущая рамка: {}", rect);
            }

            match state {
                SelectionState::Completed(region) => {
                    info!("Выбрана область {}", region);
                    return Ok(Some(region));
                }
                SelectionState::Cancelled => {
                    info!("Выбор области отменён");
                    return Ok(None);
                }
                SelectionState::Idle if matches!(event, SelectionEvent::PointerUp { .. }) => {
                    info!("Слишком маленькая рамка проигнорирована, повторите выбор");
                }
                _ => {}
            }
        }

        info!("Ввод закончился до завершения выбора");
        Ok(None)
    }
}

/// Полный выбор области: границы рабочего стола, открытие источника ввода, автомат.
///
/// Возвращает `None` (ничего не выбрано), если мониторов нет, источник ввода
/// не открылся или пользователь отменил выбор.
pub fn select_region<S, F>(monitors: &[Region], open_source: F) -> Option<Region>
where
    S: SelectionEventSource,
    F: FnOnce(&VirtualDesktopBounds) -> Result<S>,
{
    let Some(bounds) = VirtualDesktopBounds::from_monitors(monitors) else {
        warn!("Не удалось определить границы рабочего стола: мониторы не найдены");
        return None;
    };
    info!("Виртуальный рабочий стол: {} ({} мониторов)", bounds, monitors.len());

    let mut source = match open_source(&bounds) {
        Ok(source) => source,
        Err(e) => {
            warn!("Не удалось открыть ввод для выбора области: {}", e);
            return None;
        }
    };

    let selector = RegionSelector::new(bounds);
    match selector.run(&mut source) {
        Ok(region) => region.filter(Region::is_valid),
        Err(e) => {
            warn!("Ошибка чтения ввода при выборе области: {}", e);
            None
        }
    }
}
