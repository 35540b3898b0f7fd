use super::region::VirtualDesktopBounds;
use super::selector::SelectionEventSource;
use crate::config::SelectionConfig;
use crate::debug_if_enabled;
use crate::error::{Result, ShotError};
use crate::events::SelectionEvent;
use crate::services::window_focus::XdotoolTool;
use crate::utils::{DeviceFinder, DeviceKind};
use evdev::{Device, EventType, KeyCode};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Пауза потока чтения, когда у устройства нет новых событий
const READER_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Сырое событие от устройства, до привязки к координатам
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawInput {
    ButtonDown,
    ButtonUp,
    Motion,
    Escape,
    Closed(String),
}

/// Источник событий выбора из реальных устройств ввода.
///
/// Мышь и клавиатура читаются через evdev во вспомогательных потоках, которые
/// только пересылают сырые события; координаты указателя берутся у X-сервера
/// (xdotool) в момент нажатия, перемещения и отпускания кнопки.
/// Устройства не захватываются эксклюзивно: курсор должен оставаться видимым.
/// Потоки чтения живут не дольше источника: `Drop` поднимает флаг остановки.
pub struct EvdevSelectionSource {
    rx: Receiver<RawInput>,
    stop: Arc<AtomicBool>,
    pending: Option<RawInput>,
    bounds: VirtualDesktopBounds,
    locator: XdotoolTool,
    button_held: bool,
}

impl EvdevSelectionSource {
    pub fn open(config: &SelectionConfig, bounds: &VirtualDesktopBounds) -> Result<Self> {
        let locator = XdotoolTool::new();
        locator.test().map_err(|e| {
            crate::shot_error!(service_unavailable, "для выбора области нужен xdotool: {}", e)
        })?;

        let pointer_path = DeviceFinder::find_device(&config.pointer_device, DeviceKind::Pointer)?;
        let keyboard_path = DeviceFinder::find_device(&config.keyboard_device, DeviceKind::Keyboard)?;

        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        spawn_reader(open_device(&pointer_path)?, tx.clone(), stop.clone(), "pointer")?;
        if keyboard_path != pointer_path {
            if let Err(e) = open_device(&keyboard_path)
                .and_then(|device| spawn_reader(device, tx, stop.clone(), "keyboard"))
            {
                stop.store(true, Ordering::Relaxed);
                return Err(e);
            }
        }

        info!("Выбор области: мышь {:?}, клавиатура {:?}", pointer_path, keyboard_path);

        Ok(Self {
            rx,
            stop,
            pending: None,
            bounds: *bounds,
            locator,
            button_held: false,
        })
    }

    fn recv(&mut self) -> Option<RawInput> {
        if let Some(raw) = self.pending.take() {
            return Some(raw);
        }
        self.rx.recv().ok()
    }

    /// Схлопнуть очередь перемещений: координаты всё равно запрашиваются заново
    fn coalesce_motion(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(RawInput::Motion) => continue,
                Ok(other) => {
                    self.pending = Some(other);
                    return;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return,
            }
        }
    }
}

impl Drop for EvdevSelectionSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl SelectionEventSource for EvdevSelectionSource {
    fn next_event(&mut self) -> Result<Option<SelectionEvent>> {
        loop {
            let Some(raw) = self.recv() else {
                return Ok(None);
            };

            if raw == RawInput::Motion {
                self.coalesce_motion();
            }

            let bounds = self.bounds;
            let locator = &self.locator;
            let event = translate(raw, &mut self.button_held, || {
                let (x, y) = locator.pointer_location()?;
                Ok(bounds.to_local(x, y))
            })?;

            if let Some(event) = event {
                return Ok(Some(event));
            }
        }
    }
}

fn open_device(path: &Path) -> Result<Device> {
    Device::open(path).map_err(|e| {
        ShotError::DeviceNotFound(format!("Не удалось открыть устройство {:?}: {}", path, e))
    })
}

fn spawn_reader(
    mut device: Device,
    tx: Sender<RawInput>,
    stop: Arc<AtomicBool>,
    label: &'static str,
) -> Result<()> {
    // Неблокирующее чтение, иначе поток не увидит флаг остановки до следующего события
    device.set_nonblocking(true)?;

    thread::Builder::new()
        .name(format!("input-{}", label))
        .spawn(move || {
            let fetch = || {
                device.fetch_events().map(|events| {
                    events
                        .filter_map(|event| classify(event.event_type(), event.code(), event.value()))
                        .collect::<Vec<_>>()
                })
            };
            run_reader(fetch, &tx, &stop, label);
        })?;
    Ok(())
}

/// Цикл потока чтения: пересылать события, пока не поднят `stop`,
/// не закрыт получатель и устройство не вернуло ошибку.
fn run_reader<F>(mut fetch: F, tx: &Sender<RawInput>, stop: &AtomicBool, label: &str)
where
    F: FnMut() -> io::Result<Vec<RawInput>>,
{
    while !stop.load(Ordering::Relaxed) {
        let batch = match fetch() {
            Ok(batch) => batch,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(READER_POLL_INTERVAL);
                continue;
            }
            Err(e) => {
                let _ = tx.send(RawInput::Closed(format!("{}: {}", label, e)));
                return;
            }
        };

        for raw in batch {
            // Получатель закрыт - выбор закончен
            if tx.send(raw).is_err() {
                return;
            }
        }
    }
    debug!("Поток чтения {} остановлен", label);
}

fn classify(event_type: EventType, code: u16, value: i32) -> Option<RawInput> {
    if event_type == EventType::KEY {
        let key = KeyCode::new(code);
        if key == KeyCode::BTN_LEFT {
            return match value {
                1 => Some(RawInput::ButtonDown),
                0 => Some(RawInput::ButtonUp),
                _ => None,
            };
        }
        if key == KeyCode::KEY_ESC && value == 1 {
            return Some(RawInput::Escape);
        }
        return None;
    }

    if event_type == EventType::RELATIVE || event_type == EventType::ABSOLUTE {
        return Some(RawInput::Motion);
    }

    None
}

/// Привязать сырое событие к координатам. `locate` вызывается только когда
/// координаты действительно нужны.
fn translate<F>(raw: RawInput, button_held: &mut bool, locate: F) -> Result<Option<SelectionEvent>>
where
    F: FnOnce() -> Result<(i32, i32)>,
{
    let event = match raw {
        RawInput::Escape => SelectionEvent::CancelKey,
        RawInput::ButtonDown => {
            *button_held = true;
            let (x, y) = locate()?;
            SelectionEvent::PointerDown { x, y }
        }
        RawInput::ButtonUp if *button_held => {
            *button_held = false;
            let (x, y) = locate()?;
            SelectionEvent::PointerUp { x, y }
        }
        RawInput::Motion if *button_held => {
            let (x, y) = locate()?;
            SelectionEvent::PointerMove { x, y, primary_held: true }
        }
        RawInput::ButtonUp | RawInput::Motion => return Ok(None),
        RawInput::Closed(reason) => {
            warn!("Устройство ввода закрыто: {}", reason);
            return Err(ShotError::DeviceNotFound(reason));
        }
    };

    debug_if_enabled!("Событие ввода: {}", event);
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: i32, y: i32) -> impl FnOnce() -> Result<(i32, i32)> {
        move || -> Result<(i32, i32)> { Ok((x, y)) }
    }

    fn never() -> impl FnOnce() -> Result<(i32, i32)> {
        || -> Result<(i32, i32)> { panic!("координаты не должны запрашиваться") }
    }

    #[test]
    fn test_classify_button_and_escape() {
        let btn = KeyCode::BTN_LEFT.code();
        let esc = KeyCode::KEY_ESC.code();

        assert_eq!(classify(EventType::KEY, btn, 1), Some(RawInput::ButtonDown));
        assert_eq!(classify(EventType::KEY, btn, 0), Some(RawInput::ButtonUp));
        assert_eq!(classify(EventType::KEY, esc, 1), Some(RawInput::Escape));
        assert_eq!(classify(EventType::KEY, esc, 0), None);
        assert_eq!(classify(EventType::KEY, KeyCode::KEY_A.code(), 1), None);
        assert_eq!(classify(EventType::RELATIVE, 0, 5), Some(RawInput::Motion));
        assert_eq!(classify(EventType::SYNCHRONIZATION, 0, 0), None);
    }

    #[test]
    fn test_translate_press_drag_release() {
        let mut held = false;

        assert_eq!(
            translate(RawInput::ButtonDown, &mut held, at(10, 20)).unwrap(),
            Some(SelectionEvent::PointerDown { x: 10, y: 20 })
        );
        assert!(held);
        assert_eq!(
            translate(RawInput::Motion, &mut held, at(30, 40)).unwrap(),
            Some(SelectionEvent::PointerMove { x: 30, y: 40, primary_held: true })
        );
        assert_eq!(
            translate(RawInput::ButtonUp, &mut held, at(50, 60)).unwrap(),
            Some(SelectionEvent::PointerUp { x: 50, y: 60 })
        );
        assert!(!held);
    }

    #[test]
    fn test_translate_ignores_motion_without_button() {
        let mut held = false;
        assert_eq!(translate(RawInput::Motion, &mut held, never()).unwrap(), None);
        assert_eq!(translate(RawInput::ButtonUp, &mut held, never()).unwrap(), None);
        assert_eq!(
            translate(RawInput::Escape, &mut held, never()).unwrap(),
            Some(SelectionEvent::CancelKey)
        );
    }

    #[test]
    fn test_reader_forwards_until_stopped() {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let reader_stop = stop.clone();

        let reader = thread::spawn(move || {
            let mut first = true;
            let fetch = || {
                if std::mem::take(&mut first) {
                    Ok(vec![RawInput::ButtonDown, RawInput::Motion])
                } else {
                    Err(io::Error::from(io::ErrorKind::WouldBlock))
                }
            };
            run_reader(fetch, &tx, &reader_stop, "test");
        });

        assert_eq!(rx.recv().unwrap(), RawInput::ButtonDown);
        assert_eq!(rx.recv().unwrap(), RawInput::Motion);

        // Устройство молчит, поток должен завершиться по флагу
        stop.store(true, Ordering::Relaxed);
        reader.join().unwrap();
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_reader_reports_device_error_and_exits() {
        let (tx, rx) = mpsc::channel();
        let stop = AtomicBool::new(false);

        run_reader(|| Err(io::Error::other("нет устройства")), &tx, &stop, "pointer");
        drop(tx);

        match rx.recv().unwrap() {
            RawInput::Closed(reason) => assert!(reason.starts_with("pointer: ")),
            other => panic!("ожидалось закрытие устройства, получено {:?}", other),
        }
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_reader_exits_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let stop = AtomicBool::new(false);
        let mut calls = 0;

        run_reader(
            || {
                calls += 1;
                Ok(vec![RawInput::Motion])
            },
            &tx,
            &stop,
            "pointer",
        );
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_translate_closed_device_is_error() {
        let mut held = true;
        assert!(translate(RawInput::Closed("gone".into()), &mut held, never()).is_err());
    }
}
