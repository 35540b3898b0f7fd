//! CaptureLoop: responsibility and boundaries
//!
//! Repeats capture, persist, fingerprint and compare for a fixed region, sending
//! the configured keystroke between frames, until one of the stop conditions fires:
//! - the frame count limit is reached;
//! - three consecutive persisted frames have identical digests (the last two are
//!   removed again, only the first of the stable run is kept);
//! - capturing or persisting fails (fatal, no retry);
//! - the cancellation token is triggered.
//!
//! A failed keystroke is logged and the loop carries on. All hardware access goes
//! through the [`FrameSource`], [`ArtifactStore`] and [`SignalSender`] traits.

use super::artifact_store::{Artifact, ArtifactStore, MAX_FRAME_COUNT};
use super::digest::{Digest, DigestWindow};
use super::screen_capture::FrameSource;
use super::virtual_device::SignalSender;
use crate::error::ShotError;
use crate::events::KeyChord;
use crate::selection::Region;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SIGNAL_DELAY: Duration = Duration::from_millis(500);

/// Параметры одного прогона
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub region: Region,
    pub output_dir: PathBuf,
    pub signal: KeyChord,
    /// 0 - без ограничения
    pub max_count: u32,
    pub stop_on_duplicate_triplicate: bool,
    pub delay_after_signal: Duration,
}

impl RunConfig {
    /// Нулевая задержка заменяется значением по умолчанию
    pub fn effective_delay(&self) -> Duration {
        if self.delay_after_signal.is_zero() {
            DEFAULT_SIGNAL_DELAY
        } else {
            self.delay_after_signal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxCount,
    DuplicateTriplicate,
    CaptureError,
    SaveError,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::MaxCount => "достигнуто максимальное число кадров",
            StopReason::DuplicateTriplicate => "три одинаковых кадра подряд",
            StopReason::CaptureError => "ошибка захвата экрана",
            StopReason::SaveError => "ошибка сохранения кадра",
            StopReason::Cancelled => "прервано пользователем",
        };
        f.write_str(text)
    }
}

#[derive(Debug)]
pub struct RunResult {
    /// Число кадров на диске после очистки
    pub frames_saved: u32,
    pub stop_reason: StopReason,
    /// Ошибка, остановившая прогон (для CaptureError/SaveError)
    pub error: Option<ShotError>,
}

impl RunResult {
    fn stopped(frames_saved: u32, stop_reason: StopReason) -> Self {
        Self {
            frames_saved,
            stop_reason,
            error: None,
        }
    }

    fn failed(frames_saved: u32, stop_reason: StopReason, error: ShotError) -> Self {
        Self {
            frames_saved,
            stop_reason,
            error: Some(error),
        }
    }
}

/// Решение об остановке после кадра `n`. Принимается до отправки сигнала.
///
/// Если на одном кадре срабатывают оба условия, побеждает стабилизация:
/// дубликаты всё равно должны быть удалены. Без явного лимита съёмка
/// останавливается на [`MAX_FRAME_COUNT`], пока имена файлов сортируются по порядку.
pub fn check_stop(
    n: u32,
    max_count: u32,
    stop_on_duplicate_triplicate: bool,
    window: &DigestWindow,
    current: &Digest,
) -> Option<StopReason> {
    if stop_on_duplicate_triplicate && n >= 3 && window.completes_triplicate(current) {
        return Some(StopReason::DuplicateTriplicate);
    }
    let limit = if max_count == 0 {
        MAX_FRAME_COUNT
    } else {
        max_count.min(MAX_FRAME_COUNT)
    };
    if n >= limit {
        return Some(StopReason::MaxCount);
    }
    None
}

pub struct CaptureLoop<C, S, K> {
    capturer: C,
    store: S,
    sender: K,
    cancel: CancellationToken,
}

impl<C, S, K> CaptureLoop<C, S, K>
where
    C: FrameSource,
    S: ArtifactStore,
    K: SignalSender,
{
    pub fn new(capturer: C, store: S, sender: K, cancel: CancellationToken) -> Self {
        Self {
            capturer,
            store,
            sender,
            cancel,
        }
    }

    pub async fn run(&mut self, config: &RunConfig) -> RunResult {
        let delay = self.announce(config);
        let mut window = DigestWindow::new();
        let mut previous: Option<Artifact> = None;
        let mut n: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                info!("Съёмка прервана после {} кадров", n);
                return RunResult::stopped(n, StopReason::Cancelled);
            }

            n += 1;

            let image = match self.capturer.capture(&config.region) {
                Ok(image) => image,
                Err(e) => {
                    error!("Кадр {}: {}", n, e);
                    return RunResult::failed(n - 1, StopReason::CaptureError, e);
                }
            };

            let persisted = match self.store.persist(n, &image) {
                Ok(persisted) => persisted,
                Err(e) => {
                    error!("Кадр {}: {}", n, e);
                    return RunResult::failed(n - 1, StopReason::SaveError, e);
                }
            };

            let digest = Digest::of(&persisted.encoded);
            info!("Кадр {} сохранён: {:?}", n, persisted.artifact.path);
            debug!("Кадр {}: {:?}", n, digest);

            match check_stop(
                n,
                config.max_count,
                config.stop_on_duplicate_triplicate,
                &window,
                &digest,
            ) {
                Some(StopReason::DuplicateTriplicate) => {
                    let removed = self.remove_duplicates(&persisted.artifact, previous.as_ref());
                    let frames_saved = n - removed;
                    info!("Содержимое перестало меняться на кадре {}, сохранено {}", n, frames_saved);
                    return RunResult::stopped(frames_saved, StopReason::DuplicateTriplicate);
                }
                Some(reason) => {
                    info!("Остановка на кадре {}: {}", n, reason);
                    return RunResult::stopped(n, reason);
                }
                None => {}
            }

            window.shift(digest);
            previous = Some(persisted.artifact);

            if let Err(e) = self.sender.send(&config.signal) {
                warn!("Кадр {}: сигнал {} не отправлен: {}", n, config.signal, e);
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {
                    info!("Съёмка прервана после {} кадров", n);
                    return RunResult::stopped(n, StopReason::Cancelled);
                }
            }
        }
    }

    fn announce(&self, config: &RunConfig) -> Duration {
        let delay = config.effective_delay();
        info!(
            "Съёмка области {} в {:?}: сигнал {}, задержка {:?}, лимит {}",
            config.region,
            config.output_dir,
            config.signal,
            delay,
            if config.max_count == 0 {
                format!("нет (не более {})", MAX_FRAME_COUNT)
            } else {
                config.max_count.to_string()
            }
        );
        delay
    }

    /// Удалить кадры `n` и `n-1`. Возвращает число действительно удалённых файлов.
    fn remove_duplicates(&mut self, current: &Artifact, previous: Option<&Artifact>) -> u32 {
        let mut removed = 0;
        for artifact in std::iter::once(current).chain(previous) {
            match self.store.remove(artifact) {
                Ok(()) => {
                    debug!("Дубликат {:?} удалён", artifact.path);
                    removed += 1;
                }
                Err(e) => warn!("Дубликат {:?} остался на диске: {}", artifact.path, e),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, Severity};
    use crate::services::artifact_store::PersistedFrame;
    use image::{Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;
    use tokio::time::Instant;

    /// Кадры задаются значением пикселя; `fail_on` - номер вызова с ошибкой
    struct ScriptedCapturer {
        values: Vec<u8>,
        fail_on: Option<usize>,
        calls: usize,
    }

    impl ScriptedCapturer {
        fn new(values: &[u8]) -> Self {
            Self {
                values: values.to_vec(),
                fail_on: None,
                calls: 0,
            }
        }

        /// Все кадры разные
        fn distinct() -> Self {
            Self::new(&[])
        }

        fn failing_on(mut self, call: usize) -> Self {
            self.fail_on = Some(call);
            self
        }
    }

    impl FrameSource for ScriptedCapturer {
        fn capture(&mut self, region: &Region) -> Result<RgbaImage> {
            self.calls += 1;
            if self.fail_on == Some(self.calls) {
                return Err(ShotError::Capture("экран недоступен".into()));
            }
            let value = self
                .values
                .get(self.calls - 1)
                .copied()
                .unwrap_or(self.calls as u8);
            Ok(RgbaImage::from_pixel(region.width, region.height, Rgba([value, 0, 0, 255])))
        }
    }

    #[derive(Default)]
    struct StoreLog {
        on_disk: BTreeSet<u32>,
        persisted: u32,
    }

    /// Хранилище в памяти: "кодированные" байты - сырые пиксели
    struct MemoryStore {
        log: Rc<RefCell<StoreLog>>,
        fail_on: Option<u32>,
        fail_remove: bool,
    }

    impl MemoryStore {
        fn new(log: &Rc<RefCell<StoreLog>>) -> Self {
            Self {
                log: Rc::clone(log),
                fail_on: None,
                fail_remove: false,
            }
        }
    }

    impl ArtifactStore for MemoryStore {
        fn persist(&mut self, index: u32, image: &RgbaImage) -> Result<PersistedFrame> {
            if self.fail_on == Some(index) {
                return Err(ShotError::Save("диск заполнен".into()));
            }
            let mut log = self.log.borrow_mut();
            log.on_disk.insert(index);
            log.persisted += 1;
            Ok(PersistedFrame {
                artifact: Artifact {
                    index,
                    path: PathBuf::from(crate::services::artifact_store::artifact_file_name(index)),
                },
                encoded: image.as_raw().clone(),
            })
        }

        fn remove(&mut self, artifact: &Artifact) -> Result<()> {
            if self.fail_remove {
                return Err(ShotError::Io(std::io::Error::other("занято")));
            }
            self.log.borrow_mut().on_disk.remove(&artifact.index);
            Ok(())
        }
    }

    struct CountingSender {
        sent: Rc<RefCell<u32>>,
        fail: bool,
        cancel_after: Option<(u32, CancellationToken)>,
    }

    impl CountingSender {
        fn new(sent: &Rc<RefCell<u32>>) -> Self {
            Self {
                sent: Rc::clone(sent),
                fail: false,
                cancel_after: None,
            }
        }
    }

    impl SignalSender for CountingSender {
        fn send(&mut self, _chord: &KeyChord) -> Result<()> {
            *self.sent.borrow_mut() += 1;
            let sent = *self.sent.borrow();
            if let Some((limit, token)) = &self.cancel_after {
                if sent >= *limit {
                    token.cancel();
                }
            }
            if self.fail {
                return Err(ShotError::Signal("uinput недоступен".into()));
            }
            Ok(())
        }
    }

    fn run_config(max_count: u32, stop_on_duplicate_triplicate: bool) -> RunConfig {
        RunConfig {
            region: Region::new(0, 0, 4, 4),
            output_dir: PathBuf::from("out"),
            signal: KeyChord::default(),
            max_count,
            stop_on_duplicate_triplicate,
            delay_after_signal: Duration::ZERO,
        }
    }

    struct Harness {
        store_log: Rc<RefCell<StoreLog>>,
        sent: Rc<RefCell<u32>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store_log: Rc::new(RefCell::new(StoreLog::default())),
                sent: Rc::new(RefCell::new(0)),
            }
        }

        fn on_disk(&self) -> Vec<u32> {
            self.store_log.borrow().on_disk.iter().copied().collect()
        }

        fn sent(&self) -> u32 {
            *self.sent.borrow()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_triplicate_removes_last_two() {
        let h = Harness::new();
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::new(&[1, 2, 3, 3, 3]),
            MemoryStore::new(&h.store_log),
            CountingSender::new(&h.sent),
            CancellationToken::new(),
        );

        let result = capture_loop.run(&run_config(5, true)).await;

        assert_eq!(result.stop_reason, StopReason::DuplicateTriplicate);
        assert_eq!(result.frames_saved, 3);
        assert_eq!(h.on_disk(), vec![1, 2, 3]);
        // Сигнал после кадра 5 не отправляется
        assert_eq!(h.sent(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_frames_stop_at_max_count() {
        let h = Harness::new();
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::distinct(),
            MemoryStore::new(&h.store_log),
            CountingSender::new(&h.sent),
            CancellationToken::new(),
        );

        let result = capture_loop.run(&run_config(5, true)).await;

        assert_eq!(result.stop_reason, StopReason::MaxCount);
        assert_eq!(result.frames_saved, 5);
        assert_eq!(h.on_disk(), vec![1, 2, 3, 4, 5]);
        assert_eq!(h.sent(), 4);
        assert!(result.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_ignored_when_disabled() {
        let h = Harness::new();
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::new(&[9, 9, 9, 9]),
            MemoryStore::new(&h.store_log),
            CountingSender::new(&h.sent),
            CancellationToken::new(),
        );

        let result = capture_loop.run(&run_config(4, false)).await;

        assert_eq!(result.stop_reason, StopReason::MaxCount);
        assert_eq!(result.frames_saved, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_is_fatal() {
        let h = Harness::new();
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::distinct().failing_on(7),
            MemoryStore::new(&h.store_log),
            CountingSender::new(&h.sent),
            CancellationToken::new(),
        );

        let result = capture_loop.run(&run_config(0, false)).await;

        assert_eq!(result.stop_reason, StopReason::CaptureError);
        assert_eq!(result.frames_saved, 6);
        assert_eq!(h.on_disk().len(), 6);
        assert!(matches!(result.error, Some(ShotError::Capture(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_failure_is_fatal() {
        let h = Harness::new();
        let mut store = MemoryStore::new(&h.store_log);
        store.fail_on = Some(2);
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::distinct(),
            store,
            CountingSender::new(&h.sent),
            CancellationToken::new(),
        );

        let result = capture_loop.run(&run_config(10, true)).await;

        assert_eq!(result.stop_reason, StopReason::SaveError);
        assert_eq!(result.frames_saved, 1);
        assert_eq!(h.sent(), 1);
        assert_eq!(result.error.map(|e| e.severity()), Some(Severity::IntegrityCritical));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_failure_does_not_stop_loop() {
        let h = Harness::new();
        let mut sender = CountingSender::new(&h.sent);
        sender.fail = true;
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::distinct(),
            MemoryStore::new(&h.store_log),
            sender,
            CancellationToken::new(),
        );

        let result = capture_loop.run(&run_config(3, true)).await;

        assert_eq!(result.stop_reason, StopReason::MaxCount);
        assert_eq!(result.frames_saved, 3);
        assert_eq!(h.sent(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cleanup_counts_as_present() {
        let h = Harness::new();
        let mut store = MemoryStore::new(&h.store_log);
        store.fail_remove = true;
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::new(&[5, 5, 5]),
            store,
            CountingSender::new(&h.sent),
            CancellationToken::new(),
        );

        let result = capture_loop.run(&run_config(0, true)).await;

        assert_eq!(result.stop_reason, StopReason::DuplicateTriplicate);
        assert_eq!(result.frames_saved, 3);
        assert_eq!(h.on_disk().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let h = Harness::new();
        let token = CancellationToken::new();
        token.cancel();
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::distinct(),
            MemoryStore::new(&h.store_log),
            CountingSender::new(&h.sent),
            token,
        );

        let result = capture_loop.run(&run_config(0, true)).await;

        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.frames_saved, 0);
        assert_eq!(h.store_log.borrow().persisted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_delay_keeps_frames() {
        let h = Harness::new();
        let token = CancellationToken::new();
        let mut sender = CountingSender::new(&h.sent);
        sender.cancel_after = Some((2, token.clone()));
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::new(&[1, 1, 2, 2]),
            MemoryStore::new(&h.store_log),
            sender,
            token,
        );

        let result = capture_loop.run(&run_config(0, true)).await;

        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.frames_saved, 2);
        assert_eq!(h.on_disk(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_frames() {
        let h = Harness::new();
        let mut capture_loop = CaptureLoop::new(
            ScriptedCapturer::distinct(),
            MemoryStore::new(&h.store_log),
            CountingSender::new(&h.sent),
            CancellationToken::new(),
        );

        let mut config = run_config(3, true);
        let started = Instant::now();
        capture_loop.run(&config).await;
        assert_eq!(started.elapsed(), DEFAULT_SIGNAL_DELAY * 2);

        config.delay_after_signal = Duration::from_millis(40);
        config.max_count = 2;
        let started = Instant::now();
        capture_loop.run(&config).await;
        assert_eq!(started.elapsed(), Duration::from_millis(40));
    }

    #[test]
    fn test_duplicate_wins_over_max_count() {
        let h = Digest::of(b"same");
        let mut window = DigestWindow::new();
        window.shift(h);
        window.shift(h);

        assert_eq!(check_stop(3, 3, true, &window, &h), Some(StopReason::DuplicateTriplicate));
        assert_eq!(check_stop(3, 3, false, &window, &h), Some(StopReason::MaxCount));
        assert_eq!(check_stop(3, 0, false, &window, &h), None);
        assert_eq!(check_stop(2, 0, true, &DigestWindow::new(), &h), None);
    }

    #[test]
    fn test_unbounded_run_stops_before_names_overflow() {
        let h = Digest::of(b"frame");
        let window = DigestWindow::new();

        assert_eq!(check_stop(MAX_FRAME_COUNT - 1, 0, true, &window, &h), None);
        assert_eq!(check_stop(MAX_FRAME_COUNT, 0, true, &window, &h), Some(StopReason::MaxCount));
        assert_eq!(check_stop(MAX_FRAME_COUNT, u32::MAX, false, &window, &h), Some(StopReason::MaxCount));
    }
}
