use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod config;
mod error;
mod events;
pub mod mappings;
mod selection;
mod services;
mod utils;

use config::Config;
use selection::{select_region, EvdevSelectionSource, Region};
use services::{
    pdf_writer, CaptureLoop, JpegArtifactStore, RunConfig, RunResult, StopReason, VirtualDevice,
    WindowFocus, XcapCapturer,
};

#[derive(Parser, Debug)]
#[command(name = "autoshot")]
#[command(about = "Снимает область экрана, нажимает клавишу и повторяет, пока содержимое меняется")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "autoshot.toml")]
    config: String,

    /// Режим сухого запуска (клавиши только логируются)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Область съёмки `X,Y,WxH`; без неё область выбирается мышью
    #[arg(long)]
    region: Option<Region>,

    /// Каталог для кадров и PDF
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Максимум кадров (0 - без ограничения)
    #[arg(long)]
    max_count: Option<u32>,

    /// Клавиша между кадрами, например `Ctrl+Shift+Right`
    #[arg(long)]
    key: Option<String>,

    /// Пауза после клавиши, мс
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Заголовок окна, которое вывести на передний план перед съёмкой
    #[arg(long)]
    focus: Option<String>,

    /// Не собирать PDF
    #[arg(long)]
    no_pdf: bool,

    /// Показать заголовки видимых окон и выйти
    #[arg(long)]
    list_windows: bool,
}

impl Args {
    fn apply_to(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(region) = self.region {
            config.capture.region = Some(region);
        }
        if let Some(dir) = &self.output_dir {
            config.capture.output_dir = dir.clone();
        }
        if let Some(max_count) = self.max_count {
            config.capture.max_count = max_count;
        }
        if let Some(key) = &self.key {
            config.signal.key = key.clone();
        }
        if let Some(delay_ms) = self.delay_ms {
            config.capture.delay_after_signal_ms = delay_ms;
        }
        if let Some(title) = &self.focus {
            config.focus.window_title = title.clone();
        }
        if self.no_pdf {
            config.output.pdf = false;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_windows {
        init_tracing(args.log_level.as_deref().unwrap_or("warn"))?;
        for window in WindowFocus::new().list_visible_windows()? {
            println!("{}", window.title);
        }
        return Ok(());
    }

    // Загрузка конфигурации и переопределения из командной строки
    let mut config = Config::load(&args.config)?;
    args.apply_to(&mut config);
    config.finalize()?;

    init_tracing(&config.logging.level)?;

    info!("Запуск autoshot v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - клавиши не отправляются");
    }

    let capturer = XcapCapturer::new()?;

    let region = match config.capture.region {
        Some(region) => region,
        None => {
            utils::permissions::check_input_devices_access()?;
            let selected = select_region(&capturer.monitors(), |bounds| {
                EvdevSelectionSource::open(&config.selection, bounds)
            });
            match selected {
                Some(region) => region,
                None => {
                    println!("Область не выбрана, съёмка отменена");
                    return Ok(());
                }
            }
        }
    };

    let output_dir = config.capture.output_dir.clone();
    let store = JpegArtifactStore::new(&output_dir, config.capture.jpeg_quality)?;
    if config.capture.clear_output_dir {
        store.clear_existing()?;
    }

    focus_window(&config).await;

    if !args.dry_run {
        utils::permissions::check_uinput_access()?;
    }
    let device = VirtualDevice::new("autoshot virtual keyboard", args.dry_run)?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Получен сигнал завершения (Ctrl+C)");
                ctrl_c_token.cancel();
            }
            Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
        }
    });

    let run_config = RunConfig {
        region,
        output_dir: output_dir.clone(),
        signal: config.key_chord().clone(),
        max_count: config.capture.max_count,
        stop_on_duplicate_triplicate: config.capture.stop_on_duplicate_triplicate,
        delay_after_signal: Duration::from_millis(config.capture.delay_after_signal_ms),
    };

    let mut capture_loop = CaptureLoop::new(capturer, store, device, cancel);
    let result = capture_loop.run(&run_config).await;

    let pdf_path = if config.output.pdf && result.frames_saved > 0 {
        let title = if config.output.pdf_title.trim().is_empty() {
            pdf_writer::default_pdf_title()
        } else {
            config.output.pdf_title.clone()
        };
        match pdf_writer::assemble_pdf(&output_dir, &title, Some(&region)) {
            Ok(path) => path,
            Err(e) => {
                error!("Не удалось собрать PDF: {}", e);
                None
            }
        }
    } else {
        None
    };

    print_summary(&result, &output_dir, pdf_path.as_deref());

    match result.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn focus_window(config: &Config) {
    let title = config.focus.window_title.trim();
    if title.is_empty() {
        return;
    }

    match WindowFocus::new().activate_by_title(title) {
        Ok(true) => tokio::time::sleep(Duration::from_millis(config.focus.settle_ms)).await,
        Ok(false) => warn!("Окно \"{}\" не найдено, съёмка без смены фокуса", title),
        Err(e) => warn!("Не удалось активировать окно \"{}\": {}", title, e),
    }
}

fn print_summary(result: &RunResult, output_dir: &std::path::Path, pdf_path: Option<&std::path::Path>) {
    let duplicates = if result.stop_reason == StopReason::DuplicateTriplicate {
        " (два повторных кадра удалены)"
    } else {
        ""
    };
    println!(
        "Готово: сохранено кадров {} в {}{}; причина остановки: {}",
        result.frames_saved,
        output_dir.display(),
        duplicates,
        result.stop_reason
    );
    if let Some(path) = pdf_path {
        println!("PDF: {}", path.display());
    }
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
