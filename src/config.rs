use crate::events::KeyChord;
use crate::selection::Region;
use crate::services::artifact_store::MAX_FRAME_COUNT;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub capture: CaptureConfig,
    pub signal: SignalConfig,
    pub focus: FocusConfig,
    pub output: OutputConfig,
    pub selection: SelectionConfig,
    // Разобранная клавиша - строится после загрузки, не сериализуется
    #[serde(skip)]
    key_chord: KeyChord,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    pub output_dir: PathBuf,
    /// 0 - без ограничения
    pub max_count: u32,
    pub stop_on_duplicate_triplicate: bool,
    /// 0 - значение по умолчанию (500 мс)
    pub delay_after_signal_ms: u64,
    pub jpeg_quality: u8,
    pub clear_output_dir: bool,
    /// Если задана, интерактивный выбор области пропускается
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalConfig {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FocusConfig {
    pub window_title: String,
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub pdf: bool,
    pub pdf_title: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    pub pointer_device: String,
    pub keyboard_device: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            capture: CaptureConfig {
                output_dir: PathBuf::from("screenshots"),
                max_count: 500,
                stop_on_duplicate_triplicate: true,
                delay_after_signal_ms: 500,
                jpeg_quality: 85,
                clear_output_dir: false,
                region: None,
            },
            signal: SignalConfig {
                key: "Enter".to_string(),
            },
            focus: FocusConfig {
                window_title: String::new(),
                settle_ms: 300,
            },
            output: OutputConfig {
                pdf: true,
                pdf_title: String::new(),
            },
            selection: SelectionConfig {
                pointer_device: "auto".to_string(),
                keyboard_device: "auto".to_string(),
            },
            key_chord: KeyChord::default(),
        }
    }
}

impl Config {
    /// Значения по умолчанию, затем файл (если есть), затем переменные `AUTOSHOT_*`.
    /// Вложенные ключи окружения разделяются `__`: `AUTOSHOT_CAPTURE__MAX_COUNT=10`.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("AUTOSHOT_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.finalize()?;
        Ok(config)
    }

    /// Проверить значения и разобрать клавишу сигнала.
    /// Вызывается после загрузки и повторно после переопределений из командной строки.
    pub fn finalize(&mut self) -> Result<()> {
        self.validate()?;
        self.key_chord = KeyChord::parse(&self.signal.key)
            .map_err(|e| anyhow::anyhow!("Неверная клавиша сигнала '{}': {}", self.signal.key, e))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        if !(1..=100).contains(&self.capture.jpeg_quality) {
            anyhow::bail!("jpeg_quality должно быть в диапазоне 1..=100, получено {}", self.capture.jpeg_quality);
        }

        if self.capture.max_count > MAX_FRAME_COUNT {
            anyhow::bail!("max_count не может превышать {}", MAX_FRAME_COUNT);
        }

        if let Some(region) = &self.capture.region {
            if !region.is_valid() {
                anyhow::bail!("Область {} должна иметь положительные размеры", region);
            }
        }

        if self.capture.output_dir.as_os_str().is_empty() {
            anyhow::bail!("output_dir не может быть пустым");
        }

        if self.signal.key.trim().is_empty() {
            anyhow::bail!("Клавиша сигнала не задана");
        }

        Ok(())
    }

    pub fn key_chord(&self) -> &KeyChord {
        &self.key_chord
    }
}
