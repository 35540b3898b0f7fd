use crate::error::{Result, ShotError};
use crate::events::WindowInfo;
use std::process::Command;
use tracing::debug;

pub struct XdotoolTool;

impl XdotoolTool {
    pub fn new() -> Self {
        Self
    }

    pub fn test(&self) -> Result<()> {
        let output = Command::new("xdotool").arg("version").output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::shot_error!(service_unavailable, "xdotool version завершился с ошибкой"))
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("xdotool").args(args).output().map_err(|e| {
            debug!("xdotool не найден или не работает: {}", e);
            crate::shot_error!(service_unavailable, "xdotool не найден: {}", e)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ShotError::Internal(format!("xdotool {:?} вернул ошибку: {}", args, stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Видимые окна с непустым заголовком
    pub fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let ids = search_output(self.run(&["search", "--onlyvisible", "--name", "."]))?;

        let mut windows = Vec::new();
        for id in ids.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match self.run(&["getwindowname", id]) {
                Ok(title) => {
                    let title = title.trim_end_matches('\n');
                    if !title.is_empty() {
                        windows.push(WindowInfo::new(id, title));
                    }
                }
                Err(e) => debug!("Не удалось получить заголовок окна {}: {}", id, e),
            }
        }

        debug!("xdotool нашёл {} окон", windows.len());
        Ok(windows)
    }

    pub fn activate(&self, window: &WindowInfo) -> Result<()> {
        self.run(&["windowactivate", "--sync", window.id.as_str()]).map(|_| ())
    }

    /// Глобальные координаты указателя мыши
    pub fn pointer_location(&self) -> Result<(i32, i32)> {
        let output = self.run(&["getmouselocation", "--shell"])?;
        parse_mouse_location(&output)
            .ok_or_else(|| ShotError::Internal(format!("Неожиданный ответ getmouselocation: {}", output.trim())))
    }
}

/// `search` без совпадений завершается с кодом 1: это пустой список.
/// Отсутствие самого xdotool остаётся ошибкой.
fn search_output(result: Result<String>) -> Result<String> {
    match result {
        Err(ShotError::Internal(e)) => {
            debug!("xdotool search ничего не нашёл: {}", e);
            Ok(String::new())
        }
        other => other,
    }
}

/// Разбор вывода `xdotool getmouselocation --shell`:
/// ```text
/// X=812
/// Y=-40
/// SCREEN=0
/// WINDOW=65011718
/// ```
fn parse_mouse_location(output: &str) -> Option<(i32, i32)> {
    let mut x = None;
    let mut y = None;

    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("X", value)) => x = value.parse().ok(),
            Some(("Y", value)) => y = value.parse().ok(),
            _ => {}
        }
    }

    Some((x?, y?))
}
