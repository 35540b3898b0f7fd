use crate::error::{Result, ShotError};
use crate::events::WindowInfo;
use std::process::Command;

pub struct WmctrlTool;

impl WmctrlTool {
    pub fn new() -> Self {
        Self
    }

    pub fn test(&self) -> Result<()> {
        let output = Command::new("wmctrl").arg("-m").output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(crate::shot_error!(service_unavailable, "wmctrl -m завершился с ошибкой"))
        }
    }

    pub fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let output = Command::new("wmctrl")
            .arg("-l")
            .output()
            .map_err(|e| crate::shot_error!(service_unavailable, "wmctrl не найден: {}", e))?;

        if !output.status.success() {
            return Err(ShotError::Internal("wmctrl вернул ошибку".to_string()));
        }

        Ok(parse_window_list(&String::from_utf8_lossy(&output.stdout)))
    }

    pub fn activate(&self, window: &WindowInfo) -> Result<()> {
        let status = Command::new("wmctrl")
            .args(["-i", "-a", window.id.as_str()])
            .status()
            .map_err(|e| crate::shot_error!(service_unavailable, "wmctrl не найден: {}", e))?;

        if status.success() {
            Ok(())
        } else {
            Err(ShotError::Internal(format!("wmctrl не смог активировать окно {}", window)))
        }
    }
}

/// Строки `wmctrl -l`: `<id> <desktop> <host> <заголовок>`; заголовок сохраняется как есть
fn parse_window_list(stdout: &str) -> Vec<WindowInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let (id, rest) = split_field(line)?;
            let (_desktop, rest) = split_field(rest)?;
            let (_host, title) = split_field(rest)?;
            (!title.is_empty()).then(|| WindowInfo::new(id, title))
        })
        .collect()
}

fn split_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(end) => Some((&s[..end], s[end..].trim_start())),
        None => Some((s, "")),
    }
}
