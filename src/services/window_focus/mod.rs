//! WindowFocus service: responsibility and boundaries
//!
//! Lists visible top-level windows and brings one of them to the front by its exact
//! title before a capture run starts. Backed by command-line tools (wmctrl first,
//! xdotool as a fallback). Nothing here knows about capturing or key signals.

mod wmctrl;
mod xdotool;

pub use self::xdotool::XdotoolTool;

use crate::error::Result;
use crate::events::WindowInfo;
use tracing::{debug, info, warn};
use wmctrl::WmctrlTool;

#[derive(Debug, Clone, Copy)]
enum WorkingMethod {
    Wmctrl,
    Xdotool,
}

pub struct WindowFocus {
    wmctrl: WmctrlTool,
    xdotool: XdotoolTool,
}

impl Default for WindowFocus {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowFocus {
    pub fn new() -> Self {
        Self {
            wmctrl: WmctrlTool::new(),
            xdotool: XdotoolTool::new(),
        }
    }

    fn detect_working_method(&self) -> Result<WorkingMethod> {
        if self.wmctrl.test().is_ok() {
            debug!("Используем wmctrl");
            return Ok(WorkingMethod::Wmctrl);
        }
        if self.xdotool.test().is_ok() {
            debug!("Используем xdotool");
            return Ok(WorkingMethod::Xdotool);
        }
        Err(crate::shot_error!(service_unavailable, "ни wmctrl, ни xdotool не доступны"))
    }

    pub fn list_visible_windows(&self) -> Result<Vec<WindowInfo>> {
        match self.detect_working_method()? {
            WorkingMethod::Wmctrl => self.wmctrl.list_windows(),
            WorkingMethod::Xdotool => self.xdotool.list_windows(),
        }
    }

    /// Вывести на передний план первое окно с точно таким заголовком.
    /// `Ok(false)`, если такого окна нет.
    pub fn activate_by_title(&self, title: &str) -> Result<bool> {
        let method = self.detect_working_method()?;
        let windows = match method {
            WorkingMethod::Wmctrl => self.wmctrl.list_windows()?,
            WorkingMethod::Xdotool => self.xdotool.list_windows()?,
        };

        let Some(window) = find_by_title(&windows, title) else {
            warn!("Окно с заголовком \"{}\" не найдено среди {} окон", title, windows.len());
            return Ok(false);
        };

        match method {
            WorkingMethod::Wmctrl => self.wmctrl.activate(window)?,
            WorkingMethod::Xdotool => self.xdotool.activate(window)?,
        }

        info!("Окно {} выведено на передний план", window);
        Ok(true)
    }
}

fn find_by_title<'a>(windows: &'a [WindowInfo], title: &str) -> Option<&'a WindowInfo> {
    windows.iter().find(|w| w.has_title(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_title_takes_first_exact_match() {
        let windows = vec![
            WindowInfo::new("1", "Viewer"),
            WindowInfo::new("2", "Viewer - book.pdf"),
            WindowInfo::new("3", "Viewer - book.pdf"),
        ];

        assert_eq!(find_by_title(&windows, "Viewer - book.pdf").map(|w| w.id.as_str()), Some("2"));
        assert!(find_by_title(&windows, "viewer").is_none());
    }
}
