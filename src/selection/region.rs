use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Прямоугольник в глобальных координатах виртуального рабочего стола.
///
/// `x`/`y` могут быть отрицательными (монитор левее или выше основного).
/// Область пригодна для съёмки только при ненулевых ширине и высоте.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Пересечение двух прямоугольников, если оно непустое
    pub fn intersection(&self, other: &Region) -> Option<Region> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left as i64 || bottom <= top as i64 {
            return None;
        }

        Some(Region::new(
            left,
            top,
            (right - left as i64) as u32,
            (bottom - top as i64) as u32,
        ))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Разбор формата `X,Y,WxH`, например `-1920,0,800x600`
impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(',').map(str::trim).collect();
        let [x, y, size] = parts.as_slice() else {
            return Err(format!("ожидается X,Y,WxH, получено '{}'", s));
        };
        let (width, height) = size
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("ожидается размер WxH, получено '{}'", size))?;

        let region = Region::new(
            x.parse().map_err(|e| format!("X '{}': {}", x, e))?,
            y.parse().map_err(|e| format!("Y '{}': {}", y, e))?,
            width.trim().parse().map_err(|e| format!("ширина '{}': {}", width, e))?,
            height.trim().parse().map_err(|e| format!("высота '{}': {}", height, e))?,
        );

        if !region.is_valid() {
            return Err(format!("область {} имеет нулевой размер", region));
        }
        Ok(region)
    }
}

/// Охватывающий прямоугольник всех мониторов.
///
/// Задаёт систему координат выбора: локальная точка `(lx, ly)` соответствует
/// глобальной `(x + lx, y + ly)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualDesktopBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl VirtualDesktopBounds {
    /// `None`, если мониторов нет
    pub fn from_monitors(monitors: &[Region]) -> Option<Self> {
        let first = monitors.first()?;

        let mut left = first.x as i64;
        let mut top = first.y as i64;
        let mut right = first.right();
        let mut bottom = first.bottom();

        for monitor in &monitors[1..] {
            left = left.min(monitor.x as i64);
            top = top.min(monitor.y as i64);
            right = right.max(monitor.right());
            bottom = bottom.max(monitor.bottom());
        }

        if right <= left || bottom <= top {
            return None;
        }

        Some(Self {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    pub fn to_local(&self, global_x: i32, global_y: i32) -> (i32, i32) {
        (global_x - self.x, global_y - self.y)
    }

    pub fn to_global(&self, local_x: i32, local_y: i32) -> (i32, i32) {
        (local_x + self.x, local_y + self.y)
    }
}

impl fmt::Display for VirtualDesktopBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}x{}", self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_of_single_monitor() {
        let bounds = VirtualDesktopBounds::from_monitors(&[Region::new(0, 0, 1920, 1080)]).unwrap();
        assert_eq!((bounds.x, bounds.y, bounds.width, bounds.height), (0, 0, 1920, 1080));
    }

    #[test]
    fn test_bounds_span_monitors_left_and_above() {
        let monitors = [
            Region::new(0, 0, 1920, 1080),
            Region::new(-1280, -200, 1280, 1024),
            Region::new(1920, 0, 2560, 1440),
        ];
        let bounds = VirtualDesktopBounds::from_monitors(&monitors).unwrap();

        assert_eq!(bounds.x, -1280);
        assert_eq!(bounds.y, -200);
        assert_eq!(bounds.width, 1280 + 1920 + 2560);
        assert_eq!(bounds.height, 1440 + 200);
        assert_eq!(bounds.to_global(0, 0), (-1280, -200));
        assert_eq!(bounds.to_local(0, 0), (1280, 200));
    }

    #[test]
    fn test_bounds_require_monitors() {
        assert!(VirtualDesktopBounds::from_monitors(&[]).is_none());
    }

    #[test]
    fn test_intersection() {
        let monitor = Region::new(0, 0, 1920, 1080);

        assert_eq!(
            Region::new(1800, 1000, 300, 300).intersection(&monitor),
            Some(Region::new(1800, 1000, 120, 80))
        );
        assert_eq!(Region::new(-100, 0, 100, 50).intersection(&monitor), None);
    }

    #[test]
    fn test_parse_region() {
        assert_eq!("100,100,300x200".parse::<Region>().unwrap(), Region::new(100, 100, 300, 200));
        assert_eq!(" -1920, 5, 640X480 ".parse::<Region>().unwrap(), Region::new(-1920, 5, 640, 480));
        assert!("100,100".parse::<Region>().is_err());
        assert!("100,100,300".parse::<Region>().is_err());
        assert!("100,100,0x200".parse::<Region>().is_err());
        assert!("a,100,10x10".parse::<Region>().is_err());
    }
}
