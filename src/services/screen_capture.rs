use crate::error::{Result, ShotError};
use crate::selection::Region;
use image::{imageops, RgbaImage};
use tracing::{debug, info, warn};
use xcap::Monitor;

/// Источник пикселей для цикла съёмки
pub trait FrameSource {
    fn capture(&mut self, region: &Region) -> Result<RgbaImage>;
}

/// Съёмка экрана через xcap.
///
/// Мониторы перечисляются один раз при создании. Область может лежать на
/// нескольких мониторах: каждый снимается целиком, нужная часть вырезается и
/// переносится на общий холст.
pub struct XcapCapturer {
    monitors: Vec<(Monitor, Region)>,
}

impl XcapCapturer {
    pub fn new() -> Result<Self> {
        let all = Monitor::all()
            .map_err(|e| crate::shot_error!(capture, "не удалось перечислить мониторы: {}", e))?;

        let mut monitors = Vec::with_capacity(all.len());
        for monitor in all {
            match monitor_rect(&monitor) {
                Ok(rect) if rect.is_valid() => {
                    debug!("Монитор {}", rect);
                    monitors.push((monitor, rect));
                }
                Ok(rect) => warn!("Монитор с пустой геометрией {} пропущен", rect),
                Err(e) => warn!("Не удалось получить геометрию монитора: {}", e),
            }
        }

        info!("Найдено мониторов: {}", monitors.len());
        Ok(Self { monitors })
    }

    /// Прямоугольники мониторов в глобальных координатах
    pub fn monitors(&self) -> Vec<Region> {
        self.monitors.iter().map(|(_, rect)| *rect).collect()
    }
}

impl FrameSource for XcapCapturer {
    fn capture(&mut self, region: &Region) -> Result<RgbaImage> {
        let mut parts = Vec::new();
        for (monitor, rect) in &self.monitors {
            if rect.intersection(region).is_none() {
                continue;
            }
            let image = monitor
                .capture_image()
                .map_err(|e| crate::shot_error!(capture, "снимок монитора {} не удался: {}", rect, e))?;
            parts.push((*rect, image));
        }

        stitch(region, &parts)
    }
}

fn monitor_rect(monitor: &Monitor) -> std::result::Result<Region, xcap::XCapError> {
    Ok(Region::new(
        monitor.x()?,
        monitor.y()?,
        monitor.width()?,
        monitor.height()?,
    ))
}

/// Собрать область из снимков мониторов. Части области вне мониторов остаются прозрачными.
pub fn stitch(region: &Region, parts: &[(Region, RgbaImage)]) -> Result<RgbaImage> {
    if !region.is_valid() {
        return Err(crate::shot_error!(capture, "пустая область {}", region));
    }

    let mut canvas = RgbaImage::new(region.width, region.height);
    let mut covered = false;

    for (rect, image) in parts {
        let Some(overlap) = rect.intersection(region) else {
            continue;
        };

        // Координаты пересечения внутри снимка монитора
        let src_x = (overlap.x - rect.x) as u32;
        let src_y = (overlap.y - rect.y) as u32;
        if src_x >= image.width() || src_y >= image.height() {
            continue;
        }
        let width = overlap.width.min(image.width() - src_x);
        let height = overlap.height.min(image.height() - src_y);

        let piece = imageops::crop_imm(image, src_x, src_y, width, height).to_image();
        let dst_x = i64::from(overlap.x) - i64::from(region.x);
        let dst_y = i64::from(overlap.y) - i64::from(region.y);
        imageops::replace(&mut canvas, &piece, dst_x, dst_y);
        covered = true;
    }

    if !covered {
        return Err(ShotError::Capture(format!("область {} не попадает ни на один монитор", region)));
    }

    Ok(canvas)
}
