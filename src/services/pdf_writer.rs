//! Assembly of the persisted frames into a single PDF.
//!
//! Every page embeds one JPEG file as is (`/DCTDecode`), so no pixel data is
//! decoded or re-encoded; only the header is read to learn the image size and
//! colour space. The page size follows the capture region converted at 96 DPI,
//! and each image is stretched over the whole page.

use crate::error::Result;
use crate::selection::Region;
use chrono::Local;
use image::{ColorType, ImageDecoder, ImageReader};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const POINTS_PER_INCH: f64 = 72.0;
const PIXELS_PER_INCH: f64 = 96.0;
const A4_POINTS: (f64, f64) = (595.28, 841.89);
const DEFAULT_PDF_NAME: &str = "screenshots.pdf";

/// Размер страницы в пунктах
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// Размер области при 96 DPI; A4, если область не задана или пустая
    pub fn for_region(region: Option<&Region>) -> Self {
        match region {
            Some(region) if region.is_valid() => Self {
                width: pixels_to_points(region.width),
                height: pixels_to_points(region.height),
            },
            _ => Self {
                width: A4_POINTS.0,
                height: A4_POINTS.1,
            },
        }
    }
}

fn pixels_to_points(pixels: u32) -> f64 {
    f64::from(pixels) * POINTS_PER_INCH / PIXELS_PER_INCH
}

/// Убрать из заголовка символы, недопустимые в имени файла, и добавить `.pdf`
pub fn sanitize_pdf_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        DEFAULT_PDF_NAME.to_string()
    } else if cleaned.to_lowercase().ends_with(".pdf") {
        cleaned.to_string()
    } else {
        format!("{}.pdf", cleaned)
    }
}

/// Заголовок по умолчанию: `screenshot-YYYY-MM-DD_HH-MM-SS`
pub fn default_pdf_title() -> String {
    format!("screenshot-{}", Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// JPEG-файлы каталога в лексическом порядке; пустые файлы пропускаются
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
        if !is_jpeg {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        if metadata.len() == 0 {
            warn!("Пустой файл {:?} пропущен", path);
            continue;
        }
        images.push(path);
    }

    images.sort();
    Ok(images)
}

/// Собрать PDF из кадров каталога. `Ok(None)`, если собирать нечего.
pub fn assemble_pdf(dir: &Path, title: &str, region: Option<&Region>) -> Result<Option<PathBuf>> {
    let images = collect_images(dir)?;
    if images.is_empty() {
        info!("В {:?} нет изображений, PDF не создаётся", dir);
        return Ok(None);
    }

    let out_path = dir.join(sanitize_pdf_file_name(title));
    let pages = write_pdf(&images, &out_path, title, PageSize::for_region(region))?;
    info!("PDF {:?}: {} страниц", out_path, pages);
    Ok(Some(out_path))
}

struct JpegInfo {
    width: u32,
    height: u32,
    color_space: &'static str,
    data: Vec<u8>,
}

fn read_jpeg(path: &Path) -> Result<JpegInfo> {
    let decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(|e| crate::shot_error!(internal, "не удалось прочитать {:?}: {}", path, e))?;

    let (width, height) = decoder.dimensions();
    let color_space = match decoder.color_type() {
        ColorType::L8 | ColorType::L16 => "DeviceGray",
        _ => "DeviceRGB",
    };

    Ok(JpegInfo {
        width,
        height,
        color_space,
        data: fs::read(path)?,
    })
}

/// Записать PDF со страницей на каждое изображение. Возвращает число страниц.
pub fn write_pdf(images: &[PathBuf], out_path: &Path, title: &str, page: PageSize) -> Result<usize> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let media_box = vec![Object::Integer(0), Object::Integer(0), Object::Real(page.width as f32), Object::Real(page.height as f32)];

    let mut kids: Vec<Object> = Vec::with_capacity(images.len());
    for path in images {
        let jpeg = match read_jpeg(path) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("{:?} пропущен: {}", path, e);
                continue;
            }
        };
        debug!("Страница {}: {:?} {}x{}", kids.len() + 1, path, jpeg.width, jpeg.height);

        let page_id = add_image_page(&mut doc, pages_id, &media_box, jpeg, page);
        kids.push(page_id.into());
    }

    if kids.is_empty() {
        return Err(crate::shot_error!(internal, "ни одно изображение не удалось добавить в PDF"));
    }

    let count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Producer" => text_string(concat!("autoshot ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(Local::now().format("D:%Y%m%d%H%M%S").to_string()),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| crate::shot_error!(internal, "не удалось сериализовать PDF: {}", e))?;
    fs::write(out_path, bytes)
        .map_err(|e| crate::shot_error!(internal, "не удалось записать {:?}: {}", out_path, e))?;

    Ok(count)
}

/// JPEG встраивается без перекодирования (`/DCTDecode`) и растягивается на всю страницу
fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    media_box: &[Object],
    jpeg: JpegInfo,
    page: PageSize,
) -> ObjectId {
    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(jpeg.width),
            "Height" => i64::from(jpeg.height),
            "ColorSpace" => jpeg.color_space,
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        jpeg.data,
    )
    .with_compression(false);
    let image_id = doc.add_object(image);

    let content = format!("q {:.2} 0 0 {:.2} 0 0 cm /Im0 Do Q", page.width, page.height);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box.to_vec(),
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    })
}

/// Строка PDF в UTF-16BE с BOM
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
