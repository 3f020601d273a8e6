//! 将版式写成 A4 PDF (标准 Helvetica 字体, WinAnsi 编码)

use super::layout::{Block, DocumentLayout, ItemRow, TextStyle, ITEM_HEADER, TOTAL_LABEL};
use crate::error::{AppError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use std::path::Path;

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN_LEFT: f32 = 42.52; // 1.5 cm
const MARGIN_TOP: f32 = 34.02; // 1.2 cm
const MARGIN_BOTTOM: f32 = 56.69; // 2 cm
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_LEFT;

const KEY_COL: f32 = 113.39; // 4 cm
const VALUE_COL: f32 = 311.81; // 11 cm
const ITEM_COLS: [f32; 6] = [30.0, 30.0, 80.0, 210.0, 85.0, 75.24];

const LOGO_WIDTH: f32 = 212.6; // 7.5 cm
const LOGO_HEIGHT: f32 = 65.2; // 2.3 cm

const CELL_PAD: f32 = 4.0;
const HEADER_BLUE: (f32, f32, f32) = (0.0, 0.298, 0.6); // #004C99
const GRID_GREY: f32 = 0.5;

/// 页眉图片: 解码为 8 位 RGB, 透明部分按白底合成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl HeaderImage {
    /// 从图片字节解码 (PNG / JPEG)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| AppError::Document(format!("header image: {e}")))?;
        let rgba = decoded.to_rgba8();

        let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
        for px in rgba.pixels() {
            let [r, g, b, a] = px.0;
            for c in [r, g, b] {
                let blended = (u32::from(c) * u32::from(a) + 255 * (255 - u32::from(a))) / 255;
                rgb.push(blended as u8);
            }
        }

        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            rgb,
        })
    }

    /// 读取配置的页眉图片; 不存在或无法解码时返回 None
    pub fn load(path: &Path) -> Option<Self> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Header image {} not readable: {}", path.display(), e);
                return None;
            }
        };
        match Self::from_bytes(&bytes) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!("Header image {} ignored: {}", path.display(), e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    fn resource(self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
            Font::Italic => b"F3",
        }
    }

    fn for_style(style: TextStyle) -> (Self, f32) {
        match style {
            TextStyle::Normal => (Font::Regular, 9.0),
            TextStyle::Bold => (Font::Bold, 9.0),
            TextStyle::Small => (Font::Regular, 8.0),
            TextStyle::SmallItalic => (Font::Italic, 8.0),
        }
    }
}

/// 估算文本宽度 (Helvetica 平均字宽约 0.5em)
fn text_width(s: &str, size: f32) -> f32 {
    s.chars().count() as f32 * size * 0.5
}

/// 按宽度折行; 超长单词按字符截断
fn wrap(s: &str, max_width: f32, size: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * 0.5)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in s.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..max_chars).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }
            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// 标准字体使用 WinAnsi 编码; 超出 Latin-1 的字符替换为 "?"
fn win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

/// 分页画布; y 为当前书写位置 (自页顶向下递减)
struct Canvas {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl Canvas {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: PAGE_HEIGHT - MARGIN_TOP,
        }
    }

    fn new_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(ops);
        self.y = PAGE_HEIGHT - MARGIN_TOP;
    }

    /// 剩余空间不足时换页; 返回是否换页
    fn ensure(&mut self, height: f32) -> bool {
        if self.y - height < MARGIN_BOTTOM && self.y < PAGE_HEIGHT - MARGIN_TOP {
            self.new_page();
            return true;
        }
        false
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        self.pages
    }

    fn text(&mut self, x: f32, baseline: f32, font: Font, size: f32, s: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource().to_vec()), real(size)],
        ));
        self.ops.push(Operation::new("Td", vec![real(x), real(baseline)]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(s), StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn aligned_text(&mut self, x: f32, width: f32, baseline: f32, font: Font, size: f32, s: &str, align: Align) {
        let w = text_width(s, size);
        let tx = match align {
            Align::Left => x + CELL_PAD,
            Align::Center => x + (width - w) / 2.0,
            Align::Right => x + width - CELL_PAD - w,
        };
        self.text(tx, baseline, font, size, s);
    }

    fn fill_color(&mut self, (r, g, b): (f32, f32, f32)) {
        self.ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ops.push(Operation::new("G", vec![real(GRID_GREY)]));
        self.ops.push(Operation::new("w", vec![real(0.5)]));
        self.ops.push(Operation::new("re", vec![real(x), real(y), real(w), real(h)]));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ops.push(Operation::new("re", vec![real(x), real(y), real(w), real(h)]));
        self.ops.push(Operation::new("f", vec![]));
    }

    fn image(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![real(w), real(0.0), real(0.0), real(h), real(x), real(y)],
        ));
        self.ops.push(Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// 单行段落, 过宽时折行
    fn paragraph(&mut self, s: &str, font: Font, size: f32, align: Align) {
        let leading = size + 2.0;
        for line in wrap(s, CONTENT_WIDTH, size) {
            self.ensure(leading);
            self.y -= leading;
            self.aligned_text(MARGIN_LEFT - CELL_PAD, CONTENT_WIDTH + 2.0 * CELL_PAD, self.y + 2.0, font, size, &line, align);
        }
    }

    /// 表格行: 各列独立折行, 行高取最高的一列
    fn table_row(&mut self, x0: f32, widths: &[f32], cells: &[(String, Font, Align)], size: f32) {
        let leading = size + 2.5;
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .zip(widths)
            .map(|((s, _, _), w)| wrap(s, w - 2.0 * CELL_PAD, size))
            .collect();
        let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);
        let height = lines as f32 * leading + 2.0 * CELL_PAD;

        self.ensure(height);
        let top = self.y;
        let mut x = x0;
        for ((cell_lines, (_, font, align)), w) in wrapped.iter().zip(cells).zip(widths) {
            self.stroke_rect(x, top - height, *w, height);
            for (n, line) in cell_lines.iter().enumerate() {
                let baseline = top - CELL_PAD - (n as f32 + 1.0) * leading + 2.5;
                self.aligned_text(x, *w, baseline, *font, size, line, *align);
            }
            x += w;
        }
        self.y -= height;
    }

    fn key_value(&mut self, rows: &[(String, String)]) {
        let x0 = (PAGE_WIDTH - KEY_COL - VALUE_COL) / 2.0;
        for (k, v) in rows {
            self.table_row(
                x0,
                &[KEY_COL, VALUE_COL],
                &[
                    (k.clone(), Font::Bold, Align::Left),
                    (v.clone(), Font::Regular, Align::Left),
                ],
                9.0,
            );
        }
    }

    fn item_header(&mut self) {
        let size = 8.0;
        let height = size + 2.5 + 2.0 * CELL_PAD + 4.0;
        self.ensure(height + 20.0);
        let top = self.y;
        let mut x = MARGIN_LEFT;

        self.fill_color(HEADER_BLUE);
        self.fill_rect(x, top - height, CONTENT_WIDTH, height);
        self.fill_color((0.96, 0.96, 0.96));
        for (label, w) in ITEM_HEADER.iter().zip(ITEM_COLS) {
            self.stroke_rect(x, top - height, w, height);
            self.aligned_text(x, w, top - height + CELL_PAD + 2.0, Font::Bold, size, label, Align::Center);
            x += w;
        }
        self.fill_color((0.0, 0.0, 0.0));
        self.y -= height;
    }

    fn items(&mut self, rows: &[ItemRow], total: &str) {
        self.item_header();
        let aligns = [Align::Center, Align::Center, Align::Center, Align::Left, Align::Right, Align::Right];

        for row in rows {
            let cells: Vec<(String, Font, Align)> = row
                .cells()
                .into_iter()
                .zip(aligns)
                .map(|(s, a)| (s, Font::Regular, a))
                .collect();
            let page_before = self.pages.len();
            self.ensure(self.row_height_hint(&cells));
            if self.pages.len() != page_before {
                self.item_header();
            }
            self.table_row(MARGIN_LEFT, &ITEM_COLS, &cells, 8.5);
        }

        let mut cells: Vec<(String, Font, Align)> = (0..6)
            .map(|_| (String::new(), Font::Regular, Align::Center))
            .collect();
        cells[3] = (TOTAL_LABEL.to_string(), Font::Bold, Align::Left);
        cells[5] = (total.to_string(), Font::Bold, Align::Right);
        self.table_row(MARGIN_LEFT, &ITEM_COLS, &cells, 8.5);
    }

    fn row_height_hint(&self, cells: &[(String, Font, Align)]) -> f32 {
        let size = 8.5;
        let lines = cells
            .iter()
            .zip(ITEM_COLS)
            .map(|((s, _, _), w)| wrap(s, w - 2.0 * CELL_PAD, size).len())
            .max()
            .unwrap_or(1);
        lines as f32 * (size + 2.5) + 2.0 * CELL_PAD
    }
}

/// 生成 PDF 字节; 相同输入产生相同输出
pub fn write_pdf(layout: &DocumentLayout, header_image: Option<&HeaderImage>) -> Result<Vec<u8>> {
    let mut canvas = Canvas::new();

    for block in &layout.blocks {
        match block {
            Block::HeaderImage => {
                if header_image.is_some() {
                    canvas.ensure(LOGO_HEIGHT);
                    canvas.y -= LOGO_HEIGHT;
                    canvas.image((PAGE_WIDTH - LOGO_WIDTH) / 2.0, canvas.y, LOGO_WIDTH, LOGO_HEIGHT);
                }
            }
            Block::Title(t) => canvas.paragraph(t, Font::Bold, 16.0, Align::Center),
            Block::Caption(c) => {
                canvas.paragraph(c, Font::Bold, 10.0, Align::Center);
                canvas.y -= 6.0;
            }
            Block::KeyValue(rows) => canvas.key_value(rows),
            Block::Labeled { label, text } => {
                canvas.ensure(11.0);
                canvas.y -= 11.0;
                canvas.text(MARGIN_LEFT, canvas.y + 2.0, Font::Bold, 9.0, label);
                let x = MARGIN_LEFT + text_width(label, 9.0) + 6.0;
                canvas.text(x, canvas.y + 2.0, Font::Regular, 9.0, text);
            }
            Block::Items { rows, total } => canvas.items(rows, total),
            Block::Text { text, style } => {
                let (font, size) = Font::for_style(*style);
                canvas.paragraph(text, font, size, Align::Left);
            }
            Block::Spacer(h) => {
                let h = f32::from(*h);
                if !canvas.ensure(h) {
                    canvas.y -= h;
                }
            }
        }
    }

    assemble(canvas.finish(), header_image)
}

fn assemble(pages: Vec<Vec<Operation>>, header_image: Option<&HeaderImage>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font = |base: &str| {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base,
            "Encoding" => "WinAnsiEncoding",
        }
    };
    let f1 = doc.add_object(font("Helvetica"));
    let f2 = doc.add_object(font("Helvetica-Bold"));
    let f3 = doc.add_object(font("Helvetica-Oblique"));

    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => f1, "F2" => f2, "F3" => f3 },
    };
    if let Some(img) = header_image {
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(img.width),
                "Height" => i64::from(img.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            img.rgb.clone(),
        );
        stream
            .compress()
            .map_err(|e| AppError::Document(e.to_string()))?;
        let img_id = doc.add_object(stream);
        let mut xobjects = Dictionary::new();
        xobjects.set("Im1", img_id);
        resources.set("XObject", xobjects);
    }
    let resources_id = doc.add_object(resources);

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let encoded = Content { operations }
            .encode()
            .map_err(|e| AppError::Document(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| AppError::Document(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width_and_breaks_long_words() {
        let lines = wrap("Dipirona sódica 500mg comprimidos caixa", 60.0, 10.0);
        assert!(lines.iter().all(|l| l.chars().count() <= 12), "{lines:?}");
        assert_eq!(lines.join(" "), "Dipirona sódica 500mg comprimidos caixa");

        let lines = wrap("ABCDEFGHIJKLMNOPQRSTUVWXY", 50.0, 10.0);
        assert_eq!(lines, vec!["ABCDEFGHIJ", "KLMNOPQRST", "UVWXY"]);

        assert_eq!(wrap("", 50.0, 10.0), vec![String::new()]);
    }

    #[test]
    fn win_ansi_keeps_latin1_accents() {
        assert_eq!(win_ansi("CÓDIGO"), vec![b'C', 0xD3, b'D', b'I', b'G', b'O']);
        assert_eq!(win_ansi("a→b"), b"a?b".to_vec());
    }

    fn encode(img: image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_logo_is_decoded_and_flattened_on_white() {
        let mut logo = image::RgbaImage::new(3, 2);
        logo.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        // 其余像素全透明
        let png = encode(image::DynamicImage::ImageRgba8(logo), image::ImageFormat::Png);

        let img = HeaderImage::from_bytes(&png).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.rgb.len(), 3 * 2 * 3);
        assert_eq!(&img.rgb[..3], &[255, 0, 0]);
        assert_eq!(&img.rgb[3..6], &[255, 255, 255]);
    }

    #[test]
    fn jpeg_logo_is_decoded() {
        let jpeg = encode(
            image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 4)),
            image::ImageFormat::Jpeg,
        );
        let img = HeaderImage::from_bytes(&jpeg).unwrap();
        assert_eq!((img.width, img.height), (8, 4));

        assert!(HeaderImage::from_bytes(b"not an image").is_err());
    }

    #[test]
    fn header_image_is_embedded_as_xobject() {
        let png = encode(
            image::DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4)),
            image::ImageFormat::Png,
        );
        let img = HeaderImage::from_bytes(&png).unwrap();
        let layout = DocumentLayout {
            blocks: vec![Block::HeaderImage, Block::Title("ORDEM DE COMPRA".to_string())],
        };

        let bytes = write_pdf(&layout, Some(&img)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let has_image = doc.objects.values().any(|o| match o {
            Object::Stream(st) => st.dict.get(b"Subtype").ok() == Some(&Object::Name(b"Image".to_vec())),
            _ => false,
        });
        assert!(has_image);
    }
}
