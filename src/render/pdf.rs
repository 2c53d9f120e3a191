use std::io;

use printpdf::image_crate::{DynamicImage, GenericImageView, Rgb as RgbPixel, RgbImage};
use printpdf::{
    Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use super::layout::{Block, ProfileDocument};
use super::metrics::{BOLD_TTF, Metrics, REGULAR_TTF};
use super::picture::{Picture, fitted_size};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 50.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 20.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 11.0;
const LINE_GAP: f32 = 1.35;

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn pdf_err<E: std::fmt::Debug>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("pdf: {e:?}"))
}

/// Cursor over the pages of the document being painted. Coordinates are in
/// points from the bottom-left corner; `y` is the top of the next line.
struct Painter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    metrics: Metrics,
    y: f32,
    pages: usize,
}

impl Painter {
    fn new(title: &str) -> io::Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_external_font(REGULAR_TTF).map_err(pdf_err)?;
        let bold = doc.add_external_font(BOLD_TTF).map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            metrics: Metrics::load()?,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    /// Starts a new page when `height` no longer fits above the bottom margin.
    fn reserve(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            mm(PAGE_WIDTH),
            mm(PAGE_HEIGHT),
            format!("Page {}, Layer 1", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn text_at(&mut self, text: &str, size: f32, bold: bool, x: f32) {
        let height = size * LINE_GAP;
        self.reserve(height);
        let font = if bold { &self.bold } else { &self.regular };
        let text = self.metrics.printable(text, bold);
        self.layer.use_text(text, size, mm(x), mm(self.y - size), font);
        self.y -= height;
    }

    fn centered(&mut self, text: &str, size: f32, bold: bool) {
        for line in self.metrics.wrap(text, size, bold, CONTENT_WIDTH) {
            let x = MARGIN + (CONTENT_WIDTH - self.metrics.text_width(&line, size, bold)).max(0.0) / 2.0;
            self.text_at(&line, size, bold, x);
        }
    }

    fn left(&mut self, text: &str, size: f32, bold: bool) {
        for line in self.metrics.wrap(text, size, bold, CONTENT_WIDTH) {
            self.text_at(&line, size, bold, MARGIN);
        }
    }

    /// Bold `label:` then the value, wrapped under its own first column.
    fn field(&mut self, label: &str, value: &str) {
        let label = format!("{label}: ");
        let label_width = self.metrics.text_width(&label, BODY_SIZE, true);
        let value_x = MARGIN + label_width;
        let lines = self.metrics.wrap(value, BODY_SIZE, false, CONTENT_WIDTH - label_width);

        let height = BODY_SIZE * LINE_GAP;
        self.reserve(height);
        let baseline = self.y - BODY_SIZE;
        let label = self.metrics.printable(&label, true);
        self.layer.use_text(label, BODY_SIZE, mm(MARGIN), mm(baseline), &self.bold);
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.reserve(height);
            }
            let line = self.metrics.printable(line, false);
            self.layer.use_text(line, BODY_SIZE, mm(value_x), mm(self.y - BODY_SIZE), &self.regular);
            self.y -= height;
        }
    }

    fn rule(&mut self) {
        self.reserve(12.0);
        self.gap(6.0);
        self.layer.set_outline_color(Color::Rgb(Rgb::new(0.6, 0.6, 0.6, None)));
        self.layer.set_outline_thickness(1.0);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(mm(MARGIN), mm(self.y)), false),
                (Point::new(mm(PAGE_WIDTH - MARGIN), mm(self.y)), false),
            ],
            is_closed: false,
        });
        self.gap(6.0);
    }

    fn image(&mut self, img: &DynamicImage) {
        let (width, height) = fitted_size(img);
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.reserve(height + 10.0);
        self.gap(5.0);
        // at 72 dpi one pixel is one point before scaling
        let scale = width / img.dimensions().0 as f32;
        let rgb = DynamicImage::ImageRgb8(on_white(img));
        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(mm(MARGIN + (CONTENT_WIDTH - width) / 2.0)),
                translate_y: Some(mm(self.y - height)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(72.0),
                ..Default::default()
            },
        );
        self.y -= height;
        self.gap(5.0);
    }

    fn finish(self) -> io::Result<Painted> {
        let pages = self.pages;
        let bytes = self.doc.save_to_bytes().map_err(pdf_err)?;
        Ok(Painted { bytes, pages })
    }
}

/// Composites `img` over white; the embedded image carries no alpha channel.
fn on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        RgbPixel([blend(r), blend(g), blend(b)])
    })
}

pub struct Painted {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Paints the laid-out document into PDF bytes.
pub fn paint(doc: &ProfileDocument) -> io::Result<Painted> {
    let mut p = Painter::new("User Profile")?;
    for block in &doc.blocks {
        match block {
            Block::Title(t) => {
                p.centered(t, TITLE_SIZE, true);
                p.gap(4.0);
            }
            Block::Rule => p.rule(),
            Block::Picture(Picture::Image(img)) => p.image(img),
            Block::Picture(other) => {
                if let Some(text) = other.placeholder() {
                    p.centered(text, BODY_SIZE, false);
                }
                p.gap(4.0);
            }
            Block::Field { label, value } => p.field(label, value),
            Block::Heading(h) => {
                p.gap(8.0);
                p.left(h, HEADING_SIZE, true);
                p.gap(2.0);
            }
            Block::EntryTitle(t) => {
                p.gap(3.0);
                p.left(t, BODY_SIZE, true);
            }
            Block::Note(n) => p.left(n, BODY_SIZE, false),
        }
    }
    p.finish()
}
