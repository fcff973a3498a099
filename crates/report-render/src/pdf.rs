//! Paginated A4 document layout.
//!
//! The layout is a single downward cursor over A4 pages: sections request
//! vertical space, and the cursor starts a new page when it would run past
//! the bottom margin. Built-in Helvetica metrics are approximated for the
//! right-aligned numeric cells; the tables only carry short formatted
//! numbers, so the approximation holds.

use printpdf::*;
use printpdf::path::PaintMode;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::warn;

use report_core::error::{ReportError, Result};

/// A4 page width in millimetres.
const PAGE_WIDTH: f64 = 210.0;
/// A4 page height in millimetres.
const PAGE_HEIGHT: f64 = 297.0;
/// Outer page margin in millimetres.
const MARGIN: f64 = 10.0;
/// Cursor position on a fresh page.
const TOP: f64 = PAGE_HEIGHT - MARGIN - 8.0;
/// Row height of table rows in millimetres.
const ROW_HEIGHT: f64 = 7.0;
/// Line leading of wrapped paragraphs in millimetres.
const LEADING: f64 = 5.0;
/// Wrap width of body paragraphs, in characters.
const WRAP_WIDTH: usize = 95;

/// Millimetres per typographic point.
const MM_PER_PT: f64 = 0.352_778;
/// Approximate average glyph advance of Helvetica, in em.
const AVG_GLYPH_EM: f64 = 0.5;

fn accent() -> Color {
    // #E6B800
    Color::Rgb(Rgb::new(0.902, 0.722, 0.0, None))
}

fn zebra() -> Color {
    // #F2F2F2
    Color::Rgb(Rgb::new(0.949, 0.949, 0.949, None))
}

fn border() -> Color {
    // #DDDDDD
    Color::Rgb(Rgb::new(0.867, 0.867, 0.867, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

/// Approximate rendered width of `text` at `size` points, in millimetres.
fn text_width_mm(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * AVG_GLYPH_EM * MM_PER_PT
}

/// Greedy word wrap to a character budget per line.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// A paginated report document under construction.
pub struct PdfReport {
    doc: PdfDocumentReference,
    page: PdfPageIndex,
    layer: PdfLayerIndex,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    y: f64,
}

impl std::fmt::Debug for PdfReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfReport").field("y", &self.y).finish()
    }
}

impl PdfReport {
    /// Starts a new A4 document.
    pub fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Render(e.to_string()))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Render(e.to_string()))?;

        Ok(Self {
            doc,
            page,
            layer,
            font,
            font_bold,
            y: TOP,
        })
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc.get_page(self.page).get_layer(self.layer)
    }

    /// Starts a fresh page and resets the cursor.
    pub fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        self.page = page;
        self.layer = layer;
        self.y = TOP;
    }

    /// Starts a new page unless `needed` millimetres still fit above the
    /// bottom margin.
    pub fn ensure_space(&mut self, needed: f64) {
        if self.y - needed < MARGIN + 8.0 {
            self.new_page();
        }
    }

    /// Moves the cursor down.
    pub fn space(&mut self, mm: f64) {
        self.y -= mm;
    }

    fn draw_rule(&self, x: f64, y: f64, width: f64, color: Color, thickness: f64) {
        let layer = self.layer();
        layer.set_outline_color(color);
        layer.set_outline_thickness(thickness as f32);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x as f32), Mm(y as f32)), false),
                (Point::new(Mm((x + width) as f32), Mm(y as f32)), false),
            ],
            is_closed: false,
        });
    }

    fn fill_rect(&self, x: f64, y_bottom: f64, width: f64, height: f64, color: Color) {
        let layer = self.layer();
        layer.set_fill_color(color);
        layer.add_rect(
            Rect::new(Mm(x as f32), Mm(y_bottom as f32), Mm((x + width) as f32), Mm((y_bottom + height) as f32))
                .with_mode(PaintMode::Fill),
        );
    }

    fn text(&self, text: &str, size: f64, x: f64, y: f64, bold: bool, color: Color) {
        let layer = self.layer();
        layer.set_fill_color(color);
        let font = if bold { &self.font_bold } else { &self.font };
        layer.use_text(text, size as f32, Mm(x as f32), Mm(y as f32), font);
    }

    fn text_right(&self, text: &str, size: f64, right_edge: f64, y: f64, bold: bool) {
        let x = right_edge - text_width_mm(text, size);
        self.text(text, size, x, y, bold, black());
    }

    /// Report header: title and date right-aligned, price beneath.
    pub fn header(&mut self, title: &str, date: &str, price: &str) {
        let right = PAGE_WIDTH - MARGIN;
        let layer = self.layer();
        layer.set_fill_color(accent());
        layer.use_text(
            title,
            20.0,
            Mm((right - text_width_mm(title, 20.0)) as f32),
            Mm((PAGE_HEIGHT - 14.0) as f32),
            &self.font_bold,
        );
        self.text_right(date, 18.0, right, PAGE_HEIGHT - 21.0, true);
        self.text_right(price, 14.0, right, PAGE_HEIGHT - 27.0, false);
        self.y = PAGE_HEIGHT - 36.0;
    }

    /// Accent-colored section title with an underline of `width` mm.
    pub fn section_title(&mut self, title: &str, width: f64) {
        self.ensure_space(14.0);
        self.text(&title.to_uppercase(), 13.0, MARGIN, self.y, true, accent());
        self.draw_rule(MARGIN, self.y - 1.5, width, accent(), 1.2);
        self.y -= 8.0;
    }

    /// Wrapped body paragraph at the cursor.
    pub fn paragraph(&mut self, text: &str) {
        for line in wrap_text(text, WRAP_WIDTH) {
            self.ensure_space(LEADING);
            self.text(&line, 11.0, MARGIN, self.y, false, black());
            self.y -= LEADING;
        }
        self.y -= 3.0;
    }

    /// Two side-by-side `label: value` blocks (company info columns).
    pub fn info_columns(
        &mut self,
        left_title: &str,
        left: &[(String, String)],
        right_title: &str,
        right: &[(String, String)],
    ) {
        let needed = (left.len().max(right.len()) as f64).mul_add(6.0, 16.0);
        self.ensure_space(needed);

        let column_x = [MARGIN, PAGE_WIDTH / 2.0];
        let top = self.y;
        let mut bottoms = [top, top];

        for (i, (title, entries)) in [(left_title, left), (right_title, right)]
            .into_iter()
            .enumerate()
        {
            let x = column_x[i];
            let mut y = top;
            self.text(&title.to_uppercase(), 12.0, x, y, true, accent());
            self.draw_rule(x, y - 1.5, PAGE_WIDTH / 2.0 - MARGIN - 5.0, accent(), 1.2);
            y -= 7.0;

            for (label, value) in entries {
                let label_text = format!("{label}:");
                self.text(&label_text, 11.0, x, y, true, black());
                let label_width = text_width_mm(&label_text, 11.0) + 1.5;
                // Long values wrap into the column, continuation lines flush
                // left under the label.
                let budget = 44usize.saturating_sub(label_text.chars().count());
                let lines = wrap_text(value, budget.max(16));
                for (j, line) in lines.iter().enumerate() {
                    let line_x = if j == 0 { x + label_width } else { x };
                    if j > 0 {
                        y -= 5.0;
                    }
                    self.text(line, 11.0, line_x, y, false, black());
                }
                y -= 6.0;
            }
            bottoms[i] = y;
        }

        self.y = bottoms[0].min(bottoms[1]) - 4.0;
    }

    /// Two side-by-side two-column tables (share details and percentage
    /// changes).
    pub fn detail_tables(
        &mut self,
        left_title: &str,
        left: &[(String, String)],
        right_title: &str,
        right: &[(String, String)],
    ) {
        let rows = left.len().max(right.len());
        self.ensure_space((rows as f64).mul_add(ROW_HEIGHT, 18.0));

        let table_width = PAGE_WIDTH / 2.0 - MARGIN - 10.0;
        let column_x = [MARGIN, PAGE_WIDTH / 2.0];
        let top = self.y;

        for (i, (title, entries)) in [(left_title, left), (right_title, right)]
            .into_iter()
            .enumerate()
        {
            let x = column_x[i];
            let mut y = top;
            self.text(&title.to_uppercase(), 12.0, x, y, true, accent());
            self.draw_rule(x, y - 1.5, table_width, accent(), 1.2);
            y -= 6.0;

            for (row, (label, value)) in entries.iter().enumerate() {
                let row_bottom = y - ROW_HEIGHT;
                if row % 2 == 1 {
                    self.fill_rect(x, row_bottom, table_width, ROW_HEIGHT, zebra());
                }
                self.draw_rule(x, row_bottom, table_width, border(), 0.5);
                self.text(label, 10.0, x + 1.5, row_bottom + 2.0, false, black());
                self.text(
                    value,
                    10.0,
                    x + table_width / 2.0 + 1.5,
                    row_bottom + 2.0,
                    false,
                    black(),
                );
                y = row_bottom;
            }
        }

        self.y = top - (rows as f64).mul_add(ROW_HEIGHT, 10.0);
    }

    /// Full-width financial table: year header row, zebra-striped label
    /// rows, right-aligned values.
    pub fn financial_table(
        &mut self,
        section_title: Option<&str>,
        col_labels: &[String],
        rows: &[(String, Vec<String>)],
    ) {
        let table_width = PAGE_WIDTH - 2.0 * MARGIN;
        let title_col_width = 0.25 * PAGE_WIDTH;
        let data_col_width = (table_width - title_col_width) / col_labels.len().max(1) as f64;

        // Header plus a couple of rows must fit; long tables paginate
        // row-by-row below.
        self.ensure_space(3.0f64.mul_add(ROW_HEIGHT, 18.0));

        if let Some(title) = section_title {
            self.section_title(title, table_width);
        }

        // Header row.
        let header_bottom = self.y - ROW_HEIGHT;
        self.fill_rect(MARGIN, header_bottom, table_width, ROW_HEIGHT, accent());
        self.text("Item", 11.0, MARGIN + 1.5, header_bottom + 2.0, true, black());
        for (i, label) in col_labels.iter().enumerate() {
            let right_edge = MARGIN + title_col_width + (i as f64 + 1.0) * data_col_width - 1.5;
            self.text_right(label, 11.0, right_edge, header_bottom + 2.0, true);
        }
        self.y = header_bottom;

        for (idx, (label, values)) in rows.iter().enumerate() {
            if self.y - ROW_HEIGHT < MARGIN + 8.0 {
                self.new_page();
            }
            let row_bottom = self.y - ROW_HEIGHT;

            if idx % 2 == 1 {
                self.fill_rect(MARGIN, row_bottom, table_width, ROW_HEIGHT, zebra());
            }
            self.draw_rule(MARGIN, row_bottom, table_width, border(), 0.5);

            self.text(label, 10.0, MARGIN + 1.5, row_bottom + 2.0, false, black());
            for (i, value) in values.iter().enumerate() {
                let right_edge = MARGIN + title_col_width + (i as f64 + 1.0) * data_col_width - 1.5;
                self.text_right(value, 10.0, right_edge, row_bottom + 2.0, false);
            }
            self.y = row_bottom;
        }

        self.y -= 8.0;
    }

    /// Embeds a PNG at the cursor, `width` x `height` mm, left-aligned at
    /// `x`. A missing or undecodable file degrades to a placeholder note so
    /// the report still completes.
    pub fn image(&mut self, path: &Path, x: f64, width: f64, height: f64) {
        self.ensure_space(height + 2.0);
        let y_bottom = self.y - height;

        match load_image(path) {
            Ok(image) => {
                let px_width = f64::from(image.image.width.0 as u32).max(1.0);
                let px_height = f64::from(image.image.height.0 as u32).max(1.0);
                let dpi = 300.0;
                let natural_width = px_width * 25.4 / dpi;
                let natural_height = px_height * 25.4 / dpi;

                image.add_to_layer(
                    self.layer(),
                    ImageTransform {
                        translate_x: Some(Mm(x as f32)),
                        translate_y: Some(Mm(y_bottom as f32)),
                        scale_x: Some((width / natural_width) as f32),
                        scale_y: Some((height / natural_height) as f32),
                        dpi: Some(dpi as f32),
                        ..Default::default()
                    },
                );
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "chart image unavailable; placeholder used");
                self.text(
                    &format!("[chart unavailable: {}]", path.display()),
                    10.0,
                    x,
                    y_bottom + height / 2.0,
                    false,
                    black(),
                );
            }
        }

        self.y = y_bottom - 2.0;
    }

    /// Embeds two PNGs side by side under accent titles.
    pub fn image_pair(
        &mut self,
        left_title: &str,
        left: &Path,
        right_title: &str,
        right: &Path,
        height: f64,
    ) {
        self.ensure_space(height + 14.0);

        let half = (PAGE_WIDTH - 2.0 * MARGIN - 10.0) / 2.0;
        let right_x = MARGIN + half + 10.0;

        self.text(&left_title.to_uppercase(), 12.0, MARGIN, self.y, true, accent());
        self.draw_rule(MARGIN, self.y - 1.5, half, accent(), 1.2);
        self.text(&right_title.to_uppercase(), 12.0, right_x, self.y, true, accent());
        self.draw_rule(right_x, self.y - 1.5, half, accent(), 1.2);
        self.y -= 5.0;

        let top = self.y;
        self.image(left, MARGIN, half, height);
        self.y = top;
        self.image(right, right_x, half, height);
    }

    /// Writes the document to `path`.
    pub fn save(self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.doc
            .save(&mut BufWriter::new(file))
            .map_err(|e| ReportError::Render(e.to_string()))
    }
}

fn load_image(path: &Path) -> Result<Image> {
    let file = File::open(path)?;
    let decoder = image_crate::codecs::png::PngDecoder::new(std::io::BufReader::new(file))
        .map_err(|e| ReportError::Render(e.to_string()))?;
    Image::try_from(decoder).map_err(|e| ReportError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four five", 10);
        assert_eq!(lines, ["one two", "three four", "five"]);
        assert!(wrap_text("", 10).is_empty());
        // A single over-long word still lands on its own line.
        assert_eq!(wrap_text("extraordinarily", 5), ["extraordinarily"]);
    }

    #[test]
    fn test_text_width_grows_with_length() {
        assert!(text_width_mm("wide text", 11.0) > text_width_mm("x", 11.0));
        assert_eq!(text_width_mm("", 11.0), 0.0);
    }

    #[test]
    fn test_document_builds_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.pdf");

        let mut pdf = PdfReport::new("Equity Report").unwrap();
        pdf.header("MOBILE WORLD-MWG", "2024-12-31", "60.000");
        pdf.section_title("Business summary", 190.0);
        pdf.paragraph("A retailer of consumer electronics with nationwide coverage.");
        pdf.financial_table(
            Some("Balance sheet"),
            &["2020".to_string(), "2021".to_string()],
            &[
                ("Total Assets".to_string(), vec!["1.00".into(), "2.00".into()]),
                ("Total Liabilities".to_string(), vec!["0.40".into(), "0.70".into()]),
            ],
        );
        pdf.detail_tables(
            "Share detail",
            &[("Close".to_string(), "60.000".to_string())],
            "Percentage change",
            &[("1 day".to_string(), "1.25%".to_string())],
        );
        // Missing image degrades to a placeholder, not an error.
        pdf.image(Path::new("does-not-exist.png"), MARGIN, 90.0, 60.0);
        pdf.save(&path).unwrap();

        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_long_table_paginates() {
        let mut pdf = PdfReport::new("Pagination").unwrap();
        let rows: Vec<(String, Vec<String>)> = (0..80)
            .map(|i| (format!("Metric {i}"), vec!["1.00".to_string()]))
            .collect();
        pdf.financial_table(Some("Long table"), &["2024".to_string()], &rows);
        // The cursor is on a later page and still above the bottom margin.
        assert!(pdf.y > MARGIN);
    }
}
