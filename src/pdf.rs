use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::report::{RenderError, ReportSink};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const LAYER: &str = "Report";

const TITLE_SIZE: f32 = 20.0;
const HEADING_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica advance width, in ems.
const AVG_GLYPH_EM: f32 = 0.5;

/// Points to millimetres, with a little leading.
fn line_height(font_size: f32) -> f32 {
    font_size * PT_TO_MM * 1.4
}

/// Greedy word wrap against the usable page width. Words longer than a whole
/// line are split mid-word.
fn wrap(text: &str, font_size: f32) -> Vec<String> {
    let usable = PAGE_WIDTH - 2.0 * MARGIN;
    let max_chars = (usable / (font_size * PT_TO_MM * AVG_GLYPH_EM)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(max_chars)
                .map_or(word.len(), |(idx, _)| idx);
            lines.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// A4 PDF sink over the built-in Helvetica faces. Text flows top to bottom and
/// a new page is started whenever the next line would cross the bottom margin.
pub struct PdfSink {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor: f32,
}

impl PdfSink {
    pub fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor: PAGE_HEIGHT - MARGIN,
        })
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, RenderError> {
        self.doc
            .save_to_bytes()
            .map_err(|err| RenderError::Pdf(err.to_string()))
    }

    fn reserve(&mut self, height: f32) {
        if self.cursor - height >= MARGIN {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn write_at(&mut self, text: &str, x: f32, size: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(sanitize(text), size, Mm(x), Mm(self.cursor), font);
    }

    fn write_line(&mut self, text: &str, size: f32, bold: bool) {
        let height = line_height(size);
        for chunk in wrap(text, size) {
            self.reserve(height);
            self.cursor -= height;
            self.write_at(&chunk, MARGIN, size, bold);
        }
    }
}

/// Built-in fonts only cover WinAnsi; anything outside printable ASCII is
/// replaced so the page stays legible. Titles in non-Latin scripts come out as
/// runs of `?` until a Unicode TTF is embedded with `add_external_font`.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

impl ReportSink for PdfSink {
    fn title(&mut self, text: &str) -> Result<(), RenderError> {
        self.write_line(text, TITLE_SIZE, true);
        self.cursor -= line_height(BODY_SIZE) / 2.0;
        Ok(())
    }

    fn heading(&mut self, text: &str) -> Result<(), RenderError> {
        self.write_line(text, HEADING_SIZE, true);
        Ok(())
    }

    fn line(&mut self, text: &str) -> Result<(), RenderError> {
        self.write_line(text, BODY_SIZE, false);
        Ok(())
    }

    fn table(&mut self, columns: &[&str], rows: &[Vec<String>]) -> Result<(), RenderError> {
        if columns.is_empty() {
            return Ok(());
        }
        // First column gets the remaining width after the numeric columns.
        let usable = PAGE_WIDTH - 2.0 * MARGIN;
        let narrow = 26.0_f32.min(usable / columns.len() as f32);
        let wide = usable - narrow * (columns.len() - 1) as f32;
        let offsets: Vec<f32> = (0..columns.len())
            .map(|idx| match idx {
                0 => MARGIN,
                n => MARGIN + wide + narrow * (n - 1) as f32,
            })
            .collect();

        let height = line_height(BODY_SIZE);
        self.reserve(height);
        self.cursor -= height;
        for (column, x) in columns.iter().zip(&offsets) {
            self.write_at(column, *x, BODY_SIZE - 1.0, true);
        }
        for row in rows {
            self.reserve(height);
            self.cursor -= height;
            for (cell, x) in row.iter().zip(&offsets) {
                self.write_at(cell, *x, BODY_SIZE - 1.0, false);
            }
        }
        Ok(())
    }

    fn gap(&mut self) -> Result<(), RenderError> {
        self.cursor -= line_height(BODY_SIZE) / 2.0;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportStats;
    use crate::report::{render, RenderOutcome, ReportMeta};

    #[test]
    fn renders_a_pdf_document() {
        let meta = ReportMeta {
            title: "Admin Monthly Analytics Report".to_string(),
            committee: None,
            category: None,
            window: "Last 30 Days".to_string(),
            generated_at: "2026-04-30 12:00:00 UTC".to_string(),
        };
        let mut sink = PdfSink::new(&meta.title).unwrap();
        let outcome = render(&ReportStats::default(), &meta, &mut sink).unwrap();
        assert_eq!(outcome, RenderOutcome::Completed);

        let bytes = sink.into_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_reports_spill_onto_new_pages() {
        let mut sink = PdfSink::new("Paging").unwrap();
        for idx in 0..200 {
            sink.line(&format!("row {idx}")).unwrap();
            assert!(sink.cursor >= MARGIN);
        }
        assert!(sink.into_bytes().unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn non_ascii_text_is_replaced() {
        assert_eq!(sanitize("Caf\u{e9} \u{2013} menu"), "Caf? ? menu");
        assert_eq!(sanitize("\u{092a}\u{093e}\u{0928}\u{0940} leak"), "???? leak");
    }

    #[test]
    fn long_lines_wrap_within_the_page() {
        let title = "Water leaking from the ceiling of the second floor corridor in Block C \
                     every time it rains heavily during the night";
        let text = format!("1. {title}  [Medium]  (in-progress)  - 42 upvotes");
        assert!(text.chars().count() > 150);

        let mut sink = PdfSink::new("Wrapping").unwrap();
        let start = sink.cursor;
        sink.line(&text).unwrap();
        assert!(start - sink.cursor > line_height(BODY_SIZE) * 1.5);

        let chunks = wrap(&text, BODY_SIZE);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 82));
        assert_eq!(chunks.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn short_lines_are_left_untouched() {
        assert_eq!(wrap("1. Leaking tap  [High]  (pending)", BODY_SIZE), vec!["1. Leaking tap  [High]  (pending)"]);
        assert_eq!(wrap("x".repeat(200).as_str(), BODY_SIZE).len(), 3);
    }
}
