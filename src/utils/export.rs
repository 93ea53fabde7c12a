use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use serde::Serialize;

use crate::model::attendance::AttendanceStatus;

/// One child on one day, as printed in exports.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub child_name: String,
    pub parent_name: String,
    pub center_name: String,
    pub date: NaiveDate,
    pub sign_in: Option<NaiveDateTime>,
    pub sign_out: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub late: bool,
    pub notes: Option<String>,
}

fn clock(t: Option<NaiveDateTime>) -> String {
    t.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn notes_or_dash(notes: &Option<String>) -> String {
    match notes.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => "-".to_string(),
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Child Name")]
    child_name: &'a str,
    #[serde(rename = "Parent")]
    parent_name: &'a str,
    #[serde(rename = "Center")]
    center_name: &'a str,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Sign In")]
    sign_in: String,
    #[serde(rename = "Sign Out")]
    sign_out: String,
    #[serde(rename = "Status")]
    status: &'a str,
    #[serde(rename = "Late")]
    late: &'a str,
    #[serde(rename = "Notes")]
    notes: String,
}

pub fn attendance_csv(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    if rows.is_empty() {
        wtr.write_record([
            "Child Name", "Parent", "Center", "Date", "Sign In", "Sign Out", "Status", "Late",
            "Notes",
        ])?;
    }

    for row in rows {
        wtr.serialize(CsvRow {
            child_name: &row.child_name,
            parent_name: &row.parent_name,
            center_name: &row.center_name,
            date: row.date.format("%Y-%m-%d").to_string(),
            sign_in: clock(row.sign_in),
            sign_out: clock(row.sign_out),
            status: row.status.as_ref(),
            late: if row.late { "Yes" } else { "No" },
            notes: notes_or_dash(&row.notes),
        })?;
    }

    wtr.into_inner().context("failed to flush CSV writer")
}

// A4 portrait, millimetres
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const LEFT: f32 = 20.0;
const RIGHT: f32 = PAGE_W - 20.0;
const TABLE_TOP: f32 = 245.0;
const ROW_H: f32 = 7.0;
const TABLE_BOTTOM: f32 = 25.0;
const FOOTER_Y: f32 = 12.0;

/// (header, x offset, max chars)
const COLUMNS: [(&str, f32, usize); 5] = [
    ("Child Name", LEFT, 28),
    ("Sign In", 75.0, 8),
    ("Sign Out", 98.0, 8),
    ("Status", 121.0, 14),
    ("Notes", 150.0, 24),
];

pub fn rows_per_page() -> usize {
    (((TABLE_TOP - ROW_H) - TABLE_BOTTOM) / ROW_H) as usize
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

pub struct PdfReport<'a> {
    pub title: &'a str,
    pub center_label: &'a str,
    pub report_date: NaiveDate,
    pub rows: &'a [ReportRow],
}

impl PdfReport<'_> {
    fn header(&self, layer: &PdfLayerReference, fonts: &Fonts) {
        layer.use_text(self.title, 20.0, Mm(LEFT), Mm(PAGE_H - 22.0), &fonts.bold);
        layer.use_text("Attendance Report", 16.0, Mm(LEFT), Mm(PAGE_H - 32.0), &fonts.bold);
        layer.use_text(
            format!(
                "Report Date: {} | Center: {}",
                self.report_date.format("%Y-%m-%d"),
                self.center_label
            ),
            12.0,
            Mm(LEFT),
            Mm(PAGE_H - 41.0),
            &fonts.regular,
        );

        for (name, x, _) in COLUMNS {
            layer.use_text(name, 11.0, Mm(x), Mm(TABLE_TOP), &fonts.bold);
        }
    }

    fn footer(&self, layer: &PdfLayerReference, fonts: &Fonts, page: usize, pages: usize) {
        layer.use_text(page_label(page, pages), 10.0, Mm(LEFT), Mm(FOOTER_Y), &fonts.regular);
        layer.use_text(
            "Childcare Attendance",
            10.0,
            Mm(RIGHT - 40.0),
            Mm(FOOTER_Y),
            &fonts.regular,
        );
    }

    fn row(&self, layer: &PdfLayerReference, fonts: &Fonts, row: &ReportRow, y: f32) {
        let cells = [
            row.child_name.clone(),
            clock(row.sign_in),
            clock(row.sign_out),
            row.status.to_string(),
            notes_or_dash(&row.notes),
        ];
        for ((_, x, max), text) in COLUMNS.iter().zip(cells) {
            layer.use_text(truncate(&text, *max), 10.0, Mm(*x), Mm(y), &fonts.regular);
        }
    }

    fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
        let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        doc.get_page(page).get_layer(layer)
    }

    pub fn render(&self) -> Result<Vec<u8>> {
        let (doc, page1, layer1) =
            PdfDocument::new("Attendance Report", Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let fonts = Fonts {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        };

        let per_page = rows_per_page();
        let pages = page_count(self.rows.len());
        let mut layer = doc.get_page(page1).get_layer(layer1);
        let mut page_no = 1;
        self.header(&layer, &fonts);

        if self.rows.is_empty() {
            layer.use_text(
                "No attendance recorded.",
                10.0,
                Mm(LEFT),
                Mm(TABLE_TOP - ROW_H),
                &fonts.regular,
            );
        }

        for (i, row) in self.rows.iter().enumerate() {
            let slot = i % per_page;
            if i > 0 && slot == 0 {
                self.footer(&layer, &fonts, page_no, pages);
                layer = Self::new_page(&doc);
                page_no += 1;
                self.header(&layer, &fonts);
            }
            let y = TABLE_TOP - ROW_H * (slot as f32 + 1.0);
            self.row(&layer, &fonts, row, y);
        }
        self.footer(&layer, &fonts, page_no, pages);
        drop(layer);

        Ok(doc.save_to_bytes()?)
    }
}

fn page_count(rows: usize) -> usize {
    rows.div_ceil(rows_per_page()).max(1)
}

fn page_label(page: usize, pages: usize) -> String {
    format!("Page {} of {}", page, pages)
}
