// src/export.rs

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};

use crate::quiz::ReportRow;

const COLUMNS: [(&str, f64); 7] = [
    ("Student Name", 28.0),
    ("Register Number", 18.0),
    ("Class", 14.0),
    ("Quiz Topic", 32.0),
    ("Score", 10.0),
    ("Time Taken", 12.0),
    ("Completed At", 22.0),
];

/// Renders report rows into a single-sheet workbook named "Results".
pub fn render_report_xlsx(rows: &[ReportRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Results")?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x0F172A))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);
    let cell_format = Format::new().set_border(FormatBorder::Thin);
    let center_format = Format::new()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);

    for (col, (name, width)) in COLUMNS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
        worksheet.write_string_with_format(0, col as u16, *name, &header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (idx, r) in rows.iter().enumerate() {
        let row = (idx + 1) as u32;
        worksheet.write_string_with_format(row, 0, &r.student_name, &cell_format)?;
        worksheet.write_string_with_format(row, 1, &r.register_number, &center_format)?;
        worksheet.write_string_with_format(row, 2, &r.cohort, &center_format)?;
        worksheet.write_string_with_format(row, 3, &r.quiz_title, &cell_format)?;
        worksheet.write_string_with_format(row, 4, &r.score_fraction, &center_format)?;
        worksheet.write_string_with_format(row, 5, &r.time_taken_formatted, &center_format)?;
        worksheet.write_string_with_format(row, 6, &r.completed_at_formatted, &center_format)?;
    }

    if !rows.is_empty() {
        worksheet.autofilter(0, 0, rows.len() as u32, (COLUMNS.len() - 1) as u16)?;
    }

    workbook.save_to_buffer()
}
