use std::path::Path;

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent};
use docx_rs::{TableChild, TableRowChild};

use super::ExtractionError;

pub(super) fn extract_pdf(path: &Path) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(ExtractionError::Pdf)
}

/// Raw text of the whole document body: paragraphs, table cells and hyperlink labels,
/// one line per paragraph.
pub(super) fn extract_docx(path: &Path) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)?;
    let docx = docx_rs::read_docx(&bytes).map_err(ExtractionError::Docx)?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => push_paragraph(&mut text, paragraph),
            DocumentChild::Table(table) => push_table(&mut text, table),
            _ => {}
        }
    }
    Ok(text)
}

fn push_paragraph(out: &mut String, paragraph: &Paragraph) {
    push_inline(out, &paragraph.children);
    out.push('\n');
}

fn push_inline(out: &mut String, children: &[ParagraphChild]) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    match run_child {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_inline(out, &link.children),
            _ => {}
        }
    }
}

fn push_table(out: &mut String, table: &Table) {
    for TableChild::TableRow(row) in &table.rows {
        for TableRowChild::TableCell(cell) in &row.cells {
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => push_paragraph(out, paragraph),
                    TableCellContent::Table(nested) => push_table(out, nested),
                    _ => {}
                }
            }
        }
    }
}
