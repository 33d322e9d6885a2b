//! Stream-patching of a single worksheet XML part.
//!
//! The worksheet is treated as an event stream: everything the edit plan
//! does not address is copied through verbatim, so styles, formulas,
//! drawings, validations and row metadata survive untouched. Addressed
//! cells are replaced in place (keeping their style index); cells and rows
//! that do not exist yet are created in document order, which is how the
//! sparse get-or-create cell semantics fall out.
//!
//! Written text cells use inline strings (`t="inlineStr"`), so the shared
//! string table never needs rebuilding; numbers are bare `<v>` cells and
//! booleans `t="b"` with `0`/`1`.

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::cell_ref::{col_to_letter, CellAddress};
use crate::error::{CompfillError, Result};
use crate::records::Scalar;

/// Planned cell writes for one sheet, keyed by (row, col), 0-based.
///
/// The map key makes duplicate addresses last-write-wins and gives the
/// patcher row-major ordering for free.
#[derive(Debug, Default, Clone)]
pub(crate) struct EditPlan {
    cells: BTreeMap<(u32, u32), Scalar>,
}

impl EditPlan {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Plan a write; a later write to the same address replaces this one.
    pub(crate) fn set(&mut self, addr: CellAddress, value: Scalar) {
        self.cells.insert((addr.row(), addr.col()), value);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Rewrite one worksheet part, applying `plan`.
pub(crate) fn patch_sheet_xml(input: &[u8], plan: &EditPlan) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(input);
    let mut writer = Writer::new(Vec::with_capacity(input.len() + 256));
    let mut pending = plan.cells.clone();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let is_sheet_data = e.local_name().as_ref() == b"sheetData";
                writer.write_event(Event::Start(e))?;
                if is_sheet_data {
                    patch_sheet_data(&mut reader, &mut writer, &mut pending)?;
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"sheetData" && !pending.is_empty() {
                    // `<sheetData/>`: expand so the new rows have a home.
                    writer.write_event(Event::Start(e))?;
                    flush_rows_before(&mut writer, &mut pending, u32::MAX)?;
                    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
        buf.clear();
    }

    if !pending.is_empty() {
        // A worksheet part without <sheetData> cannot take the writes.
        return Err(CompfillError::workbook("worksheet part has no sheetData"));
    }

    Ok(writer.into_inner())
}

/// Consume events up to and including `</sheetData>`, merging `pending`
/// into the row stream.
fn patch_sheet_data(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    pending: &mut BTreeMap<(u32, u32), Scalar>,
) -> Result<()> {
    let mut buf = Vec::new();
    // Rows without an `r` attribute take the position after the previous row.
    let mut next_row: u32 = 0;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                let row_idx = row_index(&e).unwrap_or(next_row);
                next_row = row_idx.saturating_add(1);
                flush_rows_before(writer, pending, row_idx)?;

                let row_edits = take_row_edits(pending, row_idx);
                writer.write_event(Event::Start(e))?;
                if row_edits.is_empty() {
                    copy_subtree(reader, writer, b"row")?;
                } else {
                    patch_row(reader, writer, row_idx, row_edits)?;
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                let row_idx = row_index(&e).unwrap_or(next_row);
                next_row = row_idx.saturating_add(1);
                flush_rows_before(writer, pending, row_idx)?;

                let row_edits = take_row_edits(pending, row_idx);
                if row_edits.is_empty() {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    // `<row .../>` grows a body for the new cells.
                    writer.write_event(Event::Start(e))?;
                    for (col, value) in &row_edits {
                        write_cell(writer, row_idx, *col, None, value)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new("row")))?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => {
                flush_rows_before(writer, pending, u32::MAX)?;
                writer.write_event(Event::End(e))?;
                return Ok(());
            }
            Event::Eof => return Err(truncated()),
            ev => writer.write_event(ev)?,
        }
    }
}

/// Patch inside one existing `<row>`: replace addressed cells, insert the
/// rest in column order, then close the row.
fn patch_row(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    row_idx: u32,
    mut edits: BTreeMap<u32, Scalar>,
) -> Result<()> {
    let mut buf = Vec::new();
    // Cells without an `r` attribute take the position after the previous cell.
    let mut next_col: u32 = 0;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?;
        let (cell, is_start) = match event {
            Event::Start(e) if e.local_name().as_ref() == b"c" => (e, true),
            Event::Empty(e) if e.local_name().as_ref() == b"c" => (e, false),
            Event::End(e) if e.local_name().as_ref() == b"row" => {
                for (col, value) in &edits {
                    write_cell(writer, row_idx, *col, None, value)?;
                }
                writer.write_event(Event::End(e))?;
                return Ok(());
            }
            Event::Eof => return Err(truncated()),
            ev => {
                writer.write_event(ev)?;
                continue;
            }
        };

        let col = cell_column(&cell).unwrap_or(next_col);
        next_col = col.saturating_add(1);

        // Planned cells that sort before this one go in first.
        let before: Vec<u32> = edits.range(..col).map(|(&c, _)| c).collect();
        for c in before {
            if let Some(value) = edits.remove(&c) {
                write_cell(writer, row_idx, c, None, &value)?;
            }
        }

        if let Some(value) = edits.remove(&col) {
            // Replace the cell, keeping its style index but nothing else.
            let style = attribute_value(&cell, b"s");
            write_cell(writer, row_idx, col, style.as_deref(), &value)?;
            if is_start {
                skip_subtree(reader, b"c")?;
            }
        } else if is_start {
            writer.write_event(Event::Start(cell))?;
            copy_subtree(reader, writer, b"c")?;
        } else {
            writer.write_event(Event::Empty(cell))?;
        }
    }
}

/// Write out every pending row strictly before `before`, in row order.
fn flush_rows_before(
    writer: &mut Writer<Vec<u8>>,
    pending: &mut BTreeMap<(u32, u32), Scalar>,
    before: u32,
) -> Result<()> {
    loop {
        let row_idx = match pending.keys().next() {
            Some(&(row, _)) if row < before => row,
            _ => return Ok(()),
        };

        let cells = take_row_edits(pending, row_idx);
        let number = (row_idx + 1).to_string();
        let mut row = BytesStart::new("row");
        row.push_attribute(("r", number.as_str()));
        writer.write_event(Event::Start(row))?;
        for (col, value) in &cells {
            write_cell(writer, row_idx, *col, None, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
}

/// Remove and return all planned writes for one row, keyed by column.
fn take_row_edits(
    pending: &mut BTreeMap<(u32, u32), Scalar>,
    row: u32,
) -> BTreeMap<u32, Scalar> {
    let keys: Vec<(u32, u32)> = pending
        .range((row, 0)..=(row, u32::MAX))
        .map(|(&k, _)| k)
        .collect();
    let mut edits = BTreeMap::new();
    for key in keys {
        if let Some(value) = pending.remove(&key) {
            edits.insert(key.1, value);
        }
    }
    edits
}

/// Emit one `<c>` element for a planned write.
fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    row: u32,
    col: u32,
    style: Option<&str>,
    value: &Scalar,
) -> Result<()> {
    let reference = format!("{}{}", col_to_letter(col), row + 1);
    let mut c = BytesStart::new("c");
    c.push_attribute(("r", reference.as_str()));
    if let Some(style) = style {
        c.push_attribute(("s", style));
    }

    match value {
        Scalar::Text(text) => {
            c.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(c))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(BytesStart::new("t")))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
        }
        Scalar::Number(n) => {
            let rendered = n.to_string();
            writer.write_event(Event::Start(c))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(&rendered)))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
        }
        Scalar::Bool(b) => {
            c.push_attribute(("t", "b"));
            writer.write_event(Event::Start(c))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(if *b { "1" } else { "0" })))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

/// Copy events through until the matching end tag (inclusive).
fn copy_subtree(
    reader: &mut Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    name: &[u8],
) -> Result<()> {
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if e.local_name().as_ref() == name {
                    depth += 1;
                }
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                let closes = e.local_name().as_ref() == name;
                writer.write_event(Event::End(e))?;
                if closes {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
            }
            Event::Eof => return Err(truncated()),
            ev => writer.write_event(ev)?,
        }
    }
}

/// Discard events until the matching end tag (inclusive).
fn skip_subtree(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<()> {
    let mut depth = 0usize;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == name => depth += 1,
            Event::End(e) if e.local_name().as_ref() == name => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Event::Eof => return Err(truncated()),
            _ => {}
        }
    }
}

/// 0-based row index from a `<row r="...">` attribute.
fn row_index(e: &BytesStart<'_>) -> Option<u32> {
    let raw = attribute_value(e, b"r")?;
    let number: u32 = raw.parse().ok()?;
    number.checked_sub(1)
}

/// 0-based column index from a `<c r="...">` attribute.
fn cell_column(e: &BytesStart<'_>) -> Option<u32> {
    let raw = attribute_value(e, b"r")?;
    CellAddress::parse(&raw).ok().map(|addr| addr.col())
}

fn attribute_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn truncated() -> CompfillError {
    CompfillError::workbook("worksheet XML ended unexpectedly")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" s="3" t="inlineStr"><is><t>titre</t></is></c><c r="C1" s="5"><v>2</v></c></row><row r="4"><c r="C4" t="inlineStr"><is><t>avant</t></is></c></row></sheetData><pageMargins left="0.7"/></worksheet>"#;

    fn plan(writes: &[(&str, Scalar)]) -> EditPlan {
        let mut plan = EditPlan::new();
        for (reference, value) in writes {
            plan.set(CellAddress::parse(reference).unwrap(), value.clone());
        }
        plan
    }

    fn patched(writes: &[(&str, Scalar)]) -> String {
        let out = patch_sheet_xml(SHEET.as_bytes(), &plan(writes)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn replaces_existing_cell_and_keeps_style() {
        let out = patched(&[("C1", Scalar::Text("Oui".into()))]);
        assert!(out.contains(r#"<c r="C1" s="5" t="inlineStr"><is><t>Oui</t></is></c>"#));
        // The old numeric body is gone.
        assert!(!out.contains("<v>2</v>"));
    }

    #[test]
    fn untouched_content_passes_through_verbatim() {
        let out = patched(&[("C1", Scalar::Text("Oui".into()))]);
        assert!(out.contains(r#"<c r="A1" s="3" t="inlineStr"><is><t>titre</t></is></c>"#));
        assert!(out.contains(r#"<pageMargins left="0.7"/>"#));
        assert!(out.contains(r#"<row r="4"><c r="C4" t="inlineStr"><is><t>avant</t></is></c></row>"#));
    }

    #[test]
    fn inserts_cell_into_existing_row_in_column_order() {
        let out = patched(&[("B1", Scalar::Number(42.0))]);
        let a1 = out.find(r#"<c r="A1""#).unwrap();
        let b1 = out.find(r#"<c r="B1"><v>42</v></c>"#).unwrap();
        let c1 = out.find(r#"<c r="C1""#).unwrap();
        assert!(a1 < b1 && b1 < c1);
    }

    #[test]
    fn inserts_missing_row_between_existing_rows() {
        let out = patched(&[("D2", Scalar::Text("x".into()))]);
        let row1 = out.find(r#"<row r="1">"#).unwrap();
        let row2 = out.find(r#"<row r="2"><c r="D2" t="inlineStr"><is><t>x</t></is></c></row>"#)
            .unwrap();
        let row4 = out.find(r#"<row r="4">"#).unwrap();
        assert!(row1 < row2 && row2 < row4);
    }

    #[test]
    fn appends_row_past_the_last_existing_row() {
        let out = patched(&[("A9", Scalar::Bool(true))]);
        let row9 = out.find(r#"<row r="9"><c r="A9" t="b"><v>1</v></c></row>"#).unwrap();
        let end = out.find("</sheetData>").unwrap();
        assert!(row9 < end);
    }

    #[test]
    fn empty_plan_is_a_structural_noop() {
        let out = patch_sheet_xml(SHEET.as_bytes(), &EditPlan::new()).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#"<c r="C1" s="5"><v>2</v></c>"#));
        assert!(out.contains("</worksheet>"));
    }

    #[test]
    fn expands_self_closing_sheet_data() {
        let sheet = r#"<worksheet><sheetData/></worksheet>"#;
        let out = patch_sheet_xml(sheet.as_bytes(), &plan(&[("C1", Scalar::Text("Oui".into()))]))
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(
            r#"<sheetData><row r="1"><c r="C1" t="inlineStr"><is><t>Oui</t></is></c></row></sheetData>"#
        ));
    }

    #[test]
    fn escapes_written_text() {
        let out = patched(&[("C4", Scalar::Text("a < b & c".into()))]);
        assert!(out.contains("<t>a &lt; b &amp; c</t>"));
    }

    #[test]
    fn missing_sheet_data_is_an_error() {
        let sheet = r#"<worksheet><cols/></worksheet>"#;
        let result = patch_sheet_xml(sheet.as_bytes(), &plan(&[("A1", Scalar::Number(1.0))]));
        assert!(result.is_err());
    }
}
