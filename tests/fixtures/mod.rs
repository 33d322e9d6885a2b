//! Test fixtures for generating valid XLSX files in memory.
//!
//! A much smaller cousin of a full workbook writer: enough structure
//! (content types, rels, workbook manifest, styles, shared strings,
//! worksheets) for the engine to load, patch and re-serialize the result.
//!
//! # Example
//!
//! ```rust
//! let xlsx = WorkbookBuilder::new()
//!     .sheet("Comparable_1")
//!     .cell("C4", "pre-existing")
//!     .cell("C5", 417000.0)
//!     .build();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

use compfill::CellAddress;

// ============================================================================
// Cell values
// ============================================================================

/// A cell value the builder can emit.
#[derive(Debug, Clone)]
pub enum CellValue {
    /// A string stored in the shared string table (`t="s"`).
    Shared(String),
    /// An inline string (`t="inlineStr"`).
    Inline(String),
    /// A numeric value.
    Number(f64),
    /// A boolean value.
    Bool(bool),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Shared(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

// ============================================================================
// Workbook builder
// ============================================================================

struct CellEntry {
    reference: String,
    value: CellValue,
    style: Option<u32>,
}

struct SheetDef {
    name: String,
    cells: Vec<CellEntry>,
}

/// Builder for a complete in-memory workbook.
#[derive(Default)]
pub struct WorkbookBuilder {
    sheets: Vec<SheetDef>,
}

impl WorkbookBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new (possibly empty) sheet; subsequent cells land on it.
    #[must_use]
    pub fn sheet(mut self, name: &str) -> Self {
        self.sheets.push(SheetDef {
            name: name.to_string(),
            cells: Vec::new(),
        });
        self
    }

    /// Add a cell to the current sheet.
    #[must_use]
    pub fn cell(self, reference: &str, value: impl Into<CellValue>) -> Self {
        self.push_cell(reference, value.into(), None)
    }

    /// Add a cell with an explicit style index to the current sheet.
    #[must_use]
    pub fn styled_cell(self, reference: &str, value: impl Into<CellValue>, style: u32) -> Self {
        self.push_cell(reference, value.into(), Some(style))
    }

    fn push_cell(mut self, reference: &str, value: CellValue, style: Option<u32>) -> Self {
        let sheet = self.sheets.last_mut().expect("call .sheet() first");
        sheet.cells.push(CellEntry {
            reference: reference.to_string(),
            value,
            style,
        });
        self
    }

    /// Assemble the XLSX archive.
    pub fn build(self) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        // Collect shared strings across all sheets, in first-use order.
        let mut shared: Vec<String> = Vec::new();
        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let CellValue::Shared(ref s) = cell.value {
                    if !shared.contains(s) {
                        shared.push(s.clone());
                    }
                }
            }
        }

        let _ = zip.start_file("[Content_Types].xml", options);
        let _ = zip.write_all(content_types(self.sheets.len()).as_bytes());

        let _ = zip.start_file("_rels/.rels", options);
        let _ = zip.write_all(ROOT_RELS.as_bytes());

        let _ = zip.start_file("xl/_rels/workbook.xml.rels", options);
        let _ = zip.write_all(workbook_rels(self.sheets.len()).as_bytes());

        let _ = zip.start_file("xl/workbook.xml", options);
        let _ = zip.write_all(workbook_xml(&self.sheets).as_bytes());

        let _ = zip.start_file("xl/styles.xml", options);
        let _ = zip.write_all(STYLES_XML.as_bytes());

        let _ = zip.start_file("xl/sharedStrings.xml", options);
        let _ = zip.write_all(shared_strings_xml(&shared).as_bytes());

        for (idx, sheet) in self.sheets.iter().enumerate() {
            let _ = zip.start_file(format!("xl/worksheets/sheet{}.xml", idx + 1), options);
            let _ = zip.write_all(sheet_xml(sheet, &shared).as_bytes());
        }

        zip.finish().expect("zip finish").into_inner()
    }
}

// ============================================================================
// Part generators
// ============================================================================

fn content_types(sheet_count: usize) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    out.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    out.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    out.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    for idx in 1..=sheet_count {
        out.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{idx}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    out.push_str("</Types>");
    out
}

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#
);

fn workbook_rels(sheet_count: usize) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for idx in 1..=sheet_count {
        out.push_str(&format!(
            r#"<Relationship Id="rId{idx}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{idx}.xml"/>"#
        ));
    }
    out.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    ));
    out.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        sheet_count + 2
    ));
    out.push_str("</Relationships>");
    out
}

fn workbook_xml(sheets: &[SheetDef]) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    out.push_str("<sheets>");
    for (idx, sheet) in sheets.iter().enumerate() {
        out.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            xml_escape(&sheet.name),
            idx + 1,
            idx + 1
        ));
    }
    out.push_str("</sheets></workbook>");
    out
}

const STYLES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font>"#,
    r#"<font><b/><sz val="11"/><name val="Calibri"/></font></fonts>"#,
    r#"<fills count="1"><fill><patternFill patternType="none"/></fill></fills>"#,
    r#"<borders count="1"><border/></borders>"#,
    r#"<cellXfs count="2"><xf fontId="0"/><xf fontId="1" applyFont="1"/></cellXfs>"#,
    r#"</styleSheet>"#
);

fn shared_strings_xml(shared: &[String]) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push_str(&format!(
        r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        shared.len()
    ));
    for s in shared {
        out.push_str(&format!("<si><t>{}</t></si>", xml_escape(s)));
    }
    out.push_str("</sst>");
    out
}

fn sheet_xml(sheet: &SheetDef, shared: &[String]) -> String {
    // Row-major order, as a real producer writes it.
    let mut cells: Vec<(CellAddress, &CellEntry)> = sheet
        .cells
        .iter()
        .map(|cell| (CellAddress::parse(&cell.reference).expect("fixture cell ref"), cell))
        .collect();
    cells.sort_by_key(|(addr, _)| (addr.row(), addr.col()));

    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );
    out.push_str("<sheetData>");

    let mut current_row: Option<u32> = None;
    for (addr, cell) in cells {
        if current_row != Some(addr.row()) {
            if current_row.is_some() {
                out.push_str("</row>");
            }
            out.push_str(&format!(r#"<row r="{}">"#, addr.row() + 1));
            current_row = Some(addr.row());
        }

        let style = cell
            .style
            .map(|s| format!(r#" s="{s}""#))
            .unwrap_or_default();
        match &cell.value {
            CellValue::Shared(s) => {
                let idx = shared.iter().position(|x| x == s).expect("collected");
                out.push_str(&format!(
                    r#"<c r="{}"{style} t="s"><v>{idx}</v></c>"#,
                    cell.reference
                ));
            }
            CellValue::Inline(s) => {
                out.push_str(&format!(
                    r#"<c r="{}"{style} t="inlineStr"><is><t>{}</t></is></c>"#,
                    cell.reference,
                    xml_escape(s)
                ));
            }
            CellValue::Number(n) => {
                out.push_str(&format!(r#"<c r="{}"{style}><v>{n}</v></c>"#, cell.reference));
            }
            CellValue::Bool(b) => {
                out.push_str(&format!(
                    r#"<c r="{}"{style} t="b"><v>{}</v></c>"#,
                    cell.reference,
                    u8::from(*b)
                ));
            }
        }
    }
    if current_row.is_some() {
        out.push_str("</row>");
    }

    out.push_str("</sheetData>");
    out.push_str(r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#);
    out.push_str("</worksheet>");
    out
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Archive inspection helpers
// ============================================================================

/// Raw bytes of one part of an archive.
pub fn read_part(archive: &[u8], path: &str) -> Vec<u8> {
    use std::io::Read;
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("open archive");
    let mut part = zip.by_name(path).expect("part present");
    let mut data = Vec::new();
    part.read_to_end(&mut data).expect("read part");
    data
}

/// Entry names of an archive, in stored order.
pub fn part_names(archive: &[u8]) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("open archive");
    (0..zip.len())
        .map(|i| zip.by_index_raw(i).expect("entry").name().to_string())
        .collect()
}
