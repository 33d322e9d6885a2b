//! Workbook manifest parsing: which sheet name lives in which ZIP part.
//!
//! Reads `xl/_rels/workbook.xml.rels` for rId -> part path, then
//! `xl/workbook.xml` for the sheet names in workbook order. Only the
//! registry is built here; sheet XML itself is never touched until a
//! record actually addresses it.

use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{CompfillError, Result};

/// One sheet as declared by the workbook part.
#[derive(Debug, Clone)]
pub(crate) struct SheetEntry {
    /// Sheet name exactly as the workbook declares it (e.g. `Comparable_1`).
    pub name: String,
    /// Full ZIP part path (e.g. `xl/worksheets/sheet3.xml`).
    pub path: String,
}

/// Everything the engine needs to know about the container's layout.
#[derive(Debug, Default)]
pub(crate) struct Manifest {
    /// Sheets in workbook order.
    pub sheets: Vec<SheetEntry>,
    /// Path to the shared-strings part, if the workbook has one.
    pub shared_strings: Option<String>,
}

/// Relationship targets parsed from `xl/_rels/workbook.xml.rels`.
#[derive(Default)]
struct WorkbookRelationships {
    /// Map of rId -> full part path for worksheet relationships.
    worksheets: HashMap<String, String>,
    shared_strings: Option<String>,
}

pub(crate) fn parse_manifest<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Manifest> {
    let rels = parse_workbook_relationships(archive)?;
    let sheets = parse_sheet_entries(archive, &rels.worksheets)?;
    Ok(Manifest {
        sheets,
        shared_strings: rels.shared_strings,
    })
}

/// Parse workbook relationships. The rels part is optional; a malformed one
/// is a malformed document.
fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<WorkbookRelationships> {
    let mut rels = WorkbookRelationships::default();

    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return Ok(rels); // Relationships part is optional
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = String::new();
                    let mut target = String::new();
                    let mut rel_type = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            b"Target" => {
                                target = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            b"Type" => {
                                rel_type = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            _ => {}
                        }
                    }

                    // Resolve target path relative to xl/
                    let full_path = if let Some(stripped) = target.strip_prefix('/') {
                        stripped.to_string()
                    } else {
                        format!("xl/{target}")
                    };

                    if rel_type.contains("worksheet") && !id.is_empty() && !target.is_empty() {
                        rels.worksheets.insert(id, full_path);
                    } else if rel_type.contains("sharedStrings") {
                        rels.shared_strings = Some(full_path);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CompfillError::workbook(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Sheet names and part paths from `xl/workbook.xml`, in declaration order.
fn parse_sheet_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Result<Vec<SheetEntry>> {
    let file = archive
        .by_name("xl/workbook.xml")
        .map_err(|_| CompfillError::workbook("missing xl/workbook.xml"))?;

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let mut name = String::new();
                    let mut r_id = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            // r:id attribute (namespace prefixed)
                            key if key.ends_with(b":id") || key == b"id" => {
                                r_id = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            _ => {}
                        }
                    }

                    if !name.is_empty() {
                        // Prefer the rels mapping, fall back to the
                        // conventional path when the rels part is absent.
                        let path = relationships.get(&r_id).cloned().unwrap_or_else(|| {
                            let idx = sheets.len() + 1;
                            let fallback = format!("xl/worksheets/sheet{idx}.xml");
                            log::warn!("sheet {name:?} has no relationship target, assuming {fallback}");
                            fallback
                        });
                        sheets.push(SheetEntry { name, path });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CompfillError::workbook(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}
