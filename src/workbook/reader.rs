//! Read-side view of a worksheet: cell values by A1 address.
//!
//! Backs the CLI summary and the integration tests' assertions. This is a
//! value snapshot, not a full model: shared strings are resolved, booleans
//! rendered `TRUE`/`FALSE`, everything else reported as the raw stored
//! text. Styles, formulas and layout are not surfaced here.

use std::collections::BTreeMap;
use std::io::{BufReader, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::cell_ref::CellAddress;
use crate::error::Result;

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone)]
enum CellTypeTag {
    Shared,
    Bool,
    Other,
}

fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        _ => CellTypeTag::Other,
    }
}

/// Parse the shared string table. Absent table means no shared strings.
pub(crate) fn parse_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Vec<String> {
    let sst_path = path.unwrap_or("xl/sharedStrings.xml");
    let Ok(file) = archive.by_name(sst_path) else {
        return Vec::new();
    };

    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(current.clone());
                    in_si = false;
                }
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    strings
}

/// Extract every non-empty cell value from one worksheet part.
pub(crate) fn sheet_values(
    sheet_xml: &[u8],
    shared_strings: &[String],
) -> Result<BTreeMap<String, String>> {
    let mut xml = Reader::from_reader(sheet_xml);

    let mut values = BTreeMap::new();
    let mut buf = Vec::new();

    let mut current: Option<(String, CellTypeTag)> = None;
    let mut text: Option<String> = None;
    let mut capture = false;
    let mut in_is = false;

    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                // Flush the previous cell when `<c>` elements are siblings
                // without an enclosing End event in between (self-closing).
                flush_cell(&mut values, &mut current, &mut text, shared_strings);

                let mut reference = None;
                let mut tag = CellTypeTag::Other;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"r" => {
                            let raw = String::from_utf8_lossy(&attr.value);
                            reference = CellAddress::parse(&raw).ok().map(|a| a.to_string());
                        }
                        b"t" => tag = parse_cell_type_tag(&attr.value),
                        _ => {}
                    }
                }
                if let Some(reference) = reference {
                    current = Some((reference, tag));
                }
            }
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"v" => capture = current.is_some(),
                b"is" => in_is = true,
                b"t" if in_is => capture = current.is_some(),
                _ => {}
            },
            Event::Text(ref e) if capture => {
                if let Ok(unescaped) = e.unescape() {
                    text.get_or_insert_with(String::new).push_str(&unescaped);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"is" => in_is = false,
                b"c" => flush_cell(&mut values, &mut current, &mut text, shared_strings),
                b"sheetData" => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(values)
}

/// Resolve and store the finished cell, if it produced a value.
fn flush_cell(
    values: &mut BTreeMap<String, String>,
    current: &mut Option<(String, CellTypeTag)>,
    text: &mut Option<String>,
    shared_strings: &[String],
) {
    let Some((reference, tag)) = current.take() else {
        *text = None;
        return;
    };
    let Some(raw) = text.take() else {
        return;
    };

    let resolved = match tag {
        CellTypeTag::Shared => raw
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx).cloned())
            .unwrap_or_default(),
        CellTypeTag::Bool => {
            if raw.trim() == "0" {
                "FALSE".to_string()
            } else {
                "TRUE".to_string()
            }
        }
        CellTypeTag::Other => raw,
    };

    values.insert(reference, resolved);
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

    #[test]
    fn reads_inline_shared_numeric_and_boolean_cells() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1">
                <c r="A1" t="s"><v>1</v></c>
                <c r="B1" t="inlineStr"><is><t>inline</t></is></c>
                <c r="C1"><v>417000</v></c>
                <c r="D1" t="b"><v>1</v></c>
                <c r="E1" s="2"/>
            </row>
        </sheetData></worksheet>"#;
        let shared = vec!["zero".to_string(), "one".to_string()];

        let values = sheet_values(sheet.as_bytes(), &shared).unwrap();
        assert_eq!(values.get("A1").map(String::as_str), Some("one"));
        assert_eq!(values.get("B1").map(String::as_str), Some("inline"));
        assert_eq!(values.get("C1").map(String::as_str), Some("417000"));
        assert_eq!(values.get("D1").map(String::as_str), Some("TRUE"));
        // Style-only cell carries no value.
        assert_eq!(values.get("E1"), None);
    }

    #[test]
    fn concatenates_rich_text_runs() {
        let sheet = r#"<worksheet><sheetData><row r="1">
            <c r="A1" t="inlineStr"><is><r><t>riche</t></r><r><t> texte</t></r></is></c>
        </row></sheetData></worksheet>"#;
        let values = sheet_values(sheet.as_bytes(), &[]).unwrap();
        assert_eq!(values.get("A1").map(String::as_str), Some("riche texte"));
    }

    #[test]
    fn formula_text_is_not_mistaken_for_a_value() {
        let sheet = r#"<worksheet><sheetData><row r="1">
            <c r="A1"><f>SUM(B1:B9)</f><v>12</v></c>
        </row></sheetData></worksheet>"#;
        let values = sheet_values(sheet.as_bytes(), &[]).unwrap();
        assert_eq!(values.get("A1").map(String::as_str), Some("12"));
    }
}
