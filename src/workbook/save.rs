//! Patch an XLSX ZIP archive with modified sheet XML.
//!
//! Unmodified entries are copied via `raw_copy_file` (zero recompression
//! cost, byte-identical output). Only the sheets a record actually targeted
//! get new XML generated and written.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::Result;

/// Rebuild the archive, replacing the parts in `patched` (part path ->
/// new XML bytes) and passing everything else through untouched.
///
/// Returns the new XLSX file as `Vec<u8>`.
pub(crate) fn rebuild_archive(
    original: &[u8],
    patched: &HashMap<String, Vec<u8>>,
) -> Result<Vec<u8>> {
    if patched.is_empty() {
        // Nothing changed; hand back the original container.
        return Ok(original.to_vec());
    }

    let cursor = Cursor::new(original);
    let mut archive = ZipArchive::new(cursor)?;

    let buf: Vec<u8> = Vec::with_capacity(original.len());
    let mut writer = ZipWriter::new(Cursor::new(buf));

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();

        if let Some(xml) = patched.get(name.as_str()) {
            let options =
                FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            writer.start_file(&name, options)?;
            writer.write_all(xml)?;
            continue;
        }

        // Pass through unmodified entry (raw copy, no re-compression)
        writer.raw_copy_file(entry)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Read one part of the archive into memory.
pub(crate) fn read_part(archive_bytes: &[u8], path: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut part = archive.by_name(path)?;
    let mut data = Vec::with_capacity(usize::try_from(part.size()).unwrap_or(0));
    part.read_to_end(&mut data)?;
    Ok(data)
}
