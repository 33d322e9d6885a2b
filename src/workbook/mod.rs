//! The XLSX container, seen as narrowly as this crate needs it.
//!
//! A loaded [`Workbook`] is the original bytes plus the sheet registry
//! (name -> ZIP part path). Mutation happens by stream-patching the
//! targeted sheet parts and rebuilding the archive around them; parts no
//! record touches are carried over byte-identical.

pub(crate) mod manifest;
pub(crate) mod reader;
pub(crate) mod save;
pub(crate) mod sheet_patch;

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use zip::ZipArchive;

use crate::error::{CompfillError, Result};

pub(crate) use sheet_patch::EditPlan;

/// A loaded workbook, valid for the duration of one apply call.
#[derive(Debug)]
pub struct Workbook {
    data: Vec<u8>,
    manifest: manifest::Manifest,
}

impl Workbook {
    /// Open the container and read the sheet registry.
    ///
    /// Fails with the invalid-document fault when the bytes are not a
    /// readable XLSX archive or the workbook manifest cannot be parsed.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data)).map_err(CompfillError::workbook)?;
        let manifest = manifest::parse_manifest(&mut archive)?;
        Ok(Self {
            data: data.to_vec(),
            manifest,
        })
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.manifest.sheets.iter().map(|s| s.name.as_str())
    }

    /// ZIP part path for an exactly-matching sheet name.
    pub(crate) fn sheet_path(&self, name: &str) -> Option<&str> {
        self.manifest
            .sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.path.as_str())
    }

    /// Whether the workbook declares a sheet with this exact name.
    #[must_use]
    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet_path(name).is_some()
    }

    /// Snapshot of one sheet's cell values, shared strings resolved.
    ///
    /// Returns `None` for a sheet the workbook does not declare.
    pub fn sheet_values(&self, name: &str) -> Result<Option<BTreeMap<String, String>>> {
        let Some(path) = self.sheet_path(name) else {
            return Ok(None);
        };

        let mut archive = ZipArchive::new(Cursor::new(self.data.as_slice()))?;
        let shared =
            reader::parse_shared_strings(&mut archive, self.manifest.shared_strings.as_deref());
        drop(archive);

        let xml = save::read_part(&self.data, path)?;
        reader::sheet_values(&xml, &shared).map(Some)
    }

    /// Apply the planned edits and re-serialize the container.
    pub(crate) fn save_with(&self, patches: &[(String, EditPlan)]) -> Result<Vec<u8>> {
        let mut patched: HashMap<String, Vec<u8>> = HashMap::new();
        for (path, plan) in patches {
            if plan.is_empty() {
                continue;
            }
            let xml = save::read_part(&self.data, path)?;
            patched.insert(path.clone(), sheet_patch::patch_sheet_xml(&xml, plan)?);
        }
        save::rebuild_archive(&self.data, &patched)
    }
}
