use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::export::Exporter;
use crate::gallery::{Gallery, MANIFEST_FILE};

/// Machine-readable record of what each page contains and what was skipped.
#[derive(Debug, Clone)]
pub struct ManifestExporter {
    out_dir: PathBuf,
}

impl ManifestExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for ManifestExporter {
    fn export(&self, gallery: &Gallery) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(MANIFEST_FILE);
        let data = serde_json::to_string_pretty(gallery)?;
        fs::write(path, data)?;
        Ok(())
    }
}
