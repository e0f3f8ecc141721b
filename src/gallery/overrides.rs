use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::error::AnnotationError;
use crate::core::model::{ImageSource, MalformedPolicy};
use crate::gallery::loader::admit_malformed;

/// Authoritative URLs for specific images, keyed by image filename.
///
/// The file format is one record per line:
/// `filename<TAB>itemPageUrl<TAB>imageUrl`. Blank lines and `#` comments are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: HashMap<String, ImageSource>,
}

impl OverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path, policy: MalformedPolicy) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read override table {}", path.display()))?;
        Self::parse(&contents, &path.display().to_string(), policy)
    }

    pub fn parse(contents: &str, source: &str, policy: MalformedPolicy) -> Result<Self> {
        let mut entries = HashMap::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            match fields.as_slice() {
                [filename, item_page_url, image_url] => {
                    entries.insert(
                        filename.to_string(),
                        ImageSource {
                            item_page_url: item_page_url.to_string(),
                            image_url: image_url.to_string(),
                        },
                    );
                }
                _ => admit_malformed(
                    policy,
                    source,
                    AnnotationError::OverrideFields {
                        line: idx + 1,
                        found: fields.len(),
                    },
                )?,
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, filename: &str) -> Option<&ImageSource> {
        self.entries.get(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
