use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::core::model::MalformedPolicy;
use crate::export::html_gallery_export::{
    HtmlGalleryExporter, DEFAULT_KNOWLEDGE_URL_TEMPLATE, DEFAULT_TITLE,
};
use crate::export::json_export::ManifestExporter;
use crate::export::Exporter;
use crate::gallery::resolve::{DEFAULT_IMAGE_BASE_URL, DEFAULT_ITEM_URL_TEMPLATE};
use crate::gallery::{
    discover_results, paginate, Gallery, OverrideTable, ResultLoader, UrlResolver,
    DEFAULT_PAGE_SIZE,
};

#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Directory holding the `*.json` result documents.
    pub input: PathBuf,
    pub output: PathBuf,
    /// Where local copies of the images live; defaults to `input`.
    pub image_dir: PathBuf,
    pub image_extension: String,
    pub page_size: usize,
    pub overrides: Option<PathBuf>,
    pub image_base_url: String,
    pub item_url_template: String,
    pub knowledge_url_template: String,
    pub title: String,
    pub policy: MalformedPolicy,
    pub require_local_images: bool,
    pub inline_assets: bool,
}

impl GalleryConfig {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self {
            image_dir: input.clone(),
            input,
            output,
            image_extension: "png".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            overrides: None,
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            item_url_template: DEFAULT_ITEM_URL_TEMPLATE.to_string(),
            knowledge_url_template: DEFAULT_KNOWLEDGE_URL_TEMPLATE.to_string(),
            title: DEFAULT_TITLE.to_string(),
            policy: MalformedPolicy::default(),
            require_local_images: true,
            inline_assets: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page size must be at least 1");
        }
        if self.image_extension.is_empty() {
            anyhow::bail!("image extension must not be empty");
        }
        Ok(())
    }
}

/// Discover, load, paginate and resolve every result document.
pub fn build_gallery(config: &GalleryConfig) -> Result<Gallery> {
    config.validate()?;

    let overrides = match &config.overrides {
        Some(path) => {
            let table = OverrideTable::load(path, config.policy)?;
            info!("loaded {} overrides from {}", table.len(), path.display());
            table
        }
        None => OverrideTable::empty(),
    };

    let loader = ResultLoader::new(config.policy, config.image_extension.clone());
    let mut results = Vec::new();
    for path in discover_results(&config.input)? {
        results.push(loader.load(&path)?);
    }
    info!(
        "found {} result documents in {}",
        results.len(),
        config.input.display()
    );

    let resolver = UrlResolver::new(overrides, config.image_dir.clone())
        .with_image_base_url(config.image_base_url.clone())
        .with_item_url_template(config.item_url_template.clone())
        .with_require_local_images(config.require_local_images);

    let pages = paginate(results, config.page_size)?
        .into_iter()
        .map(|page| resolver.resolve_page(page))
        .collect();

    Ok(Gallery { pages })
}

pub fn export_gallery(gallery: &Gallery, config: &GalleryConfig) -> Result<()> {
    let html_exporter = HtmlGalleryExporter::new(config.output.clone())
        .with_title(config.title.clone())
        .with_knowledge_url_template(config.knowledge_url_template.clone())
        .with_inline_assets(config.inline_assets);
    html_exporter
        .export(gallery)
        .with_context(|| format!("failed to write pages to {}", config.output.display()))?;

    let manifest_exporter = ManifestExporter::new(config.output.clone());
    manifest_exporter.export(gallery)?;

    Ok(())
}
