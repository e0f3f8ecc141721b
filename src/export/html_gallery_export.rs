use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use log::info;

use crate::core::geometry::OverlayRect;
use crate::core::model::{EntityAnnotation, TextAnnotation};
use crate::export::Exporter;
use crate::gallery::{Gallery, GalleryPage, GalleryRow};

pub const SCRIPT_FILE: &str = "gallery.js";
pub const STYLE_FILE: &str = "gallery.css";
pub const INDEX_FILE: &str = "index.html";

const SCRIPT: &str = include_str!("assets/gallery.js");
const STYLE: &str = include_str!("assets/gallery.css");

pub const DEFAULT_TITLE: &str = "CV API Result Gallery";
pub const DEFAULT_KNOWLEDGE_URL_TEMPLATE: &str = "https://www.google.com/search?kgmid={id}";

pub fn page_file_name(number: usize) -> String {
    format!("index-{number}.html")
}

/// Inverse of [`page_file_name`].
fn page_number(file_name: &str) -> Option<usize> {
    let digits = file_name.strip_prefix("index-")?.strip_suffix(".html")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Writes `index-N.html` per page, `index.html`, and the shared assets.
#[derive(Debug, Clone)]
pub struct HtmlGalleryExporter {
    out_dir: PathBuf,
    title: String,
    knowledge_url_template: String,
    inline_assets: bool,
}

impl HtmlGalleryExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            title: DEFAULT_TITLE.to_string(),
            knowledge_url_template: DEFAULT_KNOWLEDGE_URL_TEMPLATE.to_string(),
            inline_assets: false,
        }
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = title;
        self
    }

    /// `{id}` is replaced by the annotation's knowledge-graph id.
    pub fn with_knowledge_url_template(mut self, template: String) -> Self {
        self.knowledge_url_template = template;
        self
    }

    /// Embed script and style in every page instead of linking shared files.
    pub fn with_inline_assets(mut self, inline: bool) -> Self {
        self.inline_assets = inline;
        self
    }

    fn head(&self, title: &str) -> String {
        let style = if self.inline_assets {
            format!("<style>\n{STYLE}</style>")
        } else {
            format!(r#"<link rel="stylesheet" href="{STYLE_FILE}">"#)
        };
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
{style}
</head>"#,
            title = text(title),
        )
    }

    fn script(&self) -> String {
        if self.inline_assets {
            format!("<script>\n{SCRIPT}</script>")
        } else {
            format!(r#"<script src="{SCRIPT_FILE}"></script>"#)
        }
    }

    fn entity_items(&self, entities: &[EntityAnnotation]) -> String {
        entities
            .iter()
            .map(|entity| {
                let description = text(&entity.description);
                let body = match &entity.knowledge_graph_id {
                    Some(id) => {
                        let href = self.knowledge_url_template.replace("{id}", id);
                        format!(r#"<a href="{}">{description}</a>"#, attr(&href))
                    }
                    None => description.into_owned(),
                };
                format!(r#"<li title="{}">{body}</li>"#, entity.score_label())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_row(&self, row: &GalleryRow) -> Result<String> {
        let text_items = row
            .result
            .text
            .iter()
            .map(|annotation| text_item(annotation, row.natural_size))
            .collect::<Result<Vec<_>>>()?
            .join("\n");

        Ok(format!(
            r#"<tr id="{id}">
<td class="image"><a class="image-wrapper" href="{href}"><img src="{src}" alt="{id}"></a></td>
<td class="landmarks"><ul>{landmarks}</ul></td>
<td class="labels"><ul>{labels}</ul></td>
<td class="text"><ul>{text_items}</ul></td>
</tr>"#,
            id = attr(&row.result.image_id),
            href = attr(&row.source.item_page_url),
            src = attr(&row.source.image_url),
            landmarks = self.entity_items(&row.result.landmarks),
            labels = self.entity_items(&row.result.labels),
        ))
    }

    pub fn render_page(&self, page: &GalleryPage, total_pages: usize) -> Result<String> {
        let rows = page
            .rows
            .iter()
            .map(|row| self.render_row(row))
            .collect::<Result<Vec<_>>>()?
            .join("\n");
        let nav = pager(page.number, total_pages);
        let title = format!("{} - page {} of {}", self.title, page.number, total_pages);

        Ok(format!(
            r#"{head}
<body>
<h1>{heading}</h1>
{nav}
<table id="results">
<tbody>
{rows}
</tbody>
</table>
{nav}
{script}
</body>
</html>
"#,
            head = self.head(&title),
            heading = text(&title),
            script = self.script(),
        ))
    }

    pub fn render_index(&self, gallery: &Gallery) -> String {
        let items = gallery
            .pages
            .iter()
            .map(|page| {
                format!(
                    r#"<li><a href="{file}">Page {number}</a> ({rows} images)</li>"#,
                    file = page_file_name(page.number),
                    number = page.number,
                    rows = page.rows.len(),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"{head}
<body>
<h1>{heading}</h1>
<ul class="pages">
{items}
</ul>
</body>
</html>
"#,
            head = self.head(&self.title),
            heading = text(&self.title),
        )
    }
}

fn text_item(annotation: &TextAnnotation, natural_size: Option<(u32, u32)>) -> Result<String> {
    let poly = serde_json::to_string(&annotation.bounding_poly)?;
    let overlay = natural_size
        .and_then(|(w, h)| OverlayRect::from_poly(&annotation.bounding_poly, w, h))
        .map(|rect| format!(r#" data-overlay="{}""#, rect.to_attr()))
        .unwrap_or_default();
    let lang = if annotation.locale.is_empty() {
        String::new()
    } else {
        format!(r#" lang="{}""#, attr(&annotation.locale))
    };
    Ok(format!(
        r#"<li{lang} data-bounding-poly="{poly}"{overlay}>{description}</li>"#,
        poly = attr(&poly),
        description = text(&annotation.description),
    ))
}

fn pager(number: usize, total_pages: usize) -> String {
    let mut links = Vec::new();
    if number > 1 {
        links.push(format!(
            r#"<a rel="prev" href="{}">&larr; Previous</a>"#,
            page_file_name(number - 1)
        ));
    }
    links.push(format!(r#"<a href="{INDEX_FILE}">All pages</a>"#));
    if number < total_pages {
        links.push(format!(
            r#"<a rel="next" href="{}">Next &rarr;</a>"#,
            page_file_name(number + 1)
        ));
    }
    format!(r#"<nav class="pager">{}</nav>"#, links.join(" "))
}

impl Exporter for HtmlGalleryExporter {
    fn export(&self, gallery: &Gallery) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        if !self.inline_assets {
            fs::write(self.out_dir.join(SCRIPT_FILE), SCRIPT)?;
            fs::write(self.out_dir.join(STYLE_FILE), STYLE)?;
        }

        let total = gallery.page_count();
        for page in &gallery.pages {
            let path = self.out_dir.join(page_file_name(page.number));
            info!(
                "generating {} ({} rows, {} skipped)",
                path.display(),
                page.rows.len(),
                page.skipped.len()
            );
            fs::write(&path, self.render_page(page, total)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        fs::write(self.out_dir.join(INDEX_FILE), self.render_index(gallery))?;
        self.remove_stale_pages(total)
    }
}

impl HtmlGalleryExporter {
    /// Deletes pages left over from an earlier run that had more of them.
    fn remove_stale_pages(&self, total: usize) -> Result<()> {
        let entries = fs::read_dir(&self.out_dir)
            .with_context(|| format!("failed to list {}", self.out_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            let stale = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(page_number)
                .is_some_and(|number| number > total);
            if stale && path.is_file() {
                info!("removing stale page {}", path.display());
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{BoundingPoly, Vertex};
    use crate::core::model::{AnnotationResult, ImageSource};
    use html_escape::decode_html_entities;
    use pretty_assertions::assert_eq;

    fn poly() -> BoundingPoly {
        BoundingPoly::new([
            Vertex::new(10, 10),
            Vertex::new(50, 10),
            Vertex::new(50, 40),
            Vertex::new(10, 40),
        ])
    }

    fn row(description: &str) -> GalleryRow {
        GalleryRow {
            result: AnnotationResult {
                image_id: "7".to_string(),
                sort_key: vec![7],
                source_filename: "7.png".to_string(),
                text: vec![TextAnnotation {
                    locale: "en".to_string(),
                    description: description.to_string(),
                    bounding_poly: poly(),
                }],
                landmarks: vec![EntityAnnotation {
                    description: "Tower".to_string(),
                    score: 0.5,
                    knowledge_graph_id: Some("/m/02j81".to_string()),
                }],
                labels: vec![EntityAnnotation {
                    description: description.to_string(),
                    score: 0.25,
                    knowledge_graph_id: None,
                }],
            },
            source: ImageSource {
                item_page_url: "https://example.org/item/7?a=1&b=2".to_string(),
                image_url: "https://example.org/7.png".to_string(),
            },
            natural_size: None,
        }
    }

    fn page(number: usize, rows: Vec<GalleryRow>) -> GalleryPage {
        GalleryPage {
            number,
            rows,
            skipped: vec![],
        }
    }

    #[test]
    fn escapes_markup_in_descriptions() -> Result<()> {
        let hostile = r#"<script>alert("x")</script> & co"#;
        let html = HtmlGalleryExporter::new(PathBuf::from(".")).render_row(&row(hostile))?;

        assert!(!html.contains("<script>"));
        let escaped = text(hostile);
        assert!(html.contains(&*escaped));
        assert_eq!(decode_html_entities(&escaped), hostile);
        assert!(html.contains(r#"href="https://example.org/item/7?a=1&amp;b=2""#));
        Ok(())
    }

    #[test]
    fn bounding_poly_is_quoted_json() -> Result<()> {
        let html = HtmlGalleryExporter::new(PathBuf::from(".")).render_row(&row("Hi"))?;
        let expected = attr(&serde_json::to_string(&poly())?).into_owned();
        assert!(expected.contains("&quot;vertices&quot;"));
        assert!(html.contains(&format!(r#"<li lang="en" data-bounding-poly="{expected}">Hi</li>"#)));

        let decoded = decode_html_entities(&expected);
        let parsed: BoundingPoly = serde_json::from_str(&decoded)?;
        assert_eq!(parsed, poly());
        Ok(())
    }

    #[test]
    fn precomputes_overlay_when_size_known() -> Result<()> {
        let mut sized = row("Hi");
        sized.natural_size = Some((100, 100));
        let html = HtmlGalleryExporter::new(PathBuf::from(".")).render_row(&sized)?;
        assert!(html.contains(r#"data-overlay="10,10,40,30""#));
        Ok(())
    }

    #[test]
    fn entities_carry_score_and_knowledge_link() -> Result<()> {
        let html = HtmlGalleryExporter::new(PathBuf::from(".")).render_row(&row("street"))?;
        assert!(html.contains(
            r#"<li title="50.00%"><a href="https://www.google.com/search?kgmid=/m/02j81">Tower</a></li>"#
        ));
        assert!(html.contains(r#"<li title="25.00%">street</li>"#));
        Ok(())
    }

    #[test]
    fn pager_only_links_existing_pages() {
        let first = pager(1, 3);
        assert!(!first.contains(r#"rel="prev""#));
        assert!(first.contains(r#"<a rel="next" href="index-2.html">"#));

        let middle = pager(2, 3);
        assert!(middle.contains(r#"<a rel="prev" href="index-1.html">"#));
        assert!(middle.contains(r#"<a rel="next" href="index-3.html">"#));

        let last = pager(3, 3);
        assert!(last.contains(r#"rel="prev""#));
        assert!(!last.contains(r#"rel="next""#));

        let only = pager(1, 1);
        assert!(!only.contains("rel="));
    }

    #[test]
    fn page_links_shared_assets_by_default() -> Result<()> {
        let exporter = HtmlGalleryExporter::new(PathBuf::from("."));
        let html = exporter.render_page(&page(1, vec![row("Hi")]), 1)?;
        assert!(html.contains(r#"<script src="gallery.js"></script>"#));
        assert!(html.contains(r#"<link rel="stylesheet" href="gallery.css">"#));
        assert_eq!(html.matches(r#"<nav class="pager">"#).count(), 2);

        let inline = exporter.with_inline_assets(true);
        let html = inline.render_page(&page(1, vec![row("Hi")]), 1)?;
        assert!(!html.contains("gallery.js"));
        assert!(html.contains("function highlightTextBox"));
        Ok(())
    }

    #[test]
    fn page_number_reads_back_file_name() {
        assert_eq!(page_number(&page_file_name(12)), Some(12));
        assert_eq!(page_number("index.html"), None);
        assert_eq!(page_number("index-.html"), None);
        assert_eq!(page_number("index-+3.html"), None);
        assert_eq!(page_number("index-2.html.bak"), None);
    }

    #[test]
    fn index_lists_every_page() {
        let gallery = Gallery {
            pages: vec![page(1, vec![row("a"), row("b")]), page(2, vec![row("c")])],
        };
        let html = HtmlGalleryExporter::new(PathBuf::from(".")).render_index(&gallery);
        assert!(html.contains(r#"<a href="index-1.html">Page 1</a> (2 images)"#));
        assert!(html.contains(r#"<a href="index-2.html">Page 2</a> (1 images)"#));
    }
}
