pub mod request;
pub mod vision;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageFormat;
use log::{error, info, warn};

use crate::core::ordering::compare_names;
use crate::fetch::request::{AnnotateRequest, Feature};

pub use vision::{FetchConfig, VisionClient};

/// What the annotation service said about one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotateResponse {
    Success { body: Vec<u8> },
    Rejected {
        status: u16,
        reason: String,
        body: String,
    },
}

pub trait Annotator {
    fn annotate(&self, request: &AnnotateRequest) -> Result<AnnotateResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelOutcome {
    Written(PathBuf),
    Rejected { status: u16, reason: String },
}

/// `photo.png` → `photo.json`, in the same directory.
pub fn output_path(image: &Path) -> PathBuf {
    image.with_extension("json")
}

/// Sends one image and saves the response body verbatim beside it.
///
/// A rejected request is logged and nothing is written.
pub fn label_image(
    annotator: &dyn Annotator,
    image: &Path,
    features: &[Feature],
) -> Result<LabelOutcome> {
    let bytes = fs::read(image).with_context(|| format!("failed to read {}", image.display()))?;
    let request = AnnotateRequest::for_image(&bytes, features);

    match annotator.annotate(&request)? {
        AnnotateResponse::Success { body } => {
            let output = output_path(image);
            fs::write(&output, &body)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!("{}: wrote {}", image.display(), output.display());
            Ok(LabelOutcome::Written(output))
        }
        AnnotateResponse::Rejected {
            status,
            reason,
            body,
        } => {
            error!("{}: {status} {reason}\n{body}", image.display());
            Ok(LabelOutcome::Rejected { status, reason })
        }
    }
}

#[derive(Debug, Default)]
pub struct LabelSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Labels each image in turn; a failure never stops the remaining images.
pub fn label_all(annotator: &dyn Annotator, images: &[PathBuf], features: &[Feature]) -> LabelSummary {
    let mut summary = LabelSummary::default();
    for (i, image) in images.iter().enumerate() {
        info!("[{}/{}] labeling {}", i + 1, images.len(), image.display());
        match label_image(annotator, image, features) {
            Ok(LabelOutcome::Written(path)) => summary.written.push(path),
            Ok(LabelOutcome::Rejected { status, reason }) => summary
                .failed
                .push((image.clone(), format!("{status} {reason}"))),
            Err(err) => {
                error!("{}: {err:#}", image.display());
                summary.failed.push((image.clone(), format!("{err:#}")));
            }
        }
    }
    summary
}

/// Files stay as given; directories expand to the raster images they hold.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            images.push(input.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(input)
            .with_context(|| format!("failed to list {}", input.display()))?
        {
            let path = entry?.path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                found.push(path);
            }
        }
        if found.is_empty() {
            warn!("no images found in {}", input.display());
        }
        found.sort_by(|a, b| {
            compare_names(&a.to_string_lossy(), &b.to_string_lossy())
        });
        images.extend(found);
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::request::default_features;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Rejects any image whose payload is `bad`, accepts the rest.
    struct FakeAnnotator {
        seen: RefCell<Vec<AnnotateRequest>>,
    }

    impl FakeAnnotator {
        fn new() -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Annotator for FakeAnnotator {
        fn annotate(&self, request: &AnnotateRequest) -> Result<AnnotateResponse> {
            self.seen.borrow_mut().push(request.clone());
            let content = &request.requests[0].image.content;
            if content == "YmFk" {
                return Ok(AnnotateResponse::Rejected {
                    status: 400,
                    reason: "Bad Request".to_string(),
                    body: r#"{"error": {"message": "Bad image data."}}"#.to_string(),
                });
            }
            Ok(AnnotateResponse::Success {
                body: br#"{"responses": [{}]}"#.to_vec(),
            })
        }
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let mut out = std::env::temp_dir();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        out.push(format!("{prefix}-{}-{now}", std::process::id()));
        out
    }

    #[test]
    fn output_sits_beside_image() {
        assert_eq!(
            output_path(Path::new("scans/12_3.png")),
            PathBuf::from("scans/12_3.json")
        );
    }

    #[test]
    fn success_writes_body_verbatim() -> Result<()> {
        let dir = temp_dir("cvgallery-label");
        fs::create_dir_all(&dir)?;
        let image = dir.join("1.png");
        fs::write(&image, b"good")?;

        let annotator = FakeAnnotator::new();
        let outcome = label_image(&annotator, &image, &default_features())?;

        assert_eq!(outcome, LabelOutcome::Written(dir.join("1.json")));
        assert_eq!(fs::read_to_string(dir.join("1.json"))?, r#"{"responses": [{}]}"#);
        assert_eq!(annotator.seen.borrow()[0].requests[0].image.content, "Z29vZA==");

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn rejection_writes_nothing_and_run_continues() -> Result<()> {
        let dir = temp_dir("cvgallery-label-all");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("1.png"), b"bad")?;
        fs::write(dir.join("2.png"), b"good")?;
        let images = vec![dir.join("1.png"), dir.join("missing.png"), dir.join("2.png")];

        let annotator = FakeAnnotator::new();
        let summary = label_all(&annotator, &images, &default_features());

        assert!(!dir.join("1.json").exists());
        assert!(dir.join("2.json").exists());
        assert_eq!(summary.written, vec![dir.join("2.json")]);
        assert_eq!(summary.failed.len(), 2);
        assert_eq!(summary.failed[0].1, "400 Bad Request");
        assert_eq!(annotator.seen.borrow().len(), 2);

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn directories_expand_to_images() -> Result<()> {
        let dir = temp_dir("cvgallery-expand");
        fs::create_dir_all(&dir)?;
        for name in ["10.png", "2.jpg", "notes.txt", "2.json"] {
            fs::write(dir.join(name), b"x")?;
        }

        let images = expand_inputs(&[dir.clone(), PathBuf::from("single.png")])?;
        assert_eq!(
            images,
            vec![dir.join("2.jpg"), dir.join("10.png"), PathBuf::from("single.png")]
        );

        let _ = fs::remove_dir_all(&dir);
        Ok(())
    }
}
