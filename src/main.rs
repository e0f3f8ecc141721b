use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use cvgallery::export::html_gallery_export::{DEFAULT_KNOWLEDGE_URL_TEMPLATE, DEFAULT_TITLE};
use cvgallery::fetch::request::{Feature, FeatureType};
use cvgallery::fetch::vision::{load_api_key, DEFAULT_ENDPOINT, DEFAULT_KEY_FILE};
use cvgallery::fetch::{expand_inputs, label_all, FetchConfig, VisionClient};
use cvgallery::gallery::resolve::{DEFAULT_IMAGE_BASE_URL, DEFAULT_ITEM_URL_TEMPLATE};
use cvgallery::gallery::DEFAULT_PAGE_SIZE;
use cvgallery::pipeline::{build_gallery, export_gallery, GalleryConfig};
use cvgallery::MalformedPolicy;

#[derive(Parser, Debug)]
#[command(name = "cvgallery")]
#[command(version, about = "Label images with a cloud vision API and browse the results as HTML", long_about = None)]
struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send images to the annotation service and save each response as <image>.json
    Label {
        /// Image files, or directories of images
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// API key (takes precedence over --key-file)
        #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// File holding the API key
        #[arg(long, default_value = DEFAULT_KEY_FILE)]
        key_file: PathBuf,

        /// Annotation endpoint
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        #[arg(long, default_value_t = 10)]
        max_labels: u32,

        #[arg(long, default_value_t = 3)]
        max_landmarks: u32,

        #[arg(long, default_value_t = 10)]
        max_text: u32,
    },

    /// Render result documents into paginated HTML pages
    Gallery {
        /// Directory containing the *.json result documents
        #[arg(short, long, default_value = ".")]
        input: PathBuf,

        /// Output directory (default: same as input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory with local copies of the images (default: input)
        #[arg(long)]
        image_dir: Option<PathBuf>,

        /// Extension of the image each result document describes
        #[arg(long, default_value = "png")]
        image_ext: String,

        /// Rows per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Tab-separated filename, item page URL, image URL table
        #[arg(long)]
        overrides: Option<PathBuf>,

        #[arg(long, default_value = DEFAULT_IMAGE_BASE_URL)]
        image_base_url: String,

        /// Item page URL; {id} is replaced with the filename's numeric id
        #[arg(long, default_value = DEFAULT_ITEM_URL_TEMPLATE)]
        item_url_template: String,

        /// Knowledge-base link for landmarks and labels; {id} is the entity id
        #[arg(long, default_value = DEFAULT_KNOWLEDGE_URL_TEMPLATE)]
        knowledge_url_template: String,

        /// Page heading
        #[arg(long, default_value = DEFAULT_TITLE)]
        title: String,

        /// What to do with malformed annotation records
        #[arg(long, value_enum, default_value_t = Policy::Skip)]
        on_malformed: Policy,

        /// Keep rows whose image is not available locally
        #[arg(long)]
        allow_missing_images: bool,

        /// Embed script and style in every page instead of linking shared files
        #[arg(long)]
        inline_assets: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Policy {
    Fail,
    Skip,
}

impl From<Policy> for MalformedPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Fail => MalformedPolicy::Fail,
            Policy::Skip => MalformedPolicy::Skip,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Label {
            images,
            api_key,
            key_file,
            endpoint,
            timeout,
            max_labels,
            max_landmarks,
            max_text,
        } => {
            let api_key = load_api_key(api_key, &key_file)?;
            let config = FetchConfig::new(api_key)
                .with_endpoint(endpoint)
                .with_timeout(Duration::from_secs(timeout))
                .with_features(vec![
                    Feature::new(FeatureType::LabelDetection, max_labels),
                    Feature::new(FeatureType::LandmarkDetection, max_landmarks),
                    Feature::new(FeatureType::TextDetection, max_text),
                ]);
            label_images(images, &config)
        }
        Commands::Gallery {
            input,
            output,
            image_dir,
            image_ext,
            page_size,
            overrides,
            image_base_url,
            item_url_template,
            knowledge_url_template,
            title,
            on_malformed,
            allow_missing_images,
            inline_assets,
        } => {
            let output = output.unwrap_or_else(|| input.clone());
            let mut config = GalleryConfig::new(input, output);
            if let Some(dir) = image_dir {
                config.image_dir = dir;
            }
            config.image_extension = image_ext.trim_start_matches('.').to_string();
            config.page_size = page_size;
            config.overrides = overrides;
            config.image_base_url = image_base_url;
            config.item_url_template = item_url_template;
            config.knowledge_url_template = knowledge_url_template;
            config.title = title;
            config.policy = on_malformed.into();
            config.require_local_images = !allow_missing_images;
            config.inline_assets = inline_assets;
            render_gallery(&config)
        }
    }
}

fn label_images(inputs: Vec<PathBuf>, config: &FetchConfig) -> Result<()> {
    let images = expand_inputs(&inputs)?;
    if images.is_empty() {
        anyhow::bail!("No images to label");
    }

    println!("[*] Labeling {} image(s)", images.len());

    let client = VisionClient::new(config)?;
    let summary = label_all(&client, &images, &config.features);

    for path in &summary.written {
        println!("  [✓] {}", path.display());
    }
    for (image, reason) in &summary.failed {
        eprintln!("  [✗] {}: {}", image.display(), reason);
    }

    println!(
        "\n[*] Summary: {} succeeded, {} failed",
        summary.written.len(),
        summary.failed.len()
    );

    if !summary.failed.is_empty() {
        anyhow::bail!("{} image(s) failed to label", summary.failed.len());
    }
    Ok(())
}

fn render_gallery(config: &GalleryConfig) -> Result<()> {
    println!("[*] Input: {}", config.input.display());
    println!("[*] Output: {}", config.output.display());

    let gallery = build_gallery(config)
        .with_context(|| format!("Failed to read results from: {}", config.input.display()))?;

    println!("[+] Exporting {} page(s)...", gallery.page_count());

    export_gallery(&gallery, config)
        .with_context(|| format!("Failed to export to: {}", config.output.display()))?;

    if gallery.skipped_count() > 0 {
        println!("[!] {} item(s) skipped, see log", gallery.skipped_count());
    }
    println!(
        "\n[✓] Done! {} row(s) on {} page(s) in {}",
        gallery.row_count(),
        gallery.page_count(),
        config.output.display()
    );
    Ok(())
}
