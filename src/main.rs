use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use image::ImageFormat;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;
use walkdir::WalkDir;

use imgfeat_rs::{
    config::{check_format, DEFAULT_TARGET_SIZE},
    extract_features,
    imageops_ai::{binarize, composite_alpha, normalize},
    FeatureMap,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract color and texture features as JSON lines
    Extract {
        /// Image file or directory of images
        input: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Resize and pad images onto the square model canvas
    Normalize {
        input_dir: PathBuf,

        #[arg(default_value = "output")]
        output_dir: PathBuf,

        /// Canvas edge length
        #[arg(
            long,
            default_value_t = DEFAULT_TARGET_SIZE,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        target_size: u32,

        #[arg(short, long, default_value = "png", value_parser = check_format)]
        format: String,
    },
    /// Use a grayscale mask as the alpha channel of an image and save as PNG
    Composite {
        image: PathBuf,
        mask: PathBuf,
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct FeatureRecord {
    path: String,
    features: FeatureMap,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match Cli::parse().command {
        Command::Extract { input, output } => cmd_extract(&input, output.as_deref()),
        Command::Normalize {
            input_dir,
            output_dir,
            target_size,
            format,
        } => cmd_normalize(&input_dir, &output_dir, target_size, &format),
        Command::Composite {
            image,
            mask,
            output,
        } => cmd_composite(&image, &mask, &output),
    }
}

fn collect_image_files(input: &Path) -> Result<Vec<PathBuf>> {
    ensure!(input.exists(), "Input path does not exist: {}", input.display());
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut image_paths = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| ImageFormat::from_path(e.path()).is_ok())
        .map(|e| e.into_path())
        .collect::<Vec<_>>();
    image_paths.sort();
    Ok(image_paths)
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let progress_bar = ProgressBar::new(len as u64);
    progress_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})",
        )?
        .progress_chars("#>-"),
    );
    Ok(progress_bar)
}

fn open_image(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))
}

fn cmd_extract(input: &Path, output: Option<&Path>) -> Result<()> {
    let image_paths = collect_image_files(input)?;
    let progress_bar = progress_bar(image_paths.len())?;

    let records = image_paths
        .par_iter()
        .progress_with(progress_bar.clone())
        .map(|path| -> Result<FeatureRecord> {
            let features = extract_features(&open_image(path)?)
                .with_context(|| format!("Failed to extract features: {}", path.display()))?;
            Ok(FeatureRecord {
                path: path.display().to_string(),
                features,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    progress_bar.finish_and_clear();

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    for record in &records {
        serde_json::to_writer(&mut writer, record)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    info!(count = records.len(), "feature extraction complete");
    Ok(())
}

fn cmd_normalize(
    input_dir: &Path,
    output_dir: &Path,
    target_size: u32,
    format: &str,
) -> Result<()> {
    ensure!(input_dir.is_dir(), "Input directory does not exist");
    let image_paths = collect_image_files(input_dir)?;
    let progress_bar = progress_bar(image_paths.len())?;

    image_paths
        .par_iter()
        .progress_with(progress_bar.clone())
        .try_for_each(|path| -> Result<()> {
            let normalized = normalize(&open_image(path)?, target_size)
                .with_context(|| format!("Failed to normalize: {}", path.display()))?;
            let output_path = construct_output_path(path, input_dir, output_dir, format)?;
            normalized
                .save(&output_path)
                .with_context(|| format!("Failed to save image: {}", output_path.display()))
        })?;

    progress_bar.finish();
    info!(count = image_paths.len(), "normalization complete");
    Ok(())
}

fn cmd_composite(image_path: &Path, mask_path: &Path, output: &Path) -> Result<()> {
    let image = open_image(image_path)?;
    let mask = binarize(&open_image(mask_path)?.to_luma8());
    let rgba = composite_alpha(&image, &mask).with_context(|| {
        format!(
            "Failed to composite {} with {}",
            image_path.display(),
            mask_path.display()
        )
    })?;
    rgba.save_with_format(output, ImageFormat::Png)
        .with_context(|| format!("Failed to save image: {}", output.display()))?;
    info!(output = %output.display(), "composite written");
    Ok(())
}

fn construct_output_path(
    path: &Path,
    input_dir: &Path,
    output_dir: &Path,
    format: &str,
) -> Result<PathBuf> {
    let relative = path.strip_prefix(input_dir).with_context(|| {
        format!(
            "{} is not inside {}",
            path.display(),
            input_dir.display()
        )
    })?;
    let output_path = output_dir.join(relative).with_extension(format);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(output_path)
}
