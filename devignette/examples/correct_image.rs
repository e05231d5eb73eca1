//! Example: Estimate and remove the vignetting of a single photograph
//!
//! Estimates a falloff model from the image itself, writes the corrected
//! image, a rendering of the estimated attenuation and the model record next
//! to the input:
//!
//! ```text
//! photo.jpg
//! photo_corrected.png
//! photo_vignette.png
//! photo_vignette.yaml
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --release -p devignette --example correct_image -- photo.jpg [entropy|ratio] [u0 v0]
//! ```
//!
//! The optical center defaults to the image center.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use devignette::{
    CorrectionEngine, EntropyConfig, Image, OpticalCenter, RatioConfig, Strategy,
    estimate_or_identity, render,
};

fn main() -> anyhow::Result<()> {
    common::log_setup::setup_logging("info", Path::new("logs"), "devignette")?;

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!(
            "usage: {} <image> [entropy|ratio] [u0 v0]",
            args.first().map(String::as_str).unwrap_or("correct_image")
        );
    }

    let input = PathBuf::from(&args[1]);
    let strategy = match args.get(2).map(String::as_str) {
        None | Some("entropy") => Strategy::Entropy(EntropyConfig::default()),
        Some("ratio") => Strategy::Ratio(RatioConfig::default()),
        Some(other) => bail!("unknown strategy '{other}', expected 'entropy' or 'ratio'"),
    };

    let image = Image::load(&input)?;
    let center = match (args.get(3), args.get(4)) {
        (Some(u0), Some(v0)) => OpticalCenter::new(
            u0.parse().context("u0 must be a number")?,
            v0.parse().context("v0 must be a number")?,
        ),
        _ => OpticalCenter::image_center(image.width(), image.height()),
    };
    tracing::info!(
        path = %input.display(),
        width = image.width(),
        height = image.height(),
        channels = image.channels(),
        "Loaded image"
    );

    let start = Instant::now();
    let model = estimate_or_identity(&strategy, &image, center)?;
    tracing::info!(elapsed = ?start.elapsed(), "Estimated vignetting");

    let start = Instant::now();
    let corrected = CorrectionEngine::default().apply(&image, &model)?;
    tracing::info!(elapsed = ?start.elapsed(), "Corrected image");

    let corrected_path = sibling(&input, "corrected", "png");
    corrected.save(&corrected_path)?;

    let vignette_path = sibling(&input, "vignette", "png");
    render(image.width(), image.height(), &model)?.save(&vignette_path)?;

    let model_path = sibling(&input, "vignette", "yaml");
    model.save(&model_path)?;

    tracing::info!(
        corrected = %corrected_path.display(),
        vignette = %vignette_path.display(),
        model = %model_path.display(),
        "Done"
    );
    Ok(())
}

/// `dir/name.ext` -> `dir/name_<suffix>.<extension>`
fn sibling(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}_{suffix}.{extension}"))
}
