use clap::Parser;
use patchvision::io::{load_bgr_image, save_gray_image};
use patchvision::lowlevel::set_force_sequential_default;
use patchvision::{
    camshift, meanshift, Box2D, ColorInfo, DenseHistogram, Hsv, Image, ParallelOptions, Region,
    TermCriteria,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "PatchVision CLI: hue histogram back-projection and CamShift tracking")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
struct RegionJson {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl From<RegionJson> for Region {
    fn from(value: RegionJson) -> Self {
        Region::new(value.x, value.y, value.width, value.height)
    }
}

impl From<Region> for RegionJson {
    fn from(value: Region) -> Self {
        Self {
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HistogramConfigJson {
    hue_bins: usize,
    saturation_bins: usize,
    hue_range: (f32, f32),
    saturation_range: (f32, f32),
    /// Pixels with a value (V channel) below this are ignored by the model.
    min_value: u8,
}

impl Default for HistogramConfigJson {
    fn default() -> Self {
        Self {
            hue_bins: 30,
            saturation_bins: 32,
            hue_range: (0.0, 179.0),
            saturation_range: (0.0, 255.0),
            min_value: 32,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TrackingConfigJson {
    max_iterations: usize,
    min_error: f64,
}

impl Default for TrackingConfigJson {
    fn default() -> Self {
        let criteria = TermCriteria::default();
        Self {
            max_iterations: criteria.max_iterations,
            min_error: criteria.min_error,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ParallelConfigJson {
    force_sequential: bool,
}

impl ParallelConfigJson {
    /// Sets the process-wide default so conversions and channel splits follow it too.
    fn apply(&self) -> ParallelOptions {
        set_force_sequential_default(self.force_sequential);
        ParallelOptions::default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    /// Image the object model is taken from.
    image_path: String,
    /// Image the object is tracked in; defaults to `image_path`.
    track_path: Option<String>,
    roi: RegionJson,
    backprojection_path: Option<String>,
    output_path: Option<String>,
    histogram: HistogramConfigJson,
    tracking: TrackingConfigJson,
    parallel: ParallelConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: String::new(),
            track_path: None,
            roi: RegionJson::default(),
            backprojection_path: None,
            output_path: None,
            histogram: HistogramConfigJson::default(),
            tracking: TrackingConfigJson::default(),
            parallel: ParallelConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BoxRecord {
    center_x: f32,
    center_y: f32,
    width: f32,
    height: f32,
    angle_deg: f32,
}

impl From<Box2D> for BoxRecord {
    fn from(value: Box2D) -> Self {
        Self {
            center_x: value.center.0,
            center_y: value.center.1,
            width: value.width,
            height: value.height,
            angle_deg: value.angle,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    lost: bool,
    window: RegionJson,
    iterations: usize,
    object: Option<BoxRecord>,
}

/// Hue, saturation and value planes of a `Bgr`/`u8` image.
fn hsv_planes(image: Image) -> Result<Vec<Image>, Box<dyn std::error::Error>> {
    let hsv = image.convert_to(ColorInfo::of::<Hsv, u8>()?)?;
    Ok(hsv.split_channels()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("patchvision=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_path.is_empty() {
        return Err("image_path must be set in the config".into());
    }
    let roi = Region::from(config.roi);
    if roi.is_empty() {
        return Err("roi must have a positive width and height".into());
    }
    let hist_cfg = &config.histogram;
    let options = config.parallel.apply();

    let model_planes = hsv_planes(load_bgr_image(&config.image_path)?)?;
    let hue = model_planes[0].typed::<u8>()?;
    let sat = model_planes[1].typed::<u8>()?;
    let mask: Vec<u8> = model_planes[2]
        .typed::<u8>()?
        .roi(roi)?
        .rows()
        .flat_map(|row| row.iter().map(|&v| if v >= hist_cfg.min_value { 255 } else { 0 }))
        .collect();
    let mask = patchvision::ImageView::from_slice(&mask, roi.width, roi.height)?;

    let mut model = DenseHistogram::new(
        &[hist_cfg.hue_bins, hist_cfg.saturation_bins],
        &[hist_cfg.hue_range, hist_cfg.saturation_range],
    )?
    .with_parallel_options(options);
    model.calculate(&[hue.roi(roi)?, sat.roi(roi)?], false, Some(mask))?;
    let peak = model.max();
    if peak > 0.0 {
        model.scale(255.0 / peak);
    }
    tracing::info!(bins = model.values().len(), peak, "object model ready");

    let track_planes = match &config.track_path {
        Some(path) => hsv_planes(load_bgr_image(path)?)?,
        None => model_planes,
    };
    let probability = model.back_project(&[
        track_planes[0].typed::<u8>()?,
        track_planes[1].typed::<u8>()?,
    ])?;
    if let Some(path) = &config.backprojection_path {
        save_gray_image(&probability, path)?;
    }

    let criteria = TermCriteria {
        max_iterations: config.tracking.max_iterations,
        min_error: config.tracking.min_error,
    };
    let view = probability.typed::<u8>()?;
    let shifted = meanshift(view, roi, criteria)?;
    let object = camshift(view, roi, criteria)?;
    tracing::info!(iterations = shifted.iterations, lost = object.is_empty(), "tracking done");

    let output = Output {
        lost: object.is_empty(),
        window: shifted.window.into(),
        iterations: shifted.iterations,
        object: (!object.is_empty()).then(|| object.into()),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchvision::lowlevel::force_sequential_default;
    use patchvision::ImageSize;

    #[test]
    fn parallel_section_sets_process_default() {
        let large = ImageSize {
            width: 1024,
            height: 768,
        };
        let config: Config = serde_json::from_str(r#"{"parallel": {"force_sequential": true}}"#).unwrap();
        let options = config.parallel.apply();
        assert!(force_sequential_default());
        assert!(!options.should_process_parallel(large));
        assert!(!ParallelOptions::default().should_process_parallel(large));

        let config: Config = serde_json::from_str(r#"{"parallel": {"force_sequential": false}}"#).unwrap();
        let options = config.parallel.apply();
        assert!(!force_sequential_default());
        assert!(options.should_process_parallel(large));
    }
}
