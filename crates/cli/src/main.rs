//! adaslope CLI - ADA running and cross slope compliance analysis

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use adaslope_algorithms::compliance::{ComplianceThreshold, ADA_CROSS_MAX, ADA_RUNNING_MAX};
use adaslope_algorithms::path::{fail_fast, ELEVATION_FIELD, PATH_ID_FIELD};
use adaslope_algorithms::paths::{attach_evaluations, evaluate_paths, PathEvalParams, RunningSlopeMode};
use adaslope_algorithms::segments::{compute_slope_segments, segments_to_features, SegmentParams, SegmentSummary};
use adaslope_algorithms::terrain::{slope_field, summarize_raster, PathAxis, RasterSummaryParams, SlopeFieldParams};
use adaslope_algorithms::vector::{polygons_to_lines, resample_lines, sample_elevations, ResampleParams};
use adaslope_core::crs::MetricTarget;
use adaslope_core::io::{read_geojson, read_geotiff, write_geojson, write_geotiff, GeoTiffOptions};
use adaslope_core::{FeatureCollection, Raster, CRS};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "adaslope")]
#[command(author, version, about = "ADA slope compliance analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a DEM
    Info {
        /// Input DEM (GeoTIFF)
        input: PathBuf,
        #[command(flatten)]
        dem: DemArgs,
    },
    /// Summarize running and cross slope compliance of a whole DEM
    Raster {
        /// Input DEM (GeoTIFF)
        input: PathBuf,
        #[command(flatten)]
        dem: DemArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Direction paths are assumed to run across the raster
        #[arg(long, value_enum, default_value = "x")]
        axis: AxisArg,
        /// Leave the slope histogram out of the summary
        #[arg(long)]
        no_histogram: bool,
        /// Write the JSON summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the running slope raster (percent) as GeoTIFF
        #[arg(long)]
        slope_out: Option<PathBuf>,
    },
    /// Attach DEM elevations to a point layer
    Sample {
        /// Input DEM (GeoTIFF)
        dem_path: PathBuf,
        /// Input points (GeoJSON)
        points: PathBuf,
        /// Output points (GeoJSON)
        output: PathBuf,
        #[command(flatten)]
        dem: DemArgs,
        #[command(flatten)]
        layer: LayerArgs,
        /// Property receiving the elevation
        #[arg(long, default_value = ELEVATION_FIELD)]
        elevation_field: String,
    },
    /// Turn line (or polygon) paths into evenly spaced points
    Resample {
        /// Input paths (GeoJSON)
        input: PathBuf,
        /// Output points (GeoJSON)
        output: PathBuf,
        #[command(flatten)]
        layer: LayerArgs,
        /// Point spacing in metres
        #[arg(short, long, default_value = "5.0")]
        interval: f64,
        /// Property naming each path
        #[arg(long, default_value = PATH_ID_FIELD)]
        id_field: String,
        #[command(flatten)]
        metric: MetricArgs,
    },
    /// Running slope segments between consecutive elevation points
    Segments {
        /// Input points with path id and elevation (GeoJSON)
        input: PathBuf,
        /// Output segments (GeoJSON)
        output: PathBuf,
        #[command(flatten)]
        layer: LayerArgs,
        /// Smoothing window length (odd, >= 3)
        #[arg(short, long, default_value = "3")]
        window_size: usize,
        /// Span whole windows instead of adjacent point pairs
        #[arg(long)]
        smooth: bool,
        /// Running slope limit, rise/run
        #[arg(short, long, default_value_t = ADA_RUNNING_MAX)]
        threshold: f64,
        /// Property naming each path
        #[arg(long, default_value = PATH_ID_FIELD)]
        id_field: String,
        /// Property holding the elevation
        #[arg(long, default_value = ELEVATION_FIELD)]
        elevation_field: String,
        #[command(flatten)]
        metric: MetricArgs,
        /// Abort on the first path that cannot be segmented
        #[arg(long)]
        fail_fast: bool,
    },
    /// Worst running and cross slope along each line path
    Paths {
        /// Input DEM (GeoTIFF)
        dem_path: PathBuf,
        /// Input paths (GeoJSON)
        paths: PathBuf,
        /// Output paths with results attached (GeoJSON)
        output: PathBuf,
        #[command(flatten)]
        dem: DemArgs,
        #[command(flatten)]
        layer: LayerArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Densification spacing in metres
        #[arg(long, default_value = "2.0")]
        interval_m: f64,
        /// What the running slope reports
        #[arg(long, value_enum, default_value = "magnitude")]
        running_mode: RunningModeArg,
        /// Property naming each path
        #[arg(long, default_value = PATH_ID_FIELD)]
        id_field: String,
        /// Abort on the first path that cannot be evaluated
        #[arg(long)]
        fail_fast: bool,
    },
}

// ─── Shared arguments ───────────────────────────────────────────────────

#[derive(Args)]
struct DemArgs {
    /// Band to read (1-based)
    #[arg(long)]
    band: Option<usize>,
    /// Nodata value, overriding the file's
    #[arg(long, allow_hyphen_values = true)]
    nodata: Option<f64>,
    /// CRS of the DEM, overriding the file's (e.g. EPSG:26917)
    #[arg(long, value_parser = parse_crs)]
    dem_crs: Option<CRS>,
}

#[derive(Args)]
struct LayerArgs {
    /// CRS of the vector input, overriding its crs member
    #[arg(long, value_parser = parse_crs)]
    layer_crs: Option<CRS>,
}

#[derive(Args)]
struct ThresholdArgs {
    /// Running slope limit, rise/run
    #[arg(long, default_value_t = ADA_RUNNING_MAX)]
    running_max: f64,
    /// Cross slope limit, rise/run
    #[arg(long, default_value_t = ADA_CROSS_MAX)]
    cross_max: f64,
}

impl ThresholdArgs {
    fn thresholds(&self) -> ComplianceThreshold {
        ComplianceThreshold::new(self.running_max, self.cross_max)
    }
}

#[derive(Args)]
struct MetricArgs {
    /// Projected CRS for geographic input
    #[arg(long, value_parser = parse_crs, conflicts_with = "auto_utm")]
    metric_crs: Option<CRS>,
    /// Pick the WGS84 UTM zone of the data instead of a fixed CRS
    #[arg(long)]
    auto_utm: bool,
}

impl MetricArgs {
    fn target(&self) -> MetricTarget {
        match (&self.metric_crs, self.auto_utm) {
            (_, true) => MetricTarget::AutoUtm,
            (Some(crs), false) => MetricTarget::Fixed(crs.clone()),
            (None, false) => MetricTarget::default(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AxisArg {
    X,
    Y,
}

impl From<AxisArg> for PathAxis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::X => PathAxis::X,
            AxisArg::Y => PathAxis::Y,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RunningModeArg {
    Magnitude,
    Directional,
}

impl From<RunningModeArg> for RunningSlopeMode {
    fn from(mode: RunningModeArg) -> Self {
        match mode {
            RunningModeArg::Magnitude => RunningSlopeMode::Magnitude,
            RunningModeArg::Directional => RunningSlopeMode::Directional,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging was already initialised");
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_crs(s: &str) -> std::result::Result<CRS, String> {
    CRS::parse(s).map_err(|e| e.to_string())
}

fn read_dem(path: &Path, args: &DemArgs) -> Result<Raster<f64>> {
    let pb = spinner("Reading DEM...");
    let mut raster: Raster<f64> = read_geotiff(path, args.band)
        .with_context(|| format!("Failed to read DEM {}", path.display()))?;
    pb.finish_and_clear();

    if let Some(crs) = &args.dem_crs {
        raster.set_crs(Some(crs.clone()));
    }
    if args.nodata.is_some() {
        raster.set_nodata(args.nodata);
    }
    info!("DEM: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_layer(path: &Path, args: &LayerArgs) -> Result<FeatureCollection> {
    let pb = spinner("Reading layer...");
    let mut layer =
        read_geojson(path).with_context(|| format!("Failed to read layer {}", path.display()))?;
    pb.finish_and_clear();

    if let Some(crs) = &args.layer_crs {
        layer.crs = Some(crs.clone());
    }
    info!("Layer: {} features", layer.len());
    Ok(layer)
}

fn write_layer(layer: &FeatureCollection, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geojson(path, layer).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_segment_summary(summary: &SegmentSummary) {
    println!("Segments: {}", summary.total_segments);
    println!("  Compliant: {}", summary.compliant_segments);
    println!("  Non-compliant: {}", summary.non_compliant_segments);
    println!("  Compliance: {:.2}%", summary.compliance_percentage);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input, dem } => {
            let raster = read_dem(&input, &dem)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            match raster.resolution() {
                Ok((resx, resy)) => println!("Resolution: {} x {}", resx, resy),
                Err(e) => println!("Resolution: invalid ({})", e),
            }
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            match raster.crs() {
                Some(crs) if crs.is_geographic() => println!("CRS: {} (geographic)", crs),
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: none"),
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Raster summary ───────────────────────────────────────────
        Commands::Raster {
            input,
            dem,
            thresholds,
            axis,
            no_histogram,
            output,
            slope_out,
        } => {
            let raster = read_dem(&input, &dem)?;
            let start = Instant::now();
            let field = slope_field(&raster, &SlopeFieldParams::default())
                .context("Failed to compute slope field")?;
            let summary = summarize_raster(
                &field,
                &RasterSummaryParams {
                    thresholds: thresholds.thresholds(),
                    assumed_path_axis: axis.into(),
                    histogram: !no_histogram,
                },
            )
            .context("Raster summary needs a projected DEM")?;
            let elapsed = start.elapsed();

            let json = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
            match &output {
                Some(path) => {
                    std::fs::write(path, json).context("Failed to write output")?;
                    done("Summary", path, elapsed);
                }
                None => println!("{}", json),
            }
            if let Some(path) = &slope_out {
                let pb = spinner("Writing slope raster...");
                write_geotiff(field.slope(), path, Some(GeoTiffOptions::default()))
                    .context("Failed to write slope raster")?;
                pb.finish_and_clear();
                info!("Slope raster saved to {}", path.display());
            }
        }

        // ── Elevation sampling ───────────────────────────────────────
        Commands::Sample {
            dem_path,
            points,
            output,
            dem,
            layer,
            elevation_field,
        } => {
            let raster = read_dem(&dem_path, &dem)?;
            let points = read_layer(&points, &layer)?;
            let start = Instant::now();
            let sampled = sample_elevations(&points, &raster, &elevation_field)
                .context("Failed to sample elevations")?;
            let elapsed = start.elapsed();
            let missing = sampled
                .iter()
                .filter(|f| f.get_f64(&elevation_field).is_none())
                .count();
            if missing > 0 {
                warn!("{} of {} points have no elevation", missing, sampled.len());
            }
            write_layer(&sampled, &output)?;
            done("Sampled points", &output, elapsed);
        }

        // ── Line resampling ──────────────────────────────────────────
        Commands::Resample {
            input,
            output,
            layer,
            interval,
            id_field,
            metric,
        } => {
            let paths = read_layer(&input, &layer)?;
            let start = Instant::now();
            let lines = polygons_to_lines(&paths);
            let points = resample_lines(
                &lines,
                &ResampleParams {
                    interval_m: interval,
                    path_id_field: id_field,
                    metric: metric.target(),
                },
            )
            .context("Failed to resample paths")?;
            let elapsed = start.elapsed();
            info!("{} lines -> {} points", lines.len(), points.len());
            write_layer(&points, &output)?;
            done("Resampled points", &output, elapsed);
        }

        // ── Point-sequence segments ──────────────────────────────────
        Commands::Segments {
            input,
            output,
            layer,
            window_size,
            smooth,
            threshold,
            id_field,
            elevation_field,
            metric,
            fail_fast: abort,
        } => {
            let points = read_layer(&input, &layer)?;
            let params = SegmentParams {
                window_size,
                smoothing: smooth,
                slope_threshold: threshold,
                metric: metric.target(),
                path_id_field: id_field,
                elevation_field,
            };
            let start = Instant::now();
            let batch = compute_slope_segments(&points, &params).context("Failed to compute segments")?;
            let elapsed = start.elapsed();

            let (features, summary) = if abort {
                let crs = batch.crs.clone();
                let per_path = fail_fast(batch.results).context("Segmentation aborted")?;
                let segments: Vec<_> = per_path.into_iter().flat_map(|(_, s)| s).collect();
                (
                    segments_to_features(&segments, crs),
                    SegmentSummary::from_segments(&segments),
                )
            } else {
                for (id, e) in batch.failures() {
                    warn!("Skipping path {}: {}", id.map_or("(unlabelled)", |id| id.as_str()), e);
                }
                (batch.to_features(), batch.summary())
            };

            write_layer(&features, &output)?;
            print_segment_summary(&summary);
            done("Segments", &output, elapsed);
        }

        // ── Path cross slope ─────────────────────────────────────────
        Commands::Paths {
            dem_path,
            paths,
            output,
            dem,
            layer,
            thresholds,
            interval_m,
            running_mode,
            id_field,
            fail_fast: abort,
        } => {
            let raster = read_dem(&dem_path, &dem)?;
            let paths = read_layer(&paths, &layer)?;
            let start = Instant::now();
            let field = slope_field(&raster, &SlopeFieldParams::default())
                .context("Failed to compute slope field")?;
            let params = PathEvalParams {
                interval_m,
                thresholds: thresholds.thresholds(),
                running_mode: running_mode.into(),
                path_id_field: id_field,
            };
            let results = evaluate_paths(&paths, &field, &params).context("Failed to evaluate paths")?;
            let elapsed = start.elapsed();

            for r in &results {
                if let Some(e) = r.error() {
                    let id = r.path_id.as_ref().map_or("(unlabelled)", |id| id.as_str());
                    if abort {
                        bail!("Path {} failed: {}", id, e);
                    }
                    warn!("Path {} failed: {}", id, e);
                }
            }

            let evaluated = results.iter().filter_map(|r| r.value()).collect::<Vec<_>>();
            let running_ok = evaluated.iter().filter(|e| e.running_ok).count();
            let cross_ok = evaluated.iter().filter(|e| e.cross_ok).count();

            let attached = attach_evaluations(&paths, &results);
            write_layer(&attached, &output)?;
            println!("Paths: {}", results.len());
            println!("  Running slope compliant: {}", running_ok);
            println!("  Cross slope compliant: {}", cross_ok);
            done("Evaluated paths", &output, elapsed);
        }
    }

    Ok(())
}
