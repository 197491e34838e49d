//! radpick-bench: CLI tool for horizon tracing experiments and diagnostics.
//!
//! Drapes a radargram image over a flat synthetic flightline mesh and
//! either runs the guided tracer between two UV points (`trace`) or
//! replays a scripted pointer sweep through a full picking session
//! (`sweep`). Useful for:
//!
//! - Tuning the tracer window and stride against real radargrams
//! - Checking which way the tracer scans for each hit side
//! - Comparing guided and unguided strokes
//! - Writing debug overlays of every traced segment
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin radpick-bench -- trace <IMAGE> --start-uv 0.1,0.5 --end-uv 0.9,0.5
//! cargo run --release --bin radpick-bench -- sweep <IMAGE> --from-uv 0.1,0.5 --to-uv 0.9,0.5
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use glam::{Vec2, Vec3};
use radpick_core::{
    CancelToken, Clock, FinishedPick, HorizonTrace, HorizonTracer, Mesh, PickingHost,
    PickingSession, PointerHit, PointerSource, RadargramSurface, SegmentStrategy, SessionConfig,
    Sleeper, SurfaceId, SurfaceOrientation, Texture, ThreadSleeper, TraceDiagnostics,
    TracerConfig, VisualHandle, mapping, run_sampling_loop,
};

/// World units per image pixel on the synthetic mesh.
const WORLD_UNITS_PER_PIXEL: f32 = 0.01;

/// Horizon tracing experiments and diagnostics for radpick.
#[derive(Parser)]
#[command(name = "radpick-bench", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trace the horizon between two UV points and print diagnostics.
    Trace(TraceArgs),
    /// Replay a straight pointer sweep through a picking session.
    Sweep(SweepArgs),
}

#[derive(Args)]
struct TraceArgs {
    /// Path to the radargram image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// UV of the first pick, as `U,V`.
    #[arg(long, value_parser = parse_uv, allow_hyphen_values = true)]
    start_uv: Vec2,

    /// UV of the second pick, as `U,V`.
    #[arg(long, value_parser = parse_uv, allow_hyphen_values = true)]
    end_uv: Vec2,

    /// Texels between guided samples.
    #[arg(long, default_value_t = SessionConfig::DEFAULT_GUIDED_STRIDE, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    stride: u32,

    /// Rows searched above and below the interpolated target row.
    #[arg(long, default_value_t = TracerConfig::DEFAULT_WINDOW_HALF_HEIGHT)]
    window: u32,

    /// Mark the surface as digitised against the flight direction.
    #[arg(long)]
    backwards: bool,

    /// Hit the surface from behind (normal facing away from +Z).
    #[arg(long)]
    back_facing: bool,

    /// Mesh resolution as `COLSxROWS`.
    #[arg(long, default_value = "16x4", value_parser = parse_grid)]
    grid: Grid,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Write a debug overlay of the first run to this PNG file.
    #[arg(long)]
    debug_png: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,
}

#[derive(Args)]
struct SweepArgs {
    /// Path to the radargram image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// UV where the sweep starts, as `U,V`.
    #[arg(long, value_parser = parse_uv, allow_hyphen_values = true)]
    from_uv: Vec2,

    /// UV where the sweep ends, as `U,V`.
    #[arg(long, value_parser = parse_uv, allow_hyphen_values = true)]
    to_uv: Vec2,

    /// Number of pointer samples along the sweep.
    #[arg(long, default_value_t = 100, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(2..))]
    steps: usize,

    /// Start the stroke with the unguided strategy.
    #[arg(long)]
    unguided: bool,

    /// Mesh resolution as `COLSxROWS`.
    #[arg(long, default_value = "16x4", value_parser = parse_grid)]
    grid: Grid,

    /// Full session config as a JSON string.
    ///
    /// Missing fields take their defaults. `--unguided` and
    /// `--debug-dir` still apply on top.
    #[arg(long)]
    config_json: Option<String>,

    /// Write a debug overlay of every guided segment into this directory.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Sleep the configured tick interval between samples.
    #[arg(long)]
    realtime: bool,

    /// Output the finished stroke as JSON.
    #[arg(long)]
    json: bool,
}

/// Mesh resolution of the synthetic surface.
#[derive(Debug, Clone, Copy)]
struct Grid {
    columns: u32,
    rows: u32,
}

fn parse_uv(s: &str) -> Result<Vec2, String> {
    let (u, v) = s
        .split_once(',')
        .ok_or_else(|| format!("expected U,V, got {s:?}"))?;
    let u: f32 = u.trim().parse().map_err(|e| format!("bad U in {s:?}: {e}"))?;
    let v: f32 = v.trim().parse().map_err(|e| format!("bad V in {s:?}: {e}"))?;
    if !u.is_finite() || !v.is_finite() {
        return Err(format!("UV must be finite, got {s:?}"));
    }
    Ok(Vec2::new(u, v))
}

fn parse_grid(s: &str) -> Result<Grid, String> {
    let (columns, rows) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected COLSxROWS, got {s:?}"))?;
    let columns: u32 = columns
        .trim()
        .parse()
        .map_err(|e| format!("bad column count in {s:?}: {e}"))?;
    let rows: u32 = rows
        .trim()
        .parse()
        .map_err(|e| format!("bad row count in {s:?}: {e}"))?;
    if columns == 0 || rows == 0 {
        return Err(format!("grid must have at least one column and row, got {s:?}"));
    }
    Ok(Grid { columns, rows })
}

/// Decode the image and drape it over a flat grid in the XY plane.
///
/// The grid is sized so one pixel spans [`WORLD_UNITS_PER_PIXEL`], with
/// the identity transform and +Z as the front side.
#[allow(clippy::cast_precision_loss)]
fn load_surface(path: &Path, grid: Grid, backwards: bool) -> Result<RadargramSurface, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let texture = Texture::decode(&bytes).map_err(|e| format!("Error decoding {}: {e}", path.display()))?;
    let size = Vec2::new(texture.width() as f32, texture.height() as f32) * WORLD_UNITS_PER_PIXEL;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("radargram")
        .to_owned();

    eprintln!(
        "Image: {} ({} bytes, {}x{} texels)",
        path.display(),
        bytes.len(),
        texture.width(),
        texture.height(),
    );

    Ok(RadargramSurface::new(SurfaceId(1), name)
        .with_mesh(Arc::new(Mesh::plane_grid(grid.columns, grid.rows, size)))
        .with_texture(Arc::new(texture))
        .with_orientation(SurfaceOrientation { backwards }))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Render and write a debug overlay of `trace`.
fn write_overlay(surface: &RadargramSurface, trace: &HorizonTrace, path: &Path) -> Result<usize, String> {
    let image = surface
        .tracer_image()
        .ok_or_else(|| format!("{} has no texture", surface.name()))?;
    let overlay =
        radpick_export::render_debug_overlay(image, trace).map_err(|e| e.to_string())?;
    let png = radpick_export::encode_png(&overlay).map_err(|e| e.to_string())?;
    std::fs::write(path, &png).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    Ok(png.len())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Trace(args) => run_trace(&args),
        Command::Sweep(args) => run_sweep(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// trace
// ---------------------------------------------------------------------------

fn run_trace(args: &TraceArgs) -> Result<(), String> {
    let surface = load_surface(&args.image_path, args.grid, args.backwards)?;
    let config = TracerConfig {
        window_half_height: args.window,
        ..TracerConfig::default()
    };
    let tracer = HorizonTracer::new(config, args.stride);
    let normal = if args.back_facing { Vec3::NEG_Z } else { Vec3::Z };

    eprintln!("Tracer: {config:?}, stride {}", args.stride);
    eprintln!("Runs: {}", args.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(args.runs);

    for run in 0..args.runs {
        if args.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, args.runs);
        }

        let (trace, diagnostics) = tracer
            .trace_with_diagnostics(&surface, args.start_uv, args.end_uv, normal, &StdClock)
            .map_err(|e| format!("Trace error: {e}"))?;

        if args.json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }

        // Write the overlay on the first run only.
        if run == 0
            && let Some(ref png_path) = args.debug_png
        {
            match write_overlay(&surface, &trace, png_path) {
                Ok(len) => eprintln!("Overlay written to {} ({len} bytes)", png_path.display()),
                Err(e) => eprintln!("{e}"),
            }
        }

        all_diagnostics.push(diagnostics);

        if args.runs > 1 {
            eprintln!();
        }
    }

    if args.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated timing across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[TraceDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Trace duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
}

// ---------------------------------------------------------------------------
// sweep
// ---------------------------------------------------------------------------

fn run_sweep(args: &SweepArgs) -> Result<(), String> {
    let mut config = match args.config_json {
        Some(ref json) => serde_json::from_str::<SessionConfig>(json)
            .map_err(|e| format!("Error parsing --config-json: {e}"))?,
        None => SessionConfig::default(),
    };
    if args.unguided {
        config.strategy = SegmentStrategy::Unguided;
    }
    if args.debug_dir.is_some() {
        config.export_debug_images = true;
    }
    eprintln!("Config: {config:#?}");

    if let Some(ref dir) = args.debug_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
    }

    let surface = Arc::new(load_surface(&args.image_path, args.grid, false)?);
    let mut session = PickingSession::new(config).map_err(|e| e.to_string())?;
    let mut host = BenchHost::new(args.debug_dir.clone());
    session.set_picking_enabled(true, &mut host);

    let release = CancelToken::new();
    let mut pointer = SweepPointer::new(&surface, args.from_uv, args.to_uv, args.steps, release.clone());
    let mut sleeper = if args.realtime {
        BenchSleeper::Real(ThreadSleeper)
    } else {
        BenchSleeper::Skip
    };

    let started = Instant::now();
    let finished = run_sampling_loop(&mut session, &mut pointer, &mut host, &mut sleeper, &release)
        .ok_or_else(|| "Sweep did not produce a stroke".to_owned())?;
    let elapsed = started.elapsed();

    if args.json {
        let json = serde_json::to_string_pretty(&stroke_json(&finished))
            .map_err(|e| format!("Error serializing stroke: {e}"))?;
        println!("{json}");
    } else {
        print_stroke(&finished);
    }

    eprintln!();
    eprintln!(
        "Sweep: {} samples, {} points, {} segments drawn, {} overlays, {:.3}ms",
        args.steps,
        finished.points.len(),
        host.drawn,
        host.overlays,
        elapsed.as_secs_f64() * 1000.0,
    );
    Ok(())
}

fn print_stroke(finished: &FinishedPick) {
    println!(
        "{:>4} {:>10} {:>10} {:>10} {:>8} {:>8} {:>9}",
        "#", "x", "y", "z", "u", "v", "segment"
    );
    println!("{}", "-".repeat(66));
    for (i, p) in finished.points.iter().enumerate() {
        let segment = p
            .outgoing
            .as_ref()
            .map_or_else(|| "-".to_owned(), |s| s.points.len().to_string());
        println!(
            "{i:>4} {:>10.4} {:>10.4} {:>10.4} {:>8.4} {:>8.4} {segment:>9}",
            p.world.x, p.world.y, p.world.z, p.uv.x, p.uv.y,
        );
    }
    println!();
    println!("Polyline: {} vertices", finished.polyline.len());
}

fn stroke_json(finished: &FinishedPick) -> serde_json::Value {
    let points: Vec<_> = finished
        .points
        .iter()
        .map(|p| {
            serde_json::json!({
                "world": [p.world.x, p.world.y, p.world.z],
                "uv": [p.uv.x, p.uv.y],
                "segment_points": p.outgoing.as_ref().map(|s| s.points.len()),
            })
        })
        .collect();
    let polyline: Vec<[f32; 3]> = finished.polyline.iter().map(|p| p.to_array()).collect();
    serde_json::json!({
        "surface": finished.surface.map(|id| id.0),
        "points": points,
        "polyline": polyline,
    })
}

/// Pointer that walks a straight UV line, releasing the trigger at the end.
struct SweepPointer {
    hits: std::vec::IntoIter<Option<PointerHit>>,
    release: CancelToken,
}

impl SweepPointer {
    #[allow(clippy::cast_precision_loss)]
    fn new(
        surface: &Arc<RadargramSurface>,
        from: Vec2,
        to: Vec2,
        steps: usize,
        release: CancelToken,
    ) -> Self {
        let last = steps.saturating_sub(1).max(1) as f32;
        let hits: Vec<Option<PointerHit>> = (0..steps)
            .map(|i| {
                let uv = from.lerp(to, i as f32 / last);
                let mesh = surface.mesh()?;
                let point = mapping::uv_to_world(uv, mesh, surface.transform())?;
                Some(PointerHit {
                    point,
                    normal: Vec3::Z,
                    surface: Arc::clone(surface),
                })
            })
            .collect();
        Self {
            hits: hits.into_iter(),
            release,
        }
    }
}

impl PointerSource for SweepPointer {
    fn sample(&mut self) -> Option<PointerHit> {
        let hit = self.hits.next().flatten();
        if self.hits.as_slice().is_empty() {
            self.release.cancel();
        }
        hit
    }
}

enum BenchSleeper {
    Real(ThreadSleeper),
    Skip,
}

impl Sleeper for BenchSleeper {
    fn sleep(&mut self, duration: Duration) {
        if let Self::Real(sleeper) = self {
            sleeper.sleep(duration);
        }
    }
}

/// Host that counts drawn visuals and writes debug overlays to disk.
struct BenchHost {
    debug_dir: Option<PathBuf>,
    next_handle: u64,
    drawn: usize,
    overlays: usize,
}

impl BenchHost {
    const fn new(debug_dir: Option<PathBuf>) -> Self {
        Self {
            debug_dir,
            next_handle: 0,
            drawn: 0,
            overlays: 0,
        }
    }
}

impl PickingHost for BenchHost {
    fn draw_segment(&mut self, surface: &RadargramSurface, points: &[Vec3]) -> Option<VisualHandle> {
        self.next_handle += 1;
        self.drawn += 1;
        log::debug!("{}: segment {} with {} points", surface.name(), self.next_handle, points.len());
        Some(VisualHandle(self.next_handle))
    }

    fn export_debug_trace(&mut self, surface: &RadargramSurface, trace: &HorizonTrace) {
        let Some(ref dir) = self.debug_dir else {
            return;
        };
        // Several segments finish within one second; number them apart.
        let name = format!("{}-{:03}", surface.name(), self.overlays);
        let path = dir.join(radpick_export::debug_file_name(&name, unix_seconds()));
        match write_overlay(surface, trace, &path) {
            Ok(_) => {
                self.overlays += 1;
                log::info!("overlay written to {}", path.display());
            }
            Err(e) => log::warn!("{e}"),
        }
    }
}
