// main.rs - Driver for the animated maze scene: headless or offscreen wgpu.
// Mounts the scene into a local host, pumps frames on a tokio interval and
// writes the final frame as PNG.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::time::MissedTickBehavior;

use maze_core::{Grid, Path as MazePath};
use maze_gpu_renderer::{
    BackendFactory, FrameStatus, GpuContext, LocalHost, MazeDimensions, MazeScene, NullBackendFactory,
    NullProbe, Viewport,
};

/// Frames kept on screen after the path is fully revealed
const HOLD_FRAMES: usize = 60;

/// CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Maze width in cells (odd, >= 3)
    #[arg(long, default_value = "51")]
    pub cols: usize,

    /// Maze height in cells (odd, >= 3)
    #[arg(long, default_value = "31")]
    pub rows: usize,

    /// Viewport width in logical pixels
    #[arg(short = 'W', long, default_value = "1280")]
    pub width: u32,

    /// Viewport height in logical pixels
    #[arg(short = 'H', long, default_value = "720")]
    pub height: u32,

    /// Device pixel ratio applied to the viewport
    #[arg(long, default_value = "1.0")]
    pub scale_factor: f32,

    /// Seed for maze generation; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Frames to run; defaults to a full reveal plus a short hold
    #[arg(long)]
    pub frames: Option<usize>,

    /// Frame rate of the driver loop
    #[arg(long, default_value = "60")]
    pub fps: u32,

    /// Resize the viewport to WxH half way through the run
    #[arg(long, value_parser = parse_size)]
    pub resize: Option<(u32, u32)>,

    /// Output image path; use "-" for stdout PNG
    #[arg(short, long, default_value = "maze.png")]
    pub output: PathBuf,

    /// Run without a GPU (no image is written)
    #[arg(long)]
    pub headless: bool,

    /// Force Vulkan backend
    #[arg(long)]
    pub vulkan: bool,

    /// Print the generated maze as ASCII
    #[arg(long)]
    pub ascii: bool,

    /// Write grid and path as JSON
    #[arg(long)]
    pub dump_json: Option<PathBuf>,
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid size component '{v}': {e}"))
    };
    let (w, h) = (parse(w)?, parse(h)?);
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got {w}x{h}"));
    }
    Ok((w, h))
}

fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

#[derive(Serialize)]
struct MazeDump<'a> {
    seed: u64,
    dimensions: MazeDimensions,
    grid: &'a Grid,
    path: &'a MazePath,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Starting with {args:?}");

    if args.ascii && !args.headless && is_stdout(&args.output) {
        bail!("--ascii and --output - both write to stdout");
    }

    let dimensions = MazeDimensions::new(args.cols, args.rows).context("Invalid maze dimensions")?;
    let viewport = Viewport::new(args.width, args.height).with_scale_factor(args.scale_factor);
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Maze seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    if args.headless {
        let probe = NullProbe::shared();
        let host = LocalHost::new(NullBackendFactory::new(probe.clone()), viewport);
        let mut scene = MazeScene::mount(host, dimensions, &mut rng).context("Failed to mount scene")?;

        run_frames(&mut scene, &args).await?;
        export_maze(&scene, seed, &args).await?;
        scene.teardown();

        info!(
            "Headless run: {} frames, {} marker uploads, {} backend(s) disposed",
            probe.frames_rendered(),
            probe.uploads(maze_gpu_renderer::BatchKind::PathMarkers),
            probe.disposals()
        );
    } else {
        let gpu = GpuContext::new(args.vulkan)
            .await
            .context("GPU initialisation failed")?;
        let tracker = gpu.tracker().clone();
        let host = LocalHost::new(gpu, viewport);
        let mut scene = MazeScene::mount(host, dimensions, &mut rng).context("Failed to mount scene")?;

        run_frames(&mut scene, &args).await?;
        export_maze(&scene, seed, &args).await?;

        let png = scene
            .backend()
            .encode_png()
            .await
            .context("Failed to read back final frame")?;
        write_output(&args.output, &png).await?;
        scene.teardown();

        let leaked = tracker.total_active();
        if leaked > 0 {
            warn!("{leaked} GPU resources still alive after teardown");
        }
    }
    Ok(())
}

/// Pump the host's frame callbacks on a fixed interval until the frame budget
/// runs out, the loop aborts or Ctrl-C arrives.
async fn run_frames<F: BackendFactory>(scene: &mut MazeScene<LocalHost<F>>, args: &Args) -> Result<()> {
    let total = args
        .frames
        .unwrap_or_else(|| scene.reveal().ticks_to_complete().saturating_add(HOLD_FRAMES));
    let resize_at = args.resize.map(|size| (total / 2, size));

    let period = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Running {total} frames at {} fps", args.fps.max(1));
    let start = Instant::now();

    for tick in 0..total {
        tokio::select! {
            _ = &mut ctrl_c => {
                warn!("Interrupted after {tick} frames");
                break;
            }
            _ = interval.tick() => {}
        }

        if let Some((at, (width, height))) = resize_at {
            if tick == at {
                let resized = Viewport::new(width, height).with_scale_factor(args.scale_factor);
                info!("Resizing viewport to {width}x{height}");
                scene.resize_host(resized).context("Resize failed")?;
            }
        }

        match scene.run_pending_frame() {
            Some(FrameStatus::Rendered) => {}
            Some(FrameStatus::Aborted) => {
                let reason = scene.host().last_error().unwrap_or("unknown error").to_string();
                return Err(anyhow!("Frame loop aborted: {reason}"));
            }
            Some(FrameStatus::Skipped) | None => {
                warn!("No frame scheduled after {tick} frames; stopping");
                break;
            }
        }

        if (tick + 1) % 60 == 0 {
            info!(
                "Frame {}/{total}: revealed {}/{} path cells",
                tick + 1,
                scene.reveal().revealed(),
                scene.reveal().total()
            );
        }
    }

    let elapsed = start.elapsed();
    info!(
        "Done: {} frames in {:?} ({:.1} fps)",
        scene.frames_rendered(),
        elapsed,
        scene.frames_rendered() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}

async fn export_maze<F: BackendFactory>(scene: &MazeScene<LocalHost<F>>, seed: u64, args: &Args) -> Result<()> {
    if args.ascii {
        print!("{}", scene.grid());
    }

    if let Some(path) = &args.dump_json {
        let dump = MazeDump {
            seed,
            dimensions: scene.dimensions(),
            grid: scene.grid(),
            path: scene.path(),
        };
        let json = serde_json::to_vec_pretty(&dump)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Maze written to {}", path.display());
    }
    Ok(())
}

async fn write_output(path: &Path, png: &[u8]) -> Result<()> {
    if is_stdout(path) {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(png).await?;
        stdout.flush().await?;
    } else {
        tokio::fs::write(path, png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved {} ({} bytes)", path.display(), png.len());
    }
    Ok(())
}
