//! gemtrace CLI - render faceted gems and inspect their BVHs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use gemtrace::gem::optics::critical_sine;
use gemtrace::prelude::*;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("GEMTRACE_BUILD_DATE"),
    " ",
    env!("GEMTRACE_BUILD_TIME"),
    ")"
);

#[derive(Parser)]
#[command(name = "gemtrace", version = VERSION)]
#[command(about = "Internal-reflection gem renderer", long_about = None)]
struct Cli {
    /// Debug-level logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a frame to .png (tone mapped) or .exr (linear)
    Render(RenderArgs),
    /// Print mesh and BVH statistics for a procedural shape
    Inspect(InspectArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// Scene description (JSON); defaults to a single brilliant-cut diamond
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Equirectangular environment map (.hdr or .exr)
    #[arg(long)]
    env: Option<PathBuf>,
    /// Internal bounce budget for every gem
    #[arg(long)]
    bounces: Option<u32>,
    /// Index of refraction for every gem
    #[arg(long)]
    ior: Option<f32>,
    /// Dispersion strength for every gem (0 disables)
    #[arg(long)]
    aberration: Option<f32>,
    /// Approximate red/blue instead of tracing them
    #[arg(long)]
    fast_chroma: bool,
    #[arg(long)]
    exposure: Option<f32>,
    /// Output image
    #[arg(short, long, default_value = "gem.png")]
    output: PathBuf,
}

#[derive(Args)]
struct InspectArgs {
    /// brilliant, cube or icosahedron
    #[arg(long, default_value = "brilliant")]
    shape: String,
    /// Girdle corners for the brilliant cut
    #[arg(long)]
    segments: Option<u32>,
    /// sah or center
    #[arg(long, default_value = "sah")]
    strategy: SplitStrategy,
    #[arg(long, default_value_t = 1)]
    max_leaf: usize,
    /// Bounce budget for the sample traces
    #[arg(long, default_value_t = 5)]
    bounces: u32,
    #[arg(long, default_value_t = 2.4)]
    ior: f32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _trace_guard = init_tracing(cli.verbose);

    match cli.command {
        Commands::Render(args) => cmd_render(args),
        Commands::Inspect(args) => cmd_inspect(args),
    }
}

#[cfg(feature = "chrome-trace")]
type TraceGuard = Option<tracing_chrome::FlushGuard>;
#[cfg(not(feature = "chrome-trace"))]
type TraceGuard = ();

/// Console logging, plus a Chrome trace (trace.json) when built with
/// `chrome-trace` and `GEMTRACE_TRACE=1`.
fn init_tracing(verbose: bool) -> TraceGuard {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let fmt = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    #[cfg(feature = "chrome-trace")]
    {
        let (chrome, guard) = if std::env::var("GEMTRACE_TRACE").ok().as_deref() == Some("1") {
            let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file("trace.json")
                .build();
            (Some(layer), Some(guard))
        } else {
            (None, None)
        };
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt)
            .with(chrome)
            .init();
        guard
    }

    #[cfg(not(feature = "chrome-trace"))]
    tracing_subscriber::registry().with(filter).with(fmt).init();
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading scene {}", path.display()))?,
        None => SceneConfig::default(),
    };

    if let Some(w) = args.width {
        config.width = w;
    }
    if let Some(h) = args.height {
        config.height = h;
    }
    if let Some(env) = args.env {
        config.environment.path = Some(env);
    }
    if let Some(exposure) = args.exposure {
        config.exposure = exposure;
    }
    for gem in &mut config.gems {
        let m = &mut gem.material;
        if let Some(b) = args.bounces {
            m.bounces = b as i64;
        }
        if let Some(ior) = args.ior {
            m.ior = ior;
        }
        if let Some(a) = args.aberration {
            m.aberration_strength = a;
        }
        if args.fast_chroma {
            m.fast_chroma = true;
        }
    }
    config.validate().context("invalid render settings")?;

    let env = config
        .environment_map()
        .context("loading environment map")?;
    let scene = config.build_scene()?;
    let frame = config.camera_frame();

    let output = render(&frame, &scene, &env, &config.render_settings());
    output
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "Wrote {} ({}x{}, {} gem pixels)",
        args.output.display(),
        output.width,
        output.height,
        output.covered_pixels()
    );
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let mesh = match (args.shape.as_str(), args.segments) {
        ("brilliant" | "diamond", Some(n)) => shapes::round_brilliant(n),
        (name, _) => shapes::by_name(name)?,
    };
    let options = BvhOptions {
        strategy: args.strategy,
        max_leaf_tris: args.max_leaf,
    };

    let start = std::time::Instant::now();
    let bvh = Bvh::build_with(&mesh, &options);
    let build_time = start.elapsed();

    let bounds = bvh.bounds();
    let gpu = bvh.gpu_data();
    println!("Shape:     {}", args.shape);
    println!("Mesh:      {} triangles, {} vertices", mesh.triangle_count(), mesh.vertex_count());
    println!("Bounds:    {:?} .. {:?}", bounds.min.to_array(), bounds.max.to_array());
    println!("BVH:       {}", bvh.stats());
    println!("Strategy:  {:?}, built in {:.2?}", options.strategy, build_time);
    println!(
        "GPU bytes: header {}, nodes {}, triangles {}",
        gpu.header_bytes().len(),
        gpu.nodes_bytes().len(),
        gpu.triangles_bytes().len()
    );

    // Rays from the centre that find no facet point at a hole in the mesh
    let centre = bounds.centroid();
    let leaks = (0..LEAK_RAYS)
        .map(|i| fibonacci_dir(i, LEAK_RAYS))
        .filter(|&dir| !bvh.intersects_any(&Ray::new(centre, dir), None))
        .count();
    println!(
        "Closed:    {} ({leaks} of {LEAK_RAYS} rays from the centre escaped)",
        if leaks == 0 { "yes" } else { "no" }
    );
    println!(
        "Critical:  {:.2} deg at ior {}",
        critical_sine(args.ior).asin().to_degrees(),
        args.ior
    );

    // Straight-down rays over the top of the shape
    let geometry = GemGeometry::identity(&bvh);
    let (mut exited, mut exhausted, mut escaped, mut queries, mut samples) = (0, 0, 0, 0u64, 0);
    let mut back_faces = 0;
    const GRID: u32 = 32;
    for i in 0..GRID {
        for j in 0..GRID {
            let fx = (i as f32 + 0.5) / GRID as f32;
            let fz = (j as f32 + 0.5) / GRID as f32;
            let x = bounds.min.x + fx * (bounds.max.x - bounds.min.x);
            let z = bounds.min.z + fz * (bounds.max.z - bounds.min.z);
            let ray = Ray::new(Vec3::new(x, bounds.max.y + 1.0, z), Vec3::NEG_Y);
            let Some(hit) = bvh.intersect_first(&ray, None) else {
                continue;
            };
            // Outside-in rays should only ever see front faces
            if !hit.is_entering() {
                back_faces += 1;
            }
            let trace = trace_internal(&geometry, hit.point, ray.direction, hit.normal, args.ior, args.bounces);
            samples += 1;
            queries += trace.bounces as u64;
            match trace.outcome {
                TraceOutcome::Exited => exited += 1,
                TraceOutcome::Exhausted => exhausted += 1,
                TraceOutcome::Escaped => escaped += 1,
            }
        }
    }
    if samples > 0 {
        println!(
            "Traces:    {samples} rays (ior {}, {} bounces): {exited} exited, {exhausted} exhausted, {escaped} escaped, {:.2} queries/ray",
            args.ior,
            args.bounces,
            queries as f64 / samples as f64
        );
        if back_faces > 0 {
            println!("Warning:   {back_faces} rays entered through an inward-facing facet");
        }
    }
    Ok(())
}

const LEAK_RAYS: usize = 256;

/// Evenly spread unit direction `i` of `count`.
fn fibonacci_dir(i: usize, count: usize) -> Vec3 {
    let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
    let r = (1.0 - y * y).max(0.0).sqrt();
    let phi = golden * i as f32;
    Vec3::new(r * phi.cos(), y, r * phi.sin())
}
