use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tiny_skia::Pixmap;
use tracing_subscriber::EnvFilter;

use glitchbg::host::{HeadlessHost, PointerScript};
use glitchbg::page::load_and_validate_page;
use glitchbg::scene::{Orchestrator, PageAssets};
use glitchbg::schema::{Page, PageLayout};

#[derive(Debug, Parser)]
#[command(name = "glitchbg")]
#[command(about = "Procedural glitch-background renderer")]
#[command(version = env!("GLITCHBG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a page file and print a summary.
    Check { page: PathBuf },
    /// Initialize the scene and print its block layout as JSON.
    Layout {
        page: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
        /// Override the viewport width.
        #[arg(long)]
        width: Option<u32>,
    },
    /// Drive the headless host and write PNG frames.
    Render {
        page: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[arg(long, default_value_t = 48)]
        frames: u64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long, value_enum, default_value_t = PointerArg::Idle)]
        pointer: PointerArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PointerArg {
    Idle,
    Orbit,
}

impl PointerArg {
    fn script(self, fps: u32) -> PointerScript {
        match self {
            Self::Idle => PointerScript::Idle,
            Self::Orbit => PointerScript::Orbit {
                radius_ratio: 0.3,
                period_frames: fps.saturating_mul(4),
            },
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { page } => run_check(&page),
        Commands::Layout { page, seed, width } => run_layout(&page, seed, width),
        Commands::Render {
            page,
            output,
            frames,
            seed,
            width,
            pointer,
        } => run_render(&page, &output, frames, seed, width, pointer),
    }
}

fn run_check(page_path: &Path) -> Result<()> {
    let page = load_and_validate_page(page_path)?;

    println!(
        "OK: {} ({}, width {}, {} fps, breakpoint {})",
        page_path.display(),
        page.display_name(),
        page.viewport.width,
        page.timing.fps,
        page.viewport
            .breakpoint
            .map_or_else(|| "none".to_owned(), |value| value.to_string())
    );
    match &page.layout {
        PageLayout::Glitch(layout) => {
            let samples: usize = layout.samples.iter().map(|p| p.count).sum();
            let blackouts: usize = layout.blackouts.iter().map(|p| p.count).sum();
            println!("Samples: {samples}, blackouts: {blackouts}");
        }
        PageLayout::Anchored(layout) => {
            println!("Anchored images: {}", layout.images.len());
        }
    }
    Ok(())
}

fn run_layout(page_path: &Path, seed: Option<u64>, width: Option<u32>) -> Result<()> {
    let page = load_page(page_path, width)?;
    let assets = PageAssets::load(&page)?;
    let mut scene = Orchestrator::new(page, seeded_rng(seed))?;
    scene.on_assets_loaded(assets)?;

    let json = serde_json::to_string_pretty(&scene.layout_snapshot())
        .context("failed to serialize layout")?;
    println!("{json}");
    Ok(())
}

fn run_render(
    page_path: &Path,
    output_dir: &Path,
    frames: u64,
    seed: Option<u64>,
    width: Option<u32>,
    pointer: PointerArg,
) -> Result<()> {
    let page = load_page(page_path, width)?;
    let fps = page.timing.fps;
    let assets = PageAssets::load(&page)?;
    let mut host = HeadlessHost::mount(page, assets, pointer.script(fps), seeded_rng(seed))?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    for _ in 0..frames {
        host.tick()?;
        let frame_index = host.frame();
        let frame = host
            .scene()
            .last_frame()
            .ok_or_else(|| anyhow!("frame {frame_index} was not drawn"))?;
        let path = output_dir.join(format!("frame_{frame_index:05}.png"));
        write_png(&path, frame)?;

        if frame_index % u64::from(fps) == 0 {
            eprintln!("rendered frame {}/{}", frame_index, frames);
        }
    }

    let stats = host.unmount();
    println!(
        "Wrote {} frames to {} ({} pointer glitch-outs)",
        stats.frames,
        output_dir.display(),
        stats.pointer_glitch_outs
    );
    Ok(())
}

fn load_page(page_path: &Path, width: Option<u32>) -> Result<Page> {
    let mut page = load_and_validate_page(page_path)?;
    if let Some(width) = width {
        page.viewport.width = width;
        page.viewport.validate()?;
    }
    Ok(page)
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn write_png(path: &Path, pixmap: &Pixmap) -> Result<()> {
    let rgba = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect::<Vec<_>>();
    let image = RgbaImage::from_raw(pixmap.width(), pixmap.height(), rgba)
        .ok_or_else(|| anyhow!("failed to build RGBA image"))?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}
