//! Page orchestration: populations, per-frame layering and glitch-out passes.
//!
//! An [`Orchestrator`] owns one page. It starts in [`SceneState::Loading`],
//! builds its block populations once the page assets arrive, and from then
//! on composes a frame per clock tick: clear, base image, blackouts, samples,
//! post stage. Glitch-out passes fire from a noise-driven timer and from
//! pointer movement.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;
use tiny_skia::Pixmap;

use crate::anchored::AnchoredImage;
use crate::area::Area;
use crate::base_image::BaseImage;
use crate::block::{Block, GlitchBlock};
use crate::canvas::{Canvas, PixmapCanvas};
use crate::geometry::{CanvasSize, Point, ScaledRect, Size};
use crate::noise::Noise;
use crate::post_process::{build_post_stage, PostProcess, PostUniforms};
use crate::sample::{GlitchSample, Sample};
use crate::schema::{AnchoredLayout, GlitchLayout, GlitchProbabilities, Page, PageLayout};
use crate::source::SourceImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneState {
    Loading,
    Ready,
    Stopped,
}

/// Decoded images a page needs before it can leave `Loading`.
#[derive(Debug, Clone)]
pub enum PageAssets {
    Glitch { base: Arc<SourceImage> },
    Anchored { images: Vec<Arc<SourceImage>> },
}

impl PageAssets {
    /// Decode every image the page references. Paths are used as given, so
    /// pages should come from `load_and_validate_page`.
    pub fn load(page: &Page) -> Result<Self> {
        match &page.layout {
            PageLayout::Glitch(layout) => Ok(Self::Glitch {
                base: Arc::new(open_asset(&layout.base_image)?),
            }),
            PageLayout::Anchored(layout) => {
                let images = layout
                    .images
                    .iter()
                    .map(|image| open_asset(&image.path).map(Arc::new))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Anchored { images })
            }
        }
    }
}

fn open_asset(path: &Path) -> Result<SourceImage> {
    SourceImage::open(path).with_context(|| format!("failed loading asset {}", path.display()))
}

/// Indices touched by one glitch-out pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlitchOutReport {
    pub perturbed: Vec<usize>,
    pub reinitialized: Vec<usize>,
}

impl GlitchOutReport {
    pub fn is_empty(&self) -> bool {
        self.perturbed.is_empty() && self.reinitialized.is_empty()
    }
}

struct GlitchScene {
    base: BaseImage,
    blackouts: Vec<GlitchBlock>,
    samples: Vec<GlitchSample>,
    probabilities: GlitchProbabilities,
}

impl GlitchScene {
    fn build(
        layout: &GlitchLayout,
        source: Arc<SourceImage>,
        canvas: CanvasSize,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        let mut samples = Vec::new();
        for population in &layout.samples {
            for _ in 0..population.count {
                let render_area = Area::new(population.render_area, canvas)?;
                let sample_area = Area::new(population.sample_area, source.dimensions())?;
                let block = GlitchBlock::new(
                    render_area,
                    population.min_size_ratio,
                    population.max_size_ratio,
                );
                samples.push(
                    GlitchSample::new(block, Arc::clone(&source), sample_area, population.policy)
                        .initialized(rng),
                );
            }
        }
        samples.shuffle(rng);

        let mut blackouts = Vec::new();
        for population in &layout.blackouts {
            for _ in 0..population.count {
                let render_area = Area::new(population.render_area, canvas)?;
                blackouts.push(
                    GlitchBlock::new(
                        render_area,
                        population.min_size_ratio,
                        population.max_size_ratio,
                    )
                    .initialized(rng),
                );
            }
        }

        Ok(Self {
            base: BaseImage::new(source, layout.base_scale, canvas),
            blackouts,
            samples,
            probabilities: layout.probabilities,
        })
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        self.base.render(canvas);
        for block in &self.blackouts {
            block.render(canvas);
        }
        for sample in &self.samples {
            sample.render(canvas);
        }
    }

    fn resize(&mut self, canvas: CanvasSize, rng: &mut dyn RngCore) {
        self.base.resize(canvas);
        for sample in &mut self.samples {
            sample.resize(canvas, rng);
        }
        for block in &mut self.blackouts {
            block.resize(canvas, rng);
        }
    }

    fn glitch_out(&mut self, rng: &mut dyn RngCore) -> GlitchOutReport {
        let mut report = GlitchOutReport::default();
        for (index, sample) in self.samples.iter_mut().enumerate() {
            if rng.random_bool(self.probabilities.perturb) {
                sample.perturb(rng);
                report.perturbed.push(index);
            }
        }
        for (index, block) in self.blackouts.iter_mut().enumerate() {
            if rng.random_bool(self.probabilities.reinitialize) {
                block.initialize(rng);
                report.reinitialized.push(index);
            }
        }
        report
    }
}

struct AnchoredScene {
    images: Vec<AnchoredImage>,
}

impl AnchoredScene {
    fn build(layout: &AnchoredLayout, images: Vec<Arc<SourceImage>>) -> Result<Self> {
        if images.len() != layout.images.len() {
            bail!(
                "anchored page expects {} images, got {}",
                layout.images.len(),
                images.len()
            );
        }
        let images = images
            .into_iter()
            .zip(&layout.images)
            .map(|(image, config)| AnchoredImage::new(image, config.layout))
            .collect();
        Ok(Self { images })
    }

    fn render(&self, canvas: &mut dyn Canvas, size: CanvasSize) {
        for image in &self.images {
            image.render(canvas, size);
        }
    }
}

enum SceneContent {
    Glitch(GlitchScene),
    Anchored(AnchoredScene),
}

pub struct Orchestrator<R: RngCore = StdRng> {
    page: Page,
    rng: R,
    state: SceneState,
    viewport_width: u32,
    canvas_size: CanvasSize,
    buffer: PixmapCanvas,
    post: Box<dyn PostProcess>,
    noise: Noise,
    content: Option<SceneContent>,
    pointer: (f32, f32),
    previous_pointer: (f32, f32),
    frame: Option<Pixmap>,
}

impl Orchestrator<StdRng> {
    /// Orchestrator seeded from the operating system.
    pub fn from_os_rng(page: Page) -> Result<Self> {
        Self::new(page, StdRng::from_os_rng())
    }
}

impl<R: RngCore> Orchestrator<R> {
    pub fn new(page: Page, mut rng: R) -> Result<Self> {
        page.validate()?;
        let viewport_width = page.viewport.width;
        let canvas_size = canvas_for(&page.layout, viewport_width, page.viewport.height);
        let (width, height) = canvas_size.pixel_dimensions();
        let buffer = PixmapCanvas::new(width, height)?;
        let post = build_post_stage(&page.post);
        let noise = Noise::new(&mut rng);

        tracing::debug!(
            page = page.display_name(),
            width,
            height,
            post = post.label(),
            "scene created"
        );

        Ok(Self {
            page,
            rng,
            state: SceneState::Loading,
            viewport_width,
            canvas_size,
            buffer,
            post,
            noise,
            content: None,
            pointer: (0.0, 0.0),
            previous_pointer: (0.0, 0.0),
            frame: None,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas_size
    }

    /// True while the viewport is narrower than the page breakpoint.
    pub fn is_hidden(&self) -> bool {
        self.page
            .viewport
            .breakpoint
            .is_some_and(|breakpoint| self.viewport_width < breakpoint)
    }

    pub fn pointer(&self) -> (f32, f32) {
        self.pointer
    }

    pub fn last_frame(&self) -> Option<&Pixmap> {
        self.frame.as_ref()
    }

    /// Build the page populations and enter `Ready`.
    pub fn on_assets_loaded(&mut self, assets: PageAssets) -> Result<()> {
        if self.state != SceneState::Loading {
            bail!("assets delivered while scene is {:?}", self.state);
        }

        let content = match (&self.page.layout, assets) {
            (PageLayout::Glitch(layout), PageAssets::Glitch { base }) => SceneContent::Glitch(
                GlitchScene::build(layout, base, self.canvas_size, &mut self.rng)?,
            ),
            (PageLayout::Anchored(layout), PageAssets::Anchored { images }) => {
                SceneContent::Anchored(AnchoredScene::build(layout, images)?)
            }
            _ => bail!(
                "assets do not match the '{}' page layout",
                self.page.display_name()
            ),
        };

        match &content {
            SceneContent::Glitch(scene) => tracing::info!(
                page = self.page.display_name(),
                samples = scene.samples.len(),
                blackouts = scene.blackouts.len(),
                "glitch populations generated"
            ),
            SceneContent::Anchored(scene) => tracing::info!(
                page = self.page.display_name(),
                images = scene.images.len(),
                "anchored images placed"
            ),
        }

        self.content = Some(content);
        self.state = SceneState::Ready;
        Ok(())
    }

    /// Compose frame `frame_index` and return the post-processed result.
    pub fn draw_frame(&mut self, frame_index: u64) -> Result<&Pixmap> {
        if self.state == SceneState::Stopped {
            bail!("cannot draw frame {frame_index}: scene is stopped");
        }

        self.buffer.clear();
        let visible = !self.is_hidden();
        if visible {
            match &self.content {
                Some(SceneContent::Glitch(scene)) => scene.render(&mut self.buffer),
                Some(SceneContent::Anchored(scene)) => {
                    scene.render(&mut self.buffer, self.canvas_size)
                }
                None => {}
            }
        }

        let uniforms = PostUniforms::new(
            self.canvas_size,
            frame_index,
            self.pointer,
            self.previous_pointer,
            self.page.timing.time_scale,
        );
        self.previous_pointer = self.pointer;
        let output = self
            .post
            .apply(self.buffer.pixmap(), &uniforms)
            .with_context(|| format!("post stage failed on frame {frame_index}"))?;

        if visible {
            if let Some(SceneContent::Glitch(scene)) = &mut self.content {
                let level = self
                    .noise
                    .sample(frame_index as f32 * self.page.timing.noise_step);
                if level < scene.probabilities.timer_threshold {
                    let report = scene.glitch_out(&mut self.rng);
                    tracing::trace!(
                        frame = frame_index,
                        perturbed = report.perturbed.len(),
                        reinitialized = report.reinitialized.len(),
                        "timer glitch-out"
                    );
                }
            }
        }

        Ok(&*self.frame.insert(output))
    }

    /// Record a pointer move; may run a glitch-out pass.
    pub fn pointer_moved(&mut self, x: f32, y: f32) -> Option<GlitchOutReport> {
        if self.state == SceneState::Stopped {
            return None;
        }
        self.pointer = (x, y);
        if self.is_hidden() {
            return None;
        }

        let Some(SceneContent::Glitch(scene)) = &mut self.content else {
            return None;
        };
        if !self.rng.random_bool(scene.probabilities.pointer) {
            return None;
        }
        Some(scene.glitch_out(&mut self.rng))
    }

    /// Run one glitch-out pass unconditionally. Anchored and loading scenes
    /// have nothing to glitch and return an empty report.
    pub fn glitch_out(&mut self) -> GlitchOutReport {
        match &mut self.content {
            Some(SceneContent::Glitch(scene)) => scene.glitch_out(&mut self.rng),
            _ => GlitchOutReport::default(),
        }
    }

    /// Apply a new viewport size: reallocate the buffer, move the base image
    /// and re-lay out every block.
    pub fn resize(&mut self, width: u32, height: Option<u32>) -> Result<()> {
        if width == 0 || height == Some(0) {
            bail!("viewport must be non-empty, got {width}x{height:?}");
        }
        if self.state == SceneState::Stopped {
            bail!("cannot resize a stopped scene");
        }

        self.viewport_width = width;
        self.canvas_size = canvas_for(&self.page.layout, width, height);
        let (pixel_width, pixel_height) = self.canvas_size.pixel_dimensions();
        self.buffer.resize(pixel_width, pixel_height)?;

        if let Some(SceneContent::Glitch(scene)) = &mut self.content {
            scene.resize(self.canvas_size, &mut self.rng);
        }

        tracing::info!(
            page = self.page.display_name(),
            width = pixel_width,
            height = pixel_height,
            hidden = self.is_hidden(),
            "scene resized"
        );
        Ok(())
    }

    /// Drop every block and stop accepting frames.
    pub fn teardown(&mut self) {
        if self.state == SceneState::Stopped {
            return;
        }
        self.content = None;
        self.frame = None;
        self.state = SceneState::Stopped;
        tracing::info!(page = self.page.display_name(), "scene stopped");
    }

    pub fn layout_snapshot(&self) -> LayoutSnapshot {
        let mut snapshot = LayoutSnapshot {
            page: self.page.display_name().to_owned(),
            state: self.state,
            canvas: self.canvas_size,
            hidden: self.is_hidden(),
            base_image: None,
            blackouts: Vec::new(),
            samples: Vec::new(),
            anchored: Vec::new(),
        };

        match &self.content {
            Some(SceneContent::Glitch(scene)) => {
                snapshot.base_image = Some(scene.base.bounds());
                snapshot.blackouts = scene
                    .blackouts
                    .iter()
                    .map(|block| BlockSnapshot {
                        position: block.position(),
                        size: block.size(),
                    })
                    .collect();
                snapshot.samples = scene
                    .samples
                    .iter()
                    .map(|sample| SampleSnapshot {
                        policy: sample.policy().name(),
                        position: sample.position(),
                        original_pos: sample.original_pos(),
                        size: sample.size(),
                        sample_origin: sample.sample_origin(),
                        sample_size: sample.sample_size(),
                    })
                    .collect();
            }
            Some(SceneContent::Anchored(scene)) => {
                snapshot.anchored = scene
                    .images
                    .iter()
                    .map(|image| image.bounds(self.canvas_size))
                    .collect();
            }
            None => {}
        }

        snapshot
    }
}

fn canvas_for(layout: &PageLayout, width: u32, height: Option<u32>) -> CanvasSize {
    let width = width as f32;
    match (layout, height) {
        (PageLayout::Anchored(_), Some(height)) => CanvasSize::new(width, height as f32),
        _ => CanvasSize::from_width(width),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutSnapshot {
    pub page: String,
    pub state: SceneState,
    pub canvas: CanvasSize,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_image: Option<ScaledRect>,
    pub blackouts: Vec<BlockSnapshot>,
    pub samples: Vec<SampleSnapshot>,
    pub anchored: Vec<ScaledRect>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BlockSnapshot {
    pub position: Point,
    pub size: Size,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SampleSnapshot {
    pub policy: &'static str,
    pub position: Point,
    pub original_pos: Point,
    pub size: Size,
    pub sample_origin: Point,
    pub sample_size: Size,
}
