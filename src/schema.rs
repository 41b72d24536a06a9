use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;

use crate::anchored::AnchoredImageConfig;
use crate::area::AreaLimits;
use crate::post_process::PostEffect;
use crate::sample::SamplePolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page {
    #[serde(default)]
    pub name: Option<String>,
    pub viewport: Viewport,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub post: PostEffect,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub layout: PageLayout,
}

impl Page {
    pub fn validate(&self) -> Result<()> {
        self.viewport.validate()?;
        self.timing.validate()?;
        self.layout.validate()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(match self.layout {
            PageLayout::Glitch(_) => "glitch",
            PageLayout::Anchored(_) => "anchored",
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Viewport {
    pub width: u32,
    /// Anchored pages fill the viewport; glitch pages derive their height
    /// from the width and ignore this.
    #[serde(default)]
    pub height: Option<u32>,
    /// Below this width the background is hidden.
    #[serde(default = "default_breakpoint")]
    pub breakpoint: Option<u32>,
}

fn default_breakpoint() -> Option<u32> {
    Some(700)
}

impl Viewport {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            bail!("viewport width must be > 0");
        }
        if self.height == Some(0) {
            bail!("viewport height must be > 0 when given");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timing {
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Multiplier turning the frame counter into the `time` uniform.
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    /// Noise-space distance between consecutive frames.
    #[serde(default = "default_noise_step")]
    pub noise_step: f32,
}

fn default_fps() -> u32 {
    24
}

fn default_time_scale() -> f32 {
    0.000001
}

fn default_noise_step() -> f32 {
    0.05
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            time_scale: default_time_scale(),
            noise_step: default_noise_step(),
        }
    }
}

impl Timing {
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            bail!("fps must be > 0");
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            bail!("time_scale must be >= 0, got {}", self.time_scale);
        }
        if !self.noise_step.is_finite() || self.noise_step <= 0.0 {
            bail!("noise_step must be > 0, got {}", self.noise_step);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLayout {
    Glitch(GlitchLayout),
    Anchored(AnchoredLayout),
}

impl PageLayout {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Glitch(layout) => layout.validate(),
            Self::Anchored(layout) => layout.validate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlitchLayout {
    pub base_image: PathBuf,
    #[serde(default = "default_base_scale")]
    pub base_scale: f32,
    #[serde(default)]
    pub probabilities: GlitchProbabilities,
    #[serde(default = "default_blackouts")]
    pub blackouts: Vec<BlackoutPopulation>,
    #[serde(default = "default_samples")]
    pub samples: Vec<SamplePopulation>,
}

fn default_base_scale() -> f32 {
    0.9
}

impl GlitchLayout {
    /// Main page populations around `base_image`.
    pub fn with_defaults(base_image: PathBuf) -> Self {
        Self {
            base_image,
            base_scale: default_base_scale(),
            probabilities: GlitchProbabilities::default(),
            blackouts: default_blackouts(),
            samples: default_samples(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_scale.is_finite() || self.base_scale <= 0.0 {
            bail!("base_scale must be > 0, got {}", self.base_scale);
        }
        self.probabilities.validate()?;

        for (index, population) in self.blackouts.iter().enumerate() {
            population
                .validate()
                .map_err(|error| anyhow!("blackouts[{index}]: {error}"))?;
        }
        for (index, population) in self.samples.iter().enumerate() {
            population
                .validate()
                .map_err(|error| anyhow!("samples[{index}]: {error}"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlitchProbabilities {
    /// Frame trigger fires while the noise value is below this.
    #[serde(default = "default_timer_threshold")]
    pub timer_threshold: f32,
    #[serde(default = "default_pointer")]
    pub pointer: f64,
    #[serde(default = "default_perturb")]
    pub perturb: f64,
    #[serde(default = "default_reinitialize")]
    pub reinitialize: f64,
}

fn default_timer_threshold() -> f32 {
    0.25
}

fn default_pointer() -> f64 {
    0.85
}

fn default_perturb() -> f64 {
    0.3
}

fn default_reinitialize() -> f64 {
    0.5
}

impl Default for GlitchProbabilities {
    fn default() -> Self {
        Self {
            timer_threshold: default_timer_threshold(),
            pointer: default_pointer(),
            perturb: default_perturb(),
            reinitialize: default_reinitialize(),
        }
    }
}

impl GlitchProbabilities {
    pub fn validate(&self) -> Result<()> {
        validate_probability("timer_threshold", f64::from(self.timer_threshold))?;
        validate_probability("pointer", self.pointer)?;
        validate_probability("perturb", self.perturb)?;
        validate_probability("reinitialize", self.reinitialize)
    }
}

fn validate_probability(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("probability '{name}' must be within [0, 1], got {value}");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlackoutPopulation {
    pub count: usize,
    pub render_area: AreaLimits,
    pub min_size_ratio: f32,
    pub max_size_ratio: f32,
}

impl BlackoutPopulation {
    pub fn validate(&self) -> Result<()> {
        self.render_area.validate()?;
        validate_size_ratios(self.min_size_ratio, self.max_size_ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplePopulation {
    pub count: usize,
    pub policy: SamplePolicy,
    pub sample_area: AreaLimits,
    pub render_area: AreaLimits,
    pub min_size_ratio: f32,
    pub max_size_ratio: f32,
}

impl SamplePopulation {
    pub fn validate(&self) -> Result<()> {
        self.sample_area
            .validate()
            .map_err(|error| anyhow!("sample_area: {error}"))?;
        self.render_area
            .validate()
            .map_err(|error| anyhow!("render_area: {error}"))?;
        validate_size_ratios(self.min_size_ratio, self.max_size_ratio)?;
        if let SamplePolicy::Fragment {
            min_sample_ratio,
            max_sample_ratio,
        } = self.policy
        {
            validate_size_ratios(min_sample_ratio, max_sample_ratio)?;
        }
        Ok(())
    }
}

fn validate_size_ratios(min: f32, max: f32) -> Result<()> {
    for value in [min, max] {
        if !value.is_finite() || value <= 0.0 {
            bail!("size ratios must be > 0, got {value}");
        }
    }
    Ok(())
}

pub fn default_blackouts() -> Vec<BlackoutPopulation> {
    vec![BlackoutPopulation {
        count: 16,
        render_area: AreaLimits::frame(0.75, 0.55),
        min_size_ratio: 0.1,
        max_size_ratio: 0.24,
    }]
}

pub fn default_samples() -> Vec<SamplePopulation> {
    vec![
        SamplePopulation {
            count: 8,
            policy: SamplePolicy::Strip,
            sample_area: AreaLimits::frame(1.0, 0.01),
            render_area: AreaLimits::centered(0.65),
            min_size_ratio: 0.04 * 1.5,
            max_size_ratio: 0.017 * 1.5,
        },
        SamplePopulation {
            count: 15,
            policy: SamplePolicy::Fragment {
                min_sample_ratio: 0.2,
                max_sample_ratio: 0.25,
            },
            sample_area: AreaLimits::frame(1.0, 0.1),
            render_area: AreaLimits::centered(0.65),
            min_size_ratio: 0.09 * 1.5,
            max_size_ratio: 0.16 * 1.5,
        },
        SamplePopulation {
            count: 15,
            policy: SamplePolicy::Fragment {
                min_sample_ratio: 0.1,
                max_sample_ratio: 0.15,
            },
            sample_area: AreaLimits::frame(1.0, 0.4),
            render_area: AreaLimits::centered(0.65),
            min_size_ratio: 0.04 * 1.5,
            max_size_ratio: 0.07 * 1.5,
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchoredLayout {
    pub images: Vec<AnchoredImageConfig>,
}

impl AnchoredLayout {
    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() {
            bail!("anchored layout must define at least one image");
        }
        for (index, image) in self.images.iter().enumerate() {
            image
                .layout
                .validate()
                .map_err(|error| anyhow!("images[{index}]: {error}"))?;
        }
        Ok(())
    }
}
