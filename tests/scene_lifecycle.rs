use std::path::PathBuf;
use std::sync::Arc;

use glitchbg::post_process::PostEffect;
use glitchbg::scene::{Orchestrator, PageAssets, SceneState};
use glitchbg::schema::{GlitchLayout, Page, PageLayout, Timing, Viewport};
use glitchbg::source::SourceImage;
use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn page(width: u32, post: PostEffect) -> Page {
    Page {
        name: Some("main".to_owned()),
        viewport: Viewport {
            width,
            height: None,
            breakpoint: Some(700),
        },
        timing: Timing::default(),
        post,
        layout: PageLayout::Glitch(GlitchLayout::with_defaults(PathBuf::from("base.png"))),
    }
}

fn gradient_assets() -> PageAssets {
    let image = RgbaImage::from_fn(240, 427, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    PageAssets::Glitch {
        base: Arc::new(SourceImage::from_rgba(&image).expect("source should convert")),
    }
}

fn render_hashes(seed: u64, frames: u64) -> Vec<u64> {
    let mut scene = Orchestrator::new(page(800, PostEffect::default()), StdRng::seed_from_u64(seed))
        .expect("scene should build");
    scene
        .on_assets_loaded(gradient_assets())
        .expect("assets should load");

    (1..=frames)
        .map(|frame| {
            if frame % 5 == 0 {
                scene.pointer_moved(frame as f32 * 7.0, 300.0);
            }
            let pixmap = scene.draw_frame(frame).expect("frame should draw");
            fnv1a64(pixmap.data())
        })
        .collect()
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0001_0000_01b3);
    }
    hash
}

#[test]
fn same_seed_renders_identical_frames() {
    assert_eq!(render_hashes(42, 12), render_hashes(42, 12));
}

#[test]
fn different_seeds_render_different_layouts() {
    assert_ne!(render_hashes(1, 3), render_hashes(2, 3));
}

#[test]
fn glitch_out_reinitializes_each_blackout_about_half_the_time() {
    let mut scene = Orchestrator::new(page(800, PostEffect::Passthrough), StdRng::seed_from_u64(7))
        .expect("scene should build");
    scene
        .on_assets_loaded(gradient_assets())
        .expect("assets should load");

    let mut reinitialized = [0_u32; 16];
    let mut perturbed = vec![0_u32; 38];
    for _ in 0..1000 {
        let report = scene.glitch_out();
        for index in report.reinitialized {
            reinitialized[index] += 1;
        }
        for index in report.perturbed {
            perturbed[index] += 1;
        }
    }

    for (index, count) in reinitialized.iter().enumerate() {
        assert!(
            (420..=580).contains(count),
            "blackout {index} re-initialized {count} times"
        );
    }
    for (index, count) in perturbed.iter().enumerate() {
        assert!(
            (230..=370).contains(count),
            "sample {index} perturbed {count} times"
        );
    }
}

#[test]
fn perturbed_samples_stay_near_their_anchor() {
    let mut scene = Orchestrator::new(page(900, PostEffect::Passthrough), StdRng::seed_from_u64(8))
        .expect("scene should build");
    scene
        .on_assets_loaded(gradient_assets())
        .expect("assets should load");

    for _ in 0..200 {
        scene.glitch_out();
        for sample in scene.layout_snapshot().samples {
            assert!((sample.position.x - sample.original_pos.x).abs() <= 45);
            assert!((sample.position.y - sample.original_pos.y).abs() <= 45);
        }
    }
}

#[test]
fn timer_trigger_moves_blocks_over_time() {
    let mut page = page(720, PostEffect::Passthrough);
    page.timing.noise_step = 0.5;
    let mut scene = Orchestrator::new(page, StdRng::seed_from_u64(9)).expect("scene should build");
    scene
        .on_assets_loaded(gradient_assets())
        .expect("assets should load");

    let blackouts = |scene: &Orchestrator<StdRng>| {
        scene
            .layout_snapshot()
            .blackouts
            .iter()
            .map(|b| (b.position, b.size))
            .collect::<Vec<_>>()
    };

    let before = blackouts(&scene);
    for frame in 1..=300 {
        scene.draw_frame(frame).expect("frame should draw");
    }
    assert_ne!(before, blackouts(&scene));
}

#[test]
fn resize_across_breakpoint_hides_and_restores() {
    let mut scene = Orchestrator::new(page(800, PostEffect::Passthrough), StdRng::seed_from_u64(10))
        .expect("scene should build");
    scene
        .on_assets_loaded(gradient_assets())
        .expect("assets should load");

    let visible = scene.draw_frame(1).expect("frame should draw");
    assert!(visible.pixels().iter().any(|px| px.alpha() > 0));

    scene.resize(500, None).expect("resize should succeed");
    assert!(scene.is_hidden());
    let hidden = scene.draw_frame(2).expect("frame should draw");
    assert_eq!((hidden.width(), hidden.height()), (500, 890));
    assert!(hidden.pixels().iter().all(|px| px.alpha() == 0));

    scene.resize(1000, None).expect("resize should succeed");
    assert!(!scene.is_hidden());
    let snapshot = scene.layout_snapshot();
    for block in &snapshot.blackouts {
        assert!((100..=240).contains(&block.size.w));
    }
    assert_eq!(scene.state(), SceneState::Ready);
}

#[test]
fn layout_snapshot_serializes_to_json() {
    let mut scene = Orchestrator::new(page(800, PostEffect::Passthrough), StdRng::seed_from_u64(11))
        .expect("scene should build");
    scene
        .on_assets_loaded(gradient_assets())
        .expect("assets should load");

    let value = serde_json::to_value(scene.layout_snapshot()).expect("snapshot should serialize");
    assert_eq!(value["state"], "ready");
    assert_eq!(value["page"], "main");
    assert_eq!(value["samples"].as_array().map(Vec::len), Some(38));
    assert!(value["base_image"]["w"].as_f64().is_some());
}
