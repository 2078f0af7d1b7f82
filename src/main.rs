// What you SEE:
// • The interference pattern of a ring of point emitters, recoloured live.
// • Hold Left Mouse and drag: the emitter ring grows/shrinks with the pointer.
// • Up/Down: wavelength. Left/Right: attenuation. +/-: emitter count.
// • H / V: mirror emitters across the vertical / horizontal centre line.
// • M: periodic mask. P: gradient <-> hue wheel. S: scalar (real/mag/int/phase).
// • R: reverse the gradient (one batch of edits, one rebuild).
// • ESC cancels an active drag; otherwise it quits.

mod draw;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glam::DVec2;
use minifb::Key;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use draw::{Viewer, colour_bar, draw_colour_bar, draw_crosshair, draw_placeholder, draw_text_5x7};
use wave_interference::config::Settings;
use wave_interference::field::Layout;
use wave_interference::interaction::RadiusDrag;
use wave_interference::render::{Palette, ScalarSource};
use wave_interference::types::PixelBuffer;
use wave_interference::{Engine, EngineEvent, RenderError};

/// Interactive wave interference viewer.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML settings file.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    /// Number of emitters in the ring or line layout.
    #[arg(long)]
    emitters: Option<usize>,
    #[arg(long)]
    wavelength: Option<f64>,
    #[arg(long)]
    attenuation: Option<f64>,
    #[arg(long, value_enum)]
    palette: Option<PaletteArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PaletteArg {
    Gradient,
    HueWheel,
}

impl From<PaletteArg> for Palette {
    fn from(value: PaletteArg) -> Self {
        match value {
            PaletteArg::Gradient => Palette::Gradient,
            PaletteArg::HueWheel => Palette::HueWheel,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let ansi = std::io::IsTerminal::is_terminal(&std::io::stdout());
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_ansi(ansi).init();
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(w) = args.width { settings.window.width = w; }
    if let Some(h) = args.height { settings.window.height = h; }
    if let Some(n) = args.emitters { settings.emitters.count = n; }
    if let Some(wl) = args.wavelength { settings.waves.wavelength = wl; }
    if let Some(a) = args.attenuation { settings.waves.attenuation = a; }
    if let Some(p) = args.palette { settings.colour.palette = p.into(); }
    Ok(settings)
}

fn scalar_label(source: ScalarSource) -> &'static str {
    match source {
        ScalarSource::Real => "REAL",
        ScalarSource::Magnitude => "MAG",
        ScalarSource::Intensity => "INT",
        ScalarSource::Phase => "PHASE",
    }
}

/// Step the emitter count of a generated layout; explicit layouts stay put.
fn step_count(layout: Layout, delta: isize) -> Option<Layout> {
    let bump = |n: usize| n.saturating_add_signed(delta);
    match layout {
        Layout::Ring { count } => Some(Layout::Ring { count: bump(count) }),
        Layout::Line { count } => Some(Layout::Line { count: bump(count) }),
        Layout::Explicit => None,
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings(&args)?;
    let (w, h) = (settings.window.width, settings.window.height);
    info!(width = w, height = h, "starting wave interference viewer");

    /* --- Engine + window setup ---
       Visual: window opens; the first frame shows up once the worker finishes it. */
    let mut engine = Engine::from_settings(&settings);
    let mut viewer = Viewer::new("Wave Interference", w, h).context("failed to open window")?;

    /* --- Reusable buffers ---
       `frame` is the newest finished render; `screen` is what gets presented. */
    let mut frame = PixelBuffer::new(w, h, 0);
    let mut screen = frame.clone();
    let mut nothing_to_render: Option<RenderError> = None;
    let bar_width = (w / 3).max(2);
    let mut bar = colour_bar(&engine.gradient_lut(), bar_width);
    let mut drag = RadiusDrag::default();

    let mut shown_generation = 0;
    let mut needs_render = true;
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;

    /* ------------------------------ Main loop ------------------------------ */
    while viewer.is_open() {
        /* 1) Inputs: every edit goes through a validated engine mutator. */
        if viewer.pressed_once(Key::Escape) {
            if !engine.update_arrangement(|a| drag.cancel(a)) {
                break;
            }
            needs_render = true;
        }
        if viewer.pressed_once(Key::Up) {
            engine.update_arrangement(|a| a.set_wavelength(a.params().wavelength * 1.1));
            needs_render = true;
        }
        if viewer.pressed_once(Key::Down) {
            engine.update_arrangement(|a| a.set_wavelength(a.params().wavelength / 1.1));
            needs_render = true;
        }
        if viewer.pressed_once(Key::Left) {
            engine.update_arrangement(|a| a.set_attenuation(a.params().attenuation - 0.1));
            needs_render = true;
        }
        if viewer.pressed_once(Key::Right) {
            engine.update_arrangement(|a| a.set_attenuation(a.params().attenuation + 0.1));
            needs_render = true;
        }
        for (key, delta) in [(Key::Equal, 1), (Key::Minus, -1)] {
            if viewer.pressed_once(key) {
                if let Some(layout) = step_count(engine.arrangement().layout(), delta) {
                    engine.update_arrangement(|a| a.set_layout(layout));
                    needs_render = true;
                }
            }
        }
        if viewer.pressed_once(Key::H) {
            let p = *engine.arrangement().params();
            engine.update_arrangement(|a| a.set_mirrors(!p.mirror_horizontal, p.mirror_vertical));
            needs_render = true;
        }
        if viewer.pressed_once(Key::V) {
            let p = *engine.arrangement().params();
            engine.update_arrangement(|a| a.set_mirrors(p.mirror_horizontal, !p.mirror_vertical));
            needs_render = true;
        }
        if viewer.pressed_once(Key::M) {
            let mut mask = *engine.mask();
            mask.enabled = !mask.enabled;
            engine.set_mask(mask);
            needs_render = true;
        }
        if viewer.pressed_once(Key::P) {
            let mut policy = *engine.policy();
            policy.palette = policy.palette.next();
            engine.set_policy(policy);
            needs_render = true;
        }
        if viewer.pressed_once(Key::S) {
            let mut policy = *engine.policy();
            policy.source = policy.source.next();
            engine.set_policy(policy);
            needs_render = true;
        }
        if viewer.pressed_once(Key::R) {
            // Visual: colours flip end-to-end; the bar refreshes once.
            engine.edit_gradient(|g| {
                for i in 0..g.anchor_count() {
                    let location = 100.0 - g.anchors()[i].location;
                    let _ = g.set_location(i, location);
                }
            });
            needs_render = true;
        }

        /* 2) Drag-to-resize: press starts, motion scales, release commits. */
        let pointer = viewer.mouse_pos().map(|(x, y)| DVec2::new(x, y));
        match (viewer.left_mouse_down(), pointer) {
            (true, Some(p)) if !drag.is_dragging() => drag.press(engine.arrangement(), p),
            (true, Some(p)) => {
                if engine.update_arrangement(|a| drag.drag_to(a, p)) {
                    needs_render = true;
                }
            }
            (false, _) => {
                drag.release();
            }
            _ => {}
        }

        /* 3) Ask for a new frame; older in-flight renders are superseded. */
        if needs_render {
            let generation = engine.request_render(w, h);
            debug!(generation, "render requested");
            needs_render = false;
        }

        /* 4) Collect results. Stale frames never come out of poll_events. */
        for event in engine.poll_events() {
            match event {
                EngineEvent::GradientUpdated { revision } => {
                    debug!(revision, "gradient updated; refreshing colour bar");
                    bar = colour_bar(&engine.gradient_lut(), bar_width);
                }
                EngineEvent::RenderReady { generation, frame: ready } => {
                    frame = ready;
                    shown_generation = generation;
                    nothing_to_render = None;
                }
                EngineEvent::NothingToRender { generation, reason } => {
                    info!(generation, %reason, "nothing to render");
                    shown_generation = generation;
                    nothing_to_render = Some(reason);
                }
            }
        }

        /* 5) Compose: frame (or placeholder), emitter marks, colour bar, HUD. */
        if nothing_to_render.is_some() {
            draw_placeholder(&mut screen, "NOTHING TO RENDER");
        } else {
            screen.as_mut_slice().copy_from_slice(frame.as_slice());
        }
        for e in engine.arrangement().emitters() {
            let (x, y) = (e.position.x.round() as i32, e.position.y.round() as i32);
            draw_crosshair(&mut screen, x, y, 6, 0x00_FF_CC_33);
        }
        if engine.policy().palette == Palette::Gradient {
            draw_colour_bar(&mut screen, &bar, 8, h as i32 - 16, 8);
        }

        let p = engine.arrangement().params();
        let hud = format!(
            "GEN {shown_generation} | WL {:.1} | ATT {:.2} | R {:.0} | {} {}{}{}",
            p.wavelength,
            p.attenuation,
            p.radius,
            scalar_label(engine.policy().source),
            if engine.policy().palette == Palette::Gradient { "GRAD" } else { "HUE" },
            if engine.mask().enabled { " MASK" } else { "" },
            if drag.is_dragging() { " | DRAG" } else { "" },
        );
        draw_text_5x7(&mut screen, 8, 8, &hud, 0x00_FF_FF_FF);

        /* 6) Present to the window. */
        viewer.present(&screen).context("failed to present frame")?;

        /* 7) FPS counter (logged once per second). */
        frames_this_second += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let fps = frames_this_second as f32 / now.duration_since(last_fps_time).as_secs_f32();
            debug!("frame rate {fps:.1}");
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    info!("viewer closed");
    Ok(())
}
