use std::collections::HashSet;
use std::time::Duration;

use glam::DVec2;
use wave_interference::config::Settings;
use wave_interference::field::compute_field;
use wave_interference::{
    ColourAnchor, ColourGradient, ColourPolicy, EditError, Emitter, EmitterArrangement, Engine,
    EngineEvent, Layout, MaskConfig, RenderError, Rgb, WaveParams,
};

const WAIT: Duration = Duration::from_secs(30);

fn grey_gradient() -> ColourGradient {
    ColourGradient::new(
        vec![ColourAnchor::new(Rgb::BLACK, 0.0), ColourAnchor::new(Rgb::WHITE, 100.0)],
        100,
    )
}

fn ring_engine(count: usize) -> Engine {
    Engine::new(
        grey_gradient(),
        MaskConfig::default(),
        EmitterArrangement::with_layout(
            Layout::Ring { count },
            DVec2::new(16.0, 16.0),
            WaveParams { radius: 6.0, ..WaveParams::default() },
        ),
        ColourPolicy::default(),
    )
}

#[test]
fn gradient_edit_batch_fires_one_update() {
    let mut engine = ring_engine(2);

    engine.edit_gradient(|g| {
        g.add_anchor(Rgb::new(255, 0, 0), 50.0, None);
        g.set_colour(2, Rgb::new(0, 255, 0)).unwrap();
        g.set_location(2, 25.0).unwrap();
    });

    let updates: Vec<_> = engine
        .poll_events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::GradientUpdated { .. }))
        .collect();
    assert_eq!(updates.len(), 1, "three edits in one batch should produce one update");
    assert_eq!(engine.colour_at(25.0), Rgb::new(0, 255, 0));
}

#[test]
fn rejected_gradient_batch_fires_nothing() {
    let mut engine = ring_engine(2);
    let result = engine.edit_gradient(|g| g.remove_anchor(0));
    assert_eq!(result, Err(EditError::TooFewAnchors { min: 2 }));
    assert_eq!(engine.gradient().anchor_count(), 2);
    assert!(engine.poll_events().is_empty(), "a rejected edit changes nothing");
}

#[test]
fn requested_render_arrives_with_its_generation() {
    let mut engine = ring_engine(3);
    let generation = engine.request_render(32, 24);

    match engine.wait_event(WAIT) {
        Some(EngineEvent::RenderReady { generation: got, frame }) => {
            assert_eq!(got, generation);
            assert_eq!((frame.width(), frame.height()), (32, 24));
        }
        other => panic!("expected a finished render, got {other:?}"),
    }
}

#[test]
fn newest_request_wins() {
    let mut engine = ring_engine(3);
    let mut last = 0;
    for _ in 0..5 {
        last = engine.request_render(64, 64);
    }
    assert_eq!(engine.latest_generation(), last);

    // Earlier requests may or may not finish first, but the newest one always
    // arrives and nothing older is handed out after it.
    let mut seen = Vec::new();
    while let Some(event) = engine.wait_event(WAIT) {
        let generation = event.generation().expect("only render events were queued");
        seen.push(generation);
        if generation == last {
            break;
        }
    }
    assert_eq!(seen.last(), Some(&last));
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "generations must increase: {seen:?}");
}

#[test]
fn empty_arrangement_reports_nothing_to_render() {
    let mut engine = ring_engine(0);
    let generation = engine.request_render(16, 16);
    match engine.wait_event(WAIT) {
        Some(EngineEvent::NothingToRender { generation: got, reason }) => {
            assert_eq!(got, generation);
            assert_eq!(reason, RenderError::NoEmitters);
        }
        other => panic!("expected nothing-to-render, got {other:?}"),
    }
}

#[test]
fn zero_size_reports_invalid_dimensions() {
    let mut engine = ring_engine(2);
    assert_eq!(
        engine.render_now(0, 10).err(),
        Some(RenderError::InvalidDimensions { width: 0, height: 10 })
    );
}

#[test]
fn mask_config_is_clamped_on_set() {
    let mut engine = ring_engine(1);
    engine.set_mask(MaskConfig { duty_cycle: 3.0, smooth: -1.0, num_revs: 0.0, ..MaskConfig::default() });
    assert_eq!(engine.mask().duty_cycle, 1.0);
    assert_eq!(engine.mask().smooth, 0.0);
    assert!(engine.mask().num_revs > 0.0);
}

#[test]
fn single_centred_emitter_end_to_end() {
    let params = WaveParams {
        wavelength: 2.0,
        attenuation: 0.0,
        distance_offset: 0.0,
        ..WaveParams::default()
    };
    let arrangement = EmitterArrangement::explicit(vec![Emitter::new(2.0, 2.0)], params);
    let field = compute_field(4, 4, &arrangement).unwrap();

    let at_emitter = field.get(2, 2).unwrap();
    assert!((at_emitter.norm() - 1.0).abs() < 1e-9);
    assert!(at_emitter.arg().abs() < 1e-9);

    // Equal radial distance, equal phasor.
    for (a, b) in [((1, 2), (3, 2)), ((2, 1), (2, 3)), ((1, 2), (2, 1)), ((1, 1), (3, 3))] {
        let za = field.get(a.0, a.1).unwrap();
        let zb = field.get(b.0, b.1).unwrap();
        assert!((za.norm() - zb.norm()).abs() < 1e-9);
        assert!((za.arg() - zb.arg()).abs() < 1e-9, "{a:?} and {b:?} should share a phase");
    }

    // The same scene through the engine renders symmetric pixels too.
    let mut engine = Engine::new(grey_gradient(), MaskConfig::default(), arrangement, ColourPolicy::default());
    let frame = engine.render_now(4, 4).unwrap();
    assert_eq!(frame.pixel(1, 2), frame.pixel(3, 2));
    assert_eq!(frame.pixel(2, 1), frame.pixel(2, 3));
}

#[test]
fn default_settings_render_a_varied_frame() {
    let settings = Settings::default();
    let mut engine = Engine::from_settings(&settings);
    let (w, h) = (settings.window.width, settings.window.height);
    let on_pixel_centre = engine
        .arrangement()
        .emitters()
        .iter()
        .any(|e| e.position.x.fract() == 0.0 && e.position.y.fract() == 0.0);
    assert!(on_pixel_centre, "the default ring puts an emitter on a pixel centre");

    let frame = engine.render_now(w, h).unwrap();
    let distinct: HashSet<u32> = frame.as_slice().iter().copied().collect();
    assert!(
        distinct.len() > 50,
        "default frame should show the interference pattern, got {} colours",
        distinct.len()
    );
}
