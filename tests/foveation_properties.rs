use foveated_renderer::config::{LayerConfig, RenderConfig};
use foveated_renderer::foveation::geometry::{compute_geometry, Viewport};

const SCREEN: (u32, u32) = (1920, 1080);

fn reference_config() -> RenderConfig {
    let mut config = RenderConfig::default_for_screen(SCREEN.0, SCREEN.1);
    config.layers = vec![
        LayerConfig::new((1920, 1080), (640, 360)),
        LayerConfig::new((900, 900), (450, 450)),
        LayerConfig::new((250, 250), (250, 250)),
    ];
    config
}

#[test]
fn reference_configuration_validates() {
    assert!(reference_config().validate(SCREEN).is_ok());
}

#[test]
fn base_layer_covers_full_normalized_screen() {
    // The base layer carries no boundary; its coverage is the whole screen
    // by the validated size invariant, so every pixel has a fallback sample.
    let config = reference_config();
    assert_eq!(config.layers[0].size, SCREEN);

    let geometry = compute_geometry(SCREEN, &config.layers);
    for boundary in &geometry.boundaries {
        assert!(boundary.left > 0.0 && boundary.right < 1.0);
        assert!(boundary.top > 0.0 && boundary.bottom < 1.0);
    }
}

#[test]
fn resolution_never_exceeds_footprint() {
    let config = reference_config();
    for layer in &config.layers {
        assert!(layer.resolution.0 <= layer.size.0);
        assert!(layer.resolution.1 <= layer.size.1);
    }

    let mut broken = config;
    broken.layers[1].resolution = (1000, 450);
    assert!(broken.validate(SCREEN).is_err());
}

#[test]
fn geometry_recomputation_is_idempotent() {
    let config = reference_config();
    let a = compute_geometry(SCREEN, &config.layers);
    let b = compute_geometry(SCREEN, &config.layers);
    let c = compute_geometry(SCREEN, &config.layers);
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[test]
fn no_foveation_layer_round_trips_the_viewport() {
    let layers = vec![LayerConfig::new(SCREEN, SCREEN)];
    let geometry = compute_geometry(SCREEN, &layers);
    assert_eq!(
        geometry.viewports[0],
        Viewport {
            x: 0,
            y: 0,
            width: SCREEN.0,
            height: SCREEN.1
        }
    );
}

#[test]
fn boundaries_are_centered() {
    let geometry = compute_geometry(SCREEN, &reference_config().layers);
    for b in &geometry.boundaries {
        assert!((b.left + b.right - 1.0).abs() < 1e-6);
        assert!((b.top + b.bottom - 1.0).abs() < 1e-6);
    }
}

#[test]
fn reference_scenario_literal_values() {
    let geometry = compute_geometry(SCREEN, &reference_config().layers);

    // Fovea layer: 1920 * 250 / 250 = 1920 wide viewport on a 250-wide target
    assert_eq!(geometry.viewports[2].width, 1920);
    assert_eq!(geometry.viewports[2].height, 1080);
    assert_eq!(geometry.viewports[2].x, -835);
    assert_eq!(geometry.viewports[2].y, -415);

    let mid = geometry.boundaries[0];
    assert!((mid.left - 0.2656).abs() < 1e-4);
    assert!((mid.right - 0.7344).abs() < 1e-4);
}

#[test]
fn inner_boundaries_nest() {
    let geometry = compute_geometry(SCREEN, &reference_config().layers);
    let outer = geometry.boundaries[0];
    let inner = geometry.boundaries[1];
    assert!(inner.left > outer.left);
    assert!(inner.right < outer.right);
    assert!(inner.top > outer.top);
    assert!(inner.bottom < outer.bottom);
}

#[test]
fn geometry_tracks_screen_size_changes() {
    // After a simulated resize the recomputed geometry must reflect the new
    // screen; nothing sized to the old screen remains in the result.
    let old_screen = SCREEN;
    let new_screen = (1280, 720);

    let old_config = reference_config();
    let new_config = RenderConfig::default_for_screen(new_screen.0, new_screen.1);
    assert!(new_config.validate(new_screen).is_ok());

    let old_geometry = compute_geometry(old_screen, &old_config.layers);
    let new_geometry = compute_geometry(new_screen, &new_config.layers);

    assert_eq!(new_geometry.viewports[0].width, new_config.layers[0].resolution.0);
    assert_ne!(old_geometry.viewports[0], new_geometry.viewports[0]);
}
