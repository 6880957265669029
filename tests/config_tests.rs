use chart_compose::api::{Composition, CompositionConfig, NullFrameHost};
use chart_compose::core::ScreenSize;
use chart_compose::render::SurfaceMode;
use chart_compose::ChartError;

#[test]
fn config_round_trips_through_json() {
    let config = CompositionConfig::default()
        .with_aspect_ratio(Some(1.5))
        .with_padding_margin(8.0)
        .with_default_screen_size(ScreenSize::new(800.0, 600.0))
        .with_surface_mode(SurfaceMode::Shared)
        .without_animation();

    let json = config.to_json_pretty().expect("serialize");
    let parsed = CompositionConfig::from_json_str(&json).expect("parse");

    assert_eq!(parsed, config);
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let parsed = CompositionConfig::from_json_str(r#"{ "padding_margin": 4.0 }"#).expect("parse");

    assert_eq!(parsed.padding_margin, 4.0);
    assert_eq!(parsed.zoom_level_factor, 1.2);
    assert_eq!(parsed.default_screen_size, ScreenSize::new(640.0, 480.0));
    assert!(parsed.animation.enabled);
    assert_eq!(parsed.surface_mode, SurfaceMode::PerNode);
    assert_eq!(parsed.aspect_ratio, None);
}

#[test]
fn partial_animation_section_keeps_default_velocities() {
    let parsed =
        CompositionConfig::from_json_str(r#"{ "animation": { "enabled": false } }"#).expect("parse");

    assert!(!parsed.animation.enabled);
    assert_eq!(parsed.animation.pan_velocity, 0.008);
    assert_eq!(parsed.animation.zoom_velocity, 0.006);
}

#[test]
fn invalid_values_are_rejected() {
    for json in [
        r#"{ "zoom_level_factor": 1.0 }"#,
        r#"{ "padding_margin": -1.0 }"#,
        r#"{ "min_viewport_extent": 0.0 }"#,
        r#"{ "aspect_ratio": -2.0 }"#,
        r#"{ "default_screen_size": { "width": 0.0, "height": 10.0 } }"#,
        r#"{ "animation": { "pan_velocity": 0.0, "zoom_velocity": 0.006, "enabled": true } }"#,
        "not json",
    ] {
        assert!(
            CompositionConfig::from_json_str(json).is_err(),
            "accepted {json}"
        );
    }
}

#[test]
fn composition_refuses_an_invalid_config() {
    let config = CompositionConfig::default().with_padding_margin(f64::NAN);

    let err = Composition::new(NullFrameHost, config)
        .err()
        .expect("invalid margin");

    assert!(matches!(err, ChartError::InvalidData(_)));
}
