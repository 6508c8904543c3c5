use sphere_grid::{camera::Projection, config::SceneConfig, viewport::Viewport};

#[test]
fn resize_updates_aspect_and_caps_pixel_ratio() {
    let max = SceneConfig::default().renderer.max_pixel_ratio;
    for (width, height, dpr) in [(1920.0, 1080.0, 1.0), (390.0, 844.0, 3.0), (1024.0, 768.0, 2.0)] {
        let viewport = Viewport::handshake(width, height, dpr, max);
        assert!((viewport.aspect() - (width / height) as f32).abs() < 1e-6);
        assert!(viewport.pixel_ratio <= 2.0);
        assert_eq!(viewport.surface_width, (width * viewport.pixel_ratio) as u32);
    }
}

#[test]
fn projection_follows_the_viewport() {
    let mut projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 300.0);
    let viewport = Viewport::handshake(390.0, 844.0, 3.0, 2.0);
    projection.set_aspect(viewport.aspect());
    assert!((projection.aspect() - 390.0 / 844.0).abs() < 1e-6);

    // a minimised window leaves the projection alone
    let minimised = Viewport::handshake(0.0, 0.0, 1.0, 2.0);
    assert!(!minimised.is_drawable());
    projection.set_aspect(minimised.aspect());
    assert!((projection.aspect() - 390.0 / 844.0).abs() < 1e-6);
}
