//! Config -> scene -> frame -> image file.

use gemtrace::prelude::*;

fn write_sky_hdr(path: &std::path::Path) {
    // Bright sky over a dark floor
    let img = image::Rgb32FImage::from_fn(32, 16, |_, y| {
        if y < 8 {
            image::Rgb([0.6, 0.8, 1.5])
        } else {
            image::Rgb([0.05, 0.04, 0.03])
        }
    });
    img.save(path).unwrap();
}

#[test]
fn test_default_scene_renders() {
    let mut config = SceneConfig::default();
    config.width = 40;
    config.height = 30;
    let scene = config.build_scene().unwrap();
    let env = config.environment_map().unwrap();
    let frame = config.camera_frame();

    let out = render(&frame, &scene, &env, &config.render_settings());
    assert_eq!((out.width, out.height), (40, 30));
    // The diamond sits in the middle of the default view
    assert!(out.pixel(20, 15).is_some());
    assert!(out.covered_pixels() > 8);
    assert!(out.covered_pixels() < 40 * 30);

    let rgba = out.to_rgba8();
    // Uncovered pixels carry the background
    let corner = rgba.get_pixel(0, 0).0;
    assert_eq!(corner[0], corner[1]);
    assert_eq!(corner[3], 255);
}

#[test]
fn test_config_file_with_environment() {
    let dir = tempfile::tempdir().unwrap();
    write_sky_hdr(&dir.path().join("sky.hdr"));

    let json = r##"{
        "width": 32,
        "height": 24,
        "camera": { "position": [0, 2.5, 3], "target": [0, 0, 0], "fov": 40 },
        "environment": { "path": "sky.hdr", "intensity": 2.0 },
        "toneMapping": "aces_filmic",
        "bvh": { "strategy": "center" },
        "gems": [
            {
                "name": "Diamond",
                "shape": "brilliant",
                "segments": 12,
                "translation": [0, 0, 0],
                "material": { "bounces": 5, "ior": 2.4, "aberrationStrength": 0.02, "fastChroma": true }
            },
            {
                "name": "GEMS",
                "shape": "icosahedron",
                "translation": [1.2, 0, 0],
                "scale": [0.3, 0.3, 0.3],
                "material": { "bounces": 2, "color": "#ff8080" }
            }
        ]
    }"##;
    let path = dir.path().join("scene.json");
    std::fs::write(&path, json).unwrap();

    let config = SceneConfig::load(&path).unwrap();
    let scene = config.build_scene().unwrap();
    assert_eq!(scene.instances().len(), 2);
    assert_eq!(scene.instances()[0].material.bounces, 5);
    assert!(scene.instances()[0].material.fast_chroma);
    assert_eq!(scene.instances()[1].material.bounces, 2);

    let env = config.environment_map().unwrap();
    assert_eq!(env.params.intensity, 2.0);

    let out = render(&config.camera_frame(), &scene, &env, &config.render_settings());
    assert!(out.covered_pixels() > 0);
    for px in out.pixels.iter().flatten() {
        assert!(px.is_finite());
        assert!(px.min_element() >= 0.0);
    }

    let exr = dir.path().join("frame.exr");
    out.save(&exr).unwrap();
    let back = image::open(&exr).unwrap().to_rgba32f();
    assert_eq!(back.dimensions(), (32, 24));

    let png = dir.path().join("frame.png");
    out.save(&png).unwrap();
    assert_eq!(image::open(&png).unwrap().to_rgba8().dimensions(), (32, 24));
}

#[test]
fn test_negative_bounces_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "gems": [ { "material": { "bounces": -1 } } ] }"#).unwrap();
    let err = SceneConfig::load(&path).unwrap_err();
    assert!(matches!(err, Error::InvalidMaterial { param: "bounces", .. }), "{err}");
}

#[test]
fn test_missing_environment_file_is_an_error() {
    let mut config = SceneConfig::default();
    config.environment.path = Some("/nonexistent/env.hdr".into());
    assert!(config.environment_map().is_err());
}

#[test]
fn test_scene_bvhs_export_to_gpu_buffers() {
    let scene = SceneConfig::default().build_scene().unwrap();
    for inst in scene.instances() {
        let gpu = inst.bvh.gpu_data();
        assert_eq!(gpu.header.node_count as usize, inst.bvh.nodes().len());
        assert_eq!(gpu.header.triangle_count as usize, inst.bvh.triangles().len());
        assert!(gpu.header.max_depth > inst.bvh.depth());
    }
}
