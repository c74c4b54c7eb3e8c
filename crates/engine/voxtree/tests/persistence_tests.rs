//! CSM and config persistence tests


use std::io::Write;
use test_models::*;
use voxtree::glam::Vec3;
use voxtree::{
    load_csm, parse_csm, serialize_csm, ConfigError, CsmError, DefaultPolicy, Octree,
    OctreeConfig, OctreeError,
};

// ============================================================================
// CSM
// ============================================================================

#[test]
fn test_models_survive_a_roundtrip() {
    for tree in [
        single_leaf(),
        full_octa(),
        checker_octa(),
        bottom_slab(),
        plus_shape(),
        mixed_depth(),
    ] {
        let csm = serialize_csm(&tree);
        let parsed: Octree<u8> = load_csm(&csm, tree.config().clone(), DefaultPolicy).unwrap();
        assert_eq!(parsed.items_depth_first(), tree.items_depth_first(), "{csm}");
    }
}

#[test]
fn test_roundtrip_keeps_faces() {
    let mut rng = Lcg::new(3);
    let mut tree = Octree::new(config(8.0, 3), DefaultPolicy);
    for _ in 0..50 {
        let item = 1 + rng.below(3) as u8;
        tree.set_item(&random_path(&mut rng, 3), item).unwrap();
    }
    let mut parsed = load_csm(&serialize_csm(&tree), config(8.0, 3), DefaultPolicy).unwrap();

    let original = mesh(&mut tree);
    assert_eq!(quad_set(&mesh(&mut parsed), 1.0), quad_set(&original, 1.0));
}

#[test]
fn test_later_statements_override_earlier() {
    // The root item is pushed down when "a" is carved out of it
    let tree = parse_model("> 1\n>a 2\n", 2.0, 3);
    assert_eq!(tree.item_at(&path("a")), Some(&2));
    assert_eq!(tree.item_at(&path("h")), Some(&1));
    assert_eq!(tree.solid_leaves().len(), 8);

    // A shallow statement replaces the deeper cells under it
    let tree = parse_model(">ab 2\n>ac 3\n>a 4\n", 2.0, 3);
    assert_eq!(tree.items_depth_first(), vec![(path("a"), 4)]);
}

#[test]
fn test_breadth_first_order() {
    let tree = parse_model(">hh 1\n>a 2\n>b 3\n", 2.0, 3);
    let order: Vec<String> = tree
        .items_breadth_first()
        .into_iter()
        .map(|(p, _)| p.to_string())
        .collect();
    assert_eq!(order, ["a", "b", "hh"]);
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        parse_csm::<u8>(">a 1\n  b 2\n"),
        Err(CsmError::ParseError { line: 2, .. })
    ));
    assert!(matches!(
        parse_csm::<u8>(">a 300"),
        Err(CsmError::InvalidItem { line: 1, .. })
    ));
    assert!(matches!(
        load_csm::<u8>(">aaaa 1", config(1.0, 3), DefaultPolicy),
        Err(CsmError::Tree(OctreeError::OutOfRangeDepth { .. }))
    ));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# tree settings").unwrap();
    writeln!(file, "min = [0.0, -8.0, 0.0]").unwrap();
    writeln!(file, "size = 16.0").unwrap();
    writeln!(file, "max_depth = 4").unwrap();
    file.flush().unwrap();

    let config = OctreeConfig::load(file.path()).unwrap();
    assert_eq!(config.min, Vec3::new(0.0, -8.0, 0.0));
    assert_eq!(config.size, 16.0);
    assert_eq!(config.max_depth, 4);

    let tree: Octree<u8> = Octree::new(config, DefaultPolicy);
    assert_eq!(
        tree.path_at(Vec3::new(15.0, -7.0, 1.0), 1).unwrap(),
        path("b")
    );
}

#[test]
fn test_config_roundtrips_through_toml() {
    let config = OctreeConfig {
        min: Vec3::new(1.0, 2.0, 3.0),
        size: 64.0,
        max_depth: 8,
        max_vertices_per_mesh: 1024,
    };
    let text = config.to_toml_string().unwrap();
    assert_eq!(OctreeConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn test_config_errors() {
    assert!(matches!(
        OctreeConfig::load("/nonexistent/voxtree.toml"),
        Err(ConfigError::Io(_))
    ));
    assert!(matches!(
        OctreeConfig::from_toml_str("size = \"big\""),
        Err(ConfigError::Toml(_))
    ));
    assert!(matches!(
        OctreeConfig::from_toml_str("max_depth = 64"),
        Err(ConfigError::Invalid(_))
    ));
}
