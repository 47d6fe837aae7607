use std::fs;
use std::path::Path;

use serde_json::{Value, json};

use minecraft_id_mappings::{CompoundTag, ErrorStrategy, GeneratorConfig, MappingEncoding, run_all};

fn write(dir: &Path, name: &str, value: Value) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, value.to_string()).unwrap();
}

#[test]
fn compacts_a_version_pair_both_ways() {
    let dir = ::tempfile::tempdir().unwrap();
    let mut config = GeneratorConfig::default();
    config.mappings_dir = dir.path().join("mappings");
    config.output_dir = dir.path().join("output");
    config.error_strategy = ErrorStrategy::Error;
    write(&config.mappings_dir, "mapping-1.20.json", json!({
        "blockstates": ["air", "stone", "granite"],
        "items": ["air", "stone", "grass_path"],
        "entities": ["pig"]
    }));
    write(&config.mappings_dir, "mapping-1.20.2.json", json!({
        "blockstates": ["air", "stone", "granite"],
        "items": ["air", "dirt_path", "stone"],
        "entities": ["pig", "cow"]
    }));
    write(&config.mappings_dir, "diff/mapping-1.20to1.20.2.json", json!({
        "items": {"grass_path": "dirt_path"}
    }));
    write(&config.mappings_dir, "diff/mapping-1.20.2to1.20.json", json!({
        "items": {"dirt_path": "grass_path"},
        "entities": {"cow": ""}
    }));

    let summary = run_all(&config).unwrap();
    assert_eq!(summary.pairs, vec![
        ("1.20".to_string(), "1.20.2".to_string()),
        ("1.20.2".to_string(), "1.20".to_string()),
    ]);
    assert_eq!(summary.written, 2);

    let mut expected = CompoundTag::new();
    expected.put("version", 1i32);
    expected.put("blockstates", MappingEncoding::Identity { size: 3, mapped_size: Some(3) }.to_tag());
    expected.put("items", MappingEncoding::Direct { mapped_size: Some(3), val: vec![0, 2, 1] }.to_tag());
    let forwards = fs::read(config.output_dir.join("mappings-1.20to1.20.2.nbt")).unwrap();
    assert_eq!(forwards, expected.to_bytes().unwrap());

    let mut expected = CompoundTag::new();
    expected.put("version", 1i32);
    expected.put("blockstates", MappingEncoding::Identity { size: 3, mapped_size: Some(3) }.to_tag());
    expected.put("items", MappingEncoding::Direct { mapped_size: Some(3), val: vec![0, 2, 1] }.to_tag());
    expected.put("entities", MappingEncoding::Direct { mapped_size: Some(1), val: vec![0, -1] }.to_tag());
    let backwards = fs::read(config.output_dir.join("backwards/mappings-1.20.2to1.20.nbt")).unwrap();
    assert_eq!(backwards, expected.to_bytes().unwrap());

    // Identifiers are stored against the global table, which never reorders
    let registry: Value = serde_json::from_slice(
        &fs::read(config.output_dir.join("identifier-table.json")).unwrap()
    ).unwrap();
    assert_eq!(registry, json!({"entities": ["pig", "cow"]}));
    let mut identifiers = CompoundTag::new();
    identifiers.put("entities", MappingEncoding::Identity { size: 2, mapped_size: None }.to_tag());
    let stored = fs::read(config.output_dir.join("identifiers-1.20.2.nbt")).unwrap();
    assert_eq!(stored, identifiers.to_bytes().unwrap());

    let manifest: Value = serde_json::from_slice(
        &fs::read(config.output_dir.join("manifest.json")).unwrap()
    ).unwrap();
    let entry = &manifest["mappings-1.20to1.20.2.nbt"];
    assert_eq!(entry["size"], json!(forwards.len()));
    assert_eq!(entry["hash"].as_str().map(str::len), Some(64));
    assert!(manifest.get("backwards/mappings-1.20.2to1.20.nbt").is_some());

    // Nothing changed, so nothing is rewritten
    let summary = run_all(&config).unwrap();
    assert_eq!(summary.written, 0);
}
