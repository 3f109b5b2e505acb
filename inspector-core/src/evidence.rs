//! Evidence Fusion (spec §4.6): pure detector functions over explicit
//! inputs, and the structural evidence accumulated by the Asset Reader
//! across one analysis.
//!
//! No shared state couples these functions to each other (Design Note §9);
//! the Driver is the only thing that threads their outputs together.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Structural evidence gathered while walking `GameObject`/`MonoScript`
/// objects across every asset file in one analysis.
#[derive(Debug, Default, Clone)]
pub struct ParsedEvidence {
    pub all_scripts: HashSet<String>,
    /// Component names collected only from asset files whose original name
    /// begins with the scene-file prefix (`level*`).
    pub scene_components: HashSet<String>,
}

/// A yes/no/variant finding, as produced by most of the detectors below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    No,
    Yes,
    YesVariant(String),
}

impl Presence {
    pub fn is_present(&self) -> bool {
        !matches!(self, Presence::No)
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::No => write!(f, "no"),
            Presence::Yes => write!(f, "yes"),
            Presence::YesVariant(v) => write!(f, "yes ({v})"),
        }
    }
}

/// Render pipeline classification, as produced by `detect_render_pipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderPipeline {
    Unknown,
    BuiltIn,
    Urp,
    Hdrp,
    Srp,
}

impl fmt::Display for RenderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenderPipeline::Unknown => "Unknown",
            RenderPipeline::BuiltIn => "Built-in",
            RenderPipeline::Urp => "URP",
            RenderPipeline::Hdrp => "HDRP",
            RenderPipeline::Srp => "SRP",
        };
        write!(f, "{s}")
    }
}

static ENGINE_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(20[0-9]{2}|[5-9][0-9]{3})\.[0-9]+\.[0-9]+[fpab][0-9]*").expect("valid regex")
});

static CATALOG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)catalog.*\.(json|hash)").expect("valid regex")
});

/// First non-empty engine-version match across `probe_texts` in the
/// caller-supplied priority order (globalgamemanagers, data.unity3d, the
/// two native libs, then the IL metadata blob).
pub fn detect_engine_version(probe_texts: &[String]) -> String {
    for text in probe_texts {
        if let Some(m) = ENGINE_VERSION_RE.find(text) {
            return m.as_str().to_string();
        }
    }
    "Unknown".to_string()
}

/// `metadata_text` is `None` when no metadata blob was recovered at all,
/// which is distinct from a blob that simply contains no pipeline marker.
pub fn detect_render_pipeline(metadata_text: Option<&str>) -> RenderPipeline {
    let Some(text) = metadata_text else {
        return RenderPipeline::Unknown;
    };
    let lower = text.to_lowercase();
    if ["com.unity.render-pipelines.universal", "unityengine.rendering.universal", "universalrenderpipeline", "forwardrenderer", "renderer2d"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        return RenderPipeline::Urp;
    }
    if ["com.unity.render-pipelines.high-definition", "unityengine.rendering.highdefinition", "hdrenderpipeline"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        return RenderPipeline::Hdrp;
    }
    if lower.contains("com.unity.render-pipelines.core") {
        return RenderPipeline::Srp;
    }
    RenderPipeline::BuiltIn
}

pub fn detect_entity_runtime(scene_components: &HashSet<String>, assemblies_manifest: &str, runtime_init_manifest: &str) -> Presence {
    if scene_components.iter().any(|c| c.contains("SubScene")) {
        return Presence::YesVariant("Scene".to_string());
    }
    let haystack = format!("{assemblies_manifest} {runtime_init_manifest}").to_lowercase();
    if haystack.contains("unity.entities.hybrid") || haystack.contains("unity.entities") {
        return Presence::Yes;
    }
    Presence::No
}

pub fn detect_entity_physics(assemblies_manifest: &str) -> Presence {
    if assemblies_manifest.to_lowercase().contains("unity.physics") {
        Presence::Yes
    } else {
        Presence::No
    }
}

pub fn detect_third_party_physics(assemblies_manifest: &str, runtime_init_manifest: &str, metadata_text: &str) -> Presence {
    let assemblies_lower = assemblies_manifest.to_lowercase();
    if assemblies_lower.contains("havok.physics") || assemblies_lower.contains("com.havok.physics") {
        return Presence::YesVariant("Assembly".to_string());
    }
    let rest = format!("{runtime_init_manifest} {metadata_text}").to_lowercase();
    if rest.contains("havok.physics") {
        return Presence::Yes;
    }
    Presence::No
}

pub fn detect_legacy_ui(all_scripts: &HashSet<String>, assemblies_manifest: &str, metadata_text: &str) -> Presence {
    if all_scripts.iter().any(|s| s.to_lowercase().contains("ngui")) {
        return Presence::YesVariant("Script".to_string());
    }
    let rest = format!("{assemblies_manifest} {metadata_text}").to_lowercase();
    if rest.contains("ngui") {
        return Presence::Yes;
    }
    Presence::No
}

pub fn detect_ui_toolkit(scene_components: &HashSet<String>) -> Presence {
    if scene_components.iter().any(|c| c.contains("UIDocument")) {
        Presence::YesVariant("Scene".to_string())
    } else {
        Presence::No
    }
}

/// True if any entry name (from any open container) looks like an
/// Addressables catalog or content group.
pub fn detect_content_pipeline<'a>(entry_names: impl Iterator<Item = &'a str>) -> bool {
    for name in entry_names {
        let normalized = name.replace('\\', "/").to_lowercase();
        if normalized.contains("aa/") || normalized.contains("addressables") || CATALOG_RE.is_match(&normalized) {
            return true;
        }
    }
    false
}

const UNITY_NAMESPACE_PREFIXES: [&str; 3] = ["UnityEngine", "Unity", "UnityEditor"];

fn major_script_key(script: &str) -> String {
    let segments: Vec<&str> = script.split('.').collect();
    if segments.len() == 1 {
        if segments[0].is_empty() {
            return "(no namespace)".to_string();
        }
        return segments[0].to_string();
    }
    if UNITY_NAMESPACE_PREFIXES.contains(&segments[0]) && segments.len() >= 3 {
        return format!("{}.{}", segments[0], segments[1]);
    }
    segments[0].to_string()
}

/// Top 30 `(key, count)` pairs over `all_scripts`, sorted by count
/// descending with ties broken by first-occurrence order for determinism.
pub fn rank_major_scripts(all_scripts: &HashSet<String>) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    let mut scripts: Vec<&String> = all_scripts.iter().collect();
    scripts.sort();
    for script in scripts {
        let key = major_script_key(script);
        if !counts.contains_key(&key) {
            order.push(key.clone());
        }
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = order.into_iter().map(|key| {
        let count = counts[&key];
        (key, count)
    }).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(30);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_version_matches_first_probe_with_a_hit() {
        let probes = vec![String::new(), "build 2022.3.14f1 stable".to_string()];
        assert_eq!(detect_engine_version(&probes), "2022.3.14f1");
    }

    #[test]
    fn engine_version_unknown_when_nothing_matches() {
        let probes = vec!["nothing here".to_string()];
        assert_eq!(detect_engine_version(&probes), "Unknown");
    }

    #[test]
    fn render_pipeline_absent_metadata_is_unknown() {
        assert_eq!(detect_render_pipeline(None), RenderPipeline::Unknown);
    }

    #[test]
    fn render_pipeline_urp_marker() {
        let text = "com.unity.render-pipelines.universal 14.0.8";
        assert_eq!(detect_render_pipeline(Some(text)), RenderPipeline::Urp);
    }

    #[test]
    fn render_pipeline_present_metadata_no_marker_is_built_in() {
        assert_eq!(detect_render_pipeline(Some("nothing special")), RenderPipeline::BuiltIn);
    }

    #[test]
    fn entities_scene_variant_wins_over_manifest() {
        let mut scenes = HashSet::new();
        scenes.insert("SubScene".to_string());
        assert_eq!(
            detect_entity_runtime(&scenes, "Unity.Entities", ""),
            Presence::YesVariant("Scene".to_string())
        );
    }

    #[test]
    fn entities_manifest_only_yields_plain_yes() {
        let scenes = HashSet::new();
        assert_eq!(detect_entity_runtime(&scenes, "Unity.Entities", ""), Presence::Yes);
    }

    #[test]
    fn entity_physics_requires_manifest_hit() {
        assert_eq!(detect_entity_physics("Unity.Physics, Unity.Burst"), Presence::Yes);
        assert_eq!(detect_entity_physics("Unity.Burst"), Presence::No);
    }

    #[test]
    fn havok_assembly_variant_is_canonical() {
        assert_eq!(detect_third_party_physics("Havok.Physics", "", ""), Presence::YesVariant("Assembly".to_string()));
        assert_eq!(detect_third_party_physics("", "", "com.havok.physics present"), Presence::Yes);
        assert_eq!(detect_third_party_physics("", "", ""), Presence::No);
    }

    #[test]
    fn ngui_script_evidence_wins_regardless_of_metadata() {
        let mut scripts = HashSet::new();
        scripts.insert("NGUIText".to_string());
        assert_eq!(detect_legacy_ui(&scripts, "", "anything"), Presence::YesVariant("Script".to_string()));
    }

    #[test]
    fn ui_toolkit_requires_scene_marker() {
        let mut scenes = HashSet::new();
        scenes.insert("UIDocument".to_string());
        assert_eq!(detect_ui_toolkit(&scenes), Presence::YesVariant("Scene".to_string()));
        assert_eq!(detect_ui_toolkit(&HashSet::new()), Presence::No);
    }

    #[test]
    fn content_pipeline_detects_catalog_hash() {
        let names = vec!["assets/aa/catalog_1.hash"];
        assert!(detect_content_pipeline(names.into_iter()));
        let none = vec!["assets/bin/data/level0"];
        assert!(!detect_content_pipeline(none.into_iter()));
    }

    #[test]
    fn major_scripts_ranking_matches_scenario_7() {
        let scripts: HashSet<String> = [
            "UnityEngine.UI.Image",
            "UnityEngine.UI.Text",
            "Unity.Burst.BurstCompiler",
            "MyGame.Enemy",
            "MyGame.Enemy.Spawner",
            "Foo",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let ranked = rank_major_scripts(&scripts);
        let as_map: std::collections::HashMap<_, _> = ranked.iter().cloned().collect();
        assert_eq!(as_map.get("UnityEngine.UI"), Some(&2));
        assert_eq!(as_map.get("Unity.Burst"), Some(&1));
        assert_eq!(as_map.get("MyGame"), Some(&2));
        assert_eq!(as_map.get("Foo"), Some(&1));
        // descending by count, ties broken deterministically
        assert!(ranked[0].1 >= ranked[1].1);
        assert!(ranked.iter().zip(ranked.iter().skip(1)).all(|(a, b)| a.1 >= b.1));
    }

    #[test]
    fn ranking_truncates_to_top_30() {
        let scripts: HashSet<String> = (0..40).map(|i| format!("Script{i}")).collect();
        assert_eq!(rank_major_scripts(&scripts).len(), 30);
    }
}
