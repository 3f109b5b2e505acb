//! Driver / Analyzer façade (spec §4.7): sequences the whole pipeline from
//! opened containers to an assembled report, clearing and owning the
//! Script Resolver for the lifetime of each `analyze` call.

use crate::asset::AssetFile;
use crate::bundle::types::should_parse_as_asset;
use crate::bundle::Bundle;
use crate::config::AnalyzerConfig;
use crate::container::ContainerIndex;
use crate::error::{AnalyzerError, FailureScope, Result};
use crate::evidence::{self, ParsedEvidence};
use crate::report::AnalysisResult;
use crate::scan::extract_printable_ascii;
use crate::script_resolver::ScriptResolver;
use std::path::{Path, PathBuf};

pub struct Analyzer {
    config: AnalyzerConfig,
    resolver: ScriptResolver,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config, resolver: ScriptResolver::new() }
    }

    /// Runs one full analysis over `archive_paths` (primary archive first,
    /// expansion archives after). `title` is carried through unchanged into
    /// the report (the caller's display name for this build).
    #[tracing::instrument(skip(self, archive_paths))]
    pub fn analyze<P: AsRef<Path>>(&mut self, archive_paths: &[P], title: &str) -> Result<AnalysisResult> {
        self.resolver.clear();
        let mut containers = ContainerIndex::open(archive_paths)?;
        let probes = self.config.probe_paths.clone();

        let assemblies_manifest = read_manifest_text(&mut containers, &probes.scripting_assemblies_manifest);
        let runtime_init_manifest = read_manifest_text(&mut containers, &probes.runtime_init_manifest);
        let metadata_bytes = containers.find_entry(&probes.il2cpp_metadata);
        let metadata_text = metadata_bytes
            .as_deref()
            .map(|bytes| extract_printable_ascii(bytes, self.config.min_ascii_run));

        let entry_names: Vec<String> = containers.iter_entries().map(|(_, name)| name.to_string()).collect();
        let content_pipeline_used = evidence::detect_content_pipeline(entry_names.iter().map(String::as_str));

        let mut parsed_evidence = ParsedEvidence::default();
        for scripts_only in [true, false] {
            for name in &entry_names {
                if let Some(bytes) = containers.find_entry(name) {
                    self.scan_entry(name, &bytes, scripts_only, &mut parsed_evidence);
                }
            }
        }

        let ascii = |path: &str| -> String {
            containers
                .find_entry(path)
                .map(|bytes| extract_printable_ascii(&bytes, self.config.min_ascii_run))
                .unwrap_or_default()
        };
        let probe_texts = vec![
            ascii(&probes.global_game_managers),
            ascii(&probes.data_unity3d),
            ascii(&probes.libunity_arm64),
            ascii(&probes.libunity_armv7),
            metadata_text.clone().unwrap_or_default(),
        ];

        let engine_version = evidence::detect_engine_version(&probe_texts);
        let render_pipeline = evidence::detect_render_pipeline(metadata_text.as_deref());
        let entities_used = evidence::detect_entity_runtime(
            &parsed_evidence.scene_components,
            &assemblies_manifest,
            &runtime_init_manifest,
        );
        let entity_physics_used = evidence::detect_entity_physics(&assemblies_manifest);
        let third_party_physics_used = evidence::detect_third_party_physics(
            &assemblies_manifest,
            &runtime_init_manifest,
            metadata_text.as_deref().unwrap_or(""),
        );
        let legacy_ui_used = evidence::detect_legacy_ui(
            &parsed_evidence.all_scripts,
            &assemblies_manifest,
            metadata_text.as_deref().unwrap_or(""),
        );
        let ui_toolkit_used = evidence::detect_ui_toolkit(&parsed_evidence.scene_components);
        let major_scripts = evidence::rank_major_scripts(&parsed_evidence.all_scripts);

        let (persisted_metadata_path, persisted_manifest_path) =
            self.persist_artifacts(metadata_bytes.as_deref(), &assemblies_manifest);

        Ok(AnalysisResult {
            title: title.to_string(),
            engine_version,
            render_pipeline,
            entities_used,
            entity_physics_used,
            third_party_physics_used,
            legacy_ui_used,
            content_pipeline_used,
            ui_toolkit_used,
            major_scripts,
            persisted_metadata_path,
            persisted_manifest_path,
        })
    }

    /// Tries `bytes` as a bundle first; on a signature mismatch, falls back
    /// to treating the whole entry as a standalone serialized-asset file
    /// when its name shape allows it. Every failure here is bundle/asset
    /// local and only logged, per the error-locality design; `log_scoped`
    /// picks the log level from the error's `FailureScope` so a caught
    /// analysis-fatal error (which should never reach this far) stands out.
    fn scan_entry(&mut self, name: &str, bytes: &[u8], scripts_only: bool, evidence: &mut ParsedEvidence) {
        match Bundle::parse(bytes) {
            Ok(Some(bundle)) => {
                for node in &bundle.nodes {
                    if !should_parse_as_asset(node) {
                        continue;
                    }
                    match bundle.materialize(node) {
                        Ok(node_bytes) => {
                            if let Err(e) =
                                AssetFile::parse(&node_bytes, &node.path, scripts_only, &mut self.resolver, evidence)
                            {
                                log_scoped(&e, "node", &node.path, "skipping unparsable bundle node");
                            }
                        }
                        Err(e) => log_scoped(&e, "node", &node.path, "failed to materialize bundle node"),
                    }
                }
            }
            Ok(None) => {
                if looks_like_standalone_asset(name) {
                    if let Err(e) = AssetFile::parse(bytes, name, scripts_only, &mut self.resolver, evidence) {
                        log_scoped(&e, "entry", name, "skipping unparsable standalone asset");
                    }
                }
            }
            Err(e) => log_scoped(&e, "entry", name, "failed to read bundle header"),
        }
    }

    /// Best-effort; a write failure here is swallowed (spec §7
    /// `PersistFailure`) and the in-memory result is still returned.
    fn persist_artifacts(&self, metadata_bytes: Option<&[u8]>, assemblies_manifest: &str) -> (Option<PathBuf>, Option<PathBuf>) {
        let dir = self.config.last_analysis_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to create LastAnalysis directory");
            return (None, None);
        }

        let metadata_path = metadata_bytes.and_then(|bytes| {
            let path = dir.join("global-metadata.dat");
            std::fs::write(&path, bytes)
                .map_err(|e| tracing::warn!(path = %path.display(), error = %e, "failed to persist metadata blob"))
                .ok()
                .map(|()| path)
        });

        let manifest_path = {
            let path = dir.join("ScriptingAssemblies.json");
            std::fs::write(&path, assemblies_manifest)
                .map_err(|e| tracing::warn!(path = %path.display(), error = %e, "failed to persist assemblies manifest"))
                .ok()
                .map(|()| path)
        };

        (metadata_path, manifest_path)
    }
}

/// Prefers UTF-8; on decode failure falls back to a lossy Windows-1252
/// decode, matching the `Encoding.Default`-on-failure behavior of the host
/// this format was originally produced on. A missing entry is an empty
/// string, never an error (spec §7).
fn read_manifest_text(containers: &mut ContainerIndex, path: &str) -> String {
    let Some(bytes) = containers.find_entry(path) else {
        return String::new();
    };
    String::from_utf8(bytes.clone()).unwrap_or_else(|_| encoding_rs::WINDOWS_1252.decode(&bytes).0.into_owned())
}

/// Logs `e` at a level matching its `FailureScope`: a bundle/asset-local
/// failure is routine (debug/warn), while a `Fatal`-scoped error surfacing
/// this deep in the per-entry scan is a bug, not an expected skip, so it is
/// logged loudly even though `scan_entry` still does not propagate it.
fn log_scoped(e: &AnalyzerError, unit: &str, id: &str, msg: &'static str) {
    match e.scope() {
        FailureScope::Fatal => tracing::error!(unit, id, error = %e, msg, "unexpected fatal-scoped error in per-entry scan"),
        FailureScope::BundleLocal => tracing::warn!(unit, id, error = %e, msg),
        FailureScope::AssetLocal => tracing::debug!(unit, id, error = %e, msg),
    }
}

fn looks_like_standalone_asset(name: &str) -> bool {
    let lower = name.to_lowercase();
    if lower.ends_with(".ress") || lower.ends_with(".resource") || lower.ends_with(".resourcebatch") || lower.ends_with(".bundle") {
        return false;
    }
    lower.ends_with(".assets")
        || lower.ends_with(".sharedassets")
        || lower.contains("globalgamemanagers")
        || lower.rsplit('/').next().is_some_and(|base| base.starts_with("level"))
        || lower.contains("unity_builtin_extra")
        || lower.contains("unity default resources")
}

/// Runs `analyze` on the blocking-pool thread so an async caller's UI does
/// not stall; splits no single analysis across threads (spec §5).
#[cfg(feature = "async")]
pub async fn analyze_blocking(
    config: AnalyzerConfig,
    archive_paths: Vec<PathBuf>,
    title: String,
) -> Result<AnalysisResult> {
    let joined = tokio::task::spawn_blocking(move || {
        let mut analyzer = Analyzer::new(config);
        analyzer.analyze(&archive_paths, &title)
    })
    .await;

    match joined {
        Ok(result) => result,
        Err(e) => Err(crate::error::AnalyzerError::decode_failure(format!(
            "analyze_blocking task panicked: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = FileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn missing_manifests_and_metadata_yield_unknown_engine_version_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("primary.zip");
        write_zip(&archive, &[("assets/bin/Data/globalgamemanagers", b"nothing interesting here")]);

        let download_root = dir.path().join("downloads");
        let config = AnalyzerConfig { download_root, ..AnalyzerConfig::default() };
        let mut analyzer = Analyzer::new(config);
        let result = analyzer.analyze(&[archive], "build.apk").unwrap();

        assert_eq!(result.engine_version, "Unknown");
        assert_eq!(result.entities_used, crate::evidence::Presence::No);
        assert!(!result.content_pipeline_used);
    }

    #[test]
    fn engine_version_is_recovered_from_global_game_managers_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("primary.zip");
        let payload = b"some binary junk 2022.3.14f1 trailing junk";
        write_zip(&archive, &[("assets/bin/Data/globalgamemanagers", payload)]);

        let download_root = dir.path().join("downloads");
        let config = AnalyzerConfig { download_root, ..AnalyzerConfig::default() };
        let mut analyzer = Analyzer::new(config);
        let result = analyzer.analyze(&[archive], "build.apk").unwrap();

        assert_eq!(result.engine_version, "2022.3.14f1");
    }

    #[test]
    fn content_pipeline_detected_from_catalog_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("primary.zip");
        write_zip(&archive, &[("assets/aa/catalog_1.hash", b"x")]);

        let download_root = dir.path().join("downloads");
        let config = AnalyzerConfig { download_root, ..AnalyzerConfig::default() };
        let mut analyzer = Analyzer::new(config);
        let result = analyzer.analyze(&[archive], "build.apk").unwrap();

        assert!(result.content_pipeline_used);
    }

    #[test]
    fn no_openable_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.zip");
        let config = AnalyzerConfig { download_root: dir.path().join("downloads"), ..AnalyzerConfig::default() };
        let mut analyzer = Analyzer::new(config);
        let err = analyzer.analyze(&[missing], "build.apk").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn analyze_is_idempotent_across_repeated_calls_on_the_same_analyzer() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("primary.zip");
        let payload = b"some binary junk 2022.3.14f1 trailing junk";
        write_zip(
            &archive,
            &[
                ("assets/bin/Data/globalgamemanagers", payload),
                ("assets/aa/catalog_1.hash", b"x"),
            ],
        );

        let download_root = dir.path().join("downloads");
        let config = AnalyzerConfig { download_root, ..AnalyzerConfig::default() };
        let mut analyzer = Analyzer::new(config);

        let first = analyzer.analyze(&[&archive], "build.apk").unwrap();
        let second = analyzer.analyze(&[&archive], "build.apk").unwrap();

        let first_json = serde_json::to_string(&first).unwrap();
        let second_json = serde_json::to_string(&second).unwrap();
        assert_eq!(first_json, second_json);
    }
}
