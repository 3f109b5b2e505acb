//! Analyzer configuration: the one small `Default`-implementing options
//! struct threaded through the pipeline, in place of scattered constants.

use std::path::PathBuf;

/// The well-known container paths an analysis probes, overridable in tests
/// so fixtures don't need to reproduce the full on-device layout.
#[derive(Debug, Clone)]
pub struct ProbePaths {
    pub global_game_managers: String,
    pub data_unity3d: String,
    pub scripting_assemblies_manifest: String,
    pub runtime_init_manifest: String,
    pub il2cpp_metadata: String,
    pub libunity_arm64: String,
    pub libunity_armv7: String,
}

impl Default for ProbePaths {
    fn default() -> Self {
        Self {
            global_game_managers: "assets/bin/Data/globalgamemanagers".to_string(),
            data_unity3d: "assets/bin/Data/data.unity3d".to_string(),
            scripting_assemblies_manifest: "assets/bin/Data/ScriptingAssemblies.json".to_string(),
            runtime_init_manifest: "assets/bin/Data/RuntimeInitializeOnLoads.json".to_string(),
            il2cpp_metadata: "assets/bin/Data/Managed/Metadata/global-metadata.dat".to_string(),
            libunity_arm64: "lib/arm64-v8a/libunity.so".to_string(),
            libunity_armv7: "lib/armeabi-v7a/libunity.so".to_string(),
        }
    }
}

/// Caller-configurable knobs for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Root directory under which `LastAnalysis/` is written.
    pub download_root: PathBuf,
    pub min_ascii_run: usize,
    pub probe_paths: ProbePaths,
}

impl AnalyzerConfig {
    /// Subdirectory the two raw artifacts are persisted under.
    pub fn last_analysis_dir(&self) -> PathBuf {
        self.download_root.join("LastAnalysis")
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let download_root = directories::ProjectDirs::from("dev", "inspector-core", "unity-build-inspector")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            download_root,
            min_ascii_run: 4,
            probe_paths: ProbePaths::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_download_root_ends_in_expected_suffix() {
        let config = AnalyzerConfig::default();
        let suffix: PathBuf = ["unity-build-inspector"].iter().collect();
        assert!(config.download_root.ends_with(&suffix) || config.download_root == PathBuf::from("."));
    }

    #[test]
    fn default_min_ascii_run_is_four() {
        assert_eq!(AnalyzerConfig::default().min_ascii_run, 4);
    }

    #[test]
    fn last_analysis_dir_is_a_child_of_download_root() {
        let config = AnalyzerConfig { download_root: PathBuf::from("/tmp/inspector"), ..AnalyzerConfig::default() };
        assert_eq!(config.last_analysis_dir(), PathBuf::from("/tmp/inspector/LastAnalysis"));
    }
}
