//! The assembled analysis result, serialized for `--json` CLI output.

use crate::evidence::{Presence, RenderPipeline};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub title: String,
    pub engine_version: String,
    pub render_pipeline: RenderPipeline,
    pub entities_used: Presence,
    pub entity_physics_used: Presence,
    pub third_party_physics_used: Presence,
    pub legacy_ui_used: Presence,
    pub content_pipeline_used: bool,
    pub ui_toolkit_used: Presence,
    pub major_scripts: Vec<(String, usize)>,
    pub persisted_metadata_path: Option<PathBuf>,
    pub persisted_manifest_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let result = AnalysisResult {
            title: "build.apk".to_string(),
            engine_version: "2022.3.14f1".to_string(),
            render_pipeline: RenderPipeline::Urp,
            entities_used: Presence::No,
            entity_physics_used: Presence::No,
            third_party_physics_used: Presence::No,
            legacy_ui_used: Presence::No,
            content_pipeline_used: false,
            ui_toolkit_used: Presence::No,
            major_scripts: vec![("MyGame".to_string(), 3)],
            persisted_metadata_path: None,
            persisted_manifest_path: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.engine_version, "2022.3.14f1");
        assert_eq!(back.render_pipeline, RenderPipeline::Urp);
    }
}
