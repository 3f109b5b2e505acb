//! Script Resolver (spec §4.5): an analysis-scoped `(file, path-id) ->
//! fully-qualified script name` table, populated by the scripts-only
//! pre-pass and queried while naming `MonoBehaviour` components.
//!
//! Deliberately an owned struct threaded through the Driver rather than
//! process-wide storage (Design Note §9): a caller that wants to reset it
//! between analyses just constructs a new one, or calls `clear`.

use std::collections::HashMap;

/// Returned when a `MonoBehaviour` pointer cannot be resolved to a script
/// name; matches the built-in class name for class-id 114 so the sentinel
/// is indistinguishable from "an unscripted MonoBehaviour" in the report.
pub const UNRESOLVED_SENTINEL: &str = "MonoBehaviour";

#[derive(Debug, Default)]
pub struct ScriptResolver {
    table: HashMap<(String, i64), String>,
}

impl ScriptResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn register(&mut self, file_name: &str, path_id: i64, fully_qualified_name: String) {
        self.table.insert((file_name.to_string(), path_id), fully_qualified_name);
    }

    /// Resolves a `MonoBehaviour`-style cross-file pointer to a script name.
    /// `file_id == 0` means "same file"; `file_id > 0` indexes 1-based into
    /// `externals`. On a miss in the target file, falls back to a scan for
    /// any entry with a matching path-id (covers asset files whose
    /// externals list omits the actual producer of a script), then to the
    /// sentinel, logging the miss once.
    pub fn resolve(&self, current_file: &str, externals: &[String], file_id: i32, path_id: i64) -> String {
        let target_file = if file_id > 0 && (file_id as usize) <= externals.len() {
            externals[(file_id - 1) as usize].as_str()
        } else {
            current_file
        };

        if let Some(name) = self.table.get(&(target_file.to_string(), path_id)) {
            return name.clone();
        }

        if let Some((_, name)) = self.table.iter().find(|((_, pid), _)| *pid == path_id) {
            return name.clone();
        }

        tracing::debug!(target_file, path_id, "script resolver miss, substituting sentinel");
        UNRESOLVED_SENTINEL.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_same_file_entry() {
        let mut resolver = ScriptResolver::new();
        resolver.register("level0", 42, "MyGame.Player".to_string());
        assert_eq!(resolver.resolve("level0", &[], 0, 42), "MyGame.Player");
    }

    #[test]
    fn resolves_cross_file_via_externals_one_based() {
        let mut resolver = ScriptResolver::new();
        resolver.register("CAB-abc.assets", 7, "MyGame.Enemy".to_string());
        let externals = vec!["CAB-abc.assets".to_string()];
        assert_eq!(resolver.resolve("level0", &externals, 1, 7), "MyGame.Enemy");
    }

    #[test]
    fn falls_back_to_path_id_only_search_across_files() {
        let mut resolver = ScriptResolver::new();
        resolver.register("some-other-file.assets", 99, "MyGame.Orphan".to_string());
        // externals list omits the producer; file_id=0 means "same file" but it isn't there
        assert_eq!(resolver.resolve("level0", &[], 0, 99), "MyGame.Orphan");
    }

    #[test]
    fn full_miss_returns_sentinel() {
        let resolver = ScriptResolver::new();
        assert_eq!(resolver.resolve("level0", &[], 0, 123), UNRESOLVED_SENTINEL);
    }

    #[test]
    fn clear_empties_the_table() {
        let mut resolver = ScriptResolver::new();
        resolver.register("level0", 1, "A.B".to_string());
        resolver.clear();
        assert_eq!(resolver.resolve("level0", &[], 0, 1), UNRESOLVED_SENTINEL);
    }
}
