//! Bundle block-info payload types: storage blocks and node directory.

#[derive(Debug, Clone, Copy)]
pub struct StorageBlock {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub flags: u16,
}

#[derive(Debug, Clone)]
pub struct BundleNode {
    pub offset: i64,
    pub size: i64,
    pub flags: i32,
    pub path: String,
}

impl BundleNode {
    /// Flag bit 0x04 marks a node as a serialized (parseable) asset.
    pub fn marked_serialized(&self) -> bool {
        self.flags & 0x04 != 0
    }

    pub fn end_offset(&self) -> i64 {
        self.offset + self.size
    }
}

/// Whether this node's path should be handed to the Asset Reader, per the
/// node-filtering rule in the bundle format description: a node flagged
/// serialized, or a recognizable asset-file path, unless it is a resource
/// blob that is always skipped.
pub fn should_parse_as_asset(node: &BundleNode) -> bool {
    let lower = node.path.to_lowercase();
    if lower.ends_with(".ress") || lower.ends_with(".resource") {
        return false;
    }
    if node.marked_serialized() {
        return true;
    }
    lower.ends_with(".assets")
        || lower.ends_with(".sharedassets")
        || lower.contains("globalgamemanagers")
        || lower.starts_with("level")
        || lower.contains("unity_builtin_extra")
        || lower.contains("unity default resources")
}
