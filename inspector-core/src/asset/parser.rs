//! Serialized-asset-file parser: type table, object directory, scripts
//! table, externals list, and the targeted `GameObject`/`MonoBehaviour`/
//! `MonoScript` object parses that feed the Script Resolver and Evidence
//! Fusion.

use super::header::AssetHeader;
use super::types::{class_ids, builtin_class_name, ObjectInfo, TypeEntry};
use crate::error::{AnalyzerError, Result};
use crate::evidence::ParsedEvidence;
use crate::reader::{BinaryReader, ByteOrder};
use crate::script_resolver::ScriptResolver;
use std::collections::HashMap;

const MAX_COMPONENT_COUNT: i32 = 1000;
const MAX_NAME_LEN: usize = 1024;

/// A parsed serialized-asset file: header plus the directories needed by
/// Evidence Fusion. Object payloads are not retained beyond the targeted
/// parses performed during construction.
#[derive(Debug)]
pub struct AssetFile {
    pub file_name: String,
    pub header: AssetHeader,
    pub types: Vec<TypeEntry>,
    pub objects: Vec<ObjectInfo>,
    pub externals: Vec<String>,
}

impl AssetFile {
    /// Parses `data` as a serialized-asset file named `file_name` (used as
    /// the Script Resolver's file key). When `scripts_only`, only the
    /// `MonoScript` pre-scan runs; otherwise `GameObject` component naming
    /// also runs and feeds `evidence.scene_components`.
    #[tracing::instrument(skip(data, evidence))]
    pub fn parse(
        data: &[u8],
        file_name: &str,
        scripts_only: bool,
        resolver: &mut ScriptResolver,
        evidence: &mut ParsedEvidence,
    ) -> Result<Self> {
        let mut reader = BinaryReader::new(data, ByteOrder::Big);
        let header = AssetHeader::from_reader(&mut reader)?;
        let byte_order = header.byte_order();

        let mut types = Vec::new();
        if header.has_type_table() {
            let has_type_tree = reader.read_bool()?;
            let type_count = reader.read_i32()?;
            if type_count < 0 {
                return Err(AnalyzerError::malformed_asset("negative type count"));
            }
            for _ in 0..type_count {
                types.push(parse_type_entry(&mut reader, header.version, has_type_tree)?);
            }
        }

        let object_count = reader.read_u32()?;
        let mut objects = Vec::with_capacity(object_count as usize);
        for _ in 0..object_count {
            objects.push(parse_object_info(&mut reader, &header, &types)?);
        }

        if header.version >= 11 {
            let script_count = reader.read_i32()?;
            if script_count < 0 {
                return Err(AnalyzerError::malformed_asset("negative script count"));
            }
            let entry_size = if header.version >= 14 { 8 } else { 4 };
            for _ in 0..script_count {
                reader.read_bytes(entry_size)?;
            }
        }

        let external_count = reader.read_i32()?;
        if external_count < 0 {
            return Err(AnalyzerError::malformed_asset("negative external count"));
        }
        let mut externals = Vec::with_capacity(external_count as usize);
        for _ in 0..external_count {
            if header.version >= 6 {
                reader.read_cstring()?; // asset-name, not retained
            }
            reader.read_bytes(16)?; // guid
            reader.read_i32()?; // type
            let path_name = reader.read_cstring()?;
            externals.push(basename(&path_name));
        }

        for obj in objects.iter().filter(|o| o.class_id == class_ids::MONO_SCRIPT) {
            match parse_mono_script(data, obj, byte_order) {
                Ok(fq_name) => {
                    resolver.register(file_name, obj.path_id, fq_name.clone());
                    evidence.all_scripts.insert(fq_name);
                }
                Err(e) => {
                    tracing::debug!(file_name, path_id = obj.path_id, error = %e, "skipping unparsable MonoScript");
                }
            }
        }

        if !scripts_only {
            let objects_by_path: HashMap<i64, &ObjectInfo> =
                objects.iter().map(|o| (o.path_id, o)).collect();
            let is_scene = file_name.to_lowercase().starts_with("level");

            for obj in objects.iter().filter(|o| o.class_id == class_ids::GAME_OBJECT) {
                match parse_game_object(data, obj, byte_order, &header, &objects_by_path, file_name, &externals, resolver) {
                    Ok(names) => {
                        if is_scene {
                            evidence.scene_components.extend(names);
                        }
                    }
                    Err(e) => {
                        tracing::debug!(file_name, path_id = obj.path_id, error = %e, "skipping unparsable GameObject");
                    }
                }
            }
        }

        Ok(Self { file_name: file_name.to_string(), header, types, objects, externals })
    }
}

fn basename(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

fn parse_type_entry(reader: &mut BinaryReader, version: i32, has_type_tree: bool) -> Result<TypeEntry> {
    let class_id = reader.read_i32()?;

    if version >= 16 {
        reader.read_bool()?; // is_stripped, discarded
    }
    if version >= 17 {
        reader.read_i16()?; // script_type_index, discarded
    }
    if class_id == class_ids::MONO_BEHAVIOUR || class_id < 0 {
        reader.read_bytes(16)?; // script hash
    }
    reader.read_bytes(16)?; // type hash

    if has_type_tree {
        let node_count = reader.read_i32()?;
        let string_size = reader.read_i32()?;
        if node_count < 0 || string_size < 0 {
            return Err(AnalyzerError::malformed_asset("negative type-tree size"));
        }
        let node_size: i64 = if version >= 19 { 32 } else { 24 };
        let skip = node_count as i64 * node_size + string_size as i64;
        reader.read_bytes(skip as usize)?;
    }

    Ok(TypeEntry { class_id })
}

fn parse_object_info(reader: &mut BinaryReader, header: &AssetHeader, types: &[TypeEntry]) -> Result<ObjectInfo> {
    if header.version >= 22 {
        reader.align_to(4);
    }

    let path_id = if header.version >= 14 {
        reader.read_i64()?
    } else {
        reader.read_i32()? as i64
    };

    let raw_byte_start = if header.version >= 22 {
        reader.read_i64()?
    } else {
        reader.read_i32()? as i64
    };
    let byte_start = raw_byte_start + header.data_offset;

    let byte_size = reader.read_u32()?;
    let type_id = reader.read_i32()?;

    let mut legacy_class_id = None;
    if header.version < 16 {
        legacy_class_id = Some(reader.read_u16()? as i32);
    }
    if header.version == 15 || header.version == 16 {
        reader.read_u8()?; // stripped flag
    }

    let class_id = if header.resolves_class_id_from_types() {
        usize::try_from(type_id)
            .ok()
            .and_then(|idx| types.get(idx))
            .map(|t| t.class_id)
            .unwrap_or(type_id)
    } else {
        legacy_class_id.unwrap_or(type_id)
    };

    Ok(ObjectInfo { path_id, byte_start, byte_size, type_id, class_id })
}

fn object_slice<'a>(data: &'a [u8], obj: &ObjectInfo) -> Result<&'a [u8]> {
    let start = usize::try_from(obj.byte_start).map_err(|_| AnalyzerError::malformed_asset("negative byte_start"))?;
    let end = start + obj.byte_size as usize;
    data.get(start..end).ok_or_else(|| AnalyzerError::malformed_asset("object range out of bounds"))
}

/// Script name, execution order, hash, class name, namespace, assembly
/// name; returns the fully-qualified name (or the raw script name when the
/// class name is empty).
fn parse_mono_script(data: &[u8], obj: &ObjectInfo, byte_order: ByteOrder) -> Result<String> {
    let slice = object_slice(data, obj)?;
    let mut reader = BinaryReader::new(slice, byte_order);

    let script_name = reader.read_bounded_aligned_string(MAX_NAME_LEN)?;
    reader.read_i32()?; // execution order
    reader.read_bytes(16)?; // properties hash
    let class_name = reader.read_aligned_string()?;
    let namespace = reader.read_aligned_string()?;
    reader.read_aligned_string()?; // assembly name, not retained

    Ok(if class_name.is_empty() {
        script_name
    } else if !namespace.is_empty() {
        format!("{namespace}.{class_name}")
    } else {
        class_name
    })
}

/// Reads the component-pointer list (and fixed trailer) of one `GameObject`,
/// returning each component's display name in pointer order.
#[allow(clippy::too_many_arguments)]
fn parse_game_object(
    data: &[u8],
    obj: &ObjectInfo,
    byte_order: ByteOrder,
    header: &AssetHeader,
    objects_by_path: &HashMap<i64, &ObjectInfo>,
    file_name: &str,
    externals: &[String],
    resolver: &mut ScriptResolver,
) -> Result<Vec<String>> {
    let slice = object_slice(data, obj)?;
    let mut reader = BinaryReader::new(slice, byte_order);

    let component_count = reader.read_i32()?;
    if !(0..=MAX_COMPONENT_COUNT).contains(&component_count) {
        return Err(AnalyzerError::malformed_asset(format!(
            "implausible component count {component_count}"
        )));
    }

    let mut names = Vec::with_capacity(component_count as usize);
    for _ in 0..component_count {
        let comp_file_id = reader.read_i32()?;
        let comp_path_id = read_path_id(&mut reader, header)?;
        names.push(component_name(
            data, comp_file_id, comp_path_id, byte_order, header, objects_by_path, file_name, externals, resolver,
        ));
    }

    reader.read_i32()?; // layer
    reader.read_bounded_string(MAX_NAME_LEN)?; // m_Name

    Ok(names)
}

fn read_path_id(reader: &mut BinaryReader, header: &AssetHeader) -> Result<i64> {
    if header.version >= 14 {
        reader.read_i64()
    } else {
        Ok(reader.read_i32()? as i64)
    }
}

#[allow(clippy::too_many_arguments)]
fn component_name(
    data: &[u8],
    file_id: i32,
    path_id: i64,
    byte_order: ByteOrder,
    header: &AssetHeader,
    objects_by_path: &HashMap<i64, &ObjectInfo>,
    file_name: &str,
    externals: &[String],
    resolver: &mut ScriptResolver,
) -> String {
    if file_id == 0 {
        if let Some(&target) = objects_by_path.get(&path_id) {
            if target.class_id == class_ids::MONO_BEHAVIOUR {
                return resolve_mono_behaviour_script(data, target, byte_order, header, file_name, externals, resolver);
            }
            return builtin_class_name(target.class_id);
        }
    }
    resolver.resolve(file_name, externals, file_id, path_id)
}

/// A `MonoBehaviour` names itself by the script it points to, so this reads
/// past the object's own `GameObject` pointer and `m_Enabled` flag to reach
/// the `m_Script` PPtr, then hands that off to the Script Resolver.
fn resolve_mono_behaviour_script(
    data: &[u8],
    mono_behaviour: &ObjectInfo,
    byte_order: ByteOrder,
    header: &AssetHeader,
    file_name: &str,
    externals: &[String],
    resolver: &mut ScriptResolver,
) -> String {
    let parsed: Result<(i32, i64)> = (|| {
        let slice = object_slice(data, mono_behaviour)?;
        let mut reader = BinaryReader::new(slice, byte_order);
        reader.read_i32()?; // m_GameObject.file_id
        read_path_id(&mut reader, header)?; // m_GameObject.path_id
        reader.read_u8()?; // m_Enabled
        reader.align_to(4);
        let script_file_id = reader.read_i32()?;
        let script_path_id = read_path_id(&mut reader, header)?;
        Ok((script_file_id, script_path_id))
    })();

    match parsed {
        Ok((script_file_id, script_path_id)) => resolver.resolve(file_name, externals, script_file_id, script_path_id),
        Err(_) => resolver.resolve(file_name, externals, 0, mono_behaviour.path_id),
    }
}
