//! Subcommand implementations
//!
//! Each command writes its report to `out` so it can be checked in tests.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use unity_bundle::engine::class_name;
use unity_bundle::{Asset, Bundle, BundleParser, TypeTree};

fn open(parser: &BundleParser, path: &Path) -> Result<Bundle> {
    parser
        .parse_file(path)
        .with_context(|| format!("Failed to parse bundle {}", path.display()))
}

fn load_asset<'b>(bundle: &'b mut Bundle, index: usize, path: &Path) -> Result<&'b Asset> {
    bundle
        .resolve_asset(index)
        .with_context(|| format!("Failed to load asset {} of {}", index, path.display()))
}

pub fn info(parser: &BundleParser, path: &Path, out: &mut impl Write) -> Result<()> {
    let bundle = open(parser, path)?;
    let header = &bundle.header;

    writeln!(out, "Signature: {}", header.signature)?;
    writeln!(out, "Format version: {}", header.format_version)?;
    writeln!(out, "Target version: {}", header.target_version)?;
    writeln!(out, "Generator version: {}", header.generator_version)?;
    writeln!(out, "Name: {}", bundle.name)?;
    writeln!(out, "Compressed: {}", bundle.is_compressed())?;

    if let Some(legacy) = &header.legacy {
        writeln!(out, "File size: {}", legacy.file_size)?;
        writeln!(out, "Header size: {}", legacy.header_size)?;
        writeln!(out, "File count: {}", legacy.file_count)?;
        writeln!(out, "Bundle count: {}", legacy.bundle_count)?;
    }
    if let Some(fs) = &header.fs {
        writeln!(out, "File size: {}", fs.file_size)?;
        writeln!(
            out,
            "Index: {} -> {} bytes, flags {:#x}",
            fs.compressed_index_size, fs.uncompressed_index_size, fs.flags
        )?;

        writeln!(out, "Blocks: {}", bundle.blocks.len())?;
        for (i, block) in bundle.blocks.iter().enumerate() {
            let codec = block
                .compression_type()
                .map(|ty| ty.name())
                .unwrap_or("unknown");
            writeln!(
                out,
                "  [{}] {} -> {} bytes ({})",
                i, block.compressed_size, block.uncompressed_size, codec
            )?;
        }

        writeln!(out, "Nodes: {}", bundle.nodes.len())?;
        for (i, node) in bundle.nodes.iter().enumerate() {
            writeln!(
                out,
                "  [{}] {} offset {} size {} status {}",
                i, node.name, node.offset, node.size, node.status
            )?;
        }
    }

    writeln!(out, "Assets: {}", bundle.asset_count())?;
    for (i, asset) in bundle.assets().iter().enumerate() {
        let kind = if asset.is_resource() { " (resource)" } else { "" };
        writeln!(out, "  [{}] {}{}", i, asset.name(), kind)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ObjectRow {
    path_id: i64,
    type_id: i32,
    class_id: i16,
    class_name: Option<&'static str>,
    data_offset: u32,
    size: u32,
}

pub fn objects(
    parser: &BundleParser,
    path: &Path,
    index: usize,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut bundle = open(parser, path)?;
    let asset = load_asset(&mut bundle, index, path)?;

    let rows: Vec<ObjectRow> = asset
        .objects()
        .values()
        .map(|object| ObjectRow {
            path_id: object.path_id,
            type_id: object.type_id,
            class_id: object.class_id,
            class_name: class_name(object.type_id),
            data_offset: object.data_offset,
            size: object.size,
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Asset: {} ({} objects)", asset.name(), rows.len())?;
    for row in &rows {
        let name = row.class_name.unwrap_or("<unknown>");
        writeln!(
            out,
            "{:>20}  {:<20} {:>6}  offset {:<10} size {}",
            row.path_id,
            name,
            row.type_id,
            row.data_offset,
            row.size
        )?;
    }

    let unresolved = asset.unresolved_class_ids();
    if !unresolved.is_empty() {
        writeln!(out, "Classes without type tree: {:?}", unresolved)?;
    }
    Ok(())
}

pub fn types(
    parser: &BundleParser,
    path: &Path,
    index: usize,
    class: Option<i32>,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut bundle = open(parser, path)?;
    let asset = load_asset(&mut bundle, index, path)?;

    let selected: Vec<(i32, &TypeTree)> = asset
        .metadata()
        .type_trees
        .iter()
        .filter(|(class_id, _)| class.is_none_or(|wanted| **class_id == wanted))
        .map(|(class_id, tree)| (*class_id, tree))
        .collect();
    if let Some(wanted) = class {
        if selected.is_empty() {
            bail!("Asset {} has no type tree for class {}", index, wanted);
        }
    }

    if json {
        let mut map = serde_json::Map::new();
        for (class_id, tree) in &selected {
            map.insert(class_id.to_string(), serde_json::to_value(tree)?);
        }
        serde_json::to_writer_pretty(&mut *out, &map)?;
        writeln!(out)?;
        return Ok(());
    }

    for (class_id, tree) in selected {
        let name = class_name(class_id).unwrap_or("<unknown>");
        writeln!(out, "Class {} ({}), {} nodes", class_id, name, tree.total_nodes())?;
        let mut result = Ok(());
        tree.walk(|depth, node| {
            if result.is_ok() {
                result = writeln!(
                    out,
                    "{}{} {} // size {}{}",
                    "  ".repeat(depth + 1),
                    node.type_name,
                    node.name,
                    node.byte_size,
                    if node.is_aligned() { ", aligned" } else { "" }
                );
            }
        });
        result?;
    }
    Ok(())
}

pub fn extract(
    parser: &BundleParser,
    path: &Path,
    name: &str,
    output: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let bundle = open(parser, path)?;

    let data = if let Some(node) = bundle.find_node(name) {
        bundle
            .read_node(node)
            .with_context(|| format!("Failed to read node {}", name))?
    } else if let Some(asset) = bundle.find_asset(name).filter(|_| bundle.nodes.is_empty()) {
        asset.bytes().to_vec()
    } else {
        bail!("No node named '{}' in {}", name, path.display());
    };

    std::fs::write(output, &data)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    debug!(node = name, bytes = data.len(), "Extracted");
    writeln!(out, "Wrote {} bytes to {}", data.len(), output.display())?;
    Ok(())
}
