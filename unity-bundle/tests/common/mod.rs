//! Synthetic bundle and serialized-file fixtures
//!
//! Bundle headers are written big-endian; serialized file bodies use the
//! byte order chosen on the builder. Compressed fixtures go through the real
//! codecs.

#![allow(dead_code)]

use std::io::Cursor;

pub const FLAG_NONE: u32 = 0;
pub const FLAG_LZMA: u32 = 1;
pub const FLAG_LZ4: u32 = 2;
pub const FLAG_LZ4HC: u32 = 3;

/// Offsets of a few names in the embedded common string table
fn common_offset(name: &str) -> Option<u32> {
    match name {
        "Base" => Some(55),
        "GameObject" => Some(172),
        "int" => Some(222),
        "m_Name" => Some(427),
        "string" => Some(840),
        _ => None,
    }
}

/// Byte sink with a selectable byte order
pub struct Writer {
    pub buf: Vec<u8>,
    little: bool,
}

impl Writer {
    pub fn new(little: bool) -> Self {
        Self {
            buf: Vec::new(),
            little,
        }
    }

    pub fn big() -> Self {
        Self::new(false)
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        let bytes = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        let bytes = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.u32(v as u32)
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        let bytes = if self.little { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(v);
        self
    }

    pub fn cstr(&mut self, v: &str) -> &mut Self {
        self.buf.extend_from_slice(v.as_bytes());
        self.buf.push(0);
        self
    }

    /// Pad to a multiple of four, counted from `origin`
    pub fn align(&mut self, origin: usize) -> &mut Self {
        while (self.buf.len() - origin) % 4 != 0 {
            self.buf.push(0);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

/// One node of a type tree fixture, listed depth-first with its depth
#[derive(Debug, Clone)]
pub struct Field {
    pub depth: u8,
    pub type_name: &'static str,
    pub name: &'static str,
    pub byte_size: i32,
    pub flags: i32,
}

pub fn field(depth: u8, type_name: &'static str, name: &'static str, byte_size: i32) -> Field {
    Field {
        depth,
        type_name,
        name,
        byte_size,
        flags: 0,
    }
}

/// GameObject-like tree with depths [0, 1, 2, 1, 0]
pub fn sample_fields() -> Vec<Field> {
    vec![
        field(0, "GameObject", "Base", -1),
        field(1, "string", "m_Name", -1),
        field(2, "Array", "Array", -1),
        field(1, "int", "m_Layer", 4),
        field(0, "int", "m_Tail", 4),
    ]
}

#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub class_id: i32,
    pub script_id: i16,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub path_id: i64,
    pub type_id: i32,
    pub class_id: i16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExternalEntry {
    pub asset_path: String,
    pub guid: [u8; 16],
    pub ref_type: i32,
    pub file_path: String,
}

/// Builder for one serialized file
#[derive(Debug, Clone)]
pub struct AssetBuilder {
    pub format: u32,
    pub little: bool,
    pub long_ids: bool,
    pub types: Vec<TypeEntry>,
    pub objects: Vec<ObjectEntry>,
    pub adds: Vec<(i64, i32)>,
    pub externals: Vec<ExternalEntry>,
    pub trailing: String,
}

impl AssetBuilder {
    pub fn new(format: u32) -> Self {
        Self {
            format,
            // Before the selector exists the body stays big-endian
            little: format >= 9,
            long_ids: false,
            types: Vec::new(),
            objects: Vec::new(),
            adds: Vec::new(),
            externals: Vec::new(),
            trailing: String::new(),
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.little = false;
        self
    }

    pub fn long_ids(mut self) -> Self {
        self.long_ids = true;
        self
    }

    pub fn with_type(mut self, class_id: i32, fields: Vec<Field>) -> Self {
        self.types.push(TypeEntry {
            class_id,
            script_id: -1,
            fields,
        });
        self
    }

    pub fn with_script_type(mut self, script_id: i16, fields: Vec<Field>) -> Self {
        self.types.push(TypeEntry {
            class_id: 114,
            script_id,
            fields,
        });
        self
    }

    /// Add an object; from format 17 `type_id` is the index into the types
    pub fn with_object(mut self, path_id: i64, type_id: i32, data: &[u8]) -> Self {
        self.objects.push(ObjectEntry {
            path_id,
            type_id,
            class_id: type_id as i16,
            data: data.to_vec(),
        });
        self
    }

    pub fn with_add(mut self, id: i64, value: i32) -> Self {
        self.adds.push((id, value));
        self
    }

    pub fn with_external(mut self, asset_path: &str, guid: [u8; 16], file_path: &str) -> Self {
        self.externals.push(ExternalEntry {
            asset_path: asset_path.to_string(),
            guid,
            ref_type: 3,
            file_path: file_path.to_string(),
        });
        self
    }

    pub fn with_trailing(mut self, trailing: &str) -> Self {
        self.trailing = trailing.to_string();
        self
    }

    fn id_width(&self) -> usize {
        if self.format >= 14 || (self.format >= 7 && self.long_ids) {
            8
        } else {
            4
        }
    }

    fn write_id(&self, w: &mut Writer, id: i64) {
        if self.id_width() == 8 {
            w.i64(id);
        } else {
            w.i32(id as i32);
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let format = self.format;
        let mut w = Writer::new(self.little);

        // Header, always big-endian; sizes are patched below
        let mut header = Writer::big();
        header.u32(0).u32(0).u32(format).u32(0);
        if format >= 9 {
            header.u32(if self.little { 0 } else { 1 });
        }
        w.bytes(&header.buf);

        w.cstr("2019.4.0f1").u32(5);
        if format >= 13 {
            w.u8(1).i32(self.types.len() as i32);
            for ty in &self.types {
                w.i32(ty.class_id);
                if format >= 17 {
                    w.u8(0).i16(ty.script_id);
                }
                let remapped = ty.class_id == 114 && format >= 17;
                let hash_len = if remapped { 32 } else { 16 };
                w.bytes(&vec![0xAB; hash_len]);
                write_blob_tree(&mut w, &ty.fields, self.little);
            }
        } else {
            w.u32(self.types.len() as u32);
            for ty in &self.types {
                w.i32(ty.class_id);
                write_old_node(&mut w, &ty.fields, 0);
            }
        }

        if (7..14).contains(&format) {
            w.u32(u32::from(self.long_ids));
        }

        // Object data is laid out after the metadata in entry order
        let mut offsets = Vec::new();
        let mut data_offset = 0u32;
        for object in &self.objects {
            offsets.push(data_offset);
            data_offset += object.data.len() as u32;
        }

        w.u32(self.objects.len() as u32);
        for (object, offset) in self.objects.iter().zip(&offsets) {
            if format >= 14 {
                w.align(0);
            }
            self.write_id(&mut w, object.path_id);
            w.u32(*offset).u32(object.data.len() as u32);
            if format >= 17 {
                w.i32(object.type_id);
            } else {
                w.i32(object.type_id).i16(object.class_id);
            }
            if format < 11 {
                w.i16(0);
            } else if format < 17 {
                w.i16(-1);
                if format >= 15 {
                    w.u8(0);
                }
            }
        }

        if format >= 11 {
            w.u32(self.adds.len() as u32);
            for (id, value) in &self.adds {
                if format >= 14 {
                    w.align(0);
                }
                self.write_id(&mut w, *id);
                w.i32(*value);
            }
        }

        if format >= 6 {
            w.u32(self.externals.len() as u32);
            for external in &self.externals {
                w.cstr(&external.asset_path)
                    .bytes(&external.guid)
                    .i32(external.ref_type)
                    .cstr(&external.file_path);
            }
        }

        w.cstr(&self.trailing);
        let metadata_size = w.len() as u32;
        w.align(0);
        let data_start = w.len() as u32;
        for object in &self.objects {
            w.bytes(&object.data);
        }

        let file_size = w.len() as u32;
        w.buf[0..4].copy_from_slice(&metadata_size.to_be_bytes());
        w.buf[4..8].copy_from_slice(&file_size.to_be_bytes());
        w.buf[12..16].copy_from_slice(&data_start.to_be_bytes());
        w.buf
    }
}

/// Recursive layout: node, then its children, each with inline names
fn write_old_node(w: &mut Writer, fields: &[Field], index: usize) -> usize {
    let node = &fields[index];
    let children: Vec<usize> = direct_children(fields, index);
    w.cstr(node.type_name)
        .cstr(node.name)
        .i32(node.byte_size)
        .i32(index as i32)
        .i32(0)
        .i32(1)
        .i32(node.flags)
        .i32(children.len() as i32);
    let mut next = index + 1;
    for child in children {
        next = write_old_node(w, fields, child);
    }
    next
}

fn direct_children(fields: &[Field], index: usize) -> Vec<usize> {
    let depth = fields[index].depth;
    fields[index + 1..]
        .iter()
        .enumerate()
        .take_while(|(_, f)| f.depth > depth)
        .filter(|(_, f)| f.depth == depth + 1)
        .map(|(i, _)| index + 1 + i)
        .collect()
}

/// Flat layout: 24-byte records plus a local string buffer
///
/// Names present in the common table are written as interned offsets.
pub fn write_blob_tree(w: &mut Writer, fields: &[Field], little: bool) {
    let mut buffer = Vec::new();
    let mut offset_of = |name: &str| -> i32 {
        if let Some(offset) = common_offset(name) {
            return (offset | 0x8000_0000) as i32;
        }
        let offset = buffer.len() as i32;
        buffer.extend_from_slice(name.as_bytes());
        buffer.push(0);
        offset
    };

    let mut records = Writer::new(little);
    for (index, node) in fields.iter().enumerate() {
        let type_offset = offset_of(node.type_name);
        let name_offset = offset_of(node.name);
        records
            .i16(1)
            .u8(node.depth)
            .u8(0)
            .i32(type_offset)
            .i32(name_offset)
            .i32(node.byte_size)
            .u32(index as u32)
            .i32(node.flags);
    }

    w.u32(fields.len() as u32).u32(buffer.len() as u32);
    w.bytes(&records.buf).bytes(&buffer);
}

/// Compress with a bundle block codec
pub fn compress(data: &[u8], flags: u32) -> Vec<u8> {
    match flags & 0x3F {
        FLAG_NONE => data.to_vec(),
        FLAG_LZMA => unity_lzma(data),
        FLAG_LZ4 | FLAG_LZ4HC => lz4_flex::block::compress(data),
        other => panic!("no fixture codec for {}", other),
    }
}

/// LZMA stream without the 8-byte size field
pub fn unity_lzma(input: &[u8]) -> Vec<u8> {
    let stream = lzma_stream(input);
    let mut stripped = stream[..5].to_vec();
    stripped.extend_from_slice(&stream[13..]);
    stripped
}

/// Standard LZMA stream with its size field
pub fn lzma_stream(input: &[u8]) -> Vec<u8> {
    let options = lzma_rs::compress::Options {
        unpacked_size: lzma_rs::compress::UnpackedSize::WriteToHeader(Some(input.len() as u64)),
    };
    let mut stream = Vec::new();
    lzma_rs::lzma_compress_with_options(&mut Cursor::new(input), &mut stream, &options).unwrap();
    stream
}

fn bundle_prefix(signature: &str, version: i32) -> Writer {
    let mut w = Writer::big();
    w.cstr(signature)
        .i32(version)
        .cstr("5.x.x")
        .cstr("2019.4.0f1");
    w
}

/// Builder for a block-based bundle; node `i` is stored in block `i`
#[derive(Debug, Clone)]
pub struct FsBundleBuilder {
    pub index_flags: u32,
    pub extra_flags: u32,
    pub nodes: Vec<(String, Vec<u8>, u32)>,
}

impl FsBundleBuilder {
    pub fn new() -> Self {
        Self {
            index_flags: FLAG_NONE,
            extra_flags: 0,
            nodes: Vec::new(),
        }
    }

    pub fn index_codec(mut self, flags: u32) -> Self {
        self.index_flags = flags;
        self
    }

    pub fn extra_flags(mut self, flags: u32) -> Self {
        self.extra_flags = flags;
        self
    }

    pub fn node(mut self, name: &str, data: Vec<u8>, codec: u32) -> Self {
        self.nodes.push((name.to_string(), data, codec));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let stored: Vec<Vec<u8>> = self
            .nodes
            .iter()
            .map(|(_, data, codec)| compress(data, *codec))
            .collect();

        let mut index = Writer::big();
        index.bytes(&[0u8; 16]);
        index.i32(self.nodes.len() as i32);
        for ((_, data, codec), block) in self.nodes.iter().zip(&stored) {
            index
                .u32(data.len() as u32)
                .u32(block.len() as u32)
                .i16(*codec as i16);
        }
        index.i32(self.nodes.len() as i32);
        for (name, data, _) in &self.nodes {
            index.i64(0).i64(data.len() as i64).i32(4).cstr(name);
        }
        let stored_index = compress(&index.buf, self.index_flags);

        let mut w = bundle_prefix("UnityFS", 6);
        let size_at = w.len();
        w.i64(0)
            .u32(stored_index.len() as u32)
            .u32(index.len() as u32)
            .u32(self.index_flags | self.extra_flags)
            .bytes(&stored_index);
        for block in &stored {
            w.bytes(block);
        }
        let file_size = w.len() as i64;
        w.buf[size_at..size_at + 8].copy_from_slice(&file_size.to_be_bytes());
        w.buf
    }
}

/// Legacy header up to and including the bundle name, padded to `header_size`
fn legacy_header(signature: &str, header_size: u32, name: &str) -> Writer {
    let mut w = bundle_prefix(signature, 3);
    // Sizes: file, header, file count, bundle count, bundle, uncompressed
    // bundle, then the two extended fields present from a 60-byte header
    w.u32(0).u32(header_size).u32(1).u32(1).u32(0).u32(0);
    w.u32(0).u32(0);
    w.i32(0).u8(0).cstr(name);
    assert!(w.len() <= header_size as usize, "legacy header overflows");
    w.buf.resize(header_size as usize, 0);
    w
}

/// Uncompressed legacy bundle holding one entry
pub fn raw_bundle(bundle_name: &str, entry_name: &str, asset: &[u8]) -> Vec<u8> {
    let mut w = legacy_header("UnityRaw", 128, bundle_name);
    // Entry offset is counted from four bytes before the entry record
    let record_len = entry_name.len() as u32 + 1 + 8;
    let mut entry_offset = record_len + 4;
    if entry_name.ends_with(".resource") {
        entry_offset += entry_name.len() as u32;
    }
    w.cstr(entry_name).u32(entry_offset).u32(asset.len() as u32);
    w.bytes(asset);
    w.buf
}

/// Compressed legacy bundle whose body decodes to `body`
pub fn web_bundle(bundle_name: &str, count: u32, body: &[u8]) -> Vec<u8> {
    let mut w = legacy_header("UnityWeb", 128, bundle_name);
    w.u32(count).bytes(&lzma_stream(body));
    w.buf
}
