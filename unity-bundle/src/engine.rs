//! Engine object shapes and class ids
//!
//! The shapes below describe what a few well-known classes look like once a
//! downstream deserializer has walked their type tree. This crate does not
//! fill them in; it only resolves the object directory and the trees.

use serde::Serialize;

/// Well-known class ids
pub mod class_ids {
    pub const GAME_OBJECT: i32 = 1;
    pub const COMPONENT: i32 = 2;
    pub const BEHAVIOUR: i32 = 8;
    pub const TRANSFORM: i32 = 4;
    pub const MATERIAL: i32 = 21;
    pub const MESH_RENDERER: i32 = 23;
    pub const TEXTURE_2D: i32 = 28;
    pub const MESH_FILTER: i32 = 33;
    pub const MESH: i32 = 43;
    pub const SHADER: i32 = 48;
    pub const TEXT_ASSET: i32 = 49;
    pub const ANIMATION_CLIP: i32 = 74;
    pub const AUDIO_CLIP: i32 = 83;
    pub const ANIMATOR_CONTROLLER: i32 = 91;
    pub const MONO_BEHAVIOUR: i32 = 114;
    pub const MONO_SCRIPT: i32 = 115;
    pub const FONT: i32 = 128;
    pub const ASSET_BUNDLE: i32 = 142;
    pub const PRELOAD_DATA: i32 = 150;
    pub const SPRITE: i32 = 213;
    pub const RECT_TRANSFORM: i32 = 224;
}

/// Name of a well-known class id
///
/// Negative ids are script types remapped while reading type metadata.
pub fn class_name(class_id: i32) -> Option<&'static str> {
    let name = match class_id {
        class_ids::GAME_OBJECT => "GameObject",
        class_ids::COMPONENT => "Component",
        class_ids::BEHAVIOUR => "Behaviour",
        class_ids::TRANSFORM => "Transform",
        class_ids::MATERIAL => "Material",
        class_ids::MESH_RENDERER => "MeshRenderer",
        class_ids::TEXTURE_2D => "Texture2D",
        class_ids::MESH_FILTER => "MeshFilter",
        class_ids::MESH => "Mesh",
        class_ids::SHADER => "Shader",
        class_ids::TEXT_ASSET => "TextAsset",
        class_ids::ANIMATION_CLIP => "AnimationClip",
        class_ids::AUDIO_CLIP => "AudioClip",
        class_ids::ANIMATOR_CONTROLLER => "AnimatorController",
        class_ids::MONO_BEHAVIOUR => "MonoBehaviour",
        class_ids::MONO_SCRIPT => "MonoScript",
        class_ids::FONT => "Font",
        class_ids::ASSET_BUNDLE => "AssetBundle",
        class_ids::PRELOAD_DATA => "PreloadData",
        class_ids::SPRITE => "Sprite",
        class_ids::RECT_TRANSFORM => "RectTransform",
        id if id < 0 => "MonoBehaviour",
        _ => return None,
    };
    Some(name)
}

/// Reference to another object, possibly in an external asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PPtr {
    /// 0 for the same asset, otherwise 1 + index into its externals
    pub file_id: i32,
    pub path_id: i64,
}

impl PPtr {
    pub fn new(file_id: i32, path_id: i64) -> Self {
        Self { file_id, path_id }
    }

    pub fn is_null(&self) -> bool {
        self.path_id == 0
    }

    /// Index into the owning asset's externals, if the target is external
    pub fn external_index(&self) -> Option<usize> {
        usize::try_from(self.file_id).ok()?.checked_sub(1)
    }
}

/// Anything attached to a game object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Component {
    pub game_object: PPtr,
}

/// A component that can be switched off
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Behaviour {
    pub component: Component,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transform {
    pub component: Component,
    pub local_rotation: [f32; 4],
    pub local_position: [f32; 3],
    pub local_scale: [f32; 3],
    pub children: Vec<PPtr>,
    pub father: PPtr,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            component: Component::default(),
            local_rotation: [0.0, 0.0, 0.0, 1.0],
            local_position: [0.0; 3],
            local_scale: [1.0; 3],
            children: Vec::new(),
            father: PPtr::default(),
        }
    }
}

impl Transform {
    pub fn is_root(&self) -> bool {
        self.father.is_null()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameObject {
    pub name: String,
    pub active: bool,
    pub components: Vec<PPtr>,
    pub layer: i32,
    pub tag: u16,
}

impl Default for GameObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            active: true,
            components: Vec::new(),
            layer: 0,
            tag: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names() {
        assert_eq!(class_name(class_ids::GAME_OBJECT), Some("GameObject"));
        assert_eq!(class_name(class_ids::TRANSFORM), Some("Transform"));
        assert_eq!(class_name(-3), Some("MonoBehaviour"));
        assert_eq!(class_name(99_999), None);
    }

    #[test]
    fn test_pptr() {
        assert!(PPtr::default().is_null());
        assert_eq!(PPtr::new(0, 5).external_index(), None);
        assert_eq!(PPtr::new(2, 5).external_index(), Some(1));
        assert_eq!(PPtr::new(-1, 5).external_index(), None);
    }

    #[test]
    fn test_defaults() {
        let transform = Transform::default();
        assert!(transform.is_root());
        assert_eq!(transform.local_scale, [1.0, 1.0, 1.0]);
        assert!(GameObject::default().active);
    }
}
