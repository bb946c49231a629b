//! Runtime variant-key derivation.
//!
//! The offline pipeline stamps each artifact with a `variantHash`; at load
//! time the engine rebuilds the same 64-bit key from the shader id, stage
//! and its current permutation keyword values, then looks the blob up in
//! the library. The serialized layout here must stay bit-identical to the
//! offline side:
//!
//! ```text
//! u64 shaderIdHash | u32 stage | u32 count | count × (u64 nameHash | u32 value | u32 0)
//! ```
//!
//! all little-endian, entries sorted ascending by `(nameHash, value)`.

use vshader_types::{hash64, hash64_str, ShaderStage};

/// One keyword assignment inside a variant key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantKeyEntry {
    pub name_hash: u64,
    pub value: u32,
}

/// Builder for the 64-bit variant lookup key.
#[derive(Debug, Clone)]
pub struct VariantKey {
    shader_id_hash: u64,
    stage: ShaderStage,
    entries: Vec<VariantKeyEntry>,
}

impl Default for VariantKey {
    fn default() -> Self {
        Self::new()
    }
}

impl VariantKey {
    pub fn new() -> Self {
        Self {
            shader_id_hash: 0,
            stage: ShaderStage::Unknown,
            entries: Vec::new(),
        }
    }

    /// Sets the shader identity from its logical id string.
    pub fn set_shader_id(&mut self, shader_id: &str) -> &mut Self {
        self.shader_id_hash = hash64_str(shader_id);
        self
    }

    /// Sets the shader identity from a pre-computed hash.
    pub fn set_shader_id_hash(&mut self, shader_id_hash: u64) -> &mut Self {
        self.shader_id_hash = shader_id_hash;
        self
    }

    pub fn set_stage(&mut self, stage: ShaderStage) -> &mut Self {
        self.stage = stage;
        self
    }

    /// Records a keyword assignment by name.
    pub fn set(&mut self, keyword_name: &str, value: u32) -> &mut Self {
        self.entries.push(VariantKeyEntry {
            name_hash: hash64_str(keyword_name),
            value,
        });
        self
    }

    /// Records a keyword assignment by pre-hashed name.
    pub fn set_hashed(&mut self, name_hash: u64, value: u32) -> &mut Self {
        self.entries.push(VariantKeyEntry { name_hash, value });
        self
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serializes the key material in canonical order and hashes it.
    pub fn build(&self) -> u64 {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| (e.name_hash, e.value));

        let mut buf = Vec::with_capacity(16 + entries.len() * 16);
        buf.extend_from_slice(&self.shader_id_hash.to_le_bytes());
        buf.extend_from_slice(&u32::from(self.stage as u8).to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for e in &entries {
            buf.extend_from_slice(&e.name_hash.to_le_bytes());
            buf.extend_from_slice(&e.value.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
        }

        hash64(&buf, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_does_not_matter() {
        let mut a = VariantKey::new();
        a.set_shader_id("pbr.frag");
        a.set_stage(ShaderStage::Frag);
        a.set("USE_SHADOW", 1);
        a.set("PASS", 0);

        let mut b = VariantKey::new();
        b.set_shader_id("pbr.frag");
        b.set_stage(ShaderStage::Frag);
        b.set("PASS", 0);
        b.set("USE_SHADOW", 1);

        assert_eq!(a.build(), b.build());
    }

    #[test]
    fn every_input_perturbs_the_key() {
        let mut base = VariantKey::new();
        base.set_shader_id("pbr.frag");
        base.set_stage(ShaderStage::Frag);
        base.set("USE_SHADOW", 1);
        let k0 = base.build();

        let mut other = base.clone();
        other.set_stage(ShaderStage::Vert);
        assert_ne!(other.build(), k0);

        let mut other = base.clone();
        other.clear();
        other.set("USE_SHADOW", 0);
        assert_ne!(other.build(), k0);

        let mut other = base.clone();
        other.set_shader_id("pbr2.frag");
        assert_ne!(other.build(), k0);
    }

    #[test]
    fn hashed_and_named_setters_agree() {
        let mut a = VariantKey::new();
        a.set_shader_id_hash(42);
        a.set_stage(ShaderStage::Comp);
        a.set("LIGHTS", 3);

        let mut b = VariantKey::new();
        b.set_shader_id_hash(42);
        b.set_stage(ShaderStage::Comp);
        b.set_hashed(vshader_types::hash64_str("LIGHTS"), 3);

        assert_eq!(a.build(), b.build());
    }
}
