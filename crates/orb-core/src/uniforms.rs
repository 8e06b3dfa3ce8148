//! Uniform blocks pushed to the orb program every frame.
//! Layouts must match the WGSL structs in `shader/orb.wgsl` byte for byte.

use serde::Serialize;

/// Per-frame scalar inputs of the orb shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShaderUniforms {
    /// Seconds since start, monotonic.
    pub time: f32, // offset 0
    /// Click emphasis, 0..1.
    pub pulse: f32, // offset 4
    /// Phase-dependent glow constant.
    pub ai_glow: f32, // offset 8
    /// Integrated AI activity, 0..1.
    pub ai_intensity: f32, // offset 12 -> total 16
}

/// Model and view-projection matrices, column-major.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniforms {
    pub model: [[f32; 4]; 4],     // offset 0, size 64
    pub view_proj: [[f32; 4]; 4], // offset 64, size 64 -> total 128
}

impl ShaderUniforms {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl TransformUniforms {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
