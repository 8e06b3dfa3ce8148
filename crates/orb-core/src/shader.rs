//! Static GPU programs. Treated as fixed functions of position and time;
//! the only thing Rust owns is the uniform layout they read.

/// Orb surface: noise displacement, fresnel rim, energy layers, AI glow.
pub const ORB_WGSL: &str = include_str!("shader/orb.wgsl");

/// Additive aura shell drawn around the orb.
pub const AURA_WGSL: &str = include_str!("shader/aura.wgsl");

/// Shell radius relative to the unit orb. Folded into the shell model matrix.
pub const SHELL_RADIUS: f64 = 1.18;

/// Look up a program by file name.
pub fn source(name: &str) -> Option<&'static str> {
    match name {
        "orb.wgsl" => Some(ORB_WGSL),
        "aura.wgsl" => Some(AURA_WGSL),
        _ => None,
    }
}
