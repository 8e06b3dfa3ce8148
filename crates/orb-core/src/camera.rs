use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_PIXEL_RATIO;
use crate::interaction::Angles;

pub type Mat4 = [[f32; 4]; 4];

const FOV_Y_DEGREES: f64 = 35.0;
const NEAR: f64 = 0.1;
const FAR: f64 = 100.0;
const EYE_DISTANCE: f64 = 4.2;

/// Startup failure of the drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    InvalidViewport { width: u32, height: u32 },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidViewport { width, height } => {
                write!(f, "invalid viewport size {width}x{height}")
            }
        }
    }
}

impl std::error::Error for RenderError {}

/// Layout size of the drawing surface in CSS pixels plus its device ratio.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        let pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        };
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Backing buffer size in device pixels.
    pub fn drawing_buffer(&self) -> (u32, u32) {
        (
            (self.width as f64 * self.pixel_ratio).round() as u32,
            (self.height as f64 * self.pixel_ratio).round() as u32,
        )
    }
}

/// Fixed perspective camera looking down -Z at the orb.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    viewport: Viewport,
    projection: Mat4,
}

impl Camera {
    pub fn new(viewport: Viewport) -> Result<Self, RenderError> {
        if viewport.is_empty() {
            return Err(RenderError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(Self {
            viewport,
            projection: perspective(FOV_Y_DEGREES.to_radians(), viewport.aspect(), NEAR, FAR),
        })
    }

    /// Container changed size. A collapsed container keeps the previous projection.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let next = Viewport::new(width, height, self.viewport.pixel_ratio);
        if next.is_empty() {
            return false;
        }
        self.viewport = next;
        self.projection = perspective(FOV_Y_DEGREES.to_radians(), next.aspect(), NEAR, FAR);
        true
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_proj(&self) -> Mat4 {
        mul(&self.projection, &translation(0.0, 0.0, -EYE_DISTANCE))
    }
}

/// Right-handed perspective with a [0, 1] depth range.
pub fn perspective(fov_y: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
    let f = 1.0 / (fov_y / 2.0).tan();
    let range = near - far;
    [
        [(f / aspect) as f32, 0.0, 0.0, 0.0],
        [0.0, f as f32, 0.0, 0.0],
        [0.0, 0.0, (far / range) as f32, -1.0],
        [0.0, 0.0, (near * far / range) as f32, 0.0],
    ]
}

pub fn translation(x: f64, y: f64, z: f64) -> Mat4 {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [x as f32, y as f32, z as f32, 1.0],
    ]
}

/// Model matrix: Rx · Ry · uniform scale.
pub fn model_matrix(rotation: Angles, scale: f64) -> Mat4 {
    let (sx, cx) = rotation.x.sin_cos();
    let (sy, cy) = rotation.y.sin_cos();
    let rx: Mat4 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, cx as f32, sx as f32, 0.0],
        [0.0, -sx as f32, cx as f32, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let ry: Mat4 = [
        [cy as f32, 0.0, -sy as f32, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [sy as f32, 0.0, cy as f32, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let s = scale as f32;
    let scaling: Mat4 = [
        [s, 0.0, 0.0, 0.0],
        [0.0, s, 0.0, 0.0],
        [0.0, 0.0, s, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    mul(&mul(&rx, &ry), &scaling)
}

/// Column-major product `a · b`.
pub fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0f32; 4]; 4];
    for (col, out_col) in out.iter_mut().enumerate() {
        for (row, cell) in out_col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_viewport_is_fatal() {
        let err = Camera::new(Viewport::new(0, 600, 1.0)).unwrap_err();
        assert_eq!(
            err,
            RenderError::InvalidViewport {
                width: 0,
                height: 600
            }
        );
    }

    #[test]
    fn test_resize_updates_projection() {
        let mut cam = Camera::new(Viewport::new(800, 800, 1.0)).unwrap();
        let square = cam.projection();
        assert!(cam.resize(1600, 800));
        let wide = cam.projection();
        assert_relative_eq!(wide[0][0] * 2.0, square[0][0], epsilon = 1e-6);
        assert_eq!(wide[1][1], square[1][1]);
    }

    #[test]
    fn test_collapsed_resize_keeps_projection() {
        let mut cam = Camera::new(Viewport::new(800, 600, 1.0)).unwrap();
        let before = cam.projection();
        assert!(!cam.resize(800, 0));
        assert_eq!(cam.projection(), before);
        assert_eq!(cam.viewport().height, 600);
    }

    #[test]
    fn test_pixel_ratio_capped() {
        let vp = Viewport::new(100, 50, 3.0);
        assert_eq!(vp.pixel_ratio, MAX_PIXEL_RATIO);
        assert_eq!(vp.drawing_buffer(), (200, 100));
        assert_eq!(Viewport::new(10, 10, f64::NAN).pixel_ratio, 1.0);
    }

    #[test]
    fn test_identity_model() {
        let m = model_matrix(Angles::default(), 1.0);
        for (i, col) in m.iter().enumerate() {
            for (j, v) in col.iter().enumerate() {
                assert_eq!(*v, if i == j { 1.0 } else { 0.0 });
            }
        }
    }

    #[test]
    fn test_scale_on_diagonal() {
        let m = model_matrix(Angles::default(), 1.5);
        assert_eq!(m[0][0], 1.5);
        assert_eq!(m[2][2], 1.5);
        assert_eq!(m[3][3], 1.0);
    }

    #[test]
    fn test_view_proj_pushes_origin_into_frustum() {
        let cam = Camera::new(Viewport::new(800, 800, 1.0)).unwrap();
        let vp = cam.view_proj();
        // Origin in clip space: column 3
        let w = vp[3][3];
        let z = vp[3][2];
        assert!(w > 0.0, "w = {w}");
        let ndc_z = z / w;
        assert!((0.0..=1.0).contains(&ndc_z), "ndc z = {ndc_z}");
    }
}
