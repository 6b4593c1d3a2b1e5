//! CPU projection of a cubemap onto spherical harmonics.
//!
//! Every texel of all six faces is treated as a radiance sample weighted by
//! the exact solid angle it subtends. The accumulated harmonics are corrected
//! for total coverage, convolved to irradiance and converted to Lambertian
//! radiance, so the result can be evaluated directly in a shader.

use glam::Vec3;
use half::f16;

use crate::error::ProjectionError;

use super::harmonics::{SphericalHarmonics, SphericalPolynomial};

/// Channel layout of one face's pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channel_count(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// One face's texel storage. Integer data is normalized to `[0, 1]`.
#[derive(Clone, Debug)]
pub enum FaceData {
    F32(Vec<f32>),
    F16(Vec<u16>),
    U8(Vec<u8>),
}

impl FaceData {
    fn len(&self) -> usize {
        match self {
            FaceData::F32(data) => data.len(),
            FaceData::F16(data) => data.len(),
            FaceData::U8(data) => data.len(),
        }
    }

    fn read(&self, index: usize) -> f32 {
        match self {
            FaceData::F32(data) => data[index],
            FaceData::F16(data) => f16::from_bits(data[index]).to_f32(),
            FaceData::U8(data) => data[index] as f32 / 255.0,
        }
    }
}

/// A decoded cubemap: six square faces of identical size and format, in the
/// order right, left, up, down, front, back.
#[derive(Clone, Debug)]
pub struct CubeMapInfo {
    pub size: usize,
    pub format: PixelFormat,
    /// Texels are sRGB-encoded and must be linearized before integration.
    pub gamma_space: bool,
    pub faces: [FaceData; 6],
}

pub const FACE_NAMES: [&str; 6] = ["right", "left", "up", "down", "front", "back"];

// Per-face basis: outward normal, texel-space x axis, texel-space y axis.
const FACE_BASES: [(Vec3, Vec3, Vec3); 6] = [
    // right
    (
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(0.0, -1.0, 0.0),
    ),
    // left
    (
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, -1.0, 0.0),
    ),
    // up
    (
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    ),
    // down
    (
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, -1.0),
    ),
    // front
    (
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
    ),
    // back
    (
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
    ),
];

/// Radiance values above this are clamped; decode glitches in HDR sources
/// would otherwise dominate the integral.
const MAX_HDR_VALUE: f32 = 4096.0;

// Antiderivative of the solid angle subtended by a texel at face
// coordinates (x, y) on the unit cube.
fn area_element(x: f32, y: f32) -> f32 {
    (x * y).atan2((x * x + y * y + 1.0).sqrt())
}

/// Project a cubemap onto order-3 spherical harmonics.
pub fn cube_map_to_spherical_harmonics(
    cube: &CubeMapInfo,
) -> Result<SphericalHarmonics, ProjectionError> {
    if cube.size == 0 {
        return Err(ProjectionError::EmptySize);
    }
    let channels = cube.format.channel_count();
    let expected = cube.size * cube.size * channels;
    for (face, data) in cube.faces.iter().enumerate() {
        if data.len() != expected {
            return Err(ProjectionError::FaceSize {
                face: FACE_NAMES[face],
                actual: data.len(),
                expected,
                size: cube.size,
            });
        }
    }

    let mut sh = SphericalHarmonics::default();
    let mut total_solid_angle = 0.0f32;

    // Texel centers in [-1, 1] face coordinates.
    let du = 2.0 / cube.size as f32;
    let half_texel = du / 2.0;
    let min_uv = du * 0.5 - 1.0;

    for (face, data) in cube.faces.iter().enumerate() {
        let (normal, file_x, file_y) = FACE_BASES[face];

        let mut v = min_uv;
        for row in 0..cube.size {
            let mut u = min_uv;
            for col in 0..cube.size {
                let base = (row * cube.size + col) * channels;
                let mut color = Vec3::new(data.read(base), data.read(base + 1), data.read(base + 2));

                // Repair NaNs before clamping so a poisoned texel cannot
                // poison the whole integral.
                if color.x.is_nan() {
                    color.x = 0.0;
                }
                if color.y.is_nan() {
                    color.y = 0.0;
                }
                if color.z.is_nan() {
                    color.z = 0.0;
                }
                color = color.clamp(Vec3::ZERO, Vec3::splat(MAX_HDR_VALUE));

                if cube.gamma_space {
                    color = color.powf(2.2);
                }

                let direction = (file_x * u + file_y * v + normal).normalize();
                let delta_solid_angle = area_element(u - half_texel, v - half_texel)
                    - area_element(u - half_texel, v + half_texel)
                    - area_element(u + half_texel, v - half_texel)
                    + area_element(u + half_texel, v + half_texel);

                sh.add_light(direction, color, delta_solid_angle);
                total_solid_angle += delta_solid_angle;

                u += du;
            }
            v += du;
        }
    }

    if total_solid_angle <= 0.0 {
        return Err(ProjectionError::ZeroSolidAngle);
    }

    // The per-texel solid angles only approximate the full sphere; rescale so
    // they integrate to exactly 4pi.
    let correction = 4.0 * std::f32::consts::PI / total_solid_angle;
    sh.scale_in_place(correction);
    sh.convert_incident_radiance_to_irradiance();
    sh.convert_irradiance_to_lambertian_radiance();

    Ok(sh)
}

/// As [`cube_map_to_spherical_harmonics`], expressed in polynomial form.
pub fn cube_map_to_spherical_polynomial(
    cube: &CubeMapInfo,
) -> Result<SphericalPolynomial, ProjectionError> {
    let sh = cube_map_to_spherical_harmonics(cube)?;
    Ok(SphericalPolynomial::from_harmonics(&sh))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_cube(size: usize, value: f32) -> CubeMapInfo {
        let face = vec![value; size * size * 3];
        CubeMapInfo {
            size,
            format: PixelFormat::Rgb,
            gamma_space: false,
            faces: [
                FaceData::F32(face.clone()),
                FaceData::F32(face.clone()),
                FaceData::F32(face.clone()),
                FaceData::F32(face.clone()),
                FaceData::F32(face.clone()),
                FaceData::F32(face),
            ],
        }
    }

    #[test]
    fn uniform_environment_projects_to_its_own_radiance() {
        // For a constant environment of radiance C, the Lambertian response
        // is C again: l00 = C * sqrt(4pi) ... after the irradiance and 1/pi
        // conversions, l00 * 0.282095 evaluates back to C.
        let radiance = 0.75;
        let sh = cube_map_to_spherical_harmonics(&uniform_cube(16, radiance)).unwrap();

        let evaluated = sh.l00 * 0.282095;
        assert!(
            (evaluated.x - radiance).abs() < 0.01,
            "expected ~{radiance}, got {evaluated:?}"
        );

        // Higher bands must vanish for a constant signal.
        for band in [sh.l1_1, sh.l10, sh.l11, sh.l2_2, sh.l2_1, sh.l20, sh.l21, sh.l22] {
            assert!(band.abs().max_element() < 0.01, "band leaked: {band:?}");
        }
    }

    #[test]
    fn directional_environment_biases_the_matching_band() {
        // Only the +Y face lit: l1_1 (the y band) must dominate l11 and l10.
        let size = 8;
        let dark = vec![0.0f32; size * size * 3];
        let lit = vec![1.0f32; size * size * 3];
        let cube = CubeMapInfo {
            size,
            format: PixelFormat::Rgb,
            gamma_space: false,
            faces: [
                FaceData::F32(dark.clone()),
                FaceData::F32(dark.clone()),
                FaceData::F32(lit),
                FaceData::F32(dark.clone()),
                FaceData::F32(dark.clone()),
                FaceData::F32(dark),
            ],
        };
        let sh = cube_map_to_spherical_harmonics(&cube).unwrap();
        assert!(sh.l1_1.x > 0.0);
        assert!(sh.l1_1.x > sh.l10.x.abs() * 10.0);
        assert!(sh.l1_1.x > sh.l11.x.abs() * 10.0);
    }

    #[test]
    fn nan_texels_are_neutralized() {
        let mut cube = uniform_cube(4, 1.0);
        if let FaceData::F32(data) = &mut cube.faces[0] {
            data[0] = f32::NAN;
            data[1] = f32::NAN;
        }
        let sh = cube_map_to_spherical_harmonics(&cube).unwrap();
        assert!(sh.to_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn half_float_and_u8_faces_decode() {
        let size = 2;
        let half_one = f16::from_f32(1.0).to_bits();
        let faces = [
            FaceData::F16(vec![half_one; size * size * 4]),
            FaceData::F16(vec![half_one; size * size * 4]),
            FaceData::U8(vec![255; size * size * 4]),
            FaceData::U8(vec![255; size * size * 4]),
            FaceData::F32(vec![1.0; size * size * 4]),
            FaceData::F32(vec![1.0; size * size * 4]),
        ];
        let cube = CubeMapInfo {
            size,
            format: PixelFormat::Rgba,
            gamma_space: false,
            faces,
        };
        let sh = cube_map_to_spherical_harmonics(&cube).unwrap();
        let evaluated = sh.l00.x * 0.282095;
        assert!((evaluated - 1.0).abs() < 0.05, "got {evaluated}");
    }

    #[test]
    fn size_and_face_validation() {
        let mut cube = uniform_cube(0, 1.0);
        cube.size = 0;
        assert!(matches!(
            cube_map_to_spherical_harmonics(&cube),
            Err(ProjectionError::EmptySize)
        ));

        let mut cube = uniform_cube(4, 1.0);
        cube.faces[2] = FaceData::F32(vec![1.0; 7]);
        assert!(matches!(
            cube_map_to_spherical_harmonics(&cube),
            Err(ProjectionError::FaceSize { face: "up", .. })
        ));
    }
}
