//! Order-3 spherical harmonics and their polynomial form.
//!
//! Radiance captured from an environment is accumulated into nine RGB
//! [`SphericalHarmonics`] coefficients, converted through irradiance into
//! Lambertian radiance, and optionally re-expressed as a
//! [`SphericalPolynomial`] for cheap per-pixel evaluation.

use glam::Vec3;

/// Nine RGB coefficients of a band 0..=2 spherical harmonics expansion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SphericalHarmonics {
    /// Set once the coefficients have been pre-multiplied by the SH basis
    /// constants for direct shader evaluation.
    pub pre_scaled: bool,
    pub l00: Vec3,
    pub l1_1: Vec3,
    pub l10: Vec3,
    pub l11: Vec3,
    pub l2_2: Vec3,
    pub l2_1: Vec3,
    pub l20: Vec3,
    pub l21: Vec3,
    pub l22: Vec3,
}

// Real SH basis constants for bands 0, 1, 2.
const SH_L00: f32 = 0.282095;
const SH_L1: f32 = 0.488603;
const SH_L2_OFF: f32 = 1.092548;
const SH_L20: f32 = 0.315392;
const SH_L22: f32 = 0.546274;

impl SphericalHarmonics {
    /// Accumulate one directional radiance sample weighted by its solid angle.
    pub fn add_light(&mut self, direction: Vec3, color: Vec3, delta_solid_angle: f32) {
        let c = color * delta_solid_angle;
        let (x, y, z) = (direction.x, direction.y, direction.z);

        self.l00 += c * SH_L00;

        self.l1_1 += c * (SH_L1 * y);
        self.l10 += c * (SH_L1 * z);
        self.l11 += c * (SH_L1 * x);

        self.l2_2 += c * (SH_L2_OFF * x * y);
        self.l2_1 += c * (SH_L2_OFF * y * z);
        self.l21 += c * (SH_L2_OFF * x * z);
        self.l20 += c * (SH_L20 * (3.0 * z * z - 1.0));
        self.l22 += c * (SH_L22 * (x * x - y * y));
    }

    pub fn scale_in_place(&mut self, scale: f32) {
        self.l00 *= scale;
        self.l1_1 *= scale;
        self.l10 *= scale;
        self.l11 *= scale;
        self.l2_2 *= scale;
        self.l2_1 *= scale;
        self.l20 *= scale;
        self.l21 *= scale;
        self.l22 *= scale;
    }

    /// Convolve incident radiance with the clamped cosine lobe, turning the
    /// coefficients into irradiance. Band factors are pi, 2pi/3 and pi/4.
    pub fn convert_incident_radiance_to_irradiance(&mut self) {
        self.l00 *= 3.141593;

        self.l1_1 *= 2.094395;
        self.l10 *= 2.094395;
        self.l11 *= 2.094395;

        self.l2_2 *= 0.785398;
        self.l2_1 *= 0.785398;
        self.l20 *= 0.785398;
        self.l21 *= 0.785398;
        self.l22 *= 0.785398;
    }

    /// Divide by pi, turning irradiance into exitant radiance for a white
    /// Lambertian surface.
    pub fn convert_irradiance_to_lambertian_radiance(&mut self) {
        self.scale_in_place(1.0 / std::f32::consts::PI);
    }

    /// Fold the SH basis constants into the coefficients so a shader can
    /// evaluate the expansion with plain dot products. Idempotent: a second
    /// call is a no-op.
    pub fn pre_scale_for_rendering(&mut self) {
        if self.pre_scaled {
            return;
        }
        self.pre_scaled = true;

        self.l00 *= SH_L00;

        self.l1_1 *= -SH_L1;
        self.l10 *= SH_L1;
        self.l11 *= -SH_L1;

        self.l2_2 *= SH_L2_OFF;
        self.l2_1 *= -SH_L2_OFF;
        self.l20 *= SH_L20;
        self.l21 *= -SH_L2_OFF;
        self.l22 *= SH_L22;
    }

    /// Coefficients flattened in band order, three floats per coefficient.
    pub fn to_array(&self) -> [f32; 27] {
        let mut out = [0.0; 27];
        let coefficients = [
            self.l00, self.l1_1, self.l10, self.l11, self.l2_2, self.l2_1, self.l20, self.l21,
            self.l22,
        ];
        for (slot, v) in coefficients.iter().enumerate() {
            out[slot * 3] = v.x;
            out[slot * 3 + 1] = v.y;
            out[slot * 3 + 2] = v.z;
        }
        out
    }

    pub fn from_array(values: &[f32; 27]) -> Self {
        let at = |slot: usize| Vec3::new(values[slot * 3], values[slot * 3 + 1], values[slot * 3 + 2]);
        Self {
            pre_scaled: false,
            l00: at(0),
            l1_1: at(1),
            l10: at(2),
            l11: at(3),
            l2_2: at(4),
            l2_1: at(5),
            l20: at(6),
            l21: at(7),
            l22: at(8),
        }
    }

    /// Recover harmonics from a polynomial representation. Inverse of
    /// [`SphericalPolynomial::from_harmonics`] up to rounding.
    pub fn from_polynomial(polynomial: &SphericalPolynomial) -> Self {
        let mut sh = Self {
            pre_scaled: false,
            l00: (polynomial.xx + polynomial.yy) * 0.376127 + polynomial.zz * 0.376126,
            l1_1: polynomial.y * -0.977204,
            l10: polynomial.z * 0.977204,
            l11: polynomial.x * -0.977204,
            l2_2: polynomial.xy * 1.16538,
            l2_1: polynomial.yz * -1.16538,
            l20: polynomial.zz * 1.34567 - (polynomial.xx + polynomial.yy) * 0.672834,
            l21: polynomial.zx * -1.16538,
            l22: (polynomial.xx - polynomial.yy) * 1.16538,
        };
        sh.scale_in_place(std::f32::consts::PI);
        sh
    }
}

/// Second-order polynomial form of an SH irradiance expansion, evaluated as
/// `x*nx + y*ny + z*nz + xx*nx^2 + ... + xy*nx*ny` for a unit normal `n`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SphericalPolynomial {
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
    pub xx: Vec3,
    pub yy: Vec3,
    pub zz: Vec3,
    pub xy: Vec3,
    pub yz: Vec3,
    pub zx: Vec3,
    /// Source harmonics, kept so round trips do not accumulate error.
    harmonics: Option<Box<SphericalHarmonics>>,
}

impl SphericalPolynomial {
    pub fn from_harmonics(harmonics: &SphericalHarmonics) -> Self {
        let mut p = Self {
            x: harmonics.l11 * -1.02333,
            y: harmonics.l1_1 * -1.02333,
            z: harmonics.l10 * 1.02333,
            xx: harmonics.l00 * 0.886277 - harmonics.l20 * 0.247708 + harmonics.l22 * 0.429043,
            yy: harmonics.l00 * 0.886277 - harmonics.l20 * 0.247708 - harmonics.l22 * 0.429043,
            zz: harmonics.l00 * 0.886277 + harmonics.l20 * 0.495417,
            yz: harmonics.l2_1 * -0.858086,
            zx: harmonics.l21 * -0.858086,
            xy: harmonics.l2_2 * 0.858086,
            harmonics: Some(Box::new(harmonics.clone())),
        };
        p.scale_in_place(1.0 / std::f32::consts::PI);
        p
    }

    /// The harmonics this polynomial was derived from, or a fresh derivation
    /// when it was built directly.
    pub fn harmonics(&self) -> SphericalHarmonics {
        match &self.harmonics {
            Some(sh) => (**sh).clone(),
            None => SphericalHarmonics::from_polynomial(self),
        }
    }

    fn scale_in_place(&mut self, scale: f32) {
        self.x *= scale;
        self.y *= scale;
        self.z *= scale;
        self.xx *= scale;
        self.yy *= scale;
        self.zz *= scale;
        self.xy *= scale;
        self.yz *= scale;
        self.zx *= scale;
    }

    /// Coefficients flattened for upload, three floats per term.
    pub fn to_array(&self) -> [f32; 27] {
        let mut out = [0.0; 27];
        let terms = [
            self.x, self.y, self.z, self.xx, self.yy, self.zz, self.yz, self.zx, self.xy,
        ];
        for (slot, v) in terms.iter().enumerate() {
            out[slot * 3] = v.x;
            out[slot * 3 + 1] = v.y;
            out[slot * 3 + 2] = v.z;
        }
        out
    }
}
