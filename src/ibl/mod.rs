//! Image-based lighting preprocessing.
//!
//! Two independent paths: a CPU projection of a cubemap onto spherical
//! harmonics for the diffuse term, and a backend-driven prefiltering loop
//! that bakes per-roughness specular mips into an HDR cube texture.

pub mod cube_projection;
pub mod harmonics;
pub mod prefilter;

pub use cube_projection::{
    cube_map_to_spherical_harmonics, cube_map_to_spherical_polynomial, CubeMapInfo, FaceData,
    PixelFormat,
};
pub use harmonics::{SphericalHarmonics, SphericalPolynomial};
pub use prefilter::{
    roughness_alpha, FilteringBackend, FilteringCaps, HdrFiltering, HdrFilteringOptions,
};
