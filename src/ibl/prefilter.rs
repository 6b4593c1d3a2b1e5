//! Specular prefiltering of HDR cubemaps.
//!
//! The GPU work itself lives behind [`FilteringBackend`]; this module owns the
//! orchestration: capability gating, the face-major/lod-minor convolution
//! schedule, per-lod roughness selection and the atomic mip-chain swap at the
//! end. Completion is reported through a channel so callers can wait without
//! polling.

use std::collections::HashSet;

use crossbeam_channel::{bounded, Receiver};
use glam::Vec3;

use crate::error::FilteringError;

/// Render-target precisions the device supports.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilteringCaps {
    pub float_render_targets: bool,
    pub half_float_render_targets: bool,
}

impl FilteringCaps {
    /// Prefiltering needs some floating-point target to write into.
    pub fn supports_prefiltering(self) -> bool {
        self.float_render_targets || self.half_float_render_targets
    }
}

/// Opaque handle to a compiled convolution effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectHandle(pub u64);

/// Opaque handle to a staged cube render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetHandle(pub u64);

/// Identifies a source cube texture owned by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// The GPU layer the filtering loop drives.
pub trait FilteringBackend {
    fn caps(&self) -> FilteringCaps;

    /// Compile the convolution effect for the requested sample count. The
    /// single long-latency step; everything after it is driven synchronously.
    fn compile_effect(&mut self, quality: u32) -> Result<EffectHandle, FilteringError>;

    /// Allocate a staged cube target with a full mip chain.
    fn create_cube_target(
        &mut self,
        size: usize,
        lod_count: u32,
    ) -> Result<TargetHandle, FilteringError>;

    /// Run one convolution pass into `target` at (`face`, `lod`).
    #[allow(clippy::too_many_arguments)]
    fn convolve(
        &mut self,
        effect: EffectHandle,
        source: TextureHandle,
        target: TargetHandle,
        face: usize,
        lod: u32,
        face_direction: Vec3,
        alpha: f32,
        hdr_scale: f32,
    ) -> Result<(), FilteringError>;

    /// Replace the source texture's mip chain with the staged target's.
    fn swap_mip_chain(
        &mut self,
        texture: TextureHandle,
        staged: TargetHandle,
    ) -> Result<(), FilteringError>;

    /// Free a staged target that will not be swapped in.
    fn release_target(&mut self, target: TargetHandle);

    fn texture_size(&self, texture: TextureHandle) -> usize;
}

/// Tuning knobs for one prefilter run.
#[derive(Clone, Copy, Debug)]
pub struct HdrFilteringOptions {
    /// Convolution sample count.
    pub quality: u32,
    /// Scales source radiance before convolution.
    pub hdr_scale: f32,
}

impl Default for HdrFilteringOptions {
    fn default() -> Self {
        Self {
            quality: 4096,
            hdr_scale: 1.0,
        }
    }
}

/// Where a run currently is, for logging and debugging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefilterPhase {
    Idle,
    Compiling,
    Filtering { face: usize, lod: u32 },
    Done,
}

/// Outward normals of the six cube faces, in right, left, up, down, front,
/// back order.
pub const FACE_DIRECTIONS: [Vec3; 6] = [
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, -1.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(0.0, 0.0, -1.0),
];

/// Map a mip level to the GGX alpha the convolution pass should use.
///
/// Lod zero stays perfectly sharp; deeper lods grow exponentially rougher,
/// shaped by the scale/offset pair the material uses to pick lods at runtime.
pub fn roughness_alpha(lod: u32, lod_scale: f32, lod_offset: f32, base_width: usize) -> f32 {
    if lod == 0 {
        return 0.0;
    }
    2.0f32.powf((lod as f32 - lod_offset) / lod_scale) / base_width as f32
}

/// Drives prefiltering runs against one backend.
pub struct HdrFiltering<B: FilteringBackend> {
    backend: B,
    /// Shapes the lod-to-roughness curve; must match the sampling side.
    pub lod_generation_scale: f32,
    pub lod_generation_offset: f32,
    in_flight: HashSet<TextureHandle>,
    phase: PrefilterPhase,
}

impl<B: FilteringBackend> HdrFiltering<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            lod_generation_scale: 0.8,
            lod_generation_offset: 0.0,
            in_flight: HashSet::new(),
            phase: PrefilterPhase::Idle,
        }
    }

    pub fn phase(&self) -> PrefilterPhase {
        self.phase
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Prefilter `texture` in place. The returned channel yields exactly one
    /// message: `Ok` after the staged mip chain has been swapped in, or the
    /// first error encountered. The source is untouched on error.
    pub fn prefilter(
        &mut self,
        texture: TextureHandle,
        options: HdrFilteringOptions,
    ) -> Receiver<Result<(), FilteringError>> {
        let (sender, receiver) = bounded(1);
        let outcome = self.run(texture, options);
        if let Err(err) = &outcome {
            log::warn!("prefiltering of texture {} failed: {err}", texture.0);
        }
        // The receiver may already be dropped when the caller only wanted the
        // side effect.
        let _ = sender.send(outcome);
        receiver
    }

    fn run(
        &mut self,
        texture: TextureHandle,
        options: HdrFilteringOptions,
    ) -> Result<(), FilteringError> {
        if !self.backend.caps().supports_prefiltering() {
            return Err(FilteringError::CapabilityUnavailable);
        }
        if !self.in_flight.insert(texture) {
            return Err(FilteringError::AlreadyInFlight { texture: texture.0 });
        }
        let outcome = self.filter_texture(texture, options);
        self.in_flight.remove(&texture);
        self.phase = match outcome {
            Ok(()) => PrefilterPhase::Done,
            Err(_) => PrefilterPhase::Idle,
        };
        outcome
    }

    fn filter_texture(
        &mut self,
        texture: TextureHandle,
        options: HdrFilteringOptions,
    ) -> Result<(), FilteringError> {
        let size = self.backend.texture_size(texture);
        let lod_count = (size as u32).max(1).ilog2() + 1;

        self.phase = PrefilterPhase::Compiling;
        let effect = self.backend.compile_effect(options.quality)?;

        let staged = self.backend.create_cube_target(size, lod_count)?;
        log::debug!(
            "prefiltering texture {}: {size}px, {lod_count} lods, quality {}",
            texture.0,
            options.quality
        );

        for (face, direction) in FACE_DIRECTIONS.iter().enumerate() {
            for lod in 0..lod_count {
                self.phase = PrefilterPhase::Filtering { face, lod };
                let alpha = roughness_alpha(
                    lod,
                    self.lod_generation_scale,
                    self.lod_generation_offset,
                    size,
                );
                if let Err(err) = self.backend.convolve(
                    effect,
                    texture,
                    staged,
                    face,
                    lod,
                    *direction,
                    alpha,
                    options.hdr_scale,
                ) {
                    self.backend.release_target(staged);
                    return Err(err);
                }
            }
        }

        // Swap only after every pass succeeded: either the full filtered
        // chain becomes visible, or none of it does.
        if let Err(err) = self.backend.swap_mip_chain(texture, staged) {
            self.backend.release_target(staged);
            return Err(err);
        }
        Ok(())
    }
}
