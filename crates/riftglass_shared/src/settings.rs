use serde::{Deserialize, Serialize};

use crate::clip::{ClipDepth, NEAR_CLIP_LIMIT, NEAR_CLIP_OFFSET};

pub const REAPPEAR_DISTANCE: f32 = 2.0;
pub const DEFAULT_CONTENT_SHADER: &str = "Custom/PortalObjectShader";

const MIN_REAPPEAR_DISTANCE: f32 = 0.1;
const MAX_REAPPEAR_DISTANCE: f32 = 100.0;
const MAX_NEAR_CLIP_OFFSET: f32 = 1.0;
const MAX_NEAR_CLIP_LIMIT: f32 = 10.0;
const MIN_TARGET_DIMENSION: u32 = 1;
const MAX_TARGET_DIMENSION: u32 = 8192;
const SUPPORTED_DEPTH_BITS: [u32; 3] = [16, 24, 32];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSettings {
    #[serde(default = "default_reappear_distance")]
    pub reappear_distance: f32,
    #[serde(default = "default_near_clip_offset")]
    pub near_clip_offset: f32,
    #[serde(default = "default_near_clip_limit")]
    pub near_clip_limit: f32,
    #[serde(default)]
    pub clip_depth: ClipDepth,
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    #[serde(default = "default_target_height")]
    pub target_height: u32,
    #[serde(default = "default_depth_bits")]
    pub depth_bits: u32,
    #[serde(default = "default_content_shader")]
    pub content_shader: String,
    #[serde(default = "default_surface_material_slot")]
    pub surface_material_slot: usize,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            reappear_distance: default_reappear_distance(),
            near_clip_offset: default_near_clip_offset(),
            near_clip_limit: default_near_clip_limit(),
            clip_depth: ClipDepth::default(),
            target_width: default_target_width(),
            target_height: default_target_height(),
            depth_bits: default_depth_bits(),
            content_shader: default_content_shader(),
            surface_material_slot: default_surface_material_slot(),
        }
    }
}

impl PortalSettings {
    pub fn sanitize(mut self) -> Self {
        self.reappear_distance = finite_or(self.reappear_distance, default_reappear_distance())
            .clamp(MIN_REAPPEAR_DISTANCE, MAX_REAPPEAR_DISTANCE);
        self.near_clip_offset = finite_or(self.near_clip_offset, default_near_clip_offset())
            .clamp(0.0, MAX_NEAR_CLIP_OFFSET);
        self.near_clip_limit = finite_or(self.near_clip_limit, default_near_clip_limit())
            .clamp(0.0, MAX_NEAR_CLIP_LIMIT);
        self.target_width = self
            .target_width
            .clamp(MIN_TARGET_DIMENSION, MAX_TARGET_DIMENSION);
        self.target_height = self
            .target_height
            .clamp(MIN_TARGET_DIMENSION, MAX_TARGET_DIMENSION);
        if !SUPPORTED_DEPTH_BITS.contains(&self.depth_bits) {
            self.depth_bits = default_depth_bits();
        }
        if self.content_shader.trim().is_empty() {
            self.content_shader = default_content_shader();
        }
        self
    }
}

/// `clamp` lets NaN through, so non-finite values fall back first.
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn default_reappear_distance() -> f32 {
    REAPPEAR_DISTANCE
}

fn default_near_clip_offset() -> f32 {
    NEAR_CLIP_OFFSET
}

fn default_near_clip_limit() -> f32 {
    NEAR_CLIP_LIMIT
}

fn default_target_width() -> u32 {
    1920
}

fn default_target_height() -> u32 {
    1080
}

fn default_depth_bits() -> u32 {
    24
}

fn default_content_shader() -> String {
    DEFAULT_CONTENT_SHADER.to_string()
}

fn default_surface_material_slot() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::PortalSettings;

    #[test]
    fn defaults_match_portal_constants() {
        let settings = PortalSettings::default();
        assert_eq!(settings.reappear_distance, 2.0);
        assert_eq!(settings.near_clip_offset, 0.05);
        assert_eq!(settings.near_clip_limit, 0.2);
        assert_eq!((settings.target_width, settings.target_height), (1920, 1080));
        assert_eq!(settings.depth_bits, 24);
        assert_eq!(settings.surface_material_slot, 1);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let settings = PortalSettings {
            reappear_distance: -4.0,
            target_width: 0,
            target_height: 100_000,
            depth_bits: 12,
            content_shader: "   ".to_string(),
            ..PortalSettings::default()
        }
        .sanitize();

        assert_eq!(settings.reappear_distance, 0.1);
        assert_eq!(settings.target_width, 1);
        assert_eq!(settings.target_height, 8192);
        assert_eq!(settings.depth_bits, 24);
        assert_eq!(settings.content_shader, "Custom/PortalObjectShader");
    }

    #[test]
    fn sanitize_replaces_non_finite_values_with_defaults() {
        let settings = PortalSettings {
            reappear_distance: f32::NAN,
            near_clip_offset: f32::INFINITY,
            near_clip_limit: f32::NAN,
            ..PortalSettings::default()
        }
        .sanitize();

        assert_eq!(settings.reappear_distance, 2.0);
        assert_eq!(settings.near_clip_offset, 0.05);
        assert_eq!(settings.near_clip_limit, 0.2);
    }
}
