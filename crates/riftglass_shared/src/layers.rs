use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LayerMask: u32 {
        const DEFAULT = 1 << 0;
        const _ = !0;
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl LayerMask {
    pub const MAX_LAYER: u8 = 31;

    pub fn layer(index: u8) -> Self {
        Self::from_bits_retain(1u32 << index.min(Self::MAX_LAYER))
    }

    pub fn contains_layer(self, index: u8) -> bool {
        index <= Self::MAX_LAYER && self.contains(Self::layer(index))
    }
}
