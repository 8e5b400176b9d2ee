//! Layer bit masks used by nodes, cameras and render passes

use bitflags::bitflags;

bitflags! {
    /// Layer membership of a node, or a mask selecting layers
    ///
    /// Nodes sit on [`Layer::LAYER0`] by default; cameras and passes
    /// use [`Layer::EVERYTHING`] as their default mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Layer: u32 {
        /// Default layer
        const LAYER0 = 1 << 0;
        /// Layer 1
        const LAYER1 = 1 << 1;
        /// Layer 2
        const LAYER2 = 1 << 2;
        /// Layer 3
        const LAYER3 = 1 << 3;
        /// Layer 4
        const LAYER4 = 1 << 4;
        /// Layer 5
        const LAYER5 = 1 << 5;
        /// Layer 6
        const LAYER6 = 1 << 6;
        /// Layer 7
        const LAYER7 = 1 << 7;
        /// Every layer, including ones without a named constant
        const EVERYTHING = u32::MAX;
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::LAYER0
    }
}

impl Layer {
    /// Whether any bit of `self` is selected by `mask`
    pub const fn visible_in(self, mask: Self) -> bool {
        self.bits() & mask.bits() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_visibility() {
        assert!(Layer::LAYER0.visible_in(Layer::EVERYTHING));
        assert!(!Layer::LAYER1.visible_in(Layer::LAYER0 | Layer::LAYER2));
        assert!(!Layer::LAYER3.visible_in(Layer::empty()));
        assert!(Layer::from_bits_retain(1 << 20).visible_in(Layer::EVERYTHING));
    }
}
