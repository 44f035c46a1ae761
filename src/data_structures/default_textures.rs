//! Single-pixel fallback textures.

use crate::data_structures::texture::Texture;

/// The five solid colours available as fallback textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefaultColour {
    Black,
    White,
    Red,
    Green,
    Blue,
}

impl DefaultColour {
    pub const ALL: [DefaultColour; 5] = [
        DefaultColour::Black,
        DefaultColour::White,
        DefaultColour::Red,
        DefaultColour::Green,
        DefaultColour::Blue,
    ];

    pub fn rgba(self) -> [u8; 4] {
        match self {
            DefaultColour::Black => [0, 0, 0, 255],
            DefaultColour::White => [255, 255, 255, 255],
            DefaultColour::Red => [255, 0, 0, 255],
            DefaultColour::Green => [0, 255, 0, 255],
            DefaultColour::Blue => [0, 0, 255, 255],
        }
    }

    fn label(self) -> &'static str {
        match self {
            DefaultColour::Black => "default black texture",
            DefaultColour::White => "default white texture",
            DefaultColour::Red => "default red texture",
            DefaultColour::Green => "default green texture",
            DefaultColour::Blue => "default blue texture",
        }
    }
}

/// One 1x1 texture per [`DefaultColour`].
///
/// Owned by [`Context`](crate::context::Context), which creates the set at most
/// once per device.
#[derive(Debug)]
pub struct DefaultTextures {
    textures: [Texture; 5],
}

impl DefaultTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        log::debug!("creating default textures");
        let textures = DefaultColour::ALL
            .map(|colour| Texture::solid_colour(device, queue, colour.rgba(), colour.label()));
        Self { textures }
    }

    pub fn get(&self, colour: DefaultColour) -> &Texture {
        &self.textures[colour as usize]
    }
}

impl Drop for DefaultTextures {
    fn drop(&mut self) {
        for texture in &self.textures {
            texture.texture.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_are_opaque_primaries() {
        assert_eq!(DefaultColour::Black.rgba(), [0, 0, 0, 255]);
        assert_eq!(DefaultColour::White.rgba(), [255, 255, 255, 255]);
        assert_eq!(DefaultColour::Blue.rgba(), [0, 0, 255, 255]);
        assert!(DefaultColour::ALL.iter().all(|c| c.rgba()[3] == 255));
    }

    #[test]
    fn all_is_indexed_by_discriminant() {
        for (n, colour) in DefaultColour::ALL.iter().enumerate() {
            assert_eq!(*colour as usize, n);
        }
    }
}
