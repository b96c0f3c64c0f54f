//! Normalized RGB pixel type.
//!
//! [`Pixel`] is the unit every color model function operates on: three
//! `f32` channels, nominally in [0, 1] but allowed to leave that range
//! between pipeline stages. Clamping happens only when a pixel is packed
//! back into a framebuffer format.

use std::ops::{Index, IndexMut};

/// A pure per-pixel color transform.
///
/// Transforms are plain function pointers so that descriptor tables can be
/// built statically and compared by identity.
pub type PixelTransform = fn(Pixel) -> Pixel;

/// A normalized RGB triple.
///
/// # Example
///
/// ```rust
/// use colorop_core::Pixel;
///
/// let p = Pixel::gray(0.5);
/// assert_eq!(p.to_array(), [0.5, 0.5, 0.5]);
/// assert_eq!(Pixel::new(1.5, -0.2, 0.3).clamp01(), Pixel::new(1.0, 0.0, 0.3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pixel {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
}

impl Pixel {
    /// Black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    /// White.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a new pixel.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Creates a pixel with all channels equal.
    #[inline]
    pub const fn gray(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Creates a pixel from an `[r, g, b]` array.
    #[inline]
    pub const fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    /// Returns the channels as an `[r, g, b]` array.
    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Applies `f` to every channel.
    #[inline]
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    /// Multiplies every channel by `s`.
    #[inline]
    pub fn scale(self, s: f32) -> Self {
        self.map(|c| c * s)
    }

    /// Clamps every channel to [0, 1].
    ///
    /// NaN channels become 0.
    #[inline]
    pub fn clamp01(self) -> Self {
        self.map(|c| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) })
    }

    /// Returns true if all channels are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    /// Largest absolute per-channel difference to `other`.
    #[inline]
    pub fn max_abs_diff(&self, other: &Self) -> f32 {
        (self.r - other.r)
            .abs()
            .max((self.g - other.g).abs())
            .max((self.b - other.b).abs())
    }
}

impl From<[f32; 3]> for Pixel {
    #[inline]
    fn from(a: [f32; 3]) -> Self {
        Self::from_array(a)
    }
}

impl From<Pixel> for [f32; 3] {
    #[inline]
    fn from(p: Pixel) -> Self {
        p.to_array()
    }
}

impl Index<usize> for Pixel {
    type Output = f32;

    #[inline]
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.r,
            1 => &self.g,
            2 => &self.b,
            _ => panic!("Pixel index out of range: {}", i),
        }
    }
}

impl IndexMut<usize> for Pixel {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        match i {
            0 => &mut self.r,
            1 => &mut self.g,
            2 => &mut self.b,
            _ => panic!("Pixel index out of range: {}", i),
        }
    }
}

/// Applies transforms in order to a single pixel.
#[inline]
pub fn apply_transforms(pixel: Pixel, transforms: &[PixelTransform]) -> Pixel {
    transforms.iter().fold(pixel, |p, t| t(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_nan() {
        let p = Pixel::new(f32::NAN, 2.0, -1.0).clamp01();
        assert_eq!(p, Pixel::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_index() {
        let mut p = Pixel::new(0.1, 0.2, 0.3);
        p[1] = 0.7;
        assert_eq!(p[0], 0.1);
        assert_eq!(p.g, 0.7);
    }

    #[test]
    fn test_apply_transforms_order() {
        fn double(p: Pixel) -> Pixel {
            p.scale(2.0)
        }
        fn add_one(p: Pixel) -> Pixel {
            p.map(|c| c + 1.0)
        }
        let p = apply_transforms(Pixel::gray(1.0), &[double, add_one]);
        assert_eq!(p, Pixel::gray(3.0));
        let p = apply_transforms(Pixel::gray(1.0), &[add_one, double]);
        assert_eq!(p, Pixel::gray(4.0));
    }
}
