//! Software reference for a colorop list.

use crate::KmsResult;
use crate::descriptor::ColorOpDescriptor;
use colorop_core::{PixelBuffer, PixelTransform, transform_buffer};

/// Applies the software model of `ops`, in order, to a copy of `buffer`.
///
/// The input buffer is left untouched.
pub fn apply_software_transform(
    buffer: &PixelBuffer,
    ops: &[ColorOpDescriptor],
) -> KmsResult<PixelBuffer> {
    let transforms: Vec<PixelTransform> = ops.iter().map(|op| op.transform).collect();
    let mut out = buffer.clone();
    transform_buffer(&mut out, &transforms)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptors;
    use colorop_core::{DrmFormat, Pixel};

    #[test]
    fn test_midgray_srgb_eotf() {
        let input = PixelBuffer::from_fn(4, 4, DrmFormat::Xrgb8888, |_, _| Pixel::gray(0.5)).unwrap();
        let ops = descriptors(&["srgb_eotf"]).unwrap();
        let out = apply_software_transform(&input, &ops).unwrap();
        // 0.5 encodes as 128/255 = 0.50196, whose EOTF is 0.21586 -> 55
        assert_eq!(out.raw(0, 0).unwrap() & 0xff, 55);
        assert_eq!(input.raw(0, 0).unwrap() & 0xff, 128);
    }

    #[test]
    fn test_unsupported_format() {
        let input = PixelBuffer::new(2, 2, DrmFormat::Argb8888).unwrap();
        let ops = descriptors(&["srgb_eotf"]).unwrap();
        let err = apply_software_transform(&input, &ops).unwrap_err();
        assert!(err.is_skip());
    }
}
