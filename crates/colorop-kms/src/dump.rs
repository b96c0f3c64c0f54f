//! PNG dumps of mismatching test buffers.
//!
//! Every format is written as 16-bit RGB so 10-bit channels keep their
//! precision.

use crate::KmsResult;
use colorop_core::PixelBuffer;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Writes `buffer` to a 16-bit RGB PNG at `path`.
pub fn write_png(path: impl AsRef<Path>, buffer: &PixelBuffer) -> KmsResult<()> {
    let (width, height) = (buffer.width(), buffer.height());
    let mut data = Vec::with_capacity(width as usize * height as usize * 6);
    for y in 0..height {
        for x in 0..width {
            for c in buffer.pixel(x, y)?.to_array() {
                let v = (c.clamp(0.0, 1.0) * 65535.0).round() as u16;
                data.extend_from_slice(&v.to_be_bytes());
            }
        }
    }

    let writer = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Sixteen);
    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&data)?;
    png_writer.finish()?;
    Ok(())
}

/// Writes `<test>-input.png`, `<test>-output.png` and `<test>-reference.png`
/// into `dir`, creating it if needed. Returns the written paths.
pub fn dump_mismatch(
    dir: &Path,
    test: &str,
    input: &PixelBuffer,
    output: &PixelBuffer,
    reference: &PixelBuffer,
) -> KmsResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(3);
    for (kind, buffer) in [("input", input), ("output", output), ("reference", reference)] {
        let path = dir.join(format!("{}-{}.png", test, kind));
        write_png(&path, buffer)?;
        paths.push(path);
    }
    Ok(paths)
}
