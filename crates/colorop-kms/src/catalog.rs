//! Built-in colorop catalog.
//!
//! Every entry pairs the hardware parameters of a colorop with the software
//! function modelling it. Coefficient tables are `const` items; the 3D LUT
//! cubes are generated once on first use.

use crate::descriptor::{ColorOpDescriptor, ColoropParams, Curve};
use crate::encode::Lut3dMode;
use crate::{KmsError, KmsResult};
use colorop_core::Pixel;
use colorop_lut::{Lut3D, LutResult};
use colorop_math::{Mat3, Mat3x4, multiply};
use colorop_transfer::{bt2020, gamma, pq, srgb};
use std::sync::LazyLock;

/// Side of the catalog 3D LUT cubes.
pub const LUT3D_SIZE: u16 = 17;

/// 50% desaturation.
pub const CTM_3X4_50_DESAT: Mat3x4 = Mat3x4::from_rows([
    [0.5, 0.25, 0.25, 0.0],
    [0.25, 0.5, 0.25, 0.0],
    [0.25, 0.25, 0.5, 0.0],
]);

/// Gain of 1.5 on every channel.
pub const CTM_3X4_OVERDRIVE: Mat3x4 = Mat3x4::from_rows([
    [1.5, 0.0, 0.0, 0.0],
    [0.0, 1.5, 0.0, 0.0],
    [0.0, 0.0, 1.5, 0.0],
]);

/// Saturation boost.
pub const CTM_3X4_OVERSATURATE: Mat3x4 = Mat3x4::from_rows([
    [1.5, -0.25, -0.25, 0.0],
    [-0.25, 1.5, -0.25, 0.0],
    [-0.25, -0.25, 1.5, 0.0],
]);

/// BT.709 RGB to full-range YCbCr.
pub const CTM_3X4_BT709_ENC: Mat3x4 = Mat3x4::from_rows([
    [0.2126, 0.7152, 0.0722, 0.0],
    [-0.1146, -0.3854, 0.5, 0.5],
    [0.5, -0.4542, -0.0458, 0.5],
]);

/// Full-range YCbCr to BT.709 RGB.
pub const CTM_3X4_BT709_DEC: Mat3x4 = Mat3x4::from_rows([
    [1.0, 0.0, 1.5748, -0.7874],
    [1.0, -0.1873, -0.4681, 0.3277],
    [1.0, 1.8556, 0.0, -0.9278],
]);

/// 50% desaturation, 3x3 form.
pub const CTM_3X3_50_DESAT: Mat3 = Mat3::from_rows([
    [0.5, 0.25, 0.25],
    [0.25, 0.5, 0.25],
    [0.25, 0.25, 0.5],
]);

/// Gain of 1.5, 3x3 form.
pub const CTM_3X3_OVERDRIVE: Mat3 = Mat3::diagonal(1.5, 1.5, 1.5);

/// 17-point cube of [`CTM_3X4_50_DESAT`].
pub static LUT3D_17_DESAT: LazyLock<LutResult<Lut3D>> = LazyLock::new(|| {
    Lut3D::from_fn(LUT3D_SIZE as usize, |rgb| {
        CTM_3X4_50_DESAT.apply(Pixel::from_array(rgb)).to_array()
    })
});

/// 17-point cube of the sRGB EOTF.
pub static LUT3D_17_SRGB_EOTF: LazyLock<LutResult<Lut3D>> =
    LazyLock::new(|| Lut3D::from_fn(LUT3D_SIZE as usize, |rgb| rgb.map(srgb::eotf)));

/// Resolves a lazily built catalog cube.
pub fn cube(lut: &'static LazyLock<LutResult<Lut3D>>) -> KmsResult<&'static Lut3D> {
    LazyLock::force(lut).as_ref().map_err(|e| KmsError::Lut(e.clone()))
}

fn srgb_eotf(p: Pixel) -> Pixel {
    p.map(srgb::eotf)
}

fn srgb_inv_eotf(p: Pixel) -> Pixel {
    p.map(srgb::inv_eotf)
}

fn pq_125_eotf(p: Pixel) -> Pixel {
    p.map(pq::eotf_125)
}

fn pq_125_inv_eotf(p: Pixel) -> Pixel {
    p.map(pq::inv_eotf_125)
}

fn bt2020_inv_oetf(p: Pixel) -> Pixel {
    p.map(bt2020::inv_oetf)
}

fn bt2020_oetf(p: Pixel) -> Pixel {
    p.map(bt2020::oetf)
}

fn gamma22(p: Pixel) -> Pixel {
    p.map(gamma::gamma22)
}

fn gamma22_inv(p: Pixel) -> Pixel {
    p.map(gamma::gamma22_inv)
}

fn ctm_3x4_50_desat(p: Pixel) -> Pixel {
    CTM_3X4_50_DESAT.apply(p)
}

fn ctm_3x4_overdrive(p: Pixel) -> Pixel {
    CTM_3X4_OVERDRIVE.apply(p)
}

fn ctm_3x4_oversaturate(p: Pixel) -> Pixel {
    CTM_3X4_OVERSATURATE.apply(p)
}

fn ctm_3x4_bt709_enc(p: Pixel) -> Pixel {
    CTM_3X4_BT709_ENC.apply(p)
}

fn ctm_3x4_bt709_dec(p: Pixel) -> Pixel {
    CTM_3X4_BT709_DEC.apply(p)
}

fn ctm_3x3_50_desat(p: Pixel) -> Pixel {
    CTM_3X3_50_DESAT.apply(p)
}

fn ctm_3x3_overdrive(p: Pixel) -> Pixel {
    CTM_3X3_OVERDRIVE.apply(p)
}

fn multiply_125(p: Pixel) -> Pixel {
    multiply(p, pq::PQ_125_SCALE as f32)
}

fn multiply_inv_125(p: Pixel) -> Pixel {
    multiply(p, (1.0 / pq::PQ_125_SCALE) as f32)
}

// Tetrahedral interpolation reproduces an affine map exactly, so the cube
// is modelled by the matrix on clamped input.
fn lut3d_17_desat(p: Pixel) -> Pixel {
    CTM_3X4_50_DESAT.apply(p.clamp01())
}

fn lut3d_17_srgb_eotf(p: Pixel) -> Pixel {
    match (*LUT3D_17_SRGB_EOTF).as_ref() {
        Ok(lut) => lut.apply_pixel(p),
        Err(_) => srgb_eotf(p.clamp01()),
    }
}

const LUT3D_17_MODE: Lut3dMode = Lut3dMode::packed(LUT3D_SIZE);

static CATALOG: &[ColorOpDescriptor] = &[
    ColorOpDescriptor::new("srgb_eotf", ColoropParams::Curve(Curve::SrgbEotf), srgb_eotf),
    ColorOpDescriptor::new("srgb_inv_eotf", ColoropParams::Curve(Curve::SrgbInvEotf), srgb_inv_eotf),
    ColorOpDescriptor::new("pq_125_eotf", ColoropParams::Curve(Curve::Pq125Eotf), pq_125_eotf),
    ColorOpDescriptor::new(
        "pq_125_inv_eotf",
        ColoropParams::Curve(Curve::Pq125InvEotf),
        pq_125_inv_eotf,
    ),
    ColorOpDescriptor::new(
        "bt2020_inv_oetf",
        ColoropParams::Curve(Curve::Bt2020InvOetf),
        bt2020_inv_oetf,
    ),
    ColorOpDescriptor::new("bt2020_oetf", ColoropParams::Curve(Curve::Bt2020Oetf), bt2020_oetf),
    ColorOpDescriptor::new("gamma22", ColoropParams::Curve(Curve::Gamma22), gamma22),
    ColorOpDescriptor::new("gamma22_inv", ColoropParams::Curve(Curve::Gamma22Inv), gamma22_inv),
    ColorOpDescriptor::new("lut1d_srgb_eotf", ColoropParams::CustomLut1D, srgb_eotf),
    ColorOpDescriptor::new("lut1d_srgb_inv_eotf", ColoropParams::CustomLut1D, srgb_inv_eotf),
    ColorOpDescriptor::new(
        "ctm_3x4_50_desat",
        ColoropParams::Ctm3x4(&CTM_3X4_50_DESAT),
        ctm_3x4_50_desat,
    ),
    ColorOpDescriptor::new(
        "ctm_3x4_overdrive",
        ColoropParams::Ctm3x4(&CTM_3X4_OVERDRIVE),
        ctm_3x4_overdrive,
    ),
    ColorOpDescriptor::new(
        "ctm_3x4_oversaturate",
        ColoropParams::Ctm3x4(&CTM_3X4_OVERSATURATE),
        ctm_3x4_oversaturate,
    ),
    ColorOpDescriptor::new(
        "ctm_3x4_bt709_enc",
        ColoropParams::Ctm3x4(&CTM_3X4_BT709_ENC),
        ctm_3x4_bt709_enc,
    ),
    ColorOpDescriptor::new(
        "ctm_3x4_bt709_dec",
        ColoropParams::Ctm3x4(&CTM_3X4_BT709_DEC),
        ctm_3x4_bt709_dec,
    ),
    ColorOpDescriptor::new(
        "ctm_3x3_50_desat",
        ColoropParams::Ctm3x3(&CTM_3X3_50_DESAT),
        ctm_3x3_50_desat,
    ),
    ColorOpDescriptor::new(
        "ctm_3x3_overdrive",
        ColoropParams::Ctm3x3(&CTM_3X3_OVERDRIVE),
        ctm_3x3_overdrive,
    ),
    ColorOpDescriptor::new(
        "multiply_125",
        ColoropParams::Multiplier(pq::PQ_125_SCALE),
        multiply_125,
    ),
    ColorOpDescriptor::new(
        "multiply_inv_125",
        ColoropParams::Multiplier(1.0 / pq::PQ_125_SCALE),
        multiply_inv_125,
    ),
    ColorOpDescriptor::new(
        "lut3d_17_desat",
        ColoropParams::Lut3D {
            lut: &LUT3D_17_DESAT,
            mode: LUT3D_17_MODE,
        },
        lut3d_17_desat,
    ),
    ColorOpDescriptor::new(
        "lut3d_17_srgb_eotf",
        ColoropParams::Lut3D {
            lut: &LUT3D_17_SRGB_EOTF,
            mode: LUT3D_17_MODE,
        },
        lut3d_17_srgb_eotf,
    ),
];

/// Default test cases as `(name, colorops)`.
pub const DEFAULT_TESTS: &[(&str, &[&str])] = &[
    ("srgb_eotf", &["srgb_eotf"]),
    ("srgb_inv_eotf", &["srgb_inv_eotf"]),
    ("srgb_eotf-srgb_inv_eotf", &["srgb_eotf", "srgb_inv_eotf"]),
    ("bt2020_inv_oetf-bt2020_oetf", &["bt2020_inv_oetf", "bt2020_oetf"]),
    ("pq_125_eotf-pq_125_inv_eotf", &["pq_125_eotf", "pq_125_inv_eotf"]),
    ("pq_125_eotf-multiply_inv_125", &["pq_125_eotf", "multiply_inv_125"]),
    ("gamma22-gamma22_inv", &["gamma22", "gamma22_inv"]),
    ("ctm_3x4_50_desat", &["ctm_3x4_50_desat"]),
    ("ctm_3x4_overdrive", &["ctm_3x4_overdrive"]),
    ("ctm_3x4_oversaturate", &["ctm_3x4_oversaturate"]),
    ("ctm_3x4_bt709_enc-ctm_3x4_bt709_dec", &["ctm_3x4_bt709_enc", "ctm_3x4_bt709_dec"]),
    ("ctm_3x3_50_desat", &["ctm_3x3_50_desat"]),
    ("lut1d_srgb_eotf", &["lut1d_srgb_eotf"]),
    ("srgb_eotf-ctm_3x4_50_desat-srgb_inv_eotf", &["srgb_eotf", "ctm_3x4_50_desat", "srgb_inv_eotf"]),
    ("lut3d_17_desat", &["lut3d_17_desat"]),
];

/// All catalog entries, unbound.
pub fn catalog() -> &'static [ColorOpDescriptor] {
    CATALOG
}

/// Looks a catalog entry up by name.
pub fn descriptor(name: &str) -> Option<ColorOpDescriptor> {
    CATALOG.iter().find(|d| d.name == name).copied()
}

/// Resolves an ordered list of catalog names into unbound descriptors.
pub fn descriptors<S: AsRef<str>>(names: &[S]) -> KmsResult<Vec<ColorOpDescriptor>> {
    names
        .iter()
        .map(|n| {
            let n = n.as_ref();
            descriptor(n).ok_or_else(|| KmsError::Config(format!("unknown colorop {:?}", n)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ColoropKind;
    use approx::assert_abs_diff_eq;
    use colorop_core::apply_transforms;

    fn run(names: &[&str], p: Pixel) -> Pixel {
        let ops = descriptors(names).unwrap();
        let transforms: Vec<_> = ops.iter().map(|d| d.transform).collect();
        apply_transforms(p, &transforms)
    }

    #[test]
    fn test_names_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            assert!(CATALOG[i + 1..].iter().all(|b| b.name != a.name), "{}", a.name);
        }
    }

    #[test]
    fn test_default_tests_resolve() {
        for (name, ops) in DEFAULT_TESTS {
            assert!(descriptors(*ops).is_ok(), "{}", name);
        }
        assert!(matches!(descriptors(&["nope"]), Err(KmsError::Config(_))));
    }

    #[test]
    fn test_srgb_midgray() {
        let p = run(&["srgb_eotf"], Pixel::gray(0.5));
        assert_abs_diff_eq!(p.r, 0.214041, epsilon = 1e-4);
    }

    #[test]
    fn test_srgb_identity_composition() {
        let p = Pixel::new(0.1, 0.6, 0.9);
        let out = run(&["srgb_eotf", "srgb_inv_eotf"], p);
        assert!(out.max_abs_diff(&p) < 1e-4);
    }

    #[test]
    fn test_bt709_roundtrip_red() {
        let out = run(&["ctm_3x4_bt709_enc", "ctm_3x4_bt709_dec"], Pixel::new(1.0, 0.0, 0.0));
        assert!(out.max_abs_diff(&Pixel::new(1.0, 0.0, 0.0)) < 1e-3);
    }

    #[test]
    fn test_pq_multiply_matches_pq() {
        let out = run(&["pq_125_eotf", "multiply_inv_125"], Pixel::gray(0.5));
        assert_abs_diff_eq!(out.r, pq::eotf(0.5), epsilon = 1e-5);
    }

    #[test]
    fn test_desat_cube_matches_matrix() {
        let lut = cube(&LUT3D_17_DESAT).unwrap();
        let p = Pixel::new(0.3, 0.7, 0.11);
        let via_lut = lut.apply_pixel(p);
        assert!(via_lut.max_abs_diff(&lut3d_17_desat(p)) < 1e-5);
    }

    #[test]
    fn test_bt709_decode_inverts_encode() {
        for p in [
            Pixel::new(1.0, 0.0, 0.0),
            Pixel::new(0.0, 1.0, 0.0),
            Pixel::new(0.0, 0.0, 1.0),
            Pixel::new(0.25, 0.5, 0.75),
        ] {
            let yuv = CTM_3X4_BT709_ENC.apply(p);
            assert!(yuv.to_array().iter().all(|c| (0.0..=1.0).contains(c)), "{:?}", yuv);
            let back = CTM_3X4_BT709_DEC.apply(yuv);
            assert!(back.max_abs_diff(&p) < 1e-3, "{:?} -> {:?}", p, back);
        }
    }

    #[test]
    fn test_kinds() {
        assert_eq!(descriptor("lut1d_srgb_eotf").unwrap().kind(), ColoropKind::CustomLut1D);
        assert_eq!(descriptor("multiply_125").unwrap().kind(), ColoropKind::Multiplier);
        assert_eq!(descriptor("lut3d_17_desat").unwrap().kind(), ColoropKind::Lut3D);
        assert!(descriptor("srgb_eotf").unwrap().bound.is_none());
    }
}
