//! Abstract colorop descriptors.
//!
//! A [`ColorOpDescriptor`] names one step of a desired color pipeline: what
//! kind of hardware stage it needs, the parameters to program into that
//! stage, and the software function that models it. The pipeline mapper
//! records the hardware node chosen for it in [`ColorOpDescriptor::bound`].

use crate::display::{ColoropId, ColoropType};
use crate::encode::Lut3dMode;
use colorop_core::{Pixel, PixelTransform};
use colorop_lut::{Lut3D, LutResult};
use colorop_math::{Mat3, Mat3x4};
use colorop_transfer::{
    BT2020_INV_OETF, BT2020_OETF, GAMMA22, GAMMA22_INV, SRGB_EOTF, SRGB_INV_EOTF, pq,
};
use std::fmt;
use std::sync::LazyLock;

/// Kind of abstract colorop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColoropKind {
    /// A named curve selected from the hardware's curve enum
    EnumeratedCurve,
    /// A 1D LUT sampled from the descriptor's transform
    CustomLut1D,
    /// 3x3 matrix
    Ctm3x3,
    /// 3x4 matrix
    Ctm3x4,
    /// Scalar multiplier
    Multiplier,
    /// 3D LUT
    Lut3D,
}

impl ColoropKind {
    /// Hardware node type able to realize this kind.
    pub const fn hardware_type(self) -> ColoropType {
        match self {
            Self::EnumeratedCurve => ColoropType::Curve1D,
            Self::CustomLut1D => ColoropType::Lut1D,
            Self::Ctm3x3 => ColoropType::Ctm3x3,
            Self::Ctm3x4 => ColoropType::Ctm3x4,
            Self::Multiplier => ColoropType::Multiplier,
            Self::Lut3D => ColoropType::Lut3D,
        }
    }
}

/// Named 1D curves known to the driver curve enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// sRGB EOTF
    SrgbEotf,
    /// sRGB inverse EOTF
    SrgbInvEotf,
    /// PQ EOTF scaled to 125
    Pq125Eotf,
    /// Inverse of [`Curve::Pq125Eotf`]
    Pq125InvEotf,
    /// BT.2020 inverse OETF
    Bt2020InvOetf,
    /// BT.2020 OETF
    Bt2020Oetf,
    /// Gamma 2.2
    Gamma22,
    /// Inverse gamma 2.2
    Gamma22Inv,
}

impl Curve {
    /// All curves, in driver enum order.
    pub const ALL: [Self; 8] = [
        Self::SrgbEotf,
        Self::SrgbInvEotf,
        Self::Pq125Eotf,
        Self::Pq125InvEotf,
        Self::Bt2020InvOetf,
        Self::Bt2020Oetf,
        Self::Gamma22,
        Self::Gamma22Inv,
    ];

    /// Enum value name exposed by the driver.
    pub const fn hw_name(self) -> &'static str {
        match self {
            Self::SrgbEotf => "sRGB EOTF",
            Self::SrgbInvEotf => "sRGB Inverse EOTF",
            Self::Pq125Eotf => "PQ 125 EOTF",
            Self::Pq125InvEotf => "PQ 125 Inverse EOTF",
            Self::Bt2020InvOetf => "BT.2020 Inverse OETF",
            Self::Bt2020Oetf => "BT.2020 OETF",
            Self::Gamma22 => "Gamma 2.2",
            Self::Gamma22Inv => "Gamma 2.2 Inverse",
        }
    }

    /// Looks a curve up by driver enum name.
    pub fn from_hw_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.hw_name() == name)
    }

    /// Evaluates the curve on one channel.
    pub fn eval(self, x: f32) -> f32 {
        match self {
            Self::SrgbEotf => SRGB_EOTF.eval(x),
            Self::SrgbInvEotf => SRGB_INV_EOTF.eval(x),
            Self::Pq125Eotf => pq::eotf_125(x),
            Self::Pq125InvEotf => pq::inv_eotf_125(x),
            Self::Bt2020InvOetf => BT2020_INV_OETF.eval(x),
            Self::Bt2020Oetf => BT2020_OETF.eval(x),
            Self::Gamma22 => GAMMA22.eval(x),
            Self::Gamma22Inv => GAMMA22_INV.eval(x),
        }
    }

    /// Upper end of the input range the curve is defined on.
    pub const fn input_range(self) -> f32 {
        match self {
            Self::Pq125InvEotf => pq::PQ_125_SCALE as f32,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hw_name())
    }
}

/// Kind-specific parameters.
#[derive(Debug, Clone, Copy)]
pub enum ColoropParams {
    /// Curve to select
    Curve(Curve),
    /// Entries sampled from the descriptor transform
    CustomLut1D,
    /// Matrix coefficients
    Ctm3x3(&'static Mat3),
    /// Matrix coefficients and offsets
    Ctm3x4(&'static Mat3x4),
    /// Multiplication factor
    Multiplier(f64),
    /// Cube contents and the hardware mode to request
    Lut3D {
        /// Cube, generated on first use
        lut: &'static LazyLock<LutResult<Lut3D>>,
        /// Mode the cube is uploaded with
        mode: Lut3dMode,
    },
}

impl ColoropParams {
    /// Kind implied by the parameters.
    pub const fn kind(&self) -> ColoropKind {
        match self {
            Self::Curve(_) => ColoropKind::EnumeratedCurve,
            Self::CustomLut1D => ColoropKind::CustomLut1D,
            Self::Ctm3x3(_) => ColoropKind::Ctm3x3,
            Self::Ctm3x4(_) => ColoropKind::Ctm3x4,
            Self::Multiplier(_) => ColoropKind::Multiplier,
            Self::Lut3D { .. } => ColoropKind::Lut3D,
        }
    }
}

/// One step of a desired color pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ColorOpDescriptor {
    /// Catalog name
    pub name: &'static str,
    /// Parameters to program
    pub params: ColoropParams,
    /// Software model of the step
    pub transform: PixelTransform,
    /// Hardware node chosen by the mapper
    pub bound: Option<ColoropId>,
}

impl ColorOpDescriptor {
    /// Creates an unbound descriptor.
    pub const fn new(name: &'static str, params: ColoropParams, transform: PixelTransform) -> Self {
        Self {
            name,
            params,
            transform,
            bound: None,
        }
    }

    /// Kind of this colorop.
    #[inline]
    pub const fn kind(&self) -> ColoropKind {
        self.params.kind()
    }

    /// Applies the software model to one pixel.
    #[inline]
    pub fn apply(&self, p: Pixel) -> Pixel {
        (self.transform)(p)
    }
}

impl fmt::Display for ColorOpDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bound {
            Some(id) => write!(f, "{} -> colorop {}", self.name, id),
            None => f.write_str(self.name),
        }
    }
}

/// Joins descriptor names with `,`.
pub fn op_names(ops: &[ColorOpDescriptor]) -> String {
    ops.iter().map(|op| op.name).collect::<Vec<_>>().join(",")
}

/// Clears the binding of every descriptor.
pub fn clear_bindings(ops: &mut [ColorOpDescriptor]) {
    for op in ops.iter_mut() {
        op.bound = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_names() {
        for c in Curve::ALL {
            assert_eq!(Curve::from_hw_name(c.hw_name()), Some(c));
        }
        assert_eq!(Curve::from_hw_name("srgb"), None);
    }

    #[test]
    fn test_kind_to_type() {
        assert_eq!(ColoropKind::EnumeratedCurve.hardware_type(), ColoropType::Curve1D);
        assert_eq!(ColoropKind::CustomLut1D.hardware_type(), ColoropType::Lut1D);
        assert_eq!(ColoropKind::Lut3D.hardware_type(), ColoropType::Lut3D);
    }

    #[test]
    fn test_pq_curve_range() {
        let y = Curve::Pq125Eotf.eval(1.0);
        assert!((y - 125.0).abs() < 1e-2);
        assert!((Curve::Pq125InvEotf.eval(y) - 1.0).abs() < 1e-4);
    }
}
