//! Software evaluation of a colorop list on one pixel

use crate::EvalArgs;
use anyhow::{Result, bail};
use colorop_core::{DrmFormat, Pixel};
use colorop_kms::catalog::descriptors;

pub fn run(args: EvalArgs, verbose: bool) -> Result<()> {
    let &[r, g, b] = args.pixel.as_slice() else {
        bail!("--pixel takes exactly three values, got {}", args.pixel.len());
    };
    let format = DrmFormat::from_name(&args.format)?;
    let ops = descriptors(&args.ops)?;

    // Start from what the framebuffer can actually hold.
    let input = format.decode(format.encode(Pixel::new(r, g, b))?)?;
    let mut p = input;
    if verbose {
        println!("  {:<24} {:.6} {:.6} {:.6}", "input", p.r, p.g, p.b);
    }
    for op in &ops {
        p = op.apply(p);
        if verbose {
            println!("  {:<24} {:.6} {:.6} {:.6}", op.name, p.r, p.g, p.b);
        }
    }

    let raw = format.encode(p)?;
    let max = format.channel_max();
    println!("{:.6} {:.6} {:.6}", p.r, p.g, p.b);
    println!(
        "{} {:#010x} (r={} g={} b={} of {})",
        format,
        raw,
        format.component(raw, 2),
        format.component(raw, 1),
        format.component(raw, 0),
        max
    );
    Ok(())
}
