//! Catalog and pipeline listing

use crate::ListArgs;
use anyhow::Result;
use colorop_kms::catalog::catalog;
use colorop_kms::mapper::chain_kinds;
use colorop_kms::{DisplayControl, PipelineGraph};

pub fn run(args: ListArgs) -> Result<()> {
    let plan = super::load_plan(args.config.as_deref())?;

    println!("Colorops:");
    for op in catalog() {
        println!("  {:<24} {}", op.name, op.kind().hardware_type());
    }

    println!("\nTests ({}):", plan.tests.len());
    for test in &plan.tests {
        println!("  {:<48} [{}]", test.name, test.colorops.join(", "));
    }

    if args.pipelines {
        let display = plan.virtual_display()?;
        let plane = display.primary_plane();
        println!("\nPipelines on plane {} ({}):", plane, display.driver_name());
        let graph = PipelineGraph::discover(&display, plane)?;
        for &head in graph.heads() {
            let kinds: Vec<String> = chain_kinds(&graph, head).iter().map(|k| k.to_string()).collect();
            println!("  {:>4}: {}", head.0, kinds.join(" -> "));
        }
    }
    Ok(())
}
