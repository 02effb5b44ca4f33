//! Full-resolution grading command

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use lutools_core::{Engine, EventReceiver};
use tracing::info;

use crate::ApplyArgs;

pub fn run(engine: &Engine, events: &mut EventReceiver, args: ApplyArgs) -> Result<()> {
    let handles = super::load_luts(engine, &args.luts)?;
    let params = args.adjust.params();

    match (&args.output, &args.out_dir) {
        (Some(output), None) => {
            let [input] = args.inputs.as_slice() else {
                bail!("--output takes a single input; use --out-dir for several");
            };
            super::with_events(engine, events, |engine| {
                engine.process_file(input, output, &handles, &params)
            })
            .with_context(|| format!("Failed to process: {}", input.display()))?;
            info!("wrote {}", output.display());
        }
        (None, Some(out_dir)) => {
            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("Failed to create: {}", out_dir.display()))?;
            let jobs = args
                .inputs
                .iter()
                .map(|input| {
                    let name = input
                        .file_name()
                        .with_context(|| format!("Not a file: {}", input.display()))?;
                    Ok((input.clone(), out_dir.join(name)))
                })
                .collect::<Result<Vec<(PathBuf, PathBuf)>>>()?;

            let summary = super::with_events(engine, events, |engine| {
                engine.process_files(&jobs, &handles, &params)
            })?;
            info!(
                "{} written, {} failed",
                summary.succeeded.len(),
                summary.failed.len()
            );
            if !summary.failed.is_empty() {
                bail!("{} of {} file(s) failed", summary.failed.len(), jobs.len());
            }
        }
        _ => bail!("one of --output or --out-dir is required"),
    }

    Ok(())
}
