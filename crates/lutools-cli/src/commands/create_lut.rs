//! LUT creation command

use anyhow::{Context, Result};
use lutools_core::{Engine, EventReceiver};
use tracing::info;

use crate::CreateLutArgs;

pub fn run(engine: &Engine, events: &mut EventReceiver, args: CreateLutArgs) -> Result<()> {
    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create: {}", dir.display()))?;
    }

    let written = super::with_events(engine, events, |engine| {
        engine.create_lut_from_images(&args.before, &args.after, &args.output, &args.sizes)
    })
    .context("Failed to create LUT")?;

    for path in written {
        info!("wrote {}", path.display());
    }
    Ok(())
}
