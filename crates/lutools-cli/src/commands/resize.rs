//! Resize command

use anyhow::{Context, Result, bail};
use lutools_core::{Engine, EventReceiver, resample};
use tracing::info;

use crate::ResizeArgs;

pub fn run(engine: &Engine, events: &mut EventReceiver, args: ResizeArgs) -> Result<()> {
    let image = super::load_image(&args.input)?;

    let (width, height) = match (args.size, args.fit) {
        (Some(size), _) => size,
        (None, Some((max_w, max_h))) => {
            resample::fit_dimensions(image.width(), image.height(), max_w, max_h)?
        }
        (None, None) => bail!("one of --size or --fit is required"),
    };

    let resized = engine
        .resize(&image, width, height)
        .context("Failed to resize")?;
    super::save_image(engine, &args.output, &resized)?;
    super::print_events(events);

    info!(
        "{}x{} -> {}x{}",
        image.width(),
        image.height(),
        resized.width(),
        resized.height()
    );
    Ok(())
}
