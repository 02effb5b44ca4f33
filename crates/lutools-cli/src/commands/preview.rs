//! Preview command

use anyhow::{Context, Result};
use lutools_core::{Engine, EventReceiver};
use tracing::info;

use crate::PreviewArgs;

pub fn run(engine: &Engine, events: &mut EventReceiver, args: PreviewArgs) -> Result<()> {
    let image = super::load_image(&args.input)?;
    let handles = super::load_luts(engine, &args.luts)?;
    let params = args.adjust.params();

    let preview = match args.size {
        Some((width, height)) => {
            engine.generate_preview_exact(&image, &handles, &params, width, height)
        }
        None => engine.generate_preview(&image, &handles, &params, args.max),
    }
    .context("Failed to generate preview")?;

    super::save_image(engine, &args.output, &preview)?;
    super::print_events(events);
    info!(
        "preview {}x{} written to {}",
        preview.width(),
        preview.height(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use lutools_core::{Lut3D, PixelBuffer};

    use super::*;
    use crate::{Cli, Commands};

    #[test]
    fn test_preview_prints_engine_events() {
        let dir = tempfile::tempdir().unwrap();
        let lut = dir.path().join("id.cube");
        Lut3D::identity(4).unwrap().save_cube(&lut, "id").unwrap();
        let input = dir.path().join("in.png");
        PixelBuffer::filled(16, 8, [10, 20, 30])
            .unwrap()
            .save(&input, 95)
            .unwrap();
        let output = dir.path().join("out.png");

        let argv: Vec<String> = vec![
            "lutools".into(),
            "preview".into(),
            input.display().to_string(),
            "-o".into(),
            output.display().to_string(),
            "-l".into(),
            lut.display().to_string(),
            "--max".into(),
            "8x8".into(),
        ];
        let Commands::Preview(args) = Cli::try_parse_from(argv).unwrap().command else {
            panic!("expected preview");
        };

        let engine = Engine::default();
        let mut events = engine.subscribe();
        engine.init();
        run(&engine, &mut events, args).unwrap();

        assert_eq!(PixelBuffer::load(&output).unwrap().dimensions(), (8, 4));
        // "loaded LUT" and the rest were written to the terminal.
        assert!(events.try_recv().is_none());
    }
}
