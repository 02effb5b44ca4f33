//! LUT information command

use anyhow::{Context, Result};
use lutools_core::{Engine, EventReceiver};

use crate::InfoArgs;

pub fn run(engine: &Engine, events: &mut EventReceiver, args: InfoArgs) -> Result<()> {
    for path in &args.luts {
        let handle = engine
            .load_lut(path, 1.0)
            .with_context(|| format!("Failed to load LUT: {}", path.display()))?;
        let info = engine.lut_info(handle)?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        engine.unload_lut(handle)?;
        super::print_events(events);
    }
    Ok(())
}
