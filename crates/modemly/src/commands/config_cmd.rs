//! Config command handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = config::active_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let resolved = config::load(global)?.redacted();
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => resolved.to_toml()?,
                _ => output::render_single(&global.output, &resolved, |_| String::new()),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
