use tracing::info;

use crate::cli::commands::CommandEntry;
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View or change persisted preferences",
        "config [show|set <key> <value>|reset]",
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() || args[0].eq_ignore_ascii_case("show") {
        show_config(context);
        return Ok(());
    }

    match args[0].to_lowercase().as_str() {
        "set" => {
            if args.len() < 3 {
                return Err(CommandError::InvalidArguments(
                    "usage: config set <key> <value>".into(),
                ));
            }
            let key = args[1].to_lowercase();
            let value = args[2..].join(" ");
            context.config.set(&key, &value)?;
            context.persist_config()?;
            info!("setting `{}` updated", key);
            io::print_success(format!("`{}` updated.", key));
            if context.table.is_some() {
                io::print_hint("Run `recalc` to apply the change to the open sheet.");
            }
            Ok(())
        }
        "reset" => {
            let last = context.config.last_opened_sheet.take();
            context.config = Default::default();
            context.config.last_opened_sheet = last;
            context.persist_config()?;
            io::print_success("Preferences restored to defaults.");
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown config action `{}`",
            other
        ))),
    }
}

fn show_config(context: &ShellContext) {
    output_section("Preferences");
    for (key, value) in context.config.entries() {
        io::print_info(format!("  {:<20} {}", key, value));
    }
    io::print_info(format!(
        "  {:<20} {}",
        "file",
        context.config_manager.path().display()
    ));
}
