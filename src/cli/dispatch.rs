use anyhow::Result;

use super::check::cmd_check;
use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::records::{cmd_mappings, cmd_rules};
use super::serve::cmd_serve;
use super::validate::cmd_validate;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Serve(args) => cmd_serve(args, ctx).await,
        Commands::Check(args) => cmd_check(args, ctx, cli.output).await,
        Commands::Rules(args) => cmd_rules(args, ctx, cli.output).await,
        Commands::Mappings(args) => cmd_mappings(args, ctx, cli.output).await,
        Commands::Validate => cmd_validate(ctx, cli.output),
    }
}
