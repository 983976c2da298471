use admission_core_types::{AccessRule, UrlMapping};
use admission_store::Repository;
use anyhow::Result;
use clap::Args;

use super::context::CliContext;
use super::output::{print_structured, OutputFormat};

#[derive(Args, Clone)]
pub struct ListArgs {
    /// Include disabled records
    #[arg(long)]
    pub all: bool,
}

async fn load<E>(store: &dyn Repository<E>, all: bool) -> Result<Vec<E>>
where
    E: admission_store::Record,
{
    let records = if all {
        store.list_all().await?
    } else {
        store.list_enabled().await?
    };
    Ok(records)
}

pub async fn cmd_rules(args: ListArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let context = ctx.app_context().await?;
    let rules: Vec<AccessRule> = load(context.rule_store().as_ref(), args.all).await?;
    if print_structured(output, &rules)? {
        return Ok(());
    }

    println!("{} access rule(s), evaluation order:", rules.len());
    for rule in &rules {
        println!(
            "  #{:<4} p={:<5} {:<9} {}/{} '{}'  {}{}",
            rule.id,
            rule.priority,
            rule.rule_type,
            rule.match_type,
            rule.match_pattern,
            rule.match_value,
            rule.rule_name,
            if rule.enabled { "" } else { " (disabled)" }
        );
    }
    Ok(())
}

pub async fn cmd_mappings(args: ListArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let context = ctx.app_context().await?;
    let mappings: Vec<UrlMapping> = load(context.mapping_store().as_ref(), args.all).await?;
    if print_structured(output, &mappings)? {
        return Ok(());
    }

    println!("{} url mapping(s), resolution order:", mappings.len());
    for mapping in &mappings {
        println!(
            "  #{:<4} p={:<5} {} -> {} [{}] {} '{}'{}",
            mapping.id,
            mapping.priority,
            mapping.external_path,
            mapping.internal_path,
            mapping.target_service,
            mapping.mapping_type,
            mapping.mapping_name,
            if mapping.enabled { "" } else { " (disabled)" }
        );
    }
    Ok(())
}
