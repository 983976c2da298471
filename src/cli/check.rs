use admission_core_types::RequestAttributes;
use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::context::CliContext;
use super::output::{print_structured, OutputFormat};

#[derive(Args, Clone)]
pub struct CheckArgs {
    /// Request path as received by the gateway
    pub path: String,

    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Client address
    #[arg(long, default_value = "unknown")]
    pub client_ip: String,

    /// Authenticated user id
    #[arg(long)]
    pub user: Option<String>,
}

pub async fn cmd_check(args: CheckArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let context = ctx.app_context().await?;
    let mut request = RequestAttributes::new(args.method.clone(), args.path.clone())
        .with_client_ip(args.client_ip.clone());
    request.user_id = args.user.clone();

    let decision = context.access().evaluate(&request).await;
    let rewrite = if decision.allowed {
        context.rewrite().apply(&args.path).await
    } else {
        None
    };

    let report = json!({
        "request": request,
        "decision": decision,
        "error_code": decision.error_code().map(|code| code.0),
        "rewrite": rewrite,
    });
    if print_structured(output, &report)? {
        return Ok(());
    }

    println!("{} {} from {}", args.method, args.path, args.client_ip);
    let verdict = if decision.allowed { "ALLOW" } else { "DENY" };
    match decision.rule_name() {
        Some(rule) => println!("  access   {verdict} ({}, rule '{rule}')", decision.verdict()),
        None => println!("  access   {verdict} ({})", decision.verdict()),
    }
    if let Some(code) = decision.error_code() {
        println!("  code     {}", code.0);
    }
    println!("  rules    {} evaluated", decision.rules_evaluated);
    match rewrite {
        Some(result) if result.changed => println!(
            "  rewrite  {} -> {} [{}] via '{}'",
            result.original_path, result.rewritten_path, result.target_service, result.mapping_name
        ),
        Some(result) => println!(
            "  rewrite  unchanged [{}] via '{}'",
            result.target_service, result.mapping_name
        ),
        None if decision.allowed => println!("  rewrite  no mapping"),
        None => {}
    }
    Ok(())
}
