use clap::Subcommand;

use super::check::CheckArgs;
use super::records::ListArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the admission pipeline and admin surface
    Serve(ServeArgs),

    /// Evaluate one request offline and print the decision and rewrite
    Check(CheckArgs),

    /// List access rules from the configured store
    Rules(ListArgs),

    /// List url mappings from the configured store
    Mappings(ListArgs),

    /// Validate the configuration and print the effective settings
    Validate,
}
