use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    admission_gateway::cli::run().await
}
