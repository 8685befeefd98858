use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    revenue_gateway::run().await
}
