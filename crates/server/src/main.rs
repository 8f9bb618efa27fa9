#[tokio::main]
async fn main() -> anyhow::Result<()> {
    concierge_server::start().await
}
