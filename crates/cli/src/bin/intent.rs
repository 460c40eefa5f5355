use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    intent_cli::main_entry().await
}
