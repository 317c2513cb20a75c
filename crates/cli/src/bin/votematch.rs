use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    votematch_cli::main_entry().await
}
