#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nfe_reconcile_cli::run(std::env::args()).await
}
