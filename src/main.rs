#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ledger_books_api::cli::run_with_sys_args().await
}
