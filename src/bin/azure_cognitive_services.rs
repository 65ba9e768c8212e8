#![recursion_limit = "256"]

use costscraper::{cli::run_single, Job};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    run_single(Job::AzureCognitiveServices).await
}
