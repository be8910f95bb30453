//! cerberusctl - run binaries through the Cerberus analysis engine.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cerberus_cli::run().await
}
