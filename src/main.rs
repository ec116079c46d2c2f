//! hotmark CLI entry point.

use hotmark::cli::{self, Cli};
use hotmark::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    cli::execute(cli).await
}
