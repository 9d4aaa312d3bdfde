//! Binary entrypoint for escli.

use std::process;

#[tokio::main]
async fn main() {
    let code = escli_cli::run().await;
    process::exit(code);
}
