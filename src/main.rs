// src/main.rs

use quickscope::errors::QuickscopeError;
use quickscope::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(()) => {}
        // `--once`: mirror the command's own exit status.
        Err(QuickscopeError::RunFailed(code)) => std::process::exit(if code == 0 { 1 } else { code }),
        Err(err) => {
            eprintln!("quickscope error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> quickscope::errors::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
