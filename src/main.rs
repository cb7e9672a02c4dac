// src/main.rs

use otel_exec::{cli, run};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("otel-exec error: {err:?}");
            1
        }
    };
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    run(args).await
}
