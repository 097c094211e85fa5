mod api;
mod booth;
mod commands;
mod config;
mod error;
mod handlers;
mod models;
mod session;
mod tasks;
mod voting;

use std::sync::Arc;

use api::HttpApi;
use config::Config;
use handlers::{App, Reply, error_reply};
use log::{error, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let api = match HttpApi::new(&config) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            error!("Failed to initialize API client: {}", e);
            return;
        }
    };
    info!("Using backend at {}", config.api_url);

    let mut app = App::new(Arc::clone(&api)).with_progress(|line| println!("{line}"));
    app.initialize().await;

    if !config.watch_interval.is_zero() {
        let watcher_api = Arc::clone(&api);
        let every = config.watch_interval;
        tokio::spawn(async move {
            tasks::status_watch::watch_election_status(watcher_api, every).await;
        });
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Campus ballot. Type `help` for commands.");

    loop {
        if let Err(e) = write_prompt(&mut stdout, &app.prompt()).await {
            error!("Failed to write prompt: {}", e);
            break;
        }
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let result = match commands::parse_command(&line) {
            Ok(command) => app.handle(command).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(Reply::Text(text)) if text.is_empty() => {}
            Ok(Reply::Text(text)) => println!("{text}"),
            Ok(Reply::Quit) => break,
            Err(e) => println!("{}", error_reply(&e, &line)),
        }
    }
    info!("Goodbye");
}

async fn write_prompt(stdout: &mut tokio::io::Stdout, prompt: &str) -> std::io::Result<()> {
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await
}
