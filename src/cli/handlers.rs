use tokio::runtime::Runtime;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::http;
use crate::storage::open_backend_for_reading;

fn runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

pub fn handle_serve(config: ServerConfig) -> Result<()> {
    runtime()?.block_on(http::serve(config))
}

pub fn handle_list(config: ServerConfig, json: bool) -> Result<()> {
    let backend = open_backend_for_reading(&config)?;
    let entries = runtime()?.block_on(backend.list())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }

    for entry in &entries {
        let mood = if entry.mood.is_empty() {
            String::new()
        } else {
            format!(" [{}]", entry.mood)
        };
        println!(
            "{} {} - {}{}",
            entry.date.format("%Y-%m-%d"),
            entry.id,
            entry.title,
            mood
        );
    }

    Ok(())
}
