//! SteamSesh host - composition root binary
//!
//! Wires the session coordinator to the loopback provider and drives it from
//! the keyboard.

mod config;
mod input;
mod notifier;
mod run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run::run().await
}
