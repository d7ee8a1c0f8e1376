//! Echo round trip through the connection controller.
//!
//! Demonstrates:
//! - Building a controller with an event channel
//! - Starting the client and connecting in the background
//! - Sending text and binary messages
//! - Closing the session and the client
//!
//! Usage:
//!   cargo run --example 001_echo
//!   cargo run --example 001_echo -- --debug
//!   cargo run --example 001_echo -- --url wss://echo.example.com/

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use websocket_adapter::{ConnectionController, ConnectionEvent, EventChannel, Result};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Echo ===\n");

    let url = match args.url {
        Some(url) => url,
        None => common::spawn_echo_server().await?,
    };

    // ========================================================================
    // Create Controller
    // ========================================================================

    println!("[1] Building controller...");
    let (events, mut rx) = EventChannel::new();
    let controller = ConnectionController::builder()
        .max_text_message_size(64 * 1024)
        .dispatcher(events)
        .build()?;
    controller.start()?;
    println!("    ✓ Client started\n");

    // ========================================================================
    // Connect and Exchange
    // ========================================================================

    println!("[2] Connecting to {url}...");
    controller.connect(&url)?;

    let mut echoes = 0;
    while let Some(event) = rx.recv().await {
        match &event {
            ConnectionEvent::Connecting => println!("    … connecting"),
            ConnectionEvent::Connected => {
                println!("    ✓ Connected\n");
                println!("[3] Sending messages...");
                controller.send("hello")?;
                controller.send(vec![0xCA, 0xFE])?;
            }
            ConnectionEvent::Text { body } => {
                println!("    ✓ Text echo: {body}");
                echoes += 1;
            }
            ConnectionEvent::Binary { .. } => {
                println!("    ✓ Binary echo: {:02x?}", event.payload().unwrap_or_default());
                echoes += 1;
            }
            ConnectionEvent::Closed { code, reason } => {
                println!("    ✓ Closed ({code}) {reason}\n");
                break;
            }
            ConnectionEvent::Error { cause } => {
                println!("    ✗ Error: {cause}\n");
                break;
            }
        }

        if echoes == 2 {
            println!("\n[4] Closing session...");
            controller.close_outgoing_session();
            echoes = 0;
        }
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    println!("[5] Closing client...");
    controller.close_client()?;
    println!("    ✓ Done");

    Ok(())
}
