//! Store order viewer
//!
//! Connects to a hub, follows one store's room and keeps its order list in
//! sync with the REST API. Prints every change.
//!
//! Run: QUIRE_STORE_ID=s-1 cargo run -p quire-client --example store_viewer

use quire_client::{
    ChannelConfig, ClientConfig, HttpClient, OrderSession, SessionUpdate, SyncChannel, TcpConnector,
};
use quire_pricing::PricingTables;
use shared::{FileSpec, PrintMode};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let api_url = env_or("QUIRE_API_URL", "http://localhost:8080");
    let hub_addr = env_or("QUIRE_HUB_ADDR", "127.0.0.1:8081");
    let store_id = env_or("QUIRE_STORE_ID", "s-1");

    println!("\n📄 Quire store viewer");
    println!("=====================");
    println!("API: {}  Hub: {}  Store: {}\n", api_url, hub_addr, store_id);

    let http = HttpClient::new(&ClientConfig::new(api_url))?;
    let mut session = OrderSession::new(http, store_id.as_str(), PricingTables::default());

    // Quote shown before anything is connected; pricing is local
    let sample = FileSpec {
        copies: 2,
        print_mode: PrintMode::Mixed,
        color_page_spec: "1,3,5-6".to_string(),
        page_count: Some(6),
        ..Default::default()
    };
    let quote = session.quote(std::slice::from_ref(&sample));
    println!("Sample quote (2 copies, color 1,3,5-6 of 6): {:.2}\n", quote.total);

    let channel = SyncChannel::connect(
        ChannelConfig::lan().with_client_name("store-viewer"),
        TcpConnector::new(hub_addr),
    );
    let mut notices = session.attach(&channel);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = session.follow(&mut notices) => {
                let Some(update) = update else { break };
                match update {
                    SessionUpdate::Applied(outcome) => println!("⚡ {:?}", outcome),
                    SessionUpdate::Resynced { orders } => println!("🔄 Resynced, {} orders", orders),
                    SessionUpdate::Degraded { error } => println!("⚠️  Degraded: {}", error.message),
                }
                for order in session.reconciler().orders() {
                    println!("   {}  {:<10}  {:>8.2}", order.id, order.status.as_str(), order.total_price);
                }
            }
        }
    }

    channel.shutdown();
    println!("\nBye");
    Ok(())
}
