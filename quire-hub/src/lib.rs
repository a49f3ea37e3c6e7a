//! Quire Hub - room-scoped event relay for the order sync channel
//!
//! Clients handshake, join the room of their store, and receive every event
//! published to that room. Publishers send `Event` frames over the same
//! connection, or call [`RoomBus::publish`] in process.
//!
//! ```text
//! quire-hub/src/
//! ├── bus.rs         # 房间注册表与广播
//! ├── tcp_server.rs  # accept 循环、握手、客户端会话
//! ├── transport.rs   # TCP / Memory 传输
//! ├── config.rs      # 环境变量配置
//! ├── error.rs
//! └── logger.rs
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod logger;
pub mod tcp_server;
pub mod transport;

pub use bus::{ConnectedClient, RoomBus};
pub use config::HubConfig;
pub use error::{HubError, HubResult};
pub use logger::{init_logger, init_logger_with_file};
pub use transport::{MemoryTransport, TcpTransport, Transport};

/// Load `.env`, then initialize logging from the environment
pub fn setup_environment() -> HubConfig {
    dotenv::dotenv().ok();
    let config = HubConfig::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    config
}
