use anyhow::Context;
use quire_hub::{RoomBus, setup_environment};
use shared::message::PROTOCOL_VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志) 并加载配置
    let config = setup_environment();

    tracing::info!(
        "Quire hub v{} starting (protocol v{})",
        env!("CARGO_PKG_VERSION"),
        PROTOCOL_VERSION
    );

    // 2. Ctrl-C 触发优雅关闭
    let bus = RoomBus::from_config(config);
    let signal_bus = bus.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_bus.shutdown();
        }
    });

    // 3. 启动 TCP 服务
    bus.run().await.context("room hub stopped")?;

    tracing::info!("Quire hub stopped");
    Ok(())
}
