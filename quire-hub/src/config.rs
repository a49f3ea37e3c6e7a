use std::time::Duration;

/// Hub 配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HUB_LISTEN_ADDR | 0.0.0.0:8081 | TCP 监听地址 |
/// | HUB_CHANNEL_CAPACITY | 1024 | 每个房间的广播缓冲大小 |
/// | HUB_HANDSHAKE_TIMEOUT_MS | 5000 | 握手超时(毫秒) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录，设置后按天滚动写文件 |
///
/// # 示例
///
/// ```ignore
/// HUB_LISTEN_ADDR=127.0.0.1:9000 LOG_LEVEL=debug cargo run -p quire-hub
/// ```
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// TCP 监听地址
    pub listen_addr: String,
    /// 房间广播通道容量，订阅者落后超过该值会收到 ordersInvalidated
    pub channel_capacity: usize,
    /// 等待客户端握手的最长时间
    pub handshake_timeout: Duration,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl HubConfig {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: std::env::var("HUB_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            channel_capacity: std::env::var("HUB_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|capacity: &usize| *capacity > 0)
                .unwrap_or(defaults.channel_capacity),
            handshake_timeout: std::env::var("HUB_HANDSHAKE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.handshake_timeout),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: std::env::var("LOG_DIR").ok().filter(|dir| !dir.is_empty()),
        }
    }

    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8081".to_string(),
            channel_capacity: 1024,
            handshake_timeout: Duration::from_secs(5),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}
