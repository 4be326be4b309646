use tokio::sync::broadcast;
use tracing::{debug, info};

/// 优雅关闭信号广播器
///
/// 持有唯一的发送端，shutdown() 向所有已订阅的任务广播一次关闭信号
pub struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self { shutdown_tx }
    }

    /// 订阅关闭信号，必须在 shutdown() 之前完成订阅
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// 触发关闭，没有订阅者时静默忽略
    pub fn shutdown(&self) {
        info!("触发系统关闭");
        let subscriber_count = self.shutdown_tx.receiver_count();
        debug!("发送关闭信号给 {} 个订阅者", subscriber_count);
        let _ = self.shutdown_tx.send(());
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
