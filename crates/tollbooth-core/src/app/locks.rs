//! RunLocks - Run 単位の非同期ロック
//!
//! 同じ RunId への read-modify-write（unlock / process / purge）を直列化します。
//! 異なる RunId 同士は並行に進みます。

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::RunId;

/// RunId ごとの Mutex を遅延生成して配る
///
/// 表には Weak だけを置くので、誰もロックを持っていない RunId のエントリは
/// 次の acquire で掃除されます。
#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    table: Arc<Mutex<HashMap<RunId, Weak<Mutex<()>>>>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: RunId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().await;
            table.retain(|_, weak| weak.strong_count() > 0);
            match table.get(&id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    table.insert(id, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// 生きているエントリ数
    #[cfg(test)]
    async fn live_entries(&self) -> usize {
        let table = self.table.lock().await;
        table.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
