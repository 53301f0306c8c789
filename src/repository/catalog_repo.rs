// ==========================================
// 涂料色号目录 - 目录仓储
// ==========================================
// 职责: 持有共享连接，划定读 / 写事务边界，向调用方提供 UnitOfWork
// 事务: BEGIN IMMEDIATE（查找后写入的序列在整个事务内持有写锁）
// ==========================================

use crate::db::{configure_sqlite_connection, open_and_init};
use crate::perf::install_sqlite_tracing;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::unit_of_work::UnitOfWork;
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
    /// 打开数据库文件并确保表结构存在
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let mut conn = open_and_init(db_path)?;
        install_sqlite_tracing(&mut conn);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 共享连接（供同库的其他组件复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在普通连接上执行只读操作
    pub fn with_read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let conn = self.get_conn()?;
        let uow = UnitOfWork::new(&conn);
        f(&uow)
    }

    /// 在 IMMEDIATE 事务内执行；闭包返回 Err 时整体回滚
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&UnitOfWork<'_>) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let result = {
            let uow = UnitOfWork::new(&tx);
            f(&uow)
        };

        match result {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "事务回滚失败");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let repo = CatalogRepository::new(":memory:").unwrap();

        let result: RepositoryResult<()> = repo.with_transaction(|uow| {
            uow.insert_brand("acme", "Acme")?;
            Err(RepositoryError::DatabaseTransactionError("abort".to_string()))
        });
        assert!(result.is_err());

        let counts = repo.with_read(|uow| uow.catalog_counts()).unwrap();
        assert_eq!(counts.brands, 0);
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let repo = CatalogRepository::new(":memory:").unwrap();

        let brand = repo
            .with_transaction(|uow| uow.insert_brand("acme", "Acme"))
            .unwrap();

        let loaded = repo.with_read(|uow| uow.find_brand_by_slug("acme")).unwrap();
        assert_eq!(loaded, Some(brand));
    }
}
