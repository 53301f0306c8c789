// ==========================================
// 涂料色号目录 - 导入状态仓储
// ==========================================
// 表: import_state（单例行 id = 'singleton'）
// 规则: 标记单调，只会 false → true
// ==========================================

use crate::domain::{ImportState, ImportStatus, TableKind, IMPORT_STATE_ID};
use crate::repository::error::RepositoryResult;
use crate::repository::unit_of_work::UnitOfWork;
use rusqlite::{params, OptionalExtension};

impl<'a> UnitOfWork<'a> {
    /// 读取持久化的导入状态（单例行不存在时为 None）
    pub fn read_import_state(&self) -> RepositoryResult<Option<ImportState>> {
        let state = self
            .conn
            .query_row(
                "SELECT brands_done, colors_done, components_done FROM import_state WHERE id = ?1",
                params![IMPORT_STATE_ID],
                |row| {
                    Ok(ImportState {
                        brands_done: row.get(0)?,
                        colors_done: row.get(1)?,
                        components_done: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    /// 写入导入状态（UPSERT 单例行）
    pub fn write_import_state(&self, state: &ImportState) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO import_state (id, brands_done, colors_done, components_done)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                brands_done = excluded.brands_done,
                colors_done = excluded.colors_done,
                components_done = excluded.components_done
            "#,
            params![
                IMPORT_STATE_ID,
                state.brands_done,
                state.colors_done,
                state.components_done
            ],
        )?;
        Ok(())
    }

    /// 标记某阶段完成（已完成的其他阶段保持不变）
    pub fn mark_stage_done(&self, kind: TableKind) -> RepositoryResult<ImportState> {
        let mut state = self.read_import_state()?.unwrap_or_default();
        match kind {
            TableKind::Brands => state.brands_done = true,
            TableKind::Colors => state.colors_done = true,
            TableKind::Components => state.components_done = true,
        }
        self.write_import_state(&state)?;
        Ok(state)
    }

    /// 只读快照：按记录数补推标记，但不落库
    pub fn peek_import_status(&self) -> RepositoryResult<ImportStatus> {
        let counts = self.catalog_counts()?;
        let state = self
            .read_import_state()?
            .unwrap_or_default()
            .merged_with_counts(&counts);
        Ok(ImportStatus { state, counts })
    }

    /// 导入状态查询：按记录数补推标记，变化时（或单例行缺失时）落库
    pub fn import_status(&self) -> RepositoryResult<ImportStatus> {
        let existing = self.read_import_state()?;
        let counts = self.catalog_counts()?;
        let next = existing.unwrap_or_default().merged_with_counts(&counts);

        if existing != Some(next) {
            self.write_import_state(&next)?;
        }

        Ok(ImportStatus {
            state: next,
            counts,
        })
    }
}
