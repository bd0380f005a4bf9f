use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 参与记录实体
/// - 一张票在同一抽奖内至多一条记录 (数据库唯一索引约束)
/// - user_id 冗余存储票主，用于公平性配额统计
/// - 只读历史记录：创建后仅开奖时写一次 is_winner，从不删除
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "participations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub raffle_id: i64,
    pub ticket_id: i64,
    pub user_id: i64,
    pub is_active: bool,
    pub is_winner: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
