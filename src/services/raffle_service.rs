use crate::config::RaffleConfig;
use crate::entities::{
    RaffleStatus, TicketStatus, participation_entity as participations,
    raffle_entity as raffles, ticket_entity as tickets,
};
use crate::error::{AppError, AppResult};
use crate::external::Notifier;
use crate::models::{CreateRaffleRequest, RaffleProgressResponse, RaffleResponse};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};

/// 状态机纯决策函数：给定 (当前行, 有效参与数, now) 推导下一个状态。
/// 返回 None 表示无需变更（幂等，可重复调用）。
pub fn next_status(
    raffle: &raffles::Model,
    active_count: i64,
    now: DateTime<Utc>,
) -> Option<RaffleStatus> {
    // drawn_at 一经写入即视为终局，即便状态列尚未收敛也不再推进
    if raffle.is_terminal() || raffle.is_drawn() {
        return None;
    }
    // 到期且无中奖者：无赢家终局关闭（与开奖完成的 finished 不同支）
    if raffle.is_expired(now) {
        return Some(RaffleStatus::Finished);
    }
    match raffle.status {
        RaffleStatus::Published => {
            let started = raffle.starts_at.is_none_or(|s| s <= now);
            started.then_some(RaffleStatus::Active)
        }
        RaffleStatus::Active => {
            (active_count >= raffle.max_participants as i64).then_some(RaffleStatus::ReadyToDraw)
        }
        // draft 由管理端显式 publish；ready_to_draw -> finished 只经由开奖
        _ => None,
    }
}

/// 满员转入 ready_to_draw 时的自动排期时间。
pub fn scheduled_draw_at(
    existing: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    grace_minutes: i64,
) -> DateTime<Utc> {
    existing.unwrap_or(now + Duration::minutes(grace_minutes))
}

/// 某抽奖当前有效参与数（事务内外均可调用）。
pub async fn count_active_participations<C: ConnectionTrait>(
    conn: &C,
    raffle_id: i64,
) -> Result<i64, DbErr> {
    let n = participations::Entity::find()
        .filter(participations::Column::RaffleId.eq(raffle_id))
        .filter(participations::Column::IsActive.eq(true))
        .count(conn)
        .await?;
    Ok(n as i64)
}

/// 某用户在某抽奖内的有效参与数（公平性配额统计）。
pub async fn count_active_participations_for_user<C: ConnectionTrait>(
    conn: &C,
    raffle_id: i64,
    user_id: i64,
) -> Result<i64, DbErr> {
    let n = participations::Entity::find()
        .filter(participations::Column::RaffleId.eq(raffle_id))
        .filter(participations::Column::UserId.eq(user_id))
        .filter(participations::Column::IsActive.eq(true))
        .count(conn)
        .await?;
    Ok(n as i64)
}

#[derive(Clone)]
pub struct RaffleService {
    pool: DatabaseConnection,
    config: RaffleConfig,
    notifier: Notifier,
}

impl RaffleService {
    pub fn new(pool: DatabaseConnection, config: RaffleConfig, notifier: Notifier) -> Self {
        Self {
            pool,
            config,
            notifier,
        }
    }

    /// 创建抽奖（管理端）。publish = true 直接进入 published。
    pub async fn create_raffle(
        &self,
        owner_id: i64,
        req: &CreateRaffleRequest,
    ) -> AppResult<RaffleResponse> {
        if req.title.trim().is_empty() {
            return Err(AppError::ValidationError("title must not be empty".into()));
        }
        if req.max_participants <= 0 {
            return Err(AppError::ValidationError(
                "max_participants must be a positive integer".into(),
            ));
        }
        if let (Some(starts), Some(ends)) = (req.starts_at, req.ends_at)
            && ends <= starts
        {
            return Err(AppError::ValidationError(
                "ends_at must be after starts_at".into(),
            ));
        }

        let status = if req.publish {
            RaffleStatus::Published
        } else {
            RaffleStatus::Draft
        };

        let model = raffles::ActiveModel {
            title: Set(req.title.trim().to_string()),
            owner_id: Set(owner_id),
            status: Set(status),
            max_participants: Set(req.max_participants),
            starts_at: Set(req.starts_at),
            ends_at: Set(req.ends_at),
            draw_at: Set(req.draw_at),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(model.into())
    }

    /// draft -> published（重复调用幂等）。
    pub async fn publish_raffle(&self, raffle_id: i64) -> AppResult<RaffleResponse> {
        let raffle = self.find_raffle(raffle_id).await?;
        match raffle.status {
            RaffleStatus::Published => Ok(raffle.into()),
            RaffleStatus::Draft => {
                let mut am = raffle.into_active_model();
                am.status = Set(RaffleStatus::Published);
                am.updated_at = Set(Some(Utc::now()));
                let updated = am.update(&self.pool).await?;
                Ok(updated.into())
            }
            other => Err(AppError::RaffleLockedOrClosed(format!(
                "cannot publish a raffle in status {other}"
            ))),
        }
    }

    /// 管理端取消：终态，之后不再接受任何参与。
    pub async fn cancel_raffle(&self, raffle_id: i64) -> AppResult<RaffleResponse> {
        let raffle = self.find_raffle(raffle_id).await?;
        match raffle.status {
            RaffleStatus::Cancelled => Ok(raffle.into()),
            RaffleStatus::Finished => Err(AppError::RaffleLockedOrClosed(
                "a finished raffle cannot be cancelled".into(),
            )),
            _ => {
                let mut am = raffle.into_active_model();
                am.status = Set(RaffleStatus::Cancelled);
                am.updated_at = Set(Some(Utc::now()));
                let updated = am.update(&self.pool).await?;
                Ok(updated.into())
            }
        }
    }

    /// 抽奖进度：状态 / 参与数 / 容量 / 开奖时间。
    pub async fn get_progress(&self, raffle_id: i64) -> AppResult<RaffleProgressResponse> {
        let raffle = self.find_raffle(raffle_id).await?;
        let participant_count = count_active_participations(&self.pool, raffle_id).await?;
        Ok(RaffleProgressResponse {
            status: raffle.status,
            participant_count,
            capacity: raffle.max_participants,
            draw_at: raffle.draw_at,
        })
    }

    /// 对单个抽奖反复应用状态机直到稳定（published -> active -> ready_to_draw 可在一次调用内串联）。
    pub async fn apply_transitions(&self, raffle_id: i64) -> AppResult<RaffleStatus> {
        loop {
            let raffle = self.find_raffle(raffle_id).await?;
            let active_count = count_active_participations(&self.pool, raffle_id).await?;
            let now = Utc::now();

            let Some(target) = next_status(&raffle, active_count, now) else {
                return Ok(raffle.status);
            };

            // 写入以读到的旧状态 + drawn_at IS NULL 为守卫：并发开奖或取消
            // 抢先提交时 rows_affected 为 0，重读后重新决策，绝不覆盖终局行
            match target {
                RaffleStatus::Finished => {
                    self.close_expired(&raffle).await?;
                }
                RaffleStatus::ReadyToDraw => {
                    let draw_at =
                        scheduled_draw_at(raffle.draw_at, now, self.config.draw_grace_minutes);
                    let res = raffles::Entity::update_many()
                        .col_expr(
                            raffles::Column::Status,
                            RaffleStatus::ReadyToDraw.as_enum(),
                        )
                        .col_expr(raffles::Column::DrawAt, Expr::value(draw_at))
                        .col_expr(raffles::Column::UpdatedAt, Expr::value(now))
                        .filter(raffles::Column::Id.eq(raffle.id))
                        .filter(raffles::Column::Status.eq(RaffleStatus::Active))
                        .filter(raffles::Column::DrawnAt.is_null())
                        .exec(&self.pool)
                        .await?;
                    if res.rows_affected == 0 {
                        continue;
                    }
                }
                other => {
                    let res = raffles::Entity::update_many()
                        .col_expr(raffles::Column::Status, other.as_enum())
                        .col_expr(raffles::Column::UpdatedAt, Expr::value(now))
                        .filter(raffles::Column::Id.eq(raffle.id))
                        .filter(raffles::Column::Status.eq(raffle.status))
                        .filter(raffles::Column::DrawnAt.is_null())
                        .exec(&self.pool)
                        .await?;
                    if res.rows_affected == 0 {
                        continue;
                    }
                }
            }
        }
    }

    /// 周期扫描：对所有未终局的抽奖应用状态机，逐个隔离失败。
    pub async fn sweep_transitions(&self) -> AppResult<usize> {
        let open = raffles::Entity::find()
            .filter(raffles::Column::Status.is_in([
                RaffleStatus::Published,
                RaffleStatus::Active,
                RaffleStatus::ReadyToDraw,
            ]))
            .all(&self.pool)
            .await?;

        let mut changed = 0;
        for raffle in open {
            let before = raffle.status;
            match self.apply_transitions(raffle.id).await {
                Ok(after) if after != before => {
                    log::info!("Raffle {} transitioned {before} -> {after}", raffle.id);
                    changed += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("Failed to apply transitions to raffle {}: {e}", raffle.id);
                }
            }
        }
        Ok(changed)
    }

    /// 到期无赢家关闭：drawn_at/winner 保持为空，有效参与的票置为 lost。
    /// 守卫条件保证与并发开奖互斥（已 finished 的行不会被重复关闭）。
    async fn close_expired(&self, raffle: &raffles::Model) -> AppResult<()> {
        let txn = self.pool.begin().await?;

        let res = raffles::Entity::update_many()
            .col_expr(
                raffles::Column::Status,
                RaffleStatus::Finished.as_enum(),
            )
            .col_expr(raffles::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(raffles::Column::Id.eq(raffle.id))
            .filter(raffles::Column::DrawnAt.is_null())
            .filter(raffles::Column::Status.ne(RaffleStatus::Finished))
            .exec(&txn)
            .await?;

        if res.rows_affected == 0 {
            // 已被并发开奖或关闭
            txn.commit().await?;
            return Ok(());
        }

        let parts = participations::Entity::find()
            .filter(participations::Column::RaffleId.eq(raffle.id))
            .filter(participations::Column::IsActive.eq(true))
            .all(&txn)
            .await?;
        let ticket_ids: Vec<i64> = parts.iter().map(|p| p.ticket_id).collect();

        if !ticket_ids.is_empty() {
            tickets::Entity::update_many()
                .col_expr(tickets::Column::Status, TicketStatus::Lost.as_enum())
                .col_expr(tickets::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(tickets::Column::Id.is_in(ticket_ids))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        log::info!(
            "Raffle {} expired without a winner ({} participation(s))",
            raffle.id,
            parts.len()
        );
        self.notifier.raffle_expired(raffle.id).await;
        Ok(())
    }

    async fn find_raffle(&self, raffle_id: i64) -> AppResult<raffles::Model> {
        raffles::Entity::find_by_id(raffle_id)
            .one(&self.pool)
            .await?
            .ok_or(AppError::RaffleNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raffle(status: RaffleStatus, max: i32) -> raffles::Model {
        raffles::Model {
            id: 1,
            title: "test".to_string(),
            owner_id: 1,
            status,
            max_participants: max,
            starts_at: None,
            ends_at: None,
            draw_at: None,
            drawn_at: None,
            winner_participation_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_published_activates_when_unscheduled() {
        let r = raffle(RaffleStatus::Published, 10);
        assert_eq!(next_status(&r, 0, Utc::now()), Some(RaffleStatus::Active));
    }

    #[test]
    fn test_published_waits_for_starts_at() {
        let now = Utc::now();
        let mut r = raffle(RaffleStatus::Published, 10);
        r.starts_at = Some(now + Duration::hours(1));
        assert_eq!(next_status(&r, 0, now), None);

        r.starts_at = Some(now - Duration::hours(1));
        assert_eq!(next_status(&r, 0, now), Some(RaffleStatus::Active));
    }

    #[test]
    fn test_active_promotes_at_capacity() {
        let r = raffle(RaffleStatus::Active, 2);
        assert_eq!(next_status(&r, 1, Utc::now()), None);
        assert_eq!(
            next_status(&r, 2, Utc::now()),
            Some(RaffleStatus::ReadyToDraw)
        );
    }

    #[test]
    fn test_expiry_closes_any_open_state() {
        let now = Utc::now();
        for status in [
            RaffleStatus::Published,
            RaffleStatus::Active,
            RaffleStatus::ReadyToDraw,
        ] {
            let mut r = raffle(status, 10);
            r.ends_at = Some(now - Duration::minutes(1));
            assert_eq!(next_status(&r, 5, now), Some(RaffleStatus::Finished));
        }
    }

    #[test]
    fn test_drawn_raffle_is_never_repromoted() {
        // 状态列与 drawn_at 短暂不一致（并发开奖提交后）时也不得再推进
        let now = Utc::now();
        let mut r = raffle(RaffleStatus::Active, 2);
        r.drawn_at = Some(now - Duration::seconds(1));
        r.winner_participation_id = Some(3);
        assert_eq!(next_status(&r, 2, now), None);
    }

    #[test]
    fn test_drawn_raffle_is_not_reclosed_by_expiry() {
        let now = Utc::now();
        let mut r = raffle(RaffleStatus::Finished, 10);
        r.ends_at = Some(now - Duration::minutes(1));
        r.drawn_at = Some(now - Duration::minutes(5));
        r.winner_participation_id = Some(7);
        assert_eq!(next_status(&r, 10, now), None);
    }

    #[test]
    fn test_terminal_states_are_stable() {
        let now = Utc::now();
        assert_eq!(next_status(&raffle(RaffleStatus::Finished, 2), 2, now), None);
        assert_eq!(
            next_status(&raffle(RaffleStatus::Cancelled, 2), 2, now),
            None
        );
    }

    #[test]
    fn test_draft_requires_explicit_publish() {
        assert_eq!(next_status(&raffle(RaffleStatus::Draft, 2), 0, Utc::now()), None);
    }

    #[test]
    fn test_scheduled_draw_at_defaults_to_grace_window() {
        let now = Utc::now();
        assert_eq!(
            scheduled_draw_at(None, now, 5),
            now + Duration::minutes(5)
        );

        let manual = now + Duration::hours(2);
        assert_eq!(scheduled_draw_at(Some(manual), now, 5), manual);
    }
}
