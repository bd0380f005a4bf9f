use crate::config::RaffleConfig;
use crate::database::is_serialization_conflict;
use crate::entities::{
    RaffleStatus, TicketStatus, participation_entity as participations,
    raffle_entity as raffles, ticket_entity as tickets,
};
use crate::error::{AppError, AppResult};
use crate::external::Notifier;
use crate::models::DrawResponse;
use chrono::Utc;
use rand::{Rng, rngs::OsRng};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IsolationLevel,
    QueryFilter, TransactionTrait,
};

/// Uniform winner pick over `[0, len)` from the OS entropy source.
/// A predictable PRNG would let an observer forecast winners, so `OsRng`
/// is non-negotiable here.
pub fn pick_winner_index(len: usize) -> usize {
    OsRng.gen_range(0..len)
}

/// Post-commit notification plan for a freshly drawn raffle.
struct DrawNotifications {
    winner_user_id: i64,
    winner_ticket_uuid: uuid::Uuid,
    loser_user_ids: Vec<i64>,
}

#[derive(Clone)]
pub struct DrawService {
    pool: DatabaseConnection,
    config: RaffleConfig,
    notifier: Notifier,
}

impl DrawService {
    pub fn new(pool: DatabaseConnection, config: RaffleConfig, notifier: Notifier) -> Self {
        Self {
            pool,
            config,
            notifier,
        }
    }

    /// 开奖 (Draw)
    ///
    /// 逻辑:
    /// 1. 校验状态 ready_to_draw（或 active + 管理员 force）
    /// 2. 非 force 时必须已到 draw_at
    /// 3. 有效参与数 >= min_participants（force 时允许 1，0 永远报错）
    /// 4. 以 OsRng 等概率抽取中奖参与
    /// 5. 同一事务内写中奖参与、中奖票、落选票与抽奖行
    /// 6. 抽奖行更新以 drawn_at IS NULL 为守卫；守卫失败视为输掉竞态，
    ///    返回实际已记录的中奖者（幂等，不报错）
    /// 7. 提交后尽力发送中奖/落选通知
    pub async fn execute_draw(
        &self,
        raffle_id: i64,
        force: bool,
        caller_is_privileged: bool,
    ) -> AppResult<DrawResponse> {
        if force && !caller_is_privileged {
            return Err(AppError::PermissionDenied);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_draw(raffle_id, force).await {
                Ok((response, notifications)) => {
                    if let Some(plan) = notifications {
                        self.send_notifications(raffle_id, plan).await;
                    }
                    return Ok(response);
                }
                Err(AppError::DatabaseError(e))
                    if is_serialization_conflict(&e) && attempt <= self.config.txn_retries =>
                {
                    log::warn!(
                        "Draw serialization conflict on raffle {raffle_id}, retry {attempt}"
                    );
                    continue;
                }
                Err(AppError::DatabaseError(e)) if is_serialization_conflict(&e) => {
                    return Err(AppError::ConflictRetryExhausted);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 周期扫描：对所有已到 draw_at 且未开奖的 ready_to_draw 抽奖执行开奖。
    /// 单个失败只记日志，下个周期重试，不影响其它抽奖。
    pub async fn sweep_due_draws(&self) -> AppResult<usize> {
        let now = Utc::now();
        let due = raffles::Entity::find()
            .filter(raffles::Column::Status.eq(RaffleStatus::ReadyToDraw))
            .filter(raffles::Column::DrawnAt.is_null())
            .filter(raffles::Column::DrawAt.lte(now))
            .all(&self.pool)
            .await?;

        let mut drawn = 0;
        for raffle in due {
            match self.execute_draw(raffle.id, false, false).await {
                Ok(result) => {
                    log::info!(
                        "Raffle {} drawn automatically, winner participation {}",
                        raffle.id,
                        result.winner_participation_id
                    );
                    drawn += 1;
                }
                Err(e) => {
                    log::error!("Automatic draw failed for raffle {}: {e}", raffle.id);
                }
            }
        }
        Ok(drawn)
    }

    async fn try_draw(
        &self,
        raffle_id: i64,
        force: bool,
    ) -> AppResult<(DrawResponse, Option<DrawNotifications>)> {
        let txn = self
            .pool
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        let raffle = raffles::Entity::find_by_id(raffle_id)
            .one(&txn)
            .await?
            .ok_or(AppError::RaffleNotFound)?;

        // 已开奖：幂等返回已记录的中奖者
        if raffle.is_drawn() {
            let response = self.recorded_winner(&txn, &raffle).await?;
            txn.commit().await?;
            return Ok((response, None));
        }

        match raffle.status {
            RaffleStatus::ReadyToDraw => {}
            RaffleStatus::Active if force => {}
            RaffleStatus::Finished => {
                // 到期无赢家关闭的抽奖没有可返回的中奖者
                return Err(AppError::DrawNotEligible(
                    "raffle was closed without a winner".into(),
                ));
            }
            other => {
                return Err(AppError::DrawNotEligible(format!(
                    "raffle is in status {other}"
                )));
            }
        }

        let now = Utc::now();
        if !force
            && let Some(draw_at) = raffle.draw_at
            && now < draw_at
        {
            return Err(AppError::DrawTooEarly { draw_at });
        }

        let parts = participations::Entity::find()
            .filter(participations::Column::RaffleId.eq(raffle_id))
            .filter(participations::Column::IsActive.eq(true))
            .all(&txn)
            .await?;

        let n = parts.len() as i64;
        if n == 0 || (!force && n < self.config.min_participants) {
            return Err(AppError::InsufficientParticipants { active: n });
        }

        let winner = &parts[pick_winner_index(parts.len())];
        let winner_ticket = tickets::Entity::find_by_id(winner.ticket_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "participation {} references missing ticket {}",
                    winner.id, winner.ticket_id
                ))
            })?;

        // 中奖参与
        participations::Entity::update_many()
            .col_expr(participations::Column::IsWinner, Expr::value(true))
            .filter(participations::Column::Id.eq(winner.id))
            .exec(&txn)
            .await?;

        // 中奖票
        tickets::Entity::update_many()
            .col_expr(tickets::Column::Status, TicketStatus::Winner.as_enum())
            .col_expr(tickets::Column::IsWinner, Expr::value(true))
            .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
            .filter(tickets::Column::Id.eq(winner.ticket_id))
            .exec(&txn)
            .await?;

        // 落选票
        let loser_ticket_ids: Vec<i64> = parts
            .iter()
            .filter(|p| p.id != winner.id)
            .map(|p| p.ticket_id)
            .collect();
        if !loser_ticket_ids.is_empty() {
            tickets::Entity::update_many()
                .col_expr(tickets::Column::Status, TicketStatus::Lost.as_enum())
                .col_expr(tickets::Column::UpdatedAt, Expr::value(now))
                .filter(tickets::Column::Id.is_in(loser_ticket_ids))
                .exec(&txn)
                .await?;
        }

        // 抽奖行：drawn_at IS NULL 守卫，四项写入与上面的票据更新同事务提交
        let res = raffles::Entity::update_many()
            .col_expr(raffles::Column::DrawnAt, Expr::value(now))
            .col_expr(
                raffles::Column::WinnerParticipationId,
                Expr::value(winner.id),
            )
            .col_expr(raffles::Column::Status, RaffleStatus::Finished.as_enum())
            .col_expr(raffles::Column::UpdatedAt, Expr::value(now))
            .filter(raffles::Column::Id.eq(raffle_id))
            .filter(raffles::Column::DrawnAt.is_null())
            .exec(&txn)
            .await?;

        if res.rows_affected == 0 {
            // 竞态中输掉：放弃本次写入，返回已提交的中奖者
            txn.rollback().await?;
            let raffle = raffles::Entity::find_by_id(raffle_id)
                .one(&self.pool)
                .await?
                .ok_or(AppError::RaffleNotFound)?;
            if raffle.is_drawn() {
                let response = self.recorded_winner(&self.pool, &raffle).await?;
                return Ok((response, None));
            }
            return Err(AppError::DrawNotEligible(
                "raffle was closed concurrently".into(),
            ));
        }

        txn.commit().await?;

        let mut loser_user_ids: Vec<i64> = parts
            .iter()
            .filter(|p| p.id != winner.id)
            .map(|p| p.user_id)
            .collect();
        loser_user_ids.sort_unstable();
        loser_user_ids.dedup();

        let response = DrawResponse {
            winner_participation_id: winner.id,
            winner_ticket_uuid: winner_ticket.uuid,
            winner_user_id: winner.user_id,
            executed_at: now,
        };
        let notifications = DrawNotifications {
            winner_user_id: winner.user_id,
            winner_ticket_uuid: winner_ticket.uuid,
            loser_user_ids,
        };
        Ok((response, Some(notifications)))
    }

    /// 读取已开奖抽奖的中奖信息（不变式：drawn_at 与 winner_participation_id 同生同灭）。
    async fn recorded_winner<C: ConnectionTrait>(
        &self,
        conn: &C,
        raffle: &raffles::Model,
    ) -> AppResult<DrawResponse> {
        let (Some(drawn_at), Some(winner_participation_id)) =
            (raffle.drawn_at, raffle.winner_participation_id)
        else {
            return Err(AppError::InternalError(format!(
                "raffle {} violates the drawn_at/winner invariant",
                raffle.id
            )));
        };

        let participation = participations::Entity::find_by_id(winner_participation_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "winner participation {winner_participation_id} not found"
                ))
            })?;
        let ticket = tickets::Entity::find_by_id(participation.ticket_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "winner ticket {} not found",
                    participation.ticket_id
                ))
            })?;

        Ok(DrawResponse {
            winner_participation_id,
            winner_ticket_uuid: ticket.uuid,
            winner_user_id: participation.user_id,
            executed_at: drawn_at,
        })
    }

    /// 提交后的尽力通知：失败只记日志，绝不回滚开奖结果。
    async fn send_notifications(&self, raffle_id: i64, plan: DrawNotifications) {
        self.notifier
            .winner_selected(raffle_id, plan.winner_user_id, plan.winner_ticket_uuid)
            .await;
        for user_id in plan.loser_user_ids {
            self.notifier.raffle_lost(raffle_id, user_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_winner_index_in_bounds() {
        for len in [1usize, 2, 3, 10, 1000] {
            for _ in 0..100 {
                assert!(pick_winner_index(len) < len);
            }
        }
    }

    #[test]
    fn test_single_participant_always_picked() {
        for _ in 0..10 {
            assert_eq!(pick_winner_index(1), 0);
        }
    }

    #[test]
    fn test_pick_winner_index_is_roughly_uniform() {
        // 3名参与者抽 30000 次，每人命中率应收敛到 1/3
        const TRIALS: usize = 30_000;
        const N: usize = 3;
        let mut counts = [0usize; N];
        for _ in 0..TRIALS {
            counts[pick_winner_index(N)] += 1;
        }
        for (i, &c) in counts.iter().enumerate() {
            let freq = c as f64 / TRIALS as f64;
            assert!(
                (freq - 1.0 / N as f64).abs() < 0.02,
                "participant {i} won with frequency {freq}"
            );
        }
    }
}
