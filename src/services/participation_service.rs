use crate::config::{RaffleConfig, TicketConfig};
use crate::database::is_serialization_conflict;
use crate::entities::{
    RaffleStatus, TicketStatus, participation_entity as participations,
    raffle_entity as raffles, ticket_entity as tickets,
};
use crate::error::{AppError, AppResult};
use crate::models::AdmissionResponse;
use crate::services::raffle_service::{
    count_active_participations, count_active_participations_for_user, next_status,
    scheduled_draw_at,
};
use crate::utils::TicketCrypto;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, IsolationLevel, QueryFilter, Set, TransactionTrait,
};
use std::collections::HashSet;
use uuid::Uuid;

/// 单个用户在一个抽奖内的参与上限：容量的一半（向下取整）。
pub fn fairness_cap(max_participants: i32) -> i64 {
    (max_participants / 2) as i64
}

/// 配额剩余量（不为负），随公平性拒绝一起返回给调用方。
pub fn remaining_quota(cap: i64, current: i64) -> i64 {
    (cap - current).max(0)
}

/// 批量准入是否会突破容量。
pub fn exceeds_capacity(current: i64, incoming: i64, max_participants: i32) -> bool {
    current + incoming > max_participants as i64
}

#[derive(Clone)]
pub struct ParticipationService {
    pool: DatabaseConnection,
    crypto: TicketCrypto,
    ticket_config: TicketConfig,
    raffle_config: RaffleConfig,
}

impl ParticipationService {
    pub fn new(
        pool: DatabaseConnection,
        crypto: TicketCrypto,
        ticket_config: TicketConfig,
        raffle_config: RaffleConfig,
    ) -> Self {
        if !ticket_config.enforce_signature {
            // 显式的开发用后门，默认关闭；启动时高调记录，便于审计
            log::warn!("Ticket signature enforcement is DISABLED by configuration");
        }
        Self {
            pool,
            crypto,
            ticket_config,
            raffle_config,
        }
    }

    /// 参与抽奖 (Admit)
    ///
    /// 整批在一个 SERIALIZABLE 事务内完成校验与写入：
    /// 1. 抽奖存在且处于可参与状态
    /// 2. 所有票存在且属于调用者
    /// 3. 签名校验（可配置关闭）
    /// 4. 票未被使用；若已挂到抽奖，必须是本抽奖（幂等重复提交）
    /// 5. 票状态属于可入场集合
    /// 6. 容量：current + N <= max，否则整批拒绝
    /// 7. 公平性（特权调用方豁免）：单用户 <= floor(max/2)，拒绝时返回剩余配额
    /// 8. 恰好满员时同事务内转入 ready_to_draw 并排期 draw_at
    ///
    /// 序列化冲突在内部有限重试，超过次数返回可重试错误。
    pub async fn admit(
        &self,
        raffle_id: i64,
        ticket_uuids: &[Uuid],
        caller_user_id: i64,
        caller_is_privileged: bool,
    ) -> AppResult<AdmissionResponse> {
        if ticket_uuids.is_empty() {
            return Err(AppError::ValidationError(
                "ticket_uuids must not be empty".into(),
            ));
        }

        // 去重，保持提交顺序
        let mut seen = HashSet::new();
        let uuids: Vec<Uuid> = ticket_uuids
            .iter()
            .copied()
            .filter(|u| seen.insert(*u))
            .collect();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .try_admit(raffle_id, &uuids, caller_user_id, caller_is_privileged)
                .await
            {
                Err(AppError::DatabaseError(e))
                    if is_serialization_conflict(&e)
                        && attempt <= self.raffle_config.txn_retries =>
                {
                    log::warn!(
                        "Admission serialization conflict on raffle {raffle_id}, retry {attempt}"
                    );
                    continue;
                }
                Err(AppError::DatabaseError(e)) if is_serialization_conflict(&e) => {
                    return Err(AppError::ConflictRetryExhausted);
                }
                other => return other,
            }
        }
    }

    async fn try_admit(
        &self,
        raffle_id: i64,
        uuids: &[Uuid],
        caller_user_id: i64,
        caller_is_privileged: bool,
    ) -> AppResult<AdmissionResponse> {
        let txn = self
            .pool
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        let now = Utc::now();
        let mut raffle = raffles::Entity::find_by_id(raffle_id)
            .one(&txn)
            .await?
            .ok_or(AppError::RaffleNotFound)?;

        // published 且已到开始时间：顺带激活（状态机的惰性应用）
        if raffle.status == RaffleStatus::Published
            && next_status(&raffle, 0, now) == Some(RaffleStatus::Active)
        {
            let mut am = raffle.into_active_model();
            am.status = Set(RaffleStatus::Active);
            am.updated_at = Set(Some(now));
            raffle = am.update(&txn).await?;
        }

        if raffle.status != RaffleStatus::Active || raffle.is_expired(now) {
            return Err(AppError::RaffleLockedOrClosed(format!(
                "raffle is in status {}",
                raffle.status
            )));
        }

        // 所有票必须存在且归调用者所有
        let ticket_rows = tickets::Entity::find()
            .filter(tickets::Column::Uuid.is_in(uuids.to_vec()))
            .filter(tickets::Column::OwnerId.eq(caller_user_id))
            .all(&txn)
            .await?;
        if ticket_rows.len() != uuids.len() {
            return Err(AppError::TicketsNotFoundOrNotOwned);
        }

        // 签名校验
        if self.ticket_config.enforce_signature {
            for t in &ticket_rows {
                let ok = self.crypto.verify(
                    &t.uuid,
                    t.owner_id,
                    t.generated_at.timestamp_millis(),
                    &t.hash,
                );
                if !ok {
                    log::warn!("Invalid signature on ticket {} (user {})", t.uuid, t.owner_id);
                    return Err(AppError::SignatureInvalid);
                }
            }
        }

        // 本抽奖内已有有效参与记录的票：幂等重复提交，不算错误
        let ticket_ids: Vec<i64> = ticket_rows.iter().map(|t| t.id).collect();
        let existing: HashSet<i64> = participations::Entity::find()
            .filter(participations::Column::RaffleId.eq(raffle_id))
            .filter(participations::Column::TicketId.is_in(ticket_ids))
            .filter(participations::Column::IsActive.eq(true))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.ticket_id)
            .collect();

        let mut already_admitted: Vec<Uuid> = Vec::new();
        let mut fresh: Vec<&tickets::Model> = Vec::new();
        for t in &ticket_rows {
            if existing.contains(&t.id) {
                already_admitted.push(t.uuid);
                continue;
            }
            if let Some(other_raffle) = t.raffle_id
                && other_raffle != raffle_id
            {
                return Err(AppError::TicketInOtherRaffle);
            }
            // 已使用（含曾在本抽奖但参与被下线的票）不可重入
            if t.is_used || !t.can_enter_raffle() {
                return Err(AppError::TicketAlreadyUsed);
            }
            fresh.push(t);
        }

        let current = count_active_participations(&txn, raffle_id).await?;
        let new_n = fresh.len() as i64;

        if new_n > 0 {
            if exceeds_capacity(current, new_n, raffle.max_participants) {
                return Err(AppError::CapacityExceeded {
                    remaining: (raffle.max_participants as i64 - current).max(0),
                });
            }

            if !caller_is_privileged {
                let cap = fairness_cap(raffle.max_participants);
                let user_count =
                    count_active_participations_for_user(&txn, raffle_id, caller_user_id).await?;
                if user_count + new_n > cap {
                    return Err(AppError::FairnessCapExceeded {
                        remaining_for_user: remaining_quota(cap, user_count),
                    });
                }
            }

            for t in &fresh {
                let mut am = (*t).clone().into_active_model();
                am.status = Set(TicketStatus::InRaffle);
                am.raffle_id = Set(Some(raffle_id));
                am.is_used = Set(true);
                am.updated_at = Set(Some(now));
                am.update(&txn).await?;

                participations::ActiveModel {
                    raffle_id: Set(raffle_id),
                    ticket_id: Set(t.id),
                    user_id: Set(caller_user_id),
                    is_active: Set(true),
                    is_winner: Set(false),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        let total = current + new_n;
        let raffle_status =
            self.maybe_promote_to_ready(&txn, raffle, total, now).await?;

        txn.commit().await?;

        Ok(AdmissionResponse {
            admitted: fresh.iter().map(|t| t.uuid).collect(),
            already_admitted,
            participant_count: total,
            raffle_status,
        })
    }

    /// 恰好达到容量时，在同一事务内触发状态机：active -> ready_to_draw 并排期。
    async fn maybe_promote_to_ready(
        &self,
        txn: &DatabaseTransaction,
        raffle: raffles::Model,
        total: i64,
        now: chrono::DateTime<Utc>,
    ) -> AppResult<RaffleStatus> {
        if raffle.status != RaffleStatus::Active || total < raffle.max_participants as i64 {
            return Ok(raffle.status);
        }

        let draw_at = scheduled_draw_at(raffle.draw_at, now, self.raffle_config.draw_grace_minutes);
        let raffle_id = raffle.id;
        let mut am = raffle.into_active_model();
        am.status = Set(RaffleStatus::ReadyToDraw);
        am.draw_at = Set(Some(draw_at));
        am.updated_at = Set(Some(now));
        am.update(txn).await?;

        log::info!("Raffle {raffle_id} reached capacity, draw scheduled at {draw_at}");
        Ok(RaffleStatus::ReadyToDraw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fairness_cap_is_half_capacity_rounded_down() {
        assert_eq!(fairness_cap(10), 5);
        assert_eq!(fairness_cap(11), 5);
        assert_eq!(fairness_cap(2), 1);
        assert_eq!(fairness_cap(1), 0);
    }

    #[test]
    fn test_remaining_quota_never_negative() {
        assert_eq!(remaining_quota(5, 3), 2);
        assert_eq!(remaining_quota(5, 5), 0);
        assert_eq!(remaining_quota(5, 7), 0);
    }

    #[test]
    fn test_capacity_check_rejects_overflow_batch() {
        // 10人容量已有9人：1张可入，2张整批拒绝
        assert!(!exceeds_capacity(9, 1, 10));
        assert!(exceeds_capacity(9, 2, 10));
        assert!(exceeds_capacity(10, 1, 10));
        assert!(!exceeds_capacity(0, 10, 10));
    }

    #[test]
    fn test_user_at_cap_has_zero_remaining() {
        // 场景：容量10，用户已持有5个有效参与，再投1张必须拒绝且剩余配额为0
        let cap = fairness_cap(10);
        let user_count = 5;
        assert!(user_count + 1 > cap);
        assert_eq!(remaining_quota(cap, user_count), 0);
    }
}
