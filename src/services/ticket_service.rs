use crate::config::TicketConfig;
use crate::database::is_unique_violation;
use crate::entities::{TicketStatus, ticket_entity as tickets};
use crate::error::{AppError, AppResult};
use crate::external::Notifier;
use crate::models::{
    IssueTicketsResponse, PaginatedResponse, PaginationParams, TicketIssueFailure,
    TicketListQuery, TicketPageResponse, TicketResponse,
};
use crate::utils::{TicketCrypto, generate_ticket_code};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct TicketService {
    pool: DatabaseConnection,
    crypto: TicketCrypto,
    config: TicketConfig,
    notifier: Notifier,
}

impl TicketService {
    pub fn new(
        pool: DatabaseConnection,
        crypto: TicketCrypto,
        config: TicketConfig,
        notifier: Notifier,
    ) -> Self {
        Self {
            pool,
            crypto,
            config,
            notifier,
        }
    }

    /// 批量发放票据
    ///
    /// 逻辑:
    /// 1. 校验数量上限 (1..=max_batch)
    /// 2. 每张票独立生成 uuid/code 并签名后落库
    /// 3. 标识符撞库时重新生成，最多 issue_retries 次
    /// 4. 允许部分成功，逐票上报结果
    /// 5. 提交后尽力通知，通知失败不影响发放
    pub async fn issue_many(&self, owner_id: i64, count: u32) -> AppResult<IssueTicketsResponse> {
        if count == 0 || count > self.config.max_batch {
            return Err(AppError::ValidationError(format!(
                "count must be between 1 and {}",
                self.config.max_batch
            )));
        }

        let mut issued: Vec<TicketResponse> = Vec::with_capacity(count as usize);
        let mut failed: Vec<TicketIssueFailure> = Vec::new();

        for _ in 0..count {
            match self.issue_with_collision_retry(owner_id).await {
                Ok(model) => issued.push(model.into()),
                Err(e) => {
                    // 完整错误只进日志；下发给调用方的原因经过脱敏
                    log::warn!("Ticket issuance failed for user {owner_id}: {e}");
                    failed.push(TicketIssueFailure {
                        reason: e.public_message(),
                    });
                }
            }
        }

        // 尽力通知；失败只记日志
        if !issued.is_empty() {
            self.notifier.tickets_issued(owner_id, issued.len()).await;
        }

        Ok(IssueTicketsResponse { issued, failed })
    }

    /// 我的票据列表（分页，不含已删除）
    pub async fn list_tickets(
        &self,
        owner_id: i64,
        query: &TicketListQuery,
    ) -> AppResult<TicketPageResponse> {
        let params = PaginationParams::new(query.page, query.per_page);
        let offset = params.get_offset();
        let limit = params.get_limit();

        let base_query = tickets::Entity::find()
            .filter(tickets::Column::OwnerId.eq(owner_id))
            .filter(tickets::Column::Status.ne(TicketStatus::Deleted));

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items_models = base_query
            .order_by(tickets::Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(&self.pool)
            .await?;

        let items: Vec<TicketResponse> = items_models.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(20),
            total,
        ))
    }

    /// 删除票据：仅允许尚未投入任何抽奖且未使用的票
    pub async fn delete_ticket(&self, owner_id: i64, ticket_uuid: Uuid) -> AppResult<()> {
        let ticket = tickets::Entity::find()
            .filter(tickets::Column::Uuid.eq(ticket_uuid))
            .filter(tickets::Column::OwnerId.eq(owner_id))
            .one(&self.pool)
            .await?
            .ok_or(AppError::TicketsNotFoundOrNotOwned)?;

        if ticket.is_used || ticket.raffle_id.is_some() || !ticket.can_enter_raffle() {
            return Err(AppError::TicketAlreadyUsed);
        }

        let mut am = ticket.into_active_model();
        am.status = Set(TicketStatus::Deleted);
        am.updated_at = Set(Some(Utc::now()));
        am.update(&self.pool).await?;
        Ok(())
    }

    /// 生成并插入一张票，uuid/code 撞库时重试（上限 issue_retries）。
    async fn issue_with_collision_retry(&self, owner_id: i64) -> AppResult<tickets::Model> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let generated_at = Utc::now();
            let ticket_uuid = Uuid::new_v4();
            let code = generate_ticket_code();
            let hash = self
                .crypto
                .sign(&ticket_uuid, owner_id, generated_at.timestamp_millis());

            let result = tickets::ActiveModel {
                uuid: Set(ticket_uuid),
                code: Set(code),
                hash: Set(hash),
                generated_at: Set(generated_at),
                owner_id: Set(owner_id),
                raffle_id: Set(None),
                status: Set(TicketStatus::Available),
                is_used: Set(false),
                is_winner: Set(false),
                ..Default::default()
            }
            .insert(&self.pool)
            .await;

            match result {
                Ok(model) => return Ok(model),
                Err(e) if is_unique_violation(&e) && attempt < self.config.issue_retries => {
                    log::warn!(
                        "Ticket identifier collision on attempt {attempt}, regenerating"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
