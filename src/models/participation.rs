use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::RaffleStatus;

/// 参与抽奖请求：一次可提交多张票，整批原子生效
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AdmitParticipationRequest {
    pub ticket_uuids: Vec<Uuid>,
}

/// 参与抽奖结果
/// already_admitted: 幂等重复提交的票（本抽奖内已有有效参与记录），不算错误
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdmissionResponse {
    pub admitted: Vec<Uuid>,
    pub already_admitted: Vec<Uuid>,
    pub participant_count: i64,
    pub raffle_status: RaffleStatus,
}
