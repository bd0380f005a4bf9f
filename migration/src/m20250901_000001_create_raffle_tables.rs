use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Tickets {
    Table,
    Id,
    Uuid,
    Code,
    Hash,
    GeneratedAt,
    OwnerId,
    RaffleId,
    Status,
    IsUsed,
    IsWinner,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Raffles {
    Table,
    Id,
    Title,
    OwnerId,
    Status,
    MaxParticipants,
    StartsAt,
    EndsAt,
    DrawAt,
    DrawnAt,
    WinnerParticipationId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Participations {
    Table,
    Id,
    RaffleId,
    TicketId,
    UserId,
    IsActive,
    IsWinner,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // enums
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("ticket_status"))
                    .values(vec![
                        Alias::new("available"),
                        Alias::new("pending"),
                        Alias::new("active"),
                        Alias::new("in_raffle"),
                        Alias::new("winner"),
                        Alias::new("lost"),
                        Alias::new("deleted"),
                    ])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("raffle_status"))
                    .values(vec![
                        Alias::new("draft"),
                        Alias::new("published"),
                        Alias::new("active"),
                        Alias::new("ready_to_draw"),
                        Alias::new("finished"),
                        Alias::new("cancelled"),
                    ])
                    .to_owned(),
            )
            .await?;

        // 票据表
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tickets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tickets::Uuid).uuid().not_null())
                    .col(ColumnDef::new(Tickets::Code).string_len(32).not_null())
                    .col(ColumnDef::new(Tickets::Hash).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Tickets::GeneratedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Tickets::OwnerId).big_integer().not_null())
                    .col(ColumnDef::new(Tickets::RaffleId).big_integer().null())
                    .col(
                        ColumnDef::new(Tickets::Status)
                            .custom(Alias::new("ticket_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tickets::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tickets::IsWinner)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Tickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Tickets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_uuid_unique")
                    .table(Tickets::Table)
                    .col(Tickets::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_code_unique")
                    .table(Tickets::Table)
                    .col(Tickets::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_owner")
                    .table(Tickets::Table)
                    .col(Tickets::OwnerId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tickets_raffle")
                    .table(Tickets::Table)
                    .col(Tickets::RaffleId)
                    .to_owned(),
            )
            .await?;

        // 抽奖活动表
        manager
            .create_table(
                Table::create()
                    .table(Raffles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Raffles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Raffles::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Raffles::OwnerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Raffles::Status)
                            .custom(Alias::new("raffle_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::MaxParticipants)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::StartsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::EndsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::DrawAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::DrawnAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::WinnerParticipationId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Raffles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Raffles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_raffles_status")
                    .table(Raffles::Table)
                    .col(Raffles::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_raffles_draw_at")
                    .table(Raffles::Table)
                    .col(Raffles::DrawAt)
                    .to_owned(),
            )
            .await?;

        // 参与记录表
        manager
            .create_table(
                Table::create()
                    .table(Participations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Participations::RaffleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Participations::TicketId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Participations::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Participations::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Participations::IsWinner)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Participations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 一张票在同一抽奖内至多参与一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_participations_raffle_ticket_unique")
                    .table(Participations::Table)
                    .col(Participations::RaffleId)
                    .col(Participations::TicketId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_participations_raffle_active")
                    .table(Participations::Table)
                    .col(Participations::RaffleId)
                    .col(Participations::IsActive)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_participations_raffle_user")
                    .table(Participations::Table)
                    .col(Participations::RaffleId)
                    .col(Participations::UserId)
                    .to_owned(),
            )
            .await?;

        // 外键（不做级联删除，保留历史记录）
        manager
            .alter_table(
                Table::alter()
                    .table(Participations::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_participation_raffle")
                            .from_tbl(Participations::Table)
                            .from_col(Participations::RaffleId)
                            .to_tbl(Raffles::Table)
                            .to_col(Raffles::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Participations::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_participation_ticket")
                            .from_tbl(Participations::Table)
                            .from_col(Participations::TicketId)
                            .to_tbl(Tickets::Table)
                            .to_col(Tickets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：参与记录 -> 抽奖活动 -> 票据
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(Participations::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Raffles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Tickets::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("raffle_status")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("ticket_status")).to_owned())
            .await?;
        Ok(())
    }
}
