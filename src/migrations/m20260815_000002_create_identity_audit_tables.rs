use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ── refresh_tokens ──
        manager
            .create_table(
                Table::create()
                    .table(RefreshTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RefreshTokens::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RefreshTokens::TokenHash)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(RefreshTokens::UserId).string_len(36).not_null())
                    .col(
                        ColumnDef::new(RefreshTokens::ExpiresAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefreshTokens::Revoked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RefreshTokens::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefreshTokens::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_refresh_tokens_user_id")
                    .table(RefreshTokens::Table)
                    .col(RefreshTokens::UserId)
                    .to_owned(),
            )
            .await?;

        // ── login_history ──
        manager
            .create_table(
                Table::create()
                    .table(LoginHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginHistory::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoginHistory::UserId).string_len(36).null())
                    .col(
                        ColumnDef::new(LoginHistory::Username)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoginHistory::LoginTime)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoginHistory::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(LoginHistory::UserAgent).string().null())
                    .col(ColumnDef::new(LoginHistory::Location).string_len(100).null())
                    .col(ColumnDef::new(LoginHistory::Status).string_len(20).not_null())
                    .col(ColumnDef::new(LoginHistory::FailReason).string().null())
                    .col(
                        ColumnDef::new(LoginHistory::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_history_user_id")
                    .table(LoginHistory::Table)
                    .col(LoginHistory::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_history_login_time")
                    .table(LoginHistory::Table)
                    .col(LoginHistory::LoginTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_login_history_status")
                    .table(LoginHistory::Table)
                    .col(LoginHistory::Status)
                    .to_owned(),
            )
            .await?;

        // ── operation_logs ──
        manager
            .create_table(
                Table::create()
                    .table(OperationLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OperationLogs::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OperationLogs::UserId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationLogs::Username)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OperationLogs::Module).string_len(50).not_null())
                    .col(
                        ColumnDef::new(OperationLogs::OperationType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationLogs::Operation)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OperationLogs::Method).string_len(200).null())
                    .col(ColumnDef::new(OperationLogs::Params).string_len(2100).null())
                    .col(ColumnDef::new(OperationLogs::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(OperationLogs::Location).string_len(100).null())
                    .col(
                        ColumnDef::new(OperationLogs::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OperationLogs::ErrorMsg).string_len(600).null())
                    .col(
                        ColumnDef::new(OperationLogs::CostTimeMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationLogs::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_operation_logs_user_id")
                    .table(OperationLogs::Table)
                    .col(OperationLogs::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_operation_logs_module")
                    .table(OperationLogs::Table)
                    .col(OperationLogs::Module)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_operation_logs_operation_type")
                    .table(OperationLogs::Table)
                    .col(OperationLogs::OperationType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_operation_logs_created_at")
                    .table(OperationLogs::Table)
                    .col(OperationLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OperationLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LoginHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RefreshTokens::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RefreshTokens {
    Table,
    Id,
    TokenHash,
    UserId,
    ExpiresAt,
    Revoked,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum LoginHistory {
    Table,
    Id,
    UserId,
    Username,
    LoginTime,
    IpAddress,
    UserAgent,
    Location,
    Status,
    FailReason,
    CreatedAt,
}

#[derive(Iden)]
enum OperationLogs {
    Table,
    Id,
    UserId,
    Username,
    Module,
    OperationType,
    Operation,
    Method,
    Params,
    IpAddress,
    Location,
    Status,
    ErrorMsg,
    CostTimeMs,
    CreatedAt,
}
