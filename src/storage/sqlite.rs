//! SQLite implementation of the platform store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sea_query::{Asterisk, Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Challenge, Investment, InvestmentStatus, Opportunity, User, Withdrawal, WithdrawalKind,
    WithdrawalStatus,
};
use crate::interfaces::store::{PlatformStore, Result, StoreError};

use super::schema::{
    Investments, Opportunities, Users, Withdrawals, CREATE_INVESTMENTS_TABLE,
    CREATE_OPPORTUNITIES_TABLE, CREATE_USERS_TABLE, CREATE_WITHDRAWALS_TABLE,
};

/// SQLite implementation of [`PlatformStore`].
///
/// Money columns hold exact decimal renderings; timestamps are RFC 3339
/// with a fixed fractional width so lexicographic comparison matches
/// chronological order.
pub struct SqlitePlatformStore {
    pool: SqlitePool,
}

fn fmt_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp '{value}': {e}")))
}

fn parse_money(value: &str) -> Result<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| StoreError::Corrupt(format!("invalid decimal '{value}': {e}")))
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| StoreError::Corrupt(format!("invalid uuid '{value}': {e}")))
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    let referred_by: Option<String> = row.get("referred_by");
    let referrals_json: String = row.get("referrals");
    let referrals: Vec<Uuid> = serde_json::from_str(&referrals_json)
        .map_err(|e| StoreError::Corrupt(format!("invalid referral list: {e}")))?;

    let challenge = match row.get::<Option<String>, _>("challenge_deadline") {
        Some(deadline) => {
            let started_at: Option<String> = row.get("challenge_started_at");
            let target: Option<String> = row.get("challenge_target");
            let cagnotte: Option<String> = row.get("challenge_cagnotte");
            let qualifying: Option<String> = row.get("challenge_qualifying_deposit");
            match (started_at, target, cagnotte, qualifying) {
                (Some(started_at), Some(target), Some(cagnotte), Some(qualifying)) => {
                    Some(Challenge {
                        started_at: parse_time(&started_at)?,
                        deadline: parse_time(&deadline)?,
                        target: parse_money(&target)?,
                        cagnotte: parse_money(&cagnotte)?,
                        qualifying_deposit: parse_money(&qualifying)?,
                    })
                }
                _ => {
                    return Err(StoreError::Corrupt(format!(
                        "partial challenge record for user {id}"
                    )))
                }
            }
        }
        None => None,
    };

    Ok(User {
        id: parse_uuid(&id)?,
        level: row.get::<i64, _>("level") as u32,
        balance: parse_money(&row.get::<String, _>("balance"))?,
        total_commissions: parse_money(&row.get::<String, _>("total_commissions"))?,
        bonus_parrainage: parse_money(&row.get::<String, _>("bonus_parrainage"))?,
        total_invested: parse_money(&row.get::<String, _>("total_invested"))?,
        total_benefits: parse_money(&row.get::<String, _>("total_benefits"))?,
        forfeited_earnings: parse_money(&row.get::<String, _>("forfeited_earnings"))?,
        benefits_blocked: row.get::<i64, _>("benefits_blocked") != 0,
        challenge,
        referred_by: referred_by.as_deref().map(parse_uuid).transpose()?,
        referrals,
    })
}

fn row_to_investment(row: &SqliteRow) -> Result<Investment> {
    let status: String = row.get("status");
    Ok(Investment {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        owner: parse_uuid(&row.get::<String, _>("owner"))?,
        opportunity: parse_uuid(&row.get::<String, _>("opportunity"))?,
        amount: parse_money(&row.get::<String, _>("amount"))?,
        base_rate: parse_money(&row.get::<String, _>("base_rate"))?,
        weekly_rate: parse_money(&row.get::<String, _>("weekly_rate"))?,
        max_weeks: row.get::<i64, _>("max_weeks") as u32,
        start_date: parse_time(&row.get::<String, _>("start_date"))?,
        end_date: parse_time(&row.get::<String, _>("end_date"))?,
        status: InvestmentStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown investment status '{status}'")))?,
        last_synced_earnings: parse_money(&row.get::<String, _>("last_synced_earnings"))?,
        version: row.get::<i64, _>("version") as u64,
    })
}

fn row_to_opportunity(row: &SqliteRow) -> Result<Opportunity> {
    Ok(Opportunity {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        name: row.get("name"),
        base_rate: parse_money(&row.get::<String, _>("base_rate"))?,
        min_investment: parse_money(&row.get::<String, _>("min_investment"))?,
        max_investment: parse_money(&row.get::<String, _>("max_investment"))?,
        duration_weeks: row.get::<i64, _>("duration_weeks") as u32,
        total_invested: parse_money(&row.get::<String, _>("total_invested"))?,
        active_investors: row.get::<i64, _>("active_investors") as u32,
    })
}

fn user_columns() -> [Users; 16] {
    [
        Users::Id,
        Users::Level,
        Users::Balance,
        Users::TotalCommissions,
        Users::BonusParrainage,
        Users::TotalInvested,
        Users::TotalBenefits,
        Users::ForfeitedEarnings,
        Users::BenefitsBlocked,
        Users::ChallengeStartedAt,
        Users::ChallengeDeadline,
        Users::ChallengeTarget,
        Users::ChallengeCagnotte,
        Users::ChallengeQualifyingDeposit,
        Users::ReferredBy,
        Users::Referrals,
    ]
}

fn upsert_user_sql(user: &User) -> Result<String> {
    let referrals = serde_json::to_string(&user.referrals)
        .map_err(|e| StoreError::Corrupt(format!("unencodable referral list: {e}")))?;
    let challenge = user.challenge.as_ref();

    let query = Query::insert()
        .into_table(Users::Table)
        .columns(user_columns())
        .values_panic([
            user.id.to_string().into(),
            (user.level as i64).into(),
            user.balance.to_string().into(),
            user.total_commissions.to_string().into(),
            user.bonus_parrainage.to_string().into(),
            user.total_invested.to_string().into(),
            user.total_benefits.to_string().into(),
            user.forfeited_earnings.to_string().into(),
            (user.benefits_blocked as i64).into(),
            Expr::value(challenge.map(|c| fmt_time(c.started_at))),
            Expr::value(challenge.map(|c| fmt_time(c.deadline))),
            Expr::value(challenge.map(|c| c.target.to_string())),
            Expr::value(challenge.map(|c| c.cagnotte.to_string())),
            Expr::value(challenge.map(|c| c.qualifying_deposit.to_string())),
            Expr::value(user.referred_by.map(|id| id.to_string())),
            referrals.into(),
        ])
        .on_conflict(
            OnConflict::column(Users::Id)
                .update_columns([
                    Users::Level,
                    Users::Balance,
                    Users::TotalCommissions,
                    Users::BonusParrainage,
                    Users::TotalInvested,
                    Users::TotalBenefits,
                    Users::ForfeitedEarnings,
                    Users::BenefitsBlocked,
                    Users::ChallengeStartedAt,
                    Users::ChallengeDeadline,
                    Users::ChallengeTarget,
                    Users::ChallengeCagnotte,
                    Users::ChallengeQualifyingDeposit,
                    Users::ReferredBy,
                    Users::Referrals,
                ])
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder);
    Ok(query)
}

impl SqlitePlatformStore {
    /// Create a new SQLite platform store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INVESTMENTS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_OPPORTUNITIES_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_WITHDRAWALS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_users_tx(conn: &mut SqliteConnection, users: &[User]) -> Result<()> {
        for user in users {
            let sql = upsert_user_sql(user)?;
            sqlx::query(&sql).execute(&mut *conn).await?;
        }
        Ok(())
    }

    /// Insert or version-checked-update an investment inside an open
    /// transaction.
    async fn upsert_investment_tx(
        conn: &mut SqliteConnection,
        investment: &Investment,
    ) -> Result<()> {
        let select = Query::select()
            .column(Investments::Version)
            .from(Investments::Table)
            .and_where(Expr::col(Investments::Id).eq(investment.id.to_string()))
            .to_string(SqliteQueryBuilder);
        let stored: Option<i64> = sqlx::query(&select)
            .fetch_optional(&mut *conn)
            .await?
            .map(|row| row.get(0));

        match stored {
            None => {
                let insert = Query::insert()
                    .into_table(Investments::Table)
                    .columns([
                        Investments::Id,
                        Investments::Owner,
                        Investments::Opportunity,
                        Investments::Amount,
                        Investments::BaseRate,
                        Investments::WeeklyRate,
                        Investments::MaxWeeks,
                        Investments::StartDate,
                        Investments::EndDate,
                        Investments::Status,
                        Investments::LastSyncedEarnings,
                        Investments::Version,
                    ])
                    .values_panic([
                        investment.id.to_string().into(),
                        investment.owner.to_string().into(),
                        investment.opportunity.to_string().into(),
                        investment.amount.to_string().into(),
                        investment.base_rate.to_string().into(),
                        investment.weekly_rate.to_string().into(),
                        (investment.max_weeks as i64).into(),
                        fmt_time(investment.start_date).into(),
                        fmt_time(investment.end_date).into(),
                        investment.status.as_str().into(),
                        investment.last_synced_earnings.to_string().into(),
                        (investment.version as i64 + 1).into(),
                    ])
                    .to_string(SqliteQueryBuilder);
                sqlx::query(&insert).execute(&mut *conn).await?;
                Ok(())
            }
            Some(version) if version as u64 != investment.version => {
                Err(StoreError::VersionConflict {
                    id: investment.id,
                    stored: version as u64,
                    submitted: investment.version,
                })
            }
            Some(version) => {
                let update = Query::update()
                    .table(Investments::Table)
                    .value(Investments::Amount, investment.amount.to_string())
                    .value(Investments::Status, investment.status.as_str())
                    .value(
                        Investments::LastSyncedEarnings,
                        investment.last_synced_earnings.to_string(),
                    )
                    .value(Investments::Version, version + 1)
                    .and_where(Expr::col(Investments::Id).eq(investment.id.to_string()))
                    .and_where(Expr::col(Investments::Version).eq(version))
                    .to_string(SqliteQueryBuilder);
                sqlx::query(&update).execute(&mut *conn).await?;
                Ok(())
            }
        }
    }

    /// Open a write transaction.
    ///
    /// BEGIN IMMEDIATE acquires the write lock upfront, preventing
    /// deadlocks when concurrent DEFERRED transactions race to upgrade
    /// from shared to exclusive.
    async fn begin_immediate(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(conn)
    }

    async fn finish(
        mut conn: sqlx::pool::PoolConnection<sqlx::Sqlite>,
        outcome: Result<()>,
    ) -> Result<()> {
        match outcome {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl PlatformStore for SqlitePlatformStore {
    async fn user(&self, id: Uuid) -> Result<User> {
        let sql = Query::select()
            .columns(user_columns())
            .from(Users::Table)
            .and_where(Expr::col(Users::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::UserNotFound(id))?;
        row_to_user(&row)
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let sql = upsert_user_sql(user)?;
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn save_users(&self, users: &[User]) -> Result<()> {
        let mut conn = self.begin_immediate().await?;
        let outcome = Self::save_users_tx(&mut conn, users).await;
        Self::finish(conn, outcome).await
    }

    async fn users(&self) -> Result<Vec<User>> {
        let sql = Query::select()
            .columns(user_columns())
            .from(Users::Table)
            .to_string(SqliteQueryBuilder);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn investment(&self, id: Uuid) -> Result<Investment> {
        let sql = Query::select()
            .column(Asterisk)
            .from(Investments::Table)
            .and_where(Expr::col(Investments::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::InvestmentNotFound(id))?;
        row_to_investment(&row)
    }

    async fn save_investment(&self, investment: &Investment) -> Result<()> {
        let mut conn = self.begin_immediate().await?;
        let outcome = Self::upsert_investment_tx(&mut conn, investment).await;
        Self::finish(conn, outcome).await
    }

    async fn active_investments(&self) -> Result<Vec<Investment>> {
        let sql = Query::select()
            .column(Asterisk)
            .from(Investments::Table)
            .and_where(
                Expr::col(Investments::Status).is_in([
                    InvestmentStatus::Active.as_str(),
                    InvestmentStatus::PendingSale.as_str(),
                ]),
            )
            .to_string(SqliteQueryBuilder);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_investment).collect()
    }

    async fn investments_of(&self, owner: Uuid) -> Result<Vec<Investment>> {
        let sql = Query::select()
            .column(Asterisk)
            .from(Investments::Table)
            .and_where(Expr::col(Investments::Owner).eq(owner.to_string()))
            .to_string(SqliteQueryBuilder);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_investment).collect()
    }

    async fn opportunity(&self, id: Uuid) -> Result<Opportunity> {
        let sql = Query::select()
            .column(Asterisk)
            .from(Opportunities::Table)
            .and_where(Expr::col(Opportunities::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::OpportunityNotFound(id))?;
        row_to_opportunity(&row)
    }

    async fn save_opportunity(&self, opportunity: &Opportunity) -> Result<()> {
        let sql = Query::insert()
            .into_table(Opportunities::Table)
            .columns([
                Opportunities::Id,
                Opportunities::Name,
                Opportunities::BaseRate,
                Opportunities::MinInvestment,
                Opportunities::MaxInvestment,
                Opportunities::DurationWeeks,
                Opportunities::TotalInvested,
                Opportunities::ActiveInvestors,
            ])
            .values_panic([
                opportunity.id.to_string().into(),
                opportunity.name.clone().into(),
                opportunity.base_rate.to_string().into(),
                opportunity.min_investment.to_string().into(),
                opportunity.max_investment.to_string().into(),
                (opportunity.duration_weeks as i64).into(),
                opportunity.total_invested.to_string().into(),
                (opportunity.active_investors as i64).into(),
            ])
            .on_conflict(
                OnConflict::column(Opportunities::Id)
                    .update_columns([
                        Opportunities::Name,
                        Opportunities::BaseRate,
                        Opportunities::MinInvestment,
                        Opportunities::MaxInvestment,
                        Opportunities::DurationWeeks,
                        Opportunities::TotalInvested,
                        Opportunities::ActiveInvestors,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn persist_distribution(&self, investment: &Investment, users: &[User]) -> Result<()> {
        let mut conn = self.begin_immediate().await?;
        let outcome = async {
            Self::upsert_investment_tx(&mut conn, investment).await?;
            Self::save_users_tx(&mut conn, users).await
        }
        .await;
        Self::finish(conn, outcome).await
    }

    async fn persist_deposit(
        &self,
        investment: &Investment,
        users: &[User],
        opportunity: &Opportunity,
    ) -> Result<()> {
        let mut conn = self.begin_immediate().await?;
        let outcome = async {
            Self::upsert_investment_tx(&mut conn, investment).await?;
            Self::save_users_tx(&mut conn, users).await?;

            let sql = Query::update()
                .table(Opportunities::Table)
                .value(
                    Opportunities::TotalInvested,
                    opportunity.total_invested.to_string(),
                )
                .value(
                    Opportunities::ActiveInvestors,
                    opportunity.active_investors as i64,
                )
                .and_where(Expr::col(Opportunities::Id).eq(opportunity.id.to_string()))
                .to_string(SqliteQueryBuilder);
            sqlx::query(&sql).execute(&mut *conn).await?;
            Ok(())
        }
        .await;
        Self::finish(conn, outcome).await
    }

    async fn users_past_deadline(&self, as_of: DateTime<Utc>) -> Result<Vec<User>> {
        // Fixed-width RFC 3339 strings compare lexicographically in
        // chronological order.
        let sql = Query::select()
            .columns(user_columns())
            .from(Users::Table)
            .and_where(Expr::col(Users::BenefitsBlocked).eq(0))
            .and_where(Expr::col(Users::ChallengeDeadline).is_not_null())
            .and_where(Expr::col(Users::ChallengeDeadline).lte(fmt_time(as_of)))
            .to_string(SqliteQueryBuilder);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let users: Result<Vec<User>> = rows.iter().map(row_to_user).collect();
        // Money columns are TEXT; the invested filter happens here.
        Ok(users?
            .into_iter()
            .filter(|user| user.total_invested > Decimal::ZERO)
            .collect())
    }

    async fn direct_downline(&self, sponsor: Uuid) -> Result<Vec<User>> {
        let sql = Query::select()
            .columns(user_columns())
            .from(Users::Table)
            .and_where(Expr::col(Users::ReferredBy).eq(sponsor.to_string()))
            .to_string(SqliteQueryBuilder);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn record_withdrawal(&self, withdrawal: &Withdrawal) -> Result<()> {
        let sql = Query::insert()
            .into_table(Withdrawals::Table)
            .columns([
                Withdrawals::Id,
                Withdrawals::User,
                Withdrawals::Amount,
                Withdrawals::Kind,
                Withdrawals::Status,
                Withdrawals::RequestedAt,
            ])
            .values_panic([
                withdrawal.id.to_string().into(),
                withdrawal.user.to_string().into(),
                withdrawal.amount.to_string().into(),
                withdrawal.kind.as_str().into(),
                withdrawal.status.as_str().into(),
                fmt_time(withdrawal.requested_at).into(),
            ])
            .to_string(SqliteQueryBuilder);
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn withdrawn_gains(&self, user: Uuid) -> Result<Decimal> {
        let sql = Query::select()
            .column(Withdrawals::Amount)
            .from(Withdrawals::Table)
            .and_where(Expr::col(Withdrawals::User).eq(user.to_string()))
            .and_where(Expr::col(Withdrawals::Kind).eq(WithdrawalKind::Gains.as_str()))
            .and_where(Expr::col(Withdrawals::Status).eq(WithdrawalStatus::Completed.as_str()))
            .to_string(SqliteQueryBuilder);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut total = Decimal::ZERO;
        for row in rows {
            total += parse_money(&row.get::<String, _>("amount"))?;
        }
        Ok(total)
    }
}
