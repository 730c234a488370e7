//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query
//! building. Money columns are TEXT holding exact decimal renderings;
//! timestamps are RFC 3339 TEXT.

use sea_query::Iden;

/// Users table schema.
#[derive(Iden)]
pub enum Users {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "level"]
    Level,
    #[iden = "balance"]
    Balance,
    #[iden = "total_commissions"]
    TotalCommissions,
    #[iden = "bonus_parrainage"]
    BonusParrainage,
    #[iden = "total_invested"]
    TotalInvested,
    #[iden = "total_benefits"]
    TotalBenefits,
    #[iden = "forfeited_earnings"]
    ForfeitedEarnings,
    #[iden = "benefits_blocked"]
    BenefitsBlocked,
    #[iden = "challenge_started_at"]
    ChallengeStartedAt,
    #[iden = "challenge_deadline"]
    ChallengeDeadline,
    #[iden = "challenge_target"]
    ChallengeTarget,
    #[iden = "challenge_cagnotte"]
    ChallengeCagnotte,
    #[iden = "challenge_qualifying_deposit"]
    ChallengeQualifyingDeposit,
    #[iden = "referred_by"]
    ReferredBy,
    #[iden = "referrals"]
    Referrals,
}

/// Investments table schema.
#[derive(Iden)]
pub enum Investments {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "owner"]
    Owner,
    #[iden = "opportunity"]
    Opportunity,
    #[iden = "amount"]
    Amount,
    #[iden = "base_rate"]
    BaseRate,
    #[iden = "weekly_rate"]
    WeeklyRate,
    #[iden = "max_weeks"]
    MaxWeeks,
    #[iden = "start_date"]
    StartDate,
    #[iden = "end_date"]
    EndDate,
    #[iden = "status"]
    Status,
    #[iden = "last_synced_earnings"]
    LastSyncedEarnings,
    #[iden = "version"]
    Version,
}

/// Opportunities table schema.
#[derive(Iden)]
pub enum Opportunities {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "base_rate"]
    BaseRate,
    #[iden = "min_investment"]
    MinInvestment,
    #[iden = "max_investment"]
    MaxInvestment,
    #[iden = "duration_weeks"]
    DurationWeeks,
    #[iden = "total_invested"]
    TotalInvested,
    #[iden = "active_investors"]
    ActiveInvestors,
}

/// Withdrawals table schema.
#[derive(Iden)]
pub enum Withdrawals {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "user"]
    User,
    #[iden = "amount"]
    Amount,
    #[iden = "kind"]
    Kind,
    #[iden = "status"]
    Status,
    #[iden = "requested_at"]
    RequestedAt,
}

/// SQL for creating the users table.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    level INTEGER NOT NULL,
    balance TEXT NOT NULL,
    total_commissions TEXT NOT NULL,
    bonus_parrainage TEXT NOT NULL,
    total_invested TEXT NOT NULL,
    total_benefits TEXT NOT NULL,
    forfeited_earnings TEXT NOT NULL,
    benefits_blocked INTEGER NOT NULL DEFAULT 0,
    challenge_started_at TEXT,
    challenge_deadline TEXT,
    challenge_target TEXT,
    challenge_cagnotte TEXT,
    challenge_qualifying_deposit TEXT,
    referred_by TEXT,
    referrals TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_users_referred_by ON users(referred_by);
CREATE INDEX IF NOT EXISTS idx_users_challenge_deadline ON users(challenge_deadline);
"#;

/// SQL for creating the investments table.
pub const CREATE_INVESTMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS investments (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    opportunity TEXT NOT NULL,
    amount TEXT NOT NULL,
    base_rate TEXT NOT NULL,
    weekly_rate TEXT NOT NULL,
    max_weeks INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    status TEXT NOT NULL,
    last_synced_earnings TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_investments_owner ON investments(owner);
CREATE INDEX IF NOT EXISTS idx_investments_status ON investments(status);
"#;

/// SQL for creating the opportunities table.
pub const CREATE_OPPORTUNITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS opportunities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    base_rate TEXT NOT NULL,
    min_investment TEXT NOT NULL,
    max_investment TEXT NOT NULL,
    duration_weeks INTEGER NOT NULL,
    total_invested TEXT NOT NULL,
    active_investors INTEGER NOT NULL DEFAULT 0
);
"#;

/// SQL for creating the withdrawals table.
pub const CREATE_WITHDRAWALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS withdrawals (
    id TEXT PRIMARY KEY,
    user TEXT NOT NULL,
    amount TEXT NOT NULL,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    requested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_withdrawals_user ON withdrawals(user);
"#;
