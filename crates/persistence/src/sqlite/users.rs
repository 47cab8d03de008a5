//! User progression persistence

use chrono::{DateTime, NaiveDate, Utc};
use habitforge_core::{
    ActiveBooster, BoosterType, Error, LeaderboardEntry, League, LeagueMember, Result, Timeframe,
    UserProgression, STARTER_GEMS, STARTER_GRACE_PASSES, XP_PER_LEVEL,
};
use sqlx::{SqliteConnection, SqlitePool};

/// Database row for a user progression record
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    user_id: String,
    name: String,
    xp: i64,
    weekly_xp: i64,
    lifetime_xp: i64,
    level: i64,
    gems: i64,
    streak: i64,
    last_active_date: Option<NaiveDate>,
    total_days_studied: i64,
    grace_passes_available: i64,
    grace_passes_used: i64,
    league: i64,
    league_position: Option<i64>,
    morning_bonus_date: Option<NaiveDate>,
    has_streak_bonus: i64,
    booster_type: Option<String>,
    booster_expires_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for UserProgression {
    fn from(row: UserRow) -> Self {
        let booster = match (
            row.booster_type.as_deref().and_then(BoosterType::parse),
            row.booster_expires_at,
        ) {
            (Some(kind), Some(expires_at)) => Some(ActiveBooster { kind, expires_at }),
            _ => None,
        };

        UserProgression {
            user_id: row.user_id,
            name: row.name,
            xp: row.xp,
            weekly_xp: row.weekly_xp,
            lifetime_xp: row.lifetime_xp,
            level: row.level,
            gems: row.gems,
            streak: row.streak,
            last_active_date: row.last_active_date,
            total_days_studied: row.total_days_studied,
            grace_passes_available: row.grace_passes_available,
            grace_passes_used: row.grace_passes_used,
            league: League::from_ordinal(row.league).unwrap_or(League::Bronze),
            league_position: row.league_position,
            morning_bonus_date: row.morning_bonus_date,
            has_streak_bonus: row.has_streak_bonus != 0,
            booster,
            created_at: row.created_at,
        }
    }
}

const SELECT_USER: &str = r#"
    SELECT user_id, name, xp, weekly_xp, lifetime_xp, level, gems, streak,
           last_active_date, total_days_studied,
           grace_passes_available, grace_passes_used,
           league, league_position, morning_bonus_date, has_streak_bonus,
           booster_type, booster_expires_at, created_at
    FROM users
"#;

/// Create a user progression record with starter defaults
pub async fn create_user(pool: &SqlitePool, user_id: &str, name: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (user_id, name, gems, grace_passes_available)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(STARTER_GEMS)
    .bind(STARTER_GRACE_PASSES)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(format!("user already exists: {}", user_id)));
    }
    Ok(())
}

/// Get a user by id (pool-level read)
pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserProgression>> {
    let sql = format!("{} WHERE user_id = ?", SELECT_USER);
    let row: Option<UserRow> = sqlx::query_as(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row.map(UserProgression::from))
}

/// Get a user by id inside an open transaction
pub async fn fetch_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<UserProgression>> {
    let sql = format!("{} WHERE user_id = ?", SELECT_USER);
    let row: Option<UserRow> = sqlx::query_as(&sql)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row.map(UserProgression::from))
}

/// Apply one XP award as atomic increments.
///
/// Level is recomputed in SQL from the pre-update `lifetime_xp`, so the
/// statement stays a pure increment even under concurrent awards for the
/// same user. Morning/streak-bonus consumption rides in the same statement
/// so the whole award is one write.
pub async fn apply_xp_award(
    conn: &mut SqliteConnection,
    user_id: &str,
    amount: i64,
    gems: i64,
    morning_consumed_on: Option<NaiveDate>,
    consume_streak_bonus: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            xp = xp + ?,
            weekly_xp = weekly_xp + ?,
            lifetime_xp = lifetime_xp + ?,
            level = ((lifetime_xp + ?) / ?) + 1,
            gems = gems + ?,
            morning_bonus_date = CASE WHEN ? THEN ? ELSE morning_bonus_date END,
            has_streak_bonus = CASE WHEN ? THEN 0 ELSE has_streak_bonus END
        WHERE user_id = ?
        "#,
    )
    .bind(amount)
    .bind(amount)
    .bind(amount)
    .bind(amount)
    .bind(XP_PER_LEVEL)
    .bind(gems)
    .bind(morning_consumed_on.is_some())
    .bind(morning_consumed_on)
    .bind(consume_streak_bonus)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(())
}

/// Set the streak state after a daily-activity evaluation
pub async fn update_streak(
    conn: &mut SqliteConnection,
    user_id: &str,
    streak: i64,
    last_active_date: NaiveDate,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            streak = ?,
            last_active_date = ?,
            total_days_studied = total_days_studied + 1
        WHERE user_id = ?
        "#,
    )
    .bind(streak)
    .bind(last_active_date)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(())
}

/// Arm the one-shot streak bonus flag
pub async fn set_streak_bonus(conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
    sqlx::query("UPDATE users SET has_streak_bonus = 1 WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(())
}

/// Consume one grace pass; restores a dead streak to 1.
///
/// The `grace_passes_available > 0` guard keeps the counter non-negative
/// even if two redemptions race past the application-level check.
pub async fn consume_grace_pass(conn: &mut SqliteConnection, user_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            grace_passes_available = grace_passes_available - 1,
            grace_passes_used = grace_passes_used + 1,
            streak = CASE WHEN streak = 0 THEN 1 ELSE streak END
        WHERE user_id = ? AND grace_passes_available > 0
        "#,
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

/// Debit gems, refusing to go negative
pub async fn spend_gems(conn: &mut SqliteConnection, user_id: &str, amount: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET gems = gems - ? WHERE user_id = ? AND gems >= ?")
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}

/// Install a booster on the user's single booster slot
pub async fn set_booster(
    conn: &mut SqliteConnection,
    user_id: &str,
    kind: BoosterType,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE users SET booster_type = ?, booster_expires_at = ? WHERE user_id = ?")
        .bind(kind.as_str())
        .bind(expires_at)
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(())
}

/// Credit purchased entitlements (gems and/or grace passes)
pub async fn apply_entitlement(
    conn: &mut SqliteConnection,
    user_id: &str,
    gems: i64,
    grace_passes: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            gems = gems + ?,
            grace_passes_available = grace_passes_available + ?
        WHERE user_id = ?
        "#,
    )
    .bind(gems)
    .bind(grace_passes)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(())
}

/// Load every user's weekly standing for the ranking pass
pub async fn list_league_members(conn: &mut SqliteConnection) -> Result<Vec<LeagueMember>> {
    let rows: Vec<(String, String, i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT user_id, name, weekly_xp, lifetime_xp, league
        FROM users
        ORDER BY league DESC, weekly_xp DESC, lifetime_xp DESC
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|(user_id, name, weekly_xp, lifetime_xp, league)| LeagueMember {
            user_id,
            name,
            weekly_xp,
            lifetime_xp,
            league: League::from_ordinal(league).unwrap_or(League::Bronze),
        })
        .collect())
}

/// Apply one ranking decision: new league, position, weekly counters reset
pub async fn apply_rank_decision(
    conn: &mut SqliteConnection,
    user_id: &str,
    league: League,
    position: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            league = ?,
            league_position = ?,
            weekly_xp = 0,
            morning_bonus_date = NULL
        WHERE user_id = ?
        "#,
    )
    .bind(league.ordinal())
    .bind(position)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(())
}

/// Leaderboard read: league always dominates raw score
pub async fn leaderboard(
    pool: &SqlitePool,
    league: Option<League>,
    timeframe: Timeframe,
    limit: u32,
) -> Result<Vec<LeaderboardEntry>> {
    let score_col = match timeframe {
        Timeframe::Weekly => "weekly_xp",
        Timeframe::AllTime => "lifetime_xp",
    };

    let mut sql = format!(
        "SELECT user_id, name, league, {} AS score, level, streak FROM users",
        score_col
    );
    if league.is_some() {
        sql.push_str(" WHERE league = ?");
    }
    sql.push_str(" ORDER BY league DESC, score DESC, lifetime_xp DESC LIMIT ?");

    let mut builder = sqlx::query_as::<_, (String, String, i64, i64, i64, i64)>(&sql);
    if let Some(league) = league {
        builder = builder.bind(league.ordinal());
    }

    let rows = builder
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(
            |(user_id, name, league, score, level, streak)| LeaderboardEntry {
                user_id,
                name,
                league: League::from_ordinal(league).unwrap_or(League::Bronze),
                score,
                level,
                streak,
            },
        )
        .collect())
}
