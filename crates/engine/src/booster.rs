//! Booster/gift subsystem - time-limited XP multipliers

use chrono::{DateTime, Utc};
use habitforge_core::{ActivityKind, BoosterOutcome, BoosterType, Error, Result};
use habitforge_persistence::sqlite::{activity, ledger, users};
use habitforge_persistence::Database;
use tracing::{debug, info};

/// Purchase a booster for yourself or gift one to another user.
///
/// `giver_id` pays the gem cost; `target_user_id` receives the booster.
/// Idempotent via the ledger. A gift (giver != target) records a social
/// activity on the giver's feed. The target's single booster slot follows
/// latest-expiry-wins: a shorter-lived grant never displaces a booster
/// that outlives it.
pub async fn grant_booster(
    db: &Database,
    giver_id: &str,
    target_user_id: &str,
    booster_type: &str,
    action_id: &str,
) -> Result<BoosterOutcome> {
    grant_booster_at(db, giver_id, target_user_id, booster_type, action_id, Utc::now()).await
}

/// `grant_booster` against an explicit clock
pub async fn grant_booster_at(
    db: &Database,
    giver_id: &str,
    target_user_id: &str,
    booster_type: &str,
    action_id: &str,
    now: DateTime<Utc>,
) -> Result<BoosterOutcome> {
    let kind = BoosterType::parse(booster_type).ok_or_else(|| {
        Error::InvalidArgument(format!("unknown booster type: {}", booster_type))
    })?;

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    let giver = users::fetch_user(&mut *tx, giver_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user: {}", giver_id)))?;

    let target = if giver_id == target_user_id {
        giver.clone()
    } else {
        users::fetch_user(&mut *tx, target_user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user: {}", target_user_id)))?
    };

    let cost = kind.cost_gems();
    if giver.gems < cost {
        return Err(Error::InsufficientResource(format!(
            "booster costs {} gems, {} has {}",
            cost, giver_id, giver.gems
        )));
    }

    let expires_at = now + kind.duration();
    let is_gift = giver_id != target_user_id;
    let metadata = serde_json::json!({
        "target": target_user_id,
        "booster": kind.as_str(),
        "gifted": is_gift,
    });
    let source = format!("booster_gift:{}", kind.as_str());

    let inserted =
        ledger::record_action(&mut *tx, action_id, giver_id, 0, &source, &metadata).await?;
    if !inserted {
        tx.rollback()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Booster action {} already processed", action_id);
        return Ok(BoosterOutcome {
            target_user_id: target.user_id,
            booster: kind,
            expires_at,
            gems_spent: 0,
            already_processed: true,
        });
    }

    let paid = users::spend_gems(&mut *tx, giver_id, cost).await?;
    if !paid {
        return Err(Error::InsufficientResource(format!(
            "booster costs {} gems, {} has {}",
            cost, giver_id, giver.gems
        )));
    }

    // Latest expiry wins: only install over an expired or shorter booster
    let superseded = matches!(
        target.booster,
        Some(current) if !current.is_expired(now) && current.expires_at >= expires_at
    );
    if !superseded {
        users::set_booster(&mut *tx, target_user_id, kind, expires_at).await?;
    }

    if is_gift {
        let detail = serde_json::json!({ "to": target_user_id, "booster": kind.as_str() });
        activity::record_activity(&mut *tx, giver_id, ActivityKind::BoosterGifted, &detail)
            .await?;
    }

    tx.commit()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    info!(
        "Booster {} granted to {} by {} (expires {})",
        kind, target_user_id, giver_id, expires_at
    );

    Ok(BoosterOutcome {
        target_user_id: target.user_id,
        booster: kind,
        expires_at,
        gems_spent: cost,
        already_processed: false,
    })
}
