//! Entitlement grants - purchase-webhook callbacks mapped to state changes

use chrono::{DateTime, Utc};
use habitforge_core::{
    ActivityKind, EntitlementCatalog, EntitlementOutcome, Error, Result,
};
use habitforge_persistence::sqlite::{activity, ledger, users};
use habitforge_persistence::Database;
use tracing::{debug, info};

/// Apply the grants a purchased product unlocks.
///
/// Keyed by the payment provider's transaction id, so webhook redelivery
/// cannot double-grant. The product-to-grant mapping comes from the
/// caller-supplied catalog.
pub async fn grant_entitlements(
    db: &Database,
    catalog: &EntitlementCatalog,
    user_id: &str,
    product_id: &str,
    transaction_id: &str,
) -> Result<EntitlementOutcome> {
    grant_entitlements_at(db, catalog, user_id, product_id, transaction_id, Utc::now()).await
}

/// `grant_entitlements` against an explicit clock
pub async fn grant_entitlements_at(
    db: &Database,
    catalog: &EntitlementCatalog,
    user_id: &str,
    product_id: &str,
    transaction_id: &str,
    now: DateTime<Utc>,
) -> Result<EntitlementOutcome> {
    let grant = catalog
        .lookup(product_id)
        .ok_or_else(|| Error::InvalidArgument(format!("unknown product: {}", product_id)))?
        .clone();

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    let user = users::fetch_user(&mut *tx, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user: {}", user_id)))?;

    let source = format!("entitlement:{}", product_id);
    let metadata = serde_json::json!({
        "product_id": product_id,
        "transaction_id": transaction_id,
    });

    let inserted =
        ledger::record_action(&mut *tx, transaction_id, user_id, 0, &source, &metadata).await?;
    if !inserted {
        tx.rollback()
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Entitlement transaction {} already processed", transaction_id);
        return Ok(EntitlementOutcome {
            user_id: user.user_id,
            product_id: product_id.to_string(),
            gems_granted: 0,
            grace_passes_granted: 0,
            booster_granted: None,
            booster_expires_at: None,
            already_processed: true,
        });
    }

    if grant.gems != 0 || grant.grace_passes != 0 {
        users::apply_entitlement(&mut *tx, user_id, grant.gems, grant.grace_passes).await?;
    }

    let mut booster_expires_at = None;
    if let Some(kind) = grant.booster {
        let expires_at = now + kind.duration();
        // Latest expiry wins, as with purchased boosters
        let superseded = matches!(
            user.booster,
            Some(current) if !current.is_expired(now) && current.expires_at >= expires_at
        );
        if !superseded {
            users::set_booster(&mut *tx, user_id, kind, expires_at).await?;
        }
        booster_expires_at = Some(expires_at);
    }

    let detail = serde_json::json!({ "product_id": product_id });
    activity::record_activity(&mut *tx, user_id, ActivityKind::EntitlementGranted, &detail)
        .await?;

    tx.commit()
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    info!(
        "Entitlement {} granted to {} (txn {})",
        product_id, user_id, transaction_id
    );

    Ok(EntitlementOutcome {
        user_id: user.user_id,
        product_id: product_id.to_string(),
        gems_granted: grant.gems,
        grace_passes_granted: grant.grace_passes,
        booster_granted: grant.booster,
        booster_expires_at,
        already_processed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use habitforge_core::BoosterType;
    use habitforge_persistence::sqlite::users::create_user;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_grant_applies_catalog_amounts() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();
        let catalog = EntitlementCatalog::default();

        let outcome =
            grant_entitlements_at(&db, &catalog, "u1", "starter_bundle", "txn-1", noon())
                .await
                .unwrap();
        assert_eq!(outcome.gems_granted, 250);
        assert_eq!(outcome.grace_passes_granted, 2);

        let user = users::get_user(db.pool(), "u1").await.unwrap().unwrap();
        assert_eq!(user.gems, 50 + 250);
        assert_eq!(user.grace_passes_available, 1 + 2);
    }

    #[tokio::test]
    async fn test_webhook_redelivery_grants_once() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();
        let catalog = EntitlementCatalog::default();

        grant_entitlements_at(&db, &catalog, "u1", "gems_pouch", "txn-9", noon())
            .await
            .unwrap();
        let replay = grant_entitlements_at(&db, &catalog, "u1", "gems_pouch", "txn-9", noon())
            .await
            .unwrap();

        assert!(replay.already_processed);
        assert_eq!(replay.gems_granted, 0);

        let user = users::get_user(db.pool(), "u1").await.unwrap().unwrap();
        assert_eq!(user.gems, 50 + 150);
    }

    #[tokio::test]
    async fn test_booster_product_installs_booster() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();
        let catalog = EntitlementCatalog::default();

        let outcome =
            grant_entitlements_at(&db, &catalog, "u1", "booster_weekend", "txn-2", noon())
                .await
                .unwrap();
        assert_eq!(outcome.booster_granted, Some(BoosterType::Double));

        let user = users::get_user(db.pool(), "u1").await.unwrap().unwrap();
        assert_eq!(user.booster.unwrap().kind, BoosterType::Double);
        // Entitlement boosters are free of gem cost
        assert_eq!(user.gems, 50);
    }

    #[tokio::test]
    async fn test_unknown_product_is_rejected() {
        let db = Database::connect_in_memory().await.unwrap();
        create_user(db.pool(), "u1", "Ada").await.unwrap();
        let catalog = EntitlementCatalog::default();

        let result =
            grant_entitlements_at(&db, &catalog, "u1", "mystery_box", "txn-3", noon()).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(ledger::get_entry(db.pool(), "txn-3").await.unwrap().is_none());
    }
}
