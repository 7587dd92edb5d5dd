use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use trackhub_backend::InMemoryBackend;
use trackhub_client::{AppConfig, AppContext, SyncPhase};
use trackhub_inventory::{format_brl, format_date_br};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    trackhub_observability::init();

    let config = AppConfig::from_env().context("invalid TRACKHUB_* configuration")?;
    let backend = Arc::new(InMemoryBackend::new());
    let app = AppContext::start(&config, backend);

    let state = app
        .inventory()
        .watch()
        .wait_for(|s| !s.loading)
        .await
        .context("inventory store stopped before its first update")?
        .clone();

    if let SyncPhase::Failed(err) = &state.phase {
        anyhow::bail!("inventory subscription failed: {err}");
    }

    if state.phase == SyncPhase::Synced && state.items.is_empty() {
        let ids = app
            .inventory()
            .generate_sample_data()
            .await
            .context("failed to seed sample data")?;
        app.inventory()
            .watch()
            .wait_for(|s| s.items.len() >= ids.len())
            .await
            .context("inventory store stopped while seeding")?;
    }

    let today = Utc::now().date_naive();
    for item in app.inventory().items().iter() {
        tracing::info!(
            item = item.name(),
            batch = item.batch().unwrap_or("-"),
            expiry = %item.expiry().map(format_date_br).unwrap_or_else(|| "-".into()),
            quantity = item.quantity(),
            unit_cost = %format_brl(item.unit_cost()),
            total = %format_brl(item.total_cost()),
            classification = item.classification().as_str(),
            item_type = item.item_type().as_str(),
            low_stock = item.is_low_stock(),
            near_expiry = item.is_near_expiry(today),
            "stock record"
        );
    }

    let summary = app.inventory().summary(today);
    tracing::info!(
        path = %app.inventory().path(),
        items = summary.item_count,
        units = summary.total_units,
        value = %format_brl(summary.total_value),
        low_stock = summary.low_stock,
        near_expiry = summary.near_expiry,
        expired = summary.expired,
        controlled = summary.controlled,
        "inventory summary"
    );

    for toast in app.notifications().visible() {
        tracing::info!(id = %toast.id, kind = ?toast.kind, message = %toast.message, "notification");
    }

    app.shutdown().await;
    Ok(())
}
