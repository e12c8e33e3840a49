//! Background worker that persists queued click events.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use super::services::ClickRecorder;
use crate::domain::click_event::ClickEvent;
use crate::domain::entities::NewClick;
use crate::domain::repositories::{ClickRepository, UrlRepository};
use crate::infrastructure::enrichment::ClickEnricher;

/// Default number of clicks recorded concurrently.
pub const DEFAULT_WORKER_CONCURRENCY: usize = 4;

/// Consumes click events until every sender is dropped.
///
/// Each event is enriched, persisted through [`ClickRecorder::record`] and,
/// when the click carries an IP address, checked against the unique-visitor
/// set. At most `concurrency` events are in flight at once. Failures are
/// logged and never reach the redirect path.
///
/// Once the channel closes the worker drains what is left in the queue and
/// waits for in-flight recordings before returning.
pub async fn run_click_worker<U, C>(
    mut rx: mpsc::Receiver<ClickEvent>,
    recorder: Arc<ClickRecorder<U, C>>,
    enricher: Arc<dyn ClickEnricher>,
    concurrency: usize,
) where
    U: UrlRepository + 'static,
    C: ClickRepository + 'static,
{
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    tracing::info!(concurrency, "Click worker started");

    while let Some(event) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        while in_flight.try_join_next().is_some() {}

        let recorder = recorder.clone();
        let enricher = enricher.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            process_click(recorder.as_ref(), enricher.as_ref(), event).await;
        });
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Click task panicked");
        }
    }

    tracing::info!("Click worker stopped");
}

async fn process_click<U, C>(
    recorder: &ClickRecorder<U, C>,
    enricher: &dyn ClickEnricher,
    event: ClickEvent,
) where
    U: UrlRepository,
    C: ClickRepository,
{
    let enrichment = enricher.enrich(&event.metadata).await;
    let ip = event.metadata.ip_address.clone();
    let short_url_id = event.short_url_id;

    let new_click = NewClick {
        short_url_id,
        metadata: event.metadata,
        enrichment,
        clicked_at: event.clicked_at,
    };

    if let Err(e) = recorder.record(new_click).await {
        tracing::error!(
            short_url_id,
            code = %event.code,
            error = %e,
            "Failed to record click"
        );
        return;
    }

    if let Some(ip) = ip {
        let unique = recorder.mark_unique_if_new(short_url_id, &ip).await;
        tracing::debug!(short_url_id, unique, "Click processed");
    }
}
