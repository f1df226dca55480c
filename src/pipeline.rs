use indicatif::ProgressBar;
use tracing::info;

use crate::aggregate::Aggregator;
use crate::document::Document;
use crate::error::Result;
use crate::session::SessionAcquirer;
use crate::sources::SourceProfile;
use crate::transport::Transport;
use crate::validate;

/// Session → sections → validation for one case. Returns a validated
/// document, or the error that stopped the run.
pub async fn scrape(
    identifier: &str,
    profile: &SourceProfile,
    transport: &dyn Transport,
    progress: ProgressBar,
) -> Result<Document> {
    info!("Scraping {} from {}", identifier, profile.name);

    let prefetched = match &profile.gate {
        Some(gate) => {
            let target = profile.target_url(identifier)?;
            let acquirer = SessionAcquirer::new(transport, gate, &profile.base_url);
            Some(acquirer.acquire(identifier, &target).await?)
        }
        None => None,
    };

    let mut document = Aggregator::new(transport, profile)
        .with_progress(progress)
        .run(identifier, prefetched)
        .await?;
    validate::annotate(&mut document);

    info!(
        "Finished {}: valid={} warnings={}",
        identifier,
        document.metadata.validation.is_valid,
        document.metadata.warnings.len()
    );
    Ok(document)
}
