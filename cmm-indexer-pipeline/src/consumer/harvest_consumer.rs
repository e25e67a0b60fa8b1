//! Harvest consumer implementation.
//!
//! Discovers the record headers of a repository, harvests them with bounded
//! concurrency and forwards the resulting studies to the pipeline.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, instrument, warn};

use cmm_indexer_harvest::StudyHarvester;
use cmm_indexer_shared::Repository;

use crate::consumer::messages::HarvestMessage;
use crate::errors::PipelineError;

/// Configuration for the harvest consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Number of records retrieved in parallel within one repository.
    pub concurrency: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

/// Harvest consumer for one repository at a time.
#[derive(Clone)]
pub struct HarvestConsumer {
    harvester: StudyHarvester,
    config: ConsumerConfig,
}

impl HarvestConsumer {
    /// Create a new consumer with default configuration.
    pub fn new(harvester: StudyHarvester) -> Self {
        Self::with_config(harvester, ConsumerConfig::default())
    }

    /// Create a new consumer with custom configuration.
    pub fn with_config(harvester: StudyHarvester, config: ConsumerConfig) -> Self {
        Self { harvester, config }
    }

    /// Harvest `repo` and send every study through the channel.
    ///
    /// Discovery is sequential; retrieval of the discovered headers runs with
    /// the configured concurrency, so studies arrive in completion order.
    /// A record that fails is reported and skipped. The shutdown signal is
    /// checked between records.
    ///
    /// # Arguments
    ///
    /// * `repo` - The repository to harvest
    /// * `since` - Optional discovery watermark
    /// * `sender` - Channel to send messages to
    /// * `shutdown` - Shutdown signal receiver
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every discovered header was processed
    /// * `Err(PipelineError::HarvestError)` - If discovery failed
    /// * `Err(PipelineError::Cancelled)` - If the shutdown signal arrived first
    /// * `Err(PipelineError::ChannelError)` - If the receiving side went away
    #[instrument(skip(self, repo, since, sender, shutdown), fields(repository = %repo.code))]
    pub async fn run(
        &self,
        repo: &Repository,
        since: Option<DateTime<Utc>>,
        sender: mpsc::Sender<HarvestMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let discovered = tokio::select! {
            Ok(()) = shutdown.recv() => {
                info!("Consumer received shutdown signal during discovery");
                let _ = sender.send(HarvestMessage::End).await;
                return Err(PipelineError::Cancelled);
            }
            result = self.harvester.discover(repo, since) => result,
        };

        let headers = match discovered {
            Ok(headers) => headers,
            Err(e) => {
                error!(error = %e, "Discovery failed");
                let _ = sender
                    .send(HarvestMessage::repository_error(e.to_string()))
                    .await;
                let _ = sender.send(HarvestMessage::End).await;
                return Err(e.into());
            }
        };

        Self::send(&sender, HarvestMessage::Discovered { count: headers.len() }).await?;

        let harvester = &self.harvester;
        let mut studies = stream::iter(headers.iter())
            .map(|header| async move { (header, harvester.harvest(repo, header).await) })
            .buffer_unordered(self.config.concurrency.max(1))
            .boxed();

        loop {
            tokio::select! {
                biased;
                Ok(()) = shutdown.recv() => {
                    warn!("Consumer received shutdown signal, stopping harvest");
                    let _ = sender.send(HarvestMessage::End).await;
                    return Err(PipelineError::Cancelled);
                }
                next = studies.next() => {
                    match next {
                        Some((_, Ok(study))) => {
                            Self::send(&sender, HarvestMessage::study(study)).await?;
                        }
                        Some((header, Err(e))) => {
                            warn!(identifier = %header.identifier, error = %e, "Failed to harvest record");
                            Self::send(
                                &sender,
                                HarvestMessage::record_error(&header.identifier, e.to_string()),
                            )
                            .await?;
                        }
                        None => {
                            info!(count = headers.len(), "Harvest stream ended");
                            Self::send(&sender, HarvestMessage::End).await?;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn send(
        sender: &mpsc::Sender<HarvestMessage>,
        message: HarvestMessage,
    ) -> Result<(), PipelineError> {
        sender
            .send(message)
            .await
            .map_err(|e| PipelineError::channel(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{header_page, record, staged_repo, StagedSource};
    use cmm_indexer_harvest::{CmmStudyMapper, OaiRequest};
    use std::sync::Arc;

    fn consumer(source: Arc<StagedSource>) -> HarvestConsumer {
        HarvestConsumer::new(StudyHarvester::new(source, CmmStudyMapper::default()))
    }

    async fn drain(mut rx: mpsc::Receiver<HarvestMessage>) -> Vec<HarvestMessage> {
        let mut messages = Vec::new();
        while let Some(msg) = rx.recv().await {
            let end = matches!(msg, HarvestMessage::End);
            messages.push(msg);
            if end {
                break;
            }
        }
        messages
    }

    #[tokio::test]
    async fn test_streams_studies_and_failures() {
        let source = Arc::new(
            StagedSource::new()
                .with(
                    "FSD",
                    OaiRequest::list_identifiers(),
                    header_page(&[
                        ("1", "2018-02-21", false),
                        ("2", "2018-02-21", false),
                        ("3", "2018-02-21", true),
                    ]),
                )
                .with("FSD", OaiRequest::get_record("1"), record("1", "Title", "Abstract")),
        );
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        consumer(source.clone())
            .run(&staged_repo("FSD"), None, tx, shutdown_rx)
            .await
            .unwrap();

        let messages = drain(rx).await;
        assert!(matches!(messages[0], HarvestMessage::Discovered { count: 3 }));

        let studies: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                HarvestMessage::Study(study) => Some(study.study_number.clone()),
                _ => None,
            })
            .collect();
        let failures: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                HarvestMessage::Error { identifier, .. } => identifier.clone(),
                _ => None,
            })
            .collect();

        assert_eq!(studies.len(), 2);
        assert!(studies.contains(&"1".to_string()));
        // Tombstone synthesized without retrieval
        assert!(studies.contains(&"3".to_string()));
        assert_eq!(failures, vec!["2".to_string()]);
        assert!(matches!(messages.last(), Some(HarvestMessage::End)));

        let requests = source.requests.lock().unwrap();
        assert!(!requests.contains(&("FSD".to_string(), OaiRequest::get_record("3"))));
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_discovery_failure_ends_repository() {
        let source = Arc::new(StagedSource::new().with(
            "FSD",
            OaiRequest::list_identifiers(),
            r#"<OAI-PMH><error code="noRecordsMatch">empty</error></OAI-PMH>"#,
        ));
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let err = consumer(source)
            .run(&staged_repo("FSD"), None, tx, shutdown_rx)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::HarvestError(_)));

        let messages = drain(rx).await;
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            &messages[0],
            HarvestMessage::Error { identifier: None, message } if message.contains("noRecordsMatch")
        ));
    }

    #[tokio::test]
    async fn test_shutdown_stops_harvest() {
        let source = Arc::new(
            StagedSource::new()
                .with(
                    "FSD",
                    OaiRequest::list_identifiers(),
                    header_page(&[("1", "2018-02-21", false)]),
                )
                .hanging("FSD"),
        );
        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            consumer(source)
                .run(&staged_repo("FSD"), None, tx, shutdown_rx)
                .await
        });

        let messages = tokio::spawn(drain(rx));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(PipelineError::Cancelled)));

        let messages = messages.await.unwrap();
        assert!(matches!(messages[0], HarvestMessage::Discovered { count: 1 }));
        assert!(matches!(messages.last(), Some(HarvestMessage::End)));
    }
}
