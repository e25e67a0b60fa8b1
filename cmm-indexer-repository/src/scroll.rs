//! Forward-only read-back over a scroll cursor.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::Stream;
use serde_json::Value;
use tracing::{debug, warn};

use cmm_indexer_shared::StudyOfLanguage;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{Hit, ScrollPage};

/// A lazy sequence over every hit of a query.
///
/// Pages are fetched on demand. The server-side cursor is released as soon
/// as the sequence is drained, on [`ScrollCursor::close`], or in the
/// background when the cursor is dropped early.
pub struct ScrollCursor {
    provider: Arc<dyn SearchIndexProvider>,
    keep_alive: String,
    scroll_id: Option<String>,
    buffer: VecDeque<Hit>,
    exhausted: bool,
}

impl ScrollCursor {
    /// Run `body` against `indices` and position the cursor before the
    /// first hit.
    pub async fn open(
        provider: Arc<dyn SearchIndexProvider>,
        indices: Vec<String>,
        body: Value,
        keep_alive: impl Into<String>,
    ) -> Result<Self, SearchIndexError> {
        let keep_alive = keep_alive.into();
        let page = provider.open_scroll(&indices, &body, &keep_alive).await?;

        let mut cursor = Self {
            provider,
            keep_alive,
            scroll_id: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };
        cursor.accept(page).await;
        Ok(cursor)
    }

    async fn accept(&mut self, page: ScrollPage) {
        if let Some(id) = page.scroll_id {
            self.scroll_id = Some(id);
        }
        if page.hits.is_empty() {
            self.exhausted = true;
            self.release().await;
        }
        self.buffer.extend(page.hits);
    }

    async fn release(&mut self) {
        if let Some(id) = self.scroll_id.take() {
            if let Err(e) = self.provider.clear_scroll(&id).await {
                warn!(error = %e, "Failed to release scroll cursor");
            }
        }
    }

    /// The next raw hit, or `None` once the query is exhausted.
    pub async fn next_hit(&mut self) -> Result<Option<Hit>, SearchIndexError> {
        loop {
            if let Some(hit) = self.buffer.pop_front() {
                return Ok(Some(hit));
            }
            if self.exhausted {
                return Ok(None);
            }
            let Some(id) = self.scroll_id.clone() else {
                self.exhausted = true;
                return Ok(None);
            };
            let page = self.provider.next_scroll(&id, &self.keep_alive).await?;
            debug!(count = page.hits.len(), "Fetched scroll page");
            self.accept(page).await;
        }
    }

    /// The next study document.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(StudyOfLanguage))` - The next document
    /// * `Ok(None)` - Once every hit has been returned
    /// * `Err(SearchIndexError::ParseError)` - If a stored document does not deserialize
    /// * `Err(SearchIndexError)` - If fetching the next page fails
    pub async fn next(&mut self) -> Result<Option<StudyOfLanguage>, SearchIndexError> {
        match self.next_hit().await? {
            Some(hit) => serde_json::from_value(hit.source)
                .map(Some)
                .map_err(|e| SearchIndexError::parse(format!("{}/{}: {}", hit.index, hit.id, e))),
            None => Ok(None),
        }
    }

    /// Read every remaining study.
    pub async fn collect_all(mut self) -> Result<Vec<StudyOfLanguage>, SearchIndexError> {
        let mut studies = Vec::new();
        while let Some(study) = self.next().await? {
            studies.push(study);
        }
        Ok(studies)
    }

    /// Stop reading and release the server-side cursor now.
    pub async fn close(mut self) -> Result<(), SearchIndexError> {
        self.exhausted = true;
        self.buffer.clear();
        match self.scroll_id.take() {
            Some(id) => self.provider.clear_scroll(&id).await,
            None => Ok(()),
        }
    }

    /// Consume the cursor as a stream of studies.
    pub fn into_stream(self) -> impl Stream<Item = Result<StudyOfLanguage, SearchIndexError>> {
        futures::stream::try_unfold(self, |mut cursor| async move {
            let next = cursor.next().await?;
            Ok::<_, SearchIndexError>(next.map(|study| (study, cursor)))
        })
    }
}

impl Drop for ScrollCursor {
    fn drop(&mut self) {
        let Some(id) = self.scroll_id.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let provider = self.provider.clone();
                handle.spawn(async move {
                    if let Err(e) = provider.clear_scroll(&id).await {
                        warn!(error = %e, "Failed to release abandoned scroll cursor");
                    }
                });
            }
            Err(_) => warn!("Scroll cursor dropped outside a runtime, leaving it to expire"),
        }
    }
}
