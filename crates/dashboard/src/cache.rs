use api_client::MarketDataClient;
use api_client::error::ApiError;
use core_types::{PanelKey, PricePanel};
use std::sync::Arc;

/// Holds the result of the most recent fetch.
///
/// Only one entry is kept. Asking for a different key drops it before the
/// new fetch starts, and a failed fetch leaves the cache empty, so the most
/// recent request always wins.
pub struct PanelCache<C> {
    client: C,
    entry: Option<(PanelKey, Arc<PricePanel>)>,
    fetches: usize,
}

impl<C: MarketDataClient> PanelCache<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            entry: None,
            fetches: 0,
        }
    }

    /// Returns the cached panel for `key`, fetching it on a miss.
    pub async fn get_or_fetch(&mut self, key: &PanelKey) -> Result<Arc<PricePanel>, ApiError> {
        if let Some((cached, panel)) = &self.entry {
            if cached == key {
                tracing::debug!("Panel cache hit.");
                return Ok(Arc::clone(panel));
            }
        }

        if self.entry.take().is_some() {
            tracing::info!("Request changed; dropping cached panel.");
        }

        self.fetches += 1;
        let panel = Arc::new(self.client.fetch_panel(key).await?);
        tracing::info!(
            tickers = panel.tickers().len(),
            dates = panel.len(),
            start = %key.start(),
            end = %key.end(),
            "Panel fetched and cached."
        );

        self.entry = Some((key.clone(), Arc::clone(&panel)));
        Ok(panel)
    }

    /// Forgets the cached panel so the next request refetches.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn cached_key(&self) -> Option<&PanelKey> {
        self.entry.as_ref().map(|(key, _)| key)
    }

    /// How many fetches this cache has issued.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use core_types::{PricePoint, PriceSeries};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct FlakyClient {
        fail: AtomicBool,
    }

    #[async_trait]
    impl MarketDataClient for FlakyClient {
        async fn fetch_closes(
            &self,
            ticker: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<PriceSeries, ApiError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::DataUnavailable {
                    ticker: ticker.to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(PriceSeries::new(ticker, vec![PricePoint::new(start, 1.0)])?)
        }
    }

    fn key(start_day: u32) -> PanelKey {
        PanelKey::new(
            ["AAPL", "MSFT"],
            NaiveDate::from_ymd_opt(2024, 1, start_day).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_once_per_key() {
        let mut cache = PanelCache::new(FlakyClient::default());
        let first = cache.get_or_fetch(&key(1)).await.unwrap();
        let second = cache.get_or_fetch(&key(1)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn key_change_replaces_entry() {
        let mut cache = PanelCache::new(FlakyClient::default());
        cache.get_or_fetch(&key(1)).await.unwrap();
        let panel = cache.get_or_fetch(&key(2)).await.unwrap();

        assert_eq!(cache.fetch_count(), 2);
        assert_eq!(cache.cached_key(), Some(&key(2)));
        assert_eq!(panel.dates()[0], NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_empty() {
        let mut cache = PanelCache::new(FlakyClient::default());
        cache.get_or_fetch(&key(1)).await.unwrap();

        cache.client.fail.store(true, Ordering::SeqCst);
        assert!(cache.get_or_fetch(&key(2)).await.is_err());
        assert_eq!(cache.cached_key(), None);

        cache.client.fail.store(false, Ordering::SeqCst);
        cache.get_or_fetch(&key(1)).await.unwrap();
        assert_eq!(cache.fetch_count(), 3);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let mut cache = PanelCache::new(FlakyClient::default());
        cache.get_or_fetch(&key(1)).await.unwrap();
        cache.invalidate();
        cache.get_or_fetch(&key(1)).await.unwrap();
        assert_eq!(cache.fetch_count(), 2);
    }
}
