use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::predict::PassRecord;
use crate::site::Site;
use crate::weather::cache::WeatherCache;
use crate::weather::source::WeatherSource;
use crate::weather::types::{AnnotatedPass, HourlyWeather, WeatherAnnotation, WeatherPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchState {
    NotTried,
    Fetched,
    Failed,
}

/// Attaches forecasts to passes, calling the weather source at most once per run.
pub struct WeatherAnnotator<'a, S> {
    source: &'a S,
    site: &'a Site,
    policy: WeatherPolicy,
    now: DateTime<Utc>,
    cache: WeatherCache,
    state: FetchState,
}

impl<'a, S: WeatherSource> WeatherAnnotator<'a, S> {
    pub fn new(
        source: &'a S,
        site: &'a Site,
        policy: WeatherPolicy,
        now: DateTime<Utc>,
        mut cache: WeatherCache,
    ) -> Self {
        cache.prune(now.date_naive());
        if cache.is_empty() {
            log::debug!("No cached forecast for today or later");
        }
        Self {
            source,
            site,
            policy,
            now,
            cache,
            state: FetchState::NotTried,
        }
    }

    pub async fn annotate(&mut self, pass: PassRecord) -> AnnotatedPass {
        let at = pass.start.time;
        let date = at.date_naive();

        if self.usable(date).is_none() && self.state == FetchState::NotTried {
            self.refresh().await;
        }

        let weather = self
            .usable(date)
            .and_then(|a| a.hour_of(at))
            .cloned();
        if weather.is_none() && self.state != FetchState::Failed {
            log::debug!("No forecast hour for {} at {}", pass.satellite, at);
        }
        AnnotatedPass { pass, weather }
    }

    pub async fn annotate_all(&mut self, passes: Vec<PassRecord>) -> Vec<AnnotatedPass> {
        let mut annotated = Vec::with_capacity(passes.len());
        for pass in passes {
            annotated.push(self.annotate(pass).await);
        }
        let known = annotated.iter().filter(|a| a.weather.is_some()).count();
        log::info!(
            "Weather known for {} of {} passes",
            known,
            annotated.len()
        );
        annotated
    }

    /// The cache after this run, to be saved by the caller.
    pub fn into_cache(self) -> WeatherCache {
        self.cache
    }

    /// Cached annotation for `date` that the policy allows this run to use.
    fn usable(&self, date: NaiveDate) -> Option<&WeatherAnnotation> {
        let annotation = self.cache.get(date)?;
        let fresh = match self.policy {
            WeatherPolicy::Force => annotation.fetched_at == self.now,
            WeatherPolicy::Daily => annotation.fetched_at.date_naive() == self.now.date_naive(),
        };
        fresh.then_some(annotation)
    }

    async fn refresh(&mut self) {
        match self.source.forecast(self.site).await {
            Ok(hours) => {
                let mut by_date: BTreeMap<NaiveDate, Vec<HourlyWeather>> = BTreeMap::new();
                for hour in hours {
                    by_date.entry(hour.time.date_naive()).or_default().push(hour);
                }
                log::info!("Forecast covers {} dates", by_date.len());
                for (date, hours) in by_date {
                    self.cache.insert(WeatherAnnotation {
                        date,
                        fetched_at: self.now,
                        hours,
                    });
                }
                self.cache.prune(self.now.date_naive());
                self.state = FetchState::Fetched;
            }
            Err(e) => {
                log::warn!("Weather source degraded, weather will be unknown: {}", e);
                self.state = FetchState::Failed;
            }
        }
    }
}
