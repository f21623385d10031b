use chrono::{DateTime, Utc};

use crate::calendar::{
    merge, render_checked, EventRenderer, IcsFile, MergeReport, MergeWindow, StoreFile,
};
use crate::config::Settings;
use crate::fsutil;
use crate::notify::{ChatTransport, DeliveryError, DigestFormatter};
use crate::pipeline::error::RunError;
use crate::pipeline::table::{self, PASS_TABLE_FILE};
use crate::predict::{Normalizer, PredictionSource, RawPassEntry, SatelliteInfo};
use crate::visibility::qualifies;
use crate::weather::{AnnotatedPass, WeatherAnnotator, WeatherCache, WeatherSource, CACHE_FILE};

pub const DIGEST_FILE: &str = "digest.txt";

/// What happened to the chat digest.
#[derive(Debug)]
pub enum Delivery {
    Suppressed,
    Sent,
    Failed(DeliveryError),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub passes: usize,
    pub qualifying: usize,
    pub merge: MergeReport,
    pub digest: String,
    pub delivery: Delivery,
}

/// One batch run over the collaborators it is given.
pub struct Runner<'a, P, W, C> {
    pub settings: &'a Settings,
    pub predictions: &'a P,
    pub weather: &'a W,
    pub chat: Option<&'a C>,
}

impl<P, W, C> Runner<'_, P, W, C>
where
    P: PredictionSource,
    W: WeatherSource,
    C: ChatTransport,
{
    /// Fetch, annotate, filter, merge and publish; then deliver the digest.
    ///
    /// Nothing in the output folder is touched until the prediction source has
    /// answered and the new calendar has been rendered and checked.
    pub async fn run(
        &self,
        satellites: &[SatelliteInfo],
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, RunError> {
        let settings = self.settings;
        let dir = &settings.output.dir;
        let store_file = StoreFile::new(dir);
        let ics_file = IcsFile::new(dir);
        let cache_path = dir.join(CACHE_FILE);

        let store = store_file.load()?;
        log::debug!("Loaded {} events from {}", store.len(), store_file.path().display());
        let cache = WeatherCache::load(&cache_path).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable weather cache {}: {}", cache_path.display(), e);
            WeatherCache::default()
        });

        let raw: Vec<RawPassEntry> = self.predictions.fetch(satellites).await?;
        log::info!("Fetched {} raw pass entries", raw.len());
        let passes = Normalizer::new(&settings.site, self.predictions.display_timezone(), now)
            .normalize_all(&raw);
        let total = passes.len();

        let mut annotator = WeatherAnnotator::new(
            self.weather,
            &settings.site,
            settings.weather_policy,
            now,
            cache,
        );
        let annotated = annotator.annotate_all(passes).await;
        let cache = annotator.into_cache();
        let pass_table = table::render(&annotated, &settings.criteria);

        let qualifying: Vec<AnnotatedPass> = annotated
            .into_iter()
            .filter(|a| qualifies(&a.pass, &settings.criteria))
            .collect();
        log::info!(
            "{} of {} passes qualify ({})",
            qualifying.len(),
            total,
            settings.criteria.describe()
        );

        let renderer = EventRenderer::new(&settings.site);
        let events = qualifying.iter().map(|a| renderer.render(a, now)).collect();
        let (store, report) = merge(store, events, &MergeWindow::new(now, settings.grace));
        if report.changed() {
            log::info!("Calendar merge: {}", report);
        } else {
            log::info!("Calendar unchanged ({} events)", report.unchanged);
        }
        if store.is_empty() {
            log::info!("No upcoming passes in the calendar");
        }

        let ics = render_checked(&store, &settings.output.calendar_name)?;
        store_file.save(&store)?;
        ics_file.write(&ics)?;

        if let Err(e) = cache.save(&cache_path) {
            log::warn!("Failed to save weather cache: {}", e);
        }
        let table_path = dir.join(PASS_TABLE_FILE);
        if let Err(e) = pass_table.and_then(|csv| table::write(&table_path, &csv)) {
            log::warn!("Failed to write {}: {}", PASS_TABLE_FILE, e);
        }

        let digest = DigestFormatter::new(
            &settings.site,
            &settings.criteria,
            settings.output.calendar_url.as_deref(),
        )
        .format(&qualifying, settings.criteria.grouping, now);
        if let Err(e) = fsutil::write_atomic(&dir.join(DIGEST_FILE), digest.as_bytes()) {
            log::warn!("Failed to write {}: {}", DIGEST_FILE, e);
        }

        let delivery = self.deliver(&digest, &ics_file).await;

        Ok(RunOutcome {
            passes: total,
            qualifying: qualifying.len(),
            merge: report,
            digest,
            delivery,
        })
    }

    async fn deliver(&self, digest: &str, ics_file: &IcsFile) -> Delivery {
        let (Some(chat), Some(slack)) = (self.chat, &self.settings.slack) else {
            log::info!("Digest not sent (SEND_NOTICE={})", self.settings.send_notice);
            return Delivery::Suppressed;
        };

        let attachment = ics_file.exists().then(|| ics_file.path());
        match chat.deliver(&slack.channel, digest, attachment).await {
            Ok(()) => Delivery::Sent,
            Err(e) => Delivery::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::predict::{ReplaySource, SourceError};
    use crate::site::Site;
    use crate::weather::{HourlyWeather, WeatherError};
    use chrono::{Duration, TimeZone};
    use chrono_tz::Tz;
    use std::cell::RefCell;
    use std::path::Path;

    struct NoWeather;

    impl WeatherSource for NoWeather {
        async fn forecast(&self, _site: &Site) -> Result<Vec<HourlyWeather>, WeatherError> {
            Err(WeatherError::Status(reqwest::StatusCode::TOO_MANY_REQUESTS))
        }
    }

    struct ClearSky;

    impl WeatherSource for ClearSky {
        async fn forecast(&self, _site: &Site) -> Result<Vec<HourlyWeather>, WeatherError> {
            Ok((0..48)
                .map(|h| HourlyWeather {
                    time: now() + Duration::hours(h),
                    total_cloud_pct: 5.0,
                    low_cloud_pct: 0.0,
                    mid_cloud_pct: 0.0,
                    high_cloud_pct: 5.0,
                    temperature_c: 16.0,
                    wind_speed_ms: 1.5,
                    pictocode: 1,
                })
                .collect())
        }
    }

    struct BrokenSource;

    impl PredictionSource for BrokenSource {
        fn display_timezone(&self) -> Tz {
            Tz::UTC
        }

        async fn fetch(&self, _s: &[SatelliteInfo]) -> Result<Vec<RawPassEntry>, SourceError> {
            Err(SourceError::Unrecognised(25544))
        }
    }

    #[derive(Default)]
    struct RecordingChat {
        fail: bool,
        sent: RefCell<Vec<(String, String, bool)>>,
    }

    impl ChatTransport for RecordingChat {
        async fn deliver(
            &self,
            channel: &str,
            text: &str,
            attachment: Option<&Path>,
        ) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Api {
                    method: "chat.postMessage",
                    error: "not_in_channel".to_string(),
                });
            }
            self.sent
                .borrow_mut()
                .push((channel.to_string(), text.to_string(), attachment.is_some()));
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
    }

    /// 2026-10-17 19:30 JST, evening at the site.
    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 10, 30, 0).unwrap()
    }

    fn settings(dir: &Path, env: &[(&str, &str)]) -> Settings {
        let yaml = format!(
            r#"
site:
  name: KUPT
  coordinates: "33.599, 130.212"
  height_m: 40
  timezone: Asia/Tokyo
output:
  dir: {:?}
slack:
  channel: C0PASSES
"#,
            dir
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        let env: Vec<(String, String)> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config
            .resolve(|key| env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
            .unwrap()
    }

    fn evening_filter() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MIN_ALT", "30"),
            ("MIN_DURATION", "60"),
            ("TIME_WINDOW", "evening"),
        ]
    }

    fn pass_yaml(satellite: &str, start: DateTime<Utc>, altitude: u32) -> String {
        let fmt = |t: DateTime<Utc>| t.to_rfc3339();
        format!(
            "  - satellite: {}\n    start: {{ time: \"{}\", altitude: 10 }}\n    peak: {{ time: \"{}\", altitude: {} }}\n    end: {{ time: \"{}\", altitude: 10 }}\n",
            satellite,
            fmt(start),
            fmt(start + Duration::seconds(120)),
            altitude,
            fmt(start + Duration::seconds(240)),
        )
    }

    fn replay(passes: &[String]) -> ReplaySource {
        ReplaySource::from_str(&format!("entries:\n{}", passes.concat())).unwrap()
    }

    async fn run_with<P: PredictionSource, W: WeatherSource>(
        settings: &Settings,
        predictions: &P,
        weather: &W,
        chat: Option<&RecordingChat>,
    ) -> Result<RunOutcome, RunError> {
        Runner {
            settings,
            predictions,
            weather,
            chat,
        }
        .run(&[], now())
        .await
    }

    #[tokio::test]
    async fn single_evening_iss_pass_becomes_one_event_and_one_digest_line() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), &evening_filter());
        let source = replay(&[pass_yaml("ISS", t(), 45)]);

        let outcome = run_with(&settings, &source, &ClearSky, None).await.unwrap();
        assert_eq!(outcome.qualifying, 1);
        assert_eq!(outcome.merge.added, 1);
        assert!(matches!(outcome.delivery, Delivery::Suppressed));

        let store = StoreFile::new(dir.path()).load().unwrap();
        assert_eq!(store.len(), 1);
        let event = store.get("ISS-20261017T103000Z@satpass").unwrap();
        assert_eq!(event.start, t());
        assert_eq!(event.end, t() + Duration::seconds(240));
        assert!(event.summary.ends_with("ISS"));

        let ics = std::fs::read_to_string(IcsFile::new(dir.path()).path()).unwrap();
        assert!(ics.contains("UID:ISS-20261017T103000Z@satpass"));

        let iss_lines = outcome.digest.lines().filter(|l| l.contains("ISS")).count();
        assert_eq!(iss_lines, 1);
        let saved = std::fs::read_to_string(dir.path().join(DIGEST_FILE)).unwrap();
        assert_eq!(saved, outcome.digest);
    }

    #[tokio::test]
    async fn pass_table_lists_every_pass_not_only_qualifying_ones() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), &evening_filter());
        let source = replay(&[
            pass_yaml("ISS", t(), 45),
            pass_yaml("HST", t() + Duration::hours(1), 20),
        ]);

        let outcome = run_with(&settings, &source, &ClearSky, None).await.unwrap();
        assert_eq!(outcome.passes, 2);
        assert_eq!(outcome.qualifying, 1);

        let csv = std::fs::read_to_string(dir.path().join(PASS_TABLE_FILE)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("satellite,"));
        assert!(lines[1].starts_with("ISS,,2026-10-17T10:30:00Z,"));
        assert!(lines[1].contains(",evening,true,5.0,"));
        assert!(lines[2].starts_with("HST,,"));
        assert!(lines[2].contains(",evening,false,"));
    }

    #[tokio::test]
    async fn failing_weather_still_publishes_with_unknown_weather() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), &evening_filter());
        let source = replay(&[pass_yaml("ISS", t(), 45)]);

        let outcome = run_with(&settings, &source, &NoWeather, None).await.unwrap();
        assert_eq!(outcome.qualifying, 1);
        assert!(!outcome.digest.contains("No passes match the filter"));

        let store = StoreFile::new(dir.path()).load().unwrap();
        let event = store.events().next().unwrap();
        assert_eq!(event.summary, "ISS");
        assert!(event.description.contains("Weather : unknown"));
    }

    #[tokio::test]
    async fn pass_revised_away_is_removed_on_the_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), &evening_filter());
        let hst_start = t() + Duration::days(1);

        let first = replay(&[pass_yaml("ISS", t(), 45), pass_yaml("HST", hst_start, 60)]);
        run_with(&settings, &first, &NoWeather, None).await.unwrap();

        let second = replay(&[pass_yaml("HST", hst_start, 60)]);
        let outcome = run_with(&settings, &second, &NoWeather, None).await.unwrap();
        assert_eq!(outcome.merge.removed, 1);
        assert_eq!(outcome.merge.unchanged, 1);

        let ics = std::fs::read_to_string(IcsFile::new(dir.path()).path()).unwrap();
        assert!(!ics.contains("ISS-20261017T103000Z@satpass"));
        assert!(ics.contains("HST-20261018T103000Z@satpass"));
    }

    #[tokio::test]
    async fn rerun_with_the_same_input_leaves_files_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), &evening_filter());
        let source = replay(&[pass_yaml("ISS", t(), 45)]);

        run_with(&settings, &source, &ClearSky, None).await.unwrap();
        let ics = std::fs::read(IcsFile::new(dir.path()).path()).unwrap();
        let store = std::fs::read(StoreFile::new(dir.path()).path()).unwrap();

        let outcome = run_with(&settings, &source, &ClearSky, None).await.unwrap();
        assert!(!outcome.merge.changed());
        assert_eq!(std::fs::read(IcsFile::new(dir.path()).path()).unwrap(), ics);
        assert_eq!(
            std::fs::read(StoreFile::new(dir.path()).path()).unwrap(),
            store
        );
    }

    #[tokio::test]
    async fn failed_prediction_source_leaves_artifacts_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), &evening_filter());
        run_with(&settings, &replay(&[pass_yaml("ISS", t(), 45)]), &NoWeather, None)
            .await
            .unwrap();
        let ics = std::fs::read(IcsFile::new(dir.path()).path()).unwrap();
        let digest = std::fs::read(dir.path().join(DIGEST_FILE)).unwrap();
        let table = std::fs::read(dir.path().join(PASS_TABLE_FILE)).unwrap();

        let chat = RecordingChat::default();
        let err = run_with(&settings, &BrokenSource, &NoWeather, Some(&chat))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Source(_)));
        assert_eq!(std::fs::read(IcsFile::new(dir.path()).path()).unwrap(), ics);
        assert_eq!(std::fs::read(dir.path().join(DIGEST_FILE)).unwrap(), digest);
        assert_eq!(std::fs::read(dir.path().join(PASS_TABLE_FILE)).unwrap(), table);
        assert!(chat.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn passes_outside_the_filter_are_not_published() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), &evening_filter());
        let low = pass_yaml("ISS", t(), 20);
        let daytime = pass_yaml("CSS", t() - Duration::hours(6), 70);

        let outcome = run_with(&settings, &replay(&[low, daytime]), &NoWeather, None)
            .await
            .unwrap();
        assert_eq!(outcome.passes, 2);
        assert_eq!(outcome.qualifying, 0);
        assert!(outcome.digest.contains("No passes match the filter"));
        let ics = std::fs::read_to_string(IcsFile::new(dir.path()).path()).unwrap();
        assert!(!ics.contains("BEGIN:VEVENT"));
        assert!(StoreFile::new(dir.path()).load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn digest_is_sent_with_the_calendar_attached() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = evening_filter();
        env.extend([("SEND_NOTICE", "send"), ("SLACK_TOKEN", "xoxb-test")]);
        let settings = settings(dir.path(), &env);
        let chat = RecordingChat::default();

        let source = replay(&[pass_yaml("ISS", t(), 45)]);
        let outcome = run_with(&settings, &source, &NoWeather, Some(&chat))
            .await
            .unwrap();
        assert!(matches!(outcome.delivery, Delivery::Sent));
        let sent = chat.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "C0PASSES");
        assert_eq!(sent[0].1, outcome.digest);
        assert!(sent[0].2);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_roll_back_the_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = evening_filter();
        env.extend([("SEND_NOTICE", "send"), ("SLACK_TOKEN", "xoxb-test")]);
        let settings = settings(dir.path(), &env);
        let chat = RecordingChat {
            fail: true,
            ..Default::default()
        };

        let source = replay(&[pass_yaml("ISS", t(), 45)]);
        let outcome = run_with(&settings, &source, &NoWeather, Some(&chat))
            .await
            .unwrap();
        assert!(matches!(outcome.delivery, Delivery::Failed(_)));
        assert_eq!(StoreFile::new(dir.path()).load().unwrap().len(), 1);
        assert!(IcsFile::new(dir.path()).path().exists());
    }
}
