mod error;
mod runner;
mod table;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::notify::Slack;
use crate::predict::{Catalog, HeavensAbove, ReplaySource};
use crate::weather::Meteoblue;

pub use error::RunError;
pub use runner::{Delivery, RunOutcome, Runner};

const USER_AGENT: &str = concat!("satpass-notify/", env!("CARGO_PKG_VERSION"));

/// Wire the live collaborators and run once.
///
/// With `predictions` set, raw passes are replayed from that file instead of
/// being fetched, and satellite names come from the configuration only.
pub async fn execute(
    settings: &Settings,
    predictions: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<RunOutcome, RunError> {
    let client = reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .user_agent(USER_AGENT)
        .build()?;

    let weather = Meteoblue::new(client.clone(), settings.meteoblue_api_key.clone());
    let slack = settings
        .slack
        .as_ref()
        .map(|s| Slack::new(client.clone(), s.token.clone()));

    match predictions {
        Some(path) => {
            let source = ReplaySource::from_file(path)?;
            let catalog = Catalog::offline(&settings.satellites);
            Runner {
                settings,
                predictions: &source,
                weather: &weather,
                chat: slack.as_ref(),
            }
            .run(catalog.satellites(), now)
            .await
        }
        None => {
            let catalog =
                Catalog::resolve(&settings.satellites, &client, settings.request_delay).await;
            let source = HeavensAbove::new(client, settings.site.clone(), settings.request_delay);
            Runner {
                settings,
                predictions: &source,
                weather: &weather,
                chat: slack.as_ref(),
            }
            .run(catalog.satellites(), now)
            .await
        }
    }
}
