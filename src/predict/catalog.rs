use std::time::Duration;

use crate::config::SatelliteConfig;
use crate::predict::types::{NameSource, SatelliteInfo};

pub const CELESTRAK_GP_URL: &str = "https://celestrak.org/NORAD/elements/gp.php";

/// The satellites a run predicts passes for, with display names resolved.
pub struct Catalog {
    satellites: Vec<SatelliteInfo>,
}

impl Catalog {
    /// Configured names only, without network lookups.
    pub fn offline(entries: &[SatelliteConfig]) -> Self {
        let satellites = entries
            .iter()
            .map(|entry| match &entry.name {
                Some(name) => SatelliteInfo {
                    name: name.clone(),
                    norad_id: entry.norad_id,
                    name_source: NameSource::Config,
                },
                None => SatelliteInfo {
                    name: format!("NORAD {}", entry.norad_id),
                    norad_id: entry.norad_id,
                    name_source: NameSource::Fallback,
                },
            })
            .collect();
        Self { satellites }
    }

    /// Resolve names for the configured satellites.
    ///
    /// Configured names win; otherwise the name line of the current TLE is used.
    /// Lookup failures fall back to `NORAD <id>` and never abort the run.
    pub async fn resolve(
        entries: &[SatelliteConfig],
        client: &reqwest::Client,
        request_delay: Duration,
    ) -> Self {
        let mut satellites = Vec::with_capacity(entries.len());

        for entry in entries {
            let info = match &entry.name {
                Some(name) => SatelliteInfo {
                    name: name.clone(),
                    norad_id: entry.norad_id,
                    name_source: NameSource::Config,
                },
                None => {
                    let looked_up = match fetch_tle(client, entry.norad_id).await {
                        Ok(tle) => name_from_tle(&tle),
                        Err(e) => {
                            log::warn!("TLE lookup for NORAD {} failed: {}", entry.norad_id, e);
                            None
                        }
                    };
                    tokio::time::sleep(request_delay).await;
                    match looked_up {
                        Some(name) => SatelliteInfo {
                            name,
                            norad_id: entry.norad_id,
                            name_source: NameSource::Celestrak,
                        },
                        None => SatelliteInfo {
                            name: format!("NORAD {}", entry.norad_id),
                            norad_id: entry.norad_id,
                            name_source: NameSource::Fallback,
                        },
                    }
                }
            };
            log::debug!(
                "NORAD {} is {} (name from {})",
                info.norad_id,
                info.name,
                info.name_source
            );
            satellites.push(info);
        }

        Self { satellites }
    }

    pub fn satellites(&self) -> &[SatelliteInfo] {
        &self.satellites
    }
}

async fn fetch_tle(client: &reqwest::Client, norad_id: u32) -> Result<String, reqwest::Error> {
    client
        .get(CELESTRAK_GP_URL)
        .query(&[("CATNR", norad_id.to_string()), ("FORMAT", "TLE".to_string())])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

/// Name line of the first named element set in a TLE document.
///
/// A name is a line directly followed by element line 1.
pub fn name_from_tle(content: &str) -> Option<String> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines
        .windows(2)
        .find(|pair| pair[1].starts_with("1 ") && !is_element_line(pair[0]))
        .map(|pair| pair[0].trim_start_matches("0 ").trim().to_string())
        .filter(|n| !n.is_empty())
}

fn is_element_line(line: &str) -> bool {
    line.starts_with("1 ") || line.starts_with("2 ")
}
