//! Pass predictions scraped from the Heavens-Above pass summary page.

use std::time::Duration;

use chrono_tz::Tz;
use reqwest::Url;

use crate::predict::error::SourceError;
use crate::predict::source::PredictionSource;
use crate::predict::types::{RawPassEntry, RawPoint, SatelliteInfo};
use crate::site::Site;

pub const SITE_URL: &str = "https://www.heavens-above.com/";
pub const PASS_SUMMARY_URL: &str = "https://www.heavens-above.com/PassSummary.aspx";

/// Display timezone requested from Heavens-Above; times come back in UTC.
const DISPLAY_TZ: &str = "UCT";
const SUMMARY_COLUMNS: usize = 12;

pub struct HeavensAbove {
    client: reqwest::Client,
    site: Site,
    request_delay: Duration,
}

impl HeavensAbove {
    pub fn new(client: reqwest::Client, site: Site, request_delay: Duration) -> Self {
        Self {
            client,
            site,
            request_delay,
        }
    }

    async fn pass_summary(&self, norad_id: u32) -> Result<String, SourceError> {
        let response = self
            .client
            .get(PASS_SUMMARY_URL)
            .query(&[
                ("satid", norad_id.to_string()),
                ("lat", format!("{:.6}", self.site.latitude_deg)),
                ("lng", format!("{:.6}", self.site.longitude_deg)),
                ("loc", "Unspecified".to_string()),
                ("alt", format!("{:.0}", self.site.height_m)),
                ("tz", DISPLAY_TZ.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { norad_id, status });
        }
        Ok(response.text().await?)
    }
}

impl PredictionSource for HeavensAbove {
    fn display_timezone(&self) -> Tz {
        Tz::UTC
    }

    async fn fetch(&self, satellites: &[SatelliteInfo]) -> Result<Vec<RawPassEntry>, SourceError> {
        let mut entries = Vec::new();
        for satellite in satellites {
            log::info!(
                "Retrieving passes for {} (NORAD {})",
                satellite.name,
                satellite.norad_id
            );
            let html = self.pass_summary(satellite.norad_id).await?;
            let rows = parse_pass_summary(&html, satellite)?;
            log::debug!("{} rows for NORAD {}", rows.len(), satellite.norad_id);
            entries.extend(rows);
            tokio::time::sleep(self.request_delay).await;
        }
        Ok(entries)
    }
}

/// Parse the clickable rows of a pass summary table.
///
/// Rows with too few cells are ignored; cell contents are passed on as text
/// and validated by the normalizer.
pub fn parse_pass_summary(
    html: &str,
    satellite: &SatelliteInfo,
) -> Result<Vec<RawPassEntry>, SourceError> {
    if !html.contains("<table") {
        return Err(SourceError::Unrecognised(satellite.norad_id));
    }

    let mut entries = Vec::new();
    for row in elements(html, "tr") {
        if !row.open_tag.contains("clickableRow") {
            continue;
        }
        let cells: Vec<String> = elements(row.inner, "td")
            .iter()
            .map(|td| clean_text(td.inner))
            .collect();
        if cells.len() < SUMMARY_COLUMNS {
            continue;
        }

        let detail_url = find_detail_url(row.outer);
        let query = detail_url
            .as_deref()
            .and_then(|u| Url::parse(SITE_URL).ok()?.join(u).ok());
        let param = |key: &str| {
            query.as_ref().and_then(|u| {
                u.query_pairs()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.into_owned())
            })
        };

        entries.push(RawPassEntry {
            satellite: Some(satellite.name.clone()),
            norad_id: param("satid").or_else(|| Some(satellite.norad_id.to_string())),
            magnitude: Some(cells[1].clone()),
            date: None,
            mjd: param("mjd"),
            start: RawPoint {
                time: Some(cells[2].clone()),
                altitude: Some(cells[3].clone()),
                azimuth: Some(cells[4].clone()),
            },
            peak: RawPoint {
                time: Some(cells[5].clone()),
                altitude: Some(cells[6].clone()),
                azimuth: Some(cells[7].clone()),
            },
            end: RawPoint {
                time: Some(cells[8].clone()),
                altitude: Some(cells[9].clone()),
                azimuth: Some(cells[10].clone()),
            },
            pass_type: Some(cells[11].clone()),
            detail_url: query.as_ref().map(|u| u.to_string()),
        });
    }

    Ok(entries)
}

struct Element<'a> {
    open_tag: &'a str,
    inner: &'a str,
    outer: &'a str,
}

/// Non-nested elements named `tag`, in document order.
fn elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut found = Vec::new();
    let mut rest = 0;

    while let Some(pos) = html[rest..].find(&open) {
        let start = rest + pos;
        let after_name = start + open.len();
        // `<td` must not match `<tdx`
        match html[after_name..].chars().next() {
            Some(c) if c == '>' || c.is_whitespace() => {}
            _ => {
                rest = after_name;
                continue;
            }
        }
        let Some(tag_end) = html[start..].find('>').map(|p| start + p + 1) else {
            break;
        };
        let Some(close_pos) = html[tag_end..].find(&close).map(|p| tag_end + p) else {
            break;
        };
        let end = close_pos + close.len();
        found.push(Element {
            open_tag: &html[start..tag_end],
            inner: &html[tag_end..close_pos],
            outer: &html[start..end],
        });
        rest = end;
    }

    found
}

fn find_detail_url(row: &str) -> Option<String> {
    let pos = row.find("passdetails.aspx")?;
    let quote_start = row[..pos].rfind(['"', '\''])?;
    let quote = row[quote_start..].chars().next()?;
    let value_start = quote_start + 1;
    let value_end = row[value_start..].find(quote).map(|p| value_start + p)?;
    Some(unescape(&row[value_start..value_end]))
}

fn clean_text(cell: &str) -> String {
    let mut text = String::with_capacity(cell.len());
    let mut in_tag = false;
    for c in cell.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    unescape(&text).trim().to_string()
}

fn unescape(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&deg;", "°")
        .replace("&#176;", "°")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
