//! Madrigal web services: GPS TEC maps
//!
//! Three calls per range: list experiments of the world-wide GPS receiver
//! network, pick each experiment's minimum-scalloping TEC file, then ask the
//! isprint service for the parameters as whitespace-separated text.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::{debug, warn};

use super::{lines_of, FetchRange, RawUnit, SourceClient};
use crate::error::FetchError;

pub const DEFAULT_MADRIGAL_URL: &str = "https://cedar.openmadrigal.org";

/// World-wide GPS receiver network
pub const GPS_INSTRUMENT_CODE: u32 = 8000;
/// Minimum scalloping TEC processing
pub const TEC_KINDAT: u32 = 3500;
/// Default file category
pub const DEFAULT_CATEGORY: u32 = 1;

pub const ISPRINT_PARMS: &str = "year,month,day,hour,min,sec,gdlat,glon,tec,dtec";
pub const ISPRINT_FILTERS: &str = "badval=-1.0000e+00";

/// Who is downloading; Madrigal logs this with each isprint request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MadrigalUser {
    pub fullname: String,
    pub email: String,
    pub affiliation: String,
}

/// One row of the experiment-files listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentFile {
    pub name: String,
    pub kindat: u32,
    pub category: u32,
}

impl ExperimentFile {
    /// `name,kindat,kindat desc,category,status,permission,...`
    pub fn parse(line: &str) -> Option<Self> {
        let cols: Vec<&str> = line.split(',').map(str::trim).collect();
        if cols.len() < 4 {
            return None;
        }
        Some(Self {
            name: cols[0].to_string(),
            kindat: cols[1].parse().ok()?,
            category: cols[3].parse().ok()?,
        })
    }
}

/// Experiment id from a `getExperimentsService` row
pub fn parse_experiment_id(line: &str) -> Option<i64> {
    line.split(',').next()?.trim().parse().ok().filter(|id| *id > 0)
}

pub struct MadrigalClient {
    source_id: String,
    http: reqwest::Client,
    base_url: String,
    user: MadrigalUser,
}

impl MadrigalClient {
    pub fn new(
        source_id: impl Into<String>,
        http: reqwest::Client,
        base_url: impl Into<String>,
        user: MadrigalUser,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            http,
            base_url: base_url.into(),
            user,
        }
    }

    fn service_url(&self, service: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), service)
    }

    async fn get_text(&self, service: &str, query: &[(&str, String)]) -> Result<String, String> {
        let url = self.service_url(service);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| format!("{} request failed: {}", service, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("{} returned HTTP {}", service, status));
        }
        response
            .text()
            .await
            .map_err(|e| format!("failed to read {} response: {}", service, e))
    }

    async fn experiments(&self, range: &FetchRange) -> Result<Vec<i64>, String> {
        let mut query = vec![("code", GPS_INSTRUMENT_CODE.to_string())];
        query.extend(time_fields("start", range.start));
        query.extend(time_fields("end", range.end));
        query.push(("local", "1".to_string()));

        let body = self.get_text("getExperimentsService.py", &query).await?;
        Ok(body.lines().filter_map(parse_experiment_id).collect())
    }

    async fn tec_file(&self, experiment: i64) -> Result<Option<String>, String> {
        let body = self
            .get_text("getExperimentFilesService.py", &[("id", experiment.to_string())])
            .await?;
        Ok(body
            .lines()
            .filter_map(ExperimentFile::parse)
            .find(|f| f.kindat == TEC_KINDAT && f.category == DEFAULT_CATEGORY)
            .map(|f| f.name))
    }

    async fn isprint(&self, file: &str) -> Result<String, String> {
        let query = [
            ("file", file.to_string()),
            ("parms", ISPRINT_PARMS.to_string()),
            ("filters", ISPRINT_FILTERS.to_string()),
            ("user_fullname", self.user.fullname.clone()),
            ("user_email", self.user.email.clone()),
            ("user_affiliation", self.user.affiliation.clone()),
        ];
        self.get_text("isprintService.py", &query).await
    }
}

fn time_fields(prefix: &str, time: DateTime<Utc>) -> Vec<(&'static str, String)> {
    let names: [&'static str; 6] = if prefix == "start" {
        ["startyear", "startmonth", "startday", "starthour", "startmin", "startsec"]
    } else {
        ["endyear", "endmonth", "endday", "endhour", "endmin", "endsec"]
    };
    let values = [
        time.year(),
        time.month() as i32,
        time.day() as i32,
        time.hour() as i32,
        time.minute() as i32,
        time.second() as i32,
    ];
    names
        .into_iter()
        .zip(values)
        .map(|(name, value)| (name, value.to_string()))
        .collect()
}

#[async_trait]
impl SourceClient for MadrigalClient {
    async fn fetch(&self, range: &FetchRange) -> Result<Vec<RawUnit>, FetchError> {
        let fail = |cause: String| FetchError::new(self.source_id.clone(), *range, cause);

        let experiments = self.experiments(range).await.map_err(fail)?;
        debug!(source = %self.source_id, experiments = experiments.len(), %range, "Madrigal experiments");

        let mut units = Vec::new();
        for experiment in experiments {
            let Some(file) = self.tec_file(experiment).await.map_err(fail)? else {
                warn!(source = %self.source_id, experiment, "No TEC file in experiment");
                continue;
            };
            let body = self.isprint(&file).await.map_err(fail)?;
            units.extend(lines_of(&body, None));
        }
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_experiment_file_row() {
        let file = ExperimentFile::parse(
            "/opt/madrigal/experiments/2011/gps/01mar11/gps110301g.002.hdf5,3500,Minimum scalloping TEC,1,0,0",
        )
        .unwrap_or_else(|| ExperimentFile { name: String::new(), kindat: 0, category: 0 });
        assert_eq!(file.kindat, 3500);
        assert_eq!(file.category, 1);
        assert!(file.name.ends_with("gps110301g.002.hdf5"));
        assert!(ExperimentFile::parse("garbage").is_none());
    }

    #[test]
    fn test_parse_experiment_id() {
        assert_eq!(parse_experiment_id("100139613,http://x,GPS,1,site"), Some(100139613));
        assert_eq!(parse_experiment_id("-1"), None);
        assert_eq!(parse_experiment_id(""), None);
    }

    #[test]
    fn test_time_fields() {
        let fields = time_fields("end", FetchRange::year(2011).end);
        assert_eq!(fields[0], ("endyear", "2011".to_string()));
        assert_eq!(fields[5], ("endsec", "59".to_string()));
    }
}
