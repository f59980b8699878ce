//! Wire format of the environmental API's measurement endpoints.

use crate::types::station::string_or_number;
use serde::Deserialize;

/// One row as returned by a measurement endpoint. Only the fields the fetcher
/// reads are kept; everything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub siteid: String,
    /// Category label, e.g. `"PM2.5"`, `"AMB_TEMP"`, `"RH"`.
    #[serde(default)]
    pub itemengname: String,
    /// Numeric-as-string value. May hold markers such as `"x"` or be empty.
    #[serde(default, deserialize_with = "string_or_number")]
    pub concentration: String,
    /// `YYYY-MM-DD HH:MM`, local time of the regional zone.
    #[serde(default)]
    pub monitordate: String,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub sitename: String,
}

/// Endpoints answer with either a bare list or a `{"records": [...]}` wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PageBody<T> {
    Bare(Vec<T>),
    Wrapped { records: Vec<T> },
}

impl<T> PageBody<T> {
    pub(crate) fn into_records(self) -> Vec<T> {
        match self {
            PageBody::Bare(records) | PageBody::Wrapped { records } => records,
        }
    }
}
