//! Timestamp formats shared with the wiki and the wp10 tables.
//!
//! Two spellings exist: the wiki/API form (`2019-01-13T00:00:00Z`) used for
//! category links, ratings, moves and revision timestamps, and the compact
//! wp10 form (`20190113000000`) used for cycle timestamps on projects and
//! log rows. Both sort lexicographically in time order.

use chrono::{NaiveDateTime, Utc};

pub const WIKI_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
pub const WP10_TS_FORMAT: &str = "%Y%m%d%H%M%S";

pub fn format_wiki_ts(value: &NaiveDateTime) -> String {
    value.format(WIKI_TS_FORMAT).to_string()
}

pub fn parse_wiki_ts(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, WIKI_TS_FORMAT).ok()
}

pub fn format_wp10_ts(value: &NaiveDateTime) -> String {
    value.format(WP10_TS_FORMAT).to_string()
}

pub fn parse_wp10_ts(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, WP10_TS_FORMAT).ok()
}

/// Current UTC time truncated to whole seconds, the resolution of both formats.
pub fn now_utc() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    parse_wp10_ts(&format_wp10_ts(&now)).unwrap_or(now)
}
