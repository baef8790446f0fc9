use crate::Result;
use chrono::NaiveDate;
use ohno::bail;

/// Format accepted on the command line
const INPUT_FORMAT: &str = "%Y/%m/%d";

/// Format used inside GitHub search qualifiers
const QUERY_FORMAT: &str = "%Y-%m-%d";

/// Optional inclusive date bounds for the searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            bail!(
                "--from date ({}) is later than --to date ({})",
                from.format(INPUT_FORMAT),
                to.format(INPUT_FORMAT)
            );
        }

        Ok(Self { from, to })
    }

    /// Fragment appended to the commit search query, empty when unbounded.
    #[must_use]
    pub fn commit_filter(&self) -> String {
        self.filter("author-date")
    }

    /// Fragment appended to the pull request search queries, empty when unbounded.
    #[must_use]
    pub fn pr_filter(&self) -> String {
        self.filter("created")
    }

    fn filter(&self, qualifier: &str) -> String {
        if self.from.is_none() && self.to.is_none() {
            return String::new();
        }

        format!(" {qualifier}:{}..{}", bound(self.from), bound(self.to))
    }
}

fn bound(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "*".to_string(), |d| d.format(QUERY_FORMAT).to_string())
}

/// Parse a `YYYY/MM/DD` command-line date.
pub fn parse_date(value: &str) -> core::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, INPUT_FORMAT).map_err(|e| format!("invalid date '{value}', expected YYYY/MM/DD: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(date("2024/03/07"), NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        let _ = parse_date("2024-03-07").unwrap_err();
        let _ = parse_date("2024/13/01").unwrap_err();
        let _ = parse_date("yesterday").unwrap_err();
    }

    #[test]
    fn test_unbounded_filters_are_empty() {
        let range = DateRange::new(None, None).unwrap();
        assert_eq!(range.commit_filter(), "");
        assert_eq!(range.pr_filter(), "");
    }

    #[test]
    fn test_both_bounds() {
        let range = DateRange::new(Some(date("2024/01/01")), Some(date("2024/06/30"))).unwrap();
        assert_eq!(range.commit_filter(), " author-date:2024-01-01..2024-06-30");
        assert_eq!(range.pr_filter(), " created:2024-01-01..2024-06-30");
    }

    #[test]
    fn test_open_bounds_use_wildcard() {
        let from_only = DateRange::new(Some(date("2024/01/01")), None).unwrap();
        assert_eq!(from_only.commit_filter(), " author-date:2024-01-01..*");
        assert_eq!(from_only.pr_filter(), " created:2024-01-01..*");

        let to_only = DateRange::new(None, Some(date("2024/12/31"))).unwrap();
        assert_eq!(to_only.commit_filter(), " author-date:*..2024-12-31");
        assert_eq!(to_only.pr_filter(), " created:*..2024-12-31");
    }

    #[test]
    fn test_same_day_is_allowed() {
        let range = DateRange::new(Some(date("2024/05/05")), Some(date("2024/05/05"))).unwrap();
        assert_eq!(range.pr_filter(), " created:2024-05-05..2024-05-05");
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = DateRange::new(Some(date("2024/06/01")), Some(date("2024/01/01"))).unwrap_err();
        assert!(err.to_string().contains("later than"));
    }
}
