use serde::Serialize;

/// What the items of one service are called in reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Noun {
    pub singular: &'static str,
    pub plural: &'static str,
}

impl Noun {
    pub const fn new(singular: &'static str, plural: &'static str) -> Self {
        Self { singular, plural }
    }

    pub fn count(&self, n: usize) -> &'static str {
        if n == 1 {
            self.singular
        } else {
            self.plural
        }
    }
}

/// The result of fetching one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum FetchOutcome {
    Success { account: String, fetched: usize },
    Failure { account: String, messages: Vec<String> },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn report(&self, noun: Noun) -> ReportLine {
        match self {
            FetchOutcome::Success { account, fetched } => ReportLine::Success(format!(
                "{account}: Fetched {fetched} {}",
                noun.count(*fetched)
            )),
            FetchOutcome::Failure { account, messages } => {
                let message = if messages.is_empty() {
                    "unknown error".to_string()
                } else {
                    messages.join("; ")
                };
                ReportLine::Failure(format!(
                    "{account}: Failed to fetch {}: {message}",
                    noun.plural
                ))
            }
        }
    }
}

/// One line of output; failures go to stderr.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportLine {
    Success(String),
    Failure(String),
}

pub fn report_lines(outcomes: &[FetchOutcome], noun: Noun) -> Vec<ReportLine> {
    outcomes.iter().map(|o| o.report(noun)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKMARK: Noun = Noun::new("bookmark", "bookmarks");

    #[test]
    fn lines() {
        let outcomes = vec![
            FetchOutcome::Success {
                account: "phil".to_string(),
                fetched: 1,
            },
            FetchOutcome::Success {
                account: "bob".to_string(),
                fetched: 0,
            },
            FetchOutcome::Failure {
                account: "ann".to_string(),
                messages: vec!["HTTP status 500".to_string()],
            },
            FetchOutcome::Failure {
                account: "cat".to_string(),
                messages: vec![],
            },
        ];
        assert_eq!(
            report_lines(&outcomes, BOOKMARK),
            vec![
                ReportLine::Success("phil: Fetched 1 bookmark".to_string()),
                ReportLine::Success("bob: Fetched 0 bookmarks".to_string()),
                ReportLine::Failure(
                    "ann: Failed to fetch bookmarks: HTTP status 500".to_string()
                ),
                ReportLine::Failure("cat: Failed to fetch bookmarks: unknown error".to_string()),
            ]
        );
        assert!(!outcomes[2].is_success());
    }

    #[test]
    fn serializes_tagged() {
        let json = serde_json::to_value(FetchOutcome::Success {
            account: "phil".to_string(),
            fetched: 3,
        })
        .unwrap();
        assert_eq!(json["result"], "success");
        assert_eq!(json["fetched"], 3);
    }
}
