use crate::ids::{ContentId, LinkId, OwnerId};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The kind of access being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    View,
    Download,
    Click,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::View => "view",
            AccessKind::Download => "download",
            AccessKind::Click => "click",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "view" => Some(AccessKind::View),
            "download" => Some(AccessKind::Download),
            "click" => Some(AccessKind::Click),
            _ => None,
        }
    }
}

impl Display for AccessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an access log row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum AccessTarget {
    Content(ContentId),
    Link(LinkId),
}

/// Client details captured with each access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// One append-only access log row.
///
/// `owner` is denormalised from the target at write time so owner-scoped
/// analytics need no join against content or link rows, including rows whose
/// target has since been reaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub target: AccessTarget,
    pub owner: Option<OwnerId>,
    pub kind: AccessKind,
    pub at: Timestamp,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl AccessLogEntry {
    pub fn new(
        target: AccessTarget,
        owner: Option<OwnerId>,
        kind: AccessKind,
        at: Timestamp,
        meta: RequestMeta,
    ) -> Self {
        Self {
            target,
            owner,
            kind,
            at,
            ip: meta.ip,
            user_agent: meta.user_agent,
            referrer: meta.referrer,
        }
    }

    /// The client IP, treating an empty string the same as a missing one.
    pub fn client_ip(&self) -> Option<&str> {
        self.ip.as_deref().map(str::trim).filter(|ip| !ip.is_empty())
    }

    pub fn matches(&self, scope: &LogScope) -> bool {
        match scope {
            LogScope::Content(id) => self.target == AccessTarget::Content(*id),
            LogScope::Link(id) => self.target == AccessTarget::Link(*id),
            LogScope::Owner(owner) => self.owner == Some(*owner),
        }
    }
}

/// The set of log rows a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "lowercase")]
pub enum LogScope {
    /// One content item.
    Content(ContentId),
    /// One short link.
    Link(LinkId),
    /// Everything owned by one account.
    Owner(OwnerId),
}

impl Display for LogScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogScope::Content(id) => write!(f, "content:{id}"),
            LogScope::Link(id) => write!(f, "link:{id}"),
            LogScope::Owner(id) => write!(f, "owner:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ip: Option<&str>) -> AccessLogEntry {
        AccessLogEntry::new(
            AccessTarget::Content(ContentId(1)),
            Some(OwnerId(9)),
            AccessKind::View,
            Timestamp::UNIX_EPOCH,
            RequestMeta {
                ip: ip.map(str::to_string),
                ..RequestMeta::default()
            },
        )
    }

    #[test]
    fn empty_ip_counts_as_missing() {
        assert_eq!(entry(Some("1.1.1.1")).client_ip(), Some("1.1.1.1"));
        assert_eq!(entry(Some("")).client_ip(), None);
        assert_eq!(entry(Some("  ")).client_ip(), None);
        assert_eq!(entry(None).client_ip(), None);
    }

    #[test]
    fn scope_matching() {
        let e = entry(None);
        assert!(e.matches(&LogScope::Content(ContentId(1))));
        assert!(!e.matches(&LogScope::Content(ContentId(2))));
        assert!(!e.matches(&LogScope::Link(LinkId(1))));
        assert!(e.matches(&LogScope::Owner(OwnerId(9))));
        assert!(!e.matches(&LogScope::Owner(OwnerId(8))));
    }

    #[test]
    fn kind_round_trips_through_its_column_value() {
        for kind in [AccessKind::View, AccessKind::Download, AccessKind::Click] {
            assert_eq!(AccessKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AccessKind::parse("share"), None);
    }
}
