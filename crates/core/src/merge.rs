//! Whole-document last-write-wins reconciliation.
//!
//! Only `appSettings.lastUpdated` is compared. Concurrent edits made on two
//! devices between syncs are not combined; the older document is dropped.

use crate::model::PersistedDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeWinner {
    Local,
    Remote,
}

/// Decides which side survives. The remote side must be strictly newer.
#[must_use]
pub fn resolve(local: &PersistedDocument, remote: &PersistedDocument) -> MergeWinner {
    if remote.last_updated() > local.last_updated() {
        MergeWinner::Remote
    } else {
        MergeWinner::Local
    }
}

/// Returns whichever document carries the later `lastUpdated`; ties keep `local`.
#[must_use]
pub fn last_write_wins(local: PersistedDocument, remote: PersistedDocument) -> PersistedDocument {
    match resolve(&local, &remote) {
        MergeWinner::Local => local,
        MergeWinner::Remote => remote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_at(stamp: Option<&str>, marker: &str) -> PersistedDocument {
        let mut doc = PersistedDocument::new();
        let mut settings = json!({ "activePhase": "home" });
        if let Some(stamp) = stamp {
            settings["lastUpdated"] = json!(stamp);
        }
        doc.set_value("appSettings", settings);
        doc.set_value("marker", json!(marker));
        doc
    }

    #[test]
    fn newer_remote_wins() {
        let local = doc_at(Some("2024-01-01T00:00:00Z"), "local");
        let remote = doc_at(Some("2024-01-02T00:00:00Z"), "remote");
        assert_eq!(last_write_wins(local, remote.clone()), remote);
    }

    #[test]
    fn newer_local_wins() {
        let local = doc_at(Some("2024-01-03T00:00:00Z"), "local");
        let remote = doc_at(Some("2024-01-02T00:00:00Z"), "remote");
        assert_eq!(last_write_wins(local.clone(), remote), local);
    }

    #[test]
    fn ties_keep_local() {
        let local = doc_at(Some("2024-01-02T00:00:00Z"), "local");
        let remote = doc_at(Some("2024-01-02T00:00:00.000Z"), "remote");
        assert_eq!(resolve(&local, &remote), MergeWinner::Local);
    }

    #[test]
    fn remote_without_timestamp_never_wins() {
        let local = doc_at(None, "local");
        let remote = doc_at(None, "remote");
        assert_eq!(resolve(&local, &remote), MergeWinner::Local);

        let local = doc_at(Some("2024-01-02T00:00:00Z"), "local");
        assert_eq!(resolve(&local, &PersistedDocument::new()), MergeWinner::Local);
    }

    #[test]
    fn empty_local_takes_any_stamped_remote() {
        let remote = doc_at(Some("1999-12-31T23:59:59Z"), "remote");
        assert_eq!(
            last_write_wins(PersistedDocument::new(), remote.clone()),
            remote
        );
    }
}
