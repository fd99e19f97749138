use quickinfo_core::{IssueFields, QuickInfoError};
use quickinfo_service::IssueTracker;
use tracing::{debug, info, warn};

use crate::ImageCache;

/// What a materialize pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub downloaded: Vec<String>,
    pub skipped: Vec<String>,
}

/// Download every inline-image attachment of `fields` that is not cached yet.
///
/// Already-cached files are never fetched again. The first failed download
/// stops the batch; files written before it stay in the cache.
pub async fn materialize(
    fields: &IssueFields,
    cache: &ImageCache,
    tracker: &dyn IssueTracker,
    token: &str,
) -> Result<MaterializeReport, QuickInfoError> {
    let failed = |filename: &str, detail: String| QuickInfoError::ImageDownloadFailed {
        filename: filename.to_string(),
        detail,
    };

    cache
        .ensure_dir()
        .await
        .map_err(|e| failed(cache.dir().to_string_lossy().as_ref(), e.to_string()))?;

    let mut report = MaterializeReport::default();
    for attachment in fields.inline_images() {
        let filename = attachment.filename.as_str();
        if !ImageCache::is_safe_name(filename) {
            warn!("refusing to cache attachment named {filename:?}");
            report.skipped.push(filename.to_string());
            continue;
        }
        if cache
            .contains(filename)
            .await
            .map_err(|e| failed(filename, e.to_string()))?
        {
            report.skipped.push(filename.to_string());
            continue;
        }
        let Some(url) = attachment.thumbnail.as_deref() else {
            debug!("{filename} has no thumbnail, skipping");
            report.skipped.push(filename.to_string());
            continue;
        };

        info!("saving {url} as {filename} in {}", cache.dir().display());
        let data = match tracker.fetch_attachment(url, token).await {
            Ok(data) => data,
            Err(e) => {
                warn!("image download aborted at {filename}: {e}");
                return Err(failed(filename, e.to_string()));
            }
        };
        cache
            .put(filename, data)
            .await
            .map_err(|e| failed(filename, e.to_string()))?;
        report.downloaded.push(filename.to_string());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use quickinfo_core::{Attachment, IssueKey};
    use quickinfo_service::TrackerError;

    use super::*;

    /// Serves thumbnails from memory and counts requests.
    struct FakeTracker {
        thumbnails: HashMap<String, Vec<u8>>,
        requests: AtomicUsize,
    }

    impl FakeTracker {
        fn new(thumbnails: &[(&str, &str)]) -> Self {
            Self {
                thumbnails: thumbnails
                    .iter()
                    .map(|(url, data)| (url.to_string(), data.as_bytes().to_vec()))
                    .collect(),
                requests: AtomicUsize::new(0),
            }
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IssueTracker for FakeTracker {
        async fn fetch_issue(
            &self,
            _base_url: &str,
            _token: &str,
            _key: &IssueKey,
        ) -> Result<IssueFields, TrackerError> {
            unimplemented!("not used by materialize")
        }

        async fn fetch_attachment(&self, url: &str, _token: &str) -> Result<Bytes, TrackerError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.thumbnails
                .get(url)
                .map(|d| Bytes::from(d.clone()))
                .ok_or_else(|| TrackerError::Status {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    fn attachment(name: &str, thumb: Option<&str>) -> Attachment {
        Attachment {
            filename: name.into(),
            thumbnail: thumb.map(String::from),
        }
    }

    #[tokio::test]
    async fn downloads_once_then_skips() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(tmp.path().join("images"));
        let tracker = FakeTracker::new(&[("t/1", "one"), ("t/2", "two")]);
        let fields = IssueFields {
            attachments: vec![
                attachment("image-1.png", Some("t/1")),
                attachment("image-2.png", Some("t/2")),
                attachment("notes.pdf", Some("t/pdf")),
            ],
            ..Default::default()
        };

        let first = materialize(&fields, &cache, &tracker, "tok").await.unwrap();
        assert_eq!(first.downloaded, vec!["image-1.png", "image-2.png"]);
        assert_eq!(tracker.requests(), 2);
        let cached = std::fs::read(cache.path_for("image-2.png").unwrap()).unwrap();
        assert_eq!(cached, b"two");

        let second = materialize(&fields, &cache, &tracker, "tok").await.unwrap();
        assert!(second.downloaded.is_empty());
        assert_eq!(second.skipped, vec!["image-1.png", "image-2.png"]);
        assert_eq!(tracker.requests(), 2, "second pass must not hit the network");
    }

    #[tokio::test]
    async fn failure_aborts_batch_and_keeps_written_files() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(tmp.path());
        let tracker = FakeTracker::new(&[("t/1", "one"), ("t/3", "three")]);
        let fields = IssueFields {
            attachments: vec![
                attachment("image-1.png", Some("t/1")),
                attachment("image-2.png", Some("t/missing")),
                attachment("image-3.png", Some("t/3")),
            ],
            ..Default::default()
        };

        let err = materialize(&fields, &cache, &tracker, "").await.unwrap_err();
        assert!(matches!(
            err,
            QuickInfoError::ImageDownloadFailed { ref filename, .. } if filename == "image-2.png"
        ));
        assert_eq!(tracker.requests(), 2, "image-3 must not be attempted");
        assert_eq!(cache.list().await.unwrap(), vec!["image-1.png"]);
    }

    #[tokio::test]
    async fn unsafe_filenames_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(tmp.path().join("images"));
        let tracker = FakeTracker::new(&[("t/evil", "evil"), ("t/1", "one")]);
        let fields = IssueFields {
            attachments: vec![
                attachment("image-../../evil.png", Some("t/evil")),
                attachment("image-1.png", Some("t/1")),
            ],
            ..Default::default()
        };

        let report = materialize(&fields, &cache, &tracker, "").await.unwrap();
        assert_eq!(report.skipped, vec!["image-../../evil.png"]);
        assert_eq!(report.downloaded, vec!["image-1.png"]);
        assert_eq!(tracker.requests(), 1);
        assert!(!tmp.path().join("evil.png").exists());
    }

    #[tokio::test]
    async fn attachments_without_thumbnail_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(tmp.path());
        let tracker = FakeTracker::new(&[]);
        let fields = IssueFields {
            attachments: vec![attachment("image-1.png", None)],
            ..Default::default()
        };

        let report = materialize(&fields, &cache, &tracker, "").await.unwrap();
        assert_eq!(report.skipped, vec!["image-1.png"]);
        assert_eq!(tracker.requests(), 0);
    }
}
