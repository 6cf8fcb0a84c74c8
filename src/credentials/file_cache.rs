//! File-backed credential cache
//!
//! A `ProvideCredentials` implementation that wraps another provider and
//! persists its short-lived credentials as JSON under the user cache
//! directory. The cache file is replaced atomically (temp file in the same
//! directory, then rename), so concurrent readers in this process or any
//! other always observe either no file or a complete record. Cache failures
//! are logged and recovered from; only upstream provider failures propagate.

use aws_credential_types::provider::{self, error::CredentialsError, future, ProvideCredentials};
use aws_credential_types::Credentials;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::warn;

/// Subdirectory of the user cache directory holding s3parcp state.
const CACHE_DIR_NAME: &str = "s3parcp";

/// Name of the cached credentials file.
const CACHE_FILE_NAME: &str = "credentials-cache.json";

/// Prefix for the temporary files that are renamed over the cache file.
const TEMP_FILE_PREFIX: &str = "tmp-credentials-cache-";

/// Provider name reported on credentials loaded from the cache.
const PROVIDER_NAME: &str = "FileCredentialCache";

/// On-disk form of a set of cached credentials.
///
/// Field names and the RFC 3339 timestamp format are part of the cache file
/// contract; existing cache files must keep parsing across releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CachedCredentials {
    /// AWS access key ID
    #[serde(rename = "AccessKeyID")]
    pub access_key_id: String,
    /// AWS secret access key
    pub secret_access_key: String,
    /// Session token, empty for long-lived credentials
    pub session_token: String,
    /// Name of the provider the credentials originally came from
    pub source: String,
    /// Instant the credentials stop being valid
    pub expires_at: DateTime<Utc>,
}

impl CachedCredentials {
    /// A record is expired once its expiry is not strictly in the future.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    fn into_credentials(self) -> Credentials {
        let session_token = if self.session_token.is_empty() {
            None
        } else {
            Some(self.session_token)
        };
        Credentials::new(
            self.access_key_id,
            self.secret_access_key,
            session_token,
            Some(SystemTime::from(self.expires_at)),
            PROVIDER_NAME,
        )
    }
}

/// Credential provider that caches a wrapped provider's output on disk.
#[derive(Debug)]
pub struct FileCredentialCache<P> {
    upstream: P,
    cache_home: PathBuf,
}

impl<P> FileCredentialCache<P>
where
    P: ProvideCredentials,
{
    /// Create a cache rooted at the OS user cache directory.
    pub fn new(upstream: P) -> crate::error::Result<Self> {
        let cache_home = dirs::cache_dir().ok_or_else(|| {
            crate::error::S3ParcpError::Cache("user cache directory is not available".to_string())
        })?;
        Ok(Self::with_cache_home(upstream, cache_home))
    }

    /// Create a cache rooted at an explicit directory. Used by tests.
    pub fn with_cache_home(upstream: P, cache_home: PathBuf) -> Self {
        Self {
            upstream,
            cache_home,
        }
    }

    fn cache_dir(&self) -> PathBuf {
        self.cache_home.join(CACHE_DIR_NAME)
    }

    fn cache_file(&self) -> PathBuf {
        self.cache_dir().join(CACHE_FILE_NAME)
    }

    fn load_cached(&self) -> std::io::Result<CachedCredentials> {
        let data = std::fs::read(self.cache_file())?;
        serde_json::from_slice(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Serialize to a uniquely-named temp file in the cache directory, then
    /// rename over the cache file. The rename is what makes concurrent
    /// fetches safe; there is no lock.
    fn save_cached(&self, record: &CachedCredentials) -> std::io::Result<()> {
        let data = serde_json::to_vec(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let temp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(self.cache_dir())?;
        std::fs::write(temp.path(), &data)?;
        temp.persist(self.cache_file()).map_err(|e| e.error)?;
        Ok(())
    }

    async fn refresh(&self) -> provider::Result {
        let fresh = self.upstream.provide_credentials().await?;

        match fresh.expiry() {
            Some(expiry) => {
                let record = CachedCredentials {
                    access_key_id: fresh.access_key_id().to_string(),
                    secret_access_key: fresh.secret_access_key().to_string(),
                    session_token: fresh.session_token().unwrap_or_default().to_string(),
                    source: PROVIDER_NAME.to_string(),
                    expires_at: DateTime::<Utc>::from(expiry),
                };
                if let Err(e) = self.save_cached(&record) {
                    warn!(
                        path = %self.cache_file().display(),
                        error = %e,
                        "failed to save credential cache, credentials will not be cached"
                    );
                }
            }
            None => {
                // Without an expiry a cached record would be expired on
                // arrival, so skip persisting entirely.
                warn!("credentials have no expiry, skipping cache write");
            }
        }

        Ok(fresh)
    }

    /// Return cached credentials if present and unexpired, refreshing from
    /// the wrapped provider otherwise.
    pub async fn fetch(&self) -> provider::Result {
        std::fs::create_dir_all(self.cache_dir()).map_err(CredentialsError::provider_error)?;

        match self.load_cached() {
            Ok(record) if !record.is_expired() => Ok(record.into_credentials()),
            Ok(_) => self.refresh().await,
            Err(e) => {
                if self.cache_file().exists() {
                    warn!(
                        path = %self.cache_file().display(),
                        error = %e,
                        "failed to load cached credentials, refreshing"
                    );
                }
                self.refresh().await
            }
        }
    }

    /// Directory the cache file lives in, for diagnostics.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_file()
    }
}

impl<P> ProvideCredentials for FileCredentialCache<P>
where
    P: ProvideCredentials,
{
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.fetch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Upstream provider stub with a controllable expiry and a call counter.
    #[derive(Debug)]
    struct StubProvider {
        expires_in: Option<Duration>,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn new(expires_in: Option<Duration>) -> Self {
            Self {
                expires_in,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ProvideCredentials for StubProvider {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let expiry = self.expires_in.map(|d| SystemTime::now() + d);
            future::ProvideCredentials::ready(Ok(Credentials::new(
                "AKIDEXAMPLE",
                "secret",
                Some("token".to_string()),
                expiry,
                "StubProvider",
            )))
        }
    }

    fn cache_in(dir: &TempDir, provider: StubProvider) -> FileCredentialCache<StubProvider> {
        FileCredentialCache::with_cache_home(provider, dir.path().to_path_buf())
    }

    #[tokio::test]
    async fn test_fetch_persists_and_reuses() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::new(Some(Duration::from_secs(3600)));
        let calls = Arc::clone(&provider.calls);
        let cache = cache_in(&dir, provider);

        let first = cache.fetch().await.unwrap();
        assert_eq!(first.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.cache_path().exists());

        // Second fetch is served from the file.
        let second = cache.fetch().await.unwrap();
        assert_eq!(second.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(second.session_token(), Some("token"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_triggers_refresh() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::new(Some(Duration::ZERO));
        let calls = Arc::clone(&provider.calls);
        let cache = cache_in(&dir, provider);

        cache.fetch().await.unwrap();
        cache.fetch().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_expiry_skips_cache_write() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir, StubProvider::new(None));

        let creds = cache.fetch().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKIDEXAMPLE");
        assert!(!cache.cache_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_is_recovered() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::new(Some(Duration::from_secs(3600)));
        let calls = Arc::clone(&provider.calls);
        let cache = cache_in(&dir, provider);

        std::fs::create_dir_all(dir.path().join(CACHE_DIR_NAME)).unwrap();
        std::fs::write(cache.cache_path(), b"{not json").unwrap();

        let creds = cache.fetch().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The corrupt file was replaced with a parseable one.
        let data = std::fs::read(cache.cache_path()).unwrap();
        let record: CachedCredentials = serde_json::from_slice(&data).unwrap();
        assert_eq!(record.access_key_id, "AKIDEXAMPLE");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_fetches_never_tear_the_file() {
        let dir = TempDir::new().unwrap();
        let provider = StubProvider::new(Some(Duration::ZERO));
        let calls = Arc::clone(&provider.calls);
        let cache = Arc::new(cache_in(&dir, provider));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.fetch().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();

            // Interleaved read: the file is either absent or parses whole.
            match std::fs::read(cache.cache_path()) {
                Ok(data) => {
                    serde_json::from_slice::<CachedCredentials>(&data).unwrap();
                }
                Err(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            }
        }

        let n = calls.load(Ordering::SeqCst);
        assert!((1..=100).contains(&n), "provider called {n} times");
    }

    #[test]
    fn test_record_json_field_names() {
        let record = CachedCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
            source: "StubProvider".to_string(),
            expires_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        for field in [
            "\"AccessKeyID\"",
            "\"SecretAccessKey\"",
            "\"SessionToken\"",
            "\"Source\"",
            "\"ExpiresAt\"",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
    }

    #[test]
    fn test_temp_files_use_the_reserved_prefix() {
        let dir = TempDir::new().unwrap();
        let temp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(dir.path())
            .unwrap();
        let name = temp.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("tmp-credentials-cache-"));
    }
}
