use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::security::auth::AccessToken;

/// A cached token is reused only while its file is younger than this.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

/// True when `modified` is less than [`FRESHNESS_WINDOW`] before `now`.
/// A modification time in the future counts as age zero.
pub fn is_fresh(modified: SystemTime, now: SystemTime) -> bool {
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    age < FRESHNESS_WINDOW
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: AccessToken,
    /// Modification time of the cache file.
    pub written_at: DateTime<Utc>,
    pub age: Duration,
}

impl CachedToken {
    pub fn age_minutes(&self) -> u64 {
        self.age.as_secs() / 60
    }
}

/// Plain-text bearer token stored in one file, judged by its mtime.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached token when the file exists, is fresh and is not blank.
    pub fn load(&self) -> Option<CachedToken> {
        self.load_at(SystemTime::now())
    }

    pub fn load_at(&self, now: SystemTime) -> Option<CachedToken> {
        let meta = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cached token");
                return None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cannot stat token cache");
                return None;
            }
        };

        let modified = match meta.modified() {
            Ok(m) => m,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "token cache has no mtime");
                return None;
            }
        };
        if !is_fresh(modified, now) {
            debug!(path = %self.path.display(), "cached token expired");
            return None;
        }

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cannot read token cache");
                return None;
            }
        };
        let token = raw.trim();
        if token.is_empty() {
            debug!(path = %self.path.display(), "token cache is empty");
            return None;
        }

        let written_at = DateTime::<Utc>::from(modified);
        let age = DateTime::<Utc>::from(now) - written_at;
        Some(CachedToken {
            token: AccessToken::new(token),
            written_at,
            age: age.to_std().unwrap_or(Duration::ZERO),
        })
    }

    /// Writes the token with owner-only permissions. The new content is
    /// renamed into place so readers see either the old or the new file.
    pub fn store(&self, token: &AccessToken) -> Result<()> {
        let persistence = |source: std::io::Error| Error::Persistence {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = NamedTempFile::new_in(&dir).map_err(persistence)?;
        tmp.write_all(token.as_str().as_bytes()).map_err(persistence)?;
        tmp.flush().map_err(persistence)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
                .map_err(persistence)?;
        }

        tmp.persist(&self.path).map_err(|e| persistence(e.error))?;
        debug!(path = %self.path.display(), "access token cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn backdate(path: &Path, by: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn test_is_fresh_window() {
        let now = SystemTime::now();
        assert!(is_fresh(now - Duration::from_secs(59 * 60), now));
        assert!(!is_fresh(now - Duration::from_secs(60 * 60), now));
        assert!(!is_fresh(now - Duration::from_secs(3 * 60 * 60), now));
        assert!(is_fresh(now + Duration::from_secs(30), now));
    }

    #[test]
    fn test_store_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("token"));

        cache.store(&AccessToken::new("abc.def.ghi")).unwrap();
        let cached = cache.load().expect("fresh token");

        assert_eq!(cached.token.as_str(), "abc.def.ghi");
        assert_eq!(cached.age_minutes(), 0);
        let written = fs::metadata(cache.path()).unwrap().modified().unwrap();
        assert_eq!(cached.written_at, DateTime::<Utc>::from(written));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("absent"));
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_load_stale_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "old-token").unwrap();
        backdate(&path, Duration::from_secs(2 * 60 * 60));

        assert!(TokenCache::new(&path).load().is_none());
    }

    #[test]
    fn test_load_reports_age() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "tok\n").unwrap();
        backdate(&path, Duration::from_secs(10 * 60 + 5));

        let cached = TokenCache::new(&path).load().unwrap();
        assert_eq!(cached.token.as_str(), "tok");
        assert_eq!(cached.age_minutes(), 10);
    }

    #[test]
    fn test_future_mtime_has_zero_age() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "tok").unwrap();
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(120)).unwrap();

        let cached = TokenCache::new(&path).load().unwrap();
        assert_eq!(cached.age, Duration::ZERO);
        assert!(cached.written_at > Utc::now());
    }

    #[test]
    fn test_blank_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "  \n").unwrap();
        assert!(TokenCache::new(&path).load().is_none());
    }

    #[test]
    fn test_store_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("token"));
        cache.store(&AccessToken::new("first")).unwrap();
        cache.store(&AccessToken::new("second")).unwrap();
        assert_eq!(cache.load().unwrap().token.as_str(), "second");
    }

    #[cfg(unix)]
    #[test]
    fn test_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("token"));
        cache.store(&AccessToken::new("secret")).unwrap();

        let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_store_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("nope").join("token"));
        let err = cache.store(&AccessToken::new("x")).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
    }
}
