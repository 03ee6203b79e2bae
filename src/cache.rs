//! Generated background cache
//!
//! Generation is slow and billed per call, so the studio keeps the most
//! recent generated background and reuses it while the prompt and canvas
//! size stay the same. Any change of key replaces the single entry.

use image::DynamicImage;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Identity of a generated background
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackgroundKey {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

impl BackgroundKey {
    pub fn new<S: Into<String>>(prompt: S, width: u32, height: u32) -> Self {
        Self {
            prompt: prompt.into(),
            width,
            height,
        }
    }

    /// Stable hex digest of the key, used in logs and file names
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.prompt.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub replacements: u64,
}

#[derive(Debug)]
struct CacheEntry {
    key: BackgroundKey,
    digest: String,
    image: Arc<DynamicImage>,
}

/// Single-entry cache of the last generated background
#[derive(Debug, Default)]
pub struct BackgroundCache {
    entry: Option<CacheEntry>,
    stats: CacheStats,
}

impl BackgroundCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached image for `key`, if the entry matches
    pub fn get(&mut self, key: &BackgroundKey) -> Option<Arc<DynamicImage>> {
        match &self.entry {
            Some(entry) if entry.key == *key => {
                self.stats.hits += 1;
                log::debug!("Background cache hit: {}", &entry.digest[..12]);
                Some(Arc::clone(&entry.image))
            },
            _ => {
                self.stats.misses += 1;
                None
            },
        }
    }

    /// Whether an image for `key` is cached, without touching the counters
    #[must_use]
    pub fn contains(&self, key: &BackgroundKey) -> bool {
        self.entry.as_ref().is_some_and(|entry| entry.key == *key)
    }

    /// Store `image` under `key`, replacing whatever was cached
    pub fn insert(&mut self, key: BackgroundKey, image: DynamicImage) -> Arc<DynamicImage> {
        if let Some(previous) = &self.entry {
            if previous.key != key {
                self.stats.replacements += 1;
                log::debug!("Replacing cached background {}", &previous.digest[..12]);
            }
        }

        let image = Arc::new(image);
        let digest = key.digest();
        self.entry = Some(CacheEntry {
            key,
            digest,
            image: Arc::clone(&image),
        });
        image
    }

    /// Drop the cached background
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    #[test]
    fn test_digest_is_stable_and_key_sensitive() {
        let key = BackgroundKey::new("marble counter", 480, 480);
        assert_eq!(key.digest(), BackgroundKey::new("marble counter", 480, 480).digest());
        assert_eq!(key.digest().len(), 64);
        assert_ne!(key.digest(), BackgroundKey::new("marble counter", 480, 481).digest());
        assert_ne!(key.digest(), BackgroundKey::new("marble counte", 480, 480).digest());
    }

    #[test]
    fn test_hit_and_miss() {
        let mut cache = BackgroundCache::new();
        let key = BackgroundKey::new("beach", 10, 10);
        assert!(cache.get(&key).is_none());

        cache.insert(key.clone(), image(10, 10));
        assert!(cache.contains(&key));
        let cached = cache.get(&key).unwrap();
        assert_eq!(cached.width(), 10);

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                replacements: 0
            }
        );
    }

    #[test]
    fn test_key_change_replaces_entry() {
        let mut cache = BackgroundCache::new();
        let first = BackgroundKey::new("beach", 10, 10);
        let second = BackgroundKey::new("beach", 16, 9);

        cache.insert(first.clone(), image(10, 10));
        cache.insert(second.clone(), image(16, 9));

        assert!(!cache.contains(&first));
        assert!(cache.contains(&second));
        assert_eq!(cache.stats().replacements, 1);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = BackgroundCache::new();
        let key = BackgroundKey::new("forest", 4, 4);
        cache.insert(key.clone(), image(4, 4));
        cache.invalidate();
        assert!(!cache.contains(&key));
        assert!(cache.get(&key).is_none());
    }
}
