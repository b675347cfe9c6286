//! Pre-recorded clip lookup
//!
//! Maps symbolic keys such as `announce_left_plus_3` or `countdown_go` to a
//! playable resource (a file path natively, a URL on the web). Keys that
//! are not present fall back to speech synthesis.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::AudioError;

/// File extensions picked up when scanning a clip directory
const CLIP_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg"];

/// Normalize free text into a clip key fragment: `"divided by 2"` -> `divided_by_2`
pub fn normalize_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    key
}

/// Static key -> resource mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipLibrary {
    clips: HashMap<String, String>,
}

impl ClipLibrary {
    /// Library with no clips (everything is synthesized)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            clips: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a JSON manifest: `{"countdown_go": "clips/go.wav", ...}`
    pub fn from_manifest(json: &str) -> Result<Self, AudioError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON manifest from disk; relative paths resolve against its directory
    pub fn load_manifest(path: &Path) -> Result<Self, AudioError> {
        let json = std::fs::read_to_string(path)?;
        let mut library = Self::from_manifest(&json)?;
        if let Some(base) = path.parent() {
            for resource in library.clips.values_mut() {
                if Path::new(resource.as_str()).is_relative() {
                    *resource = base.join(resource.as_str()).to_string_lossy().into_owned();
                }
            }
        }
        log::info!("Loaded {} clips from {}", library.len(), path.display());
        Ok(library)
    }

    /// Index every audio file in `dir` by its file stem
    pub fn scan_dir(dir: &Path) -> Result<Self, AudioError> {
        let mut clips = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_clip = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| CLIP_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if !is_clip {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                clips.insert(stem.to_string(), path.to_string_lossy().into_owned());
            }
        }
        log::info!("Found {} clips in {}", clips.len(), dir.display());
        Ok(Self { clips })
    }

    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.clips.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("plus 3"), "plus_3");
        assert_eq!(normalize_key("Divided  by 2"), "divided_by_2");
        assert_eq!(normalize_key(" minus, 4! "), "minus_4");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn test_manifest() {
        let library =
            ClipLibrary::from_manifest(r#"{"countdown_go": "go.wav", "game_over": "over.wav"}"#)
                .unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.resolve("countdown_go"), Some("go.wav"));
        assert_eq!(library.resolve("countdown_3"), None);
    }

    #[test]
    fn test_bad_manifest() {
        assert!(matches!(
            ClipLibrary::from_manifest("[1, 2]"),
            Err(AudioError::Manifest(_))
        ));
    }

    #[test]
    fn test_load_manifest_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("clips.json");
        std::fs::write(&manifest, r#"{"game_over": "over.wav", "countdown_1": "/abs/one.wav"}"#)
            .unwrap();

        let library = ClipLibrary::load_manifest(&manifest).unwrap();
        let expected = dir.path().join("over.wav");
        assert_eq!(library.resolve("game_over"), expected.to_str());
        assert_eq!(library.resolve("countdown_1"), Some("/abs/one.wav"));
    }

    #[test]
    fn test_scan_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("announce_left_plus_3.wav"), b"").unwrap();
        std::fs::write(dir.path().join("countdown_go.OGG"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let library = ClipLibrary::scan_dir(dir.path()).unwrap();
        assert_eq!(library.len(), 2);
        assert!(library.resolve("announce_left_plus_3").is_some());
        assert!(library.resolve("countdown_go").is_some());
        assert!(library.resolve("notes").is_none());
    }
}
