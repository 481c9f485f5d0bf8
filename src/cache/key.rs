use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a generation request.
///
/// Equality and hashing use the SHA-256 digest only; the canonical text is
/// kept so diagnostics can show what a key stands for. It is JSON, so two
/// different keys never render the same.
#[derive(Clone, Debug)]
pub struct CacheKey {
    digest: Arc<str>,
    canonical: Arc<str>,
}

impl CacheKey {
    /// Key for a set of ingredient names, insensitive to order, case and
    /// surrounding whitespace. Returns `None` when no non-blank name is given.
    pub fn from_ingredients<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        Self::from_normalized(&normalize_ingredients(names))
    }

    /// Key for names already passed through [`normalize_ingredients`].
    pub fn from_normalized(names: &[String]) -> Option<Self> {
        if names.is_empty() {
            return None;
        }

        // Length-prefixed so ["a, b"] can never collide with ["a", "b"]
        let mut hasher = Sha256::new();
        hasher.update(b"ingredients");
        hasher.update((names.len() as u64).to_le_bytes());
        for name in names {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
        }

        Some(Self {
            digest: format!("{:x}", hasher.finalize()).into(),
            canonical: serde_json::Value::from(names.to_vec()).to_string().into(),
        })
    }

    /// Key for an arbitrary, already canonical request payload.
    pub fn from_payload(payload: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"payload");
        hasher.update((payload.len() as u64).to_le_bytes());
        hasher.update(payload.as_bytes());
        Self {
            digest: format!("{:x}", hasher.finalize()).into(),
            canonical: serde_json::Value::from(payload).to_string().into(),
        }
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Trim, collapse inner whitespace, lowercase, drop blanks and sort.
///
/// Duplicates are kept: `["egg", "egg"]` and `["egg"]` are different requests.
pub fn normalize_ingredients<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = names
        .iter()
        .map(|name| {
            name.as_ref()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .filter(|name| !name.is_empty())
        .collect();
    normalized.sort_unstable();
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_order_and_case_insensitive() {
        let k1 = CacheKey::from_ingredients(&["Tomato", "Onion"]).unwrap();
        let k2 = CacheKey::from_ingredients(&["onion", "tomato"]).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(k1.digest(), k2.digest());
    }

    #[test]
    fn test_key_ignores_surrounding_and_repeated_whitespace() {
        let k1 = CacheKey::from_ingredients(&["  Red   Pepper ", "rice"]).unwrap();
        let k2 = CacheKey::from_ingredients(&["rice", "red pepper"]).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(k1.canonical(), r#"["red pepper","rice"]"#);
    }

    #[test]
    fn test_key_keeps_duplicates() {
        let once = CacheKey::from_ingredients(&["egg"]).unwrap();
        let twice = CacheKey::from_ingredients(&["egg", "Egg"]).unwrap();
        assert_ne!(once, twice);
    }

    #[test]
    fn test_key_rejects_blank_input() {
        assert!(CacheKey::from_ingredients::<&str>(&[]).is_none());
        assert!(CacheKey::from_ingredients(&["", "   "]).is_none());
    }

    #[test]
    fn test_key_no_separator_collision() {
        let joined = CacheKey::from_ingredients(&["basil, garlic"]).unwrap();
        let split = CacheKey::from_ingredients(&["basil", "garlic"]).unwrap();
        assert_ne!(joined, split, "length prefixes must keep these apart");
        assert_eq!(joined.canonical(), r#"["basil, garlic"]"#);
        assert_eq!(split.canonical(), r#"["basil","garlic"]"#);
    }

    #[test]
    fn test_payload_key_differs_from_ingredient_key() {
        let ingredients = CacheKey::from_ingredients(&["salt"]).unwrap();
        let payload = CacheKey::from_payload("salt");
        assert_ne!(ingredients, payload);
        assert_eq!(payload, CacheKey::from_payload("salt"));
        assert_eq!(payload.canonical(), r#""salt""#);
        assert_ne!(payload.canonical(), ingredients.canonical());
    }

    #[test]
    fn test_normalize_sorts_and_lowercases() {
        let names = normalize_ingredients(&["Zucchini", " apple", "", "Carrot "]);
        assert_eq!(names, vec!["apple", "carrot", "zucchini"]);
    }
}
