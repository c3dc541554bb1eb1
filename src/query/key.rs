//! Structured cache keys.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// One component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
  Str(String),
  Int(i64),
  Bool(bool),
  Map(BTreeMap<String, String>),
  None,
}

impl From<&str> for KeyPart {
  fn from(s: &str) -> Self {
    Self::Str(s.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(s: String) -> Self {
    Self::Str(s)
  }
}

impl From<&String> for KeyPart {
  fn from(s: &String) -> Self {
    Self::Str(s.clone())
  }
}

impl From<i64> for KeyPart {
  fn from(n: i64) -> Self {
    Self::Int(n)
  }
}

impl From<i32> for KeyPart {
  fn from(n: i32) -> Self {
    Self::Int(n.into())
  }
}

impl From<u32> for KeyPart {
  fn from(n: u32) -> Self {
    Self::Int(n.into())
  }
}

impl From<bool> for KeyPart {
  fn from(b: bool) -> Self {
    Self::Bool(b)
  }
}

impl From<BTreeMap<String, String>> for KeyPart {
  fn from(map: BTreeMap<String, String>) -> Self {
    Self::Map(map)
  }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Self::None)
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Str(s) => f.write_str(s),
      Self::Int(n) => write!(f, "{}", n),
      Self::Bool(b) => write!(f, "{}", b),
      Self::Map(map) => {
        f.write_str("{")?;
        for (i, (k, v)) in map.iter().enumerate() {
          if i > 0 {
            f.write_str(",")?;
          }
          write!(f, "{}={}", k, v)?;
        }
        f.write_str("}")
      }
      Self::None => f.write_str("-"),
    }
  }
}

/// Ordered tuple identifying one cache entry: resource name first, then
/// parameters. Structurally equal keys address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
  pub fn new<I, P>(parts: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<KeyPart>,
  {
    Self(parts.into_iter().map(Into::into).collect())
  }

  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.0.push(part.into());
    self
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.0
  }

  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.starts_with(&prefix.0)
  }

  /// Stable fixed-length digest, used to correlate log lines for a key.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", self.0).as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, part) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("/")?;
      }
      write!(f, "{}", part)?;
    }
    Ok(())
  }
}
