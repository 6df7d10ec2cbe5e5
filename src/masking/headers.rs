//! Header masking.

use std::fmt;

use axum::http::HeaderMap;
use serde::Serialize;

use crate::masking::predicate::MaskPredicate;
use crate::masking::SENTINEL;

/// One header name with every value it carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderEntry {
    pub name: String,
    pub values: Vec<String>,
}

/// Ordered header collection used for logging.
///
/// Unlike `HeaderMap`, names keep the casing they were recorded with and
/// entries keep first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderList {
    entries: Vec<HeaderEntry>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, grouping it under an existing entry when the name
    /// matches case-insensitively.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.values.push(value),
            None => self.entries.push(HeaderEntry {
                name,
                values: vec![value],
            }),
        }
    }

    /// All values recorded for `name`, compared case-insensitively.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.values.as_slice())
    }

    /// First value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of this collection with every value of a matched name replaced
    /// by a single sentinel.
    pub fn masked(&self, predicate: &MaskPredicate) -> HeaderList {
        let mut masked = self.clone();
        mask_headers(&mut masked, predicate);
        masked
    }
}

impl From<&HeaderMap> for HeaderList {
    fn from(map: &HeaderMap) -> Self {
        let mut list = HeaderList::new();
        for name in map.keys() {
            let values = map
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            list.entries.push(HeaderEntry {
                name: name.as_str().to_string(),
                values,
            });
        }
        list
    }
}

impl<N, V> FromIterator<(N, V)> for HeaderList
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut list = HeaderList::new();
        for (name, value) in iter {
            list.append(name, value);
        }
        list
    }
}

/// Renders as `[name:"v1", "v2", other:"v"]`.
impl fmt::Display for HeaderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}:", entry.name)?;
            for (j, value) in entry.values.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "\"{}\"", value)?;
            }
        }
        f.write_str("]")
    }
}

/// Replace all values of every header whose name matches `predicate` with a
/// single sentinel. Returns how many headers were masked.
pub fn mask_headers(headers: &mut HeaderList, predicate: &MaskPredicate) -> usize {
    if predicate.is_never() {
        return 0;
    }

    let mut masked = 0;
    for entry in headers.entries.iter_mut() {
        if predicate.test(&entry.name) {
            entry.values = vec![SENTINEL.to_string()];
            masked += 1;
        }
    }
    masked
}
