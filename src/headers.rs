use crate::{Error, ErrorKind};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;

///
/// One or more values stored under a single header field, in the order they were given.
///
/// Headers that are set from a single string hold exactly one value; headers like
/// `Set-Cookie` may hold several.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderValues(Vec<String>);

impl HeaderValues {
    ///
    /// Returns the value when exactly one is stored.
    ///
    pub fn as_str(&self) -> Option<&str> {
        match self.0.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }

    ///
    /// Returns every stored value in insertion order.
    ///
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterates the stored values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no value is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HeaderValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        HeaderValues(vec![value.to_owned()])
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        HeaderValues(vec![value])
    }
}

impl From<&String> for HeaderValues {
    fn from(value: &String) -> Self {
        HeaderValues(vec![value.clone()])
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        HeaderValues(values)
    }
}

impl From<Vec<&str>> for HeaderValues {
    fn from(values: Vec<&str>) -> Self {
        HeaderValues(values.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for HeaderValues {
    fn from(values: &[&str]) -> Self {
        HeaderValues(values.iter().map(|v| (*v).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderValues {
    fn from(values: [&str; N]) -> Self {
        HeaderValues(values.iter().map(|v| (*v).to_owned()).collect())
    }
}

impl PartialEq<str> for HeaderValues {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for HeaderValues {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for HeaderValues {
    fn eq(&self, other: &[&str; N]) -> bool {
        self.0.len() == N && self.0.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

///
/// A header store keyed by lowercased field name.
///
/// Lookups ignore the field letter case. Fields keep the order in which they were first set;
/// setting an existing field replaces its values in place.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, HeaderValues)>,
}

impl Headers {
    /// An empty header store.
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Stores `value` under `name`, replacing anything stored under the same field.
    ///
    pub fn set<V: Into<HeaderValues>>(&mut self, name: &str, value: V) {
        let field = name.to_lowercase();
        let value = value.into();

        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((field, value)),
        }
    }

    ///
    /// Adds `value` to the values stored under `name`, keeping the existing ones.
    ///
    pub fn append(&mut self, name: &str, value: &str) {
        let field = name.to_lowercase();

        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => existing.0.push(value.to_owned()),
            None => self.fields.push((field, value.into())),
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&HeaderValues> {
        let field = name.to_lowercase();

        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value)
    }

    /// Whether the field is set, ignoring the letter case.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes the field and returns its values, if it was present.
    pub fn remove(&mut self, name: &str) -> Option<HeaderValues> {
        let field = name.to_lowercase();
        let pos = self.fields.iter().position(|(f, _)| *f == field)?;

        Some(self.fields.remove(pos).1)
    }

    /// Iterates `(lowercased name, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValues)> {
        self.fields.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// Number of distinct fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn to_header_map(&self) -> Result<HeaderMap, Error> {
        let mut map = HeaderMap::new();

        for (field, values) in self.iter() {
            let name = HeaderName::from_bytes(field.as_bytes())
                .map_err(|_| Error::new_with_context(ErrorKind::InvalidHeaderName, field))?;

            for value in values.iter() {
                let value = HeaderValue::from_str(value)
                    .map_err(|_| Error::new_with_context(ErrorKind::InvalidHeaderValue, value))?;
                map.append(name.clone(), value);
            }
        }

        Ok(map)
    }

    pub(crate) fn from_header_map(map: &HeaderMap) -> Result<Self, Error> {
        let mut headers = Headers::new();

        for (name, value) in map {
            let value = value
                .to_str()
                .map_err(|_| Error::new_with_context(ErrorKind::InvalidHeaderValue, name))?;
            headers.append(name.as_str(), value);
        }

        Ok(headers)
    }
}

impl<K: AsRef<str>, V: Into<HeaderValues>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name.as_ref(), value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.set("X-Api-Key", "1234");
        headers.set("content-type", "application/json");

        let fields: Vec<&str> = headers.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["content-type", "x-api-key"]);
        assert_eq!(headers.get("CONTENT-TYPE").unwrap(), "application/json");
    }

    #[test]
    fn test_append_keeps_order() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");

        assert_eq!(headers.get("set-cookie").unwrap(), &["a=1", "b=2"]);
        assert_eq!(headers.get("set-cookie").unwrap().as_str(), None);
    }

    #[test]
    fn test_remove() {
        let mut headers: Headers = [("Accept", "*/*")].into_iter().collect();

        assert_eq!(headers.remove("accept").unwrap(), "*/*");
        assert!(headers.remove("accept").is_none());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_header_map_keeps_multiple_values() {
        let mut headers = Headers::new();
        headers.set("Set-Cookie", ["a=1", "b=2"]);

        let map = headers.to_header_map().unwrap();
        let values: Vec<&str> = map
            .get_all("set-cookie")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a=1", "b=2"]);

        let back = Headers::from_header_map(&map).unwrap();
        assert_eq!(back, headers);
    }

    #[test]
    fn test_invalid_header_name() {
        let mut headers = Headers::new();
        headers.set("bad header", "x");

        let err = headers.to_header_map().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidHeaderName);
    }
}
