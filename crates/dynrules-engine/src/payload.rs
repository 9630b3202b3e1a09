use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, SeqAccess, Visitor},
};

/// Opaque content carried by a [`Rule`](crate::Rule).
///
/// The engine never interprets a payload; it only measures its length (for the
/// generator's byte ceiling) and concatenates payloads into scripts. Text and binary
/// content share this single representation.
///
/// # Serialization
///
/// A payload that is valid UTF-8 serializes as a string, anything else as bytes. Both
/// forms (and a sequence of integers, which is how JSON renders bytes) deserialize back
/// into a payload.
///
/// ```
/// use dynrules_engine::Payload;
///
/// let payload = Payload::from("attack();\n");
/// assert_eq!(payload.len(), 10);
/// assert_eq!(payload.as_str(), Some("attack();\n"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Payload(Vec<u8>);

impl Payload {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the payload as text if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Appends another payload's bytes.
    pub fn extend_from(&mut self, other: &Payload) {
        self.0.extend_from_slice(&other.0);
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.as_str() {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_bytes(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PayloadVisitor)
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = Payload;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, a byte buffer or a sequence of bytes")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Payload::from(v))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Payload::from(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Payload::from(v))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Payload::from(v))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Payload::new())
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(Payload::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_serializes_as_string() {
        let payload = Payload::from("move(1, 2);");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, "\"move(1, 2);\"");
    }

    #[test]
    fn test_binary_serializes_as_byte_sequence() {
        let payload = Payload::from(vec![0xff, 0x00, 0x7f]);
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, "[255,0,127]");

        let restored: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, payload);
        assert_eq!(restored.as_str(), None);
    }

    #[test]
    fn test_null_deserializes_as_empty() {
        let payload: Payload = serde_json::from_str("null").unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_extend_from_concatenates() {
        let mut body = Payload::from("a;");
        body.extend_from(&Payload::from("b;"));
        assert_eq!(body.as_bytes(), b"a;b;");
        assert_eq!(body.to_string(), "a;b;");
    }
}
