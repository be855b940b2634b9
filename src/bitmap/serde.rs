use std::fmt;

use serde::de::{Error as _, SeqAccess, Visitor};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::RoaringBitmap;

/// Bitmaps travel through serde as the bytes of their portable serialization.
impl Serialize for RoaringBitmap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut buf = Vec::with_capacity(self.serialized_size());
        self.serialize_into(&mut buf).map_err(S::Error::custom)?;

        serializer.serialize_bytes(&buf)
    }
}

impl<'de> Deserialize<'de> for RoaringBitmap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_bytes(BitmapVisitor)
    }
}

struct BitmapVisitor;

impl<'de> Visitor<'de> for BitmapVisitor {
    type Value = RoaringBitmap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("the bytes of a serialized roaring bitmap")
    }

    fn visit_bytes<E>(self, bytes: &[u8]) -> Result<RoaringBitmap, E>
    where
        E: serde::de::Error,
    {
        RoaringBitmap::deserialize_from_slice(bytes).map_err(E::custom)
    }

    // self-describing formats such as JSON hand bytes over as a sequence
    fn visit_seq<A>(self, mut seq: A) -> Result<RoaringBitmap, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut bytes: Vec<u8> = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1 << 16));
        while let Some(byte) = seq.next_element()? {
            bytes.push(byte);
        }
        RoaringBitmap::deserialize_from_slice(&bytes).map_err(A::Error::custom)
    }
}
