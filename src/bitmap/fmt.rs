use std::fmt;

use crate::RoaringBitmap;

impl fmt::Debug for RoaringBitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.len(), self.min(), self.max()) {
            (len, Some(min), Some(max)) if len >= 16 => write!(
                f,
                "RoaringBitmap<{:?} values between {:?} and {:?} in {:?} containers>",
                len,
                min,
                max,
                self.containers.len()
            ),
            _ => write!(f, "RoaringBitmap<{:?}>", self.iter().collect::<Vec<u32>>()),
        }
    }
}
