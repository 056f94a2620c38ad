use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("invalid runtime format")]
    InvalidFormat,
}

/// Movie running time in whole minutes.
///
/// On the wire it travels as a JSON string holding the decimal digits
/// (`"102"`), unlike every other numeric field of a movie. Decoding accepts
/// nothing else: JSON numbers, floats, signs and non-digit text are all
/// rejected with [`RuntimeError::InvalidFormat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Runtime(i32);

impl Runtime {
    pub const fn new(minutes: i32) -> Self {
        Runtime(minutes)
    }

    pub const fn minutes(&self) -> i32 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for Runtime {
    fn from(minutes: i32) -> Self {
        Runtime(minutes)
    }
}

impl From<Runtime> for i32 {
    fn from(runtime: Runtime) -> Self {
        runtime.0
    }
}

impl Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Runtime {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // i32::from_str would also take a leading sign
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RuntimeError::InvalidFormat);
        }
        s.parse::<i32>()
            .map(Runtime)
            .map_err(|_| RuntimeError::InvalidFormat)
    }
}

impl Serialize for Runtime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct RuntimeVisitor;

impl de::Visitor<'_> for RuntimeVisitor {
    type Value = Runtime;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string containing a non-negative number of minutes")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E>(self, _v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(E::custom(RuntimeError::InvalidFormat))
    }

    fn visit_u64<E>(self, _v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(E::custom(RuntimeError::InvalidFormat))
    }

    fn visit_f64<E>(self, _v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(E::custom(RuntimeError::InvalidFormat))
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RuntimeVisitor)
    }
}
