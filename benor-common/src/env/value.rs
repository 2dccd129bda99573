use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two binary symbols a node can hold or decide on.
///
/// Serialized as the plain integers `0` and `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Value {
    Zero,
    One,
}

impl Value {
    /// Deterministic fallback for round `k`: `k mod 2`.
    pub fn for_round(round: u64) -> Self {
        if round % 2 == 0 {
            Value::Zero
        } else {
            Value::One
        }
    }

    pub fn as_u8(self) -> u8 {
        self.into()
    }
}

impl From<Value> for u8 {
    fn from(v: Value) -> Self {
        match v {
            Value::Zero => 0,
            Value::One => 1,
        }
    }
}

impl TryFrom<u8> for Value {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Value::Zero),
            1 => Ok(Value::One),
            other => Err(format!("invalid binary value: {other}")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_fallback_alternates() {
        assert_eq!(Value::for_round(1), Value::One);
        assert_eq!(Value::for_round(2), Value::Zero);
        assert_eq!(Value::for_round(11), Value::One);
    }

    #[test]
    fn test_serde_as_integer() {
        assert_eq!(serde_json::to_string(&Value::One).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Value>("0").unwrap(), Value::Zero);
        assert!(serde_json::from_str::<Value>("2").is_err());
    }
}
