use std::collections::BTreeMap;
use std::fmt;

/// Value stored under a fid namespace: a plain identifier, a number, or a
/// nested mapping (the `generic` namespace holds attributes such as `level`).
#[derive(Debug, Clone, PartialEq)]
pub enum FidValue {
    Text(String),
    Number(f64),
    Map(BTreeMap<String, FidValue>),
}

impl fmt::Display for FidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FidValue::Text(s) => write!(f, "'{}'", s),
            FidValue::Number(n) => write!(f, "{}", n),
            FidValue::Map(m) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in m.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for FidValue {
    fn from(s: &str) -> Self {
        FidValue::Text(s.to_string())
    }
}

impl From<String> for FidValue {
    fn from(s: String) -> Self {
        FidValue::Text(s)
    }
}

impl From<f64> for FidValue {
    fn from(n: f64) -> Self {
        FidValue::Number(n)
    }
}

/// Field identifier: namespace name -> identifier value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fid(BTreeMap<String, FidValue>);

pub const GENERIC: &str = "generic";

impl Fid {
    pub fn new() -> Self {
        Fid(BTreeMap::new())
    }

    /// Single-namespace fid, e.g. `Fid::with("FA", "SURFTEMPERATURE")`.
    pub fn with(namespace: &str, value: impl Into<FidValue>) -> Self {
        let mut fid = Fid::new();
        fid.insert(namespace, value);
        fid
    }

    /// Fid of an arithmetic result, `{'op': '+'}`.
    pub fn operation(op: &str) -> Self {
        Fid::with("op", op)
    }

    pub fn insert(&mut self, namespace: &str, value: impl Into<FidValue>) {
        self.0.insert(namespace.to_string(), value.into());
    }

    pub fn get(&self, namespace: &str) -> Option<&FidValue> {
        self.0.get(namespace)
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.0.contains_key(namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FidValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sets one attribute of the `generic` namespace, creating it if needed.
    /// A non-map generic entry is replaced.
    pub fn set_generic(&mut self, key: &str, value: impl Into<FidValue>) {
        let entry = self
            .0
            .entry(GENERIC.to_string())
            .or_insert_with(|| FidValue::Map(BTreeMap::new()));
        if !matches!(entry, FidValue::Map(_)) {
            *entry = FidValue::Map(BTreeMap::new());
        }
        if let FidValue::Map(map) = entry {
            map.insert(key.to_string(), value.into());
        }
    }

    pub fn generic(&self, key: &str) -> Option<&FidValue> {
        match self.0.get(GENERIC) {
            Some(FidValue::Map(map)) => map.get(key),
            _ => None,
        }
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, (ns, value)) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{}': {}", ns, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_level_attribute() {
        let mut fid = Fid::with("FA", "S001TEMPERATURE");
        fid.set_generic("level", 1.0);
        assert_eq!(fid.generic("level"), Some(&FidValue::Number(1.0)));
        assert_eq!(fid.get("FA"), Some(&FidValue::from("S001TEMPERATURE")));
    }

    #[test]
    fn test_display() {
        let fid = Fid::operation("+");
        assert_eq!(fid.to_string(), "{'op': '+'}");
    }
}
