use super::address::CidrAddress;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Error handling
use wgtool_error::{JoinedError, WgError};

/**
Routed subnets advertised by a node.
Written as a comma separated list: "10.1.0.0/24,10.2.0.0/24".
*/
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct SubnetList(Vec<CidrAddress>);

impl SubnetList {
    pub fn new(subnets: Vec<CidrAddress>) -> Self {
        SubnetList(subnets)
    }
    /**
    Parse every comma separated entry on its own.

    Entries that parse are kept, in order, even when others fail.
    Every failure is reported in a single joined error.
    A blank string is an empty list.
    */
    pub fn parse(s: &str) -> (Self, Option<WgError>) {
        let mut list = SubnetList::default();
        if s.trim().is_empty() {
            return (list, None);
        }
        let mut errors = JoinedError::default();
        for entry in s.split(',').map(|e| e.trim()) {
            match CidrAddress::from_str(entry) {
                Ok(v) => list.0.push(v),
                Err(e) => errors.push(e),
            }
        }
        (list, errors.into_error())
    }
    /// Network projection of every entry.
    pub fn networks(&self) -> Vec<CidrAddress> {
        self.0.iter().map(|e| e.network()).collect()
    }
    pub fn push(&mut self, subnet: CidrAddress) {
        self.0.push(subnet);
    }
    pub fn iter(&self) -> std::slice::Iter<'_, CidrAddress> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strict parsing: a single bad entry rejects the whole list.
impl FromStr for SubnetList {
    type Err = WgError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::parse(s) {
            (_, Some(e)) => Err(e),
            (list, None) => Ok(list),
        }
    }
}
impl fmt::Display for SubnetList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subnets: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", subnets.join(","))
    }
}
impl From<Vec<CidrAddress>> for SubnetList {
    fn from(subnets: Vec<CidrAddress>) -> Self {
        SubnetList(subnets)
    }
}
impl FromIterator<CidrAddress> for SubnetList {
    fn from_iter<I: IntoIterator<Item = CidrAddress>>(iter: I) -> Self {
        SubnetList(iter.into_iter().collect())
    }
}
impl IntoIterator for SubnetList {
    type Item = CidrAddress;
    type IntoIter = std::vec::IntoIter<CidrAddress>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
impl<'a> IntoIterator for &'a SubnetList {
    type Item = &'a CidrAddress;
    type IntoIter = std::slice::Iter<'a, CidrAddress>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for SubnetList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
impl<'de> Deserialize<'de> for SubnetList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        SubnetList::from_str(&string).map_err(de::Error::custom)
    }
}
