use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::error::{FieldError, Result};

/// One instant of a field's time axis: the basis (reference) date and the
/// term relative to it. Both are optional so that arithmetic results can
/// carry a "null" validity of the right length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldValidity {
    pub basis: Option<DateTime<Utc>>,
    pub term: Option<Duration>,
    /// Length of the accumulation period, for cumulated quantities.
    pub cumulativeduration: Option<Duration>,
}

impl FieldValidity {
    pub fn new(basis: DateTime<Utc>, term: Duration) -> Self {
        FieldValidity {
            basis: Some(basis),
            term: Some(term),
            cumulativeduration: None,
        }
    }

    /// Validity given by its date and basis; the term is derived.
    pub fn from_dates(date_time: DateTime<Utc>, basis: DateTime<Utc>) -> Self {
        FieldValidity::new(basis, date_time - basis)
    }

    pub fn null() -> Self {
        FieldValidity::default()
    }

    pub fn is_null(&self) -> bool {
        self.basis.is_none() && self.term.is_none()
    }

    pub fn with_cumulativeduration(mut self, duration: Duration) -> Self {
        self.cumulativeduration = Some(duration);
        self
    }

    /// Validity date: basis + term.
    pub fn get(&self) -> Option<DateTime<Utc>> {
        match (self.basis, self.term) {
            (Some(basis), Some(term)) => Some(basis + term),
            (Some(basis), None) => Some(basis),
            _ => None,
        }
    }

    pub fn getbasis(&self) -> Option<DateTime<Utc>> {
        self.basis
    }

    pub fn term(&self) -> Option<Duration> {
        self.term
    }
}

impl fmt::Display for FieldValidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.get(), self.basis) {
            (Some(date), Some(basis)) => {
                write!(f, "{} (basis {}", date.format("%Y-%m-%d %H:%M:%S"), basis.format("%Y-%m-%d %H:%M:%S"))?;
                if let Some(cumul) = self.cumulativeduration {
                    write!(f, ", cumulated over {}s", cumul.num_seconds())?;
                }
                write!(f, ")")
            }
            _ => write!(f, "(null validity)"),
        }
    }
}

/// Ordered, non-empty list of validities: the field's time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValidityList {
    items: Vec<FieldValidity>,
}

impl Default for FieldValidityList {
    fn default() -> Self {
        FieldValidityList::with_length(1)
    }
}

impl FieldValidityList {
    pub fn new(items: Vec<FieldValidity>) -> Result<Self> {
        if items.is_empty() {
            return Err(FieldError::domain("a validity list cannot be empty"));
        }
        Ok(FieldValidityList { items })
    }

    pub fn single(validity: FieldValidity) -> Self {
        FieldValidityList { items: vec![validity] }
    }

    /// `length` null validities.
    pub fn with_length(length: usize) -> Self {
        FieldValidityList {
            items: vec![FieldValidity::null(); length.max(1)],
        }
    }

    /// Regularly spaced terms from one basis.
    pub fn from_terms(basis: DateTime<Utc>, terms: &[Duration]) -> Result<Self> {
        FieldValidityList::new(terms.iter().map(|t| FieldValidity::new(basis, *t)).collect())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Option<&FieldValidity> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldValidity> {
        self.items.iter()
    }

    /// Index of the first entry equal to `validity`.
    pub fn index_of(&self, validity: &FieldValidity) -> Option<usize> {
        self.items.iter().position(|v| v == validity)
    }

    /// Single-validity list holding entry `index`.
    pub fn select(&self, index: usize) -> Result<Self> {
        self.items
            .get(index)
            .map(|v| FieldValidityList::single(v.clone()))
            .ok_or_else(|| {
                FieldError::domain(format!(
                    "validity index {} out of range (length {})",
                    index,
                    self.items.len()
                ))
            })
    }

    pub fn extend(&mut self, other: &FieldValidityList) {
        self.items.extend(other.items.iter().cloned());
    }
}

impl std::ops::Index<usize> for FieldValidityList {
    type Output = FieldValidity;

    fn index(&self, index: usize) -> &FieldValidity {
        &self.items[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validity_date_from_basis_and_term() {
        let basis = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let v = FieldValidity::new(basis, Duration::hours(6));
        assert_eq!(v.get(), Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()));
        assert!(!v.is_null());
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(FieldValidityList::new(vec![]).is_err());
    }

    #[test]
    fn test_extend_and_index() {
        let basis = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut list = FieldValidityList::from_terms(basis, &[Duration::hours(0), Duration::hours(1)]).unwrap();
        let more = FieldValidityList::from_terms(basis, &[Duration::hours(2)]).unwrap();
        list.extend(&more);
        assert_eq!(list.len(), 3);
        assert_eq!(list.index_of(&FieldValidity::new(basis, Duration::hours(2))), Some(2));
        assert!(list.select(3).is_err());
    }
}
