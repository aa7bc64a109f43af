use glob::Pattern;
use log::debug;

use crate::error::{FieldError, Result};
use crate::fid::{Fid, FidValue};
use crate::field::{CommonField, D3Field};
use crate::geometry::Structure;

/// Source of fields (a file, an archive, a memory store...).
pub trait Resource: Send + Sync {
    /// Namespace of the fids this resource understands (e.g. a format name)
    fn namespace(&self) -> &str;

    /// Fids matching a list of seeds
    ///
    /// Seed values under the resource namespace may be glob patterns
    /// (`S0*TEMPERATURE`).
    ///
    /// # Arguments
    /// * `seed` - Fid patterns
    /// * `fieldtype` - Accepted structures; empty means any
    ///
    /// # Returns
    /// * `Result<Vec<Fid>>` - Matching fids, in resource order
    fn find_fields_in_resource(&self, seed: &[Fid], fieldtype: &[Structure]) -> Result<Vec<Fid>>;

    /// Read a field
    ///
    /// # Arguments
    /// * `fid` - Field identifier
    /// * `getdata` - Read the data buffer, or metadata only
    ///
    /// # Returns
    /// * `Result<D3Field>` - The field
    fn readfield(&self, fid: &Fid, getdata: bool) -> Result<D3Field>;

    /// Write a field into the resource
    fn writefield(&mut self, field: &D3Field) -> Result<()>;

    /// All fids of the resource
    fn listfields(&self) -> Vec<Fid>;
}

/// Resource holding fields in memory, identified by their fid value under
/// `namespace`.
#[derive(Debug, Clone)]
pub struct InMemoryResource {
    namespace: String,
    fields: Vec<D3Field>,
}

impl InMemoryResource {
    pub fn new(namespace: &str) -> Self {
        InMemoryResource {
            namespace: namespace.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn key_of<'a>(&self, fid: &'a Fid) -> Result<&'a FidValue> {
        fid.get(&self.namespace).ok_or_else(|| {
            FieldError::Resource(format!("fid {} has no '{}' key", fid, self.namespace))
        })
    }

    fn find(&self, key: &FidValue) -> Option<&D3Field> {
        self.fields
            .iter()
            .find(|f| f.fid().get(&self.namespace) == Some(key))
    }
}

fn value_matches(pattern: &FidValue, value: &FidValue) -> bool {
    match (pattern, value) {
        (FidValue::Text(p), FidValue::Text(v)) => match Pattern::new(p) {
            Ok(glob) => glob.matches(v),
            Err(_) => p == v,
        },
        (FidValue::Map(p), FidValue::Map(v)) => p
            .iter()
            .all(|(key, pv)| v.get(key).map_or(false, |vv| value_matches(pv, vv))),
        (p, v) => p == v,
    }
}

fn fid_matches(seed: &Fid, fid: &Fid) -> bool {
    seed.iter()
        .all(|(ns, pattern)| fid.get(ns).map_or(false, |v| value_matches(pattern, v)))
}

impl Resource for InMemoryResource {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn find_fields_in_resource(&self, seed: &[Fid], fieldtype: &[Structure]) -> Result<Vec<Fid>> {
        let found: Vec<Fid> = self
            .fields
            .iter()
            .filter(|f| fieldtype.is_empty() || fieldtype.contains(&f.structure()))
            .filter(|f| seed.is_empty() || seed.iter().any(|s| fid_matches(s, f.fid())))
            .map(|f| f.fid().clone())
            .collect();
        debug!("{} field(s) found in '{}' resource", found.len(), self.namespace);
        Ok(found)
    }

    fn readfield(&self, fid: &Fid, getdata: bool) -> Result<D3Field> {
        let key = self.key_of(fid)?;
        let field = self.find(key).ok_or_else(|| {
            FieldError::Resource(format!("field {} not found in resource", key))
        })?;
        let mut field = field.clone();
        if !getdata {
            field.deldata();
        }
        Ok(field)
    }

    fn writefield(&mut self, field: &D3Field) -> Result<()> {
        let key = self.key_of(field.fid())?.clone();
        if self.find(&key).is_some() {
            return Err(FieldError::Resource(format!(
                "a field {} already exists in resource",
                key
            )));
        }
        self.fields.push(field.clone());
        Ok(())
    }

    fn listfields(&self) -> Vec<Fid> {
        self.fields.iter().map(|f| f.fid().clone()).collect()
    }
}
