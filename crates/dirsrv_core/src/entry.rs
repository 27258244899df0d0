//! Directory entries.

use crate::attribute::{base_type, canonical_type, values_match, Attribute};
use crate::dn::Dn;
use crate::error::EntryError;
use crate::modification::{Modification, ModifyOperation};

/// An entry: a DN and its attributes in insertion order.
///
/// Attribute types are unique within an entry and every attribute has at
/// least one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    dn: Dn,
    attributes: Vec<Attribute>,
}

impl Entry {
    /// Creates an entry with no attributes.
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: Vec::new(),
        }
    }

    /// Builds an entry from the `Add` modifications of an add request.
    pub fn from_modifications(dn: Dn, mods: Vec<Modification>) -> Result<Self, EntryError> {
        let mut entry = Self::new(dn);
        entry.merge(mods)?;
        Ok(entry)
    }

    /// The entry DN.
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an attribute by description, ignoring case.
    pub fn get(&self, attr_type: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is(attr_type))
    }

    fn get_mut(&mut self, attr_type: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.is(attr_type))
    }

    /// True if the attribute is present.
    pub fn has(&self, attr_type: &str) -> bool {
        self.get(attr_type).is_some()
    }

    /// Inserts an attribute, replacing one of the same type.
    pub fn put(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.key() == attribute.key()) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Removes an attribute.
    pub fn remove(&mut self, attr_type: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.is(attr_type))?;
        Some(self.attributes.remove(index))
    }

    /// Merges `Add` modifications into the entry.
    ///
    /// Fails without changing the entry if any modification is not an add,
    /// has no values, or names a type the entry already has.
    pub fn merge(&mut self, mods: Vec<Modification>) -> Result<(), EntryError> {
        let mut merged = Vec::with_capacity(mods.len());
        for m in mods {
            if m.op != ModifyOperation::Add {
                return Err(EntryError::NotAnAdd {
                    attr_type: m.attr_type,
                });
            }
            let taken = self.has(&m.attr_type)
                || merged.iter().any(|a: &Attribute| a.is(&m.attr_type));
            if taken {
                return Err(EntryError::DuplicateAttribute {
                    attr_type: m.attr_type,
                });
            }
            merged.push(Attribute::new(m.attr_type, m.values)?);
        }
        self.attributes.extend(merged);
        Ok(())
    }

    /// Returns a copy of the entry with `mods` applied in order.
    ///
    /// Fails with the first error; `self` is never changed.
    pub fn apply_modifications(&self, mods: &[Modification]) -> Result<Entry, EntryError> {
        let mut next = self.clone();
        for m in mods {
            match m.op {
                ModifyOperation::Add => next.modify_add(m)?,
                ModifyOperation::Delete => next.modify_delete(m)?,
                ModifyOperation::Replace => next.modify_replace(m)?,
            }
        }
        self.check_rdn_kept(&next)?;
        Ok(next)
    }

    fn modify_add(&mut self, m: &Modification) -> Result<(), EntryError> {
        if m.values.is_empty() {
            return Err(EntryError::NoValues {
                attr_type: m.attr_type.clone(),
            });
        }
        let position = match self.attributes.iter().position(|a| a.is(&m.attr_type)) {
            Some(position) => position,
            None => {
                self.attributes.push(Attribute::empty(m.attr_type.clone()));
                self.attributes.len() - 1
            }
        };
        let attr = &mut self.attributes[position];
        for (index, value) in m.values.iter().enumerate() {
            if !attr.push(value.clone()) {
                return Err(EntryError::ValueExists {
                    attr_type: m.attr_type.clone(),
                    index,
                });
            }
        }
        Ok(())
    }

    fn modify_delete(&mut self, m: &Modification) -> Result<(), EntryError> {
        if m.values.is_empty() {
            return match self.remove(&m.attr_type) {
                Some(_) => Ok(()),
                None => Err(EntryError::NoSuchAttribute {
                    attr_type: m.attr_type.clone(),
                }),
            };
        }
        let attr = self
            .get_mut(&m.attr_type)
            .ok_or_else(|| EntryError::NoSuchAttribute {
                attr_type: m.attr_type.clone(),
            })?;
        for value in &m.values {
            if !attr.remove(value) {
                return Err(EntryError::NoSuchValue {
                    attr_type: m.attr_type.clone(),
                });
            }
        }
        if attr.is_empty() {
            self.remove(&m.attr_type);
        }
        Ok(())
    }

    fn modify_replace(&mut self, m: &Modification) -> Result<(), EntryError> {
        if m.values.is_empty() {
            self.remove(&m.attr_type);
            return Ok(());
        }
        self.put(Attribute::new(m.attr_type.clone(), m.values.clone())?);
        Ok(())
    }

    /// Fails if a naming value present before is missing from `next`.
    fn check_rdn_kept(&self, next: &Entry) -> Result<(), EntryError> {
        for ava in self.dn.rdn_avas().iter().filter(|a| !a.is_hex()) {
            let value = ava.value().as_bytes();
            let naming = canonical_type(ava.attr_type());
            let holds = |entry: &Entry| {
                entry.attributes.iter().any(|a| {
                    canonical_type(base_type(a.key())) == naming
                        && a.values().iter().any(|v| values_match(v, value))
                })
            };
            if holds(self) && !holds(next) {
                return Err(EntryError::RdnValue {
                    attr_type: ava.attr_type().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Consumes the entry.
    pub fn into_parts(self) -> (Dn, Vec<Attribute>) {
        (self.dn, self.attributes)
    }
}
