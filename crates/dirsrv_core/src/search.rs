//! Search parameters and attribute selection.

use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::DnError;
use crate::filter;
use crate::operational::is_operational;
use dirsrv_protocol::{DerefAliases, Filter, Scope, SearchRequest, SearchResultEntry};

/// All user attributes.
pub const ALL_USER_ATTRIBUTES: &str = "*";
/// All operational attributes.
pub const ALL_OPERATIONAL_ATTRIBUTES: &str = "+";
/// No attributes.
pub const NO_ATTRIBUTES: &str = "1.1";

/// A search request with its base DN normalized.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Base of the search.
    pub base: Dn,
    /// Scope.
    pub scope: Scope,
    /// Alias dereferencing; aliases are not supported, so this is recorded only.
    pub deref: DerefAliases,
    /// Maximum entries; 0 means unlimited.
    pub size_limit: usize,
    /// Seconds; 0 means unlimited.
    pub time_limit: u64,
    /// Return attribute types only.
    pub types_only: bool,
    /// Filter.
    pub filter: Filter,
    /// Requested attributes.
    pub attributes: Vec<String>,
}

impl SearchParams {
    /// Normalizes the base DN of a decoded request.
    pub fn from_request(request: SearchRequest) -> Result<Self, DnError> {
        Ok(Self {
            base: Dn::parse(&request.base)?,
            scope: request.scope,
            deref: request.deref,
            size_limit: usize::try_from(request.size_limit).unwrap_or(usize::MAX),
            time_limit: u64::try_from(request.time_limit).unwrap_or(0),
            types_only: request.types_only,
            filter: request.filter,
            attributes: request.attributes,
        })
    }

    /// A subtree search for everything under `base`.
    pub fn subtree(base: Dn) -> Self {
        Self {
            base,
            scope: Scope::Subtree,
            deref: DerefAliases::Never,
            size_limit: 0,
            time_limit: 0,
            types_only: false,
            filter: Filter::any_entry(),
            attributes: Vec::new(),
        }
    }

    /// True if `dn` lies within the base and scope.
    pub fn in_scope(&self, dn: &Dn) -> bool {
        match self.scope {
            Scope::Base => *dn == self.base,
            Scope::OneLevel => self.base.is_parent_of(dn),
            Scope::Subtree => self.base.is_suffix_of(dn),
        }
    }

    /// True if the entry is in scope and matches the filter.
    pub fn selects(&self, entry: &Entry) -> bool {
        self.in_scope(entry.dn()) && filter::matches(&self.filter, entry)
    }

    /// Builds the entry sent to the client.
    pub fn project(&self, entry: &Entry) -> SearchResultEntry {
        let selection = AttributeSelection::new(&self.attributes);
        let attributes = entry
            .attributes()
            .iter()
            .filter(|a| selection.includes(a.name()))
            .map(|a| {
                let values = if self.types_only {
                    Vec::new()
                } else {
                    a.values().to_vec()
                };
                (a.name().to_string(), values)
            })
            .collect();
        SearchResultEntry {
            dn: entry.dn().raw().to_string(),
            attributes,
        }
    }
}

/// Which attributes a search returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelection {
    all_user: bool,
    all_operational: bool,
    named: Vec<String>,
}

impl AttributeSelection {
    /// Interprets a requested attribute list.
    ///
    /// An empty list is all user attributes. `1.1` alone is none.
    pub fn new(requested: &[String]) -> Self {
        let mut selection = Self {
            all_user: requested.is_empty(),
            all_operational: false,
            named: Vec::new(),
        };
        for attr in requested {
            match attr.as_str() {
                ALL_USER_ATTRIBUTES => selection.all_user = true,
                ALL_OPERATIONAL_ATTRIBUTES => selection.all_operational = true,
                NO_ATTRIBUTES => {}
                name => selection.named.push(name.to_ascii_lowercase()),
            }
        }
        selection
    }

    /// True if the attribute is returned.
    pub fn includes(&self, attr_type: &str) -> bool {
        if self.named.iter().any(|n| n.eq_ignore_ascii_case(attr_type)) {
            return true;
        }
        if is_operational(attr_type) {
            self.all_operational
        } else {
            self.all_user
        }
    }
}
