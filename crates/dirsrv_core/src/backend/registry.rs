//! Backend selection by namespace.

use super::Backend;
use crate::dn::Dn;
use crate::error::{BackendError, BackendResult, RegistryError, RegistryResult};
use dirsrv_protocol::{Control, ResultCode};
use std::sync::Arc;
use tracing::debug;

/// The set of registered backends.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend.
    ///
    /// Fails if the id is taken or any suffix is already served.
    pub fn register(&mut self, backend: Arc<dyn Backend>) -> RegistryResult<()> {
        if backend.suffixes().is_empty() {
            return Err(RegistryError::NoSuffixes {
                id: backend.id().to_string(),
            });
        }
        if self.backends.iter().any(|b| b.id() == backend.id()) {
            return Err(RegistryError::DuplicateId {
                id: backend.id().to_string(),
            });
        }
        for suffix in backend.suffixes() {
            if let Some(existing) = self
                .backends
                .iter()
                .find(|b| b.suffixes().iter().any(|s| s == suffix))
            {
                return Err(RegistryError::DuplicateSuffix {
                    suffix: suffix.to_string(),
                    existing: existing.id().to_string(),
                });
            }
        }
        debug!(backend = backend.id(), suffixes = backend.suffixes().len(), "registered backend");
        self.backends.push(backend);
        Ok(())
    }

    /// Selects the backend whose suffix is the longest match for `dn`.
    pub fn select(&self, dn: &Dn) -> Option<Arc<dyn Backend>> {
        self.backends
            .iter()
            .filter_map(|b| {
                b.suffixes()
                    .iter()
                    .filter(|s| s.is_suffix_of(dn))
                    .map(Dn::depth)
                    .max()
                    .map(|depth| (depth, b))
            })
            .max_by_key(|(depth, _)| *depth)
            .map(|(_, b)| Arc::clone(b))
    }

    /// Looks up a backend by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.id() == id).cloned()
    }

    /// All backends in registration order.
    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    /// True if `dn` is one of the registered suffixes.
    pub fn is_suffix(&self, dn: &Dn) -> bool {
        self.backends
            .iter()
            .any(|b| b.suffixes().iter().any(|s| s == dn))
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.backends.iter().map(|b| b.id()))
            .finish()
    }
}

/// Fails if a critical control is not supported by the backend.
///
/// Non-critical controls the backend does not know are ignored.
pub fn check_controls(backend: &dyn Backend, controls: &[Control]) -> BackendResult<()> {
    match controls
        .iter()
        .find(|c| c.critical && !backend.supports_control(&c.oid))
    {
        Some(control) => {
            debug!(oid = %control.oid, backend = backend.id(), "unsupported critical control");
            Err(BackendError::new(
                ResultCode::UnavailableCriticalExtension,
                "critical control unavailable",
            ))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendConfig, InMemoryBackend};

    fn backend(id: &str, suffixes: &[&str]) -> Arc<dyn Backend> {
        let mut config = BackendConfig::new(id);
        for suffix in suffixes {
            config = config.with_suffix(*suffix);
        }
        Arc::new(InMemoryBackend::new(config).unwrap())
    }

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn longest_suffix_wins() {
        let mut registry = BackendRegistry::new();
        registry.register(backend("com", &["dc=com"])).unwrap();
        registry
            .register(backend("example", &["dc=example,dc=com"]))
            .unwrap();

        let selected = registry.select(&dn("cn=foo,dc=Example,dc=com")).unwrap();
        assert_eq!(selected.id(), "example");
        assert_eq!(registry.select(&dn("dc=other,dc=com")).unwrap().id(), "com");
        assert!(registry.select(&dn("dc=org")).is_none());
        assert!(registry.select(&dn("c=com")).is_none());
    }

    #[test]
    fn duplicate_suffix_rejected() {
        let mut registry = BackendRegistry::new();
        registry.register(backend("a", &["dc=example,dc=com"])).unwrap();
        let err = registry
            .register(backend("b", &["DC=Example, DC=Com"]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateSuffix { ref existing, .. } if existing == "a"));
        assert_eq!(registry.backends().len(), 1);
    }

    #[test]
    fn duplicate_id_and_empty_suffixes_rejected() {
        let mut registry = BackendRegistry::new();
        registry.register(backend("a", &["dc=one"])).unwrap();
        assert!(matches!(
            registry.register(backend("a", &["dc=two"])),
            Err(RegistryError::DuplicateId { .. })
        ));
        assert!(matches!(
            registry.register(backend("c", &[])),
            Err(RegistryError::NoSuffixes { .. })
        ));
    }

    #[test]
    fn critical_controls_checked() {
        let backend = InMemoryBackend::new(
            BackendConfig::new("a")
                .with_suffix("dc=example,dc=com")
                .with_supported_control("1.2.840.113556.1.4.805"),
        )
        .unwrap();

        let supported = Control::new("1.2.840.113556.1.4.805", true, None);
        let unknown_optional = Control::new("1.2.3.4", false, None);
        let unknown_critical = Control::new("1.2.3.4", true, None);

        assert!(check_controls(&backend, &[supported, unknown_optional]).is_ok());
        let err = check_controls(&backend, &[unknown_critical]).unwrap_err();
        assert_eq!(err.code, ResultCode::UnavailableCriticalExtension);
        assert_eq!(err.message, "critical control unavailable");
    }
}
