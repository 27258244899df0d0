//! Write policy gate.
//!
//! A write reaches a backend only if neither the server nor the backend is
//! read-only, and, for a single-master replica, only if the caller is the
//! replica's update identity. Everybody else is referred to the master.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use dirsrv_core::{Backend, Operation};
use dirsrv_protocol::ResultCode;
use tracing::debug;

/// Who is allowed to perform an authorized write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAuthority {
    /// An ordinary client of a master or multi-master backend.
    Client,
    /// The backend's update identity replaying a replicated change.
    ///
    /// Its changes carry their own operational attributes and are never
    /// replicated again.
    UpdateIdentity,
}

impl WriteAuthority {
    /// True if the change is written to the replication log.
    pub fn replicates(self) -> bool {
        self == WriteAuthority::Client
    }
}

/// Decides whether `op` may write to `backend`.
pub fn check_write(
    config: &ServerConfig,
    backend: &dyn Backend,
    op: &Operation,
) -> ServerResult<WriteAuthority> {
    if config.read_only || backend.read_only() {
        debug!(backend = backend.id(), "database is read-only");
        return Err(ServerError::result(
            ResultCode::UnwillingToPerform,
            "directory is read-only",
        ));
    }
    match backend.update_ndn() {
        Some(update_ndn) if op.is_identity(update_ndn) => Ok(WriteAuthority::UpdateIdentity),
        Some(_) if !backend.multimaster() => {
            let referrals = if backend.update_referrals().is_empty() {
                config.default_referrals.clone()
            } else {
                backend.update_referrals().to_vec()
            };
            Err(ServerError::referral(referrals))
        }
        _ => Ok(WriteAuthority::Client),
    }
}

/// True if operational attributes are maintained for writes to `backend`.
pub fn lastmod_enabled(config: &ServerConfig, backend: &dyn Backend) -> bool {
    backend.lastmod().unwrap_or(config.lastmod)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsrv_core::{BackendConfig, Dn, InMemoryBackend};
    use dirsrv_protocol::OperationKind;

    fn op(bound: Option<&str>) -> Operation {
        Operation::new(1, 1, OperationKind::Add).with_bound(bound.map(|b| Dn::parse(b).unwrap()))
    }

    fn backend(config: BackendConfig) -> InMemoryBackend {
        InMemoryBackend::new(config.with_suffix("dc=example,dc=com")).unwrap()
    }

    #[test]
    fn read_only_refuses() {
        let config = ServerConfig::default();
        let ro = backend(BackendConfig::new("a").with_read_only(true));
        let err = check_write(&config, &ro, &op(None)).unwrap_err();
        let result = err.into_result().unwrap();
        assert_eq!(result.code, ResultCode::UnwillingToPerform);
        assert_eq!(result.message, "directory is read-only");

        let rw = backend(BackendConfig::new("a"));
        let global = ServerConfig::default().with_read_only(true);
        assert!(check_write(&global, &rw, &op(None)).is_err());
    }

    #[test]
    fn master_accepts_everybody() {
        let config = ServerConfig::default();
        let master = backend(BackendConfig::new("a"));
        assert_eq!(check_write(&config, &master, &op(None)).unwrap(), WriteAuthority::Client);
    }

    #[test]
    fn replica_refers_other_writers() {
        let config = ServerConfig::default().with_default_referral("ldap://default/");
        let replica = backend(
            BackendConfig::new("a")
                .with_update_dn("cn=Replicator,dc=example,dc=com")
                .with_update_referral("ldap://master/"),
        );

        let err = check_write(&config, &replica, &op(Some("cn=admin,dc=example,dc=com"))).unwrap_err();
        let result = err.into_result().unwrap();
        assert_eq!(result.code, ResultCode::Referral);
        assert_eq!(result.referrals, vec!["ldap://master/"]);

        let authority =
            check_write(&config, &replica, &op(Some("CN=replicator,dc=example,dc=com"))).unwrap();
        assert_eq!(authority, WriteAuthority::UpdateIdentity);
        assert!(!authority.replicates());
    }

    #[test]
    fn replica_without_update_refs_uses_defaults() {
        let config = ServerConfig::default().with_default_referral("ldap://default/");
        let replica = backend(BackendConfig::new("a").with_update_dn("cn=replicator"));
        let result = check_write(&config, &replica, &op(None))
            .unwrap_err()
            .into_result()
            .unwrap();
        assert_eq!(result.referrals, vec!["ldap://default/"]);
    }

    #[test]
    fn multimaster_accepts_everybody() {
        let config = ServerConfig::default();
        let mm = backend(
            BackendConfig::new("a")
                .with_update_dn("cn=replicator")
                .with_multimaster(true),
        );
        assert_eq!(check_write(&config, &mm, &op(None)).unwrap(), WriteAuthority::Client);
        assert_eq!(
            check_write(&config, &mm, &op(Some("cn=replicator"))).unwrap(),
            WriteAuthority::UpdateIdentity
        );
    }

    #[test]
    fn lastmod_override() {
        let config = ServerConfig::default();
        assert!(lastmod_enabled(&config, &backend(BackendConfig::new("a"))));
        assert!(!lastmod_enabled(&config, &backend(BackendConfig::new("a").with_lastmod(false))));
        let off = ServerConfig::default().with_lastmod(false);
        assert!(lastmod_enabled(&off, &backend(BackendConfig::new("a").with_lastmod(true))));
    }
}
