//! Replication log configuration.

/// Configuration for a [`ReplicationLog`](crate::ReplicationLog).
#[derive(Debug, Clone)]
pub struct ReplogConfig {
    /// Replica hosts written on every replog record.
    pub replicas: Vec<String>,
    /// Capacity of the writer queue. Records released while it is full are
    /// dropped and counted.
    pub channel_bound: usize,
}

impl ReplogConfig {
    /// Creates a configuration with no replicas.
    pub fn new() -> Self {
        Self {
            replicas: Vec::new(),
            channel_bound: 1024,
        }
    }

    /// Adds a replica host.
    pub fn with_replica(mut self, replica: impl Into<String>) -> Self {
        self.replicas.push(replica.into());
        self
    }

    /// Sets the writer queue capacity.
    pub const fn with_channel_bound(mut self, bound: usize) -> Self {
        self.channel_bound = bound;
        self
    }
}

impl Default for ReplogConfig {
    fn default() -> Self {
        Self::new()
    }
}
