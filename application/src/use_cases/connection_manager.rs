//! Connection Manager: long-lived connections to remote tool servers
//!
//! [`ConnectionManager`] owns every live connection in the process. Its state
//! is derived entirely from the latest [`ConnectorConfig`] set handed to
//! [`reconcile`](ConnectionManager::reconcile).
//!
//! # Locking
//!
//! ```text
//! reconcile_lock (Mutex<Option<u64>>)   held for reconcile, reconnect, teardown
//!   └─ connections (RwLock<HashMap>)    held only to look up / insert / remove
//!        ├─ in_flight (RwLock<()>)      shared: one per running call
//!        │                              exclusive: before a session is closed
//!        └─ live (RwLock)               short critical sections only
//! ```
//!
//! Lock order is `in_flight` before `live`, and `live` is never held across
//! a remote call or a connect. Reconciliations never overlap. Calls on
//! different connectors run concurrently with each other and with
//! reconciliation of unrelated connectors. A connection only becomes
//! `Connected` once its session and tool list are installed together, and
//! its session is only closed after in-flight calls on it have drained.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use warden_domain::{
    ConnectionState, ConnectorConfig, ConnectorStatus, NamespacedToolId, ToolDescriptor,
    ToolResult, desired_set_hash,
};

use crate::ports::connector::{ConnectorError, ConnectorFactory, ConnectorSession};

/// Upper bound on connect + initial discovery for one connector
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single health probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// A tool in the aggregated catalog, tagged with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: NamespacedToolId,
    pub descriptor: ToolDescriptor,
}

/// What a reconcile pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// The desired set hashed the same as last time; nothing was touched
    pub unchanged: bool,
    pub connected: Vec<String>,
    pub failed: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileReport {
    fn unchanged() -> Self {
        Self {
            unchanged: true,
            ..Default::default()
        }
    }

    /// Number of connect/disconnect actions taken
    pub fn actions(&self) -> usize {
        self.connected.len() + self.failed.len() + self.removed.len()
    }
}

/// Outcome of a health probe across connected connectors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub healthy: Vec<String>,
    pub unhealthy: Vec<String>,
}

struct LiveConnection {
    config: ConnectorConfig,
    state: ConnectionState,
    session: Option<Arc<dyn ConnectorSession>>,
    tools: Vec<ToolDescriptor>,
    last_error: Option<String>,
    last_connected_at: Option<DateTime<Utc>>,
}

impl LiveConnection {
    fn connecting(config: ConnectorConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Connecting,
            session: None,
            tools: Vec::new(),
            last_error: None,
            last_connected_at: None,
        }
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.session.is_some()
    }

    fn status(&self) -> ConnectorStatus {
        let connected = self.is_connected();
        ConnectorStatus {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            transport: self.config.transport,
            state: self.state,
            connected,
            tool_count: if connected { self.tools.len() } else { 0 },
            error: self.last_error.clone(),
            last_connected_at: self.last_connected_at,
        }
    }

    fn mark_failed(&mut self, error: String) {
        self.state = ConnectionState::Failed;
        self.session = None;
        self.tools.clear();
        self.last_error = Some(error);
    }
}

struct ConnectionSlot {
    live: RwLock<LiveConnection>,
    in_flight: RwLock<()>,
}

impl ConnectionSlot {
    fn new(config: ConnectorConfig) -> Self {
        Self {
            live: RwLock::new(LiveConnection::connecting(config)),
            in_flight: RwLock::new(()),
        }
    }
}

type SharedConnection = Arc<ConnectionSlot>;

/// Process-scoped manager of tool-server connections.
///
/// Construct once, share by `Arc`, and call
/// [`disconnect_all`](Self::disconnect_all) on shutdown.
pub struct ConnectionManager {
    factory: Arc<dyn ConnectorFactory>,
    connections: RwLock<HashMap<String, SharedConnection>>,
    reconcile_lock: Mutex<Option<u64>>,
}

impl ConnectionManager {
    pub fn new(factory: Arc<dyn ConnectorFactory>) -> Self {
        Self {
            factory,
            connections: RwLock::new(HashMap::new()),
            reconcile_lock: Mutex::new(None),
        }
    }

    /// Bring live connections in line with the desired config set.
    ///
    /// No-op when the identity hash of `desired` is unchanged since the last
    /// reconcile. Connect failures are recorded on the connection, never
    /// returned.
    pub async fn reconcile(&self, desired: &[ConnectorConfig]) -> ReconcileReport {
        let mut last_hash = self.reconcile_lock.lock().await;

        let hash = desired_set_hash(desired);
        if *last_hash == Some(hash) {
            self.refresh_names(desired).await;
            debug!(connectors = desired.len(), "Connector set unchanged, skipping reconcile");
            return ReconcileReport::unchanged();
        }

        let mut seen = HashSet::new();
        let enabled: Vec<&ConnectorConfig> = desired
            .iter()
            .filter(|c| c.enabled)
            .filter(|c| seen.insert(c.id.as_str()))
            .collect();
        let enabled_ids: HashSet<&str> = enabled.iter().map(|c| c.id.as_str()).collect();

        let mut report = ReconcileReport::default();

        let stale: Vec<(String, SharedConnection)> = {
            let mut map = self.connections.write().await;
            let ids: Vec<String> = map
                .keys()
                .filter(|id| !enabled_ids.contains(id.as_str()))
                .cloned()
                .collect();
            ids.into_iter()
                .filter_map(|id| map.remove(&id).map(|conn| (id, conn)))
                .collect()
        };
        for (id, conn) in stale {
            shutdown(&id, &conn).await;
            report.removed.push(id);
        }

        let mut pending: Vec<SharedConnection> = Vec::new();
        for config in enabled {
            let existing = self.connections.read().await.get(&config.id).cloned();

            if let Some(slot) = &existing {
                let (keep, renamed) = {
                    let conn = slot.live.read().await;
                    (
                        conn.is_connected() && conn.config.same_identity(config),
                        conn.config.name != config.name,
                    )
                };
                if keep {
                    if renamed {
                        slot.live.write().await.config.name = config.name.clone();
                    }
                    continue;
                }
            }
            if let Some(slot) = existing {
                shutdown(&config.id, &slot).await;
            }

            let slot = Arc::new(ConnectionSlot::new(config.clone()));
            self.connections
                .write()
                .await
                .insert(config.id.clone(), Arc::clone(&slot));
            pending.push(slot);
        }

        let outcomes = join_all(pending.iter().map(|slot| self.establish(slot))).await;
        for (slot, outcome) in pending.iter().zip(outcomes) {
            let id = slot.live.read().await.config.id.clone();
            match outcome {
                Ok(_) => report.connected.push(id),
                Err(_) => report.failed.push(id),
            }
        }

        *last_hash = Some(hash);
        info!(
            connected = report.connected.len(),
            failed = report.failed.len(),
            removed = report.removed.len(),
            "Reconciled connectors"
        );
        report
    }

    /// Update display names of existing connections; names are not part of
    /// the identity hash
    async fn refresh_names(&self, desired: &[ConnectorConfig]) {
        for config in desired.iter().filter(|c| c.enabled) {
            let Some(slot) = self.connections.read().await.get(&config.id).cloned() else {
                continue;
            };
            let stale = slot.live.read().await.config.name != config.name;
            if stale {
                slot.live.write().await.config.name = config.name.clone();
            }
        }
    }

    /// Connect and discover tools, then install both in one transition
    async fn establish(&self, slot: &SharedConnection) -> Result<usize, ConnectorError> {
        let config = {
            let mut conn = slot.live.write().await;
            conn.state = ConnectionState::Connecting;
            conn.config.clone()
        };

        info!(
            connector = %config.id,
            transport = %config.transport,
            "Connecting to tool server"
        );

        let attempt = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let session = self.factory.connect(&config).await?;
            match session.list_tools().await {
                Ok(tools) => Ok((session, tools)),
                Err(e) => {
                    let _ = session.close().await;
                    Err(e)
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            Err(ConnectorError::Timeout(format!(
                "connect to '{}' exceeded {}s",
                config.id,
                CONNECT_TIMEOUT.as_secs()
            )))
        });

        let mut conn = slot.live.write().await;
        match attempt {
            Ok((session, tools)) => {
                let count = tools.len();
                conn.session = Some(session);
                conn.tools = tools;
                conn.state = ConnectionState::Connected;
                conn.last_error = None;
                conn.last_connected_at = Some(Utc::now());
                info!(connector = %config.id, tools = count, "Connected to tool server");
                Ok(count)
            }
            Err(e) => {
                warn!(connector = %config.id, error = %e, "Failed to connect to tool server");
                conn.mark_failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn lookup(&self, connector_id: &str) -> Result<SharedConnection, ConnectorError> {
        self.connections
            .read()
            .await
            .get(connector_id)
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(connector_id.to_string()))
    }

    /// Call a tool on a connected connector and return its result unmodified
    pub async fn call(
        &self,
        connector_id: &str,
        tool_name: &str,
        params: Map<String, Value>,
    ) -> Result<ToolResult, ConnectorError> {
        let slot = self.lookup(connector_id).await?;
        let _in_flight = slot.in_flight.read().await;

        let session = {
            let conn = slot.live.read().await;
            match (&conn.session, conn.state) {
                (Some(session), ConnectionState::Connected) => Arc::clone(session),
                _ => return Err(ConnectorError::NotConnected(connector_id.to_string())),
            }
        };

        debug!(connector = %connector_id, tool = %tool_name, "Calling remote tool");
        session.call_tool(tool_name, params).await
    }

    /// Union of tools discovered on every connected connector
    pub async fn list_capabilities(&self) -> Vec<CatalogEntry> {
        let connections: Vec<SharedConnection> =
            self.connections.read().await.values().cloned().collect();

        let mut entries = Vec::new();
        for slot in connections {
            let conn = slot.live.read().await;
            if !conn.is_connected() {
                continue;
            }
            entries.extend(conn.tools.iter().map(|tool| CatalogEntry {
                id: NamespacedToolId::remote(&conn.config.id, &tool.name),
                descriptor: tool.clone(),
            }));
        }
        entries.sort_by_key(|e| e.id.to_string());
        entries
    }

    /// Per-connection summary, sorted by id
    pub async fn status(&self) -> Vec<ConnectorStatus> {
        let connections: Vec<SharedConnection> =
            self.connections.read().await.values().cloned().collect();

        let mut statuses = Vec::with_capacity(connections.len());
        for slot in connections {
            statuses.push(slot.live.read().await.status());
        }
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    /// Probe every connected connector by re-listing its tools.
    ///
    /// Failures move the connection to `Failed` with `last_error` set;
    /// successes refresh the discovered tool list.
    pub async fn health_check(&self) -> HealthReport {
        let connections: Vec<(String, SharedConnection)> = self
            .connections
            .read()
            .await
            .iter()
            .map(|(id, conn)| (id.clone(), Arc::clone(conn)))
            .collect();

        let mut report = HealthReport::default();
        for (id, slot) in connections {
            let session = {
                let conn = slot.live.read().await;
                match (&conn.session, conn.state) {
                    (Some(session), ConnectionState::Connected) => Arc::clone(session),
                    _ => continue,
                }
            };

            let probe = tokio::time::timeout(HEALTH_TIMEOUT, session.list_tools())
                .await
                .unwrap_or_else(|_| Err(ConnectorError::Timeout(format!("health check of '{}'", id))));

            match probe {
                Ok(tools) => {
                    slot.live.write().await.tools = tools;
                    report.healthy.push(id);
                }
                Err(e) => {
                    warn!(connector = %id, error = %e, "Health check failed");
                    let _drained = slot.in_flight.write().await;
                    let current = {
                        let mut conn = slot.live.write().await;
                        let current = conn
                            .session
                            .as_ref()
                            .is_some_and(|s| Arc::ptr_eq(s, &session));
                        if current {
                            conn.mark_failed(e.to_string());
                        }
                        current
                    };
                    if current {
                        let _ = session.close().await;
                    }
                    report.unhealthy.push(id);
                }
            }
        }
        report.healthy.sort();
        report.unhealthy.sort();
        report
    }

    /// Tear down and re-establish one connection, returning its tool count
    pub async fn reconnect(&self, connector_id: &str) -> Result<usize, ConnectorError> {
        let _serial = self.reconcile_lock.lock().await;
        let slot = self.lookup(connector_id).await?;
        {
            let _drained = slot.in_flight.write().await;
            let session = {
                let mut conn = slot.live.write().await;
                conn.state = ConnectionState::Connecting;
                conn.tools.clear();
                conn.session.take()
            };
            if let Some(session) = session {
                let _ = session.close().await;
            }
        }
        info!(connector = %connector_id, "Reconnecting tool server");
        self.establish(&slot).await
    }

    /// Disconnect everything and forget the last reconcile hash
    pub async fn disconnect_all(&self) {
        let mut last_hash = self.reconcile_lock.lock().await;

        let drained: Vec<(String, SharedConnection)> =
            self.connections.write().await.drain().collect();
        for (id, conn) in &drained {
            shutdown(id, conn).await;
        }

        *last_hash = None;
        info!(count = drained.len(), "Disconnected all tool servers");
    }
}

/// Wait for in-flight calls to drain, then close the session
async fn shutdown(id: &str, slot: &SharedConnection) {
    let _drained = slot.in_flight.write().await;
    let session = {
        let mut conn = slot.live.write().await;
        conn.tools.clear();
        conn.session.take()
    };
    if let Some(session) = session
        && let Err(e) = session.close().await
    {
        warn!(connector = %id, error = %e, "Error while closing connector");
    }
    info!(connector = %id, "Disconnected tool server");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

    struct MockSession {
        id: String,
        closes: Arc<AtomicUsize>,
        healthy: Arc<AtomicBool>,
        call_delay_ms: Arc<AtomicU64>,
        closed: AtomicBool,
    }

    #[async_trait]
    impl ConnectorSession for MockSession {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ConnectorError> {
            if !self.healthy.load(Ordering::SeqCst) {
                return Err(ConnectorError::Protocol("server went away".into()));
            }
            Ok(vec![
                ToolDescriptor::new("echo", "Echo input"),
                ToolDescriptor::new("sum", "Add numbers"),
            ])
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: Map<String, Value>,
        ) -> Result<ToolResult, ConnectorError> {
            let delay = self.call_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(ConnectorError::Protocol("session closed mid-call".into()));
            }
            Ok(ToolResult::success(format!(
                "{}:{}:{}",
                self.id,
                name,
                Value::Object(arguments)
            )))
        }

        async fn close(&self) -> Result<(), ConnectorError> {
            self.closed.store(true, Ordering::SeqCst);
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockFactory {
        connects: AtomicUsize,
        closes: Arc<AtomicUsize>,
        healthy: Arc<AtomicBool>,
        call_delay_ms: Arc<AtomicU64>,
        failing: StdMutex<HashSet<String>>,
    }

    impl MockFactory {
        fn new() -> Arc<Self> {
            let factory = Self::default();
            factory.healthy.store(true, Ordering::SeqCst);
            Arc::new(factory)
        }

        fn fail(&self, id: &str) {
            self.failing.lock().unwrap().insert(id.to_string());
        }

        fn recover(&self, id: &str) {
            self.failing.lock().unwrap().remove(id);
        }

        fn slow_calls(&self, delay: Duration) {
            self.call_delay_ms
                .store(delay.as_millis() as u64, Ordering::SeqCst);
        }

        fn connects(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectorFactory for MockFactory {
        async fn connect(
            &self,
            config: &ConnectorConfig,
        ) -> Result<Arc<dyn ConnectorSession>, ConnectorError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.failing.lock().unwrap().contains(&config.id) {
                return Err(ConnectorError::Connection(format!(
                    "spawn failed for {}",
                    config.id
                )));
            }
            Ok(Arc::new(MockSession {
                id: config.id.clone(),
                closes: Arc::clone(&self.closes),
                healthy: Arc::clone(&self.healthy),
                call_delay_ms: Arc::clone(&self.call_delay_ms),
                closed: AtomicBool::new(false),
            }))
        }
    }

    fn manager(factory: &Arc<MockFactory>) -> ConnectionManager {
        ConnectionManager::new(Arc::clone(factory) as Arc<dyn ConnectorFactory>)
    }

    fn configs() -> Vec<ConnectorConfig> {
        vec![
            ConnectorConfig::stdio("alpha", "alpha-server"),
            ConnectorConfig::stdio("beta", "beta-server"),
        ]
    }

    #[tokio::test]
    async fn test_reconcile_connects_enabled_only() {
        let factory = MockFactory::new();
        let manager = manager(&factory);

        let mut desired = configs();
        desired.push(ConnectorConfig::stdio("gamma", "gamma-server").disabled());
        let report = manager.reconcile(&desired).await;

        assert!(!report.unchanged);
        assert_eq!(report.connected.len(), 2);
        assert_eq!(factory.connects(), 2);

        let ids: Vec<String> = manager.status().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let factory = MockFactory::new();
        let manager = manager(&factory);

        manager.reconcile(&configs()).await;
        let second = manager.reconcile(&configs()).await;

        assert!(second.unchanged);
        assert_eq!(second.actions(), 0);
        assert_eq!(factory.connects(), 2);
        assert_eq!(factory.closes(), 0);
    }

    #[tokio::test]
    async fn test_disabling_connected_connector_removes_it() {
        let factory = MockFactory::new();
        let manager = manager(&factory);
        manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server")])
            .await;

        let report = manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server").disabled()])
            .await;

        assert_eq!(report.removed, vec!["alpha"]);
        assert_eq!(factory.closes(), 1);
        assert!(manager.status().await.is_empty());
    }

    #[tokio::test]
    async fn test_removed_config_is_disconnected() {
        let factory = MockFactory::new();
        let manager = manager(&factory);
        manager.reconcile(&configs()).await;

        let report = manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server")])
            .await;

        assert_eq!(report.removed, vec!["beta"]);
        assert!(report.connected.is_empty());
        assert_eq!(factory.connects(), 2);
    }

    #[tokio::test]
    async fn test_failed_connect_is_retained_with_error() {
        let factory = MockFactory::new();
        factory.fail("beta");
        let manager = manager(&factory);

        let report = manager.reconcile(&configs()).await;
        assert_eq!(report.failed, vec!["beta"]);

        let status = manager.status().await;
        let beta = status.iter().find(|s| s.id == "beta").unwrap();
        assert!(!beta.connected);
        assert_eq!(beta.state, ConnectionState::Failed);
        assert!(beta.error.as_deref().unwrap().contains("spawn failed"));
        assert!(beta.last_connected_at.is_none());

        let alpha = status.iter().find(|s| s.id == "alpha").unwrap();
        assert!(alpha.connected);
        assert_eq!(alpha.tool_count, 2);
        assert!(alpha.last_connected_at.is_some());
    }

    #[tokio::test]
    async fn test_identity_change_replaces_connection() {
        let factory = MockFactory::new();
        let manager = manager(&factory);
        manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server")])
            .await;

        let report = manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server").with_args(["--v2"])])
            .await;

        assert_eq!(report.connected, vec!["alpha"]);
        assert_eq!(factory.connects(), 2);
        assert_eq!(factory.closes(), 1);
        assert_eq!(manager.status().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_connection_retried_on_next_changed_reconcile() {
        let factory = MockFactory::new();
        factory.fail("beta");
        let manager = manager(&factory);
        manager.reconcile(&configs()).await;

        factory.recover("beta");
        let mut desired = configs();
        desired.push(ConnectorConfig::stdio("delta", "delta-server"));
        let report = manager.reconcile(&desired).await;

        assert!(report.connected.contains(&"beta".to_string()));
        assert!(report.connected.contains(&"delta".to_string()));
        assert!(!report.connected.contains(&"alpha".to_string()));
    }

    #[tokio::test]
    async fn test_call_routes_and_reports_conditions() {
        let factory = MockFactory::new();
        factory.fail("beta");
        let manager = manager(&factory);
        manager.reconcile(&configs()).await;

        let mut params = Map::new();
        params.insert("x".into(), Value::from(1));
        let result = manager.call("alpha", "echo", params).await.unwrap();
        assert_eq!(result.text(), r#"alpha:echo:{"x":1}"#);

        assert_eq!(
            manager.call("nope", "echo", Map::new()).await,
            Err(ConnectorError::NotFound("nope".into()))
        );
        assert_eq!(
            manager.call("beta", "echo", Map::new()).await,
            Err(ConnectorError::NotConnected("beta".into()))
        );
    }

    #[tokio::test]
    async fn test_list_capabilities_is_namespaced() {
        let factory = MockFactory::new();
        factory.fail("beta");
        let manager = manager(&factory);
        manager.reconcile(&configs()).await;

        let ids: Vec<String> = manager
            .list_capabilities()
            .await
            .into_iter()
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(ids, vec!["remote:alpha:echo", "remote:alpha:sum"]);

        for id in ids {
            let parsed = NamespacedToolId::parse(&id).unwrap();
            assert_eq!(parsed.to_string(), id);
        }
    }

    #[tokio::test]
    async fn test_reconnect() {
        let factory = MockFactory::new();
        factory.fail("alpha");
        let manager = manager(&factory);
        manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server")])
            .await;

        assert!(manager.reconnect("alpha").await.is_err());
        factory.recover("alpha");
        assert_eq!(manager.reconnect("alpha").await.unwrap(), 2);
        assert!(manager.status().await[0].connected);
        assert!(manager.status().await[0].error.is_none());

        assert_eq!(
            manager.reconnect("unknown").await,
            Err(ConnectorError::NotFound("unknown".into()))
        );
    }

    #[tokio::test]
    async fn test_health_check_marks_failures() {
        let factory = MockFactory::new();
        let manager = manager(&factory);
        manager.reconcile(&configs()).await;

        let report = manager.health_check().await;
        assert_eq!(report.healthy, vec!["alpha", "beta"]);

        factory.healthy.store(false, Ordering::SeqCst);
        let report = manager.health_check().await;
        assert_eq!(report.unhealthy, vec!["alpha", "beta"]);

        let status = manager.status().await;
        assert!(status.iter().all(|s| s.state == ConnectionState::Failed));
        assert!(status.iter().all(|s| s.error.is_some()));
        assert!(manager.list_capabilities().await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_all_resets_hash() {
        let factory = MockFactory::new();
        let manager = manager(&factory);
        manager.reconcile(&configs()).await;

        manager.disconnect_all().await;
        assert!(manager.status().await.is_empty());
        assert_eq!(factory.closes(), 2);

        let report = manager.reconcile(&configs()).await;
        assert!(!report.unchanged);
        assert_eq!(factory.connects(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_single_connection() {
        let factory = MockFactory::new();
        let manager = manager(&factory);

        manager
            .reconcile(&[
                ConnectorConfig::stdio("alpha", "one"),
                ConnectorConfig::stdio("alpha", "two"),
            ])
            .await;

        assert_eq!(manager.status().await.len(), 1);
        assert_eq!(factory.connects(), 1);
    }

    #[tokio::test]
    async fn test_slow_call_does_not_block_unrelated_reconcile() {
        let factory = MockFactory::new();
        let manager = Arc::new(manager(&factory));
        let alpha = ConnectorConfig::stdio("alpha", "alpha-server");
        manager.reconcile(std::slice::from_ref(&alpha)).await;

        factory.slow_calls(Duration::from_secs(5));
        let caller = Arc::clone(&manager);
        let call = tokio::spawn(async move { caller.call("alpha", "echo", Map::new()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let report = tokio::time::timeout(
            Duration::from_secs(1),
            manager.reconcile(&[alpha, ConnectorConfig::stdio("gamma", "gamma-server")]),
        )
        .await
        .expect("reconcile of gamma waited on alpha's call");

        assert_eq!(report.connected, vec!["gamma"]);
        assert_eq!(manager.status().await.len(), 2);
        assert!(!call.is_finished());
        call.abort();
    }

    #[tokio::test]
    async fn test_removal_waits_for_in_flight_call() {
        let factory = MockFactory::new();
        let manager = Arc::new(manager(&factory));
        manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server")])
            .await;

        factory.slow_calls(Duration::from_millis(200));
        let caller = Arc::clone(&manager);
        let call = tokio::spawn(async move { caller.call("alpha", "echo", Map::new()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = manager.reconcile(&[]).await;
        assert_eq!(report.removed, vec!["alpha"]);
        assert_eq!(factory.closes(), 1);

        let result = call.await.unwrap().unwrap();
        assert_eq!(result.text(), "alpha:echo:{}");
    }

    #[tokio::test]
    async fn test_rename_only_refreshes_status() {
        let factory = MockFactory::new();
        let manager = manager(&factory);
        manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server")])
            .await;

        let report = manager
            .reconcile(&[ConnectorConfig::stdio("alpha", "alpha-server").with_name("Alpha Tools")])
            .await;

        assert!(report.unchanged);
        assert_eq!(factory.connects(), 1);
        assert_eq!(manager.status().await[0].name, "Alpha Tools");
    }
}
