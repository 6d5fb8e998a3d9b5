//! In-memory store state using DashMap.

use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::Deserialize;
use std::path::Path;
use tokio::sync::broadcast;

use dronetrack_core::models::{Mission, Order, StatusChange, TelemetryRecord};

const STATUS_CHANNEL_CAPACITY: usize = 256;

/// json-server style seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub drone_missions: Vec<Mission>,
    #[serde(default)]
    pub drone_telemetry: Vec<TelemetryRecord>,
}

/// Thread-safe store for orders, missions and telemetry.
pub struct StoreState {
    orders: DashMap<String, Order>,
    missions: DashMap<String, Mission>,
    /// Telemetry per mission id, kept sorted by timestamp
    telemetry: DashMap<String, Vec<TelemetryRecord>>,
    tx: broadcast::Sender<StatusChange>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreState {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            orders: DashMap::new(),
            missions: DashMap::new(),
            telemetry: DashMap::new(),
            tx,
        }
    }

    pub fn from_seed(seed: SeedData) -> Self {
        let state = Self::new();
        for order in seed.orders {
            state.put_order(order);
        }
        for mission in seed.drone_missions {
            state.put_mission(mission);
        }
        for record in seed.drone_telemetry {
            state.push_telemetry(record);
        }
        state
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let seed: SeedData = serde_json::from_str(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;
        tracing::info!(
            orders = seed.orders.len(),
            missions = seed.drone_missions.len(),
            telemetry = seed.drone_telemetry.len(),
            "Loaded seed data from {}",
            path.display()
        );
        Ok(Self::from_seed(seed))
    }

    // ========== ORDERS ==========

    pub fn put_order(&self, order: Order) {
        self.orders.insert(order.id.clone(), order);
    }

    pub fn get_order(&self, id: &str) -> Option<Order> {
        self.orders.get(id).map(|entry| entry.value().clone())
    }

    pub fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|r| r.value().clone()).collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        orders
    }

    /// Apply `update` to an order. Broadcasts when the status changed.
    pub fn update_order<F>(&self, id: &str, update: F) -> Option<Order>
    where
        F: FnOnce(&mut Order),
    {
        let (updated, previous_status) = {
            let mut entry = self.orders.get_mut(id)?;
            let previous_status = entry.status;
            update(entry.value_mut());
            (entry.value().clone(), previous_status)
        };

        if updated.status != previous_status {
            tracing::info!(
                order_id = %updated.id,
                from = %previous_status,
                to = %updated.status,
                "Order status changed"
            );
            // No subscribers is fine.
            let _ = self.tx.send(StatusChange {
                id: updated.id.clone(),
                status: updated.status,
            });
        }
        Some(updated)
    }

    // ========== MISSIONS ==========

    pub fn put_mission(&self, mission: Mission) {
        self.missions.insert(mission.id.clone(), mission);
    }

    pub fn get_mission(&self, id: &str) -> Option<Mission> {
        self.missions.get(id).map(|entry| entry.value().clone())
    }

    pub fn missions_for_order(&self, order_id: Option<&str>) -> Vec<Mission> {
        let mut missions: Vec<Mission> = self
            .missions
            .iter()
            .filter(|entry| match order_id {
                Some(order_id) => entry.value().order_id.as_deref() == Some(order_id),
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();
        missions.sort_by(|a, b| a.id.cmp(&b.id));
        missions
    }

    // ========== TELEMETRY ==========

    pub fn push_telemetry(&self, record: TelemetryRecord) {
        let mut entry = self.telemetry.entry(record.mission_id.clone()).or_default();
        let at = entry.partition_point(|existing| existing.timestamp <= record.timestamp);
        entry.insert(at, record);
    }

    pub fn telemetry_for(&self, mission_id: Option<&str>) -> Vec<TelemetryRecord> {
        match mission_id {
            Some(mission_id) => self
                .telemetry
                .get(mission_id)
                .map(|entry| entry.value().clone())
                .unwrap_or_default(),
            None => {
                let mut all: Vec<TelemetryRecord> = self
                    .telemetry
                    .iter()
                    .flat_map(|entry| entry.value().clone())
                    .collect();
                all.sort_by_key(|record| record.timestamp);
                all
            }
        }
    }

    // ========== NOTIFICATIONS ==========

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.tx.subscribe()
    }
}
