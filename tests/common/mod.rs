// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use fleet_rentals::cache::{Cache, CacheError};
use fleet_rentals::config::Config;
use fleet_rentals::db::{MemoryDb, StationStore, TransportStore};
use fleet_rentals::error::Result;
use fleet_rentals::models::{
    Coordinates, Loan, Money, NearbyStation, NewStation, NewTransport, PageRequest, Station,
    StationAvailability, StationFilter, StationPatch, StationStats, Transport, TransportFilter,
    TransportPatch, TransportStatus, User,
};
use fleet_rentals::routes::create_router;
use fleet_rentals::services::{NotificationSink, PaymentGateway, PaymentReceipt, PaymentResult};
use fleet_rentals::AppState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// IDs from `data/fleet.json`.
#[allow(dead_code)]
pub mod seed {
    pub const STATION_93: u64 = 1;
    pub const STATION_BOLIVAR: u64 = 2;
    pub const STATION_USAQUEN: u64 = 3;
    pub const STATION_INACTIVE: u64 = 4;

    /// Bicycle at 3000/h docked at station 1
    pub const BIKE: u64 = 1;
    /// Bicycle at 2500/h docked at station 1
    pub const SINGLE_SPEED: u64 = 2;
    /// Scooter with 85% battery at station 2
    pub const SCOOTER: u64 = 3;
    /// Scooter with 9% battery at station 2
    pub const FLAT_SCOOTER: u64 = 4;
    /// Bicycle in maintenance at station 3
    pub const BIKE_IN_SHOP: u64 = 5;

    pub const RIDER: u64 = 1;
    pub const OTHER_RIDER: u64 = 2;
    pub const SUSPENDED_RIDER: u64 = 3;
}

/// Store seeded from the fleet fixture.
#[allow(dead_code)]
pub async fn seeded_db() -> MemoryDb {
    MemoryDb::load_fixture(concat!(env!("CARGO_MANIFEST_DIR"), "/data/fleet.json"))
        .await
        .expect("Fixture should load")
}

// ─── Notifications ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Sent {
    LoanEnded(u64),
    PaymentConfirmation {
        loan_id: u64,
        reference: Option<String>,
    },
    Reminder(u64),
    Cancelled {
        loan_id: u64,
        fee: Money,
    },
}

/// Sink that records what it was asked to send, optionally failing.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, item: Sent) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(item);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("smtp unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_loan_ended_email(&self, _user: &User, loan: &Loan) -> anyhow::Result<()> {
        self.record(Sent::LoanEnded(loan.id))
    }

    async fn send_payment_confirmation(
        &self,
        _user: &User,
        loan: &Loan,
        receipt: &PaymentReceipt,
    ) -> anyhow::Result<()> {
        self.record(Sent::PaymentConfirmation {
            loan_id: loan.id,
            reference: receipt.reference.clone(),
        })
    }

    async fn send_loan_reminder(&self, _user: &User, loan: &Loan) -> anyhow::Result<()> {
        self.record(Sent::Reminder(loan.id))
    }

    async fn send_loan_cancelled(
        &self,
        _user: &User,
        loan: &Loan,
        fee: Money,
    ) -> anyhow::Result<()> {
        self.record(Sent::Cancelled {
            loan_id: loan.id,
            fee,
        })
    }
}

// ─── Payments ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Approve,
    Decline,
    Unreachable,
}

/// Gateway that approves, declines or fails every charge and counts calls.
pub struct ScriptedGateway {
    outcome: Outcome,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedGateway {
    fn with(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn approving() -> Self {
        Self::with(Outcome::Approve)
    }

    pub fn declining() -> Self {
        Self::with(Outcome::Decline)
    }

    /// Every call errors out, as a timed-out processor would.
    pub fn unreachable() -> Self {
        Self::with(Outcome::Unreachable)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn process_payment(
        &self,
        _amount: Money,
        _currency: &str,
        method_ref: &str,
    ) -> anyhow::Result<PaymentResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.outcome {
            Outcome::Approve => Ok(PaymentResult {
                success: true,
                transaction_id: Some(format!("txn-{}-{}", method_ref, n)),
                message: None,
            }),
            Outcome::Decline => Ok(PaymentResult {
                success: false,
                transaction_id: None,
                message: Some("card declined".to_string()),
            }),
            Outcome::Unreachable => anyhow::bail!("processor timed out"),
        }
    }
}

// ─── Cache & store doubles ───────────────────────────────────

/// Cache whose every operation fails.
pub struct BrokenCache;

#[async_trait]
impl Cache for BrokenCache {
    async fn get(&self, _key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Storage("connection refused".to_string()))
    }

    async fn set(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> std::result::Result<(), CacheError> {
        Err(CacheError::Storage("connection refused".to_string()))
    }

    async fn del(&self, _key: &str) -> std::result::Result<(), CacheError> {
        Err(CacheError::Storage("connection refused".to_string()))
    }
}

/// Store wrapper that counts `find_by_id` calls reaching the store.
#[derive(Clone)]
pub struct CountingStore {
    pub inner: MemoryDb,
    station_reads: Arc<AtomicUsize>,
    transport_reads: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new(inner: MemoryDb) -> Self {
        Self {
            inner,
            station_reads: Arc::new(AtomicUsize::new(0)),
            transport_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn station_reads(&self) -> usize {
        self.station_reads.load(Ordering::SeqCst)
    }

    pub fn transport_reads(&self) -> usize {
        self.transport_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationStore for CountingStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<Station>> {
        self.station_reads.fetch_add(1, Ordering::SeqCst);
        StationStore::find_by_id(&self.inner, id).await
    }

    async fn find_all(&self, filter: &StationFilter, page: PageRequest) -> Result<Vec<Station>> {
        StationStore::find_all(&self.inner, filter, page).await
    }

    async fn find_nearby(
        &self,
        origin: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<NearbyStation>> {
        self.inner.find_nearby(origin, radius_km).await
    }

    async fn get_availability(&self, station_id: u64) -> Result<Option<StationAvailability>> {
        self.inner.get_availability(station_id).await
    }

    async fn get_stats(&self) -> Result<StationStats> {
        self.inner.get_stats().await
    }

    async fn create(&self, station: NewStation) -> Result<Station> {
        StationStore::create(&self.inner, station).await
    }

    async fn update(&self, id: u64, patch: StationPatch) -> Result<Option<Station>> {
        StationStore::update(&self.inner, id, patch).await
    }

    async fn set_active(&self, id: u64, active: bool) -> Result<Option<Station>> {
        self.inner.set_active(id, active).await
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        StationStore::delete(&self.inner, id).await
    }
}

#[async_trait]
impl TransportStore for CountingStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<Transport>> {
        self.transport_reads.fetch_add(1, Ordering::SeqCst);
        TransportStore::find_by_id(&self.inner, id).await
    }

    async fn find_all(&self, filter: &TransportFilter) -> Result<Vec<Transport>> {
        TransportStore::find_all(&self.inner, filter).await
    }

    async fn find_available_at(&self, station_id: u64) -> Result<Vec<Transport>> {
        self.inner.find_available_at(station_id).await
    }

    async fn create(&self, transport: NewTransport) -> Result<Transport> {
        TransportStore::create(&self.inner, transport).await
    }

    async fn update(&self, id: u64, patch: TransportPatch) -> Result<Option<Transport>> {
        TransportStore::update(&self.inner, id, patch).await
    }

    async fn update_status(
        &self,
        id: u64,
        expected: TransportStatus,
        status: TransportStatus,
    ) -> Result<Option<Transport>> {
        self.inner.update_status(id, expected, status).await
    }

    async fn update_station(&self, id: u64, station_id: u64) -> Result<Option<Transport>> {
        self.inner.update_station(id, station_id).await
    }

    async fn update_battery_level(&self, id: u64, level: u8) -> Result<Option<Transport>> {
        self.inner.update_battery_level(id, level).await
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        TransportStore::delete(&self.inner, id).await
    }
}

// ─── App ─────────────────────────────────────────────────────

/// Fully wired state over the seeded store.
#[allow(dead_code)]
pub struct TestApp {
    pub db: MemoryDb,
    pub state: Arc<AppState>,
    pub sink: Arc<RecordingSink>,
    pub gateway: Arc<ScriptedGateway>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}

#[allow(dead_code)]
pub async fn test_app() -> TestApp {
    test_app_with(ScriptedGateway::approving(), RecordingSink::default()).await
}

#[allow(dead_code)]
pub async fn test_app_with(gateway: ScriptedGateway, sink: RecordingSink) -> TestApp {
    let db = seeded_db().await;
    let sink = Arc::new(sink);
    let gateway = Arc::new(gateway);
    let state = Arc::new(AppState::new(
        Config::default(),
        db.clone(),
        gateway.clone(),
        sink.clone(),
    ));
    TestApp {
        db,
        state,
        sink,
        gateway,
    }
}

/// Poll until `check` holds; notifications are delivered on spawned tasks.
#[allow(dead_code)]
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
