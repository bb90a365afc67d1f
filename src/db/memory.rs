// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store implementing every persistence trait.
//!
//! All tables live behind one `RwLock`, so each trait call (and in
//! particular each [`RentalLedger`] call) is atomic with respect to every
//! other call.

use crate::db::{LoanStore, RentalLedger, StationStore, TransportStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::{
    Coordinates, Loan, LoanStatus, NearbyStation, NewLoan, NewStation, NewTransport, PageRequest,
    Station, StationAvailability, StationFilter, StationPatch, StationStats, Transport,
    TransportFilter, TransportPatch, TransportStatus, User,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<u64, User>,
    stations: BTreeMap<u64, Station>,
    transports: BTreeMap<u64, Transport>,
    loans: BTreeMap<u64, Loan>,
    next_station_id: u64,
    next_transport_id: u64,
    next_loan_id: u64,
}

impl Tables {
    fn has_open_loan(&self, user_id: u64) -> bool {
        self.loans
            .values()
            .any(|loan| loan.user_id == user_id && loan.is_open())
    }

    fn insert_loan(&mut self, new: NewLoan) -> Loan {
        self.next_loan_id += 1;
        let loan = Loan::open(self.next_loan_id, new, Utc::now());
        self.loans.insert(loan.id, loan.clone());
        loan
    }

    fn availability(&self, station: &Station) -> StationAvailability {
        let mut available = 0;
        let mut docked = 0;
        let mut available_by_kind = BTreeMap::new();

        for transport in self
            .transports
            .values()
            .filter(|t| t.current_station_id == Some(station.id))
        {
            docked += 1;
            if transport.can_be_rented() {
                available += 1;
                *available_by_kind
                    .entry(transport.kind.label().to_string())
                    .or_insert(0) += 1;
            }
        }

        StationAvailability {
            station_id: station.id,
            capacity: station.capacity,
            available,
            docked,
            available_by_kind,
            free_docks: station.capacity.saturating_sub(docked),
        }
    }
}

/// Seed data file layout.
#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    stations: Vec<Station>,
    #[serde(default)]
    transports: Vec<Transport>,
}

/// Errors from loading seed data.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse fixture: {0}")]
    ParseError(String),

    #[error("Invalid fixture: {0}")]
    Invalid(String),
}

/// In-memory database.
#[derive(Clone)]
pub struct MemoryDb {
    tables: Option<Arc<RwLock<Tables>>>,
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDb {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tables: Some(Arc::new(RwLock::new(Tables::default()))),
        }
    }

    /// Create a store that is permanently unreachable.
    ///
    /// All operations return [`AppError::Database`]. Used to exercise the
    /// infrastructure-failure paths.
    pub fn new_offline() -> Self {
        Self { tables: None }
    }

    /// Helper to get the tables or return an error if offline.
    fn tables(&self) -> Result<&Arc<RwLock<Tables>>> {
        self.tables
            .as_ref()
            .ok_or_else(|| AppError::Database("Store not connected (offline mode)".to_string()))
    }

    /// Load seed data from a JSON file.
    pub async fn load_fixture<P: AsRef<Path>>(path: P) -> std::result::Result<Self, FixtureError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| FixtureError::IoError(e.to_string()))?;
        Self::from_json(&json_data).await
    }

    /// Load seed data from a JSON string.
    pub async fn from_json(json_data: &str) -> std::result::Result<Self, FixtureError> {
        let fixture: Fixture =
            serde_json::from_str(json_data).map_err(|e| FixtureError::ParseError(e.to_string()))?;

        let db = Self::new();
        for station in fixture.stations {
            Station::validate_capacity(station.capacity)
                .map_err(|e| FixtureError::Invalid(e.to_string()))?;
            db.insert_station(station)
                .await
                .map_err(|e| FixtureError::Invalid(e.to_string()))?;
        }
        for transport in fixture.transports {
            let in_use = transport.status == TransportStatus::InUse;
            if in_use == transport.current_station_id.is_some() {
                return Err(FixtureError::Invalid(format!(
                    "transport {} must have a station unless in use",
                    transport.id
                )));
            }
            db.insert_transport(transport)
                .await
                .map_err(|e| FixtureError::Invalid(e.to_string()))?;
        }
        for user in fixture.users {
            db.insert_user(user)
                .await
                .map_err(|e| FixtureError::Invalid(e.to_string()))?;
        }

        tracing::info!("Fixture loaded");
        Ok(db)
    }

    // ─── Seeding ─────────────────────────────────────────────────

    /// Insert or replace a user (users are provisioned outside the core).
    pub async fn insert_user(&self, user: User) -> Result<()> {
        self.tables()?.write().await.users.insert(user.id, user);
        Ok(())
    }

    /// Insert a station with a caller-chosen ID.
    pub async fn insert_station(&self, station: Station) -> Result<()> {
        let mut tables = self.tables()?.write().await;
        tables.next_station_id = tables.next_station_id.max(station.id);
        tables.stations.insert(station.id, station);
        Ok(())
    }

    /// Insert a transport with a caller-chosen ID.
    pub async fn insert_transport(&self, transport: Transport) -> Result<()> {
        let mut tables = self.tables()?.write().await;
        tables.next_transport_id = tables.next_transport_id.max(transport.id);
        tables.transports.insert(transport.id, transport);
        Ok(())
    }

    /// Insert a loan as-is, e.g. one imported with its original start date.
    /// The caller keeps the transport row consistent.
    pub async fn insert_loan(&self, loan: Loan) -> Result<()> {
        let mut tables = self.tables()?.write().await;
        tables.next_loan_id = tables.next_loan_id.max(loan.id);
        tables.loans.insert(loan.id, loan);
        Ok(())
    }

    /// Number of open loans for a user. Test and diagnostics helper.
    pub async fn count_open_loans(&self, user_id: u64) -> Result<usize> {
        let tables = self.tables()?.read().await;
        Ok(tables
            .loans
            .values()
            .filter(|loan| loan.user_id == user_id && loan.is_open())
            .count())
    }
}

// ─── Users ───────────────────────────────────────────────────────

#[async_trait]
impl UserStore for MemoryDb {
    async fn find_by_id(&self, id: u64) -> Result<Option<User>> {
        Ok(self.tables()?.read().await.users.get(&id).cloned())
    }

    async fn has_active_loan(&self, user_id: u64) -> Result<bool> {
        LoanStore::has_active_loans(self, user_id).await
    }
}

// ─── Stations ────────────────────────────────────────────────────

#[async_trait]
impl StationStore for MemoryDb {
    async fn find_by_id(&self, id: u64) -> Result<Option<Station>> {
        Ok(self.tables()?.read().await.stations.get(&id).cloned())
    }

    async fn find_all(&self, filter: &StationFilter, page: PageRequest) -> Result<Vec<Station>> {
        let tables = self.tables()?.read().await;
        Ok(tables
            .stations
            .values()
            .filter(|s| filter.matches(s))
            .skip(page.offset())
            .take(page.per_page as usize)
            .cloned()
            .collect())
    }

    async fn find_nearby(
        &self,
        origin: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<NearbyStation>> {
        let tables = self.tables()?.read().await;
        let mut nearby: Vec<NearbyStation> = tables
            .stations
            .values()
            .filter(|s| s.is_active)
            .map(|s| NearbyStation {
                distance_km: origin.distance_km(&s.coordinates),
                station: s.clone(),
            })
            .filter(|n| n.distance_km <= radius_km)
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }

    async fn get_availability(&self, station_id: u64) -> Result<Option<StationAvailability>> {
        let tables = self.tables()?.read().await;
        Ok(tables
            .stations
            .get(&station_id)
            .map(|station| tables.availability(station)))
    }

    async fn get_stats(&self) -> Result<StationStats> {
        let tables = self.tables()?.read().await;
        let mut stats = StationStats::default();
        for station in tables.stations.values() {
            stats.total_stations += 1;
            stats.total_capacity += station.capacity;
            if station.is_active {
                stats.active_stations += 1;
            }
        }
        for transport in tables.transports.values() {
            if transport.can_be_rented() {
                stats.available_transports += 1;
            }
            if transport.status == TransportStatus::InUse {
                stats.transports_in_use += 1;
            }
        }
        Ok(stats)
    }

    async fn create(&self, new: NewStation) -> Result<Station> {
        Station::validate_capacity(new.capacity)?;
        let mut tables = self.tables()?.write().await;
        tables.next_station_id += 1;
        let station = Station {
            id: tables.next_station_id,
            name: new.name,
            address: new.address,
            coordinates: new.coordinates,
            capacity: new.capacity,
            is_active: true,
        };
        tables.stations.insert(station.id, station.clone());
        Ok(station)
    }

    async fn update(&self, id: u64, patch: StationPatch) -> Result<Option<Station>> {
        if let Some(capacity) = patch.capacity {
            Station::validate_capacity(capacity)?;
        }
        let mut tables = self.tables()?.write().await;
        let Some(station) = tables.stations.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            station.name = name;
        }
        if let Some(address) = patch.address {
            station.address = address;
        }
        if let Some(coordinates) = patch.coordinates {
            station.coordinates = coordinates;
        }
        if let Some(capacity) = patch.capacity {
            station.capacity = capacity;
        }
        Ok(Some(station.clone()))
    }

    async fn set_active(&self, id: u64, active: bool) -> Result<Option<Station>> {
        let mut tables = self.tables()?.write().await;
        Ok(tables.stations.get_mut(&id).map(|station| {
            station.is_active = active;
            station.clone()
        }))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut tables = self.tables()?.write().await;
        let docked = tables
            .transports
            .values()
            .any(|t| t.current_station_id == Some(id));
        if docked {
            return Err(AppError::BadRequest(format!(
                "Station {} still has docked transports",
                id
            )));
        }
        Ok(tables.stations.remove(&id).is_some())
    }
}

// ─── Transports ──────────────────────────────────────────────────

#[async_trait]
impl TransportStore for MemoryDb {
    async fn find_by_id(&self, id: u64) -> Result<Option<Transport>> {
        Ok(self.tables()?.read().await.transports.get(&id).cloned())
    }

    async fn find_all(&self, filter: &TransportFilter) -> Result<Vec<Transport>> {
        let tables = self.tables()?.read().await;
        Ok(tables
            .transports
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn find_available_at(&self, station_id: u64) -> Result<Vec<Transport>> {
        let tables = self.tables()?.read().await;
        Ok(tables
            .transports
            .values()
            .filter(|t| t.current_station_id == Some(station_id) && t.can_be_rented())
            .cloned()
            .collect())
    }

    async fn create(&self, new: NewTransport) -> Result<Transport> {
        let mut tables = self.tables()?.write().await;
        if !tables.stations.contains_key(&new.station_id) {
            return Err(AppError::StationNotFound(new.station_id));
        }
        tables.next_transport_id += 1;
        let transport = Transport {
            id: tables.next_transport_id,
            kind: new.kind,
            status: TransportStatus::Available,
            current_station_id: Some(new.station_id),
            hourly_rate: new.hourly_rate,
        };
        tables.transports.insert(transport.id, transport.clone());
        Ok(transport)
    }

    async fn update(&self, id: u64, patch: TransportPatch) -> Result<Option<Transport>> {
        let mut tables = self.tables()?.write().await;
        Ok(tables.transports.get_mut(&id).map(|transport| {
            if let Some(rate) = patch.hourly_rate {
                transport.hourly_rate = rate;
            }
            transport.clone()
        }))
    }

    async fn update_status(
        &self,
        id: u64,
        expected: TransportStatus,
        status: TransportStatus,
    ) -> Result<Option<Transport>> {
        let mut tables = self.tables()?.write().await;
        let Some(transport) = tables.transports.get_mut(&id) else {
            return Ok(None);
        };
        if transport.status != expected {
            return Err(AppError::IllegalTransportTransition {
                from: transport.status,
                to: status,
            });
        }
        transport.status = status;
        Ok(Some(transport.clone()))
    }

    async fn update_station(&self, id: u64, station_id: u64) -> Result<Option<Transport>> {
        let mut tables = self.tables()?.write().await;
        if !tables.stations.contains_key(&station_id) {
            return Err(AppError::StationNotFound(station_id));
        }
        let Some(transport) = tables.transports.get_mut(&id) else {
            return Ok(None);
        };
        transport.relocate(station_id)?;
        Ok(Some(transport.clone()))
    }

    async fn update_battery_level(&self, id: u64, level: u8) -> Result<Option<Transport>> {
        let mut tables = self.tables()?.write().await;
        let Some(transport) = tables.transports.get_mut(&id) else {
            return Ok(None);
        };
        transport.update_battery_level(i32::from(level))?;
        Ok(Some(transport.clone()))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let mut tables = self.tables()?.write().await;
        match tables.transports.get(&id) {
            None => Ok(false),
            Some(t) if t.status == TransportStatus::InUse => {
                Err(AppError::TransportNotAvailable {
                    transport_id: id,
                    status: t.status,
                })
            }
            Some(_) => Ok(tables.transports.remove(&id).is_some()),
        }
    }
}

// ─── Loans ───────────────────────────────────────────────────────

#[async_trait]
impl LoanStore for MemoryDb {
    async fn save(&self, new: NewLoan) -> Result<Loan> {
        let mut tables = self.tables()?.write().await;
        Ok(tables.insert_loan(new))
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<Loan>> {
        Ok(self.tables()?.read().await.loans.get(&id).cloned())
    }

    async fn update(&self, loan: &Loan, expected: LoanStatus) -> Result<Loan> {
        let mut tables = self.tables()?.write().await;
        let stored = tables
            .loans
            .get_mut(&loan.id)
            .ok_or(AppError::LoanNotFound(loan.id))?;
        if stored.status != expected {
            return Err(AppError::IllegalLoanTransition {
                from: stored.status,
                to: loan.status,
            });
        }
        *stored = loan.clone();
        Ok(loan.clone())
    }

    async fn has_active_loans(&self, user_id: u64) -> Result<bool> {
        Ok(self.tables()?.read().await.has_open_loan(user_id))
    }

    async fn find_by_user(&self, user_id: u64) -> Result<Vec<Loan>> {
        let tables = self.tables()?.read().await;
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|loan| loan.user_id == user_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(loans)
    }
}

// ─── Atomic Rental Writes ────────────────────────────────────────

#[async_trait]
impl RentalLedger for MemoryDb {
    async fn open_loan(&self, new: NewLoan) -> Result<Loan> {
        let mut tables = self.tables()?.write().await;

        // Re-validate under the write lock: another request may have won the race.
        if tables.has_open_loan(new.user_id) {
            return Err(AppError::UserHasActiveLoan(new.user_id));
        }
        let transport = tables
            .transports
            .get_mut(&new.transport_id)
            .ok_or(AppError::TransportNotFound(new.transport_id))?;
        if transport.status != TransportStatus::Available {
            return Err(AppError::TransportNotAvailable {
                transport_id: transport.id,
                status: transport.status,
            });
        }
        if transport.current_station_id != Some(new.origin_station_id) {
            return Err(AppError::TransportNotAtStation {
                transport_id: transport.id,
                station_id: new.origin_station_id,
            });
        }
        transport.ensure_rentable()?;
        transport.start_rental()?;

        let loan = tables.insert_loan(new);

        tracing::debug!(
            loan_id = loan.id,
            transport_id = loan.transport_id,
            "Loan opened atomically"
        );
        Ok(loan)
    }

    async fn close_loan(
        &self,
        loan: &Loan,
        expected: LoanStatus,
        dock_station_id: u64,
    ) -> Result<Loan> {
        let mut tables = self.tables()?.write().await;

        let stored_status = tables
            .loans
            .get(&loan.id)
            .map(|l| l.status)
            .ok_or(AppError::LoanNotFound(loan.id))?;
        if stored_status != expected {
            return Err(match loan.status {
                LoanStatus::Cancelled => AppError::LoanNotCancellable {
                    loan_id: loan.id,
                    status: stored_status,
                },
                _ => AppError::LoanNotCompletable {
                    loan_id: loan.id,
                    status: stored_status,
                },
            });
        }

        tables
            .transports
            .get_mut(&loan.transport_id)
            .ok_or(AppError::TransportNotFound(loan.transport_id))?
            .end_rental(dock_station_id)?;
        tables.loans.insert(loan.id, loan.clone());

        tracing::debug!(
            loan_id = loan.id,
            transport_id = loan.transport_id,
            status = %loan.status,
            "Loan closed atomically"
        );
        Ok(loan.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BrakeType, Money, TransportKind, UserRole, UserStatus};

    async fn seeded() -> MemoryDb {
        let db = MemoryDb::new();
        db.insert_station(Station {
            id: 1,
            name: "Central".to_string(),
            address: "Cra 7 # 12-30".to_string(),
            coordinates: Coordinates {
                latitude: 4.60,
                longitude: -74.07,
            },
            capacity: 2,
            is_active: true,
        })
        .await
        .unwrap();
        db.insert_transport(Transport {
            id: 5,
            kind: TransportKind::Bicycle {
                gear_count: 3,
                brake_type: BrakeType::Rim,
            },
            status: TransportStatus::Available,
            current_station_id: Some(1),
            hourly_rate: Money::from_units(3000),
        })
        .await
        .unwrap();
        db.insert_user(User {
            id: 9,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            status: UserStatus::Active,
            role: UserRole::User,
        })
        .await
        .unwrap();
        db
    }

    fn new_loan() -> NewLoan {
        NewLoan {
            user_id: 9,
            transport_id: 5,
            origin_station_id: 1,
            estimated_duration: None,
        }
    }

    #[tokio::test]
    async fn test_open_loan_writes_loan_and_transport() {
        let db = seeded().await;

        let loan = db.open_loan(new_loan()).await.unwrap();
        assert_eq!(loan.status, LoanStatus::Active);

        let stored = TransportStore::find_by_id(&db, 5).await.unwrap().unwrap();
        assert_eq!(stored.status, TransportStatus::InUse);
        assert_eq!(stored.current_station_id, None);
        assert!(UserStore::has_active_loan(&db, 9).await.unwrap());
    }

    #[tokio::test]
    async fn test_ledger_only_moves_status_and_station() {
        let db = seeded().await;
        TransportStore::update(
            &db,
            5,
            TransportPatch {
                hourly_rate: Some(Money::from_units(3600)),
            },
        )
        .await
        .unwrap();

        let loan = db.open_loan(new_loan()).await.unwrap();
        let mut closed = loan.clone();
        closed.cancel().unwrap();
        db.close_loan(&closed, LoanStatus::Active, 1).await.unwrap();

        let stored = TransportStore::find_by_id(&db, 5).await.unwrap().unwrap();
        assert_eq!(stored.hourly_rate, Money::from_units(3600));
        assert_eq!(stored.status, TransportStatus::Available);
        assert_eq!(stored.current_station_id, Some(1));
    }

    #[tokio::test]
    async fn test_open_loan_rechecks_stored_battery() {
        let db = seeded().await;
        db.insert_transport(Transport {
            id: 6,
            kind: TransportKind::ElectricScooter {
                battery_level: 80,
                max_speed_kmh: 25,
                range_km: 30,
            },
            status: TransportStatus::Available,
            current_station_id: Some(1),
            hourly_rate: Money::from_units(4500),
        })
        .await
        .unwrap();
        db.update_battery_level(6, 8).await.unwrap();

        let err = db
            .open_loan(NewLoan {
                transport_id: 6,
                ..new_loan()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::BatteryTooLow {
                transport_id: 6,
                battery_level: 8
            }
        ));
        assert_eq!(db.count_open_loans(9).await.unwrap(), 0);
        let stored = TransportStore::find_by_id(&db, 6).await.unwrap().unwrap();
        assert_eq!(stored.status, TransportStatus::Available);
    }

    #[tokio::test]
    async fn test_open_loan_rejects_second_open_loan_without_writing() {
        let db = seeded().await;
        db.save(new_loan()).await.unwrap();

        let err = db.open_loan(new_loan()).await.unwrap_err();
        assert!(matches!(err, AppError::UserHasActiveLoan(9)));

        let stored = TransportStore::find_by_id(&db, 5).await.unwrap().unwrap();
        assert_eq!(stored.status, TransportStatus::Available);
        assert_eq!(db.count_open_loans(9).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_close_loan_checks_expected_status() {
        let db = seeded().await;
        let loan = db.open_loan(new_loan()).await.unwrap();

        let mut cancelled = loan.clone();
        cancelled.cancel().unwrap();

        let err = db
            .close_loan(&cancelled, LoanStatus::Extended, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LoanNotCancellable { .. }));
        let stored = TransportStore::find_by_id(&db, 5).await.unwrap().unwrap();
        assert_eq!(stored.status, TransportStatus::InUse);

        db.close_loan(&cancelled, LoanStatus::Active, 1).await.unwrap();
        let stored = LoanStore::find_by_id(&db, loan.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LoanStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_update_status_is_compare_and_set() {
        let db = seeded().await;
        let err = db
            .update_status(5, TransportStatus::Maintenance, TransportStatus::Available)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IllegalTransportTransition { .. }));

        let updated = db
            .update_status(5, TransportStatus::Available, TransportStatus::Maintenance)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TransportStatus::Maintenance);
    }

    #[tokio::test]
    async fn test_availability_counts_docked_and_free() {
        let db = seeded().await;
        let availability = db.get_availability(1).await.unwrap().unwrap();
        assert_eq!(availability.available, 1);
        assert_eq!(availability.docked, 1);
        assert_eq!(availability.free_docks, 1);
        assert_eq!(availability.available_by_kind.get("bicycle"), Some(&1));
    }

    #[tokio::test]
    async fn test_offline_store_fails_with_database_error() {
        let db = MemoryDb::new_offline();
        let err = StationStore::find_by_id(&db, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_fixture_rejects_docked_in_use_transport() {
        let json = r#"{
            "stations": [],
            "transports": [{
                "id": 1,
                "kind": {"type": "bicycle", "gear_count": 1, "brake_type": "rim"},
                "status": "in_use",
                "current_station_id": 3,
                "hourly_rate": "3000"
            }]
        }"#;
        assert!(matches!(
            MemoryDb::from_json(json).await,
            Err(FixtureError::Invalid(_))
        ));
    }
}
