use std::collections::HashMap;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use shared_models::{Appointment, Doctor, NewAppointment, Slot, SlotFilter, SlotKey};

use crate::backend::{BackendError, BackendResult, PersistenceBackend};

const RESERVE_SCRIPT: &str = r#"
if redis.call('HGET', KEYS[1], 'available') == '1' then
    redis.call('HSET', KEYS[1], 'available', '0')
    return 1
end
return 0
"#;

const INSERT_SLOT_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], 'doctor_id', ARGV[1], 'date', ARGV[2], 'time', ARGV[3], 'available', ARGV[4])
redis.call('SADD', KEYS[2], KEYS[1])
redis.call('SADD', KEYS[3], KEYS[1])
return 1
"#;

/// Key layout, partitioned by date the way a partition/sort-key table would be.
#[derive(Debug, Clone)]
pub struct RedisKeys {
    prefix: String,
}

impl RedisKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn doctor(&self, doctor_id: &str) -> String {
        format!("{}:doctor:{}", self.prefix, doctor_id)
    }

    pub fn doctor_index(&self) -> String {
        format!("{}:doctors", self.prefix)
    }

    pub fn slot(&self, key: &SlotKey) -> String {
        format!("{}:slot:{}:{}:{}", self.prefix, key.date, key.doctor_id, key.time)
    }

    pub fn slot_index(&self) -> String {
        format!("{}:slots", self.prefix)
    }

    pub fn slots_on(&self, date: &str) -> String {
        format!("{}:slots:{}", self.prefix, date)
    }

    pub fn appointment(&self, id: u64) -> String {
        format!("{}:appointment:{}", self.prefix, id)
    }

    pub fn appointment_index(&self) -> String {
        format!("{}:appointments", self.prefix)
    }

    pub fn appointment_sequence(&self) -> String {
        format!("{}:appointment:seq", self.prefix)
    }
}

pub struct RedisBackend {
    pool: Pool,
    keys: RedisKeys,
    reserve_script: Script,
    insert_slot_script: Script,
}

impl RedisBackend {
    pub async fn connect(redis_url: &str, prefix: &str) -> BackendResult<Self> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| BackendError::Unavailable(format!("Failed to create Redis pool: {}", e)))?;

        let backend = Self {
            pool,
            keys: RedisKeys::new(prefix),
            reserve_script: Script::new(RESERVE_SCRIPT),
            insert_slot_script: Script::new(INSERT_SLOT_SCRIPT),
        };

        let mut conn = backend.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis storage backend initialized with prefix '{}'", prefix);

        Ok(backend)
    }

    async fn get_connection(&self) -> BackendResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| BackendError::Unavailable(format!("Redis connection error: {}", e)))
    }

    async fn load_slots(&self, conn: &mut Connection, slot_keys: Vec<String>) -> BackendResult<Vec<Slot>> {
        if slot_keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in &slot_keys {
            pipe.hgetall(key);
        }
        let rows: Vec<HashMap<String, String>> = pipe.query_async(conn).await?;

        rows.into_iter()
            .zip(slot_keys)
            .filter(|(row, _)| !row.is_empty())
            .map(|(row, key)| slot_from_hash(&key, row))
            .collect()
    }
}

fn field(row: &mut HashMap<String, String>, name: &str, key: &str) -> BackendResult<String> {
    row.remove(name)
        .ok_or_else(|| BackendError::Corrupt(format!("{} is missing field '{}'", key, name)))
}

fn slot_from_hash(key: &str, mut row: HashMap<String, String>) -> BackendResult<Slot> {
    Ok(Slot {
        doctor_id: field(&mut row, "doctor_id", key)?,
        date: field(&mut row, "date", key)?,
        time: field(&mut row, "time", key)?,
        available: field(&mut row, "available", key)? == "1",
    })
}

fn doctor_from_hash(doctor_id: &str, mut row: HashMap<String, String>) -> BackendResult<Doctor> {
    Ok(Doctor {
        id: doctor_id.to_string(),
        name: field(&mut row, "name", doctor_id)?,
        specialty: field(&mut row, "specialty", doctor_id)?,
        email: field(&mut row, "email", doctor_id)?,
    })
}

#[async_trait]
impl PersistenceBackend for RedisBackend {
    async fn get_doctor(&self, doctor_id: &str) -> BackendResult<Option<Doctor>> {
        let mut conn = self.get_connection().await?;
        let row: HashMap<String, String> = conn.hgetall(self.keys.doctor(doctor_id)).await?;
        if row.is_empty() {
            return Ok(None);
        }
        doctor_from_hash(doctor_id, row).map(Some)
    }

    async fn list_doctors(&self) -> BackendResult<Vec<Doctor>> {
        let mut conn = self.get_connection().await?;
        let mut ids: Vec<String> = conn.smembers(self.keys.doctor_index()).await?;
        ids.sort();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(self.keys.doctor(id));
        }
        let rows: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        ids.iter()
            .zip(rows)
            .filter(|(_, row)| !row.is_empty())
            .map(|(id, row)| doctor_from_hash(id, row))
            .collect()
    }

    async fn query_slots(&self, filter: &SlotFilter) -> BackendResult<Vec<Slot>> {
        let mut conn = self.get_connection().await?;
        let index = match &filter.date {
            Some(date) => self.keys.slots_on(date),
            None => self.keys.slot_index(),
        };
        let slot_keys: Vec<String> = conn.smembers(index).await?;
        let slots = self.load_slots(&mut conn, slot_keys).await?;

        Ok(slots.into_iter().filter(|slot| filter.accepts(slot)).collect())
    }

    async fn conditional_reserve(&self, key: &SlotKey) -> BackendResult<bool> {
        let mut conn = self.get_connection().await?;
        let reserved: i32 = self
            .reserve_script
            .key(self.keys.slot(key))
            .invoke_async(&mut conn)
            .await?;
        debug!("Redis reserve of {} -> {}", key, reserved);
        Ok(reserved == 1)
    }

    async fn put_appointment(&self, appointment: NewAppointment) -> BackendResult<Appointment> {
        let mut conn = self.get_connection().await?;
        let id: u64 = conn.incr(self.keys.appointment_sequence(), 1u64).await?;
        let stored = appointment.into_appointment(id);
        let payload = serde_json::to_string(&stored)?;

        let _: () = redis::pipe()
            .atomic()
            .set(self.keys.appointment(id), payload)
            .ignore()
            .rpush(self.keys.appointment_index(), id)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(stored)
    }

    async fn list_appointments(&self) -> BackendResult<Vec<Appointment>> {
        let mut conn = self.get_connection().await?;
        let ids: Vec<u64> = conn.lrange(self.keys.appointment_index(), 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.get(self.keys.appointment(*id));
        }
        let payloads: Vec<Option<String>> = pipe.query_async(&mut conn).await?;

        payloads
            .into_iter()
            .flatten()
            .map(|raw| serde_json::from_str(&raw).map_err(BackendError::from))
            .collect()
    }

    async fn insert_doctor(&self, doctor: Doctor) -> BackendResult<()> {
        let mut conn = self.get_connection().await?;
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(
                self.keys.doctor(&doctor.id),
                &[
                    ("name", doctor.name.as_str()),
                    ("specialty", doctor.specialty.as_str()),
                    ("email", doctor.email.as_str()),
                ],
            )
            .ignore()
            .sadd(self.keys.doctor_index(), &doctor.id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn insert_slot(&self, slot: Slot) -> BackendResult<()> {
        let mut conn = self.get_connection().await?;
        let key = slot.key();
        let inserted: i32 = self
            .insert_slot_script
            .key(self.keys.slot(&key))
            .key(self.keys.slot_index())
            .key(self.keys.slots_on(&key.date))
            .arg(&slot.doctor_id)
            .arg(&slot.date)
            .arg(&slot.time)
            .arg(if slot.available { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await?;

        if inserted == 0 {
            return Err(BackendError::DuplicateSlot(key));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
