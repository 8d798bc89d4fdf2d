//! Endpoint smoke suite run against a live server.
//!
//! Start the API with a seed file (for instance `SEED_FILE=demos/seed.json
//! STORAGE_BACKEND=memory`) and run `cargo run -p endpoint-integration-tests`.
//! `BASE_URL` overrides the default address.

use futures::future::join_all;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const RACE_CALLERS: usize = 12;

pub struct ApiTestClient {
    client: Client,
    base_url: String,
}

impl ApiTestClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: std::env::var("BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.client.get(format!("{}{}", self.base_url, path)).send().await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Response, reqwest::Error> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
    }
}

#[derive(Debug, Default)]
pub struct TestResults {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub failures: Vec<String>,
}

impl TestResults {
    pub fn pass(&mut self, test_name: &str) {
        self.passed += 1;
        println!("PASS {}", test_name);
    }

    pub fn fail(&mut self, test_name: &str, error: &str) {
        self.failed += 1;
        self.failures.push(format!("{}: {}", test_name, error));
        println!("FAIL {}: {}", test_name, error);
    }

    pub fn skip(&mut self, test_name: &str, reason: &str) {
        self.skipped += 1;
        println!("SKIP {} ({})", test_name, reason);
    }

    pub fn check(&mut self, test_name: &str, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => self.pass(test_name),
            Err(e) => self.fail(test_name, &e),
        }
    }

    pub fn summary(&self) {
        println!("\nPassed: {}  Failed: {}  Skipped: {}", self.passed, self.failed, self.skipped);
        for failure in &self.failures {
            println!("  - {}", failure);
        }
    }
}

fn booking_body(slot: &Value, client_name: &str) -> Value {
    json!({
        "doctor_id": slot["doctor_id"],
        "date": slot["date"],
        "time": slot["time"],
        "client_name": client_name,
        "pet_name": "Rex",
        "contact": "555-0001"
    })
}

async fn expect_status(response: Result<Response, reqwest::Error>, expected: StatusCode) -> Result<Value, String> {
    let response = response.map_err(|e| e.to_string())?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if status == expected {
        Ok(body)
    } else {
        Err(format!("expected {}, got {}: {}", expected, status, body))
    }
}

async fn first_available_slot(client: &ApiTestClient) -> Result<Value, String> {
    let body = expect_status(client.get("/availability").await, StatusCode::OK).await?;
    let slots = body["slots"].as_array().ok_or("slots missing")?;

    let sorted = slots.windows(2).all(|pair| {
        let key = |s: &Value| format!("{} {}", s["date"].as_str().unwrap_or(""), s["time"].as_str().unwrap_or(""));
        key(&pair[0]) <= key(&pair[1])
    });
    if !sorted {
        return Err("slots are not ordered by date and time".to_string());
    }

    slots.first().cloned().ok_or_else(|| "no slots available".to_string())
}

async fn race_for_slot(client: &ApiTestClient, slot: &Value) -> Result<(), String> {
    let bodies: Vec<Value> = (0..RACE_CALLERS)
        .map(|_| booking_body(slot, &format!("racer-{}", Uuid::new_v4())))
        .collect();
    let responses = join_all(bodies.iter().map(|body| client.post("/book", body))).await;

    let mut created = 0;
    let mut not_found = 0;
    for response in responses {
        match response.map_err(|e| e.to_string())?.status() {
            StatusCode::CREATED => created += 1,
            StatusCode::NOT_FOUND => not_found += 1,
            other => return Err(format!("unexpected status {}", other)),
        }
    }

    if created == 1 && not_found == RACE_CALLERS - 1 {
        Ok(())
    } else {
        Err(format!("{} bookings created, {} rejected", created, not_found))
    }
}

pub async fn run_endpoint_tests() -> TestResults {
    let client = ApiTestClient::new();
    let mut results = TestResults::default();

    match client.get("/").await {
        Ok(response) if response.status().is_success() => results.pass("Liveness"),
        Ok(response) => results.fail("Liveness", &format!("Status: {}", response.status())),
        Err(e) => {
            results.fail("Liveness", &e.to_string());
            return results;
        }
    }

    let slot = match first_available_slot(&client).await {
        Ok(slot) => {
            results.pass("Availability listing");
            slot
        }
        Err(e) => {
            results.fail("Availability listing", &e);
            return results;
        }
    };

    let missing_contact = json!({ "doctor_id": slot["doctor_id"], "date": slot["date"], "time": slot["time"] });
    results.check(
        "Missing fields rejected",
        expect_status(client.post("/book", &missing_contact).await, StatusCode::BAD_REQUEST)
            .await
            .map(|_| ()),
    );

    results.check("Concurrent booking has a single winner", race_for_slot(&client, &slot).await);

    results.check(
        "Repeat booking rejected",
        expect_status(client.post("/book", &booking_body(&slot, "late")).await, StatusCode::NOT_FOUND)
            .await
            .map(|_| ()),
    );

    match expect_status(client.get("/appointments").await, StatusCode::OK).await {
        Ok(body) => {
            let matching = body["appointments"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter(|a| a["doctor_id"] == slot["doctor_id"] && a["date"] == slot["date"] && a["time"] == slot["time"])
                        .count()
                })
                .unwrap_or(0);
            if matching == 1 {
                results.pass("Booked slot has exactly one appointment");
            } else {
                results.fail("Booked slot has exactly one appointment", &format!("found {}", matching));
            }
        }
        Err(e) => results.fail("Appointment listing", &e),
    }

    match client.get("/availability?specialty=astrology").await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => results.pass("Empty availability is 404"),
        Ok(response) => results.fail("Empty availability is 404", &format!("Status: {}", response.status())),
        Err(e) => results.skip("Empty availability is 404", &e.to_string()),
    }

    results
}

#[tokio::main]
async fn main() {
    let results = run_endpoint_tests().await;
    results.summary();

    if results.failed > 0 {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a running API server"]
    async fn test_endpoint_suite_against_live_server() {
        let results = run_endpoint_tests().await;
        assert_eq!(results.failed, 0, "{:?}", results.failures);
    }

    #[test]
    fn booking_body_copies_slot_key() {
        let slot = json!({ "doctor_id": "D1", "date": "2025-01-10", "time": "08:00" });
        let body = booking_body(&slot, "Alice");
        assert_eq!(body["doctor_id"], "D1");
        assert_eq!(body["time"], "08:00");
        assert_eq!(body["client_name"], "Alice");
    }
}
