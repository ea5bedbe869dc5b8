// tests/api_tests.rs

mod common;

use std::sync::Arc;

use asmath::{models::round::RoundKind, randomizer};
use common::FakeNetwork;
use serde_json::{Value, json};

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL and the scripted origin behind it.
async fn spawn_app() -> (String, Arc<FakeNetwork>) {
    let network = FakeNetwork::new();
    network.serve("/offline", 200, "you are offline");
    network.serve("/student", 200, "student dashboard");

    let app = common::app(network.clone(), &["/offline"]).await;

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, network)
}

fn questions() -> Value {
    json!([
        { "ordinal": 1, "prompt": "2 + 2", "choices": ["3", "4", "5", "22"], "correct_choice": "4" },
        { "ordinal": 2, "prompt": "3 x 3", "choices": ["6", "9", "12", "33"], "correct_choice": "9" },
        { "ordinal": 3, "prompt": "10 - 7", "choices": ["3", "7", "17", "1"], "correct_choice": "3" },
        { "number": 4, "question": "8 / 2", "answers": ["2", "4", "6", "16"], "correct": "4" }
    ])
}

async fn prepare(client: &reqwest::Client, address: &str, room: &str, participant: &str) -> Value {
    let response = client
        .post(format!("{}/api/rounds/prepare", address))
        .json(&json!({
            "room_id": room,
            "participant_id": participant,
            "round_kind": "activity",
            "questions": questions(),
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

fn ordinals(round: &Value) -> Vec<u64> {
    round["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["ordinal"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn prepare_round_is_stable_per_participant() {
    // Arrange
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();
    let room = format!("room_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    // Act
    let first = prepare(&client, &address, &room, "p1").await;
    let again = prepare(&client, &address, &room, "p1").await;

    // Assert
    assert_eq!(first, again);
    assert_eq!(
        first["seed"].as_u64().unwrap(),
        u64::from(randomizer::seed(&room, "p1", RoundKind::Activity))
    );

    let mut sorted = ordinals(&first);
    sorted.sort();
    assert_eq!(sorted, vec![1, 2, 3, 4]);

    for question in first["questions"].as_array().unwrap() {
        assert!(question.get("correct_choice").is_none());
        assert_eq!(question["choices"].as_array().unwrap().len(), 4);
    }
}

#[tokio::test]
async fn participants_get_different_orders_across_rooms() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let mut identical = 0;
    for room in 0..30 {
        let room = format!("room-{room}");
        let p1 = prepare(&client, &address, &room, "p1").await;
        let p2 = prepare(&client, &address, &room, "p2").await;
        if ordinals(&p1) == ordinals(&p2) {
            identical += 1;
        }
    }

    assert!(identical < 10, "{identical} of 30 rooms gave identical orders");
}

#[tokio::test]
async fn prepare_round_rejects_invalid_input() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let cases = [
        json!({
            "room_id": "",
            "participant_id": "p1",
            "round_kind": "exam",
            "questions": questions(),
        }),
        json!({
            "room_id": "R1",
            "participant_id": "p1",
            "round_kind": "exam",
            "questions": [{ "ordinal": 1, "prompt": "1 + 1", "choices": ["2"], "correct_choice": "2" }],
        }),
        json!({
            "room_id": "R1",
            "participant_id": "p1",
            "round_kind": "exam",
            "questions": [
                { "ordinal": 1, "prompt": "1 + 1", "choices": ["2", "3"], "correct_choice": "2" },
                { "ordinal": 1, "prompt": "1 + 2", "choices": ["2", "3"], "correct_choice": "3" }
            ],
        }),
    ];

    for body in cases {
        let response = client
            .post(format!("{}/api/rounds/prepare", address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 400, "{body}");

        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
    }
}

#[tokio::test]
async fn score_round_counts_correct_answers() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let score: Value = client
        .post(format!("{}/api/rounds/score", address))
        .json(&json!({
            "questions": questions(),
            "answers": { "1": "4", "2": "6", "4": "4" },
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(score["score"], 2);
    assert_eq!(score["correct_count"], 2);
    assert_eq!(score["total_questions"], 4);
}

#[tokio::test]
async fn controller_status_reports_active_generation() {
    let (address, _) = spawn_app().await;

    let status: Value = reqwest::get(format!("{}/api/controller/status", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["state"], "active");
    assert_eq!(status["generation"], common::GENERATION);
    assert_eq!(status["generations"], json!([common::GENERATION]));
    assert_eq!(status["entries"], 1);
}

#[tokio::test]
async fn proxied_navigation_survives_going_offline() {
    let (address, network) = spawn_app().await;
    let client = reqwest::Client::new();

    let navigate = || {
        client
            .get(format!("{}/student", address))
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-dest", "document")
            .send()
    };

    let online = navigate().await.unwrap();
    assert_eq!(online.status().as_u16(), 200);
    assert_eq!(online.text().await.unwrap(), "student dashboard");

    network.set_online(false);

    let offline = navigate().await.unwrap();
    assert_eq!(offline.status().as_u16(), 200);
    assert!(offline.headers().get("x-offline-fallback").is_none());
    assert_eq!(offline.text().await.unwrap(), "student dashboard");

    let unknown = client
        .get(format!("{}/teacher/create", address))
        .header("sec-fetch-mode", "navigate")
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.headers()["x-offline-fallback"], "offline-page");
    assert_eq!(unknown.text().await.unwrap(), "you are offline");
}

#[tokio::test]
async fn writes_go_straight_to_the_origin() {
    let (address, network) = spawn_app().await;
    let client = reqwest::Client::new();

    let online = client
        .post(format!("{}/rooms/R1/attendance", address))
        .json(&json!({ "activityScore": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(online.status().as_u16(), 404);

    network.set_online(false);
    let offline = client
        .post(format!("{}/rooms/R1/attendance", address))
        .json(&json!({ "activityScore": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(offline.status().as_u16(), 502);
}

#[tokio::test]
async fn leaderboard_ranks_by_combined_score() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let board: Value = client
        .post(format!("{}/api/rounds/leaderboard", address))
        .json(&json!({
            "participants": [
                { "participant_id": "u1", "name": "Ana", "activityScore": 3, "examScore": 4 },
                { "participant_id": "u2", "name": "Ben", "examScore": 9 },
                { "participant_id": "u3", "name": "Cy", "activity_score": 5, "exam_score": 2 }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let rows = board.as_array().unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r["participant_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["u2", "u1", "u3"]);
    assert_eq!(rows[0]["activity_score"], 0);
    assert_eq!(rows[0]["total"], 9);
    assert_eq!(rows[2]["rank"], 3);
}
