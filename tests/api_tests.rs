// tests/api_tests.rs

use std::{collections::HashMap, sync::Arc};

use quiz_backend::{
    config::Config,
    generator::DisabledGenerator,
    models::user::{Role, User},
    routes,
    state::AppState,
    store::{MemoryStore, QuizStore},
    utils::hash::hash_password,
};
use serde_json::{Value, json};

const ADMIN_EMAIL: &str = "admin@college.edu";
const ADMIN_PASSWORD: &str = "admin-pass";

struct TestApp {
    address: String,
    client: reqwest::Client,
}

/// Spawns the app on a random port against a fresh in-memory store with one
/// seeded admin.
async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store
        .create_user(&User {
            id: "admin-1".to_string(),
            name: "Administrator".to_string(),
            email: Some(ADMIN_EMAIL.to_string()),
            register_number: None,
            role: Role::Admin,
            cohort: None,
            password: hash_password(ADMIN_PASSWORD).unwrap(),
        })
        .await
        .unwrap();

    let state = AppState::new(store, Config::for_tests(), Arc::new(DisabledGenerator));
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.expect("Failed to execute request")
    }

    async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.expect("Failed to execute request")
    }

    async fn login(&self, key: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                None,
                json!({ "registerNumber": key, "password": password }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn register_student(&self, register_number: &str, cohort: &str) -> String {
        let response = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "name": format!("Student {}", register_number),
                    "registerNumber": register_number,
                    "password": "password123",
                    "cohort": cohort
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        self.login(register_number, "password123").await
    }

    /// Creates a three-question quiz and returns it with a question-id -> correct-index map.
    async fn create_quiz(&self, admin: &str, cohort: &str, max_attempts: u32) -> (Value, HashMap<String, u64>) {
        let response = self
            .post(
                "/api/quizzes",
                Some(admin),
                json!({
                    "title": "Computer Networks",
                    "description": "OSI layers",
                    "cohort": cohort,
                    "durationMinutes": 10,
                    "maxAttempts": max_attempts,
                    "questions": [
                        { "text": "Layer of IP?", "options": ["1", "2", "3", "4"], "correctAnswer": 2 },
                        { "text": "Layer of TCP?", "options": ["2", "3", "4", "5"], "correctAnswer": 2 },
                        { "text": "Layer of HTTP?", "options": ["4", "5", "6", "7"], "correctAnswer": 3 }
                    ]
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let quiz: Value = response.json().await.unwrap();
        let key = quiz["questions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| {
                (
                    q["id"].as_str().unwrap().to_string(),
                    q["correctAnswer"].as_u64().unwrap(),
                )
            })
            .collect();
        (quiz, key)
    }
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;

    let response = app.get("/random_path_that_does_not_exist", None).await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works_and_is_always_student() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "name": "Asha",
                "registerNumber": "22CS001",
                "password": "password123",
                "cohort": "2nd Year",
                "role": "ADMIN"
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Registration successful");
    assert!(body["id"].is_string());

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "registerNumber": "22CS001", "password": "password123" }),
        )
        .await;
    let profile: Value = login.json().await.unwrap();
    assert_eq!(profile["role"], "STUDENT");
    assert_eq!(profile["cohort"], "2nd Year");
    assert!(profile.get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    // Register number with illegal characters
    let bad_number = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "X", "registerNumber": "!!", "password": "password123", "cohort": "1st Year" }),
        )
        .await;
    assert_eq!(bad_number.status().as_u16(), 400);

    // Students must carry a class
    let no_cohort = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "X", "registerNumber": "22CS002", "password": "password123" }),
        )
        .await;
    assert_eq!(no_cohort.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_register_number_conflicts() {
    let app = spawn_app().await;
    app.register_student("22CS003", "1st Year").await;

    let response = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "Dup", "registerNumber": "22CS003", "password": "password123", "cohort": "1st Year" }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = spawn_app().await;
    app.register_student("22CS004", "1st Year").await;

    let response = app
        .post(
            "/api/auth/login",
            None,
            json!({ "registerNumber": "22CS004", "password": "nope-nope" }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_require_token_and_role() {
    let app = spawn_app().await;
    let student = app.register_student("22CS005", "1st Year").await;

    assert_eq!(app.get("/api/quizzes", None).await.status().as_u16(), 401);
    assert_eq!(
        app.get("/api/quizzes", Some("garbage")).await.status().as_u16(),
        401
    );
    assert_eq!(
        app.get("/api/admin/users", Some(&student)).await.status().as_u16(),
        403
    );
    assert_eq!(
        app.post("/api/quizzes", Some(&student), json!({})).await.status().as_u16(),
        403
    );
}

#[tokio::test]
async fn students_only_see_their_cohort_without_answers() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_quiz(&admin, "2nd Year", 2).await;
    app.create_quiz(&admin, "3rd Year", 2).await;
    let student = app.register_student("22CS006", "2nd Year").await;

    let response = app.get("/api/quizzes", Some(&student)).await;
    assert_eq!(response.status().as_u16(), 200);
    let quizzes: Vec<Value> = response.json().await.unwrap();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0]["cohort"], "2nd Year");
    assert_eq!(quizzes[0]["attemptsLeft"], 2);
    assert!(quizzes[0]["questions"][0].get("correctAnswer").is_none());

    let other = app.get("/api/quizzes?cohort=3rd%20Year", Some(&student)).await;
    assert_eq!(other.status().as_u16(), 403);

    let all: Vec<Value> = app
        .get("/api/quizzes", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn full_session_flow_scores_and_reports() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (quiz, key) = app.create_quiz(&admin, "2nd Year", 2).await;
    let student = app.register_student("22CS007", "2nd Year").await;

    let started = app
        .post(
            "/api/sessions",
            Some(&student),
            json!({ "quizId": quiz["id"] }),
        )
        .await;
    assert_eq!(started.status().as_u16(), 201);
    let mut view: Value = started.json().await.unwrap();
    let session_id = view["sessionId"].as_str().unwrap().to_string();
    assert_eq!(view["phase"], "ACTIVE");
    assert_eq!(view["timeRemaining"], 600);
    assert_eq!(view["totalQuestions"], 3);
    assert_eq!(view["answered"], 0);

    // Cannot move on before answering
    let gated = app
        .post(&format!("/api/sessions/{}/advance", session_id), Some(&student), json!({}))
        .await;
    assert_eq!(gated.status().as_u16(), 409);

    // Answer the first two correctly, the last one wrongly
    for i in 0..3 {
        let qid = view["currentQuestion"]["id"].as_str().unwrap().to_string();
        let correct = key[&qid];
        let option = if i < 2 { correct } else { (correct + 1) % 4 };
        let answered = app
            .post(
                &format!("/api/sessions/{}/answer", session_id),
                Some(&student),
                json!({ "questionId": qid, "optionIndex": option }),
            )
            .await;
        assert_eq!(answered.status().as_u16(), 200);

        if i < 2 {
            let advanced = app
                .post(&format!("/api/sessions/{}/advance", session_id), Some(&student), json!({}))
                .await;
            assert_eq!(advanced.status().as_u16(), 200);
            view = advanced.json().await.unwrap();
        }
    }

    // Advancing past the last question is refused
    let past_end = app
        .post(&format!("/api/sessions/{}/advance", session_id), Some(&student), json!({}))
        .await;
    assert_eq!(past_end.status().as_u16(), 409);

    let submitted = app
        .post(&format!("/api/sessions/{}/submit", session_id), Some(&student), json!({}))
        .await;
    assert_eq!(submitted.status().as_u16(), 200);
    let done: Value = submitted.json().await.unwrap();
    assert_eq!(done["phase"], "COMPLETED");
    assert_eq!(done["attempt"]["score"], 2);
    assert_eq!(done["attempt"]["totalQuestions"], 3);
    assert_eq!(done["persistence"]["status"], "SAVED");
    assert_eq!(done["answered"], 3);

    // Second submit is a state conflict
    let again = app
        .post(&format!("/api/sessions/{}/submit", session_id), Some(&student), json!({}))
        .await;
    assert_eq!(again.status().as_u16(), 409);

    let attempts: Vec<Value> = app
        .get("/api/attempts", Some(&student))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["userName"], "Student 22CS007");

    let listed: Vec<Value> = app
        .get("/api/quizzes", Some(&student))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["attemptsLeft"], 1);

    let report: Vec<Value> = app
        .get("/api/admin/reports?cohort=2nd%20Year", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0]["registerNumber"], "22CS007");
    assert_eq!(report[0]["quizTitle"], "Computer Networks");
    assert_eq!(report[0]["scoreFraction"], "2 / 3");

    let empty: Vec<Value> = app
        .get("/api/admin/reports?cohort=1st%20Year", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn aborted_session_records_nothing() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (quiz, _) = app.create_quiz(&admin, "2nd Year", 1).await;
    let student = app.register_student("22CS008", "2nd Year").await;

    let view: Value = app
        .post("/api/sessions", Some(&student), json!({ "quizId": quiz["id"] }))
        .await
        .json()
        .await
        .unwrap();
    let session_id = view["sessionId"].as_str().unwrap();

    let aborted = app
        .post(&format!("/api/sessions/{}/abort", session_id), Some(&student), json!({}))
        .await;
    assert_eq!(aborted.status().as_u16(), 200);

    let gone = app
        .get(&format!("/api/sessions/{}", session_id), Some(&student))
        .await;
    assert_eq!(gone.status().as_u16(), 404);

    let attempts: Vec<Value> = app
        .get("/api/attempts", Some(&student))
        .await
        .json()
        .await
        .unwrap();
    assert!(attempts.is_empty());

    // The aborted run did not use up the single attempt
    let restarted = app
        .post("/api/sessions", Some(&student), json!({ "quizId": quiz["id"] }))
        .await;
    assert_eq!(restarted.status().as_u16(), 201);
}

#[tokio::test]
async fn sessions_are_private_and_limited() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (quiz, _) = app.create_quiz(&admin, "2nd Year", 1).await;
    let owner = app.register_student("22CS009", "2nd Year").await;
    let intruder = app.register_student("22CS010", "2nd Year").await;
    let outsider = app.register_student("21CS011", "3rd Year").await;

    let view: Value = app
        .post("/api/sessions", Some(&owner), json!({ "quizId": quiz["id"] }))
        .await
        .json()
        .await
        .unwrap();
    let session_id = view["sessionId"].as_str().unwrap();

    let peek = app
        .get(&format!("/api/sessions/{}", session_id), Some(&intruder))
        .await;
    assert_eq!(peek.status().as_u16(), 403);

    let wrong_class = app
        .post("/api/sessions", Some(&outsider), json!({ "quizId": quiz["id"] }))
        .await;
    assert_eq!(wrong_class.status().as_u16(), 403);

    // One attempt allowed and one is already running
    let second = app
        .post("/api/sessions", Some(&owner), json!({ "quizId": quiz["id"] }))
        .await;
    assert_eq!(second.status().as_u16(), 409);

    let unknown = app
        .post("/api/sessions", Some(&owner), json!({ "quizId": "no-such-quiz" }))
        .await;
    assert_eq!(unknown.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_manages_users_and_exports() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let created = app
        .post(
            "/api/admin/users",
            Some(&admin),
            json!({
                "name": "Second Admin",
                "registerNumber": "STAFF01",
                "password": "password123",
                "email": "Staff@College.edu",
                "role": "ADMIN"
            }),
        )
        .await;
    assert_eq!(created.status().as_u16(), 201);
    let user: Value = created.json().await.unwrap();
    assert_eq!(user["role"], "ADMIN");

    // Email login is case-insensitive
    app.login("staff@college.edu", "password123").await;

    let users: Vec<Value> = app
        .get("/api/admin/users", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 2);

    let history = app
        .get(
            &format!("/api/admin/users/{}/attempts", user["id"].as_str().unwrap()),
            Some(&admin),
        )
        .await;
    assert_eq!(history.status().as_u16(), 200);

    let missing = app
        .get("/api/admin/users/nobody/attempts", Some(&admin))
        .await;
    assert_eq!(missing.status().as_u16(), 404);

    let export = app
        .get("/api/admin/reports/export?cohort=All", Some(&admin))
        .await;
    assert_eq!(export.status().as_u16(), 200);
    assert_eq!(
        export.headers()["content-type"],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert!(
        export.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("quiz_results_all_")
    );
    let bytes = export.bytes().await.unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn quiz_authoring_rules() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    // Correct answer out of range
    let invalid = app
        .post(
            "/api/quizzes",
            Some(&admin),
            json!({
                "title": "Broken",
                "cohort": "1st Year",
                "durationMinutes": 5,
                "maxAttempts": 1,
                "questions": [{ "text": "Q", "options": ["a", "b"], "correctAnswer": 2 }]
            }),
        )
        .await;
    assert_eq!(invalid.status().as_u16(), 400);

    // Markup-like text is stored exactly as written
    let verbatim = app
        .post(
            "/api/quizzes",
            Some(&admin),
            json!({
                "title": "Rust <basics>",
                "description": "Types & traits",
                "cohort": "1st Year",
                "durationMinutes": 5,
                "maxAttempts": 1,
                "questions": [{
                    "text": "Which holds raw bytes: Vec<u8> or String?",
                    "options": ["Vec<u8>", "String", "3 < 5 && 5 > 3"],
                    "correctAnswer": 0
                }]
            }),
        )
        .await;
    assert_eq!(verbatim.status().as_u16(), 201);
    let verbatim: Value = verbatim.json().await.unwrap();
    assert_eq!(verbatim["title"], "Rust <basics>");
    assert_eq!(verbatim["description"], "Types & traits");
    assert_eq!(verbatim["questions"][0]["text"], "Which holds raw bytes: Vec<u8> or String?");
    assert_eq!(verbatim["questions"][0]["options"][0], "Vec<u8>");
    assert_eq!(verbatim["questions"][0]["options"][2], "3 < 5 && 5 > 3");

    // Repeated options are rejected
    let repeated = app
        .post(
            "/api/quizzes",
            Some(&admin),
            json!({
                "title": "Repeats",
                "cohort": "1st Year",
                "durationMinutes": 5,
                "maxAttempts": 1,
                "questions": [{ "text": "Q", "options": ["a", "a"], "correctAnswer": 0 }]
            }),
        )
        .await;
    assert_eq!(repeated.status().as_u16(), 400);

    let generated = app
        .post(
            "/api/quizzes/generate",
            Some(&admin),
            json!({
                "title": "Graphs",
                "description": "BFS",
                "cohort": "1st Year",
                "durationMinutes": 5,
                "maxAttempts": 1,
                "count": 5
            }),
        )
        .await;
    assert_eq!(generated.status().as_u16(), 503);

    let (quiz, _) = app.create_quiz(&admin, "1st Year", 1).await;
    let path = format!("/api/quizzes/{}", quiz["id"].as_str().unwrap());
    let deleted = app.client.delete(app.url(&path)).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(deleted.status().as_u16(), 204);
    let again = app.client.delete(app.url(&path)).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(again.status().as_u16(), 404);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = spawn_app().await;

    let response = app.get("/api/openapi.json", None).await;
    assert_eq!(response.status().as_u16(), 200);
    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"].get("/api/sessions/{id}/submit").is_some());
}
