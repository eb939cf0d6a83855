mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{id_of, Account, TestApp};
use siga_api::config::CompletionPolicy;
use siga_api::types::Role;

async fn enroll(app: &TestApp, student: &Account, course: Uuid) -> (StatusCode, serde_json::Value) {
    app.post("/api/enrollments", &student.token, json!({ "courseId": course }))
        .await
}

#[tokio::test]
async fn prerequisite_scenario() {
    let app = TestApp::new();
    let admin = app.account("admin", Role::Admin).await;
    let teacher = app.account("prof", Role::Teacher).await;
    let ana = app.account("ana", Role::Student).await;
    let a = app.course(&admin, "Cálculo I").await;
    let b = app.course(&admin, "Cálculo II").await;
    app.require(&admin, b, a).await;
    app.post(
        &format!("/api/courses/{}/teachers", a),
        &admin.token,
        json!({ "teacherId": teacher.id }),
    )
    .await;

    let (status, body) = enroll(&app, &ana, b).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PREREQUISITES_NOT_MET");
    assert_eq!(body["missingPrerequisites"][0]["id"], a.to_string());

    let (status, body) = app.get(&format!("/api/courses/{}/eligibility", b), &ana.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ineligible");
    assert_eq!(body["data"]["missingPrerequisites"][0]["title"], "Cálculo I");

    let (status, body) = enroll(&app, &ana, a).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["grades"], json!([]));
    let first = id_of(&body["data"]);

    let (status, body) = app
        .put(
            &format!("/api/enrollments/{}/completion", first),
            &teacher.token,
            json!({ "completed": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], true);

    let (_, body) = app.get(&format!("/api/courses/{}/eligibility", b), &ana.token).await;
    assert_eq!(body["data"], json!({ "status": "eligible" }));

    let (status, _) = enroll(&app, &ana, b).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn double_enroll_keeps_one_record() {
    let app = TestApp::new();
    let admin = app.account("admin", Role::Admin).await;
    let ana = app.account("ana", Role::Student).await;
    let course = app.course(&admin, "Historia").await;

    assert_eq!(enroll(&app, &ana, course).await.0, StatusCode::CREATED);
    let (status, body) = enroll(&app, &ana, course).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ALREADY_ENROLLED");

    let (_, body) = app.get("/api/enrollments/me", &ana.token).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn concurrent_enrolls_yield_one_success() {
    let app = TestApp::new();
    let admin = app.account("admin", Role::Admin).await;
    let ana = app.account("ana", Role::Student).await;
    let course = app.course(&admin, "Lógica").await;

    let results = futures::future::join_all((0..6).map(|_| enroll(&app, &ana, course))).await;
    let created = results.iter().filter(|(s, _)| *s == StatusCode::CREATED).count();
    let rejected = results
        .iter()
        .filter(|(s, b)| *s == StatusCode::BAD_REQUEST && b["code"] == "ALREADY_ENROLLED")
        .count();
    assert_eq!(created, 1);
    assert_eq!(rejected, 5);
}

#[tokio::test]
async fn grading_is_limited_to_course_teachers() {
    let app = TestApp::new();
    let admin = app.account("admin", Role::Admin).await;
    let teacher = app.account("prof", Role::Teacher).await;
    let stranger = app.account("otro", Role::Teacher).await;
    let ana = app.account("ana", Role::Student).await;
    let course = app.course(&admin, "Álgebra").await;
    app.post(
        &format!("/api/courses/{}/teachers", course),
        &admin.token,
        json!({ "teacherId": teacher.id }),
    )
    .await;
    let (_, body) = enroll(&app, &ana, course).await;
    let enrollment = id_of(&body["data"]);
    let path = format!("/api/enrollments/{}/grades", enrollment);
    let grades = json!({ "grades": [
        { "name": "Parcial 1", "value": 70 },
        { "name": "Parcial 1", "value": 90 }
    ]});

    for token in [&stranger.token, &ana.token] {
        let (status, body) = app.put(&path, token, grades.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }
    let (_, body) = app.get("/api/enrollments/me", &ana.token).await;
    assert_eq!(body["data"][0]["grades"], json!([]));

    let (status, body) = app.put(&path, &teacher.token, grades).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["grades"][1]["value"], 90.0);

    let (status, body) = app
        .put(&path, &teacher.token, json!({ "grades": [{ "name": "", "value": 10 }] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .put(&format!("/api/enrollments/{}/grades", Uuid::new_v4()), &teacher.token, json!({ "grades": [] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unenroll_and_my_enrollments() {
    let app = TestApp::new();
    let admin = app.account("admin", Role::Admin).await;
    let teacher = app.account("prof", Role::Teacher).await;
    let ana = app.account("ana", Role::Student).await;
    let luis = app.account("luis", Role::Student).await;
    let course = app.course(&admin, "Economía").await;
    app.post(
        &format!("/api/courses/{}/teachers", course),
        &admin.token,
        json!({ "teacherId": teacher.id }),
    )
    .await;
    let (_, body) = enroll(&app, &ana, course).await;
    let enrollment = id_of(&body["data"]);
    enroll(&app, &luis, course).await;

    let (status, body) = app.get("/api/enrollments/me", &ana.token).await;
    assert_eq!(status, StatusCode::OK);
    let view = &body["data"][0];
    assert_eq!(view["courseId"], course.to_string());
    assert_eq!(view["course"]["title"], "Economía");
    assert_eq!(view["course"]["teachers"][0]["email"], "prof@siga.test");
    assert_eq!(view["classmates"].as_array().map(Vec::len), Some(1));
    assert_eq!(view["classmates"][0]["email"], "luis@siga.test");

    let path = format!("/api/enrollments/{}", enrollment);
    let (status, _) = app.delete(&path, &luis.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&path, &ana.token).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/enrollments/me", &ana.token).await;
    assert_eq!(body["data"], json!([]));

    let (status, _) = app.delete(&path, &ana.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn course_roster_visibility() {
    let app = TestApp::new();
    let admin = app.account("admin", Role::Admin).await;
    let teacher = app.account("prof", Role::Teacher).await;
    let other = app.account("otro", Role::Teacher).await;
    let ana = app.account("ana", Role::Student).await;
    let course = app.course(&admin, "Biología").await;
    app.post(
        &format!("/api/courses/{}/teachers", course),
        &admin.token,
        json!({ "teacherId": teacher.id }),
    )
    .await;
    enroll(&app, &ana, course).await;
    let path = format!("/api/enrollments/course/{}", course);

    let (status, body) = app.get(&path, &teacher.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["student"]["email"], "ana@siga.test");

    assert_eq!(app.get(&path, &admin.token).await.0, StatusCode::OK);
    assert_eq!(app.get(&path, &other.token).await.0, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&path, &ana.token).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_enrolls_named_student() {
    let app = TestApp::new();
    let admin = app.account("admin", Role::Admin).await;
    let ana = app.account("ana", Role::Student).await;
    let luis = app.account("luis", Role::Student).await;
    let course = app.course(&admin, "Arte").await;
    let path = format!("/api/courses/{}/students", course);

    let (status, _) = app.post(&path, &luis.token, json!({ "studentId": ana.id })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&path, &admin.token, json!({ "studentId": ana.id })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["studentId"], ana.id.to_string());

    let (status, _) = app
        .post(&path, &admin.token, json!({ "studentId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn eligible_courses_listing() {
    let app = TestApp::with_policy(CompletionPolicy::PassingGrade(60.0));
    let admin = app.account("admin", Role::Admin).await;
    let teacher = app.account("prof", Role::Teacher).await;
    let ana = app.account("ana", Role::Student).await;
    let luis = app.account("luis", Role::Student).await;
    let a = app.course(&admin, "A").await;
    let b = app.course(&admin, "B").await;
    app.require(&admin, b, a).await;

    let path = format!("/api/students/{}/eligible-courses", ana.id);
    let (status, body) = app.get(&path, &ana.token).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["data"].as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(ids, vec![a]);

    assert_eq!(app.get(&path, &luis.token).await.0, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&path, &teacher.token).await.0, StatusCode::OK);

    // a passing average counts as completion under the grade policy
    let (_, body) = enroll(&app, &ana, a).await;
    let enrollment = id_of(&body["data"]);
    app.put(
        &format!("/api/enrollments/{}/grades", enrollment),
        &admin.token,
        json!({ "grades": [{ "name": "Final", "value": 80 }] }),
    )
    .await;

    let (_, body) = app.get(&path, &ana.token).await;
    let ids: Vec<_> = body["data"].as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(ids, vec![a, b]);
}
