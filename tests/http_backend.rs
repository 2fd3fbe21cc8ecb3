use std::sync::Mutex;
use std::time::Duration;

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use attendance_desk::backend::http::HttpBackendProvider;
use attendance_desk::backend::{AttendanceService, BackendError, BackendProvider, StudentDirectory};
use attendance_desk::model::attendance::{AttendanceBatch, AttendanceStatus, BatchContext, BatchItem};
use attendance_desk::model::student::RosterKey;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

const TOKEN: &str = "upstream-token";

type Recorded = web::Data<Mutex<Vec<Value>>>;

fn authorized(req: &HttpRequest) -> bool {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        == Some(TOKEN)
}

#[derive(Deserialize)]
struct ListQuery {
    class_name: String,
    division: String,
    limit: u32,
}

async fn list_students(req: HttpRequest, query: web::Query<ListQuery>) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().body("bad token");
    }
    if query.limit != 100 {
        return HttpResponse::BadRequest().body("unexpected limit");
    }
    if query.class_name == "TY-CS" {
        let page: Vec<Value> = (1..=100)
            .map(|roll| json!({ "student_id": format!("T{roll:03}"), "name": "Student", "class_name": "TY-CS", "roll_no": roll }))
            .collect();
        return HttpResponse::Ok().json(page);
    }
    HttpResponse::Ok().json(json!([
        { "student_id": "S2", "name": "Vivaan Sharma", "class_name": query.class_name, "division": query.division, "roll_no": 2 },
        { "student_id": "S1", "name": "Aarav Patel", "class_name": query.class_name, "division": query.division, "roll_no": 1 }
    ]))
}

async fn seed_class(req: HttpRequest, body: web::Json<Value>, recorded: Recorded) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    recorded.lock().unwrap().push(body.0.clone());
    HttpResponse::Ok().json(json!([
        { "student_id": "N1", "name": "Ishaan Rao", "class_name": body["class_name"], "division": body["division"], "roll_no": 1 }
    ]))
}

async fn bulk(req: HttpRequest, body: web::Json<Value>, recorded: Recorded) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    if body["subject"] == "Chemistry" {
        return HttpResponse::InternalServerError().body("db down");
    }
    recorded.lock().unwrap().push(body.into_inner());
    HttpResponse::Ok().json(json!({ "created": 1 }))
}

fn batch(subject: &str) -> AttendanceBatch {
    AttendanceBatch {
        context: BatchContext {
            class_name: "FY-IT".into(),
            division: "B".into(),
            subject: subject.into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        },
        items: vec![
            BatchItem {
                student_id: "S1".into(),
                status: AttendanceStatus::Absent,
            },
            BatchItem {
                student_id: "S2".into(),
                status: AttendanceStatus::Present,
            },
        ],
    }
}

#[actix_web::test]
async fn speaks_the_upstream_protocol() {
    let recorded: Recorded = web::Data::new(Mutex::new(Vec::new()));
    let shared = recorded.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(shared.clone())
            .route("/students/", web::get().to(list_students))
            .route("/students/seed-class", web::post().to(seed_class))
            .route("/attendance/bulk", web::post().to(bulk))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let provider =
        HttpBackendProvider::new(&format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
    let backend = provider.connect(TOKEN);
    let key = RosterKey::new("FY-IT", "B");

    let students = backend.list_students(&key).await.unwrap();
    assert_eq!(students.len(), 2);
    assert_eq!(students[0].student_id, "S2");
    assert_eq!(students[1].roll_number, 1);
    assert!(students.iter().all(|s| s.belongs_to(&key)));

    let seeded = backend.seed_class(&key).await.unwrap();
    assert_eq!(seeded.len(), 1);

    backend.submit_batch(&batch("Physics")).await.unwrap();

    let failed = backend.submit_batch(&batch("Chemistry")).await.unwrap_err();
    assert!(matches!(
        failed,
        BackendError::Status { status: 500, ref body } if body == "db down"
    ));

    let full = RosterKey::new("TY-CS", "A");
    let page = backend.list_students(&full).await.unwrap();
    assert_eq!(page.len(), 100);
    assert!(page.iter().all(|s| s.belongs_to(&full)));

    let denied = provider.connect("stale").list_students(&key).await.unwrap_err();
    assert!(matches!(denied, BackendError::Status { status: 401, .. }));

    let recorded = recorded.lock().unwrap().clone();
    assert_eq!(recorded[0], json!({ "class_name": "FY-IT", "division": "B" }));
    assert_eq!(
        recorded[1],
        json!({
            "class_name": "FY-IT",
            "division": "B",
            "subject": "Physics",
            "date": "2026-10-16",
            "items": [
                { "student_id": "S1", "status": "A" },
                { "student_id": "S2", "status": "P" }
            ]
        })
    );

    handle.stop(true).await;
}

#[actix_web::test]
async fn unreachable_backend_is_a_transport_error() {
    let provider =
        HttpBackendProvider::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = provider
        .connect(TOKEN)
        .list_students(&RosterKey::new("10th", "A"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}
