mod support;

use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use support::{pdf_bytes, TestApp};

fn apply_form(email: &str, job_id: &str, pdf: Vec<u8>) -> Form {
    let meta = json!({ "email": email, "jobId": job_id }).to_string();
    Form::new()
        .part(
            "resume",
            Part::text(meta).mime_str("application/json").unwrap(),
        )
        .part(
            "pdfFile",
            Part::bytes(pdf)
                .file_name("cv.pdf")
                .mime_str("application/pdf")
                .unwrap(),
        )
}

#[tokio::test]
async fn candidate_applies_and_recruiter_is_notified() {
    let app = TestApp::spawn().await;
    let company = app.company("Acme").await;
    let job = app.open_job("Rust Developer", Some(company.id)).await;
    app.recruiter("hr@acme.test", company.id).await;
    app.register("An", "an@example.com", false).await;
    let (candidate, _) = app.login("an@example.com").await;

    let response = app
        .client
        .post(app.url("/resumes"))
        .bearer_auth(&candidate)
        .multipart(apply_form("an@example.com", &job.id.to_string(), pdf_bytes()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let resume: Value = response.json().await.unwrap();
    assert_eq!(resume["status"], "PENDING");
    assert_eq!(app.files.keys().await.len(), 1);

    let own: Value = app
        .client
        .get(app.url("/resumes/me"))
        .bearer_auth(&candidate)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["totalElements"], 1);

    let (recruiter, _) = app.login("hr@acme.test").await;
    let unread: Value = app
        .client
        .get(app.url("/notifications/unread-count"))
        .bearer_auth(&recruiter)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unread["count"], 1);

    let company_resumes: Value = app
        .client
        .get(app.url("/resumes/company"))
        .bearer_auth(&recruiter)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(company_resumes["content"][0]["id"], resume["id"]);
}

#[tokio::test]
async fn second_application_to_the_same_job_conflicts() {
    let app = TestApp::spawn().await;
    let job = app.open_job("Rust Developer", None).await;
    app.register("An", "an@example.com", false).await;
    let (candidate, _) = app.login("an@example.com").await;

    for expected in [201, 409] {
        let response = app
            .client
            .post(app.url("/resumes"))
            .bearer_auth(&candidate)
            .multipart(apply_form("an@example.com", &job.id.to_string(), pdf_bytes()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn non_pdf_upload_is_rejected() {
    let app = TestApp::spawn().await;
    let job = app.open_job("Rust Developer", None).await;
    app.register("An", "an@example.com", false).await;
    let (candidate, _) = app.login("an@example.com").await;

    let response = app
        .client
        .post(app.url("/resumes"))
        .bearer_auth(&candidate)
        .multipart(apply_form(
            "an@example.com",
            &job.id.to_string(),
            b"plain text".to_vec(),
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(app.files.keys().await.is_empty());
}

#[tokio::test]
async fn missing_file_part_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let job = app.open_job("Rust Developer", None).await;
    app.register("An", "an@example.com", false).await;
    let (candidate, _) = app.login("an@example.com").await;

    let meta = json!({ "email": "an@example.com", "jobId": job.id }).to_string();
    let response = app
        .client
        .post(app.url("/resumes"))
        .bearer_auth(&candidate)
        .multipart(Form::new().text("resume", meta))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
