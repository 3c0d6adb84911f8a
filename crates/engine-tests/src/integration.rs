#[cfg(test)]
mod tests {
    use crate::{
        email,
        utils::{Handler, TestService},
        write_input,
    };
    use engine_config::{Settings, ValidatedSettings};
    use engine_runtime::{
        error::ExecutorError,
        execution::{executor::run, report::BatchDisposition},
    };
    use model::core::identifiers::BatchId;
    use serde_json::{Value, json};
    use std::{path::Path, sync::Arc};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    fn settings(root: &Path, state: &str, steps: Value) -> ValidatedSettings {
        let raw = json!({
            "index_name": "email",
            "batch_size": 3,
            "concurrency": 2,
            "input": root.join("input.csv"),
            "batch_dir": root.join("batches"),
            "state_dir": root.join(state),
            "steps": steps,
        });
        Settings::from_json(&raw.to_string())
            .unwrap()
            .validate()
            .unwrap()
    }

    fn signup_only(service: &TestService) -> Value {
        json!([{ "name": "signup", "url": format!("{}/users", service.base_url) }])
    }

    /// Signup answers 409 for record 5 (account already exists); activation
    /// is unavailable for record 7 and requires a user id for new accounts.
    fn identity_service() -> Handler {
        Arc::new(|method: &str, path: &str, body: &Value| {
            let record = body["email"].as_str().unwrap_or_default().to_string();
            match (method, path) {
                ("POST", "/users") if record == email(5) => (409, r#"{"error":"exists"}"#.into()),
                ("POST", "/users") => (201, json!({ "user_id": format!("u-{record}") }).to_string()),
                ("PUT", p) if p == format!("/users/{}/activate", email(7)) => (503, String::new()),
                ("PUT", _) if body["user_id"].is_null() && record != email(5) => {
                    (400, r#"{"error":"user_id required"}"#.into())
                }
                ("PUT", _) => (200, r#"{"active":true}"#.into()),
                _ => (404, String::new()),
            }
        })
    }

    #[traced_test]
    #[tokio::test]
    async fn http_pipeline_isolates_unavailable_record() {
        let dir = tempdir().unwrap();
        write_input(&dir.path().join("input.csv"), 10);
        let service = TestService::spawn(identity_service()).await;

        let steps = json!([
            { "name": "signup", "url": format!("{}/users", service.base_url) },
            {
                "name": "activate",
                "url": format!("{}/users/{{record_id}}/activate", service.base_url),
                "method": "PUT",
                "retry": { "max_attempts": 2, "base_delay_ms": 1, "max_delay_ms": 5 }
            }
        ]);
        let settings = settings(dir.path(), "state", steps);

        let report = run(&settings, false, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 4);
        for n in [0, 1, 3] {
            assert_eq!(
                report.outcome(&BatchId::from_index(n)),
                Some(&BatchDisposition::Success)
            );
        }
        match report.outcome(&BatchId::from_index(2)) {
            Some(BatchDisposition::Failed {
                failed_records,
                cause,
            }) => {
                assert_eq!(failed_records, &vec![email(7)]);
                assert!(cause.contains("503"));
            }
            other => panic!("batch_2 should have failed, got {other:?}"),
        }

        assert_eq!(service.hit_count("POST /users"), 10);
        assert_eq!(
            service.hit_count(&format!("PUT /users/{}/activate", email(7))),
            2
        );
        assert_eq!(
            service.hit_count(&format!("PUT /users/{}/activate", email(5))),
            1
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["batch_id"], "batch_0");
        assert_eq!(json["outcomes"][0]["outcome"], "success");
        assert_eq!(json["outcomes"][2]["outcome"], "failed");
        assert_eq!(json["metrics"]["batches_failed"], 1);
    }

    #[traced_test]
    #[tokio::test]
    async fn changed_input_is_refused_until_rechunked() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.csv");
        write_input(&input, 10);
        let service = TestService::spawn(Arc::new(|_: &str, _: &str, _: &Value| {
            (201, String::new())
        }))
        .await;
        let steps = signup_only(&service);

        let first = run(
            &settings(dir.path(), "state-1", steps.clone()),
            false,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(first.outcomes.len(), 4);

        write_input(&input, 5);
        let err = run(
            &settings(dir.path(), "state-2", steps.clone()),
            false,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecutorError::DatasetChanged { .. }));

        let rechunked = run(
            &settings(dir.path(), "state-3", steps),
            true,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(rechunked.outcomes.len(), 2);
        assert!(!rechunked.has_failures());
        assert_eq!(service.hit_count("POST /users"), 15);
    }

    #[traced_test]
    #[tokio::test]
    async fn input_without_identifiers_is_rejected_before_chunking() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("input.csv"),
            "email,name\nuser1@x.io,User 1\n,User 2\n",
        )
        .unwrap();

        let steps = json!([{ "name": "signup", "url": "http://127.0.0.1:9/users" }]);
        let err = run(
            &settings(dir.path(), "state", steps),
            false,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExecutorError::Chunk(_)));
        assert!(!dir.path().join("batches").join("batch_0.csv").exists());
    }
}
