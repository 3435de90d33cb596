//! Session status and abort integration tests.

#[cfg(test)]
mod tests {
    use crate::{abort, health_url, http_client, send_chunk, session_status, test_upload_id};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_missing_chunks() {
        let client = http_client();
        let upload_id = test_upload_id("status");

        send_chunk(&client, &upload_id, 1, 4, b"BB").await;
        send_chunk(&client, &upload_id, 3, 4, b"DDDD").await;

        let resp = session_status(&client, &upload_id).await;
        assert_eq!(resp.status, 200, "{}", resp.body);
        assert_eq!(resp.body["uploadId"], upload_id.as_str());
        assert_eq!(resp.body["totalChunks"], 4);
        assert_eq!(resp.body["uploadedChunks"], 2);
        assert_eq!(resp.body["receivedBytes"], 6);
        assert_eq!(resp.body["missingChunks"], serde_json::json!([0, 2]));
        assert_eq!(resp.body["complete"], false);

        abort(&client, &upload_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_abort_idempotently() {
        let client = http_client();
        let upload_id = test_upload_id("abort");

        send_chunk(&client, &upload_id, 0, 2, b"A").await;

        let resp = abort(&client, &upload_id).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["removed"], true);

        let resp = abort(&client, &upload_id).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["removed"], false);

        let resp = session_status(&client, &upload_id).await;
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body["code"], "NoSuchUpload");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health_with_request_id() {
        let client = http_client();
        let resp = client
            .get(health_url())
            .send()
            .await
            .unwrap_or_else(|e| panic!("health request failed: {e}"));

        assert_eq!(resp.status(), 200);
        assert!(resp.headers().contains_key("x-request-id"));
        assert_eq!(
            resp.headers().get("server").and_then(|v| v.to_str().ok()),
            Some("MediaStack")
        );
        let body: serde_json::Value = resp.json().await.expect("health JSON");
        assert_eq!(body["status"], "running");
    }
}
