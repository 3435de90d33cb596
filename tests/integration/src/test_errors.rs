//! Error response integration tests.

#[cfg(test)]
mod tests {
    use crate::{finalize, http_client, send_chunk, test_upload_id, upload_url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_upload_id_with_path_separator() {
        let client = http_client();
        let resp = send_chunk(&client, "../escape", 0, 1, b"x").await;

        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["code"], "InvalidUploadId");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_chunk_index_out_of_range() {
        let client = http_client();
        let upload_id = test_upload_id("range");

        let resp = send_chunk(&client, &upload_id, 3, 3, b"x").await;
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["code"], "ChunkIndexOutOfRange");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_conflicting_total_chunks() {
        let client = http_client();
        let upload_id = test_upload_id("pin");

        send_chunk(&client, &upload_id, 0, 3, b"A").await;
        let resp = send_chunk(&client, &upload_id, 1, 4, b"B").await;
        assert_eq!(resp.status, 409);
        assert_eq!(resp.body["code"], "TotalChunksMismatch");

        let resp = finalize(&client, &upload_id, 4, "x.bin", "application/octet-stream").await;
        assert_eq!(resp.status, 409);
        assert!(resp.body["files"][0]["error"].is_string());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_finalize_of_unknown_session() {
        let client = http_client();
        let upload_id = test_upload_id("unknown");

        let resp = finalize(&client, &upload_id, 1, "x.bin", "application/octet-stream").await;
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body["files"][0]["error"], "Upload session not found");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_non_form_bodies() {
        let client = http_client();
        let resp = client
            .post(upload_url(None))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .unwrap_or_else(|e| panic!("request failed: {e}"));

        assert_eq!(resp.status(), 415);
        let body: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(body["code"], "UnsupportedMediaType");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unknown_routes() {
        let client = http_client();
        let resp = client
            .get(format!("{}/nested/path", upload_url(Some("a"))))
            .send()
            .await
            .unwrap_or_else(|e| panic!("request failed: {e}"));

        assert_eq!(resp.status(), 404);
    }
}
