//! Chunked upload integration tests.

#[cfg(test)]
mod tests {
    use crate::{fetch_media, finalize, http_client, send_chunk, session_status, test_upload_id};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_assemble_chunks_sent_out_of_order() {
        let client = http_client();
        let upload_id = test_upload_id("order");

        for (index, data) in [(1, b"B"), (0, b"A"), (2, b"C")] {
            let resp = send_chunk(&client, &upload_id, index, 3, data).await;
            assert_eq!(resp.status, 200, "{}", resp.body);
            assert_eq!(resp.body["success"], true);
        }

        let resp = finalize(&client, &upload_id, 3, "abc.txt", "text/plain").await;
        assert_eq!(resp.status, 200, "{}", resp.body);
        let record = &resp.body["files"][0];
        assert_eq!(record["name"], "abc.txt");
        assert_eq!(record["size"], 3);
        assert_eq!(record["type"], "text/plain");

        let url = record["url"].as_str().expect("url");
        if let Some(bytes) = fetch_media(&client, url).await {
            assert_eq!(bytes, b"ABC");
        }

        let resp = session_status(&client, &upload_id).await;
        assert_eq!(resp.status, 404, "session should be gone after finalize");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_track_progress_per_chunk() {
        let client = http_client();
        let upload_id = test_upload_id("progress");

        let resp = send_chunk(&client, &upload_id, 0, 2, b"hello ").await;
        assert_eq!(resp.body["uploadedChunks"], 1);
        assert_eq!(resp.body["receivedBytes"], 6);

        // Re-sending a chunk replaces it rather than adding to the count.
        let resp = send_chunk(&client, &upload_id, 0, 2, b"HELLO ").await;
        assert_eq!(resp.body["uploadedChunks"], 1);

        let resp = send_chunk(&client, &upload_id, 1, 2, b"world").await;
        assert_eq!(resp.body["uploadedChunks"], 2);
        assert_eq!(resp.body["receivedBytes"], 11);

        let resp = finalize(&client, &upload_id, 2, "greeting.txt", "text/plain").await;
        assert_eq!(resp.status, 200, "{}", resp.body);
        assert_eq!(resp.body["files"][0]["size"], 11);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_keep_session_when_a_chunk_is_missing() {
        let client = http_client();
        let upload_id = test_upload_id("gap");

        send_chunk(&client, &upload_id, 0, 3, b"A").await;
        send_chunk(&client, &upload_id, 2, 3, b"C").await;

        let resp = finalize(&client, &upload_id, 3, "gap.bin", "application/octet-stream").await;
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["files"][0]["name"], "gap.bin");
        assert_eq!(resp.body["files"][0]["error"], "Missing chunk 2 of 3");

        send_chunk(&client, &upload_id, 1, 3, b"B").await;
        let resp = finalize(&client, &upload_id, 3, "gap.bin", "application/octet-stream").await;
        assert_eq!(resp.status, 200, "{}", resp.body);
        assert_eq!(resp.body["files"][0]["size"], 3);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_let_only_one_concurrent_finalize_succeed() {
        let client = http_client();
        let upload_id = test_upload_id("race");

        send_chunk(&client, &upload_id, 0, 2, b"one").await;
        send_chunk(&client, &upload_id, 1, 2, b"two").await;

        let attempts = (0..4).map(|_| finalize(&client, &upload_id, 2, "race.txt", "text/plain"));
        let results = futures::future::join_all(attempts).await;

        let succeeded = results.iter().filter(|r| r.status == 200).count();
        assert_eq!(succeeded, 1);
        for resp in results.iter().filter(|r| r.status != 200) {
            assert_eq!(resp.status, 404);
            assert_eq!(resp.body["files"][0]["error"], "Upload session not found");
        }
    }
}
