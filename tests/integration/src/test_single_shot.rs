//! Single-shot upload integration tests.

#[cfg(test)]
mod tests {
    use crate::{http_client, send_files};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_store_every_file_in_request_order() {
        let client = http_client();
        let resp = send_files(
            &client,
            &[
                ("notes.txt", "text/plain", b"some notes"),
                ("pixel.png", "image/png", b"\x89PNG\r\n\x1a\n"),
                ("data.csv", "text/csv", b"a,b\n1,2\n"),
            ],
        )
        .await;

        assert_eq!(resp.status, 200, "{}", resp.body);
        let files = resp.body["files"].as_array().expect("files array");
        let names: Vec<_> = files.iter().map(|f| f["name"].as_str().unwrap_or_default()).collect();
        assert_eq!(names, ["notes.txt", "pixel.png", "data.csv"]);
        assert!(files.iter().all(|f| f.get("error").is_none()));
        assert_eq!(files[0]["size"], 10);
        assert_eq!(files[1]["type"], "image/png");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_strip_directories_from_file_names() {
        let client = http_client();
        let resp = send_files(&client, &[("../../etc/passwd", "text/plain", b"x")]).await;

        assert_eq!(resp.status, 200, "{}", resp.body);
        assert_eq!(resp.body["files"][0]["name"], "passwd");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_answer_empty_submission_with_empty_list() {
        let client = http_client();
        let resp = send_files(&client, &[]).await;

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["files"], serde_json::json!([]));
    }
}
