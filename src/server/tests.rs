//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::fs;
    use std::io::{self, Cursor};
    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::{Duration, Instant};

    use tempfile::TempDir;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
    use tokio::net::TcpStream;

    use crate::parser::HttpVersion;
    use crate::server::{error_response, ConnectionHandler, Error, HttpServer, ResourceError, ServerConfig, StatusCode};

    // Mock TcpStream for testing
    struct MockTcpStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
    }

    impl MockTcpStream {
        fn new(read_data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(read_data),
                write_data: Vec::new(),
            }
        }

        fn written_data(&self) -> &[u8] {
            &self.write_data
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = std::io::Read::read(&mut this.read_data, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// A parsed response as seen by a client.
    #[derive(Debug)]
    struct Reply {
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Reply {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        fn content_length(&self) -> usize {
            self.header("Content-Length").unwrap().parse().unwrap()
        }
    }

    fn find_head_end(bytes: &[u8]) -> Option<usize> {
        bytes.windows(4).position(|w| w == b"\r\n\r\n")
    }

    /// Split one response off the front of `bytes`.
    fn split_reply(bytes: &[u8], has_body: bool) -> (Reply, &[u8]) {
        let head_end = find_head_end(bytes).expect("incomplete response head");
        let head = std::str::from_utf8(&bytes[..head_end]).unwrap();
        let mut lines = head.split("\r\n");
        let status = lines.next().unwrap().split(' ').nth(1).unwrap().parse().unwrap();
        let headers: Vec<(String, String)> = lines
            .map(|line| {
                let (k, v) = line.split_once(": ").unwrap();
                (k.to_string(), v.to_string())
            })
            .collect();

        let mut reply = Reply {
            status,
            headers,
            body: Vec::new(),
        };
        let rest = &bytes[head_end + 4..];
        let len = if has_body { reply.content_length() } else { 0 };
        reply.body = rest[..len].to_vec();
        (reply, &rest[len..])
    }

    fn parse_reply(bytes: &[u8]) -> Reply {
        let (reply, rest) = split_reply(bytes, true);
        assert!(rest.is_empty(), "trailing bytes after response");
        reply
    }

    /// Read exactly one response from a live socket.
    async fn read_reply(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Reply {
        let mut chunk = [0u8; 8192];
        loop {
            if let Some(head_end) = find_head_end(buf) {
                let (probe, _) = split_reply(&buf[..head_end + 4], false);
                let total = head_end + 4 + probe.content_length();
                if buf.len() >= total {
                    let bytes: Vec<u8> = buf.drain(..total).collect();
                    return parse_reply(&bytes);
                }
            }
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "server closed the connection mid-response");
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    const HELLO: &[u8] = b"Hello, world!\n";

    /// Document root layout:
    ///
    /// ```text
    /// <tmp>/secret.txt          outside the root
    /// <tmp>/www/hello.txt
    /// <tmp>/www/big.bin         larger than the in-memory limit
    /// <tmp>/www/blob.weird
    /// <tmp>/www/docs/index.html
    /// <tmp>/www/empty/
    /// ```
    fn site() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("www");
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(tmp.path().join("secret.txt"), b"top secret").unwrap();
        fs::write(root.join("hello.txt"), HELLO).unwrap();
        fs::write(root.join("big.bin"), big_body()).unwrap();
        fs::write(root.join("blob.weird"), b"\x00\x01\x02").unwrap();
        fs::write(root.join("docs").join("index.html"), b"<h1>docs</h1>").unwrap();
        (tmp, root)
    }

    fn big_body() -> Vec<u8> {
        (0..200 * 1024u32).map(|i| (i % 251) as u8).collect()
    }

    fn config_for(root: &Path) -> ServerConfig {
        ServerConfig {
            bind_host: "127.0.0.1".to_string(),
            bind_port: 0,
            document_root: root.to_path_buf(),
            worker_count: 4,
            backlog: 64,
            max_request_line_bytes: 256,
            max_header_bytes: 512,
            idle_timeout: Duration::from_millis(300),
            in_memory_file_limit: 16 * 1024,
            ..ServerConfig::default()
        }
        .validate()
        .unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn exchange(config: ServerConfig, request: &[u8]) -> Vec<u8> {
        let handler = ConnectionHandler::from(config);
        let mut stream = MockTcpStream::new(request.to_vec());
        let result = handler.handle(&mut stream, peer()).await;
        assert!(result.is_ok(), "handler failed: {result:?}");
        stream.written_data().to_vec()
    }

    async fn get(root: &Path, request: &str) -> Reply {
        parse_reply(&exchange(config_for(root), request.as_bytes()).await)
    }

    #[tokio::test]
    async fn test_get_existing_file() {
        let (_tmp, root) = site();
        let reply = get(&root, "GET /hello.txt HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_length(), HELLO.len());
        assert_eq!(reply.body, HELLO);
        assert_eq!(reply.header("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(reply.header("Connection"), Some("close"));
        assert!(reply.header("Server").unwrap().starts_with("microstatic-rs/"));
        assert!(reply.header("Date").unwrap().ends_with(" GMT"));
        assert!(reply.header("Last-Modified").is_some());
    }

    #[tokio::test]
    async fn test_response_header_order() {
        let (_tmp, root) = site();
        let reply = get(&root, "GET /hello.txt HTTP/1.0\r\n\r\n").await;
        let names: Vec<&str> = reply.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["Server", "Date", "Content-Type", "Content-Length", "Last-Modified", "Connection"]
        );
    }

    #[tokio::test]
    async fn test_http10_response_uses_request_version() {
        let (_tmp, root) = site();
        let bytes = exchange(config_for(&root), b"GET /hello.txt HTTP/1.0\r\n\r\n").await;
        assert!(bytes.starts_with(b"HTTP/1.0 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_large_file_is_streamed_intact() {
        let (_tmp, root) = site();
        let reply = get(&root, "GET /big.bin HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_length(), big_body().len());
        assert_eq!(reply.body, big_body());
        assert_eq!(reply.header("Content-Type"), Some("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_head_matches_get_without_body() {
        let (_tmp, root) = site();
        for path in ["/hello.txt", "/big.bin", "/docs/", "/missing.txt"] {
            let get_bytes = exchange(config_for(&root), format!("GET {path} HTTP/1.0\r\n\r\n").as_bytes()).await;
            let head_bytes = exchange(config_for(&root), format!("HEAD {path} HTTP/1.0\r\n\r\n").as_bytes()).await;

            let get_reply = parse_reply(&get_bytes);
            let (head_reply, rest) = split_reply(&head_bytes, false);
            assert!(rest.is_empty(), "HEAD {path} sent a body");

            let without_date = |reply: &Reply| -> Vec<(String, String)> {
                reply.headers.iter().filter(|(k, _)| k != "Date").cloned().collect()
            };
            assert_eq!(get_reply.status, head_reply.status, "{path}");
            assert_eq!(without_date(&get_reply), without_date(&head_reply), "{path}");
        }
    }

    #[tokio::test]
    async fn test_path_traversal_is_forbidden() {
        let (tmp, root) = site();
        assert!(tmp.path().join("secret.txt").exists());

        for target in [
            "/../secret.txt",
            "/../../etc/passwd",
            "/docs/../../secret.txt",
            "/%2e%2e/secret.txt",
            "/docs%2f..%2f..%2fsecret.txt",
        ] {
            let reply = get(&root, &format!("GET {target} HTTP/1.0\r\n\r\n")).await;
            assert_eq!(reply.status, 403, "{target}");
            assert!(!reply.body.starts_with(b"top secret"));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_forbidden() {
        let (tmp, root) = site();
        std::os::unix::fs::symlink(tmp.path().join("secret.txt"), root.join("link.txt")).unwrap();
        let reply = get(&root, "GET /link.txt HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 403);
    }

    #[tokio::test]
    async fn test_dot_segments_inside_root_are_served() {
        let (_tmp, root) = site();
        let reply = get(&root, "GET /docs/./../hello.txt HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, HELLO);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let (_tmp, root) = site();
        for method in ["POST", "PUT", "DELETE", "OPTIONS", "BREW"] {
            let reply = get(&root, &format!("{method} /hello.txt HTTP/1.0\r\n\r\n")).await;
            assert_eq!(reply.status, 405, "{method}");
            assert_eq!(reply.header("Allow"), Some("GET, HEAD"));
        }
    }

    #[tokio::test]
    async fn test_post_body_is_consumed_before_405() {
        let (_tmp, root) = site();
        let request = b"POST /hello.txt HTTP/1.1\r\nHost: a\r\nContent-Length: 3\r\n\r\nabcGET /hello.txt HTTP/1.1\r\nHost: a\r\nConnection: close\r\n\r\n";
        let bytes = exchange(config_for(&root), request).await;
        let (first, rest) = split_reply(&bytes, true);
        assert_eq!(first.status, 405);
        let second = parse_reply(rest);
        assert_eq!(second.status, 200);
        assert_eq!(second.body, HELLO);
    }

    #[tokio::test]
    async fn test_request_line_too_long() {
        let (_tmp, root) = site();
        let path = "a".repeat(300);
        let reply = get(&root, &format!("GET /{path} HTTP/1.0\r\n\r\n")).await;
        assert_eq!(reply.status, 414);
        assert_eq!(reply.header("Connection"), Some("close"));
    }

    #[tokio::test]
    async fn test_header_section_too_large() {
        let (_tmp, root) = site();
        let cookie = "c".repeat(600);
        let reply = get(&root, &format!("GET / HTTP/1.1\r\nHost: a\r\nCookie: {cookie}\r\n\r\n")).await;
        assert_eq!(reply.status, 431);
    }

    #[tokio::test]
    async fn test_rejection_echoes_parsed_version() {
        let (_tmp, root) = site();
        let cookie = "c".repeat(600);
        let bytes = exchange(
            config_for(&root),
            format!("GET / HTTP/1.0\r\nCookie: {cookie}\r\n\r\n").as_bytes(),
        )
        .await;
        assert!(bytes.starts_with(b"HTTP/1.0 431 Request Header Fields Too Large\r\n"));

        let bytes = exchange(config_for(&root), b"GET / HTTP/1.0\r\nContent-Length: x\r\n\r\n").await;
        assert!(bytes.starts_with(b"HTTP/1.0 400 Bad Request\r\n"));

        // No version to echo when the request line itself is rejected.
        let path = "a".repeat(300);
        let bytes = exchange(config_for(&root), format!("GET /{path} HTTP/1.0\r\n\r\n").as_bytes()).await;
        assert!(bytes.starts_with(b"HTTP/1.1 414 URI Too Long\r\n"));
    }

    #[tokio::test]
    async fn test_malformed_requests() {
        let (_tmp, root) = site();
        for request in [
            "GARBAGE\r\n\r\n",
            "GET /hello.txt HTTP/2.0\r\n\r\n",
            "GET /hello.txt HTTP/1.1\r\n\r\n",
            "GET /a%00b HTTP/1.0\r\n\r\n",
            "GET /%zz HTTP/1.0\r\n\r\n",
        ] {
            let reply = get(&root, request).await;
            assert_eq!(reply.status, 400, "{request:?}");
            assert_eq!(reply.body, b"400 Bad Request\n");
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_tmp, root) = site();
        let reply = get(&root, "GET /nope.txt HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 404);
        let reply = get(&root, "GET /hello.txt/child HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 404);
    }

    /// Make `path` unreadable. Returns false when permissions are not
    /// enforced for this process (running as root), so the caller can skip.
    #[cfg(unix)]
    fn make_unreadable(path: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o000)).unwrap();
        fs::read_dir(path).is_err() && fs::read(path).is_err()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_is_forbidden() {
        let (_tmp, root) = site();
        let locked = root.join("locked.txt");
        fs::write(&locked, b"nope").unwrap();
        if !make_unreadable(&locked) {
            return;
        }
        let reply = get(&root, "GET /locked.txt HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 403);
        assert_eq!(reply.body, b"403 Forbidden\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unsearchable_directory_is_forbidden() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, root) = site();
        let private = root.join("private");
        fs::create_dir(&private).unwrap();
        fs::write(private.join("file.txt"), b"hidden").unwrap();
        if !make_unreadable(&private) {
            return;
        }
        let reply = get(&root, "GET /private/file.txt HTTP/1.0\r\n\r\n").await;
        // Restore access so the temporary directory can be removed.
        fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(reply.status, 403);
    }

    #[tokio::test]
    async fn test_io_failure_is_internal_error() {
        let (_tmp, root) = site();
        let config = config_for(&root);
        let err = ResourceError::from(io::Error::new(io::ErrorKind::Other, "read failed"));
        assert_eq!(err.status(), StatusCode::InternalServerError);

        let response = error_response(err.status(), &config);
        let reply = parse_reply(&response.to_bytes(HttpVersion::Http11));
        assert_eq!(reply.status, 500);
        assert_eq!(reply.body, b"500 Internal Server Error\n");
        assert_eq!(reply.header("Server"), Some(config.server_name.as_str()));
    }

    #[tokio::test]
    async fn test_directory_default_document() {
        let (_tmp, root) = site();

        let reply = get(&root, "GET /docs/ HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, b"<h1>docs</h1>");
        assert_eq!(reply.header("Content-Type"), Some("text/html; charset=utf-8"));

        let reply = get(&root, "GET /docs HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 200);

        let reply = get(&root, "GET /empty/ HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 404);

        // The root itself has no index.html.
        let reply = get(&root, "GET / HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 404);
    }

    #[tokio::test]
    async fn test_query_string_is_ignored() {
        let (_tmp, root) = site();
        let reply = get(&root, "GET /hello.txt?v=3 HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, HELLO);
    }

    #[tokio::test]
    async fn test_unknown_extension_is_octet_stream() {
        let (_tmp, root) = site();
        let reply = get(&root, "GET /blob.weird HTTP/1.0\r\n\r\n").await;
        assert_eq!(reply.header("Content-Type"), Some("application/octet-stream"));
        assert_eq!(reply.body, b"\x00\x01\x02");
    }

    #[tokio::test]
    async fn test_keep_alive_serves_several_requests() {
        let (_tmp, root) = site();
        let request = b"GET /hello.txt HTTP/1.1\r\nHost: a\r\n\r\nGET /docs/ HTTP/1.1\r\nHost: a\r\n\r\n";
        let bytes = exchange(config_for(&root), request).await;

        let (first, rest) = split_reply(&bytes, true);
        let (second, rest) = split_reply(rest, true);
        assert!(rest.is_empty());
        assert_eq!(first.body, HELLO);
        assert_eq!(first.header("Connection"), Some("keep-alive"));
        assert_eq!(second.body, b"<h1>docs</h1>");
    }

    #[tokio::test]
    async fn test_max_requests_per_connection() {
        let (_tmp, root) = site();
        let config = ServerConfig {
            max_requests_per_connection: 2,
            ..config_for(&root)
        };
        let request = "GET /hello.txt HTTP/1.1\r\nHost: a\r\n\r\n".repeat(3);
        let bytes = exchange(config, request.as_bytes()).await;

        let (first, rest) = split_reply(&bytes, true);
        let (second, rest) = split_reply(rest, true);
        assert!(rest.is_empty(), "third request must not be answered");
        assert_eq!(first.header("Connection"), Some("keep-alive"));
        assert_eq!(second.header("Connection"), Some("close"));
    }

    #[tokio::test]
    async fn test_client_closing_immediately_is_silent() {
        let (_tmp, root) = site();
        let bytes = exchange(config_for(&root), b"").await;
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_config_validation() {
        let (_tmp, root) = site();
        let zero_workers = ServerConfig {
            worker_count: 0,
            document_root: root.clone(),
            ..ServerConfig::default()
        };
        assert!(matches!(zero_workers.validate(), Err(Error::InvalidConfig(_))));

        let file_root = ServerConfig {
            document_root: root.join("hello.txt"),
            ..ServerConfig::default()
        };
        assert!(matches!(file_root.validate(), Err(Error::InvalidDocumentRoot { .. })));

        let missing_root = ServerConfig {
            document_root: root.join("nowhere"),
            ..ServerConfig::default()
        };
        assert!(matches!(missing_root.validate(), Err(Error::InvalidDocumentRoot { .. })));

        let config = config_for(&root.join("docs").join(".."));
        assert_eq!(config.document_root, fs::canonicalize(&root).unwrap());
    }

    #[tokio::test]
    async fn test_config_from_json_file() {
        let (tmp, root) = site();
        let path = tmp.path().join("config.json");
        let json = format!(
            r#"{{"bind_port": 9090, "worker_count": 2, "idle_timeout": 1.5, "document_root": {:?}}}"#,
            root.display().to_string()
        );
        fs::write(&path, json).unwrap();

        let config = ServerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.bind_port, 9090);
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.idle_timeout, Duration::from_millis(1500));
        assert_eq!(config.default_document, "index.html");

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ServerConfig::from_json_file(&path), Err(Error::ConfigFile(_))));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let (_tmp, root) = site();
        let first = HttpServer::bind(config_for(&root)).await.unwrap();
        let taken = first.local_addr().unwrap();

        // The port is still held by a listening socket.
        let second = HttpServer::bind(ServerConfig {
            bind_port: taken.port(),
            ..config_for(&root)
        })
        .await;
        assert!(matches!(second, Err(Error::Bind { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_server_end_to_end_and_stop() {
        let (_tmp, root) = site();
        let server = HttpServer::bind(config_for(&root)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.handle();
        let running = tokio::spawn(server.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /big.bin HTTP/1.1\r\nHost: a\r\n\r\n")
            .await
            .unwrap();
        let mut buf = Vec::new();
        let reply = read_reply(&mut stream, &mut buf).await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, big_body());
        drop(stream);

        handle.stop();
        let result = tokio::time::timeout(Duration::from_secs(5), running).await;
        assert!(matches!(result, Ok(Ok(Ok(())))), "server did not stop cleanly: {result:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_idle_client_is_closed() {
        let (_tmp, root) = site();
        let config = ServerConfig {
            worker_count: 1,
            ..config_for(&root)
        };
        let server = HttpServer::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.handle();
        let running = tokio::spawn(server.run());

        // Occupy the only worker with a silent client.
        let started = Instant::now();
        let mut idle = TcpStream::connect(addr).await.unwrap();
        let mut reply = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), idle.read_to_end(&mut reply))
            .await
            .expect("idle connection was never closed")
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
        assert!(reply.starts_with(b"HTTP/1.1 408 Request Timeout\r\n"));

        // The worker is free again.
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /hello.txt HTTP/1.0\r\n\r\n").await.unwrap();
        let mut buf = Vec::new();
        assert_eq!(read_reply(&mut stream, &mut buf).await.body, HELLO);

        handle.stop();
        running.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_many_concurrent_clients() {
        let (_tmp, root) = site();
        let config = ServerConfig {
            worker_count: 100,
            backlog: 128,
            idle_timeout: Duration::from_secs(5),
            max_requests_per_connection: 1000,
            ..config_for(&root)
        };
        let server = HttpServer::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.handle();
        let running = tokio::spawn(server.run());

        let clients = 100;
        let requests_per_client = 50;
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..clients {
            tasks.spawn(async move {
                let mut stream = TcpStream::connect(addr).await.unwrap();
                let mut buf = Vec::new();
                let mut ok = 0;
                for _ in 0..requests_per_client {
                    stream
                        .write_all(b"GET /hello.txt HTTP/1.1\r\nHost: a\r\n\r\n")
                        .await
                        .unwrap();
                    let reply = read_reply(&mut stream, &mut buf).await;
                    if reply.status == 200 && reply.content_length() == HELLO.len() && reply.body == HELLO {
                        ok += 1;
                    }
                }
                ok
            });
        }

        let mut total = 0;
        while let Some(res) = tasks.join_next().await {
            total += res.unwrap();
        }
        assert_eq!(total, clients * requests_per_client);

        handle.stop();
        running.await.unwrap().unwrap();
    }
}
