use axum::{
    body::{Body, Bytes},
    extract::{Path as UrlPath, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::StreamExt;
use obsup::resolver::ResolverConfig;
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Asserts that a file exists at the given path
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
}

/// Asserts that a file has the expected size
pub fn assert_file_size(path: &Path, expected_size: u64) {
    let metadata = fs::metadata(path).expect("Failed to get file metadata");
    assert_eq!(
        metadata.len(),
        expected_size,
        "File size mismatch at path: {:?}",
        path
    );
}

// === Archive fixtures ===

/// Writes a ZIP archive. Names ending in `/` become directory entries.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let file = fs::File::create(path).expect("Failed to create zip");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("Failed to add directory");
        } else {
            writer.start_file(*name, options).expect("Failed to start file");
            writer.write_all(data).expect("Failed to write entry");
        }
    }
    writer.finish().expect("Failed to finish zip");
    path.to_path_buf()
}

/// ZIP archive bytes, for serving over HTTP.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let dir = create_temp_dir();
    let path = write_zip(&dir.path().join("a.zip"), entries);
    fs::read(path).expect("Failed to read zip")
}

/// Writes a 7z archive of the given files, named relative to the archive root.
pub fn write_7z(path: &Path, files: &[(&str, &[u8])]) -> PathBuf {
    let src = create_temp_dir();
    for (name, data) in files {
        let file = src.path().join(name);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, data).unwrap();
    }
    sevenz_rust2::compress_to_path(src.path(), path).expect("Failed to write 7z");
    path.to_path_buf()
}

// === HTTP test server ===

#[derive(Default)]
struct ServerState {
    files: HashMap<String, Vec<u8>>,
    gets: HashMap<String, usize>,
    ranges: Vec<String>,
    /// Remaining GETs per file that drop the connection half way.
    drops: HashMap<String, usize>,
    /// Files whose GETs send half the body and then hang.
    stalls: HashSet<String>,
    statuses: HashMap<String, StatusCode>,
    no_ranges: bool,
    /// Releases per `owner/repo`, newest first.
    releases: HashMap<String, Vec<Value>>,
    forum_pages: HashMap<String, String>,
    api_hits: usize,
    rate_limited: bool,
}

type Shared = Arc<Mutex<ServerState>>;

/// In-process HTTP server standing in for GitHub, the forum and the CDN.
pub struct TestServer {
    pub base: Url,
    state: Shared,
}

impl TestServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/files/{name}", get(serve_file))
            .route("/repos/{owner}/{repo}/releases/latest", get(latest_release))
            .route(
                "/repos/{owner}/{repo}/releases/tags/{tag}",
                get(tagged_release),
            )
            .route("/forum/resources/{id}/download", get(forum_page))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: Url::parse(&format!("http://{}/", addr)).unwrap(),
            state,
        }
    }

    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).unwrap()
    }

    pub fn file_url(&self, name: &str) -> Url {
        self.url(&format!("files/{}", name))
    }

    pub fn add_file(&self, name: &str, data: Vec<u8>) {
        self.state.lock().unwrap().files.insert(name.into(), data);
    }

    /// Publish a release as the newest of `repo`, with one asset per file name.
    pub fn add_release(&self, repo: &str, tag: &str, assets: &[&str]) {
        let mut state = self.state.lock().unwrap();
        let assets: Vec<Value> = assets
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "browser_download_url": self.file_url(name).as_str(),
                    "size": state.files.get(*name).map(Vec::len).unwrap_or(0),
                })
            })
            .collect();
        state
            .releases
            .entry(repo.into())
            .or_default()
            .insert(0, json!({ "tag_name": tag, "assets": assets }));
    }

    /// Serve a forum download page listing `files`, each linked to `/files/{name}`.
    pub fn set_forum_files(&self, id: &str, files: &[&str]) {
        let rows: String = files
            .iter()
            .map(|name| {
                format!(
                    r#"<div class="contentRow">
  <a href="/files/{name}" class="button button--icon--download"><span>Download</span></a>
  <h3 class="contentRow-title">{name}</h3>
</div>
"#
                )
            })
            .collect();
        let page = format!("<html><body><div class=\"block-body\">\n{}</div></body></html>", rows);
        self.state.lock().unwrap().forum_pages.insert(id.into(), page);
    }

    /// The next `times` GETs of `name` stop half way through the body.
    pub fn drop_connection(&self, name: &str, times: usize) {
        self.state.lock().unwrap().drops.insert(name.into(), times);
    }

    /// Every GET of `name` sends half the body and then never finishes.
    pub fn stall(&self, name: &str) {
        self.state.lock().unwrap().stalls.insert(name.into());
    }

    pub fn set_status(&self, name: &str, status: StatusCode) {
        self.state.lock().unwrap().statuses.insert(name.into(), status);
    }

    pub fn disable_ranges(&self) {
        self.state.lock().unwrap().no_ranges = true;
    }

    pub fn set_rate_limited(&self, limited: bool) {
        self.state.lock().unwrap().rate_limited = limited;
    }

    /// Number of GETs served for `name`.
    pub fn gets(&self, name: &str) -> usize {
        self.state.lock().unwrap().gets.get(name).copied().unwrap_or(0)
    }

    pub fn total_gets(&self) -> usize {
        self.state.lock().unwrap().gets.values().sum()
    }

    /// `Range` headers received, in order.
    pub fn ranges(&self) -> Vec<String> {
        self.state.lock().unwrap().ranges.clone()
    }

    pub fn api_hits(&self) -> usize {
        self.state.lock().unwrap().api_hits
    }

    /// Resolver settings pointing both sources at this server.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            github_api: self.base.clone(),
            forum_base: self.base.clone(),
            retries: 0,
            timeout: Duration::from_secs(5),
            max_rate_limit_wait: Duration::from_millis(100),
            ..Default::default()
        }
    }
}

fn requested_start(headers: &HeaderMap) -> Option<usize> {
    let value = headers.get(header::RANGE)?.to_str().ok()?;
    value.strip_prefix("bytes=")?.strip_suffix('-')?.parse().ok()
}

async fn serve_file(
    State(state): State<Shared>,
    method: Method,
    UrlPath(name): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    let (data, drop_now, stall_now, ranges_ok, status) = {
        let mut state = state.lock().unwrap();
        let Some(data) = state.files.get(&name).cloned() else {
            return StatusCode::NOT_FOUND.into_response();
        };
        let mut drop_now = false;
        let stall_now = method == Method::GET && state.stalls.contains(&name);
        if method == Method::GET {
            *state.gets.entry(name.clone()).or_default() += 1;
            if let Some(range) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
                state.ranges.push(range.to_string());
            }
            if let Some(left) = state.drops.get_mut(&name) {
                if *left > 0 {
                    *left -= 1;
                    drop_now = true;
                }
            }
        }
        (
            data,
            drop_now,
            stall_now,
            !state.no_ranges,
            state.statuses.get(&name).copied(),
        )
    };

    if let Some(status) = status {
        return status.into_response();
    }

    let total = data.len();
    let start = if ranges_ok {
        requested_start(&headers).unwrap_or(0)
    } else {
        0
    };
    if start > 0 && start >= total {
        return Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{}", total))
            .body(Body::empty())
            .unwrap();
    }

    let body = data[start..].to_vec();
    let mut builder = Response::builder()
        .header(header::CONTENT_LENGTH, body.len())
        .header(
            header::ACCEPT_RANGES,
            if ranges_ok { "bytes" } else { "none" },
        );
    builder = if start > 0 {
        builder.status(StatusCode::PARTIAL_CONTENT).header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, total - 1, total),
        )
    } else {
        builder.status(StatusCode::OK)
    };

    if stall_now {
        let half = Bytes::from(body[..body.len() / 2].to_vec());
        let stream = futures::stream::iter(vec![Ok::<_, std::io::Error>(half)])
            .chain(futures::stream::pending());
        return builder.body(Body::from_stream(stream)).unwrap();
    }

    if drop_now {
        let half = Bytes::from(body[..body.len() / 2].to_vec());
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(half),
            Err(std::io::Error::other("connection dropped")),
        ];
        return builder
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();
    }
    builder.body(Body::from(body)).unwrap()
}

fn release_response(state: &mut ServerState, repo: &str, tag: Option<&str>) -> Response {
    state.api_hits += 1;
    if state.rate_limited {
        let reset = chrono::Utc::now().timestamp() + 3600;
        return Response::builder()
            .status(StatusCode::FORBIDDEN)
            .header("x-ratelimit-remaining", "0")
            .header("x-ratelimit-reset", reset.to_string())
            .body(Body::from("API rate limit exceeded"))
            .unwrap();
    }

    let release = state.releases.get(repo).and_then(|releases| match tag {
        Some(tag) => releases.iter().find(|r| r["tag_name"] == tag),
        None => releases.first(),
    });
    match release {
        Some(release) => Response::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-ratelimit-remaining", "59")
            .body(Body::from(release.to_string()))
            .unwrap(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn latest_release(
    State(state): State<Shared>,
    UrlPath((owner, repo)): UrlPath<(String, String)>,
) -> Response {
    let mut state = state.lock().unwrap();
    release_response(&mut state, &format!("{}/{}", owner, repo), None)
}

async fn tagged_release(
    State(state): State<Shared>,
    UrlPath((owner, repo, tag)): UrlPath<(String, String, String)>,
) -> Response {
    let mut state = state.lock().unwrap();
    release_response(&mut state, &format!("{}/{}", owner, repo), Some(&tag))
}

async fn forum_page(State(state): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
    let state = state.lock().unwrap();
    match state.forum_pages.get(&id) {
        Some(page) => Response::builder()
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Body::from(page.clone()))
            .unwrap(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
