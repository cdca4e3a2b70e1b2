//! Development HTTP server.
//!
//! Serves the output tree from the serve root with directory-index
//! resolution, injects the live-reload client into HTML, and holds one
//! event-stream connection per browser on its own thread.
//!
//! ```text
//! GET /__pagekit/events  → event stream (dedicated thread per client)
//! GET|HEAD anything else → rayon pool: file, index.html, .html, 404
//! ```

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::RecvTimeoutError;
use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use super::inject::inject_client;
use super::message::{EVENTS_PATH, HEARTBEAT_FRAME, retry_frame};
use super::path::{resolve_path, route_of};
use super::LiveChannel;
use crate::builder::TaskOptions;
use crate::core::{BuildContext, Shutdown};
use crate::utils::mime::{self, types};
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Idle time after which a comment frame is sent to each stream.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Worker threads for ordinary requests.
const POOL_THREADS: usize = 4;

/// The `server` task: serve until the session shuts down.
pub async fn run(ctx: Arc<BuildContext>, _options: TaskOptions) -> Result<()> {
    let server = DevServer::start(&ctx)?;

    let url = start_url(&ctx, server.port());
    log!("serve"; "{}", url);
    if ctx.config.server.open
        && let Err(e) = open_browser(&url)
    {
        log!("warning"; "failed to open browser: {}", e);
    }

    ctx.shutdown.wait().await;

    ctx.live.close();
    tokio::task::spawn_blocking(move || server.stop())
        .await
        .map_err(|e| anyhow!("server thread panicked: {e}"))?;
    debug!("serve"; "stopped");
    Ok(())
}

/// Bound server with its request loop running.
pub struct DevServer {
    server: Arc<Server>,
    port: u16,
    thread: JoinHandle<()>,
}

impl DevServer {
    pub fn start(ctx: &Arc<BuildContext>) -> Result<Self> {
        let config = &ctx.config.server;
        let (server, port) = bind_with_retry(config.bind_host(), config.port)?;
        let server = Arc::new(server);

        let loop_server = Arc::clone(&server);
        let loop_ctx = Arc::clone(ctx);
        let thread = thread::Builder::new()
            .name("pagekit-serve".into())
            .spawn(move || run_request_loop(&loop_server, &loop_ctx))
            .context("failed to spawn server thread")?;

        Ok(Self {
            server,
            port,
            thread,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting requests and wait for the loop to exit.
    pub fn stop(self) {
        self.server.unblock();
        if self.thread.join().is_err() {
            log!("error"; "server thread panicked");
        }
    }
}

/// Bind `host:base_port`, trying the following ports when taken.
fn bind_with_retry(host: &str, base_port: u16) -> Result<(Server, u16)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http((host, port)) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let port = server
                    .server_addr()
                    .to_ip()
                    .map_or(port, |addr: SocketAddr| addr.port());
                return Ok((server, port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind {} after {} attempts (ports {}-{}): {}",
        host,
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// `http://host:port/<subdir>/<start_path>`
fn start_url(ctx: &BuildContext, port: u16) -> String {
    let server = &ctx.config.server;
    let start = server.start_path.trim_start_matches('/');
    format!(
        "http://{}:{}{}/{}",
        server.host,
        port,
        ctx.config.subdir_prefix(),
        start
    )
}

fn run_request_loop(server: &Server, ctx: &Arc<BuildContext>) {
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(POOL_THREADS).build() {
        Ok(pool) => pool,
        Err(e) => {
            log!("error"; "failed to create request pool: {}", e);
            return;
        }
    };

    for request in server.incoming_requests() {
        if route_of(request.url()) == EVENTS_PATH {
            let live = ctx.live.clone();
            let shutdown = ctx.shutdown.clone();
            // Streams live for minutes; keep them off the pool
            thread::spawn(move || {
                if let Err(e) = serve_events(request, &live, &shutdown) {
                    debug!("serve"; "event stream closed: {}", e);
                }
            });
            continue;
        }

        let ctx = Arc::clone(ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Hold an event stream open, forwarding live events until the client
/// disconnects or the channel closes.
fn serve_events(request: Request, live: &LiveChannel, shutdown: &Shutdown) -> Result<()> {
    let events = live.subscribe();
    let mut writer = request.into_writer();

    write!(
        writer,
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n\r\n",
        types::EVENT_STREAM
    )?;
    writer.write_all(retry_frame().as_bytes())?;
    writer.flush()?;

    loop {
        match events.recv_timeout(HEARTBEAT_INTERVAL) {
            Ok(event) => writer.write_all(event.to_frame().as_bytes())?,
            Err(RecvTimeoutError::Timeout) if shutdown.is_triggered() => break,
            // Fails once the browser is gone, ending the thread
            Err(RecvTimeoutError::Timeout) => writer.write_all(HEARTBEAT_FRAME.as_bytes())?,
            Err(RecvTimeoutError::Disconnected) => break,
        }
        writer.flush()?;
    }
    Ok(())
}

/// GET and HEAD only; tiny_http drops the body of HEAD responses itself.
fn handle_request(request: Request, ctx: &BuildContext) -> Result<()> {
    if !matches!(request.method(), Method::Get | Method::Head) {
        return send(request, 405, types::PLAIN, b"405 Method Not Allowed".to_vec());
    }

    match resolve_path(request.url(), &ctx.paths.serve_root) {
        Some(path) => respond_file(request, &path),
        None => respond_not_found(request, ctx),
    }
}

fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);
    let body = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let body = if mime::is_html(content_type) {
        inject_client(&body)
    } else {
        body
    };
    send(request, 200, content_type, body)
}

/// Custom `404.html` from the output root, then the serve root, else text.
fn respond_not_found(request: Request, ctx: &BuildContext) -> Result<()> {
    let custom = [&ctx.paths.dist, &ctx.paths.serve_root]
        .into_iter()
        .map(|dir| dir.join("404.html"))
        .find_map(|page| fs::read(page).ok());

    match custom {
        Some(body) => send(request, 404, types::HTML, inject_client(&body)),
        None => send(request, 404, types::PLAIN, b"404 Not Found".to_vec()),
    }
}

fn send(request: Request, status: u16, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    let mut response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", content_type)?);
    if mime::needs_revalidation(content_type) {
        response.add_header(header("Cache-Control", "no-cache")?);
    }
    request.respond(response)?;
    Ok(())
}

fn header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).map_err(|()| anyhow!("invalid header {key}"))
}

fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TaskSlots;
    use crate::core::BuildMode;
    use crate::reload::LiveEvent;
    use crate::testing::TestSite;
    use std::io::{BufRead, BufReader, Read};
    use std::net::TcpStream;
    use std::time::Instant;

    fn serve(site: &TestSite) -> (Arc<BuildContext>, DevServer) {
        let mut config = site.config.clone();
        config.server.port = 0;
        let ctx = Arc::new(BuildContext::new(config, BuildMode::Development, TaskSlots::default()));
        let server = DevServer::start(&ctx).unwrap();
        (ctx, server)
    }

    fn request(port: u16, method: &str, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(stream, "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serves_html_with_client() {
        let site = TestSite::new();
        std::fs::create_dir_all(site.dist("about")).unwrap();
        std::fs::write(site.dist("index.html"), "<html><body>home</body></html>").unwrap();
        std::fs::write(site.dist("about/index.html"), "<p>about</p>").unwrap();
        let (_ctx, server) = serve(&site);

        let home = request(server.port(), "GET", "/");
        assert!(home.starts_with("HTTP/1.1 200"), "{home}");
        assert!(home.contains(EVENTS_PATH), "{home}");
        assert!(home.contains("</script></body>"), "{home}");

        let about = request(server.port(), "GET", "/about");
        assert!(about.contains("<p>about</p><script>"), "{about}");

        server.stop();
    }

    #[test]
    fn test_css_is_revalidated() {
        let site = TestSite::new();
        std::fs::create_dir_all(&site.paths.dist).unwrap();
        std::fs::write(site.dist("app.css"), ".a{}").unwrap();
        let (_ctx, server) = serve(&site);

        let css = request(server.port(), "GET", "/app.css?v=2");
        assert!(css.starts_with("HTTP/1.1 200"), "{css}");
        assert!(css.to_ascii_lowercase().contains("cache-control: no-cache"), "{css}");
        assert!(css.ends_with(".a{}"), "{css}");

        server.stop();
    }

    #[test]
    fn test_head_and_method_handling() {
        let site = TestSite::new();
        std::fs::create_dir_all(&site.paths.dist).unwrap();
        std::fs::write(site.dist("index.html"), "<p>x</p>").unwrap();
        let (_ctx, server) = serve(&site);

        let head = request(server.port(), "HEAD", "/");
        assert!(head.starts_with("HTTP/1.1 200"), "{head}");
        assert!(!head.contains("<p>x</p>"), "{head}");

        let post = request(server.port(), "POST", "/");
        assert!(post.starts_with("HTTP/1.1 405"), "{post}");

        server.stop();
    }

    #[test]
    fn test_not_found() {
        let site = TestSite::new();
        std::fs::create_dir_all(&site.paths.dist).unwrap();
        let (_ctx, server) = serve(&site);

        let plain = request(server.port(), "GET", "/missing");
        assert!(plain.starts_with("HTTP/1.1 404"), "{plain}");
        assert!(plain.ends_with("404 Not Found"), "{plain}");

        std::fs::write(site.dist("404.html"), "<body>lost</body>").unwrap();
        let custom = request(server.port(), "GET", "/missing");
        assert!(custom.starts_with("HTTP/1.1 404"), "{custom}");
        assert!(custom.contains("lost"), "{custom}");

        let escape = request(server.port(), "GET", "/../pagekit.toml");
        assert!(escape.starts_with("HTTP/1.1 404"), "{escape}");

        server.stop();
    }

    #[test]
    fn test_event_stream() {
        let site = TestSite::new();
        std::fs::create_dir_all(&site.paths.dist).unwrap();
        let (ctx, server) = serve(&site);

        let mut stream = TcpStream::connect(("127.0.0.1", server.port())).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        write!(stream, "GET {EVENTS_PATH} HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while ctx.live.client_count() == 0 {
            assert!(Instant::now() < deadline, "client never subscribed");
            thread::sleep(Duration::from_millis(10));
        }
        ctx.live.notify(LiveEvent::CssUpdate);

        let mut reader = BufReader::new(stream);
        let mut seen = Vec::new();
        while !seen.iter().any(|l: &String| l == "event: css-update") {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            seen.push(line.trim_end().to_string());
        }

        assert!(seen.iter().any(|l| l.contains("text/event-stream")), "{seen:?}");
        assert!(seen.contains(&"retry: 1000".to_string()), "{seen:?}");
        assert!(seen.contains(&"event: css-update".to_string()), "{seen:?}");

        ctx.live.close();
        server.stop();
    }

    #[test]
    fn test_start_url() {
        let site = TestSite::new();
        let mut config = site.config.clone();
        config.subdir = "blog".into();
        config.server.start_path = "/posts/".into();
        let ctx = BuildContext::new(config, BuildMode::Development, TaskSlots::default());
        assert_eq!(start_url(&ctx, 5555), "http://localhost:5555/blog/posts/");
    }
}
