//! End-to-end FTP sessions against a live engine on ephemeral ports.

use chrono::TimeZone;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;

use aioftpd::config::Config;
use aioftpd::core_network::server::FtpServer;
use aioftpd::server::{ProtocolServer, ServerContext};
use aioftpd::users::parse_user_spec;

/// Spins up an FTP engine on an ephemeral control port with an ephemeral
/// passive range. The returned sender keeps the engine alive; dropping it
/// shuts the accept loop down.
async fn start_ftp(users: &str) -> (SocketAddr, TempDir, watch::Sender<bool>) {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.data = dir.path().to_str().unwrap().to_string();
    config.users = parse_user_spec(users).unwrap();
    config.services.ftp.enabled = true;
    config.services.ftp.port = 0;
    config.services.ftp.pasv_min_port = 0;
    config.services.ftp.pasv_max_port = 0;
    config.validate().unwrap();

    let ctx = Arc::new(ServerContext::new(config));
    let server = FtpServer::bind(ctx).await.unwrap();
    let port = server.local_addr().unwrap().port();

    let (tx, rx) = watch::channel(false);
    tokio::spawn(Box::new(server).serve(rx));

    (format!("127.0.0.1:{}", port).parse().unwrap(), dir, tx)
}

struct FtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl FtpClient {
    /// Connects and consumes the 220 greeting.
    async fn connect(addr: SocketAddr) -> FtpClient {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut client = FtpClient {
            reader: BufReader::new(read_half),
            writer: write_half,
        };
        let greeting = client.read_reply().await;
        assert!(greeting.starts_with("220 "), "greeting: {}", greeting);
        client
    }

    async fn read_reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line.trim_end().to_string()
    }

    async fn cmd(&mut self, line: &str) -> String {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
        self.read_reply().await
    }

    async fn login(&mut self, user: &str, pass: &str) {
        let reply = self.cmd(&format!("USER {}", user)).await;
        assert!(reply.starts_with("331 "), "USER: {}", reply);
        let reply = self.cmd(&format!("PASS {}", pass)).await;
        assert!(reply.starts_with("230 "), "PASS: {}", reply);
    }

    /// Issues PASV and connects to the advertised address.
    async fn open_data(&mut self) -> TcpStream {
        let reply = self.cmd("PASV").await;
        assert!(reply.starts_with("227 "), "PASV: {}", reply);
        TcpStream::connect(parse_pasv(&reply)).await.unwrap()
    }

    /// Runs a data-bearing command to completion: sends it, collects the
    /// payload from the data connection, and returns (payload, final reply).
    async fn data_cmd(&mut self, line: &str) -> (Vec<u8>, String) {
        let mut data = self.open_data().await;
        let reply = self.cmd(line).await;
        assert!(reply.starts_with("150 "), "{}: {}", line, reply);
        let mut payload = Vec::new();
        data.read_to_end(&mut payload).await.unwrap();
        let done = self.read_reply().await;
        (payload, done)
    }
}

/// Extracts the host/port from a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply.
fn parse_pasv(reply: &str) -> SocketAddr {
    let open = reply.find('(').unwrap();
    let close = reply.find(')').unwrap();
    let fields: Vec<u16> = reply[open + 1..close]
        .split(',')
        .map(|f| f.trim().parse().unwrap())
        .collect();
    assert_eq!(fields.len(), 6, "PASV reply: {}", reply);

    let port = fields[4] * 256 + fields[5];
    format!("{}.{}.{}.{}:{}", fields[0], fields[1], fields[2], fields[3], port)
        .parse()
        .unwrap()
}

#[tokio::test]
async fn store_then_retrieve_round_trips() {
    let (addr, dir, _guard) = start_ftp("admin:pw:1000:/:rw").await;
    let mut client = FtpClient::connect(addr).await;
    client.login("admin", "pw").await;

    let reply = client.cmd("PWD").await;
    assert_eq!(reply, "257 \"/\" is current directory");

    // Upload.
    let mut data = client.open_data().await;
    let reply = client.cmd("STOR hello.txt").await;
    assert!(reply.starts_with("150 "), "STOR: {}", reply);
    data.write_all(b"hello\n").await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226 "), "STOR completion: {}", reply);

    assert_eq!(
        std::fs::read(dir.path().join("hello.txt")).unwrap(),
        b"hello\n"
    );

    // Download on a fresh passive listener.
    let (payload, reply) = client.data_cmd("RETR hello.txt").await;
    assert_eq!(payload, b"hello\n");
    assert!(reply.starts_with("226 "), "RETR completion: {}", reply);

    let reply = client.cmd("QUIT").await;
    assert!(reply.starts_with("221 "), "QUIT: {}", reply);
}

#[tokio::test]
async fn binary_content_survives_the_round_trip() {
    let (addr, _dir, _guard) = start_ftp("admin:pw:1000:/:rw").await;
    let mut client = FtpClient::connect(addr).await;
    client.login("admin", "pw").await;

    // Every byte value, repeated across several data-channel reads.
    let blob: Vec<u8> = (0..=255u8).cycle().take(128 * 1024 + 37).collect();

    let mut data = client.open_data().await;
    let reply = client.cmd("STOR blob.bin").await;
    assert!(reply.starts_with("150 "), "STOR: {}", reply);
    data.write_all(&blob).await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226 "), "STOR completion: {}", reply);

    let (payload, reply) = client.data_cmd("RETR blob.bin").await;
    assert!(reply.starts_with("226 "), "RETR completion: {}", reply);
    assert_eq!(payload, blob);
}

#[tokio::test]
async fn traversal_attempts_are_refused() {
    let (addr, dir, _guard) = start_ftp("jail:pw:1000:/public:rw").await;
    let mut client = FtpClient::connect(addr).await;
    client.login("jail", "pw").await;

    let reply = client.cmd("CWD ../../etc").await;
    assert!(reply.starts_with("550 "), "CWD: {}", reply);

    let _data = client.open_data().await;
    let reply = client.cmd("RETR ../../etc/passwd").await;
    assert!(reply.starts_with("550 "), "RETR: {}", reply);

    // Absolute escapes fare no better.
    let reply = client.cmd("SIZE /etc/passwd").await;
    assert!(reply.starts_with("550 "), "SIZE: {}", reply);

    // The working directory never left the jail.
    let reply = client.cmd("PWD").await;
    assert_eq!(reply, "257 \"/\" is current directory");

    // Nothing appeared outside the user's sub-tree.
    assert!(!dir.path().join("etc").exists());
}

#[tokio::test]
async fn read_only_users_cannot_change_anything() {
    let (addr, dir, _guard) = start_ftp("guest:gp:1001:/public:ro").await;
    std::fs::write(dir.path().join("public/a"), b"readable\n").unwrap();

    let mut client = FtpClient::connect(addr).await;
    client.login("guest", "gp").await;

    let _data = client.open_data().await;
    assert_eq!(
        client.cmd("STOR x").await,
        "550 Permission denied: read-only user"
    );
    assert_eq!(
        client.cmd("DELE a").await,
        "550 Permission denied: read-only user"
    );
    assert_eq!(
        client.cmd("MKD d").await,
        "550 Permission denied: read-only user"
    );
    assert_eq!(
        client.cmd("RMD d").await,
        "550 Permission denied: read-only user"
    );

    // Listing and reading still work.
    let (payload, reply) = client.data_cmd("LIST").await;
    assert!(reply.starts_with("226 "), "LIST completion: {}", reply);
    let listing = String::from_utf8(payload).unwrap();
    assert!(listing.contains("-r--r--r--"), "listing: {}", listing);
    assert!(listing.contains(" a\r\n"), "listing: {}", listing);

    let (payload, reply) = client.data_cmd("RETR a").await;
    assert!(reply.starts_with("226 "), "RETR completion: {}", reply);
    assert_eq!(payload, b"readable\n");

    // The host tree is untouched.
    assert!(!dir.path().join("public/x").exists());
    assert!(dir.path().join("public/a").exists());
    assert!(!dir.path().join("public/d").exists());
}

#[tokio::test]
async fn size_and_mdtm_report_exact_values() {
    let (addr, dir, _guard) = start_ftp("admin:pw:1000:/:rw").await;

    let path = dir.path().join("f");
    std::fs::write(&path, vec![0u8; 1234]).unwrap();
    // 2024-05-06 07:08:09 UTC.
    let mtime = chrono::Utc
        .with_ymd_and_hms(2024, 5, 6, 7, 8, 9)
        .unwrap()
        .timestamp();
    filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(mtime, 0)).unwrap();

    let mut client = FtpClient::connect(addr).await;
    client.login("admin", "pw").await;

    assert_eq!(client.cmd("SIZE f").await, "213 1234");
    assert_eq!(client.cmd("MDTM f").await, "213 20240506070809");

    // SIZE on a directory fails; MDTM without an argument is a syntax error.
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    assert!(client.cmd("SIZE sub").await.starts_with("550 "));
    assert!(client.cmd("MDTM").await.starts_with("501 "));
}

#[tokio::test]
async fn mlsd_emits_machine_readable_facts() {
    let (addr, dir, _guard) = start_ftp("admin:pw:1000:/:rw").await;
    std::fs::write(dir.path().join("file.bin"), vec![7u8; 99]).unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    let mut client = FtpClient::connect(addr).await;
    client.login("admin", "pw").await;

    let (payload, reply) = client.data_cmd("MLSD").await;
    assert!(reply.starts_with("226 "), "MLSD completion: {}", reply);
    let listing = String::from_utf8(payload).unwrap();

    let file_line = listing
        .lines()
        .map(str::trim_end)
        .find(|l| l.ends_with(" file.bin"))
        .expect("file.bin missing from MLSD");
    assert!(file_line.starts_with("type=file;size=99;modify="), "{}", file_line);

    let dir_line = listing
        .lines()
        .map(str::trim_end)
        .find(|l| l.ends_with(" sub"))
        .expect("sub missing from MLSD");
    assert!(dir_line.starts_with("type=dir;modify="), "{}", dir_line);
}

#[tokio::test]
async fn relogin_rebinds_user_and_cwd() {
    let (addr, _dir, _guard) = start_ftp("admin:pw:1000:/:rw,guest:gp:1001:/public:ro").await;
    let mut client = FtpClient::connect(addr).await;

    client.login("admin", "pw").await;
    let reply = client.cmd("CWD public").await;
    assert!(reply.starts_with("250 "), "CWD: {}", reply);
    assert_eq!(client.cmd("PWD").await, "257 \"/public\" is current directory");

    // A second USER/PASS on the same connection starts over.
    client.login("guest", "gp").await;
    assert_eq!(client.cmd("PWD").await, "257 \"/\" is current directory");

    // And a failed re-login keeps the session alive.
    let reply = client.cmd("USER admin").await;
    assert!(reply.starts_with("331 "), "USER: {}", reply);
    let reply = client.cmd("PASS wrong").await;
    assert!(reply.starts_with("530 "), "PASS: {}", reply);
    let reply = client.cmd("NOOP").await;
    assert!(reply.starts_with("200 "), "NOOP: {}", reply);
}

#[tokio::test]
async fn protocol_odds_and_ends() {
    let (addr, _dir, _guard) = start_ftp("admin:pw:1000:/:rw").await;
    let mut client = FtpClient::connect(addr).await;

    assert_eq!(client.cmd("SYST").await, "215 UNIX Type: L8");
    assert_eq!(client.cmd("TYPE I").await, "200 Type set to binary");
    assert_eq!(client.cmd("TYPE A").await, "200 Type set to binary");
    assert_eq!(client.cmd("NOOP").await, "200 OK");
    assert_eq!(client.cmd("OPTS UTF8 ON").await, "200 UTF8 set to on");
    assert!(client.cmd("OPTS MLST size").await.starts_with("502 "));
    assert!(client.cmd("RNFR a").await.starts_with("502 "));
    assert_eq!(
        client.cmd("PORT 127,0,0,1,10,10").await,
        "502 PORT not supported, use PASV"
    );
    assert!(client.cmd("PORT nonsense").await.starts_with("501 "));

    // Data commands without a passive listener are refused.
    client.login("admin", "pw").await;
    assert_eq!(client.cmd("LIST").await, "425 Use PASV first");
    assert_eq!(client.cmd("RETR a").await, "425 Use PASV first");

    // Commands that need a login are refused without one.
    let mut fresh = FtpClient::connect(addr).await;
    assert_eq!(fresh.cmd("PWD").await, "530 Not logged in");
    assert_eq!(fresh.cmd("CWD /").await, "530 Not logged in");
    assert!(fresh.cmd("PASS pw").await.starts_with("503 "));
}

#[tokio::test]
async fn feat_advertises_the_extension_set() {
    let (addr, _dir, _guard) = start_ftp("admin:pw:1000:/:rw").await;
    let mut client = FtpClient::connect(addr).await;

    let first = client.cmd("FEAT").await;
    assert_eq!(first, "211-Features:");
    let mut saw = Vec::new();
    loop {
        let line = client.read_reply().await;
        if line == "211 END" {
            break;
        }
        saw.push(line.trim().to_string());
    }
    for feature in ["PASV", "EPSV", "SIZE", "MDTM", "MLSD", "UTF8"] {
        assert!(saw.iter().any(|l| l == feature), "missing {}: {:?}", feature, saw);
    }
}

#[tokio::test]
async fn epsv_advertises_a_usable_port() {
    let (addr, dir, _guard) = start_ftp("admin:pw:1000:/:rw").await;
    std::fs::write(dir.path().join("e.txt"), b"epsv\n").unwrap();

    let mut client = FtpClient::connect(addr).await;
    client.login("admin", "pw").await;

    let reply = client.cmd("EPSV").await;
    assert!(reply.starts_with("229 "), "EPSV: {}", reply);
    let open = reply.find("(|||").unwrap();
    let close = reply.rfind("|)").unwrap();
    let port: u16 = reply[open + 4..close].parse().unwrap();

    let mut data = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let reply = client.cmd("RETR e.txt").await;
    assert!(reply.starts_with("150 "), "RETR: {}", reply);
    let mut payload = Vec::new();
    data.read_to_end(&mut payload).await.unwrap();
    assert_eq!(payload, b"epsv\n");
    assert!(client.read_reply().await.starts_with("226 "));
}
