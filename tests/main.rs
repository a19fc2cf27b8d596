#![allow(missing_docs)]

//! End-to-end tests that drive a live server instance over real sockets.

mod common;

use common::{Client, USERNAME, read_to_end, spawn_server, spawn_server_with};
use ftpdlib::auth::{Perm, UserRegistry};
use pretty_assertions::assert_eq;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn greeting_and_quit() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    let reply = client.cmd("QUIT").await;
    assert!(reply.starts_with("221 "), "{reply}");
    assert!(client.is_closed().await);
}

#[tokio::test]
async fn commands_require_login() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    for cmd in ["PWD", "LIST", "PASV", "CWD /", "RETR f"] {
        let reply = client.cmd(cmd).await;
        assert!(reply.starts_with("530 "), "{cmd}: {reply}");
    }
    // But the pre-auth set works.
    assert!(client.cmd("NOOP").await.starts_with("200 "));
    assert!(client.cmd("HELP").await.starts_with("214"));
    assert!(client.cmd("FEAT").await.starts_with("211"));
}

#[tokio::test]
async fn anonymous_list() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("hello.txt"), b"hello world").unwrap();
    let addr = spawn_server(home.path()).await;

    let mut client = Client::connect(&addr).await;
    let reply = client.cmd("USER anonymous").await;
    assert!(reply.starts_with("331 "), "{reply}");
    let reply = client.cmd("PASS guest@example.org").await;
    assert!(reply.starts_with("230"), "{reply}");

    let data = client.open_passive().await;
    let reply = client.cmd("LIST").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert!(listing.contains("hello.txt"), "{listing}");
    assert!(listing.contains("\r\n"));
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226 "), "{reply}");

    let reply = client.cmd("QUIT").await;
    assert!(reply.starts_with("221 "), "{reply}");
}

#[tokio::test]
async fn stor_then_retr_round_trips_binary() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    assert!(client.cmd("TYPE I").await.starts_with("200 "));

    let payload: Vec<u8> = (0..2048u32).flat_map(|i| i.to_le_bytes()).collect();

    let mut data = client.open_passive().await;
    let reply = client.cmd("STOR blob.bin").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    data.write_all(&payload).await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226 "), "{reply}");
    assert_eq!(std::fs::read(home.path().join("blob.bin")).unwrap(), payload);

    let data = client.open_passive().await;
    let reply = client.cmd("RETR blob.bin").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    let echoed = read_to_end(data).await;
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226 "), "{reply}");
    assert_eq!(echoed, payload);
}

#[tokio::test]
async fn upload_resume_with_rest() {
    let home = tempfile::tempdir().unwrap();
    // 1000 bytes on the server already.
    let original: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(home.path().join("f"), &original).unwrap();
    let addr = spawn_server(home.path()).await;

    let mut client = Client::connect(&addr).await;
    client.login().await;
    assert!(client.cmd("TYPE I").await.starts_with("200 "));

    let mut data = client.open_passive().await;
    let reply = client.cmd("REST 400").await;
    assert!(reply.starts_with("350 "), "{reply}");
    let reply = client.cmd("STOR f").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    let tail: Vec<u8> = vec![0xAB; 600];
    data.write_all(&tail).await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    let reply = client.read_reply().await;
    assert!(reply.starts_with("226 "), "{reply}");

    let mut expected = original[..400].to_vec();
    expected.extend_from_slice(&tail);
    let on_disk = std::fs::read(home.path().join("f")).unwrap();
    assert_eq!(on_disk.len(), 1000);
    assert_eq!(on_disk, expected);
}

#[tokio::test]
async fn rest_is_forgotten_by_unrelated_commands() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("f"), vec![7u8; 100]).unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    assert!(client.cmd("TYPE I").await.starts_with("200 "));

    // REST followed by NOOP: the offset must not stick.
    assert!(client.cmd("REST 50").await.starts_with("350 "));
    assert!(client.cmd("NOOP").await.starts_with("200 "));
    let data = client.open_passive().await;
    let reply = client.cmd("RETR f").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    assert_eq!(read_to_end(data).await.len(), 100);
    assert!(client.read_reply().await.starts_with("226 "));
}

#[tokio::test]
async fn failed_logins_lock_the_session_out() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    for _ in 0..3 {
        let reply = client.cmd(&format!("USER {USERNAME}")).await;
        assert!(reply.starts_with("331 "), "{reply}");
        let reply = client.cmd("PASS definitelywrong").await;
        assert!(reply.starts_with("530 "), "{reply}");
    }
    let reply = client.cmd(&format!("USER {USERNAME}")).await;
    assert!(reply.starts_with("331 "), "{reply}");
    let reply = client.cmd("PASS definitelywrong").await;
    assert!(reply.starts_with("421 "), "{reply}");
    assert!(client.is_closed().await);
}

#[tokio::test]
async fn path_escape_is_denied() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("inside.txt"), b"data").unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;

    assert!(client.cmd("CWD /").await.starts_with("250 "));
    // Going up from the root stays at the root.
    let reply = client.cmd("CWD ..").await;
    assert!(reply.starts_with("250 "), "{reply}");
    let reply = client.cmd("PWD").await;
    assert!(reply.contains("\"/\""), "{reply}");

    let data = client.open_passive().await;
    let reply = client.cmd("RETR ../../etc/passwd").await;
    assert!(reply.starts_with("550 "), "{reply}");
    assert!(reply.contains("No such file or directory"), "{reply}");
    drop(data);

    // The session is still usable afterwards.
    assert!(client.cmd("NOOP").await.starts_with("200 "));
}

#[tokio::test]
async fn foreign_port_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;

    let reply = client.cmd("PORT 192,168,1,1,0,20").await;
    assert!(reply.starts_with("501 "), "{reply}");
    assert!(reply.contains("foreign address 192.168.1.1:20"), "{reply}");
    // Session remains usable.
    assert!(client.cmd("PWD").await.starts_with("257 "));
}

#[tokio::test]
async fn active_mode_transfer_with_port() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("f.txt"), b"active mode").unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    assert!(client.cmd("TYPE I").await.starts_with("200 "));

    // Listen on a local port and tell the server about it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let reply = client.cmd(&format!("PORT 127,0,0,1,{},{}", port / 256, port % 256)).await;
    assert!(reply.starts_with("200 "), "{reply}");

    let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
    let reply = client.cmd("RETR f.txt").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    let data = accept.await.unwrap();
    assert_eq!(read_to_end(data).await, b"active mode");
    assert!(client.read_reply().await.starts_with("226 "));
}

#[tokio::test]
async fn epsv_all_disables_port_and_pasv() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;

    assert!(client.cmd("EPSV ALL").await.starts_with("200 "));
    assert!(client.cmd("PASV").await.starts_with("501 "));
    assert!(client.cmd("PORT 127,0,0,1,10,10").await.starts_with("501 "));

    // EPSV itself still works.
    let reply = client.cmd("EPSV").await;
    assert!(reply.starts_with("229 "), "{reply}");
}

#[tokio::test]
async fn directory_management_round_trip() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;

    let reply = client.cmd("MKD sub").await;
    assert!(reply.starts_with("257 "), "{reply}");
    assert!(home.path().join("sub").is_dir());

    assert!(client.cmd("CWD sub").await.starts_with("250 "));
    let reply = client.cmd("PWD").await;
    assert!(reply.contains("\"/sub\""), "{reply}");
    assert!(client.cmd("CDUP").await.starts_with("250 "));

    // Rename it, then remove it.
    assert!(client.cmd("RNFR sub").await.starts_with("350 "));
    assert!(client.cmd("RNTO newsub").await.starts_with("250 "));
    assert!(!home.path().join("sub").exists());
    assert!(home.path().join("newsub").is_dir());
    assert!(client.cmd("RMD newsub").await.starts_with("250 "));
    assert!(!home.path().join("newsub").exists());
}

#[tokio::test]
async fn rnto_without_rnfr_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    let reply = client.cmd("RNTO somewhere").await;
    assert!(reply.starts_with("503 "), "{reply}");
}

#[tokio::test]
async fn size_and_mdtm() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("f.bin"), vec![0u8; 1234]).unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;

    // SIZE is refused in the default ASCII type.
    let reply = client.cmd("SIZE f.bin").await;
    assert!(reply.starts_with("550 "), "{reply}");

    assert!(client.cmd("TYPE I").await.starts_with("200 "));
    assert_eq!(client.cmd("SIZE f.bin").await, "213 1234");

    let reply = client.cmd("MDTM f.bin").await;
    assert!(reply.starts_with("213 "), "{reply}");
    let stamp = reply.split(' ').nth(1).unwrap();
    assert_eq!(stamp.len(), 14);
    assert!(stamp.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn mlsd_and_mlst_facts() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("data.bin"), vec![1u8; 42]).unwrap();
    std::fs::create_dir(home.path().join("sub")).unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;

    let data = client.open_passive().await;
    let reply = client.cmd("MLSD").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert!(client.read_reply().await.starts_with("226 "));
    assert!(listing.contains("type=cdir;"), "{listing}");
    assert!(listing.contains("type=dir;"), "{listing}");
    assert!(listing.contains("size=42;"), "{listing}");
    assert!(listing.contains(" data.bin\r\n"), "{listing}");

    let reply = client.cmd("MLST data.bin").await;
    assert!(reply.starts_with("250-"), "{reply}");
    assert!(reply.contains("type=file;"), "{reply}");

    // Narrow the fact set and check FEAT reflects it.
    assert!(client.cmd("OPTS MLST type;").await.starts_with("200 "));
    let feat = client.cmd("FEAT").await;
    assert!(feat.contains("MLST type*;size;"), "{feat}");
}

#[tokio::test]
async fn permissions_are_enforced_per_user() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("f.txt"), b"read only").unwrap();
    let mut users = UserRegistry::new();
    users.add_user("limited", "pw", home.path(), Perm::READ_ANY).unwrap();
    let addr = spawn_server_with(home.path(), users).await;

    let mut client = Client::connect(&addr).await;
    assert!(client.cmd("USER limited").await.starts_with("331 "));
    assert!(client.cmd("PASS pw").await.starts_with("230"));

    // Write operations bounce with 550.
    for cmd in ["MKD sub", "DELE f.txt", "RNFR f.txt"] {
        let reply = client.cmd(cmd).await;
        assert!(reply.starts_with("550 "), "{cmd}: {reply}");
        assert!(reply.contains("Not enough privileges"), "{cmd}: {reply}");
    }
    // Reading still works.
    let data = client.open_passive().await;
    let reply = client.cmd("RETR f.txt").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    assert_eq!(read_to_end(data).await, b"read only");
    assert!(client.read_reply().await.starts_with("226 "));
}

#[tokio::test]
async fn ascii_type_translates_line_endings() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("lines.txt"), b"one\ntwo\nthree\n").unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    assert!(client.cmd("TYPE A").await.starts_with("200 "));

    let data = client.open_passive().await;
    let reply = client.cmd("RETR lines.txt").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    let received = read_to_end(data).await;
    assert!(client.read_reply().await.starts_with("226 "));
    #[cfg(not(windows))]
    assert_eq!(received, b"one\r\ntwo\r\nthree\r\n");

    // And an ASCII upload is normalized back to host line endings.
    let mut data = client.open_passive().await;
    let reply = client.cmd("STOR up.txt").await;
    assert!(reply.starts_with("150 ") || reply.starts_with("125 "), "{reply}");
    data.write_all(b"a\r\nb\r\n").await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    assert!(client.read_reply().await.starts_with("226 "));
    #[cfg(not(windows))]
    assert_eq!(std::fs::read(home.path().join("up.txt")).unwrap(), b"a\nb\n");
}

#[tokio::test]
async fn stou_invents_a_name() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    assert!(client.cmd("TYPE I").await.starts_with("200 "));

    let mut data = client.open_passive().await;
    let reply = client.cmd("STOU").await;
    assert!(reply.starts_with("150 FILE: "), "{reply}");
    let name = reply.trim_start_matches("150 FILE: ").to_string();
    data.write_all(b"unique").await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    assert!(client.read_reply().await.starts_with("226 "));
    assert_eq!(std::fs::read(home.path().join(&name)).unwrap(), b"unique");
}

#[tokio::test]
async fn auth_without_tls_configured_is_refused() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    let reply = client.cmd("AUTH TLS").await;
    assert!(reply.starts_with("502 "), "{reply}");
    // PBSZ and PROT are refused on the insecure control channel too.
    client.login().await;
    assert!(client.cmd("PBSZ 0").await.starts_with("503 "));
    assert!(client.cmd("PROT P").await.starts_with("503 "));
}

#[tokio::test]
async fn rein_flushes_the_account() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    assert!(client.cmd("PWD").await.starts_with("257 "));

    let reply = client.cmd("REIN").await;
    assert!(reply.starts_with("230 "), "{reply}");
    // Authentication is gone.
    assert!(client.cmd("PWD").await.starts_with("530 "));
    // But logging in again works.
    client.login().await;
    assert!(client.cmd("PWD").await.starts_with("257 "));
}

#[tokio::test]
async fn abor_without_transfer() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    let reply = client.cmd("ABOR").await;
    assert!(reply.starts_with("225 "), "{reply}");
}

#[tokio::test]
async fn unknown_and_malformed_commands() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    let reply = client.cmd("MAKESANDWICH").await;
    assert!(reply.starts_with("500 "), "{reply}");
    let reply = client.cmd("TYPE").await;
    assert!(reply.starts_with("501 "), "{reply}");
    // The session survives both.
    assert!(client.cmd("NOOP").await.starts_with("200 "));
}

#[tokio::test]
async fn stat_without_path_reports_session_state() {
    let home = tempfile::tempdir().unwrap();
    let addr = spawn_server(home.path()).await;
    let mut client = Client::connect(&addr).await;
    client.login().await;
    let reply = client.cmd("STAT").await;
    assert!(reply.starts_with("211-"), "{reply}");
    assert!(reply.contains(USERNAME), "{reply}");
    assert!(reply.ends_with("211 End of status."), "{reply}");
}
