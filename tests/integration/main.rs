//! Integration tests for the capiscio wrapper

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    use capiscio::cache;
    use capiscio::launcher::CORE_VERSION;
    use capiscio::platform::Target;

    /// Nothing listens here; any attempted fetch fails immediately
    const UNREACHABLE_BASE: &str = "http://127.0.0.1:1";

    fn capiscio() -> Command {
        cargo_bin_cmd!("capiscio")
    }

    fn entry_path(root: &Path) -> PathBuf {
        let target = Target::detect().expect("test host is on the supported matrix");
        cache::entry_path(root, CORE_VERSION, &target)
    }

    /// Serve one release artifact (plus the sidecar probe) from a loopback
    /// listener, then stop. Returns the base URL and a handle yielding the
    /// number of requests served.
    fn serve_artifact_once(payload: Vec<u8>) -> (String, std::thread::JoinHandle<usize>) {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let mut served = 0;
            // One artifact fetch, then one checksum sidecar probe
            for _ in 0..2 {
                let Ok((mut stream, _)) = listener.accept() else {
                    break;
                };
                let mut buf = [0u8; 1024];
                let n = stream.read(&mut buf).unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();

                let response = if request.contains(".sha256") {
                    b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                        .to_vec()
                } else {
                    let mut r = format!(
                        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                        payload.len()
                    )
                    .into_bytes();
                    r.extend_from_slice(&payload);
                    r
                };
                stream.write_all(&response).unwrap();
                served += 1;
            }
            served
        });

        (base, handle)
    }

    /// Place a fake core binary at the expected cache path
    #[cfg(unix)]
    fn stage_fake_core(root: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = entry_path(root);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn wrapper_version_exits_zero() {
        capiscio()
            .arg("--wrapper-version")
            .assert()
            .success()
            .stdout(predicate::str::contains("capiscio wrapper"));
    }

    #[test]
    fn wrapper_version_never_touches_network_or_cache() {
        let dir = TempDir::new().unwrap();
        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .arg("--wrapper-version")
            .assert()
            .success()
            .stdout(predicate::str::contains(format!(
                "capiscio wrapper v{CORE_VERSION}"
            )));
        assert!(!entry_path(dir.path()).exists());
    }

    #[test]
    fn wrapper_clean_removes_existing_cache() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("cache");
        std::fs::create_dir_all(root.join(format!("v{CORE_VERSION}"))).unwrap();
        std::fs::write(root.join(format!("v{CORE_VERSION}")).join("stale"), b"x").unwrap();

        capiscio()
            .env("CAPISCIO_CACHE_DIR", &root)
            .arg("--wrapper-clean")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleaned cache directory"));

        assert!(!root.exists());
    }

    #[test]
    fn wrapper_clean_absent_cache_is_informational() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("never-created");

        capiscio()
            .env("CAPISCIO_CACHE_DIR", &missing)
            .arg("--wrapper-clean")
            .assert()
            .success()
            .stdout(predicate::str::contains("does not exist"));

        assert!(!missing.exists());
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_propagated_from_core() {
        let dir = TempDir::new().unwrap();
        stage_fake_core(dir.path(), "#!/bin/sh\nexit 3\n");

        // Poisoned base URL proves the cache hit path makes no network call
        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .args(["badge", "status"])
            .assert()
            .code(3);
    }

    #[cfg(unix)]
    #[test]
    fn success_exit_code_propagated() {
        let dir = TempDir::new().unwrap();
        stage_fake_core(dir.path(), "#!/bin/sh\nexit 0\n");

        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .arg("score")
            .assert()
            .success();
    }

    #[cfg(unix)]
    #[test]
    fn arguments_forwarded_verbatim() {
        let dir = TempDir::new().unwrap();
        stage_fake_core(dir.path(), "#!/bin/sh\nprintf '%s\\n' \"$@\"\n");

        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .args(["validate", "https://example.com", "--verbose"])
            .assert()
            .success()
            .stdout(predicate::eq("validate\nhttps://example.com\n--verbose\n"));
    }

    #[cfg(unix)]
    #[test]
    fn empty_arguments_forwarded() {
        let dir = TempDir::new().unwrap();
        stage_fake_core(dir.path(), "#!/bin/sh\necho \"argc=$#\"\n");

        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .assert()
            .success()
            .stdout(predicate::eq("argc=0\n"));
    }

    #[cfg(unix)]
    #[test]
    fn help_belongs_to_core() {
        let dir = TempDir::new().unwrap();
        stage_fake_core(dir.path(), "#!/bin/sh\necho 'core help text'\n");

        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("core help text"));
    }

    #[cfg(unix)]
    #[test]
    fn arguments_with_spaces_keep_boundaries() {
        let dir = TempDir::new().unwrap();
        stage_fake_core(dir.path(), "#!/bin/sh\necho \"argc=$#\"\nprintf '%s\\n' \"$@\"\n");

        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .args(["badge", "issue", "an agent name with spaces"])
            .assert()
            .success()
            .stdout(predicate::eq(
                "argc=3\nbadge\nissue\nan agent name with spaces\n",
            ));
    }

    #[cfg(unix)]
    #[test]
    fn cache_miss_downloads_installs_then_hits_cache() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let (base, server) = serve_artifact_once(b"#!/bin/sh\nexit 7\n".to_vec());

        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", &base)
            .arg("validate")
            .assert()
            .code(7);

        // The entry landed executable at the expected path
        let entry = entry_path(dir.path());
        let mode = std::fs::metadata(&entry).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        // Exactly one artifact fetch plus one sidecar probe
        assert_eq!(server.join().unwrap(), 2);

        // The server is gone, so a second success proves a cache hit
        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", &base)
            .arg("validate")
            .assert()
            .code(7);
    }

    #[cfg(unix)]
    #[test]
    fn interrupt_forwarded_to_core() {
        // A SIGINT addressed to the wrapper alone (not the whole process
        // group) must reach the child; the wrapper then propagates the
        // resulting signal status.
        let dir = TempDir::new().unwrap();
        stage_fake_core(dir.path(), "#!/bin/sh\nexec sleep 20\n");

        let mut wrapper = std::process::Command::new(env!("CARGO_BIN_EXE_capiscio"))
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .arg("validate")
            .spawn()
            .unwrap();

        // Let the wrapper resolve the cache entry and spawn the core
        std::thread::sleep(std::time::Duration::from_millis(800));
        unsafe {
            libc::kill(wrapper.id() as libc::pid_t, libc::SIGINT);
        }

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let status = loop {
            if let Some(status) = wrapper.try_wait().unwrap() {
                break status;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "wrapper did not exit after SIGINT"
            );
            std::thread::sleep(std::time::Duration::from_millis(100));
        };

        // The core died from the forwarded SIGINT; 128 + signo propagates
        assert_eq!(status.code(), Some(128 + libc::SIGINT));
    }

    #[test]
    fn download_failure_is_diagnosed_without_spawn() {
        let dir = TempDir::new().unwrap();

        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .arg("validate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not fetch"));

        // Nothing was installed and nothing ran
        assert!(!entry_path(dir.path()).exists());
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_entry_triggers_redownload_attempt() {
        // An entry without the executable bit is not a valid cache hit, so
        // the wrapper falls through to the (here unreachable) download.
        let dir = TempDir::new().unwrap();
        let path = entry_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();

        capiscio()
            .env("CAPISCIO_CACHE_DIR", dir.path())
            .env("CAPISCIO_BASE_URL", UNREACHABLE_BASE)
            .arg("validate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not fetch"));
    }
}
