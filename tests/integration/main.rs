//! Integration tests for precache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn precache() -> Command {
        let mut cmd = cargo_bin_cmd!("precache");
        cmd.env_remove("PRECACHE_CONFIG")
            .env_remove("PRECACHE_STORAGE_DIR");
        cmd
    }

    /// A site directory with a build output and a local-mode deployment file
    fn site(version: &str, resources: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("index.html"), "<html>home</html>").unwrap();
        fs::write(dist.join("app.js"), "console.log('v1')").unwrap();
        fs::write(dist.join("style.css"), "body{}").unwrap();
        write_config(temp.path(), version, resources);
        temp
    }

    fn write_config(dir: &Path, version: &str, resources: &[&str]) {
        let list = resources
            .iter()
            .map(|r| format!("\"{}\"", r))
            .collect::<Vec<_>>()
            .join(", ");
        let content = format!(
            r#"[deployment]
version = "{version}"
origin = "http://localhost:8080/"

[manifest]
resources = [{list}]

[network]
mode = "local"
root = "dist"

[storage]
dir = ".precache"
"#
        );
        fs::write(dir.join("precache.toml"), content).unwrap();
    }

    fn in_site(temp: &TempDir) -> Command {
        let mut cmd = precache();
        cmd.current_dir(temp.path());
        cmd
    }

    const MANIFEST: [&str; 3] = ["/", "app.js", "style.css"];

    #[test]
    fn help_displays() {
        precache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline cache"));
    }

    #[test]
    fn version_displays() {
        precache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("precache"));
    }

    #[test]
    fn init_writes_deployment_file() {
        let temp = TempDir::new().unwrap();
        precache()
            .args(["init", "--path"])
            .arg(temp.path())
            .assert()
            .success();

        let content = fs::read_to_string(temp.path().join("precache.toml")).unwrap();
        assert!(content.contains("[deployment]"));

        precache()
            .args(["init", "--path"])
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn missing_config_hints_init() {
        let temp = TempDir::new().unwrap();
        precache()
            .current_dir(temp.path())
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("precache init"));
    }

    #[test]
    fn list_empty() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache stores"));

        in_site(&temp)
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn config_path_and_show() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("precache.toml"));

        in_site(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[deployment]"))
            .stdout(predicate::str::contains("app.js"));
    }

    #[test]
    fn config_flag_selects_file() {
        let temp = site("v1", &MANIFEST);
        let elsewhere = TempDir::new().unwrap();
        precache()
            .current_dir(elsewhere.path())
            .arg("--config")
            .arg(temp.path().join("precache.toml"))
            .args(["list", "--format", "plain"])
            .assert()
            .success();
    }

    #[test]
    fn install_then_fetch_from_cache() {
        let temp = site("v1", &MANIFEST);

        in_site(&temp)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached 3 resources"))
            .stdout(predicate::str::contains("v1 is active"));

        // The build output is gone; the cache still answers
        fs::remove_file(temp.path().join("dist").join("app.js")).unwrap();

        in_site(&temp)
            .args(["fetch", "/app.js"])
            .assert()
            .success()
            .stdout("console.log('v1')")
            .stderr(predicate::str::contains("from cache"));

        in_site(&temp)
            .args(["fetch", "--offline", "/"])
            .assert()
            .success()
            .stdout("<html>home</html>");
    }

    #[test]
    fn fetch_miss_goes_to_network() {
        let temp = site("v1", &["/"]);
        in_site(&temp).arg("install").assert().success();

        in_site(&temp)
            .args(["fetch", "style.css"])
            .assert()
            .success()
            .stdout("body{}")
            .stderr(predicate::str::contains("from network"));

        in_site(&temp)
            .args(["fetch", "/nope.js"])
            .assert()
            .success()
            .stderr(predicate::str::contains("404"));
    }

    #[test]
    fn offline_miss_fails() {
        let temp = site("v1", &["/"]);
        in_site(&temp).arg("install").assert().success();

        in_site(&temp)
            .args(["fetch", "--offline", "/app.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not cached"));
    }

    #[test]
    fn fetch_writes_output_file() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp).arg("install").assert().success();

        in_site(&temp)
            .args(["fetch", "style.css", "-o", "out.css"])
            .assert()
            .success()
            .stdout(predicate::str::contains("from cache"));

        let body = fs::read_to_string(temp.path().join("out.css")).unwrap();
        assert_eq!(body, "body{}");
    }

    #[test]
    fn fetch_include_prints_head() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp).arg("install").assert().success();

        in_site(&temp)
            .args(["fetch", "-i", "app.js"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("HTTP 200"))
            .stdout(predicate::str::contains("x-precache-source: cache"));
    }

    #[test]
    fn failed_install_reports_missing_resource() {
        let temp = site("v1", &["/", "app.js", "missing.js"]);

        in_site(&temp)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("missing.js"))
            .stderr(predicate::str::contains("HTTP 404"));

        in_site(&temp)
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout("");
    }

    #[test]
    fn redeploy_removes_stale_store() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp).arg("install").assert().success();

        write_config(temp.path(), "v2", &MANIFEST);
        fs::write(temp.path().join("dist").join("app.js"), "console.log('v2')").unwrap();

        in_site(&temp)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed stale cache"));

        in_site(&temp)
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout("v2\n");

        in_site(&temp)
            .args(["fetch", "--offline", "app.js"])
            .assert()
            .success()
            .stdout("console.log('v2')");
    }

    #[test]
    fn install_tag_overrides_version() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp)
            .args(["install", "--tag", "build-42"])
            .assert()
            .success();

        in_site(&temp)
            .args(["entries", "build-42", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("http://localhost:8080/app.js"));

        in_site(&temp)
            .arg("entries")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache not found: v1"));
    }

    #[test]
    fn storage_dir_flag_overrides_config() {
        let temp = site("v1", &MANIFEST);
        let storage = TempDir::new().unwrap();

        in_site(&temp)
            .arg("--storage-dir")
            .arg(storage.path())
            .arg("install")
            .assert()
            .success();

        assert!(!temp.path().join(".precache").exists());
        in_site(&temp)
            .arg("--storage-dir")
            .arg(storage.path())
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout("v1\n");
    }

    #[test]
    fn clear_requires_confirmation() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp).arg("install").assert().success();

        in_site(&temp)
            .arg("clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing deleted"));

        in_site(&temp)
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 store(s)"));

        in_site(&temp)
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout("");
    }

    /// Overwrite the index of every store under the site's storage dir
    fn corrupt_stores(temp: &TempDir) {
        for entry in fs::read_dir(temp.path().join(".precache")).unwrap() {
            let dir = entry.unwrap().path();
            fs::write(dir.join("_cache.json"), "{not json").unwrap();
        }
    }

    #[test]
    fn reinstall_replaces_corrupt_store() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp).arg("install").assert().success();
        corrupt_stores(&temp);

        in_site(&temp)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached 3 resources"));

        in_site(&temp)
            .args(["fetch", "--offline", "/app.js"])
            .assert()
            .success()
            .stdout("console.log('v1')");
    }

    #[test]
    fn clear_removes_unreadable_store() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp).arg("install").assert().success();
        corrupt_stores(&temp);

        in_site(&temp)
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 store(s)"));

        let left = fs::read_dir(temp.path().join(".precache")).unwrap().count();
        assert_eq!(left, 0);
    }

    #[test]
    fn install_resource_with_space_in_name() {
        let temp = site("v1", &["/", "my file.js"]);
        fs::write(temp.path().join("dist").join("my file.js"), "spaced").unwrap();

        in_site(&temp)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached 2 resources"));

        in_site(&temp)
            .args(["fetch", "--offline", "/my%20file.js"])
            .assert()
            .success()
            .stdout("spaced");
    }

    #[test]
    fn json_logs_go_to_stderr() {
        let temp = site("v1", &MANIFEST);
        in_site(&temp)
            .args(["-v", "--log-format", "json", "install"])
            .assert()
            .success()
            .stderr(predicate::str::contains("\"level\":\"INFO\""));
    }
}

mod lifecycle_tests {
    use async_trait::async_trait;
    use precache::network::{LocalNetwork, Network};
    use precache::store::CacheStorage;
    use precache::{
        CacheController, Deployment, DiskCacheStorage, Host, MemoryCacheStorage, PrecacheError,
        PrecacheResult, Registration, Request, Response, ServedFrom,
    };
    use std::collections::HashMap;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use url::Url;

    const ORIGIN: &str = "http://localhost:8080/";

    /// Local network that counts requests per URL
    struct CountingNetwork {
        inner: LocalNetwork,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl CountingNetwork {
        fn new(root: &std::path::Path) -> Self {
            Self {
                inner: LocalNetwork::new(root.to_path_buf(), Url::parse(ORIGIN).unwrap()),
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn calls(&self, path: &str) -> usize {
            let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
            *self.calls.lock().unwrap().get(url.as_str()).unwrap_or(&0)
        }

        fn total(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl Network for CountingNetwork {
        async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(request.url.to_string())
                .or_default() += 1;
            self.inner.fetch(request).await
        }

        fn network_name(&self) -> &'static str {
            "counting"
        }
    }

    #[derive(Default)]
    struct NullHost;

    #[async_trait]
    impl Host for NullHost {
        async fn skip_waiting(&self) {}

        async fn claim_clients(&self) -> PrecacheResult<usize> {
            Ok(0)
        }
    }

    fn build_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html"), "<html>home</html>").unwrap();
        fs::write(temp.path().join("app.js"), "console.log('v1')").unwrap();
        fs::write(temp.path().join("style.css"), "body{}").unwrap();
        temp
    }

    fn deployment(version: &str) -> Deployment {
        Deployment::new(version, ORIGIN, "/", &["/", "app.js", "style.css"]).unwrap()
    }

    #[tokio::test]
    async fn end_to_end_versioned_deploy() {
        let dist = build_dir();
        let caches = TempDir::new().unwrap();
        let storage = Arc::new(DiskCacheStorage::new(caches.path()));
        let network = Arc::new(CountingNetwork::new(dist.path()));
        let scope = Url::parse(ORIGIN).unwrap();

        let registration = Registration::new(scope.clone(), storage.clone(), network.clone());
        registration.update(deployment("v1")).await.unwrap();
        let installed = network.total();
        assert_eq!(installed, 3);

        let (client, _) = registration.navigate(ORIGIN).await.unwrap();
        let served = registration
            .fetch(client, &Request::parse("http://localhost:8080/app.js").unwrap())
            .await
            .unwrap();
        assert_eq!(served.source, ServedFrom::Cache);
        assert_eq!(served.response.body, b"console.log('v1')");
        assert_eq!(network.total(), installed);

        // A fresh process sees the same disk storage
        let registration = Registration::new(scope, storage.clone(), network.clone());
        registration.update(deployment("v2")).await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn cache_hits_never_reach_network() {
        let dist = build_dir();
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(CountingNetwork::new(dist.path()));
        let controller = CacheController::new(deployment("v1"), storage, network.clone());

        controller.on_install(&NullHost).await.unwrap();
        controller.on_activate(&NullHost).await.unwrap();

        for _ in 0..5 {
            let served = controller
                .on_fetch(&Request::parse("http://localhost:8080/style.css").unwrap())
                .await
                .unwrap();
            assert_eq!(served.source, ServedFrom::Cache);
        }
        assert_eq!(network.calls("/style.css"), 1);
    }

    #[tokio::test]
    async fn http_errors_pass_through_on_miss() {
        let dist = build_dir();
        let network = Arc::new(CountingNetwork::new(dist.path()));
        let controller = CacheController::new(
            deployment("v1"),
            Arc::new(MemoryCacheStorage::new()),
            network.clone(),
        );
        controller.on_install(&NullHost).await.unwrap();

        let served = controller
            .on_fetch(&Request::parse("http://localhost:8080/gone.png").unwrap())
            .await
            .unwrap();
        assert_eq!(served.source, ServedFrom::Network);
        assert_eq!(served.response.status, 404);
        assert_eq!(network.calls("/gone.png"), 1);
    }

    #[tokio::test]
    async fn failed_install_leaves_no_store() {
        let dist = build_dir();
        fs::remove_file(dist.path().join("style.css")).unwrap();
        let caches = TempDir::new().unwrap();
        let storage = Arc::new(DiskCacheStorage::new(caches.path()));
        let controller = CacheController::new(
            deployment("v1"),
            storage.clone(),
            Arc::new(CountingNetwork::new(dist.path())),
        );

        let err = controller.on_install(&NullHost).await.unwrap_err();
        assert!(matches!(err, PrecacheError::InstallPopulation { .. }));
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
