//! Common test utilities for roadmap integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's real data directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// The `roadmap()` method returns a `Command` that sets `ROADMAP_DATA_DIR`
/// and `ROADMAP_CONFIG_DIR` per invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment with a seeded database.
    pub fn init() -> Self {
        let env = Self::new();
        env.roadmap().args(["init", "--seed"]).assert().success();
        env
    }

    /// Create a seeded test environment and log in.
    pub fn logged_in() -> Self {
        let env = Self::init();
        env.roadmap()
            .args(["login", "-u", "payProduct", "-p", "payProduct!@#"])
            .assert()
            .success();
        env
    }

    /// Get a Command for the roadmap binary with isolated directories.
    pub fn roadmap(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_roadmap"));
        cmd.env("ROADMAP_DATA_DIR", self.data_dir.path());
        cmd.env("ROADMAP_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("ROADMAP_USERNAME");
        cmd.env_remove("ROADMAP_PASSWORD");
        cmd.env_remove("ROADMAP_SESSION_SECRET");
        cmd.env_remove("ROADMAP_LOG");
        cmd
    }

    /// Create a project and return its id.
    pub fn create_project(&self, args: &[&str]) -> String {
        let output = self
            .roadmap()
            .args(["project", "create"])
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "create failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["feature"]["id"].as_str().unwrap().to_string()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
