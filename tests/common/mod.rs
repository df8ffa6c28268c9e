/// Common test utilities and helpers for ghbackup tests
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use assert_fs::TempDir;

/// Isolated home, config and backup directories for one test
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub backup_dir: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("config").join("ghbackup");
        let backup_dir = temp_dir.path().join("backup");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        Self {
            temp_dir,
            config_dir,
            backup_dir,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn create_test_config(&self, content: &str) -> PathBuf {
        let config_path = self.config_dir.join("config.yml");
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }

    /// The ghbackup binary with an environment that cannot see the user's
    /// own settings or token.
    pub fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_ghbackup"));
        command
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env_remove("GITHUB_TOKEN")
            .env_remove("RUST_LOG");
        command
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("Failed to execute ghbackup")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// True when a usable `git` is on `PATH`
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git with a throwaway identity, panicking on failure
pub fn git(cwd: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(["-c", "user.name=ghbackup", "-c", "user.email=ghbackup@example.com"])
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A working repository with one commit plus a bare copy of it to clone from
pub struct Origin {
    pub work: PathBuf,
    pub bare: PathBuf,
}

impl Origin {
    pub fn create(root: &Path, name: &str) -> Self {
        let work = root.join("work").join(name);
        let bare = root.join("origin").join(format!("{name}.git"));
        std::fs::create_dir_all(&work).expect("Failed to create work dir");
        std::fs::create_dir_all(root.join("origin")).expect("Failed to create origin dir");

        git(&work, &["init", "--quiet"]);
        std::fs::write(work.join("README.md"), format!("# {name}\n")).expect("write");
        git(&work, &["add", "README.md"]);
        git(&work, &["commit", "--quiet", "-m", "initial"]);
        git(
            root,
            &[
                "clone",
                "--bare",
                "--quiet",
                &work.to_string_lossy(),
                &bare.to_string_lossy(),
            ],
        );

        Self { work, bare }
    }

    /// Commit in the working copy and publish it as a new branch
    pub fn push_branch(&self, branch: &str) {
        std::fs::write(self.work.join(format!("{branch}.txt")), branch).expect("write");
        git(&self.work, &["add", "."]);
        git(&self.work, &["commit", "--quiet", "-m", branch]);
        git(
            &self.work,
            &[
                "push",
                "--quiet",
                &self.bare.to_string_lossy(),
                &format!("HEAD:refs/heads/{branch}"),
            ],
        );
    }
}
