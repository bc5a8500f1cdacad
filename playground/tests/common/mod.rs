use assert_cmd::assert::Assert;
use assert_cmd::Command;
use assert_fs::prelude::PathCopy;
use assert_fs::TempDir;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

fn setup_working_dir(dir_name: &str) -> TempDir {
    let file_path = PathBuf::from(format!(
        "{}/tests/test-cases/{}",
        env!("CARGO_MANIFEST_DIR"),
        dir_name
    ));

    let temp = TempDir::new().unwrap();
    temp.copy_from(file_path, &["*", "**/*"]).unwrap();

    temp
}

pub struct PlaygroundTestHelper<'a> {
    pub work_dir: TempDir,
    name: &'a str,
    counter: AtomicUsize,
}

impl<'a> PlaygroundTestHelper<'a> {
    pub fn new(name: &'a str, test_dir: &'a str) -> Self {
        Self {
            work_dir: setup_working_dir(test_dir),
            name,
            counter: AtomicUsize::new(0),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("kube-score-playground").unwrap();
        cmd.current_dir(self.work_dir.path())
            .env(
                "KSP_RUN_ID",
                format!(
                    "{}-{}",
                    self.name,
                    self.counter.fetch_add(1, Ordering::Relaxed)
                ),
            )
            .env("KSP_OUTPUT_PROGRESS", "plain")
            .env("KUBE_SCORE_BIN", "./bin/kube-score")
            .env("NO_COLOR", "1");
        cmd
    }

    pub fn run_command(&self, args: &[&str]) -> Assert {
        self.command().args(args).assert()
    }

    pub fn run_with_stdin(&self, args: &[&str], stdin: &str) -> Assert {
        self.command()
            .args(args)
            .write_stdin(stdin.to_string())
            .assert()
    }

    pub fn clean_work_dir(self) {
        self.work_dir.close().unwrap();
    }
}
