use assert_cmd::assert::Assert;
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::str as p_str;
use predicates::Predicate;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const DEFAULT_CONFIG_PATH: &str = ".graphqlconfig";
const FIXTURE_ROOT_PATH: &str = "tests/fixtures";
const FIXTURE_INPUT_DIRECTORY: &str = "input";
const FIXTURE_EXPECTED_DIRECTORY: &str = "expected";

/// Predicate that never fails and overwrites expected fixtures with actual output
#[derive(Debug)]
struct FixtureSaverPredicate<'a, P> {
    wrapping_predicate: P,
    original_path: &'a Path,
}

impl<'a, P: Predicate<str>> FixtureSaverPredicate<'a, P> {
    fn new(wrapping_predicate: P, original_path: &'a Path) -> Self {
        Self {
            wrapping_predicate,
            original_path,
        }
    }
}

impl<'a, P: Predicate<str>> predicates::reflection::PredicateReflection
    for FixtureSaverPredicate<'a, P>
{
}

impl<'a, P: Predicate<str>> Predicate<str> for FixtureSaverPredicate<'a, P> {
    fn eval(&self, edit: &str) -> bool {
        if !self.wrapping_predicate.eval(edit) {
            fs::write(self.original_path, edit).expect("failed to write fixture");
        }
        true
    }
}

impl<'a, P: Predicate<str>> std::fmt::Display for FixtureSaverPredicate<'a, P> {
    fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        panic!("FixtureSaverPredicate should never fail");
    }
}

/// Represents an instance of the gqlfrag command, run inside a temp directory
#[derive(Debug)]
pub struct TestCommandHarness {
    fixture_assert_directory: Option<PathBuf>,
    proc_cmd: Command,
    temp_dir: assert_fs::TempDir,
}

impl Default for TestCommandHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCommandHarness {
    pub fn new() -> Self {
        // If user adds `KEEP_TEST_TEMPDIRS` arg to `cargo test`, we can keep temp_dir
        let temp_dir = assert_fs::TempDir::new()
            .expect("temp directory creation failure")
            .into_persistent_if(env::var_os("KEEP_TEST_TEMPDIRS").is_some());

        let mut proc_cmd = Command::cargo_bin("gqlfrag").expect("gqlfrag bin failure");
        proc_cmd
            .current_dir(temp_dir.path())
            .env("NO_COLOR", "1")
            .env("CLICOLOR", "0")
            .arg("--num-threads=2");

        // If user adds `--nocapture` arg to `cargo test`, we can show output
        if env::args().any(|arg| arg == "--nocapture") {
            proc_cmd.stdin(Stdio::inherit());
            proc_cmd.stderr(Stdio::inherit());
        }

        Self {
            proc_cmd,
            temp_dir,
            fixture_assert_directory: None,
        }
    }

    pub fn directory_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(DEFAULT_CONFIG_PATH)
    }

    pub fn with_file_contents(&mut self, child_path: impl AsRef<Path>, contents: &str) -> &mut Self {
        self.temp_dir
            .child(child_path)
            .write_str(contents)
            .expect("write file failure");
        self
    }

    pub fn with_config_contents(&mut self, contents: &str) -> &mut Self {
        self.add_config_file_and_arg(|child| child.write_str(contents).ok());
        self
    }

    /// Runs the command from a directory below the temp dir instead of the temp dir itself.
    pub fn with_current_subdirectory(&mut self, child_path: impl AsRef<Path>) -> &mut Self {
        let directory = self.temp_dir.path().join(child_path);
        fs::create_dir_all(&directory).expect("create directory failure");
        self.proc_cmd.current_dir(directory);
        self
    }

    pub fn with_arg(&mut self, arg: impl AsRef<std::ffi::OsStr>) -> &mut Self {
        self.proc_cmd.arg(arg);
        self
    }

    /// Copies `input/` of the fixture into the temp dir, and asserts every file
    /// of `expected/` exists with identical content after the run.
    pub fn with_fixture_directory(
        &mut self,
        fixture_directory_subpath: impl AsRef<Path>,
    ) -> &mut Self {
        if let Some(ref path) = self.fixture_assert_directory {
            panic!(
                "with_fixture_directory() can only be called once, already {}",
                path.display(),
            );
        }

        let subpath_ref = fixture_directory_subpath.as_ref();
        let input_directory = Path::new(FIXTURE_ROOT_PATH)
            .join(subpath_ref)
            .join(FIXTURE_INPUT_DIRECTORY);
        self.temp_dir
            .copy_from(&input_directory, &["*.graphql"])
            .expect("failure to copy graphql files from fixture dir");
        self.fixture_assert_directory = Some(subpath_ref.into());

        // Copy the config but ignore errors (in case this fixture doesn't have one)
        self.add_config_file_and_arg(|child| {
            child
                .write_file(&input_directory.join(DEFAULT_CONFIG_PATH))
                .ok()
        });

        self
    }

    pub fn run_for_failure(&mut self) -> Assert {
        let assert = self.proc_cmd.assert().failure().stderr(p_str::is_empty());
        self.assert_fixture_outputs();
        assert
    }

    pub fn run_for_success(&mut self) -> Assert {
        let assert = self.proc_cmd.assert().success().stderr(p_str::is_empty());
        self.assert_fixture_outputs();
        assert
    }

    fn add_config_file_and_arg(
        &mut self,
        callback: impl FnOnce(&assert_fs::fixture::ChildPath) -> Option<()>,
    ) {
        let config_file_child = self.temp_dir.child(DEFAULT_CONFIG_PATH);
        if callback(&config_file_child).is_some() {
            self.proc_cmd.arg("-c").arg(config_file_child.path());
        }
    }

    fn assert_fixture_outputs(&self) {
        if let Some(ref fixture_directory_subpath) = self.fixture_assert_directory {
            let expected_directory = Path::new(FIXTURE_ROOT_PATH)
                .join(fixture_directory_subpath)
                .join(FIXTURE_EXPECTED_DIRECTORY);
            let walker = globwalk::GlobWalkerBuilder::from_patterns(
                &expected_directory,
                &["**/*.graphql", "**/*.js", DEFAULT_CONFIG_PATH],
            )
            .file_type(globwalk::FileType::FILE)
            .build()
            .expect("expected fixture glob failure");

            let should_overwrite_fixtures = env::var_os("OVERWRITE_FIXTURES").is_some();

            let expected_file_iter = walker.into_iter().filter_map(Result::ok);
            for expected_file in expected_file_iter {
                let expected_file_path = expected_file.path();

                let child_path = expected_file_path
                    .strip_prefix(&expected_directory)
                    .expect("unexpectedly not under fixtures");
                let child_path = self.temp_dir.child(child_path);

                let expected_content =
                    fs::read_to_string(expected_file_path).expect("missing expected file");
                let diff_predicate = p_str::diff(expected_content);
                if should_overwrite_fixtures {
                    child_path.assert(FixtureSaverPredicate::new(
                        diff_predicate,
                        expected_file_path,
                    ));
                } else {
                    child_path.assert(diff_predicate);
                }
            }
        }
    }
}
