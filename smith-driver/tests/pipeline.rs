//! End-to-end seeds against fake toolchains made of shell scripts.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use smith_driver::checks::{CheckSet, pipeline};
use smith_driver::known_bugs::KnownBugs;
use smith_driver::stats::Stats;
use smith_driver::supervisor::Supervisor;
use smith_driver::test_run::{Harness, RunOutcome};
use smith_driver::toolchain::Toolchain;
use tempfile::TempDir;

const GENERATOR: &str = r#"#!/bin/sh
# --seed N --dir D
mkdir -p "$4/src/main"
printf 'package main\nfunc main() {\n}\n' > "$4/src/main/0.go"
"#;

const GENERATOR_BROKEN: &str = "#!/bin/sh\necho 'panic: generator bug'\nexit 2\n";

const GOFMT_OK: &str = "#!/bin/sh\ncat \"$1\"\n";

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// `go build` that prints `message` and exits with `code`; also records
/// that it ran.
fn fake_go(dir: &Path, message: &str, code: i32) -> PathBuf {
    let body = format!(
        "#!/bin/sh\ntouch \"{}/go-ran\"\necho '{}'\nexit {}\n",
        dir.display(),
        message,
        code
    );
    script(dir, "go", &body)
}

struct Fixture {
    tmp: TempDir,
    harness: Harness,
}

impl Fixture {
    fn new(checkers: &str, toolchain: impl FnOnce(&Path) -> Toolchain) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let harness = Harness {
            workdir: tmp.path().join("work"),
            checks: pipeline(&CheckSet::new(checkers)),
            rules: KnownBugs::builtin(),
            supervisor: Supervisor::new(Duration::from_secs(1), Duration::from_millis(500)),
            toolchain: toolchain(&bin),
            stats: Arc::new(Stats::default()),
        };
        harness.prepare().unwrap();
        Self { tmp, harness }
    }

    fn bin(&self) -> PathBuf {
        self.tmp.path().join("bin")
    }
}

fn toolchain(bin: &Path, go: PathBuf, gofmt: &str) -> Toolchain {
    Toolchain {
        generator: script(bin, "gosmith", GENERATOR),
        go,
        gofmt: script(bin, "gofmt", gofmt),
        ssadump: bin.join("ssadump"),
    }
}

#[test]
fn configured_overflow_rule_makes_the_failure_known() {
    let mut fx = Fixture::new("amd64", |bin| {
        let go = fake_go(bin, "./0.go:3: constant 9223372036854775808 overflows int", 1);
        toolchain(bin, go, GOFMT_OK)
    });
    fx.harness.rules = KnownBugs::default();
    fx.harness.rules.extend_from_json(r#"{ "gc..amd64": ["overflow"] }"#, Path::new("rules.json")).unwrap();

    let outcome = fx.harness.run_seed(12345);

    assert_eq!(outcome, RunOutcome::Clean);
    let stats = fx.harness.stats.snapshot();
    assert_eq!((stats.total, stats.known, stats.build), (1, 1, 0));
    assert!(!fx.harness.scratch_dir(12345).exists());
    assert!(!fx.harness.bug_dir(12345).exists());
}

#[test]
fn novel_build_failure_is_archived_and_stops_the_pipeline() {
    let fx = Fixture::new("amd64,gofmt", |bin| {
        let go = fake_go(bin, "./0.go:3: internal compiler error: boom", 2);
        let gofmt = format!("#!/bin/sh\ntouch \"{}/gofmt-ran\"\ncat \"$1\"\n", bin.display());
        toolchain(bin, go, &gofmt)
    });

    let outcome = fx.harness.run_seed(5);

    assert_eq!(
        outcome,
        RunOutcome::Archived { check: "gc..amd64".into(), reason: "gc..amd64 build failed".into() }
    );
    let bug = fx.harness.bug_dir(5);
    assert!(bug.join("src/main/0.go").is_file());
    let log = std::fs::read_to_string(bug.join("gc..amd64")).unwrap();
    assert!(log.contains("internal compiler error: boom"));
    assert!(fx.bin().join("go-ran").exists());
    assert!(!fx.bin().join("gofmt-ran").exists());
    assert_eq!(fx.harness.stats.snapshot().build, 1);
}

#[test]
fn nonidempotent_formatter_is_archived() {
    let gofmt = r#"#!/bin/sh
case "$1" in
  *.formatted) echo 'package main // again' ;;
  *) echo 'package main' ;;
esac
"#;
    let fx = Fixture::new("gofmt", |bin| {
        let go = fake_go(bin, "", 0);
        toolchain(bin, go, gofmt)
    });

    let outcome = fx.harness.run_seed(77);

    assert_eq!(outcome, RunOutcome::Archived { check: "gofmt".into(), reason: "nonidempotent gofmt".into() });
    let src = fx.harness.bug_dir(77).join("src/main");
    assert!(src.join("0.go.formatted").is_file());
    assert!(src.join("0.go.formatted2").is_file());
    assert_eq!(fx.harness.stats.snapshot().gofmt, 1);
}

#[test]
fn corrupting_formatter_leaves_stripped_copies() {
    let gofmt = "#!/bin/sh\necho 'package other'\n";
    let fx = Fixture::new("gofmt", |bin| {
        let go = fake_go(bin, "", 0);
        toolchain(bin, go, gofmt)
    });

    let outcome = fx.harness.run_seed(78);

    assert!(matches!(outcome, RunOutcome::Archived { ref reason, .. } if reason == "corrupting gofmt"));
    let src = fx.harness.bug_dir(78).join("src/main");
    let stripped = std::fs::read_to_string(src.join("0.go.stripped0")).unwrap();
    assert_eq!(stripped, "packagemainfuncmain{}\n");
}

#[test]
fn clean_seeds_are_discarded() {
    let fx = Fixture::new("gofmt", |bin| {
        let go = fake_go(bin, "", 0);
        toolchain(bin, go, GOFMT_OK)
    });

    assert_eq!(fx.harness.run_seed(1), RunOutcome::Clean);
    assert!(!fx.harness.scratch_dir(1).exists());
    assert_eq!(fx.harness.stats.snapshot().failures(), 0);
}

#[test]
fn generator_failure_skips_every_check() {
    let fx = Fixture::new("amd64", |bin| {
        let go = fake_go(bin, "", 1);
        let base = toolchain(bin, go, GOFMT_OK);
        Toolchain { generator: script(bin, "gosmith", GENERATOR_BROKEN), ..base }
    });

    assert_eq!(fx.harness.run_seed(9), RunOutcome::GenerationFailed);
    assert!(!fx.bin().join("go-ran").exists());
    let stats = fx.harness.stats.snapshot();
    assert_eq!((stats.total, stats.generator, stats.build), (1, 1, 0));
    assert!(!fx.harness.scratch_dir(9).exists());
}

#[test]
fn hung_binary_is_aborted_and_classified() {
    // the built "binary" prints the Go runtime's abort banner and hangs
    let go = r#"#!/bin/sh
out="$3"
printf '#!/bin/sh\necho "SIGABRT: abort"\nsleep 30\n' > "$out"
chmod +x "$out"
"#;
    let fx = Fixture::new("amd64,exec", |bin| toolchain(bin, script(bin, "go", go), GOFMT_OK));

    let start = std::time::Instant::now();
    let outcome = fx.harness.run_seed(3);

    assert_eq!(outcome, RunOutcome::Clean);
    assert_eq!(fx.harness.stats.snapshot().known, 1);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn binary_ignoring_terminate_is_killed() {
    let go = r#"#!/bin/sh
out="$3"
cat > "$out" <<'END'
#!/bin/sh
trap '' TERM ABRT
echo "SIGABRT: abort"
sleep 1000
END
chmod +x "$out"
"#;
    let fx = Fixture::new("amd64,exec", |bin| toolchain(bin, script(bin, "go", go), GOFMT_OK));

    let start = std::time::Instant::now();
    let outcome = fx.harness.run_seed(4);

    assert_eq!(outcome, RunOutcome::Clean);
    assert_eq!(fx.harness.stats.snapshot().known, 1);
    // one second of timeout plus two half-second grace periods
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(!fx.harness.scratch_dir(4).exists());
}
