//! External tools and how each is invoked: the generator, `go build`/`go
//! test`, built binaries (natively or through an exec shim), `ssadump` and
//! `gofmt`.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A (compiler, OS, architecture, instrumentation) combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target {
    /// Name accepted by `--checkers`.
    pub checker: &'static str,
    pub compiler: &'static str,
    /// Empty for the host OS.
    pub goos: &'static str,
    pub goarch: &'static str,
    pub race: bool,
    /// Script that runs a binary for a sandboxed target.
    pub shim: Option<&'static str>,
    pub runnable: bool,
}

impl Target {
    const fn new(checker: &'static str, compiler: &'static str, goos: &'static str, goarch: &'static str) -> Self {
        Self { checker, compiler, goos, goarch, race: false, shim: None, runnable: true }
    }

    /// `<compiler>.<os>.<arch>[.race]`, e.g. `gc..amd64.race`.
    pub fn key(&self) -> String {
        let mut key = format!("{}.{}.{}", self.compiler, self.goos, self.goarch);
        if self.race {
            key.push_str(".race");
        }
        key
    }
}

/// Build targets in pipeline order.
pub const TARGETS: &[Target] = &[
    Target::new("amd64", "gc", "", "amd64"),
    Target::new("386", "gc", "", "386"),
    Target { runnable: false, ..Target::new("arm", "gc", "", "arm") },
    Target { shim: Some("go_js_wasm_exec"), ..Target::new("wasm", "gc", "js", "wasm") },
    Target { shim: Some("go_wasip1_wasm_exec"), ..Target::new("wasip1", "gc", "wasip1", "wasm") },
    Target { race: true, ..Target::new("race", "gc", "", "amd64") },
    Target::new("gccgo", "gccgo", "", "amd64"),
];

/// The target coverage builds use.
pub const COVER_TARGET: Target = Target::new("cover", "gc", "", "amd64");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SsaMode {
    /// Build and sanity-check SSA only.
    Dump,
    /// Interpret `main`.
    Run,
}

#[derive(Clone, Debug)]
pub struct Toolchain {
    pub generator: PathBuf,
    pub go: PathBuf,
    pub gofmt: PathBuf,
    pub ssadump: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            generator: "gosmith".into(),
            go: "go".into(),
            gofmt: "gofmt".into(),
            ssadump: "ssadump".into(),
        }
    }
}

impl Toolchain {
    pub fn generate(&self, seed: i64, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.generator);
        cmd.arg("--seed").arg(seed.to_string()).arg("--dir").arg(dir);
        cmd
    }

    /// `go build -o <dir>/bin<key> -compiler <c> [-race] main`.
    pub fn build(&self, target: &Target, dir: &Path, gopath: &Path) -> Command {
        let mut cmd = Command::new(&self.go);
        cmd.arg("build").arg("-o").arg(binary_path(target, dir)).arg("-compiler").arg(target.compiler);
        if target.race {
            cmd.arg("-race");
        }
        cmd.arg("main");
        build_env(&mut cmd, target, gopath);
        cmd
    }

    /// `go test -c -cover` over unit `a`.
    pub fn cover(&self, target: &Target, dir: &Path, gopath: &Path) -> Command {
        let out = dir.join(format!("coverbin{}", target.key()));
        let mut cmd = Command::new(&self.go);
        cmd.args(["test", "-c", "-cover", "-o"]).arg(out).arg("-compiler").arg(target.compiler);
        if target.race {
            cmd.arg("-race");
        }
        cmd.arg("a");
        build_env(&mut cmd, target, gopath);
        cmd
    }

    pub fn exec(&self, target: &Target, binary: &Path) -> Command {
        let mut cmd = match target.shim {
            Some(shim) => {
                let mut cmd = Command::new(shim);
                cmd.arg(binary);
                cmd
            }
            None => Command::new(binary),
        };
        cmd.env("GOMAXPROCS", "2").env("GOGC", "0");
        cmd
    }

    pub fn ssadump(&self, mode: SsaMode, gopath: &Path) -> Command {
        let mut cmd = Command::new(&self.ssadump);
        cmd.env("GOPATH", gopath).env("GO111MODULE", "off");
        match mode {
            SsaMode::Dump => {
                cmd.args(["-build=CDPF", "main"]);
            }
            SsaMode::Run => {
                cmd.args(["-run", "main"]).env("GOMAXPROCS", "2").env("GOGC", "10");
            }
        }
        cmd
    }

    pub fn gofmt(&self, file: &Path) -> Command {
        let mut cmd = Command::new(&self.gofmt);
        cmd.arg(file);
        cmd
    }
}

pub fn binary_path(target: &Target, dir: &Path) -> PathBuf {
    dir.join(format!("bin{}", target.key()))
}

/// `GOPATH=<seed dir>:<inherited>`, module mode off, cross-compilation vars.
fn build_env(cmd: &mut Command, target: &Target, gopath: &Path) {
    let mut path = OsString::from(gopath.as_os_str());
    path.push(":");
    if let Some(inherited) = std::env::var_os("GOPATH") {
        path.push(inherited);
    }
    cmd.env("GOPATH", path).env("GO111MODULE", "off").env("GOARCH", target.goarch);
    if !target.goos.is_empty() {
        cmd.env("GOOS", target.goos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn env(cmd: &Command, key: &str) -> Option<String> {
        cmd.get_envs()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.map(|v| v.to_string_lossy().into_owned()))
    }

    #[test]
    fn identity_keys() {
        let keys: Vec<String> = TARGETS.iter().map(Target::key).collect();
        assert_eq!(
            keys,
            ["gc..amd64", "gc..386", "gc..arm", "gc.js.wasm", "gc.wasip1.wasm", "gc..amd64.race", "gccgo..amd64"]
        );
    }

    #[test]
    fn race_build_command() {
        let tc = Toolchain::default();
        let race = TARGETS.iter().find(|t| t.race).unwrap();
        let cmd = tc.build(race, Path::new("/w/tmp/7"), Path::new("/abs/w/tmp/7"));
        assert_eq!(
            args(&cmd),
            ["build", "-o", "/w/tmp/7/bingc..amd64.race", "-compiler", "gc", "-race", "main"]
        );
        assert!(env(&cmd, "GOPATH").unwrap().starts_with("/abs/w/tmp/7:"));
        assert_eq!(env(&cmd, "GOARCH").as_deref(), Some("amd64"));
        assert_eq!(env(&cmd, "GOOS"), None);
    }

    #[test]
    fn sandboxed_targets_run_through_their_shim() {
        let tc = Toolchain::default();
        let wasm = TARGETS.iter().find(|t| t.checker == "wasm").unwrap();
        let cmd = tc.exec(wasm, Path::new("bingc.js.wasm"));
        assert_eq!(cmd.get_program(), "go_js_wasm_exec");
        assert_eq!(args(&cmd), ["bingc.js.wasm"]);
        assert_eq!(env(&cmd, "GOGC").as_deref(), Some("0"));
    }

    #[test]
    fn interpreted_runs_collect_garbage() {
        let cmd = Toolchain::default().ssadump(SsaMode::Run, Path::new("/g"));
        assert_eq!(args(&cmd), ["-run", "main"]);
        assert_eq!(env(&cmd, "GOGC").as_deref(), Some("10"));
    }
}
